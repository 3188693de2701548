//! Schema for habits, habit logs and goals
//!
//! Every statement is idempotent, so this runs on each `serve` start and
//! from `habit-hero migrate`.

use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS habits (
        id UUID PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        category TEXT NOT NULL,
        color TEXT NOT NULL,
        frequency_type TEXT NOT NULL,
        frequency_value JSONB NOT NULL DEFAULT '{}',
        streak INTEGER NOT NULL DEFAULT 0,
        longest_streak INTEGER NOT NULL DEFAULT 0,
        last_completed TIMESTAMPTZ,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        is_archived BOOLEAN NOT NULL DEFAULT FALSE,
        goal DOUBLE PRECISION,
        metric_type TEXT,
        units TEXT,
        notes TEXT,
        reminder_time TIME,
        reminder_enabled BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS habit_logs (
        id UUID PRIMARY KEY,
        habit_id UUID NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        completed_at TIMESTAMPTZ NOT NULL,
        value DOUBLE PRECISION,
        notes TEXT,
        details JSONB,
        difficulty SMALLINT CHECK (difficulty BETWEEN 1 AND 5),
        feeling TEXT,
        photo_url TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS goals (
        id UUID PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        target_value DOUBLE PRECISION,
        current_value DOUBLE PRECISION NOT NULL DEFAULT 0,
        start_value DOUBLE PRECISION,
        unit TEXT,
        deadline DATE,
        related_habits JSONB NOT NULL DEFAULT '[]',
        is_completed BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_habits_user ON habits(user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_habit_logs_habit ON habit_logs(habit_id, completed_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_habit_logs_user ON habit_logs(user_id, completed_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_goals_user ON goals(user_id, created_at DESC)",
];

/// Create tables and indexes that do not exist yet.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("running migrations");
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = STATEMENTS.len(), "migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_are_idempotent() {
        for statement in STATEMENTS {
            assert!(statement.contains("IF NOT EXISTS"), "{}", statement);
        }
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn runs_twice() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        run(&pool).await.expect("first run");
        run(&pool).await.expect("second run");
    }
}
