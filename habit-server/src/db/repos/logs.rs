//! Habit log repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use habit_core::models::{
    Difficulty, Feeling, HabitLog, LogPatch, NewHabitLog, TimeRange, UserId, ValidationError,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::corrupt;
use crate::store::{DbError, LogRepository, ToggleOutcome};

const RESOURCE: &str = "log";

/// Log record from database
#[derive(Debug, Clone, FromRow)]
struct LogRow {
    id: Uuid,
    habit_id: Uuid,
    user_id: String,
    completed_at: DateTime<Utc>,
    value: Option<f64>,
    notes: Option<String>,
    details: Option<serde_json::Value>,
    difficulty: Option<i16>,
    feeling: Option<String>,
    photo_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LogRow> for HabitLog {
    type Error = DbError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let bad = |e: ValidationError| corrupt(RESOURCE, id, e);

        Ok(HabitLog {
            id,
            habit_id: row.habit_id,
            user_id: UserId::new(&row.user_id).map_err(bad)?,
            completed_at: row.completed_at,
            value: row.value,
            notes: row.notes,
            details: row.details,
            difficulty: row
                .difficulty
                .map(|d| Difficulty::new(i64::from(d)))
                .transpose()
                .map_err(bad)?,
            feeling: row
                .feeling
                .as_deref()
                .map(Feeling::parse)
                .transpose()
                .map_err(bad)?,
            photo_url: row.photo_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn rows_into(rows: Vec<LogRow>) -> Result<Vec<HabitLog>, DbError> {
    rows.into_iter().map(HabitLog::try_from).collect()
}

/// Log repository over a shared pool
#[derive(Clone)]
pub struct PgLogRepo {
    pool: PgPool,
}

impl PgLogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert `log` if its habit belongs to the log's user.
    async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        log: &HabitLog,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO habit_logs (
                id, habit_id, user_id, completed_at, value, notes, details,
                difficulty, feeling, photo_url, created_at, updated_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11
            WHERE EXISTS (SELECT 1 FROM habits WHERE id = $2 AND user_id = $3)
            "#,
        )
        .bind(log.id)
        .bind(log.habit_id)
        .bind(log.user_id.as_str())
        .bind(log.completed_at)
        .bind(log.value)
        .bind(&log.notes)
        .bind(&log.details)
        .bind(log.difficulty.map(|d| i16::from(d.get())))
        .bind(log.feeling.map(|f| f.as_str()))
        .bind(&log.photo_url)
        .bind(log.created_at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("habit", log.habit_id));
        }
        Ok(())
    }
}

#[async_trait]
impl LogRepository for PgLogRepo {
    async fn list_for_habit(
        &self,
        user: &UserId,
        habit_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<HabitLog>, DbError> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT * FROM habit_logs
            WHERE user_id = $1 AND habit_id = $2
              AND ($3::timestamptz IS NULL OR completed_at >= $3)
              AND ($4::timestamptz IS NULL OR completed_at < $4)
            ORDER BY completed_at DESC, id DESC
            "#,
        )
        .bind(user.as_str())
        .bind(habit_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        rows_into(rows)
    }

    async fn list_for_user(
        &self,
        user: &UserId,
        range: TimeRange,
    ) -> Result<Vec<HabitLog>, DbError> {
        let rows = sqlx::query_as::<_, LogRow>(
            r#"
            SELECT * FROM habit_logs
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR completed_at >= $2)
              AND ($3::timestamptz IS NULL OR completed_at < $3)
            ORDER BY completed_at DESC, id DESC
            "#,
        )
        .bind(user.as_str())
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        rows_into(rows)
    }

    async fn completions(
        &self,
        user: &UserId,
        habit_id: Uuid,
    ) -> Result<Vec<DateTime<Utc>>, DbError> {
        Ok(sqlx::query_scalar(
            r#"
            SELECT completed_at FROM habit_logs
            WHERE user_id = $1 AND habit_id = $2
            ORDER BY completed_at
            "#,
        )
        .bind(user.as_str())
        .bind(habit_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get(&self, user: &UserId, id: Uuid) -> Result<HabitLog, DbError> {
        let row = sqlx::query_as::<_, LogRow>(
            "SELECT * FROM habit_logs WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(RESOURCE, id))?;
        HabitLog::try_from(row)
    }

    async fn create(&self, user: &UserId, new: NewHabitLog) -> Result<HabitLog, DbError> {
        let log = HabitLog::from_new(Uuid::new_v4(), user.clone(), new, Utc::now());
        let mut tx = self.pool.begin().await?;
        Self::insert(&mut tx, &log).await?;
        tx.commit().await?;
        Ok(log)
    }

    async fn update(&self, user: &UserId, id: Uuid, patch: LogPatch) -> Result<HabitLog, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, LogRow>(
            "SELECT * FROM habit_logs WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found(RESOURCE, id))?;

        let mut log = HabitLog::try_from(row)?;
        log.apply(patch, Utc::now());

        sqlx::query(
            r#"
            UPDATE habit_logs SET
                completed_at = $3, value = $4, notes = $5, details = $6,
                difficulty = $7, feeling = $8, photo_url = $9, updated_at = $10
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(log.id)
        .bind(log.user_id.as_str())
        .bind(log.completed_at)
        .bind(log.value)
        .bind(&log.notes)
        .bind(&log.details)
        .bind(log.difficulty.map(|d| i16::from(d.get())))
        .bind(log.feeling.map(|f| f.as_str()))
        .bind(&log.photo_url)
        .bind(log.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(log)
    }

    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM habit_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(RESOURCE, id));
        }
        Ok(())
    }

    async fn toggle(
        &self,
        user: &UserId,
        habit_id: Uuid,
        day: TimeRange,
        at: DateTime<Utc>,
    ) -> Result<ToggleOutcome, DbError> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent toggles of the same habit
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM habits WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(habit_id)
        .bind(user.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("habit", habit_id))?;

        let removed = sqlx::query(
            r#"
            DELETE FROM habit_logs
            WHERE habit_id = $1 AND user_id = $2
              AND ($3::timestamptz IS NULL OR completed_at >= $3)
              AND ($4::timestamptz IS NULL OR completed_at < $4)
            "#,
        )
        .bind(habit_id)
        .bind(user.as_str())
        .bind(day.start)
        .bind(day.end)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let outcome = if removed > 0 {
            ToggleOutcome {
                completed: false,
                log: None,
                removed,
            }
        } else {
            let log = HabitLog::from_new(
                Uuid::new_v4(),
                user.clone(),
                NewHabitLog::completion(habit_id, at),
                Utc::now(),
            );
            Self::insert(&mut tx, &log).await?;
            ToggleOutcome {
                completed: true,
                log: Some(log),
                removed: 0,
            }
        };

        tx.commit().await?;
        tracing::debug!(%habit_id, completed = outcome.completed, removed, "habit toggled");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> LogRow {
        LogRow {
            id: Uuid::new_v4(),
            habit_id: Uuid::new_v4(),
            user_id: "user_1".into(),
            completed_at: Utc::now(),
            value: Some(2.5),
            notes: None,
            details: None,
            difficulty: Some(3),
            feeling: Some("good".into()),
            photo_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts() {
        let log = HabitLog::try_from(row()).unwrap();
        assert_eq!(log.difficulty.map(|d| d.get()), Some(3));
        assert_eq!(log.feeling, Some(Feeling::Good));
    }

    #[test]
    fn bad_feeling_is_corrupt() {
        let mut bad = row();
        bad.feeling = Some("ecstatic".into());
        assert!(matches!(
            HabitLog::try_from(bad),
            Err(DbError::Corrupt { resource: "log", .. })
        ));
    }
}
