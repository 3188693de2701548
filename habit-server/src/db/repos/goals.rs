//! Goal repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use habit_core::models::{
    Goal, GoalPatch, NewGoal, Paginated, Pagination, Progress, RelatedHabit, UserId,
    ValidationError,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use super::corrupt;
use crate::store::{DbError, GoalRepository};

const RESOURCE: &str = "goal";

/// Goal record from database
#[derive(Debug, Clone, FromRow)]
struct GoalRow {
    id: Uuid,
    user_id: String,
    name: String,
    description: Option<String>,
    target_value: Option<f64>,
    current_value: f64,
    start_value: Option<f64>,
    unit: Option<String>,
    deadline: Option<NaiveDate>,
    related_habits: Json<Vec<RelatedHabit>>,
    is_completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GoalRow> for Goal {
    type Error = DbError;

    fn try_from(row: GoalRow) -> Result<Self, Self::Error> {
        Ok(Goal {
            id: row.id,
            user_id: UserId::new(&row.user_id).map_err(|e| corrupt(RESOURCE, row.id, e))?,
            name: row.name,
            description: row.description,
            target_value: row.target_value,
            current_value: row.current_value,
            start_value: row.start_value,
            unit: row.unit,
            deadline: row.deadline,
            related_habits: row.related_habits.0,
            is_completed: row.is_completed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Goal repository over a shared pool
#[derive(Clone)]
pub struct PgGoalRepo {
    pool: PgPool,
}

impl PgGoalRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock a goal, mutate it in Rust and write every column back.
    async fn modify(
        &self,
        user: &UserId,
        id: Uuid,
        change: impl FnOnce(&mut Goal) -> Result<(), ValidationError> + Send,
    ) -> Result<Goal, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, GoalRow>(
            "SELECT * FROM goals WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found(RESOURCE, id))?;

        let mut goal = Goal::try_from(row)?;
        change(&mut goal)?;
        Self::store(&mut tx, &goal).await?;
        tx.commit().await?;
        Ok(goal)
    }

    async fn store(tx: &mut Transaction<'_, Postgres>, goal: &Goal) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE goals SET
                name = $3, description = $4, target_value = $5, current_value = $6,
                start_value = $7, unit = $8, deadline = $9, related_habits = $10,
                is_completed = $11, updated_at = $12
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(goal.id)
        .bind(goal.user_id.as_str())
        .bind(&goal.name)
        .bind(&goal.description)
        .bind(goal.target_value)
        .bind(goal.current_value)
        .bind(goal.start_value)
        .bind(&goal.unit)
        .bind(goal.deadline)
        .bind(Json(&goal.related_habits))
        .bind(goal.is_completed)
        .bind(goal.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl GoalRepository for PgGoalRepo {
    async fn list(
        &self,
        user: &UserId,
        completed: Option<bool>,
        page: Pagination,
    ) -> Result<Paginated<Goal>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT *, COUNT(*) OVER() AS total FROM goals
            WHERE user_id = $1 AND ($2::boolean IS NULL OR is_completed = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user.as_str())
        .bind(completed)
        .bind(i64::from(page.limit()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut total = 0;
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            total = row.try_get::<i64, _>("total")?;
            items.push(Goal::try_from(GoalRow::from_row(row)?)?);
        }

        if items.is_empty() && page.page > 1 {
            total = sqlx::query_scalar(
                "SELECT COUNT(*) FROM goals WHERE user_id = $1 AND ($2::boolean IS NULL OR is_completed = $2)",
            )
            .bind(user.as_str())
            .bind(completed)
            .fetch_one(&self.pool)
            .await?;
        }

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn list_all(&self, user: &UserId) -> Result<Vec<Goal>, DbError> {
        let rows = sqlx::query_as::<_, GoalRow>(
            "SELECT * FROM goals WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Goal::try_from).collect()
    }

    async fn get(&self, user: &UserId, id: Uuid) -> Result<Goal, DbError> {
        let row = sqlx::query_as::<_, GoalRow>("SELECT * FROM goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(RESOURCE, id))?;
        Goal::try_from(row)
    }

    async fn create(&self, user: &UserId, new: NewGoal) -> Result<Goal, DbError> {
        let goal = Goal::from_new(Uuid::new_v4(), user.clone(), new, Utc::now());
        sqlx::query(
            r#"
            INSERT INTO goals (
                id, user_id, name, description, target_value, current_value,
                start_value, unit, deadline, related_habits, is_completed,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            "#,
        )
        .bind(goal.id)
        .bind(goal.user_id.as_str())
        .bind(&goal.name)
        .bind(&goal.description)
        .bind(goal.target_value)
        .bind(goal.current_value)
        .bind(goal.start_value)
        .bind(&goal.unit)
        .bind(goal.deadline)
        .bind(Json(&goal.related_habits))
        .bind(goal.is_completed)
        .bind(goal.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(goal_id = %goal.id, "goal created");
        Ok(goal)
    }

    async fn update(&self, user: &UserId, id: Uuid, patch: GoalPatch) -> Result<Goal, DbError> {
        let now = Utc::now();
        self.modify(user, id, move |goal| {
            goal.apply(patch, now);
            Ok(())
        })
        .await
    }

    async fn save_progress(
        &self,
        user: &UserId,
        id: Uuid,
        progress: Progress,
    ) -> Result<Goal, DbError> {
        let now = Utc::now();
        self.modify(user, id, move |goal| goal.record_progress(progress, now))
            .await
    }

    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(RESOURCE, id));
        }
        Ok(())
    }
}
