//! Habit repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use habit_core::models::{
    Frequency, FrequencyValue, Habit, HabitCategory, HabitColor, HabitFilter, HabitPatch,
    HabitSort, MetricType, NewHabit, Paginated, Pagination, StreakFields, UserId,
};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use super::{column, corrupt, count, escape_like};
use crate::store::{DbError, HabitRepository};

const RESOURCE: &str = "habit";

/// Habit record from database
#[derive(Debug, Clone, FromRow)]
struct HabitRow {
    id: Uuid,
    user_id: String,
    name: String,
    description: Option<String>,
    category: String,
    color: String,
    frequency_type: String,
    frequency_value: Json<FrequencyValue>,
    streak: i32,
    longest_streak: i32,
    last_completed: Option<DateTime<Utc>>,
    is_active: bool,
    is_archived: bool,
    goal: Option<f64>,
    metric_type: Option<String>,
    units: Option<String>,
    notes: Option<String>,
    reminder_time: Option<NaiveTime>,
    reminder_enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<HabitRow> for Habit {
    type Error = DbError;

    fn try_from(row: HabitRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let bad = |e: habit_core::models::ValidationError| corrupt(RESOURCE, id, e);

        Ok(Habit {
            id,
            user_id: UserId::new(&row.user_id).map_err(bad)?,
            name: row.name,
            description: row.description,
            category: HabitCategory::parse(&row.category).map_err(bad)?,
            color: HabitColor::parse(&row.color).map_err(bad)?,
            frequency: Frequency::from_storage(&row.frequency_type, row.frequency_value.0)
                .map_err(bad)?,
            streak: count(RESOURCE, id, row.streak)?,
            longest_streak: count(RESOURCE, id, row.longest_streak)?,
            last_completed: row.last_completed,
            is_active: row.is_active,
            is_archived: row.is_archived,
            goal: row.goal,
            metric_type: row
                .metric_type
                .as_deref()
                .map(MetricType::parse)
                .transpose()
                .map_err(bad)?,
            units: row.units,
            notes: row.notes,
            reminder_time: row.reminder_time,
            reminder_enabled: row.reminder_enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Habit repository over a shared pool
#[derive(Clone)]
pub struct PgHabitRepo {
    pool: PgPool,
}

impl PgHabitRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock and load a habit inside `tx`.
    async fn lock(
        tx: &mut Transaction<'_, Postgres>,
        user: &UserId,
        id: Uuid,
    ) -> Result<Habit, DbError> {
        let row = sqlx::query_as::<_, HabitRow>(
            "SELECT * FROM habits WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user.as_str())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| DbError::not_found(RESOURCE, id))?;
        Habit::try_from(row)
    }

    /// Write every mutable column of `habit` back inside `tx`.
    async fn store(tx: &mut Transaction<'_, Postgres>, habit: &Habit) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE habits SET
                name = $3, description = $4, category = $5, color = $6,
                frequency_type = $7, frequency_value = $8,
                streak = $9, longest_streak = $10, last_completed = $11,
                is_active = $12, is_archived = $13, goal = $14, metric_type = $15,
                units = $16, notes = $17, reminder_time = $18, reminder_enabled = $19,
                updated_at = $20
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(habit.id)
        .bind(habit.user_id.as_str())
        .bind(&habit.name)
        .bind(&habit.description)
        .bind(habit.category.as_str())
        .bind(habit.color.as_str())
        .bind(habit.frequency.frequency_type().as_str())
        .bind(Json(habit.frequency.frequency_value()))
        .bind(column(habit.streak))
        .bind(column(habit.longest_streak))
        .bind(habit.last_completed)
        .bind(habit.is_active)
        .bind(habit.is_archived)
        .bind(habit.goal)
        .bind(habit.metric_type.map(|m| m.as_str()))
        .bind(&habit.units)
        .bind(&habit.notes)
        .bind(habit.reminder_time)
        .bind(habit.reminder_enabled)
        .bind(habit.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Lock, mutate in Rust, write back, commit.
    async fn modify(
        &self,
        user: &UserId,
        id: Uuid,
        change: impl FnOnce(&mut Habit) + Send,
    ) -> Result<Habit, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut habit = Self::lock(&mut tx, user, id).await?;
        change(&mut habit);
        Self::store(&mut tx, &habit).await?;
        tx.commit().await?;
        Ok(habit)
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, user: &UserId, filter: &HabitFilter) {
    qb.push(" WHERE user_id = ").push_bind(user.as_str().to_owned());
    if let Some(category) = filter.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(active) = filter.active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    qb.push(" AND is_archived = ")
        .push_bind(filter.archived.unwrap_or(false));
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR notes ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, filter: &HabitFilter) {
    let key = match filter.sort {
        HabitSort::Name => "LOWER(name)",
        other => other.column(),
    };
    let dir = filter.order.sql();
    qb.push(format!(" ORDER BY {} {}, id {}", key, dir, dir));
}

#[async_trait]
impl HabitRepository for PgHabitRepo {
    /// Filtered page plus total in one query (`COUNT(*) OVER()`).
    async fn list(
        &self,
        user: &UserId,
        filter: &HabitFilter,
        page: Pagination,
    ) -> Result<Paginated<Habit>, DbError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT *, COUNT(*) OVER() AS total FROM habits");
        push_filter(&mut qb, user, filter);
        push_order(&mut qb, filter);
        qb.push(" LIMIT ")
            .push_bind(i64::from(page.limit()))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(&self.pool).await?;

        let mut total = 0;
        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            total = row.try_get::<i64, _>("total")?;
            items.push(Habit::try_from(HabitRow::from_row(row)?)?);
        }

        if items.is_empty() && page.page > 1 {
            // Past the last page: the window function saw no rows
            let mut counter = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM habits");
            push_filter(&mut counter, user, filter);
            total = counter.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        }

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    async fn list_all(&self, user: &UserId) -> Result<Vec<Habit>, DbError> {
        let rows = sqlx::query_as::<_, HabitRow>(
            "SELECT * FROM habits WHERE user_id = $1 ORDER BY created_at, id",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Habit::try_from).collect()
    }

    async fn get(&self, user: &UserId, id: Uuid) -> Result<Habit, DbError> {
        let row = sqlx::query_as::<_, HabitRow>(
            "SELECT * FROM habits WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found(RESOURCE, id))?;
        Habit::try_from(row)
    }

    async fn existing_ids(&self, user: &UserId, ids: &[Uuid]) -> Result<Vec<Uuid>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM habits WHERE user_id = $1 AND id = ANY($2)")
                .bind(user.as_str())
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.iter().copied().filter(|id| found.contains(id)).collect())
    }

    async fn create(&self, user: &UserId, new: NewHabit) -> Result<Habit, DbError> {
        let habit = Habit::from_new(Uuid::new_v4(), user.clone(), new, Utc::now());
        sqlx::query(
            r#"
            INSERT INTO habits (
                id, user_id, name, description, category, color,
                frequency_type, frequency_value, streak, longest_streak, last_completed,
                is_active, is_archived, goal, metric_type, units, notes,
                reminder_time, reminder_enabled, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 0, NULL, $9, FALSE,
                    $10, $11, $12, $13, $14, $15, $16, $16)
            "#,
        )
        .bind(habit.id)
        .bind(habit.user_id.as_str())
        .bind(&habit.name)
        .bind(&habit.description)
        .bind(habit.category.as_str())
        .bind(habit.color.as_str())
        .bind(habit.frequency.frequency_type().as_str())
        .bind(Json(habit.frequency.frequency_value()))
        .bind(habit.is_active)
        .bind(habit.goal)
        .bind(habit.metric_type.map(|m| m.as_str()))
        .bind(&habit.units)
        .bind(&habit.notes)
        .bind(habit.reminder_time)
        .bind(habit.reminder_enabled)
        .bind(habit.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(habit_id = %habit.id, "habit created");
        Ok(habit)
    }

    async fn update(&self, user: &UserId, id: Uuid, patch: HabitPatch) -> Result<Habit, DbError> {
        let now = Utc::now();
        self.modify(user, id, move |habit| habit.apply(patch, now))
            .await
    }

    async fn set_archived(
        &self,
        user: &UserId,
        id: Uuid,
        archived: bool,
    ) -> Result<Habit, DbError> {
        let now = Utc::now();
        self.modify(user, id, move |habit| habit.set_archived(archived, now))
            .await
    }

    async fn set_streak(
        &self,
        user: &UserId,
        id: Uuid,
        fields: StreakFields,
    ) -> Result<Habit, DbError> {
        self.modify(user, id, move |habit| {
            habit.streak = fields.streak;
            habit.longest_streak = fields.longest_streak;
            habit.last_completed = fields.last_completed;
        })
        .await
    }

    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM habits WHERE id = $1 AND user_id = $2")
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

#[cfg(test)]
mod tests {
    use super::*;
    use habit_core::models::SortOrder;

    #[test]
    fn list_query_shape() {
        let filter = HabitFilter {
            category: Some(HabitCategory::Fitness),
            search: Some("run".into()),
            sort: HabitSort::Name,
            order: SortOrder::Asc,
            ..HabitFilter::default()
        };
        let user = UserId::new("user_1").unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM habits");
        push_filter(&mut qb, &user, &filter);
        push_order(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("category = $2"));
        assert!(sql.contains("is_archived = $3"));
        assert!(sql.contains("name ILIKE $4"));
        assert!(sql.ends_with("ORDER BY LOWER(name) ASC, id ASC"));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn create_then_get() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        crate::db::migrations::run(&pool).await.expect("migrate");

        let repo = PgHabitRepo::new(pool);
        let user = UserId::new("db_test_user").unwrap();
        let habit = repo
            .create(
                &user,
                NewHabit {
                    name: habit_core::models::Name::new("name", "Stretch").unwrap(),
                    description: None,
                    category: HabitCategory::Fitness,
                    color: HabitColor::Green,
                    frequency: Frequency::WeeklyTimes(3),
                    is_active: true,
                    goal: None,
                    metric_type: None,
                    units: None,
                    notes: None,
                    reminder_time: None,
                    reminder_enabled: false,
                },
            )
            .await
            .expect("create");

        let loaded = repo.get(&user, habit.id).await.expect("get");
        assert_eq!(loaded.frequency, Frequency::WeeklyTimes(3));
        repo.delete(&user, habit.id).await.expect("delete");
    }
}
