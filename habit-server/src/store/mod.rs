//! Repository traits
//!
//! Every call is scoped by the owning user: rows of other users behave
//! exactly like missing rows.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use habit_core::models::{
    Goal, GoalPatch, Habit, HabitFilter, HabitLog, HabitPatch, LogPatch, NewGoal, NewHabit,
    NewHabitLog, Paginated, Pagination, Progress, StreakFields, TimeRange, UserId,
    ValidationError,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::repos::{PgGoalRepo, PgHabitRepo, PgLogRepo};
pub use memory::MemoryStore;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// The change would leave the row invalid; nothing was written
    #[error("rejected: {0}")]
    Rejected(#[from] ValidationError),

    /// A stored row no longer passes domain validation
    #[error("corrupt {resource} row '{id}': {reason}")]
    Corrupt {
        resource: &'static str,
        id: String,
        reason: String,
    },
}

impl DbError {
    pub fn not_found(resource: &'static str, id: Uuid) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Result of toggling a habit for one day
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    /// Whether the day is completed after the toggle
    pub completed: bool,
    /// Log created by the toggle, if any
    pub log: Option<HabitLog>,
    /// Number of logs removed
    pub removed: u64,
}

#[async_trait]
pub trait HabitRepository: Send + Sync {
    async fn list(
        &self,
        user: &UserId,
        filter: &HabitFilter,
        page: Pagination,
    ) -> Result<Paginated<Habit>, DbError>;

    /// Every habit of the user, archived included
    async fn list_all(&self, user: &UserId) -> Result<Vec<Habit>, DbError>;

    async fn get(&self, user: &UserId, id: Uuid) -> Result<Habit, DbError>;

    /// Subset of `ids` owned by the user
    async fn existing_ids(&self, user: &UserId, ids: &[Uuid]) -> Result<Vec<Uuid>, DbError>;

    async fn create(&self, user: &UserId, new: NewHabit) -> Result<Habit, DbError>;

    async fn update(&self, user: &UserId, id: Uuid, patch: HabitPatch) -> Result<Habit, DbError>;

    async fn set_archived(&self, user: &UserId, id: Uuid, archived: bool)
        -> Result<Habit, DbError>;

    async fn set_streak(
        &self,
        user: &UserId,
        id: Uuid,
        fields: StreakFields,
    ) -> Result<Habit, DbError>;

    /// Hard delete; the habit's logs go with it
    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError>;
}

#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Logs of one habit in `range`, newest first
    async fn list_for_habit(
        &self,
        user: &UserId,
        habit_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<HabitLog>, DbError>;

    async fn list_for_user(&self, user: &UserId, range: TimeRange)
        -> Result<Vec<HabitLog>, DbError>;

    /// Completion timestamps of one habit, oldest first
    async fn completions(
        &self,
        user: &UserId,
        habit_id: Uuid,
    ) -> Result<Vec<DateTime<Utc>>, DbError>;

    async fn get(&self, user: &UserId, id: Uuid) -> Result<HabitLog, DbError>;

    async fn create(&self, user: &UserId, new: NewHabitLog) -> Result<HabitLog, DbError>;

    async fn update(&self, user: &UserId, id: Uuid, patch: LogPatch) -> Result<HabitLog, DbError>;

    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError>;

    /// Remove the habit's logs inside `day`, or add one at `at` when there
    /// are none. Atomic.
    async fn toggle(
        &self,
        user: &UserId,
        habit_id: Uuid,
        day: TimeRange,
        at: DateTime<Utc>,
    ) -> Result<ToggleOutcome, DbError>;
}

#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn list(
        &self,
        user: &UserId,
        completed: Option<bool>,
        page: Pagination,
    ) -> Result<Paginated<Goal>, DbError>;

    async fn list_all(&self, user: &UserId) -> Result<Vec<Goal>, DbError>;

    async fn get(&self, user: &UserId, id: Uuid) -> Result<Goal, DbError>;

    async fn create(&self, user: &UserId, new: NewGoal) -> Result<Goal, DbError>;

    async fn update(&self, user: &UserId, id: Uuid, patch: GoalPatch) -> Result<Goal, DbError>;

    async fn save_progress(
        &self,
        user: &UserId,
        id: Uuid,
        progress: Progress,
    ) -> Result<Goal, DbError>;

    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError>;
}

/// The three repositories behind the services
#[derive(Clone)]
pub struct Repositories {
    pub habits: Arc<dyn HabitRepository>,
    pub logs: Arc<dyn LogRepository>,
    pub goals: Arc<dyn GoalRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            habits: Arc::new(PgHabitRepo::new(pool.clone())),
            logs: Arc::new(PgLogRepo::new(pool.clone())),
            goals: Arc::new(PgGoalRepo::new(pool)),
        }
    }

    /// Fresh, empty in-memory store
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            habits: store.clone(),
            logs: store.clone(),
            goals: store,
        }
    }
}
