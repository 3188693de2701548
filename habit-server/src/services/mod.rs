//! Use cases
//!
//! Services take validated domain input, enforce the cross-row rules
//! (ownership, linked habits, streak upkeep) and call the repositories.

pub mod analytics;
pub mod goals;
pub mod habits;
pub mod logs;

use habit_core::models::{ValidationError, ValidationErrors};

use crate::store::DbError;

pub use analytics::{AnalyticsQuery, AnalyticsService};
pub use goals::GoalService;
pub use habits::{HabitService, TodayHabit, ToggleResult};
pub use logs::LogService;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
