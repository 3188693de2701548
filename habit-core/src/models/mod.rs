//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod name;
pub mod user;
pub mod frequency;
pub mod habit;
pub mod log;
pub mod goal;
pub mod filter;
pub mod pagination;
pub mod range;

pub use validation::{bounded_number, optional_text, Issue, Issues, ValidationError, ValidationErrors};
pub use name::Name;
pub use user::UserId;
pub use frequency::{DayRef, Frequency, FrequencyInput, FrequencyType, FrequencyValue};
pub use habit::{
    parse_reminder_time, Habit, HabitCategory, HabitColor, HabitPatch, MetricType, NewHabit,
    StreakFields,
};
pub use log::{Difficulty, Feeling, HabitLog, LogPatch, NewHabitLog};
pub use goal::{Goal, GoalPatch, NewGoal, Progress, RelatedHabit, Relationship};
pub use filter::{HabitFilter, HabitSort, SortOrder};
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use range::{calendar_date, local_midnight, local_noon, TimeRange};
