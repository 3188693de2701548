//! habit-core: domain model for Habit Hero
//!
//! Validated habit, log and goal types, frequency rules, and the streak
//! and completion-rate computations that run over a user's history.
//! Nothing here touches the network or the database.

pub mod analytics;
pub mod config;
pub mod models;
pub mod schedule;
pub mod streak;

pub use analytics::{CompletionReport, Dashboard, Granularity, HabitSeries, HabitStreakSummary};
pub use config::{AuthMode, ConfigError, HeroConfig};
pub use schedule::{DayStatus, History, Period};
pub use streak::StreakBreak;
