//! PostgreSQL implementations of the repository traits
//!
//! Each repository follows these patterns:
//! - Rows map into domain types through `TryFrom`; a row that fails
//!   validation surfaces as `DbError::Corrupt`
//! - Every statement filters on `user_id`
//! - Read-modify-write updates lock the row (`SELECT ... FOR UPDATE`)

pub mod goals;
pub mod habits;
pub mod logs;

use std::fmt::Display;

pub use goals::PgGoalRepo;
pub use habits::PgHabitRepo;
pub use logs::PgLogRepo;

use crate::store::DbError;

pub(crate) fn corrupt(resource: &'static str, id: impl Display, reason: impl Display) -> DbError {
    DbError::Corrupt {
        resource,
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

/// Counter column to domain value
pub(crate) fn count(resource: &'static str, id: impl Display, value: i32) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| corrupt(resource, id, format!("negative counter {}", value)))
}

/// Domain counter to column value, saturating
pub(crate) fn column(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Escape `%`, `_` and `\` for a LIKE pattern.
pub(crate) fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
