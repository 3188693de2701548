//! Validation error types
//!
//! Input is validated when domain values are constructed. A request that
//! fails on several fields reports every failure, so the single-field
//! [`ValidationError`] is collected into [`ValidationErrors`] through an
//! [`Issues`] accumulator.

use std::fmt;

use serde::Serialize;

/// Validation failure for a single field
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field is empty when it shouldn't be
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// String doesn't match required format
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Invalid enum variant
    InvalidVariant { field: &'static str, value: String },

    /// Numeric value outside the accepted range
    OutOfRange { field: &'static str, min: f64, max: f64 },

    /// Value refers to something the caller cannot use
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field }
            | Self::TooLong { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::InvalidVariant { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::Invalid { field, .. } => field,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => {
                write!(f, "{}: {}", field, reason)
            }
            Self::InvalidVariant { field, value } => {
                write!(f, "invalid {} value: '{}'", field, value)
            }
            Self::OutOfRange { field, min, max } => {
                write!(f, "{} must be between {} and {}", field, min, max)
            }
            Self::Invalid { field, reason } => write!(f, "{}: {}", field, reason),
        }
    }
}

impl std::error::Error for ValidationError {}

/// One entry of a validation report, as sent to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub field: &'static str,
    pub message: String,
}

/// All validation failures of one request
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.0
            .iter()
            .map(|e| Issue {
                field: e.field(),
                message: e.to_string(),
            })
            .collect()
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(e: ValidationError) -> Self {
        Self(vec![e])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Accumulates field errors while a request is converted to domain values.
///
/// ```
/// use habit_core::models::{Issues, Name};
///
/// let mut issues = Issues::new();
/// let name = issues.check(Name::new("name", "  "));
/// assert!(name.is_none());
/// assert!(issues.finish().is_err());
/// ```
#[derive(Debug, Default)]
pub struct Issues(Vec<ValidationError>);

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the error, if any, and hand back the value otherwise.
    pub fn check<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.0.push(e);
                None
            }
        }
    }

    pub fn push(&mut self, e: ValidationError) {
        self.0.push(e);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(self.0))
        }
    }
}

/// Trim optional free text; blank becomes `None`.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(Some(trimmed.to_owned()))
}

/// Reject NaN, infinities and values outside `min..=max`.
pub fn bounded_number(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::OutOfRange { field, min, max });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "name",
            max: 100,
        };
        assert_eq!(err.to_string(), "name exceeds maximum length of 100 characters");
    }

    #[test]
    fn issues_collects_every_failure() {
        let mut issues = Issues::new();
        issues.check::<()>(Err(ValidationError::Empty { field: "name" }));
        issues.check::<()>(Err(ValidationError::InvalidVariant {
            field: "category",
            value: "sleep".into(),
        }));
        let errs = issues.finish().unwrap_err();
        let fields: Vec<_> = errs.issues().into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["name", "category"]);
    }

    #[test]
    fn optional_text_blank_is_none() {
        assert_eq!(optional_text("notes", Some("   "), 10).unwrap(), None);
        assert_eq!(
            optional_text("notes", Some(" hi "), 10).unwrap().as_deref(),
            Some("hi")
        );
        assert!(optional_text("notes", Some("abcdefghijk"), 10).is_err());
    }

    #[test]
    fn bounded_number_rejects_nan() {
        assert!(bounded_number("value", f64::NAN, 0.0, 10.0).is_err());
        assert!(bounded_number("value", -1.0, 0.0, 10.0).is_err());
        assert_eq!(bounded_number("value", 3.5, 0.0, 10.0).unwrap(), 3.5);
    }
}
