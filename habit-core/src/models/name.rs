//! Display names for habits and goals

use serde::Serialize;

use super::ValidationError;

/// Maximum length for habit and goal names
pub const MAX_NAME_LEN: usize = 100;

/// Validated, trimmed display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Create a name for `field`.
    ///
    /// # Rules
    /// - Non-empty after trimming whitespace
    /// - Max 100 characters
    ///
    /// # Example
    /// ```
    /// use habit_core::models::Name;
    ///
    /// assert!(Name::new("name", "Morning run").is_ok());
    /// assert!(Name::new("name", "   ").is_err());
    /// ```
    pub fn new(field: &'static str, s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field });
        }

        if trimmed.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_NAME_LEN,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
