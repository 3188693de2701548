//! Authenticated user identity

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Longest subject identifier accepted from the session provider
const MAX_USER_ID_LEN: usize = 191;

/// Opaque user id issued by the session provider (the token `sub`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        if s.is_empty() {
            return Err(ValidationError::Empty { field: "userId" });
        }
        if s.len() > MAX_USER_ID_LEN {
            return Err(ValidationError::TooLong {
                field: "userId",
                max: MAX_USER_ID_LEN,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidFormat {
                field: "userId",
                reason: "must not contain whitespace",
            });
        }
        Ok(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_clerk_ids() {
        assert!(UserId::new("user_2abcDEF123").is_ok());
    }

    #[test]
    fn rejects_empty_and_spaces() {
        assert!(matches!(UserId::new(""), Err(ValidationError::Empty { .. })));
        assert!(UserId::new("user 1").is_err());
    }
}
