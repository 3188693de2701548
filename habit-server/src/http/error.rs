//! API error type with IntoResponse
//!
//! Every failure renders as `{"error": {"code", "message", "issues"?}}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use habit_core::models::{Issue, ValidationError, ValidationErrors};
use serde::Serialize;

use crate::auth::AuthError;
use crate::services::ServiceError;
use crate::store::DbError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400, with issues)
    Validation(ValidationErrors),

    /// Malformed request: bad JSON, query or path (400)
    BadRequest { code: &'static str, message: String },

    /// Missing or invalid credentials (401)
    Unauthorized { reason: String },

    /// Resource missing or owned by someone else (404)
    NotFound { resource: &'static str, id: String },

    /// Constraint conflict (409)
    Conflict { message: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500, logged)
    Internal { message: String },
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<Issue>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody<'_> {
        let (code, message, issues) = match self {
            Self::Validation(errs) => (
                "validation_error",
                errs.to_string(),
                Some(errs.issues()),
            ),
            Self::BadRequest { code, message } => (*code, message.clone(), None),
            Self::Unauthorized { .. } => (
                "unauthorized",
                "authentication required".to_owned(),
                None,
            ),
            Self::NotFound { resource, id } => (
                "not_found",
                format!("{} '{}' not found", resource, id),
                None,
            ),
            Self::Conflict { message } => ("conflict", message.clone(), None),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                ("internal_error", "an internal error occurred".to_owned(), None)
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                ("internal_error", "an internal error occurred".to_owned(), None)
            }
        };
        ErrorBody {
            code,
            message,
            issues,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Unauthorized { reason } = &self {
            tracing::debug!(%reason, "request rejected");
        }
        let status = self.status();
        (status, Json(ErrorEnvelope { error: self.body() })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.into())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Rejected(e) => Self::Validation(e.into()),
            DbError::Sqlx(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
                Self::Conflict {
                    message: "resource already exists".to_owned(),
                }
            }
            _ => Self::Database(e),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(errs) => Self::Validation(errs),
            ServiceError::Db(db) => db.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken | AuthError::InvalidToken(_) => Self::Unauthorized {
                reason: e.to_string(),
            },
            AuthError::KeySet(_) => Self::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::BadRequest {
            code: "invalid_json",
            message: e.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest {
            code: "invalid_query",
            message: e.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::BadRequest {
            code: "invalid_path",
            message: e.body_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_error_is_400_with_issues() {
        let err = ApiError::from(ValidationError::InvalidVariant {
            field: "category",
            value: "sleep".into(),
        });
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["issues"][0]["field"], "category");
    }

    #[tokio::test]
    async fn not_found_is_404() {
        let err = ApiError::from(DbError::NotFound {
            resource: "goal",
            id: "g1".into(),
        });
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
        assert!(body["error"].get("issues").is_none());
    }

    #[tokio::test]
    async fn rejected_change_is_400() {
        let err = ApiError::from(DbError::Rejected(ValidationError::Invalid {
            field: "increment",
            reason: "progress must stay a finite number".into(),
        }));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["issues"][0]["field"], "increment");
    }

    #[tokio::test]
    async fn unauthorized_hides_reason() {
        let err = ApiError::from(AuthError::InvalidToken("bad signature".into()));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "unauthorized");
        assert_eq!(body["error"]["message"], "authentication required");
    }

    #[tokio::test]
    async fn internal_errors_are_generic() {
        let err = ApiError::from(DbError::Corrupt {
            resource: "habit",
            id: "h1".into(),
            reason: "bad category".into(),
        });
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "an internal error occurred");
    }

    #[test]
    fn conflict_is_409() {
        let err = ApiError::Conflict {
            message: "exists".into(),
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
