//! Habit log endpoints, nested under their habit

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use habit_core::models::habit::MAX_NOTES_LEN;
use habit_core::models::log::{completed_at, details, photo_url};
use habit_core::models::{
    bounded_number, calendar_date, optional_text, Difficulty, Feeling, HabitLog, Issues, LogPatch, NewHabitLog,
    TimeRange, ValidationError, ValidationErrors,
};
use serde::Deserialize;
use uuid::Uuid;

use super::nullable;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ClientTz, ValidJson, ValidPath, ValidQuery};
use crate::http::response::{Created, Data};
use crate::http::server::AppState;
use crate::services::LogService;

fn log_value(v: f64) -> Result<f64, ValidationError> {
    bounded_number("value", v, 0.0, f64::MAX)
}

fn difficulty(v: i64) -> Result<Difficulty, ValidationError> {
    Difficulty::new(v)
}

/// POST /api/habits/{id}/logs body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    pub completed_at: Option<DateTime<Utc>>,
    pub value: Option<f64>,
    pub notes: Option<String>,
    pub details: Option<serde_json::Value>,
    pub difficulty: Option<i64>,
    pub feeling: Option<String>,
    pub photo_url: Option<String>,
}

impl CreateLogRequest {
    pub fn validate(self, habit_id: Uuid, now: DateTime<Utc>) -> Result<NewHabitLog, ValidationErrors> {
        let mut issues = Issues::new();
        let new = NewHabitLog {
            habit_id,
            completed_at: issues
                .check(completed_at(self.completed_at.unwrap_or(now), now))
                .unwrap_or(now),
            value: issues.check(self.value.map(log_value).transpose()).flatten(),
            notes: issues
                .check(optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN))
                .flatten(),
            details: issues.check(self.details.map(details).transpose()).flatten(),
            difficulty: issues.check(self.difficulty.map(difficulty).transpose()).flatten(),
            feeling: issues
                .check(self.feeling.as_deref().map(Feeling::parse).transpose())
                .flatten(),
            photo_url: issues
                .check(self.photo_url.as_deref().map(photo_url).transpose())
                .flatten(),
        };
        issues.finish()?;
        Ok(new)
    }
}

/// PUT /api/habits/{id}/logs/{log_id} body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLogRequest {
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub value: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub details: Option<Option<serde_json::Value>>,
    #[serde(default, deserialize_with = "nullable")]
    pub difficulty: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub feeling: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_url: Option<Option<String>>,
}

impl UpdateLogRequest {
    pub fn validate(self, now: DateTime<Utc>) -> Result<LogPatch, ValidationErrors> {
        let mut issues = Issues::new();
        let patch = LogPatch {
            completed_at: self
                .completed_at
                .and_then(|at| issues.check(completed_at(at, now))),
            value: self
                .value
                .and_then(|v| issues.check(v.map(log_value).transpose())),
            notes: self.notes.and_then(|n| {
                issues.check(optional_text("notes", n.as_deref(), MAX_NOTES_LEN))
            }),
            details: self
                .details
                .and_then(|d| issues.check(d.map(details).transpose())),
            difficulty: self
                .difficulty
                .and_then(|d| issues.check(d.map(difficulty).transpose())),
            feeling: self
                .feeling
                .and_then(|f| issues.check(f.as_deref().map(Feeling::parse).transpose())),
            photo_url: self
                .photo_url
                .and_then(|p| issues.check(p.as_deref().map(photo_url).transpose())),
        };
        issues.finish()?;
        if patch == LogPatch::default() {
            return Err(ValidationError::Invalid {
                field: "body",
                reason: "no fields to update".to_owned(),
            }
            .into());
        }
        Ok(patch)
    }
}

/// GET /api/habits/{id}/logs query; both bounds are inclusive local dates
#[derive(Debug, Default, Deserialize)]
pub struct LogRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl LogRangeQuery {
    pub fn range(&self, tz: chrono_tz::Tz) -> Result<TimeRange, ValidationError> {
        if let Some(from) = self.from {
            calendar_date("from", from)?;
        }
        if let Some(to) = self.to {
            calendar_date("to", to)?;
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::Invalid {
                    field: "from",
                    reason: "must not be after 'to'".to_owned(),
                });
            }
        }
        Ok(TimeRange {
            start: self.from.and_then(|d| TimeRange::local_day(d, tz).start),
            end: self.to.and_then(|d| TimeRange::local_day(d, tz).end),
        })
    }
}

/// GET /api/habits/{id}/logs
async fn list_logs(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
    ValidPath(habit_id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<LogRangeQuery>,
) -> Result<Data<Vec<HabitLog>>, ApiError> {
    let range = query.range(tz)?;
    let logs = LogService::new(&state.repos)
        .list(&user, habit_id, range)
        .await?;
    Ok(Data(logs))
}

/// POST /api/habits/{id}/logs
async fn create_log(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
    ValidPath(habit_id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<CreateLogRequest>,
) -> Result<Created<HabitLog>, ApiError> {
    let new = req.validate(habit_id, Utc::now())?;
    let log = LogService::new(&state.repos).create(&user, new, tz).await?;
    Ok(Created(log))
}

/// PUT /api/habits/{id}/logs/{log_id}
async fn update_log(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
    ValidPath((habit_id, log_id)): ValidPath<(Uuid, Uuid)>,
    ValidJson(req): ValidJson<UpdateLogRequest>,
) -> Result<Data<HabitLog>, ApiError> {
    let patch = req.validate(Utc::now())?;
    let log = LogService::new(&state.repos)
        .update(&user, habit_id, log_id, patch, tz)
        .await?;
    Ok(Data(log))
}

/// DELETE /api/habits/{id}/logs/{log_id}
async fn delete_log(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
    ValidPath((habit_id, log_id)): ValidPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    LogService::new(&state.repos)
        .delete(&user, habit_id, log_id, tz)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/habits/{id}/logs", get(list_logs).post(create_log))
        .route(
            "/api/habits/{id}/logs/{log_id}",
            put(update_log).delete(delete_log),
        )
}
