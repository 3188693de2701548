//! Analytics endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use habit_core::analytics::{CompletionReport, Dashboard, Granularity, HabitStreakSummary};
use habit_core::models::{calendar_date, Issues, ValidationError, ValidationErrors};
use serde::Deserialize;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ClientTz, ValidQuery};
use crate::http::response::Data;
use crate::http::server::AppState;
use crate::services::{AnalyticsQuery, AnalyticsService};

/// Raw report parameters; parsed here so every bad field is reported
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsParams {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(alias = "group_by")]
    pub group_by: Option<String>,
    #[serde(alias = "habit_id")]
    pub habit_id: Option<String>,
}

fn date(field: &'static str, raw: &str) -> Result<NaiveDate, ValidationError> {
    let parsed = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field,
            reason: "expected YYYY-MM-DD",
        }
    })?;
    calendar_date(field, parsed)
}

impl AnalyticsParams {
    pub fn validate(self) -> Result<AnalyticsQuery, ValidationErrors> {
        let mut issues = Issues::new();
        let query = AnalyticsQuery {
            from: self
                .from
                .as_deref()
                .and_then(|f| issues.check(date("from", f))),
            to: self.to.as_deref().and_then(|t| issues.check(date("to", t))),
            group_by: self
                .group_by
                .as_deref()
                .and_then(|g| issues.check(Granularity::parse(g))),
            habit_id: self.habit_id.as_deref().and_then(|h| {
                issues.check(Uuid::parse_str(h.trim()).map_err(|_| {
                    ValidationError::InvalidFormat {
                        field: "habitId",
                        reason: "expected a UUID",
                    }
                }))
            }),
        };
        issues.finish()?;
        Ok(query)
    }
}

/// GET /api/analytics/completion
async fn completion(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
    ValidQuery(params): ValidQuery<AnalyticsParams>,
) -> Result<Data<CompletionReport>, ApiError> {
    let query = params.validate()?;
    let report = AnalyticsService::new(&state.repos)
        .completion(&user, &query, tz)
        .await?;
    Ok(Data(report))
}

/// GET /api/analytics/streaks
async fn streaks(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
    ValidQuery(params): ValidQuery<AnalyticsParams>,
) -> Result<Data<Vec<HabitStreakSummary>>, ApiError> {
    let query = params.validate()?;
    let summaries = AnalyticsService::new(&state.repos)
        .streaks(&user, &query, tz)
        .await?;
    Ok(Data(summaries))
}

/// GET /api/analytics/dashboard
async fn dashboard(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
) -> Result<Data<Dashboard>, ApiError> {
    let dashboard = AnalyticsService::new(&state.repos)
        .dashboard(&user, tz)
        .await?;
    Ok(Data(dashboard))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analytics/completion", get(completion))
        .route("/api/analytics/streaks", get(streaks))
        .route("/api/analytics/dashboard", get(dashboard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_fields() {
        let id = Uuid::new_v4();
        let query = AnalyticsParams {
            from: Some("2024-01-01".into()),
            to: Some("2024-01-31".into()),
            group_by: Some("Week".into()),
            habit_id: Some(id.to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(query.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(query.group_by, Some(Granularity::Week));
        assert_eq!(query.habit_id, Some(id));
    }

    #[test]
    fn reports_each_bad_field() {
        let errs = AnalyticsParams {
            from: Some("01/02/2024".into()),
            to: None,
            group_by: Some("year".into()),
            habit_id: Some("nope".into()),
        }
        .validate()
        .unwrap_err();
        let fields: Vec<_> = errs.issues().into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["from", "groupBy", "habitId"]);
    }

    #[test]
    fn dates_outside_supported_years_rejected() {
        let errs = AnalyticsParams {
            from: Some("1969-12-31".into()),
            to: Some("-262143-01-01".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        let fields: Vec<_> = errs.issues().into_iter().map(|i| i.field).collect();
        assert_eq!(fields, vec!["from", "to"]);
    }
}
