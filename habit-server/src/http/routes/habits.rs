//! Habit endpoints
//!
//! Request bodies arrive as loose DTOs and are validated field by field,
//! so a bad request reports every problem at once.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use habit_core::models::habit::{MAX_DESCRIPTION_LEN, MAX_NOTES_LEN, MAX_UNITS_LEN};
use habit_core::models::{
    optional_text, parse_reminder_time, Frequency, FrequencyInput, HabitCategory, HabitColor,
    HabitFilter, HabitPatch, HabitSort, Issues, MetricType, Name, NewHabit, Pagination,
    PaginationParams, SortOrder, ValidationError, ValidationErrors,
};
use serde::Deserialize;
use uuid::Uuid;

use super::nullable;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ClientTz, ValidJson, ValidPath, ValidQuery};
use crate::http::response::{Created, Data, Page};
use crate::http::server::AppState;
use crate::services::HabitService;

/// Longest free-text search accepted
const MAX_SEARCH_LEN: usize = habit_core::models::filter::MAX_SEARCH_LEN;

/// Per-completion target must be positive and finite.
fn positive_goal(value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::Invalid {
            field: "goal",
            reason: "must be a positive number".to_owned(),
        })
    }
}

/// POST /api/habits body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHabitRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub frequency: Option<FrequencyInput>,
    pub is_active: Option<bool>,
    pub goal: Option<f64>,
    pub metric_type: Option<String>,
    pub units: Option<String>,
    pub notes: Option<String>,
    pub reminder_time: Option<String>,
    pub reminder_enabled: Option<bool>,
}

impl CreateHabitRequest {
    pub fn validate(self) -> Result<NewHabit, ValidationErrors> {
        let mut issues = Issues::new();

        let name = issues.check(Name::new("name", self.name.as_deref().unwrap_or_default()));
        let description = issues
            .check(optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN))
            .flatten();
        let category = match self.category.as_deref() {
            Some(raw) => issues.check(HabitCategory::parse(raw)),
            None => {
                issues.push(ValidationError::Empty { field: "category" });
                None
            }
        };
        let color = match self.color.as_deref() {
            Some(raw) => issues.check(HabitColor::parse(raw)),
            None => Some(HabitColor::Blue),
        };
        let frequency = match &self.frequency {
            Some(input) => issues.check(Frequency::from_input(input)),
            None => {
                issues.push(ValidationError::Empty { field: "frequency" });
                None
            }
        };
        let goal = issues
            .check(self.goal.map(positive_goal).transpose())
            .flatten();
        let metric_type = issues
            .check(self.metric_type.as_deref().map(MetricType::parse).transpose())
            .flatten();
        let units = issues
            .check(optional_text("units", self.units.as_deref(), MAX_UNITS_LEN))
            .flatten();
        let notes = issues
            .check(optional_text("notes", self.notes.as_deref(), MAX_NOTES_LEN))
            .flatten();
        let reminder_time = issues
            .check(self.reminder_time.as_deref().map(parse_reminder_time).transpose())
            .flatten();

        issues.finish()?;
        // Every missing required field was recorded above
        let (Some(name), Some(category), Some(color), Some(frequency)) =
            (name, category, color, frequency)
        else {
            return Err(ValidationError::Invalid {
                field: "body",
                reason: "incomplete habit".to_owned(),
            }
            .into());
        };

        Ok(NewHabit {
            name,
            description,
            category,
            color,
            frequency,
            is_active: self.is_active.unwrap_or(true),
            goal,
            metric_type,
            units,
            notes,
            reminder_enabled: self.reminder_enabled.unwrap_or(reminder_time.is_some()),
            reminder_time,
        })
    }
}

/// PUT /api/habits/{id} body; absent fields are left alone, `null` clears
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHabitRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub frequency: Option<FrequencyInput>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub goal: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub metric_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub units: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub reminder_time: Option<Option<String>>,
    pub reminder_enabled: Option<bool>,
}

impl UpdateHabitRequest {
    pub fn validate(self) -> Result<HabitPatch, ValidationErrors> {
        let mut issues = Issues::new();

        let patch = HabitPatch {
            name: self
                .name
                .as_deref()
                .and_then(|n| issues.check(Name::new("name", n))),
            description: self.description.and_then(|d| {
                issues.check(optional_text("description", d.as_deref(), MAX_DESCRIPTION_LEN))
            }),
            category: self
                .category
                .as_deref()
                .and_then(|c| issues.check(HabitCategory::parse(c))),
            color: self
                .color
                .as_deref()
                .and_then(|c| issues.check(HabitColor::parse(c))),
            frequency: self
                .frequency
                .as_ref()
                .and_then(|f| issues.check(Frequency::from_input(f))),
            is_active: self.is_active,
            goal: self
                .goal
                .and_then(|g| issues.check(g.map(positive_goal).transpose())),
            metric_type: self
                .metric_type
                .and_then(|m| issues.check(m.as_deref().map(MetricType::parse).transpose())),
            units: self
                .units
                .and_then(|u| issues.check(optional_text("units", u.as_deref(), MAX_UNITS_LEN))),
            notes: self
                .notes
                .and_then(|n| issues.check(optional_text("notes", n.as_deref(), MAX_NOTES_LEN))),
            reminder_time: self.reminder_time.and_then(|r| {
                issues.check(r.as_deref().map(parse_reminder_time).transpose())
            }),
            reminder_enabled: self.reminder_enabled,
        };

        issues.finish()?;
        if patch.is_empty() {
            return Err(ValidationError::Invalid {
                field: "body",
                reason: "no fields to update".to_owned(),
            }
            .into());
        }
        Ok(patch)
    }
}

/// GET /api/habits query
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListHabitsQuery {
    pub page: Option<u32>,
    #[serde(alias = "per_page", alias = "limit")]
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub active: Option<bool>,
    pub archived: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ListHabitsQuery {
    pub fn validate(self) -> Result<(HabitFilter, Pagination), ValidationErrors> {
        let mut issues = Issues::new();
        let defaults = HabitFilter::default();

        let filter = HabitFilter {
            category: self
                .category
                .as_deref()
                .and_then(|c| issues.check(HabitCategory::parse(c))),
            active: self.active,
            archived: self.archived,
            search: self
                .search
                .as_deref()
                .and_then(|s| issues.check(optional_text("search", Some(s), MAX_SEARCH_LEN)))
                .flatten(),
            sort: self
                .sort
                .as_deref()
                .and_then(|s| issues.check(HabitSort::parse_loose(s)))
                .unwrap_or(defaults.sort),
            order: self
                .order
                .as_deref()
                .and_then(|o| issues.check(SortOrder::parse(o)))
                .unwrap_or(defaults.order),
        };
        issues.finish()?;

        let page = Pagination::from(PaginationParams {
            page: self.page,
            per_page: self.per_page,
        });
        Ok((filter, page))
    }
}

/// POST /api/habits/{id}/toggle query
#[derive(Debug, Default, Deserialize)]
pub struct ToggleQuery {
    /// Local date to toggle, `YYYY-MM-DD`; today when absent
    pub date: Option<NaiveDate>,
}

/// GET /api/habits
async fn list_habits(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<ListHabitsQuery>,
) -> Result<Page<habit_core::models::Habit>, ApiError> {
    let (filter, page) = query.validate()?;
    let habits = HabitService::new(&state.repos)
        .list(&user, &filter, page)
        .await?;
    Ok(Page(habits))
}

/// POST /api/habits
async fn create_habit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidJson(req): ValidJson<CreateHabitRequest>,
) -> Result<Created<habit_core::models::Habit>, ApiError> {
    let new = req.validate()?;
    let habit = HabitService::new(&state.repos).create(&user, new).await?;
    Ok(Created(habit))
}

/// GET /api/habits/today
async fn habits_today(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
) -> Result<Data<Vec<crate::services::TodayHabit>>, ApiError> {
    let due = HabitService::new(&state.repos).today(&user, tz).await?;
    Ok(Data(due))
}

/// GET /api/habits/{id}
async fn get_habit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Data<habit_core::models::Habit>, ApiError> {
    Ok(Data(HabitService::new(&state.repos).get(&user, id).await?))
}

/// PUT /api/habits/{id}
async fn update_habit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateHabitRequest>,
) -> Result<Data<habit_core::models::Habit>, ApiError> {
    let patch = req.validate()?;
    let habit = HabitService::new(&state.repos)
        .update(&user, id, patch, tz)
        .await?;
    Ok(Data(habit))
}

/// DELETE /api/habits/{id}
async fn delete_habit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    HabitService::new(&state.repos).delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/habits/{id}/archive
async fn archive_habit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Data<habit_core::models::Habit>, ApiError> {
    let habit = HabitService::new(&state.repos)
        .set_archived(&user, id, true)
        .await?;
    Ok(Data(habit))
}

/// POST /api/habits/{id}/unarchive
async fn unarchive_habit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Data<habit_core::models::Habit>, ApiError> {
    let habit = HabitService::new(&state.repos)
        .set_archived(&user, id, false)
        .await?;
    Ok(Data(habit))
}

/// POST /api/habits/{id}/toggle
async fn toggle_habit(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientTz(tz): ClientTz,
    ValidPath(id): ValidPath<Uuid>,
    ValidQuery(query): ValidQuery<ToggleQuery>,
) -> Result<Data<crate::services::ToggleResult>, ApiError> {
    let result = HabitService::new(&state.repos)
        .toggle(&user, id, query.date, tz)
        .await?;
    Ok(Data(result))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/habits", get(list_habits).post(create_habit))
        .route("/api/habits/today", get(habits_today))
        .route(
            "/api/habits/{id}",
            get(get_habit).put(update_habit).delete(delete_habit),
        )
        .route("/api/habits/{id}/archive", post(archive_habit))
        .route("/api/habits/{id}/unarchive", post(unarchive_habit))
        .route("/api/habits/{id}/toggle", post(toggle_habit))
}
