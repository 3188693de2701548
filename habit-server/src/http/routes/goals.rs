//! Goal endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use habit_core::models::goal::dedup_related;
use habit_core::models::habit::{MAX_DESCRIPTION_LEN, MAX_UNITS_LEN};
use habit_core::models::{
    bounded_number, optional_text, Goal, GoalPatch, Issues, Name, NewGoal, Pagination,
    PaginationParams, Progress, RelatedHabit, Relationship, ValidationError, ValidationErrors,
};
use serde::Deserialize;
use uuid::Uuid;

use super::nullable;
use crate::http::error::ApiError;
use crate::http::extractors::{AuthUser, ValidJson, ValidPath, ValidQuery};
use crate::http::response::{Created, Data, Page};
use crate::http::server::AppState;
use crate::services::GoalService;

fn finite(field: &'static str) -> impl Fn(f64) -> Result<f64, ValidationError> {
    move |v| bounded_number(field, v, f64::MIN, f64::MAX)
}

/// Link as sent by clients; the relationship defaults to supporting
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedHabitInput {
    pub habit_id: Uuid,
    pub relationship: Option<String>,
}

fn related(links: Vec<RelatedHabitInput>) -> Result<Vec<RelatedHabit>, ValidationError> {
    let links = links
        .into_iter()
        .map(|link| {
            let relationship = match link.relationship.as_deref() {
                Some(raw) => Relationship::parse(raw)?,
                None => Relationship::Supporting,
            };
            Ok(RelatedHabit {
                habit_id: link.habit_id,
                relationship,
            })
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;
    Ok(dedup_related(links))
}

/// POST /api/goals body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub start_value: Option<f64>,
    pub unit: Option<String>,
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub related_habits: Vec<RelatedHabitInput>,
    pub is_completed: Option<bool>,
}

impl CreateGoalRequest {
    pub fn validate(self) -> Result<NewGoal, ValidationErrors> {
        let mut issues = Issues::new();
        let name = issues.check(Name::new("name", self.name.as_deref().unwrap_or_default()));
        let description = issues
            .check(optional_text("description", self.description.as_deref(), MAX_DESCRIPTION_LEN))
            .flatten();
        let target_value = issues
            .check(self.target_value.map(finite("targetValue")).transpose())
            .flatten();
        let current_value = issues
            .check(self.current_value.map(finite("currentValue")).transpose())
            .flatten();
        let start_value = issues
            .check(self.start_value.map(finite("startValue")).transpose())
            .flatten();
        let unit = issues
            .check(optional_text("unit", self.unit.as_deref(), MAX_UNITS_LEN))
            .flatten();
        let related_habits = issues.check(related(self.related_habits)).unwrap_or_default();

        issues.finish()?;
        let Some(name) = name else {
            return Err(ValidationError::Empty { field: "name" }.into());
        };
        Ok(NewGoal {
            name,
            description,
            target_value,
            current_value,
            start_value,
            unit,
            deadline: self.deadline,
            related_habits,
            is_completed: self.is_completed.unwrap_or(false),
        })
    }
}

/// PUT /api/goals/{id} body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub target_value: Option<Option<f64>>,
    pub current_value: Option<f64>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_value: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub unit: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub deadline: Option<Option<NaiveDate>>,
    pub related_habits: Option<Vec<RelatedHabitInput>>,
    pub is_completed: Option<bool>,
}

impl UpdateGoalRequest {
    pub fn validate(self) -> Result<GoalPatch, ValidationErrors> {
        let mut issues = Issues::new();
        let patch = GoalPatch {
            name: self
                .name
                .as_deref()
                .and_then(|n| issues.check(Name::new("name", n))),
            description: self.description.and_then(|d| {
                issues.check(optional_text("description", d.as_deref(), MAX_DESCRIPTION_LEN))
            }),
            target_value: self
                .target_value
                .and_then(|t| issues.check(t.map(finite("targetValue")).transpose())),
            current_value: self
                .current_value
                .and_then(|c| issues.check(finite("currentValue")(c))),
            start_value: self
                .start_value
                .and_then(|s| issues.check(s.map(finite("startValue")).transpose())),
            unit: self
                .unit
                .and_then(|u| issues.check(optional_text("unit", u.as_deref(), MAX_UNITS_LEN))),
            deadline: self.deadline,
            related_habits: self.related_habits.and_then(|r| issues.check(related(r))),
            is_completed: self.is_completed,
        };
        issues.finish()?;
        if patch == GoalPatch::default() {
            return Err(ValidationError::Invalid {
                field: "body",
                reason: "no fields to update".to_owned(),
            }
            .into());
        }
        Ok(patch)
    }
}

/// POST /api/goals/{id}/progress body: exactly one of `value` or `increment`
#[derive(Debug, Default, Deserialize)]
pub struct ProgressRequest {
    pub value: Option<f64>,
    pub increment: Option<f64>,
}

impl ProgressRequest {
    pub fn validate(self) -> Result<Progress, ValidationError> {
        match (self.value, self.increment) {
            (Some(v), None) => finite("value")(v).map(Progress::Set),
            (None, Some(d)) => finite("increment")(d).map(Progress::Increment),
            _ => Err(ValidationError::InvalidFormat {
                field: "value",
                reason: "send exactly one of value or increment",
            }),
        }
    }
}

/// GET /api/goals query
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGoalsQuery {
    pub page: Option<u32>,
    #[serde(alias = "per_page", alias = "limit")]
    pub per_page: Option<u32>,
    pub completed: Option<bool>,
}

/// GET /api/goals
async fn list_goals(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<ListGoalsQuery>,
) -> Result<Page<Goal>, ApiError> {
    let page = Pagination::from(PaginationParams {
        page: query.page,
        per_page: query.per_page,
    });
    let goals = GoalService::new(&state.repos)
        .list(&user, query.completed, page)
        .await?;
    Ok(Page(goals))
}

/// POST /api/goals
async fn create_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidJson(req): ValidJson<CreateGoalRequest>,
) -> Result<Created<Goal>, ApiError> {
    let new = req.validate()?;
    let goal = GoalService::new(&state.repos).create(&user, new).await?;
    Ok(Created(goal))
}

/// GET /api/goals/{id}
async fn get_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Data<Goal>, ApiError> {
    Ok(Data(GoalService::new(&state.repos).get(&user, id).await?))
}

/// PUT /api/goals/{id}
async fn update_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateGoalRequest>,
) -> Result<Data<Goal>, ApiError> {
    let patch = req.validate()?;
    let goal = GoalService::new(&state.repos)
        .update(&user, id, patch)
        .await?;
    Ok(Data(goal))
}

/// DELETE /api/goals/{id}
async fn delete_goal(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    GoalService::new(&state.repos).delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/goals/{id}/progress
async fn record_progress(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<ProgressRequest>,
) -> Result<Data<Goal>, ApiError> {
    let progress = req.validate()?;
    let goal = GoalService::new(&state.repos)
        .record_progress(&user, id, progress)
        .await?;
    Ok(Data(goal))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/goals", get(list_goals).post(create_goal))
        .route(
            "/api/goals/{id}",
            get(get_goal).put(update_goal).delete(delete_goal),
        )
        .route("/api/goals/{id}/progress", post(record_progress))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_defaults_relationship_and_dedups() {
        let habit = Uuid::new_v4();
        let req: CreateGoalRequest = serde_json::from_value(serde_json::json!({
            "name": "Run 100km",
            "targetValue": 100,
            "unit": "km",
            "deadline": "2024-12-31",
            "relatedHabits": [
                {"habitId": habit},
                {"habitId": habit, "relationship": "primary"}
            ]
        }))
        .unwrap();
        let new = req.validate().unwrap();
        assert_eq!(new.related_habits.len(), 1);
        assert_eq!(new.related_habits[0].relationship, Relationship::Supporting);
        assert_eq!(new.deadline, NaiveDate::from_ymd_opt(2024, 12, 31));
        assert!(!new.is_completed);
    }

    #[test]
    fn create_requires_name_and_known_relationship() {
        let req: CreateGoalRequest = serde_json::from_value(serde_json::json!({
            "relatedHabits": [{"habitId": Uuid::new_v4(), "relationship": "boss"}]
        }))
        .unwrap();
        let fields: Vec<_> = req
            .validate()
            .unwrap_err()
            .issues()
            .into_iter()
            .map(|i| i.field)
            .collect();
        assert_eq!(fields, vec!["name", "relatedHabits.relationship"]);
    }

    #[test]
    fn progress_needs_exactly_one_field() {
        let set = ProgressRequest {
            value: Some(3.0),
            increment: None,
        };
        assert_eq!(set.validate().unwrap(), Progress::Set(3.0));
        let inc = ProgressRequest {
            value: None,
            increment: Some(-1.5),
        };
        assert_eq!(inc.validate().unwrap(), Progress::Increment(-1.5));
        assert!(ProgressRequest::default().validate().is_err());
        assert!(ProgressRequest {
            value: Some(1.0),
            increment: Some(1.0)
        }
        .validate()
        .is_err());
    }

    #[test]
    fn update_can_clear_deadline() {
        let req: UpdateGoalRequest =
            serde_json::from_value(serde_json::json!({"deadline": null})).unwrap();
        assert_eq!(req.validate().unwrap().deadline, Some(None));
    }
}
