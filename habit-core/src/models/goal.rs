//! User goals, optionally linked to habits

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::habit::string_enum;
use super::{Name, UserId, ValidationError};

string_enum!(
    /// How a habit contributes to a goal
    Relationship, "relatedHabits.relationship", {
        Primary => "primary",
        Supporting => "supporting",
        Tracking => "tracking",
    }
);

/// Link from a goal to one of the user's habits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedHabit {
    pub habit_id: Uuid,
    pub relationship: Relationship,
}

/// Stored goal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: f64,
    pub start_value: Option<f64>,
    pub unit: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub related_habits: Vec<RelatedHabit>,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Progress update for a goal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Set(f64),
    Increment(f64),
}

impl Goal {
    pub fn from_new(id: Uuid, user_id: UserId, new: NewGoal, now: DateTime<Utc>) -> Self {
        let current_value = new
            .current_value
            .or(new.start_value)
            .unwrap_or_default();
        let mut goal = Self {
            id,
            user_id,
            name: new.name.into_string(),
            description: new.description,
            target_value: new.target_value,
            current_value,
            start_value: new.start_value,
            unit: new.unit,
            deadline: new.deadline,
            related_habits: new.related_habits,
            is_completed: new.is_completed,
            created_at: now,
            updated_at: now,
        };
        goal.mark_if_reached();
        goal
    }

    /// Whether the current value has reached the target.
    ///
    /// A target below the start value is a reduction goal (weight loss,
    /// screen time) and is reached by going at or below it.
    pub fn is_reached(&self) -> bool {
        let Some(target) = self.target_value else {
            return false;
        };
        let start = self.start_value.unwrap_or(0.0);
        if target < start {
            self.current_value <= target
        } else {
            self.current_value >= target
        }
    }

    /// Record progress; reaching the target marks the goal completed.
    ///
    /// A result that is not finite leaves the goal untouched.
    pub fn record_progress(
        &mut self,
        progress: Progress,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let (field, value) = match progress {
            Progress::Set(v) => ("value", v),
            Progress::Increment(delta) => ("increment", self.current_value + delta),
        };
        if !value.is_finite() {
            return Err(ValidationError::Invalid {
                field,
                reason: "progress must stay a finite number".to_owned(),
            });
        }
        self.current_value = value;
        self.mark_if_reached();
        self.updated_at = now;
        Ok(())
    }

    fn mark_if_reached(&mut self) {
        if self.is_reached() {
            self.is_completed = true;
        }
    }

    pub fn apply(&mut self, patch: GoalPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name.into_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(target_value) = patch.target_value {
            self.target_value = target_value;
        }
        if let Some(current_value) = patch.current_value {
            self.current_value = current_value;
        }
        if let Some(start_value) = patch.start_value {
            self.start_value = start_value;
        }
        if let Some(unit) = patch.unit {
            self.unit = unit;
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        if let Some(related_habits) = patch.related_habits {
            self.related_habits = related_habits;
        }
        if let Some(is_completed) = patch.is_completed {
            self.is_completed = is_completed;
        }
        self.mark_if_reached();
        self.updated_at = now;
    }
}

/// Validated goal create command
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    pub name: Name,
    pub description: Option<String>,
    pub target_value: Option<f64>,
    pub current_value: Option<f64>,
    pub start_value: Option<f64>,
    pub unit: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub related_habits: Vec<RelatedHabit>,
    pub is_completed: bool,
}

/// Validated partial goal update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalPatch {
    pub name: Option<Name>,
    pub description: Option<Option<String>>,
    pub target_value: Option<Option<f64>>,
    pub current_value: Option<f64>,
    pub start_value: Option<Option<f64>>,
    pub unit: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub related_habits: Option<Vec<RelatedHabit>>,
    pub is_completed: Option<bool>,
}

/// Deduplicate links by habit, keeping the first relationship given.
pub fn dedup_related(links: Vec<RelatedHabit>) -> Vec<RelatedHabit> {
    let mut seen = std::collections::HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.habit_id))
        .collect()
}
