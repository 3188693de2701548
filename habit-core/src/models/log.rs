//! Habit completion logs

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use super::habit::string_enum;
use super::range::calendar_date;
use super::{UserId, ValidationError};

/// Longest accepted photo URL
const MAX_PHOTO_URL_LEN: usize = 2048;

/// Tolerated client clock drift for completion timestamps
const MAX_CLOCK_SKEW_MINUTES: i64 = 5;

/// http(s) URL without whitespace
static PHOTO_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("invalid photo url regex"));

string_enum!(
    /// How the user felt after completing the habit
    Feeling, "feeling", {
        Great => "great",
        Good => "good",
        Okay => "okay",
        Bad => "bad",
        Terrible => "terrible",
    }
);

/// Perceived difficulty on a 1..=5 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Difficulty(u8);

impl Difficulty {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if !(1..=5).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: "difficulty",
                min: 1.0,
                max: 5.0,
            });
        }
        Ok(Self(value as u8))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

/// Validated photo URL
pub fn photo_url(s: &str) -> Result<String, ValidationError> {
    let trimmed = s.trim();
    if trimmed.len() > MAX_PHOTO_URL_LEN {
        return Err(ValidationError::TooLong {
            field: "photoUrl",
            max: MAX_PHOTO_URL_LEN,
        });
    }
    if !PHOTO_URL_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat {
            field: "photoUrl",
            reason: "must be an http or https URL",
        });
    }
    Ok(trimmed.to_owned())
}

/// A completion day must be a supported calendar date no later than `today`.
pub fn completion_date(
    field: &'static str,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    calendar_date(field, date)?;
    if date > today {
        return Err(ValidationError::Invalid {
            field,
            reason: "cannot complete a habit in the future".to_owned(),
        });
    }
    Ok(date)
}

/// Completion timestamp no later than `now`, give or take clock skew.
pub fn completed_at(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
    calendar_date("completedAt", at.date_naive())?;
    if at > now + Duration::minutes(MAX_CLOCK_SKEW_MINUTES) {
        return Err(ValidationError::Invalid {
            field: "completedAt",
            reason: "cannot complete a habit in the future".to_owned(),
        });
    }
    Ok(at)
}

/// Free-form structured details must be a JSON object.
pub fn details(value: serde_json::Value) -> Result<serde_json::Value, ValidationError> {
    if value.is_object() {
        Ok(value)
    } else {
        Err(ValidationError::InvalidFormat {
            field: "details",
            reason: "must be a JSON object",
        })
    }
}

/// One recorded completion of a habit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitLog {
    pub id: Uuid,
    pub habit_id: Uuid,
    pub user_id: UserId,
    pub completed_at: DateTime<Utc>,
    pub value: Option<f64>,
    pub notes: Option<String>,
    pub details: Option<serde_json::Value>,
    pub difficulty: Option<Difficulty>,
    pub feeling: Option<Feeling>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HabitLog {
    pub fn from_new(id: Uuid, user_id: UserId, new: NewHabitLog, now: DateTime<Utc>) -> Self {
        Self {
            id,
            habit_id: new.habit_id,
            user_id,
            completed_at: new.completed_at,
            value: new.value,
            notes: new.notes,
            details: new.details,
            difficulty: new.difficulty,
            feeling: new.feeling,
            photo_url: new.photo_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Calendar day of the completion in the user's time zone.
    pub fn local_date(&self, tz: Tz) -> NaiveDate {
        self.completed_at.with_timezone(&tz).date_naive()
    }

    pub fn apply(&mut self, patch: LogPatch, now: DateTime<Utc>) {
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = completed_at;
        }
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(details) = patch.details {
            self.details = details;
        }
        if let Some(difficulty) = patch.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(feeling) = patch.feeling {
            self.feeling = feeling;
        }
        if let Some(photo_url) = patch.photo_url {
            self.photo_url = photo_url;
        }
        self.updated_at = now;
    }
}

/// Validated log create command
#[derive(Debug, Clone, PartialEq)]
pub struct NewHabitLog {
    pub habit_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub value: Option<f64>,
    pub notes: Option<String>,
    pub details: Option<serde_json::Value>,
    pub difficulty: Option<Difficulty>,
    pub feeling: Option<Feeling>,
    pub photo_url: Option<String>,
}

impl NewHabitLog {
    /// A bare completion at `completed_at`.
    pub fn completion(habit_id: Uuid, completed_at: DateTime<Utc>) -> Self {
        Self {
            habit_id,
            completed_at,
            value: None,
            notes: None,
            details: None,
            difficulty: None,
            feeling: None,
            photo_url: None,
        }
    }
}

/// Validated partial log update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogPatch {
    pub completed_at: Option<DateTime<Utc>>,
    pub value: Option<Option<f64>>,
    pub notes: Option<Option<String>>,
    pub details: Option<Option<serde_json::Value>>,
    pub difficulty: Option<Option<Difficulty>>,
    pub feeling: Option<Option<Feeling>>,
    pub photo_url: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn difficulty_range() {
        assert!(Difficulty::new(0).is_err());
        assert!(Difficulty::new(6).is_err());
        assert_eq!(Difficulty::new(3).unwrap().get(), 3);
    }

    #[test]
    fn photo_urls() {
        assert!(photo_url("https://cdn.example.com/p/1.jpg").is_ok());
        assert!(photo_url("ftp://example.com/a.jpg").is_err());
        assert!(photo_url("https://exa mple.com").is_err());
    }

    #[test]
    fn details_must_be_object() {
        assert!(details(serde_json::json!({"reps": 10})).is_ok());
        assert!(details(serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn completion_date_bounds() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        assert!(completion_date("date", today, today).is_ok());
        let ancient = NaiveDate::from_ymd_opt(-262143, 1, 1).unwrap();
        assert_eq!(completion_date("date", ancient, today).unwrap_err().field(), "date");
        assert!(completion_date("date", today.succ_opt().unwrap(), today).is_err());
    }

    #[test]
    fn completed_at_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap();
        assert!(completed_at(now + Duration::minutes(1), now).is_ok());
        assert!(completed_at(Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0).unwrap(), now).is_err());
        assert!(completed_at(Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap(), now).is_err());
        assert!(completed_at(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap(), now).is_ok());
    }

    #[test]
    fn local_date_crosses_midnight() {
        let log = HabitLog::from_new(
            Uuid::new_v4(),
            UserId::new("u").unwrap(),
            NewHabitLog::completion(
                Uuid::new_v4(),
                Utc.with_ymd_and_hms(2024, 5, 10, 2, 0, 0).unwrap(),
            ),
            Utc::now(),
        );
        assert_eq!(
            log.local_date(chrono_tz::America::New_York),
            NaiveDate::from_ymd_opt(2024, 5, 9).unwrap()
        );
    }
}
