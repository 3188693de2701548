//! Habit records and the commands that create or change them

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use super::{Frequency, Name, UserId, ValidationError};

/// Maximum length for a habit description
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// Maximum length for notes on habits and logs
pub const MAX_NOTES_LEN: usize = 1000;
/// Maximum length for a unit label ("km", "pages")
pub const MAX_UNITS_LEN: usize = 20;

/// Generates a lowercase string enum with `as_str`, `parse` and `ALL`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn parse(s: &str) -> Result<Self, $crate::models::ValidationError> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::models::ValidationError::InvalidVariant {
                        field: $field,
                        value: other.to_owned(),
                    }),
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

pub(crate) use string_enum;

string_enum!(
    /// Habit category
    HabitCategory, "category", {
        Fitness => "fitness",
        Nutrition => "nutrition",
        Mindfulness => "mindfulness",
        Productivity => "productivity",
        Other => "other",
    }
);

string_enum!(
    /// Palette color shown for a habit
    HabitColor, "color", {
        Red => "red",
        Orange => "orange",
        Yellow => "yellow",
        Green => "green",
        Teal => "teal",
        Blue => "blue",
        Indigo => "indigo",
        Purple => "purple",
        Pink => "pink",
        Gray => "gray",
    }
);

string_enum!(
    /// What a completion measures
    MetricType, "metricType", {
        Boolean => "boolean",
        Count => "count",
        Duration => "duration",
        Distance => "distance",
        Weight => "weight",
        Custom => "custom",
    }
);

/// Parse a reminder time in `HH:MM` (24h) form.
pub fn parse_reminder_time(s: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| ValidationError::InvalidFormat {
        field: "reminderTime",
        reason: "expected HH:MM",
    })
}

mod reminder_format {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_some(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }
}

/// Stored habit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub category: HabitCategory,
    pub color: HabitColor,
    pub frequency: Frequency,
    pub streak: u32,
    pub longest_streak: u32,
    pub last_completed: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_archived: bool,
    pub goal: Option<f64>,
    pub metric_type: Option<MetricType>,
    pub units: Option<String>,
    pub notes: Option<String>,
    #[serde(serialize_with = "reminder_format::serialize")]
    pub reminder_time: Option<NaiveTime>,
    pub reminder_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    /// Build a fresh habit from a validated command.
    pub fn from_new(id: Uuid, user_id: UserId, new: NewHabit, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            name: new.name.into_string(),
            description: new.description,
            category: new.category,
            color: new.color,
            frequency: new.frequency,
            streak: 0,
            longest_streak: 0,
            last_completed: None,
            is_active: new.is_active,
            is_archived: false,
            goal: new.goal,
            metric_type: new.metric_type,
            units: new.units,
            notes: new.notes,
            reminder_time: new.reminder_time,
            reminder_enabled: new.reminder_enabled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Local date the habit started being tracked.
    pub fn start_date(&self, tz: Tz) -> NaiveDate {
        self.created_at.with_timezone(&tz).date_naive()
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: HabitPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name.into_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(frequency) = patch.frequency {
            self.frequency = frequency;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(goal) = patch.goal {
            self.goal = goal;
        }
        if let Some(metric_type) = patch.metric_type {
            self.metric_type = metric_type;
        }
        if let Some(units) = patch.units {
            self.units = units;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(reminder_time) = patch.reminder_time {
            self.reminder_time = reminder_time;
        }
        if let Some(reminder_enabled) = patch.reminder_enabled {
            self.reminder_enabled = reminder_enabled;
        }
        self.updated_at = now;
    }

    /// Set or clear the archive flag; archived habits are never active.
    pub fn set_archived(&mut self, archived: bool, now: DateTime<Utc>) {
        self.is_archived = archived;
        self.is_active = !archived;
        self.updated_at = now;
    }
}

/// Validated create command
#[derive(Debug, Clone, PartialEq)]
pub struct NewHabit {
    pub name: Name,
    pub description: Option<String>,
    pub category: HabitCategory,
    pub color: HabitColor,
    pub frequency: Frequency,
    pub is_active: bool,
    pub goal: Option<f64>,
    pub metric_type: Option<MetricType>,
    pub units: Option<String>,
    pub notes: Option<String>,
    pub reminder_time: Option<NaiveTime>,
    pub reminder_enabled: bool,
}

/// Validated partial update.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears an optional
/// field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HabitPatch {
    pub name: Option<Name>,
    pub description: Option<Option<String>>,
    pub category: Option<HabitCategory>,
    pub color: Option<HabitColor>,
    pub frequency: Option<Frequency>,
    pub is_active: Option<bool>,
    pub goal: Option<Option<f64>>,
    pub metric_type: Option<Option<MetricType>>,
    pub units: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub reminder_time: Option<Option<NaiveTime>>,
    pub reminder_enabled: Option<bool>,
}

impl HabitPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Recomputed streak columns of a habit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakFields {
    pub streak: u32,
    pub longest_streak: u32,
    pub last_completed: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Habit {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        Habit::from_new(
            Uuid::new_v4(),
            UserId::new("user_1").unwrap(),
            NewHabit {
                name: Name::new("name", "Stretch").unwrap(),
                description: None,
                category: HabitCategory::Fitness,
                color: HabitColor::Teal,
                frequency: Frequency::Daily,
                is_active: true,
                goal: None,
                metric_type: None,
                units: None,
                notes: Some("after waking".into()),
                reminder_time: Some(parse_reminder_time("07:15").unwrap()),
                reminder_enabled: true,
            },
            now,
        )
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!(HabitCategory::parse("Fitness").unwrap(), HabitCategory::Fitness);
        let err = HabitCategory::parse("sleep").unwrap_err();
        assert_eq!(err.field(), "category");
    }

    #[test]
    fn start_date_uses_timezone() {
        let habit = sample();
        assert_eq!(
            habit.start_date(chrono_tz::UTC),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            habit.start_date(chrono_tz::Asia::Tokyo),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
    }

    #[test]
    fn patch_clears_optional_fields() {
        let mut habit = sample();
        let later = habit.created_at + chrono::Duration::hours(1);
        habit.apply(
            HabitPatch {
                notes: Some(None),
                color: Some(HabitColor::Red),
                ..Default::default()
            },
            later,
        );
        assert_eq!(habit.notes, None);
        assert_eq!(habit.color, HabitColor::Red);
        assert_eq!(habit.name, "Stretch");
        assert_eq!(habit.updated_at, later);
    }

    #[test]
    fn archiving_deactivates() {
        let mut habit = sample();
        let now = habit.created_at;
        habit.set_archived(true, now);
        assert!(habit.is_archived && !habit.is_active);
        habit.set_archived(false, now);
        assert!(!habit.is_archived && habit.is_active);
    }

    #[test]
    fn reminder_serializes_as_hh_mm() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["reminderTime"], "07:15");
        assert_eq!(json["frequency"]["type"], "daily");
        assert_eq!(json["isArchived"], false);
    }

    #[test]
    fn rejects_bad_reminder() {
        assert!(parse_reminder_time("7pm").is_err());
        assert!(parse_reminder_time("25:00").is_err());
    }
}
