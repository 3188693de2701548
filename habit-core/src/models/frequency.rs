//! Habit frequency rules
//!
//! A frequency is either a set of scheduled days (every day, some weekdays,
//! some days of the month) or a completion quota per week or month. The
//! wire form is a tagged object:
//!
//! ```json
//! {"type": "weekly", "days": ["mon", "thu"]}
//! {"type": "monthly", "times": 4}
//! ```

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Frequency kind, stored in the `frequency_type` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyType {
    Daily,
    Weekly,
    Monthly,
}

impl FrequencyType {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(ValidationError::InvalidVariant {
                field: "frequency.type",
                value: other.to_owned(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A day reference in a frequency rule: a number or a weekday name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayRef {
    Number(u32),
    Name(String),
}

/// Rule parameters, stored in the `frequency_value` column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<DayRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<u32>,
}

/// Unvalidated wire form of a frequency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyInput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub value: FrequencyValue,
}

/// Validated frequency rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FrequencyInput", into = "FrequencyInput")]
pub enum Frequency {
    /// Due every day
    Daily,
    /// Due on the listed weekdays
    WeeklyDays(Vec<Weekday>),
    /// At least n completions per ISO week
    WeeklyTimes(u32),
    /// Due on the listed days of month (clamped to the month's length)
    MonthlyDays(Vec<u32>),
    /// At least n completions per calendar month
    MonthlyTimes(u32),
}

impl Frequency {
    /// Validate a wire-form rule.
    ///
    /// Weekday numbers follow the JavaScript convention (0 = Sunday);
    /// names may be short or long and are case-insensitive.
    pub fn from_input(input: &FrequencyInput) -> Result<Self, ValidationError> {
        let kind = FrequencyType::parse(&input.kind)?;
        let FrequencyValue { days, times } = &input.value;

        if kind == FrequencyType::Daily {
            return Ok(Self::Daily);
        }

        match (days, times) {
            (Some(_), Some(_)) => Err(ValidationError::InvalidFormat {
                field: "frequency",
                reason: "days and times are mutually exclusive",
            }),
            (None, None) => Err(ValidationError::InvalidFormat {
                field: "frequency",
                reason: "weekly and monthly rules need either days or times",
            }),
            (Some(days), None) if days.is_empty() => Err(ValidationError::Empty {
                field: "frequency.days",
            }),
            (None, Some(times)) => {
                let max = if kind == FrequencyType::Weekly { 7 } else { 31 };
                if *times < 1 || *times > max {
                    return Err(ValidationError::OutOfRange {
                        field: "frequency.times",
                        min: 1.0,
                        max: f64::from(max),
                    });
                }
                Ok(match kind {
                    FrequencyType::Weekly => Self::WeeklyTimes(*times),
                    _ => Self::MonthlyTimes(*times),
                })
            }
            (Some(days), None) => match kind {
                FrequencyType::Weekly => {
                    let mut weekdays = days
                        .iter()
                        .map(parse_weekday)
                        .collect::<Result<Vec<_>, _>>()?;
                    weekdays.sort_by_key(|d| d.num_days_from_monday());
                    weekdays.dedup();
                    Ok(Self::WeeklyDays(weekdays))
                }
                _ => {
                    let mut month_days = days
                        .iter()
                        .map(parse_month_day)
                        .collect::<Result<Vec<_>, _>>()?;
                    month_days.sort_unstable();
                    month_days.dedup();
                    Ok(Self::MonthlyDays(month_days))
                }
            },
        }
    }

    /// Rebuild a rule from its two stored columns.
    pub fn from_storage(kind: &str, value: FrequencyValue) -> Result<Self, ValidationError> {
        Self::from_input(&FrequencyInput {
            kind: kind.to_owned(),
            value,
        })
    }

    pub fn frequency_type(&self) -> FrequencyType {
        match self {
            Self::Daily => FrequencyType::Daily,
            Self::WeeklyDays(_) | Self::WeeklyTimes(_) => FrequencyType::Weekly,
            Self::MonthlyDays(_) | Self::MonthlyTimes(_) => FrequencyType::Monthly,
        }
    }

    pub fn frequency_value(&self) -> FrequencyValue {
        match self {
            Self::Daily => FrequencyValue::default(),
            Self::WeeklyDays(days) => FrequencyValue {
                days: Some(
                    days.iter()
                        .map(|d| DayRef::Name(weekday_name(*d).to_owned()))
                        .collect(),
                ),
                times: None,
            },
            Self::MonthlyDays(days) => FrequencyValue {
                days: Some(days.iter().copied().map(DayRef::Number).collect()),
                times: None,
            },
            Self::WeeklyTimes(n) | Self::MonthlyTimes(n) => FrequencyValue {
                days: None,
                times: Some(*n),
            },
        }
    }

    /// Whether the rule is a completion quota rather than a day schedule.
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::WeeklyTimes(_) | Self::MonthlyTimes(_))
    }
}

impl TryFrom<FrequencyInput> for Frequency {
    type Error = ValidationError;

    fn try_from(input: FrequencyInput) -> Result<Self, Self::Error> {
        Self::from_input(&input)
    }
}

impl From<Frequency> for FrequencyInput {
    fn from(f: Frequency) -> Self {
        Self {
            kind: f.frequency_type().as_str().to_owned(),
            value: f.frequency_value(),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => f.write_str("daily"),
            Self::WeeklyDays(days) => {
                let names: Vec<_> = days.iter().map(|d| weekday_name(*d)).collect();
                write!(f, "weekly on {}", names.join(","))
            }
            Self::WeeklyTimes(n) => write!(f, "{} times per week", n),
            Self::MonthlyDays(days) => {
                let nums: Vec<_> = days.iter().map(u32::to_string).collect();
                write!(f, "monthly on day {}", nums.join(","))
            }
            Self::MonthlyTimes(n) => write!(f, "{} times per month", n),
        }
    }
}

fn weekday_name(d: Weekday) -> &'static str {
    match d {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

fn parse_weekday(day: &DayRef) -> Result<Weekday, ValidationError> {
    let parsed = match day {
        DayRef::Number(0) => Some(Weekday::Sun),
        DayRef::Number(1) => Some(Weekday::Mon),
        DayRef::Number(2) => Some(Weekday::Tue),
        DayRef::Number(3) => Some(Weekday::Wed),
        DayRef::Number(4) => Some(Weekday::Thu),
        DayRef::Number(5) => Some(Weekday::Fri),
        DayRef::Number(6) => Some(Weekday::Sat),
        DayRef::Number(_) => None,
        DayRef::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
            "mon" | "monday" => Some(Weekday::Mon),
            "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
            "wed" | "wednesday" => Some(Weekday::Wed),
            "thu" | "thurs" | "thursday" => Some(Weekday::Thu),
            "fri" | "friday" => Some(Weekday::Fri),
            "sat" | "saturday" => Some(Weekday::Sat),
            "sun" | "sunday" => Some(Weekday::Sun),
            _ => None,
        },
    };

    parsed.ok_or_else(|| ValidationError::InvalidVariant {
        field: "frequency.days",
        value: match day {
            DayRef::Number(n) => n.to_string(),
            DayRef::Name(s) => s.clone(),
        },
    })
}

fn parse_month_day(day: &DayRef) -> Result<u32, ValidationError> {
    match day {
        DayRef::Number(n) if (1..=31).contains(n) => Ok(*n),
        DayRef::Number(_) => Err(ValidationError::OutOfRange {
            field: "frequency.days",
            min: 1.0,
            max: 31.0,
        }),
        DayRef::Name(s) => Err(ValidationError::InvalidVariant {
            field: "frequency.days",
            value: s.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> Result<Frequency, ValidationError> {
        let input: FrequencyInput = serde_json::from_value(v).unwrap();
        Frequency::from_input(&input)
    }

    #[test]
    fn weekly_days_accept_numbers_and_names() {
        let f = parse(json!({"type": "weekly", "days": [5, "Monday", "wed", 1]})).unwrap();
        assert_eq!(
            f,
            Frequency::WeeklyDays(vec![Weekday::Mon, Weekday::Wed, Weekday::Fri])
        );
    }

    #[test]
    fn sunday_is_zero() {
        let f = parse(json!({"type": "weekly", "days": [0]})).unwrap();
        assert_eq!(f, Frequency::WeeklyDays(vec![Weekday::Sun]));
    }

    #[test]
    fn rejects_unknown_type() {
        let err = parse(json!({"type": "hourly"})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidVariant { .. }));
    }

    #[test]
    fn quota_bounds() {
        assert!(parse(json!({"type": "weekly", "times": 8})).is_err());
        assert!(parse(json!({"type": "weekly", "times": 0})).is_err());
        assert_eq!(
            parse(json!({"type": "monthly", "times": 31})).unwrap(),
            Frequency::MonthlyTimes(31)
        );
    }

    #[test]
    fn days_and_times_exclusive() {
        assert!(parse(json!({"type": "weekly", "days": ["mon"], "times": 2})).is_err());
        assert!(parse(json!({"type": "monthly"})).is_err());
        assert!(parse(json!({"type": "monthly", "days": []})).is_err());
    }

    #[test]
    fn monthly_days_reject_names() {
        assert!(parse(json!({"type": "monthly", "days": ["mon"]})).is_err());
        assert!(parse(json!({"type": "monthly", "days": [32]})).is_err());
    }

    #[test]
    fn serializes_to_wire_form() {
        let f = Frequency::WeeklyDays(vec![Weekday::Tue, Weekday::Sat]);
        assert_eq!(
            serde_json::to_value(&f).unwrap(),
            json!({"type": "weekly", "days": ["tue", "sat"]})
        );
        assert_eq!(
            serde_json::to_value(Frequency::Daily).unwrap(),
            json!({"type": "daily"})
        );
    }

    #[test]
    fn storage_columns_rebuild_rule() {
        let f = Frequency::MonthlyDays(vec![1, 15]);
        let rebuilt =
            Frequency::from_storage(f.frequency_type().as_str(), f.frequency_value()).unwrap();
        assert_eq!(rebuilt, f);
    }
}
