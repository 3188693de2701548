//! Frequency schedule
//!
//! Day-schedule rules (daily, weekdays, days of month) are judged one
//! scheduled day at a time with a target of one completion. Quota rules
//! are judged per ISO week (Monday start) or calendar month with a target
//! of `times` completions.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::Serialize;

use crate::models::Frequency;

/// A span a habit is judged on, with the completions it needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub target: u32,
}

impl Period {
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
            target: 1,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = Duration::days(i64::from(date.weekday().num_days_from_monday()));
    date.checked_sub_signed(back).unwrap_or(NaiveDate::MIN)
}

/// Sunday of the ISO week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date)
        .checked_add_signed(Duration::days(6))
        .unwrap_or(NaiveDate::MAX)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    month_end(date).day()
}

impl Frequency {
    /// Whether the habit applies on `date`.
    ///
    /// Quota rules apply on every day of their period; whether the quota
    /// is already met is a question for [`History`].
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        match self {
            Self::Daily | Self::WeeklyTimes(_) | Self::MonthlyTimes(_) => true,
            Self::WeeklyDays(days) => days.contains(&date.weekday()),
            Self::MonthlyDays(days) => {
                let last = days_in_month(date);
                days.iter().any(|d| (*d).min(last) == date.day())
            }
        }
    }

    /// The period `date` belongs to, or `None` for an unscheduled day.
    pub fn period_containing(&self, date: NaiveDate) -> Option<Period> {
        match self {
            Self::WeeklyTimes(n) => Some(Period {
                start: week_start(date),
                end: week_end(date),
                target: *n,
            }),
            Self::MonthlyTimes(n) => Some(Period {
                start: month_start(date),
                end: month_end(date),
                target: *n,
            }),
            _ if self.is_due_on(date) => Some(Period::day(date)),
            _ => None,
        }
    }

    /// All periods intersecting `start..=end`, oldest first.
    ///
    /// Quota periods may begin before `start` or end after `end`.
    pub fn periods_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Period> {
        let mut periods = Vec::new();
        if start > end {
            return periods;
        }

        if self.is_quota() {
            let mut cursor = start;
            while cursor <= end {
                let Some(period) = self.period_containing(cursor) else {
                    break;
                };
                periods.push(period);
                match period.end.succ_opt() {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
        } else {
            let mut day = start;
            loop {
                if self.is_due_on(day) {
                    periods.push(Period::day(day));
                }
                match day.succ_opt() {
                    Some(next) if next <= end => day = next,
                    _ => break,
                }
            }
        }

        periods
    }
}

/// Completion counts per local calendar day
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    days: BTreeMap<NaiveDate, u32>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut history = Self::new();
        for date in dates {
            history.record(date);
        }
        history
    }

    pub fn record(&mut self, date: NaiveDate) {
        *self.days.entry(date).or_default() += 1;
    }

    pub fn count_on(&self, date: NaiveDate) -> u32 {
        self.days.get(&date).copied().unwrap_or(0)
    }

    /// Completions within `start..=end`.
    pub fn count_in(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        if start > end {
            return 0;
        }
        self.days.range(start..=end).map(|(_, n)| *n).sum()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Where a habit stands on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub completed_today: bool,
    pub period: Period,
    pub progress: u32,
}

impl DayStatus {
    pub fn is_satisfied(&self) -> bool {
        self.progress >= self.period.target
    }
}

/// Status of a habit on `date`, or `None` when it does not apply.
///
/// A quota habit whose quota is already met only shows up on days it was
/// completed, so the user can still undo that completion.
pub fn day_status(frequency: &Frequency, history: &History, date: NaiveDate) -> Option<DayStatus> {
    let period = frequency.period_containing(date)?;
    let status = DayStatus {
        completed_today: history.count_on(date) > 0,
        period,
        progress: history.count_in(period.start, period.end),
    };
    if frequency.is_quota() && status.is_satisfied() && !status.completed_today {
        return None;
    }
    Some(status)
}
