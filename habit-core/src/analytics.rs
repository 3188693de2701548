//! Completion rates, streak-break summaries and the dashboard

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use crate::models::habit::string_enum;
use crate::models::{Goal, Habit, HabitCategory};
use crate::schedule::{day_status, month_end, month_start, week_end, week_start, History};
use crate::streak::{self, StreakBreak};

string_enum!(
    /// Bucket size for completion reports
    Granularity, "groupBy", {
        Day => "day",
        Week => "week",
        Month => "month",
    }
);

impl Granularity {
    fn bucket_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => week_end(date),
            Self::Month => month_end(date),
        }
    }

    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => week_start(date),
            Self::Month => month_start(date),
        }
    }
}

/// A habit together with its completion history in local dates
#[derive(Debug, Clone)]
pub struct HabitSeries<'a> {
    pub habit: &'a Habit,
    pub history: History,
}

impl<'a> HabitSeries<'a> {
    pub fn new(habit: &'a Habit, history: History) -> Self {
        Self { habit, history }
    }

    fn since(&self, tz: Tz) -> NaiveDate {
        streak::tracking_start(self.habit.start_date(tz), &self.history)
    }
}

/// Completion totals for one bucket of a report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub due: u32,
    pub completed: u32,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub granularity: Granularity,
    pub due: u32,
    pub completed: u32,
    pub rate: Option<f64>,
    pub buckets: Vec<CompletionBucket>,
}

fn rate(completed: u32, due: u32) -> Option<f64> {
    (due > 0).then(|| f64::from(completed) / f64::from(due))
}

/// Completion rate over `from..=to`, grouped by `granularity`.
///
/// Every period of every habit that intersects the range lands in the
/// bucket holding its first in-range day. Periods after `today`, and the
/// open period while unsatisfied, are not counted.
pub fn completion_report(
    series: &[HabitSeries<'_>],
    tz: Tz,
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
    granularity: Granularity,
) -> CompletionReport {
    let mut buckets = Vec::new();
    let mut cursor = from;
    while cursor <= to {
        let end = granularity.bucket_end(cursor).min(to);
        buckets.push(CompletionBucket {
            start: cursor,
            end,
            due: 0,
            completed: 0,
            rate: None,
        });
        match end.succ_opt() {
            Some(next) => cursor = next,
            None => break,
        }
    }

    let last_judged = to.min(today);
    for s in series {
        let lo = from.max(s.since(tz));
        for outcome in streak::outcomes(&s.habit.frequency, &s.history, lo, last_judged) {
            let anchor = outcome.period.start.max(from);
            let idx = buckets.partition_point(|b| b.start <= anchor);
            let Some(bucket) = idx.checked_sub(1).and_then(|i| buckets.get_mut(i)) else {
                continue;
            };
            bucket.due += outcome.period.target;
            bucket.completed += outcome.achieved.min(outcome.period.target);
        }
    }

    let mut due = 0;
    let mut completed = 0;
    for bucket in &mut buckets {
        bucket.rate = rate(bucket.completed, bucket.due);
        due += bucket.due;
        completed += bucket.completed;
    }

    CompletionReport {
        from,
        to,
        granularity,
        due,
        completed,
        rate: rate(completed, due),
        buckets,
    }
}

/// Per-habit streak picture over a range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitStreakSummary {
    pub habit_id: Uuid,
    pub name: String,
    pub current_streak: u32,
    pub longest_in_range: u32,
    pub breaks: Vec<StreakBreak>,
}

pub fn streak_summaries(
    series: &[HabitSeries<'_>],
    tz: Tz,
    from: NaiveDate,
    to: NaiveDate,
    today: NaiveDate,
) -> Vec<HabitStreakSummary> {
    series
        .iter()
        .map(|s| {
            let judged = streak::outcomes(&s.habit.frequency, &s.history, s.since(tz), today);
            let in_range: Vec<_> = judged
                .iter()
                .copied()
                .filter(|o| from <= o.period.end && o.period.end <= to)
                .collect();

            HabitStreakSummary {
                habit_id: s.habit.id,
                name: s.habit.name.clone(),
                current_streak: streak::current_streak(&judged),
                longest_in_range: streak::longest_streak(&in_range),
                breaks: streak::breaks(&judged)
                    .into_iter()
                    .filter(|b| from <= b.period_end && b.period_end <= to)
                    .collect(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestStreak {
    pub habit_id: Uuid,
    pub name: String,
    pub streak: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: HabitCategory,
    pub count: u32,
}

/// Numbers for the dashboard landing page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub date: NaiveDate,
    pub total_habits: u32,
    pub active_habits: u32,
    pub archived_habits: u32,
    pub due_today: u32,
    pub completed_today: u32,
    pub completion_rate_7d: Option<f64>,
    pub completion_rate_30d: Option<f64>,
    pub best_streak: Option<BestStreak>,
    pub by_category: Vec<CategoryCount>,
    pub goals_total: u32,
    pub goals_completed: u32,
}

pub fn dashboard(series: &[HabitSeries<'_>], goals: &[Goal], tz: Tz, today: NaiveDate) -> Dashboard {
    let active: Vec<HabitSeries<'_>> = series
        .iter()
        .filter(|s| s.habit.is_active && !s.habit.is_archived)
        .cloned()
        .collect();

    let mut due_today = 0;
    let mut completed_today = 0;
    for s in &active {
        if let Some(status) = day_status(&s.habit.frequency, &s.history, today) {
            due_today += 1;
            if status.completed_today {
                completed_today += 1;
            }
        }
    }

    let window = |days: i64| {
        completion_report(
            &active,
            tz,
            today - Duration::days(days - 1),
            today,
            today,
            Granularity::Day,
        )
        .rate
    };

    let best_streak = active
        .iter()
        .map(|s| {
            let judged = streak::outcomes(&s.habit.frequency, &s.history, s.since(tz), today);
            BestStreak {
                habit_id: s.habit.id,
                name: s.habit.name.clone(),
                streak: streak::current_streak(&judged),
            }
        })
        .filter(|b| b.streak > 0)
        .max_by_key(|b| b.streak);

    let by_category = HabitCategory::ALL
        .iter()
        .map(|category| CategoryCount {
            category: *category,
            count: series
                .iter()
                .filter(|s| !s.habit.is_archived && s.habit.category == *category)
                .count() as u32,
        })
        .collect();

    Dashboard {
        date: today,
        total_habits: series.len() as u32,
        active_habits: active.len() as u32,
        archived_habits: series.iter().filter(|s| s.habit.is_archived).count() as u32,
        due_today,
        completed_today,
        completion_rate_7d: window(7),
        completion_rate_30d: window(30),
        best_streak,
        by_category,
        goals_total: goals.len() as u32,
        goals_completed: goals.iter().filter(|g| g.is_completed).count() as u32,
    }
}
