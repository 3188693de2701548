//! Streak computation from completion history
//!
//! A streak counts consecutive satisfied periods. The period containing
//! today is still open: it extends the streak once satisfied but never
//! breaks it.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::{Frequency, Habit, StreakFields};
use crate::schedule::{History, Period};

/// A period with the completions recorded in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodOutcome {
    pub period: Period,
    pub achieved: u32,
    /// Period has not finished yet
    pub open: bool,
}

impl PeriodOutcome {
    pub fn satisfied(&self) -> bool {
        self.achieved >= self.period.target
    }
}

/// A missed period that ended a run of satisfied ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakBreak {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Length of the run that was broken
    pub run_length: u32,
}

/// First day that counts for a habit: its start date, or an earlier
/// backdated completion.
pub fn tracking_start(start_date: NaiveDate, history: &History) -> NaiveDate {
    history
        .first_date()
        .map_or(start_date, |first| first.min(start_date))
}

/// Judge every period from `since` to `today`.
///
/// An open period that is not yet satisfied is left out entirely.
pub fn outcomes(
    frequency: &Frequency,
    history: &History,
    since: NaiveDate,
    today: NaiveDate,
) -> Vec<PeriodOutcome> {
    frequency
        .periods_between(since, today)
        .into_iter()
        .map(|period| PeriodOutcome {
            period,
            achieved: history.count_in(period.start, period.end),
            open: period.end >= today,
        })
        .filter(|o| !o.open || o.satisfied())
        .collect()
}

pub fn current_streak(outcomes: &[PeriodOutcome]) -> u32 {
    outcomes
        .iter()
        .rev()
        .take_while(|o| o.satisfied())
        .count() as u32
}

pub fn longest_streak(outcomes: &[PeriodOutcome]) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    for outcome in outcomes {
        if outcome.satisfied() {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

/// Missed periods that interrupted a run of at least one.
pub fn breaks(outcomes: &[PeriodOutcome]) -> Vec<StreakBreak> {
    let mut found = Vec::new();
    let mut run = 0;
    for outcome in outcomes {
        if outcome.satisfied() {
            run += 1;
        } else {
            if run > 0 {
                found.push(StreakBreak {
                    period_start: outcome.period.start,
                    period_end: outcome.period.end,
                    run_length: run,
                });
            }
            run = 0;
        }
    }
    found
}

/// Recompute the stored streak columns of a habit from its completions.
pub fn recompute(
    habit: &Habit,
    completions: &[DateTime<Utc>],
    tz: Tz,
    today: NaiveDate,
) -> StreakFields {
    let history = History::from_dates(
        completions
            .iter()
            .map(|at| at.with_timezone(&tz).date_naive()),
    );
    let since = tracking_start(habit.start_date(tz), &history);
    let judged = outcomes(&habit.frequency, &history, since, today);

    StreakFields {
        streak: current_streak(&judged),
        longest_streak: longest_streak(&judged),
        last_completed: completions.iter().max().copied(),
    }
}
