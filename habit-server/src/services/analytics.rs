//! Analytics over a user's habits and logs

use chrono::{Duration, NaiveDate};
use chrono_tz::Tz;
use habit_core::analytics::{self, CompletionReport, Dashboard, Granularity, HabitSeries, HabitStreakSummary};
use habit_core::models::{Habit, TimeRange, UserId, ValidationError};
use habit_core::schedule::History;
use uuid::Uuid;

use super::habits::{histories, today_in};
use super::ServiceResult;
use crate::store::Repositories;

/// Default report window, in days, ending today
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Longest accepted report window, in days
const MAX_WINDOW_DAYS: i64 = 366;

/// Validated report parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub group_by: Option<Granularity>,
    pub habit_id: Option<Uuid>,
}

impl AnalyticsQuery {
    /// Concrete `from..=to`, defaulting to the last 30 days.
    pub fn window(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ValidationError> {
        let to = self.to.unwrap_or(today);
        let from = self
            .from
            .unwrap_or_else(|| to - Duration::days(DEFAULT_WINDOW_DAYS - 1));
        if from > to {
            return Err(ValidationError::Invalid {
                field: "from",
                reason: "must not be after 'to'".to_owned(),
            });
        }
        if (to - from).num_days() >= MAX_WINDOW_DAYS {
            return Err(ValidationError::Invalid {
                field: "to",
                reason: format!("range must span at most {} days", MAX_WINDOW_DAYS),
            });
        }
        Ok((from, to))
    }
}

/// Habits with their full histories, loaded once per request
struct Snapshot {
    habits: Vec<Habit>,
    histories: std::collections::HashMap<Uuid, History>,
}

impl Snapshot {
    fn series(&self) -> Vec<HabitSeries<'_>> {
        self.habits
            .iter()
            .map(|h| HabitSeries::new(h, self.histories.get(&h.id).cloned().unwrap_or_default()))
            .collect()
    }
}

pub struct AnalyticsService<'a> {
    repos: &'a Repositories,
}

impl<'a> AnalyticsService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Unarchived habits, or only `habit_id` when given (404 if not owned).
    async fn snapshot(&self, user: &UserId, habit_id: Option<Uuid>, tz: Tz) -> ServiceResult<Snapshot> {
        let habits = match habit_id {
            Some(id) => vec![self.repos.habits.get(user, id).await?],
            None => self
                .repos
                .habits
                .list_all(user)
                .await?
                .into_iter()
                .filter(|h| !h.is_archived)
                .collect(),
        };
        let logs = self.repos.logs.list_for_user(user, TimeRange::all()).await?;
        Ok(Snapshot {
            histories: histories(&logs, tz),
            habits,
        })
    }

    pub async fn completion(
        &self,
        user: &UserId,
        query: &AnalyticsQuery,
        tz: Tz,
    ) -> ServiceResult<CompletionReport> {
        let today = today_in(tz);
        let (from, to) = query.window(today)?;
        let snapshot = self.snapshot(user, query.habit_id, tz).await?;
        Ok(analytics::completion_report(
            &snapshot.series(),
            tz,
            from,
            to,
            today,
            query.group_by.unwrap_or(Granularity::Day),
        ))
    }

    pub async fn streaks(
        &self,
        user: &UserId,
        query: &AnalyticsQuery,
        tz: Tz,
    ) -> ServiceResult<Vec<HabitStreakSummary>> {
        let today = today_in(tz);
        let (from, to) = query.window(today)?;
        let snapshot = self.snapshot(user, query.habit_id, tz).await?;
        Ok(analytics::streak_summaries(&snapshot.series(), tz, from, to, today))
    }

    pub async fn dashboard(&self, user: &UserId, tz: Tz) -> ServiceResult<Dashboard> {
        let snapshot = Snapshot {
            habits: self.repos.habits.list_all(user).await?,
            histories: histories(
                &self.repos.logs.list_for_user(user, TimeRange::all()).await?,
                tz,
            ),
        };
        let goals = self.repos.goals.list_all(user).await?;
        Ok(analytics::dashboard(&snapshot.series(), &goals, tz, today_in(tz)))
    }
}
