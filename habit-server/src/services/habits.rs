//! Habit use cases: CRUD, archive flags, "due today" and toggling

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use habit_core::models::{
    local_midnight, local_noon, Habit, HabitFilter, HabitLog, HabitPatch, NewHabit, Paginated,
    Pagination, TimeRange, UserId,
};
use habit_core::models::log::completion_date;
use habit_core::schedule::{day_status, month_start, week_start, DayStatus, History};
use habit_core::streak;
use serde::Serialize;
use uuid::Uuid;

use super::ServiceResult;
use crate::store::Repositories;

/// A habit due today with where it stands
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayHabit {
    #[serde(flatten)]
    pub habit: Habit,
    #[serde(flatten)]
    pub status: DayStatus,
}

/// Outcome of a toggle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResult {
    pub date: NaiveDate,
    pub completed: bool,
    pub log: Option<HabitLog>,
    pub habit: Habit,
}

/// Local "today" for a time zone
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Group completion timestamps into per-habit local-date histories.
pub(crate) fn histories<'a>(
    logs: impl IntoIterator<Item = &'a HabitLog>,
    tz: Tz,
) -> HashMap<Uuid, History> {
    let mut by_habit: HashMap<Uuid, History> = HashMap::new();
    for log in logs {
        by_habit
            .entry(log.habit_id)
            .or_default()
            .record(log.local_date(tz));
    }
    by_habit
}

pub struct HabitService<'a> {
    repos: &'a Repositories,
}

impl<'a> HabitService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    pub async fn list(
        &self,
        user: &UserId,
        filter: &HabitFilter,
        page: Pagination,
    ) -> ServiceResult<Paginated<Habit>> {
        Ok(self.repos.habits.list(user, filter, page).await?)
    }

    pub async fn create(&self, user: &UserId, new: NewHabit) -> ServiceResult<Habit> {
        let habit = self.repos.habits.create(user, new).await?;
        tracing::info!(user = %user, habit_id = %habit.id, frequency = %habit.frequency, "habit created");
        Ok(habit)
    }

    pub async fn get(&self, user: &UserId, id: Uuid) -> ServiceResult<Habit> {
        Ok(self.repos.habits.get(user, id).await?)
    }

    /// Partial update; a new frequency re-judges the whole history.
    pub async fn update(
        &self,
        user: &UserId,
        id: Uuid,
        patch: HabitPatch,
        tz: Tz,
    ) -> ServiceResult<Habit> {
        let reschedule = patch.frequency.is_some();
        let habit = self.repos.habits.update(user, id, patch).await?;
        if reschedule {
            return self.refresh_streak(user, &habit, tz).await;
        }
        Ok(habit)
    }

    pub async fn delete(&self, user: &UserId, id: Uuid) -> ServiceResult<()> {
        self.repos.habits.delete(user, id).await?;
        tracing::info!(user = %user, habit_id = %id, "habit deleted");
        Ok(())
    }

    pub async fn set_archived(
        &self,
        user: &UserId,
        id: Uuid,
        archived: bool,
    ) -> ServiceResult<Habit> {
        Ok(self.repos.habits.set_archived(user, id, archived).await?)
    }

    /// Active, unarchived habits that apply to `today`.
    pub async fn today(&self, user: &UserId, tz: Tz) -> ServiceResult<Vec<TodayHabit>> {
        let today = today_in(tz);
        let since = week_start(today).min(month_start(today));
        let range = TimeRange {
            start: Some(local_midnight(since, tz)),
            end: None,
        };

        let habits = self.repos.habits.list_all(user).await?;
        let logs = self.repos.logs.list_for_user(user, range).await?;
        let by_habit = histories(&logs, tz);
        let empty = History::new();

        Ok(habits
            .into_iter()
            .filter(|h| h.is_active && !h.is_archived)
            .filter_map(|habit| {
                let history = by_habit.get(&habit.id).unwrap_or(&empty);
                day_status(&habit.frequency, history, today)
                    .map(|status| TodayHabit { habit, status })
            })
            .collect())
    }

    /// Flip completion of `date` (default today): remove that day's logs
    /// or add one.
    pub async fn toggle(
        &self,
        user: &UserId,
        id: Uuid,
        date: Option<NaiveDate>,
        tz: Tz,
    ) -> ServiceResult<ToggleResult> {
        let now = Utc::now();
        let today = now.with_timezone(&tz).date_naive();
        let date = completion_date("date", date.unwrap_or(today), today)?;
        let at: DateTime<Utc> = if date == today { now } else { local_noon(date, tz) };

        let outcome = self
            .repos
            .logs
            .toggle(user, id, TimeRange::local_day(date, tz), at)
            .await?;
        let habit = self.repos.habits.get(user, id).await?;
        let habit = self.refresh_streak(user, &habit, tz).await?;

        tracing::info!(
            user = %user,
            habit_id = %id,
            %date,
            completed = outcome.completed,
            streak = habit.streak,
            "habit toggled"
        );
        Ok(ToggleResult {
            date,
            completed: outcome.completed,
            log: outcome.log,
            habit,
        })
    }

    /// Recompute and store the streak columns from the full history.
    pub async fn refresh_streak(
        &self,
        user: &UserId,
        habit: &Habit,
        tz: Tz,
    ) -> ServiceResult<Habit> {
        let completions = self.repos.logs.completions(user, habit.id).await?;
        let fields = streak::recompute(habit, &completions, tz, today_in(tz));
        if fields.streak == habit.streak
            && fields.longest_streak == habit.longest_streak
            && fields.last_completed == habit.last_completed
        {
            return Ok(habit.clone());
        }
        Ok(self.repos.habits.set_streak(user, habit.id, fields).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use habit_core::models::{Frequency, HabitCategory, HabitColor, Name};

    use crate::services::ServiceError;

    fn user() -> UserId {
        UserId::new("user_1").unwrap()
    }

    fn daily(name: &str) -> NewHabit {
        NewHabit {
            name: Name::new("name", name).unwrap(),
            description: None,
            category: HabitCategory::Mindfulness,
            color: HabitColor::Purple,
            frequency: Frequency::Daily,
            is_active: true,
            goal: None,
            metric_type: None,
            units: None,
            notes: None,
            reminder_time: None,
            reminder_enabled: false,
        }
    }

    #[tokio::test]
    async fn toggle_twice_restores_state() {
        let repos = Repositories::memory();
        let service = HabitService::new(&repos);
        let habit = service.create(&user(), daily("Meditate")).await.unwrap();

        let on = service.toggle(&user(), habit.id, None, chrono_tz::UTC).await.unwrap();
        assert!(on.completed);
        assert_eq!(on.habit.streak, 1);
        assert!(on.habit.last_completed.is_some());

        let off = service.toggle(&user(), habit.id, None, chrono_tz::UTC).await.unwrap();
        assert!(!off.completed);
        assert_eq!(off.habit.streak, 0);
        assert_eq!(off.habit.last_completed, None);
    }

    #[tokio::test]
    async fn backdated_toggles_build_a_streak() {
        let repos = Repositories::memory();
        let service = HabitService::new(&repos);
        let habit = service.create(&user(), daily("Walk")).await.unwrap();
        let today = today_in(chrono_tz::UTC);

        for back in 0..3 {
            service
                .toggle(&user(), habit.id, Some(today - Duration::days(back)), chrono_tz::UTC)
                .await
                .unwrap();
        }
        let habit = service.get(&user(), habit.id).await.unwrap();
        assert_eq!(habit.streak, 3);
        assert_eq!(habit.longest_streak, 3);
    }

    #[tokio::test]
    async fn future_toggle_rejected() {
        let repos = Repositories::memory();
        let service = HabitService::new(&repos);
        let habit = service.create(&user(), daily("Plan")).await.unwrap();
        let tomorrow = today_in(chrono_tz::UTC) + Duration::days(2);

        let err = service
            .toggle(&user(), habit.id, Some(tomorrow), chrono_tz::UTC)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn ancient_toggle_rejected_before_logging() {
        let repos = Repositories::memory();
        let service = HabitService::new(&repos);
        let habit = service.create(&user(), daily("Plan")).await.unwrap();
        let ancient = NaiveDate::from_ymd_opt(-262143, 1, 1).unwrap();

        let err = service
            .toggle(&user(), habit.id, Some(ancient), chrono_tz::UTC)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let logs = repos.logs.completions(&user(), habit.id).await.unwrap();
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn today_lists_due_habits_only() {
        let repos = Repositories::memory();
        let service = HabitService::new(&repos);
        let due = service.create(&user(), daily("Due")).await.unwrap();
        let archived = service.create(&user(), daily("Archived")).await.unwrap();
        service.set_archived(&user(), archived.id, true).await.unwrap();

        service.toggle(&user(), due.id, None, chrono_tz::UTC).await.unwrap();
        let today = service.today(&user(), chrono_tz::UTC).await.unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].habit.id, due.id);
        assert!(today[0].status.completed_today);
    }

    #[tokio::test]
    async fn frequency_change_rejudges_history() {
        let repos = Repositories::memory();
        let service = HabitService::new(&repos);
        let habit = service.create(&user(), daily("Gym")).await.unwrap();
        service.toggle(&user(), habit.id, None, chrono_tz::UTC).await.unwrap();

        let patch = HabitPatch {
            frequency: Some(Frequency::WeeklyTimes(3)),
            ..HabitPatch::default()
        };
        let updated = service
            .update(&user(), habit.id, patch, chrono_tz::UTC)
            .await
            .unwrap();
        // One completion does not meet a weekly quota of three yet
        assert_eq!(updated.streak, 0);
    }
}
