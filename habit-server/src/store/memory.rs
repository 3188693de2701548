//! In-memory repositories for `serve --in-memory` and tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use habit_core::models::{
    Goal, GoalPatch, Habit, HabitFilter, HabitLog, HabitPatch, LogPatch, NewGoal, NewHabit,
    NewHabitLog, Paginated, Pagination, Progress, StreakFields, TimeRange, UserId,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DbError, GoalRepository, HabitRepository, LogRepository, ToggleOutcome};

#[derive(Default)]
struct Tables {
    habits: HashMap<Uuid, Habit>,
    logs: HashMap<Uuid, HabitLog>,
    goals: HashMap<Uuid, Goal>,
}

impl Tables {
    fn habit(&self, user: &UserId, id: Uuid) -> Result<&Habit, DbError> {
        self.habits
            .get(&id)
            .filter(|h| &h.user_id == user)
            .ok_or_else(|| DbError::not_found("habit", id))
    }

    fn habit_mut(&mut self, user: &UserId, id: Uuid) -> Result<&mut Habit, DbError> {
        self.habits
            .get_mut(&id)
            .filter(|h| &h.user_id == user)
            .ok_or_else(|| DbError::not_found("habit", id))
    }

    fn log_mut(&mut self, user: &UserId, id: Uuid) -> Result<&mut HabitLog, DbError> {
        self.logs
            .get_mut(&id)
            .filter(|l| &l.user_id == user)
            .ok_or_else(|| DbError::not_found("log", id))
    }

    fn goal_mut(&mut self, user: &UserId, id: Uuid) -> Result<&mut Goal, DbError> {
        self.goals
            .get_mut(&id)
            .filter(|g| &g.user_id == user)
            .ok_or_else(|| DbError::not_found("goal", id))
    }

    fn logs_of<'a>(
        &'a self,
        user: &'a UserId,
        range: TimeRange,
    ) -> impl Iterator<Item = &'a HabitLog> + 'a {
        self.logs
            .values()
            .filter(move |l| &l.user_id == user && range.contains(l.completed_at))
    }
}

fn newest_first(mut logs: Vec<HabitLog>) -> Vec<HabitLog> {
    logs.sort_by(|a, b| {
        b.completed_at
            .cmp(&a.completed_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    logs
}

/// All three repositories over one lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HabitRepository for MemoryStore {
    async fn list(
        &self,
        user: &UserId,
        filter: &HabitFilter,
        page: Pagination,
    ) -> Result<Paginated<Habit>, DbError> {
        let tables = self.tables.read().await;
        let mut habits: Vec<Habit> = tables
            .habits
            .values()
            .filter(|h| &h.user_id == user && filter.matches(h))
            .cloned()
            .collect();
        habits.sort_by(|a, b| filter.compare(a, b));
        Ok(page.slice(habits))
    }

    async fn list_all(&self, user: &UserId) -> Result<Vec<Habit>, DbError> {
        let tables = self.tables.read().await;
        let mut habits: Vec<Habit> = tables
            .habits
            .values()
            .filter(|h| &h.user_id == user)
            .cloned()
            .collect();
        habits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(habits)
    }

    async fn get(&self, user: &UserId, id: Uuid) -> Result<Habit, DbError> {
        self.tables.read().await.habit(user, id).cloned()
    }

    async fn existing_ids(&self, user: &UserId, ids: &[Uuid]) -> Result<Vec<Uuid>, DbError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.habit(user, *id).is_ok())
            .collect())
    }

    async fn create(&self, user: &UserId, new: NewHabit) -> Result<Habit, DbError> {
        let habit = Habit::from_new(Uuid::new_v4(), user.clone(), new, Utc::now());
        self.tables
            .write()
            .await
            .habits
            .insert(habit.id, habit.clone());
        Ok(habit)
    }

    async fn update(&self, user: &UserId, id: Uuid, patch: HabitPatch) -> Result<Habit, DbError> {
        let mut tables = self.tables.write().await;
        let habit = tables.habit_mut(user, id)?;
        habit.apply(patch, Utc::now());
        Ok(habit.clone())
    }

    async fn set_archived(
        &self,
        user: &UserId,
        id: Uuid,
        archived: bool,
    ) -> Result<Habit, DbError> {
        let mut tables = self.tables.write().await;
        let habit = tables.habit_mut(user, id)?;
        habit.set_archived(archived, Utc::now());
        Ok(habit.clone())
    }

    async fn set_streak(
        &self,
        user: &UserId,
        id: Uuid,
        fields: StreakFields,
    ) -> Result<Habit, DbError> {
        let mut tables = self.tables.write().await;
        let habit = tables.habit_mut(user, id)?;
        habit.streak = fields.streak;
        habit.longest_streak = fields.longest_streak;
        habit.last_completed = fields.last_completed;
        Ok(habit.clone())
    }

    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.habit(user, id)?;
        tables.habits.remove(&id);
        tables.logs.retain(|_, log| log.habit_id != id);
        Ok(())
    }
}

#[async_trait]
impl LogRepository for MemoryStore {
    async fn list_for_habit(
        &self,
        user: &UserId,
        habit_id: Uuid,
        range: TimeRange,
    ) -> Result<Vec<HabitLog>, DbError> {
        let tables = self.tables.read().await;
        let logs = tables
            .logs_of(user, range)
            .filter(|l| l.habit_id == habit_id)
            .cloned()
            .collect();
        Ok(newest_first(logs))
    }

    async fn list_for_user(
        &self,
        user: &UserId,
        range: TimeRange,
    ) -> Result<Vec<HabitLog>, DbError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.logs_of(user, range).cloned().collect()))
    }

    async fn completions(
        &self,
        user: &UserId,
        habit_id: Uuid,
    ) -> Result<Vec<DateTime<Utc>>, DbError> {
        let tables = self.tables.read().await;
        let mut times: Vec<_> = tables
            .logs_of(user, TimeRange::all())
            .filter(|l| l.habit_id == habit_id)
            .map(|l| l.completed_at)
            .collect();
        times.sort();
        Ok(times)
    }

    async fn get(&self, user: &UserId, id: Uuid) -> Result<HabitLog, DbError> {
        self.tables
            .read()
            .await
            .logs
            .get(&id)
            .filter(|l| &l.user_id == user)
            .cloned()
            .ok_or_else(|| DbError::not_found("log", id))
    }

    async fn create(&self, user: &UserId, new: NewHabitLog) -> Result<HabitLog, DbError> {
        let mut tables = self.tables.write().await;
        tables.habit(user, new.habit_id)?;
        let log = HabitLog::from_new(Uuid::new_v4(), user.clone(), new, Utc::now());
        tables.logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn update(&self, user: &UserId, id: Uuid, patch: LogPatch) -> Result<HabitLog, DbError> {
        let mut tables = self.tables.write().await;
        let log = tables.log_mut(user, id)?;
        log.apply(patch, Utc::now());
        Ok(log.clone())
    }

    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.log_mut(user, id)?;
        tables.logs.remove(&id);
        Ok(())
    }

    async fn toggle(
        &self,
        user: &UserId,
        habit_id: Uuid,
        day: TimeRange,
        at: DateTime<Utc>,
    ) -> Result<ToggleOutcome, DbError> {
        let mut tables = self.tables.write().await;
        tables.habit(user, habit_id)?;

        let before = tables.logs.len();
        tables.logs.retain(|_, l| {
            !(l.habit_id == habit_id && &l.user_id == user && day.contains(l.completed_at))
        });
        let removed = (before - tables.logs.len()) as u64;
        if removed > 0 {
            return Ok(ToggleOutcome {
                completed: false,
                log: None,
                removed,
            });
        }

        let log = HabitLog::from_new(
            Uuid::new_v4(),
            user.clone(),
            NewHabitLog::completion(habit_id, at),
            Utc::now(),
        );
        tables.logs.insert(log.id, log.clone());
        Ok(ToggleOutcome {
            completed: true,
            log: Some(log),
            removed: 0,
        })
    }
}

#[async_trait]
impl GoalRepository for MemoryStore {
    async fn list(
        &self,
        user: &UserId,
        completed: Option<bool>,
        page: Pagination,
    ) -> Result<Paginated<Goal>, DbError> {
        let mut goals: Vec<Goal> = GoalRepository::list_all(self, user)
            .await?
            .into_iter()
            .filter(|g| completed.map_or(true, |c| g.is_completed == c))
            .collect();
        goals.reverse();
        Ok(page.slice(goals))
    }

    async fn list_all(&self, user: &UserId) -> Result<Vec<Goal>, DbError> {
        let tables = self.tables.read().await;
        let mut goals: Vec<Goal> = tables
            .goals
            .values()
            .filter(|g| &g.user_id == user)
            .cloned()
            .collect();
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(goals)
    }

    async fn get(&self, user: &UserId, id: Uuid) -> Result<Goal, DbError> {
        self.tables
            .read()
            .await
            .goals
            .get(&id)
            .filter(|g| &g.user_id == user)
            .cloned()
            .ok_or_else(|| DbError::not_found("goal", id))
    }

    async fn create(&self, user: &UserId, new: NewGoal) -> Result<Goal, DbError> {
        let goal = Goal::from_new(Uuid::new_v4(), user.clone(), new, Utc::now());
        self.tables
            .write()
            .await
            .goals
            .insert(goal.id, goal.clone());
        Ok(goal)
    }

    async fn update(&self, user: &UserId, id: Uuid, patch: GoalPatch) -> Result<Goal, DbError> {
        let mut tables = self.tables.write().await;
        let goal = tables.goal_mut(user, id)?;
        goal.apply(patch, Utc::now());
        Ok(goal.clone())
    }

    async fn save_progress(
        &self,
        user: &UserId,
        id: Uuid,
        progress: Progress,
    ) -> Result<Goal, DbError> {
        let mut tables = self.tables.write().await;
        let goal = tables.goal_mut(user, id)?;
        goal.record_progress(progress, Utc::now())?;
        Ok(goal.clone())
    }

    async fn delete(&self, user: &UserId, id: Uuid) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables.goal_mut(user, id)?;
        tables.goals.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use habit_core::models::{Frequency, HabitCategory, HabitColor, Name};

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn new_habit(name: &str) -> NewHabit {
        NewHabit {
            name: Name::new("name", name).unwrap(),
            description: None,
            category: HabitCategory::Fitness,
            color: HabitColor::Blue,
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
    async fn rows_are_scoped_by_user() {
        let store = MemoryStore::new();
        let alice = user("alice");
        let habit = HabitRepository::create(&store, &alice, new_habit("Run"))
            .await
            .unwrap();

        let err = HabitRepository::get(&store, &user("bob"), habit.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { resource: "habit", .. }));
        assert!(HabitRepository::get(&store, &alice, habit.id).await.is_ok());
    }

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let store = MemoryStore::new();
        let alice = user("alice");
        let habit = HabitRepository::create(&store, &alice, new_habit("Read"))
            .await
            .unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let day = TimeRange::local_day(at.date_naive(), chrono_tz::UTC);

        let first = store.toggle(&alice, habit.id, day, at).await.unwrap();
        assert!(first.completed);
        assert_eq!(store.completions(&alice, habit.id).await.unwrap(), vec![at]);

        let second = store.toggle(&alice, habit.id, day, at).await.unwrap();
        assert!(!second.completed);
        assert_eq!(second.removed, 1);
        assert!(store.completions(&alice, habit.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_habit_cascades_to_logs() {
        let store = MemoryStore::new();
        let alice = user("alice");
        let habit = HabitRepository::create(&store, &alice, new_habit("Meditate"))
            .await
            .unwrap();
        let log = LogRepository::create(&store, &alice, NewHabitLog::completion(habit.id, Utc::now()))
            .await
            .unwrap();

        HabitRepository::delete(&store, &alice, habit.id).await.unwrap();
        assert!(LogRepository::get(&store, &alice, log.id).await.is_err());
    }

    #[tokio::test]
    async fn log_for_foreign_habit_is_not_found() {
        let store = MemoryStore::new();
        let habit = HabitRepository::create(&store, &user("alice"), new_habit("Swim"))
            .await
            .unwrap();
        let err = LogRepository::create(
            &store,
            &user("bob"),
            NewHabitLog::completion(habit.id, Utc::now()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
