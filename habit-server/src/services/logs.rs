//! Habit log use cases
//!
//! Logs are addressed through their habit; a log that belongs to another
//! habit (or user) is reported as missing. Every write refreshes the
//! habit's streak columns.

use chrono_tz::Tz;
use habit_core::models::{HabitLog, LogPatch, NewHabitLog, TimeRange, UserId};
use uuid::Uuid;

use super::habits::HabitService;
use super::ServiceResult;
use crate::store::{DbError, Repositories};

pub struct LogService<'a> {
    repos: &'a Repositories,
}

impl<'a> LogService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    pub async fn list(
        &self,
        user: &UserId,
        habit_id: Uuid,
        range: TimeRange,
    ) -> ServiceResult<Vec<HabitLog>> {
        self.repos.habits.get(user, habit_id).await?;
        Ok(self.repos.logs.list_for_habit(user, habit_id, range).await?)
    }

    pub async fn create(
        &self,
        user: &UserId,
        new: NewHabitLog,
        tz: Tz,
    ) -> ServiceResult<HabitLog> {
        let habit = self.repos.habits.get(user, new.habit_id).await?;
        let log = self.repos.logs.create(user, new).await?;
        HabitService::new(self.repos)
            .refresh_streak(user, &habit, tz)
            .await?;
        tracing::info!(user = %user, habit_id = %habit.id, log_id = %log.id, "log created");
        Ok(log)
    }

    pub async fn update(
        &self,
        user: &UserId,
        habit_id: Uuid,
        log_id: Uuid,
        patch: LogPatch,
        tz: Tz,
    ) -> ServiceResult<HabitLog> {
        self.owned(user, habit_id, log_id).await?;
        let moved = patch.completed_at.is_some();
        let log = self.repos.logs.update(user, log_id, patch).await?;
        if moved {
            self.refresh(user, habit_id, tz).await?;
        }
        Ok(log)
    }

    pub async fn delete(
        &self,
        user: &UserId,
        habit_id: Uuid,
        log_id: Uuid,
        tz: Tz,
    ) -> ServiceResult<()> {
        self.owned(user, habit_id, log_id).await?;
        self.repos.logs.delete(user, log_id).await?;
        self.refresh(user, habit_id, tz).await?;
        tracing::info!(user = %user, %habit_id, %log_id, "log deleted");
        Ok(())
    }

    /// The log, if it belongs to `habit_id` of `user`.
    async fn owned(&self, user: &UserId, habit_id: Uuid, log_id: Uuid) -> ServiceResult<HabitLog> {
        let log = self.repos.logs.get(user, log_id).await?;
        if log.habit_id != habit_id {
            return Err(DbError::not_found("log", log_id).into());
        }
        Ok(log)
    }

    async fn refresh(&self, user: &UserId, habit_id: Uuid, tz: Tz) -> ServiceResult<()> {
        let habit = self.repos.habits.get(user, habit_id).await?;
        HabitService::new(self.repos)
            .refresh_streak(user, &habit, tz)
            .await?;
        Ok(())
    }
}
