//! Goal use cases

use habit_core::models::{
    Goal, GoalPatch, NewGoal, Paginated, Pagination, Progress, RelatedHabit, UserId,
    ValidationError,
};
use uuid::Uuid;

use super::ServiceResult;
use crate::store::Repositories;

pub struct GoalService<'a> {
    repos: &'a Repositories,
}

impl<'a> GoalService<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    pub async fn list(
        &self,
        user: &UserId,
        completed: Option<bool>,
        page: Pagination,
    ) -> ServiceResult<Paginated<Goal>> {
        Ok(self.repos.goals.list(user, completed, page).await?)
    }

    pub async fn get(&self, user: &UserId, id: Uuid) -> ServiceResult<Goal> {
        Ok(self.repos.goals.get(user, id).await?)
    }

    pub async fn create(&self, user: &UserId, new: NewGoal) -> ServiceResult<Goal> {
        self.check_related(user, &new.related_habits).await?;
        let goal = self.repos.goals.create(user, new).await?;
        tracing::info!(user = %user, goal_id = %goal.id, "goal created");
        Ok(goal)
    }

    pub async fn update(&self, user: &UserId, id: Uuid, patch: GoalPatch) -> ServiceResult<Goal> {
        // Ownership first, so a foreign goal is 404 rather than 400
        self.repos.goals.get(user, id).await?;
        if let Some(links) = &patch.related_habits {
            self.check_related(user, links).await?;
        }
        Ok(self.repos.goals.update(user, id, patch).await?)
    }

    pub async fn delete(&self, user: &UserId, id: Uuid) -> ServiceResult<()> {
        self.repos.goals.delete(user, id).await?;
        tracing::info!(user = %user, goal_id = %id, "goal deleted");
        Ok(())
    }

    pub async fn record_progress(
        &self,
        user: &UserId,
        id: Uuid,
        progress: Progress,
    ) -> ServiceResult<Goal> {
        let goal = self.repos.goals.save_progress(user, id, progress).await?;
        if goal.is_completed {
            tracing::info!(user = %user, goal_id = %id, "goal completed");
        }
        Ok(goal)
    }

    /// Every linked habit must belong to `user`.
    async fn check_related(&self, user: &UserId, links: &[RelatedHabit]) -> ServiceResult<()> {
        let ids: Vec<Uuid> = links.iter().map(|l| l.habit_id).collect();
        let found = self.repos.habits.existing_ids(user, &ids).await?;
        if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(ValidationError::Invalid {
                field: "relatedHabits",
                reason: format!("habit '{}' not found", missing),
            }
            .into());
        }
        Ok(())
    }
}
