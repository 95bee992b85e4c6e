//! Daily tasks, the local-midnight reset and the login reward
//!
//! The reset is lazy: it runs at the start of every daily request and is a
//! no-op once the user's marker covers today. Marker advance and task reset
//! are one atomic repository call, so concurrent requests reset once.
//!
//! A completion or claim is written first and rolled back with a
//! conditional write if its experience grant fails, so the day's reward
//! stays claimable.

use chrono::{DateTime, FixedOffset, Utc};
use questlog_core::constants::DEFAULT_TASK_XP_REWARD;
use questlog_core::daily::{
    format_countdown, is_claimable, local_date, offset_from_minutes, plan_claim, plan_reset,
    time_until_reset, RewardState,
};
use questlog_core::{CharacterStats, StatDelta};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::progression::ExperienceGrant;
use super::{AppContext, ProgressionService};
use crate::error::ServiceError;
use crate::inflight::Operation;
use crate::metrics::ServerMetrics;
use crate::storage::repository::{DailyTask, NewTask, TaskUpdate};

const MAX_TASK_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct RewardStatus {
    pub claimable: bool,
    pub current_streak: u32,
    pub last_claimed_at: Option<DateTime<Utc>>,
    /// Experience a claim right now would grant
    pub next_reward_xp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyStatus {
    pub tasks: Vec<DailyTask>,
    pub reset_applied: bool,
    pub reward: RewardStatus,
    pub seconds_until_reset: i64,
    pub countdown: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskCompletion {
    pub task: DailyTask,
    pub experience: ExperienceGrant,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardClaim {
    pub previous_streak: u32,
    pub current_streak: u32,
    pub experience: ExperienceGrant,
}

#[derive(Clone)]
pub struct DailyService {
    ctx: Arc<AppContext>,
    progression: ProgressionService,
}

fn clean_title(raw: &str) -> Result<String, ServiceError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ServiceError::Validation("title is required".to_string()));
    }
    if title.chars().count() > MAX_TASK_TITLE_CHARS {
        return Err(ServiceError::Validation(format!(
            "title is longer than {MAX_TASK_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

fn clean_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|d| !d.is_empty()).map(str::to_string)
}

fn check_reward(xp_reward: u32) -> Result<u32, ServiceError> {
    if xp_reward == 0 {
        return Err(ServiceError::Validation("xp_reward must be positive".to_string()));
    }
    Ok(xp_reward)
}

impl DailyService {
    pub fn new(ctx: Arc<AppContext>, progression: ProgressionService) -> Self {
        Self { ctx, progression }
    }

    /// Run the day-boundary reset if the marker is behind today.
    /// Returns whether this call performed it.
    pub async fn ensure_reset(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<bool, ServiceError> {
        let today = local_date(now, offset);
        let last = self.ctx.storage.resets.last_reset_on(user_id).await?;
        let Some(plan) = plan_reset(last, today, self.ctx.settings.streak_policy) else {
            return Ok(false);
        };

        let applied = self.ctx.storage.resets.apply_reset(user_id, &plan).await?;
        if applied {
            info!(
                %user_id,
                %today,
                reset_all_streaks = plan.reset_all_streaks,
                "daily tasks reset"
            );
        } else {
            debug!(%user_id, %today, "reset already done by a concurrent request");
        }
        Ok(applied)
    }

    pub async fn status(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        tz_offset_minutes: i32,
    ) -> Result<DailyStatus, ServiceError> {
        let offset = offset_from_minutes(tz_offset_minutes)?;
        let reset_applied = self.ensure_reset(user_id, now, offset).await?;
        let tasks = self.ctx.storage.tasks.list(user_id).await?;

        let state = self.ctx.storage.rewards.get_or_create(user_id).await?;
        let next_reward_xp = plan_claim(&state, now, offset, self.ctx.settings.streak_policy)
            .map(|plan| plan.experience)
            .unwrap_or(0);
        let remaining = time_until_reset(now, offset);

        Ok(DailyStatus {
            tasks,
            reset_applied,
            reward: RewardStatus {
                claimable: is_claimable(&state, now, offset),
                current_streak: state.current_streak,
                last_claimed_at: state.last_claimed_at,
                next_reward_xp,
            },
            seconds_until_reset: remaining.num_seconds(),
            countdown: format_countdown(remaining),
        })
    }

    pub async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<DailyTask>, ServiceError> {
        Ok(self.ctx.storage.tasks.list(user_id).await?)
    }

    pub async fn create_task(
        &self,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        xp_reward: Option<u32>,
    ) -> Result<DailyTask, ServiceError> {
        let task = NewTask {
            title: clean_title(title)?,
            description: clean_description(description),
            xp_reward: check_reward(xp_reward.unwrap_or(DEFAULT_TASK_XP_REWARD))?,
        };
        let created = self.ctx.storage.tasks.create(user_id, &task).await?;
        debug!(%user_id, task_id = %created.id, "daily task created");
        Ok(created)
    }

    /// `description: Some(None)` clears the description
    pub async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        title: Option<&str>,
        description: Option<Option<&str>>,
        xp_reward: Option<u32>,
    ) -> Result<DailyTask, ServiceError> {
        let update = TaskUpdate {
            title: title.map(clean_title).transpose()?,
            description: description.map(clean_description),
            xp_reward: xp_reward.map(check_reward).transpose()?,
        };
        self.ctx
            .storage
            .tasks
            .update(user_id, task_id, &update)
            .await?
            .ok_or_else(|| ServiceError::NotFound("task".to_string()))
    }

    pub async fn complete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        now: DateTime<Utc>,
        tz_offset_minutes: i32,
    ) -> Result<TaskCompletion, ServiceError> {
        let offset = offset_from_minutes(tz_offset_minutes)?;
        let _ticket = self.ctx.inflight.try_acquire(user_id, Operation::CompleteTask)?;
        self.ensure_reset(user_id, now, offset).await?;

        let tasks = &self.ctx.storage.tasks;
        let before = tasks
            .get(user_id, task_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("task".to_string()))?;
        if before.completed {
            warn!(%user_id, %task_id, "task already completed today");
            return Err(ServiceError::Conflict("task already completed today".to_string()));
        }
        let Some(task) = tasks.mark_completed(user_id, task_id, now).await? else {
            warn!(%user_id, %task_id, "task completed by a concurrent request");
            return Err(ServiceError::Conflict("task already completed today".to_string()));
        };

        let mut experience = match self
            .progression
            .grant_experience(user_id, u64::from(task.xp_reward), now)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                self.undo_completion(user_id, task_id, now, before.last_completed).await;
                return Err(e);
            }
        };
        if let Some(stats) = self.bump_counter(user_id, StatDelta::new().tasks_completed(1)).await {
            experience.stats = stats;
        }
        ServerMetrics::incr(&self.ctx.metrics.tasks_completed);

        info!(%user_id, %task_id, streak = task.streak, xp = task.xp_reward, "task completed");
        Ok(TaskCompletion { task, experience })
    }

    pub async fn claim_reward(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        tz_offset_minutes: i32,
    ) -> Result<RewardClaim, ServiceError> {
        let offset = offset_from_minutes(tz_offset_minutes)?;
        let _ticket = self.ctx.inflight.try_acquire(user_id, Operation::ClaimReward)?;

        let rewards = &self.ctx.storage.rewards;
        let state = rewards.get_or_create(user_id).await?;
        let plan = plan_claim(&state, now, offset, self.ctx.settings.streak_policy)
            .inspect_err(|_| warn!(%user_id, "daily reward already claimed"))?;

        let claimed = rewards
            .claim(user_id, state.last_claimed_at, plan.claimed_at, plan.new_streak)
            .await?;
        if !claimed {
            warn!(%user_id, "daily reward claimed by a concurrent request");
            return Err(ServiceError::Conflict("daily reward already claimed today".to_string()));
        }

        let mut experience = match self
            .progression
            .grant_experience(user_id, plan.experience, now)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                self.undo_claim(user_id, plan.claimed_at, state).await;
                return Err(e);
            }
        };
        if let Some(stats) = self.bump_counter(user_id, StatDelta::new().streak_days(1)).await {
            experience.stats = stats;
        }
        ServerMetrics::incr(&self.ctx.metrics.rewards_claimed);

        info!(%user_id, streak = plan.new_streak, xp = plan.experience, "daily reward claimed");
        Ok(RewardClaim {
            previous_streak: plan.previous_streak,
            current_streak: plan.new_streak,
            experience,
        })
    }

    /// Counters follow a grant that already landed; a failed bump is only logged
    async fn bump_counter(&self, user_id: Uuid, delta: StatDelta) -> Option<CharacterStats> {
        self.progression
            .apply_delta(user_id, &delta)
            .await
            .inspect_err(|e| warn!(%user_id, ?delta, error = %e, "counter update failed"))
            .ok()
    }

    async fn undo_completion(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        completed_at: DateTime<Utc>,
        previous_last: Option<DateTime<Utc>>,
    ) {
        let tasks = &self.ctx.storage.tasks;
        match tasks.revert_completion(user_id, task_id, completed_at, previous_last).await {
            Ok(true) => info!(%user_id, %task_id, "task completion rolled back"),
            Ok(false) => warn!(%user_id, %task_id, "task changed before rollback"),
            Err(e) => error!(%user_id, %task_id, error = %e, "task completion rollback failed"),
        }
    }

    async fn undo_claim(&self, user_id: Uuid, claimed_at: DateTime<Utc>, previous: RewardState) {
        match self.ctx.storage.rewards.revert_claim(user_id, claimed_at, previous).await {
            Ok(true) => info!(%user_id, "daily reward claim rolled back"),
            Ok(false) => warn!(%user_id, "daily reward changed before rollback"),
            Err(e) => error!(%user_id, error = %e, "daily reward rollback failed"),
        }
    }
}
