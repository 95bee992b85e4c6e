//! In-memory storage backend
//!
//! Implements every repository trait over one mutex-guarded state. Each
//! operation runs entirely under the lock, which gives it the same
//! all-or-nothing behaviour as the conditional statements and transactions
//! of the PostgreSQL backend. Used by `STORAGE_BACKEND=memory` and the
//! integration tests.
//!
//! `created_at` is stamped from the wall clock at insert, as the PostgreSQL
//! column default is, and is never read back for ordering: lists follow
//! insertion order.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use questlog_core::calendar::CalendarEntry;
use questlog_core::daily::{ResetPlan, RewardState};
use questlog_core::profile::{AvatarCustomization, PlayerProfile};
use questlog_core::skills::NewSkill;
use questlog_core::{CharacterStats, Progress, StatDelta};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::repository::*;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryState {
    stats: HashMap<Uuid, CharacterStats>,
    /// Insertion order
    tasks: Vec<DailyTask>,
    reset_markers: HashMap<Uuid, NaiveDate>,
    rewards: HashMap<Uuid, RewardState>,
    /// Insertion order
    skills: Vec<Skill>,
    profiles: HashMap<Uuid, PlayerProfile>,
    calendar: Vec<CalendarTask>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's stats row
    pub fn put_stats(&self, user_id: Uuid, stats: CharacterStats) {
        self.state.lock().stats.insert(user_id, stats);
    }

    /// Overwrite a user's reward row
    pub fn put_reward(&self, user_id: Uuid, reward: RewardState) {
        self.state.lock().rewards.insert(user_id, reward);
    }

    /// Overwrite a user's reset marker
    pub fn put_reset_marker(&self, user_id: Uuid, date: NaiveDate) {
        self.state.lock().reset_markers.insert(user_id, date);
    }

    pub fn skill_count(&self, user_id: Uuid) -> usize {
        self.state.lock().skills.iter().filter(|s| s.user_id == user_id).count()
    }
}

// ============================================================================
// Stats
// ============================================================================

#[async_trait]
impl StatsRepo for MemoryStore {
    async fn get(&self, user_id: Uuid) -> RepoResult<Option<CharacterStats>> {
        Ok(self.state.lock().stats.get(&user_id).cloned())
    }

    async fn create_default(&self, user_id: Uuid) -> RepoResult<CharacterStats> {
        let mut state = self.state.lock();
        let stats = state.stats.entry(user_id).or_insert_with(|| {
            debug!(%user_id, "created default stats");
            CharacterStats::default()
        });
        Ok(stats.clone())
    }

    async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &StatDelta,
    ) -> RepoResult<Option<CharacterStats>> {
        let mut state = self.state.lock();
        let Some(current) = state.stats.get_mut(&user_id) else {
            return Ok(None);
        };
        match delta.apply_to(current) {
            Some(next) => {
                *current = next.clone();
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }

    async fn compare_and_set_progress(
        &self,
        user_id: Uuid,
        expected: Progress,
        next: Progress,
    ) -> RepoResult<Option<CharacterStats>> {
        let mut state = self.state.lock();
        let Some(current) = state.stats.get_mut(&user_id) else {
            return Ok(None);
        };
        if current.progress() != expected {
            return Ok(None);
        }
        *current = current.clone().with_progress(next);
        Ok(Some(current.clone()))
    }
}

// ============================================================================
// Tasks
// ============================================================================

#[async_trait]
impl TaskRepo for MemoryStore {
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<DailyTask>> {
        let state = self.state.lock();
        Ok(state
            .tasks
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<Option<DailyTask>> {
        let state = self.state.lock();
        Ok(state
            .tasks
            .iter()
            .find(|t| t.id == task_id && t.user_id == user_id)
            .cloned())
    }

    async fn create(&self, user_id: Uuid, task: &NewTask) -> RepoResult<DailyTask> {
        let record = DailyTask {
            id: Uuid::new_v4(),
            user_id,
            title: task.title.clone(),
            description: task.description.clone(),
            completed: false,
            streak: 0,
            xp_reward: task.xp_reward,
            last_completed: None,
            created_at: Utc::now(),
        };
        self.state.lock().tasks.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> RepoResult<Option<DailyTask>> {
        let mut state = self.state.lock();
        let Some(task) = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(title) = &update.title {
            task.title = title.clone();
        }
        if let Some(description) = &update.description {
            task.description = description.clone();
        }
        if let Some(xp_reward) = update.xp_reward {
            task.xp_reward = xp_reward;
        }
        Ok(Some(task.clone()))
    }

    async fn mark_completed(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<DailyTask>> {
        let mut state = self.state.lock();
        let Some(task) = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.user_id == user_id && !t.completed)
        else {
            return Ok(None);
        };
        task.completed = true;
        task.last_completed = Some(at);
        task.streak = task.streak.saturating_add(1);
        Ok(Some(task.clone()))
    }

    async fn revert_completion(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        completed_at: DateTime<Utc>,
        previous_last: Option<DateTime<Utc>>,
    ) -> RepoResult<bool> {
        let mut state = self.state.lock();
        let Some(task) = state.tasks.iter_mut().find(|t| {
            t.id == task_id
                && t.user_id == user_id
                && t.completed
                && t.last_completed == Some(completed_at)
        }) else {
            return Ok(false);
        };
        task.completed = false;
        task.last_completed = previous_last;
        task.streak = task.streak.saturating_sub(1);
        Ok(true)
    }
}

// ============================================================================
// Daily reset
// ============================================================================

#[async_trait]
impl DailyResetRepo for MemoryStore {
    async fn last_reset_on(&self, user_id: Uuid) -> RepoResult<Option<NaiveDate>> {
        Ok(self.state.lock().reset_markers.get(&user_id).copied())
    }

    async fn apply_reset(&self, user_id: Uuid, plan: &ResetPlan) -> RepoResult<bool> {
        let mut state = self.state.lock();
        if state.reset_markers.get(&user_id).copied() != plan.previous {
            return Ok(false);
        }
        state.reset_markers.insert(user_id, plan.today);
        for task in state.tasks.iter_mut().filter(|t| t.user_id == user_id) {
            task.streak = plan.streak_after(task.completed, task.streak);
            task.completed = false;
            task.last_completed = None;
        }
        Ok(true)
    }
}

// ============================================================================
// Daily reward
// ============================================================================

#[async_trait]
impl DailyRewardRepo for MemoryStore {
    async fn get_or_create(&self, user_id: Uuid) -> RepoResult<RewardState> {
        Ok(*self.state.lock().rewards.entry(user_id).or_default())
    }

    async fn claim(
        &self,
        user_id: Uuid,
        expected_last: Option<DateTime<Utc>>,
        claimed_at: DateTime<Utc>,
        new_streak: u32,
    ) -> RepoResult<bool> {
        let mut state = self.state.lock();
        let Some(reward) = state.rewards.get_mut(&user_id) else {
            return Ok(false);
        };
        if reward.last_claimed_at != expected_last {
            return Ok(false);
        }
        reward.last_claimed_at = Some(claimed_at);
        reward.current_streak = new_streak;
        Ok(true)
    }

    async fn revert_claim(
        &self,
        user_id: Uuid,
        claimed_at: DateTime<Utc>,
        previous: RewardState,
    ) -> RepoResult<bool> {
        let mut state = self.state.lock();
        match state.rewards.get_mut(&user_id) {
            Some(reward) if reward.last_claimed_at == Some(claimed_at) => {
                *reward = previous;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ============================================================================
// Skills
// ============================================================================

#[async_trait]
impl SkillRepo for MemoryStore {
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Skill>> {
        let state = self.state.lock();
        Ok(state.skills.iter().filter(|s| s.user_id == user_id).cloned().collect())
    }

    async fn create_with_debit(
        &self,
        user_id: Uuid,
        skill: &NewSkill,
    ) -> RepoResult<Option<Skill>> {
        let mut state = self.state.lock();
        match state.stats.get(&user_id) {
            Some(stats) if stats.skill_points >= skill.cost => {}
            _ => return Ok(None),
        }
        if state
            .skills
            .iter()
            .any(|s| s.user_id == user_id && s.name == skill.name)
        {
            return Err(StoreError::Constraint("skill already exists".to_string()));
        }

        if let Some(stats) = state.stats.get_mut(&user_id) {
            stats.skill_points -= skill.cost;
        }
        let record = Skill {
            id: Uuid::new_v4(),
            user_id,
            name: skill.name.clone(),
            description: skill.description.clone(),
            level: skill.level,
            icon: skill.icon.clone(),
            power_level: skill.power_level.clone(),
            created_at: Utc::now(),
        };
        state.skills.push(record.clone());
        Ok(Some(record))
    }
}

// ============================================================================
// Profile
// ============================================================================

#[async_trait]
impl ProfileRepo for MemoryStore {
    async fn get(&self, user_id: Uuid) -> RepoResult<Option<PlayerProfile>> {
        Ok(self.state.lock().profiles.get(&user_id).cloned())
    }

    async fn set_username(&self, user_id: Uuid, username: &str) -> RepoResult<PlayerProfile> {
        let mut state = self.state.lock();
        let taken = state
            .profiles
            .iter()
            .any(|(owner, p)| *owner != user_id && p.username.as_deref() == Some(username));
        if taken {
            return Err(StoreError::Constraint("username already exists".to_string()));
        }
        let profile = state.profiles.entry(user_id).or_default();
        profile.username = Some(username.to_string());
        Ok(profile.clone())
    }

    async fn set_profession(&self, user_id: Uuid, profession: &str) -> RepoResult<PlayerProfile> {
        let mut state = self.state.lock();
        let profile = state.profiles.entry(user_id).or_default();
        profile.profession = Some(profession.to_string());
        Ok(profile.clone())
    }

    async fn set_avatar(
        &self,
        user_id: Uuid,
        avatar: &AvatarCustomization,
    ) -> RepoResult<PlayerProfile> {
        let mut state = self.state.lock();
        let profile = state.profiles.entry(user_id).or_default();
        profile.avatar = Some(avatar.clone());
        Ok(profile.clone())
    }
}

// ============================================================================
// Calendar
// ============================================================================

#[async_trait]
impl CalendarRepo for MemoryStore {
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<CalendarTask>> {
        let state = self.state.lock();
        let mut tasks: Vec<_> = state
            .calendar
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.start_time);
        Ok(tasks)
    }

    async fn create(&self, user_id: Uuid, entry: &CalendarEntry) -> RepoResult<CalendarTask> {
        let record = CalendarTask {
            id: Uuid::new_v4(),
            user_id,
            title: entry.title.clone(),
            description: entry.description.clone(),
            category: entry.category,
            start_time: entry.start_time,
            end_time: entry.end_time,
            reminder_time: entry.reminder_time,
            created_at: Utc::now(),
        };
        self.state.lock().calendar.push(record.clone());
        Ok(record)
    }
}
