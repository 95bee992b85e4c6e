//! Repository traits - abstraction layer for data access
//!
//! Services only ever see these traits. Every mutation that can race is
//! expressed as a conditional or atomic operation so the backend, not the
//! caller, decides who wins.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use questlog_core::calendar::{CalendarCategory, CalendarEntry};
use questlog_core::daily::{ResetPlan, RewardState};
use questlog_core::profile::{AvatarCustomization, PlayerProfile};
use questlog_core::skills::NewSkill;
use questlog_core::{CharacterStats, Progress, StatDelta};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, StoreError>;

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub streak: u32,
    pub xp_reward: u32,
    pub last_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub xp_reward: u32,
}

/// Fields replaced by an edit; `None` leaves the field as is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub xp_reward: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub level: u32,
    pub icon: String,
    pub power_level: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: CalendarCategory,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Player Data Repositories
// ============================================================================

/// Character stats, one row per user
#[async_trait]
pub trait StatsRepo: Send + Sync {
    async fn get(&self, user_id: Uuid) -> RepoResult<Option<CharacterStats>>;
    /// Insert defaults if absent; returns whatever row exists afterwards
    async fn create_default(&self, user_id: Uuid) -> RepoResult<CharacterStats>;
    /// Atomic increments. `None` if the row is missing or a field would go negative.
    async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &StatDelta,
    ) -> RepoResult<Option<CharacterStats>>;
    /// Write `next` only if the stored progress still equals `expected`
    async fn compare_and_set_progress(
        &self,
        user_id: Uuid,
        expected: Progress,
        next: Progress,
    ) -> RepoResult<Option<CharacterStats>>;
}

/// Recurring daily tasks
#[async_trait]
pub trait TaskRepo: Send + Sync {
    /// Newest first
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<DailyTask>>;
    async fn get(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<Option<DailyTask>>;
    async fn create(&self, user_id: Uuid, task: &NewTask) -> RepoResult<DailyTask>;
    async fn update(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> RepoResult<Option<DailyTask>>;
    /// Mark done and bump the streak, only if not already completed
    async fn mark_completed(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<DailyTask>>;
    /// Undo the completion stamped `completed_at`, restoring `previous_last`
    /// and the streak before it. `false` if the task has moved on since.
    async fn revert_completion(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        completed_at: DateTime<Utc>,
        previous_last: Option<DateTime<Utc>>,
    ) -> RepoResult<bool>;
}

/// Day-boundary marker plus the task reset it guards
#[async_trait]
pub trait DailyResetRepo: Send + Sync {
    async fn last_reset_on(&self, user_id: Uuid) -> RepoResult<Option<NaiveDate>>;
    /// Move the marker from `plan.previous` to `plan.today` and reset the
    /// user's tasks, atomically. `false` if another reset got there first.
    async fn apply_reset(&self, user_id: Uuid, plan: &ResetPlan) -> RepoResult<bool>;
}

/// Daily login reward, one row per user
#[async_trait]
pub trait DailyRewardRepo: Send + Sync {
    async fn get_or_create(&self, user_id: Uuid) -> RepoResult<RewardState>;
    /// Record a claim only if `last_claimed_at` still equals `expected_last`
    async fn claim(
        &self,
        user_id: Uuid,
        expected_last: Option<DateTime<Utc>>,
        claimed_at: DateTime<Utc>,
        new_streak: u32,
    ) -> RepoResult<bool>;
    /// Put `previous` back if the claim at `claimed_at` is still the latest
    async fn revert_claim(
        &self,
        user_id: Uuid,
        claimed_at: DateTime<Utc>,
        previous: RewardState,
    ) -> RepoResult<bool>;
}

/// Approved skills
#[async_trait]
pub trait SkillRepo: Send + Sync {
    /// Oldest first
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Skill>>;
    /// Debit `skill.cost` skill points and insert the skill in one
    /// transaction. `None` when the points are not there.
    async fn create_with_debit(&self, user_id: Uuid, skill: &NewSkill) -> RepoResult<Option<Skill>>;
}

/// Username, profession, avatar
#[async_trait]
pub trait ProfileRepo: Send + Sync {
    async fn get(&self, user_id: Uuid) -> RepoResult<Option<PlayerProfile>>;
    async fn set_username(&self, user_id: Uuid, username: &str) -> RepoResult<PlayerProfile>;
    async fn set_profession(&self, user_id: Uuid, profession: &str) -> RepoResult<PlayerProfile>;
    async fn set_avatar(
        &self,
        user_id: Uuid,
        avatar: &AvatarCustomization,
    ) -> RepoResult<PlayerProfile>;
}

/// Scheduled calendar entries
#[async_trait]
pub trait CalendarRepo: Send + Sync {
    /// Ordered by start time
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<CalendarTask>>;
    async fn create(&self, user_id: Uuid, entry: &CalendarEntry) -> RepoResult<CalendarTask>;
}

// ============================================================================
// Unified Storage Manager
// ============================================================================

/// Central storage manager that holds all repositories
pub struct StorageManager {
    pub backend: &'static str,
    pub stats: Box<dyn StatsRepo>,
    pub tasks: Box<dyn TaskRepo>,
    pub resets: Box<dyn DailyResetRepo>,
    pub rewards: Box<dyn DailyRewardRepo>,
    pub skills: Box<dyn SkillRepo>,
    pub profiles: Box<dyn ProfileRepo>,
    pub calendar: Box<dyn CalendarRepo>,
}
