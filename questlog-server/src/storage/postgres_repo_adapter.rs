//! PostgreSQL Repository Adapters
//!
//! Implements the Repository traits from `repository.rs` using PostgresStore
//! as the backend. Converts between SQL row types and domain types.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use questlog_core::calendar::{CalendarCategory, CalendarEntry};
use questlog_core::daily::{ResetPlan, RewardState};
use questlog_core::profile::{AvatarCustomization, PlayerProfile};
use questlog_core::skills::NewSkill;
use questlog_core::{CharacterStats, Progress, StatBlock, StatDelta};
use std::sync::Arc;
use uuid::Uuid;

use super::postgres::{CalendarRow, PostgresStore, ProfileRow, SkillRow, StatsRow, TaskRow};
use super::repository::*;
use crate::error::StoreError;

// ============================================================================
// Type Conversion Helpers
// ============================================================================

fn counter(value: i32, field: &str) -> RepoResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{field} is negative: {value}")))
}

fn row_to_stats(row: &StatsRow) -> RepoResult<CharacterStats> {
    Ok(CharacterStats {
        base: StatBlock {
            strength: counter(row.strength, "strength")?,
            agility: counter(row.agility, "agility")?,
            endurance: counter(row.endurance, "endurance")?,
            intelligence: counter(row.intelligence, "intelligence")?,
            charisma: counter(row.charisma, "charisma")?,
            luck: counter(row.luck, "luck")?,
            vitality: counter(row.vitality, "vitality")?,
            wisdom: counter(row.wisdom, "wisdom")?,
            dexterity: counter(row.dexterity, "dexterity")?,
        },
        hidden: StatBlock {
            strength: counter(row.hidden_strength, "hidden_strength")?,
            agility: counter(row.hidden_agility, "hidden_agility")?,
            endurance: counter(row.hidden_endurance, "hidden_endurance")?,
            intelligence: counter(row.hidden_intelligence, "hidden_intelligence")?,
            charisma: counter(row.hidden_charisma, "hidden_charisma")?,
            luck: counter(row.hidden_luck, "hidden_luck")?,
            vitality: counter(row.hidden_vitality, "hidden_vitality")?,
            wisdom: counter(row.hidden_wisdom, "hidden_wisdom")?,
            dexterity: counter(row.hidden_dexterity, "hidden_dexterity")?,
        },
        level: counter(row.level, "level")?,
        experience: u64::try_from(row.experience).map_err(|_| {
            StoreError::Corrupt(format!("experience is negative: {}", row.experience))
        })?,
        stat_points: counter(row.stat_points, "stat_points")?,
        skill_points: counter(row.skill_points, "skill_points")?,
        streak_days: counter(row.streak_days, "streak_days")?,
        tasks_completed: counter(row.tasks_completed, "tasks_completed")?,
    })
}

fn row_to_task(row: &TaskRow) -> RepoResult<DailyTask> {
    Ok(DailyTask {
        id: row.id,
        user_id: row.user_id,
        title: row.title.clone(),
        description: row.description.clone(),
        completed: row.completed,
        streak: counter(row.streak, "streak")?,
        xp_reward: counter(row.xp_reward, "xp_reward")?,
        last_completed: row.last_completed,
        created_at: row.created_at,
    })
}

fn row_to_skill(row: &SkillRow) -> RepoResult<Skill> {
    Ok(Skill {
        id: row.id,
        user_id: row.user_id,
        name: row.name.clone(),
        description: row.description.clone(),
        level: counter(row.level, "level")?,
        icon: row.icon.clone(),
        power_level: row.power_level.clone(),
        created_at: row.created_at,
    })
}

fn row_to_profile(row: &ProfileRow) -> RepoResult<PlayerProfile> {
    let avatar = match &row.avatar {
        None => None,
        Some(json) => Some(
            serde_json::from_value::<AvatarCustomization>(json.0.clone())
                .map_err(|e| StoreError::Corrupt(format!("avatar for {}: {e}", row.user_id)))?,
        ),
    };
    Ok(PlayerProfile {
        username: row.username.clone(),
        profession: row.profession.clone(),
        avatar,
    })
}

fn row_to_calendar(row: &CalendarRow) -> RepoResult<CalendarTask> {
    let category: CalendarCategory = row
        .category
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("calendar category {}", row.category)))?;
    Ok(CalendarTask {
        id: row.id,
        user_id: row.user_id,
        title: row.title.clone(),
        description: row.description.clone(),
        category,
        start_time: row.start_time,
        end_time: row.end_time,
        reminder_time: row.reminder_time,
        created_at: row.created_at,
    })
}

// ============================================================================
// Stats Repository
// ============================================================================

pub struct PgStatsRepo {
    store: Arc<PostgresStore>,
}

impl PgStatsRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatsRepo for PgStatsRepo {
    async fn get(&self, user_id: Uuid) -> RepoResult<Option<CharacterStats>> {
        let row = self.store.get_stats(user_id).await?;
        row.as_ref().map(row_to_stats).transpose()
    }

    async fn create_default(&self, user_id: Uuid) -> RepoResult<CharacterStats> {
        let row = self.store.create_default_stats(user_id).await?;
        row_to_stats(&row)
    }

    async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &StatDelta,
    ) -> RepoResult<Option<CharacterStats>> {
        let row = self.store.apply_stat_delta(user_id, delta).await?;
        row.as_ref().map(row_to_stats).transpose()
    }

    async fn compare_and_set_progress(
        &self,
        user_id: Uuid,
        expected: Progress,
        next: Progress,
    ) -> RepoResult<Option<CharacterStats>> {
        let row = self.store.compare_and_set_progress(user_id, expected, next).await?;
        row.as_ref().map(row_to_stats).transpose()
    }
}

// ============================================================================
// Task Repository
// ============================================================================

pub struct PgTaskRepo {
    store: Arc<PostgresStore>,
}

impl PgTaskRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TaskRepo for PgTaskRepo {
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<DailyTask>> {
        let rows = self.store.list_tasks(user_id).await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn get(&self, user_id: Uuid, task_id: Uuid) -> RepoResult<Option<DailyTask>> {
        let row = self.store.get_task(user_id, task_id).await?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn create(&self, user_id: Uuid, task: &NewTask) -> RepoResult<DailyTask> {
        let row = self
            .store
            .create_task(user_id, &task.title, task.description.as_deref(), task.xp_reward)
            .await?;
        row_to_task(&row)
    }

    async fn update(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> RepoResult<Option<DailyTask>> {
        let row = self
            .store
            .update_task(
                user_id,
                task_id,
                update.title.as_deref(),
                update.description.is_some(),
                update.description.as_ref().and_then(|d| d.as_deref()),
                update.xp_reward,
            )
            .await?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn mark_completed(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<DailyTask>> {
        let row = self.store.complete_task(user_id, task_id, at).await?;
        row.as_ref().map(row_to_task).transpose()
    }

    async fn revert_completion(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        completed_at: DateTime<Utc>,
        previous_last: Option<DateTime<Utc>>,
    ) -> RepoResult<bool> {
        self.store
            .revert_task_completion(user_id, task_id, completed_at, previous_last)
            .await
    }
}

// ============================================================================
// Daily Reset Repository
// ============================================================================

pub struct PgDailyResetRepo {
    store: Arc<PostgresStore>,
}

impl PgDailyResetRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DailyResetRepo for PgDailyResetRepo {
    async fn last_reset_on(&self, user_id: Uuid) -> RepoResult<Option<NaiveDate>> {
        self.store.get_last_reset(user_id).await
    }

    async fn apply_reset(&self, user_id: Uuid, plan: &ResetPlan) -> RepoResult<bool> {
        self.store.apply_reset(user_id, plan).await
    }
}

// ============================================================================
// Daily Reward Repository
// ============================================================================

pub struct PgDailyRewardRepo {
    store: Arc<PostgresStore>,
}

impl PgDailyRewardRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DailyRewardRepo for PgDailyRewardRepo {
    async fn get_or_create(&self, user_id: Uuid) -> RepoResult<RewardState> {
        let row = self.store.get_or_create_reward(user_id).await?;
        Ok(RewardState {
            last_claimed_at: row.last_claimed_at,
            current_streak: counter(row.current_streak, "current_streak")?,
        })
    }

    async fn claim(
        &self,
        user_id: Uuid,
        expected_last: Option<DateTime<Utc>>,
        claimed_at: DateTime<Utc>,
        new_streak: u32,
    ) -> RepoResult<bool> {
        self.store
            .claim_reward(user_id, expected_last, claimed_at, new_streak)
            .await
    }

    async fn revert_claim(
        &self,
        user_id: Uuid,
        claimed_at: DateTime<Utc>,
        previous: RewardState,
    ) -> RepoResult<bool> {
        self.store
            .revert_reward_claim(
                user_id,
                claimed_at,
                previous.last_claimed_at,
                previous.current_streak,
            )
            .await
    }
}

// ============================================================================
// Skill Repository
// ============================================================================

pub struct PgSkillRepo {
    store: Arc<PostgresStore>,
}

impl PgSkillRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SkillRepo for PgSkillRepo {
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<Skill>> {
        let rows = self.store.list_skills(user_id).await?;
        rows.iter().map(row_to_skill).collect()
    }

    async fn create_with_debit(
        &self,
        user_id: Uuid,
        skill: &NewSkill,
    ) -> RepoResult<Option<Skill>> {
        let row = self.store.create_skill_with_debit(user_id, skill).await?;
        row.as_ref().map(row_to_skill).transpose()
    }
}

// ============================================================================
// Profile Repository
// ============================================================================

pub struct PgProfileRepo {
    store: Arc<PostgresStore>,
}

impl PgProfileRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProfileRepo for PgProfileRepo {
    async fn get(&self, user_id: Uuid) -> RepoResult<Option<PlayerProfile>> {
        let row = self.store.get_profile(user_id).await?;
        row.as_ref().map(row_to_profile).transpose()
    }

    async fn set_username(&self, user_id: Uuid, username: &str) -> RepoResult<PlayerProfile> {
        let row = self.store.set_username(user_id, username).await?;
        row_to_profile(&row)
    }

    async fn set_profession(&self, user_id: Uuid, profession: &str) -> RepoResult<PlayerProfile> {
        let row = self.store.set_profession(user_id, profession).await?;
        row_to_profile(&row)
    }

    async fn set_avatar(
        &self,
        user_id: Uuid,
        avatar: &AvatarCustomization,
    ) -> RepoResult<PlayerProfile> {
        let json = serde_json::to_value(avatar).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let row = self.store.set_avatar(user_id, json).await?;
        row_to_profile(&row)
    }
}

// ============================================================================
// Calendar Repository
// ============================================================================

pub struct PgCalendarRepo {
    store: Arc<PostgresStore>,
}

impl PgCalendarRepo {
    pub fn new(store: Arc<PostgresStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CalendarRepo for PgCalendarRepo {
    async fn list(&self, user_id: Uuid) -> RepoResult<Vec<CalendarTask>> {
        let rows = self.store.list_calendar(user_id).await?;
        rows.iter().map(row_to_calendar).collect()
    }

    async fn create(&self, user_id: Uuid, entry: &CalendarEntry) -> RepoResult<CalendarTask> {
        let row = self.store.create_calendar(user_id, entry).await?;
        row_to_calendar(&row)
    }
}
