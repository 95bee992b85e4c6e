//! PostgreSQL Storage - Player data persistence
//!
//! Uses `sqlx` for async queries against the shared pool.
//!
//! ## Tables
//! - user_stats
//! - tasks, daily_reset_markers, daily_rewards
//! - user_skills, player_profiles, calendar_tasks
//!
//! Mutations that can race are single conditional statements or run inside
//! a transaction; callers learn they lost through `None`/`false`.

use chrono::{DateTime, NaiveDate, Utc};
use questlog_core::calendar::CalendarEntry;
use questlog_core::daily::ResetPlan;
use questlog_core::skills::NewSkill;
use questlog_core::{Progress, StatDelta};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};
use uuid::Uuid;

use super::migrations;
use crate::error::StoreError;

const STATS_COLUMNS: &str = "user_id, \
    strength, agility, endurance, intelligence, charisma, luck, vitality, wisdom, dexterity, \
    hidden_strength, hidden_agility, hidden_endurance, hidden_intelligence, hidden_charisma, \
    hidden_luck, hidden_vitality, hidden_wisdom, hidden_dexterity, \
    level, experience, stat_points, skill_points, streak_days, tasks_completed";

const TASK_COLUMNS: &str =
    "id, user_id, title, description, completed, streak, xp_reward, last_completed, created_at";

const SKILL_COLUMNS: &str = "id, user_id, name, description, level, icon, power_level, created_at";

const PROFILE_COLUMNS: &str = "user_id, username, profession, avatar";

const CALENDAR_COLUMNS: &str =
    "id, user_id, title, description, category, start_time, end_time, reminder_time, created_at";

/// PostgreSQL connection pool wrapper
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Narrow a counter for an INTEGER column
fn int(value: u32, field: &'static str) -> Result<i32, StoreError> {
    i32::try_from(value)
        .map_err(|_| StoreError::Constraint(format!("{field} out of range: {value}")))
}

impl PostgresStore {
    /// Connect to PostgreSQL and run migrations
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("PostgreSQL connected (max_connections={})", max_connections);

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Connect with an existing pool (for testing)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name VARCHAR(100) PRIMARY KEY,
                applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )",
        )
        .execute(&self.pool)
        .await?;

        for (name, sql) in migrations::get_migrations() {
            let applied: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE name = $1)")
                    .bind(name)
                    .fetch_one(&self.pool)
                    .await?;

            if !applied {
                info!("Running migration: {}", name);
                sqlx::raw_sql(sql)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StoreError::Migration(format!("{}: {}", name, e)))?;

                sqlx::query("INSERT INTO _migrations (name) VALUES ($1)")
                    .bind(name)
                    .execute(&self.pool)
                    .await?;

                info!("Migration applied: {}", name);
            } else {
                debug!("Migration already applied: {}", name);
            }
        }

        Ok(())
    }

    // ========================================================================
    // Stats Operations
    // ========================================================================

    pub async fn get_stats(&self, user_id: Uuid) -> Result<Option<StatsRow>, StoreError> {
        let row = sqlx::query_as::<_, StatsRow>(&format!(
            "SELECT {STATS_COLUMNS} FROM user_stats WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Insert a default row unless one exists, then read it back
    pub async fn create_default_stats(&self, user_id: Uuid) -> Result<StatsRow, StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO user_stats (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        if inserted > 0 {
            info!(%user_id, "created default stats");
        }

        let row = sqlx::query_as::<_, StatsRow>(&format!(
            "SELECT {STATS_COLUMNS} FROM user_stats WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// One UPDATE adding every non-zero field of the delta. Negative amounts
    /// are guarded in the WHERE clause so the row is untouched on failure.
    pub async fn apply_stat_delta(
        &self,
        user_id: Uuid,
        delta: &StatDelta,
    ) -> Result<Option<StatsRow>, StoreError> {
        let columns = delta
            .base
            .iter()
            .map(|(kind, amount)| (kind.as_str(), *amount))
            .chain(delta.hidden.iter().map(|(kind, amount)| (kind.hidden_column(), *amount)))
            .chain([
                ("stat_points", delta.stat_points),
                ("skill_points", delta.skill_points),
                ("streak_days", delta.streak_days),
                ("tasks_completed", delta.tasks_completed),
            ]);

        let mut sets = Vec::new();
        let mut guards = String::new();
        let mut amounts: Vec<i64> = Vec::new();
        for (column, amount) in columns {
            if amount == 0 {
                continue;
            }
            amounts.push(amount);
            let n = amounts.len() + 1;
            sets.push(format!("{column} = {column} + ${n}"));
            if amount < 0 {
                guards.push_str(&format!(" AND {column} + ${n} >= 0"));
            }
        }

        if sets.is_empty() {
            return self.get_stats(user_id).await;
        }

        let sql = format!(
            "UPDATE user_stats SET {}, updated_at = NOW() \
             WHERE user_id = $1{} RETURNING {STATS_COLUMNS}",
            sets.join(", "),
            guards
        );
        let mut query = sqlx::query_as::<_, StatsRow>(&sql).bind(user_id);
        for amount in amounts {
            query = query.bind(amount);
        }
        let row = query.fetch_optional(&self.pool).await?;
        Ok(row)
    }

    pub async fn compare_and_set_progress(
        &self,
        user_id: Uuid,
        expected: Progress,
        next: Progress,
    ) -> Result<Option<StatsRow>, StoreError> {
        let row = sqlx::query_as::<_, StatsRow>(&format!(
            "UPDATE user_stats
             SET level = $2, experience = $3, stat_points = $4, skill_points = $5,
                 updated_at = NOW()
             WHERE user_id = $1
               AND level = $6 AND experience = $7 AND stat_points = $8 AND skill_points = $9
             RETURNING {STATS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(int(next.level, "level")?)
        .bind(next.experience as i64)
        .bind(int(next.stat_points, "stat_points")?)
        .bind(int(next.skill_points, "skill_points")?)
        .bind(int(expected.level, "level")?)
        .bind(expected.experience as i64)
        .bind(int(expected.stat_points, "stat_points")?)
        .bind(int(expected.skill_points, "skill_points")?)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ========================================================================
    // Task Operations
    // ========================================================================

    pub async fn list_tasks(&self, user_id: Uuid) -> Result<Vec<TaskRow>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
    ) -> Result<Option<TaskRow>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2"
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn create_task(
        &self,
        user_id: Uuid,
        title: &str,
        description: Option<&str>,
        xp_reward: u32,
    ) -> Result<TaskRow, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "INSERT INTO tasks (id, user_id, title, description, xp_reward)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(int(xp_reward, "xp_reward")?)
        .fetch_one(&self.pool)
        .await?;
        debug!(%user_id, task_id = %row.id, "task created");
        Ok(row)
    }

    /// `set_description` distinguishes "clear it" from "leave it"
    pub async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        title: Option<&str>,
        set_description: bool,
        description: Option<&str>,
        xp_reward: Option<u32>,
    ) -> Result<Option<TaskRow>, StoreError> {
        let xp_reward = xp_reward.map(|x| int(x, "xp_reward")).transpose()?;
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks
             SET title = COALESCE($3, title),
                 description = CASE WHEN $4 THEN $5 ELSE description END,
                 xp_reward = COALESCE($6, xp_reward)
             WHERE id = $1 AND user_id = $2
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(task_id)
        .bind(user_id)
        .bind(title)
        .bind(set_description)
        .bind(description)
        .bind(xp_reward)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn complete_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<TaskRow>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks
             SET completed = TRUE, last_completed = $3, streak = streak + 1
             WHERE id = $1 AND user_id = $2 AND completed = FALSE
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(task_id)
        .bind(user_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn revert_task_completion(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        completed_at: DateTime<Utc>,
        previous_last: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            "UPDATE tasks
             SET completed = FALSE, last_completed = $4, streak = GREATEST(streak - 1, 0)
             WHERE id = $1 AND user_id = $2 AND completed = TRUE AND last_completed = $3",
        )
        .bind(task_id)
        .bind(user_id)
        .bind(completed_at)
        .bind(previous_last)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }

    // ========================================================================
    // Daily Reset Operations
    // ========================================================================

    pub async fn get_last_reset(&self, user_id: Uuid) -> Result<Option<NaiveDate>, StoreError> {
        let date = sqlx::query_scalar::<_, NaiveDate>(
            "SELECT last_reset_on FROM daily_reset_markers WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(date)
    }

    /// Advance the marker and reset tasks (atomic transaction)
    pub async fn apply_reset(&self, user_id: Uuid, plan: &ResetPlan) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let moved = match plan.previous {
            None => sqlx::query(
                "INSERT INTO daily_reset_markers (user_id, last_reset_on) VALUES ($1, $2)
                 ON CONFLICT (user_id) DO NOTHING",
            )
            .bind(user_id)
            .bind(plan.today)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
            Some(previous) => sqlx::query(
                "UPDATE daily_reset_markers SET last_reset_on = $3
                 WHERE user_id = $1 AND last_reset_on = $2",
            )
            .bind(user_id)
            .bind(previous)
            .bind(plan.today)
            .execute(&mut *tx)
            .await?
            .rows_affected(),
        };

        if moved == 0 {
            // Another request reset first; dropping the transaction rolls back
            return Ok(false);
        }

        let tasks = sqlx::query(
            "UPDATE tasks
             SET streak = CASE
                     WHEN $2 THEN 0
                     WHEN $3 AND NOT completed THEN 0
                     ELSE streak
                 END,
                 completed = FALSE,
                 last_completed = NULL
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(plan.reset_all_streaks)
        .bind(plan.reset_incomplete_streaks)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        info!(%user_id, today = %plan.today, tasks, "daily reset applied");
        Ok(true)
    }

    // ========================================================================
    // Daily Reward Operations
    // ========================================================================

    pub async fn get_or_create_reward(&self, user_id: Uuid) -> Result<RewardRow, StoreError> {
        sqlx::query(
            "INSERT INTO daily_rewards (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, RewardRow>(
            "SELECT last_claimed_at, current_streak FROM daily_rewards WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn claim_reward(
        &self,
        user_id: Uuid,
        expected_last: Option<DateTime<Utc>>,
        claimed_at: DateTime<Utc>,
        new_streak: u32,
    ) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            "UPDATE daily_rewards SET last_claimed_at = $3, current_streak = $4
             WHERE user_id = $1 AND last_claimed_at IS NOT DISTINCT FROM $2",
        )
        .bind(user_id)
        .bind(expected_last)
        .bind(claimed_at)
        .bind(int(new_streak, "current_streak")?)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }

    pub async fn revert_reward_claim(
        &self,
        user_id: Uuid,
        claimed_at: DateTime<Utc>,
        previous_last: Option<DateTime<Utc>>,
        previous_streak: u32,
    ) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            "UPDATE daily_rewards SET last_claimed_at = $3, current_streak = $4
             WHERE user_id = $1 AND last_claimed_at = $2",
        )
        .bind(user_id)
        .bind(claimed_at)
        .bind(previous_last)
        .bind(int(previous_streak, "current_streak")?)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }

    // ========================================================================
    // Skill Operations
    // ========================================================================

    pub async fn list_skills(&self, user_id: Uuid) -> Result<Vec<SkillRow>, StoreError> {
        let rows = sqlx::query_as::<_, SkillRow>(&format!(
            "SELECT {SKILL_COLUMNS} FROM user_skills WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Debit skill points and insert the skill (atomic transaction)
    pub async fn create_skill_with_debit(
        &self,
        user_id: Uuid,
        skill: &NewSkill,
    ) -> Result<Option<SkillRow>, StoreError> {
        let cost = int(skill.cost, "cost")?;
        let mut tx = self.pool.begin().await?;

        let debited = sqlx::query(
            "UPDATE user_stats SET skill_points = skill_points - $2, updated_at = NOW()
             WHERE user_id = $1 AND skill_points >= $2",
        )
        .bind(user_id)
        .bind(cost)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if debited == 0 {
            return Ok(None);
        }

        let row = sqlx::query_as::<_, SkillRow>(&format!(
            "INSERT INTO user_skills (id, user_id, name, description, level, icon, power_level)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SKILL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&skill.name)
        .bind(&skill.description)
        .bind(int(skill.level, "level")?)
        .bind(&skill.icon)
        .bind(&skill.power_level)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| StoreError::from_sqlx_unique(e, "skill"))?;

        tx.commit().await?;
        info!(%user_id, skill = %row.name, cost, "skill created");
        Ok(Some(row))
    }

    // ========================================================================
    // Profile Operations
    // ========================================================================

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<ProfileRow>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM player_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_username(
        &self,
        user_id: Uuid,
        username: &str,
    ) -> Result<ProfileRow, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO player_profiles (user_id, username) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET username = EXCLUDED.username, updated_at = NOW()
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx_unique(e, "username"))?;
        Ok(row)
    }

    pub async fn set_profession(
        &self,
        user_id: Uuid,
        profession: &str,
    ) -> Result<ProfileRow, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO player_profiles (user_id, profession) VALUES ($1, $2)
             ON CONFLICT (user_id)
             DO UPDATE SET profession = EXCLUDED.profession, updated_at = NOW()
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(profession)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_avatar(
        &self,
        user_id: Uuid,
        avatar: serde_json::Value,
    ) -> Result<ProfileRow, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO player_profiles (user_id, avatar) VALUES ($1, $2)
             ON CONFLICT (user_id) DO UPDATE SET avatar = EXCLUDED.avatar, updated_at = NOW()
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(sqlx::types::Json(avatar))
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    // ========================================================================
    // Calendar Operations
    // ========================================================================

    pub async fn list_calendar(&self, user_id: Uuid) -> Result<Vec<CalendarRow>, StoreError> {
        let rows = sqlx::query_as::<_, CalendarRow>(&format!(
            "SELECT {CALENDAR_COLUMNS} FROM calendar_tasks
             WHERE user_id = $1 ORDER BY start_time ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_calendar(
        &self,
        user_id: Uuid,
        entry: &CalendarEntry,
    ) -> Result<CalendarRow, StoreError> {
        let row = sqlx::query_as::<_, CalendarRow>(&format!(
            "INSERT INTO calendar_tasks
                 (id, user_id, title, description, category, start_time, end_time, reminder_time)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {CALENDAR_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&entry.title)
        .bind(entry.description.as_deref())
        .bind(entry.category.as_str())
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.reminder_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct StatsRow {
    pub user_id: Uuid,
    pub strength: i32,
    pub agility: i32,
    pub endurance: i32,
    pub intelligence: i32,
    pub charisma: i32,
    pub luck: i32,
    pub vitality: i32,
    pub wisdom: i32,
    pub dexterity: i32,
    pub hidden_strength: i32,
    pub hidden_agility: i32,
    pub hidden_endurance: i32,
    pub hidden_intelligence: i32,
    pub hidden_charisma: i32,
    pub hidden_luck: i32,
    pub hidden_vitality: i32,
    pub hidden_wisdom: i32,
    pub hidden_dexterity: i32,
    pub level: i32,
    pub experience: i64,
    pub stat_points: i32,
    pub skill_points: i32,
    pub streak_days: i32,
    pub tasks_completed: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub streak: i32,
    pub xp_reward: i32,
    pub last_completed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct RewardRow {
    pub last_claimed_at: Option<DateTime<Utc>>,
    pub current_streak: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct SkillRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub level: i32,
    pub icon: String,
    pub power_level: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub profession: Option<String>,
    pub avatar: Option<sqlx::types::Json<serde_json::Value>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CalendarRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
