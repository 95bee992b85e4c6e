//! Database Migrations - PostgreSQL schema for Questlog
//!
//! Every table is keyed by the externally issued user id. Counters carry
//! CHECK constraints so a bad delta fails in the database, not silently.

/// SQL migration for creating all tables
pub const MIGRATION_V1: &str = r#"
-- ============================================================================
-- Questlog Database Schema v1
-- ============================================================================

-- ============================================================================
-- 1. Character stats
-- ============================================================================

CREATE TABLE IF NOT EXISTS user_stats (
    user_id             UUID PRIMARY KEY,

    strength            INTEGER NOT NULL DEFAULT 1 CHECK (strength >= 0),
    agility             INTEGER NOT NULL DEFAULT 1 CHECK (agility >= 0),
    endurance           INTEGER NOT NULL DEFAULT 1 CHECK (endurance >= 0),
    intelligence        INTEGER NOT NULL DEFAULT 1 CHECK (intelligence >= 0),
    charisma            INTEGER NOT NULL DEFAULT 1 CHECK (charisma >= 0),
    luck                INTEGER NOT NULL DEFAULT 1 CHECK (luck >= 0),
    vitality            INTEGER NOT NULL DEFAULT 1 CHECK (vitality >= 0),
    wisdom              INTEGER NOT NULL DEFAULT 1 CHECK (wisdom >= 0),
    dexterity           INTEGER NOT NULL DEFAULT 1 CHECK (dexterity >= 0),

    hidden_strength     INTEGER NOT NULL DEFAULT 0 CHECK (hidden_strength >= 0),
    hidden_agility      INTEGER NOT NULL DEFAULT 0 CHECK (hidden_agility >= 0),
    hidden_endurance    INTEGER NOT NULL DEFAULT 0 CHECK (hidden_endurance >= 0),
    hidden_intelligence INTEGER NOT NULL DEFAULT 0 CHECK (hidden_intelligence >= 0),
    hidden_charisma     INTEGER NOT NULL DEFAULT 0 CHECK (hidden_charisma >= 0),
    hidden_luck         INTEGER NOT NULL DEFAULT 0 CHECK (hidden_luck >= 0),
    hidden_vitality     INTEGER NOT NULL DEFAULT 0 CHECK (hidden_vitality >= 0),
    hidden_wisdom       INTEGER NOT NULL DEFAULT 0 CHECK (hidden_wisdom >= 0),
    hidden_dexterity    INTEGER NOT NULL DEFAULT 0 CHECK (hidden_dexterity >= 0),

    level               INTEGER NOT NULL DEFAULT 1 CHECK (level >= 1),
    experience          BIGINT NOT NULL DEFAULT 0 CHECK (experience >= 0),
    stat_points         INTEGER NOT NULL DEFAULT 0 CHECK (stat_points >= 0),
    skill_points        INTEGER NOT NULL DEFAULT 0 CHECK (skill_points >= 0),
    streak_days         INTEGER NOT NULL DEFAULT 0 CHECK (streak_days >= 0),
    tasks_completed     INTEGER NOT NULL DEFAULT 0 CHECK (tasks_completed >= 0),

    created_at          TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
);

-- ============================================================================
-- 2. Daily tasks
-- ============================================================================

CREATE TABLE IF NOT EXISTS tasks (
    id              UUID PRIMARY KEY,
    user_id         UUID NOT NULL,
    title           VARCHAR(200) NOT NULL,
    description     TEXT,
    completed       BOOLEAN NOT NULL DEFAULT FALSE,
    streak          INTEGER NOT NULL DEFAULT 0 CHECK (streak >= 0),
    xp_reward       INTEGER NOT NULL DEFAULT 10 CHECK (xp_reward > 0),
    last_completed  TIMESTAMP WITH TIME ZONE,
    created_at      TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, created_at DESC);

CREATE TABLE IF NOT EXISTS daily_reset_markers (
    user_id         UUID PRIMARY KEY,
    last_reset_on   DATE NOT NULL
);

-- ============================================================================
-- 3. Daily login reward
-- ============================================================================

CREATE TABLE IF NOT EXISTS daily_rewards (
    user_id         UUID PRIMARY KEY,
    last_claimed_at TIMESTAMP WITH TIME ZONE,
    current_streak  INTEGER NOT NULL DEFAULT 0 CHECK (current_streak >= 0)
);

-- ============================================================================
-- 4. Skills
-- ============================================================================

CREATE TABLE IF NOT EXISTS user_skills (
    id              UUID PRIMARY KEY,
    user_id         UUID NOT NULL,
    name            VARCHAR(64) NOT NULL,
    description     TEXT NOT NULL,
    level           INTEGER NOT NULL DEFAULT 1 CHECK (level >= 1),
    icon            VARCHAR(32) NOT NULL,
    power_level     VARCHAR(32) NOT NULL,
    created_at      TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    UNIQUE(user_id, name)
);

-- ============================================================================
-- 5. Profile
-- ============================================================================

CREATE TABLE IF NOT EXISTS player_profiles (
    user_id         UUID PRIMARY KEY,
    username        VARCHAR(24) UNIQUE,
    profession      VARCHAR(32),
    avatar          JSONB,
    updated_at      TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
);

-- ============================================================================
-- 6. Calendar
-- ============================================================================

CREATE TABLE IF NOT EXISTS calendar_tasks (
    id              UUID PRIMARY KEY,
    user_id         UUID NOT NULL,
    title           VARCHAR(200) NOT NULL,
    description     TEXT,
    category        VARCHAR(16) NOT NULL DEFAULT 'other',
    start_time      TIMESTAMP WITH TIME ZONE NOT NULL,
    end_time        TIMESTAMP WITH TIME ZONE NOT NULL,
    reminder_time   TIMESTAMP WITH TIME ZONE,
    created_at      TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
    CHECK (end_time >= start_time)
);

CREATE INDEX IF NOT EXISTS idx_calendar_user ON calendar_tasks(user_id, start_time);
"#;

/// Get all migrations in order
pub fn get_migrations() -> Vec<(&'static str, &'static str)> {
    vec![("v1_initial_schema", MIGRATION_V1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tables_created() {
        for table in [
            "user_stats",
            "tasks",
            "daily_reset_markers",
            "daily_rewards",
            "user_skills",
            "player_profiles",
            "calendar_tasks",
        ] {
            assert!(
                MIGRATION_V1.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn test_stat_columns_match_kinds() {
        for kind in questlog_core::StatKind::ALL {
            assert!(MIGRATION_V1.contains(&format!("    {} ", kind.as_str())));
            assert!(MIGRATION_V1.contains(kind.hidden_column()));
        }
    }

    #[test]
    fn test_migration_names_unique() {
        let migrations = get_migrations();
        let mut names: Vec<_> = migrations.iter().map(|(n, _)| *n).collect();
        names.dedup();
        assert_eq!(names.len(), migrations.len());
    }
}
