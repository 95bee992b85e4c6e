//! Progression Engine
//!
//! Experience curve and level-up resolution. A gain is folded into the
//! current [`Progress`] one threshold at a time: each level consumes
//! `level * EXPERIENCE_PER_LEVEL` experience and grants stat points, and
//! every tenth level grants a skill point. Resolution is capped so that a
//! malformed row can never spin the loop.

use crate::constants::{
    EXPERIENCE_PER_LEVEL, MANUAL_XP_MAX, MANUAL_XP_MIN, MAX_LEVEL_UPS_PER_GAIN,
    SKILL_POINT_LEVEL_INTERVAL, STAT_POINTS_PER_LEVEL,
};
use crate::stats::{CharacterStats, Progress, StatDelta, StatKind};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Experience needed to leave `level`
pub fn experience_needed(level: u32) -> u64 {
    level.max(1) as u64 * EXPERIENCE_PER_LEVEL
}

/// Result of folding an experience gain into a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpOutcome {
    pub before: Progress,
    pub after: Progress,
    pub experience_gained: u64,
    pub levels_gained: u32,
    pub stat_points_granted: u32,
    pub skill_points_granted: u32,
    /// True when resolution stopped at `MAX_LEVEL_UPS_PER_GAIN`
    pub capped: bool,
}

impl LevelUpOutcome {
    pub fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }

    pub fn experience_to_next(&self) -> u64 {
        experience_needed(self.after.level).saturating_sub(self.after.experience)
    }
}

/// Add `gained` experience and resolve every crossed threshold.
pub fn apply_experience(progress: Progress, gained: u64) -> LevelUpOutcome {
    let mut next = progress;
    next.level = next.level.max(1);
    next.experience = next.experience.saturating_add(gained);

    let mut levels_gained = 0u32;
    let mut stat_points_granted = 0u32;
    let mut skill_points_granted = 0u32;
    let mut capped = false;

    loop {
        let needed = experience_needed(next.level);
        if next.experience < needed {
            break;
        }
        if levels_gained >= MAX_LEVEL_UPS_PER_GAIN || next.level == u32::MAX {
            capped = true;
            tracing::warn!(
                level = next.level,
                experience = next.experience,
                "level-up resolution capped"
            );
            break;
        }
        next.experience -= needed;
        next.level += 1;
        next.stat_points = next.stat_points.saturating_add(STAT_POINTS_PER_LEVEL);
        stat_points_granted = stat_points_granted.saturating_add(STAT_POINTS_PER_LEVEL);
        if next.level % SKILL_POINT_LEVEL_INTERVAL == 0 {
            next.skill_points = next.skill_points.saturating_add(1);
            skill_points_granted += 1;
        }
        levels_gained += 1;
    }

    LevelUpOutcome {
        before: progress,
        after: next,
        experience_gained: gained,
        levels_gained,
        stat_points_granted,
        skill_points_granted,
        capped,
    }
}

/// Pseudo-random manual experience gain in `[MANUAL_XP_MIN, MANUAL_XP_MAX]`
pub fn roll_manual_experience<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    rng.gen_range(MANUAL_XP_MIN..=MANUAL_XP_MAX)
}

// =====================================================
// Stat point spending
// =====================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    #[error("no stat points available")]
    InsufficientPoints,
}

/// Delta that moves one stat point into `stat`
pub fn spend_delta(stat: StatKind) -> StatDelta {
    StatDelta::new().base(stat, 1).stat_points(-1)
}

/// Spend one point on `stat`. With no points the input is left untouched.
pub fn spend_stat_point(
    stats: &CharacterStats,
    stat: StatKind,
) -> Result<CharacterStats, ProgressionError> {
    if stats.stat_points == 0 {
        return Err(ProgressionError::InsufficientPoints);
    }
    spend_delta(stat)
        .apply_to(stats)
        .ok_or(ProgressionError::InsufficientPoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seeded_rng;

    fn progress(level: u32, experience: u64, stat_points: u32) -> Progress {
        Progress {
            level,
            experience,
            stat_points,
            skill_points: 0,
        }
    }

    #[test]
    fn test_experience_needed() {
        assert_eq!(experience_needed(1), 1000);
        assert_eq!(experience_needed(7), 7000);
        assert_eq!(experience_needed(0), 1000);
    }

    #[test]
    fn test_task_crosses_first_threshold() {
        let out = apply_experience(progress(1, 950, 0), 100);
        assert_eq!(out.after.level, 2);
        assert_eq!(out.after.experience, 50);
        assert_eq!(out.after.stat_points, 5);
        assert!(out.leveled_up());
        assert_eq!(out.experience_to_next(), 1950);
    }

    #[test]
    fn test_gain_below_threshold() {
        let out = apply_experience(progress(3, 100, 2), 49);
        assert_eq!(out.after, progress(3, 149, 2));
        assert!(!out.leveled_up());
    }

    #[test]
    fn test_multiple_levels_in_one_gain() {
        // 1000 + 2000 + 3000 = 6000 to reach level 4
        let out = apply_experience(progress(1, 0, 0), 6500);
        assert_eq!(out.after.level, 4);
        assert_eq!(out.after.experience, 500);
        assert_eq!(out.after.stat_points, 15);
        assert_eq!(out.levels_gained, 3);
    }

    #[test]
    fn test_skill_point_every_tenth_level() {
        let out = apply_experience(progress(9, 8999, 0), 1);
        assert_eq!(out.after.level, 10);
        assert_eq!(out.after.skill_points, 1);
        assert_eq!(out.skill_points_granted, 1);

        let out = apply_experience(progress(10, 0, 0), 10_000);
        assert_eq!(out.after.level, 11);
        assert_eq!(out.skill_points_granted, 0);
    }

    #[test]
    fn test_resolution_is_capped() {
        let out = apply_experience(progress(1, 0, 0), u64::MAX);
        assert!(out.capped);
        assert_eq!(out.levels_gained, MAX_LEVEL_UPS_PER_GAIN);
        assert_eq!(out.after.level, 1 + MAX_LEVEL_UPS_PER_GAIN);
    }

    #[test]
    fn test_malformed_level_zero_treated_as_one() {
        let out = apply_experience(progress(0, 0, 0), 10);
        assert_eq!(out.after.level, 1);
        assert_eq!(out.after.experience, 10);
    }

    #[test]
    fn test_manual_roll_in_range() {
        let mut rng = seeded_rng(7);
        for _ in 0..500 {
            let xp = roll_manual_experience(&mut rng);
            assert!((MANUAL_XP_MIN..=MANUAL_XP_MAX).contains(&xp));
        }
    }

    #[test]
    fn test_spend_without_points() {
        let stats = CharacterStats::default();
        assert_eq!(
            spend_stat_point(&stats, StatKind::Charisma),
            Err(ProgressionError::InsufficientPoints)
        );
    }

    #[test]
    fn test_spend_with_points() {
        let mut stats = CharacterStats::default();
        stats.stat_points = 5;
        let next = spend_stat_point(&stats, StatKind::Charisma).unwrap();
        assert_eq!(next.stat_points, 4);
        assert_eq!(next.base.charisma, 2);
        assert_eq!(next.base.sum(), stats.base.sum() + 1);
    }
}
