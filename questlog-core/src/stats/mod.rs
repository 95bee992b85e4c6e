//! Character Stats
//!
//! Nine base attributes raised by spending stat points, a hidden bonus for
//! each one raised by accepting stat quests, and the progression counters.
//! The displayed value of a stat is always `base + hidden`.

use crate::constants::BASE_STAT_START;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the nine character attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Strength,
    Agility,
    Endurance,
    Intelligence,
    Charisma,
    Luck,
    Vitality,
    Wisdom,
    Dexterity,
}

impl StatKind {
    pub const ALL: [StatKind; 9] = [
        StatKind::Strength,
        StatKind::Agility,
        StatKind::Endurance,
        StatKind::Intelligence,
        StatKind::Charisma,
        StatKind::Luck,
        StatKind::Vitality,
        StatKind::Wisdom,
        StatKind::Dexterity,
    ];

    /// Lowercase name, also the storage column of the base value
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Strength => "strength",
            StatKind::Agility => "agility",
            StatKind::Endurance => "endurance",
            StatKind::Intelligence => "intelligence",
            StatKind::Charisma => "charisma",
            StatKind::Luck => "luck",
            StatKind::Vitality => "vitality",
            StatKind::Wisdom => "wisdom",
            StatKind::Dexterity => "dexterity",
        }
    }

    /// Storage column of the hidden bonus
    pub fn hidden_column(&self) -> &'static str {
        match self {
            StatKind::Strength => "hidden_strength",
            StatKind::Agility => "hidden_agility",
            StatKind::Endurance => "hidden_endurance",
            StatKind::Intelligence => "hidden_intelligence",
            StatKind::Charisma => "hidden_charisma",
            StatKind::Luck => "hidden_luck",
            StatKind::Vitality => "hidden_vitality",
            StatKind::Wisdom => "hidden_wisdom",
            StatKind::Dexterity => "hidden_dexterity",
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            StatKind::Strength => "STR",
            StatKind::Agility => "AGI",
            StatKind::Endurance => "END",
            StatKind::Intelligence => "INT",
            StatKind::Charisma => "CHA",
            StatKind::Luck => "LCK",
            StatKind::Vitality => "VIT",
            StatKind::Wisdom => "WIS",
            StatKind::Dexterity => "DEX",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stat: {0}")]
pub struct UnknownStat(pub String);

impl FromStr for StatKind {
    type Err = UnknownStat;

    /// Accepts the full name or the abbreviation, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        StatKind::ALL
            .into_iter()
            .find(|k| {
                k.as_str().eq_ignore_ascii_case(needle)
                    || k.abbreviation().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownStat(s.to_string()))
    }
}

// =====================================================
// Stat block
// =====================================================

/// One value per stat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatBlock {
    pub strength: u32,
    pub agility: u32,
    pub endurance: u32,
    pub intelligence: u32,
    pub charisma: u32,
    pub luck: u32,
    pub vitality: u32,
    pub wisdom: u32,
    pub dexterity: u32,
}

impl StatBlock {
    pub fn uniform(value: u32) -> Self {
        Self {
            strength: value,
            agility: value,
            endurance: value,
            intelligence: value,
            charisma: value,
            luck: value,
            vitality: value,
            wisdom: value,
            dexterity: value,
        }
    }

    pub fn get(&self, kind: StatKind) -> u32 {
        match kind {
            StatKind::Strength => self.strength,
            StatKind::Agility => self.agility,
            StatKind::Endurance => self.endurance,
            StatKind::Intelligence => self.intelligence,
            StatKind::Charisma => self.charisma,
            StatKind::Luck => self.luck,
            StatKind::Vitality => self.vitality,
            StatKind::Wisdom => self.wisdom,
            StatKind::Dexterity => self.dexterity,
        }
    }

    pub fn get_mut(&mut self, kind: StatKind) -> &mut u32 {
        match kind {
            StatKind::Strength => &mut self.strength,
            StatKind::Agility => &mut self.agility,
            StatKind::Endurance => &mut self.endurance,
            StatKind::Intelligence => &mut self.intelligence,
            StatKind::Charisma => &mut self.charisma,
            StatKind::Luck => &mut self.luck,
            StatKind::Vitality => &mut self.vitality,
            StatKind::Wisdom => &mut self.wisdom,
            StatKind::Dexterity => &mut self.dexterity,
        }
    }

    pub fn sum(&self) -> u64 {
        StatKind::ALL.iter().map(|k| self.get(*k) as u64).sum()
    }
}

// =====================================================
// Character stats
// =====================================================

/// The level-related slice of a character, written with compare-and-set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub level: u32,
    pub experience: u64,
    pub stat_points: u32,
    pub skill_points: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            level: 1,
            experience: 0,
            stat_points: 0,
            skill_points: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStats {
    pub base: StatBlock,
    pub hidden: StatBlock,
    pub level: u32,
    pub experience: u64,
    pub stat_points: u32,
    pub skill_points: u32,
    pub streak_days: u32,
    pub tasks_completed: u32,
}

impl Default for CharacterStats {
    fn default() -> Self {
        let progress = Progress::default();
        Self {
            base: StatBlock::uniform(BASE_STAT_START),
            hidden: StatBlock::default(),
            level: progress.level,
            experience: progress.experience,
            stat_points: progress.stat_points,
            skill_points: progress.skill_points,
            streak_days: 0,
            tasks_completed: 0,
        }
    }
}

impl CharacterStats {
    /// Displayed value: base plus hidden bonus
    pub fn total(&self, kind: StatKind) -> u32 {
        self.base.get(kind).saturating_add(self.hidden.get(kind))
    }

    pub fn totals(&self) -> BTreeMap<StatKind, u32> {
        StatKind::ALL.iter().map(|k| (*k, self.total(*k))).collect()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            level: self.level,
            experience: self.experience,
            stat_points: self.stat_points,
            skill_points: self.skill_points,
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.level = progress.level;
        self.experience = progress.experience;
        self.stat_points = progress.stat_points;
        self.skill_points = progress.skill_points;
        self
    }
}

// =====================================================
// Deltas
// =====================================================

/// Signed per-field increments. Storage applies a delta atomically and
/// rejects it outright if any resulting field would be negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDelta {
    pub base: BTreeMap<StatKind, i64>,
    pub hidden: BTreeMap<StatKind, i64>,
    pub stat_points: i64,
    pub skill_points: i64,
    pub streak_days: i64,
    pub tasks_completed: i64,
}

impl StatDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base(mut self, kind: StatKind, amount: i64) -> Self {
        *self.base.entry(kind).or_insert(0) += amount;
        self
    }

    pub fn hidden(mut self, kind: StatKind, amount: i64) -> Self {
        *self.hidden.entry(kind).or_insert(0) += amount;
        self
    }

    pub fn stat_points(mut self, amount: i64) -> Self {
        self.stat_points += amount;
        self
    }

    pub fn skill_points(mut self, amount: i64) -> Self {
        self.skill_points += amount;
        self
    }

    pub fn streak_days(mut self, amount: i64) -> Self {
        self.streak_days += amount;
        self
    }

    pub fn tasks_completed(mut self, amount: i64) -> Self {
        self.tasks_completed += amount;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.base.values().all(|v| *v == 0)
            && self.hidden.values().all(|v| *v == 0)
            && self.stat_points == 0
            && self.skill_points == 0
            && self.streak_days == 0
            && self.tasks_completed == 0
    }

    /// Apply to a snapshot. `None` if any field would leave `u32` range.
    pub fn apply_to(&self, stats: &CharacterStats) -> Option<CharacterStats> {
        let mut next = stats.clone();
        for (kind, amount) in &self.base {
            let slot = next.base.get_mut(*kind);
            *slot = shift(*slot, *amount)?;
        }
        for (kind, amount) in &self.hidden {
            let slot = next.hidden.get_mut(*kind);
            *slot = shift(*slot, *amount)?;
        }
        next.stat_points = shift(next.stat_points, self.stat_points)?;
        next.skill_points = shift(next.skill_points, self.skill_points)?;
        next.streak_days = shift(next.streak_days, self.streak_days)?;
        next.tasks_completed = shift(next.tasks_completed, self.tasks_completed)?;
        Some(next)
    }
}

fn shift(value: u32, amount: i64) -> Option<u32> {
    let next = (value as i64).checked_add(amount)?;
    u32::try_from(next).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let stats = CharacterStats::default();
        assert_eq!(stats.level, 1);
        assert_eq!(stats.experience, 0);
        for kind in StatKind::ALL {
            assert_eq!(stats.base.get(kind), 1);
            assert_eq!(stats.hidden.get(kind), 0);
        }
        assert_eq!(stats.base.sum(), 9);
    }

    #[test]
    fn test_total_adds_hidden() {
        let mut stats = CharacterStats::default();
        stats.hidden.wisdom = 3;
        assert_eq!(stats.total(StatKind::Wisdom), 4);
        assert_eq!(stats.totals()[&StatKind::Wisdom], 4);
        assert_eq!(stats.totals()[&StatKind::Luck], 1);
    }

    #[test]
    fn test_parse_stat_names() {
        assert_eq!("Strength".parse::<StatKind>().unwrap(), StatKind::Strength);
        assert_eq!("dex".parse::<StatKind>().unwrap(), StatKind::Dexterity);
        assert_eq!(" LUCK ".parse::<StatKind>().unwrap(), StatKind::Luck);
        assert!("stamina".parse::<StatKind>().is_err());
    }

    #[test]
    fn test_columns_are_distinct() {
        let mut names: Vec<&str> = StatKind::ALL.iter().map(|k| k.as_str()).collect();
        names.extend(StatKind::ALL.iter().map(|k| k.hidden_column()));
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 18);
    }

    #[test]
    fn test_delta_spend_point() {
        let mut stats = CharacterStats::default();
        stats.stat_points = 2;
        let delta = StatDelta::new().base(StatKind::Agility, 1).stat_points(-1);
        let next = delta.apply_to(&stats).unwrap();
        assert_eq!(next.base.agility, 2);
        assert_eq!(next.stat_points, 1);
        assert_eq!(next.base.strength, 1);
    }

    #[test]
    fn test_delta_rejects_negative() {
        let stats = CharacterStats::default();
        let delta = StatDelta::new().base(StatKind::Agility, 1).stat_points(-1);
        assert!(delta.apply_to(&stats).is_none());
    }

    #[test]
    fn test_delta_accumulates_same_stat() {
        let delta = StatDelta::new().hidden(StatKind::Luck, 2).hidden(StatKind::Luck, 1);
        assert_eq!(delta.hidden[&StatKind::Luck], 3);
        assert!(!delta.is_empty());
        assert!(StatDelta::new().is_empty());
    }

    #[test]
    fn test_progress_roundtrip() {
        let stats = CharacterStats::default();
        let p = Progress {
            level: 4,
            experience: 12,
            stat_points: 15,
            skill_points: 0,
        };
        let next = stats.with_progress(p);
        assert_eq!(next.progress(), p);
        assert_eq!(next.base.sum(), 9);
    }

    #[test]
    fn test_serde_lowercase_names() {
        let json = serde_json::to_string(&StatKind::Intelligence).unwrap();
        assert_eq!(json, "\"intelligence\"");
    }
}
