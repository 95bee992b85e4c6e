//! Stat Quests
//!
//! A stat quest is a one-off task that raises the hidden bonus of one stat
//! when accepted. Descriptions come from a text generator prompted per stat,
//! or from the local templates in [`templates`] when generation fails.

pub mod templates;

use crate::constants::{QUEST_EASY_MAX_CHARS, QUEST_MEDIUM_MAX_CHARS};
use crate::stats::{StatDelta, StatKind};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Hidden stat bonus granted on acceptance
    pub fn reward(&self) -> u32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Classify by the char length of the trimmed description
    pub fn from_description(description: &str) -> Self {
        let len = description.trim().chars().count();
        if len < QUEST_EASY_MAX_CHARS {
            Difficulty::Easy
        } else if len < QUEST_MEDIUM_MAX_CHARS {
            Difficulty::Medium
        } else {
            Difficulty::Hard
        }
    }
}

/// Where a quest description came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestSource {
    Generated,
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatQuest {
    pub stat: StatKind,
    pub description: String,
    pub difficulty: Difficulty,
    pub reward: u32,
    pub source: QuestSource,
}

impl StatQuest {
    fn new(
        stat: StatKind,
        description: String,
        difficulty: Difficulty,
        source: QuestSource,
    ) -> Self {
        Self {
            stat,
            description,
            difficulty,
            reward: difficulty.reward(),
            source,
        }
    }

    /// Delta applied when the quest is accepted
    pub fn acceptance_delta(&self) -> StatDelta {
        StatDelta::new().hidden(self.stat, self.reward as i64)
    }
}

/// How template quests get their difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestDifficultyRule {
    /// Uniform random pick, independent of the text
    #[default]
    Uniform,
    /// Same length rule as generated descriptions
    ContentLength,
}

impl FromStr for QuestDifficultyRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" | "uniform-random" | "random" => Ok(QuestDifficultyRule::Uniform),
            "content-length" | "length" => Ok(QuestDifficultyRule::ContentLength),
            other => Err(format!("unknown quest difficulty rule: {other}")),
        }
    }
}

// =====================================================
// Prompts
// =====================================================

const QUEST_REQUIREMENTS: &str = "Requirements:
1. Must be completable alone
2. Must be specific and measurable
3. Must include clear duration or quantity
4. Must be realistic for a busy student
Format as a single, clear sentence.";

fn stat_prompt(stat: StatKind) -> &'static str {
    match stat {
        StatKind::Strength => {
            "Generate a solo workout quest focused on strength training that's suitable for a \
             computer science student who spends long hours at a desk. Include specific \
             exercises and duration."
        }
        StatKind::Intelligence => {
            "Generate a programming practice quest focused on algorithms, leetcode problems, \
             or coding challenges. Include specific difficulty level or topic."
        }
        StatKind::Charisma => {
            "Generate a self-improvement quest for developing communication skills, such as \
             practicing public speaking, recording video explanations, or preparing technical \
             presentations."
        }
        StatKind::Wisdom => {
            "Generate a learning quest focused on studying new programming concepts, design \
             patterns, or technology documentation."
        }
        StatKind::Agility => {
            "Generate a solo cardio or flexibility exercise quest suitable for someone who \
             works at a computer all day."
        }
        StatKind::Endurance => {
            "Generate a stamina-building quest that can be done individually, like maintaining \
             good posture during coding sessions or doing desk exercises."
        }
        StatKind::Vitality => {
            "Generate a health-focused quest related to proper nutrition, sleep schedule, or \
             exercise routine for a programmer."
        }
        StatKind::Dexterity => {
            "Generate a typing or coding speed improvement quest, or exercises for preventing \
             repetitive strain injury."
        }
        StatKind::Luck => {
            "Generate a quest focused on building good coding habits or exploring new \
             technologies that might be useful in the future."
        }
    }
}

/// Prompt sent to the text generator for a quest on `stat`
pub fn quest_prompt(stat: StatKind) -> String {
    format!("{}\n{}", stat_prompt(stat), QUEST_REQUIREMENTS)
}

// =====================================================
// Construction
// =====================================================

/// Build a quest from generated text. `None` when the text is blank, which
/// callers treat as a generation failure.
pub fn quest_from_generated(stat: StatKind, text: &str) -> Option<StatQuest> {
    let description = text.trim();
    if description.is_empty() {
        return None;
    }
    Some(StatQuest::new(
        stat,
        description.to_string(),
        Difficulty::from_description(description),
        QuestSource::Generated,
    ))
}

/// Template fallback. Draw order is fixed (category, template, placeholders
/// left to right, then difficulty) so one seed always yields one quest.
pub fn fallback_quest<R: Rng + ?Sized>(
    stat: StatKind,
    rule: QuestDifficultyRule,
    rng: &mut R,
) -> StatQuest {
    let template = templates::pick_template(rng);
    let description = templates::fill_template(template, stat.as_str(), rng);
    let difficulty = match rule {
        QuestDifficultyRule::Uniform => *Difficulty::ALL.choose(rng).unwrap_or(&Difficulty::Easy),
        QuestDifficultyRule::ContentLength => Difficulty::from_description(&description),
    };
    StatQuest::new(stat, description, difficulty, QuestSource::Template)
}
