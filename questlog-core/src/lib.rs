//! Questlog - Core Rules Library
//!
//! Pure, storage-free game rules for the questlog self-improvement RPG:
//! - Character stats (nine base stats plus hidden quest bonuses)
//! - Progression (experience curve, bounded level-up resolution, stat spending)
//! - Stat quests (prompts, difficulty classification, template fallback)
//! - Dailies (local-day reset planning, streak policy, reward claims)
//! - Skills (evaluator prompt, JSON extraction, approval decisions)
//! - Player profile and calendar validation
//!
//! Everything here is deterministic given its inputs (randomness is always
//! injected as a `rand::Rng`), so the server can wrap it in storage and
//! concurrency control without duplicating any rule.

pub mod calendar;
pub mod constants;
pub mod daily;
pub mod logging;
pub mod profile;
pub mod progression;
pub mod quests;
pub mod skills;
pub mod stats;

pub use progression::{apply_experience, experience_needed, LevelUpOutcome};
pub use stats::{CharacterStats, Progress, StatBlock, StatDelta, StatKind};

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Deterministic RNG for reproducible quest fallbacks and experience rolls.
pub fn seeded_rng(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}
