//! Centralized progression constants for the questlog rules engine.
//!
//! Keeps the XP curve, point grants and reward tables in one place so the
//! server services and the core rules never disagree on a number.

// =====================================================
// Leveling
// =====================================================

/// Experience required to leave a level: threshold = level * EXPERIENCE_PER_LEVEL
pub const EXPERIENCE_PER_LEVEL: u64 = 1000;

/// Unallocated stat points granted per level gained
pub const STAT_POINTS_PER_LEVEL: u32 = 5;

/// Every level divisible by this grants one skill point
pub const SKILL_POINT_LEVEL_INTERVAL: u32 = 10;

/// Upper bound on level-ups resolved from a single experience gain
pub const MAX_LEVEL_UPS_PER_GAIN: u32 = 1000;

/// Starting value of every base stat
pub const BASE_STAT_START: u32 = 1;

// =====================================================
// Experience sources
// =====================================================

/// Manual "gain experience" action: inclusive lower bound
pub const MANUAL_XP_MIN: u64 = 50;

/// Manual "gain experience" action: inclusive upper bound
pub const MANUAL_XP_MAX: u64 = 149;

/// Daily reward XP = DAILY_REWARD_XP_PER_STREAK * streak before the claim
pub const DAILY_REWARD_XP_PER_STREAK: u64 = 50;

/// Default XP reward for a newly created daily task
pub const DEFAULT_TASK_XP_REWARD: u32 = 10;

// =====================================================
// Stat quests
// =====================================================

/// Descriptions shorter than this (in chars) are easy
pub const QUEST_EASY_MAX_CHARS: usize = 50;

/// Descriptions shorter than this (in chars) are medium, longer are hard
pub const QUEST_MEDIUM_MAX_CHARS: usize = 100;

// =====================================================
// Skills
// =====================================================

/// Lowest power level / point cost an evaluation may report
pub const SKILL_MIN_POINTS: u32 = 1;

/// Highest power level / point cost an evaluation may report
pub const SKILL_MAX_POINTS: u32 = 5;

/// Level assigned to a freshly created skill
pub const SKILL_START_LEVEL: u32 = 1;
