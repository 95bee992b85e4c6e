//! Daily Reset & Streak Tracker
//!
//! Day boundaries are user-local: the caller supplies a fixed UTC offset in
//! minutes and every "same day" question is answered on the local calendar
//! date. The functions here only decide; storage applies the decisions with
//! conditional writes.

use crate::constants::DAILY_REWARD_XP_PER_STREAK;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Largest offset accepted from a client (UTC+14 / UTC-14)
pub const MAX_TZ_OFFSET_MINUTES: i32 = 14 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DailyError {
    #[error("daily reward already claimed today")]
    AlreadyClaimed,
    #[error("invalid timezone offset: {0} minutes")]
    InvalidOffset(i32),
}

// =====================================================
// Local time
// =====================================================

pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, DailyError> {
    if minutes.abs() > MAX_TZ_OFFSET_MINUTES {
        return Err(DailyError::InvalidOffset(minutes));
    }
    FixedOffset::east_opt(minutes * 60).ok_or(DailyError::InvalidOffset(minutes))
}

pub fn local_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Time left until the next local midnight
pub fn time_until_reset(now: DateTime<Utc>, offset: FixedOffset) -> Duration {
    let local = now.with_timezone(&offset);
    let next_midnight = local
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive - local.naive_local());
    next_midnight.unwrap_or_else(Duration::zero)
}

/// `"{h}h {m}m {s}s"`
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    format!("{}h {}m {}s", total / 3600, (total % 3600) / 60, total % 60)
}

// =====================================================
// Streak policy
// =====================================================

/// What a missed calendar day does to streaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakPolicy {
    /// A task not completed before the reset, or any gap of more than one
    /// day, zeroes the streak. A reward claim after a missed day restarts
    /// from zero.
    #[default]
    ResetOnMissedDay,
    /// Streaks only ever grow
    NeverReset,
}

impl FromStr for StreakPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "reset_on_missed_day" | "reset" => Ok(StreakPolicy::ResetOnMissedDay),
            "never_reset" | "never" => Ok(StreakPolicy::NeverReset),
            other => Err(format!("unknown streak policy: {other}")),
        }
    }
}

// =====================================================
// Task reset
// =====================================================

/// A reset to run for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPlan {
    pub previous: Option<NaiveDate>,
    pub today: NaiveDate,
    /// More than one day passed since the last reset
    pub reset_all_streaks: bool,
    /// Tasks left incomplete lose their streak
    pub reset_incomplete_streaks: bool,
}

impl ResetPlan {
    /// Streak a task carries past the reset
    pub fn streak_after(&self, completed: bool, streak: u32) -> u32 {
        if self.reset_all_streaks || (self.reset_incomplete_streaks && !completed) {
            0
        } else {
            streak
        }
    }
}

/// `None` when the marker already covers `today`. A marker ahead of
/// `today` (offset moved west) is also left alone.
pub fn plan_reset(
    last_reset_on: Option<NaiveDate>,
    today: NaiveDate,
    policy: StreakPolicy,
) -> Option<ResetPlan> {
    if matches!(last_reset_on, Some(last) if last >= today) {
        return None;
    }
    let enforce = policy == StreakPolicy::ResetOnMissedDay;
    let gap = last_reset_on.map(|last| (today - last).num_days());
    Some(ResetPlan {
        previous: last_reset_on,
        today,
        reset_all_streaks: enforce && gap.is_some_and(|g| g > 1),
        reset_incomplete_streaks: enforce,
    })
}

// =====================================================
// Daily reward
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardState {
    pub last_claimed_at: Option<DateTime<Utc>>,
    pub current_streak: u32,
}

pub fn is_claimable(state: &RewardState, now: DateTime<Utc>, offset: FixedOffset) -> bool {
    match state.last_claimed_at {
        None => true,
        Some(last) => local_date(last, offset) != local_date(now, offset),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPlan {
    pub previous_streak: u32,
    pub new_streak: u32,
    pub experience: u64,
    pub claimed_at: DateTime<Utc>,
}

pub fn plan_claim(
    state: &RewardState,
    now: DateTime<Utc>,
    offset: FixedOffset,
    policy: StreakPolicy,
) -> Result<ClaimPlan, DailyError> {
    if !is_claimable(state, now, offset) {
        return Err(DailyError::AlreadyClaimed);
    }

    let today = local_date(now, offset);
    let previous_streak = match (policy, state.last_claimed_at) {
        (StreakPolicy::NeverReset, _) | (_, None) => state.current_streak,
        (StreakPolicy::ResetOnMissedDay, Some(last)) => {
            if today.pred_opt() == Some(local_date(last, offset)) {
                state.current_streak
            } else {
                0
            }
        }
    };

    Ok(ClaimPlan {
        previous_streak,
        new_streak: previous_streak.saturating_add(1),
        experience: DAILY_REWARD_XP_PER_STREAK * previous_streak as u64,
        claimed_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc() -> FixedOffset {
        offset_from_minutes(0).unwrap()
    }

    #[test]
    fn test_offset_bounds() {
        assert!(offset_from_minutes(14 * 60).is_ok());
        assert!(offset_from_minutes(-14 * 60).is_ok());
        assert_eq!(offset_from_minutes(900), Err(DailyError::InvalidOffset(900)));
    }

    #[test]
    fn test_local_date_crosses_midnight() {
        let now = at(2024, 3, 10, 23, 30);
        assert_eq!(local_date(now, utc()), date(2024, 3, 10));
        assert_eq!(local_date(now, offset_from_minutes(60).unwrap()), date(2024, 3, 11));
        assert_eq!(
            local_date(at(2024, 3, 10, 0, 30), offset_from_minutes(-60).unwrap()),
            date(2024, 3, 9)
        );
    }

    #[test]
    fn test_time_until_reset() {
        let now = at(2024, 3, 10, 22, 0);
        assert_eq!(time_until_reset(now, utc()), Duration::hours(2));
        assert_eq!(time_until_reset(now, offset_from_minutes(120).unwrap()), Duration::hours(24));
        assert_eq!(format_countdown(Duration::seconds(3 * 3600 + 4 * 60 + 5)), "3h 4m 5s");
    }

    #[test]
    fn test_plan_reset_same_day_is_none() {
        let today = date(2024, 5, 1);
        assert!(plan_reset(Some(today), today, StreakPolicy::ResetOnMissedDay).is_none());
        let ahead = Some(date(2024, 5, 2));
        assert!(plan_reset(ahead, today, StreakPolicy::ResetOnMissedDay).is_none());
    }

    #[test]
    fn test_plan_reset_next_day_keeps_completed_streaks() {
        let plan = plan_reset(
            Some(date(2024, 5, 1)),
            date(2024, 5, 2),
            StreakPolicy::ResetOnMissedDay,
        )
        .unwrap();
        assert!(!plan.reset_all_streaks);
        assert_eq!(plan.streak_after(true, 4), 4);
        assert_eq!(plan.streak_after(false, 4), 0);
    }

    #[test]
    fn test_plan_reset_gap_breaks_all_streaks() {
        let plan = plan_reset(
            Some(date(2024, 5, 1)),
            date(2024, 5, 4),
            StreakPolicy::ResetOnMissedDay,
        )
        .unwrap();
        assert!(plan.reset_all_streaks);
        assert_eq!(plan.streak_after(true, 4), 0);
    }

    #[test]
    fn test_plan_reset_never_reset_policy() {
        let plan =
            plan_reset(Some(date(2024, 5, 1)), date(2024, 5, 9), StreakPolicy::NeverReset).unwrap();
        assert_eq!(plan.streak_after(false, 7), 7);
        assert_eq!(plan.streak_after(true, 7), 7);
    }

    #[test]
    fn test_first_reset() {
        let plan = plan_reset(None, date(2024, 5, 1), StreakPolicy::ResetOnMissedDay).unwrap();
        assert_eq!(plan.previous, None);
        assert!(!plan.reset_all_streaks);
    }

    #[test]
    fn test_first_claim_grants_nothing() {
        let plan = plan_claim(
            &RewardState::default(),
            at(2024, 5, 1, 9, 0),
            utc(),
            StreakPolicy::ResetOnMissedDay,
        )
        .unwrap();
        assert_eq!(plan.previous_streak, 0);
        assert_eq!(plan.new_streak, 1);
        assert_eq!(plan.experience, 0);
    }

    #[test]
    fn test_double_claim_rejected() {
        let state = RewardState {
            last_claimed_at: Some(at(2024, 5, 1, 0, 5)),
            current_streak: 1,
        };
        let now = at(2024, 5, 1, 23, 55);
        assert!(!is_claimable(&state, now, utc()));
        assert_eq!(
            plan_claim(&state, now, utc(), StreakPolicy::ResetOnMissedDay),
            Err(DailyError::AlreadyClaimed)
        );
    }

    #[test]
    fn test_consecutive_claim_grants_streak_xp() {
        let state = RewardState {
            last_claimed_at: Some(at(2024, 5, 1, 20, 0)),
            current_streak: 3,
        };
        let plan =
            plan_claim(&state, at(2024, 5, 2, 8, 0), utc(), StreakPolicy::ResetOnMissedDay)
                .unwrap();
        assert_eq!(plan.previous_streak, 3);
        assert_eq!(plan.new_streak, 4);
        assert_eq!(plan.experience, 150);
    }

    #[test]
    fn test_missed_day_restarts_claim_streak() {
        let state = RewardState {
            last_claimed_at: Some(at(2024, 5, 1, 20, 0)),
            current_streak: 3,
        };
        let now = at(2024, 5, 3, 8, 0);
        let plan = plan_claim(&state, now, utc(), StreakPolicy::ResetOnMissedDay).unwrap();
        assert_eq!(plan.previous_streak, 0);
        assert_eq!(plan.new_streak, 1);

        let plan = plan_claim(&state, now, utc(), StreakPolicy::NeverReset).unwrap();
        assert_eq!(plan.new_streak, 4);
        assert_eq!(plan.experience, 150);
    }

    #[test]
    fn test_claim_day_follows_offset() {
        // 23:30 UTC on May 1 is already May 2 at UTC+1
        let state = RewardState {
            last_claimed_at: Some(at(2024, 5, 1, 12, 0)),
            current_streak: 1,
        };
        let now = at(2024, 5, 1, 23, 30);
        assert!(!is_claimable(&state, now, utc()));
        assert!(is_claimable(&state, now, offset_from_minutes(60).unwrap()));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("never-reset".parse::<StreakPolicy>(), Ok(StreakPolicy::NeverReset));
        assert_eq!(
            "RESET_ON_MISSED_DAY".parse::<StreakPolicy>(),
            Ok(StreakPolicy::ResetOnMissedDay)
        );
        assert!("sometimes".parse::<StreakPolicy>().is_err());
    }
}
