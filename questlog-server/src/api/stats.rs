//! Character stats and progression endpoints
//!
//! Endpoints:
//! - POST /api/stats
//! - POST /api/stats/gain-experience
//! - POST /api/stats/spend-point

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use questlog_core::{experience_needed, CharacterStats, LevelUpOutcome, StatKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{ok, ApiResponse, ApiState, UserRequest};
use crate::error::ServiceError;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/stats", post(get_stats))
        .route("/api/stats/gain-experience", post(gain_experience))
        .route("/api/stats/spend-point", post(spend_point))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct SpendPointRequest {
    pub user_id: Uuid,
    /// Stat name or abbreviation, case-insensitive
    pub stat: String,
}

#[derive(Serialize)]
pub struct StatsView {
    pub stats: CharacterStats,
    /// Base plus hidden bonus, as displayed
    pub totals: BTreeMap<StatKind, u32>,
    pub experience_needed: u64,
}

impl From<CharacterStats> for StatsView {
    fn from(stats: CharacterStats) -> Self {
        Self {
            totals: stats.totals(),
            experience_needed: experience_needed(stats.level),
            stats,
        }
    }
}

#[derive(Serialize)]
pub struct GainExperienceResponse {
    pub experience_gained: u64,
    pub leveled_up: bool,
    pub outcome: LevelUpOutcome,
    #[serde(flatten)]
    pub view: StatsView,
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_stats(
    State(state): State<ApiState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<ApiResponse<StatsView>>, ServiceError> {
    let stats = state.services.progression.get_or_create(req.user_id).await?;
    Ok(ok(StatsView::from(stats)))
}

async fn gain_experience(
    State(state): State<ApiState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<ApiResponse<GainExperienceResponse>>, ServiceError> {
    let grant = state
        .services
        .progression
        .gain_manual(req.user_id, Utc::now())
        .await?;
    Ok(ok(GainExperienceResponse {
        experience_gained: grant.outcome.experience_gained,
        leveled_up: grant.outcome.leveled_up(),
        outcome: grant.outcome,
        view: StatsView::from(grant.stats),
    }))
}

async fn spend_point(
    State(state): State<ApiState>,
    Json(req): Json<SpendPointRequest>,
) -> Result<Json<ApiResponse<StatsView>>, ServiceError> {
    let stat: StatKind = req.stat.parse()?;
    let stats = state.services.progression.spend_point(req.user_id, stat).await?;
    Ok(ok(StatsView::from(stats)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_view_totals() {
        let mut stats = CharacterStats::default();
        stats.hidden.wisdom = 3;
        stats.level = 4;
        let view = StatsView::from(stats);
        assert_eq!(view.totals[&StatKind::Wisdom], 4);
        assert_eq!(view.totals[&StatKind::Luck], 1);
        assert_eq!(view.experience_needed, 4000);
    }
}
