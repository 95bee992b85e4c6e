//! Stat quest endpoints
//!
//! Endpoints:
//! - POST /api/quests/generate
//! - POST /api/quests/accept
//! - POST /api/quests/decline

use axum::{extract::State, routing::post, Json, Router};
use questlog_core::StatKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stats::StatsView;
use super::{ok, ApiResponse, ApiState};
use crate::error::ServiceError;
use crate::services::quests::QuestOffer;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/quests/generate", post(generate_quest))
        .route("/api/quests/accept", post(accept_quest))
        .route("/api/quests/decline", post(decline_quest))
}

#[derive(Deserialize)]
pub struct GenerateQuestRequest {
    pub user_id: Uuid,
    pub stat: String,
}

#[derive(Deserialize)]
pub struct ResolveOfferRequest {
    pub user_id: Uuid,
    pub offer_id: Uuid,
}

#[derive(Serialize)]
pub struct Declined {
    pub offer_id: Uuid,
}

async fn generate_quest(
    State(state): State<ApiState>,
    Json(req): Json<GenerateQuestRequest>,
) -> Result<Json<ApiResponse<QuestOffer>>, ServiceError> {
    let stat: StatKind = req.stat.parse()?;
    let offer = state.services.quests.generate(req.user_id, stat).await?;
    Ok(ok(offer))
}

async fn accept_quest(
    State(state): State<ApiState>,
    Json(req): Json<ResolveOfferRequest>,
) -> Result<Json<ApiResponse<StatsView>>, ServiceError> {
    let stats = state.services.quests.accept(req.user_id, req.offer_id).await?;
    Ok(ok(StatsView::from(stats)))
}

async fn decline_quest(
    State(state): State<ApiState>,
    Json(req): Json<ResolveOfferRequest>,
) -> Result<Json<ApiResponse<Declined>>, ServiceError> {
    state.services.quests.decline(req.user_id, req.offer_id)?;
    Ok(ok(Declined {
        offer_id: req.offer_id,
    }))
}
