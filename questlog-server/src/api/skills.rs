//! Skill endpoints
//!
//! Endpoints:
//! - POST /api/skills
//! - POST /api/skills/propose
//! - POST /api/skills/commit

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ok, ApiResponse, ApiState, UserRequest};
use crate::error::ServiceError;
use crate::services::skills::ProposalOutcome;
use crate::storage::repository::Skill;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/skills", post(list_skills))
        .route("/api/skills/propose", post(propose_skill))
        .route("/api/skills/commit", post(commit_skill))
}

#[derive(Deserialize)]
pub struct ProposeSkillRequest {
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct CommitSkillRequest {
    pub user_id: Uuid,
    pub proposal_id: Uuid,
}

#[derive(Serialize)]
pub struct SkillList {
    pub skills: Vec<Skill>,
}

#[derive(Serialize)]
pub struct SkillView {
    pub skill: Skill,
}

async fn list_skills(
    State(state): State<ApiState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<ApiResponse<SkillList>>, ServiceError> {
    let skills = state.services.skills.list(req.user_id).await?;
    Ok(ok(SkillList { skills }))
}

async fn propose_skill(
    State(state): State<ApiState>,
    Json(req): Json<ProposeSkillRequest>,
) -> Result<Json<ApiResponse<ProposalOutcome>>, ServiceError> {
    let outcome = state
        .services
        .skills
        .propose(req.user_id, &req.name, &req.description)
        .await?;
    Ok(ok(outcome))
}

async fn commit_skill(
    State(state): State<ApiState>,
    Json(req): Json<CommitSkillRequest>,
) -> Result<Json<ApiResponse<SkillView>>, ServiceError> {
    let skill = state
        .services
        .skills
        .commit(req.user_id, req.proposal_id)
        .await?;
    Ok(ok(SkillView { skill }))
}
