//! Profile endpoints
//!
//! Endpoints:
//! - POST /api/profile
//! - POST /api/profile/username
//! - POST /api/profile/profession
//! - POST /api/profile/avatar
//! - GET  /api/professions

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use questlog_core::profile::{AvatarCustomization, PlayerProfile, Profession};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ok, ApiResponse, ApiState, UserRequest};
use crate::error::ServiceError;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/profile", post(get_profile))
        .route("/api/profile/username", post(set_username))
        .route("/api/profile/profession", post(set_profession))
        .route("/api/profile/avatar", post(set_avatar))
        .route("/api/professions", get(list_professions))
}

#[derive(Deserialize)]
pub struct UsernameRequest {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Deserialize)]
pub struct ProfessionRequest {
    pub user_id: Uuid,
    pub profession: String,
}

#[derive(Deserialize)]
pub struct AvatarRequest {
    pub user_id: Uuid,
    pub avatar: AvatarCustomization,
}

#[derive(Serialize)]
pub struct ProfileView {
    pub profile: PlayerProfile,
}

#[derive(Serialize)]
pub struct ProfessionList {
    pub professions: &'static [Profession],
}

async fn get_profile(
    State(state): State<ApiState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<ApiResponse<ProfileView>>, ServiceError> {
    let profile = state.services.profile.get(req.user_id).await?;
    Ok(ok(ProfileView { profile }))
}

async fn set_username(
    State(state): State<ApiState>,
    Json(req): Json<UsernameRequest>,
) -> Result<Json<ApiResponse<ProfileView>>, ServiceError> {
    let profile = state
        .services
        .profile
        .set_username(req.user_id, &req.username)
        .await?;
    Ok(ok(ProfileView { profile }))
}

async fn set_profession(
    State(state): State<ApiState>,
    Json(req): Json<ProfessionRequest>,
) -> Result<Json<ApiResponse<ProfileView>>, ServiceError> {
    let profile = state
        .services
        .profile
        .set_profession(req.user_id, &req.profession)
        .await?;
    Ok(ok(ProfileView { profile }))
}

async fn set_avatar(
    State(state): State<ApiState>,
    Json(req): Json<AvatarRequest>,
) -> Result<Json<ApiResponse<ProfileView>>, ServiceError> {
    let profile = state
        .services
        .profile
        .set_avatar(req.user_id, &req.avatar)
        .await?;
    Ok(ok(ProfileView { profile }))
}

async fn list_professions(State(state): State<ApiState>) -> Json<ApiResponse<ProfessionList>> {
    ok(ProfessionList {
        professions: state.services.profile.professions(),
    })
}
