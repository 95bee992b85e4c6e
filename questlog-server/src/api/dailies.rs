//! Daily task and login reward endpoints
//!
//! Endpoints:
//! - POST /api/dailies/status
//! - POST /api/dailies/tasks
//! - POST /api/dailies/tasks/create
//! - POST /api/dailies/tasks/update
//! - POST /api/dailies/tasks/complete
//! - POST /api/dailies/claim
//!
//! `tz_offset_minutes` is the caller's UTC offset (east positive) and
//! defaults to 0.

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{double_option, ok, ApiResponse, ApiState, UserRequest};
use crate::error::ServiceError;
use crate::services::dailies::{DailyStatus, RewardClaim, TaskCompletion};
use crate::storage::repository::DailyTask;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/dailies/status", post(status))
        .route("/api/dailies/tasks", post(list_tasks))
        .route("/api/dailies/tasks/create", post(create_task))
        .route("/api/dailies/tasks/update", post(update_task))
        .route("/api/dailies/tasks/complete", post(complete_task))
        .route("/api/dailies/claim", post(claim_reward))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LocalRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub tz_offset_minutes: i32,
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub xp_reward: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub user_id: Uuid,
    pub task_id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    /// Absent leaves the description, `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub xp_reward: Option<u32>,
}

#[derive(Deserialize)]
pub struct CompleteTaskRequest {
    pub user_id: Uuid,
    pub task_id: Uuid,
    #[serde(default)]
    pub tz_offset_minutes: i32,
}

#[derive(Serialize)]
pub struct TaskList {
    pub tasks: Vec<DailyTask>,
}

#[derive(Serialize)]
pub struct TaskView {
    pub task: DailyTask,
}

// ============================================================================
// Handlers
// ============================================================================

async fn status(
    State(state): State<ApiState>,
    Json(req): Json<LocalRequest>,
) -> Result<Json<ApiResponse<DailyStatus>>, ServiceError> {
    let status = state
        .services
        .dailies
        .status(req.user_id, Utc::now(), req.tz_offset_minutes)
        .await?;
    Ok(ok(status))
}

async fn list_tasks(
    State(state): State<ApiState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<ApiResponse<TaskList>>, ServiceError> {
    let tasks = state.services.dailies.list_tasks(req.user_id).await?;
    Ok(ok(TaskList { tasks }))
}

async fn create_task(
    State(state): State<ApiState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<ApiResponse<TaskView>>, ServiceError> {
    let task = state
        .services
        .dailies
        .create_task(req.user_id, &req.title, req.description.as_deref(), req.xp_reward)
        .await?;
    Ok(ok(TaskView { task }))
}

async fn update_task(
    State(state): State<ApiState>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<ApiResponse<TaskView>>, ServiceError> {
    let task = state
        .services
        .dailies
        .update_task(
            req.user_id,
            req.task_id,
            req.title.as_deref(),
            req.description.as_ref().map(|d| d.as_deref()),
            req.xp_reward,
        )
        .await?;
    Ok(ok(TaskView { task }))
}

async fn complete_task(
    State(state): State<ApiState>,
    Json(req): Json<CompleteTaskRequest>,
) -> Result<Json<ApiResponse<TaskCompletion>>, ServiceError> {
    let completion = state
        .services
        .dailies
        .complete_task(req.user_id, req.task_id, Utc::now(), req.tz_offset_minutes)
        .await?;
    Ok(ok(completion))
}

async fn claim_reward(
    State(state): State<ApiState>,
    Json(req): Json<LocalRequest>,
) -> Result<Json<ApiResponse<RewardClaim>>, ServiceError> {
    let claim = state
        .services
        .dailies
        .claim_reward(req.user_id, Utc::now(), req.tz_offset_minutes)
        .await?;
    Ok(ok(claim))
}
