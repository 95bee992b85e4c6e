//! Calendar endpoints
//!
//! Endpoints:
//! - POST /api/calendar
//! - POST /api/calendar/create

use axum::{extract::State, routing::post, Json, Router};
use questlog_core::calendar::CalendarEntry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ok, ApiResponse, ApiState, UserRequest};
use crate::error::ServiceError;
use crate::storage::repository::CalendarTask;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/api/calendar", post(list_calendar))
        .route("/api/calendar/create", post(create_calendar))
}

#[derive(Deserialize)]
pub struct CreateCalendarRequest {
    pub user_id: Uuid,
    pub task: CalendarEntry,
}

#[derive(Serialize)]
pub struct CalendarList {
    pub tasks: Vec<CalendarTask>,
}

#[derive(Serialize)]
pub struct CalendarView {
    pub task: CalendarTask,
}

async fn list_calendar(
    State(state): State<ApiState>,
    Json(req): Json<UserRequest>,
) -> Result<Json<ApiResponse<CalendarList>>, ServiceError> {
    let tasks = state.services.calendar.list(req.user_id).await?;
    Ok(ok(CalendarList { tasks }))
}

async fn create_calendar(
    State(state): State<ApiState>,
    Json(req): Json<CreateCalendarRequest>,
) -> Result<Json<ApiResponse<CalendarView>>, ServiceError> {
    let task = state.services.calendar.create(req.user_id, req.task).await?;
    Ok(ok(CalendarView { task }))
}
