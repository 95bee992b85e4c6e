//! Server Metrics: Lightweight request/progression metrics with Prometheus + JSON export
//!
//! Uses lock-free atomics for all counters.
//!
//! ## Endpoints
//! - `GET /metrics`: Prometheus text format
//! - `GET /metrics/json`: JSON format (for the load test client)

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::api::ApiState;

/// Shared metrics state (all lock-free atomics)
#[derive(Debug)]
pub struct ServerMetrics {
    /// Total HTTP requests served
    pub total_requests: AtomicU64,
    /// Total request errors (4xx + 5xx)
    pub total_errors: AtomicU64,
    /// Cumulative request duration in microseconds (for computing average)
    pub total_duration_us: AtomicU64,
    pub level_ups: AtomicU64,
    pub quests_generated: AtomicU64,
    /// Quests that came from the template fallback
    pub quest_fallbacks: AtomicU64,
    pub tasks_completed: AtomicU64,
    pub rewards_claimed: AtomicU64,
    pub skills_created: AtomicU64,
    /// Server start time (for uptime calculation)
    pub start_time: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            total_duration_us: AtomicU64::new(0),
            level_ups: AtomicU64::new(0),
            quests_generated: AtomicU64::new(0),
            quest_fallbacks: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            rewards_claimed: AtomicU64::new(0),
            skills_created: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl ServerMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, duration_us: u64, is_error: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_duration_us.fetch_add(duration_us, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn requests_per_second(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed) as f64;
        let uptime = self.uptime_secs();
        if uptime > 0.0 { total / uptime } else { 0.0 }
    }

    pub fn avg_duration_ms(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        let dur_us = self.total_duration_us.load(Ordering::Relaxed);
        if total > 0 {
            (dur_us as f64 / total as f64) / 1000.0
        } else {
            0.0
        }
    }

    pub fn snapshot(&self) -> JsonMetrics {
        JsonMetrics {
            uptime_secs: self.uptime_secs(),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            rps: self.requests_per_second(),
            avg_request_duration_ms: self.avg_duration_ms(),
            level_ups: self.level_ups.load(Ordering::Relaxed),
            quests_generated: self.quests_generated.load(Ordering::Relaxed),
            quest_fallbacks: self.quest_fallbacks.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            rewards_claimed: self.rewards_claimed.load(Ordering::Relaxed),
            skills_created: self.skills_created.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Axum Middleware: Automatic request tracking
// ============================================================================

/// Middleware that records request count and duration for every HTTP request.
pub async fn metrics_middleware(
    State(state): State<ApiState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let resp = next.run(req).await;
    let duration_us = start.elapsed().as_micros() as u64;
    let is_error = resp.status().is_client_error() || resp.status().is_server_error();

    state.metrics.record_request(duration_us, is_error);
    resp
}

// ============================================================================
// GET /metrics: Prometheus text exposition format
// ============================================================================

pub async fn prometheus_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let m = state.metrics.snapshot();
    let avg_req_duration_s = m.avg_request_duration_ms / 1000.0;

    let body = format!(
        "# HELP questlog_requests_total Total HTTP requests served\n\
         # TYPE questlog_requests_total counter\n\
         questlog_requests_total {}\n\
         \n\
         # HELP questlog_request_errors_total Total HTTP request errors (4xx/5xx)\n\
         # TYPE questlog_request_errors_total counter\n\
         questlog_request_errors_total {}\n\
         \n\
         # HELP questlog_request_duration_seconds Average request duration\n\
         # TYPE questlog_request_duration_seconds gauge\n\
         questlog_request_duration_seconds {avg_req_duration_s:.6}\n\
         \n\
         # HELP questlog_requests_per_second Current request throughput\n\
         # TYPE questlog_requests_per_second gauge\n\
         questlog_requests_per_second {:.2}\n\
         \n\
         # HELP questlog_level_ups_total Experience gains that crossed a level\n\
         # TYPE questlog_level_ups_total counter\n\
         questlog_level_ups_total {}\n\
         \n\
         # HELP questlog_quests_generated_total Stat quests offered\n\
         # TYPE questlog_quests_generated_total counter\n\
         questlog_quests_generated_total {}\n\
         \n\
         # HELP questlog_quest_fallbacks_total Stat quests built from templates\n\
         # TYPE questlog_quest_fallbacks_total counter\n\
         questlog_quest_fallbacks_total {}\n\
         \n\
         # HELP questlog_tasks_completed_total Daily tasks completed\n\
         # TYPE questlog_tasks_completed_total counter\n\
         questlog_tasks_completed_total {}\n\
         \n\
         # HELP questlog_rewards_claimed_total Daily rewards claimed\n\
         # TYPE questlog_rewards_claimed_total counter\n\
         questlog_rewards_claimed_total {}\n\
         \n\
         # HELP questlog_skills_created_total Skills committed\n\
         # TYPE questlog_skills_created_total counter\n\
         questlog_skills_created_total {}\n\
         \n\
         # HELP questlog_uptime_seconds Server uptime\n\
         # TYPE questlog_uptime_seconds gauge\n\
         questlog_uptime_seconds {:.2}\n",
        m.total_requests,
        m.total_errors,
        m.rps,
        m.level_ups,
        m.quests_generated,
        m.quest_fallbacks,
        m.tasks_completed,
        m.rewards_claimed,
        m.skills_created,
        m.uptime_secs,
    );

    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

// ============================================================================
// GET /metrics/json: JSON format for load test clients
// ============================================================================

#[derive(Debug, Serialize)]
pub struct JsonMetrics {
    pub uptime_secs: f64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub rps: f64,
    pub avg_request_duration_ms: f64,
    pub level_ups: u64,
    pub quests_generated: u64,
    pub quest_fallbacks: u64,
    pub tasks_completed: u64,
    pub rewards_claimed: u64,
    pub skills_created: u64,
}

pub async fn json_metrics_handler(State(state): State<ApiState>) -> Json<JsonMetrics> {
    Json(state.metrics.snapshot())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_metrics_defaults() {
        let m = ServerMetrics::default();
        assert_eq!(m.total_requests.load(Ordering::Relaxed), 0);
        assert_eq!(m.level_ups.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_request() {
        let m = ServerMetrics::default();
        m.record_request(1500, false);
        m.record_request(2500, true);
        m.record_request(1000, false);

        assert_eq!(m.total_requests.load(Ordering::Relaxed), 3);
        assert_eq!(m.total_errors.load(Ordering::Relaxed), 1);
        assert_eq!(m.total_duration_us.load(Ordering::Relaxed), 5000);
    }

    #[test]
    fn test_avg_duration_ms() {
        let m = ServerMetrics::default();
        m.record_request(3000, false);
        m.record_request(5000, false);
        assert!((m.avg_duration_ms() - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_domain_counters_in_snapshot() {
        let m = ServerMetrics::default();
        ServerMetrics::incr(&m.level_ups);
        ServerMetrics::incr(&m.quest_fallbacks);
        ServerMetrics::incr(&m.quest_fallbacks);
        let snap = m.snapshot();
        assert_eq!(snap.level_ups, 1);
        assert_eq!(snap.quest_fallbacks, 2);
        assert!(snap.rps.is_finite());
    }
}
