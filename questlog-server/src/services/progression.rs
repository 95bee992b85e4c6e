//! Experience, levels and stat points
//!
//! Experience writes are compare-and-set on the progress columns, retried a
//! bounded number of times against a fresh read. Stat spending is a single
//! guarded delta, so a point can never be spent twice.

use chrono::{DateTime, Utc};
use questlog_core::progression::{roll_manual_experience, spend_delta};
use questlog_core::{apply_experience, CharacterStats, LevelUpOutcome, StatDelta, StatKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppContext;
use crate::error::ServiceError;
use crate::events::LevelUpEvent;
use crate::inflight::Operation;
use crate::metrics::ServerMetrics;

/// Attempts before a contended experience write gives up
pub const CAS_RETRIES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct ExperienceGrant {
    pub outcome: LevelUpOutcome,
    pub stats: CharacterStats,
}

#[derive(Clone)]
pub struct ProgressionService {
    ctx: Arc<AppContext>,
}

impl ProgressionService {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Stats for `user_id`, creating the default row on first access
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<CharacterStats, ServiceError> {
        if let Some(stats) = self.ctx.storage.stats.get(user_id).await? {
            return Ok(stats);
        }
        Ok(self.ctx.storage.stats.create_default(user_id).await?)
    }

    /// Fold `amount` experience into the character and persist the result
    pub async fn grant_experience(
        &self,
        user_id: Uuid,
        amount: u64,
        now: DateTime<Utc>,
    ) -> Result<ExperienceGrant, ServiceError> {
        let mut stats = self.get_or_create(user_id).await?;

        for attempt in 1..=CAS_RETRIES {
            let outcome = apply_experience(stats.progress(), amount);
            let written = self
                .ctx
                .storage
                .stats
                .compare_and_set_progress(user_id, outcome.before, outcome.after)
                .await?;

            match written {
                Some(updated) => {
                    if outcome.leveled_up() {
                        info!(
                            %user_id,
                            from = outcome.before.level,
                            to = outcome.after.level,
                            "level up"
                        );
                        ServerMetrics::incr(&self.ctx.metrics.level_ups);
                        self.ctx
                            .events
                            .publish(LevelUpEvent::from_outcome(user_id, &outcome, now));
                    }
                    return Ok(ExperienceGrant {
                        outcome,
                        stats: updated,
                    });
                }
                None => {
                    debug!(%user_id, attempt, "stale progress, re-reading");
                    stats = self.get_or_create(user_id).await?;
                }
            }
        }

        warn!(%user_id, amount, "experience write kept losing the race");
        Err(ServiceError::Conflict(
            "stats changed concurrently, try again".to_string(),
        ))
    }

    /// The "gain experience" button
    pub async fn gain_manual(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ExperienceGrant, ServiceError> {
        let _ticket = self.ctx.inflight.try_acquire(user_id, Operation::GainExperience)?;
        let amount = roll_manual_amount();
        self.grant_experience(user_id, amount, now).await
    }

    pub async fn spend_point(
        &self,
        user_id: Uuid,
        stat: StatKind,
    ) -> Result<CharacterStats, ServiceError> {
        let _ticket = self.ctx.inflight.try_acquire(user_id, Operation::SpendPoint)?;
        let stats = self.get_or_create(user_id).await?;
        if stats.stat_points == 0 {
            warn!(%user_id, %stat, "no stat points to spend");
            return Err(ServiceError::InsufficientPoints { have: 0, need: 1 });
        }

        match self.ctx.storage.stats.apply_delta(user_id, &spend_delta(stat)).await? {
            Some(updated) => {
                debug!(%user_id, %stat, remaining = updated.stat_points, "stat point spent");
                Ok(updated)
            }
            None => {
                // Spent elsewhere between the read and the write
                let current = self.get_or_create(user_id).await?;
                warn!(%user_id, %stat, "stat point vanished before spend");
                Err(ServiceError::InsufficientPoints {
                    have: current.stat_points,
                    need: 1,
                })
            }
        }
    }

    /// Apply a counter delta to an existing or freshly created row
    pub async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &StatDelta,
    ) -> Result<CharacterStats, ServiceError> {
        self.get_or_create(user_id).await?;
        self.ctx
            .storage
            .stats
            .apply_delta(user_id, delta)
            .await?
            .ok_or_else(|| ServiceError::Conflict("stat change would go below zero".to_string()))
    }
}

fn roll_manual_amount() -> u64 {
    roll_manual_experience(&mut rand::thread_rng())
}
