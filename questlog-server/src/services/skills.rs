//! Skill proposals and commits
//!
//! A proposal is evaluated by the generator and decided locally; nothing is
//! written. A committable decision is parked in the pending store and only a
//! later commit inserts the skill, debiting its cost in the same transaction.

use questlog_core::skills::{
    decide, evaluation_prompt, parse_evaluation, NewSkill, SkillDecision, SkillProposal,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{AppContext, ProgressionService};
use crate::error::ServiceError;
use crate::inflight::Operation;
use crate::metrics::ServerMetrics;
use crate::pending::PendingStore;
use crate::storage::repository::Skill;

#[derive(Debug, Clone, Serialize)]
pub struct ProposalOutcome {
    /// Set when the decision can be committed
    pub proposal_id: Option<Uuid>,
    pub decision: SkillDecision,
}

#[derive(Clone)]
pub struct SkillService {
    ctx: Arc<AppContext>,
    progression: ProgressionService,
    pending: Arc<PendingStore<NewSkill>>,
}

impl SkillService {
    pub fn new(ctx: Arc<AppContext>, progression: ProgressionService) -> Self {
        let pending = Arc::new(PendingStore::new(ctx.settings.pending_offer_capacity));
        Self {
            ctx,
            progression,
            pending,
        }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Skill>, ServiceError> {
        Ok(self.ctx.storage.skills.list(user_id).await?)
    }

    pub async fn propose(
        &self,
        user_id: Uuid,
        name: &str,
        description: &str,
    ) -> Result<ProposalOutcome, ServiceError> {
        let proposal = SkillProposal::new(name, description)?;
        let _ticket = self.ctx.inflight.try_acquire(user_id, Operation::ProposeSkill)?;
        let stats = self.progression.get_or_create(user_id).await?;

        let prompt = evaluation_prompt(&proposal, stats.level, stats.skill_points);
        let reply = self.ctx.generator.generate(&prompt).await.inspect_err(|e| {
            warn!(
                %user_id,
                generator = self.ctx.generator.name(),
                error = %e,
                "skill evaluation request failed"
            );
        })?;
        let evaluation = parse_evaluation(&reply).inspect_err(|e| {
            warn!(%user_id, error = %e, "unusable skill evaluation");
        })?;

        let decision = decide(evaluation, proposal, stats.skill_points);
        let proposal_id = decision
            .committable()
            .map(|skill| self.pending.insert(user_id, skill));

        info!(
            %user_id,
            outcome = decision.outcome(),
            available = stats.skill_points,
            "skill proposal evaluated"
        );
        Ok(ProposalOutcome {
            proposal_id,
            decision,
        })
    }

    pub async fn commit(&self, user_id: Uuid, proposal_id: Uuid) -> Result<Skill, ServiceError> {
        let _ticket = self.ctx.inflight.try_acquire(user_id, Operation::CommitSkill)?;
        let skill = self
            .pending
            .get(user_id, proposal_id)
            .ok_or_else(|| ServiceError::NotFound("skill proposal".to_string()))?;
        self.progression.get_or_create(user_id).await?;

        match self.ctx.storage.skills.create_with_debit(user_id, &skill).await? {
            Some(created) => {
                self.pending.take(user_id, proposal_id);
                ServerMetrics::incr(&self.ctx.metrics.skills_created);
                info!(%user_id, skill = %created.name, cost = skill.cost, "skill committed");
                Ok(created)
            }
            None => {
                let have = self.progression.get_or_create(user_id).await?.skill_points;
                warn!(%user_id, have, need = skill.cost, "not enough skill points to commit");
                Err(ServiceError::InsufficientPoints {
                    have,
                    need: skill.cost,
                })
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
