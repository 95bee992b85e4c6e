//! Stat quest offers
//!
//! Generation never fails from the caller's point of view: any generator
//! error or blank reply falls back to the local templates.

use questlog_core::quests::{
    fallback_quest, quest_from_generated, quest_prompt, QuestDifficultyRule, StatQuest,
};
use questlog_core::{CharacterStats, StatKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{AppContext, ProgressionService};
use crate::error::ServiceError;
use crate::inflight::Operation;
use crate::metrics::ServerMetrics;
use crate::pending::PendingStore;

#[derive(Debug, Clone, Serialize)]
pub struct QuestOffer {
    pub offer_id: Uuid,
    pub quest: StatQuest,
}

#[derive(Clone)]
pub struct QuestService {
    ctx: Arc<AppContext>,
    progression: ProgressionService,
    pending: Arc<PendingStore<StatQuest>>,
}

impl QuestService {
    pub fn new(ctx: Arc<AppContext>, progression: ProgressionService) -> Self {
        let pending = Arc::new(PendingStore::new(ctx.settings.pending_offer_capacity));
        Self {
            ctx,
            progression,
            pending,
        }
    }

    pub async fn generate(
        &self,
        user_id: Uuid,
        stat: StatKind,
    ) -> Result<QuestOffer, ServiceError> {
        let generator = &self.ctx.generator;
        let quest = match generator.generate(&quest_prompt(stat)).await {
            Ok(text) => {
                let quest = quest_from_generated(stat, &text);
                if quest.is_none() {
                    warn!(generator = generator.name(), %stat, "blank quest text, using template");
                }
                quest
            }
            Err(e) => {
                warn!(
                    generator = generator.name(),
                    %stat,
                    error = %e,
                    "quest generation failed, using template"
                );
                None
            }
        };

        let quest = match quest {
            Some(quest) => quest,
            None => {
                ServerMetrics::incr(&self.ctx.metrics.quest_fallbacks);
                template_quest(stat, self.ctx.settings.quest_difficulty_rule)
            }
        };
        ServerMetrics::incr(&self.ctx.metrics.quests_generated);

        let offer_id = self.pending.insert(user_id, quest.clone());
        debug!(%user_id, %offer_id, difficulty = ?quest.difficulty, "quest offered");
        Ok(QuestOffer { offer_id, quest })
    }

    /// Add the reward to the hidden stat. The offer is consumed only once
    /// the stat write has gone through.
    pub async fn accept(
        &self,
        user_id: Uuid,
        offer_id: Uuid,
    ) -> Result<CharacterStats, ServiceError> {
        let _ticket = self.ctx.inflight.try_acquire(user_id, Operation::AcceptQuest)?;
        let quest = self
            .pending
            .get(user_id, offer_id)
            .ok_or_else(|| ServiceError::NotFound("quest offer".to_string()))?;

        let stats = self
            .progression
            .apply_delta(user_id, &quest.acceptance_delta())
            .await?;
        self.pending.take(user_id, offer_id);

        info!(%user_id, stat = %quest.stat, reward = quest.reward, "quest accepted");
        Ok(stats)
    }

    pub fn decline(&self, user_id: Uuid, offer_id: Uuid) -> Result<(), ServiceError> {
        let quest = self
            .pending
            .take(user_id, offer_id)
            .ok_or_else(|| ServiceError::NotFound("quest offer".to_string()))?;
        debug!(%user_id, stat = %quest.stat, "quest declined");
        Ok(())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn template_quest(stat: StatKind, rule: QuestDifficultyRule) -> StatQuest {
    fallback_quest(stat, rule, &mut rand::thread_rng())
}
