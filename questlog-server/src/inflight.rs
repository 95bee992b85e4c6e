//! Per-user in-flight guard
//!
//! At most one state-changing request of each kind runs per user. A second
//! one arriving while the first is still running is turned away instead of
//! queued. The slot is released when the returned ticket drops.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GainExperience,
    SpendPoint,
    AcceptQuest,
    CompleteTask,
    ClaimReward,
    ProposeSkill,
    CommitSkill,
}

#[derive(Debug, Default)]
pub struct InFlight {
    active: Mutex<HashSet<(Uuid, Operation)>>,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn try_acquire(
        self: &Arc<Self>,
        user_id: Uuid,
        op: Operation,
    ) -> Result<InFlightTicket, ServiceError> {
        if !self.active.lock().insert((user_id, op)) {
            tracing::warn!(%user_id, ?op, "rejected concurrent request");
            return Err(ServiceError::InProgress);
        }
        Ok(InFlightTicket {
            owner: Arc::clone(self),
            key: (user_id, op),
        })
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

#[derive(Debug)]
pub struct InFlightTicket {
    owner: Arc<InFlight>,
    key: (Uuid, Operation),
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        self.owner.active.lock().remove(&self.key);
    }
}
