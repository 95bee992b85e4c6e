//! In-process level-up events
//!
//! Fire-and-forget broadcast: publishing never blocks and never fails, and a
//! subscriber that falls behind simply misses events.

use chrono::{DateTime, Utc};
use questlog_core::LevelUpOutcome;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpEvent {
    pub user_id: Uuid,
    pub level_before: u32,
    pub level_after: u32,
    pub stat_points_granted: u32,
    pub skill_points_granted: u32,
    pub at: DateTime<Utc>,
}

impl LevelUpEvent {
    pub fn from_outcome(user_id: Uuid, outcome: &LevelUpOutcome, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            level_before: outcome.before.level,
            level_after: outcome.after.level,
            stat_points_granted: outcome.stat_points_granted,
            skill_points_granted: outcome.skill_points_granted,
            at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LevelUpEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of live subscribers that will see the event
    pub fn publish(&self, event: LevelUpEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LevelUpEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(user_id: Uuid) -> LevelUpEvent {
        LevelUpEvent {
            user_id,
            level_before: 1,
            level_after: 2,
            stat_points_granted: 5,
            skill_points_granted: 0,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(event(Uuid::new_v4())), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let user = Uuid::new_v4();
        assert_eq!(bus.publish(event(user)), 1);
        let got = rx.recv().await.unwrap();
        assert_eq!(got.user_id, user);
        assert_eq!(got.level_after, 2);
    }
}
