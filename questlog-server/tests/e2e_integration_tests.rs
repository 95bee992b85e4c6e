//! End-to-End Integration Tests
//!
//! Drives the services the way the handlers do, over the in-memory backend
//! and a scripted generator, with explicit clocks so day boundaries are
//! deterministic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use questlog_core::daily::{RewardState, StreakPolicy};
use questlog_core::skills::SkillDecision;
use questlog_core::{CharacterStats, Progress, StatDelta, StatKind};
use questlog_server::ai::{ScriptedGenerator, TextGenerator};
use questlog_server::config::ServiceSettings;
use questlog_server::error::{ServiceError, StoreError};
use questlog_server::events::EventBus;
use questlog_server::inflight::{InFlight, Operation};
use questlog_server::metrics::ServerMetrics;
use questlog_server::services::{AppContext, Services};
use questlog_server::storage::init_memory_storage;
use questlog_server::storage::repository::{
    DailyRewardRepo, RepoResult, StatsRepo, StorageManager, TaskRepo,
};
use questlog_server::MemoryStore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uuid::Uuid;

struct Harness {
    store: MemoryStore,
    ctx: Arc<AppContext>,
    services: Services,
}

fn harness_with(generator: ScriptedGenerator, settings: ServiceSettings) -> Harness {
    let store = MemoryStore::new();
    harness_over(store.clone(), init_memory_storage(store), generator, settings)
}

fn harness_over(
    store: MemoryStore,
    storage: StorageManager,
    generator: ScriptedGenerator,
    settings: ServiceSettings,
) -> Harness {
    let generator: Arc<dyn TextGenerator> = Arc::new(generator);
    let ctx = Arc::new(AppContext {
        storage,
        generator,
        events: EventBus::default(),
        inflight: InFlight::new(),
        metrics: ServerMetrics::new(),
        settings,
    });
    let services = Services::new(ctx.clone());
    Harness { store, ctx, services }
}

/// Stats store whose progress writes always fail
struct BrokenProgressWrites(MemoryStore);

#[async_trait]
impl StatsRepo for BrokenProgressWrites {
    async fn get(&self, user_id: Uuid) -> RepoResult<Option<CharacterStats>> {
        StatsRepo::get(&self.0, user_id).await
    }

    async fn create_default(&self, user_id: Uuid) -> RepoResult<CharacterStats> {
        StatsRepo::create_default(&self.0, user_id).await
    }

    async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &StatDelta,
    ) -> RepoResult<Option<CharacterStats>> {
        StatsRepo::apply_delta(&self.0, user_id, delta).await
    }

    async fn compare_and_set_progress(
        &self,
        _user_id: Uuid,
        _expected: Progress,
        _next: Progress,
    ) -> RepoResult<Option<CharacterStats>> {
        Err(StoreError::Corrupt("progress write refused".to_string()))
    }
}

/// Two harnesses over one store: the first cannot write progress
fn broken_and_healthy() -> (Harness, Harness) {
    let store = MemoryStore::new();
    let mut storage = init_memory_storage(store.clone());
    storage.stats = Box::new(BrokenProgressWrites(store.clone()));
    let broken = harness_over(
        store.clone(),
        storage,
        ScriptedGenerator::failing(),
        ServiceSettings::default(),
    );
    let healthy = harness_over(
        store.clone(),
        init_memory_storage(store),
        ScriptedGenerator::failing(),
        ServiceSettings::default(),
    );
    (broken, healthy)
}

fn harness(generator: ScriptedGenerator) -> Harness {
    harness_with(generator, ServiceSettings::default())
}

fn at(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
}

fn evaluation_reply(valid: bool, required: u32, adjusted: Option<u32>) -> String {
    let adjusted = match adjusted {
        Some(points) => format!(
            r#"{{"name": "Borrowck Basics", "description": "Fix one borrow error a day",
                "requiredPoints": {points}}}"#
        ),
        None => "null".to_string(),
    };
    format!(
        "Here is my evaluation:\n```json\n{{\"isValid\": {valid}, \"powerLevel\": {required}, \
         \"requiredPoints\": {required}, \"feedback\": \"solid\", \"icon\": \"🦀\", \
         \"adjustedVersion\": {adjusted}}}\n```"
    )
}

// ============================================================================
// Progression
// ============================================================================

#[tokio::test]
async fn test_task_completion_levels_up_and_publishes() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();
    h.store.put_stats(
        user,
        CharacterStats {
            experience: 950,
            ..CharacterStats::default()
        },
    );
    let mut events = h.ctx.events.subscribe();

    let task = h
        .services
        .dailies
        .create_task(user, "Ship it", None, Some(100))
        .await
        .unwrap();
    let done = h
        .services
        .dailies
        .complete_task(user, task.id, at(2, 12), 0)
        .await
        .unwrap();

    assert!(done.experience.outcome.leveled_up());
    assert_eq!(done.experience.stats.level, 2);
    assert_eq!(done.experience.stats.experience, 50);
    assert_eq!(done.experience.stats.stat_points, 5);
    assert_eq!(done.experience.stats.tasks_completed, 1);

    let event = events.try_recv().unwrap();
    assert_eq!(event.user_id, user);
    assert_eq!(event.level_before, 1);
    assert_eq!(event.level_after, 2);
    assert_eq!(event.stat_points_granted, 5);
    assert_eq!(h.ctx.metrics.level_ups.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_large_grant_resolves_every_level() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();
    // 1000 (L1) + 2000 (L2) + 3000 (L3) = 6000 to reach level 4
    let grant = h
        .services
        .progression
        .grant_experience(user, 6_500, at(2, 12))
        .await
        .unwrap();
    assert_eq!(grant.stats.level, 4);
    assert_eq!(grant.stats.experience, 500);
    assert_eq!(grant.stats.stat_points, 15);
    assert_eq!(grant.outcome.levels_gained, 3);
}

#[tokio::test]
async fn test_spend_point_without_points() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();
    let err = h
        .services
        .progression
        .spend_point(user, StatKind::Luck)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientPoints { have: 0, need: 1 }));
    assert_eq!(err.status(), 200);

    let stats = h.services.progression.get_or_create(user).await.unwrap();
    assert_eq!(stats.base.luck, 1);
}

#[tokio::test]
async fn test_spend_point_moves_one_point() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();
    h.store.put_stats(
        user,
        CharacterStats {
            stat_points: 2,
            ..CharacterStats::default()
        },
    );
    let stats = h
        .services
        .progression
        .spend_point(user, StatKind::Intelligence)
        .await
        .unwrap();
    assert_eq!(stats.base.intelligence, 2);
    assert_eq!(stats.stat_points, 1);
}

// ============================================================================
// Quests
// ============================================================================

#[tokio::test]
async fn test_quest_medium_reward_and_decline() {
    let long = "Run a full 10 km loop around the park, \
                then stretch for twenty minutes and log your time";
    let h = harness(ScriptedGenerator::always(long));
    let user = Uuid::new_v4();

    let offer = h.services.quests.generate(user, StatKind::Endurance).await.unwrap();
    assert_eq!(offer.quest.reward, 2);
    let stats = h.services.quests.accept(user, offer.offer_id).await.unwrap();
    assert_eq!(stats.hidden.endurance, 2);
    assert_eq!(stats.total(StatKind::Endurance), 3);

    let offer = h.services.quests.generate(user, StatKind::Endurance).await.unwrap();
    h.services.quests.decline(user, offer.offer_id).unwrap();
    assert_eq!(h.services.quests.pending_count(), 0);
    let err = h.services.quests.accept(user, offer.offer_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_quest_offer_belongs_to_its_user() {
    let h = harness(ScriptedGenerator::always("Call a friend"));
    let owner = Uuid::new_v4();
    let offer = h.services.quests.generate(owner, StatKind::Charisma).await.unwrap();

    let err = h
        .services
        .quests
        .accept(Uuid::new_v4(), offer.offer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    assert_eq!(h.services.quests.pending_count(), 1);
}

// ============================================================================
// Dailies
// ============================================================================

#[tokio::test]
async fn test_reset_keeps_completed_streaks_then_zeroes_after_gap() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();
    let task = h
        .services
        .dailies
        .create_task(user, "Meditate", Some("10 minutes"), None)
        .await
        .unwrap();

    let done = h
        .services
        .dailies
        .complete_task(user, task.id, at(2, 9), 0)
        .await
        .unwrap();
    assert_eq!(done.task.streak, 1);

    // Next day: completed tasks keep their streak and reopen
    let status = h.services.dailies.status(user, at(3, 9), 0).await.unwrap();
    assert!(status.reset_applied);
    assert!(!status.tasks[0].completed);
    assert_eq!(status.tasks[0].streak, 1);

    // Same day again: nothing to do
    let status = h.services.dailies.status(user, at(3, 18), 0).await.unwrap();
    assert!(!status.reset_applied);

    // Two days skipped: every streak restarts
    let status = h.services.dailies.status(user, at(5, 9), 0).await.unwrap();
    assert!(status.reset_applied);
    assert_eq!(status.tasks[0].streak, 0);
}

#[tokio::test]
async fn test_never_reset_policy_keeps_streaks() {
    let settings = ServiceSettings {
        streak_policy: StreakPolicy::NeverReset,
        ..ServiceSettings::default()
    };
    let h = harness_with(ScriptedGenerator::failing(), settings);
    let user = Uuid::new_v4();
    let task = h
        .services
        .dailies
        .create_task(user, "Journal", None, None)
        .await
        .unwrap();
    h.services
        .dailies
        .complete_task(user, task.id, at(2, 9), 0)
        .await
        .unwrap();

    let status = h.services.dailies.status(user, at(9, 9), 0).await.unwrap();
    assert_eq!(status.tasks[0].streak, 1);
}

#[tokio::test]
async fn test_reset_follows_local_midnight() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();
    let task = h
        .services
        .dailies
        .create_task(user, "Stretch", None, None)
        .await
        .unwrap();
    // 22:00 UTC on the 2nd is already the 3rd at UTC+3
    h.services
        .dailies
        .complete_task(user, task.id, at(2, 20), 180)
        .await
        .unwrap();
    let status = h.services.dailies.status(user, at(2, 22), 180).await.unwrap();
    assert!(status.reset_applied);
    assert!(!status.tasks[0].completed);
}

#[tokio::test]
async fn test_double_claim_conflicts() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();

    let first = h.services.dailies.claim_reward(user, at(2, 8), 0).await.unwrap();
    assert_eq!(first.previous_streak, 0);
    assert_eq!(first.current_streak, 1);

    let err = h
        .services
        .dailies
        .claim_reward(user, at(2, 20), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(err.status(), 409);
}

#[tokio::test]
async fn test_consecutive_claims_grow_reward() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();
    let now = at(10, 12);
    h.store.put_reward(
        user,
        RewardState {
            last_claimed_at: Some(now - Duration::days(1)),
            current_streak: 3,
        },
    );

    let claim = h.services.dailies.claim_reward(user, now, 0).await.unwrap();
    assert_eq!(claim.previous_streak, 3);
    assert_eq!(claim.current_streak, 4);
    assert_eq!(claim.experience.outcome.experience_gained, 150);
    let stats = h.services.progression.get_or_create(user).await.unwrap();
    assert_eq!(stats.streak_days, 1);
    assert_eq!(stats.experience, 150);
}

#[tokio::test]
async fn test_missed_day_restarts_reward_streak() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();
    let now = at(10, 12);
    h.store.put_reward(
        user,
        RewardState {
            last_claimed_at: Some(now - Duration::days(3)),
            current_streak: 7,
        },
    );

    let claim = h.services.dailies.claim_reward(user, now, 0).await.unwrap();
    assert_eq!(claim.previous_streak, 0);
    assert_eq!(claim.current_streak, 1);
    assert_eq!(claim.experience.outcome.experience_gained, 0);
}

#[tokio::test]
async fn test_concurrent_claim_is_turned_away() {
    let h = harness(ScriptedGenerator::failing());
    let user = Uuid::new_v4();

    let ticket = h.ctx.inflight.try_acquire(user, Operation::ClaimReward).unwrap();
    let err = h
        .services
        .dailies
        .claim_reward(user, at(2, 8), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InProgress));
    assert_eq!(err.status(), 409);

    drop(ticket);
    assert_eq!(h.ctx.inflight.active_count(), 0);
    h.services.dailies.claim_reward(user, at(2, 8), 0).await.unwrap();
}

#[tokio::test]
async fn test_failed_grant_leaves_reward_claimable() {
    let (broken, healthy) = broken_and_healthy();
    let user = Uuid::new_v4();
    let now = at(10, 12);
    let previous = RewardState {
        last_claimed_at: Some(now - Duration::days(1)),
        current_streak: 3,
    };
    broken.store.put_reward(user, previous);

    let err = broken
        .services
        .dailies
        .claim_reward(user, now, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream(StoreError::Corrupt(_))));
    assert_eq!(DailyRewardRepo::get_or_create(&broken.store, user).await.unwrap(), previous);

    let claim = healthy.services.dailies.claim_reward(user, now, 0).await.unwrap();
    assert_eq!(claim.previous_streak, 3);
    assert_eq!(claim.experience.outcome.experience_gained, 150);
    assert_eq!(claim.experience.stats.streak_days, 1);
}

#[tokio::test]
async fn test_failed_grant_leaves_task_open() {
    let (broken, healthy) = broken_and_healthy();
    let user = Uuid::new_v4();
    let task = broken
        .services
        .dailies
        .create_task(user, "Read a chapter", None, Some(40))
        .await
        .unwrap();

    let err = broken
        .services
        .dailies
        .complete_task(user, task.id, at(2, 9), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream(_)));
    let reopened = TaskRepo::get(&broken.store, user, task.id).await.unwrap().unwrap();
    assert!(!reopened.completed);
    assert_eq!(reopened.streak, 0);
    assert_eq!(reopened.last_completed, None);
    let stats = healthy.services.progression.get_or_create(user).await.unwrap();
    assert_eq!(stats.tasks_completed, 0);

    let done = healthy
        .services
        .dailies
        .complete_task(user, task.id, at(2, 10), 0)
        .await
        .unwrap();
    assert_eq!(done.task.streak, 1);
    assert_eq!(done.experience.stats.experience, 40);
    assert_eq!(done.experience.stats.tasks_completed, 1);
}

#[tokio::test]
async fn test_complete_unknown_task() {
    let h = harness(ScriptedGenerator::failing());
    let err = h
        .services
        .dailies
        .complete_task(Uuid::new_v4(), Uuid::new_v4(), at(2, 8), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

// ============================================================================
// Skills
// ============================================================================

#[tokio::test]
async fn test_skill_over_budget_needs_adjustment() {
    let h = harness(ScriptedGenerator::always(evaluation_reply(true, 4, Some(2))));
    let user = Uuid::new_v4();
    h.store.put_stats(
        user,
        CharacterStats {
            skill_points: 2,
            ..CharacterStats::default()
        },
    );

    let outcome = h
        .services
        .skills
        .propose(user, "Rust Borrowck Mastery", "Never fight the borrow checker again")
        .await
        .unwrap();
    match &outcome.decision {
        SkillDecision::NeedsAdjustment {
            required_points,
            adjusted,
            ..
        } => {
            assert_eq!(*required_points, 4);
            assert_eq!(adjusted.as_ref().unwrap().required_points, 2);
        }
        other => panic!("expected needs_adjustment, got {}", other.outcome()),
    }
    assert_eq!(h.store.skill_count(user), 0);
    let stats = h.services.progression.get_or_create(user).await.unwrap();
    assert_eq!(stats.skill_points, 2);

    // Committing writes the weaker version and debits its cost
    let skill = h
        .services
        .skills
        .commit(user, outcome.proposal_id.unwrap())
        .await
        .unwrap();
    assert_eq!(skill.name, "Borrowck Basics");
    assert_eq!(skill.level, 1);
    let stats = h.services.progression.get_or_create(user).await.unwrap();
    assert_eq!(stats.skill_points, 0);
}

#[tokio::test]
async fn test_adjustment_without_alternative_is_not_committable() {
    let h = harness(ScriptedGenerator::always(evaluation_reply(true, 5, None)));
    let user = Uuid::new_v4();
    let outcome = h
        .services
        .skills
        .propose(user, "Time Travel", "Finish tasks before starting them")
        .await
        .unwrap();
    assert_eq!(outcome.decision.outcome(), "needs_adjustment");
    assert!(outcome.proposal_id.is_none());
}

#[tokio::test]
async fn test_rejected_skill() {
    let h = harness(ScriptedGenerator::always(evaluation_reply(false, 1, None)));
    let outcome = h
        .services
        .skills
        .propose(Uuid::new_v4(), "Napping", "Sleep through meetings")
        .await
        .unwrap();
    assert_eq!(outcome.decision.outcome(), "rejected");
    assert!(outcome.proposal_id.is_none());
}

#[tokio::test]
async fn test_duplicate_skill_name_debits_nothing() {
    let h = harness(ScriptedGenerator::always(evaluation_reply(true, 1, None)));
    let user = Uuid::new_v4();
    h.store.put_stats(
        user,
        CharacterStats {
            skill_points: 3,
            ..CharacterStats::default()
        },
    );

    let first = h.services.skills.propose(user, "Touch Typing", "80 wpm").await.unwrap();
    let second = h.services.skills.propose(user, "Touch Typing", "80 wpm").await.unwrap();
    h.services
        .skills
        .commit(user, first.proposal_id.unwrap())
        .await
        .unwrap();

    let err = h
        .services
        .skills
        .commit(user, second.proposal_id.unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upstream(StoreError::Constraint(_))));
    assert_eq!(err.status(), 409);

    let stats = h.services.progression.get_or_create(user).await.unwrap();
    assert_eq!(stats.skill_points, 2);
    assert_eq!(h.services.skills.list(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_commit_after_points_spent_elsewhere() {
    let h = harness(ScriptedGenerator::always(evaluation_reply(true, 2, None)));
    let user = Uuid::new_v4();
    h.store.put_stats(
        user,
        CharacterStats {
            skill_points: 2,
            ..CharacterStats::default()
        },
    );
    let outcome = h
        .services
        .skills
        .propose(user, "Code Review", "Review one PR daily")
        .await
        .unwrap();
    h.store.put_stats(user, CharacterStats::default());

    let err = h
        .services
        .skills
        .commit(user, outcome.proposal_id.unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientPoints { have: 0, need: 2 }));
    assert_eq!(h.store.skill_count(user), 0);
}

#[tokio::test]
async fn test_unusable_evaluation_fails() {
    let h = harness(ScriptedGenerator::always("I cannot evaluate that."));
    let err = h
        .services
        .skills
        .propose(Uuid::new_v4(), "Focus", "Deep work blocks")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Evaluation(_)));
    assert_eq!(err.status(), 502);
}
