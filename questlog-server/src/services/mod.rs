//! Service layer
//!
//! Each service wraps the pure rules from `questlog_core` in storage calls,
//! concurrency control and logging. Services receive every collaborator
//! through [`AppContext`]; nothing here reaches for globals.

pub mod calendar;
pub mod dailies;
pub mod profile;
pub mod progression;
pub mod quests;
pub mod skills;

use std::sync::Arc;

use crate::ai::TextGenerator;
use crate::config::ServiceSettings;
use crate::events::EventBus;
use crate::inflight::InFlight;
use crate::metrics::ServerMetrics;
use crate::storage::repository::StorageManager;

pub use calendar::CalendarService;
pub use dailies::DailyService;
pub use profile::ProfileService;
pub use progression::ProgressionService;
pub use quests::QuestService;
pub use skills::SkillService;

/// Collaborators shared by every service
pub struct AppContext {
    pub storage: StorageManager,
    pub generator: Arc<dyn TextGenerator>,
    pub events: EventBus,
    pub inflight: Arc<InFlight>,
    pub metrics: Arc<ServerMetrics>,
    pub settings: ServiceSettings,
}

pub struct Services {
    pub progression: ProgressionService,
    pub quests: QuestService,
    pub dailies: DailyService,
    pub skills: SkillService,
    pub profile: ProfileService,
    pub calendar: CalendarService,
}

impl Services {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let progression = ProgressionService::new(ctx.clone());
        Self {
            quests: QuestService::new(ctx.clone(), progression.clone()),
            dailies: DailyService::new(ctx.clone(), progression.clone()),
            skills: SkillService::new(ctx.clone(), progression.clone()),
            profile: ProfileService::new(ctx.clone()),
            calendar: CalendarService::new(ctx),
            progression,
        }
    }
}
