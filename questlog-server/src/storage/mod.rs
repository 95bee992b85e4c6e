//! Storage Layer - Unified data access for Questlog
//!
//! Implements the Repository pattern with two interchangeable backends:
//! - **PostgreSQL**: production persistence for every user-owned record
//! - **Memory**: single-process store for local runs and tests
//!
//! ## Architecture
//! ```text
//! [Services]
//!       ↓
//! [Repository Traits]
//!       ↓
//! ┌─────────────────┬──────────────┐
//! │ PostgresStore   │ MemoryStore  │
//! │ + RepoAdapters  │              │
//! └─────────────────┴──────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let storage = init_postgres_storage("postgres://...", 10).await?;
//! let stats = storage.stats.create_default(user_id).await?;
//! ```

pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod postgres_repo_adapter;
pub mod repository;

use std::sync::Arc;
use tracing::info;

use self::memory::MemoryStore;
use self::postgres::PostgresStore;
use self::postgres_repo_adapter::*;
use self::repository::StorageManager;
use crate::error::StoreError;

/// Connect to PostgreSQL, run migrations and wire every repository adapter
pub async fn init_postgres_storage(
    postgres_url: &str,
    pg_max_connections: u32,
) -> Result<StorageManager, StoreError> {
    let pg = Arc::new(PostgresStore::new(postgres_url, pg_max_connections).await?);
    info!("PostgreSQL player store initialized");
    Ok(postgres_storage(pg))
}

/// Wire adapters around an already connected store
pub fn postgres_storage(pg: Arc<PostgresStore>) -> StorageManager {
    StorageManager {
        backend: "postgres",
        stats: Box::new(PgStatsRepo::new(pg.clone())),
        tasks: Box::new(PgTaskRepo::new(pg.clone())),
        resets: Box::new(PgDailyResetRepo::new(pg.clone())),
        rewards: Box::new(PgDailyRewardRepo::new(pg.clone())),
        skills: Box::new(PgSkillRepo::new(pg.clone())),
        profiles: Box::new(PgProfileRepo::new(pg.clone())),
        calendar: Box::new(PgCalendarRepo::new(pg)),
    }
}

/// Storage backed by one shared [`MemoryStore`]
pub fn init_memory_storage(store: MemoryStore) -> StorageManager {
    info!("In-memory store initialized");
    StorageManager {
        backend: "memory",
        stats: Box::new(store.clone()),
        tasks: Box::new(store.clone()),
        resets: Box::new(store.clone()),
        rewards: Box::new(store.clone()),
        skills: Box::new(store.clone()),
        profiles: Box::new(store.clone()),
        calendar: Box::new(store),
    }
}
