//! Questlog Server Library
//!
//! The async half of questlog: everything that touches storage, the text
//! generator or the network.
//! - Repository ports with PostgreSQL and in-memory adapters
//! - Text generation port with a Gemini client
//! - Services wrapping the `questlog_core` rules in storage and concurrency control
//! - Axum HTTP API, request metrics and a level-up event stream

pub mod ai; // Text generation port + Gemini adapter
pub mod api; // HTTP/JSON endpoints
pub mod config; // Environment configuration
pub mod error; // Error taxonomy and HTTP mapping
pub mod events; // Level-up broadcast
pub mod inflight; // Per-user in-flight guard
pub mod metrics; // Server metrics (Prometheus + JSON export)
pub mod pending; // Pending quest offers and skill proposals
pub mod services; // Business flows over storage + generator
pub mod storage; // Repository traits, PostgreSQL and memory backends

// Re-export commonly used types
pub use api::{build_router, build_state, ApiState};
pub use config::ServerConfig;
pub use error::{GenerationError, ServiceError, StoreError};
pub use storage::memory::MemoryStore;
pub use storage::postgres::PostgresStore;
