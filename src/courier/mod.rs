//! Courier daemon
//!
//! Background synchronization daemon with event loop.
//! Mirrors eligible Notion pages into GitHub issues on a fixed poll
//! interval.
//!
//! # Architecture
//!
//! The courier is a long-running background process built from two layers:
//! the engine, which knows how to sync one batch of pages, and the daemon,
//! which schedules engine cycles and handles shutdown.
//!
//! ## Cycle Phases
//!
//! 1. **Query Phase**: Fetch pages at the trigger status with the sync flag
//!    unset
//! 2. **Convert Phase**: Block tree to markdown, composed into the issue
//!    body template
//! 3. **Create Phase**: Repository issue (or draft project item), recorded
//!    in the local ledger
//! 4. **Persist Phase**: Board placement, then the source page's flag and
//!    status write-backs
//!
//! ## Communication
//!
//! - **Event Stream**: the daemon broadcasts lifecycle events (started,
//!   cycle completed, errors, stopped)
//! - **Command Channel**: external callers can trigger syncs or stop the
//!   daemon
//!
//! # Example
//!
//! ```ignore
//! use notion_courier::courier::{DaemonConfig, EngineConfig, SyncDaemon, SyncEngine};
//! use notion_courier::integrations::{GitHubAdapter, NotionAdapter};
//! use notion_courier::ledger::Ledger;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = notion_courier::config::CourierConfig::from_env()?;
//!
//!     let notion = NotionAdapter::new(&config.notion_token, &config.notion_database_id)?;
//!     let github = GitHubAdapter::new(&config.github_token, &config.github_owner, &config.github_repo)?;
//!     let ledger = Ledger::open(&config.ledger_path)?;
//!
//!     let engine = SyncEngine::new(notion, github, ledger, EngineConfig::from_config(&config));
//!     let mut daemon = SyncDaemon::new(engine, DaemonConfig::new(config.poll_interval));
//!
//!     daemon.run().await?;
//!     Ok(())
//! }
//! ```

pub mod daemon;
pub mod engine;
pub mod metrics;

pub use daemon::{
    CourierCommand, CourierEvent, DaemonConfig, SyncDaemon, DEFAULT_EVENT_CHANNEL_CAPACITY,
    DEFAULT_POLL_INTERVAL,
};
pub use engine::{compose_body, CycleReport, EngineConfig, PageOutcome, SyncEngine};
