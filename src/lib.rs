//! notion-courier - Notion to GitHub issue courier
//!
//! notion-courier watches a Notion database for pages whose Status reaches a
//! trigger value ("Validated" by default) and mirrors each one into a GitHub
//! issue: title, body rendered from the page's block tree, labels derived
//! from page properties, and optional ProjectV2 board placement. After a
//! successful sync the page's in-sync checkbox is flipped and its status
//! moves forward, so a page is mirrored exactly once.
//!
//! # Architecture
//!
//! - **page**: Source page model, block tree, issue draft shapes
//! - **markdown**: Notion block tree to GitHub-flavored markdown
//! - **labels**: Property-to-label mapping and the status transition
//! - **config**: Environment-first configuration with an optional YAML file
//! - **ledger**: SQLite record of page-to-issue mappings
//! - **integrations**: Notion and GitHub API adapters behind trait seams
//! - **courier**: The sync engine, poll daemon, and Prometheus metrics
//! - **server**: Health and metrics HTTP endpoints

// Core modules
pub mod config;
pub mod error;
pub mod labels;
pub mod ledger;
pub mod logging;
pub mod markdown;
pub mod page;

// Components
pub mod courier;
pub mod integrations;
pub mod server;

// Re-exports
pub use error::{CourierError, Result};
