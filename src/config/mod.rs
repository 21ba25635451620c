//! Configuration system
//!
//! Environment-first flat configuration, read once at startup.
//!
//! Secrets and identifiers come from environment variables (NOTION_TOKEN,
//! NOTION_DATABASE_ID, GITHUB_TOKEN, GITHUB_OWNER, GITHUB_REPO, ...);
//! non-secret knobs may come from ~/.config/notion-courier/config.yaml:
//! - Poll interval and dry-run default
//! - Status transition values
//! - Ledger path and health bind address
//! - Project board option tables
//!
//! A missing required variable stops the process before the poll loop starts.

mod courier_config;
pub mod validation;

pub use courier_config::{
    CourierConfig, FileSettings, ENV_DRY_RUN, ENV_GITHUB_OWNER, ENV_GITHUB_PROJECT_ID,
    ENV_GITHUB_REPO, ENV_GITHUB_TOKEN, ENV_NOTION_DATABASE_ID, ENV_NOTION_TOKEN,
    ENV_POLL_INTERVAL, ENV_PROJECT_CREATE_DRAFT,
};
pub use validation::{validate_config, validate_config_result, ValidationError};
