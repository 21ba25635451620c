//! Courier configuration loading
//!
//! Secrets and identifiers come from environment variables; non-secret knobs
//! may come from an optional ~/.config/notion-courier/config.yaml. The
//! environment wins wherever both supply a value.

use super::validation;
use crate::labels::{FieldMappings, StatusTransition};
use crate::{CourierError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_NOTION_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_NOTION_DATABASE_ID: &str = "NOTION_DATABASE_ID";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_OWNER: &str = "GITHUB_OWNER";
pub const ENV_GITHUB_REPO: &str = "GITHUB_REPO";
pub const ENV_GITHUB_PROJECT_ID: &str = "GITHUB_PROJECT_ID";
pub const ENV_PROJECT_CREATE_DRAFT: &str = "GITHUB_PROJECT_CREATE_DRAFT";
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECONDS";
pub const ENV_DRY_RUN: &str = "DRY_RUN";

/// Poll interval used when neither the environment nor the file sets one
const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;

fn default_trigger_status() -> String {
    "Validated".to_string()
}

fn default_synced_status() -> String {
    "Backlog".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Non-secret settings accepted from the YAML file
///
/// Every field is optional; anything absent falls back to the built-in
/// default. Credentials are deliberately not accepted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSettings {
    /// Seconds between poll cycles
    pub poll_interval_seconds: Option<u64>,

    /// Compute drafts but make no outbound writes
    pub dry_run: Option<bool>,

    /// Status value that makes a page eligible
    pub trigger_status: Option<String>,

    /// Status value written back after a successful sync
    pub synced_status: Option<String>,

    /// Location of the sync ledger database
    pub ledger_path: Option<PathBuf>,

    /// Bind address for the health endpoints
    pub listen_addr: Option<String>,

    /// Project board single-select option tables
    pub field_mappings: Option<FieldMappings>,
}

impl FileSettings {
    /// Load the settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        tracing::info!(path = %path.display(), "Loading courier settings file");

        let content = fs::read_to_string(path)?;
        let settings: Self = serde_yaml::from_str(&content)?;

        Ok(settings)
    }
}

/// Complete courier configuration
///
/// Read once at startup and validated before the poll loop starts. There is
/// no hot reload; operators restart the process to pick up changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CourierConfig {
    /// Notion integration token
    pub notion_token: String,

    /// Id of the database to poll
    pub notion_database_id: String,

    /// GitHub token with repo (and project, when configured) scope
    pub github_token: String,

    /// Owner of the target repository
    pub github_owner: String,

    /// Target repository name, without the owner prefix
    pub github_repo: String,

    /// ProjectV2 node id; board placement is skipped when unset
    pub github_project_id: Option<String>,

    /// Create ProjectV2 draft items instead of repository issues
    pub project_create_draft: bool,

    /// Time between poll cycles
    pub poll_interval: Duration,

    /// Compute drafts but make no outbound writes
    pub dry_run: bool,

    /// Status transition that drives the sync
    pub transition: StatusTransition,

    /// Location of the sync ledger database
    pub ledger_path: PathBuf,

    /// Bind address for the health endpoints
    pub listen_addr: String,

    /// Project board single-select option tables
    pub field_mappings: FieldMappings,
}

impl CourierConfig {
    /// Load from the process environment, reading the default settings file
    /// when it exists
    pub fn from_env() -> Result<Self> {
        let default_path = Self::default_file_path();
        let file = default_path.exists().then_some(default_path);
        Self::load(|key| std::env::var(key).ok(), file.as_deref())
    }

    /// Load from the process environment plus an explicit settings file
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CourierError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        Self::load(|key| std::env::var(key).ok(), Some(path))
    }

    /// Assemble a configuration from an environment lookup and an optional
    /// settings file. Taking the lookup as a closure keeps loading testable
    /// without mutating the process environment.
    pub fn load<F>(lookup: F, file: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = match file {
            Some(path) => FileSettings::load(path)?,
            None => FileSettings::default(),
        };

        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(CourierError::Config(format!(
                    "required environment variable {} is not set",
                    key
                ))),
            }
        };

        let poll_secs = match lookup(ENV_POLL_INTERVAL) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CourierError::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_POLL_INTERVAL, raw
                ))
            })?,
            None => settings
                .poll_interval_seconds
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        };

        let dry_run = match lookup(ENV_DRY_RUN) {
            Some(raw) => bool_flag(&raw),
            None => settings.dry_run.unwrap_or(false),
        };

        let project_create_draft = lookup(ENV_PROJECT_CREATE_DRAFT)
            .map(|raw| bool_flag(&raw))
            .unwrap_or(false);

        let github_project_id =
            lookup(ENV_GITHUB_PROJECT_ID).filter(|value| !value.trim().is_empty());

        let transition = StatusTransition::new(
            settings
                .trigger_status
                .clone()
                .unwrap_or_else(default_trigger_status),
            settings
                .synced_status
                .clone()
                .unwrap_or_else(default_synced_status),
        );

        let config = Self {
            notion_token: required(ENV_NOTION_TOKEN)?,
            notion_database_id: required(ENV_NOTION_DATABASE_ID)?,
            github_token: required(ENV_GITHUB_TOKEN)?,
            github_owner: required(ENV_GITHUB_OWNER)?,
            github_repo: required(ENV_GITHUB_REPO)?,
            github_project_id,
            project_create_draft,
            poll_interval: Duration::from_secs(poll_secs),
            dry_run,
            transition,
            ledger_path: settings
                .ledger_path
                .clone()
                .unwrap_or_else(Self::default_ledger_path),
            listen_addr: settings
                .listen_addr
                .clone()
                .unwrap_or_else(default_listen_addr),
            field_mappings: settings.field_mappings.clone().unwrap_or_default(),
        };

        validation::validate_config_result(&config)?;

        tracing::debug!(
            repo = %config.repo_slug(),
            poll_interval_secs = config.poll_interval.as_secs(),
            dry_run = config.dry_run,
            project_configured = config.github_project_id.is_some(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Get the default settings file path (~/.config/notion-courier/config.yaml)
    pub fn default_file_path() -> PathBuf {
        // Always use ~/.config for consistency across platforms (macOS, Linux)
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("notion-courier");
        path.push("config.yaml");
        path
    }

    /// Get the default ledger path (~/.config/notion-courier/ledger.db)
    pub fn default_ledger_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("notion-courier");
        path.push("ledger.db");
        path
    }

    /// The owner/name slug of the target repository
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.github_owner, self.github_repo)
    }
}

/// Parse a boolean the way deploy environments write them: "true", "1" and
/// "yes" (any case) are true, everything else is false.
fn bool_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn base_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("NOTION_TOKEN", "secret_notion"),
            ("NOTION_DATABASE_ID", "db-123"),
            ("GITHUB_TOKEN", "ghp_test"),
            ("GITHUB_OWNER", "acme"),
            ("GITHUB_REPO", "tracker"),
        ]
    }

    fn lookup_of(pairs: Vec<(&'static str, &'static str)>) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_load_with_defaults() {
        let config = CourierConfig::load(lookup_of(base_env()), None).unwrap();

        assert_eq!(config.notion_token, "secret_notion");
        assert_eq!(config.repo_slug(), "acme/tracker");
        assert_eq!(config.poll_interval, Duration::from_secs(120));
        assert!(!config.dry_run);
        assert!(!config.project_create_draft);
        assert!(config.github_project_id.is_none());
        assert_eq!(config.transition.trigger(), "Validated");
        assert_eq!(config.transition.next(), "Backlog");
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_required_variable_fails() {
        let mut env = base_env();
        env.retain(|(name, _)| *name != "NOTION_TOKEN");

        let result = CourierConfig::load(lookup_of(env), None);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("NOTION_TOKEN"));
    }

    #[test]
    fn test_blank_required_variable_fails() {
        let mut env = base_env();
        env.push(("GITHUB_OWNER", "   "));
        env.retain(|(name, value)| !(*name == "GITHUB_OWNER" && *value == "acme"));

        let result = CourierConfig::load(lookup_of(env), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_poll_interval_fails() {
        let mut env = base_env();
        env.push(("POLL_INTERVAL_SECONDS", "soon"));

        let result = CourierConfig::load(lookup_of(env), None);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL_SECONDS"));
    }

    #[test]
    fn test_bool_flags() {
        let mut env = base_env();
        env.push(("DRY_RUN", "TRUE"));
        env.push(("GITHUB_PROJECT_CREATE_DRAFT", "1"));
        env.push(("GITHUB_PROJECT_ID", "PVT_abc"));

        let config = CourierConfig::load(lookup_of(env), None).unwrap();
        assert!(config.dry_run);
        assert!(config.project_create_draft);
        assert_eq!(config.github_project_id.as_deref(), Some("PVT_abc"));
    }

    #[test]
    fn test_file_supplies_non_secret_settings() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "poll_interval_seconds: 30\ndry_run: true\ntrigger_status: Ready\nsynced_status: Queued\nledger_path: custom/ledger.db"
        )
        .unwrap();

        let config = CourierConfig::load(lookup_of(base_env()), Some(file.path())).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert!(config.dry_run);
        assert_eq!(config.transition.trigger(), "Ready");
        assert_eq!(config.transition.next(), "Queued");
        assert_eq!(config.ledger_path, PathBuf::from("custom/ledger.db"));
    }

    #[test]
    fn test_environment_wins_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "poll_interval_seconds: 30\ndry_run: true").unwrap();

        let mut env = base_env();
        env.push(("POLL_INTERVAL_SECONDS", "45"));
        env.push(("DRY_RUN", "false"));

        let config = CourierConfig::load(lookup_of(env), Some(file.path())).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(45));
        assert!(!config.dry_run);
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let result = CourierConfig::from_env_and_file("/nonexistent/config.yaml");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_bool_flag_parsing() {
        assert!(bool_flag("true"));
        assert!(bool_flag("TRUE"));
        assert!(bool_flag("1"));
        assert!(bool_flag("yes"));
        assert!(!bool_flag("false"));
        assert!(!bool_flag("0"));
        assert!(!bool_flag(""));
        assert!(!bool_flag("enabled"));
    }
}
