//! Configuration validation
//!
//! Validates courier configuration before the poll loop starts:
//! - Required credentials and identifiers are present
//! - Poll interval and bind address are usable
//! - Draft mode is only enabled alongside a project id
//! - The status transition actually moves pages somewhere

use super::courier_config::CourierConfig;
use crate::CourierError;
use std::net::SocketAddr;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a courier configuration
pub fn validate_config(config: &CourierConfig) -> ValidationResult {
    let mut errors = Vec::new();

    let required = [
        ("notion_token", &config.notion_token),
        ("notion_database_id", &config.notion_database_id),
        ("github_token", &config.github_token),
        ("github_owner", &config.github_owner),
        ("github_repo", &config.github_repo),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "Value cannot be empty"));
        }
    }

    if config.github_repo.contains('/') {
        errors.push(ValidationError::new(
            "github_repo",
            "Repository name must not include the owner; set GITHUB_OWNER separately",
        ));
    }

    if config.poll_interval.as_secs() == 0 {
        errors.push(ValidationError::new(
            "poll_interval",
            "Poll interval must be at least 1 second",
        ));
    }

    if config.transition.trigger().trim().is_empty() {
        errors.push(ValidationError::new(
            "trigger_status",
            "Trigger status cannot be empty",
        ));
    }
    if config.transition.next().trim().is_empty() {
        errors.push(ValidationError::new(
            "synced_status",
            "Synced status cannot be empty",
        ));
    }
    if config.transition.trigger() == config.transition.next() {
        errors.push(ValidationError::new(
            "synced_status",
            "Synced status must differ from the trigger status",
        ));
    }

    if config.project_create_draft && config.github_project_id.is_none() {
        errors.push(ValidationError::new(
            "github_project_create_draft",
            "Draft mode requires GITHUB_PROJECT_ID to be set",
        ));
    }

    if config.listen_addr.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listen_addr",
            format!("Invalid bind address: {}", config.listen_addr),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &CourierConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        CourierError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::{FieldMappings, StatusTransition};
    use std::path::PathBuf;
    use std::time::Duration;

    fn valid_config() -> CourierConfig {
        CourierConfig {
            notion_token: "secret_notion".to_string(),
            notion_database_id: "db-123".to_string(),
            github_token: "ghp_test".to_string(),
            github_owner: "acme".to_string(),
            github_repo: "tracker".to_string(),
            github_project_id: None,
            project_create_draft: false,
            poll_interval: Duration::from_secs(120),
            dry_run: false,
            transition: StatusTransition::default(),
            ledger_path: PathBuf::from("ledger.db"),
            listen_addr: "0.0.0.0:8080".to_string(),
            field_mappings: FieldMappings::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_token_rejected() {
        let mut config = valid_config();
        config.github_token = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "github_token"));
    }

    #[test]
    fn test_owner_embedded_in_repo_rejected() {
        let mut config = valid_config();
        config.github_repo = "acme/tracker".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "github_repo"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = valid_config();
        config.poll_interval = Duration::from_secs(0);

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "poll_interval"));
    }

    #[test]
    fn test_identical_statuses_rejected() {
        let mut config = valid_config();
        config.transition = StatusTransition::new("Backlog", "Backlog");

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "synced_status"));
    }

    #[test]
    fn test_draft_mode_requires_project() {
        let mut config = valid_config();
        config.project_create_draft = true;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "github_project_create_draft"));

        config.github_project_id = Some("PVT_abc".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_listen_addr_rejected() {
        let mut config = valid_config();
        config.listen_addr = "not-an-address".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "listen_addr"));
    }

    #[test]
    fn test_validate_config_result_joins_messages() {
        let mut config = valid_config();
        config.notion_token = String::new();
        config.poll_interval = Duration::from_secs(0);

        let err = validate_config_result(&config).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("notion_token"));
        assert!(text.contains("poll_interval"));
    }
}
