//! Property mapping for outbound issues
//!
//! Turns Notion select values into GitHub labels and ProjectV2 single-select
//! options. Label assembly is pure string work with a fixed ordering; the
//! option tables are configuration data with recognized defaults, so boards
//! with different option names can remap without code changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel label applied to every synced issue, so synced issues can be
/// found (and bulk-edited) on the GitHub side later.
pub const SENTINEL_LABEL: &str = "notion-sync";

/// Assemble the label set for one issue.
///
/// Customer types pass through verbatim, then priority as
/// `priority-<value>` and size as `size-<value>` in lowercase, then the
/// sentinel label. Duplicates collapse with the first occurrence winning;
/// order is otherwise preserved.
pub fn assemble_labels(
    customer_types: &[String],
    priority: Option<&str>,
    size: Option<&str>,
) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(customer_types.len() + 3);

    for customer_type in customer_types {
        push_unique(&mut labels, customer_type.clone());
    }
    if let Some(priority) = priority {
        push_unique(&mut labels, format!("priority-{}", priority.to_lowercase()));
    }
    if let Some(size) = size {
        push_unique(&mut labels, format!("size-{}", size.to_lowercase()));
    }
    push_unique(&mut labels, SENTINEL_LABEL.to_string());

    labels
}

fn push_unique(labels: &mut Vec<String>, label: String) {
    if !labels.iter().any(|existing| *existing == label) {
        labels.push(label);
    }
}

/// The status move that drives a sync
///
/// Pages sitting at the trigger status are mirrored, then parked at the next
/// status so a page never re-enters the eligible set once handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    trigger: String,
    next: String,
}

impl Default for StatusTransition {
    fn default() -> Self {
        Self::new("Validated", "Backlog")
    }
}

impl StatusTransition {
    pub fn new(trigger: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            next: next.into(),
        }
    }

    /// Status value that makes a page eligible
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Status value written back after a successful sync
    pub fn next(&self) -> &str {
        &self.next
    }

    /// Whether a page's status matches the trigger
    pub fn matches(&self, status: Option<&str>) -> bool {
        status == Some(self.trigger.as_str())
    }
}

/// Single-select option tables for project board placement
///
/// Keys are Notion select names, values are the board's option names. A
/// value absent from its table passes through unchanged, so a board that
/// already shares the Notion vocabulary needs no entries at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMappings {
    #[serde(default = "default_priority_options")]
    pub priority: HashMap<String, String>,

    #[serde(default = "default_size_options")]
    pub size: HashMap<String, String>,
}

impl Default for FieldMappings {
    fn default() -> Self {
        Self {
            priority: default_priority_options(),
            size: default_size_options(),
        }
    }
}

/// Recognized priority values: Critical, High, Medium, Low
fn default_priority_options() -> HashMap<String, String> {
    [
        ("Critical", "P0"),
        ("High", "P1"),
        ("Medium", "P2"),
        ("Low", "P3"),
    ]
    .into_iter()
    .map(|(notion, board)| (notion.to_string(), board.to_string()))
    .collect()
}

/// Recognized size values map to themselves: XS, S, M, L, XL
fn default_size_options() -> HashMap<String, String> {
    ["XS", "S", "M", "L", "XL"]
        .into_iter()
        .map(|size| (size.to_string(), size.to_string()))
        .collect()
}

impl FieldMappings {
    /// Board option for a Notion priority value
    pub fn priority_option(&self, notion_value: &str) -> String {
        self.priority
            .get(notion_value)
            .cloned()
            .unwrap_or_else(|| notion_value.to_string())
    }

    /// Board option for a Notion size value
    pub fn size_option(&self, notion_value: &str) -> String {
        self.size
            .get(notion_value)
            .cloned()
            .unwrap_or_else(|| notion_value.to_string())
    }
}
