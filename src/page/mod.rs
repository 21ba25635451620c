//! Page domain types
//!
//! Typed values for everything that crosses the sync core: the source page
//! snapshot pulled from Notion, the issue draft handed to GitHub, and the
//! skip/created outcomes in between. The raw Notion property bag is folded
//! into `SourcePage` by a validating adapter here, so the rest of the crate
//! never touches property JSON.

mod blocks;

pub use blocks::{parse_block, plain_text, Block, BlockKind, ParsedBlock};

use serde_json::Value;
use std::fmt;

/// Notion property names this sync reads. Fixed schema, matching the
/// product database; only property values are configurable.
pub const PROP_STATUS: &str = "Status";
pub const PROP_COMPANY: &str = "Company";
pub const PROP_CUSTOMER_TYPE: &str = "Customer Type";
pub const PROP_PRIORITY: &str = "Priority";
pub const PROP_SIZE: &str = "Size";
pub const PROP_IN_SYNC: &str = "In Sync With Github";

/// Snapshot of one Notion page's sync-relevant fields
///
/// Constructed from a database-query result object. Fields that are absent
/// or of an unexpected type come through as `None`/empty rather than
/// failing; `validate` decides whether the page can be synced at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePage {
    /// Notion page id (UUID)
    pub id: String,

    /// Page title, empty when the title property is missing or blank
    pub title: String,

    /// Status select value, e.g. "Validated"
    pub status: Option<String>,

    /// The "In Sync With Github" checkbox
    pub in_sync: bool,

    /// Priority select value, e.g. "High"
    pub priority: Option<String>,

    /// Size select value, e.g. "M"
    pub size: Option<String>,

    /// Customer Type multi-select values, document order
    pub customer_types: Vec<String>,

    /// Company rich-text value
    pub company: Option<String>,

    /// Web URL of the page, when the API provided one
    pub url: Option<String>,
}

impl SourcePage {
    /// Build a page snapshot from a Notion page object (as returned by a
    /// database query). Fails only when the object carries no id; every
    /// property problem is deferred to `validate`.
    pub fn from_page_object(value: &Value) -> crate::Result<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| crate::CourierError::Parse("page object has no id".to_string()))?
            .to_string();

        let url = value
            .get("url")
            .and_then(Value::as_str)
            .map(|s| s.to_string());

        let empty = Value::Object(Default::default());
        let props = value.get("properties").unwrap_or(&empty);

        Ok(Self {
            id,
            title: title_text(props),
            status: select_name(props, PROP_STATUS),
            in_sync: checkbox_value(props, PROP_IN_SYNC),
            priority: select_name(props, PROP_PRIORITY),
            size: select_name(props, PROP_SIZE),
            customer_types: multi_select_names(props, PROP_CUSTOMER_TYPE),
            company: rich_text_value(props, PROP_COMPANY),
            url,
        })
    }

    /// Check the invariants a page must satisfy before conversion proceeds
    pub fn validate(&self) -> Result<(), SkipReason> {
        if self.title.trim().is_empty() {
            return Err(SkipReason::MissingTitle);
        }
        if self.status.is_none() {
            return Err(SkipReason::MissingStatus);
        }
        Ok(())
    }
}

/// Why a page was not synced this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Title property missing or blank
    MissingTitle,
    /// Status property missing
    MissingStatus,
    /// Status present but not the trigger value
    NotEligible { status: String },
    /// In-sync flag already set
    AlreadySynced,
}

impl SkipReason {
    /// Stable label for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingTitle => "missing_title",
            SkipReason::MissingStatus => "missing_status",
            SkipReason::NotEligible { .. } => "not_eligible",
            SkipReason::AlreadySynced => "already_synced",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTitle => write!(f, "page has no title"),
            SkipReason::MissingStatus => write!(f, "page has no status property"),
            SkipReason::NotEligible { status } => {
                write!(f, "status '{}' does not trigger a sync", status)
            }
            SkipReason::AlreadySynced => write!(f, "page is already marked in sync"),
        }
    }
}

/// Project board placement for a created issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTarget {
    /// ProjectV2 node id
    pub project_id: String,

    /// Status single-select option to set, e.g. "Backlog"
    pub status_option: String,

    /// Priority single-select option, already mapped (e.g. "P1")
    pub priority_option: Option<String>,

    /// Size single-select option, already mapped (e.g. "M")
    pub size_option: Option<String>,
}

/// Everything needed for one outbound issue creation
///
/// Built fresh per page per cycle and discarded once the outbound call
/// succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,

    /// Markdown body composed from the converted block tree
    pub body: String,

    /// Labels in assembly order (customer types, priority, size, sentinel)
    pub labels: Vec<String>,

    /// Board placement, when a project is configured
    pub project: Option<ProjectTarget>,
}

/// Reference to the record created on the GitHub side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueRef {
    /// A real repository issue
    Issue { number: u64 },
    /// A ProjectV2 draft item (draft mode)
    DraftItem { item_id: String },
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueRef::Issue { number } => write!(f, "#{}", number),
            IssueRef::DraftItem { item_id } => write!(f, "draft:{}", item_id),
        }
    }
}

/// A created repository issue, as returned by the REST API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIssue {
    pub number: u64,

    /// GraphQL node id, needed to attach the issue to a project
    pub node_id: String,

    pub html_url: String,
}

// Property extraction helpers. Notion properties are a name-keyed bag of
// typed objects; each helper tolerates absence and wrong types by returning
// the neutral value.

/// Concatenate the plain text of the page's title property, whichever
/// property slot carries it (the title property's name varies per database).
fn title_text(props: &Value) -> String {
    if let Some(map) = props.as_object() {
        for prop in map.values() {
            if prop.get("type").and_then(Value::as_str) == Some("title") {
                if let Some(rich) = prop.get("title") {
                    return plain_text(rich);
                }
            }
        }
    }
    String::new()
}

fn select_name(props: &Value, name: &str) -> Option<String> {
    props
        .get(name)?
        .get("select")?
        .get("name")?
        .as_str()
        .map(|s| s.to_string())
}

fn rich_text_value(props: &Value, name: &str) -> Option<String> {
    let rich = props.get(name)?.get("rich_text")?;
    let text = plain_text(rich);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn multi_select_names(props: &Value, name: &str) -> Vec<String> {
    props
        .get(name)
        .and_then(|p| p.get("multi_select"))
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn checkbox_value(props: &Value, name: &str) -> bool {
    props
        .get(name)
        .and_then(|p| p.get("checkbox"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page_object() -> Value {
        json!({
            "id": "page-123",
            "url": "https://www.notion.so/page-123",
            "properties": {
                "Name": {
                    "type": "title",
                    "title": [
                        {"plain_text": "Ship the "},
                        {"plain_text": "importer"}
                    ]
                },
                "Status": {"type": "select", "select": {"name": "Validated"}},
                "Priority": {"type": "select", "select": {"name": "High"}},
                "Size": {"type": "select", "select": {"name": "M"}},
                "Company": {
                    "type": "rich_text",
                    "rich_text": [{"plain_text": "Acme Corp"}]
                },
                "Customer Type": {
                    "type": "multi_select",
                    "multi_select": [{"name": "Type A"}, {"name": "Type B"}]
                },
                "In Sync With Github": {"type": "checkbox", "checkbox": false}
            }
        })
    }

    #[test]
    fn test_page_from_object() {
        let page = SourcePage::from_page_object(&page_object()).unwrap();

        assert_eq!(page.id, "page-123");
        assert_eq!(page.title, "Ship the importer");
        assert_eq!(page.status.as_deref(), Some("Validated"));
        assert_eq!(page.priority.as_deref(), Some("High"));
        assert_eq!(page.size.as_deref(), Some("M"));
        assert_eq!(page.company.as_deref(), Some("Acme Corp"));
        assert_eq!(page.customer_types, vec!["Type A", "Type B"]);
        assert!(!page.in_sync);
        assert_eq!(page.url.as_deref(), Some("https://www.notion.so/page-123"));
    }

    #[test]
    fn test_page_without_id_is_parse_error() {
        let result = SourcePage::from_page_object(&json!({"properties": {}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_properties_become_neutral_values() {
        let page = SourcePage::from_page_object(&json!({"id": "bare"})).unwrap();

        assert_eq!(page.title, "");
        assert!(page.status.is_none());
        assert!(page.priority.is_none());
        assert!(page.size.is_none());
        assert!(page.company.is_none());
        assert!(page.customer_types.is_empty());
        assert!(!page.in_sync);
    }

    #[test]
    fn test_wrong_property_types_are_tolerated() {
        let page = SourcePage::from_page_object(&json!({
            "id": "odd",
            "properties": {
                "Status": {"type": "rich_text", "rich_text": []},
                "Customer Type": {"type": "select", "select": {"name": "x"}},
                "In Sync With Github": {"type": "number", "number": 3}
            }
        }))
        .unwrap();

        assert!(page.status.is_none());
        assert!(page.customer_types.is_empty());
        assert!(!page.in_sync);
    }

    #[test]
    fn test_validate_requires_title() {
        let mut page = SourcePage::from_page_object(&page_object()).unwrap();
        page.title = "   ".to_string();

        assert_eq!(page.validate(), Err(SkipReason::MissingTitle));
    }

    #[test]
    fn test_validate_requires_status() {
        let mut page = SourcePage::from_page_object(&page_object()).unwrap();
        page.status = None;

        assert_eq!(page.validate(), Err(SkipReason::MissingStatus));
    }

    #[test]
    fn test_validate_accepts_complete_page() {
        let page = SourcePage::from_page_object(&page_object()).unwrap();
        assert!(page.validate().is_ok());
    }

    #[test]
    fn test_issue_ref_display() {
        assert_eq!(IssueRef::Issue { number: 42 }.to_string(), "#42");
        assert_eq!(
            IssueRef::DraftItem {
                item_id: "PVTI_abc".to_string()
            }
            .to_string(),
            "draft:PVTI_abc"
        );
    }

    #[test]
    fn test_skip_reason_labels() {
        assert_eq!(SkipReason::MissingTitle.as_str(), "missing_title");
        assert_eq!(
            SkipReason::NotEligible {
                status: "Draft".to_string()
            }
            .as_str(),
            "not_eligible"
        );
    }
}
