//! External Integrations
//!
//! Adapters for the Notion and GitHub APIs, plus the retry policy they share.
//!
//! # Overview
//!
//! The sync engine talks to the outside world through two seams: a
//! `PageStore` (where eligible pages come from and where sync state is
//! written back) and an `IssueTracker` (where issues land). Production wires
//! these to the Notion and GitHub adapters; tests substitute in-memory
//! fakes.
//!
//! # Sync Flow
//!
//! One poll cycle performs these phases per page:
//!
//! 1. **Query** (Notion): Pull pages at the trigger status with the in-sync flag unset
//! 2. **Convert**: Fetch the block tree and render GitHub-flavored markdown
//! 3. **Create** (GitHub): Open the issue (or project draft item) with mapped labels
//! 4. **Retire** (Notion): Flip the in-sync checkbox and move the status forward

pub mod github;
pub mod notion;
pub mod retry;

use crate::page::{Block, CreatedIssue, IssueDraft, SourcePage};
use crate::Result;
use async_trait::async_trait;

/// Source of pages to mirror, plus the write-backs that retire them
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Pages whose status matches `trigger` and whose in-sync flag is unset
    async fn eligible_pages(&self, trigger: &str) -> Result<Vec<SourcePage>>;

    /// Full block tree of a page, children included, document order
    async fn page_blocks(&self, page_id: &str) -> Result<Vec<Block>>;

    /// Set the page's in-sync flag
    async fn mark_synced(&self, page_id: &str) -> Result<()>;

    /// Move the page to a new status
    async fn set_status(&self, page_id: &str, status: &str) -> Result<()>;
}

/// Destination for drafts: repository issues and project board items
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Create a repository issue from a draft
    async fn create_issue(&self, draft: &IssueDraft) -> Result<CreatedIssue>;

    /// Create a ProjectV2 draft item; returns the new item id
    async fn create_draft_item(&self, project_id: &str, title: &str, body: &str)
        -> Result<String>;

    /// Attach an existing issue to a project; returns the item id
    async fn add_issue_to_project(&self, project_id: &str, issue_node_id: &str) -> Result<String>;

    /// Set a single-select field on a project item, by field and option name
    async fn set_single_select(
        &self,
        project_id: &str,
        item_id: &str,
        field_name: &str,
        option_name: &str,
    ) -> Result<()>;
}

// Notion exports
pub use notion::NotionAdapter;

// GitHub exports
pub use github::{GitHubAdapter, SelectField, SelectOption};

// Retry exports
pub use retry::{with_retry, RetryConfig, RetryDecision, RetryableError};
