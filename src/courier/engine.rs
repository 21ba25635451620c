//! Page synchronization engine
//!
//! Drives one poll cycle: query eligible pages, convert each page's content
//! to markdown, create the GitHub record, then persist the sync state back
//! to the source page. Pages are handled independently so one failure never
//! aborts the rest of the cycle.
//!
//! # Page Flow
//!
//! 1. **Guard**: skip pages that are flagged, invalid, or off-status
//! 2. **Dedupe**: a ledger hit means a prior cycle crashed after the create;
//!    repair the source flags instead of creating a second record
//! 3. **Convert**: block tree to markdown, composed into the body template
//! 4. **Create**: repository issue (or draft project item in draft mode)
//! 5. **Place**: best-effort board attach and single-select fields
//! 6. **Persist**: mark the page in sync and move its status forward

use crate::config::CourierConfig;
use crate::courier::metrics;
use crate::integrations::{IssueTracker, PageStore};
use crate::labels::{assemble_labels, FieldMappings, StatusTransition};
use crate::ledger::Ledger;
use crate::markdown::render_blocks;
use crate::page::{CreatedIssue, IssueDraft, IssueRef, ProjectTarget, SkipReason, SourcePage};
use crate::{CourierError, Result};
use tracing::{debug, error, info, warn};

/// Engine knobs, extracted from the full configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Status move that drives the sync
    pub transition: StatusTransition,

    /// ProjectV2 node id; board placement is skipped when unset
    pub project_id: Option<String>,

    /// Create draft project items instead of repository issues
    pub create_draft: bool,

    /// Compute drafts but make no outbound writes
    pub dry_run: bool,

    /// Single-select option tables for board placement
    pub mappings: FieldMappings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transition: StatusTransition::default(),
            project_id: None,
            create_draft: false,
            dry_run: false,
            mappings: FieldMappings::default(),
        }
    }
}

impl EngineConfig {
    /// Extract the engine's slice of the courier configuration
    pub fn from_config(config: &CourierConfig) -> Self {
        Self {
            transition: config.transition.clone(),
            project_id: config.github_project_id.clone(),
            create_draft: config.project_create_draft,
            dry_run: config.dry_run,
            mappings: config.field_mappings.clone(),
        }
    }

    /// Set the status transition
    pub fn with_transition(mut self, transition: StatusTransition) -> Self {
        self.transition = transition;
        self
    }

    /// Set the target project
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Enable or disable draft mode
    pub fn with_draft_mode(mut self, enabled: bool) -> Self {
        self.create_draft = enabled;
        self
    }

    /// Enable or disable dry-run
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// Result of one poll cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Pages returned by the eligibility query
    pub eligible: usize,

    /// Pages mirrored into new issues or draft items
    pub synced: usize,

    /// Pages whose source flags were repaired from the ledger
    pub repaired: usize,

    /// Drafts computed but not sent (dry-run)
    pub planned: usize,

    /// Pages skipped with a reason
    pub skipped: usize,

    /// Per-page errors; these pages stay eligible for the next cycle
    pub errors: Vec<String>,
}

impl CycleReport {
    /// Check if any page failed this cycle
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Pages that reached a terminal outcome this cycle
    pub fn handled(&self) -> usize {
        self.synced + self.repaired + self.planned + self.skipped
    }
}

/// What happened to a single page
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// A new issue or draft item was created and recorded
    Synced(IssueRef),

    /// The ledger already had a record; only the source flags were fixed
    Repaired(IssueRef),

    /// Page was not synced, with the reason
    Skipped(SkipReason),

    /// Dry run: the draft that would have been sent
    DryRun(IssueDraft),
}

/// The record created on the tracker side, before it is narrowed to a ref
enum CreatedRecord {
    Issue(CreatedIssue),
    Draft { item_id: String },
}

/// Page synchronization engine
///
/// Generic over the source and tracker collaborators so cycles can run
/// against fakes in tests. Holds the ledger exclusively; cycles never run
/// concurrently.
pub struct SyncEngine<S: PageStore, T: IssueTracker> {
    pages: S,
    tracker: T,
    ledger: Ledger,
    config: EngineConfig,
}

impl<S: PageStore, T: IssueTracker> SyncEngine<S, T> {
    /// Create a new engine
    pub fn new(pages: S, tracker: T, ledger: Ledger, config: EngineConfig) -> Self {
        Self {
            pages,
            tracker,
            ledger,
            config,
        }
    }

    /// Run one full poll cycle
    ///
    /// Fails only when the eligibility query itself fails; per-page failures
    /// are collected into the report and the page stays eligible.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let trigger = self.config.transition.trigger().to_string();
        let pages = self.pages.eligible_pages(&trigger).await?;
        metrics::set_eligible_pages(pages.len());

        let mut report = CycleReport {
            eligible: pages.len(),
            ..Default::default()
        };

        if pages.is_empty() {
            debug!("No eligible pages this cycle");
            return Ok(report);
        }

        info!("Processing {} eligible page(s)", pages.len());

        for page in &pages {
            match self.sync_page(page).await {
                Ok(PageOutcome::Synced(issue)) => {
                    report.synced += 1;
                    metrics::record_page_synced(match issue {
                        IssueRef::Issue { .. } => "issue",
                        IssueRef::DraftItem { .. } => "draft",
                    });
                    info!("Synced '{}' as {}", page.title, issue);
                }
                Ok(PageOutcome::Repaired(issue)) => {
                    report.repaired += 1;
                    metrics::record_page_synced("repaired");
                    info!("Repaired flags for '{}' (recorded as {})", page.title, issue);
                }
                Ok(PageOutcome::Skipped(reason)) => {
                    report.skipped += 1;
                    metrics::record_page_skipped(reason.as_str());
                    debug!("Skipped '{}': {}", page.title, reason);
                }
                Ok(PageOutcome::DryRun(draft)) => {
                    report.planned += 1;
                    metrics::record_page_synced("planned");
                    info!(
                        "[dry-run] Would create '{}' with labels {:?}",
                        draft.title, draft.labels
                    );
                }
                Err(e) => {
                    metrics::record_page_error(error_stage(&e));
                    let msg = format!("page {} ('{}'): {}", page.id, page.title, e);
                    error!("Sync failed for {}", msg);
                    report.errors.push(msg);
                }
            }
        }

        info!(
            "Cycle complete: {} synced, {} repaired, {} planned, {} skipped, {} errors",
            report.synced,
            report.repaired,
            report.planned,
            report.skipped,
            report.errors.len()
        );

        Ok(report)
    }

    /// Handle a single page end to end
    ///
    /// Mutating steps run in an order that keeps every failure recoverable
    /// on a later cycle: the ledger write lands immediately after the
    /// create, and the source flags are the last thing touched.
    async fn sync_page(&mut self, page: &SourcePage) -> Result<PageOutcome> {
        if page.in_sync {
            return Ok(PageOutcome::Skipped(SkipReason::AlreadySynced));
        }
        if let Err(reason) = page.validate() {
            return Ok(PageOutcome::Skipped(reason));
        }
        // The query already filters on status, but stale results and test
        // doubles go through the same guard as everything else
        if !self.config.transition.matches(page.status.as_deref()) {
            return Ok(PageOutcome::Skipped(SkipReason::NotEligible {
                status: page.status.clone().unwrap_or_default(),
            }));
        }
        if page.priority.is_none() {
            warn!("Page '{}' has no Priority select", page.title);
        }
        if page.size.is_none() {
            warn!("Page '{}' has no Size select", page.title);
        }

        // A recorded issue means a previous cycle crashed between the
        // create and the flag write. Fix the flags; never create twice.
        if let Some(existing) = self.ledger.lookup(&page.id)? {
            if self.config.dry_run {
                info!(
                    "[dry-run] Would repair flags for '{}' ({})",
                    page.title, existing
                );
            } else {
                self.pages.mark_synced(&page.id).await?;
                self.pages
                    .set_status(&page.id, self.config.transition.next())
                    .await?;
            }
            return Ok(PageOutcome::Repaired(existing));
        }

        let blocks = self.pages.page_blocks(&page.id).await?;
        let content = render_blocks(&blocks);
        let draft = compose_draft(&self.config, page, &content);

        if self.config.dry_run {
            return Ok(PageOutcome::DryRun(draft));
        }

        let record = self.create_record(&draft).await?;
        let issue_ref = match &record {
            CreatedRecord::Issue(issue) => IssueRef::Issue {
                number: issue.number,
            },
            CreatedRecord::Draft { item_id } => IssueRef::DraftItem {
                item_id: item_id.clone(),
            },
        };
        self.ledger.record(&page.id, &issue_ref)?;

        self.place_on_board(&draft, &record).await;

        self.pages.mark_synced(&page.id).await?;
        self.pages
            .set_status(&page.id, self.config.transition.next())
            .await?;

        Ok(PageOutcome::Synced(issue_ref))
    }

    /// Create the tracker-side record for a draft
    async fn create_record(&self, draft: &IssueDraft) -> Result<CreatedRecord> {
        if self.config.create_draft {
            if let Some(target) = &draft.project {
                let item_id = self
                    .tracker
                    .create_draft_item(&target.project_id, &draft.title, &draft.body)
                    .await?;
                info!("Created draft project item {}", item_id);
                return Ok(CreatedRecord::Draft { item_id });
            }
            // Config validation rejects draft mode without a project; a
            // hand-built config still gets a usable fallback
            warn!("Draft mode without a project id; creating a repository issue instead");
        }

        let issue = self.tracker.create_issue(draft).await?;
        info!("Created issue #{} ({})", issue.number, issue.html_url);
        Ok(CreatedRecord::Issue(issue))
    }

    /// Best-effort board placement
    ///
    /// Attach and field failures are logged and never roll back the created
    /// record; the issue exists either way.
    async fn place_on_board(&self, draft: &IssueDraft, record: &CreatedRecord) {
        let Some(target) = &draft.project else {
            return;
        };

        let item_id = match record {
            // Draft items are born inside the project
            CreatedRecord::Draft { item_id } => item_id.clone(),
            CreatedRecord::Issue(issue) => {
                match self
                    .tracker
                    .add_issue_to_project(&target.project_id, &issue.node_id)
                    .await
                {
                    Ok(item_id) => {
                        debug!("Added issue #{} to project as {}", issue.number, item_id);
                        item_id
                    }
                    Err(e) => {
                        warn!("Could not add issue #{} to project: {}", issue.number, e);
                        return;
                    }
                }
            }
        };

        let mut selects: Vec<(&str, &str)> = vec![("Status", target.status_option.as_str())];
        if let Some(priority) = &target.priority_option {
            selects.push(("Priority", priority));
        }
        if let Some(size) = &target.size_option {
            selects.push(("Size", size));
        }

        for (field, option) in selects {
            match self
                .tracker
                .set_single_select(&target.project_id, &item_id, field, option)
                .await
            {
                Ok(()) => debug!("Project {} set to '{}'", field, option),
                Err(e) => warn!("Could not set project {} to '{}': {}", field, option, e),
            }
        }
    }

    /// Number of recorded page mappings
    pub fn ledger_count(&self) -> Result<usize> {
        self.ledger.count()
    }
}

/// Build the outbound draft for a page
fn compose_draft(config: &EngineConfig, page: &SourcePage, content: &str) -> IssueDraft {
    let labels = assemble_labels(
        &page.customer_types,
        page.priority.as_deref(),
        page.size.as_deref(),
    );

    let project = config.project_id.as_ref().map(|project_id| ProjectTarget {
        project_id: project_id.clone(),
        status_option: config.transition.next().to_string(),
        priority_option: page
            .priority
            .as_deref()
            .map(|p| config.mappings.priority_option(p)),
        size_option: page.size.as_deref().map(|s| config.mappings.size_option(s)),
    });

    IssueDraft {
        title: page.title.clone(),
        body: compose_body(page, content, config.transition.trigger()),
        labels,
        project,
    }
}

/// Compose the issue body: import preamble with the page's detail lines,
/// converted content between separators, and a trailer naming the status
/// move that produced the issue. Empty content renders a placeholder so the
/// body shape stays stable.
pub fn compose_body(page: &SourcePage, content: &str, trigger_status: &str) -> String {
    let reference = match &page.url {
        Some(url) => format!("Imported from [Notion page `{}`]({}).", page.id, url),
        None => format!("Imported from Notion page `{}`.", page.id),
    };

    let mut details: Vec<String> = Vec::new();
    if let Some(company) = &page.company {
        details.push(format!("**Company:** {}", company));
    }
    if !page.customer_types.is_empty() {
        details.push(format!(
            "**Customer Type:** {}",
            page.customer_types.join(", ")
        ));
    }
    if let Some(priority) = &page.priority {
        details.push(format!("**Priority:** {}", priority));
    }
    if let Some(size) = &page.size {
        details.push(format!("**Size:** {}", size));
    }

    let content = if content.trim().is_empty() {
        "_(no content)_"
    } else {
        content
    };

    let mut parts: Vec<String> = vec![reference];
    if !details.is_empty() {
        parts.push(String::new());
        parts.extend(details);
    }
    parts.push(String::new());
    parts.push("---".to_string());
    parts.push(String::new());
    parts.push(content.to_string());
    parts.push(String::new());
    parts.push("---".to_string());
    parts.push(String::new());
    parts.push(format!(
        "> Created automatically when Notion Status moved to **{}**.",
        trigger_status
    ));

    parts.join("\n")
}

/// Stable stage label for error metrics
fn error_stage(err: &CourierError) -> &'static str {
    match err {
        CourierError::Notion(_) => "notion",
        CourierError::GitHub(_) | CourierError::GraphQl(_) => "github",
        CourierError::Ledger(_) => "ledger",
        CourierError::RateLimited(_) => "rate_limited",
        CourierError::Network(_) | CourierError::Http(_) => "network",
        _ => "other",
    }
}
