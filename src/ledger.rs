//! Sync ledger
//!
//! SQLite record of every page already mirrored, keyed by Notion page id.
//! The in-sync checkbox on the page is the primary guard against double
//! creation; the ledger closes the window where an issue was created but the
//! write-back failed, so a crash between the two never yields a second issue.

use crate::page::IssueRef;
use crate::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite-backed page-to-issue ledger
pub struct Ledger {
    conn: Connection,
}

impl Ledger {
    /// Open or create a ledger database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %path.display(), "Opening sync ledger");

        let conn = Connection::open(path)?;

        // WAL keeps reads usable while a cycle writes
        conn.pragma_update(None, "journal_mode", &"WAL")?;

        let ledger = Self { conn };
        ledger.init_schema()?;

        Ok(ledger)
    }

    /// Open an in-memory ledger, used by tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self { conn };
        ledger.init_schema()?;
        Ok(ledger)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS mapping (
                notion_page_id TEXT PRIMARY KEY,
                github_issue_number INTEGER,
                draft_item_id TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Record a page-to-issue mapping. Recording the same page again
    /// replaces the row.
    pub fn record(&self, page_id: &str, issue: &IssueRef) -> Result<()> {
        let (issue_number, draft_item_id) = match issue {
            IssueRef::Issue { number } => (Some(*number as i64), None),
            IssueRef::DraftItem { item_id } => (None, Some(item_id.as_str())),
        };

        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO mapping
                (notion_page_id, github_issue_number, draft_item_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
            params![
                page_id,
                issue_number,
                draft_item_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Look up the issue recorded for a page, if any
    pub fn lookup(&self, page_id: &str) -> Result<Option<IssueRef>> {
        let row = self
            .conn
            .query_row(
                "SELECT github_issue_number, draft_item_id FROM mapping WHERE notion_page_id = ?",
                params![page_id],
                |row| {
                    let issue_number: Option<i64> = row.get(0)?;
                    let draft_item_id: Option<String> = row.get(1)?;
                    Ok((issue_number, draft_item_id))
                },
            )
            .optional()?;

        Ok(row.and_then(|(issue_number, draft_item_id)| {
            match (issue_number, draft_item_id) {
                (Some(number), _) => Some(IssueRef::Issue {
                    number: number as u64,
                }),
                (None, Some(item_id)) => Some(IssueRef::DraftItem { item_id }),
                (None, None) => None,
            }
        }))
    }

    /// Number of pages recorded
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM mapping", [], |row| row.get(0))?;

        Ok(count as usize)
    }
}
