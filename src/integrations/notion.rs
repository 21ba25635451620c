//! Notion API integration adapter
//!
//! Read-mostly client for the database poll: queries the eligible page set,
//! walks block trees, and flips the two write-back properties once an issue
//! exists. Every call here sets an absolute value or reads, so transient
//! failures are retried with backoff.

use super::retry::{with_retry, RetryConfig};
use super::PageStore;
use crate::page::{self, parse_block, Block, ParsedBlock, SourcePage};
use crate::{CourierError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout for database queries and block fetches
const READ_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout for page property updates
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// Pinned API revision; the property payload shapes are tied to it
const NOTION_VERSION: &str = "2022-06-28";

/// Pages fetched per database query call
const QUERY_PAGE_SIZE: u32 = 50;
/// Blocks fetched per children call
const BLOCK_PAGE_SIZE: u32 = 100;

/// Notion API client for the database poll
pub struct NotionAdapter {
    client: Client,
    token: String,
    database_id: String,
    base_url: String,
    retry: RetryConfig,
}

/// Database query request
#[derive(Debug, Clone, Serialize)]
struct QueryRequest {
    filter: Value,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<String>,
}

/// Paginated list response, shared by database queries and block children
#[derive(Debug, Clone, Deserialize)]
struct ListResponse {
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Filter for pages at the trigger status with the in-sync flag unset
fn eligible_filter(trigger: &str) -> Value {
    json!({
        "and": [
            { "property": page::PROP_STATUS, "select": { "equals": trigger } },
            { "property": page::PROP_IN_SYNC, "checkbox": { "equals": false } },
        ]
    })
}

impl NotionAdapter {
    /// Create a new Notion adapter
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("notion-courier/0.3"),
                );
                headers.insert(
                    "Notion-Version",
                    header::HeaderValue::from_static(NOTION_VERSION),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            token: token.into(),
            database_id: database_id.into(),
            base_url: "https://api.notion.com/v1".to_string(),
            retry: RetryConfig::for_reads(),
        })
    }

    /// One page of the database query
    async fn query_page(&self, trigger: &str, cursor: Option<String>) -> Result<ListResponse> {
        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);

        let request = QueryRequest {
            filter: eligible_filter(trigger),
            page_size: QUERY_PAGE_SIZE,
            start_cursor: cursor,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .timeout(READ_TIMEOUT)
            .send()
            .await?;

        Self::parse_response(response, "database query").await
    }

    /// One page of a block children listing
    async fn children_page(&self, block_id: &str, cursor: Option<String>) -> Result<ListResponse> {
        let mut url = format!(
            "{}/blocks/{}/children?page_size={}",
            self.base_url, block_id, BLOCK_PAGE_SIZE
        );
        if let Some(cursor) = &cursor {
            url.push_str("&start_cursor=");
            url.push_str(cursor);
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(READ_TIMEOUT)
            .send()
            .await?;

        Self::parse_response(response, "block children fetch").await
    }

    /// Fetch the direct children of one block, following cursors
    async fn children_of(&self, block_id: &str) -> Result<Vec<ParsedBlock>> {
        let mut parsed = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let batch = with_retry(&self.retry, "notion_block_children", || {
                self.children_page(block_id, cursor.clone())
            })
            .await?;

            parsed.extend(batch.results.iter().map(parse_block));

            if !batch.has_more {
                break;
            }
            cursor = batch.next_cursor;
            if cursor.is_none() {
                // has_more without a cursor would loop forever
                break;
            }
        }

        Ok(parsed)
    }

    /// Fetch a block's subtree in document order, recursing where the API
    /// reports nested children
    async fn block_tree(&self, block_id: &str) -> Result<Vec<Block>> {
        let parsed = self.children_of(block_id).await?;
        let mut blocks = Vec::with_capacity(parsed.len());

        for item in parsed {
            let mut block = item.block;
            if item.has_children {
                if let Some(id) = &item.id {
                    block.children = Box::pin(self.block_tree(id)).await?;
                }
            }
            blocks.push(block);
        }

        Ok(blocks)
    }

    /// PATCH a page's properties
    async fn patch_properties(
        &self,
        page_id: &str,
        properties: Value,
        operation: &str,
    ) -> Result<()> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        let body = json!({ "properties": properties });

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;

        let _: Value = Self::parse_response(response, operation).await?;
        Ok(())
    }

    /// Map a Notion API response to a typed value or a courier error
    async fn parse_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T> {
        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(60);
                Err(CourierError::RateLimited(retry_after))
            }
            StatusCode::UNAUTHORIZED => Err(CourierError::Notion(
                "authentication failed; check NOTION_TOKEN".to_string(),
            )),
            StatusCode::NOT_FOUND => Err(CourierError::Notion(format!(
                "{} failed: object not found or not shared with the integration",
                operation
            ))),
            status => {
                let error_body = response.text().await.unwrap_or_default();
                Err(CourierError::Notion(format!(
                    "{} failed: HTTP {}: {}",
                    operation, status, error_body
                )))
            }
        }
    }
}

#[async_trait]
impl PageStore for NotionAdapter {
    async fn eligible_pages(&self, trigger: &str) -> Result<Vec<SourcePage>> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let batch = with_retry(&self.retry, "notion_database_query", || {
                self.query_page(trigger, cursor.clone())
            })
            .await?;

            for value in &batch.results {
                pages.push(SourcePage::from_page_object(value)?);
            }

            if !batch.has_more {
                break;
            }
            cursor = batch.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        debug!(trigger = %trigger, count = pages.len(), "Eligible pages fetched");
        Ok(pages)
    }

    async fn page_blocks(&self, page_id: &str) -> Result<Vec<Block>> {
        let blocks = self.block_tree(page_id).await?;
        debug!(page = %page_id, blocks = blocks.len(), "Page content fetched");
        Ok(blocks)
    }

    async fn mark_synced(&self, page_id: &str) -> Result<()> {
        info!(page = %page_id, "Marking page in sync");

        with_retry(&self.retry, "notion_mark_synced", || {
            self.patch_properties(
                page_id,
                json!({ (page::PROP_IN_SYNC): { "checkbox": true } }),
                "mark synced",
            )
        })
        .await
    }

    async fn set_status(&self, page_id: &str, status: &str) -> Result<()> {
        info!(page = %page_id, status = %status, "Moving page status");

        with_retry(&self.retry, "notion_set_status", || {
            self.patch_properties(
                page_id,
                json!({ (page::PROP_STATUS): { "select": { "name": status } } }),
                "set status",
            )
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligible_filter_shape() {
        let filter = eligible_filter("Validated");

        assert_eq!(filter["and"][0]["property"], "Status");
        assert_eq!(filter["and"][0]["select"]["equals"], "Validated");
        assert_eq!(filter["and"][1]["property"], "In Sync With Github");
        assert_eq!(filter["and"][1]["checkbox"]["equals"], false);
    }

    #[test]
    fn test_query_request_omits_absent_cursor() {
        let request = QueryRequest {
            filter: eligible_filter("Validated"),
            page_size: QUERY_PAGE_SIZE,
            start_cursor: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["page_size"], 50);
        assert!(value.get("start_cursor").is_none());

        let request = QueryRequest {
            start_cursor: Some("abc".to_string()),
            ..request
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["start_cursor"], "abc");
    }

    #[test]
    fn test_list_response_defaults() {
        let response: ListResponse = serde_json::from_str(r#"{"results": []}"#).unwrap();
        assert!(response.results.is_empty());
        assert!(!response.has_more);
        assert!(response.next_cursor.is_none());

        let response: ListResponse = serde_json::from_str(
            r#"{"results": [{"id": "b1"}], "has_more": true, "next_cursor": "cur"}"#,
        )
        .unwrap();
        assert_eq!(response.results.len(), 1);
        assert!(response.has_more);
        assert_eq!(response.next_cursor.as_deref(), Some("cur"));
    }
}
