//! GitHub integration adapter
//!
//! Issue creation goes through the REST API; everything ProjectV2 (item
//! attachment, draft items, single-select fields) goes through GraphQL.
//! Field and option ids are discovered by name once per project and cached
//! for the life of the adapter. Issue creation is deliberately never
//! retried; a duplicate issue is worse than a missed cycle.

use super::retry::{with_retry, RetryConfig};
use super::IssueTracker;
use crate::page::{CreatedIssue, IssueDraft};
use crate::{CourierError, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Per-request timeout for GraphQL calls
const GRAPHQL_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-request timeout for issue creation
const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// GitHub API client for issue creation and board placement
pub struct GitHubAdapter {
    client: Client,
    token: String,
    owner: String,
    repo: String,
    rest_base_url: String,
    graphql_url: String,
    /// Single-select fields per project id, discovered on first use
    field_cache: Mutex<HashMap<String, HashMap<String, SelectField>>>,
}

/// Issue creation request (REST)
#[derive(Debug, Clone, Serialize)]
struct CreateIssueRequest {
    title: String,
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<String>>,
}

/// Created issue (REST response subset)
#[derive(Debug, Clone, Deserialize)]
struct IssueResponse {
    number: u64,
    node_id: String,
    html_url: String,
}

/// GraphQL response wrapper
#[derive(Debug, Clone, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AddItemData {
    #[serde(rename = "addProjectV2ItemById")]
    add_item: ItemContainer,
}

#[derive(Debug, Clone, Deserialize)]
struct ItemContainer {
    item: NodeRef,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateDraftData {
    #[serde(rename = "createProjectV2DraftIssue")]
    create_draft: ProjectItemContainer,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectItemContainer {
    #[serde(rename = "projectItem")]
    project_item: NodeRef,
}

#[derive(Debug, Clone, Deserialize)]
struct NodeRef {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectFieldsData {
    node: Option<ProjectNode>,
}

#[derive(Debug, Clone, Deserialize)]
struct ProjectNode {
    fields: FieldConnection,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldConnection {
    nodes: Vec<FieldNode>,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldNode {
    #[serde(rename = "__typename")]
    typename: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    options: Vec<SelectOption>,
}

/// A single-select field discovered on a project
#[derive(Debug, Clone)]
pub struct SelectField {
    pub id: String,
    pub options: Vec<SelectOption>,
}

/// One option of a single-select field
#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
}

/// Keep only single-select fields, keyed by field name
fn select_fields(nodes: Vec<FieldNode>) -> HashMap<String, SelectField> {
    let mut fields = HashMap::new();

    for field in nodes {
        if field.typename != "ProjectV2SingleSelectField" {
            continue;
        }
        if let (Some(id), Some(name)) = (field.id, field.name) {
            fields.insert(
                name,
                SelectField {
                    id,
                    options: field.options,
                },
            );
        }
    }

    fields
}

impl GitHubAdapter {
    /// Create a new GitHub adapter
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::USER_AGENT,
                    header::HeaderValue::from_static("notion-courier/0.3"),
                );
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static("application/vnd.github.v3+json"),
                );
                headers
            })
            .build()?;

        Ok(Self {
            client,
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            rest_base_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            field_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Execute a GraphQL query or mutation
    async fn graphql<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .client
            .post(&self.graphql_url)
            .bearer_auth(&self.token)
            .json(&body)
            .timeout(GRAPHQL_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let result: GraphQLResponse<T> = response.json().await?;
                if let Some(errors) = result.errors {
                    let error_msg = errors
                        .iter()
                        .map(|e| e.message.clone())
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(CourierError::GraphQl(error_msg));
                }
                result
                    .data
                    .ok_or_else(|| CourierError::GraphQl("No data in response".to_string()))
            }
            StatusCode::UNAUTHORIZED => Err(CourierError::GitHub(
                "authentication failed; check GITHUB_TOKEN".to_string(),
            )),
            StatusCode::FORBIDDEN => Err(CourierError::GitHub(
                "GitHub API forbidden (rate limit?)".to_string(),
            )),
            status => {
                let error_body = response.text().await.unwrap_or_default();
                Err(CourierError::GitHub(format!(
                    "GraphQL call failed: HTTP {}: {}",
                    status, error_body
                )))
            }
        }
    }

    /// Single-select fields of a project, keyed by field name. Discovered
    /// once per project and cached for the adapter's lifetime.
    async fn project_fields(&self, project_id: &str) -> Result<HashMap<String, SelectField>> {
        let mut cache = self.field_cache.lock().await;
        if let Some(fields) = cache.get(project_id) {
            return Ok(fields.clone());
        }

        let fields = self.fetch_project_fields(project_id).await?;
        cache.insert(project_id.to_string(), fields.clone());
        Ok(fields)
    }

    /// Discover the single-select fields of a project by node id
    async fn fetch_project_fields(
        &self,
        project_id: &str,
    ) -> Result<HashMap<String, SelectField>> {
        let query = r#"
            query($project: ID!) {
                node(id: $project) {
                    ... on ProjectV2 {
                        fields(first: 50) {
                            nodes {
                                __typename
                                ... on ProjectV2FieldCommon { id name }
                                ... on ProjectV2SingleSelectField {
                                    id
                                    name
                                    options { id name }
                                }
                            }
                        }
                    }
                }
            }
        "#;

        let variables = serde_json::json!({ "project": project_id });

        debug!(project = %project_id, "Discovering project fields");

        let data: ProjectFieldsData =
            with_retry(&RetryConfig::for_reads(), "github_project_fields", || {
                self.graphql(query, variables.clone())
            })
            .await?;

        let node = data.node.ok_or_else(|| {
            CourierError::GitHub(format!(
                "project {} not found or not a ProjectV2",
                project_id
            ))
        })?;

        let fields = select_fields(node.fields.nodes);

        info!(
            project = %project_id,
            fields = fields.len(),
            "Project single-select fields discovered"
        );

        Ok(fields)
    }
}

#[async_trait]
impl IssueTracker for GitHubAdapter {
    async fn create_issue(&self, draft: &IssueDraft) -> Result<CreatedIssue> {
        let url = format!(
            "{}/repos/{}/{}/issues",
            self.rest_base_url, self.owner, self.repo
        );

        info!(
            repo = %format!("{}/{}", self.owner, self.repo),
            title = %draft.title,
            "Creating GitHub issue"
        );

        let request = CreateIssueRequest {
            title: draft.title.clone(),
            body: draft.body.clone(),
            labels: (!draft.labels.is_empty()).then(|| draft.labels.clone()),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .timeout(WRITE_TIMEOUT)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                let issue: IssueResponse = response.json().await?;
                info!(number = issue.number, url = %issue.html_url, "GitHub issue created");
                Ok(CreatedIssue {
                    number: issue.number,
                    node_id: issue.node_id,
                    html_url: issue.html_url,
                })
            }
            StatusCode::UNAUTHORIZED => Err(CourierError::GitHub(
                "authentication failed; check GITHUB_TOKEN".to_string(),
            )),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(CourierError::GitHub(format!(
                "repository {}/{} not found or issues disabled",
                self.owner, self.repo
            ))),
            status => {
                let error_body = response.text().await.unwrap_or_default();
                Err(CourierError::GitHub(format!(
                    "create issue failed: HTTP {}: {}",
                    status, error_body
                )))
            }
        }
    }

    async fn create_draft_item(
        &self,
        project_id: &str,
        title: &str,
        body: &str,
    ) -> Result<String> {
        let mutation = r#"
            mutation($project: ID!, $title: String!, $body: String!) {
                createProjectV2DraftIssue(
                    input: { projectId: $project, title: $title, body: $body }
                ) {
                    projectItem { id }
                }
            }
        "#;

        let variables = serde_json::json!({
            "project": project_id,
            "title": title,
            "body": body,
        });

        info!(project = %project_id, title = %title, "Creating project draft item");

        let data: CreateDraftData = self.graphql(mutation, variables).await?;
        Ok(data.create_draft.project_item.id)
    }

    async fn add_issue_to_project(&self, project_id: &str, issue_node_id: &str) -> Result<String> {
        let mutation = r#"
            mutation($project: ID!, $content: ID!) {
                addProjectV2ItemById(
                    input: { projectId: $project, contentId: $content }
                ) {
                    item { id }
                }
            }
        "#;

        let variables = serde_json::json!({
            "project": project_id,
            "content": issue_node_id,
        });

        debug!(project = %project_id, "Adding issue to project");

        let data: AddItemData = self.graphql(mutation, variables).await?;
        Ok(data.add_item.item.id)
    }

    async fn set_single_select(
        &self,
        project_id: &str,
        item_id: &str,
        field_name: &str,
        option_name: &str,
    ) -> Result<()> {
        let fields = self.project_fields(project_id).await?;

        let field = fields.get(field_name).ok_or_else(|| {
            CourierError::GitHub(format!(
                "project has no single-select field named '{}'",
                field_name
            ))
        })?;
        let option = field
            .options
            .iter()
            .find(|option| option.name == option_name)
            .ok_or_else(|| {
                CourierError::GitHub(format!(
                    "field '{}' has no option named '{}'",
                    field_name, option_name
                ))
            })?;

        let mutation = r#"
            mutation($project: ID!, $item: ID!, $field: ID!, $option: String!) {
                updateProjectV2ItemFieldValue(
                    input: {
                        projectId: $project,
                        itemId: $item,
                        fieldId: $field,
                        value: { singleSelectOptionId: $option }
                    }
                ) {
                    projectV2Item { id }
                }
            }
        "#;

        let variables = serde_json::json!({
            "project": project_id,
            "item": item_id,
            "field": field.id,
            "option": option.id,
        });

        debug!(field = %field_name, option = %option_name, "Setting project field");

        let _: serde_json::Value = self.graphql(mutation, variables).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_issue_request_omits_empty_labels() {
        let request = CreateIssueRequest {
            title: "Title".to_string(),
            body: "Body".to_string(),
            labels: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["title"], "Title");
        assert!(value.get("labels").is_none());
    }

    #[test]
    fn test_graphql_response_with_errors() {
        let raw = r#"{"data": null, "errors": [{"message": "boom"}, {"message": "again"}]}"#;
        let response: GraphQLResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();

        assert!(response.data.is_none());
        let errors = response.errors.unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "boom");
    }

    #[test]
    fn test_add_item_response_shape() {
        let raw = r#"{"addProjectV2ItemById": {"item": {"id": "PVTI_1"}}}"#;
        let data: AddItemData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.add_item.item.id, "PVTI_1");
    }

    #[test]
    fn test_create_draft_response_shape() {
        let raw = r#"{"createProjectV2DraftIssue": {"projectItem": {"id": "PVTI_2"}}}"#;
        let data: CreateDraftData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.create_draft.project_item.id, "PVTI_2");
    }

    #[test]
    fn test_select_fields_filters_field_kinds() {
        let raw = r#"{
            "node": {
                "fields": {
                    "nodes": [
                        {"__typename": "ProjectV2Field", "id": "F_title", "name": "Title"},
                        {
                            "__typename": "ProjectV2SingleSelectField",
                            "id": "F_status",
                            "name": "Status",
                            "options": [
                                {"id": "opt_1", "name": "Backlog"},
                                {"id": "opt_2", "name": "Done"}
                            ]
                        },
                        {
                            "__typename": "ProjectV2SingleSelectField",
                            "id": "F_priority",
                            "name": "Priority",
                            "options": [{"id": "opt_3", "name": "P1"}]
                        }
                    ]
                }
            }
        }"#;

        let data: ProjectFieldsData = serde_json::from_str(raw).unwrap();
        let fields = select_fields(data.node.unwrap().fields.nodes);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields["Status"].id, "F_status");
        assert_eq!(fields["Status"].options.len(), 2);
        assert_eq!(fields["Priority"].options[0].name, "P1");
        assert!(!fields.contains_key("Title"));
    }

    #[test]
    fn test_issue_response_shape() {
        let raw = r#"{
            "number": 42,
            "node_id": "I_abc",
            "html_url": "https://github.com/acme/tracker/issues/42",
            "state": "open"
        }"#;

        let issue: IssueResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(issue.number, 42);
        assert_eq!(issue.node_id, "I_abc");
    }
}
