//! Issue Tracker Integration
//!
//! Fetches raw records from a Jira-style REST API and normalizes them into
//! flat, canonical summaries suitable for prompt context. Extraction is total
//! and defensive: every optional field maps to an explicit sentinel instead of
//! propagating absence, so rendering never has to reason about missing data.

use crate::config::TrackerConfig;
use crate::error::BackendError;
use crate::http::{build_http_client, map_status_error, map_transport_error};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// At most this many records are rendered in detail; the remainder is counted
/// but not shown.
pub const MAX_RENDERED_TICKETS: usize = 5;

/// Free-text descriptions are cut to this many characters before rendering
pub const DESCRIPTION_LIMIT: usize = 200;

const DESCRIPTION_ELLIPSIS: &str = "...";
const CUSTOM_FIELD_PREFIX: &str = "customfield_";

const TICKETS_OPEN: &str = "=== RECENT JIRA TICKETS FOR TARGET USER ===";
const TICKETS_CLOSE: &str = "=== END OF JIRA TICKETS ===";

/// Flat canonical summary of one raw tracker record.
///
/// Derived once per raw record, read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketSummary {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub priority: String,
    pub issue_type: String,
    pub assignee: String,
    pub reporter: String,
    pub project_name: String,
    pub project_key: String,
    pub created: String,
    pub updated: String,
    pub description: Option<String>,
    pub labels: BTreeSet<String>,
    pub components: BTreeSet<String>,
    /// Non-empty `customfield_*` values, carried for diagnostics but never
    /// rendered into the primary ticket context block.
    pub custom_fields: BTreeMap<String, String>,
}

/// Raw record as returned by the tracker search endpoint.
///
/// Fields stay a key-value map: the schema varies per installation (custom
/// fields in particular), so normalization examines keys explicitly rather
/// than committing to a fixed nested shape.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub key: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
struct MyselfResponse {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// Client for the record-tracking backend.
pub struct TrackerClient {
    http: Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl TrackerClient {
    /// Build a client from configuration. Missing credentials are a
    /// configuration error for this backend only; callers degrade the ticket
    /// stage rather than aborting the run.
    pub fn new(config: &TrackerConfig) -> Result<Self, BackendError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| BackendError::NotConfigured("tracker base_url is not set".into()))?;
        let email = config
            .email
            .clone()
            .ok_or_else(|| BackendError::NotConfigured("tracker email is not set".into()))?;
        let api_token = config
            .api_token
            .clone()
            .ok_or_else(|| BackendError::NotConfigured("tracker api_token is not set".into()))?;

        Ok(Self {
            http: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            api_token,
        })
    }

    /// Connection probe: returns the authenticated user's display name.
    pub async fn myself(&self) -> Result<String, BackendError> {
        let url = format!("{}/rest/api/3/myself", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        let myself: MyselfResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        Ok(myself.display_name.unwrap_or_else(|| "Unknown".to_string()))
    }

    /// Fetch unresolved records assigned to `assignee`, newest first.
    pub async fn active_issues_for(
        &self,
        assignee: &str,
        max_results: u32,
    ) -> Result<Vec<RawIssue>, BackendError> {
        let jql = format!(
            "assignee = \"{}\" AND resolution = Unresolved ORDER BY created DESC",
            assignee
        );
        debug!(%jql, max_results, "Querying tracker");

        let url = format!("{}/rest/api/3/search", self.base_url);
        let max_results = max_results.to_string();
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header("Accept", "application/json")
            .query(&[("jql", jql.as_str()), ("maxResults", max_results.as_str())])
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(status, body));
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        Ok(search.issues)
    }
}

/// Normalize one raw record into a canonical summary.
pub fn normalize(raw: &RawIssue) -> TicketSummary {
    let fields = &raw.fields;

    TicketSummary {
        key: raw.key.clone().unwrap_or_else(|| "N/A".to_string()),
        summary: string_field(fields, "summary"),
        status: named_field(fields, "status"),
        priority: named_field_or(fields, "priority", "None"),
        issue_type: named_field(fields, "issuetype"),
        assignee: person_field(fields, "assignee", "Unassigned"),
        reporter: person_field(fields, "reporter", "None"),
        project_name: nested_string(fields, "project", "name"),
        project_key: nested_string(fields, "project", "key"),
        created: string_field(fields, "created"),
        updated: string_field(fields, "updated"),
        description: fields
            .get("description")
            .and_then(plain_text)
            .map(|text| truncate_description(&text)),
        labels: string_set(fields.get("labels")),
        components: named_set(fields.get("components")),
        custom_fields: collect_custom_fields(fields),
    }
}

/// Truncate a description to the first `DESCRIPTION_LIMIT` characters plus an
/// ellipsis marker; shorter text passes through unchanged.
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_LIMIT {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .nth(DESCRIPTION_LIMIT)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    format!("{}{}", &text[..cut], DESCRIPTION_ELLIPSIS)
}

/// Render an ordered ticket set into the prompt context block.
///
/// The first `MAX_RENDERED_TICKETS` get a detailed block each; anything past
/// that is summarized by count. An empty set renders nothing.
pub fn render_ticket_context(tickets: &[TicketSummary]) -> String {
    if tickets.is_empty() {
        warn!("No tickets available for context");
        return String::new();
    }

    let mut parts = Vec::new();
    parts.push(TICKETS_OPEN.to_string());
    parts.push(format!("Total Active Tickets: {}", tickets.len()));
    parts.push(String::new());

    for (i, ticket) in tickets.iter().take(MAX_RENDERED_TICKETS).enumerate() {
        parts.push(format!("TICKET #{}: {}", i + 1, ticket.key));
        parts.push(format!("Summary: {}", ticket.summary));
        parts.push(format!("Status: {}", ticket.status));
        parts.push(format!("Priority: {}", ticket.priority));
        parts.push(format!("Issue Type: {}", ticket.issue_type));
        parts.push(format!("Assignee: {}", ticket.assignee));
        parts.push(format!("Reporter: {}", ticket.reporter));
        parts.push(format!(
            "Project: {} ({})",
            ticket.project_name, ticket.project_key
        ));
        parts.push(format!("Created: {}", ticket.created));
        parts.push(format!("Updated: {}", ticket.updated));

        if let Some(description) = &ticket.description {
            parts.push(format!("Description: {}", description));
        }
        if !ticket.labels.is_empty() {
            parts.push(format!(
                "Labels: {}",
                ticket.labels.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        if !ticket.components.is_empty() {
            parts.push(format!(
                "Components: {}",
                ticket
                    .components
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        parts.push("---".to_string());
    }

    if tickets.len() > MAX_RENDERED_TICKETS {
        parts.push(format!(
            "[Additional {} tickets not shown for brevity]",
            tickets.len() - MAX_RENDERED_TICKETS
        ));
    }

    parts.push(format!("{}\n", TICKETS_CLOSE));
    parts.join("\n")
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("N/A")
        .to_string()
}

fn named_field(fields: &Map<String, Value>, key: &str) -> String {
    named_field_or(fields, key, "N/A")
}

fn named_field_or(fields: &Map<String, Value>, key: &str, sentinel: &str) -> String {
    fields
        .get(key)
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .unwrap_or(sentinel)
        .to_string()
}

fn person_field(fields: &Map<String, Value>, key: &str, sentinel: &str) -> String {
    fields
        .get(key)
        .and_then(|v| v.get("displayName"))
        .and_then(Value::as_str)
        .unwrap_or(sentinel)
        .to_string()
}

fn nested_string(fields: &Map<String, Value>, outer: &str, inner: &str) -> String {
    fields
        .get(outer)
        .and_then(|v| v.get(inner))
        .and_then(Value::as_str)
        .unwrap_or("N/A")
        .to_string()
}

fn string_set(value: Option<&Value>) -> BTreeSet<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn named_set(value: Option<&Value>) -> BTreeSet<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Copy non-empty scalar `customfield_*` values, by identifier.
fn collect_custom_fields(fields: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut custom = BTreeMap::new();
    for (key, value) in fields {
        if !key.starts_with(CUSTOM_FIELD_PREFIX) {
            continue;
        }
        let rendered = match value {
            Value::String(s) if !s.trim().is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        custom.insert(key.clone(), rendered);
    }
    custom
}

/// Extract plain text from a description value.
///
/// Descriptions arrive either as a plain string or as a rich-text document
/// (nested objects whose `text` leaves carry the words); leaves are joined
/// with single spaces.
fn plain_text(value: &Value) -> Option<String> {
    let mut out = String::new();
    collect_text(value, &mut out);
    let trimmed = out.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(s);
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("text") {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(s);
            }
            if let Some(content) = map.get("content") {
                collect_text(content, out);
            }
        }
        _ => {}
    }
}
