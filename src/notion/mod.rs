//! Destination store: one Notion page per reviewed paper.
//!
//! The orchestrator only sees [`PageWriter`]: flat properties plus the
//! ordered content nodes in, a page id or a [`WriteError`] out. Exactly one
//! write is attempted per document.
//!
//! [`NotionWriter`] implements it over the public REST API. Notion accepts at
//! most 100 child blocks in a page-creation request; longer reviews are
//! created with the first 100 and the rest appended in further batches of
//! 100 to the new page. A failed append reports the page id it leaves
//! behind ([`WriteError::Incomplete`]).

pub mod properties;

use crate::error::{ReviewError, WriteError};
use crate::output::PageId;
use crate::pipeline::blocks::ContentNode;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Flat Notion property map, keyed by property name.
pub type PageProperties = serde_json::Map<String, Value>;

pub const NOTION_API_BASE: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Most children Notion accepts in one request.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// Writes one review page.
#[async_trait]
pub trait PageWriter: Send + Sync {
    async fn write(
        &self,
        properties: &PageProperties,
        nodes: &[ContentNode],
    ) -> Result<PageId, WriteError>;
}

/// Serialize a content node as a Notion block.
pub fn node_to_block(node: &ContentNode) -> Value {
    let kind = match node {
        ContentNode::Heading(_) => "heading_2",
        ContentNode::Paragraph(_) => "paragraph",
        ContentNode::ListItem(_) => "bulleted_list_item",
    };
    json!({
        "object": "block",
        "type": kind,
        kind: {
            "rich_text": [{ "type": "text", "text": { "content": node.text() } }]
        }
    })
}

/// Strip dashes and check a database id is 32 hex digits.
pub fn normalize_database_id(raw: &str) -> Result<String, ReviewError> {
    let id: String = raw.trim().chars().filter(|c| *c != '-').collect();
    if id.len() == 32 && id.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(id.to_ascii_lowercase())
    } else {
        Err(ReviewError::InvalidConfig(format!(
            "Notion database id '{raw}' is not a 32-digit hex id"
        )))
    }
}

/// Page writer over the Notion REST API.
pub struct NotionWriter {
    client: Client,
    token: String,
    database_id: String,
    base_url: String,
}

impl std::fmt::Debug for NotionWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionWriter")
            .field("database_id", &self.database_id)
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl NotionWriter {
    /// Create a writer for `database_id` authenticated with an integration token.
    pub fn new(token: impl Into<String>, database_id: &str) -> Result<Self, ReviewError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ReviewError::InvalidConfig(
                "Notion token is empty (set NOTION_TOKEN)".to_string(),
            ));
        }
        let database_id = normalize_database_id(database_id)?;

        let client = Client::builder()
            .user_agent(concat!("paper2notion/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ReviewError::Internal(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            token,
            database_id,
            base_url: NOTION_API_BASE.to_string(),
        })
    }

    /// Point the writer at another endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    fn create_body(&self, properties: &PageProperties, children: &[Value]) -> Value {
        json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
            "children": children,
        })
    }

    async fn append_children(&self, page_id: &str, children: &[Value]) -> Result<(), WriteError> {
        let url = format!("{}/v1/blocks/{}/children", self.base_url, page_id);
        let response = self
            .authed(self.client.patch(&url))
            .json(&json!({ "children": children }))
            .send()
            .await
            .map_err(|e| WriteError::Http(e.to_string()))?;
        read_response(response).await.map(|_| ())
    }
}

#[async_trait]
impl PageWriter for NotionWriter {
    async fn write(
        &self,
        properties: &PageProperties,
        nodes: &[ContentNode],
    ) -> Result<PageId, WriteError> {
        let blocks: Vec<Value> = nodes.iter().map(node_to_block).collect();
        let mut batches = blocks.chunks(MAX_BLOCKS_PER_REQUEST);
        let first = batches.next().unwrap_or(&[]);

        let url = format!("{}/v1/pages", self.base_url);
        let response = self
            .authed(self.client.post(&url))
            .json(&self.create_body(properties, first))
            .send()
            .await
            .map_err(|e| WriteError::Http(e.to_string()))?;

        let body = read_response(response).await?;
        let page_id = body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(WriteError::MissingPageId)?
            .to_string();
        debug!("Created Notion page {} with {} blocks", page_id, first.len());

        for batch in batches {
            if let Err(e) = self.append_children(&page_id, batch).await {
                warn!("Page {} left incomplete: {}", page_id, e);
                return Err(WriteError::Incomplete {
                    page_id,
                    source: Box::new(e),
                });
            }
            debug!("Appended {} blocks to {}", batch.len(), page_id);
        }

        Ok(page_id)
    }
}

#[derive(Debug, Deserialize)]
struct NotionErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse a success body, or turn an error status into [`WriteError::Api`].
async fn read_response(response: reqwest::Response) -> Result<Value, WriteError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| WriteError::Http(e.to_string()))?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &bytes));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| WriteError::Http(format!("unparseable Notion response: {e}")))
}

fn api_error(status: u16, body: &[u8]) -> WriteError {
    let parsed: Option<NotionErrorBody> = serde_json::from_slice(body).ok();
    let (code, message) = match parsed {
        Some(b) => (
            b.code.unwrap_or_else(|| "unknown".to_string()),
            b.message.unwrap_or_default(),
        ),
        None => (
            "unknown".to_string(),
            String::from_utf8_lossy(body).trim().to_string(),
        ),
    };
    WriteError::Api {
        status,
        code,
        message,
    }
}
