//! Notion REST API client.
//!
//! Covers the handful of endpoints the pipelines need: search, page
//! create/retrieve, block children list/append and block archive.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::{
    error::{Result, SummaryWallError},
    store::blocks::{Block, BlockContent},
};

pub const NOTION_VERSION: &str = "2022-06-28";

/// The store rejects more children than this in one request.
pub const MAX_CHILDREN_PER_REQUEST: usize = 100;

const LIST_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Parent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub database_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub parent: Parent,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Page {
    /// Plain text of the `Name` (or `Title`) title property.
    pub fn title(&self) -> String {
        ["Name", "Title"]
            .iter()
            .filter_map(|key| self.properties.get(*key))
            .find(|prop| prop["type"] == "title")
            .and_then(|prop| prop["title"].as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| {
                        part["plain_text"]
                            .as_str()
                            .or_else(|| part["text"]["content"].as_str())
                    })
                    .collect::<String>()
                    .trim()
                    .to_string()
            })
            .unwrap_or_default()
    }

    pub fn belongs_to(&self, database_id: &str) -> bool {
        self.parent
            .database_id
            .as_deref()
            .is_some_and(|id| normalize_id(id) == normalize_id(database_id))
    }
}

fn normalize_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Deserialize)]
struct Paginated<T> {
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// One page of search results.
#[derive(Debug)]
pub struct PageBatch {
    pub pages: Vec<Page>,
    pub next_cursor: Option<String>,
}

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl NotionClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("summary-wall/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummaryWallError::StoreFailed {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Search pages, newest edit first.
    pub async fn search_pages(&self, cursor: Option<&str>) -> Result<PageBatch> {
        let mut body = json!({
            "page_size": LIST_PAGE_SIZE,
            "filter": {"property": "object", "value": "page"},
            "sort": {"direction": "descending", "timestamp": "last_edited_time"},
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }

        let page: Paginated<Page> = self
            .execute("search", self.http.post(self.url("search")).json(&body))
            .await?;

        Ok(PageBatch {
            pages: page.results,
            next_cursor: page.next_cursor.filter(|_| page.has_more),
        })
    }

    pub async fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        self.execute(
            "retrieve_page",
            self.http.get(self.url(&format!("pages/{page_id}"))),
        )
        .await
    }

    /// Every child block of `block_id`, following pagination.
    pub async fn list_children(&self, block_id: &str) -> Result<Vec<Block>> {
        let url = self.url(&format!("blocks/{block_id}/children"));
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[("page_size", LIST_PAGE_SIZE.to_string())]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("start_cursor", cursor)]);
            }

            let page: Paginated<Block> = self.execute("list_children", request).await?;
            blocks.extend(page.results);

            match page.next_cursor.filter(|_| page.has_more) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(block_id, count = blocks.len(), "Listed child blocks");
        Ok(blocks)
    }

    /// Create a page under `database_id` with an initial block sequence.
    ///
    /// Children beyond the per-request limit are appended afterwards.
    pub async fn create_page(
        &self,
        database_id: &str,
        properties: Value,
        children: &[BlockContent],
    ) -> Result<Page> {
        let split = children.len().min(MAX_CHILDREN_PER_REQUEST);
        let (first, rest) = children.split_at(split);

        let body = json!({
            "parent": {"database_id": database_id},
            "properties": properties,
            "children": first,
        });
        let page: Page = self
            .execute("create_page", self.http.post(self.url("pages")).json(&body))
            .await?;

        if !rest.is_empty() {
            self.append_children(&page.id, rest).await?;
        }
        Ok(page)
    }

    /// Append blocks in request-sized batches; returns how many were written.
    pub async fn append_children(&self, block_id: &str, children: &[BlockContent]) -> Result<usize> {
        let url = self.url(&format!("blocks/{block_id}/children"));
        let mut appended = 0;

        for batch in children.chunks(MAX_CHILDREN_PER_REQUEST) {
            let _: Value = self
                .execute(
                    "append_children",
                    self.http.patch(&url).json(&json!({ "children": batch })),
                )
                .await?;
            appended += batch.len();
        }

        Ok(appended)
    }

    /// Soft-delete a block. It stays recoverable from page history.
    pub async fn archive_block(&self, block_id: &str) -> Result<()> {
        let _: Value = self
            .execute(
                "archive_block",
                self.http
                    .patch(self.url(&format!("blocks/{block_id}")))
                    .json(&json!({ "archived": true })),
            )
            .await?;
        Ok(())
    }
}
