//! Creates one database page per captured video.

use serde_json::{Value, json};
use tracing::info;

use crate::{
    error::Result,
    format::{paragraph_blocks, plain_paragraph_blocks},
    store::{BlockContent, NotionClient, Page},
    types::{Transcript, VideoCandidate},
};

fn rich_text_property(content: &str) -> Value {
    json!({"rich_text": [{"type": "text", "text": {"content": content}}]})
}

/// Database properties for a freshly captured video.
pub fn page_properties(video: &VideoCandidate) -> Value {
    let published = video
        .published_at
        .map(|at| json!({"start": at.to_rfc3339()}))
        .unwrap_or(Value::Null);

    json!({
        "Name": {"title": [{"type": "text", "text": {"content": video.title}}]},
        "Channel": rich_text_property(&video.channel),
        "Video Title": rich_text_property(&video.title),
        "Video URL": {"url": video.url},
        "Published At": {"date": published},
        "Summary": {"rich_text": []},
    })
}

pub struct PageWriter<'a> {
    store: &'a NotionClient,
    database_id: &'a str,
}

impl<'a> PageWriter<'a> {
    pub fn new(store: &'a NotionClient, database_id: &'a str) -> Self {
        Self { store, database_id }
    }

    /// Create the page with the transcript as plain paragraphs.
    ///
    /// There is no duplicate check: writing the same video twice yields two
    /// pages.
    pub async fn create_video_page(
        &self,
        video: &VideoCandidate,
        transcript: &Transcript,
    ) -> Result<Page> {
        let children = plain_paragraph_blocks(&transcript.text());
        let page = self
            .store
            .create_page(self.database_id, page_properties(video), &children)
            .await?;

        info!(
            page_id = %page.id,
            video_id = %video.video_id,
            channel = %video.channel,
            blocks = children.len(),
            "Created video page"
        );
        Ok(page)
    }
}

/// Heading written above an appended translation.
pub const DEFAULT_TRANSLATION_HEADING: &str = "英文逐字稿中文翻譯";

/// Append a heading and `text` as paragraphs to the bottom of a page.
pub async fn append_translation(
    store: &NotionClient,
    page_id: &str,
    heading: &str,
    text: &str,
) -> Result<usize> {
    let mut children = vec![BlockContent::heading_2(heading)];
    children.extend(paragraph_blocks(text));

    let appended = store.append_children(page_id, &children).await?;
    info!(page_id, blocks = appended, "Appended translation");
    Ok(appended)
}
