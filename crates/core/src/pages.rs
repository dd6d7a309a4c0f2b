//! Picking pages that still need a summary, and reading their transcripts.

use tracing::{debug, warn};

use crate::{
    error::Result,
    format::truncate_chars,
    prompt::MAX_TRANSCRIPT_CHARS,
    store::{Block, BlockContent, NotionClient, Page},
};

/// Heading text that marks a page as already summarised.
pub const SUMMARY_MARKER: &str = "內容摘要";

/// Upper bound on database pages inspected per requested page.
const SCAN_FACTOR: usize = 15;

pub fn has_summary_heading(blocks: &[Block]) -> bool {
    blocks.iter().any(|block| {
        block.content.is_heading()
            && block
                .content
                .plain_text()
                .is_some_and(|text| text.trim() == SUMMARY_MARKER)
    })
}

/// Transcript text recovered from a page body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassembledTranscript {
    pub full: String,
}

impl ReassembledTranscript {
    /// The transcript as sent to the model.
    pub fn for_prompt(&self) -> &str {
        truncate_chars(&self.full, MAX_TRANSCRIPT_CHARS)
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }
}

pub fn reassemble_transcript(blocks: &[Block]) -> ReassembledTranscript {
    let full = blocks
        .iter()
        .filter_map(|block| match &block.content {
            BlockContent::Paragraph { paragraph } => Some(paragraph.plain_text()),
            _ => None,
        })
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    ReassembledTranscript { full }
}

/// A page without a summary, with the blocks read while checking it.
#[derive(Debug, Clone)]
pub struct PendingPage {
    pub page: Page,
    pub blocks: Vec<Block>,
}

impl PendingPage {
    pub fn id(&self) -> &str {
        &self.page.id
    }

    pub fn title(&self) -> String {
        self.page.title()
    }

    pub fn transcript(&self) -> ReassembledTranscript {
        reassemble_transcript(&self.blocks)
    }
}

pub struct PageSelector<'a> {
    store: &'a NotionClient,
    database_id: &'a str,
}

impl<'a> PageSelector<'a> {
    pub fn new(store: &'a NotionClient, database_id: &'a str) -> Self {
        Self { store, database_id }
    }

    /// Up to `limit` database pages lacking a summary, most recently edited
    /// first.
    ///
    /// A page whose blocks cannot be listed is logged and passed over.
    pub async fn select(&self, limit: usize) -> Result<Vec<PendingPage>> {
        let max_scanned = limit.saturating_mul(SCAN_FACTOR);
        let mut selected = Vec::new();
        let mut scanned = 0;
        let mut cursor: Option<String> = None;

        'search: while selected.len() < limit && scanned < max_scanned {
            let batch = self.store.search_pages(cursor.as_deref()).await?;

            for page in batch.pages {
                if !page.belongs_to(self.database_id) {
                    continue;
                }
                scanned += 1;

                match self.store.list_children(&page.id).await {
                    Ok(blocks) if has_summary_heading(&blocks) => {
                        debug!(page_id = %page.id, "Page already summarised");
                    }
                    Ok(blocks) => selected.push(PendingPage { page, blocks }),
                    Err(e) => {
                        warn!(page_id = %page.id, error = %e, "Cannot read page blocks, skipping");
                    }
                }

                if selected.len() >= limit || scanned >= max_scanned {
                    break 'search;
                }
            }

            match batch.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        debug!(scanned, selected = selected.len(), "Page selection finished");
        Ok(selected)
    }

    /// Fetch one page by id regardless of its parent database.
    pub async fn load(&self, page_id: &str) -> Result<PendingPage> {
        let page = self.store.retrieve_page(page_id).await?;
        let blocks = self.store.list_children(page_id).await?;
        Ok(PendingPage { page, blocks })
    }
}
