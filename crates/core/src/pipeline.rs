//! The two batch pipelines: capture new videos, and summarise captured pages.
//!
//! Both run strictly one item at a time. A failure on one channel or page is
//! logged and counted, never fatal to the run.

use chrono::NaiveDate;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::Settings,
    error::Result,
    feed::FeedPoller,
    generator::TextGenerator,
    pages::{PageSelector, PendingPage, has_summary_heading},
    prompt::{build_prompt, sanitize_reply},
    store::NotionClient,
    summary::{RebuildOutcome, parse_reply, rebuild_page, summary_section_blocks},
    transcript::TranscriptFetcher,
    types::Channel,
    writer::PageWriter,
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PollReport {
    /// Ids of the pages created.
    pub created: Vec<String>,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SummarizeReport {
    /// Ids of the pages that received a summary.
    pub summarized: Vec<String>,
    pub skipped: usize,
    pub failed: usize,
    /// Pages whose old body was archived but whose new body is incomplete.
    pub needs_repair: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadySummarized,
    EmptyTranscript,
    EmptyReply,
    EmptyAfterSanitize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Rebuilt(RebuildOutcome),
    Skipped(SkipReason),
}

fn http_client(settings: &Settings) -> Result<Client> {
    Ok(Client::builder()
        .timeout(settings.http_timeout)
        .user_agent(concat!("summary-wall/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub fn notion_client(settings: &Settings) -> Result<NotionClient> {
    NotionClient::new(
        settings.notion_api_key.as_str(),
        settings.notion_base_url.as_str(),
        settings.http_timeout,
    )
}

/// Channel feed → transcript → new page.
pub struct Poller {
    feeds: FeedPoller,
    transcripts: TranscriptFetcher,
    store: NotionClient,
    database_id: String,
}

impl Poller {
    pub fn new(
        feeds: FeedPoller,
        transcripts: TranscriptFetcher,
        store: NotionClient,
        database_id: impl Into<String>,
    ) -> Self {
        Self {
            feeds,
            transcripts,
            store,
            database_id: database_id.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = http_client(settings)?;
        Ok(Self::new(
            FeedPoller::new(http.clone(), settings.utc_offset),
            TranscriptFetcher::new(
                http,
                settings.transcript_base_url.as_str(),
                settings.transcript_api_key.clone(),
                settings.language.clone(),
            ),
            notion_client(settings)?,
            settings.database_id.as_str(),
        ))
    }

    pub async fn poll(&self, channels: &[Channel], today: NaiveDate) -> PollReport {
        let writer = PageWriter::new(&self.store, &self.database_id);
        let mut report = PollReport::default();

        for channel in channels {
            let video = match self.feeds.latest_candidate(channel, today).await {
                Ok(Some(video)) => video,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(channel = %channel.name, error = %e, "Feed unavailable, skipping channel");
                    report.failed += 1;
                    continue;
                }
            };

            let transcript = match self.transcripts.fetch(&video.url).await {
                Some(transcript) if !transcript.is_empty() => transcript,
                _ => {
                    info!(
                        channel = %channel.name,
                        video_id = %video.video_id,
                        "No usable transcript, skipping"
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            match writer.create_video_page(&video, &transcript).await {
                Ok(page) => report.created.push(page.id),
                Err(e) => {
                    warn!(
                        channel = %channel.name,
                        video_id = %video.video_id,
                        error = %e,
                        "Failed to create page"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            created = report.created.len(),
            skipped = report.skipped,
            failed = report.failed,
            "Poll finished"
        );
        report
    }
}

/// Page → prompt → model → sanitise → rebuilt page body.
pub struct Summarizer {
    store: NotionClient,
    database_id: String,
    generator: Box<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(
        store: NotionClient,
        database_id: impl Into<String>,
        generator: Box<dyn TextGenerator>,
    ) -> Self {
        Self {
            store,
            database_id: database_id.into(),
            generator,
        }
    }

    pub fn store(&self) -> &NotionClient {
        &self.store
    }

    /// Summarise up to `limit` pages lacking a summary.
    ///
    /// Only a failed search aborts the run.
    pub async fn summarize(&self, limit: usize) -> Result<SummarizeReport> {
        let pending = PageSelector::new(&self.store, &self.database_id)
            .select(limit)
            .await?;
        info!(count = pending.len(), limit, "Selected pages to summarise");

        let mut report = SummarizeReport::default();
        for page in &pending {
            let page_id = page.id().to_string();
            match self.process(page).await {
                Ok(PageOutcome::Rebuilt(outcome)) => {
                    if outcome.needs_repair() {
                        report.needs_repair.push(page_id.clone());
                    }
                    if outcome.appended {
                        report.summarized.push(page_id);
                    } else {
                        report.failed += 1;
                    }
                }
                Ok(PageOutcome::Skipped(_)) => report.skipped += 1,
                Err(e) => {
                    warn!(page_id = %page_id, error = %e, "Summary failed, page left unchanged");
                    report.failed += 1;
                }
            }
        }

        info!(
            summarized = report.summarized.len(),
            skipped = report.skipped,
            failed = report.failed,
            needs_repair = report.needs_repair.len(),
            "Summarize finished"
        );
        Ok(report)
    }

    /// Summarise one page by id, wherever it lives.
    pub async fn summarize_page(&self, page_id: &str) -> Result<PageOutcome> {
        let page = PageSelector::new(&self.store, &self.database_id)
            .load(page_id)
            .await?;
        self.process(&page).await
    }

    async fn process(&self, page: &PendingPage) -> Result<PageOutcome> {
        let page_id = page.id();
        if has_summary_heading(&page.blocks) {
            info!(page_id, "Page already has a summary");
            return Ok(PageOutcome::Skipped(SkipReason::AlreadySummarized));
        }

        let transcript = page.transcript();
        if transcript.is_empty() {
            info!(page_id, "Page has no transcript text, skipping");
            return Ok(PageOutcome::Skipped(SkipReason::EmptyTranscript));
        }

        let prompt = build_prompt(&page.title(), transcript.for_prompt());
        let reply = self.generator.generate(&prompt).await?;
        if reply.trim().is_empty() {
            info!(page_id, "Model returned nothing, skipping");
            return Ok(PageOutcome::Skipped(SkipReason::EmptyReply));
        }

        let cleaned = sanitize_reply(&reply);
        if cleaned.is_empty() {
            info!(page_id, "Reply empty after clean-up, skipping");
            return Ok(PageOutcome::Skipped(SkipReason::EmptyAfterSanitize));
        }

        let digest = parse_reply(&cleaned)?;
        let sequence = summary_section_blocks(&digest, &transcript.full);
        let outcome = rebuild_page(&self.store, page_id, &sequence).await;

        if outcome.needs_repair() {
            warn!(
                page_id,
                archived = outcome.archived_blocks,
                appended = outcome.appended_blocks,
                "Page body is incomplete and needs repair"
            );
        } else if !outcome.failed_archives.is_empty() {
            warn!(
                page_id,
                blocks = ?outcome.failed_archives,
                "Summary written but some old blocks were not archived"
            );
        }
        Ok(PageOutcome::Rebuilt(outcome))
    }
}
