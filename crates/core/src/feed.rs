//! Channel feed polling.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use feed_rs::model::{Entry, Feed};
use reqwest::Client;
use tracing::{debug, info};

use crate::{
    error::{Result, SummaryWallError},
    types::{Channel, VideoCandidate},
};

/// Outcome of inspecting one channel feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSelection {
    Candidate(VideoCandidate),
    /// The feed had no entries, or only short-form ones.
    NoStandardVideo,
    /// The newest standard video was not published on the local date.
    NotToday {
        title: String,
        published: Option<NaiveDate>,
    },
}

/// Current date at a fixed UTC offset.
pub fn local_today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

pub fn is_short_form(link: &str) -> bool {
    link.contains("/shorts/")
}

/// Resolve the video id from the entry id (`yt:video:<id>`) or its link.
pub fn video_id(entry_id: &str, link: &str) -> Option<String> {
    if let Some(id) = entry_id.strip_prefix("yt:video:") {
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    if let Some((_, query)) = link.split_once('?') {
        let from_query = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))
            .filter(|id| !id.is_empty());
        if let Some(id) = from_query {
            return Some(id.to_string());
        }
    }

    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|segment| segment.split(['?', '#']).next().unwrap_or(segment))
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}

fn entry_link(entry: &Entry) -> Option<&str> {
    entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")) && !l.href.is_empty())
        .or_else(|| entry.links.iter().find(|l| !l.href.is_empty()))
        .map(|l| l.href.as_str())
}

fn entry_title(entry: &Entry) -> String {
    entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default()
}

fn entry_published(entry: &Entry) -> Option<DateTime<Utc>> {
    entry.published.or(entry.updated)
}

/// Pick the newest standard-length video if it was published `today`.
///
/// Entries are taken in feed order. Short-form entries are never selected,
/// even when nothing else is available.
pub fn select_candidate(
    feed: &Feed,
    channel: &str,
    today: NaiveDate,
    offset: FixedOffset,
) -> FeedSelection {
    let Some((entry, link)) = feed.entries.iter().find_map(|entry| {
        let link = entry_link(entry)?;
        (!is_short_form(link)).then_some((entry, link))
    }) else {
        return FeedSelection::NoStandardVideo;
    };

    let title = entry_title(entry);
    let published_at = entry_published(entry);
    let published = published_at.map(|ts| ts.with_timezone(&offset).date_naive());
    if published != Some(today) {
        return FeedSelection::NotToday { title, published };
    }

    let Some(video_id) = video_id(&entry.id, link) else {
        return FeedSelection::NoStandardVideo;
    };

    FeedSelection::Candidate(VideoCandidate {
        title,
        url: link.to_string(),
        video_id,
        published_at,
        channel: channel.to_string(),
    })
}

pub struct FeedPoller {
    http: Client,
    offset: FixedOffset,
}

impl FeedPoller {
    pub fn new(http: Client, offset: FixedOffset) -> Self {
        Self { http, offset }
    }

    pub async fn fetch_feed(&self, url: &str) -> Result<Feed> {
        let failed = |reason: String| SummaryWallError::FeedFailed {
            url: url.to_string(),
            reason,
        };

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")));
        }
        let body = response.bytes().await?;

        feed_rs::parser::parse(body.as_ref()).map_err(|e| failed(e.to_string()))
    }

    /// Fetch a channel feed and return today's candidate, if any.
    pub async fn latest_candidate(
        &self,
        channel: &Channel,
        today: NaiveDate,
    ) -> Result<Option<VideoCandidate>> {
        let feed = self.fetch_feed(&channel.rss).await?;

        match select_candidate(&feed, &channel.name, today, self.offset) {
            FeedSelection::Candidate(candidate) => Ok(Some(candidate)),
            FeedSelection::NoStandardVideo => {
                info!(channel = %channel.name, "No standard-length video in feed");
                Ok(None)
            }
            FeedSelection::NotToday { title, published } => {
                debug!(
                    channel = %channel.name,
                    title = %title,
                    published = ?published,
                    today = %today,
                    "Newest video was not published today"
                );
                info!(channel = %channel.name, "Newest video is not from today, skipping");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taipei() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn entry_xml(id: &str, link: &str, published: &str) -> String {
        format!(
            r#"<entry>
  <id>yt:video:{id}</id>
  <title>Video {id}</title>
  <link rel="alternate" href="{link}"/>
  <published>{published}</published>
  <updated>{published}</updated>
</entry>"#
        )
    }

    fn parse_feed(entries: &[String]) -> Feed {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
<id>yt:channel:test</id>
<title>Sample Channel</title>
{}
</feed>"#,
            entries.join("\n")
        );
        feed_rs::parser::parse(xml.as_bytes()).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_selects_standard_video_published_today() {
        let feed = parse_feed(&[entry_xml(
            "abc123",
            "https://www.youtube.com/watch?v=abc123",
            "2026-10-18T01:00:00+00:00",
        )]);

        let selection = select_candidate(&feed, "Sample Channel", date(2026, 10, 18), taipei());
        let candidate = match selection {
            FeedSelection::Candidate(candidate) => candidate,
            other => panic!("expected a candidate, got {other:?}"),
        };
        assert_eq!(candidate.video_id, "abc123");
        assert_eq!(candidate.title, "Video abc123");
        assert_eq!(candidate.channel, "Sample Channel");
        assert_eq!(candidate.url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_skips_shorts_in_favour_of_next_entry() {
        let feed = parse_feed(&[
            entry_xml(
                "short1",
                "https://www.youtube.com/shorts/short1",
                "2026-10-18T03:00:00+00:00",
            ),
            entry_xml(
                "long1",
                "https://www.youtube.com/watch?v=long1",
                "2026-10-18T02:00:00+00:00",
            ),
        ]);

        match select_candidate(&feed, "c", date(2026, 10, 18), taipei()) {
            FeedSelection::Candidate(c) => assert_eq!(c.video_id, "long1"),
            other => panic!("unexpected selection {other:?}"),
        }
    }

    #[test]
    fn test_only_shorts_yields_nothing() {
        let feed = parse_feed(&[entry_xml(
            "short1",
            "https://www.youtube.com/shorts/short1",
            "2026-10-18T03:00:00+00:00",
        )]);
        assert_eq!(
            select_candidate(&feed, "c", date(2026, 10, 18), taipei()),
            FeedSelection::NoStandardVideo
        );
        assert_eq!(
            select_candidate(&parse_feed(&[]), "c", date(2026, 10, 18), taipei()),
            FeedSelection::NoStandardVideo
        );
    }

    #[test]
    fn test_publish_date_uses_local_offset() {
        // 17:00 UTC on the 17th is already the 18th in UTC+8.
        let feed = parse_feed(&[entry_xml(
            "late",
            "https://www.youtube.com/watch?v=late",
            "2026-10-17T17:00:00+00:00",
        )]);
        assert!(matches!(
            select_candidate(&feed, "c", date(2026, 10, 18), taipei()),
            FeedSelection::Candidate(_)
        ));
        assert_eq!(
            select_candidate(&feed, "c", date(2026, 10, 17), taipei()),
            FeedSelection::NotToday {
                title: "Video late".to_string(),
                published: Some(date(2026, 10, 18)),
            }
        );
    }

    #[test]
    fn test_stale_video_is_not_selected() {
        let feed = parse_feed(&[entry_xml(
            "old",
            "https://www.youtube.com/watch?v=old",
            "2026-10-10T01:00:00+00:00",
        )]);
        assert!(matches!(
            select_candidate(&feed, "c", date(2026, 10, 18), taipei()),
            FeedSelection::NotToday { .. }
        ));
    }

    #[test]
    fn test_video_id_resolution() {
        assert_eq!(video_id("yt:video:abc", "").as_deref(), Some("abc"));
        assert_eq!(
            video_id("urn:x", "https://www.youtube.com/watch?v=xyz&t=10").as_deref(),
            Some("xyz")
        );
        assert_eq!(
            video_id("urn:x", "https://youtu.be/short99").as_deref(),
            Some("short99")
        );
    }
}
