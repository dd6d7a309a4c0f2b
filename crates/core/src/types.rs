use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A channel whose feed is polled for new videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub rss: String,
}

impl Channel {
    pub fn new(name: impl Into<String>, rss: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rss: rss.into(),
        }
    }
}

/// Newest standard-length video of a channel, published today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub title: String,
    pub url: String,
    pub video_id: String,
    pub published_at: Option<DateTime<Utc>>,
    pub channel: String,
}

/// One language track offered by the transcript provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTrack {
    pub language: String,
    pub segments: Vec<String>,
}

/// The track chosen for a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub language: String,
    pub segments: Vec<String>,
}

impl Transcript {
    pub fn text(&self) -> String {
        self.segments.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.trim().is_empty())
    }
}

impl From<TranscriptTrack> for Transcript {
    fn from(track: TranscriptTrack) -> Self {
        Self {
            language: track.language,
            segments: track.segments,
        }
    }
}

/// Which transcript languages are acceptable, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePreference {
    pub local_prefix: String,
    pub fallback: String,
}

impl Default for LanguagePreference {
    fn default() -> Self {
        Self {
            local_prefix: "zh".to_string(),
            fallback: "en".to_string(),
        }
    }
}
