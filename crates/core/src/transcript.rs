//! Transcript provider client and track selection.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::{Result, SummaryWallError},
    types::{LanguagePreference, Transcript, TranscriptTrack},
};

const TRANSCRIPT_PATH: &str = "/api/v2/youtube/transcript";

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    transcript: Option<TranscriptBody>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptBody {
    Text(String),
    Segments(Vec<SegmentBody>),
}

#[derive(Debug, Deserialize)]
struct SegmentBody {
    text: String,
}

impl TranscriptResponse {
    fn into_tracks(self) -> Vec<TranscriptTrack> {
        let segments = match self.transcript {
            Some(TranscriptBody::Text(text)) => vec![text],
            Some(TranscriptBody::Segments(segments)) => {
                segments.into_iter().map(|s| s.text).collect()
            }
            None => Vec::new(),
        };

        if segments.iter().all(|s| s.trim().is_empty()) {
            return Vec::new();
        }

        vec![TranscriptTrack {
            language: self.language.unwrap_or_default(),
            segments,
        }]
    }
}

/// Choose a track: local-language prefix first, then the fallback language,
/// then a track with no language tag at all.
pub fn select_track(tracks: Vec<TranscriptTrack>, prefs: &LanguagePreference) -> Option<Transcript> {
    let starts_with = |track: &TranscriptTrack, prefix: &str| {
        !prefix.is_empty() && track.language.to_lowercase().starts_with(prefix)
    };

    let local = tracks
        .iter()
        .position(|t| starts_with(t, &prefs.local_prefix));
    let chosen = local
        .or_else(|| tracks.iter().position(|t| starts_with(t, &prefs.fallback)))
        .or_else(|| tracks.iter().position(|t| t.language.trim().is_empty()))?;

    tracks.into_iter().nth(chosen).map(Transcript::from)
}

pub struct TranscriptFetcher {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    prefs: LanguagePreference,
}

impl TranscriptFetcher {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
        prefs: LanguagePreference,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            prefs,
        }
    }

    /// Ask the provider for every track it has for `video_url`.
    ///
    /// "No captions" (404) and "no credit" (402) come back as an empty list.
    pub async fn fetch_tracks(&self, video_url: &str) -> Result<Vec<TranscriptTrack>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SummaryWallError::MissingApiKey {
                env_var: crate::config::TRANSCRIPT_API_KEY_VAR.to_string(),
            })?;

        let response = self
            .http
            .get(format!("{}{}", self.base_url, TRANSCRIPT_PATH))
            .query(&[
                ("video_url", video_url),
                ("format", "text"),
                ("include_timestamp", "false"),
                ("send_metadata", "true"),
            ])
            .bearer_auth(api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: TranscriptResponse = response.json().await?;
                Ok(body.into_tracks())
            }
            StatusCode::NOT_FOUND | StatusCode::PAYMENT_REQUIRED => {
                info!(video_url, status = %response.status(), "Transcript provider has no track");
                Ok(Vec::new())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SummaryWallError::TranscriptFailed {
                    video_url: video_url.to_string(),
                    reason: format!("HTTP {status}: {body}"),
                })
            }
        }
    }

    /// Fetch and select a transcript. Every failure reads as "no transcript".
    pub async fn fetch(&self, video_url: &str) -> Option<Transcript> {
        let tracks = match self.fetch_tracks(video_url).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(video_url, error = %e, "Transcript fetch failed");
                return None;
            }
        };

        let languages: Vec<String> = tracks.iter().map(|t| t.language.clone()).collect();
        let selected = select_track(tracks, &self.prefs);
        if selected.is_none() && !languages.is_empty() {
            info!(video_url, ?languages, "No transcript track in an accepted language");
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    use super::*;

    fn track(language: &str, text: &str) -> TranscriptTrack {
        TranscriptTrack {
            language: language.to_string(),
            segments: vec![text.to_string()],
        }
    }

    #[test]
    fn test_local_language_wins() {
        let tracks = vec![track("en", "hello"), track("zh-Hant", "你好")];
        let chosen = select_track(tracks, &LanguagePreference::default()).unwrap();
        assert_eq!(chosen.language, "zh-Hant");
    }

    #[test]
    fn test_fallback_language_used_when_no_local_track() {
        let tracks = vec![track("ja", "こんにちは"), track("en-US", "hello")];
        let chosen = select_track(tracks, &LanguagePreference::default()).unwrap();
        assert_eq!(chosen.language, "en-US");
    }

    #[test]
    fn test_no_accepted_track() {
        let tracks = vec![track("ja", "こんにちは")];
        assert!(select_track(tracks, &LanguagePreference::default()).is_none());
        assert!(select_track(Vec::new(), &LanguagePreference::default()).is_none());
    }

    #[test]
    fn test_untagged_track_is_accepted_last() {
        let tracks = vec![track("", "沒有語言標籤的逐字稿")];
        let chosen = select_track(tracks, &LanguagePreference::default()).unwrap();
        assert_eq!(chosen.text(), "沒有語言標籤的逐字稿");

        let tracks = vec![track(" ", "untagged"), track("en", "hello")];
        let chosen = select_track(tracks, &LanguagePreference::default()).unwrap();
        assert_eq!(chosen.language, "en");

        let tracks = vec![track("ja", "こんにちは"), track("", "untagged")];
        let chosen = select_track(tracks, &LanguagePreference::default()).unwrap();
        assert_eq!(chosen.text(), "untagged");
    }

    #[test]
    fn test_language_tag_is_case_insensitive() {
        let tracks = vec![track("ZH-TW", "你好")];
        assert!(select_track(tracks, &LanguagePreference::default()).is_some());
    }

    fn fetcher(server: &MockServer, key: Option<&str>) -> TranscriptFetcher {
        TranscriptFetcher::new(
            Client::new(),
            server.uri(),
            key.map(str::to_string),
            LanguagePreference::default(),
        )
    }

    #[tokio::test]
    async fn test_fetch_selects_text_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRANSCRIPT_PATH))
            .and(query_param("video_url", "https://www.youtube.com/watch?v=abc"))
            .and(header("authorization", "Bearer tkey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "language": "zh-Hant",
                "transcript": "第一句\n第二句",
            })))
            .mount(&server)
            .await;

        let transcript = fetcher(&server, Some("tkey"))
            .fetch("https://www.youtube.com/watch?v=abc")
            .await
            .unwrap();
        assert_eq!(transcript.language, "zh-Hant");
        assert_eq!(transcript.text(), "第一句\n第二句");
    }

    #[tokio::test]
    async fn test_fetch_accepts_segment_arrays() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRANSCRIPT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "language": "en",
                "transcript": [{"text": "one", "start": 0.0}, {"text": "two", "start": 1.5}],
            })))
            .mount(&server)
            .await;

        let transcript = fetcher(&server, Some("k")).fetch("v").await.unwrap();
        assert_eq!(transcript.segments, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_fetch_accepts_response_without_language() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRANSCRIPT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "transcript": "今天聊聊備份策略",
            })))
            .mount(&server)
            .await;

        let transcript = fetcher(&server, Some("k")).fetch("v").await.unwrap();
        assert_eq!(transcript.language, "");
        assert_eq!(transcript.text(), "今天聊聊備份策略");
    }

    #[tokio::test]
    async fn test_fetch_failures_read_as_no_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRANSCRIPT_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(fetcher(&server, Some("k")).fetch("v").await.is_none());
        assert!(fetcher(&server, None).fetch("v").await.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_reported_by_fetch_tracks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(TRANSCRIPT_PATH))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = fetcher(&server, Some("k")).fetch_tracks("v").await.unwrap_err();
        assert!(matches!(err, SummaryWallError::TranscriptFailed { .. }));
    }
}
