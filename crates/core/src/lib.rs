pub mod config;
pub mod error;
pub mod feed;
pub mod format;
pub mod generator;
pub mod pages;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod store;
pub mod summary;
pub mod transcript;
pub mod types;
pub mod writer;

pub use config::{ModelSettings, PromptInput, Settings, load_channels};
pub use error::{Result, SummaryWallError};
pub use feed::{FeedPoller, local_today};
pub use generator::{ProcessGenerator, TextGenerator};
pub use pages::{PageSelector, PendingPage, ReassembledTranscript, reassemble_transcript};
pub use pipeline::{
    PageOutcome, PollReport, Poller, SkipReason, SummarizeReport, Summarizer, notion_client,
};
pub use provider::{ChatGenerator, Provider, ProviderConfig};
pub use store::NotionClient;
pub use summary::RebuildOutcome;
pub use transcript::TranscriptFetcher;
pub use types::{Channel, LanguagePreference, Transcript, TranscriptTrack, VideoCandidate};
pub use writer::{DEFAULT_TRANSLATION_HEADING, PageWriter, append_translation};
