//! Runtime settings and the channel list.
//!
//! Secrets come from the environment. The transcript key may also be read
//! from `~/.openclaw/openclaw.json` when the variable is absent.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::FixedOffset;
use serde_json::Value;

use crate::{
    error::{Result, SummaryWallError},
    types::{Channel, LanguagePreference},
};

pub const NOTION_API_KEY_VAR: &str = "NOTION_API_KEY";
pub const DATABASE_ID_VAR: &str = "YTSUMMARY_NOTION_DATABASE_ID";
pub const TRANSCRIPT_API_KEY_VAR: &str = "TRANSCRIPT_API_KEY";
pub const MODEL_COMMAND_VAR: &str = "SUMMARY_WALL_MODEL_COMMAND";
pub const MODEL_ARGS_VAR: &str = "SUMMARY_WALL_MODEL_ARGS";
pub const MODEL_PROMPT_INPUT_VAR: &str = "SUMMARY_WALL_MODEL_PROMPT_INPUT";

pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com";
pub const DEFAULT_TRANSCRIPT_BASE_URL: &str = "https://transcriptapi.com";
pub const DEFAULT_OUTPUT_MARKER: &str = "已輸出到:";

/// How the prompt reaches the model process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PromptInput {
    #[default]
    Stdin,
    /// Appended as the last argument. Subject to the OS argument size limit.
    Argument,
}

impl std::str::FromStr for PromptInput {
    type Err = SummaryWallError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stdin" => Ok(PromptInput::Stdin),
            "arg" | "argument" => Ok(PromptInput::Argument),
            other => Err(SummaryWallError::missing_config(format!(
                "{MODEL_PROMPT_INPUT_VAR} (expected 'stdin' or 'argument', got '{other}')"
            ))),
        }
    }
}

/// How the external model process is launched.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Program path, used verbatim.
    pub command: Option<String>,
    pub args: Vec<String>,
    pub prompt_input: PromptInput,
    pub timeout: Duration,
    pub output_marker: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            prompt_input: PromptInput::default(),
            timeout: Duration::from_secs(300),
            output_marker: DEFAULT_OUTPUT_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub notion_api_key: String,
    pub database_id: String,
    pub transcript_api_key: Option<String>,
    pub channels_path: PathBuf,
    pub utc_offset: FixedOffset,
    pub language: LanguagePreference,
    pub http_timeout: Duration,
    pub model: ModelSettings,
    pub notion_base_url: String,
    pub transcript_base_url: String,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        let fallback = openclaw_config_path();
        Self::from_vars(|name| std::env::var(name).ok(), fallback.as_deref())
    }

    /// Build settings from an arbitrary variable source.
    ///
    /// `openclaw_path` is consulted only when the transcript key variable is
    /// unset.
    pub fn from_vars<F>(var: F, openclaw_path: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        let required = |name: &str| {
            non_empty(name).ok_or_else(|| SummaryWallError::missing_config(name))
        };

        let notion_api_key = required(NOTION_API_KEY_VAR)?;
        let database_id = required(DATABASE_ID_VAR)?;
        let transcript_api_key = non_empty(TRANSCRIPT_API_KEY_VAR)
            .or_else(|| openclaw_path.and_then(transcript_key_from_file));

        let offset_hours: i32 = parse_or(non_empty("SUMMARY_WALL_UTC_OFFSET_HOURS"), 8);
        let utc_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            SummaryWallError::missing_config(format!(
                "SUMMARY_WALL_UTC_OFFSET_HOURS (got out-of-range value {offset_hours})"
            ))
        })?;

        let defaults = LanguagePreference::default();
        let language = LanguagePreference {
            local_prefix: non_empty("SUMMARY_WALL_LANG_PREFIX")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.local_prefix),
            fallback: non_empty("SUMMARY_WALL_FALLBACK_LANG")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.fallback),
        };

        let args = match non_empty(MODEL_ARGS_VAR) {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
                SummaryWallError::missing_config(format!(
                    "{MODEL_ARGS_VAR} (expected a JSON array of strings: {e})"
                ))
            })?,
            None => Vec::new(),
        };
        let prompt_input = match non_empty(MODEL_PROMPT_INPUT_VAR) {
            Some(raw) => raw.parse()?,
            None => PromptInput::default(),
        };

        let model = ModelSettings {
            command: non_empty(MODEL_COMMAND_VAR),
            args,
            prompt_input,
            timeout: Duration::from_secs(parse_or(
                non_empty("SUMMARY_WALL_MODEL_TIMEOUT_SECS"),
                300,
            )),
            output_marker: non_empty("SUMMARY_WALL_MODEL_OUTPUT_MARKER")
                .unwrap_or_else(|| DEFAULT_OUTPUT_MARKER.to_string()),
        };

        Ok(Self {
            notion_api_key,
            database_id,
            transcript_api_key,
            channels_path: non_empty("SUMMARY_WALL_CHANNELS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("channels.json")),
            utc_offset,
            language,
            http_timeout: Duration::from_secs(parse_or(
                non_empty("SUMMARY_WALL_HTTP_TIMEOUT_SECS"),
                60,
            )),
            model,
            notion_base_url: non_empty("NOTION_BASE_URL")
                .unwrap_or_else(|| DEFAULT_NOTION_BASE_URL.to_string()),
            transcript_base_url: non_empty("TRANSCRIPT_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TRANSCRIPT_BASE_URL.to_string()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub fn openclaw_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".openclaw").join("openclaw.json"))
}

/// Pull `skills.entries.transcriptapi.apiKey` out of an openclaw config file.
pub fn transcript_key_from_file(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let config: Value = serde_json::from_str(&content).ok()?;
    config["skills"]["entries"]["transcriptapi"]["apiKey"]
        .as_str()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// Load `[{"name": ..., "rss": ...}, ...]` from disk.
pub fn load_channels(path: &Path) -> Result<Vec<Channel>> {
    let invalid = |reason: String| SummaryWallError::InvalidConfig {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| invalid(format!("cannot read channel list: {e}")))?;
    let data: Value =
        serde_json::from_str(&content).map_err(|e| invalid(format!("not valid JSON: {e}")))?;
    let entries = data
        .as_array()
        .ok_or_else(|| invalid("channel list must be a JSON array".to_string()))?;

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            match (entry["name"].as_str(), entry["rss"].as_str()) {
                (Some(name), Some(rss)) => Ok(Channel::new(name, rss)),
                _ => Err(invalid(format!(
                    "entry {idx} must be an object with string 'name' and 'rss'"
                ))),
            }
        })
        .collect()
}
