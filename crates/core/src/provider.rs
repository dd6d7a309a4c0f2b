use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::{Result, SummaryWallError},
    generator::TextGenerator,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Provider {
    #[default]
    Gemini,
    Grok,
    Openai,
}

pub struct ProviderConfig {
    pub api_url: &'static str,
    pub model: &'static str,
    pub env_var: &'static str,
}

impl Provider {
    pub fn config(&self) -> ProviderConfig {
        match self {
            Provider::Grok => ProviderConfig {
                api_url: "https://api.x.ai/v1/chat/completions",
                model: "grok-4-fast",
                env_var: "XAI_API_KEY",
            },
            Provider::Openai => ProviderConfig {
                api_url: "https://api.openai.com/v1/chat/completions",
                model: "gpt-5.1",
                env_var: "OPENAI_API_KEY",
            },
            Provider::Gemini => ProviderConfig {
                api_url: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
                model: "gemini-3-pro",
                env_var: "GEMINI_API_KEY",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Grok => "Grok",
            Provider::Openai => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }

    /// Validate that the API key is set for this provider
    pub fn validate_api_key(&self) -> Result<String> {
        let config = self.config();
        std::env::var(config.env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SummaryWallError::MissingApiKey {
                env_var: config.env_var.to_string(),
            })
    }
}

/// OpenAI-compatible chat completion backend.
pub struct ChatGenerator {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatGenerator {
    pub fn new(http: Client, provider: &Provider, api_key: impl Into<String>) -> Self {
        let config = provider.config();
        Self {
            http,
            endpoint: config.api_url.to_string(),
            model: config.model.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Build a client for `provider` with its key taken from the environment.
    pub fn from_env(provider: &Provider, timeout: Duration) -> Result<Self> {
        let api_key = provider.validate_api_key()?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(http, provider, api_key))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextGenerator for ChatGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt,
                    },
                ],
                "temperature": 0.3,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummaryWallError::model_failed(format!("HTTP {status}: {body}")));
        }

        let response = response.json::<serde_json::Value>().await?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                SummaryWallError::model_failed(format!("Invalid API response: {:?}", response))
            })?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    #[tokio::test]
    async fn test_chat_generator_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer key"))
            .and(body_partial_json(serde_json::json!({"model": "gemini-3-pro"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": " 1. **A**：B \n"}}]
            })))
            .mount(&server)
            .await;

        let generator = ChatGenerator::new(Client::new(), &Provider::Gemini, "key")
            .with_endpoint(format!("{}/v1/chat/completions", server.uri()));
        assert_eq!(generator.generate("prompt").await.unwrap(), "1. **A**：B");
    }

    #[tokio::test]
    async fn test_chat_generator_rejects_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": ""}}]
            })))
            .mount(&server)
            .await;

        let generator =
            ChatGenerator::new(Client::new(), &Provider::Grok, "key").with_endpoint(server.uri());
        assert!(matches!(
            generator.generate("prompt").await,
            Err(SummaryWallError::ModelFailed { .. })
        ));
    }
}
