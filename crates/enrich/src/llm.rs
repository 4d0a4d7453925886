//! OpenAI-compatible chat-completions client.
//!
//! Works with OpenAI and any service exposing `POST {base_url}/chat/completions`.

use crate::error::{EnrichError, Result};
use crate::prompt::{annotation_prompt, parse_annotation, parse_classification, reusability_prompt};
use crate::provider::{Annotator, Classifier};
use async_trait::async_trait;
use madl_segmenter::{Annotation, Classification, SourceUnit};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the language-model service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// No key means no client: every unit takes the heuristic path
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 60,
            temperature: 0.0,
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(EnrichError::InvalidConfig("llm.base_url is empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(EnrichError::InvalidConfig("llm.model is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(EnrichError::InvalidConfig("llm.timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Language-model backed classifier and annotator
pub struct LlmClient {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    client: reqwest::Client,
}

impl LlmClient {
    /// Build a client; `None` when the configuration carries no API key
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        config.validate()?;
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            client,
        }))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send one user message and return the first choice's content
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichError::Status { status, body });
        }

        let json: serde_json::Value = response.json().await?;
        json.get("choices")
            .and_then(|v| v.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(|content| content.as_str())
            .map(str::to_string)
            .ok_or_else(|| EnrichError::malformed("missing choices[0].message.content"))
    }
}

#[async_trait]
impl Classifier for LlmClient {
    async fn classify(&self, unit: &SourceUnit) -> Result<Classification> {
        let reply = self.complete(&reusability_prompt(unit)).await?;
        parse_classification(&reply)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[async_trait]
impl Annotator for LlmClient {
    async fn annotate(&self, unit: &SourceUnit) -> Result<Annotation> {
        let reply = self.complete(&annotation_prompt(unit)).await?;
        parse_annotation(&reply)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_api_key_means_no_client() {
        let client = LlmClient::from_config(&LlmConfig::default()).unwrap();
        assert!(client.is_none());

        let blank = LlmConfig {
            api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(LlmClient::from_config(&blank).unwrap().is_none());
    }

    #[test]
    fn client_construction() {
        let config = LlmConfig {
            api_key: Some("test-key".to_string()),
            base_url: "http://localhost:8080/v1/".to_string(),
            model: "local-model".to_string(),
            ..Default::default()
        };
        let client = LlmClient::from_config(&config).unwrap().unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model, "local-model");
        assert_eq!(Classifier::name(&client), "llm");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = LlmConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(LlmClient::from_config(&config).is_err());
    }

    #[test]
    fn api_key_is_never_serialized() {
        let config = LlmConfig {
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
