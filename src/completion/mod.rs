
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ServiceConfig;
use crate::{AssistantError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Completion models the assistant can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedModel {
    Gpt4oMini,
    Gpt4o,
}

impl SupportedModel {
    pub const ALL: &[SupportedModel] = &[SupportedModel::Gpt4oMini, SupportedModel::Gpt4o];

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedModel::Gpt4oMini => "gpt-4o-mini",
            SupportedModel::Gpt4o => "gpt-4o",
        }
    }
}

impl fmt::Display for SupportedModel {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupportedModel {
    type Err = AssistantError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        SupportedModel::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                AssistantError::Completion(format!(
                    "Unsupported model '{}' (supported: {})",
                    s,
                    SupportedModel::ALL
                        .iter()
                        .map(SupportedModel::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Sampling temperature must stay in [0.0, 1.0].
#[inline]
pub fn validate_temperature(temperature: f32) -> Result<()> {
    if (0.0..=1.0).contains(&temperature) {
        Ok(())
    } else {
        Err(AssistantError::Completion(format!(
            "Temperature {} is out of range (must be between 0.0 and 1.0)",
            temperature
        )))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for the hosted chat-completions service. One synchronous call
/// per completion; failures propagate to the caller and are never retried
/// here.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    endpoint: Url,
    api_key: String,
    api_version: String,
    agent: ureq::Agent,
}

impl CompletionClient {
    #[inline]
    pub fn new(config: &ServiceConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            agent,
        }
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    fn completions_url(&self, model: SupportedModel) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(&format!(
                "openai/deployments/{}/chat/completions",
                model.as_str()
            ))
            .map_err(|e| {
                AssistantError::Completion(format!("Failed to build completions URL: {}", e))
            })?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }

    /// Send the prompt as a single user message and return the generated
    /// text, trimmed.
    #[inline]
    pub fn complete(
        &self,
        model: SupportedModel,
        prompt: &str,
        temperature: f32,
    ) -> Result<String> {
        validate_temperature(temperature)?;

        let url = self.completions_url(model)?;
        let request = ChatRequest {
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            AssistantError::Completion(format!("Failed to serialize completion request: {}", e))
        })?;

        debug!(
            "Requesting completion from {} ({} prompt chars, temperature {})",
            model,
            prompt.len(),
            temperature
        );

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header("api-key", &self.api_key)
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| AssistantError::Completion(format!("Completion request failed: {}", e)))?;

        parse_chat_response(&response_text)
    }
}

fn parse_chat_response(response_text: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(response_text).map_err(|e| {
        AssistantError::Completion(format!("Failed to parse completion response: {}", e))
    })?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            AssistantError::Completion("Completion response contained no choices".to_string())
        })?;

    Ok(content.trim().to_string())
}
