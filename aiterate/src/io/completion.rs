//! Chat-completion client for an OpenAI-compatible API.

use std::env;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::cancel::CancelToken;
use crate::error::{AiterateError, Result};
use crate::io::config::AiterateConfig;

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const SYSTEM_PROMPT: &str = "You are a helpful programming assistant that generates code and tests.";

/// Sends one prompt to a generative model and returns the raw reply text.
pub trait CompletionService {
    fn complete(&self, prompt: &str, cancel: &CancelToken) -> Result<String>;
}

impl<T: CompletionService + ?Sized> CompletionService for &T {
    fn complete(&self, prompt: &str, cancel: &CancelToken) -> Result<String> {
        (**self).complete(prompt, cancel)
    }
}

/// Blocking client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: String, config: &AiterateConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.completion_timeout())
            .build();
        Self {
            agent,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        }
    }

    /// Build a client from `OPENAI_API_KEY`, loading `.env` first when present.
    pub fn from_env(config: &AiterateConfig) -> Result<Self> {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            warn!(err = %err, "failed to load .env");
        }
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AiterateError::Configuration(format!("{API_KEY_ENV} environment variable is not set"))
            })?;
        Ok(Self::new(api_key, config))
    }
}

impl CompletionService for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_bytes = prompt.len()))]
    fn complete(&self, prompt: &str, cancel: &CancelToken) -> Result<String> {
        cancel.check()?;
        debug!("sending completion request");
        let response = self
            .agent
            .post(&format!("{}/chat/completions", self.base_url))
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_json(ureq::json!({
                "model": self.model,
                "temperature": self.temperature,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
            }))
            .map_err(|err| match err {
                ureq::Error::Status(status, resp) => AiterateError::Service(format!(
                    "status {status}: {}",
                    resp.into_string().unwrap_or_default()
                )),
                ureq::Error::Transport(transport) => {
                    AiterateError::Service(format!("transport: {transport}"))
                }
            })?;

        // The request itself cannot be interrupted; honour cancellation on return.
        cancel.check()?;

        let body: ChatResponse = response
            .into_json()
            .map_err(|err| AiterateError::Service(format!("decode response: {err}")))?;
        extract_content(body)
    }
}

fn extract_content(body: ChatResponse) -> Result<String> {
    let content = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiterateError::Service("no completion choices returned".to_string()))?
        .message
        .content
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(AiterateError::Service(
            "completion returned empty content".to_string(),
        ));
    }
    debug!(response_bytes = content.len(), "completion received");
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String> {
        extract_content(serde_json::from_str(json).expect("valid json"))
    }

    #[test]
    fn returns_first_choice_content() {
        let content = parse(
            r#"{"choices":[{"message":{"role":"assistant","content":"package main"}},
                           {"message":{"content":"ignored"}}]}"#,
        )
        .expect("content");
        assert_eq!(content, "package main");
    }

    #[test]
    fn no_choices_is_a_service_error() {
        let err = parse(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, AiterateError::Service(ref msg) if msg.contains("no completion choices")));
    }

    #[test]
    fn null_or_blank_content_is_a_service_error() {
        assert!(matches!(
            parse(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(AiterateError::Service(_))
        ));
        assert!(matches!(
            parse(r#"{"choices":[{"message":{"content":"  \n"}}]}"#),
            Err(AiterateError::Service(_))
        ));
    }

    #[test]
    fn cancelled_token_short_circuits_before_network() {
        let client = OpenAiClient::new("sk-test".to_string(), &AiterateConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..AiterateConfig::default()
        });
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            client.complete("hello", &cancel),
            Err(AiterateError::Cancelled)
        ));
    }
}
