use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use concierge_core::{CollaboratorError, LlmConfig};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

/// Completion collaborator spoken over an OpenAI-compatible
/// `/chat/completions` endpoint. The request timeout comes from config and
/// bounds every call; a timed-out call surfaces as a typed error for the
/// calling stage to absorb.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    timeout_secs: u64,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CollaboratorError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                CollaboratorError::Timeout { seconds: self.timeout_secs }
            } else {
                CollaboratorError::Transport(error.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Http { status: status.as_u16() });
        }

        let raw = response
            .text()
            .await
            .map_err(|error| CollaboratorError::Transport(error.to_string()))?;

        // Gateways occasionally answer 200 with an HTML error page.
        if raw.trim_start().starts_with('<') {
            return Err(CollaboratorError::Malformed {
                detail: "endpoint returned HTML instead of JSON".to_string(),
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&raw)
            .map_err(|error| CollaboratorError::Malformed { detail: error.to_string() })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CollaboratorError::Malformed {
                detail: "completion response carried no choices".to_string(),
            })
    }
}
