use async_trait::async_trait;
use atrium_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request timed out")]
    Timeout,
    #[error("completion transport failure: {0}")]
    Transport(String),
    #[error("completion service returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("completion response was malformed: {0}")]
    Malformed(String),
    #[error("no API key configured for the completion service")]
    MissingApiKey,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

/// One outbound completion. `history` carries prior turns verbatim; the
/// system prompt and the current user payload bracket it.
#[derive(Clone, Debug)]
pub struct CompletionRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub history: &'a [ChatMessage],
    pub max_output_tokens: u32,
}

/// Structured-completion interface to the hosted model. The pipeline never
/// depends on the model being correct, only on the response being
/// schema-valid or absent; implementations must surface every failure as a
/// typed [`LlmError`] so stages can fail closed.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete_text(&self, request: CompletionRequest<'_>) -> Result<String, LlmError>;

    async fn complete_structured(
        &self,
        request: CompletionRequest<'_>,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, LlmError>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<SecretString>,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
        })
    }

    fn messages(&self, request: &CompletionRequest<'_>) -> Vec<Value> {
        let mut messages = vec![json!({"role": "system", "content": request.system_prompt})];
        for message in request.history {
            if matches!(message.role.as_str(), "user" | "assistant")
                && !message.content.trim().is_empty()
            {
                messages.push(json!({"role": message.role, "content": message.content}));
            }
        }
        messages.push(json!({"role": "user", "content": request.user_prompt}));
        messages
    }

    async fn post_chat(&self, body: Value) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Transport(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), message });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|error| LlmError::Malformed(error.to_string()))?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| LlmError::Malformed("missing message content".to_string()))?;
        Ok(content.to_string())
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete_text(&self, request: CompletionRequest<'_>) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": request.max_output_tokens,
            "messages": self.messages(&request),
        });
        self.post_chat(body).await
    }

    async fn complete_structured(
        &self,
        request: CompletionRequest<'_>,
        schema_name: &str,
        schema: &Value,
    ) -> Result<Value, LlmError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": request.max_output_tokens,
            "messages": self.messages(&request),
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "schema": schema,
                },
            },
        });
        let content = self.post_chat(body).await?;
        serde_json::from_str(&content).map_err(|error| LlmError::Malformed(error.to_string()))
    }
}
