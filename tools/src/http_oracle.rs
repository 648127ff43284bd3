//! HTTP-backed `OracleClient` speaking the OpenAI-compatible chat
//! completions wire format. Grounded in
//! `src/llm/adapters/openai.rs`'s `OpenAiAdapter` — same request shape
//! (`model`/`messages`/ role-tagged turns) and response extraction
//! (`choices[0].message.content`), generalized from the teacher's
//! synchronous `ureq`-based transport to an async `reqwest::Client` since
//! this oracle is called from axum request handlers, not a TUI main
//! thread.

use std::time::Duration;

use agent_core::ports::{OracleClient, OracleError, OracleMessage, OracleRole};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct HttpOracleClient {
    base_url: String,
    model: String,
    api_key: String,
    http: reqwest::Client,
}

impl HttpOracleClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_timeout(base_url, model, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with a well-formed timeout");
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            http,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

fn role_str(role: OracleRole) -> &'static str {
    match role {
        OracleRole::System => "system",
        OracleRole::User => "user",
        OracleRole::Assistant => "assistant",
    }
}

#[async_trait]
impl OracleClient for HttpOracleClient {
    async fn chat(
        &self,
        messages: &[OracleMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let wire_messages: Vec<WireMessage> = messages
            .iter()
            .map(|m| WireMessage {
                role: role_str(m.role),
                content: &m.content,
            })
            .collect();

        let body = ChatRequest {
            model: &self.model,
            messages: wire_messages,
            temperature,
            max_tokens,
            stream: false,
        };

        debug!(model = %self.model, message_count = messages.len(), "calling oracle");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    warn!(url, "oracle request timed out");
                    OracleError::Timeout
                } else {
                    warn!(url, error = %e, "oracle request failed");
                    OracleError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "oracle returned a non-success status");
            return Err(OracleError::Transport(format!(
                "oracle returned HTTP {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Transport(format!("invalid oracle response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OracleError::Transport("oracle response had no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_str_maps_all_variants() {
        assert_eq!(role_str(OracleRole::System), "system");
        assert_eq!(role_str(OracleRole::User), "user");
        assert_eq!(role_str(OracleRole::Assistant), "assistant");
    }

    #[test]
    fn client_construction_does_not_panic() {
        let _client = HttpOracleClient::new("https://api.example.com/v1", "gpt-4", "sk-test");
    }
}
