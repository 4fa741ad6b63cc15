use crate::engine::{ChatMessage, ModelBackend};
use crate::error::TransportError;
use crate::model::config::ModelConfig;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for an OpenAI-style chat-completion endpoint.
#[derive(Clone)]
pub struct HttpBackend {
    config: ModelConfig,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(config: ModelConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();

        if config.api_key.is_none() {
            warn!("No API key configured, requests will be sent without credentials..!");
        }

        Self { config, agent }
    }
}

impl ModelBackend for HttpBackend {
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, TransportError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut request = self
            .agent
            .post(&self.config.endpoint)
            .set("Content-Type", "application/json");

        if let Some(key) = self.config.api_key.as_deref() {
            request = request.set("Authorization", &format!("Bearer {}", key));
        }

        debug!(
            "POST {} (model: {}, max_tokens: {}, temperature: {})",
            self.config.endpoint, self.config.model, self.config.max_tokens, self.config.temperature
        );

        let response = match request.send_json(&body) {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(TransportError::Status { status, body });
            }
            Err(why) => return Err(TransportError::Request(why.to_string())),
        };

        if response.status() != 200 {
            let status = response.status();
            let body = response.into_string().unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let text = response
            .into_string()
            .map_err(|e| TransportError::Envelope(e.to_string()))?;

        extract_content(&text)
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.config.model, self.config.endpoint)
    }
}

/// Pulls the first choice's message text out of a chat-completion response body.
fn extract_content(body: &str) -> Result<String, TransportError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Envelope(e.to_string()))?;

    let Some(choice) = parsed.choices.into_iter().next() else {
        return Err(TransportError::Envelope("response has no choices".into()));
    };

    let Some(content) = choice.message.content else {
        return Err(TransportError::Envelope(
            "first choice has no message content".into(),
        ));
    };

    Ok(content.trim().to_owned())
}
