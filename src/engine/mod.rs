use crate::error::TransportError;
use serde::{Deserialize, Serialize};

pub mod http;
pub mod prompt;
pub mod replay;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One role/content pair of a chat-completion conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Something that can answer a chat conversation with text.
pub trait ModelBackend: Send + Sync {
    /// Sends the conversation and blocks until the model's reply text (or a failure) is back.
    fn complete(&self, messages: &[ChatMessage]) -> Result<String, TransportError>;

    /// Short label for logs.
    fn describe(&self) -> String {
        String::from("model backend")
    }
}
