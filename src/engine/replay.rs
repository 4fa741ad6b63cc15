use crate::engine::{ChatMessage, ModelBackend};
use crate::error::TransportError;
use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

/// Answers every conversation with the same saved response text. Used to re-run recovery and
/// encoding on a response captured earlier, without touching the network.
#[derive(Debug, Clone)]
pub struct ReplayBackend {
    text: String,
    source: Option<PathBuf>,
}

impl ReplayBackend {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow!(
                "Failed to read saved response {}: {}",
                path.as_ref().display(),
                e
            )
        })?;

        Ok(Self {
            text,
            source: Some(path.as_ref().to_path_buf()),
        })
    }
}

impl ModelBackend for ReplayBackend {
    fn complete(&self, _messages: &[ChatMessage]) -> Result<String, TransportError> {
        Ok(self.text.trim().to_owned())
    }

    fn describe(&self) -> String {
        match &self.source {
            Some(path) => format!("saved response '{}'", path.display()),
            None => String::from("saved response"),
        }
    }
}
