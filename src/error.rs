use thiserror::Error;

/// The remote model could not be reached or answered with something unusable.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Malformed model response: {0}")]
    Envelope(String),
}

/// No recovery strategy produced a non-empty note array. This is an expected outcome for a
/// badly mangled response and is reported as a value, never as a panic.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryError {
    #[error("Response contains no notes array")]
    MissingNotesArray,

    #[error("Notes array is empty")]
    EmptyNotes,

    #[error("No prefix of the notes array could be parsed")]
    Unrecoverable,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error("Encoding failed: {0:#}")]
    Encoding(anyhow::Error),

    #[error("Generation was cancelled")]
    Cancelled,
}
