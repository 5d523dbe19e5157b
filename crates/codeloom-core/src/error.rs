use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoomError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid selection limit: {0}")]
    InvalidLimit(String),

    /// The model reported a terminal `error` event.
    #[error("Generation failed: {0}")]
    Stream(String),

    #[error("Stream ended before a completion event was received")]
    IncompleteStream,
}

impl LoomError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

pub type Result<T> = std::result::Result<T, LoomError>;
