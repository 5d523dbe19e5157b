use serde::{Deserialize, Serialize};

use crate::project::FileOperation;

/// One decoded server-sent event from the generation endpoint.
///
/// `Done`, `Error` and `Disconnected` are terminal: nothing follows them for
/// a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental reasoning text.
    Thinking {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// Incremental answer text. `total` is the server's running output count.
    Token {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },
    /// The pending set of file operations. Later events replace earlier ones.
    Files {
        #[serde(default)]
        files: Vec<FileOperation>,
    },
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        files: Option<Vec<FileOperation>>,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The transport failed mid-stream. Produced locally, never on the wire.
    #[serde(skip)]
    Disconnected { reason: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done { .. } | Self::Error { .. } | Self::Disconnected { .. }
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: Some(message.into()),
        }
    }

    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::Disconnected {
            reason: reason.into(),
        }
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self::Done {
            thought: None,
            message: Some(message.into()),
            files: None,
        }
    }

    pub fn token(text: impl Into<String>) -> Self {
        Self::Token {
            text: Some(text.into()),
            total: None,
        }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        Self::Thinking {
            text: Some(text.into()),
        }
    }

    /// Render as a single SSE frame, delimiter included.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!(
            "{}{}\n\n",
            crate::constants::stream::DATA_PREFIX,
            serde_json::to_string(self)?
        ))
    }
}
