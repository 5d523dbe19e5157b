use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::context::Role;
use crate::error::LoomError;

/// A file as sent to the model: path plus (possibly truncated) content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: Role,
    pub content: String,
}

/// Payload for one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub files: Vec<RequestFile>,
    #[serde(default)]
    pub history: Vec<RequestMessage>,
}

/// Raw response body chunks. A read error ends the body.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, LoomError>>;

/// Opens a streaming generation call. Implementations own retries and
/// timeouts; the decoding pipeline never retries.
#[async_trait::async_trait]
pub trait GenerationTransport: Send + Sync {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<ByteStream, LoomError>;
}
