pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod llm;
pub mod project;
pub mod stream;

// Re-export key types
pub use cache::ResponseCache;
pub use config::Settings;
pub use context::{
    ConversationHistory, ConversationMessage, FileSelector, ImportResolver, RelevanceScorer,
    RequestBuilder, Role, ScoredFile, SelectionLimits, SelectionResult, TokenEstimator,
};
pub use error::{LoomError, Result};
pub use llm::{GenerationRequest, GenerationSession, GenerationTransport, HttpTransport};
pub use project::{FileAction, FileOperation, Language, ProjectFile};
pub use stream::{
    decode_events, AssembledResponse, ResponseAssembler, SseDecoder, StreamEvent, StreamProgress,
};
