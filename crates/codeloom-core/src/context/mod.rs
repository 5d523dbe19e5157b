mod builder;
mod history;
pub mod imports;
pub mod scorer;
pub mod selector;
pub mod tokens;

pub use builder::RequestBuilder;
pub use history::{ConversationHistory, ConversationMessage, Role};
pub use imports::ImportResolver;
pub use scorer::{RelevanceScorer, Scores};
pub use selector::{FileSelector, ScoredFile, SelectionLimits, SelectionResult};
pub use tokens::TokenEstimator;
