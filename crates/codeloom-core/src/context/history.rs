use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::project::FileOperation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One immutable turn of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileOperation>>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            thought: None,
            files: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            thought: None,
            files: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_thought(mut self, thought: impl Into<String>) -> Self {
        self.thought = Some(thought.into());
        self
    }

    pub fn with_files(mut self, files: Vec<FileOperation>) -> Self {
        self.files = Some(files);
        self
    }

    /// File operations attached to this message, empty when there are none.
    pub fn file_operations(&self) -> &[FileOperation] {
        self.files.as_deref().unwrap_or(&[])
    }
}

/// Append-only, ordered conversation log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ConversationMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(ConversationMessage::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(ConversationMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// The last `count` messages in chronological order.
    pub fn tail(&self, count: usize) -> &[ConversationMessage] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }

    /// Up to `limit` assistant messages that carry file operations, most recent first.
    pub fn recent_file_operations(&self, limit: usize) -> Vec<&ConversationMessage> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == Role::Assistant && !m.file_operations().is_empty())
            .take(limit)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }
}

impl From<Vec<ConversationMessage>> for ConversationHistory {
    fn from(messages: Vec<ConversationMessage>) -> Self {
        Self::from_messages(messages)
    }
}
