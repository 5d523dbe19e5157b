use crate::config::SelectionSettings;
use crate::constants::selection::{HISTORY_MESSAGES, MAX_FILE_CHARS};
use crate::context::history::ConversationHistory;
use crate::llm::{GenerationRequest, RequestFile, RequestMessage};
use crate::project::ProjectFile;

const TRUNCATION_MARKER: &str = "\n/* ... truncated ... */";

/// Builds the request payload from selected files, history and the user prompt.
pub struct RequestBuilder {
    system_prompt: Option<String>,
    files: Vec<RequestFile>,
    history: Vec<RequestMessage>,
    prompt: String,
    max_file_chars: usize,
    history_messages: usize,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            system_prompt: None,
            files: Vec::new(),
            history: Vec::new(),
            prompt: String::new(),
            max_file_chars: MAX_FILE_CHARS,
            history_messages: HISTORY_MESSAGES,
        }
    }

    pub fn from_settings(settings: &SelectionSettings) -> Self {
        Self {
            max_file_chars: settings.max_file_chars,
            history_messages: settings.history_messages,
            ..Self::new()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_max_file_chars(mut self, max_chars: usize) -> Self {
        self.max_file_chars = max_chars;
        self
    }

    /// Add a file, cutting its content at the per-file character ceiling.
    pub fn add_file(mut self, file: &ProjectFile) -> Self {
        self.files.push(RequestFile {
            path: file.path.clone(),
            content: truncate_chars(&file.content, self.max_file_chars),
        });
        self
    }

    pub fn add_files<'a>(self, files: impl IntoIterator<Item = &'a ProjectFile>) -> Self {
        files.into_iter().fold(self, |builder, file| builder.add_file(file))
    }

    /// Forward the tail of the conversation.
    pub fn with_history(mut self, history: &ConversationHistory) -> Self {
        self.history = history
            .tail(self.history_messages)
            .iter()
            .map(|m| RequestMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();
        self
    }

    pub fn build(self) -> GenerationRequest {
        GenerationRequest {
            system_prompt: self.system_prompt,
            prompt: self.prompt,
            files: self.files,
            history: self.history,
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_chars(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &content[..cut], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}
