use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Css,
    Html,
    Json,
    Markdown,
    Other,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "ts" | "tsx" | "mts" | "cts" => Self::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "css" | "scss" => Self::Css,
            "html" | "htm" => Self::Html,
            "json" => Self::Json,
            "md" | "mdx" => Self::Markdown,
            _ => Self::Other,
        }
    }

    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(&ext.to_lowercase()),
            _ => Self::Other,
        }
    }

    /// Whether files of this language may carry JS module imports.
    pub fn has_imports(&self) -> bool {
        !matches!(self, Self::Css | Self::Json | Self::Markdown)
    }
}

/// A read-only snapshot of one file owned by the project store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Project-relative, forward-slash separated. Unique within a snapshot.
    pub path: String,
    pub content: String,
    pub language: Language,
}

impl ProjectFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let language = Language::from_path(&path);
        Self {
            path,
            content: content.into(),
            language,
        }
    }

    /// File name without directories or extension: `src/components/Navbar.tsx` → `Navbar`.
    pub fn base_name(&self) -> &str {
        base_name(&self.path)
    }
}

pub(crate) fn base_name(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Create,
    Modify,
    Delete,
}

/// A change the model asks the project store to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    pub path: String,
    #[serde(default)]
    pub content: String,
    pub action: FileAction,
}

impl FileOperation {
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            action: FileAction::Create,
        }
    }

    pub fn modify(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            action: FileAction::Modify,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: String::new(),
            action: FileAction::Delete,
        }
    }
}
