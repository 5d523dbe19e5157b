use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{cache, endpoints, scoring, selection};
use crate::context::SelectionLimits;
use crate::error::{LoomError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub selection: SelectionSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub endpoint: EndpointSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub max_files: usize,
    pub max_tokens: usize,
    /// Per-file character ceiling applied when the request is built.
    pub max_file_chars: usize,
    /// Assistant turns inspected for recently edited files.
    pub recent_messages: usize,
    /// Conversation messages forwarded with each request.
    pub history_messages: usize,
    pub core_files: Vec<String>,
    /// Only trust resolved imports that exist in the project snapshot.
    pub validate_imports: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub capacity: usize,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub base_url: String,
    pub path: String,
    pub api_key_env: String,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            max_files: selection::DEFAULT_MAX_FILES,
            max_tokens: selection::DEFAULT_MAX_TOKENS,
            max_file_chars: selection::MAX_FILE_CHARS,
            recent_messages: selection::RECENT_MESSAGES,
            history_messages: selection::HISTORY_MESSAGES,
            core_files: scoring::CORE_FILES.iter().map(|p| p.to_string()).collect(),
            validate_imports: false,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: cache::CAPACITY,
            ttl_secs: cache::TTL_SECS,
        }
    }
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            base_url: endpoints::BASE_URL.to_string(),
            path: endpoints::GENERATE_PATH.to_string(),
            api_key_env: endpoints::API_KEY_ENV.to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("codeloom")
            .join("config.toml")
    }

    /// Load from the default location, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "Ignoring invalid config");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| LoomError::Config(e.to_string()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| LoomError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn selection_limits(&self) -> Result<SelectionLimits> {
        SelectionLimits::new(self.selection.max_files, self.selection.max_tokens)
    }

    /// The API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        if self.endpoint.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.endpoint.api_key_env).ok()
    }

    pub fn endpoint_url(&self) -> String {
        format!(
            "{}{}",
            self.endpoint.base_url.trim_end_matches('/'),
            self.endpoint.path
        )
    }
}
