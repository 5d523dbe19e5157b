use serde::Serialize;

use crate::config::SelectionSettings;
use crate::constants::scoring::MUST_INCLUDE;
use crate::constants::selection::{
    DEFAULT_MAX_FILES, DEFAULT_MAX_TOKENS, LIMIT_WARNING_PERCENT, MIN_CONTEXT_FILES,
};
use crate::context::history::ConversationHistory;
use crate::context::scorer::RelevanceScorer;
use crate::context::tokens::TokenEstimator;
use crate::error::{LoomError, Result};
use crate::project::ProjectFile;

/// Validated limits for one selection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    max_files: usize,
    max_tokens: usize,
}

impl SelectionLimits {
    /// `max_files` must be at least one; an empty context is never useful.
    pub fn new(max_files: usize, max_tokens: usize) -> Result<Self> {
        if max_files == 0 {
            return Err(LoomError::InvalidLimit(
                "max_files must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_files,
            max_tokens,
        })
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredFile {
    pub path: String,
    pub score: u32,
}

/// Files chosen for one request, most relevant first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionResult {
    pub files: Vec<ProjectFile>,
    pub total_tokens: usize,
    pub files_omitted: usize,
    pub token_limit_reached: bool,
}

/// Budget-aware greedy file selection on top of [`RelevanceScorer`].
pub struct FileSelector {
    scorer: RelevanceScorer,
}

impl FileSelector {
    pub fn new(scorer: RelevanceScorer) -> Self {
        Self { scorer }
    }

    pub fn from_settings(settings: &SelectionSettings) -> Self {
        Self::new(RelevanceScorer::from_settings(settings))
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    /// Candidates ordered by descending score. Ties keep snapshot order.
    pub fn rank(
        &self,
        files: &[ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
    ) -> Vec<ScoredFile> {
        self.ranked_files(files, prompt, history)
            .into_iter()
            .map(|(file, score)| ScoredFile {
                path: file.path.clone(),
                score,
            })
            .collect()
    }

    fn ranked_files<'a>(
        &self,
        files: &'a [ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
    ) -> Vec<(&'a ProjectFile, u32)> {
        let scores = self.scorer.score(files, prompt, history);
        let mut ranked: Vec<(&ProjectFile, u32)> = files
            .iter()
            .map(|f| (f, scores.get(&f.path).copied().unwrap_or(0)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    pub fn select(
        &self,
        files: &[ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
        limits: SelectionLimits,
    ) -> Vec<ProjectFile> {
        self.select_scored(files, prompt, history, limits)
            .into_iter()
            .map(|(file, _, _)| file.clone())
            .collect()
    }

    pub fn select_with_stats(
        &self,
        files: &[ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
        limits: SelectionLimits,
    ) -> SelectionResult {
        let selected = self.select_scored(files, prompt, history, limits);
        let total_tokens: usize = selected.iter().map(|(_, _, tokens)| tokens).sum();
        let token_limit_reached = !selected.is_empty()
            && total_tokens.saturating_mul(100)
                >= limits.max_tokens().saturating_mul(LIMIT_WARNING_PERCENT);

        let result = SelectionResult {
            files_omitted: files.len() - selected.len(),
            files: selected.into_iter().map(|(file, _, _)| file.clone()).collect(),
            total_tokens,
            token_limit_reached,
        };

        tracing::debug!(
            selected = result.files.len(),
            omitted = result.files_omitted,
            total_tokens = result.total_tokens,
            limit_reached = result.token_limit_reached,
            "Selected context files"
        );
        if result.token_limit_reached {
            tracing::warn!(
                total_tokens = result.total_tokens,
                max_tokens = limits.max_tokens(),
                "Context selection is at or over the token budget"
            );
        }
        result
    }

    /// Greedy walk over the ranking. Returns `(file, score, tokens)` in
    /// descending score order.
    fn select_scored<'a>(
        &self,
        files: &'a [ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
        limits: SelectionLimits,
    ) -> Vec<(&'a ProjectFile, u32, usize)> {
        let mut selected: Vec<(&ProjectFile, u32, usize)> = Vec::new();
        let mut total_tokens = 0usize;

        for (file, score) in self.ranked_files(files, prompt, history) {
            if selected.len() >= limits.max_files() {
                break;
            }

            let tokens = TokenEstimator::estimate(&file.content);
            let must_include = score >= MUST_INCLUDE;
            let fits = total_tokens + tokens <= limits.max_tokens();
            let below_minimum = selected.len() < MIN_CONTEXT_FILES;

            if must_include || fits || below_minimum {
                total_tokens += tokens;
                selected.push((file, score, tokens));
            } else {
                tracing::trace!(path = %file.path, tokens, "Skipped file over token budget");
            }
        }

        selected.sort_by(|a, b| b.1.cmp(&a.1));
        selected
    }
}

impl Default for FileSelector {
    fn default() -> Self {
        Self::new(RelevanceScorer::new())
    }
}
