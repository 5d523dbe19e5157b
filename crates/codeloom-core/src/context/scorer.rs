use std::collections::{HashMap, HashSet};

use crate::config::SelectionSettings;
use crate::constants::scoring::*;
use crate::context::history::ConversationHistory;
use crate::context::imports::ImportResolver;
use crate::project::ProjectFile;

/// Path → cumulative relevance score for one selection call.
pub type Scores = HashMap<String, u32>;

/// Ranks project files for a request using five additive passes:
/// core files, recent edits, prompt mentions, importers of recent edits,
/// and imports of high-priority files.
pub struct RelevanceScorer {
    core_files: Vec<String>,
    recent_messages: usize,
    validate_imports: bool,
    resolver: ImportResolver,
}

impl RelevanceScorer {
    pub fn new() -> Self {
        Self {
            core_files: CORE_FILES.iter().map(|p| p.to_string()).collect(),
            recent_messages: crate::constants::selection::RECENT_MESSAGES,
            validate_imports: false,
            resolver: ImportResolver::new(),
        }
    }

    pub fn from_settings(settings: &SelectionSettings) -> Self {
        Self {
            core_files: settings.core_files.clone(),
            recent_messages: settings.recent_messages,
            validate_imports: settings.validate_imports,
            resolver: ImportResolver::new(),
        }
    }

    pub fn with_core_files(mut self, core_files: Vec<String>) -> Self {
        self.core_files = core_files;
        self
    }

    pub fn with_recent_messages(mut self, count: usize) -> Self {
        self.recent_messages = count;
        self
    }

    /// Drop resolved imports that do not exist in the snapshot, probing
    /// common extensions before giving up.
    pub fn with_import_validation(mut self, enabled: bool) -> Self {
        self.validate_imports = enabled;
        self
    }

    pub fn score(
        &self,
        files: &[ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
    ) -> Scores {
        let known: HashSet<&str> = files.iter().map(|f| f.path.as_str()).collect();
        let imports = self.resolve_all_imports(files, &known);
        let mut scores = Scores::new();

        self.score_core_files(&known, &mut scores);
        let recent = self.score_recent_edits(&known, history, &mut scores);
        score_prompt_mentions(files, prompt, &mut scores);
        score_importers_of_recent(files, &imports, &recent, &mut scores);
        score_imports_of_priority(files, &imports, &known, &mut scores);

        tracing::debug!(
            candidates = files.len(),
            scored = scores.len(),
            recent = recent.len(),
            "Scored project files"
        );
        scores
    }

    fn resolve_all_imports<'a>(
        &self,
        files: &'a [ProjectFile],
        known: &HashSet<&str>,
    ) -> HashMap<&'a str, Vec<String>> {
        files
            .iter()
            .filter(|f| f.language.has_imports())
            .map(|f| {
                let mut seen = HashSet::new();
                let resolved: Vec<String> = self
                    .resolver
                    .extract_import_paths(&f.content)
                    .iter()
                    .filter_map(|spec| {
                        if self.validate_imports {
                            self.resolver.resolve_in(known, &f.path, spec)
                        } else {
                            Some(self.resolver.resolve(&f.path, spec))
                        }
                    })
                    .filter(|path| seen.insert(path.clone()))
                    .collect();
                (f.path.as_str(), resolved)
            })
            .collect()
    }

    fn score_core_files(&self, known: &HashSet<&str>, scores: &mut Scores) {
        for path in &self.core_files {
            if known.contains(path.as_str()) {
                bump(scores, path, CORE_FILE);
            }
        }
    }

    /// Returns every path touched in the inspected turns, including ones
    /// no longer present in the snapshot.
    fn score_recent_edits(
        &self,
        known: &HashSet<&str>,
        history: &ConversationHistory,
        scores: &mut Scores,
    ) -> HashSet<String> {
        let mut recent: HashMap<&str, u32> = HashMap::new();
        for (position, message) in history
            .recent_file_operations(self.recent_messages)
            .into_iter()
            .enumerate()
        {
            let weight = RECENT_EDIT_BASE.saturating_sub(RECENT_EDIT_STEP * position as u32);
            for op in message.file_operations() {
                // Most recent mention wins; older turns never stack on top.
                recent.entry(op.path.as_str()).or_insert(weight);
            }
        }

        for (path, weight) in &recent {
            if *weight > 0 && known.contains(path) {
                bump(scores, path, *weight);
            }
        }

        recent.into_keys().map(str::to_string).collect()
    }
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self::new()
    }
}

fn score_prompt_mentions(files: &[ProjectFile], prompt: &str, scores: &mut Scores) {
    let prompt = prompt.to_lowercase();
    if prompt.trim().is_empty() {
        return;
    }

    for file in files {
        let base = file.base_name().to_lowercase();
        if !base.is_empty() && prompt.contains(&base) {
            bump(scores, &file.path, PROMPT_FILE_NAME);
        }

        let segment_mentioned = file.path.split('/').any(|segment| {
            segment.chars().count() > MIN_SEGMENT_LEN && prompt.contains(&segment.to_lowercase())
        });
        if segment_mentioned {
            bump(scores, &file.path, PROMPT_PATH_SEGMENT);
        }
    }
}

fn score_importers_of_recent(
    files: &[ProjectFile],
    imports: &HashMap<&str, Vec<String>>,
    recent: &HashSet<String>,
    scores: &mut Scores,
) {
    if recent.is_empty() {
        return;
    }

    for file in files {
        if recent.contains(&file.path) {
            continue;
        }
        let imports_recent = imports
            .get(file.path.as_str())
            .is_some_and(|targets| targets.iter().any(|t| recent.contains(t)));
        if imports_recent {
            bump(scores, &file.path, IMPORTS_RECENT);
        }
    }
}

fn score_imports_of_priority(
    files: &[ProjectFile],
    imports: &HashMap<&str, Vec<String>>,
    known: &HashSet<&str>,
    scores: &mut Scores,
) {
    // Snapshot the priority set first so this pass does not feed itself.
    let priority: Vec<&str> = files
        .iter()
        .map(|f| f.path.as_str())
        .filter(|path| scores.get(*path).copied().unwrap_or(0) >= HIGH_PRIORITY)
        .collect();

    for path in priority {
        let Some(targets) = imports.get(path) else {
            continue;
        };
        for target in targets {
            if target != path && known.contains(target.as_str()) {
                bump(scores, target, IMPORTED_BY_PRIORITY);
            }
        }
    }
}

fn bump(scores: &mut Scores, path: &str, amount: u32) {
    *scores.entry(path.to_string()).or_insert(0) += amount;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::history::ConversationMessage;
    use crate::project::FileOperation;

    fn file(path: &str, content: &str) -> ProjectFile {
        ProjectFile::new(path, content)
    }

    fn edit(paths: &[&str]) -> ConversationMessage {
        ConversationMessage::assistant("done").with_files(
            paths.iter().map(|p| FileOperation::modify(*p, "x")).collect(),
        )
    }

    #[test]
    fn test_core_files_get_flat_bonus() {
        let files = vec![file("src/App.tsx", ""), file("src/other.ts", "")];
        let scores = RelevanceScorer::new().score(&files, "", &ConversationHistory::new());
        assert_eq!(scores.get("src/App.tsx"), Some(&CORE_FILE));
        assert_eq!(scores.get("src/other.ts"), None);
    }

    #[test]
    fn test_recency_decays_and_keeps_most_recent_mention() {
        let files = vec![
            file("src/a.ts", ""),
            file("src/b.ts", ""),
            file("src/c.ts", ""),
        ];
        let history = ConversationHistory::from_messages(vec![
            edit(&["src/c.ts", "src/a.ts"]),
            ConversationMessage::user("more"),
            edit(&["src/b.ts"]),
            edit(&["src/a.ts"]),
        ]);

        let scores = RelevanceScorer::new().score(&files, "", &history);
        assert_eq!(scores.get("src/a.ts"), Some(&80));
        assert_eq!(scores.get("src/b.ts"), Some(&70));
        assert_eq!(scores.get("src/c.ts"), Some(&60));
    }

    #[test]
    fn test_recency_window_is_limited() {
        let files = vec![file("src/old.ts", ""), file("src/new.ts", "")];
        let history = ConversationHistory::from_messages(vec![
            edit(&["src/old.ts"]),
            edit(&["src/new.ts"]),
        ]);

        let scores = RelevanceScorer::new()
            .with_recent_messages(1)
            .score(&files, "", &history);
        assert_eq!(scores.get("src/new.ts"), Some(&80));
        assert_eq!(scores.get("src/old.ts"), None);
    }

    #[test]
    fn test_prompt_mentions_name_and_segment() {
        let files = vec![
            file("src/components/Navbar.tsx", ""),
            file("src/components/Footer.tsx", ""),
            file("src/hooks/useTheme.ts", ""),
        ];
        let scores = RelevanceScorer::new().score(
            &files,
            "Fix the NAVBAR and the hooks folder",
            &ConversationHistory::new(),
        );
        assert_eq!(scores.get("src/components/Navbar.tsx"), Some(&PROMPT_FILE_NAME));
        assert_eq!(scores.get("src/components/Footer.tsx"), None);
        assert_eq!(scores.get("src/hooks/useTheme.ts"), Some(&PROMPT_PATH_SEGMENT));
    }

    #[test]
    fn test_importer_of_recent_edit_is_pulled_in() {
        let files = vec![
            file("src/lib/api.tsx", "export const api = 1;"),
            file("src/pages/Home.tsx", "import { api } from '../lib/api';"),
            file("src/pages/About.tsx", "import x from './x';"),
        ];
        let history = ConversationHistory::from_messages(vec![edit(&["src/lib/api.tsx"])]);

        let scores = RelevanceScorer::new().score(&files, "", &history);
        assert_eq!(scores.get("src/pages/Home.tsx"), Some(&IMPORTS_RECENT));
        assert_eq!(scores.get("src/pages/About.tsx"), None);
    }

    #[test]
    fn test_imports_of_priority_file_are_pulled_in() {
        let files = vec![
            file(
                "src/App.tsx",
                "import Navbar from './components/Navbar';\nimport { cn } from '@/lib/utils';",
            ),
            file("src/components/Navbar.tsx", ""),
            file("src/lib/utils.tsx", ""),
        ];
        let scores = RelevanceScorer::new().score(&files, "", &ConversationHistory::new());
        assert_eq!(scores.get("src/components/Navbar.tsx"), Some(&IMPORTED_BY_PRIORITY));
        assert_eq!(scores.get("src/lib/utils.tsx"), Some(&IMPORTED_BY_PRIORITY));
    }

    #[test]
    fn test_import_validation_finds_real_extension() {
        let files = vec![
            file("src/App.tsx", "import { api } from './lib/api';"),
            file("src/lib/api.ts", ""),
        ];
        let history = ConversationHistory::new();

        let lenient = RelevanceScorer::new().score(&files, "", &history);
        assert_eq!(lenient.get("src/lib/api.ts"), None);

        let strict = RelevanceScorer::new()
            .with_import_validation(true)
            .score(&files, "", &history);
        assert_eq!(strict.get("src/lib/api.ts"), Some(&IMPORTED_BY_PRIORITY));
    }
}
