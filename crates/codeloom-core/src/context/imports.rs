use regex::Regex;
use std::collections::HashSet;

use crate::constants::imports::{DEFAULT_EXTENSION, PROBE_SUFFIXES, ROOT_ALIAS, SOURCE_ROOT};

/// Heuristic resolver for JS/TS module imports.
///
/// This is not a module resolver: it never consults `package.json`, `tsconfig`
/// paths or the filesystem, and it guesses `.tsx` for extensionless specifiers.
/// Bare package imports (`react`, `@tanstack/query`) are ignored entirely.
pub struct ImportResolver {
    static_import: Regex,
    dynamic_import: Regex,
}

impl ImportResolver {
    pub fn new() -> Self {
        Self {
            static_import: Regex::new(r#"import\s+[^'";]+?\s+from\s+['"]([^'"]+)['"]"#)
                .expect("static import pattern is valid"),
            dynamic_import: Regex::new(r#"import\(\s*['"]([^'"]+)['"]\s*\)"#)
                .expect("dynamic import pattern is valid"),
        }
    }

    /// Project-local import specifiers in source order, duplicates removed.
    pub fn extract_import_paths(&self, source: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.static_import
            .captures_iter(source)
            .chain(self.dynamic_import.captures_iter(source))
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|spec| is_project_specifier(spec))
            .filter(|spec| seen.insert(*spec))
            .map(str::to_string)
            .collect()
    }

    /// Canonical project path for `specifier` as imported from `from_path`.
    ///
    /// Paths that climb above the project root are clamped rather than rejected.
    pub fn resolve(&self, from_path: &str, specifier: &str) -> String {
        let joined = if let Some(rest) = specifier.strip_prefix(ROOT_ALIAS) {
            normalize_segments(SOURCE_ROOT.split('/').chain(rest.split('/')))
        } else {
            let dir = from_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            normalize_segments(dir.split('/').chain(specifier.split('/')))
        };

        if has_extension(&joined) {
            joined
        } else {
            format!("{joined}{DEFAULT_EXTENSION}")
        }
    }

    /// Resolve every project import of `source`.
    pub fn resolve_imports(&self, from_path: &str, source: &str) -> Vec<String> {
        self.extract_import_paths(source)
            .iter()
            .map(|spec| self.resolve(from_path, spec))
            .collect()
    }

    /// Like [`resolve`](Self::resolve), but only returns paths present in `known`.
    ///
    /// Extensionless specifiers are probed with common suffixes so that
    /// `./api` can find `api.ts` or `api/index.ts`.
    pub fn resolve_in(
        &self,
        known: &HashSet<&str>,
        from_path: &str,
        specifier: &str,
    ) -> Option<String> {
        let guessed = self.resolve(from_path, specifier);
        if known.contains(guessed.as_str()) {
            return Some(guessed);
        }

        let last_segment = specifier.rsplit('/').next().unwrap_or(specifier);
        if has_extension(last_segment) {
            return None;
        }

        let stem = guessed.strip_suffix(DEFAULT_EXTENSION)?;
        PROBE_SUFFIXES
            .iter()
            .map(|suffix| format!("{stem}{suffix}"))
            .find(|candidate| known.contains(candidate.as_str()))
    }
}

impl Default for ImportResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn is_project_specifier(spec: &str) -> bool {
    spec.starts_with("./") || spec.starts_with("../") || spec.starts_with(ROOT_ALIAS)
}

fn normalize_segments<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

fn has_extension(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    matches!(file_name.rsplit_once('.'), Some((stem, ext)) if !stem.is_empty() && !ext.is_empty())
}
