use crate::constants::tokens::{CHARS_PER_TOKEN, CODE_CHARS, CODE_DENSITY_FACTOR};

/// Character-count approximation of model token cost.
///
/// Code packs more tokens per character than prose, so text containing any
/// punctuation typical of source code is scaled up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenEstimator;

impl TokenEstimator {
    pub fn estimate(text: &str) -> usize {
        let normalized_len = normalized_char_count(text);
        if normalized_len == 0 {
            return 0;
        }

        let base = (normalized_len as f64 / CHARS_PER_TOKEN).ceil();
        if text.contains(CODE_CHARS) {
            (base * CODE_DENSITY_FACTOR).ceil() as usize
        } else {
            base as usize
        }
    }

    pub fn estimate_all<'a>(texts: impl IntoIterator<Item = &'a str>) -> usize {
        texts.into_iter().map(Self::estimate).sum()
    }
}

/// Length of `text` after collapsing whitespace runs to one space and trimming.
fn normalized_char_count(text: &str) -> usize {
    let mut count = 0usize;
    let mut words = 0usize;
    for word in text.split_whitespace() {
        count += word.chars().count();
        words += 1;
    }
    count + words.saturating_sub(1)
}
