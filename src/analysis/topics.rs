//! Keyword frequency tables
//!
//! A [`TopicTable`] keeps every counted keyword in first-seen order so that
//! tables from many files can be merged and re-ranked without losing the
//! tail that a top-10 cut would throw away.

use std::collections::HashMap;

/// Maximum keywords reported per result
pub const MAX_TOPICS: usize = 10;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "be", "을", "를", "이", "가", "에", "에서", "로",
    "으로", "의", "도", "는", "은", "하다", "하고", "있다", "되다", "이다", "그", "저", "것",
];

/// Untruncated keyword counts in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicTable {
    entries: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl TopicTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every qualifying keyword in `text`
    pub fn add_text(&mut self, text: &str) {
        for word in keywords(text) {
            self.add(word, 1);
        }
    }

    pub fn add(&mut self, word: String, count: usize) {
        match self.index.get(&word) {
            Some(&i) => self.entries[i].1 += count,
            None => {
                self.index.insert(word.clone(), self.entries.len());
                self.entries.push((word, count));
            }
        }
    }

    /// Fold `other` in; words new to `self` keep `other`'s relative order
    pub fn merge(&mut self, other: &TopicTable) {
        for (word, count) in &other.entries {
            self.add(word.clone(), *count);
        }
    }

    pub fn count(&self, word: &str) -> usize {
        self.index.get(word).map_or(0, |&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most frequent words, ties in first-seen order
    pub fn top(&self, n: usize) -> Vec<String> {
        let mut ranked: Vec<&(String, usize)> = self.entries.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(n)
            .map(|(word, _)| word.clone())
            .collect()
    }
}

/// Lower-cased keywords of a message, stop words and short tokens removed.
///
/// ASCII letters, digits, `_` and Hangul syllables survive; everything else
/// becomes a separator.
pub fn keywords(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() || is_hangul_syllable(c)
            {
                c
            } else {
                ' '
            }
        })
        .collect();

    normalized
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}
