//! Small text helpers used by both agreement strategies.

use crate::words::Word;

/// Split text into word tokens on whitespace runs, dropping empty tokens
/// and preserving order.
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Join word texts with single spaces.
pub fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-insensitive token equality. Agreement between two decoding passes
/// should not hinge on capitalization jitter near the window edge.
pub fn tokens_equal_fold(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
