use std::sync::OnceLock;

use regex::Regex;

static SENTENCE_SPLIT_REGEX: OnceLock<Regex> = OnceLock::new();

/// Split raw text into sentence-like units.
///
/// Regex-based: a sentence runs up to `.`, `!`, `?` or `:` followed by
/// whitespace, or to end of input. Whitespace-only input yields nothing;
/// input with no terminator yields a single unit.
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let re = SENTENCE_SPLIT_REGEX.get_or_init(|| {
        Regex::new(r"(?ms)(.*?[:.!?](?:\s+|$)|.+$)").expect("valid sentence regex")
    });
    let mut sentences = Vec::new();
    for capture in re.captures_iter(text) {
        if let Some(mat) = capture.get(0) {
            let sentence = mat.as_str().trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
        }
    }
    if sentences.is_empty() {
        sentences.push(text.trim().to_string());
    }
    sentences
}
