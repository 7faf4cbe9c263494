mod agentic;
mod character;
mod delimiter;
mod document;
mod recursive;
mod router;
mod segmenter;
mod semantic;

pub use agentic::{AgenticSplitter, SEGMENTER_SYSTEM_PROMPT};
pub use character::CharacterSplitter;
pub use delimiter::{CustomDelimiterSplitter, TablePreservingMerger};
pub use document::DocumentAwareSplitter;
pub use recursive::RecursiveSplitter;
pub use router::StrategyRouter;
pub use segmenter::split_sentences;
pub use semantic::SemanticSplitter;

// Re-export the request/result types callers need alongside the router.
pub use cleaver_core::{
    Chunk, ChunkMeta, ChunkResult, ChunkingRequest, ChunkingStrategy, CleaverError, EngineConfig,
    FileChunks, SourceFile, StrategyConfig,
};

/// Trait for synchronous splitting strategies: one text in, ordered chunks
/// out. Async strategies (semantic, agentic) expose their own `split` since
/// they call providers.
pub trait TextSplitter: Send + Sync {
    /// Split a string into chunks.
    fn split_text(&self, text: &str) -> Vec<String>;
}

/// A strategy output segment, before the router turns it into a [`Chunk`].
/// `atomic` marks protected spans (tables, oversized structural units).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub atomic: bool,
}

impl Segment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            atomic: false,
        }
    }

    pub fn atomic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            atomic: true,
        }
    }
}

/// Character count, used everywhere sizes are measured. Chunk sizes are in
/// characters, not bytes, so multi-byte input splits cleanly.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The trailing `count` characters of `text`.
pub(crate) fn tail_chars(text: &str, count: usize) -> &str {
    let total = char_len(text);
    if total <= count {
        return text;
    }
    let skip = total - count;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Copy the trailing `overlap` characters of each chunk onto the head of
/// the next chunk.
pub(crate) fn apply_overlap(chunks: Vec<String>, overlap: usize) -> Vec<String> {
    if overlap == 0 || chunks.len() < 2 {
        return chunks;
    }
    let mut out = Vec::with_capacity(chunks.len());
    for i in 0..chunks.len() {
        if i == 0 {
            out.push(chunks[0].clone());
        } else {
            let tail = tail_chars(&chunks[i - 1], overlap);
            out.push(format!("{tail}{}", chunks[i]));
        }
    }
    out
}
