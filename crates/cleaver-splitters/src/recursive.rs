use crate::character::windowed;
use crate::{apply_overlap, char_len, TextSplitter};

fn default_separators() -> Vec<String> {
    vec![
        "\n\n".to_string(),
        "\n".to_string(),
        ". ".to_string(),
        ", ".to_string(),
        " ".to_string(),
        String::new(),
    ]
}

/// Level 2: separator-priority recursive splitting.
///
/// Splits on the first separator in the list; pieces still exceeding the
/// size budget recurse with the next separator. The empty-string separator
/// is the terminal fallback, equivalent to character splitting. Undersized
/// adjacent pieces are greedily merged, then overlap is reconstructed by
/// copying each chunk's tail onto the head of its successor.
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
    keep_separator: bool,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap: 0,
            separators: default_separators(),
            keep_separator: true,
        }
    }

    pub fn with_chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn with_keep_separator(mut self, keep_separator: bool) -> Self {
        self.keep_separator = keep_separator;
        self
    }

    /// Size budget for the split/merge passes. Reserving the overlap here
    /// keeps every final chunk within `chunk_size` after the overlap tail
    /// is prepended.
    fn budget(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }

    fn split_recursive(&self, text: &str, depth: usize) -> Vec<String> {
        let budget = self.budget();
        if char_len(text) <= budget {
            return vec![text.to_string()];
        }
        let Some(separator) = self.separators.get(depth) else {
            // Separator list exhausted without the "" terminal: the piece
            // stays intact even though it exceeds the budget.
            return vec![text.to_string()];
        };
        if separator.is_empty() {
            return windowed(text, budget, 0);
        }

        let mut pieces = Vec::new();
        for piece in split_on(text, separator, self.keep_separator) {
            if char_len(&piece) > budget {
                pieces.extend(self.split_recursive(&piece, depth + 1));
            } else {
                pieces.push(piece);
            }
        }
        pieces
    }

    fn merge_pieces(&self, pieces: Vec<String>) -> Vec<String> {
        let budget = self.budget();
        let mut chunks = Vec::new();
        let mut current = String::new();
        for piece in pieces {
            if piece.is_empty() {
                continue;
            }
            if !current.is_empty() && char_len(&current) + char_len(&piece) > budget {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(&piece);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

impl TextSplitter for RecursiveSplitter {
    fn split_text(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return vec![];
        }
        let pieces = self.split_recursive(text, 0);
        let merged = self.merge_pieces(pieces);
        apply_overlap(merged, self.chunk_overlap)
    }
}

/// Split on a literal separator. With `keep` set, the separator stays
/// attached to the piece that precedes it, so concatenating the pieces
/// reconstructs the input exactly.
fn split_on(text: &str, separator: &str, keep: bool) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(separator) {
        let end = pos + separator.len();
        let piece = if keep { &rest[..end] } else { &rest[..pos] };
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}
