use crate::TextSplitter;

/// Level 1: fixed-width sliding-window slicing.
///
/// Emits windows of `chunk_size` characters advancing by
/// `chunk_size - chunk_overlap` per step; the final window may be shorter.
/// No awareness of word or sentence boundaries.
pub struct CharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl CharacterSplitter {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap: 0,
        }
    }

    pub fn with_chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }
}

impl TextSplitter for CharacterSplitter {
    fn split_text(&self, text: &str) -> Vec<String> {
        windowed(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Character-based sliding windows. Shared with the strategies that
/// re-window oversized pieces. Overlap is defensively clamped below `size`;
/// the router rejects `overlap >= size` before any splitter runs.
pub(crate) fn windowed(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if size == 0 {
        return if text.is_empty() {
            vec![]
        } else {
            vec![text.to_string()]
        };
    }
    let overlap = if overlap >= size { size - 1 } else { overlap };

    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < n {
        let end = (start + size).min(n);
        chunks.push(chars[start..end].iter().collect());
        if end >= n {
            break;
        }
        start = end - overlap;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        let splitter = CharacterSplitter::new(100);
        assert!(splitter.split_text("").is_empty());
    }

    #[test]
    fn short_text_single_chunk() {
        let splitter = CharacterSplitter::new(100);
        assert_eq!(splitter.split_text("short text"), vec!["short text"]);
    }

    #[test]
    fn windows_advance_by_size_minus_overlap() {
        let splitter = CharacterSplitter::new(1000).with_chunk_overlap(100);
        let text = "A".repeat(2500);
        let chunks = splitter.split_text(&text);
        let lengths: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lengths, vec![1000, 1000, 700]);
    }

    #[test]
    fn boundaries_can_fall_mid_word() {
        let splitter = CharacterSplitter::new(5);
        let chunks = splitter.split_text("hello world");
        assert_eq!(chunks, vec!["hello", " worl", "d"]);
    }

    #[test]
    fn multibyte_input_splits_on_char_boundaries() {
        let splitter = CharacterSplitter::new(2);
        let chunks = splitter.split_text("日本語のテキスト");
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], "日本");
    }
}
