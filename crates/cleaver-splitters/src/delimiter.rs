use cleaver_core::CustomDelimiterConfig;

use crate::document::table_extent;
use crate::{char_len, Segment};

/// Level 6: literal delimiter splitting.
///
/// Splits on an exact delimiter string with optional case-insensitive
/// matching, delimiter retention and whitespace trimming. An empty delimiter
/// leaves the text as a single segment.
pub struct CustomDelimiterSplitter {
    delimiter: String,
    include_delimiter: bool,
    trim_whitespace: bool,
    case_sensitive: bool,
}

impl CustomDelimiterSplitter {
    pub fn new(config: &CustomDelimiterConfig) -> Self {
        Self {
            delimiter: unescape(&config.delimiter),
            include_delimiter: config.include_delimiter,
            trim_whitespace: config.trim_whitespace,
            case_sensitive: config.case_sensitive,
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return vec![];
        }
        if self.delimiter.is_empty() {
            return vec![text.to_string()];
        }

        let mut segments = Vec::new();
        let mut cursor = 0;
        while let Some(pos) = self.find(text, cursor) {
            let end = pos + self.delimiter.len();
            self.push_segment(&mut segments, &text[cursor..pos], &text[pos..end]);
            cursor = end;
        }
        self.push_segment(&mut segments, &text[cursor..], "");
        segments
    }

    fn push_segment(&self, segments: &mut Vec<String>, piece: &str, matched: &str) {
        if piece.is_empty() {
            return;
        }
        let mut segment = piece.to_string();
        if self.trim_whitespace {
            segment = segment.trim().to_string();
        }
        if segment.is_empty() {
            return;
        }
        if self.include_delimiter {
            segment.push_str(matched);
        }
        segments.push(segment);
    }

    /// Byte-level search. Case-insensitive matching folds ASCII only, so
    /// every hit starts and ends on a char boundary.
    fn find(&self, text: &str, from: usize) -> Option<usize> {
        let haystack = text.as_bytes();
        let needle = self.delimiter.as_bytes();
        if from + needle.len() > haystack.len() {
            return None;
        }
        for i in from..=haystack.len() - needle.len() {
            let window = &haystack[i..i + needle.len()];
            let hit = if self.case_sensitive {
                window == needle
            } else {
                window.eq_ignore_ascii_case(needle)
            };
            if hit {
                return Some(i);
            }
        }
        None
    }
}

/// Escape sequences accepted in wire-level delimiter strings.
fn unescape(delimiter: &str) -> String {
    delimiter
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
}

/// Level 7: delimiter splitting with size-aware merging that leaves markdown
/// tables alone.
///
/// Table spans are lifted out as atomic segments before the delimiter runs.
/// The remaining delimiter segments are merged up to the chunk size; a
/// segment under half the chunk size always absorbs its successor, even past
/// the size limit, so the output avoids fragment-sized chunks.
pub struct TablePreservingMerger {
    chunk_size: usize,
    joiner: String,
    splitter: CustomDelimiterSplitter,
}

impl TablePreservingMerger {
    pub fn new(chunk_size: usize, config: &CustomDelimiterConfig) -> Self {
        let splitter = CustomDelimiterSplitter::new(config);
        // When the delimiter is dropped from segments, merging re-inserts it
        // so merged text still reads like the source.
        let joiner = if config.include_delimiter {
            String::new()
        } else {
            unescape(&config.delimiter)
        };
        Self {
            chunk_size,
            joiner,
            splitter,
        }
    }

    /// Returns the segments plus the number of delimiter segments merged
    /// away.
    pub fn split(&self, text: &str) -> (Vec<Segment>, usize) {
        let mut segments = Vec::new();
        let mut merged_count = 0;
        for part in partition_tables(text) {
            match part {
                Part::Table(table) => segments.push(Segment::atomic(table)),
                Part::Text(body) => {
                    let pieces = self.splitter.split(&body);
                    let before = pieces.len();
                    let merged = self.merge(pieces);
                    merged_count += before - merged.len();
                    segments.extend(merged.into_iter().map(Segment::text));
                }
            }
        }
        (segments, merged_count)
    }

    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut current = String::new();
        for piece in pieces {
            if current.is_empty() {
                current = piece;
                continue;
            }
            let combined = char_len(&current) + char_len(&self.joiner) + char_len(&piece);
            let undersized = char_len(&current) < self.chunk_size / 2;
            if combined <= self.chunk_size || undersized {
                current.push_str(&self.joiner);
                current.push_str(&piece);
            } else {
                out.push(std::mem::take(&mut current));
                current = piece;
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }
}

enum Part {
    Text(String),
    Table(String),
}

/// Partition the input into alternating plain-text and table parts, in
/// source order.
fn partition_tables(text: &str) -> Vec<Part> {
    let lines: Vec<&str> = text.lines().collect();
    let mut parts = Vec::new();
    let mut plain: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if let Some(end) = table_extent(&lines, i) {
            if !plain.is_empty() {
                parts.push(Part::Text(plain.join("\n")));
                plain.clear();
            }
            parts.push(Part::Table(lines[i..end].join("\n")));
            i = end;
        } else {
            plain.push(lines[i]);
            i += 1;
        }
    }
    if !plain.is_empty() {
        parts.push(Part::Text(plain.join("\n")));
    }
    parts
}
