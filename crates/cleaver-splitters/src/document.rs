use std::sync::OnceLock;

use regex::Regex;

use cleaver_core::{DocumentSpecificConfig, DocumentType};

use crate::{char_len, RecursiveSplitter, Segment, TextSplitter};

/// A structural unit found by the per-format scanners, before packing.
struct Block {
    text: String,
    /// Atomic blocks are emitted as their own segment and never merged or
    /// re-split, even when they exceed the chunk size.
    atomic: bool,
}

impl Block {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            atomic: false,
        }
    }

    fn atomic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            atomic: true,
        }
    }
}

/// Level 3: structure-aware splitting.
///
/// Scans the document for structural units (headers, code fences, tables,
/// lists, images, links) according to its declared type, keeps the protected
/// units intact, and packs everything else up to the chunk size. Unknown
/// document types degrade to recursive splitting.
pub struct DocumentAwareSplitter {
    chunk_size: usize,
    config: DocumentSpecificConfig,
}

impl DocumentAwareSplitter {
    pub fn new(chunk_size: usize, config: DocumentSpecificConfig) -> Self {
        Self { chunk_size, config }
    }

    pub fn split(&self, text: &str) -> Vec<Segment> {
        if text.trim().is_empty() {
            return vec![];
        }
        let blocks = match DocumentType::parse(&self.config.document_type) {
            DocumentType::Markdown => self.scan_markdown(text),
            DocumentType::Html => self.scan_html(text),
            DocumentType::Python => self.scan_python(text),
            DocumentType::Pdf => scan_pdf(text),
            DocumentType::Unknown => {
                return RecursiveSplitter::new(self.chunk_size)
                    .split_text(text)
                    .into_iter()
                    .map(Segment::text)
                    .collect();
            }
        };
        self.pack(blocks)
    }

    fn scan_markdown(&self, text: &str) -> Vec<Block> {
        let lines: Vec<&str> = text.lines().collect();
        let mut blocks = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let trimmed = line.trim_start();

            if self.config.preserve_code_blocks && trimmed.starts_with("```") {
                flush_paragraph(&mut blocks, &mut paragraph);
                let mut fence = vec![line];
                i += 1;
                while i < lines.len() {
                    fence.push(lines[i]);
                    if lines[i].trim_start().starts_with("```") {
                        break;
                    }
                    i += 1;
                }
                blocks.push(Block::atomic(fence.join("\n")));
                i += 1;
                continue;
            }

            if self.config.preserve_tables {
                if let Some(end) = table_extent(&lines, i) {
                    flush_paragraph(&mut blocks, &mut paragraph);
                    blocks.push(Block::atomic(lines[i..end].join("\n")));
                    i = end;
                    continue;
                }
            }

            if self.config.preserve_headers && is_markdown_header(trimmed) {
                flush_paragraph(&mut blocks, &mut paragraph);
                blocks.push(Block::text(line));
                i += 1;
                continue;
            }

            if self.config.preserve_lists && is_list_item(trimmed) {
                flush_paragraph(&mut blocks, &mut paragraph);
                let start = i;
                while i < lines.len()
                    && (is_list_item(lines[i].trim_start()) || is_list_continuation(lines[i]))
                {
                    i += 1;
                }
                blocks.push(Block::atomic(lines[start..i].join("\n")));
                continue;
            }

            if self.config.preserve_images && is_standalone_image(trimmed) {
                flush_paragraph(&mut blocks, &mut paragraph);
                blocks.push(Block::atomic(line));
                i += 1;
                continue;
            }

            if self.config.preserve_links && is_standalone_link(trimmed) {
                flush_paragraph(&mut blocks, &mut paragraph);
                blocks.push(Block::atomic(line));
                i += 1;
                continue;
            }

            if trimmed.is_empty() {
                flush_paragraph(&mut blocks, &mut paragraph);
            } else {
                paragraph.push(line);
            }
            i += 1;
        }
        flush_paragraph(&mut blocks, &mut paragraph);
        blocks
    }

    fn scan_html(&self, text: &str) -> Vec<Block> {
        let lines: Vec<&str> = text.lines().collect();
        let mut blocks = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            let lower = line.to_ascii_lowercase();

            if self.config.preserve_tables && lower.contains("<table") {
                flush_paragraph(&mut blocks, &mut paragraph);
                let start = i;
                while i < lines.len() && !lines[i].to_ascii_lowercase().contains("</table>") {
                    i += 1;
                }
                let end = (i + 1).min(lines.len());
                blocks.push(Block::atomic(lines[start..end].join("\n")));
                i = end;
                continue;
            }

            if self.config.preserve_code_blocks && lower.contains("<pre") {
                flush_paragraph(&mut blocks, &mut paragraph);
                let start = i;
                while i < lines.len() && !lines[i].to_ascii_lowercase().contains("</pre>") {
                    i += 1;
                }
                let end = (i + 1).min(lines.len());
                blocks.push(Block::atomic(lines[start..end].join("\n")));
                i = end;
                continue;
            }

            if self.config.preserve_headers && html_header_regex().is_match(&lower) {
                flush_paragraph(&mut blocks, &mut paragraph);
                blocks.push(Block::text(line));
                i += 1;
                continue;
            }

            if line.trim().is_empty() {
                flush_paragraph(&mut blocks, &mut paragraph);
            } else {
                paragraph.push(line);
            }
            i += 1;
        }
        flush_paragraph(&mut blocks, &mut paragraph);
        blocks
    }

    /// Top-level `def` and `class` definitions become blocks, each carrying
    /// its indented body. Everything between definitions is plain text.
    fn scan_python(&self, text: &str) -> Vec<Block> {
        let lines: Vec<&str> = text.lines().collect();
        let mut blocks = Vec::new();
        let mut paragraph: Vec<&str> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            if is_python_definition(line) {
                flush_paragraph(&mut blocks, &mut paragraph);
                let start = i;
                i += 1;
                while i < lines.len() {
                    let body = lines[i];
                    let indented = body.starts_with(' ') || body.starts_with('\t');
                    if !indented && !body.trim().is_empty() && !is_python_decorator(body) {
                        break;
                    }
                    if is_python_decorator(body) || is_python_definition(body) {
                        break;
                    }
                    i += 1;
                }
                // Trailing blank lines belong to the gap, not the block.
                let mut end = i;
                while end > start + 1 && lines[end - 1].trim().is_empty() {
                    end -= 1;
                }
                let block = lines[start..end].join("\n");
                if self.config.preserve_code_blocks {
                    blocks.push(Block::atomic(block));
                } else {
                    blocks.push(Block::text(block));
                }
                continue;
            }

            if line.trim().is_empty() {
                flush_paragraph(&mut blocks, &mut paragraph);
            } else {
                paragraph.push(line);
            }
            i += 1;
        }
        flush_paragraph(&mut blocks, &mut paragraph);
        blocks
    }

    /// Greedy packing: adjacent text blocks merge up to the chunk size,
    /// atomic blocks flush the accumulator and stand alone.
    fn pack(&self, blocks: Vec<Block>) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current = String::new();

        for block in blocks {
            if block.atomic {
                if !current.is_empty() {
                    segments.push(Segment::text(std::mem::take(&mut current)));
                }
                segments.push(Segment::atomic(block.text));
                continue;
            }
            if char_len(&block.text) > self.chunk_size {
                if !current.is_empty() {
                    segments.push(Segment::text(std::mem::take(&mut current)));
                }
                segments.extend(
                    RecursiveSplitter::new(self.chunk_size)
                        .split_text(&block.text)
                        .into_iter()
                        .map(Segment::text),
                );
                continue;
            }
            let joined = if current.is_empty() {
                char_len(&block.text)
            } else {
                char_len(&current) + 2 + char_len(&block.text)
            };
            if joined > self.chunk_size && !current.is_empty() {
                segments.push(Segment::text(std::mem::take(&mut current)));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&block.text);
        }
        if !current.is_empty() {
            segments.push(Segment::text(current));
        }
        segments
    }
}

fn flush_paragraph(blocks: &mut Vec<Block>, paragraph: &mut Vec<&str>) {
    if !paragraph.is_empty() {
        blocks.push(Block::text(paragraph.join("\n")));
        paragraph.clear();
    }
}

fn is_markdown_header(trimmed: &str) -> bool {
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ')
}

fn is_list_item(trimmed: &str) -> bool {
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("+ "))
    {
        return !rest.is_empty();
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && trimmed[digits..].starts_with(". ")
}

/// Indented continuation lines inside a list block.
fn is_list_continuation(line: &str) -> bool {
    !line.trim().is_empty() && (line.starts_with("  ") || line.starts_with('\t'))
}

fn is_standalone_image(trimmed: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^!\[[^\]]*\]\([^)]*\)$").expect("valid image regex"))
        .is_match(trimmed)
}

fn is_standalone_link(trimmed: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[[^\]]+\]\([^)]*\)$").expect("valid link regex"))
        .is_match(trimmed)
}

fn html_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<h[1-6][\s>]").expect("valid header regex"))
}

fn is_python_definition(line: &str) -> bool {
    line.starts_with("def ")
        || line.starts_with("class ")
        || line.starts_with("async def ")
}

fn is_python_decorator(line: &str) -> bool {
    line.starts_with('@')
}

/// A markdown table at `lines[start]` extends to the returned end index. A
/// table needs a header row with `|`, a separator row, and at least one data
/// row; without the separator row the lines are ordinary text.
pub(crate) fn table_extent(lines: &[&str], start: usize) -> Option<usize> {
    if !lines.get(start)?.contains('|') {
        return None;
    }
    if !is_table_separator_row(lines.get(start + 1)?) {
        return None;
    }
    let mut end = start + 2;
    let mut data_rows = 0;
    while end < lines.len() && lines[end].contains('|') && !lines[end].trim().is_empty() {
        data_rows += 1;
        end += 1;
    }
    if data_rows == 0 {
        return None;
    }
    Some(end)
}

/// Separator rows look like `| --- | :--- |`: pipes, dashes, colons and
/// whitespace only, with at least one dash.
pub(crate) fn is_table_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.contains('-')
        && trimmed.contains('|')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

fn scan_pdf(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    for page in split_pages(text) {
        for paragraph in page.split("\n\n") {
            let trimmed = paragraph.trim();
            if !trimmed.is_empty() {
                blocks.push(Block::text(trimmed));
            }
        }
    }
    blocks
}

/// Pages separated by form feeds or an extracted-text page-break marker.
fn split_pages(text: &str) -> Vec<&str> {
    if text.contains('\u{c}') {
        return text.split('\u{c}').collect();
    }
    text.split("--- page break ---").collect()
}
