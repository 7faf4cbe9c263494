use std::sync::Arc;
use std::time::Duration;

use cleaver_core::{AgenticSplittingConfig, CleaverError, CompletionModel, CompletionParams};

use crate::character::windowed;
use crate::{apply_overlap, char_len, RecursiveSplitter, TextSplitter};

/// System prompt sent with every segmentation request. The model must answer
/// with nothing but a JSON array of strings.
pub const SEGMENTER_SYSTEM_PROMPT: &str = "You are an expert document segmenter. \
Split the document the user provides into coherent, self-contained chunks at \
natural topic boundaries. Preserve the original text verbatim inside each \
chunk; do not paraphrase, summarize, or drop content. Respond with a JSON \
array of strings and nothing else.";

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Level 5: LLM-driven splitting.
///
/// The completion model is asked for a JSON array of chunk strings. Invalid
/// JSON or a response that does not reconstruct the source is retried up to
/// `max_retries` times; after that the splitter degrades to recursive
/// splitting.
pub struct AgenticSplitter {
    model: Arc<dyn CompletionModel>,
    chunk_size: usize,
    chunk_overlap: usize,
    config: AgenticSplittingConfig,
}

impl AgenticSplitter {
    pub fn new(model: Arc<dyn CompletionModel>, chunk_size: usize) -> Self {
        Self {
            model,
            chunk_size,
            chunk_overlap: 0,
            config: AgenticSplittingConfig::default(),
        }
    }

    pub fn with_chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    pub fn with_config(mut self, config: AgenticSplittingConfig) -> Self {
        self.config = config;
        self
    }

    /// Split `text` via the completion model. The boolean is true when every
    /// attempt failed and the output came from the recursive fallback.
    pub async fn split(&self, text: &str) -> Result<(Vec<String>, bool), CleaverError> {
        if text.trim().is_empty() {
            return Ok((vec![], false));
        }

        let prompt = self.build_prompt(text);
        let params = self.completion_params();
        let attempts = self.config.max_retries.max(1);

        let mut last_error: Option<CleaverError> = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BASE_DELAY * 2u32.saturating_pow(attempt as u32 - 1))
                    .await;
            }
            let response = match self
                .model
                .complete(SEGMENTER_SYSTEM_PROMPT, &prompt, &params)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "completion call failed");
                    last_error = Some(e);
                    continue;
                }
            };
            match parse_chunk_array(&response).and_then(|chunks| {
                verify_reconstruction(text, &chunks)?;
                Ok(chunks)
            }) {
                Ok(chunks) => return Ok((self.post_process(chunks), false)),
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "rejected model response");
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no usable model response".to_string());
        tracing::warn!(reason, "agentic splitting exhausted retries, falling back to recursive splitting");
        let fallback = RecursiveSplitter::new(self.chunk_size).with_chunk_overlap(self.chunk_overlap);
        Ok((fallback.split_text(text), true))
    }

    fn build_prompt(&self, text: &str) -> String {
        let instructions = self.config.chunking_prompt.as_deref().unwrap_or(
            "Split the following document into chunks that each cover a single \
             topic or section.",
        );
        format!(
            "{instructions}\n\nTarget at most {} characters per chunk.\n\nDocument:\n{text}",
            self.chunk_size
        )
    }

    fn completion_params(&self) -> CompletionParams {
        let mut params = CompletionParams::default()
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens_per_chunk)
            .with_thinking(self.config.enable_thinking);
        if let Some(model) = &self.config.llm_model {
            params = params.with_model(model.clone());
        }
        params
    }

    fn post_process(&self, chunks: Vec<String>) -> Vec<String> {
        // The model is size-guided, not size-bound. Re-window anything that
        // came back grossly oversized.
        let limit = self.chunk_size * 2;
        let mut out = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if char_len(&chunk) > limit {
                out.extend(windowed(&chunk, self.chunk_size, 0));
            } else {
                out.push(chunk);
            }
        }
        if self.config.preserve_context {
            out = apply_overlap(out, self.chunk_overlap);
        }
        out
    }
}

/// Extract a JSON array of non-empty strings from a model response. The
/// response may carry prose around the array, so parsing starts at the first
/// `[` and ends at the last `]`.
fn parse_chunk_array(response: &str) -> Result<Vec<String>, CleaverError> {
    let start = response
        .find('[')
        .ok_or_else(|| CleaverError::Parsing("no JSON array in model response".to_string()))?;
    let end = response
        .rfind(']')
        .filter(|&end| end > start)
        .ok_or_else(|| CleaverError::Parsing("unterminated JSON array in model response".to_string()))?;

    let values: Vec<serde_json::Value> = serde_json::from_str(&response[start..=end])
        .map_err(|e| CleaverError::Parsing(format!("invalid JSON array: {e}")))?;

    let mut chunks = Vec::with_capacity(values.len());
    for value in values {
        match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => chunks.push(s),
            serde_json::Value::String(_) => {}
            other => {
                return Err(CleaverError::Parsing(format!(
                    "array element is not a string: {other}"
                )))
            }
        }
    }
    if chunks.is_empty() {
        return Err(CleaverError::Parsing(
            "model returned an empty chunk array".to_string(),
        ));
    }
    Ok(chunks)
}

/// Whitespace-insensitive check that the chunks cover the source text. The
/// model may normalize spacing between chunks, but dropping or inventing
/// content is a hard failure.
fn verify_reconstruction(source: &str, chunks: &[String]) -> Result<(), CleaverError> {
    let stripped_source: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    let stripped_chunks: String = chunks
        .iter()
        .flat_map(|c| c.chars())
        .filter(|c| !c.is_whitespace())
        .collect();
    if stripped_source == stripped_chunks {
        Ok(())
    } else {
        Err(CleaverError::Validation(
            "model response does not reconstruct the source text".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_array() {
        let chunks = parse_chunk_array(r#"["first chunk", "second chunk"]"#).unwrap();
        assert_eq!(chunks, vec!["first chunk", "second chunk"]);
    }

    #[test]
    fn parses_array_wrapped_in_prose() {
        let response = "Here are the chunks:\n[\"a\", \"b\"]\nDone.";
        assert_eq!(parse_chunk_array(response).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn rejects_response_without_array() {
        assert!(matches!(
            parse_chunk_array("I cannot split this document."),
            Err(CleaverError::Parsing(_))
        ));
    }

    #[test]
    fn rejects_non_string_elements() {
        assert!(matches!(
            parse_chunk_array(r#"["a", 42]"#),
            Err(CleaverError::Parsing(_))
        ));
    }

    #[test]
    fn reconstruction_ignores_whitespace_differences() {
        let source = "one two\n\nthree";
        let chunks = vec!["one two".to_string(), "three".to_string()];
        assert!(verify_reconstruction(source, &chunks).is_ok());
    }

    #[test]
    fn reconstruction_rejects_dropped_content() {
        let source = "one two three";
        let chunks = vec!["one two".to_string()];
        assert!(matches!(
            verify_reconstruction(source, &chunks),
            Err(CleaverError::Validation(_))
        ));
    }
}
