use std::sync::Arc;
use std::time::Duration;

use cleaver_core::{CleaverError, Embeddings, SemanticSplittingConfig};

use crate::segmenter::split_sentences;
use crate::{char_len, RecursiveSplitter, TextSplitter};

/// Windows embedded per provider call, so large inputs stream through the
/// provider instead of materializing every embedding at once.
const EMBED_BATCH: usize = 64;

/// Provider attempts before the splitter degrades to recursive splitting.
const MAX_PROVIDER_ATTEMPTS: usize = 3;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Level 4: embedding-similarity boundary detection.
///
/// Sentences are grouped into sliding windows of `buffer_size`, each window
/// is embedded, and a chunk boundary is placed wherever the cosine
/// similarity between consecutive windows drops below the threshold.
pub struct SemanticSplitter {
    embeddings: Arc<dyn Embeddings>,
    chunk_size: usize,
    chunk_overlap: usize,
    config: SemanticSplittingConfig,
}

impl SemanticSplitter {
    pub fn new(embeddings: Arc<dyn Embeddings>, chunk_size: usize) -> Self {
        Self {
            embeddings,
            chunk_size,
            chunk_overlap: 0,
            config: SemanticSplittingConfig::default(),
        }
    }

    pub fn with_chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    pub fn with_config(mut self, config: SemanticSplittingConfig) -> Self {
        self.config = config;
        self
    }

    /// Split `text` at semantic boundaries. The boolean is true when the
    /// embedding provider stayed unreachable and the output came from the
    /// recursive fallback instead.
    pub async fn split(&self, text: &str) -> Result<(Vec<String>, bool), CleaverError> {
        if text.trim().is_empty() {
            return Ok((vec![], false));
        }

        let sentences = split_sentences(text);
        if sentences.len() <= 1 {
            return Ok((sentences, false));
        }

        let windows = self.windows(&sentences);
        let vectors = match self.embed_windows(&windows).await {
            Ok(vectors) => vectors,
            Err(e) => {
                tracing::warn!(error = %e, "embedding provider unavailable, falling back to recursive splitting");
                return Ok((self.fallback().split_text(text), true));
            }
        };

        let boundaries = self.boundaries(&vectors);
        let candidates = assemble(&sentences, &boundaries);
        Ok((self.post_process(candidates), false))
    }

    /// One window per sentence: sentence `i` joined with the following
    /// `buffer_size - 1` sentences. Keeping windows aligned to sentences
    /// means every inter-window boundary is also a sentence boundary.
    fn windows(&self, sentences: &[String]) -> Vec<String> {
        let buffer = self.config.buffer_size.max(1);
        (0..sentences.len())
            .map(|i| sentences[i..(i + buffer).min(sentences.len())].join(" "))
            .collect()
    }

    async fn embed_windows(&self, windows: &[String]) -> Result<Vec<Vec<f32>>, CleaverError> {
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(windows.len());
        for batch in windows.chunks(EMBED_BATCH) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            let batch_vectors = self.embed_with_retry(&refs).await?;
            if batch_vectors.len() != refs.len() {
                return Err(CleaverError::Provider(format!(
                    "expected {} embeddings, got {}",
                    refs.len(),
                    batch_vectors.len()
                )));
            }
            for vector in &batch_vectors {
                if vector.is_empty() {
                    return Err(CleaverError::Provider("empty embedding vector".to_string()));
                }
                if let Some(first) = vectors.first() {
                    if first.len() != vector.len() {
                        return Err(CleaverError::Provider(
                            "non-uniform embedding dimensions".to_string(),
                        ));
                    }
                }
            }
            vectors.extend(batch_vectors);
        }
        Ok(vectors)
    }

    async fn embed_with_retry(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CleaverError> {
        let mut last_error = None;
        for attempt in 0..MAX_PROVIDER_ATTEMPTS {
            match self.embeddings.embed_documents(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_retryable() && attempt + 1 < MAX_PROVIDER_ATTEMPTS => {
                    tracing::debug!(attempt, error = %e, "retrying embedding call");
                    tokio::time::sleep(RETRY_BASE_DELAY * 2u32.saturating_pow(attempt as u32))
                        .await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| CleaverError::Provider("embedding retries exhausted".to_string())))
    }

    /// Sentence indices that start a new chunk.
    fn boundaries(&self, vectors: &[Vec<f32>]) -> Vec<usize> {
        let mut boundaries = Vec::new();
        for i in 1..vectors.len() {
            let similarity = cosine_similarity(&vectors[i - 1], &vectors[i]);
            if similarity < self.config.similarity_threshold {
                boundaries.push(i);
            }
        }
        boundaries
    }

    fn post_process(&self, candidates: Vec<String>) -> Vec<String> {
        let max_size = self.config.max_chunk_size.unwrap_or(self.chunk_size);
        let min_size = self.config.min_chunk_size.unwrap_or(0);

        // Merge undersized candidates into their left neighbor first.
        let mut merged: Vec<String> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let small = char_len(&candidate) < min_size;
            match merged.last_mut() {
                Some(prev) if small => {
                    prev.push(' ');
                    prev.push_str(&candidate);
                }
                _ => merged.push(candidate),
            }
        }

        let mut chunks = Vec::with_capacity(merged.len());
        for candidate in merged {
            if char_len(&candidate) > max_size {
                chunks.extend(self.fallback().split_text(&candidate));
            } else {
                chunks.push(candidate);
            }
        }
        chunks
    }

    fn fallback(&self) -> RecursiveSplitter {
        RecursiveSplitter::new(self.chunk_size).with_chunk_overlap(self.chunk_overlap)
    }
}

/// Join sentence runs between boundaries into candidate chunks.
fn assemble(sentences: &[String], boundaries: &[usize]) -> Vec<String> {
    let mut starts = vec![0];
    starts.extend_from_slice(boundaries);
    let mut candidates = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(sentences.len());
        if start < end {
            candidates.push(sentences[start..end].join(" "));
        }
    }
    candidates
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, 0.5, 0.7];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn assemble_groups_runs_between_boundaries() {
        let sentences = vec![
            "a.".to_string(),
            "b.".to_string(),
            "c.".to_string(),
            "d.".to_string(),
        ];
        let candidates = assemble(&sentences, &[2]);
        assert_eq!(candidates, vec!["a. b.", "c. d."]);
    }

    #[test]
    fn assemble_without_boundaries_is_single_candidate() {
        let sentences = vec!["a.".to_string(), "b.".to_string()];
        assert_eq!(assemble(&sentences, &[]), vec!["a. b."]);
    }
}
