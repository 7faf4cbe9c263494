use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cleaver_core::{CleaverError, Embeddings};

use crate::FakeEmbeddings;

/// Test double that fails the first `fail_count` calls with a provider
/// error, then delegates to [`FakeEmbeddings`]. Used to exercise retry and
/// fallback paths in the semantic splitter.
pub struct FlakyEmbeddings {
    fail_count: usize,
    calls: AtomicUsize,
    inner: FakeEmbeddings,
}

impl FlakyEmbeddings {
    pub fn new(fail_count: usize, dimensions: usize) -> Self {
        Self {
            fail_count,
            calls: AtomicUsize::new(0),
            inner: FakeEmbeddings::new(dimensions),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embeddings for FlakyEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CleaverError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_count {
            return Err(CleaverError::Provider("embedding service down".to_string()));
        }
        self.inner.embed_documents(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, CleaverError> {
        self.embed_documents(&[text])
            .await?
            .pop()
            .ok_or_else(|| CleaverError::Provider("empty embedding response".to_string()))
    }
}
