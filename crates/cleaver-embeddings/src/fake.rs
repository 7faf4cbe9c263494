use async_trait::async_trait;
use cleaver_core::{CleaverError, Embeddings};

/// Deterministic, provider-free embeddings for tests.
///
/// Each text is reduced to a unit vector by hashing its whitespace-separated
/// tokens into a fixed number of lanes, so texts sharing vocabulary land
/// near each other and equal inputs always map to equal vectors. Gives the
/// semantic splitter tests stable boundaries without a network.
pub struct FakeEmbeddings {
    dimensions: usize,
}

impl FakeEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut lanes = vec![0.0f32; self.dimensions];
        for token in text.split_whitespace() {
            let hash = fnv1a(token.as_bytes());
            let lane = hash as usize % self.dimensions;
            // Low hash bits give each token a stable weight in (0, 1].
            lanes[lane] += ((hash & 0xffff) as f32 + 1.0) / 65_536.0;
        }
        normalize(lanes)
    }
}

impl Default for FakeEmbeddings {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl Embeddings for FakeEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CleaverError> {
        // One vector per input, in input order, uniform dimensionality.
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, CleaverError> {
        Ok(self.vector_for(text))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100_0000_01b3);
    }
    hash
}

/// Scale to unit length. Whitespace-only input carries no tokens, so it
/// gets a fixed basis vector to keep cosine similarity well defined.
fn normalize(mut lanes: Vec<f32>) -> Vec<f32> {
    let magnitude = lanes.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for lane in &mut lanes {
            *lane /= magnitude;
        }
    } else if let Some(first) = lanes.first_mut() {
        *first = 1.0;
    }
    lanes
}
