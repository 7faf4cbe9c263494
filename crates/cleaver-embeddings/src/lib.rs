mod fake;
mod flaky;
mod openai;

pub use fake::FakeEmbeddings;
pub use flaky::FlakyEmbeddings;
pub use openai::{OpenAiEmbeddings, OpenAiEmbeddingsConfig};

// Re-export the trait implemented by this crate's providers.
pub use cleaver_core::Embeddings;
