pub mod backend;
mod openai;
mod retry;
mod scripted;

pub use backend::{FakeBackend, HttpBackend, ProviderBackend, ProviderRequest, ProviderResponse};
pub use openai::{OpenAiCompletions, OpenAiCompletionsConfig};
pub use retry::{RetryCompletionModel, RetryPolicy};
pub use scripted::ScriptedCompletions;

// Re-export the trait implemented by this crate's providers.
pub use cleaver_core::{CompletionModel, CompletionParams};
