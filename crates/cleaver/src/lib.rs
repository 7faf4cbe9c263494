//! Cleaver — a document chunking engine.
//!
//! This crate re-exports the Cleaver sub-crates for convenient single-import
//! usage. Enable features to control which modules are available.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `splitters` |
//! | `splitters` | All splitting strategies and the `StrategyRouter` |
//! | `embeddings` | OpenAI-compatible embeddings plus test doubles |
//! | `models` | OpenAI-compatible completions, retry wrapper, test doubles |
//! | `providers` | `embeddings` + `models` |
//! | `full` | Everything |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cleaver::core::{ChunkingRequest, ChunkingStrategy, SourceFile, EngineConfig};
//! use cleaver::splitters::StrategyRouter;
//!
//! let router = StrategyRouter::new(EngineConfig::default());
//! let request = ChunkingRequest::new(
//!     ChunkingStrategy::Auto,
//!     vec![SourceFile::new("readme.md", "…")],
//! );
//! let result = router.chunk(&request).await?;
//! ```

/// Core types: requests, results, strategies, errors, provider traits.
/// Always available.
pub use cleaver_core as core;

/// Splitting strategies and the strategy router.
#[cfg(feature = "splitters")]
pub use cleaver_splitters as splitters;

/// Embedding providers: OpenAI-compatible HTTP plus deterministic test
/// doubles.
#[cfg(feature = "embeddings")]
pub use cleaver_embeddings as embeddings;

/// Completion providers: OpenAI-compatible HTTP, retry wrapper, scripted
/// test double.
#[cfg(feature = "models")]
pub use cleaver_models as models;
