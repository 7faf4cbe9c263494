use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for the Cleaver engine.
///
/// `Config` errors are fatal and surfaced immediately. `Provider` and
/// `Timeout` errors are retryable; after retries are exhausted the caller
/// degrades to a deterministic fallback strategy. `Validation` covers
/// malformed provider output (e.g. an LLM reply that is not the requested
/// JSON array).
#[derive(Debug, Error)]
pub enum CleaverError {
    #[error("config error: {0}")]
    Config(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("parsing error: {0}")]
    Parsing(String),
    #[error("splitter error: {0}")]
    Splitter(String),
}

impl CleaverError {
    /// Whether a retry against the same provider may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CleaverError::Provider(_) | CleaverError::Timeout(_))
    }
}

// ---------------------------------------------------------------------------
// Source files and chunks
// ---------------------------------------------------------------------------

/// One already-extracted text payload, identified by the upstream file id.
///
/// File-format parsing happens before this engine: only plain text or
/// markdown reaches a `SourceFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A bounded text segment produced by a splitting strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// 0-based position within the chunk's source file.
    pub index: usize,
    pub source_file_id: String,
    /// Protected spans (markdown tables, oversized structural units) that
    /// must never be split further or merged across their boundary.
    #[serde(default)]
    pub is_atomic: bool,
}

impl Chunk {
    pub fn new(text: impl Into<String>, index: usize, source_file_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            index,
            source_file_id: source_file_id.into(),
            is_atomic: false,
        }
    }

    pub fn atomic(
        text: impl Into<String>,
        index: usize,
        source_file_id: impl Into<String>,
    ) -> Self {
        Self {
            is_atomic: true,
            ..Self::new(text, index, source_file_id)
        }
    }
}

/// Ordered chunks for a single source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunks {
    pub file_id: String,
    pub count: usize,
    pub chunks: Vec<Chunk>,
}

/// Result metadata: which strategy actually ran and whether any file fell
/// back to a degraded strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub strategy: ChunkingStrategy,
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    /// Number of delimiter segments merged away by the table-preserving
    /// merger, when that post-processor ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_count: Option<usize>,
}

/// The full output of one chunking call. All entities are request-scoped;
/// nothing is retained by the engine after the result is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    /// All chunks in file order, then chunk order within each file.
    pub chunks: Vec<Chunk>,
    pub per_file: Vec<FileChunks>,
    pub meta: ChunkMeta,
}

impl ChunkResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// The closed set of splitting strategies, plus `auto`.
///
/// Wire names match the upstream API surface, including the long-form
/// table-preserving variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    Auto,
    CharacterSplitting,
    RecursiveCharacterSplitting,
    DocumentSpecificSplitting,
    SemanticSplitting,
    AgenticSplitting,
    CustomDelimiterSplitting,
    CustomDelimiterSplittingWithChunkSizeAndLeaveTableAlone,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Auto => "auto",
            ChunkingStrategy::CharacterSplitting => "character_splitting",
            ChunkingStrategy::RecursiveCharacterSplitting => "recursive_character_splitting",
            ChunkingStrategy::DocumentSpecificSplitting => "document_specific_splitting",
            ChunkingStrategy::SemanticSplitting => "semantic_splitting",
            ChunkingStrategy::AgenticSplitting => "agentic_splitting",
            ChunkingStrategy::CustomDelimiterSplitting => "custom_delimiter_splitting",
            ChunkingStrategy::CustomDelimiterSplittingWithChunkSizeAndLeaveTableAlone => {
                "custom_delimiter_splitting_with_chunk_size_and_leave_table_alone"
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-strategy configuration
// ---------------------------------------------------------------------------

fn default_separators() -> Vec<String> {
    vec![
        "\n\n".to_string(),
        "\n".to_string(),
        ". ".to_string(),
        ", ".to_string(),
        " ".to_string(),
        String::new(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.25
}

fn default_buffer_size() -> usize {
    1
}

fn default_max_tokens_per_chunk() -> usize {
    2048
}

fn default_max_retries() -> usize {
    3
}

/// Level 2 configuration: ordered separator list, first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecursiveSplittingConfig {
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
    /// When true, each separator stays attached to the piece it terminates.
    #[serde(default = "default_true")]
    pub keep_separator: bool,
}

impl Default for RecursiveSplittingConfig {
    fn default() -> Self {
        Self {
            separators: default_separators(),
            keep_separator: true,
        }
    }
}

/// Structural grammar selector for document-aware splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    Markdown,
    Html,
    Python,
    Pdf,
    /// Anything else falls back to recursive splitting.
    Unknown,
}

impl DocumentType {
    /// Parse the wire-level `document_type` string. Accepts the short
    /// aliases the upstream API accepts (`md`, `py`).
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => DocumentType::Markdown,
            "html" => DocumentType::Html,
            "python" | "py" => DocumentType::Python,
            "pdf" => DocumentType::Pdf,
            _ => DocumentType::Unknown,
        }
    }
}

/// Level 3 configuration: which structural elements are treated as atomic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSpecificConfig {
    /// Wire-level type name; see [`DocumentType::parse`].
    pub document_type: String,
    #[serde(default = "default_true")]
    pub preserve_headers: bool,
    #[serde(default = "default_true")]
    pub preserve_code_blocks: bool,
    #[serde(default = "default_true")]
    pub preserve_lists: bool,
    #[serde(default = "default_true")]
    pub preserve_tables: bool,
    #[serde(default = "default_true")]
    pub preserve_links: bool,
    #[serde(default = "default_true")]
    pub preserve_images: bool,
}

impl DocumentSpecificConfig {
    pub fn new(document_type: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            preserve_headers: true,
            preserve_code_blocks: true,
            preserve_lists: true,
            preserve_tables: true,
            preserve_links: true,
            preserve_images: true,
        }
    }
}

/// Level 4 configuration: embedding-similarity boundary detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticSplittingConfig {
    /// Overrides the engine-wide default embedding model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    /// Consecutive windows less similar than this start a new chunk.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Number of adjacent sentences embedded together to reduce noise.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_chunk_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_size: Option<usize>,
}

impl Default for SemanticSplittingConfig {
    fn default() -> Self {
        Self {
            embedding_model: None,
            similarity_threshold: default_similarity_threshold(),
            buffer_size: default_buffer_size(),
            min_chunk_size: None,
            max_chunk_size: None,
        }
    }
}

/// Level 5 configuration: LLM-directed splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgenticSplittingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunking_prompt: Option<String>,
    #[serde(default = "default_max_tokens_per_chunk")]
    pub max_tokens_per_chunk: usize,
    /// Re-insert `chunk_overlap` characters between returned chunks in
    /// post-processing. The model itself is never asked to produce overlap.
    #[serde(default = "default_true")]
    pub preserve_context: bool,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub enable_thinking: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for AgenticSplittingConfig {
    fn default() -> Self {
        Self {
            llm_model: None,
            chunking_prompt: None,
            max_tokens_per_chunk: default_max_tokens_per_chunk(),
            preserve_context: true,
            temperature: 0.0,
            enable_thinking: false,
            max_retries: default_max_retries(),
        }
    }
}

/// Level 6 configuration: literal delimiter splitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomDelimiterConfig {
    /// Literal delimiter. The escape sequences `\n`, `\t` and `\r` are
    /// unescaped before matching.
    pub delimiter: String,
    #[serde(default)]
    pub include_delimiter: bool,
    #[serde(default)]
    pub trim_whitespace: bool,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

impl CustomDelimiterConfig {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            include_delimiter: false,
            trim_whitespace: false,
            case_sensitive: true,
        }
    }
}

/// Tagged union over the per-strategy configuration payloads. Exactly one
/// variant is populated, matching the selected strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyConfig {
    RecursiveSplittingConfig(RecursiveSplittingConfig),
    DocumentSpecificConfig(DocumentSpecificConfig),
    SemanticSplittingConfig(SemanticSplittingConfig),
    AgenticSplittingConfig(AgenticSplittingConfig),
    CustomDelimiterConfig(CustomDelimiterConfig),
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Bounds enforced on `chunk_size` and `chunk_overlap` at validation time.
pub const MIN_CHUNK_SIZE: usize = 100;
pub const MAX_CHUNK_SIZE: usize = 99_999_999;
pub const MAX_CHUNK_OVERLAP: usize = 1000;

/// One chunking call: a strategy, size bounds, optional strategy-specific
/// configuration, and the source texts to split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingRequest {
    pub strategy: ChunkingStrategy,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_config: Option<StrategyConfig>,
    pub files: Vec<SourceFile>,
}

impl ChunkingRequest {
    pub fn new(strategy: ChunkingStrategy, files: Vec<SourceFile>) -> Self {
        Self {
            strategy,
            chunk_size: EngineConfig::default().chunk_size,
            chunk_overlap: EngineConfig::default().chunk_overlap,
            strategy_config: None,
            files,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.chunk_overlap = chunk_overlap;
        self
    }

    pub fn with_config(mut self, config: StrategyConfig) -> Self {
        self.strategy_config = Some(config);
        self
    }
}

// ---------------------------------------------------------------------------
// Engine-wide defaults
// ---------------------------------------------------------------------------

/// Explicit defaults passed into the router at construction. Model names
/// here apply whenever a sub-config omits its own override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    pub completion_model: String,
    /// Upper bound on files chunked concurrently in one request.
    pub max_file_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            embedding_model: "text-embedding-ada-002".to_string(),
            completion_model: "qwen3-235b-a22b".to_string(),
            max_file_concurrency: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider traits (implemented in cleaver-embeddings / cleaver-models)
// ---------------------------------------------------------------------------

/// Trait for embedding text into vectors.
///
/// Implementations must return one vector per input, in input order, all of
/// the same dimensionality.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed multiple texts (for batch document embedding).
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CleaverError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, CleaverError>;
}

/// Generation parameters forwarded to a completion provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    /// Overrides the provider's default model when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub enable_thinking: bool,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.0,
            max_tokens: None,
            enable_thinking: false,
        }
    }
}

impl CompletionParams {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_thinking(mut self, enable_thinking: bool) -> Self {
        self.enable_thinking = enable_thinking;
        self
    }
}

/// Trait for prompt-completion providers consumed by agentic splitting.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Complete a prompt and return the assistant text.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, CleaverError>;
}
