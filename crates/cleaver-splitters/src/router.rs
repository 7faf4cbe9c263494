use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};

use cleaver_core::{
    Chunk, ChunkMeta, ChunkResult, ChunkingRequest, ChunkingStrategy, CleaverError,
    CompletionModel, CustomDelimiterConfig, DocumentSpecificConfig, Embeddings, EngineConfig,
    FileChunks, SourceFile, StrategyConfig, MAX_CHUNK_OVERLAP, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE,
};

use crate::{
    AgenticSplitter, CharacterSplitter, CustomDelimiterSplitter, DocumentAwareSplitter,
    RecursiveSplitter, Segment, SemanticSplitter, TablePreservingMerger, TextSplitter,
};

/// Entry point for chunking requests: validates, resolves `auto`, dispatches
/// each file to the selected strategy, and assembles the aggregate result.
///
/// Providers are optional at construction; strategies that need one fail
/// validation when it is missing rather than at mid-request depth.
pub struct StrategyRouter {
    config: EngineConfig,
    embeddings: Option<Arc<dyn Embeddings>>,
    completions: Option<Arc<dyn CompletionModel>>,
}

/// Per-file output before aggregation.
struct FileOutcome {
    file_id: String,
    segments: Vec<Segment>,
    fallback_reason: Option<String>,
    merged_count: Option<usize>,
}

impl StrategyRouter {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            embeddings: None,
            completions: None,
        }
    }

    pub fn with_embeddings(mut self, embeddings: Arc<dyn Embeddings>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn with_completions(mut self, completions: Arc<dyn CompletionModel>) -> Self {
        self.completions = Some(completions);
        self
    }

    pub async fn chunk(&self, request: &ChunkingRequest) -> Result<ChunkResult, CleaverError> {
        let strategy = resolve(request.strategy);
        self.validate(request, strategy)?;
        tracing::debug!(
            strategy = strategy.as_str(),
            files = request.files.len(),
            chunk_size = request.chunk_size,
            chunk_overlap = request.chunk_overlap,
            "dispatching chunking request"
        );

        let outcomes: Vec<FileOutcome> = stream::iter(request.files.iter())
            .map(|file| self.chunk_file(file, request, strategy))
            .buffered(self.config.max_file_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(assemble(strategy, outcomes))
    }

    async fn chunk_file(
        &self,
        file: &SourceFile,
        request: &ChunkingRequest,
        strategy: ChunkingStrategy,
    ) -> Result<FileOutcome, CleaverError> {
        let size = request.chunk_size;
        let overlap = request.chunk_overlap;
        let mut fallback_reason = None;
        let mut merged_count = None;

        let segments = match strategy {
            ChunkingStrategy::CharacterSplitting => text_segments(
                CharacterSplitter::new(size)
                    .with_chunk_overlap(overlap)
                    .split_text(&file.text),
            ),
            ChunkingStrategy::RecursiveCharacterSplitting => {
                let mut splitter = RecursiveSplitter::new(size).with_chunk_overlap(overlap);
                if let Some(StrategyConfig::RecursiveSplittingConfig(config)) =
                    &request.strategy_config
                {
                    splitter = splitter
                        .with_separators(config.separators.clone())
                        .with_keep_separator(config.keep_separator);
                }
                text_segments(splitter.split_text(&file.text))
            }
            ChunkingStrategy::DocumentSpecificSplitting => {
                let config = self.document_config(request)?;
                DocumentAwareSplitter::new(size, config).split(&file.text)
            }
            ChunkingStrategy::SemanticSplitting => {
                let embeddings = self.embeddings.clone().ok_or_else(|| {
                    CleaverError::Config("semantic splitting requires an embedding provider".into())
                })?;
                let mut splitter = SemanticSplitter::new(embeddings, size).with_chunk_overlap(overlap);
                if let Some(StrategyConfig::SemanticSplittingConfig(config)) =
                    &request.strategy_config
                {
                    splitter = splitter.with_config(config.clone());
                }
                let (chunks, fell_back) = splitter.split(&file.text).await?;
                if fell_back {
                    fallback_reason =
                        Some("embedding provider unavailable".to_string());
                }
                text_segments(chunks)
            }
            ChunkingStrategy::AgenticSplitting => {
                let completions = self.completions.clone().ok_or_else(|| {
                    CleaverError::Config("agentic splitting requires a completion provider".into())
                })?;
                let mut config = match &request.strategy_config {
                    Some(StrategyConfig::AgenticSplittingConfig(config)) => config.clone(),
                    _ => Default::default(),
                };
                if config.llm_model.is_none() {
                    config.llm_model = Some(self.config.completion_model.clone());
                }
                let splitter = AgenticSplitter::new(completions, size)
                    .with_chunk_overlap(overlap)
                    .with_config(config);
                let (chunks, fell_back) = splitter.split(&file.text).await?;
                if fell_back {
                    fallback_reason = Some("model returned no usable segmentation".to_string());
                }
                text_segments(chunks)
            }
            ChunkingStrategy::CustomDelimiterSplitting => {
                let config = self.delimiter_config(request)?;
                text_segments(CustomDelimiterSplitter::new(&config).split(&file.text))
            }
            ChunkingStrategy::CustomDelimiterSplittingWithChunkSizeAndLeaveTableAlone => {
                let config = self.delimiter_config(request)?;
                let (segments, merged) =
                    TablePreservingMerger::new(size, &config).split(&file.text);
                merged_count = Some(merged);
                segments
            }
            ChunkingStrategy::Auto => unreachable!("auto is resolved before dispatch"),
        };

        if let Some(reason) = &fallback_reason {
            tracing::warn!(file_id = %file.id, reason = %reason, "strategy fell back for file");
        }

        Ok(FileOutcome {
            file_id: file.id.clone(),
            segments,
            fallback_reason,
            merged_count,
        })
    }

    fn validate(
        &self,
        request: &ChunkingRequest,
        strategy: ChunkingStrategy,
    ) -> Result<(), CleaverError> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&request.chunk_size) {
            return Err(CleaverError::Config(format!(
                "chunk_size {} outside [{MIN_CHUNK_SIZE}, {MAX_CHUNK_SIZE}]",
                request.chunk_size
            )));
        }
        if request.chunk_overlap > MAX_CHUNK_OVERLAP {
            return Err(CleaverError::Config(format!(
                "chunk_overlap {} exceeds {MAX_CHUNK_OVERLAP}",
                request.chunk_overlap
            )));
        }
        if request.chunk_overlap >= request.chunk_size {
            return Err(CleaverError::Config(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                request.chunk_overlap, request.chunk_size
            )));
        }
        if let Some(config) = &request.strategy_config {
            if !config_matches(strategy, config) {
                return Err(CleaverError::Config(format!(
                    "strategy_config does not match strategy {}",
                    strategy.as_str()
                )));
            }
        }
        match strategy {
            ChunkingStrategy::DocumentSpecificSplitting => {
                self.document_config(request).map(|_| ())
            }
            ChunkingStrategy::CustomDelimiterSplitting
            | ChunkingStrategy::CustomDelimiterSplittingWithChunkSizeAndLeaveTableAlone => {
                self.delimiter_config(request).map(|_| ())
            }
            ChunkingStrategy::SemanticSplitting if self.embeddings.is_none() => Err(
                CleaverError::Config("semantic splitting requires an embedding provider".into()),
            ),
            ChunkingStrategy::AgenticSplitting if self.completions.is_none() => Err(
                CleaverError::Config("agentic splitting requires a completion provider".into()),
            ),
            _ => Ok(()),
        }
    }

    fn document_config(
        &self,
        request: &ChunkingRequest,
    ) -> Result<DocumentSpecificConfig, CleaverError> {
        match &request.strategy_config {
            Some(StrategyConfig::DocumentSpecificConfig(config)) => Ok(config.clone()),
            _ => Err(CleaverError::Config(
                "document_specific_splitting requires a document_specific_config".into(),
            )),
        }
    }

    fn delimiter_config(
        &self,
        request: &ChunkingRequest,
    ) -> Result<CustomDelimiterConfig, CleaverError> {
        match &request.strategy_config {
            Some(StrategyConfig::CustomDelimiterConfig(config)) => Ok(config.clone()),
            _ => Err(CleaverError::Config(
                "custom delimiter strategies require a custom_delimiter_config".into(),
            )),
        }
    }
}

/// `auto` maps to recursive splitting, the strategy with the best
/// quality/cost balance that needs no provider.
fn resolve(strategy: ChunkingStrategy) -> ChunkingStrategy {
    match strategy {
        ChunkingStrategy::Auto => ChunkingStrategy::RecursiveCharacterSplitting,
        other => other,
    }
}

fn config_matches(strategy: ChunkingStrategy, config: &StrategyConfig) -> bool {
    matches!(
        (strategy, config),
        (
            ChunkingStrategy::RecursiveCharacterSplitting,
            StrategyConfig::RecursiveSplittingConfig(_)
        ) | (
            ChunkingStrategy::DocumentSpecificSplitting,
            StrategyConfig::DocumentSpecificConfig(_)
        ) | (
            ChunkingStrategy::SemanticSplitting,
            StrategyConfig::SemanticSplittingConfig(_)
        ) | (
            ChunkingStrategy::AgenticSplitting,
            StrategyConfig::AgenticSplittingConfig(_)
        ) | (
            ChunkingStrategy::CustomDelimiterSplitting,
            StrategyConfig::CustomDelimiterConfig(_)
        ) | (
            ChunkingStrategy::CustomDelimiterSplittingWithChunkSizeAndLeaveTableAlone,
            StrategyConfig::CustomDelimiterConfig(_)
        )
    )
}

fn text_segments(chunks: Vec<String>) -> Vec<Segment> {
    chunks.into_iter().map(Segment::text).collect()
}

fn assemble(strategy: ChunkingStrategy, outcomes: Vec<FileOutcome>) -> ChunkResult {
    let mut chunks = Vec::new();
    let mut per_file = Vec::new();
    let mut fallback_used = false;
    let mut fallback_reason = None;
    let mut merged_total: Option<usize> = None;

    for outcome in outcomes {
        let file_chunks: Vec<Chunk> = outcome
            .segments
            .into_iter()
            .enumerate()
            .map(|(index, segment)| {
                if segment.atomic {
                    Chunk::atomic(segment.text, index, &outcome.file_id)
                } else {
                    Chunk::new(segment.text, index, &outcome.file_id)
                }
            })
            .collect();
        if let Some(reason) = outcome.fallback_reason {
            fallback_used = true;
            fallback_reason.get_or_insert(reason);
        }
        if let Some(merged) = outcome.merged_count {
            *merged_total.get_or_insert(0) += merged;
        }
        per_file.push(FileChunks {
            file_id: outcome.file_id,
            count: file_chunks.len(),
            chunks: file_chunks.clone(),
        });
        chunks.extend(file_chunks);
    }

    ChunkResult {
        chunks,
        per_file,
        meta: ChunkMeta {
            strategy,
            fallback_used,
            fallback_reason,
            merged_count: merged_total,
        },
    }
}
