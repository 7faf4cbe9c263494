use std::sync::Arc;

use async_trait::async_trait;

use cleaver_core::{
    ChunkingRequest, ChunkingStrategy, CleaverError, CustomDelimiterConfig,
    DocumentSpecificConfig, Embeddings, EngineConfig, SourceFile, StrategyConfig,
};
use cleaver_embeddings::{FakeEmbeddings, FlakyEmbeddings};
use cleaver_models::ScriptedCompletions;
use cleaver_splitters::StrategyRouter;

fn router() -> StrategyRouter {
    StrategyRouter::new(EngineConfig::default())
}

fn file(id: &str, text: &str) -> SourceFile {
    SourceFile::new(id, text)
}

/// Embeds by topic keyword so semantic boundaries land deterministically.
struct KeywordEmbeddings;

#[async_trait]
impl Embeddings for KeywordEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, CleaverError> {
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_ascii_lowercase().contains("rust") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.0, 1.0]
                }
            })
            .collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, CleaverError> {
        Ok(self.embed_documents(&[text]).await?.remove(0))
    }
}

#[tokio::test]
async fn character_splitting_produces_expected_window_lengths() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::CharacterSplitting,
        vec![file("a.txt", &"A".repeat(2500))],
    )
    .with_chunk_size(1000)
    .with_chunk_overlap(100);

    let result = router().chunk(&request).await.unwrap();
    let lengths: Vec<usize> = result.chunks.iter().map(|c| c.text.len()).collect();
    assert_eq!(lengths, vec![1000, 1000, 700]);
    let indices: Vec<usize> = result.chunks.iter().map(|c| c.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn auto_reports_recursive_in_meta() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::Auto,
        vec![file("a.txt", "Some short document.")],
    );
    let result = router().chunk(&request).await.unwrap();
    assert_eq!(
        result.meta.strategy,
        ChunkingStrategy::RecursiveCharacterSplitting
    );
    assert!(!result.meta.fallback_used);
}

#[tokio::test]
async fn empty_file_yields_zero_chunks() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::RecursiveCharacterSplitting,
        vec![file("empty.txt", "")],
    );
    let result = router().chunk(&request).await.unwrap();
    assert!(result.chunks.is_empty());
    assert_eq!(result.per_file.len(), 1);
    assert_eq!(result.per_file[0].count, 0);
}

#[tokio::test]
async fn indices_restart_per_file_and_order_is_preserved() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::CharacterSplitting,
        vec![
            file("first.txt", &"x".repeat(250)),
            file("second.txt", &"y".repeat(250)),
        ],
    )
    .with_chunk_size(100)
    .with_chunk_overlap(0);

    let result = router().chunk(&request).await.unwrap();
    assert_eq!(result.per_file.len(), 2);
    assert_eq!(result.per_file[0].file_id, "first.txt");
    assert_eq!(result.per_file[1].file_id, "second.txt");
    for per_file in &result.per_file {
        for (i, chunk) in per_file.chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.source_file_id, per_file.file_id);
        }
    }
    // Flattened chunks keep file order.
    assert!(result.chunks[0].text.starts_with('x'));
    assert!(result.chunks.last().unwrap().text.starts_with('y'));
}

#[tokio::test]
async fn undersized_chunk_size_is_a_config_error() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::CharacterSplitting,
        vec![file("a.txt", "text")],
    )
    .with_chunk_size(10)
    .with_chunk_overlap(0);
    let err = router().chunk(&request).await.unwrap_err();
    assert!(matches!(err, CleaverError::Config(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn overlap_at_or_above_chunk_size_is_a_config_error() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::CharacterSplitting,
        vec![file("a.txt", "text")],
    )
    .with_chunk_size(200)
    .with_chunk_overlap(200);
    let err = router().chunk(&request).await.unwrap_err();
    assert!(matches!(err, CleaverError::Config(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn delimiter_strategy_without_config_is_a_config_error() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::CustomDelimiterSplitting,
        vec![file("a.txt", "a|b")],
    );
    let err = router().chunk(&request).await.unwrap_err();
    assert!(matches!(err, CleaverError::Config(_)));
}

#[tokio::test]
async fn mismatched_strategy_config_is_a_config_error() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::RecursiveCharacterSplitting,
        vec![file("a.txt", "text")],
    )
    .with_config(StrategyConfig::CustomDelimiterConfig(
        CustomDelimiterConfig::new("|"),
    ));
    let err = router().chunk(&request).await.unwrap_err();
    assert!(matches!(err, CleaverError::Config(_)));
}

#[tokio::test]
async fn semantic_without_provider_is_a_config_error() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::SemanticSplitting,
        vec![file("a.txt", "One. Two.")],
    );
    let err = router().chunk(&request).await.unwrap_err();
    assert!(matches!(err, CleaverError::Config(_)));
}

#[tokio::test]
async fn semantic_splits_at_topic_boundaries() {
    let router = router().with_embeddings(Arc::new(KeywordEmbeddings));
    let text = "Rust is great. Rust is fast. Cats are fluffy. Cats purr.";
    let request = ChunkingRequest::new(
        ChunkingStrategy::SemanticSplitting,
        vec![file("topics.txt", text)],
    )
    .with_chunk_size(200)
    .with_chunk_overlap(0);

    let result = router.chunk(&request).await.unwrap();
    let texts: Vec<&str> = result.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Rust is great. Rust is fast.", "Cats are fluffy. Cats purr."]
    );
    assert!(!result.meta.fallback_used);
}

#[tokio::test]
async fn semantic_with_fake_embeddings_covers_the_text() {
    let router = router().with_embeddings(Arc::new(FakeEmbeddings::new(16)));
    let text = "First sentence here. Second sentence here. Third sentence here.";
    let request = ChunkingRequest::new(
        ChunkingStrategy::SemanticSplitting,
        vec![file("a.txt", text)],
    )
    .with_chunk_size(200)
    .with_chunk_overlap(0);

    let result = router.chunk(&request).await.unwrap();
    assert!(!result.chunks.is_empty());
    assert!(!result.meta.fallback_used);
    let joined: String = result
        .chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    assert_eq!(strip(&joined), strip(text));
}

#[tokio::test]
async fn semantic_falls_back_when_provider_stays_down() {
    // Enough failures to outlast every retry attempt.
    let router = router().with_embeddings(Arc::new(FlakyEmbeddings::new(100, 8)));
    let request = ChunkingRequest::new(
        ChunkingStrategy::SemanticSplitting,
        vec![file("a.txt", "One sentence. Another sentence. A third one.")],
    )
    .with_chunk_size(200)
    .with_chunk_overlap(0);

    let result = router.chunk(&request).await.unwrap();
    assert!(result.meta.fallback_used);
    assert!(result.meta.fallback_reason.is_some());
    assert!(!result.chunks.is_empty());
}

#[tokio::test]
async fn semantic_recovers_within_retry_budget() {
    let flaky = Arc::new(FlakyEmbeddings::new(1, 8));
    let router = router().with_embeddings(flaky.clone());
    let request = ChunkingRequest::new(
        ChunkingStrategy::SemanticSplitting,
        vec![file("a.txt", "One sentence. Another sentence.")],
    )
    .with_chunk_size(200)
    .with_chunk_overlap(0);

    let result = router.chunk(&request).await.unwrap();
    assert!(!result.meta.fallback_used);
    assert!(flaky.calls() >= 2);
}

#[tokio::test]
async fn agentic_without_provider_is_a_config_error() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::AgenticSplitting,
        vec![file("a.txt", "text to split")],
    );
    let err = router().chunk(&request).await.unwrap_err();
    assert!(matches!(err, CleaverError::Config(_)));
}

#[tokio::test]
async fn agentic_retries_invalid_json_then_succeeds() {
    let model = ScriptedCompletions::new(vec![
        "I think the best split would be...",
        "{\"not\": \"an array\"}",
        r#"["alpha beta.", " gamma delta."]"#,
    ]);
    let router = router().with_completions(Arc::new(model));
    let request = ChunkingRequest::new(
        ChunkingStrategy::AgenticSplitting,
        vec![file("a.txt", "alpha beta. gamma delta.")],
    )
    .with_chunk_size(200)
    .with_chunk_overlap(0);

    let result = router.chunk(&request).await.unwrap();
    assert!(!result.meta.fallback_used);
    assert_eq!(result.chunks.len(), 2);
    assert_eq!(result.chunks[0].text, "alpha beta.");
}

#[tokio::test]
async fn agentic_falls_back_after_exhausting_retries() {
    let model = ScriptedCompletions::new(vec!["nope", "still nope", "not json either"]);
    let router = router().with_completions(Arc::new(model));
    let request = ChunkingRequest::new(
        ChunkingStrategy::AgenticSplitting,
        vec![file("a.txt", "alpha beta. gamma delta.")],
    )
    .with_chunk_size(200)
    .with_chunk_overlap(0);

    let result = router.chunk(&request).await.unwrap();
    assert!(result.meta.fallback_used);
    assert!(!result.chunks.is_empty());
}

#[tokio::test]
async fn agentic_rejects_response_that_drops_content() {
    let model = ScriptedCompletions::new(vec![
        r#"["alpha beta."]"#,
        r#"["alpha beta.", "gamma delta."]"#,
    ]);
    let router = router().with_completions(Arc::new(model));
    let request = ChunkingRequest::new(
        ChunkingStrategy::AgenticSplitting,
        vec![file("a.txt", "alpha beta. gamma delta.")],
    )
    .with_chunk_size(200)
    .with_chunk_overlap(0);

    // First response drops text and is rejected; the second passes.
    let result = router.chunk(&request).await.unwrap();
    assert!(!result.meta.fallback_used);
    assert_eq!(result.chunks.len(), 2);
}

#[tokio::test]
async fn document_splitting_marks_tables_atomic() {
    let text = "Intro paragraph.\n\n| a | b |\n| --- | --- |\n| 1 | 2 |\n\nClosing paragraph.";
    let request = ChunkingRequest::new(
        ChunkingStrategy::DocumentSpecificSplitting,
        vec![file("doc.md", text)],
    )
    .with_config(StrategyConfig::DocumentSpecificConfig(
        DocumentSpecificConfig::new("markdown"),
    ));

    let result = router().chunk(&request).await.unwrap();
    let table = result
        .chunks
        .iter()
        .find(|c| c.text.contains("| 1 | 2 |"))
        .expect("table chunk");
    assert!(table.is_atomic);
}

#[tokio::test]
async fn delimiter_splitting_returns_raw_segments() {
    let request = ChunkingRequest::new(
        ChunkingStrategy::CustomDelimiterSplitting,
        vec![file("a.txt", "section one===section two===section three")],
    )
    .with_config(StrategyConfig::CustomDelimiterConfig(
        CustomDelimiterConfig::new("==="),
    ));

    let result = router().chunk(&request).await.unwrap();
    let texts: Vec<&str> = result.chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["section one", "section two", "section three"]);
    assert_eq!(result.meta.merged_count, None);
}

#[tokio::test]
async fn table_preserving_merger_reports_merged_count() {
    let text = "a---b---c\n| h1 | h2 |\n| --- | --- |\n| x | y |\nd---e";
    let request = ChunkingRequest::new(
        ChunkingStrategy::CustomDelimiterSplittingWithChunkSizeAndLeaveTableAlone,
        vec![file("a.txt", text)],
    )
    .with_config(StrategyConfig::CustomDelimiterConfig(
        CustomDelimiterConfig::new("---"),
    ));

    let result = router().chunk(&request).await.unwrap();
    assert!(result.meta.merged_count.is_some());
    let table = result
        .chunks
        .iter()
        .find(|c| c.is_atomic)
        .expect("table chunk");
    assert!(table.text.contains("| x | y |"));
}
