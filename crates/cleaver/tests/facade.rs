use cleaver::core::{ChunkingRequest, ChunkingStrategy, EngineConfig, SourceFile};
use cleaver::splitters::StrategyRouter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn default_features_chunk_end_to_end() {
    init_tracing();
    let router = StrategyRouter::new(EngineConfig::default());
    let text = "First paragraph of the document.\n\nSecond paragraph, a bit longer \
                than the first one.\n\nThird paragraph closes it out.";
    let request = ChunkingRequest::new(
        ChunkingStrategy::Auto,
        vec![SourceFile::new("doc.txt", text)],
    );

    let result = router.chunk(&request).await.unwrap();
    assert!(!result.is_empty());
    assert_eq!(
        result.meta.strategy,
        ChunkingStrategy::RecursiveCharacterSplitting
    );
    assert_eq!(result.per_file[0].file_id, "doc.txt");
}
