use std::sync::Arc;

use cleaver_core::Embeddings;
use cleaver_embeddings::{FakeEmbeddings, FlakyEmbeddings, OpenAiEmbeddings, OpenAiEmbeddingsConfig};
use cleaver_models::{FakeBackend, ProviderResponse};
use serde_json::json;

#[tokio::test]
async fn fake_embeddings_are_deterministic_unit_vectors() {
    let embeddings = FakeEmbeddings::new(8);
    let a = embeddings.embed_query("hello world").await.unwrap();
    let b = embeddings.embed_query("hello world").await.unwrap();
    assert_eq!(a, b);
    let magnitude: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((magnitude - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn fake_embeddings_place_repeated_vocabulary_in_the_same_lane() {
    // A single repeated token and that token alone occupy one lane, so the
    // normalized vectors coincide.
    let embeddings = FakeEmbeddings::new(8);
    let a = embeddings.embed_query("rust rust rust").await.unwrap();
    let b = embeddings.embed_query("rust").await.unwrap();
    let cosine: f32 = a.iter().zip(&b).map(|(p, q)| p * q).sum();
    assert!((cosine - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn fake_embeddings_give_whitespace_only_text_a_unit_vector() {
    let embeddings = FakeEmbeddings::new(4);
    let v = embeddings.embed_query("   \n\t").await.unwrap();
    let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((magnitude - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn fake_embeddings_preserve_input_order() {
    let embeddings = FakeEmbeddings::new(4);
    let vectors = embeddings
        .embed_documents(&["alpha", "beta", "gamma"])
        .await
        .unwrap();
    assert_eq!(vectors.len(), 3);
    assert_eq!(vectors[0], embeddings.embed_query("alpha").await.unwrap());
    assert_eq!(vectors[2], embeddings.embed_query("gamma").await.unwrap());
}

#[tokio::test]
async fn flaky_embeddings_fail_then_recover() {
    let embeddings = FlakyEmbeddings::new(2, 4);
    assert!(embeddings.embed_documents(&["x"]).await.is_err());
    assert!(embeddings.embed_documents(&["x"]).await.is_err());
    assert!(embeddings.embed_documents(&["x"]).await.is_ok());
    assert_eq!(embeddings.calls(), 3);
}

#[tokio::test]
async fn openai_embeddings_parse_response() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({
            "data": [
                {"embedding": [0.1, 0.2]},
                {"embedding": [0.3, 0.4]},
            ]
        }),
    });

    let client = OpenAiEmbeddings::new(OpenAiEmbeddingsConfig::new("key"), backend);
    let vectors = client.embed_documents(&["a", "b"]).await.unwrap();
    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
}

#[tokio::test]
async fn openai_embeddings_reject_non_uniform_dimensions() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({
            "data": [
                {"embedding": [0.1, 0.2]},
                {"embedding": [0.3]},
            ]
        }),
    });

    let client = OpenAiEmbeddings::new(OpenAiEmbeddingsConfig::new("key"), backend);
    let err = client.embed_documents(&["a", "b"]).await.unwrap_err();
    assert!(err.to_string().contains("non-uniform"));
}

#[tokio::test]
async fn openai_embeddings_reject_count_mismatch() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({"data": [{"embedding": [0.1, 0.2]}]}),
    });

    let client = OpenAiEmbeddings::new(OpenAiEmbeddingsConfig::new("key"), backend);
    let err = client.embed_documents(&["a", "b"]).await.unwrap_err();
    assert!(err.to_string().contains("expected 2 embeddings"));
}
