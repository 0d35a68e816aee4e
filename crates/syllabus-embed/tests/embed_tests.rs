use syllabus_core::traits::Embedder;
use syllabus_embed::{get_default_embedder, HashingEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading large model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder().expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 1024, "embedding dim is 1024");
    assert!(embedder.embedder_id().starts_with("hash:"));

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_tokens_raise_similarity() {
    let e = HashingEmbedder::new(256);
    let q = e.embed_text("What are the prerequisites for MDPS476?");
    let close = e.embed_text("prerequisites for MDPS476 are MDPS423");
    let far = e.embed_text("mission of the program");
    assert!(cosine(&q, &close) > cosine(&q, &far));
    assert!(cosine(&q, &close) > 0.0);
}

#[test]
fn punctuation_and_case_do_not_matter() {
    let e = HashingEmbedder::new(64);
    assert_eq!(e.embed_text("MDPS476?"), e.embed_text("mdps476"));
}

#[test]
fn empty_text_is_zero_vector() {
    let v = HashingEmbedder::new(8).embed_text("  ");
    assert!(v.iter().all(|x| *x == 0.0));
}
