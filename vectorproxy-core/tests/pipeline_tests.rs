//! Tests for the bulk enrichment pipeline

mod common;

use std::time::Duration;

use bytes::Bytes;
use common::FakeProvider;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};
use vectorproxy_core::bulk::BulkPipeline;
use vectorproxy_core::path::PathExpression;

fn pipeline(provider: std::sync::Arc<FakeProvider>, paths: &[&str], max: usize) -> BulkPipeline {
    let paths = paths
        .iter()
        .map(|p| PathExpression::parse(p).unwrap())
        .collect();
    BulkPipeline::new(provider, paths, max).unwrap()
}

fn bulk(documents: &[Value]) -> Bytes {
    let mut body = String::new();
    for (i, doc) in documents.iter().enumerate() {
        body.push_str(&format!("{{\"index\":{{\"_id\":\"{}\"}}}}\n", i));
        body.push_str(&doc.to_string());
        body.push('\n');
    }
    Bytes::from(body)
}

fn lines(body: &Bytes) -> Vec<String> {
    String::from_utf8(body.to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn documents(body: &Bytes) -> Vec<Value> {
    lines(body)
        .iter()
        .skip(1)
        .step_by(2)
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_output_keeps_input_order() {
    let provider = FakeProvider::new()
        .with_delay("first", Duration::from_millis(150))
        .with_delay("second", Duration::from_millis(75))
        .into_arc();
    let pipeline = pipeline(provider, &["title"], 3);

    let body = bulk(&[
        json!({"title": "first"}),
        json!({"title": "second"}),
        json!({"title": "third"}),
    ]);
    let output = pipeline.process(body).await.unwrap();

    let all = lines(&output.body);
    assert_eq!(all.len(), 6);
    assert_eq!(all[0], r#"{"index":{"_id":"0"}}"#);
    assert_eq!(all[2], r#"{"index":{"_id":"1"}}"#);
    assert_eq!(all[4], r#"{"index":{"_id":"2"}}"#);

    let docs = documents(&output.body);
    assert_eq!(docs[0]["title"], "first");
    assert_eq!(docs[1]["title"], "second");
    assert_eq!(docs[2]["title"], "third");
    assert_eq!(docs[0]["title_embedding"], json!([5.0]));
    assert_eq!(docs[1]["title_embedding"], json!([6.0]));
    assert_eq!(output.pairs, 3);
    assert_eq!(output.fields_embedded, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_order_survives_random_latency() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut provider = FakeProvider::new();
    let mut docs = Vec::new();
    for i in 0..50 {
        let title = format!("document number {i}");
        let delay = Duration::from_millis(rng.random_range(0..25));
        provider = provider.with_delay(&title, delay);
        docs.push(json!({"title": title}));
    }
    let pipeline = pipeline(provider.into_arc(), &["title"], 8);

    let output = pipeline.process(bulk(&docs)).await.unwrap();

    let all = lines(&output.body);
    assert_eq!(all.len(), 100);
    for (i, doc) in documents(&output.body).iter().enumerate() {
        assert_eq!(all[2 * i], format!("{{\"index\":{{\"_id\":\"{}\"}}}}", i));
        let title = format!("document number {i}");
        assert_eq!(doc["title"], title.as_str());
        assert_eq!(doc["title_embedding"], json!([title.len() as f32]));
    }
    assert_eq!(output.fields_embedded, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_is_bounded() {
    let provider = FakeProvider::new()
        .with_default_delay(Duration::from_millis(20))
        .into_arc();
    let pipeline = pipeline(provider.clone(), &["title"], 2);

    let docs: Vec<Value> = (0..10).map(|i| json!({"title": format!("doc {i}")})).collect();
    let output = pipeline.process(bulk(&docs)).await.unwrap();

    assert_eq!(output.pairs, 10);
    assert_eq!(provider.calls(), 10);
    assert_eq!(provider.peak(), 2, "workers should run two at a time");
}

#[tokio::test]
async fn test_failed_field_leaves_others_enriched() {
    let provider = FakeProvider::new().failing_on("broken").into_arc();
    let pipeline = pipeline(provider, &["a", "b", "c"], 4);

    let body = bulk(&[json!({"a": "one", "b": "broken", "c": "three"})]);
    let output = pipeline.process(body).await.unwrap();

    let doc = &documents(&output.body)[0];
    assert_eq!(doc["a_embedding"], json!([3.0]));
    assert!(doc.get("b_embedding").is_none());
    assert_eq!(doc["c_embedding"], json!([5.0]));
    assert_eq!(output.fields_embedded, 2);
    assert_eq!(output.fields_failed, 1);
    assert_eq!(output.pairs_unmodified, 0);
}

#[tokio::test]
async fn test_orphan_action_is_forwarded() {
    let provider = FakeProvider::new().into_arc();
    let pipeline = pipeline(provider, &["title"], 2);

    let body = Bytes::from_static(
        b"{\"index\":{}}\n{\"title\":\"hi\"}\n{\"delete\":{\"_id\":\"7\"}}\n",
    );
    let output = pipeline.process(body).await.unwrap();

    let all = lines(&output.body);
    assert_eq!(all.len(), 3);
    assert_eq!(all[2], r#"{"delete":{"_id":"7"}}"#);
    assert_eq!(output.pairs, 1);
}

#[tokio::test]
async fn test_invalid_json_document_forwarded_unchanged() {
    let provider = FakeProvider::new().into_arc();
    let pipeline = pipeline(provider.clone(), &["title"], 2);

    let body = Bytes::from_static(b"{\"index\":{}}\n{not json\n{\"index\":{}}\n{\"title\":\"ok\"}\n");
    let output = pipeline.process(body).await.unwrap();

    let all = lines(&output.body);
    assert_eq!(all[1], "{not json");
    assert_eq!(all[3], r#"{"title":"ok","title_embedding":[2.0]}"#);
    assert_eq!(output.pairs_unmodified, 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_nested_array_paths() {
    let provider = FakeProvider::new().into_arc();
    let pipeline = pipeline(provider, &["chapters.#.sections.#.text"], 2);

    let body = bulk(&[json!({
        "chapters": [
            {"sections": [{"text": "a"}, {"text": "bb"}]},
            {"sections": [{"text": "ccc"}]}
        ]
    })]);
    let output = pipeline.process(body).await.unwrap();

    let doc = &documents(&output.body)[0];
    assert_eq!(doc["chapters"][0]["sections"][0]["text_embedding"], json!([1.0]));
    assert_eq!(doc["chapters"][0]["sections"][1]["text_embedding"], json!([2.0]));
    assert_eq!(doc["chapters"][1]["sections"][0]["text_embedding"], json!([3.0]));
    assert_eq!(output.fields_embedded, 3);
}

#[tokio::test]
async fn test_untouched_documents_keep_their_bytes() {
    let provider = FakeProvider::new().into_arc();
    let pipeline = pipeline(provider.clone(), &["missing"], 2);

    let body = Bytes::from_static(b"{\"index\":{}}\n{ \"title\" : \"spaced\" }\n");
    let output = pipeline.process(body.clone()).await.unwrap();

    assert_eq!(output.body, body);
    assert_eq!(provider.calls(), 0);
    assert_eq!(output.pairs_unmodified, 0);
}

#[tokio::test]
async fn test_untargeted_bytes_survive_enrichment() {
    let provider = FakeProvider::new().into_arc();
    let pipeline = pipeline(provider, &["title"], 2);

    let body = Bytes::from_static(
        b"{\"index\":{}}\n{\"title\":\"ab\",\"id\":123456789012345678901234,\"price\":1.10,\"exp\":1e2,\"dup\":1,\"dup\":2}\n",
    );
    let output = pipeline.process(body).await.unwrap();

    let all = lines(&output.body);
    assert_eq!(
        all[1],
        r#"{"title":"ab","id":123456789012345678901234,"price":1.10,"exp":1e2,"dup":1,"dup":2,"title_embedding":[2.0]}"#
    );
}

#[tokio::test]
async fn test_nested_embedding_keeps_surrounding_layout() {
    let provider = FakeProvider::new().into_arc();
    let pipeline = pipeline(provider, &["chapters.#.body"], 2);

    let body = Bytes::from_static(
        b"{\"index\":{}}\n{ \"chapters\": [ {\"body\": \"xyz\", \"n\": 1.50} ], \"v\": 2e0 }\n",
    );
    let output = pipeline.process(body).await.unwrap();

    assert_eq!(
        lines(&output.body)[1],
        r#"{ "chapters": [ {"body": "xyz", "n": 1.50,"body_embedding":[3.0]} ], "v": 2e0 }"#
    );
}

#[tokio::test]
async fn test_stale_embedding_is_replaced() {
    let provider = FakeProvider::new().into_arc();
    let pipeline = pipeline(provider, &["title"], 1);

    let body = bulk(&[json!({"title": "abcd", "title_embedding": "stale"})]);
    let output = pipeline.process(body).await.unwrap();

    let doc = &documents(&output.body)[0];
    assert_eq!(doc["title_embedding"], json!([4.0]));
}

#[tokio::test]
async fn test_empty_body() {
    let provider = FakeProvider::new().into_arc();
    let pipeline = pipeline(provider, &["title"], 2);

    let output = pipeline.process(Bytes::new()).await.unwrap();
    assert!(output.body.is_empty());
    assert_eq!(output.pairs, 0);
}

#[test]
fn test_zero_concurrency_rejected() {
    let provider = FakeProvider::new().into_arc();
    let paths = vec![PathExpression::parse("title").unwrap()];
    assert!(BulkPipeline::new(provider, paths, 0).is_err());
}
