mod common;

use ground_common::GroundError;
use ground_llm::gemini::GeminiClient;
use ground_llm::traits::{CacheRequest, CachedContentRef, ConversationTurn, GenerationConfig, LlmClient};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "models/gemini-1.5-flash-002";

fn client(server: &MockServer) -> GeminiClient {
    GeminiClient::with_base_url("test-key".into(), MODEL.into(), &format!("{}/v1beta", server.uri()))
        .unwrap()
}

fn cache_ref() -> CachedContentRef {
    CachedContentRef {
        name: "cachedContents/abc123".into(),
        model: MODEL.into(),
        expire_time: None,
    }
}

#[tokio::test]
async fn create_cache_posts_instruction_contents_and_ttl() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/cachedContents"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": MODEL,
            "systemInstruction": { "parts": [{ "text": "be brief" }] },
            "contents": [{ "role": "user", "parts": [{ "text": "URL 1\nSource: https://a.com\n" }] }],
            "ttl": "900s"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "cachedContents/abc123",
            "model": MODEL,
            "expireTime": "2024-10-05T12:15:00.000000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = client(&server)
        .create_cache(&CacheRequest {
            model: MODEL.into(),
            system_instruction: "be brief".into(),
            contents: vec!["URL 1\nSource: https://a.com\n".into()],
            ttl: Duration::from_secs(15 * 60),
        })
        .await
        .unwrap();

    assert_eq!(cache.name, "cachedContents/abc123");
    assert_eq!(cache.model, MODEL);
    assert!(cache.expire_time.is_some());
}

#[tokio::test]
async fn create_cache_failures_are_cache_creation_errors() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/cachedContents"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 400, "message": "Cached content is too small", "status": "INVALID_ARGUMENT" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .create_cache(&CacheRequest {
            model: MODEL.into(),
            system_instruction: "x".into(),
            contents: vec!["tiny".into()],
            ttl: Duration::from_secs(900),
        })
        .await
        .unwrap_err();
    match err {
        GroundError::CacheCreation(msg) => assert!(msg.contains("too small"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn create_cache_is_not_retried_on_server_errors() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/cachedContents"))
        .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
            "error": { "code": 503, "message": "backend unavailable", "status": "UNAVAILABLE" }
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/cachedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "cachedContents/second",
            "model": MODEL
        })))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server)
        .create_cache(&CacheRequest {
            model: MODEL.into(),
            system_instruction: "x".into(),
            contents: vec!["URL 1\n".into()],
            ttl: Duration::from_secs(900),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, GroundError::CacheCreation(_)), "{err}");
}

#[tokio::test]
async fn generate_sends_history_against_the_cache() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-002:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "cachedContent": "cachedContents/abc123",
            "contents": [
                { "role": "user", "parts": [{ "text": "what's the current price" }] },
                { "role": "model", "parts": [{ "text": "About $67k." }] },
                { "role": "user", "parts": [{ "text": "and yesterday?" }] }
            ],
            "generationConfig": { "maxOutputTokens": 8192 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Around " }, { "text": "$66k." }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "totalTokenCount": 1234 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let history = vec![
        ConversationTurn::user("what's the current price"),
        ConversationTurn::model("About $67k."),
        ConversationTurn::user("and yesterday?"),
    ];
    let resp = client(&server)
        .generate(&cache_ref(), &history, &GenerationConfig::default())
        .await
        .unwrap();

    assert_eq!(resp.text, "Around $66k.");
    assert_eq!(resp.tokens_used, Some(1234));
    assert_eq!(resp.finish_reason.as_deref(), Some("STOP"));
}

#[tokio::test]
async fn unknown_cache_surfaces_as_expired() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-002:generateContent"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "code": 403,
                "message": "CachedContent not found (or permission denied)",
                "status": "PERMISSION_DENIED"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .generate(&cache_ref(), &[ConversationTurn::user("hi")], &GenerationConfig::default())
        .await
        .unwrap_err();
    assert!(err.is_cache_expired(), "got {err}");
}

#[tokio::test]
async fn empty_candidates_are_generation_errors() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-002:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .generate(&cache_ref(), &[ConversationTurn::user("hi")], &GenerationConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GroundError::Generation(ref m) if m.contains("SAFETY")), "got {err}");
}
