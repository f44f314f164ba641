use async_trait::async_trait;
use chrono::{TimeDelta, TimeZone, Utc};
use ground_chat::{ChatSession, ConversationController, Reply, SessionSettings, SessionState};
use ground_common::{GroundError, Locale, ManualClock, Result};
use ground_llm::traits::{
    CacheRequest, CachedContentRef, ConversationTurn, GenerationConfig, LlmClient, LlmResponse, Role,
};
use ground_web::{ContextRetriever, Document, DocumentMetadata, RetrievalContext};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TRACE: &str = "Currently searching the website: https://a.com/btc\n\
                     Currently searching the website: https://b.com/price";

#[derive(Default)]
struct FakeRetriever {
    queries: Mutex<Vec<String>>,
    fail_next: Mutex<bool>,
    empty: bool,
}

#[async_trait]
impl ContextRetriever for FakeRetriever {
    async fn retrieve(&self, query: &str) -> Result<RetrievalContext> {
        self.queries.lock().unwrap().push(query.to_string());
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(GroundError::SearchProvider("quota exceeded".into()));
        }
        if self.empty {
            return Ok(RetrievalContext::default());
        }
        Ok(RetrievalContext {
            documents: vec![Document {
                content: "BTC trades at 67,000".into(),
                metadata: DocumentMetadata {
                    source: "https://a.com/btc".into(),
                    title: Some("BTC".into()),
                    description: None,
                },
            }],
            doc_string: "URL 1\nSource: https://a.com/btc\nTitle: BTC\nDescription: N/A\nContent: BTC trades at 67,000\n".into(),
            trace: TRACE.into(),
        })
    }
}

#[derive(Default)]
struct FakeLlm {
    cache_requests: Mutex<Vec<CacheRequest>>,
    generate_calls: Mutex<Vec<(String, Vec<ConversationTurn>)>>,
    cache_error: Mutex<Option<GroundError>>,
    generate_error: Mutex<Option<GroundError>>,
    cache_name: Option<String>,
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn create_cache(&self, request: &CacheRequest) -> Result<CachedContentRef> {
        self.cache_requests.lock().unwrap().push(request.clone());
        if let Some(e) = self.cache_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(CachedContentRef {
            name: self
                .cache_name
                .clone()
                .unwrap_or_else(|| format!("cachedContents/{}", self.cache_requests.lock().unwrap().len())),
            model: request.model.clone(),
            expire_time: None,
        })
    }

    async fn generate(
        &self,
        cache: &CachedContentRef,
        history: &[ConversationTurn],
        _config: &GenerationConfig,
    ) -> Result<LlmResponse> {
        let mut calls = self.generate_calls.lock().unwrap();
        calls.push((cache.name.clone(), history.to_vec()));
        if let Some(e) = self.generate_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(LlmResponse {
            text: format!("answer {}", calls.len()),
            model: Some(cache.model.clone()),
            tokens_used: None,
            finish_reason: Some("STOP".into()),
        })
    }

    fn model_name(&self) -> &str {
        "models/fake"
    }
}

struct Harness {
    retriever: Arc<FakeRetriever>,
    llm: Arc<FakeLlm>,
    clock: Arc<ManualClock>,
    controller: ConversationController,
}

fn harness_with(retriever: FakeRetriever, llm: FakeLlm, locale: Locale) -> Harness {
    let retriever = Arc::new(retriever);
    let llm = Arc::new(llm);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 10, 5, 9, 0, 0).unwrap(),
    ));
    let controller = ConversationController::new(
        retriever.clone(),
        llm.clone(),
        clock.clone(),
        SessionSettings {
            locale,
            ..SessionSettings::default()
        },
    );
    Harness {
        retriever,
        llm,
        clock,
        controller,
    }
}

fn harness() -> Harness {
    harness_with(FakeRetriever::default(), FakeLlm::default(), Locale::En)
}

#[tokio::test]
async fn first_message_initializes_the_session() {
    let h = harness();
    let mut session = ChatSession::new();
    assert_eq!(session.state(), SessionState::Uninitialized);

    let reply = h.controller.handle(&mut session, "bitcoin price today").await.unwrap();

    assert_eq!(
        reply,
        Reply::Initialized {
            trace: TRACE.into(),
            confirmation: "Context has been initialized.".into(),
        }
    );
    let text = reply.to_string();
    assert!(text.starts_with("Currently searching the website: https://a.com/btc\n"));
    assert!(text.ends_with("\n\nContext has been initialized."));

    assert_eq!(session.state(), SessionState::Active);
    assert!(session.history().is_empty());
    assert_eq!(*h.retriever.queries.lock().unwrap(), vec!["bitcoin price today"]);

    let requests = h.llm.cache_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "models/gemini-1.5-flash-002");
    assert_eq!(requests[0].ttl, Duration::from_secs(900));
    assert_eq!(requests[0].contents.len(), 1);
    assert!(requests[0].contents[0].starts_with("URL 1\nSource: https://a.com/btc\n"));
    assert!(requests[0].system_instruction.contains("today is"));

    let cache = session.cache().unwrap();
    assert_eq!(cache.ttl(), TimeDelta::minutes(15));
    assert_eq!(cache.created_at(), Utc.with_ymd_and_hms(2024, 10, 5, 9, 0, 0).unwrap());
    assert_eq!(cache.content().len(), 1);
}

#[tokio::test]
async fn follow_up_is_answered_from_the_cache() {
    let h = harness();
    let mut session = ChatSession::new();
    h.controller.handle(&mut session, "bitcoin price today").await.unwrap();

    let reply = h.controller.handle(&mut session, "what's the current price").await.unwrap();

    assert_eq!(reply, Reply::Answer("answer 1".into()));
    assert_eq!(reply.to_string(), "answer 1");
    assert_eq!(
        session.history(),
        &[
            ConversationTurn::user("what's the current price"),
            ConversationTurn::model("answer 1"),
        ]
    );
    // retrieval ran once, for the first message only
    assert_eq!(h.retriever.queries.lock().unwrap().len(), 1);

    let calls = h.llm.generate_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "cachedContents/1");
    assert_eq!(calls[0].1, vec![ConversationTurn::user("what's the current price")]);
}

#[tokio::test]
async fn history_alternates_and_grows_by_two_per_turn() {
    let h = harness();
    let mut session = ChatSession::new();
    h.controller.handle(&mut session, "rust 1.80 release notes").await.unwrap();

    for n in 1..=5 {
        h.controller.handle(&mut session, &format!("question {n}")).await.unwrap();
        assert_eq!(session.history().len(), 2 * n);
    }
    for (i, turn) in session.history().iter().enumerate() {
        let expected = if i % 2 == 0 { Role::User } else { Role::Model };
        assert_eq!(turn.role, expected, "turn {i}");
    }
    // the query never enters the history
    assert!(session
        .history()
        .iter()
        .all(|t| t.content != "rust 1.80 release notes"));
    // the whole history is sent every time
    let calls = h.llm.generate_calls.lock().unwrap();
    assert_eq!(calls.last().unwrap().1.len(), 9);
}

#[tokio::test]
async fn generate_after_ttl_surfaces_cache_expired() {
    let h = harness();
    let mut session = ChatSession::new();
    h.controller.handle(&mut session, "bitcoin price today").await.unwrap();
    h.controller.handle(&mut session, "what's the current price").await.unwrap();

    h.clock.advance(TimeDelta::minutes(16));
    let err = h
        .controller
        .handle(&mut session, "and now?")
        .await
        .unwrap_err();

    assert!(err.is_cache_expired(), "got {err}");
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(h.llm.generate_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn provider_side_expiry_is_surfaced_and_rolled_back() {
    let h = harness();
    let mut session = ChatSession::new();
    h.controller.handle(&mut session, "bitcoin price today").await.unwrap();

    *h.llm.generate_error.lock().unwrap() =
        Some(GroundError::CacheExpiredOrInvalid("CachedContent not found".into()));
    let err = h.controller.handle(&mut session, "price?").await.unwrap_err();
    assert!(err.is_cache_expired());
    assert!(session.history().is_empty());

    // the next turn still works and history stays aligned
    h.controller.handle(&mut session, "price?").await.unwrap();
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[0].role, Role::User);
}

#[tokio::test]
async fn search_failure_leaves_session_uninitialized() {
    let h = harness();
    *h.retriever.fail_next.lock().unwrap() = true;
    let mut session = ChatSession::new();

    let err = h.controller.handle(&mut session, "bitcoin").await.unwrap_err();
    assert!(matches!(err, GroundError::SearchProvider(_)));
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert!(h.llm.cache_requests.lock().unwrap().is_empty());

    // resending the query initializes normally
    let reply = h.controller.handle(&mut session, "bitcoin").await.unwrap();
    assert!(matches!(reply, Reply::Initialized { .. }));
    assert!(session.is_active());
}

#[tokio::test]
async fn cache_creation_failure_leaves_session_uninitialized() {
    let h = harness();
    *h.llm.cache_error.lock().unwrap() = Some(GroundError::CacheCreation("quota".into()));
    let mut session = ChatSession::new();

    let err = h.controller.handle(&mut session, "bitcoin").await.unwrap_err();
    assert!(matches!(err, GroundError::CacheCreation(_)));
    assert_eq!(session.state(), SessionState::Uninitialized);
    assert!(session.cache().is_none());
}

#[tokio::test]
async fn unusable_cache_handle_fails_initialization() {
    let h = harness_with(
        FakeRetriever::default(),
        FakeLlm {
            cache_name: Some(String::new()),
            ..FakeLlm::default()
        },
        Locale::En,
    );
    let mut session = ChatSession::new();

    let err = h.controller.handle(&mut session, "bitcoin").await.unwrap_err();
    assert!(matches!(err, GroundError::ModelHandle(_)));
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn missing_model_is_rejected_before_any_cache_is_created() {
    let retriever = Arc::new(FakeRetriever::default());
    let llm = Arc::new(FakeLlm::default());
    let controller = ConversationController::new(
        retriever.clone(),
        llm.clone(),
        Arc::new(ManualClock::new(Utc::now())),
        SessionSettings {
            model: "  ".into(),
            ..SessionSettings::default()
        },
    );
    let mut session = ChatSession::new();

    let err = controller.handle(&mut session, "bitcoin").await.unwrap_err();

    assert!(matches!(err, GroundError::ModelHandle(_)), "{err}");
    assert!(llm.cache_requests.lock().unwrap().is_empty());
    assert!(retriever.queries.lock().unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn nothing_retrieved_means_nothing_cached() {
    let h = harness_with(
        FakeRetriever {
            empty: true,
            ..FakeRetriever::default()
        },
        FakeLlm::default(),
        Locale::En,
    );
    let mut session = ChatSession::new();

    let err = h.controller.handle(&mut session, "zzzz").await.unwrap_err();
    assert!(matches!(err, GroundError::CacheCreation(_)));
    assert!(h.llm.cache_requests.lock().unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn vietnamese_sessions_use_vietnamese_texts() {
    let h = harness_with(FakeRetriever::default(), FakeLlm::default(), Locale::Vi);
    let mut session = ChatSession::new();

    let reply = h.controller.handle(&mut session, "giá bitcoin hôm nay").await.unwrap();
    assert!(reply
        .to_string()
        .ends_with("\n\nNgữ cảnh đã được khởi tạo. Bạn có thể tiếp tục trò chuyện."));
    let requests = h.llm.cache_requests.lock().unwrap();
    assert!(requests[0].system_instruction.contains("hôm nay là ngày"));
}

#[tokio::test]
async fn sessions_are_independent() {
    let h = harness();
    let mut first = ChatSession::new();
    let mut second = ChatSession::new();
    assert_ne!(first.id(), second.id());

    h.controller.handle(&mut first, "bitcoin").await.unwrap();
    h.controller.handle(&mut first, "price?").await.unwrap();
    assert_eq!(second.state(), SessionState::Uninitialized);

    h.controller.handle(&mut second, "ethereum").await.unwrap();
    assert!(second.history().is_empty());
    assert_ne!(
        first.cache().unwrap().handle().name,
        second.cache().unwrap().handle().name
    );
    assert_eq!(first.history().len(), 2);
}
