//! Integration tests for the café agent
//!
//! The generation backend and every collaborator are in-process stubs, so
//! these tests exercise routing, evidence gathering, memory and synthesis
//! end to end without any network.

use async_trait::async_trait;
use cafe_engine::agent::core::FOLLOW_UP_SYSTEM_PROMPT;
use cafe_engine::agent::intent::ROUTER_SYSTEM_PROMPT;
use cafe_engine::agent::{
    CafeAgent, EvidenceAggregator, IntentDecision, IntentKind, IntentRouter, NO_RESULTS_MESSAGE,
};
use cafe_engine::llm::{GenerationClient, LLMError, LLMProvider};
use sdk::collaborators::{PlaceDetailsLookup, PlaceSearch, WebSearch};
use sdk::errors::EngineError;
use sdk::types::{Candidate, OpeningHours, PlaceDetails, WebSnippet};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ---- Stubs ----

/// Answers routing calls from a table keyed by utterance and echoes every
/// other prompt back as a "report", unless only routing is up
struct ScriptedLLM {
    routes: HashMap<String, String>,
    routing_only: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedLLM {
    fn new(routes: &[(&str, &str)]) -> Arc<Self> {
        Self::build(routes, false)
    }

    /// Routes normally but refuses every other generation call
    fn routing_only(routes: &[(&str, &str)]) -> Arc<Self> {
        Self::build(routes, true)
    }

    fn build(routes: &[(&str, &str)], routing_only: bool) -> Arc<Self> {
        Arc::new(Self {
            routes: routes
                .iter()
                .map(|(u, r)| (u.to_string(), r.to_string()))
                .collect(),
            routing_only,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLLM {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, system: &str) -> Result<String, LLMError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), system.to_string()));

        if system == ROUTER_SYSTEM_PROMPT {
            let utterance = prompt
                .rsplit("使用者：")
                .next()
                .and_then(|s| s.strip_suffix("\n輸出："))
                .unwrap_or_default();
            return Ok(self
                .routes
                .get(utterance)
                .cloned()
                .unwrap_or_else(|| "not json at all".to_string()));
        }

        if self.routing_only {
            return Err(LLMError::Transport("connection refused".to_string()));
        }

        Ok(format!("REPORT\n{}", prompt))
    }
}

struct DownLLM;

#[async_trait]
impl LLMProvider for DownLLM {
    fn name(&self) -> &str {
        "down"
    }

    async fn generate(&self, _prompt: &str, _system: &str) -> Result<String, LLMError> {
        Err(LLMError::Transport("connection refused".to_string()))
    }
}

struct StubPlaces {
    candidates: Vec<Candidate>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubPlaces {
    fn with(candidates: Vec<Candidate>) -> Arc<Self> {
        Arc::new(Self {
            candidates,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            candidates: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PlaceSearch for StubPlaces {
    async fn search_places(&self, _query: &str) -> Result<Vec<Candidate>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::PlaceSearch("OVER_QUERY_LIMIT".to_string()));
        }
        Ok(self.candidates.clone())
    }
}

struct StubDetails;

#[async_trait]
impl PlaceDetailsLookup for StubDetails {
    async fn get_place_details(&self, id: &str) -> Result<PlaceDetails, EngineError> {
        Ok(PlaceDetails {
            name: None,
            reviews: vec![format!("{} 插座很多，營業到凌晨", id)],
            opening_hours: OpeningHours::Listed(vec!["星期一: 12:00 – 02:00".to_string()]),
            map_url: Some(format!("https://maps.google.com/?cid={}", id)),
        })
    }
}

struct StubWeb;

#[async_trait]
impl WebSearch for StubWeb {
    async fn search_web(
        &self,
        subject: &str,
        _keywords: Option<&[String]>,
    ) -> Result<Vec<WebSnippet>, EngineError> {
        Ok(vec![WebSnippet::new(
            subject,
            "https://blog.example.com",
            format!("{} 的深夜讀書心得", subject),
        )])
    }
}

const SEARCH_ROUTE: &str = r#"{"intent": "SEARCH", "search_query": "台南 成大 深夜 咖啡廳", "target_needs": ["插座", "適合讀書", "深夜"]}"#;

fn fixture_routes() -> Vec<(&'static str, &'static str)> {
    vec![
        ("你好", r#"{"intent": "CHAT"}"#),
        ("那這家有插座嗎?", "```json\n{\"intent\": \"FOLLOW_UP\"}\n```"),
        (
            "推薦台南適合讀書的店",
            r#"{"intent": "SEARCH", "query": "台南 適合讀書 咖啡廳"}"#,
        ),
        ("台南成大附近有插座、適合讀書的深夜咖啡廳", SEARCH_ROUTE),
    ]
}

fn two_cafes() -> Vec<Candidate> {
    vec![
        Candidate::new("c1", "深夜書房咖啡", Some(4.6), "台南市東區大學路1號"),
        Candidate::new("c2", "成大旁的貓咖啡", Some(4.3), "台南市東區勝利路2號"),
    ]
}

fn agent_with(llm: Arc<ScriptedLLM>, places: Arc<StubPlaces>) -> CafeAgent {
    let client = GenerationClient::new(llm, "你是一個專業的咖啡廳探店小助手。");
    let aggregator = EvidenceAggregator::new(places, Arc::new(StubDetails), Arc::new(StubWeb));
    CafeAgent::new(client, aggregator)
}

// ---- Routing ----

#[tokio::test]
async fn test_router_fixture_utterances() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let router = IntentRouter::new(GenerationClient::new(llm, "sys"));

    assert_eq!(router.classify("你好").await, IntentDecision::Chat);
    assert_eq!(
        router.classify("那這家有插座嗎?").await,
        IntentDecision::FollowUp
    );

    match router.classify("推薦台南適合讀書的店").await {
        IntentDecision::Search { refined_query, .. } => {
            assert!(!refined_query.trim().is_empty());
            assert_eq!(refined_query, "台南 適合讀書 咖啡廳");
        }
        other => panic!("Expected Search, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_router_unreadable_output_is_chat() {
    let llm = ScriptedLLM::new(&[("嗨嗨", "Sure, this is a greeting!")]);
    let router = IntentRouter::new(GenerationClient::new(llm, "sys"));

    assert_eq!(router.classify("嗨嗨").await, IntentDecision::Chat);
}

#[tokio::test]
async fn test_router_backend_failure_is_chat() {
    let router = IntentRouter::new(GenerationClient::new(Arc::new(DownLLM), "sys"));
    assert_eq!(router.classify("找成大咖啡廳").await, IntentDecision::Chat);
}

#[tokio::test]
async fn test_router_is_idempotent_under_deterministic_backend() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let router = IntentRouter::new(GenerationClient::new(llm.clone(), "sys"));

    let first = router.classify("推薦台南適合讀書的店").await;
    let second = router.classify("推薦台南適合讀書的店").await;

    assert_eq!(first, second);
    assert_eq!(llm.calls().len(), 2);
}

// ---- Turns ----

#[tokio::test]
async fn test_chat_turn_leaves_memory_and_collaborators_alone() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let places = StubPlaces::with(two_cafes());
    let mut agent = agent_with(llm.clone(), places.clone());

    let reply = agent.respond("你好").await.unwrap();

    assert_eq!(reply.intent, IntentKind::Chat);
    assert!(reply.answer.contains("你好"));
    assert!(agent.memory().is_empty());
    assert_eq!(places.calls.load(Ordering::SeqCst), 0);

    // One routing call plus one persona call
    let calls = llm.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1, "你是一個專業的咖啡廳探店小助手。");
}

#[tokio::test]
async fn test_generation_outage_after_routing_becomes_answer_text() {
    let llm = ScriptedLLM::routing_only(&fixture_routes());
    let mut agent = agent_with(llm.clone(), StubPlaces::with(two_cafes()));

    let report = agent
        .run_turn("台南成大附近有插座、適合讀書的深夜咖啡廳")
        .await
        .unwrap();
    assert_eq!(report, "連線發生異常：connection refused");
    // The synthesized text is recorded whatever it says
    assert_eq!(agent.memory().len(), 1);
    assert_eq!(agent.memory().latest().unwrap().answer, report);

    let chat = agent.run_turn("你好").await.unwrap();
    assert!(chat.starts_with("連線發生異常："));

    let follow_up = agent.run_turn("那這家有插座嗎?").await.unwrap();
    assert!(follow_up.starts_with("連線發生異常："));

    assert_eq!(agent.memory().len(), 1);
    // routing + synthesis, then routing + answer for each later turn
    assert_eq!(llm.calls().len(), 6);
}

#[tokio::test]
async fn test_empty_search_returns_fixed_message() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let mut agent = agent_with(llm.clone(), StubPlaces::with(vec![]));

    let answer = agent.run_turn("推薦台南適合讀書的店").await.unwrap();

    assert_eq!(answer, NO_RESULTS_MESSAGE);
    assert_eq!(agent.memory().len(), 0);
    // No synthesis call after the routing call
    assert_eq!(llm.calls().len(), 1);
}

#[tokio::test]
async fn test_successful_search_appends_memory() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let mut agent = agent_with(llm, StubPlaces::with(two_cafes()));

    let reply = agent.respond("推薦台南適合讀書的店").await.unwrap();

    assert_eq!(reply.intent, IntentKind::Search);
    assert_eq!(reply.evidence_count, 2);
    assert_eq!(agent.memory().len(), 1);

    let latest = agent.memory().latest().unwrap();
    assert_eq!(latest.question, "推薦台南適合讀書的店");
    assert_eq!(latest.answer, reply.answer);
    assert_eq!(latest.turn, reply.turn);
}

#[tokio::test]
async fn test_follow_up_uses_memory_without_changing_it() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let mut agent = agent_with(llm.clone(), StubPlaces::with(two_cafes()));

    let report = agent.run_turn("推薦台南適合讀書的店").await.unwrap();
    let before = agent.memory().len();

    let reply = agent.respond("那這家有插座嗎?").await.unwrap();

    assert_eq!(reply.intent, IntentKind::FollowUp);
    assert_eq!(agent.memory().len(), before);

    let calls = llm.calls();
    let (prompt, system) = calls.last().unwrap();
    assert_eq!(system, FOLLOW_UP_SYSTEM_PROMPT);
    assert!(prompt.contains(&report));
    assert!(prompt.contains("那這家有插座嗎?"));
}

#[tokio::test]
async fn test_follow_up_without_history() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let mut agent = agent_with(llm.clone(), StubPlaces::with(two_cafes()));

    let reply = agent.respond("那這家有插座嗎?").await.unwrap();

    assert_eq!(reply.intent, IntentKind::FollowUp);
    assert!(agent.memory().is_empty());
    let calls = llm.calls();
    assert!(calls.last().unwrap().0.contains("尚無先前的推薦紀錄"));
}

#[tokio::test]
async fn test_follow_up_window_is_configurable() {
    let llm = ScriptedLLM::new(&[
        ("找東區咖啡廳", r#"{"intent": "SEARCH", "search_query": "東區"}"#),
        ("找中西區咖啡廳", r#"{"intent": "SEARCH", "search_query": "中西區"}"#),
        ("哪一個比較近?", r#"{"intent": "FOLLOW_UP"}"#),
    ]);
    let mut agent =
        agent_with(llm.clone(), StubPlaces::with(two_cafes())).with_follow_up_turns(2);

    agent.run_turn("找東區咖啡廳").await.unwrap();
    agent.run_turn("找中西區咖啡廳").await.unwrap();
    agent.run_turn("哪一個比較近?").await.unwrap();

    let calls = llm.calls();
    let prompt = &calls.last().unwrap().0;
    assert!(prompt.contains("找東區咖啡廳"));
    assert!(prompt.contains("找中西區咖啡廳"));
    assert!(prompt.find("找東區咖啡廳") < prompt.find("找中西區咖啡廳"));
}

#[tokio::test]
async fn test_blank_utterance_rejected_before_any_call() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let mut agent = agent_with(llm.clone(), StubPlaces::with(two_cafes()));

    let err = agent.run_turn("   \n").await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::EmptyUtterance)
    ));
    assert!(llm.calls().is_empty());
}

#[tokio::test]
async fn test_place_search_failure_propagates() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let mut agent = agent_with(llm, StubPlaces::failing());

    let err = agent.run_turn("推薦台南適合讀書的店").await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::PlaceSearch(_))
    ));
    assert!(agent.memory().is_empty());
}

#[tokio::test]
async fn test_turn_indices_increase() {
    let llm = ScriptedLLM::new(&fixture_routes());
    let mut agent = agent_with(llm, StubPlaces::with(two_cafes()));

    let first = agent.respond("你好").await.unwrap();
    let second = agent.respond("推薦台南適合讀書的店").await.unwrap();

    assert_eq!(first.turn, 1);
    assert_eq!(second.turn, 2);
    assert_eq!(agent.memory().latest().unwrap().turn, 2);
}

// ---- End to end ----

#[tokio::test]
async fn test_late_night_study_cafe_scenario() {
    let utterance = "台南成大附近有插座、適合讀書的深夜咖啡廳";
    let llm = ScriptedLLM::new(&fixture_routes());
    let mut agent = agent_with(llm.clone(), StubPlaces::with(two_cafes()));

    let report = agent.run_turn(utterance).await.unwrap();

    assert!(report.contains("深夜書房咖啡"));
    assert!(report.contains("成大旁的貓咖啡"));
    assert!(report.contains("https://maps.google.com/?cid="));
    assert_eq!(agent.memory().len(), 1);
    assert_eq!(agent.memory().latest().unwrap().question, utterance);

    // The synthesis prompt carries the request, every need and the evidence
    let calls = llm.calls();
    assert_eq!(calls.len(), 2);
    let synthesis_prompt = &calls[1].0;
    assert!(synthesis_prompt.contains(utterance));
    assert!(synthesis_prompt.contains("插座、適合讀書、深夜"));
    assert!(synthesis_prompt.contains("c1 插座很多，營業到凌晨"));
    assert!(synthesis_prompt.contains("深夜書房咖啡 的深夜讀書心得"));
}
