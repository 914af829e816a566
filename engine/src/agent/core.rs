//! Agent Core
//!
//! `CafeAgent` runs one conversational turn at a time:
//!
//! 1. Reject blank utterances before any external call
//! 2. Route the utterance (CHAT / FOLLOW_UP / SEARCH)
//! 3. CHAT: persona reply, no collaborators
//! 4. FOLLOW_UP: answer from the most recent recorded turn(s)
//! 5. SEARCH: gather evidence, synthesize a report, record the exchange
//!
//! Only a SEARCH turn that found evidence changes the conversation memory.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use sdk::errors::EngineError;

use super::evidence::EvidenceAggregator;
use super::intent::{IntentDecision, IntentKind, IntentRouter};
use super::memory::{ConversationMemory, ConversationTurn};
use super::synthesis::SynthesisEngine;
use crate::llm::GenerationClient;

/// Reply when place search finds nothing
pub const NO_RESULTS_MESSAGE: &str =
    "目前在該地區找不到符合條件的咖啡廳，建議嘗試調整需求（例如放寬插座或特定甜點限制）。";

/// System instruction for follow-up answers
pub const FOLLOW_UP_SYSTEM_PROMPT: &str = "請根據先前的推薦結果回答使用者的細節問題。";

/// Shown in place of history when nothing has been recommended yet
const NO_HISTORY: &str = "（尚無先前的推薦紀錄）";

/// One user utterance, numbered within the agent's lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub turn: u64,
    pub utterance: String,
}

/// Outcome of one turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub turn: u64,
    pub intent: IntentKind,
    pub answer: String,
    /// Evidence records behind the answer (0 unless SEARCH found candidates)
    pub evidence_count: usize,
}

/// Café recommendation agent
pub struct CafeAgent {
    llm: GenerationClient,
    router: IntentRouter,
    aggregator: EvidenceAggregator,
    synthesis: SynthesisEngine,
    memory: ConversationMemory,
    follow_up_turns: usize,
    next_turn: u64,
}

impl CafeAgent {
    pub fn new(llm: GenerationClient, aggregator: EvidenceAggregator) -> Self {
        Self {
            router: IntentRouter::new(llm.clone()),
            synthesis: SynthesisEngine::new(llm.clone()),
            llm,
            aggregator,
            memory: ConversationMemory::new(),
            follow_up_turns: 1,
            next_turn: 1,
        }
    }

    /// Past turns shown when answering a follow-up, at least 1
    pub fn with_follow_up_turns(mut self, turns: usize) -> Self {
        self.follow_up_turns = turns.max(1);
        self
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Run one turn and return only the answer text
    pub async fn run_turn(&mut self, utterance: &str) -> Result<String> {
        Ok(self.respond(utterance).await?.answer)
    }

    /// Run one turn
    ///
    /// # Errors
    ///
    /// - `EngineError::EmptyUtterance` for a blank utterance
    /// - Collaborator failures from evidence gathering
    pub async fn respond(&mut self, utterance: &str) -> Result<TurnReply> {
        if utterance.trim().is_empty() {
            return Err(EngineError::EmptyUtterance.into());
        }

        let query = Query {
            turn: self.next_turn,
            utterance: utterance.to_string(),
        };
        self.next_turn += 1;

        let start = Instant::now();
        let decision = self.router.classify(&query.utterance).await;
        info!("Turn {} routed as {}", query.turn, decision.kind());

        let reply = match decision {
            IntentDecision::Chat => TurnReply {
                turn: query.turn,
                intent: IntentKind::Chat,
                answer: self.llm.chat(&build_chat_prompt(&query.utterance), None).await,
                evidence_count: 0,
            },
            IntentDecision::FollowUp => {
                let history = self.memory.last(self.follow_up_turns);
                let prompt = build_follow_up_prompt(history, &query.utterance);
                TurnReply {
                    turn: query.turn,
                    intent: IntentKind::FollowUp,
                    answer: self.llm.chat(&prompt, Some(FOLLOW_UP_SYSTEM_PROMPT)).await,
                    evidence_count: 0,
                }
            }
            IntentDecision::Search {
                refined_query,
                needs,
            } => self.search_turn(&query, &refined_query, &needs).await?,
        };

        info!(
            "Turn {} finished in {:.1}s",
            query.turn,
            start.elapsed().as_secs_f64()
        );
        Ok(reply)
    }

    async fn search_turn(
        &mut self,
        query: &Query,
        refined_query: &str,
        needs: &[String],
    ) -> Result<TurnReply> {
        debug!("Searching '{}' with needs {:?}", refined_query, needs);

        let evidence = self
            .aggregator
            .gather(refined_query)
            .await
            .with_context(|| format!("Evidence gathering failed for '{}'", refined_query))?;

        if evidence.is_empty() {
            return Ok(TurnReply {
                turn: query.turn,
                intent: IntentKind::Search,
                answer: NO_RESULTS_MESSAGE.to_string(),
                evidence_count: 0,
            });
        }

        let report = self
            .synthesis
            .synthesize(&query.utterance, needs, &evidence)
            .await;

        self.memory.append(ConversationTurn::new(
            query.turn,
            query.utterance.clone(),
            report.clone(),
        ));

        Ok(TurnReply {
            turn: query.turn,
            intent: IntentKind::Search,
            answer: report,
            evidence_count: evidence.len(),
        })
    }
}

/// Persona-framed small talk prompt
pub fn build_chat_prompt(utterance: &str) -> String {
    format!(
        "使用者跟你打招呼或閒聊：{}。請以親切的咖啡愛好者、咖啡探店部落客身分回覆。",
        utterance
    )
}

/// Follow-up prompt grounded on recorded turns (oldest first)
pub fn build_follow_up_prompt(history: &[ConversationTurn], utterance: &str) -> String {
    let history_text = if history.is_empty() {
        NO_HISTORY.to_string()
    } else {
        history
            .iter()
            .map(|t| format!("【第 {} 輪】\n問：{}\n答：{}", t.turn, t.question, t.answer))
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!("歷史紀錄：\n{}\n追問：{}", history_text, utterance)
}
