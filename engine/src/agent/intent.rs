//! Intent Router
//!
//! Classifies each utterance as small talk, a follow-up on the previous
//! recommendation, or a fresh venue search. The model is asked for a bare
//! JSON object; anything that cannot be read as one of the three intents is
//! treated as small talk so a confused classifier never triggers a search.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::llm::{self, GenerationClient};

/// System instruction for the classification call
pub const ROUTER_SYSTEM_PROMPT: &str = "你只會輸出純 JSON，不包含任何解釋。";

/// The three conversational intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    Chat,
    FollowUp,
    Search,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentKind::Chat => write!(f, "CHAT"),
            IntentKind::FollowUp => write!(f, "FOLLOW_UP"),
            IntentKind::Search => write!(f, "SEARCH"),
        }
    }
}

/// Routing outcome for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentDecision {
    Chat,
    FollowUp,
    Search {
        /// Query text handed to place search
        refined_query: String,
        /// Requirements to verify against the evidence (may be empty)
        needs: Vec<String>,
    },
}

impl IntentDecision {
    pub fn kind(&self) -> IntentKind {
        match self {
            IntentDecision::Chat => IntentKind::Chat,
            IntentDecision::FollowUp => IntentKind::FollowUp,
            IntentDecision::Search { .. } => IntentKind::Search,
        }
    }
}

/// Few-shot classifier backed by the generation client
#[derive(Clone)]
pub struct IntentRouter {
    llm: GenerationClient,
}

impl IntentRouter {
    pub fn new(llm: GenerationClient) -> Self {
        Self { llm }
    }

    /// Classify one utterance. Makes exactly one generation call and never fails.
    pub async fn classify(&self, utterance: &str) -> IntentDecision {
        let prompt = build_routing_prompt(utterance);

        let raw = match self.llm.generate(&prompt, Some(ROUTER_SYSTEM_PROMPT)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Intent classification failed, treating as CHAT: {}", e);
                return IntentDecision::Chat;
            }
        };

        tracing::debug!("Router output: {}", raw);

        match parse_intent(&raw, utterance) {
            Some(decision) => decision,
            None => {
                tracing::warn!("Unreadable router output, treating as CHAT");
                IntentDecision::Chat
            }
        }
    }
}

/// Build the classification prompt for one utterance
pub fn build_routing_prompt(utterance: &str) -> String {
    format!(
        r#"你是一個咖啡廳推薦助手的意圖分類器。請判斷使用者這句話屬於哪一類：

- CHAT：打招呼、閒聊或詢問助手本身。例如「你好」、「你是誰」、「今天天氣不錯」。
- FOLLOW_UP：針對剛才推薦過的店家追問細節或比較。例如「那這家有插座嗎?」、「哪一個比較近?」。
- SEARCH：要找新的店家。例如「找成大咖啡廳」、「推薦巴斯克蛋糕店」。

只輸出一個 JSON 物件，格式如下：
{{"intent": "CHAT" | "FOLLOW_UP" | "SEARCH", "search_query": "給地圖搜尋用的關鍵字", "target_needs": ["需要查證的條件"]}}
search_query 與 target_needs 只在 SEARCH 時需要。

範例：
使用者：嗨
輸出：{{"intent": "CHAT"}}
使用者：那家店開到幾點?
輸出：{{"intent": "FOLLOW_UP"}}
使用者：如果只能選一間去，你會推薦哪一家?
輸出：{{"intent": "FOLLOW_UP"}}
使用者：推薦台南適合讀書的店
輸出：{{"intent": "SEARCH", "search_query": "台南 適合讀書 咖啡廳", "target_needs": ["適合讀書"]}}

使用者：{utterance}
輸出："#
    )
}

/// Read a router reply.
///
/// Returns `None` when the reply holds no JSON object, the object has no
/// `intent`, or the intent is not one of the three tags.
pub fn parse_intent(raw: &str, utterance: &str) -> Option<IntentDecision> {
    let json = llm::find_json_object(raw)?;
    let value: Value = serde_json::from_str(json).ok()?;
    let object = value.as_object()?;

    let intent = object.get("intent")?.as_str()?.trim().to_ascii_uppercase();

    match intent.as_str() {
        "CHAT" => Some(IntentDecision::Chat),
        "FOLLOW_UP" => Some(IntentDecision::FollowUp),
        "SEARCH" => {
            let refined_query = object
                .get("search_query")
                .or_else(|| object.get("query"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .unwrap_or_else(|| utterance.trim())
                .to_string();

            let needs = object
                .get("target_needs")
                .map(read_needs)
                .unwrap_or_default();

            Some(IntentDecision::Search {
                refined_query,
                needs,
            })
        }
        _ => None,
    }
}

/// `target_needs` may be a list of strings or a single string
fn read_needs(value: &Value) -> Vec<String> {
    let items: Vec<&str> = match value {
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        Value::String(single) => vec![single.as_str()],
        _ => Vec::new(),
    };

    items
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
