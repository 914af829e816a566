//! Café recommendation agent
//!
//! The agent routes each utterance, gathers evidence for searches, grounds
//! follow-ups on conversation memory and synthesizes the final report.

pub mod core;
pub mod evidence;
pub mod intent;
pub mod memory;
pub mod synthesis;

pub use self::core::{CafeAgent, Query, TurnReply, NO_RESULTS_MESSAGE};
pub use evidence::EvidenceAggregator;
pub use intent::{IntentDecision, IntentKind, IntentRouter};
pub use memory::{ConversationMemory, ConversationTurn};
pub use synthesis::SynthesisEngine;
