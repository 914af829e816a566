//! Conversation Memory
//!
//! Append-only record of the question/answer pairs from successful search
//! turns. Follow-up questions are grounded on the most recent entries. The
//! memory lives inside one agent instance and is gone when the process exits.

use serde::Serialize;

/// One recorded exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    /// Turn index of the query that produced this exchange
    pub turn: u64,

    /// The user's utterance, verbatim
    pub question: String,

    /// The report returned for it
    pub answer: String,
}

impl ConversationTurn {
    pub fn new(turn: u64, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            turn,
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Ordered, append-only conversation history
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
}

impl ConversationMemory {
    /// Create an empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed exchange
    pub fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// The most recent `n` turns, oldest first.
    ///
    /// Returns fewer than `n` when the memory is shorter, and an empty slice
    /// when it is empty or `n` is 0.
    pub fn last(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// The most recent turn, if any
    pub fn latest(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
