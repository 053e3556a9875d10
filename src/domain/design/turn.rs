//! Conversation turns and the bounded history window.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::foundation::Timestamp;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message in the design conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    /// Suggestions shown alongside an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    pub timestamp: Timestamp,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            suggestions: Vec::new(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn assistant(text: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            suggestions,
            timestamp: Timestamp::now(),
        }
    }
}

/// Recent turns kept for classification and prompt composition.
///
/// Oldest turns are dropped once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct TurnWindow {
    capacity: usize,
    turns: VecDeque<ConversationTurn>,
}

impl TurnWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            turns: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        if self.turns.len() == self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// The most recent assistant turn, if any.
    pub fn last_assistant(&self) -> Option<&ConversationTurn> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == TurnRole::Assistant)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn to_vec(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
