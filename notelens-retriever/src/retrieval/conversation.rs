//! In-memory conversation history for a chat session.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Turns kept for reformulation and answer prompts. Older turns fall off so
/// the text sent to the models stays bounded.
pub const MAX_RECENT_TURNS: usize = 8;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TurnRole {
    Asker,
    Assistant,
}

impl TurnRole {
    /// Label used when rendering turns into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::Asker => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

/// One utterance in the session.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Session-scoped history, bounded to the most recent
/// [`MAX_RECENT_TURNS`] turns.
#[derive(Debug, Default, Clone)]
pub struct ConversationLog {
    turns: VecDeque<ChatTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: TurnRole, content: impl Into<String>) {
        self.turns.push_back(ChatTurn {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        while self.turns.len() > MAX_RECENT_TURNS {
            self.turns.pop_front();
        }
    }

    /// Turns in chronological order, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &ChatTurn> {
        self.turns.iter()
    }

    /// The most recent asker turn, if any.
    pub fn last_asker_turn(&self) -> Option<&ChatTurn> {
        self.turns.iter().rev().find(|t| t.role == TurnRole::Asker)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
