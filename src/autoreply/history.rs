//! Chat History
//!
//! Bounded, time-ordered log of every chat line observed in the room. The
//! reply pipeline reads a trailing window of it to give the model some memory
//! of the conversation.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum number of entries retained.
pub const HISTORY_CAPACITY: usize = 100;

/// A single observed chat line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryEntry {
    /// When the line was observed
    pub observed_at: DateTime<Local>,
    /// Display name of the sender
    pub username: String,
    /// Raw message text
    pub message: String,
}

/// FIFO ring of chat lines with a fixed capacity
#[derive(Debug, Clone)]
pub struct ChatHistory {
    entries: VecDeque<ChatHistoryEntry>,
    capacity: usize,
}

impl ChatHistory {
    /// Create an empty history holding at most [`HISTORY_CAPACITY`] entries
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create an empty history with a custom capacity (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line timestamped now
    pub fn append(&mut self, username: impl Into<String>, message: impl Into<String>) {
        self.append_at(Local::now(), username, message);
    }

    /// Append a line with an explicit timestamp, evicting the oldest entry at capacity
    pub fn append_at(
        &mut self,
        observed_at: DateTime<Local>,
        username: impl Into<String>,
        message: impl Into<String>,
    ) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ChatHistoryEntry {
            observed_at,
            username: username.into(),
            message: message.into(),
        });
    }

    /// The last `n` entries in chronological order
    pub fn window(&self, n: usize) -> Vec<ChatHistoryEntry> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(start).cloned().collect()
    }

    /// Copy of every retained entry
    pub fn snapshot(&self) -> Vec<ChatHistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new()
    }
}
