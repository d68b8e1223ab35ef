//! Reply admission policy.

use chrono::{DateTime, Local};

use super::config::ReplyConfig;

/// Marker the ingestion layer puts in join notices
pub const JOIN_MARKER: &str = "[JOIN]";
/// Marker the ingestion layer puts in leave notices
pub const LEAVE_MARKER: &str = "[LEFT]";

/// A chat line observed in the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Transient session index of the sender
    pub sender_id: i32,
    /// Resolved display name
    pub sender_name: String,
    pub text: String,
    pub observed_at: DateTime<Local>,
}

impl ChatEvent {
    /// Create an event observed now
    pub fn new(sender_id: i32, sender_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender_id,
            sender_name: sender_name.into(),
            text: text.into(),
            observed_at: Local::now(),
        }
    }
}

/// Whether `text` is a presence notice rather than conversation
pub fn is_presence_notice(text: &str) -> bool {
    text.contains(JOIN_MARKER) || text.contains(LEAVE_MARKER)
}

/// Decide whether a reply should be attempted for `event`
pub fn should_reply(event: &ChatEvent, config: &ReplyConfig, enabled: bool) -> bool {
    if !enabled {
        return false;
    }
    if is_presence_notice(&event.text) {
        return false;
    }
    if is_user_ignored(&event.sender_name, config) {
        return false;
    }
    if contains_blacklisted_word(&event.text, config) {
        return false;
    }
    config.respond_to_all || event.text.starts_with(&config.prefix)
}

fn is_user_ignored(username: &str, config: &ReplyConfig) -> bool {
    let username = username.to_lowercase();
    config
        .ignored_users
        .iter()
        .any(|ignored| ignored.to_lowercase() == username)
}

fn contains_blacklisted_word(text: &str, config: &ReplyConfig) -> bool {
    let text = text.to_lowercase();
    config
        .blacklist_words
        .iter()
        .filter(|word| !word.is_empty())
        .any(|word| text.contains(&word.to_lowercase()))
}
