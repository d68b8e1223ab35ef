//! Conversation context rendering
//!
//! The rendered chat log is the model's only memory of the room.

use std::fmt::Write;

use super::history::ChatHistoryEntry;

/// First line of every rendered context
pub const CONTEXT_HEADER: &str = "Previous Chatlog:";

/// Render history lines as `HH:MM:SS:username:message`, oldest first
pub fn render(window: &[ChatHistoryEntry]) -> String {
    let mut out = String::with_capacity(CONTEXT_HEADER.len() + 1 + window.len() * 48);
    out.push_str(CONTEXT_HEADER);
    out.push('\n');
    for entry in window {
        let _ = writeln!(
            out,
            "{}:{}:{}",
            entry.observed_at.format("%H:%M:%S"),
            entry.username,
            entry.message
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoreply::history::ChatHistory;
    use chrono::{Local, TimeZone};

    #[test]
    fn test_empty_window_is_header_only() {
        assert_eq!(render(&[]), "Previous Chatlog:\n");
    }

    #[test]
    fn test_lines_in_order() {
        let mut history = ChatHistory::new();
        let t1 = Local.with_ymd_and_hms(2024, 5, 1, 9, 5, 7).unwrap();
        let t2 = Local.with_ymd_and_hms(2024, 5, 1, 21, 30, 0).unwrap();
        history.append_at(t1, "Alice", "hi all");
        history.append_at(t2, "Bob", "+how are you");

        let rendered = render(&history.window(10));
        assert_eq!(
            rendered,
            "Previous Chatlog:\n09:05:07:Alice:hi all\n21:30:00:Bob:+how are you\n"
        );
    }

    #[test]
    fn test_only_window_is_rendered() {
        let mut history = ChatHistory::new();
        for i in 0..5 {
            history.append("user", format!("msg{i}"));
        }

        let rendered = render(&history.window(2));
        assert_eq!(rendered.lines().count(), 3);
        assert!(rendered.contains(":user:msg3\n"));
        assert!(rendered.ends_with(":user:msg4\n"));
        assert!(!rendered.contains("msg2"));
    }
}
