//! Session event ingestion.
//!
//! Consumes decoded room events one at a time, keeps the user directory in
//! sync, and hands chat lines to the reply engine with the sender's name
//! already resolved.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::directory::{RoomDirectory, RoomUser, UserDirectory};
use crate::autoreply::engine::ReplyEngine;
use crate::autoreply::policy::{ChatEvent, LEAVE_MARKER};

/// How a chat line was spoken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    #[default]
    Chat,
    Whisper,
    Shout,
}

/// A decoded event from the room session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Users entered or were listed
    Users { users: Vec<RoomUser> },
    /// Someone spoke
    Chat {
        index: i32,
        text: String,
        #[serde(default)]
        kind: ChatKind,
    },
    /// Someone left
    Leave { index: i32 },
    /// Entered a new room; every index is now stale
    RoomReset,
}

/// Leave notice in the form the rest of the pipeline recognizes
pub fn leave_notice(name: &str, index: i32) -> String {
    format!("{LEAVE_MARKER} {name} (ID: {index}) left the room")
}

/// Feeds session events into the directory and the reply engine
#[derive(Debug, Clone)]
pub struct SessionIngestor {
    engine: Arc<ReplyEngine>,
    directory: Arc<RoomDirectory>,
}

impl SessionIngestor {
    pub fn new(engine: Arc<ReplyEngine>, directory: Arc<RoomDirectory>) -> Self {
        Self { engine, directory }
    }

    pub fn directory(&self) -> &Arc<RoomDirectory> {
        &self.directory
    }

    /// Apply one event. Returns true when a chat line was admitted for reply.
    pub fn handle(&self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Users { users } => {
                let stored = self.directory.upsert(users);
                debug!(stored, "room users updated");
                false
            }
            SessionEvent::Chat { index, text, kind } => {
                let name = self.directory.display_name(index);
                debug!(index, sender = %name, ?kind, "chat observed");
                self.engine.observe(ChatEvent::new(index, name, text))
            }
            SessionEvent::Leave { index } => {
                if let Some(user) = self.directory.remove(index) {
                    debug!("{}", leave_notice(&user.name, index));
                }
                false
            }
            SessionEvent::RoomReset => {
                self.directory.clear();
                debug!("room reset, directory cleared");
                false
            }
        }
    }

    /// Read JSON-line events from `reader` until EOF or cancellation.
    ///
    /// Lines that fail to parse are logged and skipped. Returns the number of
    /// events applied.
    pub async fn run<R>(&self, reader: R, cancel: CancellationToken) -> std::io::Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut applied = 0;
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionEvent>(line) {
                Ok(event) => {
                    self.handle(event);
                    applied += 1;
                }
                Err(e) => warn!(error = %e, "skipping malformed session event"),
            }
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Providers;
    use crate::autoreply::config::ReplyConfig;
    use crate::channels::{ChannelResult, Dispatcher};
    use async_trait::async_trait;

    struct NullDispatcher;

    #[async_trait]
    impl Dispatcher for NullDispatcher {
        async fn send(&self, _text: &str) -> ChannelResult<()> {
            Ok(())
        }
    }

    fn ingestor() -> SessionIngestor {
        let engine = ReplyEngine::new(
            ReplyConfig::default(),
            Providers::http().unwrap(),
            Arc::new(NullDispatcher),
        );
        SessionIngestor::new(Arc::new(engine), Arc::new(RoomDirectory::new()))
    }

    #[test]
    fn test_parse_events() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"type":"chat","index":3,"text":"+hi","kind":"shout"}"#)
                .unwrap();
        assert_eq!(
            event,
            SessionEvent::Chat {
                index: 3,
                text: "+hi".to_string(),
                kind: ChatKind::Shout
            }
        );

        let event: SessionEvent = serde_json::from_str(r#"{"type":"roomReset"}"#).unwrap();
        assert_eq!(event, SessionEvent::RoomReset);

        let event: SessionEvent =
            serde_json::from_str(r#"{"type":"chat","index":1,"text":"x"}"#).unwrap();
        assert!(matches!(event, SessionEvent::Chat { kind: ChatKind::Chat, .. }));
    }

    #[test]
    fn test_leave_notice_is_presence() {
        let notice = leave_notice("Alice", 4);
        assert_eq!(notice, "[LEFT] Alice (ID: 4) left the room");
        assert!(crate::autoreply::policy::is_presence_notice(&notice));
    }

    #[tokio::test]
    async fn test_chat_resolves_names() {
        let ingestor = ingestor();
        ingestor.handle(SessionEvent::Users {
            users: vec![RoomUser::new(3, "Alice")],
        });
        ingestor.handle(SessionEvent::Chat {
            index: 3,
            text: "hello".into(),
            kind: ChatKind::Chat,
        });
        ingestor.handle(SessionEvent::Chat {
            index: 9,
            text: "who am i".into(),
            kind: ChatKind::Whisper,
        });

        let names: Vec<_> = ingestor
            .engine
            .chat_log()
            .into_iter()
            .map(|e| e.username)
            .collect();
        assert_eq!(names, vec!["Alice", "Unknown"]);
    }

    #[tokio::test]
    async fn test_leave_and_reset_update_directory() {
        let ingestor = ingestor();
        ingestor.handle(SessionEvent::Users {
            users: vec![RoomUser::new(1, "A"), RoomUser::new(2, "B")],
        });

        ingestor.handle(SessionEvent::Leave { index: 1 });
        assert_eq!(ingestor.directory().lookup(1), None);
        assert_eq!(ingestor.directory().len(), 1);

        ingestor.handle(SessionEvent::RoomReset);
        assert!(ingestor.directory().is_empty());
    }

    #[tokio::test]
    async fn test_run_skips_malformed_lines() {
        let ingestor = ingestor();
        let input = concat!(
            r#"{"type":"users","users":[{"index":1,"name":"Bob"}]}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"type":"chat","index":1,"text":"hey"}"#,
            "\n",
        );

        let applied = ingestor
            .run(input.as_bytes(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(ingestor.engine.chat_log()[0].username, "Bob");
    }
}
