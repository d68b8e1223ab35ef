//! Room channel collaborators
//!
//! Interfaces between the reply engine and the game session: outbound
//! delivery, the user directory, inbound session events, presence sampling
//! and the event log surface.

pub mod directory;
pub mod presence;
pub mod session;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::autoreply::policy::is_presence_notice;

pub use directory::{RoomDirectory, RoomUser, UserDirectory, UNKNOWN_USER};
pub use presence::{PresenceMap, PresenceSource, Position};
pub use session::{ChatKind, SessionEvent, SessionIngestor};

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur in channel operations
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel not connected")]
    NotConnected,

    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sends one chunk of reply text into the room
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Fire a single chunk; callers never exceed the chunk size budget
    async fn send(&self, text: &str) -> ChannelResult<()>;
}

/// Best-effort notification surface for non-fatal conditions
pub trait EventLog: Send + Sync {
    fn log_event(&self, message: &str);
}

/// Forward `message` to the event log unless it is a presence notice
pub fn emit_event(log: &dyn EventLog, message: &str) {
    tracing::debug!(event = %message, "reply engine event");
    if !is_presence_notice(message) {
        log.log_event(message);
    }
}

/// Event log that writes through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventLog;

impl EventLog for TracingEventLog {
    fn log_event(&self, message: &str) {
        tracing::info!(target: "shoutback::events", "{}", message);
    }
}

/// Writes each chunk as a JSON line on stdout
#[derive(Debug)]
pub struct StdoutDispatcher {
    stdout: tokio::sync::Mutex<tokio::io::Stdout>,
}

impl StdoutDispatcher {
    pub fn new() -> Self {
        Self {
            stdout: tokio::sync::Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a chunk as an outbound shout line
pub fn encode_shout(text: &str) -> String {
    let mut line = serde_json::json!({ "type": "shout", "text": text }).to_string();
    line.push('\n');
    line
}

#[async_trait]
impl Dispatcher for StdoutDispatcher {
    async fn send(&self, text: &str) -> ChannelResult<()> {
        let line = encode_shout(text);
        let mut stdout = self.stdout.lock().await;
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}
