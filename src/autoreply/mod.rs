//! Auto-reply Module
//!
//! Watches room chat and answers admitted lines with a model-generated
//! reply, split into chunks short enough for the game's chat box.

pub mod chunking;
pub mod config;
pub mod context;
pub mod cooldown;
pub mod engine;
pub mod history;
pub mod policy;
pub mod sanitize;

pub use config::{Backend, ReplyConfig};
pub use cooldown::CooldownGate;
pub use engine::{create_engine, EngineOptions, ReplyEngine, ReplyOutcome};
pub use history::{ChatHistory, ChatHistoryEntry};
pub use policy::{should_reply, ChatEvent};
