//! shoutback library
//!
//! Auto-responder for a room-based chat game: ingests session events, keeps
//! a bounded chat log, asks a hosted model for a reply and shouts it back in
//! chunks.

pub mod ai;
pub mod autoreply;
pub mod channels;
pub mod cli;
pub mod config;
pub mod logging;
