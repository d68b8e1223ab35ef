//! Global reply cooldown.
//!
//! One timestamp shared by every sender. The gate is a plain value; callers
//! keep it inside the engine's state lock so check and set happen together.

use std::time::{Duration, Instant};

/// Tracks when the last reply was allowed through
#[derive(Debug, Clone, Default)]
pub struct CooldownGate {
    last_reply_at: Option<Instant>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a reply if at least `cooldown` has passed since the last one
    pub fn try_acquire(&mut self, cooldown: Duration) -> bool {
        self.try_acquire_at(Instant::now(), cooldown)
    }

    /// Same as [`try_acquire`](Self::try_acquire) with an explicit clock reading
    pub fn try_acquire_at(&mut self, now: Instant, cooldown: Duration) -> bool {
        if let Some(last) = self.last_reply_at {
            if now.saturating_duration_since(last) < cooldown {
                return false;
            }
        }
        self.last_reply_at = Some(now);
        true
    }

    pub fn last_reply_at(&self) -> Option<Instant> {
        self.last_reply_at
    }

    /// Forget the last reply so the next attempt is admitted
    pub fn reset(&mut self) {
        self.last_reply_at = None;
    }
}
