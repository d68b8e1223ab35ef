//! Room presence sampling.
//!
//! A background loop that periodically snapshots where every entity in the
//! room is standing. It shares nothing with the reply pipeline's lock.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How often the presence source is resampled
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Tile coordinates of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Something that can enumerate the entities currently in the room
pub trait PresenceSource: Send + Sync {
    fn entities(&self) -> Vec<(String, Position)>;
}

/// Latest name → position snapshot
#[derive(Debug, Default)]
pub struct PresenceMap {
    positions: RwLock<HashMap<String, Position>>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole snapshot
    pub fn replace(&self, positions: HashMap<String, Position>) {
        *self.positions.write() = positions;
    }

    pub fn position(&self, name: &str) -> Option<Position> {
        self.positions.read().get(name).copied()
    }

    pub fn snapshot(&self) -> HashMap<String, Position> {
        self.positions.read().clone()
    }

    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.read().is_empty()
    }
}

/// Resample `source` into `map` every `every` until `cancel` fires
pub fn spawn_sampler(
    source: Arc<dyn PresenceSource>,
    map: Arc<PresenceMap>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let positions: HashMap<_, _> = source.entities().into_iter().collect();
                    map.replace(positions);
                }
            }
        }
        debug!("presence sampler stopped");
    })
}
