//! Persistence strategies and the windowed deduplication cache
//!
//! A strategy answers one question per sample batch: should this message's
//! data be persisted, given its timestamp and originator? The deduplicating
//! form keeps the last accepted timestamp per originator in a concurrent
//! map, so the check-and-update is atomic per entity while entities never
//! contend with each other.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use telemetry_model::EntityId;

/// Decides whether a message's samples should be persisted
#[derive(Debug)]
pub enum PersistenceStrategy {
    /// Persist every message
    OnEveryMessage,
    /// Never persist
    Skip,
    /// Persist the first message per originator in each fixed-length window
    Deduplicate {
        /// Window length in milliseconds
        interval_ms: i64,
        /// Last accepted timestamp per originator
        last_accepted: DashMap<EntityId, i64>,
    },
}

impl PersistenceStrategy {
    /// Strategy that persists every message
    pub fn on_every_message() -> Self {
        PersistenceStrategy::OnEveryMessage
    }

    /// Strategy that never persists
    pub fn skip() -> Self {
        PersistenceStrategy::Skip
    }

    /// Windowed deduplication with the interval given in seconds, as it is
    /// stored in node configuration
    pub fn deduplicate(interval_secs: u64) -> Self {
        PersistenceStrategy::Deduplicate {
            interval_ms: (interval_secs as i64) * 1_000,
            last_accepted: DashMap::new(),
        }
    }

    /// Answer whether `ts` is the first qualifying occurrence for
    /// `originator` in the current window.
    ///
    /// The deduplicating form compares against the last *accepted*
    /// timestamp, not the maximum ever seen, so out-of-order delivery can
    /// open a window early or suppress a message that predates the current
    /// window. Upstream ordering is the bus's concern, not ours.
    pub fn should_persist(&self, ts: i64, originator: EntityId) -> bool {
        match self {
            PersistenceStrategy::OnEveryMessage => true,
            PersistenceStrategy::Skip => false,
            PersistenceStrategy::Deduplicate {
                interval_ms,
                last_accepted,
            } => match last_accepted.entry(originator) {
                // Entry holds the shard lock, making the per-key
                // check-and-update atomic under concurrent callers.
                Entry::Occupied(mut entry) => {
                    if ts - *entry.get() >= *interval_ms {
                        entry.insert(ts);
                        true
                    } else {
                        false
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(ts);
                    true
                }
            },
        }
    }

    /// Evict cache entries for originators idle longer than
    /// `factor * interval`. The cache grows unbounded by default (one entry
    /// per originator ever seen); hosts that care can call this from a
    /// periodic task. Returns the number of evicted entries.
    pub fn sweep_stale(&self, now_ms: i64, factor: u32) -> usize {
        match self {
            PersistenceStrategy::Deduplicate {
                interval_ms,
                last_accepted,
            } => {
                let horizon = interval_ms.saturating_mul(i64::from(factor.max(1)));
                // Counted inside the predicate: the map length can move
                // under concurrent inserts while the sweep runs, so a
                // before/after length diff is not reliable.
                let mut evicted = 0usize;
                last_accepted.retain(|_, last| {
                    let keep = now_ms - *last < horizon;
                    if !keep {
                        evicted += 1;
                    }
                    keep
                });
                if evicted > 0 {
                    debug!(evicted, horizon_ms = horizon, "Swept stale dedup entries");
                }
                evicted
            }
            _ => 0,
        }
    }

    /// Number of originators currently tracked by the dedup cache
    pub fn tracked_entities(&self) -> usize {
        match self {
            PersistenceStrategy::Deduplicate { last_accepted, .. } => last_accepted.len(),
            _ => 0,
        }
    }
}
