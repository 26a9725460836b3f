//! Persistence settings - the per-node policy resolving each message to a
//! save decision
//!
//! Exactly one of the four variants is active per node instance, fixed at
//! node initialization. Dispatch is exhaustive; adding a variant is a
//! compile-time-visible change for every consumer.

use telemetry_model::EntityId;

use crate::strategy::PersistenceStrategy;

/// What to do with one message's samples: persist history, update the
/// latest-value snapshot, push to web-socket subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveDecision {
    /// Write samples to the time-series history store
    pub save_timeseries: bool,
    /// Update the latest-value snapshot
    pub save_latest: bool,
    /// Push a real-time update to subscribed sessions
    pub send_ws_update: bool,
}

impl SaveDecision {
    /// Persist everywhere and notify subscribers
    pub const SAVE_ALL: SaveDecision = SaveDecision {
        save_timeseries: true,
        save_latest: true,
        send_ws_update: true,
    };

    /// Notify subscribers only, persist nothing
    pub const WS_ONLY: SaveDecision = SaveDecision {
        save_timeseries: false,
        save_latest: false,
        send_ws_update: true,
    };

    /// Do nothing at all
    pub const SKIP_ALL: SaveDecision = SaveDecision {
        save_timeseries: false,
        save_latest: false,
        send_ws_update: false,
    };

    /// True when all three actions are suppressed; the node acknowledges
    /// the message without decoding or submitting anything.
    pub fn is_skip_all(&self) -> bool {
        !self.save_timeseries && !self.save_latest && !self.send_ws_update
    }
}

/// Active persistence policy for one node instance
#[derive(Debug)]
pub enum PersistenceSettings {
    /// Every message is fully persisted
    OnEveryMessage,
    /// Messages only feed real-time subscriptions
    WebSocketsOnly,
    /// One shared strategy gates all three actions together
    Deduplicate(PersistenceStrategy),
    /// Each action gated by its own independent strategy
    Advanced {
        /// Gates time-series history writes
        timeseries: PersistenceStrategy,
        /// Gates latest-value snapshot updates
        latest: PersistenceStrategy,
        /// Gates web-socket notifications
        web_sockets: PersistenceStrategy,
    },
}

impl PersistenceSettings {
    /// Resolve the save decision for a message with timestamp `ts` from
    /// `originator`. Pure apart from the dedup-cache update a
    /// window-opening call performs.
    pub fn decide(&self, ts: i64, originator: EntityId) -> SaveDecision {
        match self {
            PersistenceSettings::OnEveryMessage => SaveDecision::SAVE_ALL,
            PersistenceSettings::WebSocketsOnly => SaveDecision::WS_ONLY,
            PersistenceSettings::Deduplicate(strategy) => {
                if strategy.should_persist(ts, originator) {
                    SaveDecision::SAVE_ALL
                } else {
                    SaveDecision::SKIP_ALL
                }
            }
            PersistenceSettings::Advanced {
                timeseries,
                latest,
                web_sockets,
            } => SaveDecision {
                save_timeseries: timeseries.should_persist(ts, originator),
                save_latest: latest.should_persist(ts, originator),
                send_ws_update: web_sockets.should_persist(ts, originator),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_every_message_saves_all() {
        let settings = PersistenceSettings::OnEveryMessage;
        let entity = EntityId::random();
        assert_eq!(settings.decide(0, entity), SaveDecision::SAVE_ALL);
        assert_eq!(settings.decide(0, entity), SaveDecision::SAVE_ALL);
    }

    #[test]
    fn test_web_sockets_only_never_persists() {
        let settings = PersistenceSettings::WebSocketsOnly;
        let decision = settings.decide(12345, EntityId::random());
        assert_eq!(decision, SaveDecision::WS_ONLY);
        assert!(!decision.is_skip_all());
    }

    #[test]
    fn test_deduplicate_gates_all_flags_together() {
        let settings =
            PersistenceSettings::Deduplicate(PersistenceStrategy::deduplicate(10));
        let entity = EntityId::random();

        assert_eq!(settings.decide(1_000, entity), SaveDecision::SAVE_ALL);
        let suppressed = settings.decide(2_000, entity);
        assert_eq!(suppressed, SaveDecision::SKIP_ALL);
        assert!(suppressed.is_skip_all());
        assert_eq!(settings.decide(11_000, entity), SaveDecision::SAVE_ALL);
    }

    #[test]
    fn test_advanced_flags_are_independent() {
        // Three windows of different lengths: 5s, 20s and skip entirely
        let settings = PersistenceSettings::Advanced {
            timeseries: PersistenceStrategy::deduplicate(5),
            latest: PersistenceStrategy::deduplicate(20),
            web_sockets: PersistenceStrategy::skip(),
        };
        let entity = EntityId::random();

        // First message opens both windows
        assert_eq!(
            settings.decide(0, entity),
            SaveDecision {
                save_timeseries: true,
                save_latest: true,
                send_ws_update: false,
            }
        );
        // 6s in: the short window reopened, the long one did not
        assert_eq!(
            settings.decide(6_000, entity),
            SaveDecision {
                save_timeseries: true,
                save_latest: false,
                send_ws_update: false,
            }
        );
        // 8s in: both suppressed
        assert!(settings.decide(8_000, entity).is_skip_all());
    }
}
