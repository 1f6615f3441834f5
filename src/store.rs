// Per-battle update log and latest-per-tag projections.

use std::collections::HashMap;

use crate::protocol::{EventTag, UpdateEvent};

/// Append-only log of decoded update events for one battle.
#[derive(Debug, Default)]
struct BattleLog {
    /// Events in arrival order.
    events: Vec<UpdateEvent>,
    /// Index into `events` of the most recent event per tag, so `latest`
    /// never rescans the log.
    latest: HashMap<EventTag, usize>,
}

/// Ordered event logs keyed by battle id.
///
/// Owned exclusively by the app event loop; every mutation happens on that
/// single logical thread, so no interior locking is needed.
#[derive(Debug, Default)]
pub struct UpdateStore {
    logs: HashMap<String, BattleLog>,
}

impl UpdateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the end of `key`'s log. O(1) amortized.
    pub fn append(&mut self, key: &str, event: UpdateEvent) {
        let log = self.logs.entry(key.to_string()).or_default();
        log.latest.insert(event.tag(), log.events.len());
        log.events.push(event);
    }

    /// The most recent event with `tag` in `key`'s log, or `None`.
    ///
    /// The index always points at the highest log position holding the tag,
    /// so ties resolve to the most recent append. O(1).
    pub fn latest(&self, key: &str, tag: EventTag) -> Option<&UpdateEvent> {
        let log = self.logs.get(key)?;
        log.latest.get(&tag).map(|&i| &log.events[i])
    }

    /// Drop the entire log for `key`.
    ///
    /// Called on subscription teardown so an open-ended battle with a
    /// long-lived connection cannot grow memory without bound.
    pub fn clear(&mut self, key: &str) {
        self.logs.remove(key);
    }

    /// All events recorded for `key`, in arrival order.
    pub fn events(&self, key: &str) -> &[UpdateEvent] {
        self.logs.get(key).map_or(&[], |log| log.events.as_slice())
    }

    /// Number of events recorded for `key`.
    pub fn event_count(&self, key: &str) -> usize {
        self.logs.get(key).map_or(0, |log| log.events.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
