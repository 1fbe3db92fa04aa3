//! Replay guard for draw events.
//!
//! Events are keyed by `eventId`. History lives as long as the draw and is
//! kept most-recent-first.

use crate::{DrawEvent, DrawEventType};
use fairdraw_types::Timestamp;
use std::collections::{HashSet, VecDeque};

#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub event: DrawEvent,
    pub received_at: Timestamp,
}

#[derive(Clone, Debug, Default)]
pub struct EventHistory {
    ids: HashSet<String>,
    entries: VecDeque<HistoryEntry>,
}

impl EventHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new(&self, event: &DrawEvent) -> bool {
        !self.ids.contains(&event.event_id)
    }

    /// Record an event. Returns `false` if the id was already recorded.
    pub fn record(&mut self, event: DrawEvent) -> bool {
        self.record_at(event, Timestamp::now())
    }

    pub fn record_at(&mut self, event: DrawEvent, received_at: Timestamp) -> bool {
        if !self.ids.insert(event.event_id.clone()) {
            return false;
        }
        self.entries.push_front(HistoryEntry { event, received_at });
        true
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn count_of(&self, event_type: DrawEventType) -> usize {
        self.entries
            .iter()
            .filter(|e| e.event.event_type() == event_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DrawEventKind;
    use fairdraw_types::DrawStatus;

    fn event(id: &str) -> DrawEvent {
        let mut e = DrawEvent::new("d", None, DrawEventKind::StatusChanged(DrawStatus::Commit));
        e.event_id = id.to_string();
        e
    }

    #[test]
    fn replays_are_rejected() {
        let mut history = EventHistory::new();
        assert!(history.is_new(&event("a")));
        assert!(history.record(event("a")));
        assert!(!history.is_new(&event("a")));
        assert!(!history.record(event("a")));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn newest_first() {
        let mut history = EventHistory::new();
        history.record_at(event("a"), Timestamp::new(1));
        history.record_at(event("b"), Timestamp::new(2));
        let ids: Vec<_> = history.iter().map(|e| e.event.event_id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(history.count_of(DrawEventType::StatusChanged), 2);
    }
}
