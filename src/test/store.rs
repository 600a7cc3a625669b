//! In-memory [`SnapshotStore`]/[`EventStore`] doubles used by this
//! crate's own tests in place of a real remote backend.

use std::cell::RefCell;
use std::convert::Infallible;

use crate::event::Event;
use crate::graph::GraphData;
use crate::service::{EventStore, SnapshotStore};

/// A single JSON-blob snapshot slot, held in memory.
#[derive(Default)]
pub struct MemorySnapshotStore {
    slot: RefCell<Option<GraphData>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    type Error = Infallible;

    fn load(&self) -> Result<Option<GraphData>, Self::Error> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&self, data: &GraphData) -> Result<(), Self::Error> {
        *self.slot.borrow_mut() = Some(data.clone());
        Ok(())
    }
}

/// An append-only, versioned event list, held in memory.
#[derive(Default)]
pub struct MemoryEventStore {
    events: RefCell<Vec<Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventStore for MemoryEventStore {
    type Error = Infallible;

    fn head_version(&self) -> Result<i64, Self::Error> {
        Ok(self
            .events
            .borrow()
            .iter()
            .filter_map(|ev| ev.version)
            .max()
            .unwrap_or(0))
    }

    fn append(&self, events: &[Event]) -> Result<usize, Self::Error> {
        self.events.borrow_mut().extend_from_slice(events);
        Ok(events.len())
    }

    fn load(&self, from_version: Option<i64>) -> Result<Vec<Event>, Self::Error> {
        let floor = from_version.unwrap_or(i64::MIN);
        let mut events: Vec<Event> = self
            .events
            .borrow()
            .iter()
            .filter(|ev| ev.version.unwrap_or(i64::MIN) >= floor)
            .cloned()
            .collect();
        events.sort_by_key(|ev| ev.version.unwrap_or(i64::MIN));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Kind;
    use chrono::Utc;

    fn ev(version: i64) -> Event {
        let mut e = Event::new(
            "anonymous",
            Utc::now(),
            Kind::SetHead { upto: version },
        );
        e.version = Some(version);
        e
    }

    #[test]
    fn head_version_is_zero_when_empty() {
        let store = MemoryEventStore::new();
        assert_eq!(store.head_version().unwrap(), 0);
    }

    #[test]
    fn append_then_load_returns_ascending_by_version() {
        let store = MemoryEventStore::new();
        store.append(&[ev(2), ev(1)]).unwrap();
        let loaded = store.load(None).unwrap();
        assert_eq!(loaded[0].version, Some(1));
        assert_eq!(loaded[1].version, Some(2));
        assert_eq!(store.head_version().unwrap(), 2);
    }

    #[test]
    fn load_from_version_filters_inclusive() {
        let store = MemoryEventStore::new();
        store.append(&[ev(1), ev(2), ev(3)]).unwrap();
        let loaded = store.load(Some(2)).unwrap();
        assert_eq!(loaded.iter().map(|e| e.version.unwrap()).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn snapshot_store_round_trips() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().unwrap().is_none());
        let data = crate::graph::Graph::new(false).to_data();
        store.save(&data).unwrap();
        assert!(store.load().unwrap().is_some());
    }
}
