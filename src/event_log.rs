// Copyright © 2026 The RBD Engine Contributors

//! The local, versioned event sequence (C4): append/undo/redo over a
//! single-threaded log, with a remote baseline version and a
//! resequencing step that seals local `version`s before publish.

use crate::event::Event;

/// An ordered, versioned sequence of events with an undo/redo head.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
    /// Index of the last active event; `-1` when empty. Everything
    /// after `head` is a redo tail.
    head: i64,
    /// The remote head this log was based on at last sync.
    base_version: Option<i64>,
}

impl EventLog {
    pub fn new(base_version: Option<i64>) -> Self {
        Self {
            events: Vec::new(),
            head: -1,
            base_version,
        }
    }

    pub fn base_version(&self) -> Option<i64> {
        self.base_version
    }

    pub fn set_base_version(&mut self, v: Option<i64>) {
        self.base_version = v;
    }

    pub fn head(&self) -> i64 {
        self.head
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Append an event, discarding any redo tail. If the event has no
    /// version and a `base_version` is set, assigns
    /// `base_version + (head+1) + 1`.
    pub fn append(&mut self, mut ev: Event) {
        if (self.head as usize + 1) < self.events.len() {
            log::debug!("append discards redo tail of {} event(s)", self.events.len() - (self.head as usize + 1));
            self.events.truncate((self.head + 1) as usize);
        }
        if ev.version.is_none() {
            if let Some(base) = self.base_version {
                ev.version = Some(base + (self.head + 1) + 1);
            }
        }
        self.events.push(ev);
        self.head = self.events.len() as i64 - 1;
    }

    /// Move the head back by one. Returns whether it moved.
    #[must_use]
    pub fn undo(&mut self) -> bool {
        if self.head >= 0 {
            self.head -= 1;
            true
        } else {
            false
        }
    }

    /// Move the head forward by one. Returns whether it moved.
    #[must_use]
    pub fn redo(&mut self) -> bool {
        if self.head + 1 < self.events.len() as i64 {
            self.head += 1;
            true
        } else {
            false
        }
    }

    /// The active prefix, i.e. `events[0..=head]`.
    pub fn active(&self) -> &[Event] {
        if self.head < 0 {
            &[]
        } else {
            &self.events[..=(self.head as usize)]
        }
    }

    /// Replace the full event list, moving the head to its end.
    pub fn replace(&mut self, events: Vec<Event>) {
        self.head = events.len() as i64 - 1;
        self.events = events;
    }

    /// Clear all events. `base_version` is kept by design: it still
    /// describes the remote baseline this (now-empty) log is relative
    /// to.
    pub fn clear(&mut self) {
        self.events.clear();
        self.head = -1;
    }

    /// Set `base_version := start_from` and assign `start_from+1, +2, …`
    /// to the active prefix; clears `version` on the redo tail.
    pub fn resequence_versions(&mut self, start_from: i64) {
        self.base_version = Some(start_from);
        let active_len = (self.head + 1).max(0) as usize;
        for (i, ev) in self.events.iter_mut().enumerate() {
            if i < active_len {
                ev.version = Some(start_from + i as i64 + 1);
            } else {
                ev.version = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Kind;
    use chrono::Utc;

    fn ev(upto: i64) -> Event {
        Event::new("anonymous", Utc::now(), Kind::SetHead { upto })
    }

    #[test]
    fn append_after_undo_discards_redo_tail() {
        let mut log = EventLog::new(None);
        log.append(ev(1));
        log.append(ev(2));
        log.append(ev(3));
        assert!(log.undo());
        assert_eq!(log.active().len(), 2);

        log.append(ev(4));
        assert_eq!(log.len(), 3);
        assert!(!log.redo());
        assert_eq!(log.active().len(), 3);
    }

    #[test]
    fn resequence_assigns_contiguous_versions() {
        let mut log = EventLog::new(None);
        log.append(ev(1));
        log.append(ev(2));
        log.resequence_versions(10);
        assert_eq!(log.base_version(), Some(10));
        assert_eq!(log.active()[0].version, Some(11));
        assert_eq!(log.active()[1].version, Some(12));
    }

    #[test]
    fn clear_keeps_base_version() {
        let mut log = EventLog::new(Some(5));
        log.append(ev(1));
        log.clear();
        assert_eq!(log.base_version(), Some(5));
        assert_eq!(log.head(), -1);
        assert!(log.is_empty());
    }
}
