//! Delayed node entry and the traversal lock.
//!
//! The delay between accepting a move and entering the node runs on a
//! virtual clock advanced by the game loop, so nothing here blocks or needs
//! a real timer. Each scheduled entry carries an [`EntryHandle`] that can
//! cancel it.

use std::time::Duration;

use crate::map::{NodeType, Point};

/// Cancellation handle for a scheduled node entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle(u64);

impl EntryHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A node entry waiting for its delay to elapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    pub handle: EntryHandle,
    pub point: Point,
    /// Virtual time at which the entry fires
    pub fire_at: Duration,
}

/// One-shot scheduler for node entries. Holds at most one pending entry.
#[derive(Debug, Default)]
pub struct EntryScheduler {
    now: Duration,
    pending: Option<PendingEntry>,
    next_id: u64,
}

impl EntryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> Option<&PendingEntry> {
        self.pending.as_ref()
    }

    /// Schedule entry into `point` after `delay`, replacing any pending one.
    pub fn schedule(&mut self, point: Point, delay: Duration) -> EntryHandle {
        if let Some(old) = self.pending.take() {
            log::warn!("Replacing pending entry into {} with {}", old.point, point);
        }
        self.next_id += 1;
        let handle = EntryHandle(self.next_id);
        self.pending = Some(PendingEntry {
            handle,
            point,
            fire_at: self.now + delay,
        });
        handle
    }

    /// Cancel the entry behind `handle`. False if it already fired or was
    /// replaced.
    pub fn cancel(&mut self, handle: EntryHandle) -> bool {
        match self.pending {
            Some(entry) if entry.handle == handle => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&mut self) -> Option<PendingEntry> {
        self.pending.take()
    }

    /// Advance the clock; returns the entry if it became due.
    pub fn advance(&mut self, delta: Duration) -> Option<PendingEntry> {
        self.now += delta;
        match self.pending {
            Some(entry) if entry.fire_at <= self.now => self.pending.take(),
            _ => None,
        }
    }
}

/// Who currently holds the traversal surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Open,
    /// Move accepted, waiting for the delayed entry
    Entering { point: Point, handle: EntryHandle },
    /// Inside a battle; released by the battle's return-to-map call
    InEncounter { point: Point, node_type: NodeType },
}

/// Guarantees at most one in-flight node entry per map.
#[derive(Debug, Clone, Copy)]
pub struct TraversalLock {
    state: LockState,
}

impl Default for TraversalLock {
    fn default() -> Self {
        Self {
            state: LockState::Open,
        }
    }
}

impl TraversalLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state != LockState::Open
    }

    pub fn hold_for_entry(&mut self, point: Point, handle: EntryHandle) {
        self.state = LockState::Entering { point, handle };
    }

    pub fn enter_encounter(&mut self, point: Point, node_type: NodeType) {
        self.state = LockState::InEncounter { point, node_type };
    }

    /// Release the lock. Returns true if it was held.
    pub fn release(&mut self) -> bool {
        let was_held = self.is_held();
        self.state = LockState::Open;
        was_held
    }
}
