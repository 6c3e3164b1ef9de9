//! Deferred re-invocation timers
//!
//! A fixed pool of slots; each occupied slot resumes its script at a saved
//! cursor position once its period has elapsed. Allocation takes the first
//! free slot, exhaustion is an error rather than a resize.

use crate::error::{Result, ScriptError};
use crate::script::Script;
use ember_core::EntityId;
use serde::Serialize;
use std::sync::Arc;

/// One scheduled re-invocation
#[derive(Debug, Clone, Serialize)]
pub struct TimerRecord {
    pub name: String,

    #[serde(skip)]
    pub script: Arc<Script>,

    /// Owning entity; `None` for timers of the global script
    pub entity: Option<EntityId>,

    /// Remaining runs, 0 repeats forever
    pub times: u32,

    pub period_ms: u64,

    /// Cursor position of the statement to run
    pub resume_at: usize,

    /// Start of the current period
    pub started_ms: u64,

    /// Only runs while the owner is idle
    pub idle_only: bool,
}

impl TimerRecord {
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.started_ms.saturating_add(self.period_ms)
    }
}

/// A timer that came due in this poll
#[derive(Debug, Clone)]
pub struct Firing {
    pub slot: usize,
    pub name: String,
    pub script: Arc<Script>,
    pub entity: Option<EntityId>,
    pub resume_at: usize,
}

/// Fixed-capacity timer arena indexed by slot
#[derive(Debug)]
pub struct TimerPool {
    slots: Vec<Option<TimerRecord>>,
    active: usize,
}

impl TimerPool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn active_count(&self) -> usize {
        self.active
    }

    pub fn get(&self, slot: usize) -> Option<&TimerRecord> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Occupied slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TimerRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, record)| record.as_ref().map(|r| (slot, r)))
    }

    /// Slot of the timer called `name` owned by `entity`
    pub fn find(&self, name: &str, entity: Option<EntityId>) -> Option<usize> {
        self.iter()
            .find(|(_, r)| r.entity == entity && r.name == name)
            .map(|(slot, _)| slot)
    }

    /// Place a record in the first free slot
    pub fn allocate(&mut self, record: TimerRecord) -> Result<usize> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ScriptError::TimerPoolExhausted {
                capacity: self.slots.len(),
            })?;
        self.slots[slot] = Some(record);
        self.active += 1;
        Ok(slot)
    }

    /// Free a slot, returning what it held
    pub fn free(&mut self, slot: usize) -> Option<TimerRecord> {
        let record = self.slots.get_mut(slot).and_then(Option::take);
        if record.is_some() {
            self.active -= 1;
        }
        record
    }

    /// Free every timer called `name` owned by `entity`
    pub fn clear_by_name(&mut self, name: &str, entity: Option<EntityId>) -> usize {
        self.clear_where(|r| r.entity == entity && r.name == name)
    }

    /// Free every timer owned by `entity`
    pub fn clear_entity(&mut self, entity: Option<EntityId>) -> usize {
        self.clear_where(|r| r.entity == entity)
    }

    fn clear_where(&mut self, matches: impl Fn(&TimerRecord) -> bool) -> usize {
        let mut cleared = 0;
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(&matches) {
                *slot = None;
                cleared += 1;
            }
        }
        self.active -= cleared;
        cleared
    }

    /// First `timer_<n>` name not used by any timer
    pub fn default_name(&self) -> String {
        (0..)
            .map(|n| format!("timer_{}", n))
            .find(|name| self.iter().all(|(_, r)| &r.name != name))
            .unwrap_or_default()
    }

    /// Advance one slot
    ///
    /// Returns the firing when the slot's period has elapsed. The period
    /// restarts at `now_ms`, so a timer that was due several times since
    /// the last poll fires once. Idle-only timers whose owner is busy are
    /// postponed instead. The slot is freed when its last run fires.
    pub fn poll(&mut self, slot: usize, now_ms: u64, owner_idle: bool) -> Option<Firing> {
        let record = self.slots.get_mut(slot)?.as_mut()?;
        if !record.is_due(now_ms) {
            return None;
        }
        if record.idle_only && !owner_idle {
            record.started_ms = now_ms;
            return None;
        }

        let firing = Firing {
            slot,
            name: record.name.clone(),
            script: record.script.clone(),
            entity: record.entity,
            resume_at: record.resume_at,
        };

        match record.times {
            1 => {
                self.free(slot);
            }
            0 => record.started_ms = now_ms,
            _ => {
                record.times -= 1;
                record.started_ms = now_ms;
            }
        }

        Some(firing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, entity: Option<u32>, times: u32, period_ms: u64) -> TimerRecord {
        TimerRecord {
            name: name.into(),
            script: Arc::new(Script::new("t", "")),
            entity: entity.map(EntityId),
            times,
            period_ms,
            resume_at: 0,
            started_ms: 0,
            idle_only: false,
        }
    }

    #[test]
    fn test_allocate_first_free() {
        let mut pool = TimerPool::with_capacity(3);
        assert_eq!(pool.allocate(record("a", Some(1), 1, 10)).unwrap(), 0);
        assert_eq!(pool.allocate(record("b", Some(1), 1, 10)).unwrap(), 1);
        pool.free(0);
        assert_eq!(pool.allocate(record("c", Some(1), 1, 10)).unwrap(), 0);
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = TimerPool::with_capacity(1);
        pool.allocate(record("a", None, 1, 10)).unwrap();
        let err = pool.allocate(record("b", None, 1, 10)).unwrap_err();
        assert!(matches!(err, ScriptError::TimerPoolExhausted { capacity: 1 }));
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn test_clear_by_name_and_entity() {
        let mut pool = TimerPool::with_capacity(4);
        pool.allocate(record("walk", Some(1), 1, 10)).unwrap();
        pool.allocate(record("walk", Some(2), 1, 10)).unwrap();
        pool.allocate(record("talk", Some(1), 1, 10)).unwrap();

        assert_eq!(pool.clear_by_name("walk", Some(EntityId(1))), 1);
        assert_eq!(pool.find("walk", Some(EntityId(2))), Some(1));
        assert_eq!(pool.find("walk", Some(EntityId(1))), None);

        assert_eq!(pool.clear_entity(Some(EntityId(1))), 1);
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn test_default_name_skips_used() {
        let mut pool = TimerPool::with_capacity(4);
        assert_eq!(pool.default_name(), "timer_0");
        pool.allocate(record("timer_0", None, 1, 10)).unwrap();
        pool.allocate(record("timer_2", None, 1, 10)).unwrap();
        assert_eq!(pool.default_name(), "timer_1");
    }

    #[test]
    fn test_poll_counts_down_and_frees() {
        let mut pool = TimerPool::with_capacity(2);
        let slot = pool.allocate(record("a", Some(1), 2, 100)).unwrap();

        assert!(pool.poll(slot, 50, true).is_none());
        assert!(pool.poll(slot, 100, true).is_some());
        assert_eq!(pool.get(slot).unwrap().times, 1);
        assert!(pool.poll(slot, 150, true).is_none());
        assert!(pool.poll(slot, 200, true).is_some());
        assert!(pool.get(slot).is_none());
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_poll_does_not_catch_up() {
        let mut pool = TimerPool::with_capacity(1);
        let slot = pool.allocate(record("a", None, 0, 100)).unwrap();

        assert!(pool.poll(slot, 1000, true).is_some());
        assert!(pool.poll(slot, 1000, true).is_none());
        assert!(pool.poll(slot, 1099, true).is_none());
        assert!(pool.poll(slot, 1100, true).is_some());
        assert_eq!(pool.get(slot).unwrap().times, 0);
    }

    #[test]
    fn test_idle_only_postpones() {
        let mut pool = TimerPool::with_capacity(1);
        let mut idle = record("a", Some(1), 1, 100);
        idle.idle_only = true;
        let slot = pool.allocate(idle).unwrap();

        assert!(pool.poll(slot, 150, false).is_none());
        assert_eq!(pool.get(slot).unwrap().started_ms, 150);
        assert!(pool.poll(slot, 200, true).is_none());
        assert!(pool.poll(slot, 250, true).is_some());
    }
}
