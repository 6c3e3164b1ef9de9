//! Pending event queue
//!
//! Events dispatched by scripts are queued here and handled later by the
//! target's own script run.

use ember_core::{EntityId, EventSink, QueuedEvent};
use std::collections::VecDeque;

/// FIFO event sink
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<QueuedEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> Option<QueuedEvent> {
        self.pending.pop_front()
    }

    /// Take every pending event in arrival order
    pub fn drain(&mut self) -> Vec<QueuedEvent> {
        self.pending.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> impl ExactSizeIterator<Item = &QueuedEvent> {
        self.pending.iter()
    }

    /// Targets of all pending events in arrival order
    pub fn targets(&self) -> Vec<EntityId> {
        self.pending.iter().map(|event| event.target).collect()
    }
}

impl EventSink for EventQueue {
    fn enqueue(&mut self, event: QueuedEvent) {
        tracing::trace!(entity = %event.target, event = %event.event, "Queued event");
        self.pending.push_back(event);
    }
}
