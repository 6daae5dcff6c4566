//! Typed engine events in a pre-allocated ring buffer.
//!
//! The engine records one event per container movement while it runs a
//! command. Callers read them with [`EventBuffer::iter`] or take them with
//! [`EventBuffer::drain`]. When the buffer is full the oldest events are
//! dropped; [`EventBuffer::dropped_count`] tells how many were lost.

use crate::id::{NodeId, TransportUnitNumber};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Something that happened to a container. All events carry the tick at
/// which they occurred; commands issued between steps carry the tick of the
/// last completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A container was synthesized on a retrieval node.
    ContainerRetrieved {
        transport_unit: TransportUnitNumber,
        node: NodeId,
        tick: u64,
    },
    /// A container moved over one edge.
    ContainerMoved {
        transport_unit: TransportUnitNumber,
        from: NodeId,
        to: NodeId,
        tick: u64,
    },
    /// A container was picked at a commissioning node and rerouted to storage.
    ContainerCommissioned {
        transport_unit: TransportUnitNumber,
        node: NodeId,
        tick: u64,
    },
    /// A container left the loop through a storage node.
    ContainerStored {
        transport_unit: TransportUnitNumber,
        node: NodeId,
        tick: u64,
    },
    /// Admission kept a container on its retrieval node to avoid a deadlock.
    RetrievalDeferred {
        transport_unit: TransportUnitNumber,
        node: NodeId,
        tick: u64,
    },
}

/// Discriminant tag for event types, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ContainerRetrieved,
    ContainerMoved,
    ContainerCommissioned,
    ContainerStored,
    RetrievalDeferred,
}

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ContainerRetrieved { .. } => EventKind::ContainerRetrieved,
            Event::ContainerMoved { .. } => EventKind::ContainerMoved,
            Event::ContainerCommissioned { .. } => EventKind::ContainerCommissioned,
            Event::ContainerStored { .. } => EventKind::ContainerStored,
            Event::RetrievalDeferred { .. } => EventKind::RetrievalDeferred,
        }
    }

    /// The container this event is about.
    pub fn transport_unit(&self) -> TransportUnitNumber {
        match *self {
            Event::ContainerRetrieved { transport_unit, .. }
            | Event::ContainerMoved { transport_unit, .. }
            | Event::ContainerCommissioned { transport_unit, .. }
            | Event::ContainerStored { transport_unit, .. }
            | Event::RetrievalDeferred { transport_unit, .. } => transport_unit,
        }
    }

    pub fn tick(&self) -> u64 {
        match *self {
            Event::ContainerRetrieved { tick, .. }
            | Event::ContainerMoved { tick, .. }
            | Event::ContainerCommissioned { tick, .. }
            | Event::ContainerStored { tick, .. }
            | Event::RetrievalDeferred { tick, .. } => tick,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBuffer — pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    /// Pre-allocated storage.
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    /// Number of events currently stored (may be less than capacity).
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
    /// Events overwritten before anyone read them.
    dropped: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        } else {
            self.dropped += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events that were overwritten because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        EventBufferIter {
            buffer: self,
            index: self.oldest(),
            remaining: self.len,
        }
    }

    /// Iterate over events of one kind, oldest first.
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |e| e.kind() == kind)
    }

    /// Remove and return all stored events, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        let start = self.oldest();
        let capacity = self.capacity();
        let drained = (0..self.len)
            .filter_map(|offset| self.events[(start + offset) % capacity].take())
            .collect();
        self.head = 0;
        self.len = 0;
        drained
    }

    /// Clear all events from the buffer.
    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }

    fn oldest(&self) -> usize {
        if self.len < self.capacity() {
            (self.head + self.capacity() - self.len) % self.capacity()
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        }
    }
}

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}
