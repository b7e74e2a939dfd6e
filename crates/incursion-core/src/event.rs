//! Typed campaign events with per-kind bounded queues.
//!
//! Operations and turn resolution emit events as they commit. Buffered
//! events are delivered in batch to passive listeners at the end of
//! [`Campaign::advance_turn`](crate::campaign::Campaign::advance_turn), or on
//! demand through [`Campaign::deliver_events`](crate::campaign::Campaign::deliver_events).
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which drops
//! their buffer and skips recording entirely.

use crate::fixed::{Resources, Turn};
use crate::id::{FactionId, FleetName, PlanetId, PlayerId, ShipTypeId};
use crate::transit::Propulsion;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A campaign event. All events carry the turn during which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Economy --
    IncomeCredited {
        planet: PlanetId,
        player: PlayerId,
        amount: Resources,
        turn: Turn,
    },
    ProductionQueued {
        planet: PlanetId,
        player: PlayerId,
        ship: ShipTypeId,
        amount: u32,
        cost: Resources,
        turn: Turn,
    },
    ProductionCompleted {
        planet: PlanetId,
        player: PlayerId,
        ship: ShipTypeId,
        amount: u32,
        turn: Turn,
    },
    ShipsScrapped {
        planet: PlanetId,
        player: PlayerId,
        ship: ShipTypeId,
        amount: u32,
        recovered: Resources,
        turn: Turn,
    },

    // -- Transit --
    FleetDeparted {
        player: PlayerId,
        fleet: FleetName,
        origin: PlanetId,
        destination: PlanetId,
        propulsion: Propulsion,
        turn: Turn,
    },
    FleetReversed {
        player: PlayerId,
        fleet: FleetName,
        destination: PlanetId,
        turn: Turn,
    },
    TransitAdvanced {
        player: PlayerId,
        fleet: FleetName,
        progress: u32,
        distance: u32,
        paid: Resources,
        turn: Turn,
    },
    TransitStalled {
        player: PlayerId,
        fleet: FleetName,
        required: Resources,
        available: Resources,
        turn: Turn,
    },
    FleetArrived {
        player: PlayerId,
        fleet: FleetName,
        planet: PlanetId,
        merged: bool,
        turn: Turn,
    },

    // -- Turn --
    ContactDetected {
        planet: PlanetId,
        factions: Vec<FactionId>,
        turn: Turn,
    },
    TurnAdvanced {
        /// The turn that was resolved.
        resolved: Turn,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    IncomeCredited,
    ProductionQueued,
    ProductionCompleted,
    ShipsScrapped,
    FleetDeparted,
    FleetReversed,
    TransitAdvanced,
    TransitStalled,
    FleetArrived,
    ContactDetected,
    TurnAdvanced,
}

const EVENT_KIND_COUNT: usize = 11;

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::IncomeCredited { .. } => EventKind::IncomeCredited,
            Event::ProductionQueued { .. } => EventKind::ProductionQueued,
            Event::ProductionCompleted { .. } => EventKind::ProductionCompleted,
            Event::ShipsScrapped { .. } => EventKind::ShipsScrapped,
            Event::FleetDeparted { .. } => EventKind::FleetDeparted,
            Event::FleetReversed { .. } => EventKind::FleetReversed,
            Event::TransitAdvanced { .. } => EventKind::TransitAdvanced,
            Event::TransitStalled { .. } => EventKind::TransitStalled,
            Event::FleetArrived { .. } => EventKind::FleetArrived,
            Event::ContactDetected { .. } => EventKind::ContactDetected,
            Event::TurnAdvanced { .. } => EventKind::TurnAdvanced,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Bounded queue of pending events for one kind. Pushing onto a full queue
/// evicts the oldest pending event and counts it as dropped.
#[derive(Debug)]
pub struct EventBuffer {
    pending: VecDeque<Event>,
    capacity: usize,
    written: u64,
    dropped: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
            written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
            self.dropped += 1;
        }
        self.pending.push_back(event);
        self.written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Events pushed since creation, delivered or not.
    pub fn total_written(&self) -> u64 {
        self.written
    }

    /// Events evicted before anyone read them.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Pending events, oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Event> {
        self.pending.iter()
    }

    /// Remove and return every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        self.pending.drain(..).collect()
    }

    /// Discard pending events. Counters are kept.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Optional predicate restricting which events a listener sees.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct ListenerEntry {
    listener: PassiveListener,
    priority: ListenerPriority,
    filter: Option<EventFilter>,
    insertion_order: u64,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("priority", &self.priority)
            .field("filtered", &self.filter.is_some())
            .field("insertion_order", &self.insertion_order)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// One ring buffer per event kind, listener lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
    next_insertion_order: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
            next_insertion_order: 0,
        }
    }

    /// Suppress an event kind. Its buffer is dropped and further emits are ignored.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op for suppressed kinds.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    pub fn emit_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Register a listener with normal priority and no filter.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, ListenerPriority::Normal, None, listener);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        priority: ListenerPriority,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        let insertion_order = self.next_insertion_order;
        self.next_insertion_order += 1;
        let list = &mut self.listeners[kind.index()];
        list.push(ListenerEntry {
            listener,
            priority,
            filter,
            insertion_order,
        });
        list.sort_by_key(|entry| (entry.priority, entry.insertion_order));
    }

    /// Deliver buffered events to listeners, kind by kind, then clear the
    /// buffers. Each listener sees its kind's events oldest first.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events = buffer.drain();

            for entry in &mut self.listeners[idx] {
                for event in &events {
                    if let Some(filter) = &entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    /// Events ever emitted for a kind, including dropped ones.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    /// Clear all buffers. Listeners and suppression stay.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
