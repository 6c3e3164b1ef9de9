//! Per-script state
//!
//! Each attached script owns local variables, four stopwatch-style timer
//! slots, a mask of disabled standard events and an optional override for
//! the `main` handler.

use crate::variables::VariableTable;

/// Value of a stopped stopwatch slot
pub const TIMER_UNSET: u64 = 0;

/// Number of stopwatch slots (`timer1`..`timer4`)
pub const TIMER_SLOTS: usize = 4;

bitflags::bitflags! {
    /// Standard events a script has switched off with `setevent`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DisabledEvents: u32 {
        const COLLIDE_NPC = 1 << 0;
        const CHAT = 1 << 1;
        const HIT = 1 << 2;
        const INVENTORY2_OPEN = 1 << 3;
        const DETECT_PLAYER = 1 << 4;
        const HEAR = 1 << 5;
        const AGGRESSION = 1 << 6;
        const MAIN = 1 << 7;
        const CURSOR_MODE = 1 << 8;
        const EXPLORATION_MODE = 1 << 9;
    }
}

impl DisabledEvents {
    /// Bit for a standard event name
    pub fn from_event_name(name: &str) -> Option<Self> {
        match name {
            "collide_npc" => Some(Self::COLLIDE_NPC),
            "chat" => Some(Self::CHAT),
            "hit" => Some(Self::HIT),
            "inventory2_open" => Some(Self::INVENTORY2_OPEN),
            "detectplayer" => Some(Self::DETECT_PLAYER),
            "hear" => Some(Self::HEAR),
            "aggression" => Some(Self::AGGRESSION),
            "main" => Some(Self::MAIN),
            "cursormode" => Some(Self::CURSOR_MODE),
            "explorationmode" => Some(Self::EXPLORATION_MODE),
            _ => None,
        }
    }
}

/// State owned by one script instance
#[derive(Debug, Clone)]
pub struct ScriptState {
    /// Local variables (`§`, `@`, `£`)
    pub locals: VariableTable,

    /// Stopwatch start times, `TIMER_UNSET` when stopped
    timers: [u64; TIMER_SLOTS],

    /// Standard events that are not delivered
    pub disabled: DisabledEvents,

    main_event: Option<String>,
}

impl ScriptState {
    pub fn new(local_capacity: usize) -> Self {
        Self {
            locals: VariableTable::with_capacity(local_capacity),
            timers: [TIMER_UNSET; TIMER_SLOTS],
            disabled: DisabledEvents::empty(),
            main_event: None,
        }
    }

    /// Slot index for `timer1`..`timer4`
    pub fn timer_slot(name: &str) -> Option<usize> {
        match name {
            "timer1" => Some(0),
            "timer2" => Some(1),
            "timer3" => Some(2),
            "timer4" => Some(3),
            _ => None,
        }
    }

    /// Start a stopwatch; a start time equal to the unset marker is nudged
    pub fn start_timer(&mut self, slot: usize, now_ms: u64) {
        self.timers[slot] = if now_ms == TIMER_UNSET { 1 } else { now_ms };
    }

    pub fn stop_timer(&mut self, slot: usize) {
        self.timers[slot] = TIMER_UNSET;
    }

    pub fn timer(&self, slot: usize) -> u64 {
        self.timers[slot]
    }

    /// Milliseconds since the stopwatch started, 0 when stopped
    pub fn timer_elapsed(&self, slot: usize, now_ms: u64) -> u64 {
        match self.timers[slot] {
            TIMER_UNSET => 0,
            start => now_ms.saturating_sub(start),
        }
    }

    /// Handler run for the `main` event
    pub fn main_event(&self) -> Option<&str> {
        self.main_event.as_deref()
    }

    /// Redirect the `main` event; `main` itself restores the default
    pub fn set_main_event(&mut self, event: &str) {
        let event = event.to_lowercase();
        self.main_event = if event.is_empty() || event == "main" {
            None
        } else {
            Some(event)
        };
    }

    /// Whether a standard event is currently delivered
    pub fn allows(&self, event: &str) -> bool {
        DisabledEvents::from_event_name(event)
            .map_or(true, |bit| !self.disabled.contains(bit))
    }
}
