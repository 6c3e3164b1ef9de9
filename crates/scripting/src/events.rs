//! Event names and the current event sender
//!
//! While a script dispatches events, the dispatching entity is published as
//! the current sender so that receivers (and `^sender`) can see who sent
//! them. Script execution is single threaded, so the sender lives in a
//! thread-local cell and is scoped by [`SenderScope`].

use ember_core::EntityId;
use std::cell::Cell;

/// Names of the events the engine itself raises
pub const SYSTEM_EVENTS: &[&str] = &[
    "init",
    "inventoryin",
    "inventoryout",
    "inventoryuse",
    "sceneuse",
    "equipin",
    "equipout",
    "main",
    "reset",
    "chat",
    "action",
    "dead",
    "reachedtarget",
    "fight",
    "flee",
    "hit",
    "die",
    "losttarget",
    "treatout",
    "move",
    "detectplayer",
    "undetectplayer",
    "combine",
    "npc_follow",
    "npc_fight",
    "npc_stay",
    "inventory2_open",
    "inventory2_close",
    "custom",
    "enter_zone",
    "leave_zone",
    "initend",
    "clicked",
    "insidezone",
    "controlledzone_inside",
    "leavezone",
    "controlledzone_leave",
    "enterzone",
    "controlledzone_enter",
    "load",
    "unload",
    "reload",
    "ouch",
    "hear",
    "summoned",
    "spellcast",
    "spellend",
    "spelldecision",
    "strike",
    "collision_error",
    "waypoint",
    "pathend",
    "critical",
    "collide_npc",
    "backstab",
    "aggression",
    "collision_error_detail",
    "game_ready",
    "cine_end",
    "key_pressed",
    "controls_on",
    "controls_off",
    "pathfinder_failure",
    "pathfinder_success",
    "trap_disarmed",
    "book_open",
    "book_close",
    "identify",
    "break",
    "steal",
    "collide_door",
    "collide_field",
    "cursormode",
    "explorationmode",
];

/// Whether `name` is one of the engine-raised events
pub fn is_system_event(name: &str) -> bool {
    SYSTEM_EVENTS.contains(&name)
}

thread_local! {
    static EVENT_SENDER: Cell<Option<EntityId>> = const { Cell::new(None) };
}

/// Entity currently dispatching events, if any
pub fn current_event_sender() -> Option<EntityId> {
    EVENT_SENDER.with(Cell::get)
}

/// Publishes a sender until dropped, then restores the previous one
///
/// Restoring on drop covers every exit path of a dispatch, early failure
/// returns included.
#[must_use = "the sender is restored as soon as the scope is dropped"]
pub struct SenderScope {
    previous: Option<EntityId>,
}

impl SenderScope {
    pub fn enter(sender: Option<EntityId>) -> Self {
        let previous = EVENT_SENDER.with(|cell| cell.replace(sender));
        Self { previous }
    }
}

impl Drop for SenderScope {
    fn drop(&mut self) {
        EVENT_SENDER.with(|cell| cell.set(self.previous));
    }
}
