//! Event dispatch commands

use super::{Command, Outcome};
use crate::context::{Context, Flags};
use crate::events::{is_system_event, SenderScope};
use crate::state::DisabledEvents;
use crate::variables::Namespace;
use ember_core::{Entity, IoFlags, QueuedEvent};
use std::sync::Arc;

/// How `sendevent` picks its targets
#[derive(Debug, Clone, PartialEq)]
enum Targets {
    Radius(f32),
    Zone(String),
    Group,
    Single(String),
}

/// `sendevent [-gfinrz] [group] <event> [zone] [radius] [target] <params>`
///
/// Flags: `g` restricts to a group, `f`/`i`/`n` select fixed objects,
/// items or NPCs (NPCs when none is given), `r` sends to everything within
/// a radius of the sender and `z` to everything inside a zone. Without
/// `g`, `r` or `z` the event goes to a single named target.
pub struct SendEventCommand;

impl SendEventCommand {
    fn type_mask(flags: Flags) -> IoFlags {
        let mut mask = IoFlags::empty();
        if flags.has('f') {
            mask |= IoFlags::FIX;
        }
        if flags.has('i') {
            mask |= IoFlags::ITEM;
        }
        if flags.has('n') {
            mask |= IoFlags::NPC;
        }
        if mask.is_empty() {
            IoFlags::NPC
        } else {
            mask
        }
    }

    /// Entities receiving a broadcast, in ascending ID order
    fn broadcast(
        ctx: &Context<'_>,
        sender: &Entity,
        targets: &Targets,
        group: Option<&str>,
        mask: IoFlags,
    ) -> Option<Vec<Arc<Entity>>> {
        let entities = ctx.services.entities.all();
        let in_group = |e: &Entity| group.map_or(true, |g| e.is_in_group(g));
        let listens = |e: &Entity| {
            !e.io_flags.intersects(IoFlags::CAMERA | IoFlags::MARKER)
                && e.io_flags.intersects(mask)
                && in_group(e)
        };

        let selected = match targets {
            Targets::Radius(radius) => {
                let origin = sender.position();
                let max = radius * radius;
                entities
                    .into_iter()
                    .filter(|e| e.id != sender.id && listens(&**e))
                    .filter(|e| e.position().distance_squared(origin) <= max)
                    .collect()
            }
            Targets::Zone(name) => {
                let zones = ctx.services.zones;
                let Some(zone) = zones.find_zone(name) else {
                    tracing::warn!(entity = %sender.name, command = "sendevent", "unknown zone: {}", name);
                    return None;
                };
                entities
                    .into_iter()
                    .filter(|e| listens(&**e) && zone.contains(e.position()))
                    .collect()
            }
            Targets::Group => entities
                .into_iter()
                .filter(|e| e.id != sender.id && in_group(&**e))
                .collect(),
            Targets::Single(_) => Vec::new(),
        };
        Some(selected)
    }

    fn deliver(ctx: &mut Context<'_>, sender: &Entity, target: &Entity, event: &str, params: &str) {
        sender.record_sent();
        ctx.services.events.enqueue(QueuedEvent {
            target: target.id,
            event: event.to_string(),
            params: params.to_string(),
            sender: Some(sender.id),
        });
    }
}

impl Command for SendEventCommand {
    fn name(&self) -> &str {
        "sendevent"
    }

    fn needs_entity(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        let flags = ctx.read_flags("gfinrz");
        let mask = Self::type_mask(flags);

        let group = if flags.has('g') {
            let word = ctx.read_word();
            Some(ctx.get_string_var(&word))
        } else {
            None
        };

        let mut event = ctx.read_word();

        let zone = if flags.has('z') {
            let word = ctx.read_word();
            Some(ctx.get_string_var(&word))
        } else {
            None
        };

        let radius = if flags.has('r') {
            let mut word = ctx.read_word();
            // Accept the radius before the event name as well
            if is_numeric_operand(&event) && !is_numeric_operand(&word) {
                std::mem::swap(&mut event, &mut word);
            }
            Some(ctx.get_float_var(&word))
        } else {
            None
        };

        let targets = if let Some(radius) = radius {
            Targets::Radius(radius)
        } else if let Some(zone) = zone {
            Targets::Zone(zone)
        } else if group.is_some() {
            Targets::Group
        } else {
            let word = ctx.read_word();
            let mut target = ctx.get_string_var(&word);
            // Scripts commonly put the target before the event
            if is_system_event(&target) {
                std::mem::swap(&mut target, &mut event);
            }
            Targets::Single(target)
        };

        let params = ctx.read_word();

        let Some(sender) = ctx.entity() else {
            tracing::warn!(command = "sendevent", "sender no longer exists");
            return Outcome::Failed;
        };

        tracing::debug!(
            entity = %sender.name,
            "sendevent {} \"{}\" to {:?} (group {:?})",
            event,
            params,
            targets,
            group
        );

        let _scope = SenderScope::enter(Some(sender.id));

        if let Targets::Single(name) = &targets {
            let Some(target) = ctx.services.entities.find(name, Some(sender.id)) else {
                tracing::warn!(entity = %sender.name, command = "sendevent", "unknown target: {}", name);
                return Outcome::Failed;
            };
            Self::deliver(ctx, &sender, &target, &event, &params);
            return Outcome::Success;
        }

        let Some(receivers) = Self::broadcast(ctx, &sender, &targets, group.as_deref(), mask) else {
            return Outcome::Failed;
        };
        for target in &receivers {
            Self::deliver(ctx, &sender, target, &event, &params);
        }
        Outcome::Success
    }
}

/// Literal number or numeric variable
fn is_numeric_operand(word: &str) -> bool {
    word.parse::<f32>().is_ok()
        || matches!(
            Namespace::of(word),
            Namespace::GlobalInteger
                | Namespace::LocalInteger
                | Namespace::GlobalFloat
                | Namespace::LocalFloat
        )
}

/// `setevent <event> <on|off>`: switch delivery of a standard event
pub struct SetEventCommand;

impl Command for SetEventCommand {
    fn name(&self) -> &str {
        "setevent"
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        let name = ctx.read_word().to_lowercase();
        let enable = ctx.read_bool();
        tracing::debug!(entity = %ctx.entity_name(), "setevent {} {}", name, enable);

        let Some(bit) = DisabledEvents::from_event_name(&name) else {
            tracing::warn!(entity = %ctx.entity_name(), command = "setevent", "unknown event: {}", name);
            return Outcome::Failed;
        };

        ctx.master_state_mut().disabled.set(bit, !enable);
        Outcome::Success
    }
}
