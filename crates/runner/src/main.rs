//! Ember - script runner
//!
//! Loads one script, attaches it to a lone entity, sends it an event and
//! lets its timers run for a few simulated seconds.
//!
//! Usage: `ember <script-file> [event] [config-file]`

use anyhow::{bail, Context as _, Result};
use ember_config::InterpreterConfig;
use ember_core::{EntityId, GameClock, IoFlags, QueuedEvent, Vec3};
use ember_scripting::{Outcome, Script, ScriptEngine, Services, TimerRecord};
use ember_world::{EntityManager, EventQueue, ManualClock, ZoneMap};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Simulated time after the initial event
const SIMULATED_MS: u64 = 5_000;
/// Clock step between timer polls
const TICK_MS: u64 = 50;
/// Events handled per step before the rest are left queued
const MAX_DELIVERIES: usize = 256;

/// What happened during the run
#[derive(Debug, Serialize)]
struct Report {
    script: String,
    entity: EntityId,
    event: String,
    outcome: Outcome,
    delivered: Vec<Delivery>,
    queued: Vec<QueuedEvent>,
    timers: Vec<TimerRecord>,
    timers_fired: usize,
    elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
struct Delivery {
    at_ms: u64,
    event: QueuedEvent,
    outcome: Outcome,
}

struct Args {
    script: String,
    event: String,
    config: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let Some(script) = args.next() else {
        bail!("usage: ember <script-file> [event] [config-file]");
    };
    Ok(Args {
        script,
        event: args.next().unwrap_or_else(|| "init".to_string()),
        config: args.next(),
    })
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => InterpreterConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path))?,
        None => InterpreterConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    config.display();

    let script = Script::load(&args.script)
        .with_context(|| format!("loading script {}", args.script))?;
    info!("Loaded {} ({} bytes)", script.name(), script.len());

    let name = Path::new(&args.script)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("entity")
        .to_lowercase();

    let entities = EntityManager::new();
    let zones = ZoneMap::new();
    let clock = ManualClock::new(0);
    let mut queue = EventQueue::new();

    let entity = entities.spawn(name, IoFlags::NPC, |e| e.at(Vec3::ZERO));
    let mut engine = ScriptEngine::new(config);
    engine.attach(entity.id, Arc::new(script));

    let outcome = {
        let mut services = Services::new(&entities, &zones, &mut queue, &clock);
        engine.send_event(&mut services, Some(entity.id), &args.event, "")
    };
    info!("on {} -> {:?}", args.event, outcome);

    let mut delivered = Vec::new();
    let mut queued = Vec::new();
    let mut timers_fired = 0;

    deliver_pending(&mut engine, &entities, &zones, &mut queue, &clock, &mut delivered, &mut queued);
    while clock.now_ms() < SIMULATED_MS {
        clock.advance(TICK_MS);
        let fired = {
            let mut services = Services::new(&entities, &zones, &mut queue, &clock);
            engine.tick(&mut services)
        };
        if fired > 0 {
            debug!("{} timer(s) fired at {}ms", fired, clock.now_ms());
        }
        timers_fired += fired;
        deliver_pending(&mut engine, &entities, &zones, &mut queue, &clock, &mut delivered, &mut queued);
    }

    let report = Report {
        script: args.script,
        entity: entity.id,
        event: args.event,
        outcome,
        delivered,
        queued,
        timers: engine.timers().iter().map(|(_, record)| record.clone()).collect(),
        timers_fired,
        elapsed_ms: clock.now_ms(),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serializing report")?
    );
    Ok(())
}

/// Hand queued events to their targets' scripts
///
/// Events for entities without a script, and anything past the per-step
/// limit, end up in `queued`.
#[allow(clippy::too_many_arguments)]
fn deliver_pending(
    engine: &mut ScriptEngine,
    entities: &EntityManager,
    zones: &ZoneMap,
    queue: &mut EventQueue,
    clock: &ManualClock,
    delivered: &mut Vec<Delivery>,
    queued: &mut Vec<QueuedEvent>,
) {
    let mut handled = 0;
    while let Some(event) = queue.next() {
        if handled >= MAX_DELIVERIES || engine.instance(Some(event.target)).is_none() {
            queued.push(event);
            continue;
        }
        handled += 1;

        let outcome = {
            let mut services = Services::new(entities, zones, queue, clock);
            engine.deliver(&mut services, &event)
        };
        delivered.push(Delivery {
            at_ms: clock.now_ms(),
            event,
            outcome,
        });
    }
}
