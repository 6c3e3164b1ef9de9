//! In-memory world for unit tests

use crate::context::{Context, Runtime, Services};
use crate::script::Script;
use crate::state::ScriptState;
use ember_config::InterpreterConfig;
use ember_core::{Entity, IoFlags, Vec3};
use ember_world::{EntityManager, EventQueue, ManualClock, ZoneMap};
use std::sync::Arc;

pub(crate) struct TestWorld {
    pub entities: EntityManager,
    pub zones: ZoneMap,
    pub queue: EventQueue,
    pub clock: ManualClock,
    pub state: ScriptState,
    pub runtime: Runtime,

    /// Entity the test script runs as, named `guard`
    pub me: Arc<Entity>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig {
            rng_seed: Some(7),
            ..Default::default()
        })
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        let entities = EntityManager::new();
        let me = entities.spawn("guard", IoFlags::NPC, |e| e.at(Vec3::ZERO));

        Self {
            state: ScriptState::new(config.max_local_variables),
            runtime: Runtime::new(&config),
            entities,
            zones: ZoneMap::new(),
            queue: EventQueue::new(),
            clock: ManualClock::new(1000),
            me,
        }
    }

    pub fn services(&mut self) -> Services<'_> {
        Services::new(&self.entities, &self.zones, &mut self.queue, &self.clock)
    }

    /// Run `f` with a context at the start of `source`, bound to `me`
    pub fn with_context<T>(&mut self, source: &str, f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        let script = Arc::new(Script::new("test", source));
        let services = Services::new(&self.entities, &self.zones, &mut self.queue, &self.clock);
        let mut ctx = Context::new(script, 0, &mut self.state, &mut self.runtime, services)
            .with_entity(Some(self.me.id));
        f(&mut ctx)
    }
}
