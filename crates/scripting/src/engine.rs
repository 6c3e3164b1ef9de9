//! Script driver
//!
//! Owns the attached scripts, the command registry and the shared runtime,
//! and runs event handlers and due timers statement by statement.

use crate::commands::{CommandRegistry, Outcome};
use crate::context::{Context, Runtime, Services};
use crate::error::ScriptError;
use crate::events::SenderScope;
use crate::scheduler::{Firing, TimerPool};
use crate::script::Script;
use crate::state::ScriptState;
use crate::variables::VariableTable;
use ember_config::InterpreterConfig;
use ember_core::{EntityId, QueuedEvent};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// A script attached to an entity (or the global script) with its state
#[derive(Debug, Clone)]
pub struct ScriptInstance {
    pub script: Arc<Script>,
    pub state: ScriptState,

    /// Instance whose stopwatches and disabled-event mask this one uses
    pub master: Option<EntityId>,
}

impl ScriptInstance {
    fn new(script: Arc<Script>, local_capacity: usize) -> Self {
        Self {
            script,
            state: ScriptState::new(local_capacity),
            master: None,
        }
    }
}

/// Where a run stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    /// Until the handler's block closes
    Block,
    /// Until the end of the starting line
    Line,
}

/// Statement driver for every attached script
pub struct ScriptEngine {
    config: InterpreterConfig,
    commands: CommandRegistry,
    runtime: Runtime,
    scripts: HashMap<EntityId, ScriptInstance>,
    global: Option<ScriptInstance>,
}

impl ScriptEngine {
    /// Create an engine with the built-in commands
    ///
    /// # Arguments
    /// * `config` - Interpreter limits and compatibility switches
    pub fn new(config: InterpreterConfig) -> Self {
        tracing::debug!(
            "Creating ScriptEngine ({} timer slots)",
            config.timer_pool_size
        );

        Self {
            commands: CommandRegistry::with_defaults(&config),
            runtime: Runtime::new(&config),
            config,
            scripts: HashMap::new(),
            global: None,
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Registry for adding engine-specific commands
    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    /// Attach a script to an entity with fresh state
    ///
    /// # Returns
    /// The previously attached instance, if any
    pub fn attach(&mut self, entity: EntityId, script: Arc<Script>) -> Option<ScriptInstance> {
        tracing::debug!("Attaching script {} to entity {}", script.name(), entity);
        let instance = ScriptInstance::new(script, self.config.max_local_variables);
        self.scripts.insert(entity, instance)
    }

    /// Link an entity's instance to a master instance
    ///
    /// A duplicated instance keeps its own locals and main event but starts,
    /// stops and reads stopwatches and switches events on the master's
    /// state. Links are followed one level only; `None` unlinks.
    ///
    /// # Returns
    /// `false` if the entity has no script or names itself
    pub fn set_master(&mut self, entity: EntityId, master: Option<EntityId>) -> bool {
        if master == Some(entity) {
            tracing::warn!("entity {} cannot be its own master", entity);
            return false;
        }
        match self.scripts.get_mut(&entity) {
            Some(instance) => {
                tracing::debug!("Master of entity {} set to {:?}", entity, master);
                instance.master = master;
                true
            }
            None => false,
        }
    }

    /// Detach an entity's script and cancel its timers
    pub fn detach(&mut self, entity: EntityId) -> Option<ScriptInstance> {
        let cleared = self.runtime.timers.clear_entity(Some(entity));
        tracing::debug!("Detaching script from entity {} ({} timers cleared)", entity, cleared);
        self.scripts.remove(&entity)
    }

    /// Script run for events without a target entity
    pub fn set_global_script(&mut self, script: Arc<Script>) {
        tracing::debug!("Setting global script {}", script.name());
        self.global = Some(ScriptInstance::new(script, self.config.max_local_variables));
    }

    pub fn instance(&self, entity: Option<EntityId>) -> Option<&ScriptInstance> {
        match entity {
            Some(id) => self.scripts.get(&id),
            None => self.global.as_ref(),
        }
    }

    pub fn state(&self, entity: Option<EntityId>) -> Option<&ScriptState> {
        self.instance(entity).map(|i| &i.state)
    }

    pub fn state_mut(&mut self, entity: Option<EntityId>) -> Option<&mut ScriptState> {
        match entity {
            Some(id) => self.scripts.get_mut(&id),
            None => self.global.as_mut(),
        }
        .map(|i| &mut i.state)
    }

    pub fn globals(&self) -> &VariableTable {
        &self.runtime.globals
    }

    pub fn globals_mut(&mut self) -> &mut VariableTable {
        &mut self.runtime.globals
    }

    pub fn timers(&self) -> &TimerPool {
        &self.runtime.timers
    }

    /// Restart the `random` sequence
    pub fn reseed(&mut self, seed: u64) {
        self.runtime.reseed(seed);
    }

    /// Run the handler for `event` in an entity's script
    ///
    /// `None` targets the global script. `main` runs the handler chosen with
    /// `setmainevent`. A disabled standard event is not delivered and
    /// reports `AbortAccept`; a missing handler reports `Success`.
    pub fn send_event(
        &mut self,
        services: &mut Services<'_>,
        entity: Option<EntityId>,
        event: &str,
        params: &str,
    ) -> Outcome {
        let event = event.to_lowercase();
        let Self {
            config,
            commands,
            runtime,
            scripts,
            global,
        } = self;

        let outcome = with_instance(scripts, global, entity, |instance, master| {
            let allowed = master.as_deref().unwrap_or(&instance.state).allows(&event);
            if !allowed {
                tracing::debug!(entity = ?entity, "event {} is disabled", event);
                return Outcome::AbortAccept;
            }

            let handler = match instance.state.main_event() {
                Some(main) if event == "main" => main.to_string(),
                _ => event.clone(),
            };
            let Some(pos) = instance.script.find_event(&handler) else {
                tracing::trace!(entity = ?entity, "no handler for {}", handler);
                return Outcome::Success;
            };

            tracing::debug!(entity = ?entity, script = instance.script.name(), "on {}", handler);
            let mut ctx = Context::new(
                instance.script.clone(),
                pos,
                &mut instance.state,
                runtime,
                services.reborrow(),
            )
            .with_entity(entity)
            .with_master(master)
            .with_params(params);

            run(commands, config.max_steps_per_event, &mut ctx, RunMode::Block)
        });

        outcome.unwrap_or_else(|| {
            tracing::warn!(entity = ?entity, "no script to receive event {}", event);
            Outcome::Failed
        })
    }

    /// Handle a queued event with its sender published
    pub fn deliver(&mut self, services: &mut Services<'_>, event: &QueuedEvent) -> Outcome {
        let _scope = SenderScope::enter(event.sender);
        self.send_event(services, Some(event.target), &event.event, &event.params)
    }

    /// Advance the timer pool once
    ///
    /// Slots are visited in order and each due timer fires at most once.
    /// Timers whose owner or its script is gone are freed.
    ///
    /// # Returns
    /// Number of timers fired
    pub fn tick(&mut self, services: &mut Services<'_>) -> usize {
        let now = services.clock.now_ms();
        let mut fired = 0;

        for slot in 0..self.runtime.timers.capacity() {
            let Some(record) = self.runtime.timers.get(slot) else {
                continue;
            };

            let idle = match record.entity {
                Some(id) => match services.entities.get(id) {
                    Some(entity) => entity.is_idle(),
                    None => {
                        tracing::warn!("timer{} belongs to a removed entity {}", record.name, id);
                        self.runtime.timers.free(slot);
                        continue;
                    }
                },
                None => true,
            };

            let attached = match record.entity {
                Some(id) => self.scripts.contains_key(&id),
                None => self.global.is_some(),
            };
            if !attached {
                tracing::warn!(entity = ?record.entity, "timer{} has no script to run", record.name);
                self.runtime.timers.free(slot);
                continue;
            }

            if let Some(firing) = self.runtime.timers.poll(slot, now, idle) {
                fired += 1;
                self.fire(services, firing);
            }
        }

        fired
    }

    fn fire(&mut self, services: &mut Services<'_>, firing: Firing) {
        let Self {
            config,
            commands,
            runtime,
            scripts,
            global,
        } = self;
        let Firing {
            slot,
            name,
            script,
            entity,
            resume_at,
        } = firing;

        with_instance(scripts, global, entity, |instance, master| {
            tracing::trace!(entity = ?entity, "timer{} fired (slot {})", name, slot);
            let mut ctx = Context::new(
                script,
                resume_at,
                &mut instance.state,
                runtime,
                services.reborrow(),
            )
            .with_entity(entity)
            .with_master(master);

            let outcome = run(commands, config.max_steps_per_event, &mut ctx, RunMode::Line);
            tracing::trace!(entity = ?entity, "timer{} finished: {:?}", name, outcome);
        });
    }
}

/// Borrow an instance together with its master's state
///
/// The master is taken out of the map while `f` runs and put back after.
/// `None` if the instance is not attached.
fn with_instance<T>(
    scripts: &mut HashMap<EntityId, ScriptInstance>,
    global: &mut Option<ScriptInstance>,
    entity: Option<EntityId>,
    f: impl FnOnce(&mut ScriptInstance, Option<&mut ScriptState>) -> T,
) -> Option<T> {
    let master_id = entity
        .and_then(|id| scripts.get(&id))
        .and_then(|instance| instance.master)
        .filter(|&master| Some(master) != entity);
    let mut master = master_id.and_then(|id| scripts.remove(&id));

    let instance = match entity {
        Some(id) => scripts.get_mut(&id),
        None => global.as_mut(),
    };
    let result = instance.map(|instance| f(instance, master.as_mut().map(|m| &mut m.state)));

    if let (Some(id), Some(master)) = (master_id, master) {
        scripts.insert(id, master);
    }
    result
}

/// Execute statements until the run ends
fn run(
    commands: &CommandRegistry,
    max_steps: usize,
    ctx: &mut Context<'_>,
    mut mode: RunMode,
) -> Outcome {
    let mut depth: i32 = 0;
    let mut steps = 0;

    // Brace depth at each `gosub`, restored by its `return`
    let mut frames: Vec<i32> = Vec::new();

    loop {
        if mode == RunMode::Line && depth <= 0 && ctx.call_depth() == 0 && ctx.at_line_end() {
            return Outcome::Success;
        }

        let word = ctx.read_command();
        match word.as_str() {
            "" | "on" => return Outcome::Success,
            "{" => {
                depth += 1;
                continue;
            }
            "}" => {
                depth -= 1;
                if depth <= 0 && mode == RunMode::Block {
                    return Outcome::Success;
                }
                continue;
            }
            label if label.starts_with(">>") => continue,
            _ => {}
        }

        steps += 1;
        if steps > max_steps {
            let err = ScriptError::Timeout { steps: max_steps };
            tracing::error!(entity = %ctx.entity_name(), "{}", err);
            return Outcome::AbortError;
        }

        let Some(command) = commands.lookup(&word) else {
            tracing::warn!(entity = %ctx.entity_name(), "unknown command: {}", word);
            ctx.skip_command();
            continue;
        };

        if command.needs_entity() && ctx.entity_id().is_none() {
            tracing::warn!(command = %word, "command needs an entity");
            ctx.skip_command();
            continue;
        }

        ctx.set_command(&word);
        let calls = ctx.call_depth();
        let outcome = command.execute(ctx);
        match ctx.call_depth().cmp(&calls) {
            Ordering::Greater => frames.push(depth),
            Ordering::Less => {
                if let Some(saved) = frames.pop() {
                    depth = saved;
                }
            }
            Ordering::Equal => {}
        }

        match outcome {
            outcome if outcome.is_abort() => return outcome,
            Outcome::Jumped if mode == RunMode::Line && ctx.call_depth() == 0 => {
                mode = RunMode::Block;
            }
            _ => {}
        }
    }
}
