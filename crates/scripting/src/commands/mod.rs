//! Script commands
//!
//! Every command word maps to a [`Command`] object in a
//! [`CommandRegistry`]. The driver reads a word, looks it up and executes
//! it against the current [`Context`]; the returned [`Outcome`] tells the
//! driver whether to continue.

mod conditional;
mod dispatch;
mod flow;
mod timer;

pub use conditional::IfCommand;
pub use dispatch::{SendEventCommand, SetEventCommand};
pub use flow::{
    AbortCommand, ElseCommand, GotoCommand, NopCommand, RandomCommand, ReturnCommand,
    SetMainEventCommand,
};
pub use timer::{TimerCommand, TimerToggleCommand};

use crate::context::Context;
use crate::error::{Result, ScriptError};
use crate::operators::WrongTypePolicy;
use ember_config::InterpreterConfig;
use serde::Serialize;
use std::collections::HashMap;

/// Result of executing one command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Continue with the next statement
    Success,
    /// The statement failed; continue with the next one
    Failed,
    /// Stop handling the event because of an error
    AbortError,
    /// Stop handling the event, keeping the default behavior
    AbortAccept,
    /// Stop handling the event, suppressing the default behavior
    AbortRefuse,
    /// The cursor was moved to a label
    Jumped,
}

impl Outcome {
    /// Whether the driver stops handling the event
    pub fn is_abort(self) -> bool {
        matches!(
            self,
            Outcome::AbortError | Outcome::AbortAccept | Outcome::AbortRefuse
        )
    }
}

/// A script command
pub trait Command: Send + Sync {
    /// Word the command is registered under
    fn name(&self) -> &str;

    /// Whether the command only makes sense for a script owned by an entity
    fn needs_entity(&self) -> bool {
        false
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome;
}

/// Command lookup by name
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command
    pub fn with_defaults(config: &InterpreterConfig) -> Self {
        let policy = WrongTypePolicy::from_legacy_flag(config.legacy_operator_defaults);

        let mut registry = Self::new();
        let defaults: Vec<Box<dyn Command>> = vec![
            Box::new(NopCommand),
            Box::new(GotoCommand::new("goto", false)),
            Box::new(GotoCommand::new("gosub", true)),
            Box::new(AbortCommand::new("accept", Outcome::AbortAccept)),
            Box::new(AbortCommand::new("refuse", Outcome::AbortRefuse)),
            Box::new(RandomCommand),
            Box::new(ReturnCommand),
            Box::new(SetMainEventCommand::new("setmainevent")),
            Box::new(SetMainEventCommand::new("setstatus")),
            Box::new(TimerToggleCommand::new("starttimer", true)),
            Box::new(TimerToggleCommand::new("stoptimer", false)),
            Box::new(TimerCommand),
            Box::new(SendEventCommand),
            Box::new(SetEventCommand),
            Box::new(IfCommand::new(policy)),
            Box::new(ElseCommand),
        ];
        for command in defaults {
            if let Err(e) = registry.register(command) {
                tracing::error!("{}", e);
            }
        }

        tracing::debug!("Registered {} script commands", registry.len());
        registry
    }

    /// Add a command; the first registration of a name wins
    pub fn register(&mut self, command: Box<dyn Command>) -> Result<()> {
        let name = command.name().to_lowercase();
        if self.commands.contains_key(&name) {
            return Err(ScriptError::DuplicateCommand(name));
        }
        self.commands.insert(name, command);
        Ok(())
    }

    /// Find the command for a (lowercased) command word
    ///
    /// `timer<name>` words that are not registered themselves resolve to the
    /// `timer` command, which takes the name from the suffix.
    pub fn lookup(&self, word: &str) -> Option<&dyn Command> {
        if let Some(command) = self.commands.get(word) {
            return Some(command.as_ref());
        }
        if word.starts_with("timer") {
            return self.commands.get("timer").map(|c| c.as_ref());
        }
        None
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
