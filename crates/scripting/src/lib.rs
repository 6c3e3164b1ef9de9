//! # Ember Scripting System
//!
//! Line-oriented entity scripts, interpreted straight from their text.
//!
//! ## Features
//! - Cursor-based execution, no parse tree
//! - Sigil-typed variables (global, local, engine)
//! - Pluggable `if` operators
//! - `goto` / `gosub` / `return` with a bounded call stack
//! - Event dispatch to single, group, radius and zone targets
//! - Pooled deferred timers
//!
//! ## Script Shape
//!
//! ```text
//! on init {
//!   setmainevent guard
//!   timerpatrol -m 0 500 sendevent -r 300 alert "intruder"
//!   accept
//! }
//!
//! on hit {
//!   if ^&param1 > 10 gosub flee
//!   else refuse
//!   accept
//! }
//!
//! >>flee
//!   sendevent -g guards help ~^me~
//!   return
//! ```

pub mod commands;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod operators;
pub mod scheduler;
pub mod script;
pub mod state;
pub mod value;
pub mod variables;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::{Command, CommandRegistry, Outcome};
pub use context::{Context, Flags, Runtime, Services};
pub use engine::{ScriptEngine, ScriptInstance};
pub use error::{Result, ScriptError};
pub use events::{current_event_sender, is_system_event, SenderScope, SYSTEM_EVENTS};
pub use operators::{Operator, OperatorTable, WrongTypePolicy};
pub use scheduler::{Firing, TimerPool, TimerRecord};
pub use script::Script;
pub use state::{DisabledEvents, ScriptState, TIMER_UNSET};
pub use value::{Value, ValueType};
pub use variables::{Namespace, SystemValue, Variable, VariableTable};
