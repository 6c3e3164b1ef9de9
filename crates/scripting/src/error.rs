//! Error types for the scripting crate

use ember_core::CoreError;

/// Script-specific error types
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Script file could not be read
    #[error("Failed to load script: {0}")]
    Io(#[from] std::io::Error),

    /// A command with this name is already registered
    #[error("Duplicate command: {0}")]
    DuplicateCommand(String),

    /// An `if` operator with this name is already registered
    #[error("Duplicate 'if' operator: {0}")]
    DuplicateOperator(String),

    /// Identifier has no writable variable sigil
    #[error("Not a variable: {0}")]
    InvalidVariableName(String),

    /// Variable table has no room for another name
    #[error("Variable table full ({capacity} entries), cannot add {name}")]
    VariableTableFull { name: String, capacity: usize },

    /// Every timer slot is occupied
    #[error("No free timer available ({capacity} slots in use)")]
    TimerPoolExhausted { capacity: usize },

    /// Jump target does not exist
    #[error("Unknown label \"{0}\"")]
    UnknownLabel(String),

    /// `return` without a matching `gosub`
    #[error("Return without gosub")]
    EmptyCallStack,

    /// Too many nested `gosub` calls
    #[error("Stack overflow (depth {depth})")]
    StackOverflow { depth: usize },

    /// Event run exceeded its statement budget
    #[error("Script timeout after {steps} statements")]
    Timeout { steps: usize },
}

impl From<ScriptError> for CoreError {
    fn from(err: ScriptError) -> Self {
        CoreError::Script(err.to_string())
    }
}

/// Result type for scripting operations
pub type Result<T> = std::result::Result<T, ScriptError>;
