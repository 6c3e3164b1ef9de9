//! Variable namespaces and operand resolution
//!
//! The first character of an identifier selects its namespace:
//!
//! | sigil | namespace                  | stored as |
//! |-------|----------------------------|-----------|
//! | `^`   | engine pseudo-variable     | computed  |
//! | `#`   | global integer             | `i64`     |
//! | `§`   | local integer              | `i64`     |
//! | `&`   | global float               | `f32`     |
//! | `@`   | local float                | `f32`     |
//! | `$`   | global text                | `String`  |
//! | `£`   | local text                 | `String`  |
//!
//! Anything else is a literal.

use crate::error::{Result, ScriptError};
use crate::value::{format_number, parse_number, Value, ValueType};
use std::collections::HashMap;

/// Namespace selected by an identifier's sigil
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    System,
    GlobalInteger,
    LocalInteger,
    GlobalFloat,
    LocalFloat,
    GlobalText,
    LocalText,
    Literal,
}

impl Namespace {
    pub fn of(identifier: &str) -> Self {
        match identifier.chars().next() {
            Some('^') => Namespace::System,
            Some('#') => Namespace::GlobalInteger,
            Some('\u{a7}') => Namespace::LocalInteger,
            Some('&') => Namespace::GlobalFloat,
            Some('@') => Namespace::LocalFloat,
            Some('$') => Namespace::GlobalText,
            Some('\u{a3}') => Namespace::LocalText,
            _ => Namespace::Literal,
        }
    }

    pub fn is_local(self) -> bool {
        matches!(
            self,
            Namespace::LocalInteger | Namespace::LocalFloat | Namespace::LocalText
        )
    }

    pub fn is_global(self) -> bool {
        matches!(
            self,
            Namespace::GlobalInteger | Namespace::GlobalFloat | Namespace::GlobalText
        )
    }
}

/// Stored variable
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Integer(i64),
    Float(f32),
    Text(String),
}

/// Value of an engine pseudo-variable before promotion
#[derive(Debug, Clone, PartialEq)]
pub enum SystemValue {
    Text(String),
    Float(f32),
    Integer(i64),
}

impl From<SystemValue> for Value {
    fn from(value: SystemValue) -> Self {
        match value {
            SystemValue::Text(s) => Value::Text(s),
            SystemValue::Float(f) => Value::Number(f),
            SystemValue::Integer(l) => Value::Number(l as f32),
        }
    }
}

/// Fixed-capacity variable storage keyed by full identifier (sigil included)
#[derive(Debug, Clone)]
pub struct VariableTable {
    vars: HashMap<String, Variable>,
    capacity: usize,
}

impl VariableTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vars: HashMap::new(),
            capacity,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    /// Integer value, 0 when unset
    pub fn integer(&self, name: &str) -> i64 {
        match self.vars.get(name) {
            Some(Variable::Integer(l)) => *l,
            Some(Variable::Float(f)) => *f as i64,
            Some(Variable::Text(s)) => parse_number(s) as i64,
            None => 0,
        }
    }

    /// Float value, 0 when unset
    pub fn float(&self, name: &str) -> f32 {
        match self.vars.get(name) {
            Some(Variable::Integer(l)) => *l as f32,
            Some(Variable::Float(f)) => *f,
            Some(Variable::Text(s)) => parse_number(s),
            None => 0.0,
        }
    }

    /// Text value, empty when unset
    pub fn text(&self, name: &str) -> String {
        match self.vars.get(name) {
            Some(Variable::Integer(l)) => l.to_string(),
            Some(Variable::Float(f)) => format_number(*f),
            Some(Variable::Text(s)) => s.clone(),
            None => String::new(),
        }
    }

    /// Store `value` converted to the representation the sigil demands
    pub fn assign(&mut self, name: &str, value: &Value) -> Result<()> {
        let variable = match Namespace::of(name) {
            Namespace::GlobalInteger | Namespace::LocalInteger => {
                Variable::Integer(value.as_number() as i64)
            }
            Namespace::GlobalFloat | Namespace::LocalFloat => Variable::Float(value.as_number()),
            Namespace::GlobalText | Namespace::LocalText => {
                Variable::Text(value.clone().into_text())
            }
            Namespace::System | Namespace::Literal => {
                return Err(ScriptError::InvalidVariableName(name.to_string()));
            }
        };
        self.insert(name, variable)
    }

    fn insert(&mut self, name: &str, variable: Variable) -> Result<()> {
        if let Some(slot) = self.vars.get_mut(name) {
            *slot = variable;
            return Ok(());
        }
        if self.vars.len() >= self.capacity {
            return Err(ScriptError::VariableTableFull {
                name: name.to_string(),
                capacity: self.capacity,
            });
        }
        self.vars.insert(name.to_string(), variable);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.vars.remove(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

/// Resolve a raw operand to a typed value
///
/// `hint` is only consulted for literals: text literals are kept verbatim,
/// anything else is parsed as a number. Never fails; unset variables
/// resolve to 0 or empty text.
pub fn resolve<F>(
    identifier: &str,
    hint: ValueType,
    globals: &VariableTable,
    locals: &VariableTable,
    system: F,
) -> Value
where
    F: FnOnce(&str) -> SystemValue,
{
    match Namespace::of(identifier) {
        Namespace::System => system(identifier).into(),
        Namespace::GlobalInteger => Value::Number(globals.integer(identifier) as f32),
        Namespace::LocalInteger => Value::Number(locals.integer(identifier) as f32),
        Namespace::GlobalFloat => Value::Number(globals.float(identifier)),
        Namespace::LocalFloat => Value::Number(locals.float(identifier)),
        Namespace::GlobalText => Value::Text(globals.text(identifier)),
        Namespace::LocalText => Value::Text(locals.text(identifier)),
        Namespace::Literal => match hint {
            ValueType::Text => Value::Text(identifier.to_string()),
            ValueType::Number => Value::Number(parse_number(identifier)),
        },
    }
}
