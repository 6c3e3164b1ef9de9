//! Binary operators for `if`
//!
//! Each operator names the operand type it prefers (used to resolve an
//! unprefixed left operand) and carries a predicate per operand type. An
//! operator without a predicate for the type the operands resolved to
//! falls back to a [`WrongTypePolicy`] result.

use crate::context::Context;
use crate::error::{Result, ScriptError};
use crate::value::{Value, ValueType};
use ember_core::ItemType;
use std::collections::HashMap;
use std::fmt;

/// Predicate over two text operands
pub type TextPredicate = fn(&Context<'_>, &str, &str) -> bool;

/// Predicate over two numeric operands
pub type NumberPredicate = fn(f32, f32) -> bool;

/// Result of applying an operator to operands it has no predicate for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrongTypePolicy {
    /// Numbers compare true, text compares false
    #[default]
    Legacy,
    /// Both compare false
    Conservative,
}

impl WrongTypePolicy {
    pub fn from_legacy_flag(legacy: bool) -> Self {
        if legacy {
            WrongTypePolicy::Legacy
        } else {
            WrongTypePolicy::Conservative
        }
    }

    fn fallback(self, operand: ValueType) -> bool {
        match (self, operand) {
            (WrongTypePolicy::Legacy, ValueType::Number) => true,
            _ => false,
        }
    }
}

/// A named comparison
#[derive(Clone)]
pub struct Operator {
    name: String,
    preferred: ValueType,
    text: Option<TextPredicate>,
    number: Option<NumberPredicate>,
}

impl Operator {
    /// Operator applicable to text only
    pub fn text(name: impl Into<String>, predicate: TextPredicate) -> Self {
        Self {
            name: name.into(),
            preferred: ValueType::Text,
            text: Some(predicate),
            number: None,
        }
    }

    /// Operator applicable to numbers only
    pub fn number(name: impl Into<String>, predicate: NumberPredicate) -> Self {
        Self {
            name: name.into(),
            preferred: ValueType::Number,
            text: None,
            number: Some(predicate),
        }
    }

    /// Operator applicable to both, preferring numbers
    pub fn both(name: impl Into<String>, text: TextPredicate, number: NumberPredicate) -> Self {
        Self {
            name: name.into(),
            preferred: ValueType::Number,
            text: Some(text),
            number: Some(number),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type hint for an unprefixed left operand
    pub fn preferred(&self) -> ValueType {
        self.preferred
    }

    /// Apply to two operands of the same type
    ///
    /// Operands of different types are the caller's concern; a mixed pair
    /// is treated as text.
    pub fn apply(
        &self,
        ctx: &Context<'_>,
        left: &Value,
        right: &Value,
        policy: WrongTypePolicy,
    ) -> bool {
        if let (Value::Number(l), Value::Number(r)) = (left, right) {
            return match self.number {
                Some(predicate) => predicate(*l, *r),
                None => {
                    tracing::warn!(
                        entity = %ctx.entity_name(),
                        "operator {} is not applicable to numbers",
                        self.name
                    );
                    policy.fallback(ValueType::Number)
                }
            };
        }

        match self.text {
            Some(predicate) => predicate(ctx, &left.to_string(), &right.to_string()),
            None => {
                tracing::warn!(
                    entity = %ctx.entity_name(),
                    "operator {} is not applicable to text",
                    self.name
                );
                policy.fallback(ValueType::Text)
            }
        }
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("preferred", &self.preferred)
            .field("text", &self.text.is_some())
            .field("number", &self.number.is_some())
            .finish()
    }
}

/// Operator lookup by name
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    operators: HashMap<String, Operator>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every built-in operator
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        let defaults = [
            Operator::text("iselement", is_element),
            Operator::text("isclass", is_class),
            Operator::text("isgroup", is_group),
            Operator::text("!isgroup", is_not_group),
            Operator::text("istype", is_type),
            Operator::text("isin", is_in),
            Operator::both("==", |_, l, r| l == r, |l, r| l == r),
            Operator::both("!=", |_, l, r| l != r, |l, r| l != r),
            Operator::number("<=", |l, r| l <= r),
            Operator::number("<", |l, r| l < r),
            Operator::number(">=", |l, r| l >= r),
            Operator::number(">", |l, r| l > r),
        ];
        for operator in defaults {
            if let Err(e) = table.register(operator) {
                tracing::error!("{}", e);
            }
        }
        table
    }

    /// Add an operator; the first registration of a name wins
    pub fn register(&mut self, operator: Operator) -> Result<()> {
        if self.operators.contains_key(&operator.name) {
            return Err(ScriptError::DuplicateOperator(operator.name));
        }
        self.operators.insert(operator.name.clone(), operator);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Operator> {
        self.operators.get(name)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// `seek` equals one space-separated element of `list`
fn is_element(_: &Context<'_>, seek: &str, list: &str) -> bool {
    list.split(' ').any(|element| element == seek)
}

/// Either name contains the other
fn is_class(_: &Context<'_>, left: &str, right: &str) -> bool {
    left.contains(right) || right.contains(left)
}

fn is_group(ctx: &Context<'_>, entity: &str, group: &str) -> bool {
    ctx.services
        .entities
        .find(entity, ctx.entity_id())
        .is_some_and(|e| e.is_in_group(group))
}

/// Only true for an existing entity outside the group
fn is_not_group(ctx: &Context<'_>, entity: &str, group: &str) -> bool {
    ctx.services
        .entities
        .find(entity, ctx.entity_id())
        .is_some_and(|e| !e.is_in_group(group))
}

fn is_type(ctx: &Context<'_>, entity: &str, type_name: &str) -> bool {
    let Some(flag) = ItemType::from_script_name(type_name) else {
        tracing::warn!(entity = %ctx.entity_name(), "unknown type: {}", type_name);
        return false;
    };
    ctx.services
        .entities
        .find(entity, ctx.entity_id())
        .is_some_and(|e| e.item_type.intersects(flag))
}

/// `needle` occurs in `haystack`
fn is_in(_: &Context<'_>, needle: &str, haystack: &str) -> bool {
    haystack.contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;
    use ember_core::IoFlags;

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    fn check(world: &mut TestWorld, op: &str, left: Value, right: Value) -> bool {
        let table = OperatorTable::with_defaults();
        let operator = table.get(op).unwrap().clone();
        world.with_context("", |ctx| {
            operator.apply(ctx, &left, &right, WrongTypePolicy::Legacy)
        })
    }

    #[test]
    fn test_defaults_registered() {
        let table = OperatorTable::with_defaults();
        assert_eq!(table.len(), 12);
        assert_eq!(table.get("isin").unwrap().preferred(), ValueType::Text);
        assert_eq!(table.get("==").unwrap().preferred(), ValueType::Number);
        assert!(table.get("~=").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut table = OperatorTable::with_defaults();
        let err = table.register(Operator::number("==", |_, _| false)).unwrap_err();
        assert!(matches!(err, ScriptError::DuplicateOperator(name) if name == "=="));

        let mut world = TestWorld::new();
        let operator = table.get("==").unwrap().clone();
        assert!(world.with_context("", |ctx| {
            operator.apply(ctx, &Value::Number(1.0), &Value::Number(1.0), WrongTypePolicy::Legacy)
        }));
    }

    #[test]
    fn test_text_operators() {
        let mut world = TestWorld::new();
        assert!(check(&mut world, "iselement", text("b"), text("a b c")));
        assert!(!check(&mut world, "iselement", text("ab"), text("a b c")));
        assert!(check(&mut world, "isclass", text("goblin"), text("goblin_base")));
        assert!(check(&mut world, "isclass", text("goblin_base"), text("goblin")));
        assert!(!check(&mut world, "isclass", text("rat"), text("goblin")));
        assert!(check(&mut world, "isin", text("ell"), text("hello")));
        assert!(!check(&mut world, "isin", text("hello"), text("ell")));
        assert!(check(&mut world, "==", text("a"), text("a")));
        assert!(check(&mut world, "!=", text("a"), text("b")));
    }

    #[test]
    fn test_number_operators() {
        let mut world = TestWorld::new();
        let n = Value::Number;
        assert!(check(&mut world, "<", n(1.0), n(2.0)));
        assert!(check(&mut world, "<=", n(2.0), n(2.0)));
        assert!(!check(&mut world, ">", n(2.0), n(2.0)));
        assert!(check(&mut world, ">=", n(3.0), n(2.0)));
        assert!(check(&mut world, "==", n(0.5), n(0.5)));
        assert!(!check(&mut world, "!=", n(0.5), n(0.5)));
    }

    #[test]
    fn test_group_and_type_operators() {
        let mut world = TestWorld::new();
        world.me.add_group("guards");
        world.entities.spawn("sword", IoFlags::ITEM, |e| {
            e.with_item_type(ItemType::WEAPON | ItemType::ONE_HANDED)
        });

        assert!(check(&mut world, "isgroup", text("me"), text("guards")));
        assert!(!check(&mut world, "!isgroup", text("me"), text("guards")));
        assert!(check(&mut world, "!isgroup", text("me"), text("thieves")));
        assert!(!check(&mut world, "isgroup", text("nobody"), text("guards")));
        assert!(!check(&mut world, "!isgroup", text("nobody"), text("guards")));

        assert!(check(&mut world, "istype", text("sword"), text("weapon")));
        assert!(!check(&mut world, "istype", text("sword"), text("shield")));
        assert!(!check(&mut world, "istype", text("sword"), text("banana")));
    }

    #[test]
    fn test_wrong_type_policy() {
        let mut world = TestWorld::new();
        let table = OperatorTable::with_defaults();
        let isin = table.get("isin").unwrap().clone();
        let less = table.get("<").unwrap().clone();

        world.with_context("", |ctx| {
            let n = Value::Number(1.0);
            let t = text("1");
            assert!(isin.apply(ctx, &n, &n, WrongTypePolicy::Legacy));
            assert!(!less.apply(ctx, &t, &t, WrongTypePolicy::Legacy));
            assert!(!isin.apply(ctx, &n, &n, WrongTypePolicy::Conservative));
            assert!(!less.apply(ctx, &t, &t, WrongTypePolicy::Conservative));
        });
    }
}
