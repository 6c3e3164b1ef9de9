//! `if <left> <operator> <right>`

use super::{Command, Outcome};
use crate::context::Context;
use crate::operators::{Operator, OperatorTable, WrongTypePolicy};
use crate::value::Value;

/// Runs the next statement only when the comparison holds
///
/// A false comparison skips the guarded statement; an `else` right after it
/// is consumed so the else branch runs instead.
pub struct IfCommand {
    operators: OperatorTable,
    policy: WrongTypePolicy,
}

impl IfCommand {
    pub fn new(policy: WrongTypePolicy) -> Self {
        Self {
            operators: OperatorTable::with_defaults(),
            policy,
        }
    }

    /// Use a custom operator table
    pub fn with_operators(operators: OperatorTable, policy: WrongTypePolicy) -> Self {
        Self { operators, policy }
    }

    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    /// Resolve both operands; the right one takes the left one's type as hint
    fn operands(ctx: &Context<'_>, operator: &Operator, left: &str, right: &str) -> (Value, Value) {
        let left = ctx.resolve(left, operator.preferred());
        let right = ctx.resolve(right, left.value_type());
        (left, right)
    }
}

impl Command for IfCommand {
    fn name(&self) -> &str {
        "if"
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        let left = ctx.read_word();
        let op = ctx.read_word();
        let right = ctx.read_word();

        let Some(operator) = self.operators.get(&op) else {
            tracing::warn!(entity = %ctx.entity_name(), command = "if", "unknown operator: {}", op);
            ctx.skip_guarded();
            return Outcome::Failed;
        };

        let (l, r) = Self::operands(ctx, operator, &left, &right);
        if l.value_type() != r.value_type() {
            tracing::warn!(
                entity = %ctx.entity_name(),
                command = "if",
                "incompatible types: \"{}\" ({}) and \"{}\" ({})",
                left,
                l.value_type(),
                right,
                r.value_type()
            );
            ctx.skip_guarded();
            return Outcome::Failed;
        }

        let condition = operator.apply(ctx, &l, &r, self.policy);
        tracing::debug!(
            entity = %ctx.entity_name(),
            "if \"{}\" {} \"{}\" -> \"{}\" {} \"{}\" -> {}",
            left,
            op,
            right,
            l,
            op,
            r,
            condition
        );

        if !condition {
            ctx.skip_guarded();
        }
        Outcome::Success
    }
}
