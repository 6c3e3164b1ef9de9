//! Control flow commands

use super::{Command, Outcome};
use crate::context::Context;
use rand::Rng;

/// `nop`
pub struct NopCommand;

impl Command for NopCommand {
    fn name(&self) -> &str {
        "nop"
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        tracing::trace!(entity = %ctx.entity_name(), "nop");
        Outcome::Success
    }
}

/// `goto <label>` and `gosub <label>`
pub struct GotoCommand {
    name: &'static str,
    call: bool,
}

impl GotoCommand {
    pub fn new(name: &'static str, call: bool) -> Self {
        Self { name, call }
    }
}

impl Command for GotoCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        let label = ctx.read_word();
        tracing::debug!(entity = %ctx.entity_name(), "{} {}", self.name, label);

        if !self.call {
            if let Some(pos) = ctx.skip_command() {
                tracing::warn!(
                    entity = %ctx.entity_name(),
                    command = self.name,
                    "unexpected text at {}",
                    pos
                );
            }
        }

        match ctx.jump_to_label(&label, self.call) {
            Ok(()) => Outcome::Jumped,
            Err(e) => {
                tracing::error!(entity = %ctx.entity_name(), command = self.name, "{}", e);
                Outcome::AbortError
            }
        }
    }
}

/// `accept` and `refuse`
pub struct AbortCommand {
    name: &'static str,
    outcome: Outcome,
}

impl AbortCommand {
    pub fn new(name: &'static str, outcome: Outcome) -> Self {
        Self { name, outcome }
    }
}

impl Command for AbortCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        tracing::debug!(entity = %ctx.entity_name(), "{}", self.name);
        self.outcome
    }
}

/// `random <percent>`: runs the next statement with the given chance
pub struct RandomCommand;

impl Command for RandomCommand {
    fn name(&self) -> &str {
        "random"
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        let chance = ctx.read_float().clamp(0.0, 100.0);
        let roll = ctx.runtime.rng().gen::<f32>() * 100.0;
        tracing::debug!(entity = %ctx.entity_name(), "random {} (rolled {})", chance, roll);

        if roll >= chance {
            ctx.skip_guarded();
        }
        Outcome::Success
    }
}

/// `return` from a `gosub`
pub struct ReturnCommand;

impl Command for ReturnCommand {
    fn name(&self) -> &str {
        "return"
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        tracing::debug!(entity = %ctx.entity_name(), "return");

        match ctx.return_to_caller() {
            Ok(()) => Outcome::Success,
            Err(e) => {
                tracing::error!(entity = %ctx.entity_name(), command = "return", "{}", e);
                Outcome::AbortError
            }
        }
    }
}

/// `setmainevent <event>` (also `setstatus`)
pub struct SetMainEventCommand {
    name: &'static str,
}

impl SetMainEventCommand {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl Command for SetMainEventCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn needs_entity(&self) -> bool {
        true
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        let event = ctx.read_word();
        tracing::debug!(entity = %ctx.entity_name(), "{} {}", self.name, event);
        ctx.state.set_main_event(&event);
        Outcome::Success
    }
}

/// `else`: reached only after a taken branch, so the else branch is skipped
pub struct ElseCommand;

impl Command for ElseCommand {
    fn name(&self) -> &str {
        "else"
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        tracing::trace!(entity = %ctx.entity_name(), "else");
        ctx.skip_statement();
        Outcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;

    #[test]
    fn test_goto_discards_trailing_text() {
        let mut world = TestWorld::new();
        let outcome = world.with_context("goto end extra\n>>end\nnop\n", |ctx| {
            ctx.read_command();
            let outcome = GotoCommand::new("goto", false).execute(ctx);
            assert_eq!(ctx.call_depth(), 0);
            assert_eq!(ctx.read_command(), "nop");
            outcome
        });
        assert_eq!(outcome, Outcome::Jumped);
    }

    #[test]
    fn test_unknown_label_aborts() {
        let mut world = TestWorld::new();
        let outcome = world.with_context("gosub nowhere\n", |ctx| {
            ctx.read_command();
            GotoCommand::new("gosub", true).execute(ctx)
        });
        assert_eq!(outcome, Outcome::AbortError);
    }

    #[test]
    fn test_return_without_gosub() {
        let mut world = TestWorld::new();
        let outcome = world.with_context("return\n", |ctx| {
            ctx.read_command();
            ReturnCommand.execute(ctx)
        });
        assert_eq!(outcome, Outcome::AbortError);
    }

    #[test]
    fn test_random_bounds() {
        let mut world = TestWorld::new();
        for _ in 0..50 {
            let next = world.with_context("random 0 accept\nnop\n", |ctx| {
                ctx.read_command();
                RandomCommand.execute(ctx);
                ctx.read_command()
            });
            assert_eq!(next, "nop");

            let next = world.with_context("random 100 accept\nnop\n", |ctx| {
                ctx.read_command();
                RandomCommand.execute(ctx);
                ctx.read_command()
            });
            assert_eq!(next, "accept");
        }
    }

    #[test]
    fn test_set_main_event() {
        let mut world = TestWorld::new();
        world.with_context("setmainevent Patrol\n", |ctx| {
            ctx.read_command();
            SetMainEventCommand::new("setmainevent").execute(ctx)
        });
        assert_eq!(world.state.main_event(), Some("patrol"));
    }

    #[test]
    fn test_else_skips_branch() {
        let mut world = TestWorld::new();
        let next = world.with_context("else refuse\naccept\n", |ctx| {
            ctx.read_command();
            ElseCommand.execute(ctx);
            ctx.read_command()
        });
        assert_eq!(next, "accept");
    }
}
