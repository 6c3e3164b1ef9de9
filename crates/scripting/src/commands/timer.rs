//! Stopwatch and scheduler commands

use super::{Command, Outcome};
use crate::context::Context;
use crate::scheduler::TimerRecord;
use crate::state::ScriptState;

/// `starttimer <timerN>` / `stoptimer <timerN>`
pub struct TimerToggleCommand {
    name: &'static str,
    start: bool,
}

impl TimerToggleCommand {
    pub fn new(name: &'static str, start: bool) -> Self {
        Self { name, start }
    }
}

impl Command for TimerToggleCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        let timer = ctx.read_word();
        tracing::debug!(entity = %ctx.entity_name(), "{} {}", self.name, timer);

        let Some(slot) = ScriptState::timer_slot(&timer) else {
            tracing::warn!(entity = %ctx.entity_name(), command = self.name, "invalid timer: {}", timer);
            return Outcome::Failed;
        };

        if self.start {
            let now = ctx.now_ms();
            ctx.master_state_mut().start_timer(slot, now);
        } else {
            ctx.master_state_mut().stop_timer(slot);
        }
        Outcome::Success
    }
}

/// `timer[name] [-mi] <count|off|kill_local> <period> <command...>`
///
/// Schedules the rest of the line to run `count` times (0 meaning forever)
/// every `period` seconds, or milliseconds with `-m`. With `-i` the timer
/// only fires while the owner is idle. An existing timer of the same name
/// for the same owner is replaced.
pub struct TimerCommand;

impl Command for TimerCommand {
    fn name(&self) -> &str {
        "timer"
    }

    fn execute(&self, ctx: &mut Context<'_>) -> Outcome {
        let flags = ctx.read_flags("mi");
        let word = ctx.read_word();
        let entity = ctx.entity_id();

        if word == "kill_local" {
            let cleared = ctx.runtime.timers.clear_entity(entity);
            tracing::debug!(entity = %ctx.entity_name(), "timer kill_local ({} cleared)", cleared);
            return Outcome::Success;
        }

        let name = match ctx.command().strip_prefix("timer") {
            Some(suffix) if !suffix.is_empty() => suffix.to_lowercase(),
            _ => ctx.runtime.timers.default_name(),
        };

        ctx.runtime.timers.clear_by_name(&name, entity);
        if word == "off" {
            tracing::debug!(entity = %ctx.entity_name(), "timer{} off", name);
            return Outcome::Success;
        }

        let times = ctx.get_float_var(&word).max(0.0) as u32;
        // Whole units only: `1.5` seconds is one second
        let mut period_ms = ctx.read_float().max(0.0) as u64;
        if !flags.has('m') {
            period_ms = period_ms.saturating_mul(1000);
        }

        let Some(resume_at) = ctx.skip_command() else {
            tracing::warn!(entity = %ctx.entity_name(), command = "timer", "timer{} has no command", name);
            return Outcome::Failed;
        };

        let record = TimerRecord {
            name: name.clone(),
            script: ctx.script().clone(),
            entity,
            times,
            period_ms,
            resume_at,
            started_ms: ctx.now_ms(),
            idle_only: flags.has('i') && entity.is_some(),
        };

        match ctx.runtime.timers.allocate(record) {
            Ok(slot) => {
                tracing::debug!(
                    entity = %ctx.entity_name(),
                    "timer{} slot {}: {} x {}ms",
                    name,
                    slot,
                    times,
                    period_ms
                );
                Outcome::Success
            }
            Err(e) => {
                tracing::error!(entity = %ctx.entity_name(), command = "timer", "{}", e);
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TIMER_UNSET;
    use crate::testing::TestWorld;
    use ember_config::InterpreterConfig;

    fn run_timer(world: &mut TestWorld, source: &str) -> Outcome {
        world.with_context(source, |ctx| {
            let word = ctx.read_command();
            ctx.set_command(&word);
            TimerCommand.execute(ctx)
        })
    }

    #[test]
    fn test_start_and_stop_stopwatch() {
        let mut world = TestWorld::new();
        world.clock.set(4000);

        let outcome = world.with_context("starttimer timer2\n", |ctx| {
            ctx.read_command();
            TimerToggleCommand::new("starttimer", true).execute(ctx)
        });
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(world.state.timer(1), 4000);

        world.with_context("stoptimer timer2\n", |ctx| {
            ctx.read_command();
            TimerToggleCommand::new("stoptimer", false).execute(ctx)
        });
        assert_eq!(world.state.timer(1), TIMER_UNSET);
    }

    #[test]
    fn test_unknown_stopwatch_fails() {
        let mut world = TestWorld::new();
        let outcome = world.with_context("starttimer timer9\n", |ctx| {
            ctx.read_command();
            TimerToggleCommand::new("starttimer", true).execute(ctx)
        });
        assert_eq!(outcome, Outcome::Failed);
        assert!((0..4).all(|slot| world.state.timer(slot) == TIMER_UNSET));
    }

    #[test]
    fn test_schedule_named_timer() {
        let mut world = TestWorld::new();
        assert_eq!(run_timer(&mut world, "timerPatrol -m 3 250 sendevent walk me\n"), Outcome::Success);

        let timers = &world.runtime.timers;
        let slot = timers.find("patrol", Some(world.me.id)).unwrap();
        let record = timers.get(slot).unwrap();
        assert_eq!(record.times, 3);
        assert_eq!(record.period_ms, 250);
        assert_eq!(record.started_ms, 1000);
        assert!(!record.idle_only);
        assert!(record.script.text()[record.resume_at..].starts_with("sendevent walk me"));
    }

    #[test]
    fn test_period_in_seconds_drops_fraction() {
        let mut world = TestWorld::new();
        run_timer(&mut world, "timerblink -i 0 1.5 nop\n");
        let slot = world.runtime.timers.find("blink", Some(world.me.id)).unwrap();
        let record = world.runtime.timers.get(slot).unwrap();
        assert_eq!(record.period_ms, 1000);
        assert_eq!(record.times, 0);
        assert!(record.idle_only);

        run_timer(&mut world, "timerflash -m 1 250.9 nop\n");
        let slot = world.runtime.timers.find("flash", Some(world.me.id)).unwrap();
        assert_eq!(world.runtime.timers.get(slot).unwrap().period_ms, 250);
    }

    #[test]
    fn test_same_name_replaces() {
        let mut world = TestWorld::new();
        run_timer(&mut world, "timerpatrol 1 5 nop\n");
        run_timer(&mut world, "timerpatrol 2 5 nop\n");
        assert_eq!(world.runtime.timers.active_count(), 1);

        let slot = world.runtime.timers.find("patrol", Some(world.me.id)).unwrap();
        assert_eq!(world.runtime.timers.get(slot).unwrap().times, 2);
    }

    #[test]
    fn test_off_and_kill_local() {
        let mut world = TestWorld::new();
        run_timer(&mut world, "timera 1 5 nop\n");
        run_timer(&mut world, "timerb 1 5 nop\n");
        run_timer(&mut world, "timerc 1 5 nop\n");

        run_timer(&mut world, "timera off\n");
        assert_eq!(world.runtime.timers.active_count(), 2);
        assert!(world.runtime.timers.find("a", Some(world.me.id)).is_none());

        run_timer(&mut world, "timer kill_local\n");
        assert_eq!(world.runtime.timers.active_count(), 0);
    }

    #[test]
    fn test_default_names_are_unique() {
        let mut world = TestWorld::new();
        run_timer(&mut world, "timer 1 5 nop\n");
        run_timer(&mut world, "timer 1 5 nop\n");
        assert_eq!(world.runtime.timers.active_count(), 2);
        assert!(world.runtime.timers.find("timer_0", Some(world.me.id)).is_some());
        assert!(world.runtime.timers.find("timer_1", Some(world.me.id)).is_some());
    }

    #[test]
    fn test_missing_command_fails() {
        let mut world = TestWorld::new();
        assert_eq!(run_timer(&mut world, "timerx 1 5\n"), Outcome::Failed);
        assert_eq!(world.runtime.timers.active_count(), 0);
    }

    #[test]
    fn test_pool_exhaustion_fails() {
        let mut world = TestWorld::with_config(InterpreterConfig {
            timer_pool_size: 1,
            ..Default::default()
        });
        assert_eq!(run_timer(&mut world, "timera 1 5 nop\n"), Outcome::Success);
        assert_eq!(run_timer(&mut world, "timerb 1 5 nop\n"), Outcome::Failed);
        assert_eq!(world.runtime.timers.active_count(), 1);
    }
}
