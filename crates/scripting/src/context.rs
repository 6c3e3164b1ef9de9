//! Script execution context
//!
//! A [`Context`] is the cursor of one event run: it reads words from the
//! script text, resolves operands against the variable tables, and moves
//! the cursor for skips and jumps. Commands receive it mutably and leave it
//! at a statement boundary.

use crate::error::{Result, ScriptError};
use crate::events::current_event_sender;
use crate::scheduler::TimerPool;
use crate::script::{is_separator, Script};
use crate::state::ScriptState;
use crate::value::{parse_number, Value, ValueType};
use crate::variables::{resolve, SystemValue, VariableTable};
use ember_config::InterpreterConfig;
use ember_core::{Entity, EntityId, EntityRegistry, EventSink, GameClock, ZoneService};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Engine collaborators borrowed for one run
pub struct Services<'a> {
    pub entities: &'a dyn EntityRegistry,
    pub zones: &'a dyn ZoneService,
    pub events: &'a mut dyn EventSink,
    pub clock: &'a dyn GameClock,
}

impl<'a> Services<'a> {
    pub fn new(
        entities: &'a dyn EntityRegistry,
        zones: &'a dyn ZoneService,
        events: &'a mut dyn EventSink,
        clock: &'a dyn GameClock,
    ) -> Self {
        Self {
            entities,
            zones,
            events,
            clock,
        }
    }

    /// Shorter-lived copy for a nested run
    pub fn reborrow(&mut self) -> Services<'_> {
        Services {
            entities: self.entities,
            zones: self.zones,
            events: &mut *self.events,
            clock: self.clock,
        }
    }
}

/// Interpreter state shared by every script
#[derive(Debug)]
pub struct Runtime {
    /// Global variables (`#`, `&`, `$`)
    pub globals: VariableTable,

    /// Deferred re-invocation timers
    pub timers: TimerPool,

    rng: StdRng,
    max_call_depth: usize,
}

impl Runtime {
    pub fn new(config: &InterpreterConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            globals: VariableTable::with_capacity(config.max_global_variables),
            timers: TimerPool::with_capacity(config.timer_pool_size),
            rng,
            max_call_depth: config.max_call_depth,
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Restart the random sequence
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }
}

/// Flag letters given as a leading `-xyz` word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags(u32);

impl Flags {
    fn bit(letter: char) -> u32 {
        match letter.to_ascii_lowercase() {
            c @ 'a'..='z' => 1 << (c as u32 - 'a' as u32),
            _ => 0,
        }
    }

    pub fn has(self, letter: char) -> bool {
        self.0 & Self::bit(letter) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Byte range of a word, and where the cursor goes after it
struct Token {
    /// First byte, opening quote included
    begin: usize,
    start: usize,
    end: usize,
    next: usize,
}

/// Execution cursor for one event run
pub struct Context<'a> {
    script: Arc<Script>,
    pos: usize,

    /// Return addresses pushed by `gosub`
    stack: Vec<usize>,

    entity: Option<EntityId>,

    /// Command word being executed, as written
    command: String,

    /// Event parameters, split on whitespace
    params: Vec<String>,

    pub state: &'a mut ScriptState,

    /// State of the master instance, when this one is a duplicate
    master: Option<&'a mut ScriptState>,

    pub runtime: &'a mut Runtime,
    pub services: Services<'a>,
}

impl<'a> Context<'a> {
    pub fn new(
        script: Arc<Script>,
        pos: usize,
        state: &'a mut ScriptState,
        runtime: &'a mut Runtime,
        services: Services<'a>,
    ) -> Self {
        Self {
            script,
            pos,
            stack: Vec::new(),
            entity: None,
            command: String::new(),
            params: Vec::new(),
            state,
            master: None,
            runtime,
            services,
        }
    }

    /// Bind the run to its owning entity
    pub fn with_entity(mut self, entity: Option<EntityId>) -> Self {
        self.entity = entity;
        self
    }

    /// Share stopwatches and the event mask with a master instance
    pub fn with_master(mut self, master: Option<&'a mut ScriptState>) -> Self {
        self.master = master;
        self
    }

    /// Attach the parameter text of the event being handled
    pub fn with_params(mut self, params: &str) -> Self {
        self.params = params.split_whitespace().map(str::to_string).collect();
        self
    }

    /// State holding the stopwatches and the disabled-event mask
    ///
    /// This is the master's state for a duplicated instance, otherwise the
    /// instance's own.
    pub fn master_state(&self) -> &ScriptState {
        match &self.master {
            Some(master) => &**master,
            None => &*self.state,
        }
    }

    pub fn master_state_mut(&mut self) -> &mut ScriptState {
        match &mut self.master {
            Some(master) => &mut **master,
            None => &mut *self.state,
        }
    }

    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.script.len());
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        self.entity
    }

    /// The owning entity, if it is still alive
    pub fn entity(&self) -> Option<Arc<Entity>> {
        self.entity.and_then(|id| self.services.entities.get(id))
    }

    /// Name used in diagnostics
    pub fn entity_name(&self) -> String {
        self.entity()
            .map(|e| e.name.clone())
            .unwrap_or_else(|| "none".to_string())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub(crate) fn set_command(&mut self, command: &str) {
        self.command.clear();
        self.command.push_str(command);
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn call_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn now_ms(&self) -> u64 {
        self.services.clock.now_ms()
    }

    fn bytes(&self) -> &[u8] {
        self.script.text().as_bytes()
    }

    fn at_comment(&self, pos: usize) -> bool {
        self.bytes()[pos..].starts_with(b"//")
    }

    /// Next word on the current line, without moving the cursor
    fn peek_token(&self) -> Option<Token> {
        let bytes = self.bytes();
        let mut pos = self.pos;
        while pos < bytes.len() && is_separator(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] == b'\n' || self.at_comment(pos) {
            return None;
        }

        if bytes[pos] == b'"' {
            let start = pos + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end] != b'"' && bytes[end] != b'\n' {
                end += 1;
            }
            let next = if end < bytes.len() && bytes[end] == b'"' {
                end + 1
            } else {
                end
            };
            return Some(Token {
                begin: pos,
                start,
                end,
                next,
            });
        }

        let start = pos;
        while pos < bytes.len() && bytes[pos] != b'\n' && !is_separator(bytes[pos]) {
            pos += 1;
        }
        Some(Token {
            begin: start,
            start,
            end: pos,
            next: pos,
        })
    }

    /// Whether nothing but blanks or a comment is left on this line
    pub fn at_line_end(&self) -> bool {
        self.peek_token().is_none()
    }

    /// Read the next word of the current statement
    ///
    /// Returns an empty string at the end of the line. Quoted words may
    /// contain separators, and `~name~` is replaced by the variable's text.
    pub fn read_word(&mut self) -> String {
        match self.peek_token() {
            Some(token) => {
                self.pos = token.next;
                let raw = self.script.text()[token.start..token.end].to_string();
                self.expand(&raw)
            }
            None => String::new(),
        }
    }

    /// Read the next command word, crossing line ends and comments
    ///
    /// Braces are returned as words of their own. The result is lowercased
    /// and never expanded. Empty at the end of the script.
    pub fn read_command(&mut self) -> String {
        let len = self.script.len();
        loop {
            while self.pos < len {
                let b = self.bytes()[self.pos];
                if b == b'\n' || is_separator(b) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            if self.pos < len && self.at_comment(self.pos) {
                self.skip_to_line_end();
            } else {
                break;
            }
        }
        if self.pos >= len {
            return String::new();
        }

        let bytes = self.bytes();
        let start = self.pos;
        let mut end = start;
        if bytes[end] == b'{' || bytes[end] == b'}' {
            end += 1;
        } else {
            while end < len
                && bytes[end] != b'\n'
                && bytes[end] != b'{'
                && bytes[end] != b'}'
                && !is_separator(bytes[end])
            {
                end += 1;
            }
        }
        self.pos = end;
        self.script.text()[start..end].to_lowercase()
    }

    /// Read a word and resolve it as a number
    pub fn read_float(&mut self) -> f32 {
        let word = self.read_word();
        self.get_float_var(&word)
    }

    /// Read a word as a switch (`on`, `yes`, `true`, `1`)
    pub fn read_bool(&mut self) -> bool {
        matches!(
            self.read_word().to_lowercase().as_str(),
            "on" | "yes" | "true" | "1"
        )
    }

    /// Consume a leading `-xyz` word if present
    ///
    /// Letters outside `allowed` are reported and ignored. A word like `-5`
    /// is a negative number, not flags, and is left alone.
    pub fn read_flags(&mut self, allowed: &str) -> Flags {
        let Some(token) = self.peek_token() else {
            return Flags::default();
        };
        let word = &self.script.text()[token.start..token.end];
        let letters = match word.strip_prefix('-') {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_alphabetic()) => rest.to_string(),
            _ => return Flags::default(),
        };
        self.pos = token.next;

        let mut flags = Flags::default();
        for letter in letters.chars() {
            if allowed.contains(letter.to_ascii_lowercase()) {
                flags.0 |= Flags::bit(letter);
            } else {
                tracing::warn!(
                    entity = %self.entity_name(),
                    command = %self.command,
                    "unexpected flag '{}'",
                    letter
                );
            }
        }
        flags
    }

    /// Resolve an operand to a value
    pub fn resolve(&self, token: &str, hint: ValueType) -> Value {
        resolve(
            token,
            hint,
            &self.runtime.globals,
            &self.state.locals,
            |name| self.system_variable(name),
        )
    }

    /// Text value of an operand; literals are kept verbatim
    pub fn get_string_var(&self, token: &str) -> String {
        self.resolve(token, ValueType::Text).into_text()
    }

    /// Numeric value of an operand; literals are parsed
    pub fn get_float_var(&self, token: &str) -> f32 {
        self.resolve(token, ValueType::Number).as_number()
    }

    /// Value of an engine pseudo-variable (`^name`)
    pub fn system_variable(&self, name: &str) -> SystemValue {
        let lower = name.to_lowercase();

        match lower.as_str() {
            "^me" => return SystemValue::Text(self.entity_name()),
            "^sender" => {
                let sender = current_event_sender()
                    .and_then(|id| self.services.entities.get(id))
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| "none".to_string());
                return SystemValue::Text(sender);
            }
            "^gametime" => return SystemValue::Integer(self.now_ms() as i64),
            _ => {}
        }

        if let Some(timer) = lower.strip_prefix("^#") {
            if let Some(slot) = ScriptState::timer_slot(timer) {
                let elapsed = self.master_state().timer_elapsed(slot, self.now_ms());
                return SystemValue::Integer(elapsed as i64);
            }
        }

        if let Some(index) = lower.strip_prefix("^$param") {
            if let Some(param) = self.param(index) {
                return SystemValue::Text(param.to_string());
            }
        }

        if let Some(index) = lower.strip_prefix("^&param") {
            if let Some(param) = self.param(index) {
                return SystemValue::Float(parse_number(param));
            }
        }

        tracing::warn!(entity = %self.entity_name(), "unknown system variable {}", name);
        SystemValue::Text(String::new())
    }

    /// Event parameter by 1-based index text; missing parameters are empty
    fn param(&self, index: &str) -> Option<&str> {
        let index: usize = index.parse().ok().filter(|&i| i > 0)?;
        Some(self.params.get(index - 1).map_or("", String::as_str))
    }

    fn expand(&self, word: &str) -> String {
        if !word.contains('~') {
            return word.to_string();
        }

        let mut out = String::with_capacity(word.len());
        let mut rest = word;
        while let Some(open) = rest.find('~') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('~') {
                Some(close) => {
                    out.push_str(&self.get_string_var(&after[..close]));
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn skip_to_line_end(&mut self) {
        let bytes = self.bytes();
        let mut pos = self.pos;
        while pos < bytes.len() && bytes[pos] != b'\n' {
            pos += 1;
        }
        self.pos = pos;
    }

    /// Skip the rest of the current line
    ///
    /// Returns where the skipped text starts, or `None` if only blanks or a
    /// comment were left. The cursor ends at the line break.
    pub fn skip_command(&mut self) -> Option<usize> {
        let start = self.peek_token().map(|t| t.begin);
        self.skip_to_line_end();
        start
    }

    /// Skip past the `}` closing the block the cursor is in
    fn skip_block(&mut self) {
        let len = self.script.len();
        let mut depth = 1;
        while self.pos < len && depth > 0 {
            let b = self.bytes()[self.pos];
            if self.at_comment(self.pos) {
                self.skip_to_line_end();
                continue;
            }
            match b {
                b'"' => {
                    self.pos += 1;
                    while self.pos < len
                        && self.bytes()[self.pos] != b'"'
                        && self.bytes()[self.pos] != b'\n'
                    {
                        self.pos += 1;
                    }
                }
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
        self.pos = self.pos.min(len);
    }

    /// Skip one whole statement
    ///
    /// A statement is a block, a single command line, or an `if` together
    /// with its guarded statement and any `else` branch. Returns the new
    /// cursor position.
    pub fn skip_statement(&mut self) -> usize {
        let save = self.pos;
        match self.read_command().as_str() {
            "" => {}
            // Nothing left to skip in this block
            "}" => self.pos = save,
            "{" => self.skip_block(),
            "if" => {
                for _ in 0..3 {
                    if let Some(token) = self.peek_token() {
                        self.pos = token.next;
                    }
                }
                self.skip_statement();
                if self.consume_else() {
                    self.skip_statement();
                }
            }
            _ => {
                self.skip_command();
            }
        }
        self.pos
    }

    /// Skip the statement guarded by a failed condition
    ///
    /// An `else` directly after it is consumed so that its branch runs
    /// next.
    pub fn skip_guarded(&mut self) -> usize {
        self.skip_statement();
        self.consume_else();
        self.pos
    }

    fn consume_else(&mut self) -> bool {
        let save = self.pos;
        if self.read_command() == "else" {
            true
        } else {
            self.pos = save;
            false
        }
    }

    /// Move the cursor to `>>label`
    ///
    /// For a subroutine call the current position is pushed first so that
    /// [`Context::return_to_caller`] can resume there.
    pub fn jump_to_label(&mut self, label: &str, call: bool) -> Result<()> {
        let target = self
            .script
            .find_label(label)
            .ok_or_else(|| ScriptError::UnknownLabel(label.to_string()))?;

        if call {
            let max = self.runtime.max_call_depth();
            if self.stack.len() >= max {
                return Err(ScriptError::StackOverflow { depth: max });
            }
            self.stack.push(self.pos);
        }

        self.pos = target;
        Ok(())
    }

    /// Pop the last `gosub` return address
    pub fn return_to_caller(&mut self) -> Result<()> {
        self.pos = self.stack.pop().ok_or(ScriptError::EmptyCallStack)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;

    fn run<T>(source: &str, f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        let mut world = TestWorld::new();
        world.with_context(source, f)
    }

    #[test]
    fn test_read_word_stays_on_line() {
        run("goto  somewhere(x, y)\nnext", |ctx| {
            assert_eq!(ctx.read_word(), "goto");
            assert_eq!(ctx.read_word(), "somewhere");
            assert_eq!(ctx.read_word(), "x");
            assert_eq!(ctx.read_word(), "y");
            assert_eq!(ctx.read_word(), "");
            assert_eq!(ctx.read_word(), "");
            assert_eq!(ctx.read_command(), "next");
        });
    }

    #[test]
    fn test_quoted_words_and_comments() {
        run("say \"hello there\" // greeting\n", |ctx| {
            assert_eq!(ctx.read_word(), "say");
            assert_eq!(ctx.read_word(), "hello there");
            assert!(ctx.at_line_end());
            assert_eq!(ctx.read_word(), "");
        });
    }

    #[test]
    fn test_read_command_crosses_lines() {
        run("  // header\n\n  ON Init {accept}\n", |ctx| {
            assert_eq!(ctx.read_command(), "on");
            assert_eq!(ctx.read_command(), "init");
            assert_eq!(ctx.read_command(), "{");
            assert_eq!(ctx.read_command(), "accept");
            assert_eq!(ctx.read_command(), "}");
            assert_eq!(ctx.read_command(), "");
        });
    }

    #[test]
    fn test_tilde_expansion() {
        run("say hi_~$name~_~#n~ ~open\n", |ctx| {
            ctx.runtime
                .globals
                .assign("$name", &Value::Text("alia".into()))
                .unwrap();
            ctx.runtime.globals.assign("#n", &Value::Number(3.0)).unwrap();
            ctx.read_word();
            assert_eq!(ctx.read_word(), "hi_alia_3");
            assert_eq!(ctx.read_word(), "~open");
        });
    }

    #[test]
    fn test_flags() {
        run("sendevent -gR enemies\n", |ctx| {
            ctx.read_word();
            let flags = ctx.read_flags("gfinrz");
            assert!(flags.has('g'));
            assert!(flags.has('r'));
            assert!(!flags.has('z'));
            assert_eq!(ctx.read_word(), "enemies");
        });

        run("timer -5 1\n", |ctx| {
            ctx.read_word();
            assert!(ctx.read_flags("mi").is_empty());
            assert_eq!(ctx.read_float(), -5.0);
        });

        run("timer -xm 1\n", |ctx| {
            ctx.read_word();
            let flags = ctx.read_flags("mi");
            assert!(flags.has('m'));
            assert!(!flags.has('x'));
        });
    }

    #[test]
    fn test_read_bool_and_float() {
        run("x on OFF yes 1 2.5 #missing\n", |ctx| {
            ctx.read_word();
            assert!(ctx.read_bool());
            assert!(!ctx.read_bool());
            assert!(ctx.read_bool());
            assert!(ctx.read_bool());
            assert_eq!(ctx.read_float(), 2.5);
            assert_eq!(ctx.read_float(), 0.0);
        });
    }

    #[test]
    fn test_skip_command_reports_remaining_text() {
        run("timer 1 1 accept now\nnext\n", |ctx| {
            for _ in 0..3 {
                ctx.read_word();
            }
            let start = ctx.skip_command().unwrap();
            assert!(ctx.script().text()[start..].starts_with("accept now"));
            assert_eq!(ctx.read_command(), "next");
        });

        run("timer 1 1 // nothing\nnext\n", |ctx| {
            for _ in 0..3 {
                ctx.read_word();
            }
            assert_eq!(ctx.skip_command(), None);
            assert_eq!(ctx.read_command(), "next");
        });
    }

    #[test]
    fn test_skip_statement_block() {
        run(" {\n  a { b }\n  \"}\" // }\n}\nafter\n", |ctx| {
            ctx.skip_statement();
            assert_eq!(ctx.read_command(), "after");
        });
    }

    #[test]
    fn test_skip_guarded_lands_on_else_branch() {
        run(" accept\nelse refuse\n", |ctx| {
            ctx.skip_guarded();
            assert_eq!(ctx.read_command(), "refuse");
        });

        run(" accept\nnop\n", |ctx| {
            ctx.skip_guarded();
            assert_eq!(ctx.read_command(), "nop");
        });
    }

    #[test]
    fn test_skip_statement_takes_nested_if_with_else() {
        run(" if a == b x\n else y\nz\n", |ctx| {
            ctx.skip_statement();
            assert_eq!(ctx.read_command(), "z");
        });
    }

    #[test]
    fn test_jump_and_return() {
        run("gosub sub\nafter\n>>SUB\nreturn\n", |ctx| {
            ctx.read_command();
            ctx.read_word();
            ctx.jump_to_label("sub", true).unwrap();
            assert_eq!(ctx.call_depth(), 1);
            assert_eq!(ctx.read_command(), "return");
            ctx.return_to_caller().unwrap();
            assert_eq!(ctx.read_command(), "after");
            assert!(matches!(
                ctx.return_to_caller(),
                Err(ScriptError::EmptyCallStack)
            ));
            assert!(matches!(
                ctx.jump_to_label("nowhere", false),
                Err(ScriptError::UnknownLabel(_))
            ));
        });
    }

    #[test]
    fn test_call_depth_limit() {
        let mut world = TestWorld::with_config(InterpreterConfig {
            max_call_depth: 2,
            ..Default::default()
        });
        world.with_context(">>loop\n", |ctx| {
            ctx.jump_to_label("loop", true).unwrap();
            ctx.jump_to_label("loop", true).unwrap();
            assert!(matches!(
                ctx.jump_to_label("loop", true),
                Err(ScriptError::StackOverflow { depth: 2 })
            ));
        });
    }

    #[test]
    fn test_system_variables() {
        let mut world = TestWorld::new();
        world.clock.set(2500);
        world.with_context("", |ctx| {
            assert_eq!(ctx.get_string_var("^me"), "guard");
            assert_eq!(ctx.get_string_var("^sender"), "none");
            assert_eq!(ctx.get_float_var("^gametime"), 2500.0);

            ctx.state.start_timer(0, 1000);
            assert_eq!(ctx.get_float_var("^#timer1"), 1500.0);
            assert_eq!(ctx.get_float_var("^#timer2"), 0.0);
            assert_eq!(ctx.get_string_var("^nonsense"), "");
        });
    }

    #[test]
    fn test_param_variables() {
        let mut world = TestWorld::new();
        world.with_context("", |ctx| {
            ctx.params = vec!["dmg".into(), "12.5".into()];
            assert_eq!(ctx.get_string_var("^$param1"), "dmg");
            assert_eq!(ctx.get_float_var("^&param2"), 12.5);
            assert_eq!(ctx.get_string_var("^$param3"), "");
        });
    }
}
