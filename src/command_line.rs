use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use log::debug;

use crate::backend::{Backend, BackendConfig, PromptColor};
use crate::command::CommandResult;
use crate::mode::Mode;
use crate::preprocessor::{Preprocessor, Rewritten};

/// Shared handle to a registered mode.
pub type ModeRef<B> = Rc<RefCell<Mode<B>>>;

/// A mode-based command line dispatcher.
///
/// The dispatcher owns a registry of named [`Mode`]s and a stack of active
/// ones; input lines go through the preprocessor pipeline and are then
/// dispatched against the top-of-stack mode's command tree. Pushing and
/// popping modes is the only state transition: an empty stack means "no
/// active mode" and every `process` call fails until one is pushed.
///
/// One logical thread drives one `CommandLine`; nothing here is `Sync`, and
/// command registration is expected to happen before the read/dispatch loop
/// starts.
pub struct CommandLine<B: Backend> {
    modes: HashMap<String, ModeRef<B>>,
    stack: Vec<ModeRef<B>>,
    preprocessors: Vec<Box<dyn Preprocessor>>,
    last_error: String,
}

impl<B: Backend> Default for CommandLine<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> CommandLine<B> {
    pub fn new() -> Self {
        Self {
            modes: HashMap::new(),
            stack: Vec::new(),
            preprocessors: Vec::new(),
            last_error: String::new(),
        }
    }

    /// Creates and registers a new mode.
    ///
    /// Returns `Ok(None)` if a mode named `name` already exists; the existing
    /// mode is left untouched. Backend construction failures (a terminal that
    /// cannot be initialized, say) surface as errors.
    pub fn mode_add(
        &mut self,
        name: &str,
        prompt: &str,
        color: Option<PromptColor>,
        history_file: Option<PathBuf>,
    ) -> Result<Option<ModeRef<B>>> {
        if self.modes.contains_key(name) {
            return Ok(None);
        }
        let config = BackendConfig {
            prompt: prompt.to_string(),
            color,
            history_file,
            ..BackendConfig::default()
        };
        let mode = Rc::new(RefCell::new(Mode::new(name, config)?));
        self.modes.insert(name.to_string(), mode.clone());
        debug!("registered mode '{name}'");
        Ok(Some(mode))
    }

    /// Removes a registered mode. Refuses (returns `false`) while the mode is
    /// anywhere on the stack.
    pub fn mode_rm(&mut self, name: &str) -> bool {
        let Some(mode) = self.modes.get(name) else {
            return false;
        };
        if self.stack.iter().any(|m| Rc::ptr_eq(m, mode)) {
            return false;
        }
        self.modes.remove(name);
        debug!("removed mode '{name}'");
        true
    }

    /// Activates a mode by pushing it onto the stack. `false` if unknown.
    pub fn mode_push(&mut self, name: &str) -> bool {
        match self.modes.get(name) {
            Some(mode) => {
                self.stack.push(mode.clone());
                debug!("pushed mode '{name}'");
                true
            }
            None => false,
        }
    }

    /// Deactivates the current mode. `false` if the stack is empty.
    pub fn mode_pop(&mut self) -> bool {
        match self.stack.pop() {
            Some(mode) => {
                debug!("popped mode '{}'", mode.borrow().name());
                true
            }
            None => false,
        }
    }

    pub fn has_mode(&self) -> bool {
        !self.stack.is_empty()
    }

    /// The currently active mode, if any.
    pub fn current_mode(&self) -> Option<ModeRef<B>> {
        self.stack.last().cloned()
    }

    /// Appends a pipeline stage; stages run in the order they were added.
    pub fn add_preprocessor(&mut self, stage: impl Preprocessor + 'static) {
        self.preprocessors.push(Box::new(stage));
    }

    /// Routes one input line: preprocessors first, then the active mode's
    /// command tree.
    ///
    /// An empty line is a no-op before anything else runs. A stage error
    /// aborts the pipeline and becomes [`last_error`](Self::last_error); a
    /// stage consuming the line short-circuits to `Executed` without
    /// dispatch.
    pub fn process(&mut self, line: &str) -> CommandResult {
        if line.is_empty() {
            return CommandResult::Nop;
        }
        let Some(active) = self.stack.last().cloned() else {
            let msg = "cannot process input: mode stack is empty".to_string();
            self.last_error = msg.clone();
            return CommandResult::NoCommand(msg);
        };
        self.last_error.clear();
        let mut input = line.to_string();
        for stage in &mut self.preprocessors {
            match stage.rewrite(&input) {
                Err(err) => {
                    let msg = err.to_string();
                    debug!("preprocessor rejected line: {msg}");
                    self.last_error = msg.clone();
                    return CommandResult::NoCommand(msg);
                }
                Ok(Rewritten::Consumed) => return CommandResult::Executed,
                Ok(Rewritten::Line(next)) if next.is_empty() => {
                    return CommandResult::Executed;
                }
                Ok(Rewritten::Line(next)) => input = next,
            }
        }
        let result = active.borrow_mut().execute(&input);
        if let CommandResult::NoCommand(msg) = &result {
            self.last_error = msg.clone();
        }
        result
    }

    /// Reads one line from the active backend, trimmed of surrounding
    /// whitespace. `None` on end of input or when no mode is active.
    pub fn read_line(&mut self) -> Option<String> {
        let mode = self.stack.last()?.clone();
        let mut mode = mode.borrow_mut();
        let backend = mode.backend_mut();
        // re-sync terminal state in case the active mode just changed
        backend.reset();
        let line = backend.read_line()?;
        Some(line.trim().to_string())
    }

    /// Reads a single character from the active backend.
    pub fn read_char(&mut self) -> Option<char> {
        let mode = self.stack.last()?.clone();
        let c = mode.borrow_mut().backend_mut().read_char();
        c
    }

    /// Appends `entry` to the active mode's history and persists it.
    /// `false` when no mode is active.
    pub fn append_to_history(&mut self, entry: &str) -> bool {
        let Some(mode) = self.stack.last() else {
            return false;
        };
        let mut mode = mode.borrow_mut();
        let backend = mode.backend_mut();
        backend.history_enter(entry);
        if let Err(err) = backend.history_save() {
            log::warn!("{err:#}");
        }
        true
    }

    /// The message of the most recent failed `process` call.
    pub fn last_error(&self) -> &str {
        &self.last_error
    }
}
