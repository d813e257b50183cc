//! Line-editing backends.
//!
//! The dispatch engine never talks to a terminal directly; each mode owns a
//! [`Backend`] that provides line reading, history, prompt handling, and a
//! completion registry hookup. [`RustylineBackend`] is the interactive
//! implementation; [`ScriptedBackend`] replays canned input for tests and
//! non-interactive drivers.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context as _, Result};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use crate::completion::{Completion, CompletionRegistry};

/// ANSI prompt colors, including the bold variants.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PromptColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BoldBlack,
    BoldRed,
    BoldGreen,
    BoldYellow,
    BoldBlue,
    BoldMagenta,
    BoldCyan,
    BoldWhite,
}

impl PromptColor {
    pub const RESET: &'static str = "\x1b[0m";

    pub fn code(self) -> &'static str {
        match self {
            Self::Black => "\x1b[30m",
            Self::Red => "\x1b[31m",
            Self::Green => "\x1b[32m",
            Self::Yellow => "\x1b[33m",
            Self::Blue => "\x1b[34m",
            Self::Magenta => "\x1b[35m",
            Self::Cyan => "\x1b[36m",
            Self::White => "\x1b[37m",
            Self::BoldBlack => "\x1b[1m\x1b[30m",
            Self::BoldRed => "\x1b[1m\x1b[31m",
            Self::BoldGreen => "\x1b[1m\x1b[32m",
            Self::BoldYellow => "\x1b[1m\x1b[33m",
            Self::BoldBlue => "\x1b[1m\x1b[34m",
            Self::BoldMagenta => "\x1b[1m\x1b[35m",
            Self::BoldCyan => "\x1b[1m\x1b[36m",
            Self::BoldWhite => "\x1b[1m\x1b[37m",
        }
    }

    /// Wraps `text` in this color plus a reset.
    pub fn paint(self, text: &str) -> String {
        format!("{}{}{}", self.code(), text, Self::RESET)
    }
}

/// Construction parameters for a backend, one per mode.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Prompt display string (uncolored).
    pub prompt: String,
    /// Optional prompt color.
    pub color: Option<PromptColor>,
    /// Where to persist history; `None` keeps it in memory only.
    pub history_file: Option<PathBuf>,
    /// Maximum number of retained history entries.
    pub history_size: usize,
    /// Skip consecutive duplicate history entries.
    pub unique_history: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            color: None,
            history_file: None,
            history_size: 1000,
            unique_history: true,
        }
    }
}

/// The capability contract a mode requires from its line editor.
///
/// `read_line`/`read_char` block until input arrives and return `None` on end
/// of input. `reset` is called before every read so an implementation can
/// re-synchronize terminal state after a mode switch.
pub trait Backend {
    fn create(config: BackendConfig) -> Result<Self>
    where
        Self: Sized;

    fn read_line(&mut self) -> Option<String>;

    fn read_char(&mut self) -> Option<char>;

    fn reset(&mut self);

    /// Appends an entry to the in-memory history.
    fn history_enter(&mut self, entry: &str);

    /// Persists the history, if this backend persists anything.
    fn history_save(&mut self) -> Result<()>;

    fn prompt(&self) -> &str;

    fn set_prompt(&mut self, prompt: &str, color: Option<PromptColor>);

    /// The completion registry consulted on the completion keystroke.
    fn completer(&self) -> Rc<RefCell<CompletionRegistry>>;
}

/// Adapts a [`CompletionRegistry`] (and the prompt color) to rustyline's
/// helper traits. Tab completion asks the registry; when no selection
/// callback is installed the raw prefix matches are offered as candidates.
struct ReplHelper {
    completion: Rc<RefCell<CompletionRegistry>>,
    color: Option<PromptColor>,
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let mut registry = self.completion.borrow_mut();
        let candidates = match registry.complete(prefix) {
            Completion::Completed(replacement) => vec![replacement],
            Completion::NoCompletionHandler => registry.matches_for(prefix),
            Completion::NoCompletionFound => Vec::new(),
        };
        let pairs = candidates
            .into_iter()
            .map(|c| Pair {
                display: c.trim_end().to_string(),
                replacement: c,
            })
            .collect();
        // candidates replace the whole line: registered strings are full paths
        Ok((0, pairs))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        match self.color {
            Some(color) => Cow::Owned(color.paint(prompt)),
            None => Cow::Borrowed(prompt),
        }
    }
}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

/// Interactive backend built on [`rustyline`].
pub struct RustylineBackend {
    editor: Editor<ReplHelper, DefaultHistory>,
    completion: Rc<RefCell<CompletionRegistry>>,
    prompt: String,
    history_file: Option<PathBuf>,
}

impl Backend for RustylineBackend {
    fn create(config: BackendConfig) -> Result<Self> {
        let completion = Rc::new(RefCell::new(CompletionRegistry::new()));
        let rl_config = Config::builder()
            .max_history_size(config.history_size)?
            .history_ignore_dups(config.unique_history)?
            .completion_type(CompletionType::List)
            .build();
        let mut editor =
            Editor::with_config(rl_config).context("failed to initialize line editor")?;
        editor.set_helper(Some(ReplHelper {
            completion: completion.clone(),
            color: config.color,
        }));
        if let Some(path) = &config.history_file {
            // a missing history file is fine on first run
            let _ = editor.load_history(path);
        }
        Ok(Self {
            editor,
            completion,
            prompt: config.prompt,
            history_file: config.history_file,
        })
    }

    fn read_line(&mut self) -> Option<String> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => Some(line),
            // ^C cancels the current line but keeps the shell alive
            Err(ReadlineError::Interrupted) => Some(String::new()),
            Err(ReadlineError::Eof) => None,
            Err(err) => {
                log::warn!("read_line failed: {err}");
                None
            }
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let mut buf = [0u8; 1];
        match std::io::stdin().read_exact(&mut buf) {
            Ok(()) => Some(buf[0] as char),
            Err(_) => None,
        }
    }

    fn reset(&mut self) {
        // rustyline re-enters raw mode on each readline call; nothing to do
    }

    fn history_enter(&mut self, entry: &str) {
        if let Err(err) = self.editor.add_history_entry(entry) {
            log::warn!("failed to record history entry: {err}");
        }
    }

    fn history_save(&mut self) -> Result<()> {
        if let Some(path) = &self.history_file {
            self.editor
                .save_history(path)
                .with_context(|| format!("failed to save history to {}", path.display()))?;
        }
        Ok(())
    }

    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn set_prompt(&mut self, prompt: &str, color: Option<PromptColor>) {
        self.prompt = prompt.to_string();
        if let Some(helper) = self.editor.helper_mut() {
            helper.color = color;
        }
    }

    fn completer(&self) -> Rc<RefCell<CompletionRegistry>> {
        self.completion.clone()
    }
}

/// Replays canned input instead of reading a terminal.
///
/// Lines and keystrokes are fed in ahead of time; history entries are captured
/// in memory so tests can assert on them.
pub struct ScriptedBackend {
    lines: VecDeque<String>,
    keys: VecDeque<char>,
    history: Vec<String>,
    saves: usize,
    completion: Rc<RefCell<CompletionRegistry>>,
    prompt: String,
    color: Option<PromptColor>,
    resets: usize,
}

impl ScriptedBackend {
    /// Queues a line for a later `read_line`.
    pub fn feed_line(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
    }

    /// Queues keystrokes for later `read_char` calls.
    pub fn feed_keys(&mut self, keys: &str) {
        self.keys.extend(keys.chars());
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn reset_count(&self) -> usize {
        self.resets
    }

    pub fn color(&self) -> Option<PromptColor> {
        self.color
    }
}

impl Backend for ScriptedBackend {
    fn create(config: BackendConfig) -> Result<Self> {
        Ok(Self {
            lines: VecDeque::new(),
            keys: VecDeque::new(),
            history: Vec::new(),
            saves: 0,
            completion: Rc::new(RefCell::new(CompletionRegistry::new())),
            prompt: config.prompt,
            color: config.color,
            resets: 0,
        })
    }

    fn read_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    fn read_char(&mut self) -> Option<char> {
        self.keys.pop_front()
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn history_enter(&mut self, entry: &str) {
        self.history.push(entry.to_string());
    }

    fn history_save(&mut self) -> Result<()> {
        self.saves += 1;
        Ok(())
    }

    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn set_prompt(&mut self, prompt: &str, color: Option<PromptColor>) {
        self.prompt = prompt.to_string();
        self.color = color;
    }

    fn completer(&self) -> Rc<RefCell<CompletionRegistry>> {
        self.completion.clone()
    }
}
