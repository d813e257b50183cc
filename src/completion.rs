use std::fmt;

/// The outcome of a completion request.
///
/// Completing a prefix either produces replacement text, finds nothing to
/// complete against, or fails because nobody installed a selection callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The callback picked a replacement for the prefix.
    Completed(String),
    /// The registry holds no candidate strings at all.
    NoCompletionFound,
    /// No selection callback has been installed via [`CompletionRegistry::set_callback`].
    NoCompletionHandler,
}

/// Selection callback: receives the prefix and every registered string that
/// starts with it, and returns the text to put back onto the command line.
pub type CompletionCallback = Box<dyn FnMut(&str, &[String]) -> String>;

/// A deduplicated, insertion-ordered set of completion candidates.
///
/// Command registration feeds this automatically: every command added to a
/// tree registers its full path (with a trailing space) here. Callers may also
/// add arbitrary strings, e.g. known file names or variable names.
#[derive(Default)]
pub struct CompletionRegistry {
    entries: Vec<String>,
    callback: Option<CompletionCallback>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate string. Returns `false` if it was already present.
    pub fn add(&mut self, entry: impl Into<String>) -> bool {
        let entry = entry.into();
        if self.entries.iter().any(|e| *e == entry) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Removes a candidate string. Returns `false` if it was not present.
    pub fn remove(&mut self, entry: &str) -> bool {
        match self.entries.iter().position(|e| e == entry) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Replaces the whole candidate set in one go.
    pub fn replace(&mut self, entries: Vec<String>) {
        self.entries = entries;
    }

    /// Installs the match-selection callback used by [`complete`](Self::complete).
    pub fn set_callback(&mut self, f: impl FnMut(&str, &[String]) -> String + 'static) {
        self.callback = Some(Box::new(f));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Collects every entry starting with `prefix` (byte-wise comparison).
    pub fn matches_for(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.as_bytes().starts_with(prefix.as_bytes()))
            .cloned()
            .collect()
    }

    /// Completes `prefix` by handing the matching entries to the callback.
    ///
    /// The callback runs even when the match list is empty; it decides what an
    /// unmatched prefix completes to (usually the prefix itself).
    pub fn complete(&mut self, prefix: &str) -> Completion {
        if self.callback.is_none() {
            return Completion::NoCompletionHandler;
        }
        if self.entries.is_empty() {
            return Completion::NoCompletionFound;
        }
        let matches = self.matches_for(prefix);
        match self.callback.as_mut() {
            Some(callback) => Completion::Completed(callback(prefix, &matches)),
            None => Completion::NoCompletionHandler,
        }
    }
}

impl fmt::Debug for CompletionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRegistry")
            .field("entries", &self.entries)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
