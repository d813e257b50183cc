//! Variable substitution for input lines.
//!
//! [`VarEngine`] is a concrete [`Preprocessor`]: it expands `$name` and
//! `${name}` references against a persistent variable table and recognizes
//! whole-line `name=value` assignments, which it consumes instead of letting
//! them reach command dispatch.

use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::preprocessor::{Preprocessor, Rewritten};

/// Scanner state while walking an input line left to right.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    /// Copying input to output verbatim.
    Traverse,
    /// Just consumed a `$`.
    AfterDollar,
    /// Accumulating the name of a `$name` reference.
    BareName,
    /// Accumulating the name of a `${name}` reference.
    BracedName,
}

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// A preprocessor expanding shell-style variable references.
///
/// The variable table lives as long as the engine; it is mutated by
/// assignment lines and by [`set`](Self::set)/[`unset`](Self::unset), never
/// reset between lines. Unknown variables expand to the empty string.
#[derive(Debug, Clone, Default)]
pub struct VarEngine {
    vars: HashMap<String, String>,
}

impl VarEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with a pre-populated variable table.
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Sets a variable, overwriting any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Removes a variable. Unknown names are ignored.
    pub fn unset(&mut self, name: &str) {
        self.vars.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Expands all variable references in `input`.
    ///
    /// An assignment line (`name=rest`, where `=` is the first non-name
    /// character from position 0) binds `name` to the recursively expanded
    /// `rest` and yields an empty string. Syntax errors abort the parse and
    /// discard any partial output.
    pub fn expand(&mut self, input: &str) -> Result<String> {
        self.parse(input, false)
    }

    fn lookup(&self, name: &str) -> &str {
        self.vars.get(name).map(String::as_str).unwrap_or("")
    }

    /// The scanning parser. `sub_parse` is true while expanding the value
    /// side of an assignment, where assignment detection is disabled.
    ///
    /// All state boundaries fall on ASCII characters, so byte positions are
    /// always valid slice indices even for multi-byte input.
    fn parse(&mut self, input: &str, sub_parse: bool) -> Result<String> {
        let bytes = input.as_bytes();
        let mut out = String::new();
        let mut state = State::Traverse;
        // start of the slice still owed to the output (or of the name being read)
        let mut pos = 0usize;
        let mut prev = b' ';
        let mut i = 0usize;
        while i < bytes.len() {
            let c = bytes[i];
            match state {
                State::Traverse => {
                    if c == b'='
                        && !sub_parse
                        && pos == 0
                        && i > 0
                        && bytes[..i].iter().copied().all(is_name_char)
                    {
                        // assignment line: name up to '=', value is everything
                        // after it, expanded in a nested parse
                        let value = self.parse(&input[i + 1..], true)?;
                        self.vars.insert(input[..i].to_string(), value);
                        return Ok(String::new());
                    }
                    if c == b'$' && prev != b'\\' {
                        out.push_str(&input[pos..i]);
                        state = State::AfterDollar;
                        prev = c;
                        i += 1;
                        pos = i;
                    } else {
                        prev = c;
                        i += 1;
                    }
                }
                State::AfterDollar => {
                    if c == b'{' {
                        state = State::BracedName;
                        prev = c;
                        i += 1;
                        pos = i;
                    } else if is_name_char(c) {
                        state = State::BareName;
                        pos = i;
                        prev = c;
                        i += 1;
                    } else if c == b'$' {
                        bail!("syntax error at position {i}: $$ is not a valid expression");
                    } else {
                        bail!(
                            "syntax error at position {i}: unexpected character '{}' after $",
                            c as char
                        );
                    }
                }
                State::BareName => {
                    if is_name_char(c) {
                        prev = c;
                        i += 1;
                    } else {
                        out.push_str(self.lookup(&input[pos..i]));
                        state = State::Traverse;
                        pos = i;
                        // the terminating character is reprocessed in Traverse
                    }
                }
                State::BracedName => {
                    if c == b'}' {
                        out.push_str(self.lookup(&input[pos..i]));
                        state = State::Traverse;
                        prev = c;
                        i += 1;
                        pos = i;
                    } else if is_name_char(c) {
                        prev = c;
                        i += 1;
                    } else {
                        bail!(
                            "syntax error at position {i}: '{}' is an invalid character inside ${{...}}",
                            c as char
                        );
                    }
                }
            }
        }
        match state {
            State::Traverse => {
                out.push_str(&input[pos..]);
                Ok(out)
            }
            State::BareName => {
                out.push_str(self.lookup(&input[pos..]));
                Ok(out)
            }
            State::AfterDollar => {
                bail!("syntax error at position {i}: $ at end of line")
            }
            State::BracedName => {
                bail!("syntax error: missing '}}' at end of line")
            }
        }
    }
}

impl Preprocessor for VarEngine {
    fn rewrite(&mut self, line: &str) -> Result<Rewritten> {
        let out = self.expand(line)?;
        if out.is_empty() {
            Ok(Rewritten::Consumed)
        } else {
            Ok(Rewritten::Line(out))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> VarEngine {
        let mut e = VarEngine::new();
        e.set("x", "1");
        e.set("name", "world");
        e
    }

    #[test]
    fn test_plain_text_passes_through() {
        let mut e = engine();
        assert_eq!(e.expand("echo hello").unwrap(), "echo hello");
    }

    #[test]
    fn test_bare_reference() {
        let mut e = engine();
        assert_eq!(e.expand("$x").unwrap(), "1");
        assert_eq!(e.expand("say $name today").unwrap(), "say world today");
    }

    #[test]
    fn test_braced_reference_glues_to_following_text() {
        let mut e = engine();
        assert_eq!(e.expand("${x}5").unwrap(), "15");
    }

    #[test]
    fn test_unknown_variable_expands_to_empty() {
        let mut e = engine();
        assert_eq!(e.expand("<$missing>").unwrap(), "<>");
    }

    #[test]
    fn test_bare_name_terminated_by_non_name_char() {
        let mut e = engine();
        assert_eq!(e.expand("$x/$x").unwrap(), "1/1");
        assert_eq!(e.expand("$x$name").unwrap(), "1world");
    }

    #[test]
    fn test_escaped_dollar_is_not_expanded() {
        let mut e = engine();
        // escaping suppresses substitution; the backslash itself stays
        assert_eq!(e.expand("\\$x").unwrap(), "\\$x");
        assert_eq!(e.expand("a \\$x b").unwrap(), "a \\$x b");
    }

    #[test]
    fn test_assignment_binds_and_consumes_line() {
        let mut e = engine();
        assert_eq!(e.expand("a=$x").unwrap(), "");
        assert_eq!(e.get("a"), Some("1"));
    }

    #[test]
    fn test_assignment_value_may_be_plain_text() {
        let mut e = VarEngine::new();
        assert_eq!(e.expand("greeting=hello world").unwrap(), "");
        assert_eq!(e.get("greeting"), Some("hello world"));
    }

    #[test]
    fn test_reassignment_overwrites() {
        let mut e = VarEngine::new();
        e.expand("a=1").unwrap();
        e.expand("a=2").unwrap();
        assert_eq!(e.get("a"), Some("2"));
    }

    #[test]
    fn test_assignment_requires_name_at_line_start() {
        // with a leading space the '=' is no longer the first non-name
        // character from position 0, so the line is not an assignment
        let mut e = VarEngine::new();
        assert_eq!(e.expand(" a=1").unwrap(), " a=1");
        assert_eq!(e.get("a"), None);
    }

    #[test]
    fn test_equals_after_substitution_is_literal() {
        let mut e = engine();
        assert_eq!(e.expand("$x=2").unwrap(), "1=2");
        assert_eq!(e.get("1"), None);
    }

    #[test]
    fn test_nested_assignment_does_not_reassign() {
        let mut e = engine();
        // 'b=c=1' binds b to the expansion of "c=1", not c
        assert_eq!(e.expand("b=c=1").unwrap(), "");
        assert_eq!(e.get("b"), Some("c=1"));
        assert_eq!(e.get("c"), None);
    }

    #[test]
    fn test_set_and_unset() {
        let mut e = VarEngine::new();
        e.set("k", "v");
        assert_eq!(e.expand("$k").unwrap(), "v");
        e.unset("k");
        assert_eq!(e.expand("-$k-").unwrap(), "--");
    }

    #[test]
    fn test_with_vars_prepopulates_table() {
        let mut vars = HashMap::new();
        vars.insert("host".to_string(), "localhost".to_string());
        let mut e = VarEngine::with_vars(vars);
        assert_eq!(e.expand("ping $host").unwrap(), "ping localhost");
    }

    #[test]
    fn test_trailing_dollar_is_an_error() {
        let mut e = engine();
        let err = e.expand("$").unwrap_err().to_string();
        assert_eq!(err, "syntax error at position 1: $ at end of line");
        let err = e.expand("ab$").unwrap_err().to_string();
        assert_eq!(err, "syntax error at position 3: $ at end of line");
    }

    #[test]
    fn test_double_dollar_is_an_error() {
        let mut e = engine();
        let err = e.expand("$$").unwrap_err().to_string();
        assert_eq!(err, "syntax error at position 1: $$ is not a valid expression");
    }

    #[test]
    fn test_invalid_character_after_dollar() {
        let mut e = engine();
        let err = e.expand("$ x").unwrap_err().to_string();
        assert_eq!(
            err,
            "syntax error at position 1: unexpected character ' ' after $"
        );
    }

    #[test]
    fn test_unterminated_brace_is_an_error() {
        let mut e = engine();
        let err = e.expand("${x").unwrap_err().to_string();
        assert_eq!(err, "syntax error: missing '}' at end of line");
    }

    #[test]
    fn test_invalid_character_inside_braces() {
        let mut e = engine();
        let err = e.expand("${a b}").unwrap_err().to_string();
        assert_eq!(
            err,
            "syntax error at position 3: ' ' is an invalid character inside ${...}"
        );
    }

    #[test]
    fn test_error_in_assignment_value_leaves_table_untouched() {
        let mut e = VarEngine::new();
        assert!(e.expand("a=$").is_err());
        assert_eq!(e.get("a"), None);
    }

    #[test]
    fn test_rewrite_maps_empty_output_to_consumed() {
        let mut e = VarEngine::new();
        assert_eq!(e.rewrite("a=1").unwrap(), Rewritten::Consumed);
        assert_eq!(
            e.rewrite("echo $a").unwrap(),
            Rewritten::Line("echo 1".to_string())
        );
        // a line expanding to nothing is also treated as consumed
        assert_eq!(e.rewrite("$nothing").unwrap(), Rewritten::Consumed);
    }
}
