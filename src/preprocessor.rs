use anyhow::Result;

/// What a preprocessor stage did to the line it was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewritten {
    /// The (possibly rewritten) line to hand to the next stage, or to the
    /// active mode once the pipeline is done.
    Line(String),
    /// The stage consumed the line entirely (e.g. a variable assignment);
    /// nothing is dispatched and processing reports success.
    Consumed,
}

/// A text-rewrite stage run before command dispatch.
///
/// Stages are chained in registration order. A stage may rewrite the line,
/// swallow it, or fail; an error aborts the whole pipeline and its rendered
/// message becomes the dispatcher's `last_error` verbatim.
///
/// Any `FnMut(&str) -> anyhow::Result<Rewritten>` closure is a stage, so
/// one-off rewrites don't need a dedicated type:
///
/// ```
/// use repline::{Preprocessor, Rewritten};
///
/// let mut upper =
///     |line: &str| -> anyhow::Result<Rewritten> { Ok(Rewritten::Line(line.to_uppercase())) };
/// assert_eq!(
///     upper.rewrite("abc").unwrap(),
///     Rewritten::Line("ABC".to_string())
/// );
/// ```
pub trait Preprocessor {
    fn rewrite(&mut self, line: &str) -> Result<Rewritten>;
}

impl<F> Preprocessor for F
where
    F: FnMut(&str) -> Result<Rewritten>,
{
    fn rewrite(&mut self, line: &str) -> Result<Rewritten> {
        self(line)
    }
}
