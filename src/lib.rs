//! Building blocks for interactive, line-oriented command shells.
//!
//! This crate provides the dispatch engine for embedding a REPL into a tool
//! (debuggers, admin consoles, test harnesses): a hierarchical command tree
//! with recursive token matching, a stack of independent command namespaces
//! ("modes"), a preprocessor pipeline that may rewrite or consume a line
//! before dispatch, and a ready-made variable-substitution preprocessor.
//!
//! The main entry point is [`CommandLine`]: register one or more [`Mode`]s,
//! push one onto the stack, add commands and preprocessors, then loop over
//! [`read_line`](CommandLine::read_line) and [`process`](CommandLine::process)
//! branching on the returned [`CommandResult`].
//!
//! ```no_run
//! use repline::{CommandLine, CommandResult, RustylineBackend, VarEngine};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut cli = CommandLine::<RustylineBackend>::new();
//! let mode = cli.mode_add("default", "> ", None, None)?.unwrap();
//! mode.borrow_mut()
//!     .add_with("quit", "terminates the whole thing", |_| CommandResult::Executed);
//! cli.mode_push("default");
//! cli.add_preprocessor(VarEngine::new());
//! while let Some(line) = cli.read_line() {
//!     match cli.process(&line) {
//!         CommandResult::Executed => {
//!             cli.append_to_history(&line);
//!         }
//!         CommandResult::Nop => {}
//!         CommandResult::NoCommand(err) => eprintln!("{err}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
mod command;
mod command_line;
mod completion;
mod mode;
mod preprocessor;
mod vars;

pub use backend::{Backend, BackendConfig, PromptColor, RustylineBackend, ScriptedBackend};
pub use command::{CommandResult, CommandTree, Handler, NodeId};
pub use command_line::{CommandLine, ModeRef};
pub use completion::{Completion, CompletionCallback, CompletionRegistry};
pub use mode::{CmdClause, Mode};
pub use preprocessor::{Preprocessor, Rewritten};
pub use vars::VarEngine;
