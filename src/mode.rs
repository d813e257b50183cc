use anyhow::Result;

use crate::backend::{Backend, BackendConfig};
use crate::command::{CommandResult, CommandTree, Handler, NodeId};

/// One batch-registration entry for [`Mode::add_all`].
pub struct CmdClause {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: Handler,
}

/// A self-contained command namespace: a command tree, a completion registry,
/// and a line-editing backend with its own prompt and history.
///
/// Modes are registered with a [`CommandLine`](crate::CommandLine) and
/// activated by pushing them onto its mode stack; only the top-of-stack mode
/// receives input.
pub struct Mode<B: Backend> {
    tree: CommandTree,
    backend: B,
}

impl<B: Backend> Mode<B> {
    /// Builds a mode named `name` with a fresh backend and an empty command
    /// tree rooted under that name.
    pub fn new(name: &str, config: BackendConfig) -> Result<Self> {
        let backend = B::create(config)?;
        let tree = CommandTree::new(name, backend.completer());
        Ok(Self { tree, backend })
    }

    pub fn name(&self) -> &str {
        self.tree.name(self.tree.root())
    }

    /// Adds a top-level command. `None` on empty or duplicate name.
    pub fn add(&mut self, name: &str, description: &str) -> Option<NodeId> {
        let root = self.tree.root();
        self.tree.add(root, name, description)
    }

    /// Adds a top-level command with a handler in one step.
    pub fn add_with(
        &mut self,
        name: &str,
        description: &str,
        handler: impl FnMut(&str) -> CommandResult + 'static,
    ) -> Option<NodeId> {
        let id = self.add(name, description)?;
        self.tree.set_handler(id, handler);
        Some(id)
    }

    /// Registers a whole batch of commands at once. Clauses with empty or
    /// duplicate names are skipped, like individual `add` calls.
    pub fn add_all(&mut self, clauses: Vec<CmdClause>) {
        for clause in clauses {
            if let Some(id) = self.add(clause.name, clause.description) {
                self.tree.set_handler(id, clause.handler);
            }
        }
    }

    /// Installs the fallback handler invoked when no top-level command
    /// matches the input line.
    pub fn on_unknown_command(&mut self, handler: impl FnMut(&str) -> CommandResult + 'static) {
        let root = self.tree.root();
        self.tree.set_handler(root, handler);
    }

    /// Installs the completion selection callback on this mode's registry.
    pub fn on_complete(&mut self, f: impl FnMut(&str, &[String]) -> String + 'static) {
        self.backend.completer().borrow_mut().set_callback(f);
    }

    /// Registers an extra completion candidate beyond the command paths.
    pub fn add_completion(&mut self, entry: impl Into<String>) -> bool {
        self.backend.completer().borrow_mut().add(entry)
    }

    /// Replaces all completion candidates of this mode.
    pub fn replace_completions(&mut self, entries: Vec<String>) {
        self.backend.completer().borrow_mut().replace(entries);
    }

    /// Dispatches `line` against this mode's command tree.
    pub fn execute(&mut self, line: &str) -> CommandResult {
        let root = self.tree.root();
        self.tree.execute(root, line)
    }

    /// Help text for the top-level commands of this mode.
    pub fn help(&self, indent: usize) -> String {
        self.tree.help(self.tree.root(), indent)
    }

    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Mutable tree access, for registering nested sub-commands.
    pub fn tree_mut(&mut self) -> &mut CommandTree {
        &mut self.tree
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;

    fn mode(name: &str) -> Mode<ScriptedBackend> {
        Mode::new(name, BackendConfig::default()).unwrap()
    }

    #[test]
    fn test_execute_routes_to_handlers() {
        let mut m = mode("main");
        m.add_with("ping", "answers pong", |_| CommandResult::Executed);
        assert_eq!(m.execute("ping"), CommandResult::Executed);
        assert_eq!(
            m.execute("pong"),
            CommandResult::NoCommand("pong: command not found".to_string())
        );
    }

    #[test]
    fn test_add_all_skips_duplicates() {
        let mut m = mode("main");
        m.add_all(vec![
            CmdClause {
                name: "a",
                description: "first",
                handler: Box::new(|_| CommandResult::Executed),
            },
            CmdClause {
                name: "a",
                description: "dup",
                handler: Box::new(|_| CommandResult::Nop),
            },
            CmdClause {
                name: "b",
                description: "second",
                handler: Box::new(|_| CommandResult::Executed),
            },
        ]);
        assert_eq!(m.tree().children(m.tree().root()).len(), 2);
        assert_eq!(m.execute("a"), CommandResult::Executed);
    }

    #[test]
    fn test_unknown_command_fallback() {
        let mut m = mode("main");
        m.on_unknown_command(|line| CommandResult::NoCommand(format!("?{line}")));
        assert_eq!(
            m.execute("anything goes"),
            CommandResult::NoCommand("?anything goes".to_string())
        );
    }

    #[test]
    fn test_commands_feed_completion_registry() {
        let mut m = mode("main");
        m.add("quit", "");
        m.add_completion("extra");
        let completer = m.backend().completer();
        let entries = completer.borrow().entries().to_vec();
        assert_eq!(entries, ["quit ", "extra"]);
    }

    #[test]
    fn test_nested_commands_via_tree_mut() {
        let mut m = mode("main");
        let net = m.add("net", "network tools").unwrap();
        let ping = m.tree_mut().add(net, "ping", "send a probe").unwrap();
        m.tree_mut().set_handler(ping, |args| {
            assert_eq!(args, "localhost");
            CommandResult::Executed
        });
        assert_eq!(m.execute("net ping localhost"), CommandResult::Executed);
    }

    #[test]
    fn test_mode_help_lists_top_level() {
        let mut m = mode("main");
        m.add("quit", "terminate");
        assert_eq!(m.help(0), "quit  terminate\n");
    }
}
