use std::cell::RefCell;
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::completion::CompletionRegistry;

/// The result of dispatching one input line.
///
/// Each dispatch either executes a handler, performs a no-op because the line
/// was empty, or fails to find a matching command. The failure variant carries
/// a human-readable message naming the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Executed,
    Nop,
    NoCommand(String),
}

/// A command callback. Receives the remaining free-form argument text, i.e.
/// everything after the tokens that selected this command.
pub type Handler = Box<dyn FnMut(&str) -> CommandResult>;

/// Index of a node inside a [`CommandTree`] arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NodeId(usize);

struct CommandNode {
    name: String,
    description: String,
    handler: Option<Handler>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// A hierarchical command namespace.
///
/// The tree is an arena of nodes addressed by [`NodeId`]; children are index
/// lists in insertion order and the parent link is used only to rebuild the
/// absolute path of a node. The root node exists from construction on and is
/// the entry point for [`execute`](Self::execute).
///
/// Every node added below the root registers its full path (plus a trailing
/// space) in the completion registry shared with the owning mode's backend.
pub struct CommandTree {
    nodes: Vec<CommandNode>,
    completion: Rc<RefCell<CompletionRegistry>>,
}

impl CommandTree {
    /// Creates a tree holding only a root node.
    ///
    /// The root's name is the owning mode's name; it never takes part in
    /// token matching or path reconstruction.
    pub fn new(root_name: &str, completion: Rc<RefCell<CompletionRegistry>>) -> Self {
        Self {
            nodes: vec![CommandNode {
                name: root_name.to_string(),
                description: String::new(),
                handler: None,
                children: Vec::new(),
                parent: None,
            }],
            completion,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Adds a sub-command under `parent`.
    ///
    /// Returns `None` if `name` is empty or already used by a sibling; the
    /// tree is left untouched in that case. On success the new command's
    /// absolute path is registered for completion.
    pub fn add(&mut self, parent: NodeId, name: &str, description: &str) -> Option<NodeId> {
        if name.is_empty() {
            return None;
        }
        let taken = self.nodes[parent.0]
            .children
            .iter()
            .any(|c| self.nodes[c.0].name == name);
        if taken {
            return None;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(CommandNode {
            name: name.to_string(),
            description: description.to_string(),
            handler: None,
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        let mut path = self.absolute_name(id);
        path.push(' ');
        self.completion.borrow_mut().add(path);
        Some(id)
    }

    /// Replaces the handler invoked when `id` matches but none of its
    /// children do.
    pub fn set_handler(&mut self, id: NodeId, f: impl FnMut(&str) -> CommandResult + 'static) {
        self.nodes[id.0].handler = Some(Box::new(f));
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn description(&self, id: NodeId) -> &str {
        &self.nodes[id.0].description
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.nodes[id.0].parent.is_none()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// The space-joined path from the root to `id`. The root contributes
    /// nothing, so its own absolute name is empty.
    pub fn absolute_name(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let node = &self.nodes[c.0];
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            cursor = node.parent;
        }
        names.reverse();
        names.join(" ")
    }

    /// Renders one help line per direct child of `id`: `indent` spaces, the
    /// child name padded to the longest sibling plus two spaces, then the
    /// description. Empty string if `id` has no children.
    pub fn help(&self, id: NodeId, indent: usize) -> String {
        let children = &self.nodes[id.0].children;
        if children.is_empty() {
            return String::new();
        }
        let width = children
            .iter()
            .map(|c| self.nodes[c.0].name.len())
            .max()
            .unwrap_or(0);
        let mut out = String::new();
        for c in children {
            let node = &self.nodes[c.0];
            let _ = writeln!(
                out,
                "{:indent$}{:<width$}  {}",
                "", node.name, node.description
            );
        }
        out
    }

    /// Dispatches `line` starting at node `id`.
    ///
    /// The text up to the first space is matched case-sensitively and
    /// full-length against the children of `id`; on a match, dispatch recurses
    /// into the child with the text after the space. When no child matches,
    /// the node's own handler (if any) receives the whole remaining text;
    /// otherwise the unmatched token is reported.
    pub fn execute(&mut self, id: NodeId, line: &str) -> CommandResult {
        if self.is_root(id) && line.is_empty() {
            return CommandResult::Nop;
        }
        let (token, rest) = match line.find(' ') {
            Some(i) => (&line[..i], &line[i + 1..]),
            None => (line, ""),
        };
        let child = self.nodes[id.0]
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].name == token);
        if let Some(child) = child {
            return self.execute(child, rest);
        }
        if let Some(handler) = self.nodes[id.0].handler.as_mut() {
            return handler(line);
        }
        CommandResult::NoCommand(format!("{token}: command not found"))
    }
}

impl fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn tree() -> CommandTree {
        CommandTree::new("test", Rc::new(RefCell::new(CompletionRegistry::new())))
    }

    #[test]
    fn test_add_rejects_empty_and_duplicate_names() {
        let mut t = tree();
        let root = t.root();
        assert!(t.add(root, "", "empty").is_none());
        assert!(t.add(root, "foo", "first").is_some());
        assert!(t.add(root, "foo", "second").is_none());
        assert_eq!(t.children(root).len(), 1);
    }

    #[test]
    fn test_same_name_allowed_under_different_parents() {
        let mut t = tree();
        let root = t.root();
        let a = t.add(root, "a", "").unwrap();
        let b = t.add(root, "b", "").unwrap();
        assert!(t.add(a, "show", "").is_some());
        assert!(t.add(b, "show", "").is_some());
    }

    #[test]
    fn test_absolute_name_skips_root() {
        let mut t = tree();
        let root = t.root();
        let foo = t.add(root, "foo", "").unwrap();
        let bar = t.add(foo, "bar", "").unwrap();
        assert_eq!(t.absolute_name(root), "");
        assert_eq!(t.absolute_name(foo), "foo");
        assert_eq!(t.absolute_name(bar), "foo bar");
    }

    #[test]
    fn test_add_registers_completion_path() {
        let completion = Rc::new(RefCell::new(CompletionRegistry::new()));
        let mut t = CommandTree::new("m", completion.clone());
        let root = t.root();
        let foo = t.add(root, "foo", "").unwrap();
        t.add(foo, "bar", "").unwrap();
        assert_eq!(completion.borrow().entries(), ["foo ", "foo bar "]);
    }

    #[test]
    fn test_empty_line_at_root_is_nop() {
        let mut t = tree();
        let root = t.root();
        t.add(root, "foo", "").unwrap();
        assert_eq!(t.execute(root, ""), CommandResult::Nop);
    }

    #[test]
    fn test_unknown_token_reports_not_found() {
        let mut t = tree();
        let root = t.root();
        assert_eq!(
            t.execute(root, "bogus arg"),
            CommandResult::NoCommand("bogus: command not found".to_string())
        );
    }

    #[test]
    fn test_exact_length_matching() {
        let mut t = tree();
        let root = t.root();
        t.add(root, "foo", "").unwrap();
        // "fo" and "foox" must not match "foo"
        assert_eq!(
            t.execute(root, "fo"),
            CommandResult::NoCommand("fo: command not found".to_string())
        );
        assert_eq!(
            t.execute(root, "foox"),
            CommandResult::NoCommand("foox: command not found".to_string())
        );
    }

    #[test]
    fn test_child_wins_over_handler() {
        let mut t = tree();
        let root = t.root();
        let foo = t.add(root, "foo", "").unwrap();
        let bar = t.add(foo, "bar", "").unwrap();

        let foo_args = Rc::new(RefCell::new(String::new()));
        let bar_args = Rc::new(RefCell::new(String::new()));
        {
            let foo_args = foo_args.clone();
            t.set_handler(foo, move |args| {
                *foo_args.borrow_mut() = args.to_string();
                CommandResult::Executed
            });
        }
        {
            let bar_args = bar_args.clone();
            t.set_handler(bar, move |args| {
                *bar_args.borrow_mut() = args.to_string();
                CommandResult::Executed
            });
        }

        // "foo bar baz" selects the sub-command, which gets "baz"
        assert_eq!(t.execute(root, "foo bar baz"), CommandResult::Executed);
        assert_eq!(*bar_args.borrow(), "baz");

        // "foo qux" falls back to foo's own handler
        assert_eq!(t.execute(root, "foo qux"), CommandResult::Executed);
        assert_eq!(*foo_args.borrow(), "qux");
    }

    #[test]
    fn test_matched_node_without_handler_reports_next_token() {
        let mut t = tree();
        let root = t.root();
        t.add(root, "foo", "").unwrap();
        assert_eq!(
            t.execute(root, "foo qux"),
            CommandResult::NoCommand("qux: command not found".to_string())
        );
    }

    #[test]
    fn test_handler_runs_with_empty_args_when_line_is_exhausted() {
        let mut t = tree();
        let root = t.root();
        let quit = t.add(root, "quit", "").unwrap();
        let hit = Rc::new(Cell::new(false));
        {
            let hit = hit.clone();
            t.set_handler(quit, move |args| {
                assert_eq!(args, "");
                hit.set(true);
                CommandResult::Executed
            });
        }
        assert_eq!(t.execute(root, "quit"), CommandResult::Executed);
        assert!(hit.get());
    }

    #[test]
    fn test_help_pads_to_longest_sibling() {
        let mut t = tree();
        let root = t.root();
        t.add(root, "quit", "leave the shell").unwrap();
        t.add(root, "ls", "list things").unwrap();
        let expected = "  quit  leave the shell\n  ls    list things\n";
        assert_eq!(t.help(root, 2), expected);
    }

    #[test]
    fn test_help_without_children_is_empty() {
        let mut t = tree();
        let root = t.root();
        let leaf = t.add(root, "leaf", "").unwrap();
        assert_eq!(t.help(leaf, 0), "");
    }
}
