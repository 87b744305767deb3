//! Tree sources, the tree-file parser and the parsed-tree cache.
//!
//! # Tree files
//!
//! One node per line.  The first line is the root.  Every other line is a
//! branch of the nearest less-indented rule above it, written as
//! `<result>: <node>`, and is indented one level (four spaces or a tab)
//! deeper than that rule.  A node is either
//!
//! - an action name from the registry's action list, optionally followed by
//!   `=> name=expr, name=expr`;
//! - the name of another registered tree, which is spliced in;
//! - otherwise a rule expression.
//!
//! `#` starts a comment.  Blank lines are ignored.
//!
//! ```text
//! ttdu > min_esl_time
//!     True: current_level < max_available_level
//!         True: SSL3 => time=comfortable_shift_time
//!         False: DN
//!     False: fallback.tree
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::tree::{ActionNode, Node, RuleNode};
use crate::{DecisionTree, Expr, RuleError, RuleResult};

const INDENT_WIDTH: usize = 4;

// ── Drafts ────────────────────────────────────────────────────────────────────

/// A node under construction.  Drafts live in a flat list and refer to their
/// children by index until the tree is frozen.
enum DraftKind {
    Rule { source: String, expr: Expr },
    Action(ActionNode),
    Shared(Arc<Node>),
}

struct Draft {
    kind:     DraftKind,
    line:     usize,
    children: Vec<(String, usize)>,
}

fn freeze(drafts: &mut Vec<Option<Draft>>, index: usize) -> RuleResult<Arc<Node>> {
    let Some(draft) = drafts.get_mut(index).and_then(Option::take) else {
        return Err(RuleError::syntax(0, "tree node referenced twice"));
    };
    Ok(match draft.kind {
        DraftKind::Rule { source, expr } => {
            if draft.children.is_empty() {
                return Err(RuleError::DanglingRule { line: draft.line });
            }
            let branches = draft
                .children
                .into_iter()
                .map(|(key, child)| Ok((key, freeze(drafts, child)?)))
                .collect::<RuleResult<Vec<_>>>()?;
            Arc::new(Node::Rule(RuleNode { source, expr, branches }))
        }
        DraftKind::Action(leaf) => Arc::new(Node::Action(leaf)),
        DraftKind::Shared(node) => node,
    })
}

/// Split at commas outside parentheses.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_args(src: &str, line: usize) -> RuleResult<Vec<(String, Expr)>> {
    split_top_level(src)
        .into_iter()
        .map(|part| {
            let (name, value) = part
                .split_once('=')
                .ok_or_else(|| RuleError::syntax(line, format!("expected name=expression, found {part:?}")))?;
            let name = name.trim();
            let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(RuleError::syntax(line, format!("invalid argument name {name:?}")));
            }
            Ok((name.to_owned(), Expr::parse(value, line)?))
        })
        .collect()
}

// ── TreeRegistry ──────────────────────────────────────────────────────────────

/// Named tree sources plus the cache of trees parsed from them.
///
/// The registry is the parser's context: it decides which terminal names
/// are actions, resolves sub-tree references and detects inclusion cycles.
/// A parsed tree is cached by name, so every reference to it shares one
/// copy.
#[derive(Debug, Default)]
pub struct TreeRegistry {
    actions: Vec<String>,
    sources: FxHashMap<String, String>,
    parsed:  FxHashMap<String, Arc<Node>>,
}

impl TreeRegistry {
    /// An empty registry whose trees may end in any of `actions`.
    pub fn new<S: AsRef<str>>(actions: &[S]) -> Self {
        TreeRegistry {
            actions: actions.iter().map(|a| a.as_ref().to_owned()).collect(),
            sources: FxHashMap::default(),
            parsed:  FxHashMap::default(),
        }
    }

    /// Register every file below `dir` (recursively) under its file name.
    pub fn from_dir<S: AsRef<str>>(dir: impl AsRef<Path>, actions: &[S]) -> RuleResult<Self> {
        let mut registry = TreeRegistry::new(actions);
        registry.add_dir(dir)?;
        Ok(registry)
    }

    pub fn add_source(&mut self, name: impl Into<String>, text: impl Into<String>) -> RuleResult<()> {
        let name = name.into();
        if self.sources.contains_key(&name) {
            return Err(RuleError::DuplicateTree(name));
        }
        self.sources.insert(name, text.into());
        Ok(())
    }

    pub fn with_source(mut self, name: impl Into<String>, text: impl Into<String>) -> RuleResult<Self> {
        self.add_source(name, text)?;
        Ok(self)
    }

    /// Register every file below `dir`.  File names must be unique across
    /// the whole directory tree.  Returns the number of files added.
    pub fn add_dir(&mut self, dir: impl AsRef<Path>) -> RuleResult<usize> {
        let mut entries = fs::read_dir(dir.as_ref())?
            .map(|e| e.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        let mut added = 0;
        for path in entries {
            if path.is_dir() {
                added += self.add_dir(&path)?;
            } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                let text = fs::read_to_string(&path)?;
                self.add_source(name, text)?;
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Parse the tree registered as `name`, splicing in referenced trees.
    pub fn parse(&mut self, name: &str) -> RuleResult<DecisionTree> {
        let root = self.parse_tree(name, &mut Vec::new())?;
        Ok(DecisionTree::new(name.to_owned(), root))
    }

    fn parse_tree(&mut self, name: &str, stack: &mut Vec<String>) -> RuleResult<Arc<Node>> {
        if let Some(root) = self.parsed.get(name) {
            return Ok(Arc::clone(root));
        }
        if stack.iter().any(|n| n == name) {
            return Err(RuleError::Cycle(name.to_owned()));
        }
        let text = self
            .sources
            .get(name)
            .cloned()
            .ok_or_else(|| RuleError::UnknownTree(name.to_owned()))?;

        stack.push(name.to_owned());
        let root = self.build(&text, stack);
        stack.pop();
        let root = root?;

        debug!(tree = name, nodes = root.node_count(), "tree parsed");
        self.parsed.insert(name.to_owned(), Arc::clone(&root));
        Ok(root)
    }

    fn build(&mut self, text: &str, stack: &mut Vec<String>) -> RuleResult<Arc<Node>> {
        let mut drafts: Vec<Draft> = Vec::new();
        let mut path: Vec<usize> = Vec::new();
        let mut seen_indents = vec![0usize];
        let mut prev_indent = 0usize;

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let expanded = raw.replace('\t', &" ".repeat(INDENT_WIDTH));
            let content = expanded.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }

            let indent = (expanded.len() - expanded.trim_start().len()) / INDENT_WIDTH;
            let misplaced = (drafts.is_empty() && indent != 0)
                || (indent < prev_indent && !seen_indents.contains(&indent))
                || indent > prev_indent + 1;
            if misplaced {
                return Err(RuleError::Indent { line, text: raw.to_owned() });
            }
            if !seen_indents.contains(&indent) {
                seen_indents.push(indent);
            }
            prev_indent = indent;

            let (key, node_src) = match content.split_once(':') {
                Some((key, node_src)) => (Some(key.trim().to_owned()), node_src.trim()),
                None => (None, content),
            };
            match (&key, drafts.is_empty()) {
                (None, false) => {
                    return Err(RuleError::syntax(line, "expected `<result>: <node>`"));
                }
                (Some(_), true) => {
                    return Err(RuleError::syntax(line, "the first line must be the root node"));
                }
                _ => {}
            }

            let kind = self.parse_node(node_src, line, stack)?;
            let id = drafts.len();
            drafts.push(Draft { kind, line, children: Vec::new() });

            path.truncate(indent);
            match (key, path.last()) {
                (Some(key), Some(&parent)) => {
                    let parent = &mut drafts[parent];
                    if !matches!(parent.kind, DraftKind::Rule { .. }) {
                        return Err(RuleError::syntax(line, "only rules can have branches"));
                    }
                    parent.children.push((key, id));
                }
                (None, None) => {}
                _ => return Err(RuleError::Indent { line, text: raw.to_owned() }),
            }
            path.push(id);
        }

        if drafts.is_empty() {
            return Err(RuleError::syntax(0, "empty tree"));
        }
        let mut drafts: Vec<Option<Draft>> = drafts.into_iter().map(Some).collect();
        freeze(&mut drafts, 0)
    }

    fn parse_node(&mut self, src: &str, line: usize, stack: &mut Vec<String>) -> RuleResult<DraftKind> {
        let (head, args) = match src.split_once("=>") {
            Some((head, args)) => (head.trim(), Some(args.trim())),
            None => (src.trim(), None),
        };

        if self.actions.iter().any(|a| a == head) {
            let args = match args {
                Some(a) if !a.is_empty() => parse_args(a, line)?,
                _ => Vec::new(),
            };
            return Ok(DraftKind::Action(ActionNode { action: head.to_owned(), args }));
        }
        if args.is_some() {
            return Err(RuleError::syntax(line, format!("arguments given to non-action {head:?}")));
        }
        if self.sources.contains_key(head) {
            return Ok(DraftKind::Shared(self.parse_tree(head, stack)?));
        }
        Ok(DraftKind::Rule { source: head.to_owned(), expr: Expr::parse(head, line)? })
    }
}
