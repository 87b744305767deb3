//! Decision trees and their evaluation.

use std::fmt;
use std::sync::Arc;

use crate::{Expr, RuleError, RuleResult, State, Value};

// ── Nodes ─────────────────────────────────────────────────────────────────────

/// A tree node.  Children are reference-counted so that a named sub-tree
/// spliced into several places is parsed and stored once.
#[derive(Debug)]
pub enum Node {
    Rule(RuleNode),
    Action(ActionNode),
}

/// An inner node: an expression and one child per expected result.
#[derive(Debug)]
pub struct RuleNode {
    pub(crate) source:   String,
    pub(crate) expr:     Expr,
    pub(crate) branches: Vec<(String, Arc<Node>)>,
}

impl RuleNode {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.branches.iter().map(|(k, n)| (k.as_str(), n.as_ref()))
    }

    /// The branch selected by `value`.
    fn branch(&self, value: &Value) -> RuleResult<&Node> {
        self.branches
            .iter()
            .find(|(key, _)| value.matches_key(key))
            .map(|(_, node)| node.as_ref())
            .ok_or_else(|| RuleError::VariableDomain {
                value: value.to_string(),
                expr:  self.source.clone(),
            })
    }
}

/// A leaf: an action name plus argument expressions.
#[derive(Debug)]
pub struct ActionNode {
    pub(crate) action: String,
    pub(crate) args:   Vec<(String, Expr)>,
}

impl ActionNode {
    pub fn action(&self) -> &str {
        &self.action
    }

    fn decide(&self, state: &State) -> RuleResult<Decision> {
        let args = self
            .args
            .iter()
            .map(|(name, expr)| Ok((name.clone(), expr.eval(state)?)))
            .collect::<RuleResult<Vec<_>>>()?;
        Ok(Decision { action: self.action.clone(), args })
    }
}

impl Node {
    /// Walk from this node to a leaf.
    pub fn evaluate(&self, state: &State) -> RuleResult<Decision> {
        let mut node = self;
        loop {
            match node {
                Node::Rule(rule) => node = rule.branch(&rule.expr.eval(state)?)?,
                Node::Action(leaf) => return leaf.decide(state),
            }
        }
    }

    /// Number of nodes below and including this one.  Shared sub-trees are
    /// counted at every place they appear.
    pub fn node_count(&self) -> usize {
        match self {
            Node::Rule(rule) => 1 + rule.branches.iter().map(|(_, n)| n.node_count()).sum::<usize>(),
            Node::Action(_) => 1,
        }
    }

    fn collect_actions<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Rule(rule) => {
                for (_, child) in &rule.branches {
                    child.collect_actions(out);
                }
            }
            Node::Action(leaf) => {
                if !out.contains(&leaf.action.as_str()) {
                    out.push(leaf.action.as_str());
                }
            }
        }
    }

    fn write_subtree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Node::Action(leaf) => writeln!(f, "{}", leaf.action),
            Node::Rule(rule) => {
                writeln!(f, "{}", rule.source)?;
                for (key, child) in &rule.branches {
                    write!(f, "{}{key}:", "\t".repeat(depth + 1))?;
                    child.write_subtree(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

// ── Decision ──────────────────────────────────────────────────────────────────

/// The outcome of evaluating a tree: an action name and its arguments.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decision {
    pub action: String,
    pub args:   Vec<(String, Value)>,
}

impl Decision {
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// A numeric argument.  `None` when absent or not a number.
    pub fn arg_num(&self, name: &str) -> Option<f64> {
        self.arg(name).and_then(Value::as_num)
    }
}

// ── DecisionTree ──────────────────────────────────────────────────────────────

/// A parsed decision tree.  Read-only after parsing and cheap to clone.
#[derive(Clone, Debug)]
pub struct DecisionTree {
    name: String,
    root: Arc<Node>,
}

impl DecisionTree {
    pub(crate) fn new(name: String, root: Arc<Node>) -> Self {
        DecisionTree { name, root }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn evaluate(&self, state: &State) -> RuleResult<Decision> {
        self.root.evaluate(state)
    }

    /// Trace of the branches taken for `state`, e.g.
    /// `ttdu > 10 ==> True:current_level ==> L2:SSL3`.
    pub fn evaluation_path(&self, state: &State) -> RuleResult<String> {
        let mut path = String::new();
        let mut node = self.root.as_ref();
        loop {
            match node {
                Node::Rule(rule) => {
                    let value = rule.expr.eval(state)?;
                    path.push_str(&format!("{} ==> {value}:", rule.source));
                    node = rule.branch(&value)?;
                }
                Node::Action(leaf) => {
                    path.push_str(&leaf.action);
                    return Ok(path);
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.root.node_count()
    }

    /// Every action name reachable from the root, in first-seen order.
    pub fn actions(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.collect_actions(&mut out);
        out
    }
}

impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write_subtree(f, 0)
    }
}
