//! `md-rules` — the mediator's rule language.
//!
//! A decision tree is written as indented text, one node per line, and
//! parsed into a binary (or n-ary) tree of rule nodes and action leaves.
//! Evaluating the tree against a [`State`] snapshot walks from the root,
//! following the branch labelled with each rule's result, to an action and
//! its arguments.
//!
//! | Module       | Contents                                                    |
//! |--------------|-------------------------------------------------------------|
//! | [`lexer`]    | `Token`, `tokenize`                                         |
//! | [`expr`]     | `Expr` AST, recursive-descent parser, interpreter           |
//! | [`value`]    | `Value`, `State`                                            |
//! | [`tree`]     | `Node`, `DecisionTree`, `Decision`                          |
//! | [`registry`] | `TreeRegistry`: tree sources, tree-file parser, cache       |
//! | [`error`]    | `RuleError`, `RuleResult`                                   |
//!
//! # Example
//!
//! ```rust,ignore
//! let mut registry = TreeRegistry::new(&["A", "B"])
//!     .with_source("main", "x > 0\n    True: A\n    False: B\n")?;
//! let tree = registry.parse("main")?;
//!
//! let mut state = State::default();
//! state.insert("x".into(), Value::Num(1.0));
//! assert_eq!(tree.evaluate(&state)?.action, "A");
//! ```

pub mod error;
pub mod expr;
pub mod lexer;
pub mod registry;
pub mod tree;
pub mod value;


pub use error::{RuleError, RuleResult};
pub use expr::Expr;
pub use registry::TreeRegistry;
pub use tree::{Decision, DecisionTree, Node};
pub use value::{State, Value};
