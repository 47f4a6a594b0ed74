//! Typed AST: definitions, statements, expressions, scopes.
//!
//! The three node families are closed sum types; shared type
//! descriptors come from [`crate::types`].

pub mod definitions;
pub mod expressions;
pub mod file_node;
pub mod scope;
pub mod statements;

pub use definitions::{Definition, FunctionNode, ImportNode, ImportPath, NodeInfo, Parameter};
pub use expressions::{CallTarget, Expression, LiteralValue};
pub use file_node::FileNode;
pub use scope::{Scope, ScopeArena, VariableInfo};
pub use statements::Statement;
