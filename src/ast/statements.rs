//! Statement nodes. Every statement records the id of its enclosing
//! scope inside the owning function's scope arena.

use std::sync::Arc;

use crate::types::Type;

use super::expressions::Expression;

#[derive(Debug, Clone)]
pub struct DeclarationNode {
    pub ty: Arc<Type>,
    pub name: String,
    pub value: Expression,
    /// `:=` form, type taken from the initializer.
    pub inferred: bool,
    pub scope_id: usize,
}

#[derive(Debug, Clone)]
pub struct AssignmentNode {
    pub name: String,
    pub value: Expression,
    pub scope_id: usize,
}

/// One `if` / `else if` arm.
#[derive(Debug, Clone)]
pub struct IfBranch {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub body_scope: usize,
}

/// A whole chain of `if` / `else if` arms with an optional `else` tail.
#[derive(Debug, Clone)]
pub struct IfNode {
    pub branches: Vec<IfBranch>,
    pub else_body: Option<Vec<Statement>>,
    pub else_scope: Option<usize>,
    pub scope_id: usize,
}

#[derive(Debug, Clone)]
pub struct WhileNode {
    pub condition: Expression,
    pub body: Vec<Statement>,
    pub body_scope: usize,
    pub scope_id: usize,
}

/// `for INIT; COND; STEP:`
#[derive(Debug, Clone)]
pub struct ForNode {
    pub init: Box<Statement>,
    pub condition: Expression,
    pub step: Box<Statement>,
    pub body: Vec<Statement>,
    pub body_scope: usize,
    pub scope_id: usize,
}

/// `for IDX, ELEM in EXPR:` — `_` bindings stay `None`. The parallel
/// form runs iterations on the worker pool.
#[derive(Debug, Clone)]
pub struct EnhancedForNode {
    pub index_binding: Option<String>,
    pub element_binding: Option<String>,
    pub iterable: Expression,
    pub parallel: bool,
    pub body: Vec<Statement>,
    pub body_scope: usize,
    pub scope_id: usize,
}

#[derive(Debug, Clone)]
pub struct ReturnNode {
    pub value: Option<Expression>,
    pub scope_id: usize,
}

#[derive(Debug, Clone)]
pub struct ThrowNode {
    pub value: Expression,
    pub scope_id: usize,
}

/// `catch [err]:` following a throwing call.
#[derive(Debug, Clone)]
pub struct CatchNode {
    pub error_binding: Option<String>,
    pub body: Vec<Statement>,
    pub body_scope: usize,
    pub scope_id: usize,
}

/// A bare expression (in practice: a call) used as a statement.
#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expr: Expression,
    pub scope_id: usize,
}

#[derive(Debug, Clone)]
pub enum Statement {
    Declaration(DeclarationNode),
    Assignment(AssignmentNode),
    If(IfNode),
    While(WhileNode),
    For(ForNode),
    EnhancedFor(EnhancedForNode),
    Return(ReturnNode),
    Throw(ThrowNode),
    Catch(CatchNode),
    Expression(ExpressionStatement),
}

impl Statement {
    /// Scope this statement belongs to.
    pub fn scope_id(&self) -> usize {
        match self {
            Statement::Declaration(node) => node.scope_id,
            Statement::Assignment(node) => node.scope_id,
            Statement::If(node) => node.scope_id,
            Statement::While(node) => node.scope_id,
            Statement::For(node) => node.scope_id,
            Statement::EnhancedFor(node) => node.scope_id,
            Statement::Return(node) => node.scope_id,
            Statement::Throw(node) => node.scope_id,
            Statement::Catch(node) => node.scope_id,
            Statement::Expression(node) => node.scope_id,
        }
    }
}
