//! Lexical scope trees.
//!
//! Scopes live in a per-function arena indexed by scope id; the parent
//! link is a plain index, so the tree has no ownership cycles. Scope id
//! 0 is reserved for the enclosing top level. Variable tables keep
//! insertion order.

use std::sync::Arc;

use crate::types::Type;

#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub ty: Arc<Type>,
    pub decl_scope: usize,
    pub is_mutable: bool,
    pub is_mutated: bool,
    /// Introduced by a `func requires` clause rather than a declaration.
    pub from_requires: bool,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: usize,
    pub parent: Option<usize>,
    variables: Vec<(String, VariableInfo)>,
}

impl Scope {
    fn new(id: usize, parent: Option<usize>) -> Self {
        Self {
            id,
            parent,
            variables: Vec::new(),
        }
    }

    /// Declare a variable in this scope. Fails when the name is already
    /// taken here.
    pub fn add_variable(&mut self, name: &str, info: VariableInfo) -> bool {
        if self.variables.iter().any(|(existing, _)| existing == name) {
            return false;
        }
        self.variables.push((name.to_string(), info));
        true
    }

    pub fn get(&self, name: &str) -> Option<&VariableInfo> {
        self.variables
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, info)| info)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut VariableInfo> {
        self.variables
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .map(|(_, info)| info)
    }

    /// Variable names in declaration order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(name, _)| name.as_str())
    }
}

/// Arena of one function's scopes. Ids are handed out monotonically.
#[derive(Debug, Clone)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(0, None)],
        }
    }

    /// Open a child scope and return its id.
    pub fn push_scope(&mut self, parent: usize) -> usize {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(id, Some(parent)));
        id
    }

    pub fn scope(&self, id: usize) -> &Scope {
        &self.scopes[id]
    }

    pub fn scope_mut(&mut self, id: usize) -> &mut Scope {
        &mut self.scopes[id]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Resolve a name by walking the parent chain. Returns the id of
    /// the declaring scope and the variable info.
    pub fn resolve(&self, scope_id: usize, name: &str) -> Option<(usize, &VariableInfo)> {
        let mut current = Some(scope_id);
        while let Some(id) = current {
            let scope = &self.scopes[id];
            if let Some(info) = scope.get(name) {
                return Some((id, info));
            }
            current = scope.parent;
        }
        None
    }

    /// Mark a resolved variable as mutated.
    pub fn mark_mutated(&mut self, scope_id: usize, name: &str) -> bool {
        let mut current = Some(scope_id);
        while let Some(id) = current {
            if self.scopes[id].get(name).is_some() {
                if let Some(info) = self.scopes[id].get_mut(name) {
                    info.is_mutated = true;
                }
                return true;
            }
            current = self.scopes[id].parent;
        }
        false
    }

    /// Globally unique lookup key of a variable.
    pub fn unique_name(decl_scope: usize, name: &str) -> String {
        format!("s{}::{}", decl_scope, name)
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Primitive, Type};

    fn info(scope: usize) -> VariableInfo {
        VariableInfo {
            ty: Arc::new(Type::Primitive(Primitive::I32)),
            decl_scope: scope,
            is_mutable: true,
            is_mutated: false,
            from_requires: false,
        }
    }

    #[test]
    fn resolution_walks_parents() {
        let mut arena = ScopeArena::new();
        let inner = arena.push_scope(0);
        let innermost = arena.push_scope(inner);
        assert!(arena.scope_mut(0).add_variable("x", info(0)));

        let (decl_scope, _) = arena.resolve(innermost, "x").unwrap();
        assert_eq!(decl_scope, 0);
        assert!(arena.resolve(innermost, "y").is_none());
    }

    #[test]
    fn same_scope_redeclaration_fails() {
        let mut arena = ScopeArena::new();
        assert!(arena.scope_mut(0).add_variable("x", info(0)));
        assert!(!arena.scope_mut(0).add_variable("x", info(0)));
    }

    #[test]
    fn shadowing_in_child_scope_is_a_new_variable() {
        let mut arena = ScopeArena::new();
        let inner = arena.push_scope(0);
        assert!(arena.scope_mut(0).add_variable("x", info(0)));
        assert!(arena.scope_mut(inner).add_variable("x", info(inner)));
        let (decl_scope, _) = arena.resolve(inner, "x").unwrap();
        assert_eq!(decl_scope, inner);
    }

    #[test]
    fn unique_names_embed_the_declaring_scope() {
        assert_eq!(ScopeArena::unique_name(3, "counter"), "s3::counter");
    }

    #[test]
    fn mutation_marking() {
        let mut arena = ScopeArena::new();
        let inner = arena.push_scope(0);
        arena.scope_mut(0).add_variable("x", info(0));
        assert!(arena.mark_mutated(inner, "x"));
        assert!(arena.scope(0).get("x").unwrap().is_mutated);
        assert!(!arena.mark_mutated(inner, "missing"));
    }
}
