//! Scope arena and hygiene colors.
//!
//! Scopes are records in an arena addressed by [`ScopeId`]. A scope stack is
//! a persistent vector of ids, so taking a snapshot is cheap, and anything
//! recorded in a scope later is visible through every earlier snapshot that
//! contains it. Macro declarations rely on this: a color marked in the
//! declaring scope after the declaration was read is still found through
//! the declaration's snapshot.

use std::collections::HashMap;

use serde::Serialize;

use super::types::MacroId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(u32);

/// Innermost scope last.
pub type ScopeStack = im::Vector<ScopeId>;

/// A per-expansion tag appended to macro-introduced binding names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Color(u32);

impl Color {
    pub fn new(value: u32) -> Self {
        Color(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Scope {
    pub macros: HashMap<String, MacroId>,
    /// Hygiene decisions for names bound in this scope: `Some` renames,
    /// `None` records that the name is deliberately left alone.
    pub colors: HashMap<String, Option<Color>>,
}

#[derive(Debug, Default, Clone)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::default());
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn register_macro(&mut self, scope: ScopeId, name: &str, id: MacroId) {
        if let Some(scope) = self.get_mut(scope) {
            scope.macros.insert(name.to_string(), id);
        }
    }

    pub fn mark_color(&mut self, scope: ScopeId, name: &str, color: Option<Color>) {
        if let Some(scope) = self.get_mut(scope) {
            scope.colors.insert(name.to_string(), color);
        }
    }

    /// The innermost macro of that name visible from `stack`.
    pub fn find_macro(&self, stack: &ScopeStack, name: &str) -> Option<MacroId> {
        stack
            .iter()
            .rev()
            .find_map(|id| self.get(*id).and_then(|scope| scope.macros.get(name).copied()))
    }

    /// The hygiene decision of the innermost scope in `stack` that has one for `name`.
    pub fn find_color(&self, stack: &ScopeStack, name: &str) -> Option<Color> {
        stack
            .iter()
            .rev()
            .find_map(|id| self.get(*id).and_then(|scope| scope.colors.get(name).copied()))
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use im::vector;

    #[test]
    fn marks_are_visible_through_earlier_snapshots() {
        let mut arena = ScopeArena::new();
        let root = arena.alloc();
        let snapshot: ScopeStack = vector![root];
        arena.mark_color(root, "two", Some(Color::new(1)));
        assert_eq!(arena.find_color(&snapshot, "two"), Some(Color::new(1)));
    }

    #[test]
    fn innermost_decision_wins() {
        let mut arena = ScopeArena::new();
        let outer = arena.alloc();
        let inner = arena.alloc();
        arena.mark_color(outer, "x", Some(Color::new(3)));
        arena.mark_color(inner, "x", None);
        assert_eq!(arena.find_color(&vector![outer, inner], "x"), None);
        assert_eq!(arena.find_color(&vector![outer], "x"), Some(Color::new(3)));
    }

    #[test]
    fn macros_resolve_innermost_first() {
        let mut arena = ScopeArena::new();
        let outer = arena.alloc();
        let inner = arena.alloc();
        let mut registry = super::super::types::MacroRegistry::new();
        let decl = super::super::types::MacroDeclaration {
            name: "m".to_string(),
            patterns: Vec::new(),
            scope_stack: ScopeStack::new(),
            span: Default::default(),
        };
        let a = registry.register(decl.clone());
        let b = registry.register(decl);
        arena.register_macro(outer, "m", a);
        arena.register_macro(inner, "m", b);
        assert_eq!(arena.find_macro(&vector![outer, inner], "m"), Some(b));
        assert_eq!(arena.find_macro(&vector![outer], "m"), Some(a));
        assert_eq!(arena.find_macro(&vector![outer], "n"), None);
    }
}
