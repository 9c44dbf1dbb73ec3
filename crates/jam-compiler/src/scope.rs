//! Lexically scoped symbol table used by the resolver.
//!
//! [`ScopeStack`] keeps one scope per binding form. A name's lexical address
//! is the number of scopes between the reference and its declaration plus its
//! declaration index within that scope.

use std::collections::HashMap;

use jam_types::ast::Address;

/// Which binding form opened a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// `map` parameters.
    Map,
    /// `let` definitions.
    Let,
    /// `letrec` definitions.
    LetRec,
}

impl ScopeKind {
    /// How diagnostics refer to the form.
    pub fn describe(self) -> &'static str {
        match self {
            ScopeKind::Map => "map parameter list",
            ScopeKind::Let => "let",
            ScopeKind::LetRec => "letrec",
        }
    }
}

/// A single scope level.
#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    offsets: HashMap<String, usize>,
}

/// A stack of scopes for name resolution.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            offsets: HashMap::new(),
        });
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(!self.scopes.is_empty(), "no scope to pop");
        self.scopes.pop();
    }

    /// Declare a name in the innermost scope.
    ///
    /// Returns its offset, or `None` if the scope already declares the name.
    pub fn define(&mut self, name: &str) -> Option<usize> {
        let scope = self.scopes.last_mut()?;
        if scope.offsets.contains_key(name) {
            return None;
        }
        let offset = scope.offsets.len();
        scope.offsets.insert(name.to_string(), offset);
        Some(offset)
    }

    /// Lexical address of the innermost declaration of `name`.
    pub fn lookup(&self, name: &str) -> Option<Address> {
        self.scopes
            .iter()
            .rev()
            .enumerate()
            .find_map(|(depth, scope)| scope.offsets.get(name).map(|&offset| Address::new(depth, offset)))
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current_kind(&self) -> Option<ScopeKind> {
        self.scopes.last().map(|s| s.kind)
    }
}
