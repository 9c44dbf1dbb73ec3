//! Scope resolution: replaces variable names with `(depth, offset)` lexical
//! addresses.
//!
//! Entry point: [`Resolver::resolve`].
//!
//! Error codes emitted:
//! - E500: a binding form declares the same name twice
//! - E501: reference to a name no enclosing form declares
//!
//! Errors are collected rather than fatal, so one pass reports every problem
//! in the program.

use std::rc::Rc;

use jam_types::ast::*;
use jam_types::{CompileErrors, ErrorCode, JamError, Span};

use crate::scope::{ScopeKind, ScopeStack};

/// Walks a [`NamedExpr`] and produces the equivalent [`ResolvedExpr`].
#[derive(Debug)]
pub struct Resolver {
    scopes: ScopeStack,
    errors: CompileErrors,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
            errors: CompileErrors::empty(),
        }
    }

    /// Resolve a closed program.
    pub fn resolve(mut self, program: &NamedExpr) -> Result<ResolvedExpr, CompileErrors> {
        let resolved = self.resolve_expr(program);
        debug_assert_eq!(self.scopes.depth(), 0, "unbalanced scopes");
        if self.errors.has_errors() {
            tracing::debug!(errors = self.errors.total_errors, "scope resolution failed");
            Err(self.errors)
        } else {
            Ok(resolved)
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    fn resolve_expr(&mut self, expr: &NamedExpr) -> ResolvedExpr {
        let kind = match &expr.kind {
            ExprKind::Int(n) => ExprKind::Int(*n),
            ExprKind::Bool(b) => ExprKind::Bool(*b),
            ExprKind::Null => ExprKind::Null,
            ExprKind::Prim(p) => ExprKind::Prim(*p),
            ExprKind::Var(ident) => ExprKind::Var(self.resolve_var(ident)),

            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: self.resolve_rc(operand),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: self.resolve_rc(left),
                right: self.resolve_rc(right),
            },
            ExprKind::App { func, args } => ExprKind::App {
                func: self.resolve_rc(func),
                args: args.iter().map(|a| self.resolve_rc(a)).collect(),
            },
            ExprKind::If {
                test,
                then_branch,
                else_branch,
            } => ExprKind::If {
                test: self.resolve_rc(test),
                then_branch: self.resolve_rc(then_branch),
                else_branch: self.resolve_rc(else_branch),
            },
            ExprKind::Block(exprs) => {
                ExprKind::Block(exprs.iter().map(|e| self.resolve_rc(e)).collect())
            }

            ExprKind::Map { params, body, .. } => {
                self.scopes.push_scope(ScopeKind::Map);
                self.declare_all(params.iter());
                let body = self.resolve_rc(body);
                self.scopes.pop_scope();
                ExprKind::Map {
                    params: Rc::clone(params),
                    layout: FrameLayout {
                        slots: params.len(),
                    },
                    body,
                }
            }

            ExprKind::Let { defs, body, .. } => {
                // Right-hand sides see only the enclosing scope.
                let values: Vec<_> = defs.iter().map(|d| self.resolve_rc(&d.value)).collect();
                self.scopes.push_scope(ScopeKind::Let);
                self.declare_all(defs.iter().map(|d| &d.name));
                let body = self.resolve_rc(body);
                self.scopes.pop_scope();
                ExprKind::Let {
                    defs: rebuild_defs(defs, values),
                    layout: FrameLayout { slots: defs.len() },
                    body,
                }
            }

            ExprKind::LetRec { defs, body, .. } => {
                self.scopes.push_scope(ScopeKind::LetRec);
                self.declare_all(defs.iter().map(|d| &d.name));
                let values: Vec<_> = defs.iter().map(|d| self.resolve_rc(&d.value)).collect();
                let body = self.resolve_rc(body);
                self.scopes.pop_scope();
                ExprKind::LetRec {
                    defs: rebuild_defs(defs, values),
                    layout: FrameLayout { slots: defs.len() },
                    body,
                }
            }
        };
        ResolvedExpr::new(kind, expr.span)
    }

    fn resolve_rc(&mut self, expr: &NamedExpr) -> Rc<ResolvedExpr> {
        Rc::new(self.resolve_expr(expr))
    }

    fn resolve_var(&mut self, ident: &Ident) -> Address {
        match self.scopes.lookup(&ident.name) {
            Some(address) => address,
            None => {
                self.error(
                    ErrorCode::UNBOUND_VARIABLE,
                    format!("unbound variable '{}'", ident.name),
                    ident.span,
                );
                // Placeholder; the tree is discarded once an error is recorded.
                Address::new(0, 0)
            }
        }
    }

    fn declare_all<'a>(&mut self, names: impl Iterator<Item = &'a Ident>) {
        for ident in names {
            if self.scopes.define(&ident.name).is_none() {
                let form = self.scopes.current_kind().map_or("binding form", ScopeKind::describe);
                self.error(
                    ErrorCode::DUPLICATE_DECLARATION,
                    format!("'{}' is declared more than once in the same {form}", ident.name),
                    ident.span,
                );
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Error Reporting
    // ══════════════════════════════════════════════════════════════════════

    fn error(&mut self, code: ErrorCode, message: String, span: Span) {
        self.errors.push_error(JamError::new(code, message, span));
    }
}

fn rebuild_defs(defs: &[Def<Ident>], values: Vec<Rc<ResolvedExpr>>) -> Vec<Def<Address>> {
    defs.iter()
        .zip(values)
        .map(|(def, value)| Def::new(def.name.clone(), value))
        .collect()
}
