//! Continuation-passing-style conversion.
//!
//! Entry point: [`CpsTransformer::transform`].
//!
//! Every user function gains a trailing continuation parameter and every
//! non-primitive call passes one; the converted program applies the identity
//! continuation `map :x to :x` at top level. Fresh names have the form `:<n>`,
//! which the lexer never produces, so they cannot collide with source names.
//!
//! An expression is *simple* when every non-primitive application in it lies
//! inside a `map` body. Simple expressions are reshaped in place; others are
//! broken into a chain of single-definition `let`s whose right-hand sides are
//! evaluated in source order.
//!
//! Error codes emitted:
//! - E600: `letrec` with a right-hand side that is not simple

use std::rc::Rc;

use jam_types::ast::*;
use jam_types::{CompileErrors, ErrorCode, JamError, Span};

type Node = Rc<NamedExpr>;

/// Owns the fresh-name counter for one conversion.
#[derive(Debug, Default)]
pub struct CpsTransformer {
    counter: usize,
    errors: CompileErrors,
}

impl CpsTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a closed program, applying the identity continuation.
    pub fn transform(mut self, program: &NamedExpr) -> Result<NamedExpr, CompileErrors> {
        let x = Ident::synthetic(":x");
        let identity = NamedExpr::map(vec![x.clone()], NamedExpr::var(x).rc()).rc();
        let converted = self.cps(identity, program);
        tracing::debug!(fresh_names = self.counter, "CPS conversion finished");
        if self.errors.has_errors() {
            return Err(self.errors);
        }
        Ok(Rc::try_unwrap(converted).unwrap_or_else(|rc| (*rc).clone()))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Conversion
    // ══════════════════════════════════════════════════════════════════════

    /// `Cps(k, expr)`: an expression that passes the value of `expr` to `k`.
    fn cps(&mut self, k: Node, expr: &NamedExpr) -> Node {
        if is_simple(expr) {
            let value = self.reshape(expr);
            return apply(k, vec![value]);
        }
        let span = expr.span;
        match &expr.kind {
            ExprKind::App { func, args } if !matches!(func.kind, ExprKind::Prim(_)) => {
                if is_simple(func) && args.iter().all(|a| is_simple(a)) {
                    let func = self.reshape(func);
                    let mut converted: Vec<Node> = args.iter().map(|a| self.reshape(a)).collect();
                    converted.push(k);
                    return NamedExpr::new(ExprKind::App { func, args: converted }, span).rc();
                }
                let mut operands = vec![Rc::clone(func)];
                operands.extend(args.iter().cloned());
                let (temps, mut operands) = self.name_operands(&operands);
                let func = operands.remove(0);
                let call = NamedExpr::new(ExprKind::App { func, args: operands }, span);
                self.cps_chain(k, temps, call)
            }

            ExprKind::App { func, args } => {
                let (temps, args) = self.name_operands(args);
                let call = NamedExpr::new(
                    ExprKind::App {
                        func: Rc::clone(func),
                        args,
                    },
                    span,
                );
                self.cps_chain(k, temps, call)
            }

            ExprKind::Unary { op, operand } => {
                let (temps, mut operands) = self.name_operands(std::slice::from_ref(operand));
                let operand = operands.remove(0);
                let unary = NamedExpr::new(ExprKind::Unary { op: *op, operand }, span);
                self.cps_chain(k, temps, unary)
            }

            ExprKind::Binary {
                op: BinOp::And,
                left,
                right,
            } => {
                // if E1 then E2 & true else false
                let then_branch = NamedExpr::new(
                    ExprKind::Binary {
                        op: BinOp::And,
                        left: Rc::clone(right),
                        right: NamedExpr::bool(true).rc(),
                    },
                    right.span,
                );
                let rewritten =
                    NamedExpr::if_(Rc::clone(left), then_branch.rc(), NamedExpr::bool(false).rc());
                self.cps(k, &rewritten)
            }
            ExprKind::Binary {
                op: BinOp::Or,
                left,
                right,
            } => {
                // if E1 then true else E2 | false
                let else_branch = NamedExpr::new(
                    ExprKind::Binary {
                        op: BinOp::Or,
                        left: Rc::clone(right),
                        right: NamedExpr::bool(false).rc(),
                    },
                    right.span,
                );
                let rewritten =
                    NamedExpr::if_(Rc::clone(left), NamedExpr::bool(true).rc(), else_branch.rc());
                self.cps(k, &rewritten)
            }
            ExprKind::Binary { op, left, right } => {
                let (temps, mut operands) = self.name_operands(&[Rc::clone(left), Rc::clone(right)]);
                let right = operands.remove(1);
                let left = operands.remove(0);
                let binary = NamedExpr::new(ExprKind::Binary { op: *op, left, right }, span);
                self.cps_chain(k, temps, binary)
            }

            ExprKind::If {
                test,
                then_branch,
                else_branch,
            } => {
                if !is_simple(test) {
                    let t = self.fresh();
                    let branch = NamedExpr::new(
                        ExprKind::If {
                            test: NamedExpr::var(t.clone()).rc(),
                            then_branch: Rc::clone(then_branch),
                            else_branch: Rc::clone(else_branch),
                        },
                        span,
                    );
                    return self.cps_chain(k, vec![(t, Rc::clone(test))], branch);
                }
                let test = self.reshape(test);
                self.with_shared(k, |this, k| {
                    let then_branch = this.cps(Rc::clone(&k), then_branch);
                    let else_branch = this.cps(k, else_branch);
                    NamedExpr::new(
                        ExprKind::If {
                            test,
                            then_branch,
                            else_branch,
                        },
                        span,
                    )
                    .rc()
                })
            }

            ExprKind::Let { defs, body, .. } => self.cps_let(k, defs, body, span),

            ExprKind::LetRec { defs, body, .. } => {
                if let Some(def) = defs.iter().find(|d| !is_simple(&d.value)) {
                    self.error(
                        ErrorCode::NON_SIMPLE_RECURSIVE_BINDING,
                        format!(
                            "letrec definition of '{}' must not call a function outside a map body",
                            def.name
                        ),
                        def.name.span,
                    );
                    return Rc::new(expr.clone());
                }
                let values: Vec<_> = defs.iter().map(|d| self.reshape(&d.value)).collect();
                self.with_shared(k, |this, k| {
                    let body = this.cps(k, body);
                    NamedExpr::new(
                        ExprKind::LetRec {
                            defs: rebind(defs, values),
                            layout: (),
                            body,
                        },
                        span,
                    )
                    .rc()
                })
            }

            ExprKind::Block(exprs) => self.cps_sequence(k, exprs),

            // Literals, variables, primitives and maps are always simple.
            ExprKind::Int(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::Var(_)
            | ExprKind::Prim(_)
            | ExprKind::Map { .. } => unreachable!("handled above"),
        }
    }

    fn cps_let(&mut self, k: Node, defs: &[Def<Ident>], body: &Node, span: Span) -> Node {
        if defs.iter().all(|d| is_simple(&d.value)) {
            let values: Vec<_> = defs.iter().map(|d| self.reshape(&d.value)).collect();
            return self.with_shared(k, |this, k| {
                let body = this.cps(k, body);
                NamedExpr::new(
                    ExprKind::Let {
                        defs: rebind(defs, values),
                        layout: (),
                        body,
                    },
                    span,
                )
                .rc()
            });
        }

        if let [def] = defs {
            // Cps(map x to Cps(k, B), E)
            return self.with_shared(k, |this, k| {
                let inner = this.cps(k, body);
                let continuation = NamedExpr::map(vec![def.name.clone()], inner).rc();
                this.cps(continuation, &def.value)
            });
        }

        // Evaluate each right-hand side into a temporary, then rebind every
        // source name at once so none of them sees another.
        let (temps, values) = self.name_operands(&defs.iter().map(|d| Rc::clone(&d.value)).collect::<Vec<_>>());
        let rebound = NamedExpr::new(
            ExprKind::Let {
                defs: rebind(defs, values),
                layout: (),
                body: Rc::clone(body),
            },
            span,
        );
        self.cps_chain(k, temps, rebound)
    }

    /// `Cps(k, {E1; ...; En})`.
    ///
    /// Every component but the last is forced inside a block before the rest
    /// runs: a simple one becomes `{R(Ei); rest}`, any other passes its value
    /// to `map t to {t; rest}`. A discarded value is never left as an unused
    /// binding, which lazy binding would skip.
    fn cps_sequence(&mut self, k: Node, exprs: &[Node]) -> Node {
        let (first, rest) = match exprs {
            [] => return self.cps(k, &NamedExpr::null()),
            [last] => return self.cps(k, last),
            [first, rest @ ..] => (first, rest),
        };
        if is_simple(first) {
            let value = self.reshape(first);
            let rest = self.cps_sequence(k, rest);
            return NamedExpr::block(vec![value, rest]).rc();
        }
        let t = self.fresh();
        let rest = self.cps_sequence(k, rest);
        let forced = NamedExpr::block(vec![NamedExpr::var(t.clone()).rc(), rest]).rc();
        let continuation = NamedExpr::map(vec![t], forced).rc();
        self.cps(continuation, first)
    }

    /// `Cps(k, let t1 := E1; in ... let tn := En; in body)` for fresh `ti`.
    fn cps_chain(&mut self, k: Node, temps: Vec<(Ident, Node)>, body: NamedExpr) -> Node {
        let mut temps = temps.into_iter();
        let Some((name, value)) = temps.next() else {
            return self.cps(k, &body);
        };
        let rest = temps.collect();
        if is_simple(&value) {
            let value = self.reshape(&value);
            let body = self.cps_chain(k, rest, body);
            return NamedExpr::let_(vec![Def::new(name, value)], body).rc();
        }
        let inner = self.cps_chain(k, rest, body);
        let continuation = NamedExpr::map(vec![name], inner).rc();
        self.cps(continuation, &value)
    }

    /// Replace every operand that is not atomic by a fresh temporary.
    ///
    /// Returns the temporaries with their expressions, in source order, and
    /// the operands to use in their place.
    fn name_operands(&mut self, operands: &[Node]) -> (Vec<(Ident, Node)>, Vec<Node>) {
        let mut temps = Vec::new();
        let mut replaced = Vec::with_capacity(operands.len());
        for operand in operands {
            if is_atomic(operand) {
                replaced.push(Rc::clone(operand));
            } else {
                let t = self.fresh();
                replaced.push(NamedExpr::var(t.clone()).rc());
                temps.push((t, Rc::clone(operand)));
            }
        }
        (temps, replaced)
    }

    /// Bind `k` to a fresh name first unless it is already a variable, so it
    /// can be duplicated or placed under a source binder.
    fn with_shared(&mut self, k: Node, build: impl FnOnce(&mut Self, Node) -> Node) -> Node {
        if matches!(k.kind, ExprKind::Var(_)) {
            return build(self, k);
        }
        let name = self.fresh();
        let body = build(self, NamedExpr::var(name.clone()).rc());
        NamedExpr::let_(vec![Def::new(name, k)], body).rc()
    }

    // ══════════════════════════════════════════════════════════════════════
    // Reshaping
    // ══════════════════════════════════════════════════════════════════════

    /// `R(expr)` for a simple expression: functions take a continuation.
    fn reshape(&mut self, expr: &NamedExpr) -> Node {
        let span = expr.span;
        let kind = match &expr.kind {
            ExprKind::Int(_) | ExprKind::Bool(_) | ExprKind::Null | ExprKind::Var(_) => {
                return Rc::new(expr.clone())
            }
            ExprKind::Prim(prim) => return self.reshape_prim(*prim),

            ExprKind::Map { params, body, .. } => {
                let k = self.fresh();
                let body = self.cps(NamedExpr::var(k.clone()).rc(), body);
                let mut params = params.to_vec();
                params.push(k);
                ExprKind::Map {
                    params: params.into(),
                    layout: (),
                    body,
                }
            }

            // arity(S) => arity(R(S)) - 1
            ExprKind::App { func, args } if matches!(func.kind, ExprKind::Prim(Prim::Arity)) => {
                let args = args.iter().map(|a| self.reshape(a)).collect();
                let call = NamedExpr::new(ExprKind::App { func: Rc::clone(func), args }, span);
                ExprKind::Binary {
                    op: BinOp::Sub,
                    left: call.rc(),
                    right: NamedExpr::int(1).rc(),
                }
            }
            // Primitives in operator position keep their arity.
            ExprKind::App { func, args } => ExprKind::App {
                func: Rc::clone(func),
                args: args.iter().map(|a| self.reshape(a)).collect(),
            },

            ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: *op,
                operand: self.reshape(operand),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: self.reshape(left),
                right: self.reshape(right),
            },
            ExprKind::If {
                test,
                then_branch,
                else_branch,
            } => ExprKind::If {
                test: self.reshape(test),
                then_branch: self.reshape(then_branch),
                else_branch: self.reshape(else_branch),
            },
            ExprKind::Let { defs, body, .. } => {
                let values: Vec<_> = defs.iter().map(|d| self.reshape(&d.value)).collect();
                ExprKind::Let {
                    defs: rebind(defs, values),
                    layout: (),
                    body: self.reshape(body),
                }
            }
            ExprKind::LetRec { defs, body, .. } => {
                let values: Vec<_> = defs.iter().map(|d| self.reshape(&d.value)).collect();
                ExprKind::LetRec {
                    defs: rebind(defs, values),
                    layout: (),
                    body: self.reshape(body),
                }
            }
            ExprKind::Block(exprs) => ExprKind::Block(exprs.iter().map(|e| self.reshape(e)).collect()),
        };
        NamedExpr::new(kind, span).rc()
    }

    /// A primitive used as a value becomes a function taking a continuation:
    /// `map :a.., :k to :k(prim(:a..))`, with `arity` reporting source arity.
    fn reshape_prim(&mut self, prim: Prim) -> Node {
        let params: Vec<Ident> = (0..prim.arity()).map(|_| self.fresh()).collect();
        let k = self.fresh();
        let args = params.iter().map(|p| NamedExpr::var(p.clone()).rc()).collect();
        let mut result = NamedExpr::app(NamedExpr::prim(prim).rc(), args);
        if prim == Prim::Arity {
            result = NamedExpr::binary(BinOp::Sub, result.rc(), NamedExpr::int(1).rc());
        }
        let body = apply(NamedExpr::var(k.clone()).rc(), vec![result.rc()]);
        let mut all = params;
        all.push(k);
        NamedExpr::map(all, body).rc()
    }

    // ══════════════════════════════════════════════════════════════════════
    // Helpers
    // ══════════════════════════════════════════════════════════════════════

    fn fresh(&mut self) -> Ident {
        self.counter += 1;
        let name = format!(":{}", self.counter);
        tracing::trace!(%name, "fresh CPS name");
        Ident::synthetic(name)
    }

    fn error(&mut self, code: ErrorCode, message: String, span: Span) {
        self.errors.push_error(JamError::new(code, message, span));
    }
}

/// `true` if every non-primitive application lies inside a `map` body.
pub fn is_simple(expr: &NamedExpr) -> bool {
    match &expr.kind {
        ExprKind::Int(_)
        | ExprKind::Bool(_)
        | ExprKind::Null
        | ExprKind::Var(_)
        | ExprKind::Prim(_)
        | ExprKind::Map { .. } => true,
        ExprKind::Unary { operand, .. } => is_simple(operand),
        ExprKind::Binary { left, right, .. } => is_simple(left) && is_simple(right),
        ExprKind::App { func, args } => {
            matches!(func.kind, ExprKind::Prim(_)) && args.iter().all(|a| is_simple(a))
        }
        ExprKind::If {
            test,
            then_branch,
            else_branch,
        } => is_simple(test) && is_simple(then_branch) && is_simple(else_branch),
        ExprKind::Let { defs, body, .. } | ExprKind::LetRec { defs, body, .. } => {
            defs.iter().all(|d| is_simple(&d.value)) && is_simple(body)
        }
        ExprKind::Block(exprs) => exprs.iter().all(|e| is_simple(e)),
    }
}

/// Operands that can be evaluated in any position without observable effect
/// on ordering.
fn is_atomic(expr: &NamedExpr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Int(_)
            | ExprKind::Bool(_)
            | ExprKind::Null
            | ExprKind::Var(_)
            | ExprKind::Prim(_)
            | ExprKind::Map { .. }
    )
}

fn apply(func: Node, args: Vec<Node>) -> Node {
    NamedExpr::app(func, args).rc()
}

fn rebind(defs: &[Def<Ident>], values: Vec<Node>) -> Vec<Def<Ident>> {
    defs.iter()
        .zip(values)
        .map(|(def, value)| Def::new(def.name.clone(), value))
        .collect()
}
