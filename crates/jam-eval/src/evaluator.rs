//! Core expression evaluator.
//!
//! One [`Evaluator`] walks either syntax form; the environment type `E`
//! decides how variables are found. Binding and cons policies come from the
//! [`EvalConfig`] and are consulted wherever an expression may be deferred.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use jam_types::ast::*;

use crate::env::{Environment, Slot};
use crate::error::{EvalError, EvalResult};
use crate::policy::{EvalConfig, Policy};
use crate::suspension::Suspension;
use crate::value::{Closure, Value};

/// Remaining stack below which evaluation moves to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each additional stack segment.
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// The tree-walking evaluator.
///
/// Cloning is cheap and clones share one depth counter, so suspensions
/// created during a run count against the same limit as the run itself.
pub struct Evaluator<E> {
    config: EvalConfig,
    depth: Rc<Cell<usize>>,
    _env: PhantomData<fn() -> E>,
}

impl<E> Clone for Evaluator<E> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            depth: Rc::clone(&self.depth),
            _env: PhantomData,
        }
    }
}

/// Releases one level of depth when dropped.
pub(crate) struct DepthGuard(Rc<Cell<usize>>);

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

impl<E: Environment> Evaluator<E> {
    pub fn new(config: EvalConfig) -> Self {
        Self {
            config,
            depth: Rc::new(Cell::new(0)),
            _env: PhantomData,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Current nesting of closure calls and suspension forces.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Evaluate a closed program in the empty environment.
    pub fn run(&self, program: &Expr<E::Var>) -> EvalResult<Value<E>> {
        tracing::debug!(config = %self.config, "evaluating program");
        let result = self.eval(program, &E::default());
        if let Err(e) = &result {
            tracing::debug!(error = %e, "evaluation failed");
        }
        result
    }

    /// Count one level of nesting. Fails past `max_depth`.
    pub(crate) fn enter(&self) -> EvalResult<DepthGuard> {
        let depth = self.depth.get() + 1;
        if depth > self.config.max_depth {
            return Err(EvalError::DepthExceeded(self.config.max_depth));
        }
        self.depth.set(depth);
        Ok(DepthGuard(Rc::clone(&self.depth)))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression in `env`.
    pub fn eval(&self, expr: &Expr<E::Var>, env: &E) -> EvalResult<Value<E>> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_expr(expr, env))
    }

    fn eval_expr(&self, expr: &Expr<E::Var>, env: &E) -> EvalResult<Value<E>> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Prim(p) => Ok(Value::Prim(*p)),
            ExprKind::Var(v) => env.lookup(v)?.force(),

            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, env),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, env),
            ExprKind::App { func, args } => self.eval_app(func, args, env),

            ExprKind::Map {
                params,
                layout,
                body,
            } => Ok(Value::Closure(Rc::new(Closure {
                params: Rc::clone(params),
                layout: layout.clone(),
                body: Rc::clone(body),
                env: env.clone(),
            }))),

            ExprKind::If {
                test,
                then_branch,
                else_branch,
            } => match self.eval(test, env)? {
                Value::Bool(true) => self.eval(then_branch, env),
                Value::Bool(false) => self.eval(else_branch, env),
                other => Err(EvalError::type_mismatch("if", other)),
            },

            ExprKind::Let { defs, layout, body } => {
                let (inner, slots) = env.extend(&binders(defs), layout);
                for (def, slot) in defs.iter().zip(&slots) {
                    slot.fill(self.defer(&def.value, env, self.config.binding)?);
                }
                self.eval(body, &inner)
            }
            ExprKind::LetRec { defs, layout, body } => {
                let (inner, slots) = env.extend(&binders(defs), layout);
                for (def, slot) in defs.iter().zip(&slots) {
                    slot.fill(self.defer(&def.value, &inner, self.config.binding)?);
                }
                self.eval(body, &inner)
            }

            ExprKind::Block(exprs) => {
                let mut last = Value::Unit;
                for e in exprs {
                    last = self.eval(e, env)?;
                }
                Ok(last)
            }
        }
    }

    /// Bind `expr` in `env` under `policy`.
    ///
    /// Literals, primitives and `map` are evaluated on the spot under every
    /// policy, so a deferred function is one closure rather than one per access.
    pub(crate) fn defer(
        &self,
        expr: &Rc<Expr<E::Var>>,
        env: &E,
        policy: Policy,
    ) -> EvalResult<Slot<E>> {
        let immediate = matches!(
            expr.kind,
            ExprKind::Int(_) | ExprKind::Bool(_) | ExprKind::Null | ExprKind::Prim(_) | ExprKind::Map { .. }
        );
        if immediate || policy == Policy::Value {
            return Ok(Slot::Ready(self.eval(expr, env)?));
        }
        let suspension = Rc::new(Suspension::new(Rc::clone(expr), env.clone(), self.clone()));
        Ok(match policy {
            Policy::Name => Slot::ByName(suspension),
            _ => Slot::ByNeed(suspension),
        })
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn eval_unary(&self, op: UnaryOp, operand: &Expr<E::Var>, env: &E) -> EvalResult<Value<E>> {
        let value = self.eval(operand, env)?;
        match (op, value) {
            (UnaryOp::Neg, Value::Int(n)) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| EvalError::IntegerOverflow(op.symbol().into())),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Deref, Value::Ref(cell)) => Ok(cell.borrow().clone()),
            (UnaryOp::Ref, value) => Ok(Value::Ref(Rc::new(RefCell::new(value)))),
            (op, other) => Err(EvalError::type_mismatch(op.symbol(), other)),
        }
    }

    fn eval_binary(
        &self,
        op: BinOp,
        left: &Expr<E::Var>,
        right: &Expr<E::Var>,
        env: &E,
    ) -> EvalResult<Value<E>> {
        match op {
            BinOp::And | BinOp::Or => self.eval_logical(op, left, right, env),
            BinOp::Assign => self.eval_assign(left, right, env),
            BinOp::Eq | BinOp::NotEq => {
                let lhs = self.eval(left, env)?;
                let rhs = self.eval(right, env)?;
                let equal = lhs.equals(&rhs)?;
                Ok(Value::Bool(equal == (op == BinOp::Eq)))
            }
            _ => {
                let lhs = self.eval(left, env)?;
                let rhs = self.eval(right, env)?;
                let (a, b) = int_operands(op, &lhs, &rhs)?;
                arithmetic(op, a, b)
            }
        }
    }

    /// `&` and `|`: the right operand is evaluated only when the left one
    /// does not decide the result.
    fn eval_logical(
        &self,
        op: BinOp,
        left: &Expr<E::Var>,
        right: &Expr<E::Var>,
        env: &E,
    ) -> EvalResult<Value<E>> {
        let lhs = self.eval(left, env)?;
        let decided = match (op, &lhs) {
            (BinOp::And, Value::Bool(false)) => true,
            (BinOp::Or, Value::Bool(true)) => true,
            (_, Value::Bool(_)) => false,
            _ => return Err(EvalError::type_mismatch(op.symbol(), lhs)),
        };
        if decided {
            return Ok(lhs);
        }
        match self.eval(right, env)? {
            Value::Bool(b) => Ok(Value::Bool(b)),
            other => Err(EvalError::type_mismatch(op.symbol(), other)),
        }
    }

    fn eval_assign(&self, target: &Expr<E::Var>, value: &Expr<E::Var>, env: &E) -> EvalResult<Value<E>> {
        let cell = match self.eval(target, env)? {
            Value::Ref(cell) => cell,
            other => return Err(EvalError::type_mismatch(BinOp::Assign.symbol(), other)),
        };
        let value = self.eval(value, env)?;
        *cell.borrow_mut() = value;
        Ok(Value::Unit)
    }

    // ── Application ───────────────────────────────────────────────────────

    fn eval_app(&self, func: &Expr<E::Var>, args: &[Rc<Expr<E::Var>>], env: &E) -> EvalResult<Value<E>> {
        match self.eval(func, env)? {
            Value::Closure(closure) => self.apply_closure(func, &closure, args, env),
            Value::Prim(prim) => self.apply_prim(prim, args, env),
            other => Err(EvalError::NotAFunction(other.to_string())),
        }
    }

    fn apply_closure(
        &self,
        func: &Expr<E::Var>,
        closure: &Closure<E>,
        args: &[Rc<Expr<E::Var>>],
        env: &E,
    ) -> EvalResult<Value<E>> {
        if args.len() != closure.arity() {
            return Err(EvalError::ArityMismatch {
                callee: func.to_string(),
                expected: closure.arity(),
                actual: args.len(),
            });
        }
        let (frame, slots) = closure.env.extend(&closure.params, &closure.layout);
        for (arg, slot) in args.iter().zip(&slots) {
            slot.fill(self.defer(arg, env, self.config.binding)?);
        }
        let _depth = self.enter()?;
        tracing::trace!(callee = %func, depth = self.depth(), "applying closure");
        self.eval(&closure.body, &frame)
    }
}

fn binders<V: Variable>(defs: &[Def<V>]) -> Vec<Ident> {
    defs.iter().map(|d| d.name.clone()).collect()
}

fn int_operands<E: Environment>(op: BinOp, lhs: &Value<E>, rhs: &Value<E>) -> EvalResult<(i64, i64)> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok((*a, *b)),
        (Value::Int(_), other) | (other, _) => Err(EvalError::type_mismatch(op.symbol(), other)),
    }
}

fn arithmetic<E: Environment>(op: BinOp, a: i64, b: i64) -> EvalResult<Value<E>> {
    let overflow = || EvalError::IntegerOverflow(op.symbol().into());
    let value = match op {
        BinOp::Add => Value::Int(a.checked_add(b).ok_or_else(overflow)?),
        BinOp::Sub => Value::Int(a.checked_sub(b).ok_or_else(overflow)?),
        BinOp::Mul => Value::Int(a.checked_mul(b).ok_or_else(overflow)?),
        BinOp::Div => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Value::Int(a.checked_div(b).ok_or_else(overflow)?)
        }
        BinOp::Less => Value::Bool(a < b),
        BinOp::LessEq => Value::Bool(a <= b),
        BinOp::Greater => Value::Bool(a > b),
        BinOp::GreaterEq => Value::Bool(a >= b),
        _ => return Err(EvalError::type_mismatch(op.symbol(), "integer operands")),
    };
    Ok(value)
}
