//! Deferred computations.

use std::fmt;
use std::rc::Rc;

use jam_types::ast::Expr;

use crate::env::Environment;
use crate::error::EvalResult;
use crate::evaluator::Evaluator;
use crate::value::Value;

/// An unevaluated expression closed over its environment.
///
/// The suspension carries the evaluator it was created under, so forcing it
/// needs no other context: a value can be rendered or compared long after the
/// evaluation that built it returned.
pub struct Suspension<E: Environment> {
    expr: Rc<Expr<E::Var>>,
    env: E,
    machine: Evaluator<E>,
}

impl<E: Environment> Suspension<E> {
    pub fn new(expr: Rc<Expr<E::Var>>, env: E, machine: Evaluator<E>) -> Self {
        Self { expr, env, machine }
    }

    pub fn expr(&self) -> &Expr<E::Var> {
        &self.expr
    }

    /// Evaluate the suspended expression.
    pub fn force(&self) -> EvalResult<Value<E>> {
        let _depth = self.machine.enter()?;
        tracing::trace!(expr = %self.expr, "forcing suspension");
        self.machine.eval(&self.expr, &self.env)
    }
}

impl<E: Environment> fmt::Debug for Suspension<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<suspension {}>", self.expr)
    }
}
