//! Built-in primitive functions.
//!
//! Every primitive except `cons` evaluates its arguments eagerly. `cons`
//! binds head and tail according to the cons policy.

use std::rc::Rc;

use jam_types::ast::{Expr, Prim};

use crate::env::{Deferred, Environment, Slot};
use crate::error::{EvalError, EvalResult};
use crate::evaluator::Evaluator;
use crate::policy::Policy;
use crate::value::{Pair, Value};

impl<E: Environment> Evaluator<E> {
    pub(crate) fn apply_prim(
        &self,
        prim: Prim,
        args: &[Rc<Expr<E::Var>>],
        env: &E,
    ) -> EvalResult<Value<E>> {
        if args.len() != prim.arity() {
            return Err(EvalError::ArityMismatch {
                callee: prim.name().to_string(),
                expected: prim.arity(),
                actual: args.len(),
            });
        }
        if prim == Prim::Cons {
            return self.cons(&args[0], &args[1], env);
        }
        let arg = self.eval(&args[0], env)?;
        let result = match prim {
            Prim::IsNumber => Value::Bool(matches!(arg, Value::Int(_))),
            Prim::IsFunction => Value::Bool(arg.is_function()),
            Prim::IsList => Value::Bool(arg.is_list()),
            Prim::IsNull => Value::Bool(matches!(arg, Value::Null)),
            Prim::IsCons => Value::Bool(matches!(arg, Value::Pair(_))),
            Prim::IsRef => Value::Bool(matches!(arg, Value::Ref(_))),
            Prim::Arity => match &arg {
                Value::Closure(c) => Value::Int(c.arity() as i64),
                Value::Prim(p) => Value::Int(p.arity() as i64),
                other => return Err(EvalError::type_mismatch(prim.name(), other)),
            },
            Prim::First => select(prim, &arg, Pair::head)?,
            Prim::Rest => select(prim, &arg, Pair::tail)?,
            Prim::Cons => unreachable!("handled above"),
        };
        Ok(result)
    }

    fn cons(
        &self,
        head: &Rc<Expr<E::Var>>,
        tail: &Rc<Expr<E::Var>>,
        env: &E,
    ) -> EvalResult<Value<E>> {
        let policy = self.config().cons;
        let head = self.defer(head, env, policy)?;
        let tail = self.defer(tail, env, policy)?;
        if policy == Policy::Value {
            if let Slot::Ready(t) = &tail {
                if !t.is_list() {
                    return Err(EvalError::not_a_list(Prim::Cons.name(), t));
                }
            }
        }
        Ok(Value::Pair(Rc::new(Pair::new(
            Deferred::new(head),
            Deferred::new(tail),
        ))))
    }
}

fn select<E: Environment>(
    prim: Prim,
    arg: &Value<E>,
    part: fn(&Pair<E>) -> EvalResult<Value<E>>,
) -> EvalResult<Value<E>> {
    match arg {
        Value::Pair(pair) => part(pair),
        Value::Null => Err(EvalError::type_mismatch(prim.name(), "the empty list ()")),
        other => Err(EvalError::not_a_list(prim.name(), other)),
    }
}
