//! Runtime values.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use jam_types::ast::{Expr, Ident, Prim, Variable};

use crate::env::{Deferred, Environment, FrameEnv, NamedEnv};
use crate::error::{EvalError, EvalResult};

/// A Jam runtime value over environment shape `E`.
pub enum Value<E: Environment> {
    Int(i64),
    Bool(bool),
    /// The empty list.
    Null,
    Pair(Rc<Pair<E>>),
    Closure(Rc<Closure<E>>),
    Prim(Prim),
    /// A mutable reference cell.
    Ref(Rc<RefCell<Value<E>>>),
    /// Result of assignment.
    Unit,
}

/// Value produced by evaluating a name-addressed program.
pub type NamedValue = Value<NamedEnv>;

/// Value produced by evaluating a resolved program.
pub type ResolvedValue = Value<FrameEnv>;

impl<E: Environment> Clone for Value<E> {
    fn clone(&self) -> Self {
        match self {
            Value::Int(n) => Value::Int(*n),
            Value::Bool(b) => Value::Bool(*b),
            Value::Null => Value::Null,
            Value::Pair(p) => Value::Pair(Rc::clone(p)),
            Value::Closure(c) => Value::Closure(Rc::clone(c)),
            Value::Prim(p) => Value::Prim(*p),
            Value::Ref(r) => Value::Ref(Rc::clone(r)),
            Value::Unit => Value::Unit,
        }
    }
}

/// A cons cell. Either component may still be pending.
pub struct Pair<E: Environment> {
    head: Deferred<E>,
    tail: Deferred<E>,
}

impl<E: Environment> Pair<E> {
    pub fn new(head: Deferred<E>, tail: Deferred<E>) -> Self {
        Self { head, tail }
    }

    pub fn head(&self) -> EvalResult<Value<E>> {
        self.head.force("pair head")
    }

    /// The tail, which must be a list.
    pub fn tail(&self) -> EvalResult<Value<E>> {
        let tail = self.tail.force("pair tail")?;
        if tail.is_list() {
            Ok(tail)
        } else {
            Err(EvalError::not_a_list(Prim::Cons.name(), &tail))
        }
    }

    pub fn peek_head(&self) -> Option<Value<E>> {
        self.head.peek()
    }

    pub fn peek_tail(&self) -> Option<Value<E>> {
        self.tail.peek()
    }
}

/// A function value: parameters, body and captured environment.
pub struct Closure<E: Environment> {
    pub params: Rc<[Ident]>,
    pub layout: <E::Var as Variable>::Layout,
    pub body: Rc<Expr<E::Var>>,
    pub env: E,
}

impl<E: Environment> Closure<E> {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl<E: Environment> Value<E> {
    pub fn is_list(&self) -> bool {
        matches!(self, Value::Null | Value::Pair(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Prim(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Pair(_) => "pair",
            Value::Closure(_) => "closure",
            Value::Prim(_) => "primitive",
            Value::Ref(_) => "ref",
            Value::Unit => "unit",
        }
    }

    // ── Equality ──────────────────────────────────────────────────────────

    /// Jam `=`: structural on data, identity on closures and reference cells.
    ///
    /// Lazy pair components are forced, so comparison can fail.
    pub fn equals(&self, other: &Self) -> EvalResult<bool> {
        let (mut left, mut right) = (self.clone(), other.clone());
        loop {
            let (a, b) = match (&left, &right) {
                (Value::Pair(a), Value::Pair(b)) => (Rc::clone(a), Rc::clone(b)),
                (Value::Int(a), Value::Int(b)) => return Ok(a == b),
                (Value::Bool(a), Value::Bool(b)) => return Ok(a == b),
                (Value::Null, Value::Null) | (Value::Unit, Value::Unit) => return Ok(true),
                (Value::Prim(a), Value::Prim(b)) => return Ok(a == b),
                (Value::Closure(a), Value::Closure(b)) => return Ok(Rc::ptr_eq(a, b)),
                (Value::Ref(a), Value::Ref(b)) => return Ok(Rc::ptr_eq(a, b)),
                _ => return Ok(false),
            };
            if Rc::ptr_eq(&a, &b) {
                return Ok(true);
            }
            if !a.head()?.equals(&b.head()?)? {
                return Ok(false);
            }
            left = a.tail()?;
            right = b.tail()?;
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────

    /// Canonical printed form, forcing any pending pair components.
    pub fn render(&self) -> EvalResult<String> {
        let mut out = String::new();
        self.render_into(&mut out)?;
        Ok(out)
    }

    fn render_into(&self, out: &mut String) -> EvalResult<()> {
        match self {
            Value::Pair(pair) => {
                out.push('(');
                let mut cell = Rc::clone(pair);
                loop {
                    cell.head()?.render_into(out)?;
                    match cell.tail()? {
                        Value::Pair(next) => {
                            out.push(' ');
                            cell = next;
                        }
                        _ => break,
                    }
                }
                out.push(')');
            }
            Value::Ref(cell) => {
                out.push_str("(ref ");
                let inner = cell.borrow().clone();
                inner.render_into(out)?;
                out.push(')');
            }
            other => out.push_str(&other.to_string()),
        }
        Ok(())
    }
}

/// Best-effort display that never forces: pending components print as `...`.
impl<E: Environment> fmt::Display for Value<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("()"),
            Value::Unit => f.write_str("unit"),
            Value::Prim(p) => write!(f, "{p}"),
            Value::Closure(c) => write!(f, "<closure/{}>", c.arity()),
            Value::Ref(cell) => match cell.try_borrow() {
                Ok(inner) => write!(f, "(ref {inner})"),
                Err(_) => f.write_str("(ref ...)"),
            },
            Value::Pair(pair) => {
                f.write_str("(")?;
                let mut cell = Rc::clone(pair);
                loop {
                    match cell.peek_head() {
                        Some(head) => write!(f, "{head}")?,
                        None => f.write_str("...")?,
                    }
                    match cell.peek_tail() {
                        Some(Value::Pair(next)) => {
                            f.write_str(" ")?;
                            cell = next;
                        }
                        Some(Value::Null) => break,
                        Some(other) => {
                            write!(f, " . {other}")?;
                            break;
                        }
                        None => {
                            f.write_str(" ...")?;
                            break;
                        }
                    }
                }
                f.write_str(")")
            }
        }
    }
}

impl<E: Environment> fmt::Debug for Value<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
