//! Variable environments for the Jam evaluator.
//!
//! A binding is a shared, mutable [`Deferred`] slot tagged with the name it
//! was declared under. Two environment shapes hold bindings:
//!
//! - [`NamedEnv`]: a persistent association list searched innermost first,
//!   used when evaluating name-addressed programs.
//! - [`FrameEnv`]: a chain of fixed-length frames indexed by
//!   `(depth, offset)`, used when evaluating resolved programs.
//!
//! Both are cheap to clone: extending an environment shares the enclosing one.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use jam_types::ast::{Address, FrameLayout, Ident, Variable};

use crate::error::{EvalError, EvalResult};
use crate::suspension::Suspension;
use crate::value::Value;

// ══════════════════════════════════════════════════════════════════════════════
// Slots
// ══════════════════════════════════════════════════════════════════════════════

/// The state of one binding or one pair component.
pub enum Slot<E: Environment> {
    /// Declared but not yet initialized (`letrec` before its definition runs).
    Uninit,
    /// A value that needs no further work.
    Ready(Value<E>),
    /// Re-evaluated on every access.
    ByName(Rc<Suspension<E>>),
    /// Evaluated on first access, then replaced by [`Slot::Ready`].
    ByNeed(Rc<Suspension<E>>),
    /// A by-need suspension whose evaluation is in progress.
    Forcing,
}

impl<E: Environment> Slot<E> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Slot::Ready(_))
    }
}

/// A mutable slot whose value may still be pending.
pub struct Deferred<E: Environment>(RefCell<Slot<E>>);

impl<E: Environment> Deferred<E> {
    pub fn new(slot: Slot<E>) -> Self {
        Self(RefCell::new(slot))
    }

    pub fn uninit() -> Self {
        Self::new(Slot::Uninit)
    }

    pub fn ready(value: Value<E>) -> Self {
        Self::new(Slot::Ready(value))
    }

    /// Overwrite the slot.
    pub fn fill(&self, slot: Slot<E>) {
        *self.0.borrow_mut() = slot;
    }

    /// The value, if it has already been computed.
    pub fn peek(&self) -> Option<Value<E>> {
        match &*self.0.borrow() {
            Slot::Ready(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Produce the slot's value, evaluating a suspension if necessary.
    ///
    /// `label` names the slot in a forward-reference error.
    pub fn force(&self, label: &str) -> EvalResult<Value<E>> {
        let slot = self.0.borrow();
        let (suspension, memoize) = match &*slot {
            Slot::Ready(v) => return Ok(v.clone()),
            Slot::Uninit | Slot::Forcing => {
                return Err(EvalError::ForwardReference(label.to_string()))
            }
            Slot::ByName(s) => (Rc::clone(s), false),
            Slot::ByNeed(s) => (Rc::clone(s), true),
        };
        drop(slot);

        if !memoize {
            return suspension.force();
        }
        self.0.replace(Slot::Forcing);
        match suspension.force() {
            Ok(value) => {
                self.0.replace(Slot::Ready(value.clone()));
                Ok(value)
            }
            Err(e) => {
                self.0.replace(Slot::ByNeed(suspension));
                Err(e)
            }
        }
    }
}

/// A named binding: the variable it was declared as plus its slot.
pub struct Binding<E: Environment> {
    pub name: Ident,
    pub value: Deferred<E>,
}

impl<E: Environment> Binding<E> {
    pub fn uninit(name: Ident) -> Self {
        Self {
            name,
            value: Deferred::uninit(),
        }
    }

    pub fn force(&self) -> EvalResult<Value<E>> {
        self.value.force(&self.name.name)
    }

    pub fn fill(&self, slot: Slot<E>) {
        self.value.fill(slot);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Environment abstraction
// ══════════════════════════════════════════════════════════════════════════════

/// An environment shape the evaluator can run over.
pub trait Environment: Clone + Default + Sized + 'static {
    /// The variable form this environment resolves.
    type Var: Variable;

    /// Find the binding a variable refers to.
    fn lookup(&self, var: &Self::Var) -> EvalResult<Rc<Binding<Self>>>;

    /// Open a new scope declaring `names`, all initially [`Slot::Uninit`].
    ///
    /// Returns the extended environment and the new bindings in declaration
    /// order, so the caller can fill them.
    fn extend(
        &self,
        names: &[Ident],
        layout: &<Self::Var as Variable>::Layout,
    ) -> (Self, Vec<Rc<Binding<Self>>>);
}

/// Associates each variable form with the environment that evaluates it.
pub trait Scoped: Variable {
    type Env: Environment<Var = Self>;
}

impl Scoped for Ident {
    type Env = NamedEnv;
}

impl Scoped for Address {
    type Env = FrameEnv;
}

// ══════════════════════════════════════════════════════════════════════════════
// Association-list environment
// ══════════════════════════════════════════════════════════════════════════════

struct Link {
    binding: Rc<Binding<NamedEnv>>,
    next: NamedEnv,
}

/// Persistent association list of `(name, binding)`, innermost first.
#[derive(Clone, Default)]
pub struct NamedEnv {
    head: Option<Rc<Link>>,
}

impl NamedEnv {
    /// Names in scope, innermost first.
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = &self.head;
        while let Some(link) = cursor {
            names.push(link.binding.name.name.clone());
            cursor = &link.next.head;
        }
        names
    }
}

impl Environment for NamedEnv {
    type Var = Ident;

    fn lookup(&self, var: &Ident) -> EvalResult<Rc<Binding<Self>>> {
        let mut cursor = &self.head;
        while let Some(link) = cursor {
            if link.binding.name.name == var.name {
                return Ok(Rc::clone(&link.binding));
            }
            cursor = &link.next.head;
        }
        Err(EvalError::UnboundVariable(var.name.clone()))
    }

    fn extend(&self, names: &[Ident], _layout: &()) -> (Self, Vec<Rc<Binding<Self>>>) {
        let bindings: Vec<_> = names
            .iter()
            .map(|n| Rc::new(Binding::uninit(n.clone())))
            .collect();
        let mut env = self.clone();
        for binding in &bindings {
            env = NamedEnv {
                head: Some(Rc::new(Link {
                    binding: Rc::clone(binding),
                    next: env,
                })),
            };
        }
        (env, bindings)
    }
}

impl fmt::Debug for NamedEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Frame-stack environment
// ══════════════════════════════════════════════════════════════════════════════

/// One lexical level: a fixed-length array of slots.
pub struct Frame {
    slots: Vec<Rc<Binding<FrameEnv>>>,
    parent: FrameEnv,
}

impl Frame {
    pub fn slots(&self) -> &[Rc<Binding<FrameEnv>>] {
        &self.slots
    }
}

/// Chain of frames; depth 0 is the innermost.
#[derive(Clone, Default)]
pub struct FrameEnv {
    top: Option<Rc<Frame>>,
}

impl FrameEnv {
    /// Push an already-built frame of bindings.
    pub fn push(&self, slots: Vec<Rc<Binding<FrameEnv>>>) -> Self {
        FrameEnv {
            top: Some(Rc::new(Frame {
                slots,
                parent: self.clone(),
            })),
        }
    }

    /// The innermost frame, if any.
    pub fn top(&self) -> Option<&Rc<Frame>> {
        self.top.as_ref()
    }

    /// Number of frames in the chain.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = &self.top;
        while let Some(frame) = cursor {
            depth += 1;
            cursor = &frame.parent.top;
        }
        depth
    }
}

impl Environment for FrameEnv {
    type Var = Address;

    fn lookup(&self, var: &Address) -> EvalResult<Rc<Binding<Self>>> {
        let mut frame = self.top.as_ref();
        for _ in 0..var.depth {
            frame = frame.and_then(|f| f.parent.top.as_ref());
        }
        frame
            .and_then(|f| f.slots.get(var.offset))
            .map(Rc::clone)
            .ok_or_else(|| EvalError::UnboundVariable(var.to_string()))
    }

    fn extend(&self, names: &[Ident], layout: &FrameLayout) -> (Self, Vec<Rc<Binding<Self>>>) {
        debug_assert_eq!(names.len(), layout.slots, "frame layout disagrees with binders");
        let bindings: Vec<_> = names
            .iter()
            .map(|n| Rc::new(Binding::uninit(n.clone())))
            .collect();
        (self.push(bindings.clone()), bindings)
    }
}

impl fmt::Debug for FrameEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameEnv(depth {})", self.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::synthetic(name)
    }

    #[test]
    fn named_lookup_finds_innermost() {
        let (outer, b) = NamedEnv::default().extend(&[ident("x")], &());
        b[0].fill(Slot::Ready(Value::Int(1)));
        let (inner, b) = outer.extend(&[ident("x"), ident("y")], &());
        b[0].fill(Slot::Ready(Value::Int(2)));
        assert_eq!(inner.names(), vec!["y", "x", "x"]);
        let found = inner.lookup(&ident("x")).unwrap().force().unwrap();
        assert!(matches!(found, Value::Int(2)));
        assert!(matches!(
            inner.lookup(&ident("z")),
            Err(EvalError::UnboundVariable(name)) if name == "z"
        ));
    }

    #[test]
    fn uninit_slot_is_forward_reference() {
        let (env, _) = NamedEnv::default().extend(&[ident("f")], &());
        let err = env.lookup(&ident("f")).unwrap().force().unwrap_err();
        assert_eq!(err, EvalError::ForwardReference("f".into()));
    }

    #[test]
    fn frame_lookup_by_address() {
        let (outer, b) = FrameEnv::default().extend(&[ident("a"), ident("b")], &FrameLayout { slots: 2 });
        b[1].fill(Slot::Ready(Value::Bool(true)));
        let (inner, _) = outer.extend(&[ident("c")], &FrameLayout { slots: 1 });
        assert_eq!(inner.depth(), 2);
        let binding = inner.lookup(&Address::new(1, 1)).unwrap();
        assert_eq!(binding.name.name, "b");
        assert!(matches!(binding.force().unwrap(), Value::Bool(true)));
        assert!(inner.lookup(&Address::new(2, 0)).is_err());
        assert!(inner.lookup(&Address::new(0, 3)).is_err());
    }
}
