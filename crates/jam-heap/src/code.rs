//! Out-of-arena program data referenced from cells.
//!
//! Closure cells store an index into the [`CodeTable`] rather than the body
//! itself. The table also remembers the binder names of each activation so
//! decoding can rebuild named bindings.

use std::collections::HashMap;
use std::rc::Rc;

use jam_types::ast::{FrameLayout, Ident, ResolvedExpr};

use crate::arena::Addr;

/// A function body referenced by closure cells.
#[derive(Debug, Clone)]
pub struct Function {
    /// Index of the parameter names in [`CodeTable::binders`].
    pub binders: usize,
    pub layout: FrameLayout,
    pub body: Rc<ResolvedExpr>,
}

#[derive(Debug, Default)]
pub struct CodeTable {
    functions: Vec<Function>,
    binders: Vec<Rc<[Ident]>>,
    frames: HashMap<Addr, usize>,
}

impl CodeTable {
    pub fn add_function(&mut self, function: Function) -> usize {
        self.functions.push(function);
        self.functions.len() - 1
    }

    pub fn function(&self, index: usize) -> Option<&Function> {
        self.functions.get(index)
    }

    pub fn add_binders(&mut self, names: Rc<[Ident]>) -> usize {
        self.binders.push(names);
        self.binders.len() - 1
    }

    pub fn binders(&self, index: usize) -> Option<&Rc<[Ident]>> {
        self.binders.get(index)
    }

    pub(crate) fn record_frame(&mut self, frame: Addr, binders: usize) {
        self.frames.insert(frame, binders);
    }

    /// Names of the slots of the activation at `frame`.
    pub fn frame_binders(&self, frame: Addr) -> Option<&Rc<[Ident]>> {
        self.frames.get(&frame).and_then(|&i| self.binders.get(i))
    }

    /// Number of registered functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
