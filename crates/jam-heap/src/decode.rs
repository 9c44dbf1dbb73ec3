//! Reading arena cells back as evaluator values.
//!
//! Decoding preserves sharing: every reference cell and closure in the arena
//! becomes exactly one [`Rc`], and every activation one frame, so identity
//! comparisons and cyclic `letrec` environments survive the round trip.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use jam_eval::{Binding, Closure, Deferred, FrameEnv, Pair, ResolvedValue, Slot, Value};
use jam_types::ast::Ident;

use crate::arena::{Addr, Arena};
use crate::code::CodeTable;
use crate::error::{HeapError, HeapResult};
use crate::layout::*;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Decode the value whose cell is at `addr`.
pub fn decode(arena: &Arena, code: &CodeTable, addr: Addr) -> HeapResult<ResolvedValue> {
    Decoder::new(arena, code).value(addr)
}

/// Decodes cells from one arena, memoizing shared structure.
pub struct Decoder<'a> {
    arena: &'a Arena,
    code: &'a CodeTable,
    shared: HashMap<Addr, ResolvedValue>,
    frames: HashMap<Addr, FrameEnv>,
}

impl<'a> Decoder<'a> {
    pub fn new(arena: &'a Arena, code: &'a CodeTable) -> Self {
        Self {
            arena,
            code,
            shared: HashMap::new(),
            frames: HashMap::new(),
        }
    }

    pub fn value(&mut self, addr: Addr) -> HeapResult<ResolvedValue> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.decode_value(addr))
    }

    fn decode_value(&mut self, addr: Addr) -> HeapResult<ResolvedValue> {
        if let Some(value) = self.shared.get(&addr) {
            return Ok(value.clone());
        }
        let tag = self.arena.tag(addr)?;
        match tag {
            TAG_INT => Ok(Value::Int(self.arena.field(addr, INT_VALUE)?)),
            TAG_TRUE => Ok(Value::Bool(true)),
            TAG_FALSE => Ok(Value::Bool(false)),
            TAG_NULL => Ok(Value::Null),
            TAG_UNIT => Ok(Value::Unit),
            TAG_PAIR => self.list(addr),
            TAG_REF => {
                // Registered before the referent so a cell that contains itself terminates.
                let cell = Rc::new(RefCell::new(Value::Unit));
                self.shared.insert(addr, Value::Ref(Rc::clone(&cell)));
                let referent = self.arena.field_addr(addr, REF_REFERENT)?;
                let inner = self.value(referent)?;
                *cell.borrow_mut() = inner;
                Ok(Value::Ref(cell))
            }
            TAG_CLOSURE => self.closure(addr),
            other => tag_prim(other)
                .map(Value::Prim)
                .ok_or(HeapError::CorruptCell { addr: addr.0, tag }),
        }
    }

    /// A chain of pairs, rebuilt from its last cell.
    fn list(&mut self, addr: Addr) -> HeapResult<ResolvedValue> {
        let mut cells = Vec::new();
        let mut cursor = addr;
        while self.arena.tag(cursor)? == TAG_PAIR {
            cells.push(cursor);
            cursor = self.arena.field_addr(cursor, PAIR_TAIL)?;
        }
        let mut list = self.value(cursor)?;
        for &cell in cells.iter().rev() {
            let head = self.arena.field_addr(cell, PAIR_HEAD)?;
            let head = self.value(head)?;
            list = Value::Pair(Rc::new(Pair::new(Deferred::ready(head), Deferred::ready(list))));
        }
        Ok(list)
    }

    fn closure(&mut self, addr: Addr) -> HeapResult<ResolvedValue> {
        let corrupt = HeapError::CorruptCell {
            addr: addr.0,
            tag: TAG_CLOSURE,
        };
        let code = self.code;
        let function = usize::try_from(self.arena.field(addr, CLOSURE_CODE)?)
            .ok()
            .and_then(|index| code.function(index))
            .ok_or_else(|| corrupt.clone())?;
        let params = code
            .binders(function.binders)
            .cloned()
            .ok_or(corrupt)?;
        let env = Addr::from_link(self.arena.field(addr, CLOSURE_ENV)?)?;
        let env = self.frame(env)?;
        // The environment may have reached this closure through a letrec slot.
        if let Some(value) = self.shared.get(&addr) {
            return Ok(value.clone());
        }
        let value = Value::Closure(Rc::new(Closure {
            params,
            layout: function.layout,
            body: Rc::clone(&function.body),
            env,
        }));
        self.shared.insert(addr, value.clone());
        Ok(value)
    }

    /// The environment whose innermost frame is the activation at `link`.
    pub fn frame(&mut self, link: Option<Addr>) -> HeapResult<FrameEnv> {
        let Some(frame) = link else {
            return Ok(FrameEnv::default());
        };
        if let Some(env) = self.frames.get(&frame) {
            return Ok(env.clone());
        }
        let parent = Addr::from_link(self.arena.field(frame, ACTIVATION_PARENT)?)?;
        let parent = self.frame(parent)?;

        let arena = self.arena;
        let words = arena.slots(frame)?;
        let names = self.code.frame_binders(frame);
        let bindings: Vec<Rc<Binding<FrameEnv>>> = (0..words.len())
            .map(|offset| {
                let name = names
                    .and_then(|n| n.get(offset))
                    .cloned()
                    .unwrap_or_else(|| Ident::synthetic(format!("[0,{offset}]")));
                Rc::new(Binding::uninit(name))
            })
            .collect();
        let env = parent.push(bindings.clone());
        self.frames.insert(frame, env.clone());

        for (binding, &word) in bindings.iter().zip(words) {
            if word != UNINIT {
                let value = self.value(Addr::from_word(word)?)?;
                binding.fill(Slot::Ready(value));
            }
        }
        Ok(env)
    }
}
