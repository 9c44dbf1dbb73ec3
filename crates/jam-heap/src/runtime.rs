//! Eager evaluation of resolved programs into an [`Arena`].
//!
//! Every intermediate value is a cell: integers, pairs, reference cells and
//! closures are bump-allocated, while booleans, null, unit and primitives
//! resolve to their singleton cells. Closure calls and `let` forms allocate
//! activation records whose parent link is the defining environment.
//!
//! Semantics match the tree-walking evaluator under `binding=value
//! cons=value`, including which error a failing program raises.

use std::collections::HashMap;
use std::rc::Rc;

use jam_eval::{EvalError, DEFAULT_MAX_DEPTH};
use jam_types::ast::*;
use serde::{Deserialize, Serialize};

use crate::arena::{Addr, Arena};
use crate::code::Function;
use crate::decode::decode;
use crate::error::{HeapError, HeapResult};
use crate::layout::*;

const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Arena runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Arena size in words, counting the reserved region.
    pub capacity: usize,
    /// Maximum nesting of closure calls.
    pub max_depth: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl HeapConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Evaluates resolved programs into a borrowed arena.
pub struct HeapRuntime<'a> {
    arena: &'a mut Arena,
    config: HeapConfig,
    depth: usize,
    /// Code index per `map` body already registered.
    functions: HashMap<*const ResolvedExpr, usize>,
    /// Binder-list index per `let`/`letrec` seen during the current run.
    binders: HashMap<*const Def<Address>, usize>,
}

impl<'a> HeapRuntime<'a> {
    pub fn new(arena: &'a mut Arena, config: HeapConfig) -> Self {
        Self {
            arena,
            config,
            depth: 0,
            functions: HashMap::new(),
            binders: HashMap::new(),
        }
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Current nesting of closure calls.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Evaluate a closed program and return the address of its result cell.
    pub fn run(&mut self, program: &ResolvedExpr) -> HeapResult<Addr> {
        self.binders.clear();
        self.depth = 0;
        let start = self.arena.used();
        tracing::debug!(capacity = self.arena.capacity(), used = start, "evaluating into arena");
        let result = self.eval(program, None);
        match &result {
            Ok(addr) => tracing::debug!(
                result = %addr,
                words = self.arena.used() - start,
                "arena evaluation finished"
            ),
            Err(e) => tracing::debug!(error = %e, "arena evaluation failed"),
        }
        result
    }

    fn eval(&mut self, expr: &ResolvedExpr, env: Option<Addr>) -> HeapResult<Addr> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_expr(expr, env))
    }

    fn eval_expr(&mut self, expr: &ResolvedExpr, env: Option<Addr>) -> HeapResult<Addr> {
        match &expr.kind {
            ExprKind::Int(n) => self.alloc_int(*n),
            ExprKind::Bool(b) => Ok(Addr::bool(*b)),
            ExprKind::Null => Ok(Addr::NULL),
            ExprKind::Prim(p) => Ok(Addr::prim(*p)),
            ExprKind::Var(var) => self.lookup(var, env),

            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, env),
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, env),
            ExprKind::App { func, args } => self.eval_app(func, args, env),
            ExprKind::Map {
                params,
                layout,
                body,
            } => self.alloc_closure(params, *layout, body, env),

            ExprKind::If {
                test,
                then_branch,
                else_branch,
            } => {
                let test = self.eval(test, env)?;
                match test {
                    Addr::TRUE => self.eval(then_branch, env),
                    Addr::FALSE => self.eval(else_branch, env),
                    other => Err(self.type_mismatch("if", other)),
                }
            }

            ExprKind::Let { defs, layout, body } => {
                debug_assert_eq!(defs.len(), layout.slots);
                let mut slots = Vec::with_capacity(defs.len());
                for def in defs {
                    slots.push(self.eval(&def.value, env)?.to_word());
                }
                let binders = self.let_binders(defs);
                let frame = self.alloc_frame(env, &slots, binders)?;
                self.eval(body, Some(frame))
            }
            ExprKind::LetRec { defs, layout, body } => {
                debug_assert_eq!(defs.len(), layout.slots);
                let binders = self.let_binders(defs);
                let frame = self.alloc_frame(env, &vec![UNINIT; defs.len()], binders)?;
                for (i, def) in defs.iter().enumerate() {
                    let value = self.eval(&def.value, Some(frame))?;
                    self.arena
                        .set_field(frame, ACTIVATION_SLOTS + i, value.to_word())?;
                }
                self.eval(body, Some(frame))
            }

            ExprKind::Block(exprs) => {
                let mut last = Addr::UNIT;
                for e in exprs {
                    last = self.eval(e, env)?;
                }
                Ok(last)
            }
        }
    }

    // ── Variables and frames ──────────────────────────────────────────────

    fn lookup(&self, var: &Address, env: Option<Addr>) -> HeapResult<Addr> {
        let unbound = || HeapError::Eval(EvalError::UnboundVariable(var.to_string()));
        let mut frame = env.ok_or_else(unbound)?;
        for _ in 0..var.depth {
            let parent = self.arena.field(frame, ACTIVATION_PARENT)?;
            frame = Addr::from_link(parent)?.ok_or_else(unbound)?;
        }
        let word = *self
            .arena
            .slots(frame)?
            .get(var.offset)
            .ok_or_else(unbound)?;
        if word == UNINIT {
            let name = self
                .arena
                .code()
                .frame_binders(frame)
                .and_then(|names| names.get(var.offset))
                .map_or_else(|| var.to_string(), |n| n.name.clone());
            return Err(EvalError::ForwardReference(name).into());
        }
        Addr::from_word(word)
    }

    fn alloc_frame(&mut self, parent: Option<Addr>, slots: &[i64], binders: usize) -> HeapResult<Addr> {
        let mut cell = Vec::with_capacity(ACTIVATION_SLOTS + slots.len());
        cell.extend([TAG_ACTIVATION, Addr::to_link(parent), slots.len() as i64]);
        cell.extend_from_slice(slots);
        let frame = self.arena.alloc(&cell)?;
        self.arena.code_mut().record_frame(frame, binders);
        tracing::trace!(%frame, slots = slots.len(), "activation");
        Ok(frame)
    }

    fn let_binders(&mut self, defs: &[Def<Address>]) -> usize {
        let key = defs.as_ptr();
        if let Some(&index) = self.binders.get(&key) {
            return index;
        }
        let names: Rc<[Ident]> = defs.iter().map(|d| d.name.clone()).collect();
        let index = self.arena.code_mut().add_binders(names);
        self.binders.insert(key, index);
        index
    }

    fn alloc_closure(
        &mut self,
        params: &Rc<[Ident]>,
        layout: FrameLayout,
        body: &Rc<ResolvedExpr>,
        env: Option<Addr>,
    ) -> HeapResult<Addr> {
        let key = Rc::as_ptr(body);
        let code = match self.functions.get(&key) {
            Some(&index) => index,
            None => {
                let table = self.arena.code_mut();
                let binders = table.add_binders(Rc::clone(params));
                let index = table.add_function(Function {
                    binders,
                    layout,
                    body: Rc::clone(body),
                });
                self.functions.insert(key, index);
                index
            }
        };
        self.arena.alloc(&[
            TAG_CLOSURE,
            params.len() as i64,
            code as i64,
            Addr::to_link(env),
        ])
    }

    fn alloc_int(&mut self, n: i64) -> HeapResult<Addr> {
        self.arena.alloc(&[TAG_INT, n])
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn eval_unary(&mut self, op: UnaryOp, operand: &ResolvedExpr, env: Option<Addr>) -> HeapResult<Addr> {
        let value = self.eval(operand, env)?;
        match (op, self.arena.tag(value)?) {
            (UnaryOp::Neg, TAG_INT) => {
                let n = self.arena.field(value, INT_VALUE)?;
                let negated = n
                    .checked_neg()
                    .ok_or_else(|| EvalError::IntegerOverflow(op.symbol().into()))?;
                self.alloc_int(negated)
            }
            (UnaryOp::Not, TAG_TRUE) => Ok(Addr::FALSE),
            (UnaryOp::Not, TAG_FALSE) => Ok(Addr::TRUE),
            (UnaryOp::Deref, TAG_REF) => self.arena.field_addr(value, REF_REFERENT),
            (UnaryOp::Ref, _) => self.arena.alloc(&[TAG_REF, value.to_word()]),
            _ => Err(self.type_mismatch(op.symbol(), value)),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        left: &ResolvedExpr,
        right: &ResolvedExpr,
        env: Option<Addr>,
    ) -> HeapResult<Addr> {
        match op {
            BinOp::And | BinOp::Or => self.eval_logical(op, left, right, env),
            BinOp::Assign => {
                let target = self.eval(left, env)?;
                if self.arena.tag(target)? != TAG_REF {
                    return Err(self.type_mismatch(op.symbol(), target));
                }
                let value = self.eval(right, env)?;
                self.arena.set_field(target, REF_REFERENT, value.to_word())?;
                Ok(Addr::UNIT)
            }
            BinOp::Eq | BinOp::NotEq => {
                let lhs = self.eval(left, env)?;
                let rhs = self.eval(right, env)?;
                let equal = self.equals(lhs, rhs)?;
                Ok(Addr::bool(equal == (op == BinOp::Eq)))
            }
            _ => {
                let lhs = self.eval(left, env)?;
                let rhs = self.eval(right, env)?;
                let a = self.int_operand(op, lhs)?;
                let b = self.int_operand(op, rhs)?;
                self.arithmetic(op, a, b)
            }
        }
    }

    fn eval_logical(
        &mut self,
        op: BinOp,
        left: &ResolvedExpr,
        right: &ResolvedExpr,
        env: Option<Addr>,
    ) -> HeapResult<Addr> {
        let lhs = self.eval(left, env)?;
        let decided = match (op, lhs) {
            (BinOp::And, Addr::FALSE) | (BinOp::Or, Addr::TRUE) => true,
            (_, Addr::TRUE | Addr::FALSE) => false,
            _ => return Err(self.type_mismatch(op.symbol(), lhs)),
        };
        if decided {
            return Ok(lhs);
        }
        match self.eval(right, env)? {
            rhs @ (Addr::TRUE | Addr::FALSE) => Ok(rhs),
            other => Err(self.type_mismatch(op.symbol(), other)),
        }
    }

    fn int_operand(&self, op: BinOp, value: Addr) -> HeapResult<i64> {
        if self.arena.tag(value)? == TAG_INT {
            self.arena.field(value, INT_VALUE)
        } else {
            Err(self.type_mismatch(op.symbol(), value))
        }
    }

    fn arithmetic(&mut self, op: BinOp, a: i64, b: i64) -> HeapResult<Addr> {
        let overflow = || EvalError::IntegerOverflow(op.symbol().into());
        let n = match op {
            BinOp::Add => a.checked_add(b).ok_or_else(overflow)?,
            BinOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
            BinOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
            BinOp::Div => {
                if b == 0 {
                    return Err(EvalError::DivisionByZero.into());
                }
                a.checked_div(b).ok_or_else(overflow)?
            }
            BinOp::Less => return Ok(Addr::bool(a < b)),
            BinOp::LessEq => return Ok(Addr::bool(a <= b)),
            BinOp::Greater => return Ok(Addr::bool(a > b)),
            BinOp::GreaterEq => return Ok(Addr::bool(a >= b)),
            _ => {
                return Err(EvalError::TypeMismatch {
                    op: op.symbol().into(),
                    value: "integer operands".into(),
                }
                .into())
            }
        };
        self.alloc_int(n)
    }

    /// Structural on integers and pairs; identity on every other cell.
    fn equals(&self, mut a: Addr, mut b: Addr) -> HeapResult<bool> {
        loop {
            if a == b {
                return Ok(true);
            }
            match (self.arena.tag(a)?, self.arena.tag(b)?) {
                (TAG_INT, TAG_INT) => {
                    return Ok(self.arena.field(a, INT_VALUE)? == self.arena.field(b, INT_VALUE)?)
                }
                (TAG_PAIR, TAG_PAIR) => {
                    let heads = (
                        self.arena.field_addr(a, PAIR_HEAD)?,
                        self.arena.field_addr(b, PAIR_HEAD)?,
                    );
                    if !self.equals(heads.0, heads.1)? {
                        return Ok(false);
                    }
                    a = self.arena.field_addr(a, PAIR_TAIL)?;
                    b = self.arena.field_addr(b, PAIR_TAIL)?;
                }
                _ => return Ok(false),
            }
        }
    }

    // ── Application ───────────────────────────────────────────────────────

    fn eval_app(&mut self, func: &ResolvedExpr, args: &[Rc<ResolvedExpr>], env: Option<Addr>) -> HeapResult<Addr> {
        let callee = self.eval(func, env)?;
        let tag = self.arena.tag(callee)?;
        if tag == TAG_CLOSURE {
            return self.apply_closure(func, callee, args, env);
        }
        if let Some(prim) = tag_prim(tag) {
            return self.apply_prim(prim, args, env);
        }
        Err(EvalError::NotAFunction(self.describe(callee)).into())
    }

    fn apply_closure(
        &mut self,
        func: &ResolvedExpr,
        closure: Addr,
        args: &[Rc<ResolvedExpr>],
        env: Option<Addr>,
    ) -> HeapResult<Addr> {
        let corrupt = HeapError::CorruptCell {
            addr: closure.0,
            tag: TAG_CLOSURE,
        };
        let arity = usize::try_from(self.arena.field(closure, CLOSURE_ARITY)?)
            .map_err(|_| corrupt.clone())?;
        if args.len() != arity {
            return Err(EvalError::ArityMismatch {
                callee: func.to_string(),
                expected: arity,
                actual: args.len(),
            }
            .into());
        }
        let function = usize::try_from(self.arena.field(closure, CLOSURE_CODE)?)
            .ok()
            .and_then(|index| self.arena.code().function(index))
            .cloned()
            .ok_or(corrupt)?;
        let parent = Addr::from_link(self.arena.field(closure, CLOSURE_ENV)?)?;

        let mut slots = Vec::with_capacity(arity);
        for arg in args {
            slots.push(self.eval(arg, env)?.to_word());
        }
        let frame = self.alloc_frame(parent, &slots, function.binders)?;

        if self.depth >= self.config.max_depth {
            return Err(EvalError::DepthExceeded(self.config.max_depth).into());
        }
        self.depth += 1;
        tracing::trace!(callee = %func, depth = self.depth, %frame, "applying closure");
        let result = self.eval(&function.body, Some(frame));
        self.depth -= 1;
        result
    }

    fn apply_prim(&mut self, prim: Prim, args: &[Rc<ResolvedExpr>], env: Option<Addr>) -> HeapResult<Addr> {
        if args.len() != prim.arity() {
            return Err(EvalError::ArityMismatch {
                callee: prim.name().to_string(),
                expected: prim.arity(),
                actual: args.len(),
            }
            .into());
        }
        if prim == Prim::Cons {
            let head = self.eval(&args[0], env)?;
            let tail = self.eval(&args[1], env)?;
            if !matches!(self.arena.tag(tail)?, TAG_NULL | TAG_PAIR) {
                return Err(EvalError::NotAList {
                    prim: prim.name().into(),
                    value: self.describe(tail),
                }
                .into());
            }
            return self.arena.alloc(&[TAG_PAIR, head.to_word(), tail.to_word()]);
        }

        let arg = self.eval(&args[0], env)?;
        let tag = self.arena.tag(arg)?;
        let result = match prim {
            Prim::IsNumber => Addr::bool(tag == TAG_INT),
            Prim::IsFunction => Addr::bool(tag == TAG_CLOSURE || tag_prim(tag).is_some()),
            Prim::IsList => Addr::bool(matches!(tag, TAG_NULL | TAG_PAIR)),
            Prim::IsNull => Addr::bool(tag == TAG_NULL),
            Prim::IsCons => Addr::bool(tag == TAG_PAIR),
            Prim::IsRef => Addr::bool(tag == TAG_REF),
            Prim::Arity => {
                let n = match tag_prim(tag) {
                    Some(p) => p.arity() as i64,
                    None if tag == TAG_CLOSURE => self.arena.field(arg, CLOSURE_ARITY)?,
                    None => return Err(self.type_mismatch(prim.name(), arg)),
                };
                self.alloc_int(n)?
            }
            Prim::First | Prim::Rest => {
                let part = if prim == Prim::First { PAIR_HEAD } else { PAIR_TAIL };
                match tag {
                    TAG_PAIR => self.arena.field_addr(arg, part)?,
                    TAG_NULL => {
                        return Err(EvalError::TypeMismatch {
                            op: prim.name().into(),
                            value: "the empty list ()".into(),
                        }
                        .into())
                    }
                    _ => {
                        return Err(EvalError::NotAList {
                            prim: prim.name().into(),
                            value: self.describe(arg),
                        }
                        .into())
                    }
                }
            }
            Prim::Cons => unreachable!("handled above"),
        };
        Ok(result)
    }

    // ── Diagnostics ───────────────────────────────────────────────────────

    /// The cell's value as the evaluator would print it.
    fn describe(&self, addr: Addr) -> String {
        decode(&*self.arena, self.arena.code(), addr)
            .map_or_else(|_| addr.to_string(), |value| value.to_string())
    }

    fn type_mismatch(&self, op: &str, value: Addr) -> HeapError {
        EvalError::TypeMismatch {
            op: op.into(),
            value: self.describe(value),
        }
        .into()
    }
}

/// Evaluate `program` into `arena` with the default configuration.
pub fn evaluate_to_arena(program: &ResolvedExpr, arena: &mut Arena) -> HeapResult<Addr> {
    HeapRuntime::new(arena, HeapConfig::default()).run(program)
}
