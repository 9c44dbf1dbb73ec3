//! Arena value representation and cell layout.
//!
//! The arena is a flat array of `i64` words. Every value lives in a cell:
//! a tag word followed by a payload whose shape depends on the tag.
//!
//! ```text
//! addr+0 : tag
//! addr+1 : payload word 1
//! ...
//! ```
//!
//! # Payload layouts
//!
//! | Tag          | Payload                                               |
//! |--------------|-------------------------------------------------------|
//! | INT          | value                                                 |
//! | PAIR         | head addr, tail addr                                  |
//! | REF          | referent addr                                         |
//! | CLOSURE      | arity, code index, activation addr (or `NO_FRAME`)    |
//! | ACTIVATION   | parent addr (or `NO_FRAME`), slot count n, n slots    |
//! | TRUE … UNIT  | none                                                  |
//! | primitives   | none                                                  |
//!
//! Singleton cells (booleans, null, unit, primitives) are written once into
//! the reserved region below [`HEAP_START`]; everything else is bump-allocated
//! above it. An activation slot holds the address of its value's cell, or
//! [`UNINIT`] while a `letrec` definition is still being evaluated.

use jam_types::ast::Prim;

// ── Boxed tags ───────────────────────────────────────────────────────────────

pub const TAG_INT: i64 = 1;
pub const TAG_PAIR: i64 = 2;
pub const TAG_REF: i64 = 3;
pub const TAG_CLOSURE: i64 = 4;
pub const TAG_ACTIVATION: i64 = 5;

// ── Singleton tags ───────────────────────────────────────────────────────────

pub const TAG_TRUE: i64 = -1;
pub const TAG_FALSE: i64 = -2;
pub const TAG_NULL: i64 = -3;
pub const TAG_UNIT: i64 = -4;
/// Tag of `Prim::ALL[0]`; primitive `i` is tagged `TAG_PRIM_BASE - i`.
pub const TAG_PRIM_BASE: i64 = -10;

// ── Slot and link sentinels ──────────────────────────────────────────────────

/// Slot word for a binding whose value is not yet available.
pub const UNINIT: i64 = -5;
/// Parent/environment word of a cell with no enclosing activation.
pub const NO_FRAME: i64 = -1;

// ── Payload offsets ──────────────────────────────────────────────────────────

pub const INT_VALUE: usize = 1;
pub const PAIR_HEAD: usize = 1;
pub const PAIR_TAIL: usize = 2;
pub const REF_REFERENT: usize = 1;
pub const CLOSURE_ARITY: usize = 1;
pub const CLOSURE_CODE: usize = 2;
pub const CLOSURE_ENV: usize = 3;
pub const ACTIVATION_PARENT: usize = 1;
pub const ACTIVATION_LEN: usize = 2;
pub const ACTIVATION_SLOTS: usize = 3;

// ── Reserved region ──────────────────────────────────────────────────────────

pub const TRUE_ADDR: usize = 0;
pub const FALSE_ADDR: usize = 1;
pub const NULL_ADDR: usize = 2;
pub const UNIT_ADDR: usize = 3;
/// Address of the `Prim::ALL[0]` singleton; the rest follow in order.
pub const PRIM_BASE_ADDR: usize = 4;
/// First word available to the bump allocator.
pub const HEAP_START: usize = 16;

/// Default arena capacity in words (8 MiB).
pub const DEFAULT_CAPACITY: usize = 1 << 20;

pub fn prim_tag(prim: Prim) -> i64 {
    TAG_PRIM_BASE - prim.index() as i64
}

pub fn tag_prim(tag: i64) -> Option<Prim> {
    let index = TAG_PRIM_BASE.checked_sub(tag)?;
    usize::try_from(index)
        .ok()
        .and_then(|i| Prim::ALL.get(i).copied())
}

pub fn prim_addr(prim: Prim) -> usize {
    PRIM_BASE_ADDR + prim.index()
}

/// Number of words in a cell with this tag, or `None` for an activation
/// (whose size depends on its slot count) or an unknown tag.
pub fn fixed_cell_size(tag: i64) -> Option<usize> {
    match tag {
        TAG_INT | TAG_REF => Some(2),
        TAG_PAIR => Some(3),
        TAG_CLOSURE => Some(4),
        TAG_TRUE | TAG_FALSE | TAG_NULL | TAG_UNIT => Some(1),
        t if tag_prim(t).is_some() => Some(1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_tags_round_trip() {
        for prim in Prim::ALL {
            assert_eq!(tag_prim(prim_tag(prim)), Some(prim));
        }
        assert_eq!(prim_tag(Prim::IsNumber), -10);
        assert_eq!(prim_tag(Prim::Rest), -19);
        assert_eq!(tag_prim(-20), None);
        assert_eq!(tag_prim(TAG_UNIT), None);
    }

    #[test]
    fn singletons_fit_below_heap_start() {
        assert!(prim_addr(Prim::Rest) < HEAP_START);
        assert_eq!(fixed_cell_size(TAG_ACTIVATION), None);
        assert_eq!(fixed_cell_size(prim_tag(Prim::Cons)), Some(1));
    }
}
