//! The word arena and its bump allocator.

use std::fmt;
use std::ops::Range;

use jam_types::ast::Prim;

use crate::code::CodeTable;
use crate::error::{HeapError, HeapResult};
use crate::layout::*;
use crate::runtime::HeapConfig;

/// Word index of a cell in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Addr(pub usize);

impl Addr {
    pub const TRUE: Addr = Addr(TRUE_ADDR);
    pub const FALSE: Addr = Addr(FALSE_ADDR);
    pub const NULL: Addr = Addr(NULL_ADDR);
    pub const UNIT: Addr = Addr(UNIT_ADDR);

    pub fn bool(b: bool) -> Addr {
        if b {
            Addr::TRUE
        } else {
            Addr::FALSE
        }
    }

    pub fn prim(prim: Prim) -> Addr {
        Addr(prim_addr(prim))
    }

    /// This address as a payload word.
    pub fn to_word(self) -> i64 {
        self.0 as i64
    }

    pub fn from_word(word: i64) -> HeapResult<Addr> {
        usize::try_from(word)
            .map(Addr)
            .map_err(|_| HeapError::InvalidAddress(word))
    }

    /// Decode an optional link word, where [`NO_FRAME`] means none.
    pub fn from_link(word: i64) -> HeapResult<Option<Addr>> {
        if word == NO_FRAME {
            Ok(None)
        } else {
            Addr::from_word(word).map(Some)
        }
    }

    pub fn to_link(addr: Option<Addr>) -> i64 {
        addr.map_or(NO_FRAME, Addr::to_word)
    }

    /// Offset `index` words into this cell.
    pub fn field(self, index: usize) -> usize {
        self.0 + index
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A flat array of tagged cells, filled by a bump allocator.
///
/// The singleton cells are written at construction, so a fresh arena already
/// uses [`HEAP_START`] words. Nothing is ever freed.
#[derive(Debug)]
pub struct Arena {
    words: Vec<i64>,
    capacity: usize,
    code: CodeTable,
}

impl Arena {
    /// An arena of `capacity` words, counting the reserved region.
    ///
    /// A capacity below [`HEAP_START`] is raised to it.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(HEAP_START);
        let mut words = Vec::with_capacity(capacity);
        words.extend([TAG_TRUE, TAG_FALSE, TAG_NULL, TAG_UNIT]);
        words.extend(Prim::ALL.iter().map(|&p| prim_tag(p)));
        words.resize(HEAP_START, 0);
        Self {
            words,
            capacity,
            code: CodeTable::default(),
        }
    }

    pub fn from_config(config: &HeapConfig) -> Self {
        Self::with_capacity(config.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Words allocated so far, including the reserved region.
    pub fn used(&self) -> usize {
        self.words.len()
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.words.len()
    }

    pub fn words(&self) -> &[i64] {
        &self.words
    }

    pub fn code(&self) -> &CodeTable {
        &self.code
    }

    pub(crate) fn code_mut(&mut self) -> &mut CodeTable {
        &mut self.code
    }

    /// Append a cell and return its address.
    pub fn alloc(&mut self, cell: &[i64]) -> HeapResult<Addr> {
        if cell.len() > self.remaining() {
            tracing::debug!(capacity = self.capacity, request = cell.len(), "arena exhausted");
            return Err(HeapError::ArenaExhausted {
                capacity: self.capacity,
            });
        }
        let addr = Addr(self.words.len());
        self.words.extend_from_slice(cell);
        tracing::trace!(%addr, tag = cell.first().copied().unwrap_or_default(), "alloc");
        Ok(addr)
    }

    pub fn word(&self, index: usize) -> HeapResult<i64> {
        self.words
            .get(index)
            .copied()
            .ok_or(HeapError::InvalidAddress(index as i64))
    }

    pub fn set_word(&mut self, index: usize, value: i64) -> HeapResult<()> {
        let slot = self
            .words
            .get_mut(index)
            .ok_or(HeapError::InvalidAddress(index as i64))?;
        *slot = value;
        Ok(())
    }

    pub fn tag(&self, addr: Addr) -> HeapResult<i64> {
        self.word(addr.0)
    }

    /// Payload word `index` of the cell at `addr`, checked to lie inside it.
    pub fn field(&self, addr: Addr, index: usize) -> HeapResult<i64> {
        let extent = self.cell_extent(addr)?;
        if index == 0 || addr.field(index) >= extent.end {
            return Err(HeapError::CorruptCell {
                addr: addr.0,
                tag: self.tag(addr)?,
            });
        }
        self.word(addr.field(index))
    }

    /// Payload word `index` interpreted as an address.
    pub fn field_addr(&self, addr: Addr, index: usize) -> HeapResult<Addr> {
        Addr::from_word(self.field(addr, index)?)
    }

    pub fn set_field(&mut self, addr: Addr, index: usize, value: i64) -> HeapResult<()> {
        self.field(addr, index)?;
        self.set_word(addr.field(index), value)
    }

    /// The word range occupied by the cell at `addr`.
    pub fn cell_extent(&self, addr: Addr) -> HeapResult<Range<usize>> {
        let tag = self.tag(addr)?;
        let len = match fixed_cell_size(tag) {
            Some(len) => len,
            None if tag == TAG_ACTIVATION => {
                let slots = self.word(addr.field(ACTIVATION_LEN))?;
                let slots = usize::try_from(slots)
                    .map_err(|_| HeapError::CorruptCell { addr: addr.0, tag })?;
                ACTIVATION_SLOTS + slots
            }
            None => return Err(HeapError::CorruptCell { addr: addr.0, tag }),
        };
        let end = addr.0 + len;
        if end > self.words.len() {
            return Err(HeapError::CorruptCell { addr: addr.0, tag });
        }
        Ok(addr.0..end)
    }

    /// Slot words of the activation at `frame`.
    pub fn slots(&self, frame: Addr) -> HeapResult<&[i64]> {
        let tag = self.tag(frame)?;
        if tag != TAG_ACTIVATION {
            return Err(HeapError::CorruptCell { addr: frame.0, tag });
        }
        let extent = self.cell_extent(frame)?;
        Ok(&self.words[frame.field(ACTIVATION_SLOTS)..extent.end])
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
