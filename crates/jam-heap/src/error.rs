//! Errors raised by the arena runtime.

use jam_eval::EvalError;
use thiserror::Error;

/// Arena runtime error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    /// A language-level runtime error.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// The bump allocator reached the arena's capacity.
    #[error("arena exhausted: all {capacity} words are in use")]
    ArenaExhausted { capacity: usize },

    /// A cell's tag does not fit where it was found.
    #[error("corrupt cell at word {addr}: unexpected tag {tag}")]
    CorruptCell { addr: usize, tag: i64 },

    /// A word used as an address points outside the allocated arena.
    #[error("word {0} is not a valid arena address")]
    InvalidAddress(i64),
}

/// Heap result type alias.
pub type HeapResult<T> = Result<T, HeapError>;
