//! Jam arena runtime.
//!
//! Evaluates resolved programs eagerly into a flat array of tagged `i64`
//! words and decodes result cells back into evaluator values. See
//! [`layout`] for the cell formats.
//!
//! ```ignore
//! let mut arena = Arena::with_capacity(1 << 16);
//! let addr = evaluate_to_arena(&program, &mut arena)?;
//! let value = decode(&arena, arena.code(), addr)?;
//! ```

pub mod arena;
pub mod code;
pub mod decode;
pub mod error;
pub mod layout;
pub mod runtime;

pub use arena::{Addr, Arena};
pub use code::{CodeTable, Function};
pub use decode::{decode, Decoder};
pub use error::{HeapError, HeapResult};
pub use runtime::{evaluate_to_arena, HeapConfig, HeapRuntime};

use jam_eval::ResolvedValue;
use jam_types::ast::ResolvedExpr;

/// Evaluate in a fresh arena sized by `config` and decode the result.
pub fn run_in_arena(program: &ResolvedExpr, config: HeapConfig) -> HeapResult<ResolvedValue> {
    let mut arena = Arena::from_config(&config);
    let addr = HeapRuntime::new(&mut arena, config).run(program)?;
    decode(&arena, arena.code(), addr)
}
