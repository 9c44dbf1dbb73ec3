//! Jam tree-walking evaluator.
//!
//! Evaluates either syntax form produced by the front end: name-addressed
//! programs run over an association-list environment, resolved programs over a
//! chain of frames. Binding and cons policies are chosen independently from
//! `value`, `name` and `need`.
//!
//! ```ignore
//! let value = jam_eval::evaluate(&program, Policy::Need, Policy::Name)?;
//! println!("{}", value.render()?);
//! ```

pub mod env;
pub mod error;
pub mod evaluator;
pub mod policy;
mod primitives;
pub mod suspension;
pub mod value;

pub use env::{Binding, Deferred, Environment, FrameEnv, NamedEnv, Scoped, Slot};
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use policy::{EvalConfig, Policy, UnknownPolicy, DEFAULT_MAX_DEPTH};
pub use suspension::Suspension;
pub use value::{Closure, NamedValue, Pair, ResolvedValue, Value};

use jam_types::ast::Expr;

/// Evaluate a closed program under the given binding and cons policies.
pub fn evaluate<V: Scoped>(
    program: &Expr<V>,
    binding: Policy,
    cons: Policy,
) -> EvalResult<Value<V::Env>> {
    evaluate_with(program, EvalConfig::new(binding, cons))
}

/// Evaluate a closed program with a full configuration.
pub fn evaluate_with<V: Scoped>(program: &Expr<V>, config: EvalConfig) -> EvalResult<Value<V::Env>> {
    Evaluator::<V::Env>::new(config).run(program)
}
