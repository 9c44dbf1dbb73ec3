//! Jam compiler: front-end pipeline and program transformations.
//!
//! ```text
//! Jam Source → Lexer → Parser → NamedExpr ─┬─→ Resolver → ResolvedExpr → Evaluator / Heap
//!                                          └─→ CPS → NamedExpr
//! ```

pub mod cps;
pub mod resolver;
mod scope;

pub use cps::CpsTransformer;
pub use resolver::Resolver;

use jam_eval::{EvalConfig, EvalError, Policy};
use jam_lexer::Lexer;
use jam_parser::Parser;
use jam_types::ast::{NamedExpr, ResolvedExpr};
use jam_types::{CompileErrors, SourceFile};

/// Error from running a program end to end.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{0}")]
    Compile(#[from] CompileErrors),
    #[error("runtime error: {0}")]
    Eval(#[from] EvalError),
}

/// Lex and parse `text` into a name-addressed program.
pub fn parse_source(name: &str, text: &str) -> Result<NamedExpr, CompileErrors> {
    let source = SourceFile::new(name, text);
    let lexed = Lexer::new(&source).lex();
    if lexed.errors.has_errors() {
        return Err(lexed.errors);
    }
    let parsed = Parser::new(lexed.tokens, &source).parse();
    match parsed.program {
        Some(program) if !parsed.errors.has_errors() => Ok(program),
        _ => Err(parsed.errors),
    }
}

/// Replace variable names with lexical addresses.
pub fn resolve(program: &NamedExpr) -> Result<ResolvedExpr, CompileErrors> {
    Resolver::new().resolve(program)
}

/// Convert a program to continuation-passing style.
pub fn to_cps(program: &NamedExpr) -> Result<NamedExpr, CompileErrors> {
    CpsTransformer::new().transform(program)
}

/// Parse and resolve `text`, attaching source context to scope errors.
pub fn compile(name: &str, text: &str) -> Result<ResolvedExpr, CompileErrors> {
    let program = parse_source(name, text)?;
    resolve(&program).map_err(|errors| errors.with_source(&SourceFile::new(name, text)))
}

/// Parse, resolve and evaluate `text`, returning the rendered result.
pub fn run_source(text: &str, binding: Policy, cons: Policy) -> Result<String, RunError> {
    run_source_with(text, EvalConfig::new(binding, cons))
}

/// [`run_source`] with a full evaluator configuration.
pub fn run_source_with(text: &str, config: EvalConfig) -> Result<String, RunError> {
    let program = compile("<input>", text)?;
    let value = jam_eval::evaluate_with(&program, config)?;
    Ok(value.render()?)
}
