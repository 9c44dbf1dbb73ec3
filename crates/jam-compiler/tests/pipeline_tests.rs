//! End-to-end tests: source text through resolution and evaluation, with the
//! name-addressed and resolved forms checked against each other.

use jam_compiler::{compile, parse_source, run_source, run_source_with, RunError};
use jam_eval::{evaluate_with, EvalConfig, EvalError, Policy};
use jam_types::ErrorCode;

fn both_forms(source: &str, config: EvalConfig) -> (Result<String, EvalError>, Result<String, EvalError>) {
    let named = parse_source("test.jam", source).unwrap_or_else(|e| panic!("{e}"));
    let resolved = compile("test.jam", source).unwrap_or_else(|e| panic!("{e}"));
    let by_name = evaluate_with(&named, config).and_then(|v| v.render());
    let by_address = evaluate_with(&resolved, config).and_then(|v| v.render());
    (by_name, by_address)
}

const PROGRAMS: &[&str] = &[
    "let add := map x to map y to x + y; in add(3)(4)",
    "letrec even := map n to if n = 0 then true else odd(n - 1); \
            odd := map n to if n = 0 then false else even(n - 1); \
     in even(9)",
    "let x := 10; in let f := map y to x + y; in let x := 100; in f(1)",
    "letrec zeroes := cons(0, zeroes); in first(rest(zeroes))",
    "letrec nats := map n to cons(n, nats(n + 1)); in first(rest(rest(nats(0))))",
    "let c := ref 0; in let x := {c <- !c + 1; 5}; in {x + x; !c}",
    "let r := ref 0; in r = r",
    "letrec x := y; y := 1; in x",
    "1 / 0",
    "let l := cons(1 + 1, cons(2 * 2, null)); in l",
];

#[test]
fn named_and_resolved_forms_agree() {
    for &source in PROGRAMS {
        for config in EvalConfig::all() {
            let config = config.with_max_depth(500);
            let (by_name, by_address) = both_forms(source, config);
            assert_eq!(by_name, by_address, "`{source}` under {config}");
        }
    }
}

#[test]
fn lexical_scope_in_resolved_form() {
    let (_, result) = both_forms(
        "let x := 10; in let f := map y to x + y; in let x := 100; in f(1)",
        EvalConfig::default(),
    );
    assert_eq!(result.as_deref(), Ok("11"));
}

#[test]
fn conditional_example_under_every_policy() {
    for config in EvalConfig::all() {
        assert_eq!(
            run_source(
                "let x := 1; y := 2; in if x > 0 then y else y + 2",
                config.binding,
                config.cons
            )
            .unwrap(),
            "2"
        );
    }
}

#[test]
fn zeroes_under_lazy_cons() {
    let source = "letrec zeroes := cons(0, zeroes); in first(rest(zeroes))";
    for binding in Policy::ALL {
        assert_eq!(run_source(source, binding, Policy::Need).unwrap(), "0");
        assert_eq!(run_source(source, binding, Policy::Name).unwrap(), "0");
        let eager = run_source_with(source, EvalConfig::new(binding, Policy::Value).with_max_depth(300));
        assert!(
            matches!(
                eager,
                Err(RunError::Eval(EvalError::ForwardReference(_) | EvalError::DepthExceeded(_)))
            ),
            "{eager:?}"
        );
    }
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
    let result = run_source("(map x, y to x)(1)", Policy::Need, Policy::Need);
    assert!(matches!(
        result,
        Err(RunError::Eval(EvalError::ArityMismatch { expected: 2, actual: 1, .. }))
    ));
}

#[test]
fn division_by_zero_when_demanded() {
    for config in EvalConfig::all() {
        let result = run_source("1 / 0", config.binding, config.cons);
        assert!(matches!(result, Err(RunError::Eval(EvalError::DivisionByZero))));
    }
}

#[test]
fn static_errors_stop_the_pipeline() {
    match run_source("let x := ; in x", Policy::Value, Policy::Value) {
        Err(RunError::Compile(errors)) => {
            assert_eq!(errors.codes(), vec![ErrorCode::UNEXPECTED_TOKEN]);
            assert_eq!(errors.errors[0].file, "<input>");
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
    match run_source("x + 1", Policy::Value, Policy::Value) {
        Err(RunError::Compile(errors)) => {
            assert_eq!(errors.codes(), vec![ErrorCode::UNBOUND_VARIABLE]);
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn run_error_messages() {
    let err = run_source("1 / 0", Policy::Value, Policy::Value).unwrap_err();
    assert_eq!(err.to_string(), "runtime error: division by zero");
    let err = run_source("y", Policy::Value, Policy::Value).unwrap_err();
    assert_eq!(err.to_string(), "1:1: E501 [scope] unbound variable 'y'");
}

#[test]
fn configuration_from_json() {
    let config = EvalConfig::from_json(r#"{"binding": "need", "cons": "need", "max_depth": 50}"#).unwrap();
    let result = run_source_with("letrec loop := map n to loop(n); in loop(0)", config);
    assert!(matches!(result, Err(RunError::Eval(EvalError::DepthExceeded(50)))));
}
