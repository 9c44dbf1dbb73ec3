//! Scope resolver tests.

use jam_compiler::{compile, parse_source, resolve};
use jam_types::ast::{ExprKind, FrameLayout, ResolvedExpr};
use jam_types::{CompileErrors, ErrorCategory, ErrorCode};

fn resolve_src(source: &str) -> Result<ResolvedExpr, CompileErrors> {
    let program = parse_source("test.jam", source).unwrap_or_else(|e| panic!("parse errors:\n{e}"));
    resolve(&program)
}

fn resolved(source: &str) -> String {
    resolve_src(source)
        .unwrap_or_else(|e| panic!("resolve errors:\n{e}"))
        .to_string()
}

fn codes(source: &str) -> Vec<ErrorCode> {
    resolve_src(source)
        .expect_err("expected resolution errors")
        .codes()
}

#[test]
fn let_bindings_get_offsets() {
    assert_eq!(
        resolved("let x := 1; y := 2; in x + y"),
        "let x := 1; y := 2; in [0,0] + [0,1]"
    );
}

#[test]
fn depth_counts_enclosing_binding_forms() {
    assert_eq!(
        resolved("map x to map y to x + y"),
        "map x to map y to [1,0] + [0,0]"
    );
    assert_eq!(
        resolved("let a := 1; in map b to let c := 2; in a + b + c"),
        "let a := 1; in map b to let c := 2; in ([2,0] + [1,0]) + [0,0]"
    );
}

#[test]
fn let_right_hand_sides_resolve_outside_the_new_scope() {
    assert_eq!(
        resolved("let x := 1; in let x := x; in x"),
        "let x := 1; in let x := [0,0]; in [0,0]"
    );
}

#[test]
fn letrec_right_hand_sides_see_every_definition() {
    assert_eq!(
        resolved("letrec f := map n to g(n); g := map n to f(n); in f"),
        "letrec f := map n to [1,1]([0,0]); g := map n to [1,0]([0,0]); in [0,0]"
    );
}

#[test]
fn layouts_record_slot_counts() {
    let program = resolve_src("let a := 1; b := 2; c := 3; in map x, y to x").unwrap();
    let ExprKind::Let { layout, body, .. } = &program.kind else {
        panic!("expected let, got {program}");
    };
    assert_eq!(*layout, FrameLayout { slots: 3 });
    let ExprKind::Map { layout, .. } = &body.kind else {
        panic!("expected map, got {body}");
    };
    assert_eq!(layout.slots, 2);
}

#[test]
fn empty_parameter_list_still_opens_a_frame() {
    assert_eq!(resolved("let x := 1; in map to x"), "let x := 1; in map to [1,0]");
}

#[test]
fn unbound_variables_are_all_reported() {
    assert_eq!(
        codes("let x := y; in z"),
        vec![ErrorCode::UNBOUND_VARIABLE, ErrorCode::UNBOUND_VARIABLE]
    );
    let errors = resolve_src("let x := y; in z").unwrap_err();
    assert!(errors.errors[0].message.contains("'y'"));
    assert!(errors.errors[1].message.contains("'z'"));
    assert_eq!(errors.errors[0].category, ErrorCategory::Scope);
}

#[test]
fn duplicate_declarations_in_one_form() {
    assert_eq!(codes("let x := 1; x := 2; in x"), vec![ErrorCode::DUPLICATE_DECLARATION]);
    assert_eq!(codes("map a, a to a"), vec![ErrorCode::DUPLICATE_DECLARATION]);
    assert_eq!(
        codes("letrec f := 1; f := 2; in f"),
        vec![ErrorCode::DUPLICATE_DECLARATION]
    );
}

#[test]
fn shadowing_across_forms_is_allowed() {
    assert_eq!(resolved("map x to map x to x"), "map x to map x to [0,0]");
}

#[test]
fn compile_attaches_source_context() {
    let errors = compile("prog.jam", "let x := 1; in y").unwrap_err();
    let error = &errors.errors[0];
    assert_eq!(error.file, "prog.jam");
    assert_eq!(error.source_line, "let x := 1; in y");
    assert_eq!((error.span.start_line, error.span.start_col), (1, 16));
    assert_eq!(error.to_string(), "1:16: E501 [scope] unbound variable 'y'");
}

#[test]
fn diagnostics_serialize_to_json() {
    let errors = compile("prog.jam", "let x := 1; in y").unwrap_err();
    let json: serde_json::Value = serde_json::from_str(&errors.to_json()).unwrap();
    assert_eq!(json["total_errors"], 1);
    let first = &json["errors"][0];
    assert_eq!(first["code"], 501);
    assert_eq!(first["category"], "scope");
    assert_eq!(first["file"], "prog.jam");
    assert_eq!(first["line"], 1);
    assert_eq!(first["column"], 16);
    assert!(first.get("suggestion").is_none());
}
