//! Entangled call bindings, comma-ok desugaring, and collapse sets.

use super::{assert_ok, check_err};
use miette::Diagnostic;

#[test]
fn entangled_call_binding_collapses_values() {
    let report = check_err(
        "package p\n\ntype T struct{ N int }\n\nfunc open() (*T \\ error) {\n\treturn &T{1} \\\n}\n\nfunc f() int {\n\tt \\ err := open()\n\t_ = err\n\treturn t.N\n}\n",
    );
    assert!(report.has_kind("used_uninitialized"), "{:?}", report.errors);
}

#[test]
fn resolving_the_tail_restores_usability() {
    assert_ok(
        "package p\n\ntype T struct{ N int }\n\nfunc open() (*T \\ error) {\n\treturn &T{1} \\\n}\n\nfunc f() int {\n\tt \\ err := open()\n\tif err != nil {\n\t\treturn 0\n\t}\n\treturn t.N\n}\n",
    );
}

#[test]
fn comma_ok_on_map_with_optionable_value() {
    let report = check_err(
        "package p\n\ntype T struct{}\n\nfunc use(t *T) {}\n\nfunc f(m map[string]*T) {\n\tv \\ ok := m[\"k\"]\n\tif ok {\n\t\tuse(v)\n\t} else {\n\t\tuse(v)\n\t}\n}\n",
    );
    // the else branch reads v without proof
    assert!(report.has_kind("used_uninitialized"));
    assert_eq!(
        report
            .errors
            .iter()
            .filter(|e| e
                .code()
                .map(|c| c.to_string().ends_with("used_uninitialized"))
                .unwrap_or(false))
            .count(),
        1
    );
}

#[test]
fn single_value_map_index_of_optionable_elem_is_rejected() {
    let report = check_err(
        "package p\n\ntype T struct{}\n\nfunc f(m map[string]*T) {\n\tv := m[\"k\"]\n\t_ = v\n}\n",
    );
    assert!(report.has_kind("used_uninitialized"));
}

#[test]
fn boolean_tail_resolution_via_plain_condition() {
    assert_ok(
        "package p\n\ntype T struct{ N int }\n\nfunc use(t *T) {}\n\nfunc f(m map[string]*T) {\n\tv \\ ok := m[\"k\"]\n\tif ok {\n\t\tuse(v)\n\t}\n}\n",
    );
}

#[test]
fn negated_tail_with_early_exit() {
    assert_ok(
        "package p\n\ntype T struct{}\n\nfunc use(t *T) {}\n\nfunc f(m map[string]*T) {\n\tv \\ ok := m[\"k\"]\n\tif !ok {\n\t\treturn\n\t}\n\tuse(v)\n}\n",
    );
}

#[test]
fn comma_ok_on_channel_receive() {
    assert_ok(
        "package p\n\ntype T struct{}\n\nfunc use(t *T) {}\n\nfunc f(ch chan *T) {\n\tv \\ ok := <-ch\n\tif ok {\n\t\tuse(v)\n\t}\n}\n",
    );
}

#[test]
fn comma_ok_on_type_assertion() {
    assert_ok(
        "package p\n\nfunc f(x interface{}) int {\n\tn \\ ok := x.(int)\n\tif ok {\n\t\treturn n\n\t}\n\treturn 0\n}\n",
    );
}

#[test]
fn entangled_binding_of_infallible_rhs_is_rejected() {
    let report = check_err(
        "package p\n\nfunc f() {\n\tv \\ ok := 1\n\t_ = v\n\t_ = ok\n}\n",
    );
    assert!(report.has_kind("entangle_misuse"));
}

#[test]
fn entangled_call_bound_without_separator_is_rejected() {
    let report = check_err(
        "package p\n\nfunc open() (int \\ error) {\n\treturn 1 \\\n}\n\nfunc f() {\n\ta, b := open()\n\t_ = a\n\t_ = b\n}\n",
    );
    assert!(report.has_kind("entangle_misuse"));
}

#[test]
fn entangled_assignment_to_existing_variables() {
    assert_ok(
        "package p\n\nfunc f(m map[string]int) {\n\tv := 0\n\tok := false\n\t_ = ok\n\tv \\ ok = m[\"k\"]\n\tif ok {\n\t\t_ = v\n\t}\n}\n",
    );
}

#[test]
fn entangled_assignment_requires_plain_identifiers() {
    let report = check_err(
        "package p\n\ntype T struct{ N int }\n\nfunc f(m map[string]int, t T) {\n\tok := false\n\t_ = ok\n\tt.N \\ ok = m[\"k\"]\n}\n",
    );
    assert!(report.has_kind("entangle_misuse"));
}

#[test]
fn values_on_both_sides_of_binding_are_rejected() {
    let report = check_err(
        "package p\n\nfunc f(e error) {\n\ta \\ b := 1 \\ e\n\t_ = a\n\t_ = b\n}\n",
    );
    assert!(report.has_kind("entangle_misuse"));
}
