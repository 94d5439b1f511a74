//! Entangled result signatures and return forms.

use super::{assert_ok, check_err};

#[test]
fn success_side_return() {
    assert_ok(
        "package p\n\ntype T struct{}\n\nfunc f() (*T \\ error) {\n\treturn &T{} \\\n}\n",
    );
}

#[test]
fn failure_side_return() {
    assert_ok(
        "package p\n\ntype T struct{}\n\nfunc f(someErr error) (*T \\ error) {\n\treturn \\ someErr\n}\n",
    );
}

#[test]
fn mixed_return_with_optionable_tail() {
    assert_ok(
        "package p\n\nfunc f(n int, err error) (int \\ error) {\n\treturn n \\ err\n}\n",
    );
}

#[test]
fn mixed_return_with_boolean_tail_is_rejected() {
    let report = check_err(
        "package p\n\nfunc f(n int) (int \\ bool) {\n\treturn n \\ false\n}\n",
    );
    assert!(report.has_kind("entangle_misuse"));
}

#[test]
fn boolean_tail_failure_must_be_false() {
    let report = check_err(
        "package p\n\nfunc f() (int \\ bool) {\n\treturn \\ true\n}\n",
    );
    assert!(report.has_kind("entangle_misuse"));
}

#[test]
fn boolean_tail_false_is_accepted() {
    assert_ok("package p\n\nfunc f() (int \\ bool) {\n\treturn \\ false\n}\n");
}

#[test]
fn boolean_tail_success_side() {
    assert_ok("package p\n\nfunc f() (int \\ bool) {\n\treturn 42 \\\n}\n");
}

#[test]
fn entangled_return_in_plain_function_is_rejected() {
    let report = check_err("package p\n\nfunc f() int {\n\treturn \\ 1\n}\n");
    assert!(report.has_kind("entangle_misuse"));
}

#[test]
fn plain_return_in_entangled_function_is_rejected() {
    let report = check_err(
        "package p\n\nfunc f() (int \\ error) {\n\treturn 1\n}\n",
    );
    assert!(report.has_kind("entangle_misuse"));
}

#[test]
fn multiple_tail_values_are_rejected() {
    let report = check_err(
        "package p\n\nfunc f(a error, b error) (int \\ error) {\n\treturn \\ a, b\n}\n",
    );
    assert!(report.has_kind("entangle_arity"));
}

#[test]
fn wrong_value_count_on_success_side() {
    let report = check_err(
        "package p\n\nfunc f() (int, string \\ error) {\n\treturn 1 \\\n}\n",
    );
    assert!(report.has_kind("return_count"));
}

#[test]
fn tail_must_be_optionable_or_bool() {
    let report = check_err(
        "package p\n\nfunc f() (int \\ string) {\n\treturn \\ \"no\"\n}\n",
    );
    assert!(report.has_kind("entangle_misuse"));
}

#[test]
fn entangled_signature_in_interface_method() {
    assert_ok(
        "package p\n\ntype Writer interface {\n\tWrite(p []byte) (n int \\ err error)\n}\n",
    );
}

#[test]
fn missing_return_in_entangled_function() {
    let report = check_err(
        "package p\n\nfunc f(cond bool) (int \\ error) {\n\tif cond {\n\t\treturn 1 \\\n\t}\n}\n",
    );
    assert!(report.has_kind("invalid_op"));
}
