//! Type assertions and optionable-path analysis at assertion boundaries.

use super::{assert_ok, check_err};

#[test]
fn assertion_to_pointer_type_is_accepted() {
    assert_ok(
        "package p\n\ntype T struct{}\n\nfunc f(x interface{}) {\n\t_ = x.(*T)\n}\n",
    );
}

#[test]
fn assertion_with_unchecked_path_is_rejected() {
    let report = check_err(
        "package p\n\nfunc f(x interface{}) {\n\t_ = x.(func(*int))\n}\n",
    );
    assert!(report.has_kind("assertion_uncheckable_path"));
}

#[test]
fn assertion_with_optional_wrapped_path_is_accepted() {
    // behind a '?' boundary nothing needs runtime verification
    assert_ok(
        "package p\n\nfunc f(x interface{}) {\n\t_ = x.(func(?*int))\n}\n",
    );
}

#[test]
fn assertion_to_struct_with_unchecked_slice_elems_is_rejected() {
    let report = check_err(
        "package p\n\ntype T struct {\n\tHandlers []func()\n}\n\nfunc f(x interface{}) {\n\t_ = x.(T)\n}\n",
    );
    assert!(report.has_kind("assertion_uncheckable_path"));
}

#[test]
fn assertion_on_non_interface_is_rejected() {
    let report = check_err(
        "package p\n\nfunc f(n int) {\n\t_ = n.(int)\n}\n",
    );
    assert!(report.has_kind("invalid_op"));
}

#[test]
fn type_switch_cases_are_checked_like_assertions() {
    let report = check_err(
        "package p\n\nfunc f(x interface{}) {\n\tswitch x.(type) {\n\tcase func(*int):\n\tdefault:\n\t}\n}\n",
    );
    assert!(report.has_kind("assertion_uncheckable_path"));
}

#[test]
fn impossible_assertion_is_rejected() {
    let report = check_err(
        "package p\n\ntype I interface {\n\tM() int\n}\n\ntype T struct{}\n\nfunc f(x I) {\n\t_ = x.(*T)\n}\n",
    );
    assert!(report.has_kind("mismatch"));
}

#[test]
fn assertion_to_interface_with_methods_is_accepted() {
    assert_ok(
        "package p\n\ntype I interface {\n\tM() int\n}\n\nfunc f(x interface{}) {\n\tv \\ ok := x.(I)\n\tif ok {\n\t\t_ = v.M()\n\t}\n}\n",
    );
}
