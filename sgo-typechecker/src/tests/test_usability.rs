//! Usability tracking for variables whose type has no zero value.

use super::{assert_ok, check_err};

#[test]
fn reading_uninitialized_pointer_is_rejected() {
    let report = check_err(
        "package p\n\nfunc f() {\n\tvar q *int\n\t_ = q\n}\n",
    );
    assert!(report.has_kind("used_uninitialized"));
}

#[test]
fn assignment_makes_a_variable_usable() {
    assert_ok(
        "package p\n\nfunc f() {\n\tvar q *int\n\tq = new(int)\n\t_ = q\n}\n",
    );
}

#[test]
fn optional_variables_have_a_zero_value() {
    assert_ok("package p\n\nfunc f() {\n\tvar q ?*int\n\t_ = q\n}\n");
}

#[test]
fn basic_variables_have_a_zero_value() {
    assert_ok("package p\n\nfunc f() {\n\tvar n int\n\t_ = n\n}\n");
}

#[test]
fn usability_is_branch_sensitive() {
    let report = check_err(
        "package p\n\nfunc f(cond bool) {\n\tvar q *int\n\tif cond {\n\t\tq = new(int)\n\t}\n\t_ = q\n}\n",
    );
    assert!(report.has_kind("used_uninitialized"));
}

#[test]
fn usability_joins_when_both_branches_assign() {
    assert_ok(
        "package p\n\nfunc f(cond bool) {\n\tvar q *int\n\tif cond {\n\t\tq = new(int)\n\t} else {\n\t\tq = new(int)\n\t}\n\t_ = q\n}\n",
    );
}

#[test]
fn package_level_unwrapped_optionable_needs_initializer() {
    let report = check_err("package p\n\nvar q *int\n");
    assert!(report.has_kind("missing_init"));
}

#[test]
fn struct_literal_must_fill_optionable_fields() {
    let report = check_err(
        "package p\n\ntype T struct {\n\tNext *T\n\tName string\n}\n\nfunc f() {\n\t_ = T{Name: \"x\"}\n}\n",
    );
    assert!(report.has_kind("missing_init"));
}

#[test]
fn struct_literal_with_optional_field_may_omit_it() {
    assert_ok(
        "package p\n\ntype T struct {\n\tNext ?*T\n\tName string\n}\n\nfunc f() {\n\t_ = T{Name: \"x\"}\n}\n",
    );
}

#[test]
fn array_literal_must_fill_optionable_elements() {
    let report = check_err(
        "package p\n\nfunc f() {\n\t_ = [2]*int{new(int)}\n}\n",
    );
    assert!(report.has_kind("missing_init"));
}

#[test]
fn slice_of_optionable_elements_may_be_empty() {
    assert_ok("package p\n\nfunc f() {\n\t_ = []*int{}\n}\n");
}

#[test]
fn channel_receive_of_optionable_elem_needs_comma_ok() {
    let report = check_err(
        "package p\n\nfunc f(ch chan *int) {\n\tv := <-ch\n\t_ = v\n}\n",
    );
    assert!(report.has_kind("used_uninitialized"));
}
