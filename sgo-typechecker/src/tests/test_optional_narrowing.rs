//! Flow-sensitive refinement of optional types.

use super::{assert_ok, check_err};

#[test]
fn dereference_without_check_is_rejected() {
    let report = check_err(
        "package p\n\nfunc f() {\n\tvar p ?*int\n\t_ = *p\n}\n",
    );
    assert!(report.has_kind("optional_use"), "{:?}", report.errors);
}

#[test]
fn dereference_with_check_is_accepted() {
    assert_ok(
        "package p\n\nfunc f() {\n\tvar p ?*int = new(int)\n\tif p != nil {\n\t\t_ = *p\n\t}\n}\n",
    );
}

#[test]
fn narrowing_does_not_apply_on_the_nil_branch() {
    let report = check_err(
        "package p\n\nfunc f() {\n\tvar p ?*int = new(int)\n\tif p == nil {\n\t\t_ = *p\n\t}\n}\n",
    );
    assert!(report.has_kind("optional_use"));
}

#[test]
fn narrowing_persists_past_terminating_branch() {
    assert_ok(
        "package p\n\nfunc f() {\n\tvar p ?*int = new(int)\n\tif p == nil {\n\t\treturn\n\t}\n\t_ = *p\n}\n",
    );
}

#[test]
fn narrowing_is_dropped_at_join() {
    let report = check_err(
        "package p\n\nfunc g() ?*int {\n\treturn nil\n}\n\nfunc f() {\n\tvar p ?*int = new(int)\n\tif p != nil {\n\t\t_ = *p\n\t} else {\n\t\tp = g()\n\t}\n\t_ = *p\n}\n",
    );
    assert!(report.has_kind("optional_use"));
}

#[test]
fn conjunction_distributes_facts_on_true_side() {
    assert_ok(
        "package p\n\nfunc f(q ?*int, r ?*int) {\n\tif q != nil && r != nil {\n\t\t_ = *q\n\t\t_ = *r\n\t}\n}\n",
    );
}

#[test]
fn disjunction_distributes_facts_on_false_side() {
    assert_ok(
        "package p\n\nfunc f(q ?*int, r ?*int) {\n\tif q == nil || r == nil {\n\t\treturn\n\t}\n\t_ = *q\n\t_ = *r\n}\n",
    );
}

#[test]
fn only_nil_comparison_applies_to_optionals() {
    let report = check_err(
        "package p\n\nfunc f(q ?*int, r ?*int) {\n\tif q == r {\n\t\treturn\n\t}\n}\n",
    );
    assert!(report.has_kind("optional_use"));
}

#[test]
fn optional_exposes_no_methods() {
    let report = check_err(
        "package p\n\ntype T struct{ N int }\n\nfunc (t *T) Get() int { return t.N }\n\nfunc f(t ?*T) {\n\t_ = t.Get()\n}\n",
    );
    assert!(report.has_kind("optional_use"));
}

#[test]
fn aliasing_via_address_of_disables_narrowing() {
    let report = check_err(
        "package p\n\nfunc f() {\n\tvar x ?*int = new(int)\n\ty := &x\n\tif x != nil {\n\t\t_ = *x\n\t}\n\t_ = y\n}\n",
    );
    assert!(report.has_kind("optional_use"), "{:?}", report.errors);
    assert!(report.has_kind("alias_disables_narrowing"));
}

#[test]
fn closure_assignment_disables_narrowing() {
    let report = check_err(
        "package p\n\nfunc f() {\n\tvar x ?*int = new(int)\n\tg := func() {\n\t\tx = nil\n\t}\n\tg()\n\tif x != nil {\n\t\t_ = *x\n\t}\n}\n",
    );
    assert!(report.has_kind("optional_use"));
}

#[test]
fn read_only_capture_keeps_narrowing() {
    assert_ok(
        "package p\n\nfunc use(p ?*int) {}\n\nfunc f() {\n\tvar x ?*int = new(int)\n\tg := func() {\n\t\tuse(x)\n\t}\n\tg()\n\tif x != nil {\n\t\t_ = *x\n\t}\n}\n",
    );
}

#[test]
fn loop_body_assignment_drops_narrowing_at_head() {
    let report = check_err(
        "package p\n\nfunc f() {\n\tvar p ?*int = new(int)\n\tif p == nil {\n\t\treturn\n\t}\n\tfor i := 0; i < 2; i++ {\n\t\t_ = *p\n\t\tp = nil\n\t}\n}\n",
    );
    assert!(report.has_kind("optional_use"));
}

#[test]
fn narrowing_inside_loop_head_condition_holds_in_body() {
    assert_ok(
        "package p\n\nfunc f(p ?*int) {\n\tfor p != nil {\n\t\t_ = *p\n\t\treturn\n\t}\n}\n",
    );
}

#[test]
fn shadowed_variable_has_its_own_facts() {
    let report = check_err(
        "package p\n\nfunc f(p ?*int) {\n\tif p != nil {\n\t\tvar p ?*int\n\t\t_ = *p\n\t}\n}\n",
    );
    assert!(report.has_kind("optional_use"));
}

#[test]
fn type_switch_narrows_clause_bindings() {
    assert_ok(
        "package p\n\nfunc f(x interface{}) int {\n\tswitch y := x.(type) {\n\tcase int:\n\t\treturn y\n\tdefault:\n\t\treturn 0\n\t}\n}\n",
    );
}

#[test]
fn not_optionable_kinds_are_rejected() {
    let report = check_err("package p\n\nvar x ?int\n");
    assert!(report.has_kind("not_optionable"));
}

#[test]
fn double_optional_is_rejected() {
    let report = check_err("package p\n\nvar x ??*int\n");
    assert!(report.has_kind("not_optionable"));
}

#[test]
fn nil_comparison_on_unwrapped_type_is_rejected() {
    let report = check_err(
        "package p\n\nfunc f(p *int) {\n\tif p == nil {\n\t\treturn\n\t}\n}\n",
    );
    assert!(report.has_kind("invalid_op"));
}
