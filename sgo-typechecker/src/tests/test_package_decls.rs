//! Package-level declaration ordering and scoping.

use super::{assert_ok, check_err};

#[test]
fn declarations_resolve_in_any_order() {
    assert_ok(
        "package p\n\nvar total = count * 2\n\nvar count = 21\n\nfunc double(n int) int {\n\treturn n * 2\n}\n",
    );
}

#[test]
fn initialization_cycle_is_reported() {
    let report = check_err("package p\n\nvar a = b\nvar b = a\n");
    assert!(report.has_kind("init_cycle"));
}

#[test]
fn recursive_types_are_allowed() {
    assert_ok(
        "package p\n\ntype List struct {\n\tValue int\n\tNext ?*List\n}\n",
    );
}

#[test]
fn mutually_recursive_types_are_allowed() {
    assert_ok(
        "package p\n\ntype A struct {\n\tB ?*B\n}\n\ntype B struct {\n\tA ?*A\n}\n",
    );
}

#[test]
fn redeclaration_is_reported() {
    let report = check_err("package p\n\nvar x = 1\nvar x = 2\n");
    assert!(report.has_kind("redeclared"));
}

#[test]
fn undeclared_name_is_reported() {
    let report = check_err("package p\n\nvar x = missing\n");
    assert!(report.has_kind("undeclared"));
}

#[test]
fn const_groups_repeat_expressions_with_iota() {
    assert_ok(
        "package p\n\nconst (\n\tA = iota\n\tB\n\tC\n)\n\nvar total = A + B + C\n",
    );
}

#[test]
fn methods_attach_to_their_receiver_type() {
    assert_ok(
        "package p\n\ntype Counter struct {\n\tN int\n}\n\nfunc (c *Counter) Add(d int) {\n\tc.N = c.N + d\n}\n\nfunc f(c *Counter) {\n\tc.Add(1)\n}\n",
    );
}

#[test]
fn interface_satisfaction_via_methods() {
    assert_ok(
        "package p\n\ntype Stringer interface {\n\tString() string\n}\n\ntype Name struct {\n\tV string\n}\n\nfunc (n Name) String() string {\n\treturn n.V\n}\n\nfunc f(n Name) {\n\tvar s Stringer = n\n\t_ = s\n}\n",
    );
}

#[test]
fn embedded_struct_fields_are_reachable() {
    assert_ok(
        "package p\n\ntype Base struct {\n\tID int\n}\n\ntype User struct {\n\tBase\n\tName string\n}\n\nfunc f(u User) int {\n\treturn u.ID\n}\n",
    );
}
