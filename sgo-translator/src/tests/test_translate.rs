use super::translate;

#[test]
fn output_carries_the_generated_header() {
    let out = translate("package p\n\nfunc f() {}\n");
    assert!(out.starts_with("// Autogenerated by SGo. DO NOT EDIT!\n\n"));
}

#[test]
fn optional_marker_is_erased() {
    let out = translate(
        "package p\n\nfunc f() {\n\tvar p ?*int = new(int)\n\tif p != nil {\n\t\t_ = *p\n\t}\n}\n",
    );
    assert!(out.contains("var p *int = new(int)"));
    assert!(out.contains("if p != nil {"));
    assert!(!out.contains('?'));
}

#[test]
fn entangled_signature_becomes_plain_results() {
    let out = translate(
        "package p\n\ntype T struct{}\n\nfunc f() (*T \\ error) {\n\treturn &T{} \\\n}\n",
    );
    assert!(out.contains("func f() (*T, error)"));
    assert!(out.contains("return &T{}, nil"));
    assert!(!out.contains('\\'));
}

#[test]
fn failure_return_injects_zero_values() {
    let out = translate(
        "package p\n\ntype T struct{}\n\nfunc f(someErr error) (*T \\ error) {\n\treturn \\ someErr\n}\n",
    );
    assert!(out.contains("return nil, someErr"));
}

#[test]
fn failure_return_zero_values_cover_basic_kinds() {
    let out = translate(
        "package p\n\nfunc f(someErr error) (int, string, bool, float64 \\ error) {\n\treturn \\ someErr\n}\n",
    );
    assert!(out.contains("return 0, \"\", false, 0.0, someErr"));
}

#[test]
fn failure_return_zero_value_for_struct_results() {
    let out = translate(
        "package p\n\ntype T struct{}\n\nfunc f(someErr error) (T \\ error) {\n\treturn \\ someErr\n}\n",
    );
    assert!(out.contains("return T{}, someErr"));
}

#[test]
fn boolean_tail_success_injects_true() {
    let out = translate("package p\n\nfunc f() (int \\ bool) {\n\treturn 42 \\\n}\n");
    assert!(out.contains("return 42, true"));
}

#[test]
fn comma_ok_binding_uses_native_form() {
    let out = translate(
        "package p\n\ntype T struct{}\n\nfunc use(t *T) {}\n\nfunc f(m map[string]*T) {\n\tv \\ ok := m[\"k\"]\n\tif ok {\n\t\tuse(v)\n\t}\n}\n",
    );
    assert!(out.contains("v, ok := m[\"k\"]"));
}

#[test]
fn mixed_return_drops_the_separator() {
    let out = translate(
        "package p\n\nfunc f(n int, err error) (int \\ error) {\n\treturn n \\ err\n}\n",
    );
    assert!(out.contains("return n, err"));
}

#[test]
fn assertion_with_checkable_paths_gets_a_guard() {
    let out = translate(
        "package p\n\ntype T struct{}\n\nfunc f(x interface{}) {\n\t_ = x.(*T)\n}\n",
    );
    assert!(out.contains("__sgo_v = x.(*T)"));
    assert!(out.contains("panic("));
}

#[test]
fn comma_ok_assertion_guard_sets_ok_false() {
    let out = translate(
        "package p\n\ntype T struct{}\n\nfunc f(x interface{}) {\n\tv \\ ok := x.(*T)\n\tif ok {\n\t\t_ = v\n\t}\n}\n",
    );
    assert!(out.contains("__sgo_ok = false"));
    assert!(!out.contains("panic("));
}

#[test]
fn assertion_without_optionable_paths_is_untouched() {
    let out = translate(
        "package p\n\nfunc f(x interface{}) int {\n\tn \\ ok := x.(int)\n\tif ok {\n\t\treturn n\n\t}\n\treturn 0\n}\n",
    );
    assert!(out.contains("n, ok := x.(int)"));
    assert!(!out.contains("__sgo_v"));
}

#[test]
fn type_switch_with_optionable_cases_is_lowered() {
    let out = translate(
        "package p\n\ntype T struct{}\n\nfunc f(x interface{}) {\n\tswitch y := x.(type) {\n\tcase *T:\n\t\t_ = y\n\tdefault:\n\t\t_ = y\n\t}\n}\n",
    );
    assert!(out.contains("__sgo_switched := x"));
    assert!(out.contains("switch { case true:"));
    assert!(out.contains("/* test.sgo:"));
}

#[test]
fn type_switch_without_optionable_cases_is_untouched() {
    let out = translate(
        "package p\n\nfunc f(x interface{}) int {\n\tswitch y := x.(type) {\n\tcase int:\n\t\treturn y\n\tdefault:\n\t\treturn 0\n\t}\n}\n",
    );
    assert!(out.contains("switch y := x.(type)"));
    assert!(!out.contains("__sgo_switched"));
}

#[test]
fn struct_literals_are_preserved_bit_identical() {
    let src = "package p\n\ntype T struct {\n\tA int\n\tB string\n}\n\nfunc f() T {\n\treturn T{A: 1, B: \"two\"}\n}\n";
    let out = translate(src);
    assert!(out.contains("T{A: 1, B: \"two\"}"));
}

#[test]
fn plain_programs_translate_to_themselves() {
    let src = "package p\n\nfunc add(a int, b int) int {\n\treturn a + b\n}\n";
    let out = translate(src);
    assert_eq!(
        out,
        format!("// Autogenerated by SGo. DO NOT EDIT!\n\n{src}")
    );
}

#[test]
fn translation_is_idempotent_without_sgo_constructs() {
    let src = "package p\n\nfunc add(a int, b int) int {\n\treturn a + b\n}\n";
    let once = translate(src);
    let body = once.trim_start_matches("// Autogenerated by SGo. DO NOT EDIT!\n\n");
    let twice = translate(body);
    assert_eq!(once, twice);
}

#[test]
fn no_sgo_tokens_survive_translation() {
    let out = translate(
        "package p\n\ntype T struct{}\n\nfunc open(fail bool, e error) (*T \\ error) {\n\tif fail {\n\t\treturn \\ e\n\t}\n\treturn &T{} \\\n}\n\nfunc f(e error) {\n\tt \\ err := open(false, e)\n\tif err == nil {\n\t\t_ = t\n\t}\n}\n",
    );
    assert!(!out.contains('\\'));
    assert!(!out.contains('?'));
}
