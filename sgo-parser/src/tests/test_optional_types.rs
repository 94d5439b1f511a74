use crate::ast::*;
use crate::{parse_expr, parse_file};

#[test]
fn optional_pointer_type() {
    let file = parse_file("package p\n\nvar p ?*int\n").unwrap();
    let Decl::Gen(decl) = &file.decls[0] else {
        panic!("expected gen decl");
    };
    let Spec::Value(spec) = &decl.specs[0] else {
        panic!("expected value spec");
    };
    let Some(Expr::OptionalType(opt)) = &spec.typ else {
        panic!("expected optional type, got {:?}", spec.typ);
    };
    assert!(matches!(&*opt.elt, Expr::Star(_)));
}

#[test]
fn optional_map_and_func_types() {
    let src = "package p\n\nvar m ?map[string]int\nvar f ?func(int) string\n";
    let file = parse_file(src).unwrap();
    assert_eq!(file.decls.len(), 2);
    for decl in &file.decls {
        let Decl::Gen(d) = decl else { panic!() };
        let Spec::Value(spec) = &d.specs[0] else {
            panic!()
        };
        assert!(matches!(&spec.typ, Some(Expr::OptionalType(_))));
    }
}

#[test]
fn optional_in_struct_field() {
    let src = "package p\n\ntype T struct {\n\tnext ?*T\n\tname string\n}\n";
    let file = parse_file(src).unwrap();
    let Decl::Gen(d) = &file.decls[0] else { panic!() };
    let Spec::Type(spec) = &d.specs[0] else {
        panic!()
    };
    let Expr::StructType(st) = &spec.typ else {
        panic!()
    };
    assert_eq!(st.fields.list.len(), 2);
    assert!(matches!(&st.fields.list[0].typ, Expr::OptionalType(_)));
}

#[test]
fn optional_type_as_expression() {
    // Annotation strings are re-parsed through the expression entry point.
    let expr = parse_expr("?*File").unwrap();
    assert!(matches!(expr, Expr::OptionalType(_)));
}

#[test]
fn optional_interface_annotation_string() {
    let expr = parse_expr("func (name string, arg ...string) *Cmd").unwrap();
    let Expr::FuncType(f) = expr else { panic!() };
    assert_eq!(f.params.list.len(), 2);
    assert!(f.results.is_some());
}

#[test]
fn nested_optional_parses() {
    // `??T` is a checker error, not a parse error.
    let expr = parse_expr("??*int").unwrap();
    let Expr::OptionalType(outer) = expr else {
        panic!()
    };
    assert!(matches!(&*outer.elt, Expr::OptionalType(_)));
}
