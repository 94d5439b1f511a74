use crate::ast::*;
use crate::parse_file;

fn first_func(file: &File) -> &FuncDecl {
    for decl in &file.decls {
        if let Decl::Func(f) = decl {
            return f;
        }
    }
    panic!("no function declaration")
}

#[test]
fn entangled_result_list() {
    let src = "package p\n\nfunc f() (*T \\ error) {\n\treturn \\ nil\n}\n";
    let file = parse_file(src).unwrap();
    let f = first_func(&file);
    let results = f.typ.results.as_ref().unwrap();
    assert_eq!(results.list.len(), 1);
    assert!(results.entangled.is_some());
}

#[test]
fn entangled_result_list_with_names() {
    let src = "package p\n\nfunc f() (n int, s string \\ err error) {\n\treturn \\ err\n}\n";
    let file = parse_file(src).unwrap();
    let f = first_func(&file);
    let results = f.typ.results.as_ref().unwrap();
    assert_eq!(results.list.len(), 2);
    let tail = results.entangled.as_ref().unwrap();
    assert_eq!(tail.names.len(), 1);
    assert_eq!(tail.names[0].name, "err");
}

#[test]
fn return_failure_side() {
    let src = "package p\n\nfunc f() (*T \\ error) {\n\treturn \\ someErr\n}\n";
    let file = parse_file(src).unwrap();
    let f = first_func(&file);
    let body = f.body.as_ref().unwrap();
    let Stmt::Return(ret) = &body.list[0] else {
        panic!()
    };
    assert_eq!(ret.results.entangled_pos, 1);
    assert_eq!(ret.results.values().len(), 0);
    assert_eq!(ret.results.tail().len(), 1);
}

#[test]
fn return_success_side() {
    let src = "package p\n\nfunc f() (int, int \\ error) {\n\treturn 1, 2 \\\n}\n";
    let file = parse_file(src).unwrap();
    let f = first_func(&file);
    let body = f.body.as_ref().unwrap();
    let Stmt::Return(ret) = &body.list[0] else {
        panic!()
    };
    assert_eq!(ret.results.entangled_pos, 3);
    assert_eq!(ret.results.values().len(), 2);
    assert!(ret.results.tail().is_empty());
}

#[test]
fn return_mixed_sides() {
    let src = "package p\n\nfunc f() (int \\ error) {\n\treturn 1 \\ err\n}\n";
    let file = parse_file(src).unwrap();
    let f = first_func(&file);
    let body = f.body.as_ref().unwrap();
    let Stmt::Return(ret) = &body.list[0] else {
        panic!()
    };
    assert_eq!(ret.results.entangled_pos, 2);
    assert_eq!(ret.results.values().len(), 1);
    assert_eq!(ret.results.tail().len(), 1);
}

#[test]
fn entangled_short_var_decl() {
    let src = "package p\n\nfunc f(m map[string]*T) {\n\tv \\ ok := m[\"k\"]\n\t_ = v\n\t_ = ok\n}\n";
    let file = parse_file(src).unwrap();
    let f = first_func(&file);
    let body = f.body.as_ref().unwrap();
    let Stmt::Assign(assign) = &body.list[0] else {
        panic!()
    };
    assert_eq!(assign.op, AssignOp::Define);
    assert_eq!(assign.lhs.entangled_pos, 2);
    assert_eq!(assign.lhs.values().len(), 1);
    assert_eq!(assign.lhs.tail().len(), 1);
}

#[test]
fn double_separator_rejected() {
    let src = "package p\n\nfunc f() {\n\ta \\ b \\ c := 1\n}\n";
    assert!(parse_file(src).is_err());
}
