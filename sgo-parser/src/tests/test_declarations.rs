use crate::ast::*;
use crate::parse_file;

#[test]
fn package_clause_and_imports() {
    let src = "package main\n\nimport (\n\t\"fmt\"\n\tos \"os\"\n)\n";
    let file = parse_file(src).unwrap();
    assert_eq!(file.package.name, "main");
    let Decl::Gen(d) = &file.decls[0] else { panic!() };
    assert_eq!(d.tok, DeclTok::Import);
    assert_eq!(d.specs.len(), 2);
    let Spec::Import(second) = &d.specs[1] else {
        panic!()
    };
    assert_eq!(second.name.as_ref().unwrap().name, "os");
}

#[test]
fn method_declaration() {
    let src = "package p\n\nfunc (t *T) Name() string {\n\treturn t.name\n}\n";
    let file = parse_file(src).unwrap();
    let Decl::Func(f) = &file.decls[0] else { panic!() };
    let recv = f.recv.as_ref().unwrap();
    assert_eq!(recv.list.len(), 1);
    assert_eq!(recv.list[0].names[0].name, "t");
    assert_eq!(f.name.name, "Name");
}

#[test]
fn grouped_var_decl_with_doc() {
    let src = "package p\n\nvar (\n\t// For SGo: *File\n\tStdin *File\n)\n";
    let file = parse_file(src).unwrap();
    let Decl::Gen(d) = &file.decls[0] else { panic!() };
    let Spec::Value(spec) = &d.specs[0] else {
        panic!()
    };
    assert_eq!(spec.doc.as_deref(), Some("For SGo: *File"));
}

#[test]
fn interface_with_methods_and_embedding() {
    let src = "package p\n\ntype RW interface {\n\tReader\n\tWrite(p []byte) (n int \\ err error)\n}\n";
    let file = parse_file(src).unwrap();
    let Decl::Gen(d) = &file.decls[0] else { panic!() };
    let Spec::Type(spec) = &d.specs[0] else {
        panic!()
    };
    let Expr::InterfaceType(iface) = &spec.typ else {
        panic!()
    };
    assert_eq!(iface.methods.list.len(), 2);
    assert!(iface.methods.list[0].names.is_empty());
    let write = &iface.methods.list[1];
    let Expr::FuncType(sig) = &write.typ else {
        panic!()
    };
    assert!(sig.results.as_ref().unwrap().entangled.is_some());
}

#[test]
fn const_group_with_iota() {
    let src = "package p\n\nconst (\n\tA = iota\n\tB\n\tC\n)\n";
    let file = parse_file(src).unwrap();
    let Decl::Gen(d) = &file.decls[0] else { panic!() };
    assert_eq!(d.specs.len(), 3);
}

#[test]
fn anonymous_struct_fields() {
    let src = "package p\n\ntype T struct {\n\tBase\n\t*Other\n\tn int `json:\"n\"`\n}\n";
    let file = parse_file(src).unwrap();
    let Decl::Gen(d) = &file.decls[0] else { panic!() };
    let Spec::Type(spec) = &d.specs[0] else {
        panic!()
    };
    let Expr::StructType(st) = &spec.typ else {
        panic!()
    };
    assert_eq!(st.fields.list.len(), 3);
    assert!(st.fields.list[0].names.is_empty());
    assert!(st.fields.list[1].names.is_empty());
    assert!(st.fields.list[2].tag.is_some());
}
