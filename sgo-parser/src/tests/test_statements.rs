use crate::ast::*;
use crate::parse_file;

fn body_of(src: &str) -> Vec<Stmt> {
    let file = parse_file(src).unwrap();
    for decl in file.decls {
        if let Decl::Func(f) = decl {
            return f.body.unwrap().list;
        }
    }
    panic!("no function declaration")
}

#[test]
fn if_with_init_and_else() {
    let stmts = body_of(
        "package p\nfunc f(p ?*int) {\n\tif q := p; q != nil {\n\t\t_ = q\n\t} else {\n\t\treturn\n\t}\n}\n",
    );
    let Stmt::If(s) = &stmts[0] else { panic!() };
    assert!(s.init.is_some());
    assert!(s.else_branch.is_some());
    assert!(matches!(&s.cond, Expr::Binary(b) if b.op == BinOp::Neq));
}

#[test]
fn composite_literal_needs_parens_in_header() {
    // A bare composite literal in an if header is not misparsed as the block.
    let stmts = body_of("package p\nfunc f() {\n\tif x := (T{1}); x.n > 0 {\n\t\t_ = x\n\t}\n}\n");
    assert!(matches!(&stmts[0], Stmt::If(_)));
}

#[test]
fn three_clause_for() {
    let stmts = body_of("package p\nfunc f() {\n\tfor i := 0; i < 10; i++ {\n\t}\n}\n");
    let Stmt::For(s) = &stmts[0] else { panic!() };
    assert!(s.init.is_some());
    assert!(s.cond.is_some());
    assert!(s.post.is_some());
}

#[test]
fn range_over_map() {
    let stmts = body_of("package p\nfunc f(m map[string]int) {\n\tfor k, v := range m {\n\t\t_ = k\n\t\t_ = v\n\t}\n}\n");
    let Stmt::Range(s) = &stmts[0] else { panic!() };
    assert!(s.defines);
    assert!(s.key.is_some());
    assert!(s.value.is_some());
}

#[test]
fn type_switch_with_binding() {
    let stmts = body_of(
        "package p\nfunc f(x interface{}) {\n\tswitch y := x.(type) {\n\tcase *int:\n\t\t_ = y\n\tdefault:\n\t}\n}\n",
    );
    let Stmt::TypeSwitch(s) = &stmts[0] else {
        panic!()
    };
    assert_eq!(s.body.len(), 2);
    assert!(matches!(&*s.assign, Stmt::Assign(_)));
}

#[test]
fn select_clauses() {
    let stmts = body_of(
        "package p\nfunc f(ch chan int) {\n\tselect {\n\tcase v := <-ch:\n\t\t_ = v\n\tcase ch <- 1:\n\tdefault:\n\t}\n}\n",
    );
    let Stmt::Select(s) = &stmts[0] else { panic!() };
    assert_eq!(s.body.len(), 3);
    assert!(s.body[2].comm.is_none());
}

#[test]
fn send_and_receive() {
    let stmts = body_of("package p\nfunc f(ch chan int) {\n\tch <- 1\n\tv := <-ch\n\t_ = v\n}\n");
    assert!(matches!(&stmts[0], Stmt::Send(_)));
    let Stmt::Assign(a) = &stmts[1] else { panic!() };
    assert!(matches!(&a.rhs.list[0], Expr::Unary(u) if u.op == UnOp::Recv));
}

#[test]
fn defer_and_go() {
    let stmts = body_of("package p\nfunc f() {\n\tdefer close(ch)\n\tgo run()\n}\n");
    assert!(matches!(&stmts[0], Stmt::Defer(_)));
    assert!(matches!(&stmts[1], Stmt::Go(_)));
}

#[test]
fn labeled_loop_with_branch() {
    let stmts = body_of("package p\nfunc f() {\nouter:\n\tfor {\n\t\tbreak outer\n\t}\n}\n");
    let Stmt::Labeled(l) = &stmts[0] else { panic!() };
    assert_eq!(l.label.name, "outer");
    assert!(matches!(&*l.stmt, Stmt::For(_)));
}
