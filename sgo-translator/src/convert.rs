//! The source converter.
//!
//! Walks the checked AST alongside the original source bytes. Untouched
//! spans are copied verbatim; at each SGo construct the original text is
//! skipped and a replacement is spliced in. Displaced lines get a
//! `/* file:line */` breadcrumb so diagnostics can be mapped back.

use sgo_parser::{
    AssignStmt, BlockStmt, CaseClause, Decl, Expr, ExprList, Field, FieldList, FuncDecl,
    FuncType, ReturnStmt, Span, Spec, Stmt, TypeAssertExpr, TypeSwitchStmt, ValueSpec,
};
use sgo_typechecker::types::{BasicKind, TypeKind};
use sgo_typechecker::{find_optionables, CheckedUnit, OptionablePath, PathStep, TypeId};

/// Result slot of the enclosing function, for zero-value injection.
struct ResultSlot {
    typ_span: Span,
    typ: TypeId,
}

struct FnCtx {
    results: Vec<ResultSlot>,
    tail_is_bool: bool,
}

pub struct Translator<'a> {
    unit: &'a CheckedUnit,
    src: &'a str,
    filename: &'a str,
    out: String,
    last: usize,
    fn_stack: Vec<FnCtx>,
}

impl<'a> Translator<'a> {
    pub fn new(unit: &'a CheckedUnit, src: &'a str, filename: &'a str) -> Self {
        Self {
            unit,
            src,
            filename,
            out: String::new(),
            last: 0,
            fn_stack: Vec::new(),
        }
    }

    pub fn run(mut self) -> String {
        self.emit("// Autogenerated by SGo. DO NOT EDIT!\n\n");
        let file = self.unit.file.clone();
        for decl in &file.decls {
            self.convert_decl(decl);
        }
        self.copy_to(self.src.len());
        self.out
    }

    // Chunk machinery

    fn copy_to(&mut self, pos: usize) {
        let pos = pos.min(self.src.len());
        if pos > self.last {
            self.out.push_str(&self.src[self.last..pos]);
            self.last = pos;
        }
    }

    fn skip_to(&mut self, pos: usize) {
        if pos > self.last {
            self.last = pos;
        }
    }

    fn emit(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Renders a region through the converter into a separate buffer,
    /// leaving the main output and cursor untouched.
    fn capture_expr(&mut self, e: &Expr) -> String {
        let span = e.span();
        let saved_out = std::mem::take(&mut self.out);
        let saved_last = self.last;
        self.last = span.start;
        self.convert_expr(e);
        self.copy_to(span.end);
        let text = std::mem::replace(&mut self.out, saved_out);
        self.last = saved_last;
        text
    }

    fn capture_stmt(&mut self, stmt: &Stmt) -> String {
        let span = stmt.span();
        let saved_out = std::mem::take(&mut self.out);
        let saved_last = self.last;
        self.last = span.start;
        self.convert_stmt(stmt);
        self.copy_to(span.end);
        let text = std::mem::replace(&mut self.out, saved_out);
        self.last = saved_last;
        text
    }

    fn line_of(&self, pos: usize) -> usize {
        self.src[..pos.min(self.src.len())]
            .bytes()
            .filter(|b| *b == b'\n')
            .count()
            + 1
    }

    fn line_marker(&mut self, pos: usize) {
        self.emit(&format!("/* {}:{} */ ", self.filename, self.line_of(pos)));
    }

    fn type_of(&self, e: &Expr) -> Option<TypeId> {
        self.unit.info.type_of(e.id())
    }

    // Declarations

    fn convert_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Gen(gen) => {
                for spec in &gen.specs {
                    match spec {
                        Spec::Import(_) => {}
                        Spec::Type(spec) => self.convert_expr(&spec.typ),
                        Spec::Value(spec) => self.convert_value_spec(spec),
                    }
                }
            }
            Decl::Func(func) => self.convert_func_decl(func),
            Decl::Bad(_) => {}
        }
    }

    fn convert_value_spec(&mut self, spec: &ValueSpec) {
        if let Some(typ) = &spec.typ {
            self.convert_expr(typ);
        }
        if spec.values.len() == 1 {
            if let Expr::TypeAssert(assert) = spec.values.list[0].unparen() {
                self.convert_type_assert(assert, spec.names.len() == 2);
                return;
            }
        }
        self.convert_expr_list(&spec.values);
    }

    fn convert_func_decl(&mut self, func: &FuncDecl) {
        if let Some(recv) = &func.recv {
            self.convert_field_list(recv);
        }
        self.convert_func_type(&func.typ);
        if let Some(body) = &func.body {
            self.push_fn_ctx(&func.typ);
            self.convert_block(body);
            self.fn_stack.pop();
        }
    }

    fn push_fn_ctx(&mut self, typ: &FuncType) {
        let mut results = Vec::new();
        let mut tail_is_bool = false;
        if let Some(fields) = &typ.results {
            for field in &fields.list {
                let typ_span = field.typ.span();
                let typ = self
                    .type_of(&field.typ)
                    .unwrap_or(self.unit.ctx.universe.invalid);
                for _ in 0..field.names.len().max(1) {
                    results.push(ResultSlot { typ_span, typ });
                }
            }
            if let Some(tail) = &fields.entangled {
                if let Some(t) = self.type_of(&tail.typ) {
                    tail_is_bool = self.unit.ctx.arena.is_boolean(t);
                }
            }
        }
        self.fn_stack.push(FnCtx {
            results,
            tail_is_bool,
        });
    }

    fn convert_func_type(&mut self, typ: &FuncType) {
        self.convert_field_list(&typ.params);
        if let Some(results) = &typ.results {
            self.convert_field_list(results);
        }
    }

    /// Replaces the `\` before an entangled result with a comma.
    fn convert_field_list(&mut self, fields: &FieldList) {
        for field in &fields.list {
            self.convert_field(field);
        }
        if let Some(tail) = &fields.entangled {
            if let Some(backslash) = fields.backslash {
                let prev_end = fields
                    .list
                    .last()
                    .map(|f| f.span.end)
                    .unwrap_or(backslash.start);
                self.copy_to(prev_end);
                if fields.list.is_empty() {
                    self.skip_to(backslash.end);
                } else {
                    self.emit(",");
                    self.skip_to(backslash.end);
                }
            }
            self.convert_field(tail);
        }
    }

    fn convert_field(&mut self, field: &Field) {
        self.convert_expr(&field.typ);
    }

    // Statements

    fn convert_block(&mut self, block: &BlockStmt) {
        for stmt in &block.list {
            self.convert_stmt(stmt);
        }
    }

    fn convert_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Bad(_) | Stmt::Empty(_) => {}
            Stmt::Decl(decl) => self.convert_decl(&decl.decl),
            Stmt::Labeled(s) => self.convert_stmt(&s.stmt),
            Stmt::Expr(s) => self.convert_expr(&s.x),
            Stmt::Send(s) => {
                self.convert_expr(&s.chan);
                self.convert_expr(&s.value);
            }
            Stmt::IncDec(s) => self.convert_expr(&s.x),
            Stmt::Assign(s) => self.convert_assign(s),
            Stmt::Go(s) => {
                self.convert_expr(&Expr::Call(s.call.clone()));
            }
            Stmt::Defer(s) => {
                self.convert_expr(&Expr::Call(s.call.clone()));
            }
            Stmt::Return(s) => self.convert_return(s),
            Stmt::Branch(_) => {}
            Stmt::Block(b) => self.convert_block(b),
            Stmt::If(s) => {
                if let Some(init) = &s.init {
                    self.convert_stmt(init);
                }
                self.convert_expr(&s.cond);
                self.convert_block(&s.body);
                if let Some(else_branch) = &s.else_branch {
                    self.convert_stmt(else_branch);
                }
            }
            Stmt::Switch(s) => {
                if let Some(init) = &s.init {
                    self.convert_stmt(init);
                }
                if let Some(tag) = &s.tag {
                    self.convert_expr(tag);
                }
                for clause in &s.body {
                    self.convert_case_clause(clause);
                }
            }
            Stmt::TypeSwitch(s) => self.convert_type_switch(s),
            Stmt::Select(s) => {
                for clause in &s.body {
                    if let Some(comm) = &clause.comm {
                        self.convert_stmt(comm);
                    }
                    for stmt in &clause.body {
                        self.convert_stmt(stmt);
                    }
                }
            }
            Stmt::For(s) => {
                if let Some(init) = &s.init {
                    self.convert_stmt(init);
                }
                if let Some(cond) = &s.cond {
                    self.convert_expr(cond);
                }
                if let Some(post) = &s.post {
                    self.convert_stmt(post);
                }
                self.convert_block(&s.body);
            }
            Stmt::Range(s) => {
                for part in [&s.key, &s.value].into_iter().flatten() {
                    self.convert_expr(part);
                }
                self.convert_expr(&s.x);
                self.convert_block(&s.body);
            }
        }
    }

    fn convert_case_clause(&mut self, clause: &CaseClause) {
        for case in &clause.list.list {
            self.convert_expr(case);
        }
        for stmt in &clause.body {
            self.convert_stmt(stmt);
        }
    }

    fn convert_assign(&mut self, assign: &AssignStmt) {
        self.convert_expr_list(&assign.lhs);
        if assign.rhs.len() == 1 {
            if let Expr::TypeAssert(assert) = assign.rhs.list[0].unparen() {
                self.convert_type_assert(assert, assign.lhs.len() == 2);
                return;
            }
        }
        self.convert_expr_list(&assign.rhs);
    }

    /// Replaces an interior `\` separator with a comma.
    fn convert_expr_list(&mut self, list: &ExprList) {
        for (i, expr) in list.list.iter().enumerate() {
            if list.entangled_pos > 1 && i + 1 == list.entangled_pos {
                if let Some(backslash) = list.backslash {
                    self.copy_to(list.list[i - 1].span().end);
                    self.emit(",");
                    self.skip_to(backslash.end);
                }
            }
            self.convert_expr(expr);
        }
    }

    fn convert_return(&mut self, ret: &ReturnStmt) {
        let (results_zero, tail_is_bool) = match self.fn_stack.last() {
            Some(ctx) => (
                ctx.results
                    .iter()
                    .map(|slot| (slot.typ_span, slot.typ))
                    .collect::<Vec<_>>(),
                ctx.tail_is_bool,
            ),
            None => (Vec::new(), false),
        };

        if ret.results.entangled_pos == 1 {
            // return \ err  →  return z1, …, zn, err
            if let Some(backslash) = ret.results.backslash {
                self.copy_to(backslash.start);
                let zeros: Vec<String> = results_zero
                    .iter()
                    .map(|(span, typ)| self.zero_value(*typ, *span))
                    .collect();
                self.emit(&zeros.join(", "));
                self.emit(",");
                self.skip_to(backslash.end);
            }
            for expr in ret.results.tail() {
                self.convert_expr(expr);
            }
            return;
        }

        self.convert_expr_list(&ret.results);

        if ret.results.entangled_pos == ret.results.len() + 1 {
            // return v1, v2 \  →  return v1, v2, nil (true for bool tails)
            if let Some(backslash) = ret.results.backslash {
                let end = ret
                    .results
                    .list
                    .last()
                    .map(|e| e.span().end)
                    .unwrap_or(backslash.start);
                self.copy_to(end);
                self.emit(if tail_is_bool { ", true" } else { ", nil" });
                self.skip_to(backslash.end);
            }
        }
    }

    /// The base-language zero literal for a result type. Struct and array
    /// kinds use the (converted) source text of the type expression.
    fn zero_value(&self, typ: TypeId, typ_span: Span) -> String {
        let arena = &self.unit.ctx.arena;
        let under = arena.underlying(typ);
        match arena.kind(under) {
            TypeKind::Pointer { .. }
            | TypeKind::Map { .. }
            | TypeKind::Slice { .. }
            | TypeKind::Signature { .. }
            | TypeKind::Interface { .. }
            | TypeKind::Chan { .. }
            | TypeKind::Optional { .. } => "nil".to_string(),
            TypeKind::Struct { .. } | TypeKind::Array { .. } => {
                format!("{}{{}}", self.capture_span(typ_span))
            }
            TypeKind::Basic(kind) => {
                if kind.is_boolean() {
                    "false".to_string()
                } else if kind.is_integer() {
                    "0".to_string()
                } else if kind.is_float() || kind.is_complex() {
                    "0.0".to_string()
                } else if kind.is_string() {
                    "\"\"".to_string()
                } else {
                    "nil".to_string()
                }
            }
            _ => "nil".to_string(),
        }
    }

    /// The raw source of a span with SGo tokens stripped.
    fn capture_span(&self, span: Span) -> String {
        // Strip '?' tokens textually; a type expression has no other
        // context where '?' can occur.
        self.src[span.start..span.end].replace('?', "")
    }

    // Expressions

    fn convert_expr(&mut self, e: &Expr) {
        match e {
            Expr::Bad(_) | Expr::Ident(_) | Expr::BasicLit(_) => {}
            Expr::OptionalType(opt) => {
                // erase the '?'
                self.copy_to(opt.span.start);
                self.skip_to(opt.span.start + 1);
                self.convert_expr(&opt.elt);
            }
            Expr::CompositeLit(lit) => {
                if let Some(typ) = &lit.typ {
                    self.convert_expr(typ);
                }
                for elt in &lit.elts {
                    self.convert_expr(elt);
                }
            }
            Expr::FuncLit(lit) => {
                self.convert_func_type(&lit.typ);
                self.push_fn_ctx(&lit.typ);
                self.convert_block(&lit.body);
                self.fn_stack.pop();
            }
            Expr::Paren(p) => self.convert_expr(&p.x),
            Expr::Selector(sel) => self.convert_expr(&sel.x),
            Expr::Index(ix) => {
                self.convert_expr(&ix.x);
                self.convert_expr(&ix.index);
            }
            Expr::Slice(sl) => {
                self.convert_expr(&sl.x);
                for part in [&sl.low, &sl.high, &sl.max].into_iter().flatten() {
                    self.convert_expr(part);
                }
            }
            Expr::TypeAssert(assert) => self.convert_type_assert(assert, false),
            Expr::Call(call) => {
                self.convert_expr(&call.fun);
                for arg in &call.args {
                    self.convert_expr(arg);
                }
            }
            Expr::Star(star) => self.convert_expr(&star.x),
            Expr::Unary(u) => self.convert_expr(&u.x),
            Expr::Binary(b) => {
                self.convert_expr(&b.x);
                self.convert_expr(&b.y);
            }
            Expr::KeyValue(kv) => {
                self.convert_expr(&kv.key);
                self.convert_expr(&kv.value);
            }
            Expr::Ellipsis(el) => {
                if let Some(elt) = &el.elt {
                    self.convert_expr(elt);
                }
            }
            Expr::ArrayType(arr) => {
                if let Some(len) = &arr.len {
                    self.convert_expr(len);
                }
                self.convert_expr(&arr.elt);
            }
            Expr::StructType(st) => self.convert_field_list(&st.fields),
            Expr::FuncType(ft) => self.convert_func_type(ft),
            Expr::InterfaceType(it) => self.convert_field_list(&it.methods),
            Expr::MapType(m) => {
                self.convert_expr(&m.key);
                self.convert_expr(&m.value);
            }
            Expr::ChanType(c) => self.convert_expr(&c.value),
        }
    }

    // Type assertions

    /// Rewrites an assertion to a type with checkable optionable paths
    /// into a guarded immediately-invoked function literal. Single-value
    /// form panics naming the failing path; comma-ok form sets ok false.
    fn convert_type_assert(&mut self, assert: &TypeAssertExpr, comma_ok: bool) {
        let Some(typ_expr) = &assert.typ else {
            self.convert_expr(&assert.x);
            return;
        };
        let checks = match self.type_of(typ_expr) {
            Some(target) => {
                find_optionables(&self.unit.ctx.arena, &self.unit.ctx.objs, target).0
            }
            None => Vec::new(),
        };
        if checks.is_empty() {
            self.convert_expr(&assert.x);
            self.convert_expr(typ_expr);
            return;
        }

        self.copy_to(assert.span.start);
        let typ_text = self.capture_expr(typ_expr);
        let x_text = self.capture_expr(&assert.x);
        let guard = self.assert_guard(&x_text, &typ_text, &checks, comma_ok);
        self.emit(&guard);
        self.skip_to(assert.span.end);
    }

    fn assert_guard(
        &self,
        x_text: &str,
        typ_text: &str,
        checks: &[OptionablePath],
        comma_ok: bool,
    ) -> String {
        let mut s = String::new();
        s.push_str("func() (__sgo_v ");
        s.push_str(typ_text);
        if comma_ok {
            s.push_str(", __sgo_ok bool");
        }
        s.push_str(") { ");
        if comma_ok {
            s.push_str("__sgo_v, __sgo_ok = ");
        } else {
            s.push_str("__sgo_v = ");
        }
        s.push_str(x_text);
        s.push_str(".(");
        s.push_str(typ_text);
        s.push_str(");");
        if comma_ok {
            s.push_str(" if !__sgo_ok { return };");
        }
        s.push_str(" if false");

        let exprs: Vec<String> = checks.iter().map(|path| self.path_expr(path)).collect();
        for expr in &exprs {
            s.push_str(" || ");
            s.push_str(expr);
            s.push_str(" == nil");
        }
        s.push_str(" { ");
        if comma_ok {
            s.push_str("__sgo_ok = false ");
        } else {
            s.push_str("var expr string; switch {");
            for expr in &exprs {
                s.push_str(&format!(" case {expr} == nil: expr = {expr:?};"));
            }
            s.push_str(
                "}; panic(\"interface conversion: nil value \"+expr+\" when type-asserting to non-optional\")",
            );
        }
        s.push_str("}; return }()");
        s
    }

    /// The guard expression reaching a checkable path on `__sgo_v`.
    fn path_expr(&self, path: &OptionablePath) -> String {
        let mut expr = "__sgo_v".to_string();
        for step in &path.0 {
            match step {
                PathStep::Pointee => expr = format!("*({expr})"),
                PathStep::Field { typ, index } => {
                    if let TypeKind::Struct { fields } = self.unit.ctx.arena.kind(*typ) {
                        let name = &self.unit.ctx.objs.get(fields[*index].var).name;
                        expr = format!("({expr}).{name}");
                    }
                }
                _ => {}
            }
        }
        expr
    }

    // Type switches

    /// Rewrites a type switch whose case types carry checkable paths into
    /// a `switch {{ case true: … }}` prologue binding the scrutinee once,
    /// followed by an if/else-if chain of guarded assertions.
    fn convert_type_switch(&mut self, s: &TypeSwitchStmt) {
        let (assign_var, assert) = match &*s.assign {
            Stmt::Expr(es) => (None, assert_expr(&es.x)),
            Stmt::Assign(assign) => {
                let name = match assign.lhs.list.first().map(|e| e.unparen()) {
                    Some(Expr::Ident(id)) => Some(id.name.clone()),
                    _ => None,
                };
                (name, assign.rhs.list.first().and_then(assert_expr))
            }
            _ => (None, None),
        };
        let Some(assert) = assert else {
            return;
        };

        let mut needs_rewrite = false;
        for clause in &s.body {
            for case in &clause.list.list {
                if is_nil_case(case) {
                    continue;
                }
                if let Some(t) = self.type_of(case) {
                    if !find_optionables(&self.unit.ctx.arena, &self.unit.ctx.objs, t)
                        .0
                        .is_empty()
                    {
                        needs_rewrite = true;
                    }
                }
            }
        }

        if !needs_rewrite {
            if let Some(init) = &s.init {
                self.convert_stmt(init);
            }
            self.convert_stmt(&s.assign);
            for clause in &s.body {
                self.convert_case_clause(clause);
            }
            return;
        }

        let assign_var = assign_var.unwrap_or_else(|| "_".to_string());

        self.copy_to(s.span.start);
        self.emit("switch { case true: ");
        if let Some(init) = &s.init {
            let init_text = self.capture_stmt(init);
            self.emit(&init_text);
            self.emit("; ");
        }
        // Bind the switched expression once, lest its side effects run
        // per clause.
        let x_text = self.capture_expr(&assert.x);
        self.emit("__sgo_switched := ");
        self.emit(&x_text);
        self.emit(";\n");

        for (i, clause) in s.body.iter().enumerate() {
            if i > 0 {
                self.emit(" else ");
            }
            self.emit("if ");
            self.emit(&assign_var);
            if clause.list.len() == 1 && !is_nil_case(&clause.list.list[0]) {
                let case = &clause.list.list[0];
                let typ_text = self.capture_expr(case);
                let checks = self
                    .type_of(case)
                    .map(|t| find_optionables(&self.unit.ctx.arena, &self.unit.ctx.objs, t).0)
                    .unwrap_or_default();
                self.emit(", __sgo_ok := ");
                let guard = self.assert_guard("__sgo_switched", &typ_text, &checks, true);
                self.emit(&guard);
                self.emit("; __sgo_ok ");
            } else {
                // default clause, nil case, or a multi-type clause: the
                // clause variable keeps the switched type
                self.emit(if assign_var == "_" { " = " } else { " := " });
                self.emit("__sgo_switched; ");
                if clause.list.is_empty() {
                    self.emit("true ");
                } else {
                    for (j, case) in clause.list.list.iter().enumerate() {
                        if j > 0 {
                            self.emit(" || ");
                        }
                        if is_nil_case(case) {
                            self.emit("__sgo_switched == nil");
                            continue;
                        }
                        let typ_text = self.capture_expr(case);
                        let checks = self
                            .type_of(case)
                            .map(|t| {
                                find_optionables(&self.unit.ctx.arena, &self.unit.ctx.objs, t).0
                            })
                            .unwrap_or_default();
                        self.emit("func() bool { _, __sgo_ok := ");
                        let guard = self.assert_guard("__sgo_switched", &typ_text, &checks, true);
                        self.emit(&guard);
                        self.emit("; return __sgo_ok }()");
                    }
                    self.emit(" ");
                }
            }
            self.emit("{\n");
            if assign_var != "_" {
                // every lowered clause must use the variable, since each
                // if declares its own copy
                self.emit("_ = ");
                self.emit(&assign_var);
                self.emit("\n");
            }
            self.line_marker(clause.colon);
            self.skip_to(clause.colon + 1);
            for stmt in &clause.body {
                self.convert_stmt(stmt);
            }
            self.copy_to(clause.span.end);
            self.emit("\n}");
        }

        // Close the emitted `case true:` block with the original
        // switch's closing brace.
        self.skip_to(s.span.end.saturating_sub(1));
        self.copy_to(s.span.end);
    }
}

fn assert_expr(e: &Expr) -> Option<&TypeAssertExpr> {
    match e.unparen() {
        Expr::TypeAssert(assert) if assert.typ.is_none() => Some(assert),
        _ => None,
    }
}

fn is_nil_case(e: &Expr) -> bool {
    matches!(e.unparen(), Expr::Ident(id) if id.name == "nil")
}
