//! Declarations: imports, type declarations, signatures, package-level
//! and local values, and type expression evaluation.

use super::{Checker, FuncCtx};
use crate::check::flow::FlowState;
use crate::error::TypeError;
use crate::importer::import_package;
use crate::info::OperandMode;
use crate::objects::{ObjId, ObjKind, Object, PkgId};
use crate::types::{StructField, TypeId, TypeKind};
use sgo_parser::{
    ChanDir as AstChanDir, Expr, FieldList, FuncDecl, FuncType, Ident, ImportSpec, TypeSpec,
    ValueSpec,
};
use std::collections::HashSet;

impl<'a> Checker<'a> {
    // Imports

    pub(crate) fn check_import_spec(&mut self, spec: &ImportSpec) {
        let path = match crate::constants::Value::from_string_literal(&spec.path.value) {
            crate::constants::Value::Str(s) => s,
            _ => return,
        };
        let pkg = match import_package(
            self.ctx,
            self.importer,
            self.config,
            &path,
        ) {
            Ok(pkg) => pkg,
            Err(message) => {
                self.error(TypeError::ImportFailed {
                    path,
                    message,
                    span: self.sspan(spec.span),
                });
                return;
            }
        };
        let local_name = spec
            .name
            .as_ref()
            .map(|n| n.name.clone())
            .unwrap_or_else(|| self.ctx.pkgs.get(pkg).name.clone());
        let obj = self.ctx.objs.alloc(Object {
            name: local_name.clone(),
            kind: ObjKind::PkgName { pkg },
            typ: self.invalid(),
            pos: spec.span.start,
            scope_pos: spec.span.start,
            pkg: Some(self.pkg),
        });
        if let Some(name) = &spec.name {
            self.declare(name, obj);
        } else {
            self.ctx.scopes.insert(self.scope, &local_name, obj);
        }
    }

    // Type declarations

    /// First phase: create the `TypeName` and its `Named` handle so
    /// recursive references resolve.
    pub(crate) fn declare_type_name(&mut self, spec: &TypeSpec) -> TypeId {
        let obj = self.ctx.objs.alloc(Object {
            name: spec.name.name.clone(),
            kind: ObjKind::TypeName,
            typ: self.invalid(),
            pos: spec.name.span.start,
            scope_pos: spec.name.span.start,
            pkg: Some(self.pkg),
        });
        let named = self.ctx.arena.alloc(TypeKind::Named {
            obj,
            underlying: self.invalid(),
            methods: Vec::new(),
        });
        self.ctx.objs.get_mut(obj).typ = named;
        self.declare(&spec.name, obj);
        named
    }

    /// Second phase: evaluate the underlying type and patch the handle.
    pub(crate) fn check_type_spec_underlying(&mut self, spec: &TypeSpec, named: TypeId) {
        let underlying = self.check_type_expr(&spec.typ);
        // The underlying of a named type is the underlying of what the
        // declaration names.
        let underlying = self.ctx.arena.underlying(underlying);
        self.ctx.arena.set_underlying(named, underlying);
    }

    pub(crate) fn complete_interfaces(&mut self) {
        let ifaces = std::mem::take(&mut self.ifaces);
        for iface in &ifaces {
            let mut seen = HashSet::new();
            let mut all = Vec::new();
            self.flatten_interface(*iface, &mut seen, &mut all);
            if let TypeKind::Interface {
                all_methods,
                complete,
                ..
            } = self.ctx.arena.kind_mut(*iface)
            {
                *all_methods = all;
                *complete = true;
            }
        }
        self.ifaces = ifaces;
    }

    fn flatten_interface(&self, iface: TypeId, seen: &mut HashSet<TypeId>, out: &mut Vec<ObjId>) {
        let underlying = self.ctx.arena.underlying(iface);
        if !seen.insert(underlying) {
            return;
        }
        if let TypeKind::Interface {
            methods, embeddeds, ..
        } = self.ctx.arena.kind(underlying)
        {
            let (methods, embeddeds) = (methods.clone(), embeddeds.clone());
            for m in methods {
                if !out.contains(&m) {
                    out.push(m);
                }
            }
            for e in embeddeds {
                self.flatten_interface(e, seen, out);
            }
        }
    }

    // Functions

    pub(crate) fn declare_func(&mut self, func: &FuncDecl) -> ObjId {
        let obj = self.ctx.objs.new_func(
            &func.name.name,
            self.invalid(),
            func.name.span.start,
            Some(self.pkg),
        );
        // Methods are reached through their receiver's type, not the
        // package scope.
        if func.recv.is_none() {
            if func.name.name == "init" {
                self.info.record_def(func.name.id, obj);
            } else {
                self.declare(&func.name, obj);
            }
        } else {
            self.info.record_def(func.name.id, obj);
        }
        obj
    }

    pub(crate) fn check_func_signature(&mut self, func: &FuncDecl, obj: ObjId) {
        let sig = self.build_signature(func.recv.as_ref(), &func.typ);
        self.ctx.objs.get_mut(obj).typ = sig;

        // Attach methods to the receiver's named type.
        if func.recv.is_some() {
            if let TypeKind::Signature {
                recv: Some(recv), ..
            } = self.ctx.arena.kind(sig)
            {
                let recv_typ = self.ctx.objs.get(*recv).typ;
                let (base, _) = self.ctx.arena.deopt(recv_typ);
                let (base, _) = self.ctx.arena.deref(base);
                if matches!(self.ctx.arena.kind(base), TypeKind::Named { .. }) {
                    self.ctx.arena.add_method(base, obj);
                }
            }
        }
    }

    /// Builds a `Signature` type from a receiver and a parsed func type.
    /// Parameter and result objects are created but not yet inserted into
    /// any scope; body checking declares them.
    pub(crate) fn build_signature(
        &mut self,
        recv: Option<&FieldList>,
        ft: &FuncType,
    ) -> TypeId {
        let mut recv_obj = None;
        let mut recv_optional = false;
        if let Some(recv_fields) = recv {
            if let Some(field) = recv_fields.list.first() {
                recv_optional = matches!(&field.typ, Expr::OptionalType(_));
                let typ = self.check_type_expr(&field.typ);
                let name = field
                    .names
                    .first()
                    .map(|n| n.name.clone())
                    .unwrap_or_default();
                let obj = self.ctx.objs.new_param(&name, typ, field.span.start, Some(self.pkg));
                if let Some(ident) = field.names.first() {
                    self.info.record_def(ident.id, obj);
                }
                recv_obj = Some(obj);
            }
        }

        let mut params = Vec::new();
        let mut variadic = false;
        let total = ft.params.list.len();
        for (gi, field) in ft.params.list.iter().enumerate() {
            let (typ, ellipsis) = match &field.typ {
                Expr::Ellipsis(e) => {
                    let elem = e
                        .elt
                        .as_ref()
                        .map(|elt| self.check_type_expr(elt))
                        .unwrap_or_else(|| self.invalid());
                    (self.ctx.arena.alloc(TypeKind::Slice { elem }), true)
                }
                other => (self.check_type_expr(other), false),
            };
            if ellipsis {
                if gi + 1 == total {
                    variadic = true;
                } else {
                    self.error(TypeError::InvalidOp {
                        message: "can only use ... with the final parameter".to_string(),
                        span: self.sspan(field.span),
                    });
                }
            }
            if field.names.is_empty() {
                params.push(self.ctx.objs.new_param("", typ, field.span.start, Some(self.pkg)));
            } else {
                for name in &field.names {
                    let obj =
                        self.ctx.objs.new_param(&name.name, typ, name.span.start, Some(self.pkg));
                    self.info.record_def(name.id, obj);
                    params.push(obj);
                }
            }
        }

        let mut results = Vec::new();
        let mut result_entangled = None;
        if let Some(result_fields) = &ft.results {
            for field in &result_fields.list {
                let typ = self.check_type_expr(&field.typ);
                if field.names.is_empty() {
                    results.push(self.new_result("", typ, field.span.start));
                } else {
                    for name in &field.names {
                        let obj = self.new_result(&name.name, typ, name.span.start);
                        self.info.record_def(name.id, obj);
                        results.push(obj);
                    }
                }
            }
            if let Some(tail) = &result_fields.entangled {
                let typ = self.check_type_expr(&tail.typ);
                let typ = self.entangled_tail_type(typ, tail.span);
                let name = tail.names.first().map(|n| n.name.as_str()).unwrap_or("");
                let obj = self.new_result(name, typ, tail.span.start);
                if let Some(ident) = tail.names.first() {
                    self.info.record_def(ident.id, obj);
                }
                result_entangled = Some(obj);
            }
        }

        self.ctx.arena.alloc(TypeKind::Signature {
            recv: recv_obj,
            recv_optional,
            params,
            results,
            result_entangled,
            variadic,
        })
    }

    fn new_result(&mut self, name: &str, typ: TypeId, pos: usize) -> ObjId {
        self.ctx.objs.alloc(Object {
            name: name.to_string(),
            kind: ObjKind::Var {
                is_field: false,
                anonymous: false,
                is_param: false,
                is_result: true,
            },
            typ,
            pos,
            scope_pos: pos,
            pkg: Some(self.pkg),
        })
    }

    /// The declared type of an entangled tail: optionable kinds are
    /// wrapped so the tail admits `nil` at every binding site; `bool`
    /// stays as is.
    pub(crate) fn entangled_tail_type(&mut self, typ: TypeId, span: sgo_parser::Span) -> TypeId {
        if self.ctx.arena.is_invalid(typ) || self.ctx.arena.is_optional(typ) {
            return typ;
        }
        if self.ctx.arena.is_optionable(typ) {
            return self.ctx.arena.alloc(TypeKind::Optional { elem: typ });
        }
        if self.ctx.arena.is_boolean(typ) {
            return typ;
        }
        self.error(TypeError::EntangleMisuse {
            message: format!(
                "entangled tail must have an optionable or boolean type, not {}",
                self.type_str(typ)
            ),
            span: self.sspan(span),
        });
        self.invalid()
    }

    pub(crate) fn check_func_body(&mut self, func: &FuncDecl, obj: ObjId) {
        let Some(body) = &func.body else { return };
        let sig = self.ctx.objs.get(obj).typ;
        let TypeKind::Signature {
            recv,
            params,
            results,
            result_entangled,
            ..
        } = self.ctx.arena.kind(sig)
        else {
            return;
        };
        let (recv, params, results, entangled) =
            (*recv, params.clone(), results.clone(), *result_entangled);
        self.enter_function(recv, &params, &results, entangled);
        let exit = self.check_block_list(&body.list);
        let needs_return = !results.is_empty() || entangled.is_some();
        if needs_return && !exit.terminated() {
            self.error(TypeError::InvalidOp {
                message: format!("missing return at end of {}", func.name.name),
                span: self.sspan(sgo_parser::Span::new(
                    body.span.end.saturating_sub(1),
                    body.span.end,
                )),
            });
        }
        self.leave_function();
    }

    pub(crate) fn enter_function(
        &mut self,
        recv: Option<ObjId>,
        params: &[ObjId],
        results: &[ObjId],
        entangled: Option<ObjId>,
    ) {
        self.open_scope();
        let named_results = results
            .iter()
            .any(|r| !self.ctx.objs.get(*r).name.is_empty());
        for obj in recv.iter().chain(params).chain(results).chain(entangled.iter()) {
            let name = self.ctx.objs.get(*obj).name.clone();
            if !name.is_empty() && name != "_" {
                self.ctx.scopes.insert(self.scope, &name, *obj);
            }
        }
        self.flow = FlowState::new();
        // Named results of an unwrapped optionable kind have no zero
        // value; they start unusable.
        for r in results {
            let typ = self.ctx.objs.get(*r).typ;
            if self.ctx.arena.is_optionable(typ) && !self.ctx.arena.is_optional(typ) {
                self.flow.declare_unusable(*r);
            }
        }
        self.func = Some(FuncCtx {
            results: results.to_vec(),
            entangled,
            named_results,
        });
    }

    pub(crate) fn leave_function(&mut self) {
        self.func = None;
        self.flow = FlowState::new();
        self.close_scope();
    }

    // Values

    pub(crate) fn declare_package_values(
        &mut self,
        tok: sgo_parser::DeclTok,
        spec: &ValueSpec,
    ) -> Vec<ObjId> {
        let mut objs = Vec::new();
        for name in &spec.names {
            let kind = if tok == sgo_parser::DeclTok::Const {
                ObjKind::Const { val: None }
            } else {
                ObjKind::Var {
                    is_field: false,
                    anonymous: false,
                    is_param: false,
                    is_result: false,
                }
            };
            let obj = self.ctx.objs.alloc(Object {
                name: name.name.clone(),
                kind,
                typ: self.invalid(),
                pos: name.span.start,
                scope_pos: name.span.start,
                pkg: Some(self.pkg),
            });
            self.declare(name, obj);
            objs.push(obj);
        }
        objs
    }

    pub(crate) fn check_const_spec(
        &mut self,
        spec: &ValueSpec,
        values_from: &ValueSpec,
        objs: &[ObjId],
    ) {
        let annotated = spec
            .typ
            .as_ref()
            .or(values_from.typ.as_ref())
            .map(|t| self.check_type_expr(t));
        for (i, obj) in objs.iter().enumerate() {
            let Some(value) = values_from.values.list.get(i) else {
                self.error(TypeError::AssignCount {
                    lhs: objs.len(),
                    rhs: values_from.values.len(),
                    span: self.sspan(spec.span),
                });
                break;
            };
            let x = self.check_expr(value);
            self.init_const(*obj, x, annotated, value.span());
        }
        if values_from.values.len() > objs.len() {
            self.error(TypeError::AssignCount {
                lhs: objs.len(),
                rhs: values_from.values.len(),
                span: self.sspan(spec.span),
            });
        }
    }

    pub(crate) fn check_var_spec(&mut self, spec: &ValueSpec, objs: &[ObjId]) {
        let annotated = spec.typ.as_ref().map(|t| self.check_type_expr(t));

        if spec.values.is_empty() {
            let typ = annotated.unwrap_or_else(|| self.invalid());
            for obj in objs {
                self.ctx.objs.get_mut(*obj).typ = typ;
                // Package-level variables cannot rely on usability
                // tracking; an unwrapped optionable kind must be
                // initialized at declaration.
                if self.func.is_none()
                    && self.ctx.arena.is_optionable(typ)
                    && !self.ctx.arena.is_optional(typ)
                {
                    let name = self.ctx.objs.get(*obj).name.clone();
                    self.error(TypeError::MissingInit {
                        typ: self.type_str(typ),
                        field: name,
                        span: self.sspan(spec.span),
                    });
                } else if self.func.is_some()
                    && self.ctx.arena.is_optionable(typ)
                    && !self.ctx.arena.is_optional(typ)
                {
                    self.flow.declare_unusable(*obj);
                }
            }
            return;
        }

        for obj in objs {
            if let Some(typ) = annotated {
                self.ctx.objs.get_mut(*obj).typ = typ;
            }
        }
        self.init_vars(objs, None, &spec.values, spec.span);
    }

    /// Port of the constant initialization rule: the right side must be
    /// constant; without a type annotation the constant keeps its untyped
    /// type.
    fn init_const(
        &mut self,
        obj: ObjId,
        x: super::exprs::Operand,
        annotated: Option<TypeId>,
        span: sgo_parser::Span,
    ) {
        use crate::info::OperandMode;
        if x.is_invalid() {
            return;
        }
        if x.mode != OperandMode::Constant {
            self.error(TypeError::InvalidOp {
                message: "constant initializer is not constant".to_string(),
                span: self.sspan(span),
            });
            return;
        }
        let mut x = x;
        if let Some(want) = annotated {
            if !self.assign_operand(&mut x, want, "constant declaration") {
                return;
            }
        }
        let typ = annotated.unwrap_or(x.typ);
        let data = self.ctx.objs.get_mut(obj);
        data.typ = typ;
        if let ObjKind::Const { val } = &mut data.kind {
            *val = x.val;
        }
    }

    /// Local declarations inside a function body.
    pub(crate) fn check_local_gen_decl(&mut self, gen: &sgo_parser::GenDecl) {
        use sgo_parser::Spec;
        match gen.tok {
            sgo_parser::DeclTok::Type => {
                for spec in &gen.specs {
                    if let Spec::Type(spec) = spec {
                        let named = self.declare_type_name(spec);
                        self.check_type_spec_underlying(spec, named);
                    }
                }
                self.complete_interfaces();
            }
            sgo_parser::DeclTok::Const => {
                let mut last_with_values: Option<&ValueSpec> = None;
                for (index, spec) in gen.specs.iter().enumerate() {
                    if let Spec::Value(spec) = spec {
                        let template = if spec.values.is_empty() {
                            last_with_values
                        } else {
                            last_with_values = Some(spec);
                            None
                        };
                        let objs = self.declare_package_values(gen.tok, spec);
                        self.iota = Some(index as i64);
                        self.check_const_spec(spec, template.unwrap_or(spec), &objs);
                        self.iota = None;
                    }
                }
            }
            sgo_parser::DeclTok::Var => {
                for spec in &gen.specs {
                    if let Spec::Value(spec) = spec {
                        let objs = self.declare_package_values(gen.tok, spec);
                        self.check_var_spec(spec, &objs);
                    }
                }
            }
            sgo_parser::DeclTok::Import => {}
        }
    }

    // Type expressions

    pub(crate) fn check_type_expr(&mut self, e: &Expr) -> TypeId {
        let typ = self.type_expr_inner(e);
        self.info
            .record_type(e.id(), OperandMode::TypeMode, typ, None);
        typ
    }

    fn type_expr_inner(&mut self, e: &Expr) -> TypeId {
        match e {
            Expr::Ident(ident) => self.type_from_ident(ident),
            Expr::Selector(sel) => {
                if let Expr::Ident(pkg_ident) = &*sel.x {
                    if let Some(obj) = self.lookup(&pkg_ident.name, pkg_ident.span.start) {
                        if let ObjKind::PkgName { pkg } = self.ctx.objs.get(obj).kind {
                            self.info.record_use(pkg_ident.id, obj);
                            return self.type_from_package(pkg, &sel.sel);
                        }
                    }
                }
                self.error(TypeError::Undeclared {
                    name: format!("{}", sel.sel),
                    span: self.sspan(sel.span),
                });
                self.invalid()
            }
            Expr::Paren(p) => self.type_expr_inner(&p.x),
            Expr::Star(star) => {
                let elem = self.check_type_expr(&star.x);
                self.ctx.arena.alloc(TypeKind::Pointer { elem })
            }
            Expr::OptionalType(opt) => {
                let elem = self.check_type_expr(&opt.elt);
                if self.ctx.arena.is_invalid(elem) {
                    return self.invalid();
                }
                if self.ctx.arena.is_optional(elem) || !self.ctx.arena.is_optionable(elem) {
                    self.error(TypeError::NotOptionable {
                        typ: self.type_str(elem),
                        span: self.sspan(opt.span),
                    });
                    return elem;
                }
                self.ctx.arena.alloc(TypeKind::Optional { elem })
            }
            Expr::ArrayType(arr) => {
                let elem = self.check_type_expr(&arr.elt);
                match &arr.len {
                    None => self.ctx.arena.alloc(TypeKind::Slice { elem }),
                    Some(len_expr) => {
                        let len = self.const_int(len_expr).unwrap_or(0);
                        self.ctx.arena.alloc(TypeKind::Array {
                            elem,
                            len: len.max(0) as u64,
                        })
                    }
                }
            }
            Expr::MapType(m) => {
                let key = self.check_type_expr(&m.key);
                let elem = self.check_type_expr(&m.value);
                self.ctx.arena.alloc(TypeKind::Map { key, elem })
            }
            Expr::ChanType(c) => {
                let elem = self.check_type_expr(&c.value);
                let dir = match c.dir {
                    AstChanDir::SendRecv => crate::types::ChanDir::SendRecv,
                    AstChanDir::Send => crate::types::ChanDir::Send,
                    AstChanDir::Recv => crate::types::ChanDir::Recv,
                };
                self.ctx.arena.alloc(TypeKind::Chan { dir, elem })
            }
            Expr::FuncType(ft) => self.build_signature(None, ft),
            Expr::StructType(st) => self.check_struct_type(st),
            Expr::InterfaceType(it) => self.check_interface_type(it),
            _ => {
                self.error(TypeError::InvalidOp {
                    message: "not a type".to_string(),
                    span: self.sspan(e.span()),
                });
                self.invalid()
            }
        }
    }

    fn type_from_ident(&mut self, ident: &Ident) -> TypeId {
        match self.lookup(&ident.name, ident.span.start) {
            Some(obj) => {
                self.info.record_use(ident.id, obj);
                match self.ctx.objs.get(obj).kind {
                    ObjKind::TypeName => self.ctx.objs.get(obj).typ,
                    _ => {
                        self.error(TypeError::InvalidOp {
                            message: format!("{} is not a type", ident.name),
                            span: self.sspan(ident.span),
                        });
                        self.invalid()
                    }
                }
            }
            None => {
                self.error(TypeError::Undeclared {
                    name: ident.name.clone(),
                    span: self.sspan(ident.span),
                });
                self.invalid()
            }
        }
    }

    fn type_from_package(&mut self, pkg: PkgId, sel: &Ident) -> TypeId {
        let scope = self.ctx.pkgs.get(pkg).scope;
        match self.ctx.scopes.lookup(scope, &sel.name) {
            Some(obj) if matches!(self.ctx.objs.get(obj).kind, ObjKind::TypeName) => {
                self.info.record_use(sel.id, obj);
                self.ctx.objs.get(obj).typ
            }
            _ => {
                self.error(TypeError::Undeclared {
                    name: sel.name.clone(),
                    span: self.sspan(sel.span),
                });
                self.invalid()
            }
        }
    }

    fn check_struct_type(&mut self, st: &sgo_parser::StructType) -> TypeId {
        let mut fields = Vec::new();
        for field in &st.fields.list {
            let typ = self.check_type_expr(&field.typ);
            let tag = field.tag.as_ref().map(|t| t.value.clone());
            if field.names.is_empty() {
                // embedded field; its name is the type's base name
                let name = embedded_field_name(&field.typ).unwrap_or_default();
                let var = self
                    .ctx
                    .objs
                    .new_field(&name, typ, true, field.span.start, Some(self.pkg));
                fields.push(StructField { var, tag });
            } else {
                for name in &field.names {
                    let var = self.ctx.objs.new_field(
                        &name.name,
                        typ,
                        false,
                        name.span.start,
                        Some(self.pkg),
                    );
                    self.info.record_def(name.id, var);
                    fields.push(StructField {
                        var,
                        tag: tag.clone(),
                    });
                }
            }
        }
        self.ctx.arena.alloc(TypeKind::Struct { fields })
    }

    fn check_interface_type(&mut self, it: &sgo_parser::InterfaceType) -> TypeId {
        let mut methods = Vec::new();
        let mut embeddeds = Vec::new();
        for field in &it.methods.list {
            if field.names.is_empty() {
                let typ = self.check_type_expr(&field.typ);
                if self.ctx.arena.is_interface(typ) {
                    embeddeds.push(typ);
                } else if !self.ctx.arena.is_invalid(typ) {
                    self.error(TypeError::InvalidOp {
                        message: "interface embedding requires an interface type".to_string(),
                        span: self.sspan(field.span),
                    });
                }
            } else {
                let Expr::FuncType(ft) = &field.typ else {
                    continue;
                };
                let sig = self.build_signature(None, ft);
                let name = &field.names[0];
                let obj = self
                    .ctx
                    .objs
                    .new_func(&name.name, sig, name.span.start, Some(self.pkg));
                self.info.record_def(name.id, obj);
                methods.push(obj);
            }
        }
        let iface = self.ctx.arena.alloc(TypeKind::Interface {
            methods: methods.clone(),
            embeddeds,
            all_methods: methods,
            complete: false,
        });
        self.ifaces.push(iface);
        iface
    }
}

fn embedded_field_name(typ: &Expr) -> Option<String> {
    match typ {
        Expr::Ident(id) => Some(id.name.clone()),
        Expr::Selector(sel) => Some(sel.sel.name.clone()),
        Expr::Star(star) => embedded_field_name(&star.x),
        Expr::OptionalType(opt) => embedded_field_name(&opt.elt),
        Expr::Paren(p) => embedded_field_name(&p.x),
        _ => None,
    }
}
