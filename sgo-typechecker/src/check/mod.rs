//! The checker.
//!
//! One `Checker` owns all mutable state for a translation unit; nothing is
//! shared or global, so units can be checked in parallel at the driver
//! level. Within a unit, declarations are checked in dependency order:
//! types first, then package-level values (ordered with a dependency
//! graph), then function bodies.

mod decls;
mod exprs;
pub mod flow;
mod stmts;

use crate::annotations::Catalogue;
use crate::error::{to_source_span, TypeError};
use crate::importer::Importer;
use crate::info::Info;
use crate::objects::{ObjId, Objects, Packages, PkgData, PkgId, ScopeId, Scopes};
use crate::types::{type_string, TypeArena, TypeId};
use crate::universe::Universe;
use flow::FlowState;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use sgo_parser::{Decl, DeclTok, Expr, File, Ident, Span, Spec};
use std::collections::{HashMap, HashSet};

/// Checker configuration shared across a run.
pub struct Config {
    /// Built-in annotation catalogue for standard-library imports.
    pub catalogue: Catalogue,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalogue: Catalogue::builtin(),
        }
    }
}

/// Arenas shared by a unit and everything it imports.
pub struct Context {
    pub arena: TypeArena,
    pub objs: Objects,
    pub scopes: Scopes,
    pub pkgs: Packages,
    pub universe: Universe,
    pub imported: HashMap<String, PkgId>,
    pub importing: HashSet<String>,
}

impl Context {
    pub fn new() -> Self {
        let mut arena = TypeArena::new();
        let mut objs = Objects::new();
        let mut scopes = Scopes::new();
        let universe = Universe::new(&mut arena, &mut objs, &mut scopes);
        Self {
            arena,
            objs,
            scopes,
            pkgs: Packages::new(),
            universe,
            imported: HashMap::new(),
            importing: HashSet::new(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Function-body checking context.
pub(crate) struct FuncCtx {
    pub results: Vec<ObjId>,
    pub entangled: Option<ObjId>,
    pub named_results: bool,
}

pub struct Checker<'a> {
    pub ctx: &'a mut Context,
    pub src: &'a str,
    pub info: &'a mut Info,
    pub errors: &'a mut Vec<TypeError>,
    pub importer: &'a mut dyn Importer,
    pub config: &'a Config,
    pub(crate) pkg: PkgId,
    pub(crate) scope: ScopeId,
    pub(crate) func: Option<FuncCtx>,
    pub(crate) flow: FlowState,
    /// Variables whose address was taken or which a closure assigns to;
    /// narrowing is disabled for them from that point on.
    pub(crate) no_narrow: HashSet<ObjId>,
    pub(crate) iota: Option<i64>,
    pub(crate) check_bodies: bool,
    /// Interfaces created while checking, finalized once all methods are
    /// attached.
    pub(crate) ifaces: Vec<TypeId>,
    /// Set while checking a right-hand side that may legally bind the
    /// comma-ok shape of a map index, channel receive or type assertion.
    pub(crate) comma_ok_ctx: bool,
    /// Object-id watermark of the enclosing function literal, for
    /// detecting assignments to captured variables.
    pub(crate) closure_boundary: Option<ObjId>,
}

/// Result of checking one translation unit.
pub fn check_unit(
    ctx: &mut Context,
    src: &str,
    file: &File,
    importer: &mut dyn Importer,
    config: &Config,
    check_bodies: bool,
) -> (PkgId, Info, Vec<TypeError>) {
    let pkg_scope = ctx.scopes.new_scope(Some(ctx.universe.scope));
    let pkg = ctx.pkgs.alloc(PkgData {
        path: file.package.name.clone(),
        name: file.package.name.clone(),
        scope: pkg_scope,
    });

    let mut info = Info::new();
    let mut errors = Vec::new();

    let mut checker = Checker {
        ctx,
        src,
        info: &mut info,
        errors: &mut errors,
        importer,
        config,
        pkg,
        scope: pkg_scope,
        func: None,
        flow: FlowState::new(),
        no_narrow: HashSet::new(),
        iota: None,
        check_bodies,
        ifaces: Vec::new(),
        comma_ok_ctx: false,
        closure_boundary: None,
    };
    checker.check_file(file);

    (pkg, info, errors)
}

impl<'a> Checker<'a> {
    pub(crate) fn error(&mut self, err: TypeError) {
        self.errors.push(err);
    }

    pub(crate) fn sspan(&self, span: Span) -> miette::SourceSpan {
        to_source_span(span)
    }

    pub(crate) fn type_str(&self, typ: TypeId) -> String {
        type_string(&self.ctx.arena, &self.ctx.objs, typ)
    }

    pub(crate) fn invalid(&self) -> TypeId {
        self.ctx.universe.invalid
    }

    pub(crate) fn open_scope(&mut self) -> ScopeId {
        let scope = self.ctx.scopes.new_scope(Some(self.scope));
        self.scope = scope;
        scope
    }

    pub(crate) fn close_scope(&mut self) {
        self.scope = self
            .ctx
            .scopes
            .parent(self.scope)
            .expect("cannot close the universe scope");
    }

    /// Declares `obj` under `name` in the current scope, reporting a
    /// redeclaration error when the name is taken.
    pub(crate) fn declare(&mut self, name: &Ident, obj: ObjId) {
        if name.is_blank() {
            self.info.record_def(name.id, obj);
            return;
        }
        if self
            .ctx
            .scopes
            .insert(self.scope, &name.name, obj)
            .is_some()
        {
            self.error(TypeError::Redeclared {
                name: name.name.clone(),
                span: self.sspan(name.span),
            });
        }
        self.info.record_def(name.id, obj);
    }

    pub(crate) fn lookup(&self, name: &str, pos: usize) -> Option<ObjId> {
        self.ctx
            .scopes
            .lookup_parent(&self.ctx.objs, self.scope, name, pos)
            .map(|(_, obj)| obj)
    }

    fn check_file(&mut self, file: &File) {
        // Collection: enter every package-level name with a placeholder
        // type so declarations may reference each other in any order.
        let mut type_specs = Vec::new();
        let mut value_decls = Vec::new();
        let mut func_decls = Vec::new();

        for decl in &file.decls {
            match decl {
                Decl::Gen(gen) => match gen.tok {
                    DeclTok::Import => {
                        for spec in &gen.specs {
                            if let Spec::Import(spec) = spec {
                                self.check_import_spec(spec);
                            }
                        }
                    }
                    DeclTok::Type => {
                        for spec in &gen.specs {
                            if let Spec::Type(spec) = spec {
                                let named = self.declare_type_name(spec);
                                type_specs.push((spec, named));
                            }
                        }
                    }
                    DeclTok::Const | DeclTok::Var => {
                        let mut group = Vec::new();
                        for (index, spec) in gen.specs.iter().enumerate() {
                            if let Spec::Value(spec) = spec {
                                let objs = self.declare_package_values(gen.tok, spec);
                                group.push((spec, objs, index));
                            }
                        }
                        value_decls.push((gen.tok, group));
                    }
                },
                Decl::Func(func) => {
                    let obj = self.declare_func(func);
                    func_decls.push((func, obj));
                }
                Decl::Bad(_) => {}
            }
        }

        // Types: patch underlyings in source order; handles recursive
        // graphs because every Named handle already exists.
        for (spec, named) in &type_specs {
            self.check_type_spec_underlying(spec, *named);
        }
        self.complete_interfaces();

        // Signatures next, so value initializers can call functions.
        for (func, obj) in &func_decls {
            self.check_func_signature(func, *obj);
        }

        // Package-level values in dependency order.
        self.check_value_decls_ordered(&value_decls);

        // Function bodies last.
        if self.check_bodies {
            for (func, obj) in &func_decls {
                self.check_func_body(func, *obj);
            }
        }
    }

    /// Orders package-level const/var specs by their references to other
    /// package-level values and checks them; reports initialization
    /// cycles.
    fn check_value_decls_ordered(
        &mut self,
        decls: &[(DeclTok, Vec<(&sgo_parser::ValueSpec, Vec<ObjId>, usize)>)],
    ) {
        struct Node<'s> {
            tok: DeclTok,
            spec: &'s sgo_parser::ValueSpec,
            /// For const specs without values: the previous spec in the
            /// group whose expressions are repeated.
            template: Option<&'s sgo_parser::ValueSpec>,
            objs: Vec<ObjId>,
            iota: i64,
        }

        let mut nodes = Vec::new();
        for (tok, group) in decls {
            let mut last_with_values: Option<&sgo_parser::ValueSpec> = None;
            for (spec, objs, index) in group {
                let template = if *tok == DeclTok::Const && spec.values.is_empty() {
                    last_with_values
                } else {
                    last_with_values = Some(spec);
                    None
                };
                nodes.push(Node {
                    tok: *tok,
                    spec,
                    template,
                    objs: objs.clone(),
                    iota: *index as i64,
                });
            }
        }

        // Map every declared object to its node for edge construction.
        let mut owner: HashMap<ObjId, usize> = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            for obj in &node.objs {
                owner.insert(*obj, i);
            }
        }

        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let indices: Vec<_> = (0..nodes.len()).map(|i| graph.add_node(i)).collect();
        for (i, node) in nodes.iter().enumerate() {
            let mut referenced = Vec::new();
            if let Some(typ) = &node.spec.typ {
                self.collect_value_refs(typ, &owner, &mut referenced);
            }
            for value in &node.spec.values.list {
                self.collect_value_refs(value, &owner, &mut referenced);
            }
            for target in referenced {
                if target != i {
                    graph.add_edge(indices[target], indices[i], ());
                }
            }
        }

        let order: Vec<usize> = match toposort(&graph, None) {
            Ok(sorted) => sorted.into_iter().map(|ix| graph[ix]).collect(),
            Err(cycle) => {
                let node = &nodes[graph[cycle.node_id()]];
                let names = node
                    .objs
                    .iter()
                    .map(|o| self.ctx.objs.get(*o).name.clone())
                    .collect::<Vec<_>>()
                    .join(", ");
                self.error(TypeError::InitializationCycle {
                    names,
                    span: self.sspan(node.spec.span),
                });
                (0..nodes.len()).collect()
            }
        };

        for i in order {
            let node = &nodes[i];
            self.iota = Some(node.iota);
            match node.tok {
                DeclTok::Const => {
                    let values = node.template.unwrap_or(node.spec);
                    self.check_const_spec(node.spec, values, &node.objs)
                }
                DeclTok::Var => self.check_var_spec(node.spec, &node.objs),
                _ => {}
            }
            self.iota = None;
        }
    }

    /// Records which ordering nodes an expression's identifiers refer to.
    fn collect_value_refs(
        &self,
        e: &Expr,
        owner: &HashMap<ObjId, usize>,
        out: &mut Vec<usize>,
    ) {
        match e {
            Expr::Ident(id) => {
                if let Some(obj) = self
                    .ctx
                    .scopes
                    .lookup(self.ctx.pkgs.get(self.pkg).scope, &id.name)
                {
                    if let Some(node) = owner.get(&obj) {
                        out.push(*node);
                    }
                }
            }
            Expr::Paren(p) => self.collect_value_refs(&p.x, owner, out),
            Expr::Unary(u) => self.collect_value_refs(&u.x, owner, out),
            Expr::Star(s) => self.collect_value_refs(&s.x, owner, out),
            Expr::Binary(b) => {
                self.collect_value_refs(&b.x, owner, out);
                self.collect_value_refs(&b.y, owner, out);
            }
            Expr::Call(c) => {
                self.collect_value_refs(&c.fun, owner, out);
                for a in &c.args {
                    self.collect_value_refs(a, owner, out);
                }
            }
            Expr::Index(ix) => {
                self.collect_value_refs(&ix.x, owner, out);
                self.collect_value_refs(&ix.index, owner, out);
            }
            Expr::Selector(sel) => self.collect_value_refs(&sel.x, owner, out),
            Expr::CompositeLit(lit) => {
                for elt in &lit.elts {
                    self.collect_value_refs(elt, owner, out);
                }
            }
            Expr::KeyValue(kv) => {
                self.collect_value_refs(&kv.key, owner, out);
                self.collect_value_refs(&kv.value, owner, out);
            }
            _ => {}
        }
    }
}
