//! Flow-sensitive refinement.
//!
//! The fact map tracks, per variable, a narrowed type and a usability
//! flag. It evolves along statements, splits at branches, and joins at
//! re-convergence. Narrowed types and usability live only while one
//! function body is checked.

use crate::objects::{ObjId, Objects};
use crate::types::{identical, TypeArena, TypeId};
use sgo_parser::{BinOp, Expr, UnOp};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct VarFlow {
    pub narrowed: Option<TypeId>,
    pub usable: bool,
    pub collapses: Vec<ObjId>,
}

/// The fact map Γ. Variables not present are usable and unnarrowed.
#[derive(Debug, Clone, Default)]
pub struct FlowState {
    facts: HashMap<ObjId, VarFlow>,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn narrowed(&self, obj: ObjId) -> Option<TypeId> {
        self.facts.get(&obj).and_then(|f| f.narrowed)
    }

    pub fn is_usable(&self, obj: ObjId) -> bool {
        self.facts.get(&obj).map(|f| f.usable).unwrap_or(true)
    }

    pub fn collapses(&self, obj: ObjId) -> &[ObjId] {
        self.facts
            .get(&obj)
            .map(|f| f.collapses.as_slice())
            .unwrap_or(&[])
    }

    fn entry(&mut self, obj: ObjId) -> &mut VarFlow {
        self.facts.entry(obj).or_insert(VarFlow {
            narrowed: None,
            usable: true,
            collapses: Vec::new(),
        })
    }

    pub fn declare_unusable(&mut self, obj: ObjId) {
        let f = self.entry(obj);
        f.usable = false;
    }

    pub fn set_collapses(&mut self, tail: ObjId, companions: Vec<ObjId>) {
        for v in &companions {
            self.entry(*v).usable = false;
        }
        self.entry(tail).collapses = companions;
    }

    /// Resolving a tail restores usability to every companion atomically.
    pub fn resolve(&mut self, tail: ObjId) {
        let companions = self
            .facts
            .get(&tail)
            .map(|f| f.collapses.clone())
            .unwrap_or_default();
        for v in companions {
            self.entry(v).usable = true;
        }
    }

    pub fn narrow(&mut self, obj: ObjId, typ: TypeId) {
        self.entry(obj).narrowed = Some(typ);
    }

    pub fn clear_narrow(&mut self, obj: ObjId) {
        if let Some(f) = self.facts.get_mut(&obj) {
            f.narrowed = None;
        }
    }

    /// A complete assignment makes the variable usable and invalidates any
    /// narrowing it carried.
    pub fn assign(&mut self, obj: ObjId) {
        let f = self.entry(obj);
        f.usable = true;
        f.narrowed = None;
    }

    /// Join at re-convergence: narrowings survive only where both branches
    /// agree; usability survives only where both branches grant it.
    pub fn join(a: &FlowState, b: &FlowState, arena: &TypeArena, objs: &Objects) -> FlowState {
        let mut out = FlowState::new();
        let keys = a.facts.keys().chain(b.facts.keys());
        for &obj in keys {
            if out.facts.contains_key(&obj) {
                continue;
            }
            let fa = a.facts.get(&obj);
            let fb = b.facts.get(&obj);
            let narrowed = match (fa.and_then(|f| f.narrowed), fb.and_then(|f| f.narrowed)) {
                (Some(x), Some(y)) if x == y || identical(arena, objs, x, y) => Some(x),
                _ => None,
            };
            let usable = fa.map(|f| f.usable).unwrap_or(true)
                && fb.map(|f| f.usable).unwrap_or(true);
            let collapses = fa
                .or(fb)
                .map(|f| f.collapses.clone())
                .unwrap_or_default();
            out.facts.insert(
                obj,
                VarFlow {
                    narrowed,
                    usable,
                    collapses,
                },
            );
        }
        out
    }
}

/// Whether control flow can continue past a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Reachable,
    Terminated,
}

impl Exit {
    pub fn terminated(self) -> bool {
        self == Exit::Terminated
    }
}

/// A fact implied by a condition along one branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Refine {
    /// The variable is proven non-nil; treat it at its element type.
    Narrow(ObjId, TypeId),
    /// The entangled tail is proven to denote success; companions become
    /// usable.
    Resolve(ObjId),
}

/// Extracts the refinements a condition implies along the branch taken
/// when it evaluates to `when_true`. The condition has already been
/// checked, so identifier uses and nil-ness are answered by `resolve` and
/// `is_nil`.
pub fn cond_refinements(
    cond: &Expr,
    when_true: bool,
    resolve: &dyn Fn(&Expr) -> Option<ObjId>,
    is_nil: &dyn Fn(&Expr) -> bool,
    is_bool_const: &dyn Fn(&Expr) -> Option<bool>,
    optional_elem: &dyn Fn(ObjId) -> Option<TypeId>,
    out: &mut Vec<Refine>,
) {
    match cond {
        Expr::Paren(p) => {
            cond_refinements(&p.x, when_true, resolve, is_nil, is_bool_const, optional_elem, out)
        }
        Expr::Unary(u) if u.op == UnOp::Not => {
            cond_refinements(&u.x, !when_true, resolve, is_nil, is_bool_const, optional_elem, out)
        }
        Expr::Binary(b) if b.op == BinOp::LAnd => {
            // Both conjuncts hold on the true side; nothing is known on
            // the false side.
            if when_true {
                cond_refinements(&b.x, true, resolve, is_nil, is_bool_const, optional_elem, out);
                cond_refinements(&b.y, true, resolve, is_nil, is_bool_const, optional_elem, out);
            }
        }
        Expr::Binary(b) if b.op == BinOp::LOr => {
            // Both disjuncts fail on the false side.
            if !when_true {
                cond_refinements(&b.x, false, resolve, is_nil, is_bool_const, optional_elem, out);
                cond_refinements(&b.y, false, resolve, is_nil, is_bool_const, optional_elem, out);
            }
        }
        Expr::Binary(b) if b.op == BinOp::Eql || b.op == BinOp::Neq => {
            let positive = (b.op == BinOp::Eql) == when_true;

            // x == nil / x != nil
            let (var_side, other) = if is_nil(&b.y) {
                (&b.x, &b.y)
            } else if is_nil(&b.x) {
                (&b.y, &b.x)
            } else {
                (&b.x, &b.y)
            };
            if is_nil(other) {
                if let Some(obj) = resolve(var_side) {
                    if positive {
                        // proven nil: an entangled tail's success case
                        out.push(Refine::Resolve(obj));
                    } else if let Some(elem) = optional_elem(obj) {
                        out.push(Refine::Narrow(obj, elem));
                    }
                }
                return;
            }

            // ok == true / ok != false and symmetric forms
            let (var_side, konst) = if is_bool_const(&b.y).is_some() {
                (&b.x, is_bool_const(&b.y))
            } else {
                (&b.y, is_bool_const(&b.x))
            };
            if let Some(k) = konst {
                let polarity = if k { when_true } else { !when_true };
                let polarity = if b.op == BinOp::Neq { !polarity } else { polarity };
                cond_refinements(
                    var_side,
                    polarity,
                    resolve,
                    is_nil,
                    is_bool_const,
                    optional_elem,
                    out,
                );
            }
        }
        Expr::Ident(_) => {
            // A boolean tail used directly as the condition.
            if when_true {
                if let Some(obj) = resolve(cond) {
                    out.push(Refine::Resolve(obj));
                }
            }
        }
        _ => {}
    }
}

/// Collects the names a statement list may assign to, for invalidating
/// narrowings at a loop head. Address-taking counts as an assignment.
pub fn collect_assigned_names(stmts: &[sgo_parser::Stmt], out: &mut Vec<String>) {
    for stmt in stmts {
        collect_assigned_stmt(stmt, out);
    }
}

fn push_target(e: &Expr, out: &mut Vec<String>) {
    if let Expr::Ident(id) = e.unparen() {
        out.push(id.name.clone());
    }
}

fn collect_assigned_expr(e: &Expr, out: &mut Vec<String>) {
    match e {
        Expr::Unary(u) if u.op == UnOp::Addr => push_target(&u.x, out),
        Expr::Unary(u) => collect_assigned_expr(&u.x, out),
        Expr::Binary(b) => {
            collect_assigned_expr(&b.x, out);
            collect_assigned_expr(&b.y, out);
        }
        Expr::Paren(p) => collect_assigned_expr(&p.x, out),
        Expr::Call(c) => {
            collect_assigned_expr(&c.fun, out);
            for a in &c.args {
                collect_assigned_expr(a, out);
            }
        }
        Expr::FuncLit(f) => collect_assigned_names(&f.body.list, out),
        _ => {}
    }
}

pub fn collect_assigned_stmt(stmt: &sgo_parser::Stmt, out: &mut Vec<String>) {
    use sgo_parser::Stmt;
    match stmt {
        Stmt::Assign(a) => {
            for lhs in &a.lhs.list {
                push_target(lhs, out);
            }
            for rhs in &a.rhs.list {
                collect_assigned_expr(rhs, out);
            }
        }
        Stmt::IncDec(s) => push_target(&s.x, out),
        Stmt::Expr(s) => collect_assigned_expr(&s.x, out),
        Stmt::Send(s) => {
            collect_assigned_expr(&s.chan, out);
            collect_assigned_expr(&s.value, out);
        }
        Stmt::Block(b) => collect_assigned_names(&b.list, out),
        Stmt::If(s) => {
            if let Some(init) = &s.init {
                collect_assigned_stmt(init, out);
            }
            collect_assigned_expr(&s.cond, out);
            collect_assigned_names(&s.body.list, out);
            if let Some(e) = &s.else_branch {
                collect_assigned_stmt(e, out);
            }
        }
        Stmt::For(s) => {
            if let Some(init) = &s.init {
                collect_assigned_stmt(init, out);
            }
            if let Some(post) = &s.post {
                collect_assigned_stmt(post, out);
            }
            collect_assigned_names(&s.body.list, out);
        }
        Stmt::Range(s) => {
            if let Some(k) = &s.key {
                push_target(k, out);
            }
            if let Some(v) = &s.value {
                push_target(v, out);
            }
            collect_assigned_names(&s.body.list, out);
        }
        Stmt::Switch(s) => {
            for clause in &s.body {
                collect_assigned_names(&clause.body, out);
            }
        }
        Stmt::TypeSwitch(s) => {
            for clause in &s.body {
                collect_assigned_names(&clause.body, out);
            }
        }
        Stmt::Select(s) => {
            for clause in &s.body {
                if let Some(comm) = &clause.comm {
                    collect_assigned_stmt(comm, out);
                }
                collect_assigned_names(&clause.body, out);
            }
        }
        Stmt::Labeled(s) => collect_assigned_stmt(&s.stmt, out),
        Stmt::Go(s) => {
            for a in &s.call.args {
                collect_assigned_expr(a, out);
            }
        }
        Stmt::Defer(s) => {
            for a in &s.call.args {
                collect_assigned_expr(a, out);
            }
        }
        _ => {}
    }
}
