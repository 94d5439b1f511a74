//! Statement checking.
//!
//! Carries the fact map across statement sequences, splits it at
//! branches, joins it at re-convergence, and implements the entangled
//! binding forms: entangled calls, comma-ok desugaring, and entangled
//! returns.

use super::exprs::Operand;
use super::flow::{
    collect_assigned_names, collect_assigned_stmt, cond_refinements, Exit, FlowState, Refine,
};
use super::Checker;
use crate::error::TypeError;
use crate::info::OperandMode;
use crate::objects::{ObjId, ObjKind, Object};
use crate::types::{TypeId, TypeKind};
use sgo_parser::{
    AssignOp, AssignStmt, BranchKind, Expr, ExprList, ForStmt, IfStmt, RangeStmt, ReturnStmt,
    SelectStmt, Span, Stmt, SwitchStmt, TypeSwitchStmt,
};

impl<'a> Checker<'a> {
    pub(crate) fn check_block_list(&mut self, stmts: &[Stmt]) -> Exit {
        let mut exit = Exit::Reachable;
        for stmt in stmts {
            if exit.terminated() {
                // unreachable code is tolerated; keep checking it
                self.check_stmt(stmt);
                continue;
            }
            exit = self.check_stmt(stmt);
        }
        exit
    }

    pub(crate) fn check_stmt(&mut self, stmt: &Stmt) -> Exit {
        match stmt {
            Stmt::Bad(_) | Stmt::Empty(_) => Exit::Reachable,
            Stmt::Decl(decl) => {
                if let sgo_parser::Decl::Gen(gen) = &decl.decl {
                    self.check_local_gen_decl(gen);
                }
                Exit::Reachable
            }
            Stmt::Labeled(labeled) => self.check_stmt(&labeled.stmt),
            Stmt::Expr(es) => {
                let x = self.check_expr(&es.x);
                match es.x.unparen() {
                    Expr::Call(call) => {
                        if is_panic_call(call) {
                            return Exit::Terminated;
                        }
                    }
                    Expr::Unary(u) if u.op == sgo_parser::UnOp::Recv => {}
                    _ => {
                        if !x.is_invalid() {
                            self.error(TypeError::InvalidOp {
                                message: "expression evaluated but not used".to_string(),
                                span: self.sspan(es.span),
                            });
                        }
                    }
                }
                Exit::Reachable
            }
            Stmt::Send(send) => {
                let ch = self.check_expr(&send.chan);
                if self.ctx.arena.is_optional(ch.typ) {
                    self.optional_use("send on", &send.chan, ch.typ, send.span);
                    self.check_expr(&send.value);
                    return Exit::Reachable;
                }
                let elem = match self.ctx.arena.kind(self.ctx.arena.underlying(ch.typ)) {
                    TypeKind::Chan { dir, elem } => {
                        let dir = *dir;
                        let elem = *elem;
                        if dir == crate::types::ChanDir::Recv {
                            self.error(TypeError::InvalidOp {
                                message: "cannot send to receive-only channel".to_string(),
                                span: self.sspan(send.span),
                            });
                        }
                        Some(elem)
                    }
                    _ => {
                        if !ch.is_invalid() {
                            self.error(TypeError::InvalidOp {
                                message: format!("cannot send to {}", self.type_str(ch.typ)),
                                span: self.sspan(send.span),
                            });
                        }
                        None
                    }
                };
                let mut v = self.check_expr(&send.value);
                if let Some(elem) = elem {
                    if !v.is_invalid() {
                        self.assign_operand(&mut v, elem, "send");
                    }
                }
                Exit::Reachable
            }
            Stmt::IncDec(s) => {
                let x = self.check_expr(&s.x);
                if !x.is_invalid() {
                    let numeric = self
                        .ctx
                        .arena
                        .basic_kind(x.typ)
                        .map(|k| k.is_numeric())
                        .unwrap_or(false);
                    if !numeric || x.mode != OperandMode::Variable {
                        self.error(TypeError::InvalidOp {
                            message: "operand of ++/-- must be a numeric variable".to_string(),
                            span: self.sspan(s.span),
                        });
                    }
                }
                if let Some(obj) = self.local_var_of(&s.x) {
                    self.mark_assigned(obj);
                }
                Exit::Reachable
            }
            Stmt::Assign(assign) => {
                self.check_assign_stmt(assign);
                Exit::Reachable
            }
            Stmt::Go(s) => {
                self.check_expr(&Expr::Call(s.call.clone()));
                Exit::Reachable
            }
            Stmt::Defer(s) => {
                self.check_expr(&Expr::Call(s.call.clone()));
                Exit::Reachable
            }
            Stmt::Return(ret) => self.check_return(ret),
            Stmt::Branch(branch) => match branch.kind {
                BranchKind::Fallthrough => Exit::Reachable,
                _ => Exit::Terminated,
            },
            Stmt::Block(block) => {
                self.open_scope();
                let exit = self.check_block_list(&block.list);
                self.close_scope();
                exit
            }
            Stmt::If(s) => self.check_if(s),
            Stmt::Switch(s) => self.check_switch(s),
            Stmt::TypeSwitch(s) => self.check_type_switch(s),
            Stmt::Select(s) => self.check_select(s),
            Stmt::For(s) => self.check_for(s),
            Stmt::Range(s) => self.check_range(s),
        }
    }

    // Branching

    /// The refinements a checked condition implies on each branch.
    fn refinements_for(&self, cond: &Expr, when_true: bool) -> Vec<Refine> {
        let mut out = Vec::new();
        let resolve = |e: &Expr| self.local_var_of(e);
        let is_nil = |e: &Expr| match e.unparen() {
            Expr::Ident(id) => self
                .info
                .uses
                .get(&id.id)
                .map(|obj| *obj == self.ctx.universe.nil_obj)
                .unwrap_or(false),
            _ => false,
        };
        let is_bool_const = |e: &Expr| match e.unparen() {
            Expr::Ident(id) => self
                .info
                .types
                .get(&id.id)
                .and_then(|tv| tv.val.as_ref())
                .and_then(|v| match v {
                    crate::constants::Value::Bool(b) => Some(*b),
                    _ => None,
                }),
            _ => None,
        };
        let optional_elem = |obj: ObjId| {
            let typ = self.ctx.objs.get(obj).typ;
            match self.ctx.arena.kind(typ) {
                TypeKind::Optional { elem } => Some(*elem),
                _ => match self.ctx.arena.kind(self.ctx.arena.underlying(typ)) {
                    TypeKind::Optional { elem } => Some(*elem),
                    _ => None,
                },
            }
        };
        cond_refinements(
            cond,
            when_true,
            &resolve,
            &is_nil,
            &is_bool_const,
            &optional_elem,
            &mut out,
        );
        out
    }

    fn apply_refines(&mut self, refines: &[Refine]) {
        for refine in refines {
            match refine {
                Refine::Narrow(obj, typ) => {
                    // Aliasing disables narrowing; the advisory fires at
                    // the use site.
                    if !self.no_narrow.contains(obj) {
                        self.flow.narrow(*obj, *typ);
                    }
                }
                Refine::Resolve(obj) => self.flow.resolve(*obj),
            }
        }
    }

    fn check_bool_cond(&mut self, cond: &Expr) {
        let x = self.check_expr(cond);
        if !x.is_invalid() && !self.ctx.arena.is_boolean(x.typ) {
            self.error(TypeError::Mismatch {
                want: "bool".to_string(),
                found: self.type_str(x.typ),
                span: self.sspan(cond.span()),
            });
        }
    }

    fn check_if(&mut self, s: &IfStmt) -> Exit {
        self.open_scope();
        if let Some(init) = &s.init {
            self.check_stmt(init);
        }
        self.check_bool_cond(&s.cond);
        let entry = self.flow.clone();

        self.apply_refines(&self.refinements_for(&s.cond, true));
        self.open_scope();
        let exit_then = self.check_block_list(&s.body.list);
        self.close_scope();
        let after_then = std::mem::replace(&mut self.flow, entry);

        self.apply_refines(&self.refinements_for(&s.cond, false));
        let exit_else = match &s.else_branch {
            Some(else_stmt) => self.check_stmt(else_stmt),
            None => Exit::Reachable,
        };
        let after_else = self.flow.clone();

        let exit = if exit_then.terminated() && exit_else.terminated() {
            Exit::Terminated
        } else {
            Exit::Reachable
        };
        self.flow = match (exit_then.terminated(), exit_else.terminated()) {
            (false, true) => after_then,
            (true, _) => after_else,
            (false, false) => FlowState::join(&after_then, &after_else, &self.ctx.arena, &self.ctx.objs),
        };
        self.close_scope();
        exit
    }

    fn check_for(&mut self, s: &ForStmt) -> Exit {
        self.open_scope();
        if let Some(init) = &s.init {
            self.check_stmt(init);
        }

        // Loop head fixpoint: narrowings of anything the body or post
        // statement may assign do not survive into the next iteration, so
        // drop them before checking the body once.
        let mut assigned = Vec::new();
        collect_assigned_names(&s.body.list, &mut assigned);
        if let Some(post) = &s.post {
            collect_assigned_stmt(post, &mut assigned);
        }
        self.invalidate_assigned(&assigned);

        if let Some(cond) = &s.cond {
            self.check_bool_cond(cond);
        }
        let entry = self.flow.clone();

        if let Some(cond) = &s.cond {
            self.apply_refines(&self.refinements_for(cond, true));
        }
        self.open_scope();
        self.check_block_list(&s.body.list);
        self.close_scope();
        if let Some(post) = &s.post {
            self.check_stmt(post);
        }

        // After the loop only the condition's false side is known.
        self.flow = entry;
        if let Some(cond) = &s.cond {
            self.apply_refines(&self.refinements_for(cond, false));
        }
        self.close_scope();

        if s.cond.is_none() && !has_break(&s.body.list) {
            Exit::Terminated
        } else {
            Exit::Reachable
        }
    }

    fn check_range(&mut self, s: &RangeStmt) -> Exit {
        self.open_scope();

        let x = self.check_expr(&s.x);
        let (key_typ, value_typ) = if self.ctx.arena.is_optional(x.typ) {
            self.optional_use("range over", &s.x, x.typ, s.span);
            (self.invalid(), None)
        } else {
            match self.ctx.arena.kind(self.ctx.arena.underlying(x.typ)).clone() {
                TypeKind::Slice { elem } => (self.ctx.universe.int_, Some(elem)),
                TypeKind::Array { elem, .. } => (self.ctx.universe.int_, Some(elem)),
                TypeKind::Map { key, elem } => (key, Some(elem)),
                TypeKind::Chan { elem, .. } => (elem, None),
                TypeKind::Basic(k) if k.is_string() => {
                    (self.ctx.universe.int_, Some(self.ctx.universe.int32_))
                }
                _ => {
                    if !x.is_invalid() {
                        self.error(TypeError::InvalidOp {
                            message: format!("cannot range over {}", self.type_str(x.typ)),
                            span: self.sspan(s.x.span()),
                        });
                    }
                    (self.invalid(), None)
                }
            }
        };

        if s.defines {
            for (expr, typ) in [(&s.key, Some(key_typ)), (&s.value, value_typ)]
                .into_iter()
                .filter_map(|(e, t)| e.as_ref().map(|e| (e, t)))
            {
                let Some(typ) = typ else {
                    self.error(TypeError::InvalidOp {
                        message: "too many variables in range".to_string(),
                        span: self.sspan(expr.span()),
                    });
                    continue;
                };
                if let Expr::Ident(ident) = expr {
                    let obj =
                        self.ctx
                            .objs
                            .new_var(&ident.name, typ, ident.span.start, Some(self.pkg));
                    self.declare(ident, obj);
                }
            }
        } else {
            for expr in [&s.key, &s.value].into_iter().flatten() {
                if self.check_assign_target(expr).is_some() {
                    if let Some(obj) = self.local_var_of(expr) {
                        self.mark_assigned(obj);
                    }
                }
            }
        }

        let mut assigned = Vec::new();
        collect_assigned_names(&s.body.list, &mut assigned);
        self.invalidate_assigned(&assigned);

        let entry = self.flow.clone();
        self.open_scope();
        self.check_block_list(&s.body.list);
        self.close_scope();
        self.flow = entry;
        self.close_scope();
        Exit::Reachable
    }

    fn check_switch(&mut self, s: &SwitchStmt) -> Exit {
        self.open_scope();
        if let Some(init) = &s.init {
            self.check_stmt(init);
        }
        let tag = s.tag.as_ref().map(|tag| self.check_expr(tag));
        let entry = self.flow.clone();

        let mut states = Vec::new();
        let mut has_default = false;
        let mut all_terminated = true;
        for clause in &s.body {
            self.flow = entry.clone();
            if clause.list.is_empty() {
                has_default = true;
            }
            for case in &clause.list.list {
                match &tag {
                    Some(tag_op) => {
                        let mut x = self.check_expr(case);
                        if !x.is_invalid() && !tag_op.is_invalid() {
                            self.assign_operand(&mut x, self.default_type(tag_op.typ), "case");
                        }
                    }
                    None => {
                        self.check_bool_cond(case);
                    }
                }
            }
            // A tag-less switch with a single condition refines like an if.
            if tag.is_none() && clause.list.len() == 1 {
                self.apply_refines(&self.refinements_for(&clause.list.list[0], true));
            }
            self.open_scope();
            let exit = self.check_block_list(&clause.body);
            self.close_scope();
            if !exit.terminated() {
                all_terminated = false;
                states.push(self.flow.clone());
            }
        }

        self.join_states(entry, states, has_default);
        self.close_scope();
        if all_terminated && has_default && !s.body.is_empty() {
            Exit::Terminated
        } else {
            Exit::Reachable
        }
    }

    fn check_type_switch(&mut self, s: &TypeSwitchStmt) -> Exit {
        self.open_scope();
        if let Some(init) = &s.init {
            self.check_stmt(init);
        }

        // Unwrap the assertion and optional binding.
        let (binding, assert) = match &*s.assign {
            Stmt::Expr(es) => (None, assert_of(&es.x)),
            Stmt::Assign(assign) => {
                let name = match assign.lhs.list.first().map(|e| e.unparen()) {
                    Some(Expr::Ident(id)) => Some(id.clone()),
                    _ => None,
                };
                (name, assign.rhs.list.first().and_then(assert_of))
            }
            _ => (None, None),
        };
        let Some(assert) = assert else {
            self.error(TypeError::Internal {
                message: "malformed type switch".to_string(),
                span: self.sspan(s.span),
            });
            self.close_scope();
            return Exit::Reachable;
        };

        let x = self.check_expr(&assert.x);
        if self.ctx.arena.is_optional(x.typ) {
            self.optional_use("type-switch on", &assert.x, x.typ, assert.span);
        } else if !x.is_invalid() && !self.ctx.arena.is_interface(x.typ) {
            self.error(TypeError::InvalidOp {
                message: format!("{} is not an interface", self.type_str(x.typ)),
                span: self.sspan(assert.x.span()),
            });
        }
        let scrutinee = self.local_var_of(&assert.x);
        let entry = self.flow.clone();

        let mut states = Vec::new();
        let mut has_default = false;
        let mut all_terminated = true;
        for clause in &s.body {
            self.flow = entry.clone();
            self.open_scope();
            let mut clause_typ = x.typ;
            if clause.list.is_empty() {
                has_default = true;
            } else {
                let mut types = Vec::new();
                for case in &clause.list.list {
                    if is_nil_ident(case) {
                        types.push(x.typ);
                        continue;
                    }
                    let t = self.check_type_expr(case);
                    self.check_assertable(x.typ, t, case.span());
                    types.push(t);
                }
                if types.len() == 1 {
                    clause_typ = types[0];
                    if let Some(obj) = scrutinee {
                        if !self.no_narrow.contains(&obj) {
                            self.flow.narrow(obj, clause_typ);
                        }
                    }
                }
            }
            // The binding variable is declared afresh in every clause,
            // with the single case type where there is one.
            if let Some(ident) = &binding {
                let obj = self.ctx.objs.new_var(
                    &ident.name,
                    clause_typ,
                    ident.span.start,
                    Some(self.pkg),
                );
                self.ctx.scopes.insert(self.scope, &ident.name, obj);
                self.info.record_def(ident.id, obj);
            }
            let exit = self.check_block_list(&clause.body);
            self.close_scope();
            if !exit.terminated() {
                all_terminated = false;
                states.push(self.flow.clone());
            }
        }

        self.join_states(entry, states, has_default);
        self.close_scope();
        if all_terminated && has_default && !s.body.is_empty() {
            Exit::Terminated
        } else {
            Exit::Reachable
        }
    }

    fn check_select(&mut self, s: &SelectStmt) -> Exit {
        let entry = self.flow.clone();
        let mut states = Vec::new();
        let mut has_default = false;
        let mut all_terminated = !s.body.is_empty();
        for clause in &s.body {
            self.flow = entry.clone();
            self.open_scope();
            if let Some(comm) = &clause.comm {
                self.check_stmt(comm);
            } else {
                has_default = true;
            }
            let exit = self.check_block_list(&clause.body);
            self.close_scope();
            if !exit.terminated() {
                all_terminated = false;
                states.push(self.flow.clone());
            }
        }
        self.join_states(entry, states, true);
        if all_terminated && has_default {
            Exit::Terminated
        } else {
            Exit::Reachable
        }
    }

    /// Joins the exits of a multi-way branch. Without a default, the
    /// entry state is one of the possible continuations.
    fn join_states(&mut self, entry: FlowState, mut states: Vec<FlowState>, exhaustive: bool) {
        if !exhaustive {
            states.push(entry.clone());
        }
        let mut iter = states.into_iter();
        let mut acc = match iter.next() {
            Some(first) => first,
            None => entry,
        };
        for state in iter {
            acc = FlowState::join(&acc, &state, &self.ctx.arena, &self.ctx.objs);
        }
        self.flow = acc;
    }

    fn invalidate_assigned(&mut self, names: &[String]) {
        for name in names {
            if let Some((scope, obj)) = self.ctx.scopes.lookup_parent(
                &self.ctx.objs,
                self.scope,
                name,
                crate::objects::NO_POS,
            ) {
                if scope != self.ctx.universe.scope {
                    self.flow.clear_narrow(obj);
                }
            }
        }
    }

    /// An assignment to a local variable updates the fact map; an
    /// assignment to a variable captured by a function literal disables
    /// its narrowing for good.
    pub(crate) fn mark_assigned(&mut self, obj: ObjId) {
        self.flow.assign(obj);
        if let Some(boundary) = self.closure_boundary {
            if obj < boundary {
                self.no_narrow.insert(obj);
            }
        }
    }

    // Returns

    fn check_return(&mut self, ret: &ReturnStmt) -> Exit {
        let Some(func) = &self.func else {
            self.error(TypeError::InvalidOp {
                message: "return outside function".to_string(),
                span: self.sspan(ret.span),
            });
            return Exit::Terminated;
        };
        let results = func.results.clone();
        let entangled = func.entangled;
        let named = func.named_results;

        match entangled {
            None => {
                if ret.results.is_entangled() {
                    self.error(TypeError::EntangleMisuse {
                        message: "function signature has no entangled tail".to_string(),
                        span: self.sspan(ret.span),
                    });
                    return Exit::Terminated;
                }
                if ret.results.is_empty() {
                    if !results.is_empty() && !named {
                        self.error(TypeError::ReturnCount {
                            want: results.len(),
                            got: 0,
                            span: self.sspan(ret.span),
                        });
                    }
                    return Exit::Terminated;
                }
                self.init_result_values(&ret.results.list, &results, ret.span);
                Exit::Terminated
            }
            Some(tail_obj) => {
                let pos = ret.results.entangled_pos;
                if pos == 0 {
                    self.error(TypeError::EntangleMisuse {
                        message: "return from a function with entangled results needs '\\'"
                            .to_string(),
                        span: self.sspan(ret.span),
                    });
                    return Exit::Terminated;
                }
                let values = ret.results.values();
                let tail = ret.results.tail();
                if tail.len() > 1 {
                    self.error(TypeError::EntangleArity {
                        want: 1,
                        got: tail.len(),
                        span: self.sspan(ret.span),
                    });
                    return Exit::Terminated;
                }
                let tail_typ = self.ctx.objs.get(tail_obj).typ;
                let tail_is_bool = self.ctx.arena.is_boolean(tail_typ);

                match (values.is_empty(), tail.first()) {
                    // return \ err — the failure side
                    (true, Some(tail_expr)) => {
                        let mut x = self.check_expr(tail_expr);
                        if tail_is_bool {
                            // success is denoted by completing the value
                            // side; only the false constant may appear
                            // here
                            if !matches!(&x.val, Some(v) if v.is_false()) {
                                self.error(TypeError::EntangleMisuse {
                                    message: "entangled bool must be the false constant"
                                        .to_string(),
                                    span: self.sspan(tail_expr.span()),
                                });
                            }
                        } else if !x.is_invalid() {
                            self.assign_operand(&mut x, tail_typ, "entangled tail");
                        }
                    }
                    // return v1, v2 \ — the success side
                    (false, None) => {
                        self.init_result_values(values, &results, ret.span);
                    }
                    // return v1, v2 \ err — both sides, optionable tails
                    // only; reserved for manual interop
                    (false, Some(tail_expr)) => {
                        if tail_is_bool {
                            self.error(TypeError::EntangleMisuse {
                                message:
                                    "a boolean tail cannot be combined with returned values"
                                        .to_string(),
                                span: self.sspan(tail_expr.span()),
                            });
                        }
                        self.init_result_values(values, &results, ret.span);
                        let mut x = self.check_expr(tail_expr);
                        if !tail_is_bool && !x.is_invalid() {
                            self.assign_operand(&mut x, tail_typ, "entangled tail");
                        }
                    }
                    // bare "return \" — nothing on either side
                    (true, None) => {
                        if !results.is_empty() {
                            self.error(TypeError::ReturnCount {
                                want: results.len(),
                                got: 0,
                                span: self.sspan(ret.span),
                            });
                        }
                    }
                }
                Exit::Terminated
            }
        }
    }

    fn init_result_values(&mut self, values: &[Expr], results: &[ObjId], span: Span) {
        // A single call may supply all results.
        if values.len() == 1 && results.len() > 1 {
            let x = self.check_rhs_expr(&values[0]);
            if let TypeKind::Tuple { vars, entangled } = self.ctx.arena.kind(x.typ) {
                let (vars, entangled) = (vars.clone(), *entangled);
                if entangled.is_some() {
                    self.error(TypeError::EntangleMisuse {
                        message: "cannot forward an entangled call as plain results".to_string(),
                        span: self.sspan(span),
                    });
                }
                if vars.len() != results.len() {
                    self.error(TypeError::ReturnCount {
                        want: results.len(),
                        got: vars.len(),
                        span: self.sspan(span),
                    });
                    return;
                }
                for (v, r) in vars.iter().zip(results) {
                    let have = self.ctx.objs.get(*v).typ;
                    let want = self.ctx.objs.get(*r).typ;
                    let mut op = Operand {
                        mode: OperandMode::Value,
                        typ: have,
                        val: None,
                        span,
                        node: None,
                    };
                    self.assign_operand(&mut op, want, "return value");
                }
                return;
            }
            if values.len() != results.len() {
                self.error(TypeError::ReturnCount {
                    want: results.len(),
                    got: values.len(),
                    span: self.sspan(span),
                });
                return;
            }
        }
        if values.len() != results.len() {
            self.error(TypeError::ReturnCount {
                want: results.len(),
                got: values.len(),
                span: self.sspan(span),
            });
        }
        for (value, result) in values.iter().zip(results) {
            let want = self.ctx.objs.get(*result).typ;
            let mut x = self.check_expr(value);
            if !x.is_invalid() {
                self.assign_operand(&mut x, want, "return value");
            }
        }
    }

    // Assignments

    fn check_assign_stmt(&mut self, assign: &AssignStmt) {
        match assign.op {
            AssignOp::Define => self.check_short_var_decl(assign),
            AssignOp::Assign => self.check_plain_assign(assign),
            _ => self.check_op_assign(assign),
        }
    }

    fn check_op_assign(&mut self, assign: &AssignStmt) {
        if assign.lhs.len() != 1 || assign.rhs.len() != 1 || assign.lhs.is_entangled() {
            self.error(TypeError::InvalidOp {
                message: "operator assignment needs exactly one operand per side".to_string(),
                span: self.sspan(assign.span),
            });
            return;
        }
        let lhs = &assign.lhs.list[0];
        let x = match self.check_assign_target(lhs) {
            Some(x) => x,
            None => return,
        };
        let mut y = self.check_expr(&assign.rhs.list[0]);
        if !y.is_invalid() && !self.ctx.arena.is_invalid(x.typ) {
            self.assign_operand(&mut y, x.typ, "assignment");
        }
        if let Some(obj) = self.local_var_of(lhs) {
            self.mark_assigned(obj);
        }
    }

    /// Checks an assignment target, without treating the read as a use.
    fn check_assign_target(&mut self, lhs: &Expr) -> Option<Operand> {
        let x = match lhs.unparen() {
            Expr::Ident(ident) if ident.is_blank() => return None,
            Expr::Ident(ident) => self.check_ident(ident, false),
            other => self.check_expr(other),
        };
        if x.is_invalid() {
            return None;
        }
        if !matches!(x.mode, OperandMode::Variable | OperandMode::MapIndex) {
            self.error(TypeError::InvalidOp {
                message: "cannot assign to this expression".to_string(),
                span: self.sspan(lhs.span()),
            });
            return None;
        }
        // Assigning through a variable uses its declared type, not a
        // narrowing.
        let typ = match self.local_var_of(lhs) {
            Some(obj) => self.ctx.objs.get(obj).typ,
            None => x.typ,
        };
        Some(Operand { typ, ..x })
    }

    fn check_plain_assign(&mut self, assign: &AssignStmt) {
        // v \ ok = m[k] requires plain identifiers on the left.
        if assign.lhs.is_entangled() {
            for lhs in &assign.lhs.list {
                if !matches!(lhs.unparen(), Expr::Ident(_)) {
                    self.error(TypeError::EntangleMisuse {
                        message: "entangled assignment requires plain identifiers".to_string(),
                        span: self.sspan(lhs.span()),
                    });
                    return;
                }
            }
        }

        let mut lhs_objs = Vec::new();
        let mut lhs_types = Vec::new();
        for lhs in &assign.lhs.list {
            let obj = self.local_var_of(lhs).or_else(|| match lhs.unparen() {
                Expr::Ident(ident) if !ident.is_blank() => self
                    .lookup(&ident.name, ident.span.start)
                    .filter(|o| self.ctx.objs.get(*o).is_var()),
                _ => None,
            });
            let typ = match self.check_assign_target(lhs) {
                Some(x) => x.typ,
                None => self.invalid(),
            };
            lhs_objs.push(obj);
            lhs_types.push(typ);
        }

        if assign.lhs.is_entangled() {
            self.check_entangled_binding(assign, &lhs_objs, &lhs_types);
            return;
        }

        // a, b = f() — a single multi-valued call
        if assign.rhs.len() == 1 && assign.lhs.len() > 1 {
            let allow_comma_ok = assign.lhs.len() == 2;
            let x = if allow_comma_ok {
                self.check_rhs_expr(&assign.rhs.list[0])
            } else {
                self.check_expr(&assign.rhs.list[0])
            };
            if let TypeKind::Tuple { vars, entangled } = self.ctx.arena.kind(x.typ) {
                let (vars, entangled) = (vars.clone(), *entangled);
                if entangled.is_some() {
                    self.error(TypeError::EntangleMisuse {
                        message: "expected entangled assignment, but left-hand side is not entangled"
                            .to_string(),
                        span: self.sspan(assign.span),
                    });
                    return;
                }
                if vars.len() != assign.lhs.len() {
                    self.error(TypeError::AssignCount {
                        lhs: assign.lhs.len(),
                        rhs: vars.len(),
                        span: self.sspan(assign.span),
                    });
                    return;
                }
                for ((v, want), obj) in vars.iter().zip(&lhs_types).zip(&lhs_objs) {
                    let have = self.ctx.objs.get(*v).typ;
                    let mut op = Operand {
                        mode: OperandMode::Value,
                        typ: have,
                        val: None,
                        span: assign.span,
                        node: None,
                    };
                    if !self.ctx.arena.is_invalid(*want) {
                        self.assign_operand(&mut op, *want, "assignment");
                    }
                    if let Some(obj) = obj {
                        self.mark_assigned(*obj);
                    }
                }
                return;
            }
            if x.mode == OperandMode::CommaOk && assign.lhs.len() == 2 {
                // old-style comma-ok assignment without '\'; treated as
                // the entangled desugaring
                self.info
                    .record_comma_ok(assign.rhs.list[0].id(), [x.typ, self.ctx.universe.bool_]);
                for (i, (want, obj)) in lhs_types.iter().zip(&lhs_objs).enumerate() {
                    let have = if i == 0 {
                        x.typ
                    } else {
                        self.ctx.universe.untyped_bool
                    };
                    let mut op = Operand {
                        mode: OperandMode::Value,
                        typ: have,
                        val: None,
                        span: assign.span,
                        node: None,
                    };
                    if !self.ctx.arena.is_invalid(*want) {
                        self.assign_operand(&mut op, *want, "assignment");
                    }
                    if let Some(obj) = obj {
                        self.mark_assigned(*obj);
                    }
                }
                return;
            }
            self.error(TypeError::AssignCount {
                lhs: assign.lhs.len(),
                rhs: 1,
                span: self.sspan(assign.span),
            });
            return;
        }

        if assign.rhs.is_entangled() {
            self.error(TypeError::EntangleMisuse {
                message: "expected entangled assignment, but left-hand side is not entangled"
                    .to_string(),
                span: self.sspan(assign.span),
            });
            return;
        }
        if assign.lhs.len() != assign.rhs.len() {
            self.error(TypeError::AssignCount {
                lhs: assign.lhs.len(),
                rhs: assign.rhs.len(),
                span: self.sspan(assign.span),
            });
            return;
        }
        for ((rhs, want), obj) in assign.rhs.list.iter().zip(&lhs_types).zip(&lhs_objs) {
            let mut x = self.check_expr(rhs);
            if !x.is_invalid() && !self.ctx.arena.is_invalid(*want) {
                self.assign_operand(&mut x, *want, "assignment");
            }
            if let Some(obj) = obj {
                self.mark_assigned(*obj);
            }
        }
    }

    /// `v \ ok = rhs` over existing variables.
    fn check_entangled_binding(
        &mut self,
        assign: &AssignStmt,
        lhs_objs: &[Option<ObjId>],
        lhs_types: &[TypeId],
    ) {
        let pos = assign.lhs.entangled_pos;
        let value_count = pos - 1;
        if assign.lhs.len() != value_count + 1 {
            self.error(TypeError::EntangleArity {
                want: 1,
                got: assign.lhs.len() - value_count,
                span: self.sspan(assign.span),
            });
            return;
        }
        if assign.rhs.len() != 1 || assign.rhs.is_entangled() {
            self.error(TypeError::EntangleMisuse {
                message: "entangled assignment requires a single fallible operation".to_string(),
                span: self.sspan(assign.span),
            });
            return;
        }
        let rhs = &assign.rhs.list[0];
        let x = self.check_rhs_expr(rhs);
        let tail_index = value_count;

        if let TypeKind::Tuple { vars, entangled } = self.ctx.arena.kind(x.typ) {
            let (vars, entangled) = (vars.clone(), *entangled);
            let Some(entangled) = entangled else {
                self.error(TypeError::EntangleMisuse {
                    message: "right-hand side is not entangled".to_string(),
                    span: self.sspan(rhs.span()),
                });
                return;
            };
            if vars.len() != value_count {
                self.error(TypeError::AssignCount {
                    lhs: value_count,
                    rhs: vars.len(),
                    span: self.sspan(assign.span),
                });
                return;
            }
            for ((v, want), obj) in vars.iter().zip(lhs_types).zip(lhs_objs) {
                let have = self.ctx.objs.get(*v).typ;
                let mut op = Operand {
                    mode: OperandMode::Value,
                    typ: have,
                    val: None,
                    span: assign.span,
                    node: None,
                };
                if !self.ctx.arena.is_invalid(*want) {
                    self.assign_operand(&mut op, *want, "assignment");
                }
                if let Some(obj) = obj {
                    self.mark_assigned(*obj);
                }
            }
            let tail_have = self.ctx.objs.get(entangled).typ;
            let mut op = Operand {
                mode: OperandMode::Value,
                typ: tail_have,
                val: None,
                span: assign.span,
                node: None,
            };
            if !self.ctx.arena.is_invalid(lhs_types[tail_index]) {
                self.assign_operand(&mut op, lhs_types[tail_index], "entangled tail");
            }
            self.bind_collapse(lhs_objs, tail_index);
            return;
        }

        if x.mode == OperandMode::CommaOk && value_count == 1 {
            self.info
                .record_comma_ok(rhs.id(), [x.typ, self.ctx.universe.bool_]);
            let mut v = Operand {
                mode: OperandMode::Value,
                typ: x.typ,
                val: None,
                span: assign.span,
                node: None,
            };
            if !self.ctx.arena.is_invalid(lhs_types[0]) {
                self.assign_operand(&mut v, lhs_types[0], "assignment");
            }
            let mut ok = Operand {
                mode: OperandMode::Value,
                typ: self.ctx.universe.untyped_bool,
                val: None,
                span: assign.span,
                node: None,
            };
            if !self.ctx.arena.is_invalid(lhs_types[tail_index]) {
                self.assign_operand(&mut ok, lhs_types[tail_index], "entangled tail");
            }
            self.bind_collapse(lhs_objs, tail_index);
            return;
        }

        self.error(TypeError::EntangleMisuse {
            message: "right-hand side of '\\' binding cannot fail".to_string(),
            span: self.sspan(rhs.span()),
        });
    }

    fn bind_collapse(&mut self, lhs_objs: &[Option<ObjId>], tail_index: usize) {
        let companions: Vec<ObjId> = lhs_objs[..tail_index]
            .iter()
            .flatten()
            .copied()
            .collect();
        if let Some(Some(tail)) = lhs_objs.get(tail_index) {
            self.mark_assigned(*tail);
            self.flow.set_collapses(*tail, companions);
        }
    }

    // Short variable declarations

    fn check_short_var_decl(&mut self, assign: &AssignStmt) {
        let entangled_pos = assign.lhs.entangled_pos;
        if entangled_pos > 0 && assign.lhs.tail().len() != 1 {
            self.error(TypeError::EntangleArity {
                want: 1,
                got: assign.lhs.tail().len(),
                span: self.sspan(assign.span),
            });
            return;
        }

        // Collect left-hand variables, reusing in-scope ones.
        let mut new_vars = Vec::new();
        let mut objs = Vec::new();
        for lhs in &assign.lhs.list {
            let obj = match lhs.unparen() {
                Expr::Ident(ident) => {
                    if let Some(existing) = self.ctx.scopes.lookup(self.scope, &ident.name) {
                        if self.ctx.objs.get(existing).is_var() {
                            self.info.record_use(ident.id, existing);
                            existing
                        } else {
                            self.error(TypeError::InvalidOp {
                                message: format!("cannot assign to {}", ident.name),
                                span: self.sspan(ident.span),
                            });
                            self.new_blank_var(lhs.span())
                        }
                    } else {
                        let obj = self.ctx.objs.new_var(
                            &ident.name,
                            self.invalid(),
                            ident.span.start,
                            Some(self.pkg),
                        );
                        self.info.record_def(ident.id, obj);
                        if !ident.is_blank() {
                            new_vars.push((ident.clone(), obj));
                        }
                        obj
                    }
                }
                _ => {
                    self.error(TypeError::InvalidOp {
                        message: "cannot declare this expression".to_string(),
                        span: self.sspan(lhs.span()),
                    });
                    self.new_blank_var(lhs.span())
                }
            };
            objs.push(obj);
        }

        let (value_objs, tail_obj) = if entangled_pos > 0 {
            let tail_index = entangled_pos - 1;
            (objs[..tail_index].to_vec(), Some(objs[tail_index]))
        } else {
            (objs.clone(), None)
        };

        self.init_vars(&value_objs, tail_obj, &assign.rhs, assign.span);

        if new_vars.is_empty() {
            self.error(TypeError::InvalidOp {
                message: "no new variables on left side of :=".to_string(),
                span: self.sspan(assign.span),
            });
        }
        let scope_pos = assign.rhs.span.end;
        for (ident, obj) in &new_vars {
            self.ctx.objs.get_mut(*obj).scope_pos = scope_pos;
            if self
                .ctx
                .scopes
                .insert(self.scope, &ident.name, *obj)
                .is_some()
            {
                self.error(TypeError::Redeclared {
                    name: ident.name.clone(),
                    span: self.sspan(ident.span),
                });
            }
        }

        // Entangled binding: companions are unusable until the tail is
        // proven to denote the success case.
        if let Some(tail) = tail_obj {
            let companions: Vec<ObjId> = value_objs
                .iter()
                .filter(|o| self.ctx.objs.get(**o).name != "_")
                .copied()
                .collect();
            self.flow.set_collapses(tail, companions);
        }
    }

    fn new_blank_var(&mut self, span: Span) -> ObjId {
        self.ctx.objs.alloc(Object {
            name: "_".to_string(),
            kind: ObjKind::Var {
                is_field: false,
                anonymous: false,
                is_param: false,
                is_result: false,
            },
            typ: self.invalid(),
            pos: span.start,
            scope_pos: span.start,
            pkg: Some(self.pkg),
        })
    }

    /// Initializes declared variables from a right-hand side, handling
    /// entangled calls and the comma-ok desugaring.
    pub(crate) fn init_vars(
        &mut self,
        lhs: &[ObjId],
        entangled_lhs: Option<ObjId>,
        rhs: &ExprList,
        span: Span,
    ) {
        if rhs.is_entangled() {
            self.error(TypeError::EntangleMisuse {
                message: "must have values at either side of \\, not both".to_string(),
                span: self.sspan(rhs.span),
            });
            return;
        }

        // A single expression may be a multi-value or fallible operation.
        if rhs.len() == 1 && (lhs.len() > 1 || entangled_lhs.is_some()) {
            let allow_comma_ok = entangled_lhs.is_some() && lhs.len() == 1;
            let x = if allow_comma_ok {
                self.check_rhs_expr(&rhs.list[0])
            } else {
                self.check_expr(&rhs.list[0])
            };

            if let TypeKind::Tuple { vars, entangled } = self.ctx.arena.kind(x.typ) {
                let (vars, entangled) = (vars.clone(), *entangled);
                match (entangled, entangled_lhs) {
                    (Some(_), None) => {
                        self.error(TypeError::EntangleMisuse {
                            message:
                                "expected entangled assignment, but left-hand side is not entangled"
                                    .to_string(),
                            span: self.sspan(span),
                        });
                        return;
                    }
                    (None, Some(_)) => {
                        self.error(TypeError::EntangleMisuse {
                            message: "right-hand side is not entangled".to_string(),
                            span: self.sspan(span),
                        });
                        return;
                    }
                    _ => {}
                }
                if vars.len() != lhs.len() {
                    self.error(TypeError::AssignCount {
                        lhs: lhs.len(),
                        rhs: vars.len(),
                        span: self.sspan(span),
                    });
                    return;
                }
                for (v, obj) in vars.iter().zip(lhs) {
                    let have = self.ctx.objs.get(*v).typ;
                    self.init_var_from_type(*obj, have, span);
                }
                if let (Some(tuple_tail), Some(lhs_tail)) = (entangled, entangled_lhs) {
                    let have = self.ctx.objs.get(tuple_tail).typ;
                    self.init_var_from_type(lhs_tail, have, span);
                }
                return;
            }

            if x.mode == OperandMode::CommaOk && entangled_lhs.is_some() {
                self.info
                    .record_comma_ok(rhs.list[0].id(), [x.typ, self.ctx.universe.bool_]);
                self.init_var_from_type(lhs[0], x.typ, span);
                self.init_var_from_type(entangled_lhs.unwrap(), self.ctx.universe.bool_, span);
                return;
            }

            if entangled_lhs.is_some() {
                self.error(TypeError::EntangleMisuse {
                    message: "right-hand side of '\\' binding cannot fail".to_string(),
                    span: self.sspan(rhs.list[0].span()),
                });
                return;
            }
            self.error(TypeError::AssignCount {
                lhs: lhs.len(),
                rhs: 1,
                span: self.sspan(span),
            });
            return;
        }

        if entangled_lhs.is_some() {
            self.error(TypeError::EntangleMisuse {
                message: "right-hand side of '\\' binding cannot fail".to_string(),
                span: self.sspan(rhs.span),
            });
            return;
        }
        if rhs.len() != lhs.len() {
            self.error(TypeError::AssignCount {
                lhs: lhs.len(),
                rhs: rhs.len(),
                span: self.sspan(span),
            });
            return;
        }
        for (value, obj) in rhs.list.iter().zip(lhs) {
            let mut x = self.check_expr(value);
            self.init_var(*obj, &mut x);
        }
    }

    /// Port of the single-variable initialization rule: an untyped right
    /// side takes its default type; a declared type checks assignability.
    pub(crate) fn init_var(&mut self, obj: ObjId, x: &mut Operand) {
        if x.is_invalid() {
            // leave an unset type invalid to suppress cascades
            return;
        }
        let declared = self.ctx.objs.get(obj).typ;
        if self.ctx.arena.is_invalid(declared) {
            if self.ctx.arena.is_untyped_nil(x.typ) {
                self.error(TypeError::UntypedNil {
                    span: self.sspan(x.span),
                });
                return;
            }
            let typ = self.default_type(x.typ);
            self.ctx.objs.get_mut(obj).typ = typ;
            self.mark_assigned(obj);
            return;
        }
        if self.assign_operand(x, declared, "initialization") {
            self.mark_assigned(obj);
        }
    }

    fn init_var_from_type(&mut self, obj: ObjId, have: TypeId, span: Span) {
        let mut x = Operand {
            mode: OperandMode::Value,
            typ: have,
            val: None,
            span,
            node: None,
        };
        self.init_var(obj, &mut x);
    }
}

fn assert_of(e: &Expr) -> Option<&sgo_parser::TypeAssertExpr> {
    match e.unparen() {
        Expr::TypeAssert(assert) if assert.typ.is_none() => Some(assert),
        _ => None,
    }
}

fn is_nil_ident(e: &Expr) -> bool {
    matches!(e.unparen(), Expr::Ident(id) if id.name == "nil")
}

fn is_panic_call(call: &sgo_parser::CallExpr) -> bool {
    matches!(call.fun.unparen(), Expr::Ident(id) if id.name == "panic")
}

/// Whether a statement list contains a break that would leave the
/// enclosing loop (approximated: not nested in an inner loop or switch).
fn has_break(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_has_break)
}

fn stmt_has_break(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Branch(b) => b.kind == BranchKind::Break,
        Stmt::If(s) => {
            has_break(&s.body.list)
                || s.else_branch
                    .as_ref()
                    .map(|e| stmt_has_break(e))
                    .unwrap_or(false)
        }
        Stmt::Block(b) => has_break(&b.list),
        Stmt::Labeled(l) => stmt_has_break(&l.stmt),
        _ => false,
    }
}

