//! Expression checking.
//!
//! Extends the base checker's expression rules to optionals: the only
//! operations admitted on a value of optional type are `==` and `!=`
//! against `nil`; everything else requires the fact map to show the
//! variable narrowed at the use site.

use super::Checker;
use crate::constants::{self, Value};
use crate::error::TypeError;
use crate::info::OperandMode;
use crate::lookup::{lookup_field_or_method, missing_method, LookupResult};
use crate::objects::{Builtin, ObjId, ObjKind};
use crate::optionables::find_optionables;
use crate::types::{identical, BasicKind, ChanDir, TypeId, TypeKind};
use sgo_parser::{BinOp, Expr, Ident, LitKind, NodeId, Span, UnOp};

#[derive(Debug, Clone)]
pub(crate) struct Operand {
    pub mode: OperandMode,
    pub typ: TypeId,
    pub val: Option<Value>,
    pub span: Span,
    pub node: Option<NodeId>,
}

impl Operand {
    pub fn invalid(span: Span, invalid: TypeId) -> Self {
        Operand {
            mode: OperandMode::Invalid,
            typ: invalid,
            val: None,
            span,
            node: None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.mode == OperandMode::Invalid
    }
}

impl<'a> Checker<'a> {
    /// Checks an expression in value context.
    pub(crate) fn check_expr(&mut self, e: &Expr) -> Operand {
        let saved = self.comma_ok_ctx;
        self.comma_ok_ctx = false;
        let x = self.check_expr_impl(e);
        self.comma_ok_ctx = saved;
        x
    }

    /// Checks a right-hand side which may legally produce the comma-ok
    /// shape (map index, channel receive, type assertion).
    pub(crate) fn check_rhs_expr(&mut self, e: &Expr) -> Operand {
        let saved = self.comma_ok_ctx;
        self.comma_ok_ctx = true;
        let x = self.check_expr_impl(e);
        self.comma_ok_ctx = saved;
        x
    }

    fn record(&mut self, x: &Operand) {
        if let Some(node) = x.node {
            self.info.record_type(node, x.mode, x.typ, x.val.clone());
        }
    }

    fn check_expr_impl(&mut self, e: &Expr) -> Operand {
        let mut x = match e {
            Expr::Ident(ident) => self.check_ident(ident, true),
            Expr::BasicLit(lit) => self.check_basic_lit(lit),
            Expr::Paren(p) => {
                let inner = self.check_expr_impl(&p.x);
                Operand {
                    node: Some(p.id),
                    span: p.span,
                    ..inner
                }
            }
            Expr::Unary(u) => self.check_unary(u),
            Expr::Binary(b) => self.check_binary(b),
            Expr::Star(s) => self.check_deref(s),
            Expr::Call(call) => self.check_call(call),
            Expr::Selector(sel) => self.check_selector(sel),
            Expr::Index(ix) => self.check_index(ix),
            Expr::Slice(sl) => self.check_slice(sl),
            Expr::TypeAssert(assert) => self.check_type_assert(assert),
            Expr::CompositeLit(lit) => self.check_composite_lit(lit, None),
            Expr::FuncLit(lit) => self.check_func_lit(lit),
            Expr::ArrayType(_)
            | Expr::MapType(_)
            | Expr::ChanType(_)
            | Expr::FuncType(_)
            | Expr::StructType(_)
            | Expr::InterfaceType(_)
            | Expr::OptionalType(_) => {
                let typ = self.check_type_expr(e);
                Operand {
                    mode: OperandMode::TypeMode,
                    typ,
                    val: None,
                    span: e.span(),
                    node: Some(e.id()),
                }
            }
            _ => {
                self.error(TypeError::InvalidOp {
                    message: "expression expected".to_string(),
                    span: self.sspan(e.span()),
                });
                Operand::invalid(e.span(), self.invalid())
            }
        };
        if x.node.is_none() {
            x.node = Some(e.id());
        }
        self.record(&x);
        x
    }

    /// Checks an expression that may denote either a value or a type, as
    /// in the callee position of a conversion.
    pub(crate) fn check_expr_or_type(&mut self, e: &Expr) -> Operand {
        match e {
            Expr::Ident(ident) => {
                if let Some(obj) = self.lookup(&ident.name, ident.span.start) {
                    if matches!(self.ctx.objs.get(obj).kind, ObjKind::TypeName) {
                        let typ = self.check_type_expr(e);
                        return Operand {
                            mode: OperandMode::TypeMode,
                            typ,
                            val: None,
                            span: ident.span,
                            node: Some(ident.id),
                        };
                    }
                }
                self.check_expr_impl(e)
            }
            Expr::Selector(sel) => {
                if let Expr::Ident(pkg_ident) = &*sel.x {
                    if let Some(obj) = self.lookup(&pkg_ident.name, pkg_ident.span.start) {
                        if let ObjKind::PkgName { pkg } = self.ctx.objs.get(obj).kind {
                            let scope = self.ctx.pkgs.get(pkg).scope;
                            if let Some(target) = self.ctx.scopes.lookup(scope, &sel.sel.name) {
                                if matches!(self.ctx.objs.get(target).kind, ObjKind::TypeName) {
                                    let typ = self.check_type_expr(e);
                                    return Operand {
                                        mode: OperandMode::TypeMode,
                                        typ,
                                        val: None,
                                        span: sel.span,
                                        node: Some(sel.id),
                                    };
                                }
                            }
                        }
                    }
                }
                self.check_expr_impl(e)
            }
            Expr::Paren(p) => {
                let inner = self.check_expr_or_type(&p.x);
                Operand {
                    node: Some(p.id),
                    span: p.span,
                    ..inner
                }
            }
            Expr::Star(star) => {
                let inner = self.check_expr_or_type(&star.x);
                if inner.mode == OperandMode::TypeMode {
                    let typ = self.ctx.arena.alloc(TypeKind::Pointer { elem: inner.typ });
                    self.info
                        .record_type(star.id, OperandMode::TypeMode, typ, None);
                    return Operand {
                        mode: OperandMode::TypeMode,
                        typ,
                        val: None,
                        span: star.span,
                        node: Some(star.id),
                    };
                }
                let x = self.deref_operand(inner, star);
                self.record(&x);
                x
            }
            Expr::ArrayType(_)
            | Expr::MapType(_)
            | Expr::ChanType(_)
            | Expr::FuncType(_)
            | Expr::StructType(_)
            | Expr::InterfaceType(_)
            | Expr::OptionalType(_) => {
                let typ = self.check_type_expr(e);
                Operand {
                    mode: OperandMode::TypeMode,
                    typ,
                    val: None,
                    span: e.span(),
                    node: Some(e.id()),
                }
            }
            _ => self.check_expr_impl(e),
        }
    }

    pub(crate) fn check_ident(&mut self, ident: &Ident, value_ctx: bool) -> Operand {
        if ident.is_blank() {
            self.error(TypeError::InvalidOp {
                message: "cannot use _ as value".to_string(),
                span: self.sspan(ident.span),
            });
            return Operand::invalid(ident.span, self.invalid());
        }
        let Some(obj) = self.lookup(&ident.name, ident.span.start) else {
            self.error(TypeError::Undeclared {
                name: ident.name.clone(),
                span: self.sspan(ident.span),
            });
            return Operand::invalid(ident.span, self.invalid());
        };
        self.info.record_use(ident.id, obj);
        let (typ, kind) = {
            let data = self.ctx.objs.get(obj);
            (data.typ, data.kind.clone())
        };
        match &kind {
            ObjKind::Var { .. } => {
                if value_ctx && !self.flow.is_usable(obj) {
                    self.error(TypeError::UsedUninitialized {
                        name: ident.name.clone(),
                        span: self.sspan(ident.span),
                    });
                }
                let typ = self.flow.narrowed(obj).unwrap_or(typ);
                Operand {
                    mode: OperandMode::Variable,
                    typ,
                    val: None,
                    span: ident.span,
                    node: Some(ident.id),
                }
            }
            ObjKind::Const { val } => {
                let val = if ident.name == "iota" && val.is_none() {
                    self.iota.map(Value::Int)
                } else {
                    val.clone()
                };
                Operand {
                    mode: OperandMode::Constant,
                    typ,
                    val,
                    span: ident.span,
                    node: Some(ident.id),
                }
            }
            ObjKind::TypeName => Operand {
                mode: OperandMode::TypeMode,
                typ,
                val: None,
                span: ident.span,
                node: Some(ident.id),
            },
            ObjKind::Func => Operand {
                mode: OperandMode::Value,
                typ,
                val: None,
                span: ident.span,
                node: Some(ident.id),
            },
            ObjKind::Builtin(_) => Operand {
                mode: OperandMode::BuiltinMode,
                typ: self.invalid(),
                val: None,
                span: ident.span,
                node: Some(ident.id),
            },
            ObjKind::Nil => Operand {
                mode: OperandMode::Value,
                typ: self.ctx.universe.untyped_nil,
                val: None,
                span: ident.span,
                node: Some(ident.id),
            },
            ObjKind::PkgName { .. } => {
                self.error(TypeError::InvalidOp {
                    message: format!("use of package {} without selector", ident.name),
                    span: self.sspan(ident.span),
                });
                Operand::invalid(ident.span, self.invalid())
            }
        }
    }

    fn check_basic_lit(&mut self, lit: &sgo_parser::BasicLit) -> Operand {
        let (typ, val) = match lit.kind {
            LitKind::Int => (
                self.ctx.universe.untyped_int,
                Value::from_int_literal(&lit.value),
            ),
            LitKind::Float => (
                self.ctx.universe.untyped_float,
                Value::from_float_literal(&lit.value),
            ),
            LitKind::Imag => (self.ctx.universe.untyped_complex, None),
            LitKind::Char => (
                self.ctx.universe.untyped_rune,
                Value::from_char_literal(&lit.value),
            ),
            LitKind::String => (
                self.ctx.universe.untyped_string,
                Some(Value::from_string_literal(&lit.value)),
            ),
        };
        Operand {
            mode: OperandMode::Constant,
            typ,
            val,
            span: lit.span,
            node: Some(lit.id),
        }
    }

    fn check_unary(&mut self, u: &sgo_parser::UnaryExpr) -> Operand {
        if u.op == UnOp::Addr {
            return self.check_addr_of(u);
        }
        if u.op == UnOp::Recv {
            return self.check_receive(u);
        }
        let x = self.check_expr_impl(&u.x);
        if x.is_invalid() {
            return Operand::invalid(u.span, self.invalid());
        }
        let kind = self.ctx.arena.basic_kind(x.typ);
        let ok = match u.op {
            UnOp::Plus | UnOp::Minus => kind.map(|k| k.is_numeric()).unwrap_or(false),
            UnOp::Not => kind.map(|k| k.is_boolean()).unwrap_or(false),
            UnOp::Xor => kind.map(|k| k.is_integer()).unwrap_or(false),
            _ => false,
        };
        if !ok {
            self.error(TypeError::InvalidOp {
                message: format!("operator {} not defined on {}", u.op, self.type_str(x.typ)),
                span: self.sspan(u.span),
            });
            return Operand::invalid(u.span, self.invalid());
        }
        let val = x
            .val
            .as_ref()
            .and_then(|v| constants::unary_op(u.op, v));
        Operand {
            mode: if x.mode == OperandMode::Constant {
                OperandMode::Constant
            } else {
                OperandMode::Value
            },
            typ: x.typ,
            val,
            span: u.span,
            node: Some(u.id),
        }
    }

    /// `&x`: besides producing the pointer, taking an address disables
    /// narrowing of the operand for the rest of its scope.
    fn check_addr_of(&mut self, u: &sgo_parser::UnaryExpr) -> Operand {
        let x = self.check_expr_impl(&u.x);
        if x.is_invalid() {
            return Operand::invalid(u.span, self.invalid());
        }
        if x.mode != OperandMode::Variable && !matches!(u.x.unparen(), Expr::CompositeLit(_)) {
            self.error(TypeError::InvalidOp {
                message: "cannot take address of non-addressable operand".to_string(),
                span: self.sspan(u.span),
            });
        }
        if let Some(obj) = self.local_var_of(&u.x) {
            self.no_narrow.insert(obj);
            self.flow.clear_narrow(obj);
        }
        // The address uses the declared type, not a narrowing.
        let typ = self
            .local_var_of(&u.x)
            .map(|obj| self.ctx.objs.get(obj).typ)
            .unwrap_or(x.typ);
        let ptr = self.ctx.arena.alloc(TypeKind::Pointer { elem: typ });
        Operand {
            mode: OperandMode::Value,
            typ: ptr,
            val: None,
            span: u.span,
            node: Some(u.id),
        }
    }

    fn check_receive(&mut self, u: &sgo_parser::UnaryExpr) -> Operand {
        let allow_comma_ok = self.comma_ok_ctx;
        let x = self.check_expr(&u.x);
        if x.is_invalid() {
            return Operand::invalid(u.span, self.invalid());
        }
        if self.ctx.arena.is_optional(x.typ) {
            self.optional_use("receive from", &u.x, x.typ, u.span);
            return Operand::invalid(u.span, self.invalid());
        }
        let under = self.ctx.arena.underlying(x.typ);
        let TypeKind::Chan { dir, elem } = self.ctx.arena.kind(under) else {
            self.error(TypeError::InvalidOp {
                message: format!("cannot receive from {}", self.type_str(x.typ)),
                span: self.sspan(u.span),
            });
            return Operand::invalid(u.span, self.invalid());
        };
        let (dir, elem) = (*dir, *elem);
        if dir == ChanDir::Send {
            self.error(TypeError::InvalidOp {
                message: "cannot receive from send-only channel".to_string(),
                span: self.sspan(u.span),
            });
        }
        if !allow_comma_ok
            && self.ctx.arena.is_optionable(elem)
            && !self.ctx.arena.is_optional(elem)
        {
            self.error(TypeError::UsedUninitialized {
                name: "channel receive".to_string(),
                span: self.sspan(u.span),
            });
        }
        Operand {
            mode: if allow_comma_ok {
                OperandMode::CommaOk
            } else {
                OperandMode::Value
            },
            typ: elem,
            val: None,
            span: u.span,
            node: Some(u.id),
        }
    }

    fn check_deref(&mut self, s: &sgo_parser::StarExpr) -> Operand {
        let x = self.check_expr_or_type(&s.x);
        if x.mode == OperandMode::TypeMode {
            let typ = self.ctx.arena.alloc(TypeKind::Pointer { elem: x.typ });
            return Operand {
                mode: OperandMode::TypeMode,
                typ,
                val: None,
                span: s.span,
                node: Some(s.id),
            };
        }
        self.deref_operand(x, s)
    }

    fn deref_operand(&mut self, x: Operand, s: &sgo_parser::StarExpr) -> Operand {
        if x.is_invalid() {
            return Operand::invalid(s.span, self.invalid());
        }
        if self.ctx.arena.is_optional(x.typ) {
            self.optional_use("dereference", &s.x, x.typ, s.span);
            return Operand::invalid(s.span, self.invalid());
        }
        let under = self.ctx.arena.underlying(x.typ);
        match self.ctx.arena.kind(under) {
            TypeKind::Pointer { elem } => Operand {
                mode: OperandMode::Variable,
                typ: *elem,
                val: None,
                span: s.span,
                node: Some(s.id),
            },
            _ => {
                self.error(TypeError::InvalidOp {
                    message: format!("cannot dereference {}", self.type_str(x.typ)),
                    span: self.sspan(s.span),
                });
                Operand::invalid(s.span, self.invalid())
            }
        }
    }

    fn check_binary(&mut self, b: &sgo_parser::BinaryExpr) -> Operand {
        let mut x = self.check_expr_impl(&b.x);
        let mut y = self.check_expr_impl(&b.y);
        if x.is_invalid() || y.is_invalid() {
            return Operand::invalid(b.span, self.invalid());
        }

        if b.op.is_comparison() {
            return self.check_comparison(b, x, y);
        }

        if matches!(b.op, BinOp::LAnd | BinOp::LOr) {
            if !self.ctx.arena.is_boolean(x.typ) || !self.ctx.arena.is_boolean(y.typ) {
                self.error(TypeError::InvalidOp {
                    message: format!("operator {} expects boolean operands", b.op),
                    span: self.sspan(b.span),
                });
                return Operand::invalid(b.span, self.invalid());
            }
            let val = match (&x.val, &y.val) {
                (Some(a), Some(c)) => constants::binary_op(b.op, a, c),
                _ => None,
            };
            return Operand {
                mode: if val.is_some() {
                    OperandMode::Constant
                } else {
                    OperandMode::Value
                },
                typ: self.merge_untyped(x.typ, y.typ),
                val,
                span: b.span,
                node: Some(b.id),
            };
        }

        if matches!(b.op, BinOp::Shl | BinOp::Shr) {
            let xk = self.ctx.arena.basic_kind(x.typ);
            let yk = self.ctx.arena.basic_kind(y.typ);
            if !xk.map(|k| k.is_integer()).unwrap_or(false)
                || !yk.map(|k| k.is_integer()).unwrap_or(false)
            {
                self.error(TypeError::InvalidOp {
                    message: format!("shift of {} by {}", self.type_str(x.typ), self.type_str(y.typ)),
                    span: self.sspan(b.span),
                });
                return Operand::invalid(b.span, self.invalid());
            }
            let val = match (&x.val, &y.val) {
                (Some(a), Some(c)) => constants::binary_op(b.op, a, c),
                _ => None,
            };
            return Operand {
                mode: if x.mode == OperandMode::Constant && y.mode == OperandMode::Constant {
                    OperandMode::Constant
                } else {
                    OperandMode::Value
                },
                typ: x.typ,
                val,
                span: b.span,
                node: Some(b.id),
            };
        }

        // Arithmetic, bit and string concatenation operators: converge
        // untyped operands, then require matching types.
        if self.ctx.arena.is_untyped(x.typ) && !self.ctx.arena.is_untyped(y.typ) {
            if !self.convert_untyped(&mut x, y.typ) {
                return Operand::invalid(b.span, self.invalid());
            }
        } else if self.ctx.arena.is_untyped(y.typ) && !self.ctx.arena.is_untyped(x.typ) {
            if !self.convert_untyped(&mut y, x.typ) {
                return Operand::invalid(b.span, self.invalid());
            }
        }

        let typ = self.merge_untyped(x.typ, y.typ);
        if !identical(&self.ctx.arena, &self.ctx.objs, x.typ, y.typ)
            && !(self.ctx.arena.is_untyped(x.typ) && self.ctx.arena.is_untyped(y.typ))
        {
            self.error(TypeError::Mismatch {
                want: self.type_str(x.typ),
                found: self.type_str(y.typ),
                span: self.sspan(b.span),
            });
            return Operand::invalid(b.span, self.invalid());
        }

        let kind = self.ctx.arena.basic_kind(typ);
        let ok = match b.op {
            BinOp::Add => kind
                .map(|k| k.is_numeric() || k.is_string())
                .unwrap_or(false),
            BinOp::Sub | BinOp::Mul | BinOp::Quo => {
                kind.map(|k| k.is_numeric()).unwrap_or(false)
            }
            BinOp::Rem | BinOp::And | BinOp::Or | BinOp::Xor | BinOp::AndNot => {
                kind.map(|k| k.is_integer()).unwrap_or(false)
            }
            _ => false,
        };
        if !ok {
            self.error(TypeError::InvalidOp {
                message: format!("operator {} not defined on {}", b.op, self.type_str(typ)),
                span: self.sspan(b.span),
            });
            return Operand::invalid(b.span, self.invalid());
        }

        let val = match (&x.val, &y.val) {
            (Some(a), Some(c)) => constants::binary_op(b.op, a, c),
            _ => None,
        };
        Operand {
            mode: if x.mode == OperandMode::Constant && y.mode == OperandMode::Constant {
                OperandMode::Constant
            } else {
                OperandMode::Value
            },
            typ,
            val,
            span: b.span,
            node: Some(b.id),
        }
    }

    fn check_comparison(
        &mut self,
        b: &sgo_parser::BinaryExpr,
        mut x: Operand,
        mut y: Operand,
    ) -> Operand {
        let x_nil = self.ctx.arena.is_untyped_nil(x.typ);
        let y_nil = self.ctx.arena.is_untyped_nil(y.typ);

        if x_nil || y_nil {
            if !matches!(b.op, BinOp::Eql | BinOp::Neq) {
                self.error(TypeError::InvalidOp {
                    message: "nil only supports == and !=".to_string(),
                    span: self.sspan(b.span),
                });
                return Operand::invalid(b.span, self.invalid());
            }
            let other = if x_nil { &y } else { &x };
            if x_nil && y_nil {
                self.error(TypeError::UntypedNil {
                    span: self.sspan(b.span),
                });
                return Operand::invalid(b.span, self.invalid());
            }
            // Comparison with nil is the defining operation on optionals
            // and is reserved for them.
            if !self.ctx.arena.is_optional(other.typ) {
                self.error(TypeError::InvalidOp {
                    message: format!(
                        "cannot compare {} to nil; only optional types admit nil",
                        self.type_str(other.typ)
                    ),
                    span: self.sspan(b.span),
                });
                return Operand::invalid(b.span, self.invalid());
            }
            return Operand {
                mode: OperandMode::Value,
                typ: self.ctx.universe.untyped_bool,
                val: None,
                span: b.span,
                node: Some(b.id),
            };
        }

        if self.ctx.arena.is_optional(x.typ) || self.ctx.arena.is_optional(y.typ) {
            let (e, typ) = if self.ctx.arena.is_optional(x.typ) {
                (&b.x, x.typ)
            } else {
                (&b.y, y.typ)
            };
            self.optional_use("compare", e, typ, b.span);
            return Operand::invalid(b.span, self.invalid());
        }

        if self.ctx.arena.is_untyped(x.typ) && !self.ctx.arena.is_untyped(y.typ) {
            if !self.convert_untyped(&mut x, y.typ) {
                return Operand::invalid(b.span, self.invalid());
            }
        } else if self.ctx.arena.is_untyped(y.typ) && !self.ctx.arena.is_untyped(x.typ) {
            if !self.convert_untyped(&mut y, x.typ) {
                return Operand::invalid(b.span, self.invalid());
            }
        }

        let comparable = if matches!(b.op, BinOp::Eql | BinOp::Neq) {
            self.assignable_type(x.typ, y.typ) || self.assignable_type(y.typ, x.typ)
        } else {
            let xk = self.ctx.arena.basic_kind(x.typ);
            let yk = self.ctx.arena.basic_kind(y.typ);
            xk.map(|k| k.is_ordered()).unwrap_or(false)
                && yk.map(|k| k.is_ordered()).unwrap_or(false)
        };
        if !comparable {
            self.error(TypeError::InvalidOp {
                message: format!(
                    "cannot compare {} with {}",
                    self.type_str(x.typ),
                    self.type_str(y.typ)
                ),
                span: self.sspan(b.span),
            });
            return Operand::invalid(b.span, self.invalid());
        }

        let val = match (&x.val, &y.val) {
            (Some(a), Some(c)) => constants::binary_op(b.op, a, c),
            _ => None,
        };
        Operand {
            mode: if val.is_some() {
                OperandMode::Constant
            } else {
                OperandMode::Value
            },
            typ: self.ctx.universe.untyped_bool,
            val,
            span: b.span,
            node: Some(b.id),
        }
    }

    fn merge_untyped(&self, x: TypeId, y: TypeId) -> TypeId {
        if self.ctx.arena.is_untyped(x) && !self.ctx.arena.is_untyped(y) {
            y
        } else if self.ctx.arena.is_untyped(y) && !self.ctx.arena.is_untyped(x) {
            x
        } else if self.ctx.arena.is_untyped(x) && self.ctx.arena.is_untyped(y) {
            // float absorbs int, rune absorbs int
            let xk = self.ctx.arena.basic_kind(x).unwrap_or(BasicKind::Invalid);
            let yk = self.ctx.arena.basic_kind(y).unwrap_or(BasicKind::Invalid);
            let rank = |k: BasicKind| match k {
                BasicKind::UntypedInt => 1,
                BasicKind::UntypedRune => 2,
                BasicKind::UntypedFloat => 3,
                BasicKind::UntypedComplex => 4,
                _ => 0,
            };
            if rank(yk) > rank(xk) {
                y
            } else {
                x
            }
        } else {
            x
        }
    }

    fn check_selector(&mut self, sel: &sgo_parser::SelectorExpr) -> Operand {
        // Qualified identifier?
        if let Expr::Ident(pkg_ident) = &*sel.x {
            if let Some(obj) = self.lookup(&pkg_ident.name, pkg_ident.span.start) {
                if let ObjKind::PkgName { pkg } = self.ctx.objs.get(obj).kind {
                    self.info.record_use(pkg_ident.id, obj);
                    return self.check_qualified(pkg, sel);
                }
            }
        }

        let x = self.check_expr_impl(&sel.x);
        if x.is_invalid() {
            return Operand::invalid(sel.span, self.invalid());
        }
        if x.mode == OperandMode::TypeMode {
            self.error(TypeError::InvalidOp {
                message: "method expressions are not supported".to_string(),
                span: self.sspan(sel.span),
            });
            return Operand::invalid(sel.span, self.invalid());
        }
        // A variable of optional type exposes no fields or methods.
        if self.ctx.arena.is_optional(x.typ) {
            self.optional_use("select field or method of", &sel.x, x.typ, sel.span);
            return Operand::invalid(sel.span, self.invalid());
        }
        let addressable = x.mode == OperandMode::Variable;
        match lookup_field_or_method(
            &self.ctx.arena,
            &self.ctx.objs,
            x.typ,
            addressable,
            Some(self.pkg),
            &sel.sel.name,
        ) {
            LookupResult::Found { obj, indirect, .. } => {
                self.info.record_use(sel.sel.id, obj);
                let data = self.ctx.objs.get(obj);
                let typ = data.typ;
                let mode = if data.is_field() && (addressable || indirect) {
                    OperandMode::Variable
                } else {
                    OperandMode::Value
                };
                Operand {
                    mode,
                    typ,
                    val: None,
                    span: sel.span,
                    node: Some(sel.id),
                }
            }
            LookupResult::Ambiguous { .. } => {
                self.error(TypeError::InvalidOp {
                    message: format!("ambiguous selector {}", sel.sel.name),
                    span: self.sspan(sel.sel.span),
                });
                Operand::invalid(sel.span, self.invalid())
            }
            LookupResult::BadReceiver => {
                self.error(TypeError::InvalidOp {
                    message: format!(
                        "cannot call {} on this receiver (pointer or optional receiver required)",
                        sel.sel.name
                    ),
                    span: self.sspan(sel.sel.span),
                });
                Operand::invalid(sel.span, self.invalid())
            }
            LookupResult::NotFound => {
                self.error(TypeError::InvalidOp {
                    message: format!(
                        "{} has no field or method {}",
                        self.type_str(x.typ),
                        sel.sel.name
                    ),
                    span: self.sspan(sel.sel.span),
                });
                Operand::invalid(sel.span, self.invalid())
            }
        }
    }

    fn check_qualified(&mut self, pkg: crate::objects::PkgId, sel: &sgo_parser::SelectorExpr) -> Operand {
        let scope = self.ctx.pkgs.get(pkg).scope;
        let Some(obj) = self.ctx.scopes.lookup(scope, &sel.sel.name) else {
            self.error(TypeError::Undeclared {
                name: format!(
                    "{}.{}",
                    self.ctx.pkgs.get(pkg).name,
                    sel.sel.name
                ),
                span: self.sspan(sel.sel.span),
            });
            return Operand::invalid(sel.span, self.invalid());
        };
        self.info.record_use(sel.sel.id, obj);
        let data = self.ctx.objs.get(obj);
        let typ = data.typ;
        let mode = match &data.kind {
            ObjKind::Var { .. } => OperandMode::Variable,
            ObjKind::Const { .. } => OperandMode::Constant,
            ObjKind::TypeName => OperandMode::TypeMode,
            ObjKind::Func => OperandMode::Value,
            _ => OperandMode::Invalid,
        };
        let val = data.const_val().cloned();
        Operand {
            mode,
            typ,
            val,
            span: sel.span,
            node: Some(sel.id),
        }
    }

    fn check_index(&mut self, ix: &sgo_parser::IndexExpr) -> Operand {
        let allow_comma_ok = self.comma_ok_ctx;
        let x = self.check_expr(&ix.x);
        if x.is_invalid() {
            return Operand::invalid(ix.span, self.invalid());
        }
        if self.ctx.arena.is_optional(x.typ) {
            self.optional_use("index", &ix.x, x.typ, ix.span);
            return Operand::invalid(ix.span, self.invalid());
        }
        let under = self.ctx.arena.underlying(x.typ);
        match self.ctx.arena.kind(under).clone() {
            TypeKind::Slice { elem } => {
                self.check_index_operand(&ix.index);
                Operand {
                    mode: OperandMode::Variable,
                    typ: elem,
                    val: None,
                    span: ix.span,
                    node: Some(ix.id),
                }
            }
            TypeKind::Array { elem, .. } => {
                self.check_index_operand(&ix.index);
                Operand {
                    mode: if x.mode == OperandMode::Variable {
                        OperandMode::Variable
                    } else {
                        OperandMode::Value
                    },
                    typ: elem,
                    val: None,
                    span: ix.span,
                    node: Some(ix.id),
                }
            }
            TypeKind::Basic(k) if k.is_string() => {
                self.check_index_operand(&ix.index);
                Operand {
                    mode: OperandMode::Value,
                    typ: self.ctx.universe.uint8_,
                    val: None,
                    span: ix.span,
                    node: Some(ix.id),
                }
            }
            TypeKind::Map { key, elem } => {
                let mut k = self.check_expr(&ix.index);
                if !k.is_invalid() {
                    self.assign_operand(&mut k, key, "map index");
                }
                if !allow_comma_ok
                    && self.ctx.arena.is_optionable(elem)
                    && !self.ctx.arena.is_optional(elem)
                {
                    // The element type has no zero value, so a miss
                    // cannot produce one; only the entangled comma-ok
                    // form may read this map.
                    self.error(TypeError::UsedUninitialized {
                        name: "map index".to_string(),
                        span: self.sspan(ix.span),
                    });
                }
                Operand {
                    mode: if allow_comma_ok {
                        OperandMode::CommaOk
                    } else {
                        OperandMode::MapIndex
                    },
                    typ: elem,
                    val: None,
                    span: ix.span,
                    node: Some(ix.id),
                }
            }
            _ => {
                self.error(TypeError::InvalidOp {
                    message: format!("cannot index {}", self.type_str(x.typ)),
                    span: self.sspan(ix.span),
                });
                Operand::invalid(ix.span, self.invalid())
            }
        }
    }

    fn check_index_operand(&mut self, e: &Expr) {
        let x = self.check_expr(e);
        if x.is_invalid() {
            return;
        }
        let ok = self
            .ctx
            .arena
            .basic_kind(x.typ)
            .map(|k| k.is_integer())
            .unwrap_or(false);
        if !ok {
            self.error(TypeError::InvalidOp {
                message: format!("index must be an integer, not {}", self.type_str(x.typ)),
                span: self.sspan(e.span()),
            });
        }
    }

    fn check_slice(&mut self, sl: &sgo_parser::SliceExpr) -> Operand {
        let x = self.check_expr(&sl.x);
        for part in [&sl.low, &sl.high, &sl.max].into_iter().flatten() {
            self.check_index_operand(part);
        }
        if x.is_invalid() {
            return Operand::invalid(sl.span, self.invalid());
        }
        if self.ctx.arena.is_optional(x.typ) {
            self.optional_use("slice", &sl.x, x.typ, sl.span);
            return Operand::invalid(sl.span, self.invalid());
        }
        let under = self.ctx.arena.underlying(x.typ);
        let typ = match self.ctx.arena.kind(under) {
            TypeKind::Slice { .. } => x.typ,
            TypeKind::Array { elem, .. } => self.ctx.arena.alloc(TypeKind::Slice { elem: *elem }),
            TypeKind::Basic(k) if k.is_string() => x.typ,
            _ => {
                self.error(TypeError::InvalidOp {
                    message: format!("cannot slice {}", self.type_str(x.typ)),
                    span: self.sspan(sl.span),
                });
                return Operand::invalid(sl.span, self.invalid());
            }
        };
        Operand {
            mode: OperandMode::Value,
            typ,
            val: None,
            span: sl.span,
            node: Some(sl.id),
        }
    }

    fn check_type_assert(&mut self, assert: &sgo_parser::TypeAssertExpr) -> Operand {
        let allow_comma_ok = self.comma_ok_ctx;
        let x = self.check_expr(&assert.x);
        if x.is_invalid() {
            return Operand::invalid(assert.span, self.invalid());
        }
        if self.ctx.arena.is_optional(x.typ) {
            self.optional_use("type-assert", &assert.x, x.typ, assert.span);
            return Operand::invalid(assert.span, self.invalid());
        }
        if !self.ctx.arena.is_interface(x.typ) {
            self.error(TypeError::InvalidOp {
                message: format!("{} is not an interface", self.type_str(x.typ)),
                span: self.sspan(assert.x.span()),
            });
            return Operand::invalid(assert.span, self.invalid());
        }
        let Some(typ_expr) = &assert.typ else {
            self.error(TypeError::InvalidOp {
                message: "use of .(type) outside type switch".to_string(),
                span: self.sspan(assert.span),
            });
            return Operand::invalid(assert.span, self.invalid());
        };
        let target = self.check_type_expr(typ_expr);
        self.check_assertable(x.typ, target, assert.span);
        Operand {
            mode: if allow_comma_ok {
                OperandMode::CommaOk
            } else {
                OperandMode::Value
            },
            typ: target,
            val: None,
            span: assert.span,
            node: Some(assert.id),
        }
    }

    /// Rejects assertions to a target type with optionable positions the
    /// runtime cannot verify; checks implementability otherwise.
    pub(crate) fn check_assertable(&mut self, from: TypeId, target: TypeId, span: Span) {
        if self.ctx.arena.is_invalid(target) {
            return;
        }
        let (_, unchecked) = find_optionables(&self.ctx.arena, &self.ctx.objs, target);
        if let Some(path) = unchecked.first() {
            self.error(TypeError::AssertionHasUncheckablePath {
                typ: self.type_str(target),
                path: path.describe(&self.ctx.arena, &self.ctx.objs),
                span: self.sspan(span),
            });
            return;
        }
        if self.ctx.arena.is_interface(target) {
            return;
        }
        let (missing, wrong) = missing_method(&self.ctx.arena, &self.ctx.objs, target, from, false);
        if let Some(m) = missing {
            let name = self.ctx.objs.get(m).name.clone();
            self.error(TypeError::Mismatch {
                want: format!("type implementing {}", self.type_str(from)),
                found: if wrong {
                    format!("{} (wrong type for method {})", self.type_str(target), name)
                } else {
                    format!("{} (missing method {})", self.type_str(target), name)
                },
                span: self.sspan(span),
            });
        }
    }

    fn check_func_lit(&mut self, lit: &sgo_parser::FuncLit) -> Operand {
        let sig = self.build_signature(None, &lit.typ);
        let TypeKind::Signature {
            params,
            results,
            result_entangled,
            ..
        } = self.ctx.arena.kind(sig)
        else {
            return Operand::invalid(lit.span, self.invalid());
        };
        let (params, results, entangled) = (params.clone(), results.clone(), *result_entangled);

        // Check the body under a fresh narrowing state: the literal may
        // run at any later time, so outer narrowings do not hold inside.
        let saved_flow = self.flow.clone();
        let saved_func = self.func.take();
        let saved_boundary = self.closure_boundary;
        self.closure_boundary = Some(ObjId(self.ctx.objs.len() as u32));

        self.enter_function(None, &params, &results, entangled);
        let exit = self.check_block_list(&lit.body.list);
        if (!results.is_empty() || entangled.is_some()) && !exit.terminated() {
            self.error(TypeError::InvalidOp {
                message: "missing return at end of function literal".to_string(),
                span: self.sspan(Span::new(
                    lit.body.span.end.saturating_sub(1),
                    lit.body.span.end,
                )),
            });
        }
        self.leave_function();

        self.closure_boundary = saved_boundary;
        self.func = saved_func;
        self.flow = saved_flow;

        Operand {
            mode: OperandMode::Value,
            typ: sig,
            val: None,
            span: lit.span,
            node: Some(lit.id),
        }
    }

    // Calls, conversions and builtins

    fn check_call(&mut self, call: &sgo_parser::CallExpr) -> Operand {
        let fun = self.check_expr_or_type(&call.fun);
        match fun.mode {
            OperandMode::TypeMode => self.check_conversion(call, fun.typ),
            OperandMode::BuiltinMode => {
                let name = match call.fun.unparen() {
                    Expr::Ident(id) => id.name.clone(),
                    _ => String::new(),
                };
                self.check_builtin_call(call, &name)
            }
            OperandMode::Invalid => {
                for arg in &call.args {
                    self.check_expr(arg);
                }
                Operand::invalid(call.span, self.invalid())
            }
            _ => self.check_func_call(call, fun),
        }
    }

    fn check_conversion(&mut self, call: &sgo_parser::CallExpr, target: TypeId) -> Operand {
        if call.args.len() != 1 {
            self.error(TypeError::ArgumentCount {
                want: 1,
                got: call.args.len(),
                span: self.sspan(call.span),
            });
            return Operand::invalid(call.span, self.invalid());
        }
        let mut x = self.check_expr(&call.args[0]);
        if x.is_invalid() {
            return Operand::invalid(call.span, self.invalid());
        }
        if !self.convertible(&mut x, target) {
            self.error(TypeError::InvalidOp {
                message: format!(
                    "cannot convert {} to {}",
                    self.type_str(x.typ),
                    self.type_str(target)
                ),
                span: self.sspan(call.span),
            });
            return Operand::invalid(call.span, self.invalid());
        }
        Operand {
            mode: if x.mode == OperandMode::Constant {
                OperandMode::Constant
            } else {
                OperandMode::Value
            },
            typ: target,
            val: x.val,
            span: call.span,
            node: Some(call.id),
        }
    }

    fn convertible(&mut self, x: &mut Operand, target: TypeId) -> bool {
        if self.assignable(x, target) {
            return true;
        }
        let arena = &self.ctx.arena;
        // A conversion can never strip an optional.
        if arena.is_optional(x.typ) && !arena.is_optional(target) {
            return false;
        }
        let from = arena.basic_kind(x.typ);
        let to = arena.basic_kind(target);
        if let (Some(f), Some(t)) = (from, to) {
            if (f.is_numeric() && t.is_numeric())
                || (f.is_string() && t.is_string())
                || (f.is_integer() && t.is_string())
            {
                return true;
            }
        }
        // string <-> []byte / []rune
        let from_under = arena.underlying(x.typ);
        let to_under = arena.underlying(target);
        let is_byte_slice = |id: TypeId| match self.ctx.arena.kind(id) {
            TypeKind::Slice { elem } => matches!(
                self.ctx.arena.basic_kind(*elem),
                Some(BasicKind::Uint8) | Some(BasicKind::Int32)
            ),
            _ => false,
        };
        if from.map(|k| k.is_string()).unwrap_or(false) && is_byte_slice(to_under) {
            return true;
        }
        if to.map(|k| k.is_string()).unwrap_or(false) && is_byte_slice(from_under) {
            return true;
        }
        // identical underlying structure
        identical(&self.ctx.arena, &self.ctx.objs, from_under, to_under)
    }

    fn check_func_call(&mut self, call: &sgo_parser::CallExpr, fun: Operand) -> Operand {
        if self.ctx.arena.is_optional(fun.typ) {
            self.optional_use("call", &call.fun, fun.typ, call.span);
            for arg in &call.args {
                self.check_expr(arg);
            }
            return Operand::invalid(call.span, self.invalid());
        }
        let under = self.ctx.arena.underlying(fun.typ);
        let TypeKind::Signature {
            params,
            results,
            result_entangled,
            variadic,
            ..
        } = self.ctx.arena.kind(under)
        else {
            self.error(TypeError::InvalidOp {
                message: format!("cannot call {}", self.type_str(fun.typ)),
                span: self.sspan(call.span),
            });
            for arg in &call.args {
                self.check_expr(arg);
            }
            return Operand::invalid(call.span, self.invalid());
        };
        let params: Vec<TypeId> = params.iter().map(|p| self.ctx.objs.get(*p).typ).collect();
        let results = results.clone();
        let entangled = *result_entangled;
        let variadic = *variadic;

        let fixed = if variadic { params.len() - 1 } else { params.len() };
        if call.args.len() < fixed || (!variadic && call.args.len() > params.len()) {
            self.error(TypeError::ArgumentCount {
                want: params.len(),
                got: call.args.len(),
                span: self.sspan(call.span),
            });
        }
        for (i, arg) in call.args.iter().enumerate() {
            let mut x = self.check_expr(arg);
            if x.is_invalid() {
                continue;
            }
            let want = if i < fixed {
                params.get(i).copied()
            } else if variadic {
                if call.has_ellipsis {
                    params.last().and_then(|last| {
                        Some(self.ctx.arena.alloc(TypeKind::Slice { elem: *last }))
                    })
                } else {
                    params.last().copied()
                }
            } else {
                None
            };
            if let Some(want) = want {
                self.assign_operand(&mut x, want, "argument");
            }
        }

        match (results.len(), entangled) {
            (0, None) => Operand {
                mode: OperandMode::NoValue,
                typ: self.invalid(),
                val: None,
                span: call.span,
                node: Some(call.id),
            },
            (1, None) => Operand {
                mode: OperandMode::Value,
                typ: self.ctx.objs.get(results[0]).typ,
                val: None,
                span: call.span,
                node: Some(call.id),
            },
            _ => {
                let tuple = self.ctx.arena.alloc(TypeKind::Tuple {
                    vars: results,
                    entangled,
                });
                Operand {
                    mode: OperandMode::Value,
                    typ: tuple,
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
        }
    }

    fn check_builtin_call(&mut self, call: &sgo_parser::CallExpr, name: &str) -> Operand {
        let builtin = match name {
            "append" => Builtin::Append,
            "cap" => Builtin::Cap,
            "close" => Builtin::Close,
            "copy" => Builtin::Copy,
            "delete" => Builtin::Delete,
            "len" => Builtin::Len,
            "make" => Builtin::Make,
            "new" => Builtin::New,
            "panic" => Builtin::Panic,
            "print" => Builtin::Print,
            "println" => Builtin::Println,
            _ => {
                self.error(TypeError::InvalidOp {
                    message: format!("unknown builtin {name}"),
                    span: self.sspan(call.span),
                });
                return Operand::invalid(call.span, self.invalid());
            }
        };

        let arity_error = |checker: &mut Self, want: usize| {
            checker.error(TypeError::ArgumentCount {
                want,
                got: call.args.len(),
                span: checker.sspan(call.span),
            });
        };

        match builtin {
            Builtin::Len | Builtin::Cap => {
                if call.args.len() != 1 {
                    arity_error(self, 1);
                    return Operand::invalid(call.span, self.invalid());
                }
                let x = self.check_expr(&call.args[0]);
                if self.ctx.arena.is_optional(x.typ) {
                    self.optional_use("take the length of", &call.args[0], x.typ, call.span);
                }
                Operand {
                    mode: OperandMode::Value,
                    typ: self.ctx.universe.int_,
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
            Builtin::New => {
                if call.args.len() != 1 {
                    arity_error(self, 1);
                    return Operand::invalid(call.span, self.invalid());
                }
                let elem = self.check_type_expr(&call.args[0]);
                let typ = self.ctx.arena.alloc(TypeKind::Pointer { elem });
                Operand {
                    mode: OperandMode::Value,
                    typ,
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
            Builtin::Make => {
                if call.args.is_empty() {
                    arity_error(self, 1);
                    return Operand::invalid(call.span, self.invalid());
                }
                let typ = self.check_type_expr(&call.args[0]);
                let under = self.ctx.arena.underlying(typ);
                if !matches!(
                    self.ctx.arena.kind(under),
                    TypeKind::Slice { .. } | TypeKind::Map { .. } | TypeKind::Chan { .. }
                ) {
                    self.error(TypeError::InvalidOp {
                        message: format!("cannot make {}", self.type_str(typ)),
                        span: self.sspan(call.span),
                    });
                }
                for arg in &call.args[1..] {
                    self.check_index_operand(arg);
                }
                Operand {
                    mode: OperandMode::Value,
                    typ,
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
            Builtin::Append => {
                if call.args.is_empty() {
                    arity_error(self, 1);
                    return Operand::invalid(call.span, self.invalid());
                }
                let s = self.check_expr(&call.args[0]);
                let elem = match self.ctx.arena.kind(self.ctx.arena.underlying(s.typ)) {
                    TypeKind::Slice { elem } => Some(*elem),
                    _ => {
                        if !s.is_invalid() {
                            self.error(TypeError::InvalidOp {
                                message: format!("append expects a slice, not {}", self.type_str(s.typ)),
                                span: self.sspan(call.span),
                            });
                        }
                        None
                    }
                };
                for arg in &call.args[1..] {
                    let mut x = self.check_expr(arg);
                    if let Some(elem) = elem {
                        if !x.is_invalid() && !call.has_ellipsis {
                            self.assign_operand(&mut x, elem, "append element");
                        }
                    }
                }
                Operand {
                    mode: OperandMode::Value,
                    typ: s.typ,
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
            Builtin::Copy => {
                if call.args.len() != 2 {
                    arity_error(self, 2);
                    return Operand::invalid(call.span, self.invalid());
                }
                self.check_expr(&call.args[0]);
                self.check_expr(&call.args[1]);
                Operand {
                    mode: OperandMode::Value,
                    typ: self.ctx.universe.int_,
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
            Builtin::Delete => {
                if call.args.len() != 2 {
                    arity_error(self, 2);
                    return Operand::invalid(call.span, self.invalid());
                }
                let m = self.check_expr(&call.args[0]);
                if self.ctx.arena.is_optional(m.typ) {
                    self.optional_use("delete from", &call.args[0], m.typ, call.span);
                }
                let key_typ = match self.ctx.arena.kind(self.ctx.arena.underlying(m.typ)) {
                    TypeKind::Map { key, .. } => Some(*key),
                    _ => None,
                };
                let mut k = self.check_expr(&call.args[1]);
                if let Some(key_typ) = key_typ {
                    if !k.is_invalid() {
                        self.assign_operand(&mut k, key_typ, "map key");
                    }
                }
                Operand {
                    mode: OperandMode::NoValue,
                    typ: self.invalid(),
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
            Builtin::Close => {
                if call.args.len() != 1 {
                    arity_error(self, 1);
                    return Operand::invalid(call.span, self.invalid());
                }
                let ch = self.check_expr(&call.args[0]);
                if self.ctx.arena.is_optional(ch.typ) {
                    self.optional_use("close", &call.args[0], ch.typ, call.span);
                } else if !ch.is_invalid()
                    && !matches!(
                        self.ctx.arena.kind(self.ctx.arena.underlying(ch.typ)),
                        TypeKind::Chan { .. }
                    )
                {
                    self.error(TypeError::InvalidOp {
                        message: format!("cannot close {}", self.type_str(ch.typ)),
                        span: self.sspan(call.span),
                    });
                }
                Operand {
                    mode: OperandMode::NoValue,
                    typ: self.invalid(),
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
            Builtin::Panic => {
                if call.args.len() != 1 {
                    arity_error(self, 1);
                } else {
                    self.check_expr(&call.args[0]);
                }
                Operand {
                    mode: OperandMode::NoValue,
                    typ: self.invalid(),
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
            Builtin::Print | Builtin::Println => {
                for arg in &call.args {
                    self.check_expr(arg);
                }
                Operand {
                    mode: OperandMode::NoValue,
                    typ: self.invalid(),
                    val: None,
                    span: call.span,
                    node: Some(call.id),
                }
            }
        }
    }

    // Composite literals

    pub(crate) fn check_composite_lit(
        &mut self,
        lit: &sgo_parser::CompositeLit,
        expected: Option<TypeId>,
    ) -> Operand {
        let typ = match &lit.typ {
            Some(t) => self.check_type_expr(t),
            None => match expected {
                Some(t) => t,
                None => {
                    self.error(TypeError::InvalidOp {
                        message: "missing type in composite literal".to_string(),
                        span: self.sspan(lit.span),
                    });
                    return Operand::invalid(lit.span, self.invalid());
                }
            },
        };
        if self.ctx.arena.is_invalid(typ) {
            return Operand::invalid(lit.span, self.invalid());
        }
        let under = self.ctx.arena.underlying(typ);
        match self.ctx.arena.kind(under).clone() {
            TypeKind::Struct { fields } => self.check_struct_lit(lit, typ, &fields),
            TypeKind::Slice { elem } => {
                self.check_list_lit(lit, elem, None);
                self.lit_operand(lit, typ)
            }
            TypeKind::Array { elem, len } => {
                self.check_list_lit(lit, elem, Some(len));
                self.lit_operand(lit, typ)
            }
            TypeKind::Map { key, elem } => {
                for elt in &lit.elts {
                    match elt {
                        Expr::KeyValue(kv) => {
                            let mut k = self.check_expr(&kv.key);
                            if !k.is_invalid() {
                                self.assign_operand(&mut k, key, "map key");
                            }
                            let mut v = self.check_lit_value(&kv.value, elem);
                            if !v.is_invalid() {
                                self.assign_operand(&mut v, elem, "map value");
                            }
                        }
                        other => {
                            self.error(TypeError::InvalidOp {
                                message: "missing key in map literal".to_string(),
                                span: self.sspan(other.span()),
                            });
                        }
                    }
                }
                self.lit_operand(lit, typ)
            }
            _ => {
                self.error(TypeError::InvalidOp {
                    message: format!("cannot construct {} with a literal", self.type_str(typ)),
                    span: self.sspan(lit.span),
                });
                Operand::invalid(lit.span, self.invalid())
            }
        }
    }

    fn lit_operand(&self, lit: &sgo_parser::CompositeLit, typ: TypeId) -> Operand {
        Operand {
            mode: OperandMode::Value,
            typ,
            val: None,
            span: lit.span,
            node: Some(lit.id),
        }
    }

    fn check_lit_value(&mut self, e: &Expr, expected: TypeId) -> Operand {
        if let Expr::CompositeLit(inner) = e {
            if inner.typ.is_none() {
                return self.check_composite_lit(inner, Some(expected));
            }
        }
        self.check_expr(e)
    }

    fn check_struct_lit(
        &mut self,
        lit: &sgo_parser::CompositeLit,
        typ: TypeId,
        fields: &[crate::types::StructField],
    ) -> Operand {
        let keyed = lit.elts.iter().any(|e| matches!(e, Expr::KeyValue(_)));
        let mut given: Vec<bool> = vec![false; fields.len()];

        if keyed {
            for elt in &lit.elts {
                let Expr::KeyValue(kv) = elt else {
                    self.error(TypeError::InvalidOp {
                        message: "mixture of field:value and value initializers".to_string(),
                        span: self.sspan(elt.span()),
                    });
                    continue;
                };
                let Expr::Ident(name) = kv.key.unparen() else {
                    self.error(TypeError::InvalidOp {
                        message: "field name expected in struct literal".to_string(),
                        span: self.sspan(kv.key.span()),
                    });
                    continue;
                };
                let Some(index) = fields
                    .iter()
                    .position(|f| self.ctx.objs.get(f.var).name == name.name)
                else {
                    self.error(TypeError::InvalidOp {
                        message: format!(
                            "unknown field {} in {}",
                            name.name,
                            self.type_str(typ)
                        ),
                        span: self.sspan(name.span),
                    });
                    continue;
                };
                given[index] = true;
                self.info.record_use(name.id, fields[index].var);
                let want = self.ctx.objs.get(fields[index].var).typ;
                let mut v = self.check_lit_value(&kv.value, want);
                if !v.is_invalid() {
                    self.assign_operand(&mut v, want, "struct field");
                }
            }
        } else if !lit.elts.is_empty() {
            if lit.elts.len() != fields.len() {
                self.error(TypeError::InvalidOp {
                    message: format!(
                        "wrong number of initializers for {} (want {}, got {})",
                        self.type_str(typ),
                        fields.len(),
                        lit.elts.len()
                    ),
                    span: self.sspan(lit.span),
                });
            }
            for (i, elt) in lit.elts.iter().enumerate() {
                if let Some(field) = fields.get(i) {
                    given[i] = true;
                    let want = self.ctx.objs.get(field.var).typ;
                    let mut v = self.check_lit_value(elt, want);
                    if !v.is_invalid() {
                        self.assign_operand(&mut v, want, "struct field");
                    }
                } else {
                    self.check_expr(elt);
                }
            }
        }

        // Every field whose type has no zero value must be initialized.
        for (i, field) in fields.iter().enumerate() {
            if given[i] {
                continue;
            }
            let ftyp = self.ctx.objs.get(field.var).typ;
            if self.ctx.arena.is_optionable(ftyp) && !self.ctx.arena.is_optional(ftyp) {
                let fname = self.ctx.objs.get(field.var).name.clone();
                self.error(TypeError::MissingInit {
                    typ: self.type_str(typ),
                    field: fname,
                    span: self.sspan(lit.span),
                });
            }
        }

        self.lit_operand(lit, typ)
    }

    fn check_list_lit(&mut self, lit: &sgo_parser::CompositeLit, elem: TypeId, len: Option<u64>) {
        let needs_full = self.ctx.arena.is_optionable(elem) && !self.ctx.arena.is_optional(elem);
        let mut count: u64 = 0;
        for elt in &lit.elts {
            let value = match elt {
                Expr::KeyValue(kv) => {
                    self.check_expr(&kv.key);
                    &kv.value
                }
                other => other,
            };
            count += 1;
            let mut v = self.check_lit_value(value, elem);
            if !v.is_invalid() {
                self.assign_operand(&mut v, elem, "element");
            }
        }
        // Array elements of an unwrapped optionable kind cannot be left
        // to zero values. Slices may be empty.
        if needs_full {
            if let Some(len) = len {
                if count < len {
                    self.error(TypeError::MissingInit {
                        typ: format!("[{}]{}", len, self.type_str(elem)),
                        field: "element".to_string(),
                        span: self.sspan(lit.span),
                    });
                }
            }
        }
    }

    // Assignability and conversions of untyped operands

    /// Reports whether operand `x` is assignable to type `t`, adjusting
    /// untyped operands in place.
    pub(crate) fn assignable(&mut self, x: &mut Operand, t: TypeId) -> bool {
        if x.is_invalid() || self.ctx.arena.is_invalid(t) || self.ctx.arena.is_invalid(x.typ) {
            return true;
        }

        if self.ctx.arena.is_untyped_nil(x.typ) {
            return self.ctx.arena.is_optional(t);
        }
        if self.ctx.arena.is_untyped(x.typ) {
            return self.convert_untyped_quiet(x, t);
        }

        if identical(&self.ctx.arena, &self.ctx.objs, x.typ, t) {
            return true;
        }

        // Same underlying type with at least one side unnamed.
        let xu = self.ctx.arena.underlying(x.typ);
        let tu = self.ctx.arena.underlying(t);
        let x_named = matches!(self.ctx.arena.kind(x.typ), TypeKind::Named { .. });
        let t_named = matches!(self.ctx.arena.kind(t), TypeKind::Named { .. });
        if identical(&self.ctx.arena, &self.ctx.objs, xu, tu) && (!x_named || !t_named) {
            return true;
        }

        // T is assignable to ?T.
        if let TypeKind::Optional { elem } = self.ctx.arena.kind(t) {
            let elem = *elem;
            if !self.ctx.arena.is_optional(x.typ) {
                let mut inner = x.clone();
                if self.assignable(&mut inner, elem) {
                    return true;
                }
            }
        }

        // Interface satisfaction; optionals never satisfy an interface.
        if self.ctx.arena.is_interface(t) && !self.ctx.arena.is_optional(x.typ) {
            let (missing, _) = missing_method(&self.ctx.arena, &self.ctx.objs, x.typ, t, true);
            if missing.is_none() {
                return true;
            }
        }

        // Bidirectional channels assign to directional ones.
        if let (TypeKind::Chan { dir: xd, elem: xe }, TypeKind::Chan { dir: td, elem: te }) =
            (self.ctx.arena.kind(xu), self.ctx.arena.kind(tu))
        {
            if *xd == ChanDir::SendRecv
                && identical(&self.ctx.arena, &self.ctx.objs, *xe, *te)
                && *td != ChanDir::SendRecv
                && (!x_named || !t_named)
            {
                return true;
            }
        }

        false
    }

    fn assignable_type(&mut self, from: TypeId, to: TypeId) -> bool {
        let mut x = Operand {
            mode: OperandMode::Value,
            typ: from,
            val: None,
            span: Span::new(0, 0),
            node: None,
        };
        self.assignable(&mut x, to)
    }

    /// Checks assignability and reports a mismatch when it fails.
    pub(crate) fn assign_operand(&mut self, x: &mut Operand, t: TypeId, what: &str) -> bool {
        if self.ctx.arena.is_untyped_nil(x.typ) && !self.ctx.arena.is_optional(t) {
            if self.ctx.arena.is_invalid(t) {
                return true;
            }
            self.error(TypeError::UntypedNil {
                span: self.sspan(x.span),
            });
            return false;
        }
        if self.assignable(x, t) {
            return true;
        }
        self.error(TypeError::Mismatch {
            want: format!("{} in {}", self.type_str(t), what),
            found: self.type_str(x.typ),
            span: self.sspan(x.span),
        });
        false
    }

    fn convert_untyped_quiet(&mut self, x: &mut Operand, target: TypeId) -> bool {
        let target_kind = match self.ctx.arena.basic_kind(target) {
            Some(k) if !k.is_untyped() => k,
            _ => {
                // Untyped constants convert to their default type when
                // assigned to an interface.
                if self.ctx.arena.is_interface(target)
                    && !self.ctx.arena.is_optional(target)
                {
                    let k = self.ctx.arena.basic_kind(x.typ).unwrap_or(BasicKind::Invalid);
                    x.typ = self.ctx.universe.basic(constants::default_kind(k));
                    if let Some(node) = x.node {
                        self.info.record_type(node, x.mode, x.typ, x.val.clone());
                    }
                    return true;
                }
                return false;
            }
        };
        let value_ok = match &x.val {
            Some(v) => v.representable(target_kind),
            None => {
                // Non-constant untyped values (comparison results) are
                // booleans.
                self.ctx
                    .arena
                    .basic_kind(x.typ)
                    .map(|k| k.is_boolean() && target_kind.is_boolean())
                    .unwrap_or(false)
            }
        };
        let kind_ok = match self.ctx.arena.basic_kind(x.typ) {
            Some(k) => {
                (k.is_boolean() && target_kind.is_boolean())
                    || (k.is_integer() && target_kind.is_numeric())
                    || (k.is_float() && (target_kind.is_float() || target_kind.is_complex()))
                    || (k.is_complex() && target_kind.is_complex())
                    || (k.is_string() && target_kind.is_string())
            }
            None => false,
        };
        if !(value_ok && kind_ok) {
            return false;
        }
        x.typ = target;
        if let Some(node) = x.node {
            self.info.record_type(node, x.mode, x.typ, x.val.clone());
        }
        true
    }

    /// Converts an untyped operand to `target`, reporting on failure.
    pub(crate) fn convert_untyped(&mut self, x: &mut Operand, target: TypeId) -> bool {
        if !self.ctx.arena.is_untyped(x.typ) {
            return true;
        }
        if self.ctx.arena.is_untyped_nil(x.typ) {
            if self.ctx.arena.is_optional(target) {
                x.typ = target;
                return true;
            }
            self.error(TypeError::UntypedNil {
                span: self.sspan(x.span),
            });
            x.mode = OperandMode::Invalid;
            return false;
        }
        if self.convert_untyped_quiet(x, target) {
            return true;
        }
        self.error(TypeError::Mismatch {
            want: self.type_str(target),
            found: self.type_str(x.typ),
            span: self.sspan(x.span),
        });
        x.mode = OperandMode::Invalid;
        false
    }

    /// The default type of an operand, materializing untyped constants.
    pub(crate) fn default_type(&self, typ: TypeId) -> TypeId {
        match self.ctx.arena.basic_kind(typ) {
            Some(k) if k.is_untyped() && k != BasicKind::UntypedNil => {
                self.ctx.universe.basic(constants::default_kind(k))
            }
            _ => typ,
        }
    }

    // Narrowing support

    /// The local variable an expression denotes, if it is a plain
    /// identifier resolved to a function-scoped variable.
    pub(crate) fn local_var_of(&self, e: &Expr) -> Option<ObjId> {
        let Expr::Ident(ident) = e.unparen() else {
            return None;
        };
        let (scope, obj) = self.ctx.scopes.lookup_parent(
            &self.ctx.objs,
            self.scope,
            &ident.name,
            ident.span.start,
        )?;
        if scope == self.ctx.universe.scope || scope == self.ctx.pkgs.get(self.pkg).scope {
            return None;
        }
        match self.ctx.objs.get(obj).kind {
            ObjKind::Var { is_field: false, .. } => Some(obj),
            _ => None,
        }
    }

    /// Reports an `OptionalUse`, preceded by the advisory notice when the
    /// variable's narrowing was disabled by aliasing.
    pub(crate) fn optional_use(&mut self, op: &str, e: &Expr, typ: TypeId, span: Span) {
        if let Some(obj) = self.local_var_of(e) {
            if self.no_narrow.contains(&obj) {
                let name = self.ctx.objs.get(obj).name.clone();
                self.error(TypeError::AliasDisablesNarrowing {
                    name,
                    span: self.sspan(span),
                });
            }
        }
        let name = match e.unparen() {
            Expr::Ident(id) => id.name.clone(),
            _ => "expression".to_string(),
        };
        self.error(TypeError::OptionalUse {
            op: op.to_string(),
            name,
            typ: self.type_str(typ),
            span: self.sspan(span),
        });
    }

    /// Constant integer evaluation, for array lengths.
    pub(crate) fn const_int(&mut self, e: &Expr) -> Option<i64> {
        let x = self.check_expr(e);
        match (x.mode, x.val) {
            (OperandMode::Constant, Some(Value::Int(v))) => Some(v),
            _ => {
                self.error(TypeError::InvalidOp {
                    message: "constant integer expression required".to_string(),
                    span: self.sspan(e.span()),
                });
                None
            }
        }
    }
}

