// Expression parsing: precedence climbing over unary and primary
// expressions, composite literals, and entangled expression lists.

use super::SgoParser;
use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::Tok;

impl SgoParser<'_> {
    /// Runs `f` with composite literals re-enabled, as inside any
    /// bracketed context.
    pub(crate) fn with_lit<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = self.no_lit;
        self.no_lit = 0;
        let out = f(self);
        self.no_lit = saved;
        out
    }

    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut x = self.parse_unary()?;
        loop {
            let op = match self.tok() {
                Tok::LOr => BinOp::LOr,
                Tok::LAnd => BinOp::LAnd,
                Tok::Eql => BinOp::Eql,
                Tok::Neq => BinOp::Neq,
                Tok::Lss => BinOp::Lss,
                Tok::Leq => BinOp::Leq,
                Tok::Gtr => BinOp::Gtr,
                Tok::Geq => BinOp::Geq,
                Tok::Add => BinOp::Add,
                Tok::Sub => BinOp::Sub,
                Tok::Or => BinOp::Or,
                Tok::Xor => BinOp::Xor,
                Tok::Mul => BinOp::Mul,
                Tok::Quo => BinOp::Quo,
                Tok::Rem => BinOp::Rem,
                Tok::Shl => BinOp::Shl,
                Tok::Shr => BinOp::Shr,
                Tok::And => BinOp::And,
                Tok::AndNot => BinOp::AndNot,
                _ => break,
            };
            let prec = op.precedence();
            if prec <= min_prec {
                break;
            }
            self.advance();
            let y = self.parse_binary(prec)?;
            let span = x.span().to(y.span());
            x = Expr::Binary(BinaryExpr {
                id: self.next_id(),
                x: Box::new(x),
                op,
                y: Box::new(y),
                span,
            });
        }
        Ok(x)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        let op = match self.tok() {
            Tok::Add => Some(UnOp::Plus),
            Tok::Sub => Some(UnOp::Minus),
            Tok::Not => Some(UnOp::Not),
            Tok::Xor => Some(UnOp::Xor),
            Tok::And => Some(UnOp::Addr),
            Tok::Arrow => {
                // `<-chan T` is a type; `<-ch` is a receive.
                if self.peek_tok() == &Tok::Chan {
                    return self.parse_type();
                }
                Some(UnOp::Recv)
            }
            Tok::Mul => {
                self.advance();
                let x = self.parse_unary()?;
                let span = start.to(x.span());
                return Ok(Expr::Star(StarExpr {
                    id: self.next_id(),
                    x: Box::new(x),
                    span,
                }));
            }
            Tok::Question => {
                self.advance();
                let elt = self.parse_type()?;
                let span = start.to(elt.span());
                return Ok(Expr::OptionalType(OptionalType {
                    id: self.next_id(),
                    elt: Box::new(elt),
                    span,
                }));
            }
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let x = self.parse_unary()?;
            let span = start.to(x.span());
            return Ok(Expr::Unary(UnaryExpr {
                id: self.next_id(),
                op,
                x: Box::new(x),
                span,
            }));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let mut x = self.parse_operand()?;
        loop {
            match self.tok() {
                Tok::Period => {
                    self.advance();
                    if self.at(&Tok::Lparen) {
                        // type assertion: x.(T) or x.(type)
                        self.advance();
                        let typ = if self.eat(&Tok::Type) {
                            None
                        } else {
                            Some(Box::new(self.with_lit(|p| p.parse_type())?))
                        };
                        let end = self.expect(Tok::Rparen)?;
                        let span = x.span().to(end);
                        x = Expr::TypeAssert(TypeAssertExpr {
                            id: self.next_id(),
                            x: Box::new(x),
                            typ,
                            span,
                        });
                    } else {
                        let sel = self.parse_ident()?;
                        let span = x.span().to(sel.span);
                        x = Expr::Selector(SelectorExpr {
                            id: self.next_id(),
                            x: Box::new(x),
                            sel,
                            span,
                        });
                    }
                }
                Tok::Lparen => {
                    self.advance();
                    let mut args = Vec::new();
                    let mut has_ellipsis = false;
                    while !self.at(&Tok::Rparen) {
                        args.push(self.with_lit(|p| p.parse_expr())?);
                        if self.eat(&Tok::Ellipsis) {
                            has_ellipsis = true;
                        }
                        if !self.at(&Tok::Rparen) {
                            self.expect(Tok::Comma)?;
                        }
                    }
                    let end = self.expect(Tok::Rparen)?;
                    let span = x.span().to(end);
                    x = Expr::Call(CallExpr {
                        id: self.next_id(),
                        fun: Box::new(x),
                        args,
                        has_ellipsis,
                        span,
                    });
                }
                Tok::Lbrack => {
                    self.advance();
                    x = self.with_lit(|p| p.parse_index_or_slice(x))?;
                }
                Tok::Lbrace if self.no_lit == 0 && is_literal_type(&x) => {
                    x = self.parse_composite_lit(Some(x))?;
                }
                _ => break,
            }
        }
        Ok(x)
    }

    fn parse_index_or_slice(&mut self, x: Expr) -> ParseResult<Expr> {
        // opening '[' already consumed
        let mut low = None;
        if !self.at(&Tok::Colon) {
            low = Some(Box::new(self.parse_expr()?));
            if self.at(&Tok::Rbrack) {
                let end = self.advance();
                let span = x.span().to(end);
                return Ok(Expr::Index(IndexExpr {
                    id: self.next_id(),
                    x: Box::new(x),
                    index: low.unwrap(),
                    span,
                }));
            }
        }
        self.expect(Tok::Colon)?;
        let mut high = None;
        let mut max = None;
        if !self.at(&Tok::Rbrack) && !self.at(&Tok::Colon) {
            high = Some(Box::new(self.parse_expr()?));
        }
        if self.eat(&Tok::Colon) {
            max = Some(Box::new(self.parse_expr()?));
        }
        let end = self.expect(Tok::Rbrack)?;
        let span = x.span().to(end);
        Ok(Expr::Slice(SliceExpr {
            id: self.next_id(),
            x: Box::new(x),
            low,
            high,
            max,
            span,
        }))
    }

    fn parse_operand(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        match self.tok().clone() {
            Tok::Ident(_) => {
                let ident = self.parse_ident()?;
                Ok(Expr::Ident(ident))
            }
            Tok::Int(value) => self.basic_lit(LitKind::Int, value),
            Tok::Float(value) => self.basic_lit(LitKind::Float, value),
            Tok::Imag(value) => self.basic_lit(LitKind::Imag, value),
            Tok::Char(value) => self.basic_lit(LitKind::Char, value),
            Tok::Str(value) => self.basic_lit(LitKind::String, value),
            Tok::Lparen => {
                self.advance();
                let x = self.with_lit(|p| p.parse_expr())?;
                let end = self.expect(Tok::Rparen)?;
                Ok(Expr::Paren(ParenExpr {
                    id: self.next_id(),
                    x: Box::new(x),
                    span: start.to(end),
                }))
            }
            Tok::Func => {
                let kw = self.advance();
                let typ = self.parse_func_type_after_keyword(kw)?;
                if self.at(&Tok::Lbrace) {
                    let body = self.with_lit(|p| p.parse_block())?;
                    let span = kw.to(body.span);
                    return Ok(Expr::FuncLit(FuncLit {
                        id: self.next_id(),
                        typ,
                        body,
                        span,
                    }));
                }
                Ok(Expr::FuncType(typ))
            }
            // Type operands; used for conversions, composite literal types
            // and type-switch case lists.
            Tok::Lbrack | Tok::Map | Tok::Chan | Tok::Struct | Tok::Interface => {
                let typ = self.parse_type()?;
                if self.at(&Tok::Lbrace) && self.no_lit == 0 && is_literal_type(&typ) {
                    return self.parse_composite_lit(Some(typ));
                }
                Ok(typ)
            }
            _ => Err(ParseError::expected_expression(
                self.src().to_string(),
                self.span(),
                self.tok().describe(),
            )),
        }
    }

    fn basic_lit(&mut self, kind: LitKind, value: String) -> ParseResult<Expr> {
        let span = self.advance();
        Ok(Expr::BasicLit(BasicLit {
            id: self.next_id(),
            kind,
            value,
            span,
        }))
    }

    fn parse_composite_lit(&mut self, typ: Option<Expr>) -> ParseResult<Expr> {
        let start = typ.as_ref().map(|t| t.span()).unwrap_or_else(|| self.span());
        self.expect(Tok::Lbrace)?;
        let mut elts = Vec::new();
        self.skip_semis();
        while !self.at(&Tok::Rbrace) {
            let elt = self.with_lit(|p| p.parse_composite_elt())?;
            elts.push(elt);
            if !self.at(&Tok::Rbrace) {
                if !self.eat(&Tok::Comma) {
                    self.expect(Tok::Semicolon)?;
                }
            }
            self.skip_semis();
        }
        let end = self.expect(Tok::Rbrace)?;
        Ok(Expr::CompositeLit(CompositeLit {
            id: self.next_id(),
            typ: typ.map(Box::new),
            elts,
            span: start.to(end),
        }))
    }

    fn parse_composite_elt(&mut self) -> ParseResult<Expr> {
        // Nested literals may omit their type: {k: v}.
        let key = if self.at(&Tok::Lbrace) {
            self.parse_composite_lit(None)?
        } else {
            self.parse_expr()?
        };
        if self.eat(&Tok::Colon) {
            let value = if self.at(&Tok::Lbrace) {
                self.parse_composite_lit(None)?
            } else {
                self.parse_expr()?
            };
            let span = key.span().to(value.span());
            return Ok(Expr::KeyValue(KeyValueExpr {
                id: self.next_id(),
                key: Box::new(key),
                value: Box::new(value),
                span,
            }));
        }
        Ok(key)
    }

    /// Parses a comma-separated expression list which may contain one `\`
    /// separator. See `ExprList::entangled_pos` for the encoding.
    pub(crate) fn parse_expr_list(&mut self) -> ParseResult<ExprList> {
        let start = self.span();
        let mut list = Vec::new();
        let mut pos = 0usize;
        let mut backslash = None;
        if self.at(&Tok::Backslash) {
            backslash = Some(self.advance());
            pos = 1;
        }
        loop {
            list.push(self.parse_expr()?);
            if self.eat(&Tok::Comma) {
                continue;
            }
            if self.at(&Tok::Backslash) {
                if pos != 0 {
                    return Err(ParseError::misplaced_entangle(
                        self.src().to_string(),
                        self.span(),
                    ));
                }
                backslash = Some(self.advance());
                pos = list.len() + 1;
                if self.expr_start() {
                    continue;
                }
            }
            break;
        }
        let end = list.last().map(|e| e.span()).unwrap_or(start);
        Ok(ExprList {
            list,
            entangled_pos: pos,
            backslash,
            span: start.to(end),
        })
    }

    /// Whether the current token can begin an expression.
    pub(crate) fn expr_start(&self) -> bool {
        matches!(
            self.tok(),
            Tok::Ident(_)
                | Tok::Int(_)
                | Tok::Float(_)
                | Tok::Imag(_)
                | Tok::Char(_)
                | Tok::Str(_)
                | Tok::Lparen
                | Tok::Func
                | Tok::Lbrack
                | Tok::Map
                | Tok::Chan
                | Tok::Struct
                | Tok::Interface
                | Tok::Add
                | Tok::Sub
                | Tok::Not
                | Tok::Xor
                | Tok::And
                | Tok::Mul
                | Tok::Arrow
                | Tok::Question
        )
    }

    pub(crate) fn src(&self) -> &str {
        self.src
    }
}

/// Whether a parsed operand can serve as the type of a composite literal.
fn is_literal_type(x: &Expr) -> bool {
    match x {
        Expr::Ident(_)
        | Expr::ArrayType(_)
        | Expr::MapType(_)
        | Expr::StructType(_) => true,
        Expr::Selector(sel) => matches!(&*sel.x, Expr::Ident(_)),
        _ => false,
    }
}
