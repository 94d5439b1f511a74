// Statement parsing.

use super::SgoParser;
use crate::ast::*;
use crate::error::ParseResult;
use crate::lexer::Tok;

impl SgoParser<'_> {
    pub(crate) fn parse_block(&mut self) -> ParseResult<BlockStmt> {
        let start = self.expect(Tok::Lbrace)?;
        let saved = self.no_lit;
        self.no_lit = 0;
        let mut list = Vec::new();
        self.skip_semis();
        while !self.at(&Tok::Rbrace) {
            list.push(self.parse_stmt()?);
            if !self.at(&Tok::Rbrace) {
                self.expect(Tok::Semicolon)?;
            }
            self.skip_semis();
        }
        self.no_lit = saved;
        let end = self.expect(Tok::Rbrace)?;
        Ok(BlockStmt {
            list,
            span: start.to(end),
        })
    }

    pub(crate) fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        match self.tok() {
            Tok::Var | Tok::Const | Tok::Type => {
                let decl = self.parse_decl()?;
                let span = decl.span();
                Ok(Stmt::Decl(DeclStmt { decl, span }))
            }
            Tok::Semicolon => Ok(Stmt::Empty(self.span())),
            Tok::Lbrace => Ok(Stmt::Block(self.parse_block()?)),
            Tok::Go => {
                let start = self.advance();
                let call = self.parse_call_stmt_expr()?;
                let span = start.to(call.span);
                Ok(Stmt::Go(GoStmt { call, span }))
            }
            Tok::Defer => {
                let start = self.advance();
                let call = self.parse_call_stmt_expr()?;
                let span = start.to(call.span);
                Ok(Stmt::Defer(DeferStmt { call, span }))
            }
            Tok::Return => self.parse_return(),
            Tok::Break => self.parse_branch(BranchKind::Break),
            Tok::Continue => self.parse_branch(BranchKind::Continue),
            Tok::Goto => self.parse_branch(BranchKind::Goto),
            Tok::Fallthrough => self.parse_branch(BranchKind::Fallthrough),
            Tok::If => self.parse_if(),
            Tok::For => self.parse_for(),
            Tok::Switch => self.parse_switch(),
            Tok::Select => self.parse_select(),
            _ => self.parse_simple_stmt(false),
        }
    }

    fn parse_call_stmt_expr(&mut self) -> ParseResult<CallExpr> {
        let x = self.parse_expr()?;
        match x {
            Expr::Call(call) => Ok(call),
            other => Err(crate::error::ParseError::unexpected_token(
                self.src().to_string(),
                other.span(),
                "function call".to_string(),
                "expression".to_string(),
            )),
        }
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Tok::Return)?;
        let results = if self.expr_start() || self.at(&Tok::Backslash) {
            self.parse_expr_list()?
        } else {
            ExprList::plain(Vec::new(), start)
        };
        let end = if results.is_empty() {
            start
        } else {
            results.span
        };
        Ok(Stmt::Return(ReturnStmt {
            results,
            span: start.to(end),
        }))
    }

    fn parse_branch(&mut self, kind: BranchKind) -> ParseResult<Stmt> {
        let start = self.advance();
        let label = if matches!(self.tok(), Tok::Ident(_)) && kind != BranchKind::Fallthrough {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let end = label.as_ref().map(|l| l.span).unwrap_or(start);
        Ok(Stmt::Branch(BranchStmt {
            kind,
            label,
            span: start.to(end),
        }))
    }

    /// Simple statement: expression, send, inc/dec, assignment, short
    /// declaration, or label. In a `for` header, `range` on the right of
    /// an assignment produces a `RangeStmt` skeleton.
    pub(crate) fn parse_simple_stmt(&mut self, for_header: bool) -> ParseResult<Stmt> {
        let start = self.span();
        let lhs = self.parse_expr_list()?;

        let op = match self.tok() {
            Tok::Define => Some(AssignOp::Define),
            Tok::Assign => Some(AssignOp::Assign),
            Tok::AddAssign => Some(AssignOp::Add),
            Tok::SubAssign => Some(AssignOp::Sub),
            Tok::MulAssign => Some(AssignOp::Mul),
            Tok::QuoAssign => Some(AssignOp::Quo),
            Tok::RemAssign => Some(AssignOp::Rem),
            Tok::AndAssign => Some(AssignOp::And),
            Tok::OrAssign => Some(AssignOp::Or),
            Tok::XorAssign => Some(AssignOp::Xor),
            Tok::ShlAssign => Some(AssignOp::Shl),
            Tok::ShrAssign => Some(AssignOp::Shr),
            Tok::AndNotAssign => Some(AssignOp::AndNot),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            if for_header && self.at(&Tok::Range) {
                self.advance();
                let x = self.parse_expr()?;
                let mut iter = lhs.list.into_iter();
                let key = iter.next();
                let value = iter.next();
                let body = self.parse_range_body()?;
                let span = start.to(body.span);
                return Ok(Stmt::Range(RangeStmt {
                    key,
                    value,
                    defines: op == AssignOp::Define,
                    x,
                    body,
                    span,
                }));
            }
            let rhs = self.parse_expr_list()?;
            let span = start.to(rhs.span);
            return Ok(Stmt::Assign(AssignStmt { lhs, op, rhs, span }));
        }

        if lhs.len() == 1 && !lhs.is_entangled() {
            match self.tok() {
                Tok::Arrow => {
                    self.advance();
                    let value = self.parse_expr()?;
                    let chan = lhs.list.into_iter().next().unwrap();
                    let span = start.to(value.span());
                    return Ok(Stmt::Send(SendStmt { chan, value, span }));
                }
                Tok::Inc | Tok::Dec => {
                    let is_inc = self.at(&Tok::Inc);
                    let end = self.advance();
                    let x = lhs.list.into_iter().next().unwrap();
                    return Ok(Stmt::IncDec(IncDecStmt {
                        x,
                        is_inc,
                        span: start.to(end),
                    }));
                }
                Tok::Colon => {
                    // A label, or the colon ending a case/comm clause.
                    return match lhs.list.into_iter().next().unwrap() {
                        Expr::Ident(label) => {
                            self.advance();
                            let stmt = self.parse_stmt()?;
                            let span = start.to(stmt.span());
                            Ok(Stmt::Labeled(LabeledStmt {
                                label,
                                stmt: Box::new(stmt),
                                span,
                            }))
                        }
                        other => {
                            let span = other.span();
                            Ok(Stmt::Expr(ExprStmt { x: other, span }))
                        }
                    };
                }
                _ => {
                    let x = lhs.list.into_iter().next().unwrap();
                    let span = x.span();
                    return Ok(Stmt::Expr(ExprStmt { x, span }));
                }
            }
        }
        Err(self.unexpected("':=' or '='"))
    }

    fn parse_range_body(&mut self) -> ParseResult<BlockStmt> {
        let saved = self.no_lit;
        self.no_lit = 0;
        let body = self.parse_block();
        self.no_lit = saved;
        body
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Tok::If)?;
        self.no_lit += 1;
        let mut init = None;
        let cond;
        if self.at(&Tok::Lbrace) {
            self.no_lit -= 1;
            return Err(self.unexpected("condition"));
        }
        let s = self.parse_simple_stmt(false)?;
        if self.eat(&Tok::Semicolon) {
            init = Some(Box::new(s));
            cond = self.parse_expr()?;
        } else {
            match s {
                Stmt::Expr(e) => cond = e.x,
                _ => {
                    self.no_lit -= 1;
                    return Err(self.unexpected("condition expression"));
                }
            }
        }
        self.no_lit -= 1;
        let body = self.parse_block()?;
        let mut end = body.span;
        let else_branch = if self.eat(&Tok::Else) {
            let stmt = if self.at(&Tok::If) {
                self.parse_if()?
            } else {
                Stmt::Block(self.parse_block()?)
            };
            end = stmt.span();
            Some(Box::new(stmt))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            init,
            cond,
            body,
            else_branch,
            span: start.to(end),
        }))
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Tok::For)?;
        self.no_lit += 1;

        if self.at(&Tok::Lbrace) {
            self.no_lit -= 1;
            let body = self.parse_block()?;
            let span = start.to(body.span);
            return Ok(Stmt::For(ForStmt {
                init: None,
                cond: None,
                post: None,
                body,
                span,
            }));
        }

        if self.eat(&Tok::Range) {
            let x = self.parse_expr()?;
            self.no_lit -= 1;
            let body = self.parse_block()?;
            let span = start.to(body.span);
            return Ok(Stmt::Range(RangeStmt {
                key: None,
                value: None,
                defines: false,
                x,
                body,
                span,
            }));
        }

        let mut init = None;
        let mut cond = None;
        let mut post = None;

        if !self.at(&Tok::Semicolon) {
            let s = self.parse_simple_stmt(true)?;
            if let Stmt::Range(mut range) = s {
                self.no_lit -= 1;
                range.span = start.to(range.body.span);
                return Ok(Stmt::Range(range));
            }
            if self.at(&Tok::Lbrace) {
                self.no_lit -= 1;
                let body = self.parse_block()?;
                let span = start.to(body.span);
                let cond = match s {
                    Stmt::Expr(e) => e.x,
                    _ => return Err(self.unexpected("condition expression")),
                };
                return Ok(Stmt::For(ForStmt {
                    init: None,
                    cond: Some(cond),
                    post: None,
                    body,
                    span,
                }));
            }
            init = Some(Box::new(s));
        }
        self.expect(Tok::Semicolon)?;
        if !self.at(&Tok::Semicolon) {
            cond = Some(self.parse_expr()?);
        }
        self.expect(Tok::Semicolon)?;
        if !self.at(&Tok::Lbrace) {
            post = Some(Box::new(self.parse_simple_stmt(false)?));
        }
        self.no_lit -= 1;
        let body = self.parse_block()?;
        let span = start.to(body.span);
        Ok(Stmt::For(ForStmt {
            init,
            cond,
            post,
            body,
            span,
        }))
    }

    fn parse_switch(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Tok::Switch)?;
        self.no_lit += 1;
        let mut init = None;
        let mut tag_stmt = None;
        if !self.at(&Tok::Lbrace) {
            let s = self.parse_simple_stmt(false)?;
            if self.eat(&Tok::Semicolon) {
                init = Some(Box::new(s));
                if !self.at(&Tok::Lbrace) {
                    tag_stmt = Some(self.parse_simple_stmt(false)?);
                }
            } else {
                tag_stmt = Some(s);
            }
        }
        self.no_lit -= 1;

        let is_type_switch = match &tag_stmt {
            Some(Stmt::Expr(e)) => {
                matches!(e.x.unparen(), Expr::TypeAssert(a) if a.typ.is_none())
            }
            Some(Stmt::Assign(a)) => {
                a.op == AssignOp::Define
                    && a.rhs.len() == 1
                    && matches!(a.rhs.list[0].unparen(), Expr::TypeAssert(x) if x.typ.is_none())
            }
            _ => false,
        };

        let (body, end) = self.parse_case_clauses()?;
        let span = start.to(end);
        if is_type_switch {
            return Ok(Stmt::TypeSwitch(TypeSwitchStmt {
                init,
                assign: Box::new(tag_stmt.unwrap()),
                body,
                span,
            }));
        }
        let tag = match tag_stmt {
            None => None,
            Some(Stmt::Expr(e)) => Some(e.x),
            Some(_) => return Err(self.unexpected("switch expression")),
        };
        Ok(Stmt::Switch(SwitchStmt {
            init,
            tag,
            body,
            span,
        }))
    }

    fn parse_case_clauses(&mut self) -> ParseResult<(Vec<CaseClause>, Span)> {
        self.expect(Tok::Lbrace)?;
        let mut clauses = Vec::new();
        self.skip_semis();
        while !self.at(&Tok::Rbrace) {
            let start = self.span();
            let list = if self.eat(&Tok::Case) {
                self.parse_expr_list()?
            } else {
                self.expect(Tok::Default)?;
                ExprList::plain(Vec::new(), start)
            };
            let colon = self.expect(Tok::Colon)?;
            let mut body = Vec::new();
            self.skip_semis();
            while !matches!(self.tok(), Tok::Case | Tok::Default | Tok::Rbrace) {
                body.push(self.parse_stmt()?);
                if !matches!(self.tok(), Tok::Case | Tok::Default | Tok::Rbrace) {
                    self.expect(Tok::Semicolon)?;
                }
                self.skip_semis();
            }
            let end = body.last().map(|s| s.span()).unwrap_or(colon);
            clauses.push(CaseClause {
                list,
                body,
                colon: colon.start,
                span: start.to(end),
            });
        }
        let rbrace = self.expect(Tok::Rbrace)?;
        Ok((clauses, rbrace))
    }

    fn parse_select(&mut self) -> ParseResult<Stmt> {
        let start = self.expect(Tok::Select)?;
        self.expect(Tok::Lbrace)?;
        let mut body = Vec::new();
        self.skip_semis();
        while !self.at(&Tok::Rbrace) {
            let clause_start = self.span();
            let comm = if self.eat(&Tok::Case) {
                Some(Box::new(self.parse_simple_stmt(false)?))
            } else {
                self.expect(Tok::Default)?;
                None
            };
            let colon = self.expect(Tok::Colon)?;
            let mut stmts = Vec::new();
            self.skip_semis();
            while !matches!(self.tok(), Tok::Case | Tok::Default | Tok::Rbrace) {
                stmts.push(self.parse_stmt()?);
                if !matches!(self.tok(), Tok::Case | Tok::Default | Tok::Rbrace) {
                    self.expect(Tok::Semicolon)?;
                }
                self.skip_semis();
            }
            let end = stmts.last().map(|s| s.span()).unwrap_or(colon);
            body.push(CommClause {
                comm,
                body: stmts,
                span: clause_start.to(end),
            });
        }
        let end = self.expect(Tok::Rbrace)?;
        Ok(Stmt::Select(SelectStmt {
            body,
            span: start.to(end),
        }))
    }
}
