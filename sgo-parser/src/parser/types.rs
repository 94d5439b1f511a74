// Type expression and field list parsing.

use super::SgoParser;
use crate::ast::*;
use crate::error::ParseResult;
use crate::lexer::Tok;

impl SgoParser<'_> {
    /// Whether the current token can begin a type expression.
    pub(crate) fn type_start(&self) -> bool {
        matches!(
            self.tok(),
            Tok::Ident(_)
                | Tok::Mul
                | Tok::Question
                | Tok::Lbrack
                | Tok::Map
                | Tok::Chan
                | Tok::Arrow
                | Tok::Func
                | Tok::Struct
                | Tok::Interface
                | Tok::Lparen
                | Tok::Ellipsis
        )
    }

    pub(crate) fn parse_type(&mut self) -> ParseResult<Expr> {
        let start = self.span();
        match self.tok().clone() {
            Tok::Ident(_) => {
                let ident = self.parse_ident()?;
                if self.at(&Tok::Period) {
                    self.advance();
                    let sel = self.parse_ident()?;
                    let span = ident.span.to(sel.span);
                    return Ok(Expr::Selector(SelectorExpr {
                        id: self.next_id(),
                        x: Box::new(Expr::Ident(ident)),
                        sel,
                        span,
                    }));
                }
                Ok(Expr::Ident(ident))
            }
            Tok::Mul => {
                self.advance();
                let x = self.parse_type()?;
                let span = start.to(x.span());
                Ok(Expr::Star(StarExpr {
                    id: self.next_id(),
                    x: Box::new(x),
                    span,
                }))
            }
            Tok::Question => {
                self.advance();
                let elt = self.parse_type()?;
                let span = start.to(elt.span());
                Ok(Expr::OptionalType(OptionalType {
                    id: self.next_id(),
                    elt: Box::new(elt),
                    span,
                }))
            }
            Tok::Lbrack => {
                self.advance();
                let len = if self.at(&Tok::Rbrack) {
                    None
                } else {
                    Some(Box::new(self.with_lit(|p| p.parse_expr())?))
                };
                self.expect(Tok::Rbrack)?;
                let elt = self.parse_type()?;
                let span = start.to(elt.span());
                Ok(Expr::ArrayType(ArrayType {
                    id: self.next_id(),
                    len,
                    elt: Box::new(elt),
                    span,
                }))
            }
            Tok::Map => {
                self.advance();
                self.expect(Tok::Lbrack)?;
                let key = self.with_lit(|p| p.parse_type())?;
                self.expect(Tok::Rbrack)?;
                let value = self.parse_type()?;
                let span = start.to(value.span());
                Ok(Expr::MapType(MapType {
                    id: self.next_id(),
                    key: Box::new(key),
                    value: Box::new(value),
                    span,
                }))
            }
            Tok::Chan => {
                self.advance();
                let dir = if self.eat(&Tok::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::SendRecv
                };
                let value = self.parse_type()?;
                let span = start.to(value.span());
                Ok(Expr::ChanType(ChanType {
                    id: self.next_id(),
                    dir,
                    value: Box::new(value),
                    span,
                }))
            }
            Tok::Arrow => {
                self.advance();
                self.expect(Tok::Chan)?;
                let value = self.parse_type()?;
                let span = start.to(value.span());
                Ok(Expr::ChanType(ChanType {
                    id: self.next_id(),
                    dir: ChanDir::Recv,
                    value: Box::new(value),
                    span,
                }))
            }
            Tok::Func => {
                let kw = self.advance();
                let typ = self.parse_func_type_after_keyword(kw)?;
                Ok(Expr::FuncType(typ))
            }
            Tok::Struct => self.parse_struct_type(),
            Tok::Interface => self.parse_interface_type(),
            Tok::Lparen => {
                self.advance();
                let x = self.with_lit(|p| p.parse_type())?;
                let end = self.expect(Tok::Rparen)?;
                Ok(Expr::Paren(ParenExpr {
                    id: self.next_id(),
                    x: Box::new(x),
                    span: start.to(end),
                }))
            }
            Tok::Ellipsis => {
                self.advance();
                let elt = self.parse_type()?;
                let span = start.to(elt.span());
                Ok(Expr::Ellipsis(Ellipsis {
                    id: self.next_id(),
                    elt: Some(Box::new(elt)),
                    span,
                }))
            }
            _ => Err(self.unexpected("type")),
        }
    }

    /// Signature following the `func` keyword (and receiver, if any).
    pub(crate) fn parse_func_type_after_keyword(&mut self, kw: Span) -> ParseResult<FuncType> {
        let params = self.parse_params(false)?;
        let results = self.parse_results()?;
        let end = results
            .as_ref()
            .map(|r| r.span)
            .unwrap_or(params.span);
        Ok(FuncType {
            id: self.next_id(),
            params,
            results,
            span: kw.to(end),
        })
    }

    /// Parses a parenthesized parameter or result list. With
    /// `allow_entangled`, a `\` separates the list from a single trailing
    /// field.
    pub(crate) fn parse_params(&mut self, allow_entangled: bool) -> ParseResult<FieldList> {
        let start = self.expect(Tok::Lparen)?;
        let mut list = Vec::new();
        let mut entangled = None;
        let mut backslash = None;
        while !self.at(&Tok::Rparen) {
            if allow_entangled && self.at(&Tok::Backslash) {
                backslash = Some(self.advance());
                let field = self.parse_param_group()?;
                entangled = Some(Box::new(field));
                break;
            }
            list.push(self.parse_param_group()?);
            if !self.at(&Tok::Rparen) && !self.at(&Tok::Backslash) {
                self.expect(Tok::Comma)?;
            }
            if !allow_entangled && self.at(&Tok::Backslash) {
                return Err(self.unexpected("',' or ')'"));
            }
        }
        let end = self.expect(Tok::Rparen)?;
        Ok(FieldList {
            list,
            entangled,
            backslash,
            span: start.to(end),
        })
    }

    /// One parameter group: `a, b T` or a bare type. Disambiguated by
    /// backtracking: try an identifier list followed by a type, fall back
    /// to a single anonymous type.
    fn parse_param_group(&mut self) -> ParseResult<Field> {
        let doc = self.cur_doc();
        let start = self.span();
        if matches!(self.tok(), Tok::Ident(_)) {
            let mark = self.mark();
            let mut names = Vec::new();
            let mut ok = true;
            loop {
                match self.tok() {
                    Tok::Ident(_) => names.push(self.parse_ident()?),
                    _ => {
                        ok = false;
                        break;
                    }
                }
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
            if ok && self.type_start() {
                let typ = self.parse_type()?;
                let span = start.to(typ.span());
                return Ok(Field {
                    id: self.next_id(),
                    doc,
                    names,
                    typ,
                    tag: None,
                    span,
                });
            }
            self.reset(mark);
        }
        let typ = self.parse_type()?;
        let span = start.to(typ.span());
        Ok(Field {
            id: self.next_id(),
            doc,
            names: Vec::new(),
            typ,
            tag: None,
            span,
        })
    }

    /// Result list: absent, a single unparenthesized type, or a
    /// parenthesized list which may carry an entangled tail.
    pub(crate) fn parse_results(&mut self) -> ParseResult<Option<FieldList>> {
        if self.at(&Tok::Lparen) {
            return Ok(Some(self.parse_params(true)?));
        }
        if self.type_start() && !self.at(&Tok::Lbrace) {
            let typ = self.parse_type()?;
            let span = typ.span();
            let field = Field {
                id: self.next_id(),
                doc: None,
                names: Vec::new(),
                typ,
                tag: None,
                span,
            };
            return Ok(Some(FieldList {
                list: vec![field],
                entangled: None,
                backslash: None,
                span,
            }));
        }
        Ok(None)
    }

    fn parse_struct_type(&mut self) -> ParseResult<Expr> {
        let start = self.expect(Tok::Struct)?;
        self.expect(Tok::Lbrace)?;
        let mut list = Vec::new();
        self.skip_semis();
        while !self.at(&Tok::Rbrace) {
            list.push(self.parse_struct_field()?);
            if !self.at(&Tok::Rbrace) {
                self.expect(Tok::Semicolon)?;
            }
            self.skip_semis();
        }
        let end = self.expect(Tok::Rbrace)?;
        let span = start.to(end);
        Ok(Expr::StructType(StructType {
            id: self.next_id(),
            fields: FieldList {
                list,
                entangled: None,
                backslash: None,
                span,
            },
            span,
        }))
    }

    fn parse_struct_field(&mut self) -> ParseResult<Field> {
        let doc = self.cur_doc();
        let start = self.span();
        let mut names = Vec::new();
        let mut typ = None;
        if matches!(self.tok(), Tok::Ident(_)) {
            let mark = self.mark();
            let mut idents = Vec::new();
            let mut named = true;
            loop {
                match self.tok() {
                    Tok::Ident(_) => idents.push(self.parse_ident()?),
                    _ => {
                        named = false;
                        break;
                    }
                }
                if !self.eat(&Tok::Comma) {
                    break;
                }
            }
            if named && self.type_start() {
                names = idents;
                typ = Some(self.parse_type()?);
            } else {
                self.reset(mark);
            }
        }
        // Anonymous (embedded) field: a type name, `*T`, or `?T`.
        let typ = match typ {
            Some(t) => t,
            None => self.parse_type()?,
        };
        let tag = match self.tok().clone() {
            Tok::Str(value) => {
                let span = self.advance();
                Some(BasicLit {
                    id: self.next_id(),
                    kind: LitKind::String,
                    value,
                    span,
                })
            }
            _ => None,
        };
        let end = tag.as_ref().map(|t| t.span).unwrap_or_else(|| typ.span());
        Ok(Field {
            id: self.next_id(),
            doc,
            names,
            typ,
            tag,
            span: start.to(end),
        })
    }

    fn parse_interface_type(&mut self) -> ParseResult<Expr> {
        let start = self.expect(Tok::Interface)?;
        self.expect(Tok::Lbrace)?;
        let mut list = Vec::new();
        self.skip_semis();
        while !self.at(&Tok::Rbrace) {
            let doc = self.cur_doc();
            let field_start = self.span();
            let field = if matches!(self.tok(), Tok::Ident(_)) && self.peek_tok() == &Tok::Lparen {
                // method declaration
                let name = self.parse_ident()?;
                let typ = self.parse_func_type_after_keyword(name.span)?;
                let span = field_start.to(typ.span);
                Field {
                    id: self.next_id(),
                    doc,
                    names: vec![name],
                    typ: Expr::FuncType(typ),
                    tag: None,
                    span,
                }
            } else {
                // embedded interface
                let typ = self.parse_type()?;
                let span = field_start.to(typ.span());
                Field {
                    id: self.next_id(),
                    doc,
                    names: Vec::new(),
                    typ,
                    tag: None,
                    span,
                }
            };
            list.push(field);
            if !self.at(&Tok::Rbrace) {
                self.expect(Tok::Semicolon)?;
            }
            self.skip_semis();
        }
        let end = self.expect(Tok::Rbrace)?;
        let span = start.to(end);
        Ok(Expr::InterfaceType(InterfaceType {
            id: self.next_id(),
            methods: FieldList {
                list,
                entangled: None,
                backslash: None,
                span,
            },
            span,
        }))
    }
}
