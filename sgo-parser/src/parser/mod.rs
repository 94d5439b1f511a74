// SGo recursive-descent parser
// Declarations and the file grammar live here; types, expressions and
// statements are in the sibling modules.

mod exprs;
mod stmts;
mod types;

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{Lexer, Tok, Token};

pub struct SgoParser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    /// Non-zero while parsing an if/for/switch header, where a bare
    /// composite literal would swallow the statement block.
    pub(crate) no_lit: u32,
}

impl<'a> SgoParser<'a> {
    pub fn new(src: &'a str) -> ParseResult<Self> {
        let tokens = Lexer::new(src).lex_all()?;
        Ok(Self {
            src,
            tokens,
            pos: 0,
            next_id: 0,
            no_lit: 0,
        })
    }

    pub fn parse_file(src: &str) -> ParseResult<File> {
        let mut p = SgoParser::new(src)?;
        p.file()
    }

    /// Parses a standalone expression, as used to re-parse annotation type
    /// strings.
    pub fn parse_expr_str(src: &str) -> ParseResult<Expr> {
        let mut p = SgoParser::new(src)?;
        let x = p.parse_expr()?;
        p.skip_semis();
        p.expect(Tok::Eof)?;
        Ok(x)
    }

    // Token plumbing

    pub(crate) fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn tok(&self) -> &Tok {
        &self.cur().tok
    }

    pub(crate) fn peek_tok(&self) -> &Tok {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].tok
    }

    pub(crate) fn span(&self) -> Span {
        self.cur().span
    }

    pub(crate) fn advance(&mut self) -> Span {
        let span = self.span();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        span
    }

    pub(crate) fn at(&self, tok: &Tok) -> bool {
        self.tok() == tok
    }

    pub(crate) fn eat(&mut self, tok: &Tok) -> bool {
        if self.at(tok) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, tok: Tok) -> ParseResult<Span> {
        if self.at(&tok) {
            Ok(self.advance())
        } else {
            Err(ParseError::unexpected_token(
                self.src.to_string(),
                self.span(),
                tok.describe(),
                self.tok().describe(),
            ))
        }
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::unexpected_token(
            self.src.to_string(),
            self.span(),
            expected.to_string(),
            self.tok().describe(),
        )
    }

    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn mark(&self) -> (usize, u32) {
        (self.pos, self.next_id)
    }

    pub(crate) fn reset(&mut self, mark: (usize, u32)) {
        self.pos = mark.0;
        self.next_id = mark.1;
    }

    pub(crate) fn cur_doc(&self) -> Option<String> {
        self.cur().doc.clone()
    }

    pub(crate) fn skip_semis(&mut self) {
        while self.at(&Tok::Semicolon) {
            self.advance();
        }
    }

    pub(crate) fn parse_ident(&mut self) -> ParseResult<Ident> {
        match self.tok().clone() {
            Tok::Ident(name) => {
                let span = self.advance();
                Ok(Ident {
                    id: self.next_id(),
                    name,
                    span,
                })
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    // File and declarations

    fn file(&mut self) -> ParseResult<File> {
        let start = self.span();
        self.expect(Tok::Package)?;
        let package = self.parse_ident()?;
        self.expect(Tok::Semicolon)?;

        let mut decls = Vec::new();
        self.skip_semis();
        while !self.at(&Tok::Eof) {
            decls.push(self.parse_decl()?);
            self.skip_semis();
        }
        let end = self.span();
        Ok(File {
            package,
            decls,
            span: start.to(end),
        })
    }

    pub(crate) fn parse_decl(&mut self) -> ParseResult<Decl> {
        match self.tok() {
            Tok::Func => self.parse_func_decl(),
            Tok::Import => self.parse_gen_decl(DeclTok::Import),
            Tok::Const => self.parse_gen_decl(DeclTok::Const),
            Tok::Type => self.parse_gen_decl(DeclTok::Type),
            Tok::Var => self.parse_gen_decl(DeclTok::Var),
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn parse_gen_decl(&mut self, tok: DeclTok) -> ParseResult<Decl> {
        let doc = self.cur_doc();
        let start = self.advance();
        let mut specs = Vec::new();
        let grouped = self.at(&Tok::Lparen);
        if grouped {
            self.advance();
            self.skip_semis();
            while !self.at(&Tok::Rparen) {
                specs.push(self.parse_spec(tok)?);
                if !self.at(&Tok::Rparen) {
                    self.expect(Tok::Semicolon)?;
                }
                self.skip_semis();
            }
            let end = self.expect(Tok::Rparen)?;
            return Ok(Decl::Gen(GenDecl {
                doc,
                tok,
                grouped,
                specs,
                span: start.to(end),
            }));
        }
        let spec = self.parse_spec(tok)?;
        let end = match &spec {
            Spec::Import(s) => s.span,
            Spec::Value(s) => s.span,
            Spec::Type(s) => s.span,
        };
        specs.push(spec);
        Ok(Decl::Gen(GenDecl {
            doc,
            tok,
            grouped,
            specs,
            span: start.to(end),
        }))
    }

    fn parse_spec(&mut self, tok: DeclTok) -> ParseResult<Spec> {
        match tok {
            DeclTok::Import => self.parse_import_spec(),
            DeclTok::Type => self.parse_type_spec(),
            DeclTok::Const | DeclTok::Var => self.parse_value_spec(),
        }
    }

    fn parse_import_spec(&mut self) -> ParseResult<Spec> {
        let start = self.span();
        let name = if matches!(self.tok(), Tok::Ident(_)) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let path = match self.tok().clone() {
            Tok::Str(value) => {
                let span = self.advance();
                BasicLit {
                    id: self.next_id(),
                    kind: LitKind::String,
                    value,
                    span,
                }
            }
            _ => return Err(self.unexpected("import path string")),
        };
        let span = start.to(path.span);
        Ok(Spec::Import(ImportSpec { name, path, span }))
    }

    fn parse_type_spec(&mut self) -> ParseResult<Spec> {
        let doc = self.cur_doc();
        let name = self.parse_ident()?;
        let typ = self.parse_type()?;
        let span = name.span.to(typ.span());
        Ok(Spec::Type(TypeSpec {
            doc,
            name,
            typ,
            span,
        }))
    }

    fn parse_value_spec(&mut self) -> ParseResult<Spec> {
        let doc = self.cur_doc();
        let start = self.span();
        let mut names = vec![self.parse_ident()?];
        while self.eat(&Tok::Comma) {
            names.push(self.parse_ident()?);
        }
        let typ = if self.type_start() && !self.at(&Tok::Assign) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let values = if self.eat(&Tok::Assign) {
            self.parse_expr_list()?
        } else {
            ExprList::plain(Vec::new(), self.span())
        };
        let end = if !values.is_empty() {
            values.span
        } else if let Some(t) = &typ {
            t.span()
        } else {
            names.last().map(|n| n.span).unwrap_or(start)
        };
        Ok(Spec::Value(ValueSpec {
            doc,
            names,
            typ,
            values,
            span: start.to(end),
        }))
    }

    fn parse_func_decl(&mut self) -> ParseResult<Decl> {
        let doc = self.cur_doc();
        let start = self.expect(Tok::Func)?;
        let recv = if self.at(&Tok::Lparen) {
            Some(self.parse_params(false)?)
        } else {
            None
        };
        let name = self.parse_ident()?;
        let typ = self.parse_func_type_after_keyword(start)?;
        let body = if self.at(&Tok::Lbrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let end = body
            .as_ref()
            .map(|b| b.span)
            .unwrap_or_else(|| typ.span);
        Ok(Decl::Func(FuncDecl {
            doc,
            recv,
            name,
            typ,
            body,
            span: start.to(end),
        }))
    }
}

/// Parses a single SGo (or base-language) source file.
pub fn parse_file(src: &str) -> ParseResult<File> {
    SgoParser::parse_file(src)
}

/// Parses a standalone expression or type expression.
pub fn parse_expr(src: &str) -> ParseResult<Expr> {
    SgoParser::parse_expr_str(src)
}
