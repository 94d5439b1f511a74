// SGo lexer
// Hand-written scanner for the base-language token set plus `?` and `\`.
// Implements the base language's automatic semicolon insertion: a newline
// terminates a statement when the previous token could end one.

use crate::ast::Span;
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Eof,
    Ident(String),
    Int(String),
    Float(String),
    Imag(String),
    Char(String),
    Str(String),

    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    AddAssign,
    SubAssign,
    MulAssign,
    QuoAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    LAnd,
    LOr,
    Arrow,
    Inc,
    Dec,
    Eql,
    Lss,
    Gtr,
    Assign,
    Not,
    Neq,
    Leq,
    Geq,
    Define,
    Ellipsis,
    Lparen,
    Lbrack,
    Lbrace,
    Comma,
    Period,
    Rparen,
    Rbrack,
    Rbrace,
    Semicolon,
    Colon,
    Question,
    Backslash,

    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,
}

impl Tok {
    /// Whether automatic semicolon insertion applies after this token.
    fn ends_statement(&self) -> bool {
        matches!(
            self,
            Tok::Ident(_)
                | Tok::Int(_)
                | Tok::Float(_)
                | Tok::Imag(_)
                | Tok::Char(_)
                | Tok::Str(_)
                | Tok::Break
                | Tok::Continue
                | Tok::Fallthrough
                | Tok::Return
                | Tok::Inc
                | Tok::Dec
                | Tok::Rparen
                | Tok::Rbrack
                | Tok::Rbrace
        )
    }

    pub fn describe(&self) -> String {
        match self {
            Tok::Eof => "end of file".to_string(),
            Tok::Ident(name) => format!("identifier {name}"),
            Tok::Int(v) | Tok::Float(v) | Tok::Imag(v) | Tok::Char(v) | Tok::Str(v) => {
                format!("literal {v}")
            }
            Tok::Semicolon => "newline or ';'".to_string(),
            other => format!("'{}'", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        use Tok::*;
        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Quo => "/",
            Rem => "%",
            And => "&",
            Or => "|",
            Xor => "^",
            Shl => "<<",
            Shr => ">>",
            AndNot => "&^",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            QuoAssign => "/=",
            RemAssign => "%=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            AndNotAssign => "&^=",
            LAnd => "&&",
            LOr => "||",
            Arrow => "<-",
            Inc => "++",
            Dec => "--",
            Eql => "==",
            Lss => "<",
            Gtr => ">",
            Assign => "=",
            Not => "!",
            Neq => "!=",
            Leq => "<=",
            Geq => ">=",
            Define => ":=",
            Ellipsis => "...",
            Lparen => "(",
            Lbrack => "[",
            Lbrace => "{",
            Comma => ",",
            Period => ".",
            Rparen => ")",
            Rbrack => "]",
            Rbrace => "}",
            Semicolon => ";",
            Colon => ":",
            Question => "?",
            Backslash => "\\",
            Break => "break",
            Case => "case",
            Chan => "chan",
            Const => "const",
            Continue => "continue",
            Default => "default",
            Defer => "defer",
            Else => "else",
            Fallthrough => "fallthrough",
            For => "for",
            Func => "func",
            Go => "go",
            Goto => "goto",
            If => "if",
            Import => "import",
            Interface => "interface",
            Map => "map",
            Package => "package",
            Range => "range",
            Return => "return",
            Select => "select",
            Struct => "struct",
            Switch => "switch",
            Type => "type",
            Var => "var",
            _ => "?",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub tok: Tok,
    pub span: Span,
    /// Comment group ending on the line directly above this token,
    /// with comment markers stripped and lines joined with '\n'.
    pub doc: Option<String>,
}

fn keyword(ident: &str) -> Option<Tok> {
    Some(match ident {
        "break" => Tok::Break,
        "case" => Tok::Case,
        "chan" => Tok::Chan,
        "const" => Tok::Const,
        "continue" => Tok::Continue,
        "default" => Tok::Default,
        "defer" => Tok::Defer,
        "else" => Tok::Else,
        "fallthrough" => Tok::Fallthrough,
        "for" => Tok::For,
        "func" => Tok::Func,
        "go" => Tok::Go,
        "goto" => Tok::Goto,
        "if" => Tok::If,
        "import" => Tok::Import,
        "interface" => Tok::Interface,
        "map" => Tok::Map,
        "package" => Tok::Package,
        "range" => Tok::Range,
        "return" => Tok::Return,
        "select" => Tok::Select,
        "struct" => Tok::Struct,
        "switch" => Tok::Switch,
        "type" => Tok::Type,
        "var" => Tok::Var,
        _ => return None,
    })
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    last_ends_statement: bool,
    pending_semi: Option<Span>,
    // comment group accumulated since the last token, with the line it ends on
    comment: Option<(String, usize)>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            last_ends_statement: false,
            pending_semi: None,
            comment: None,
        }
    }

    pub fn lex_all(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = matches!(tok.tok, Tok::Eof);
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> u8 {
        *self.bytes.get(self.pos).unwrap_or(&0)
    }

    fn peek_at(&self, off: usize) -> u8 {
        *self.bytes.get(self.pos + off).unwrap_or(&0)
    }

    fn bump(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        c
    }

    fn error(&self, msg: impl Into<String>, span: Span) -> ParseError {
        ParseError::invalid_token(self.src.to_string(), span, msg.into())
    }

    /// Skips whitespace and comments, inserting a semicolon at the first
    /// newline after a statement-ending token.
    fn skip_blanks(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' => {
                    self.bump();
                }
                b'\n' => {
                    if self.last_ends_statement {
                        self.last_ends_statement = false;
                        self.pending_semi = Some(Span::new(self.pos, self.pos));
                    }
                    self.bump();
                }
                b'/' if self.peek_at(1) == b'/' => {
                    let start = self.pos;
                    while self.peek() != b'\n' && self.peek() != 0 {
                        self.bump();
                    }
                    self.push_comment(&self.src[start..self.pos].to_string(), self.line);
                }
                b'/' if self.peek_at(1) == b'*' => {
                    let start = self.pos;
                    self.bump();
                    self.bump();
                    let mut crossed_newline = false;
                    loop {
                        match self.peek() {
                            0 => {
                                return Err(self.error(
                                    "unterminated block comment",
                                    Span::new(start, self.pos),
                                ))
                            }
                            b'*' if self.peek_at(1) == b'/' => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            b'\n' => {
                                crossed_newline = true;
                                self.bump();
                            }
                            _ => {
                                self.bump();
                            }
                        }
                    }
                    // A block comment spanning newlines acts as a newline
                    // for semicolon insertion.
                    if crossed_newline && self.last_ends_statement {
                        self.last_ends_statement = false;
                        self.pending_semi = Some(Span::new(start, start));
                    }
                    self.push_comment(&self.src[start..self.pos].to_string(), self.line);
                }
                _ => return Ok(()),
            }
            if self.pending_semi.is_some() {
                return Ok(());
            }
        }
    }

    fn push_comment(&mut self, raw: &str, end_line: usize) {
        let cleaned = clean_comment(raw);
        match &mut self.comment {
            Some((text, line)) if *line + 1 >= end_line => {
                text.push('\n');
                text.push_str(&cleaned);
                *line = end_line;
            }
            _ => self.comment = Some((cleaned, end_line)),
        }
    }

    fn take_doc(&mut self) -> Option<String> {
        match self.comment.take() {
            // Attach only when the group ends on the line directly above.
            Some((text, line)) if line + 1 >= self.line => Some(text),
            _ => None,
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        if let Some(span) = self.pending_semi.take() {
            self.last_ends_statement = false;
            return Ok(Token {
                tok: Tok::Semicolon,
                span,
                doc: None,
            });
        }

        self.skip_blanks()?;
        if let Some(span) = self.pending_semi.take() {
            self.last_ends_statement = false;
            return Ok(Token {
                tok: Tok::Semicolon,
                span,
                doc: None,
            });
        }

        let start = self.pos;
        if self.pos >= self.bytes.len() {
            // EOF terminates the last statement as a newline would.
            if self.last_ends_statement {
                self.last_ends_statement = false;
                return Ok(Token {
                    tok: Tok::Semicolon,
                    span: Span::new(start, start),
                    doc: None,
                });
            }
            return Ok(Token {
                tok: Tok::Eof,
                span: Span::new(start, start),
                doc: None,
            });
        }

        let doc = self.take_doc();
        let c = self.peek();

        let tok = if c.is_ascii_alphabetic() || c == b'_' || c >= 0x80 {
            self.scan_ident()
        } else if c.is_ascii_digit() || (c == b'.' && self.peek_at(1).is_ascii_digit()) {
            self.scan_number()?
        } else {
            self.scan_operator()?
        };

        self.last_ends_statement = tok.ends_statement();
        Ok(Token {
            tok,
            span: Span::new(start, self.pos),
            doc,
        })
    }

    fn scan_ident(&mut self) -> Tok {
        let start = self.pos;
        while {
            let c = self.peek();
            c.is_ascii_alphanumeric() || c == b'_' || c >= 0x80
        } {
            self.bump();
        }
        let text = &self.src[start..self.pos];
        keyword(text).unwrap_or_else(|| Tok::Ident(text.to_string()))
    }

    fn scan_number(&mut self) -> Result<Tok, ParseError> {
        let start = self.pos;
        let mut is_float = false;
        if self.peek() == b'0' && matches!(self.peek_at(1), b'x' | b'X' | b'o' | b'O' | b'b' | b'B')
        {
            self.bump();
            self.bump();
            while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
                self.bump();
            }
        } else {
            while self.peek().is_ascii_digit() || self.peek() == b'_' {
                self.bump();
            }
            if self.peek() == b'.' && !matches!(self.peek_at(1), b'.') {
                is_float = true;
                self.bump();
                while self.peek().is_ascii_digit() || self.peek() == b'_' {
                    self.bump();
                }
            }
            if matches!(self.peek(), b'e' | b'E') {
                is_float = true;
                self.bump();
                if matches!(self.peek(), b'+' | b'-') {
                    self.bump();
                }
                if !self.peek().is_ascii_digit() {
                    return Err(
                        self.error("malformed exponent", Span::new(start, self.pos + 1))
                    );
                }
                while self.peek().is_ascii_digit() {
                    self.bump();
                }
            }
        }
        let text = self.src[start..self.pos].to_string();
        if self.peek() == b'i' {
            self.bump();
            return Ok(Tok::Imag(self.src[start..self.pos].to_string()));
        }
        Ok(if is_float {
            Tok::Float(text)
        } else {
            Tok::Int(text)
        })
    }

    fn scan_string(&mut self, quote: u8) -> Result<Tok, ParseError> {
        let start = self.pos;
        self.bump();
        loop {
            match self.peek() {
                0 | b'\n' if quote != b'`' => {
                    return Err(self.error("unterminated string literal", Span::new(start, self.pos)))
                }
                0 => {
                    return Err(self.error("unterminated raw string literal", Span::new(start, self.pos)))
                }
                b'\\' if quote != b'`' => {
                    self.bump();
                    self.bump();
                }
                c if c == quote => {
                    self.bump();
                    break;
                }
                _ => {
                    self.bump();
                }
            }
        }
        let text = self.src[start..self.pos].to_string();
        Ok(if quote == b'\'' {
            Tok::Char(text)
        } else {
            Tok::Str(text)
        })
    }

    fn scan_operator(&mut self) -> Result<Tok, ParseError> {
        let start = self.pos;
        let c = self.bump();
        macro_rules! assign_or {
            ($assign:expr, $plain:expr) => {
                if self.peek() == b'=' {
                    self.bump();
                    $assign
                } else {
                    $plain
                }
            };
        }
        Ok(match c {
            b'"' | b'`' | b'\'' => {
                self.pos = start;
                return self.scan_string(c);
            }
            b'+' => {
                if self.peek() == b'+' {
                    self.bump();
                    Tok::Inc
                } else {
                    assign_or!(Tok::AddAssign, Tok::Add)
                }
            }
            b'-' => {
                if self.peek() == b'-' {
                    self.bump();
                    Tok::Dec
                } else {
                    assign_or!(Tok::SubAssign, Tok::Sub)
                }
            }
            b'*' => assign_or!(Tok::MulAssign, Tok::Mul),
            b'/' => assign_or!(Tok::QuoAssign, Tok::Quo),
            b'%' => assign_or!(Tok::RemAssign, Tok::Rem),
            b'^' => assign_or!(Tok::XorAssign, Tok::Xor),
            b'&' => match self.peek() {
                b'&' => {
                    self.bump();
                    Tok::LAnd
                }
                b'^' => {
                    self.bump();
                    assign_or!(Tok::AndNotAssign, Tok::AndNot)
                }
                _ => assign_or!(Tok::AndAssign, Tok::And),
            },
            b'|' => {
                if self.peek() == b'|' {
                    self.bump();
                    Tok::LOr
                } else {
                    assign_or!(Tok::OrAssign, Tok::Or)
                }
            }
            b'<' => match self.peek() {
                b'-' => {
                    self.bump();
                    Tok::Arrow
                }
                b'<' => {
                    self.bump();
                    assign_or!(Tok::ShlAssign, Tok::Shl)
                }
                _ => assign_or!(Tok::Leq, Tok::Lss),
            },
            b'>' => match self.peek() {
                b'>' => {
                    self.bump();
                    assign_or!(Tok::ShrAssign, Tok::Shr)
                }
                _ => assign_or!(Tok::Geq, Tok::Gtr),
            },
            b'=' => assign_or!(Tok::Eql, Tok::Assign),
            b'!' => assign_or!(Tok::Neq, Tok::Not),
            b':' => assign_or!(Tok::Define, Tok::Colon),
            b'.' => {
                if self.peek() == b'.' && self.peek_at(1) == b'.' {
                    self.bump();
                    self.bump();
                    Tok::Ellipsis
                } else {
                    Tok::Period
                }
            }
            b'(' => Tok::Lparen,
            b'[' => Tok::Lbrack,
            b'{' => Tok::Lbrace,
            b',' => Tok::Comma,
            b')' => Tok::Rparen,
            b']' => Tok::Rbrack,
            b'}' => Tok::Rbrace,
            b';' => Tok::Semicolon,
            b'?' => Tok::Question,
            b'\\' => Tok::Backslash,
            other => {
                return Err(self.error(
                    format!("unexpected character {:?}", other as char),
                    Span::new(start, self.pos),
                ))
            }
        })
    }
}

fn clean_comment(raw: &str) -> String {
    let s = raw.trim();
    let s = s.strip_prefix("//").unwrap_or(s);
    let s = s
        .strip_prefix("/*")
        .map(|s| s.strip_suffix("*/").unwrap_or(s))
        .unwrap_or(s);
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Tok> {
        Lexer::new(src)
            .lex_all()
            .unwrap()
            .into_iter()
            .map(|t| t.tok)
            .collect()
    }

    #[test]
    fn semicolon_insertion_after_ident() {
        let toks = kinds("a\nb");
        assert_eq!(
            toks,
            vec![
                Tok::Ident("a".into()),
                Tok::Semicolon,
                Tok::Ident("b".into()),
                Tok::Semicolon,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operator() {
        let toks = kinds("a +\nb");
        assert_eq!(
            toks,
            vec![
                Tok::Ident("a".into()),
                Tok::Add,
                Tok::Ident("b".into()),
                Tok::Semicolon,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn optional_and_entangle_tokens() {
        let toks = kinds("?*int \\ err");
        assert_eq!(
            toks,
            vec![
                Tok::Question,
                Tok::Mul,
                Tok::Ident("int".into()),
                Tok::Backslash,
                Tok::Ident("err".into()),
                Tok::Semicolon,
                Tok::Eof
            ]
        );
    }

    #[test]
    fn doc_comment_attaches_to_next_token() {
        let toks = Lexer::new("// For SGo: *File\nvar Stdin *File")
            .lex_all()
            .unwrap();
        assert_eq!(toks[0].tok, Tok::Var);
        assert_eq!(toks[0].doc.as_deref(), Some("For SGo: *File"));
    }

    #[test]
    fn raw_strings_keep_backticks() {
        let toks = kinds("`json:\"a\"`");
        assert!(matches!(&toks[0], Tok::Str(s) if s.starts_with('`')));
    }
}
