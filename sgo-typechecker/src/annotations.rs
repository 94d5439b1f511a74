//! SGo type annotations over imported base-language packages.
//!
//! Three sources refine the default import translation: the built-in
//! catalogue for standard-library entries, `// For SGo:` doc comments on
//! the imported declarations, and side-car annotation files. Where none
//! applies, every pointer, map, interface, channel and function type in
//! an imported declaration is wrapped in an optional.
//!
//! Side-car grammar:
//!
//! ```text
//! List ::= Item*
//! Item ::= Name Def (newline | ';')*
//! Name ::= Ident | '(' '*' Ident ')'
//! Def  ::= Type | '{' List '}'
//! Type ::= any text until newline/';' not beginning with '{'
//! ```

use sgo_parser::{Decl, Expr, Field, File, FuncType, NodeId, OptionalType, Spec};
use std::collections::{HashMap, HashSet};
use std::fmt;

// Parsing of side-car annotation files

#[derive(Debug, Clone, Copy)]
pub struct AnnToken {
    pub lexeme: char,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone)]
pub enum AnnError {
    UnexpectedToken(AnnToken),
    UnexpectedEof,
}

impl fmt::Display for AnnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnError::UnexpectedToken(tk) => write!(
                f,
                "unexpected token at {}:{}: '{}'",
                tk.line, tk.col, tk.lexeme
            ),
            AnnError::UnexpectedEof => write!(f, "unexpected end of file"),
        }
    }
}

/// Character-level tokenizer with one token of lookahead and line/column
/// tracking.
pub struct Tokenizer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
            line: 1,
            col: 1,
        }
    }

    pub fn peek(&mut self) -> Option<AnnToken> {
        let line = self.line;
        let col = self.col;
        self.chars.peek().map(|c| AnnToken {
            lexeme: *c,
            line,
            col,
        })
    }

    pub fn next_token(&mut self) -> Option<AnnToken> {
        let tk = self.peek()?;
        self.chars.next();
        if tk.lexeme == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(tk)
    }

    pub fn skip_white(&mut self) {
        while let Some(tk) = self.peek() {
            if !tk.lexeme.is_whitespace() {
                return;
            }
            self.next_token();
        }
    }

    pub fn skip_white_until_line(&mut self) {
        while let Some(tk) = self.peek() {
            if tk.lexeme == '\n' || !tk.lexeme.is_whitespace() {
                return;
            }
            self.next_token();
        }
    }
}

/// Parses a side-car annotation source into a flat `name → type` map;
/// nested items flatten to dotted keys (`T.Field`, `(*T).Method`).
pub fn parse(src: &str) -> Result<HashMap<String, String>, AnnError> {
    let mut tokenizer = Tokenizer::new(src);
    parse_list(&mut tokenizer)
}

fn parse_list(src: &mut Tokenizer) -> Result<HashMap<String, String>, AnnError> {
    let mut anns = HashMap::new();
    loop {
        src.skip_white();
        let Some(tk) = src.peek() else {
            return Ok(anns);
        };
        if tk.lexeme != '(' && tk.lexeme != '_' && !tk.lexeme.is_alphabetic() {
            return Ok(anns);
        }
        let item = parse_item(src)?;
        anns.extend(item);
    }
}

fn parse_item(src: &mut Tokenizer) -> Result<HashMap<String, String>, AnnError> {
    let name = parse_name(src)?;

    src.skip_white_until_line();
    let def = parse_def(src)?;

    src.skip_white_until_line();
    if let Some(tk) = src.next_token() {
        if tk.lexeme != ';' && tk.lexeme != '\n' {
            return Err(AnnError::UnexpectedToken(tk));
        }
    }

    let mut out = HashMap::new();
    for (sub_item, sub_def) in def {
        let key = if sub_item.is_empty() {
            name.clone()
        } else {
            format!("{name}.{sub_item}")
        };
        out.insert(key, sub_def);
    }
    Ok(out)
}

fn parse_name(src: &mut Tokenizer) -> Result<String, AnnError> {
    let tk = src.peek().ok_or(AnnError::UnexpectedEof)?;
    if tk.lexeme == '(' {
        parse_receiver(src)
    } else if tk.lexeme == '_' || tk.lexeme.is_alphabetic() {
        parse_ident(src)
    } else {
        Err(AnnError::UnexpectedToken(tk))
    }
}

fn parse_receiver(src: &mut Tokenizer) -> Result<String, AnnError> {
    src.next_token(); // '('
    src.skip_white();
    expect('*', src)?;
    src.skip_white();
    let id = parse_ident(src)?;
    src.skip_white();
    expect(')', src)?;
    Ok(format!("(*{id})"))
}

fn parse_ident(src: &mut Tokenizer) -> Result<String, AnnError> {
    let tk = src.next_token().ok_or(AnnError::UnexpectedEof)?;
    let mut id = tk.lexeme.to_string();
    while let Some(tk) = src.peek() {
        if !tk.lexeme.is_alphanumeric() && tk.lexeme != '_' {
            break;
        }
        src.next_token();
        id.push(tk.lexeme);
    }
    Ok(id)
}

fn parse_def(src: &mut Tokenizer) -> Result<HashMap<String, String>, AnnError> {
    let tk = src.peek().ok_or(AnnError::UnexpectedEof)?;
    if tk.lexeme == '{' {
        src.next_token();
        src.skip_white();
        let anns = parse_list(src)?;
        src.skip_white();
        expect('}', src)?;
        Ok(anns)
    } else {
        let typ = parse_type(src)?;
        let mut out = HashMap::new();
        out.insert(String::new(), typ);
        Ok(out)
    }
}

fn parse_type(src: &mut Tokenizer) -> Result<String, AnnError> {
    let tk = src.next_token().ok_or(AnnError::UnexpectedEof)?;
    if tk.lexeme == '{' || tk.lexeme == '\n' || tk.lexeme == ';' {
        return Err(AnnError::UnexpectedToken(tk));
    }
    let mut typ = tk.lexeme.to_string();
    while let Some(tk) = src.peek() {
        if tk.lexeme == '\n' || tk.lexeme == ';' {
            break;
        }
        src.next_token();
        typ.push(tk.lexeme);
    }
    Ok(typ.trim().to_string())
}

fn expect(want: char, src: &mut Tokenizer) -> Result<(), AnnError> {
    let tk = src.next_token().ok_or(AnnError::UnexpectedEof)?;
    if tk.lexeme != want {
        return Err(AnnError::UnexpectedToken(tk));
    }
    Ok(())
}

// Built-in catalogue

/// Annotations for standard-library entries, keyed
/// `package path → declared name → SGo type string`.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    entries: HashMap<String, HashMap<String, String>>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut cat = Catalogue::new();
        cat.insert("os", "Stdin", "*File");
        cat.insert("os", "Stdout", "*File");
        cat.insert("os", "Stderr", "*File");
        cat.insert("os/exec", "Command", "func (name string, arg ...string) *Cmd");
        cat
    }

    pub fn insert(&mut self, path: &str, name: &str, typ: &str) {
        self.entries
            .entry(path.to_string())
            .or_default()
            .insert(name.to_string(), typ.to_string());
    }

    pub fn package(&self, path: &str) -> Option<&HashMap<String, String>> {
        self.entries.get(path)
    }
}

// AST conversion of imported declarations

const CONVERTED_ID_BASE: u32 = 1 << 24;

/// Fresh node ids for expressions spliced in during conversion; kept
/// clear of the parser's id space.
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self {
            next: CONVERTED_ID_BASE,
        }
    }

    fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Annotation sources for one imported package, consulted in priority
/// order: catalogue, doc comment, side-car file.
#[derive(Debug, Default)]
pub struct AnnotationSet {
    pub catalogue: HashMap<String, String>,
    pub sidecar: HashMap<String, String>,
}

impl AnnotationSet {
    fn lookup(&self, key: &str, doc: Option<&str>) -> Option<String> {
        if let Some(t) = self.catalogue.get(key) {
            return Some(t.clone());
        }
        if let Some(doc) = doc {
            if let Some(t) = doc_annotation(doc) {
                return Some(t);
            }
        }
        self.sidecar.get(key).cloned()
    }
}

/// Extracts the type string from a `For SGo:` doc comment, if present.
pub fn doc_annotation(doc: &str) -> Option<String> {
    for line in doc.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("For SGo:") {
            return Some(rest.trim().to_string());
        }
    }
    None
}

pub struct Converter<'a> {
    anns: &'a AnnotationSet,
    /// Identifier nodes of the raw file which name an interface type.
    iface_idents: &'a HashSet<NodeId>,
    ids: IdGen,
    pub errors: Vec<String>,
}

/// Transforms an imported base-language file: applies annotations and
/// wraps the remaining optionable positions in `?`. The result must be
/// re-checked.
pub fn convert_file(
    file: &mut File,
    anns: &AnnotationSet,
    iface_idents: &HashSet<NodeId>,
) -> Vec<String> {
    let mut conv = Converter {
        anns,
        iface_idents,
        ids: IdGen::new(),
        errors: Vec::new(),
    };
    for decl in &mut file.decls {
        conv.convert_decl(decl);
    }
    conv.errors
}

impl<'a> Converter<'a> {
    fn convert_decl(&mut self, decl: &mut Decl) {
        match decl {
            Decl::Gen(gen) => {
                let decl_doc = gen.doc.clone();
                for spec in &mut gen.specs {
                    match spec {
                        Spec::Value(spec) => {
                            let key = spec.names.first().map(|n| n.name.clone());
                            let doc = spec.doc.clone().or_else(|| decl_doc.clone());
                            if let Some(typ) = &mut spec.typ {
                                self.convert_position(typ, key.as_deref(), doc.as_deref(), true);
                            }
                        }
                        Spec::Type(spec) => {
                            let key = spec.name.name.clone();
                            let doc = spec.doc.clone().or_else(|| decl_doc.clone());
                            // The declared type itself is not wrapped;
                            // uses of the name are.
                            self.convert_position(
                                &mut spec.typ,
                                Some(&key),
                                doc.as_deref(),
                                false,
                            );
                        }
                        Spec::Import(_) => {}
                    }
                }
            }
            Decl::Func(func) => {
                let key = func_key(func);
                let doc = func.doc.clone();
                if let Some(replacement) =
                    self.annotation_type(Some(&key), doc.as_deref())
                {
                    // only a function type may replace a function's type
                    if let Expr::FuncType(ft) = replacement {
                        func.typ = ft;
                        return;
                    }
                }
                self.convert_func_type(&mut func.typ);
            }
            Decl::Bad(_) => {}
        }
    }

    /// Applies the annotation for `key`/`doc` if one parses, or rewrites
    /// the position by the default rules. `wrap` marks positions where an
    /// optionable type is wrapped (declaration and field types, not the
    /// body of a type definition).
    fn convert_position(
        &mut self,
        e: &mut Expr,
        key: Option<&str>,
        doc: Option<&str>,
        wrap: bool,
    ) {
        if let Some(replacement) = self.annotation_type(key, doc) {
            *e = replacement;
            return;
        }
        self.convert_type(e, key, wrap);
    }

    fn annotation_type(&mut self, key: Option<&str>, doc: Option<&str>) -> Option<Expr> {
        let typ_str = self.anns.lookup(key?, doc)?;
        match sgo_parser::parse_expr(&typ_str) {
            Ok(mut parsed) => {
                self.renumber(&mut parsed);
                Some(parsed)
            }
            Err(err) => {
                self.errors.push(format!("{typ_str}: {err}"));
                None
            }
        }
    }

    fn convert_type(&mut self, e: &mut Expr, key: Option<&str>, wrap: bool) {
        match e {
            Expr::Star(star) => {
                self.convert_type(&mut star.x, key, false);
                if wrap {
                    self.wrap_optional(e);
                }
            }
            Expr::Ident(ident) => {
                if wrap && self.iface_idents.contains(&ident.id) {
                    self.wrap_optional(e);
                }
            }
            Expr::Selector(_) => {
                // Imported qualified names: interface detection is only
                // done for identifiers of the package being converted.
            }
            Expr::FuncType(ft) => {
                self.convert_func_type(ft);
                if wrap {
                    self.wrap_optional(e);
                }
            }
            Expr::MapType(m) => {
                self.convert_type(&mut m.key, key, false);
                self.convert_type(&mut m.value, key, false);
                if wrap {
                    self.wrap_optional(e);
                }
            }
            Expr::ChanType(c) => {
                self.convert_type(&mut c.value, key, false);
                if wrap {
                    self.wrap_optional(e);
                }
            }
            Expr::ArrayType(arr) => {
                self.convert_type(&mut arr.elt, key, false);
            }
            Expr::StructType(st) => {
                let fields = &mut st.fields.list;
                for field in fields {
                    self.convert_field(field, key);
                }
            }
            Expr::InterfaceType(it) => {
                for field in &mut it.methods.list {
                    let method_key = field
                        .names
                        .first()
                        .map(|n| n.name.clone())
                        .or_else(|| interface_embedded_name(&field.typ));
                    let nested = key
                        .map(|k| format!("{k}.{}", method_key.clone().unwrap_or_default()));
                    let doc = field.doc.clone();
                    if let Some(replacement) =
                        self.annotation_type(nested.as_deref(), doc.as_deref())
                    {
                        field.typ = replacement;
                        continue;
                    }
                    if let Expr::FuncType(ft) = &mut field.typ {
                        self.convert_func_type(ft);
                    }
                }
                if wrap {
                    self.wrap_optional(e);
                }
            }
            Expr::Paren(p) => self.convert_type(&mut p.x, key, wrap),
            Expr::Ellipsis(el) => {
                if let Some(elt) = &mut el.elt {
                    self.convert_type(elt, key, true);
                }
            }
            _ => {}
        }
    }

    fn convert_field(&mut self, field: &mut Field, parent_key: Option<&str>) {
        let nested = match (parent_key, field.names.first()) {
            (Some(k), Some(name)) => Some(format!("{k}.{}", name.name)),
            _ => None,
        };
        let doc = field.doc.clone();
        if let Some(replacement) = self.annotation_type(nested.as_deref(), doc.as_deref()) {
            field.typ = replacement;
            return;
        }
        self.convert_type(&mut field.typ, parent_key, true);
    }

    fn convert_func_type(&mut self, ft: &mut FuncType) {
        for field in &mut ft.params.list {
            self.convert_field(field, None);
        }
        if let Some(results) = &mut ft.results {
            for field in &mut results.list {
                self.convert_field(field, None);
            }
            if let Some(tail) = &mut results.entangled {
                self.convert_field(tail, None);
            }
        }
    }

    fn wrap_optional(&mut self, e: &mut Expr) {
        let span = e.span();
        let inner = std::mem::replace(
            e,
            Expr::Bad(sgo_parser::BadExpr {
                id: NodeId(0),
                span,
            }),
        );
        *e = Expr::OptionalType(OptionalType {
            id: self.ids.fresh(),
            elt: Box::new(inner),
            span,
        });
    }

    /// Re-ids every node of an annotation-parsed expression so it cannot
    /// collide with the file's node ids.
    fn renumber(&mut self, e: &mut Expr) {
        match e {
            Expr::Bad(x) => x.id = self.ids.fresh(),
            Expr::Ident(x) => x.id = self.ids.fresh(),
            Expr::BasicLit(x) => x.id = self.ids.fresh(),
            Expr::CompositeLit(x) => {
                x.id = self.ids.fresh();
                if let Some(t) = &mut x.typ {
                    self.renumber(t);
                }
                for elt in &mut x.elts {
                    self.renumber(elt);
                }
            }
            Expr::FuncLit(x) => {
                x.id = self.ids.fresh();
                self.renumber_func_type(&mut x.typ);
            }
            Expr::Paren(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.x);
            }
            Expr::Selector(x) => {
                x.id = self.ids.fresh();
                x.sel.id = self.ids.fresh();
                self.renumber(&mut x.x);
            }
            Expr::Index(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.x);
                self.renumber(&mut x.index);
            }
            Expr::Slice(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.x);
                for part in [&mut x.low, &mut x.high, &mut x.max].into_iter().flatten() {
                    self.renumber(part);
                }
            }
            Expr::TypeAssert(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.x);
                if let Some(t) = &mut x.typ {
                    self.renumber(t);
                }
            }
            Expr::Call(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.fun);
                for arg in &mut x.args {
                    self.renumber(arg);
                }
            }
            Expr::Star(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.x);
            }
            Expr::Unary(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.x);
            }
            Expr::Binary(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.x);
                self.renumber(&mut x.y);
            }
            Expr::KeyValue(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.key);
                self.renumber(&mut x.value);
            }
            Expr::Ellipsis(x) => {
                x.id = self.ids.fresh();
                if let Some(elt) = &mut x.elt {
                    self.renumber(elt);
                }
            }
            Expr::ArrayType(x) => {
                x.id = self.ids.fresh();
                if let Some(len) = &mut x.len {
                    self.renumber(len);
                }
                self.renumber(&mut x.elt);
            }
            Expr::StructType(x) => {
                x.id = self.ids.fresh();
                for field in &mut x.fields.list {
                    self.renumber_field(field);
                }
            }
            Expr::FuncType(x) => self.renumber_func_type(x),
            Expr::InterfaceType(x) => {
                x.id = self.ids.fresh();
                for field in &mut x.methods.list {
                    self.renumber_field(field);
                }
            }
            Expr::MapType(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.key);
                self.renumber(&mut x.value);
            }
            Expr::ChanType(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.value);
            }
            Expr::OptionalType(x) => {
                x.id = self.ids.fresh();
                self.renumber(&mut x.elt);
            }
        }
    }

    fn renumber_func_type(&mut self, ft: &mut FuncType) {
        ft.id = self.ids.fresh();
        for field in &mut ft.params.list {
            self.renumber_field(field);
        }
        if let Some(results) = &mut ft.results {
            for field in &mut results.list {
                self.renumber_field(field);
            }
            if let Some(tail) = &mut results.entangled {
                self.renumber_field(tail);
            }
        }
    }

    fn renumber_field(&mut self, field: &mut Field) {
        field.id = self.ids.fresh();
        for name in &mut field.names {
            name.id = self.ids.fresh();
        }
        self.renumber(&mut field.typ);
        if let Some(tag) = &mut field.tag {
            tag.id = self.ids.fresh();
        }
    }

}

fn func_key(func: &sgo_parser::FuncDecl) -> String {
    if let Some(recv) = &func.recv {
        if let Some(field) = recv.list.first() {
            match field.typ.unparen() {
                Expr::Star(star) => {
                    if let Expr::Ident(id) = star.x.unparen() {
                        return format!("(*{}).{}", id.name, func.name.name);
                    }
                }
                Expr::Ident(id) => {
                    return format!("{}.{}", id.name, func.name.name);
                }
                _ => {}
            }
        }
    }
    func.name.name.clone()
}

fn interface_embedded_name(typ: &Expr) -> Option<String> {
    match typ.unparen() {
        Expr::Ident(id) => Some(id.name.clone()),
        Expr::Star(star) => interface_embedded_name(&star.x),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_items() {
        let anns = parse("Stdin *File\nStdout *File\n").unwrap();
        assert_eq!(anns.get("Stdin").map(String::as_str), Some("*File"));
        assert_eq!(anns.get("Stdout").map(String::as_str), Some("*File"));
    }

    #[test]
    fn parses_nested_items() {
        let anns = parse("File {\n\tName func() string\n\tFd uintptr\n}\n").unwrap();
        assert_eq!(
            anns.get("File.Name").map(String::as_str),
            Some("func() string")
        );
        assert_eq!(anns.get("File.Fd").map(String::as_str), Some("uintptr"));
    }

    #[test]
    fn parses_receiver_names() {
        let anns = parse("(*File) {\n\tClose func() ?error\n}\n").unwrap();
        assert_eq!(
            anns.get("(*File).Close").map(String::as_str),
            Some("func() ?error")
        );
    }

    #[test]
    fn semicolons_separate_items() {
        let anns = parse("A *T; B *U\n").unwrap();
        assert_eq!(anns.get("A").map(String::as_str), Some("*T"));
        assert_eq!(anns.get("B").map(String::as_str), Some("*U"));
    }

    #[test]
    fn rejects_type_starting_with_semicolon() {
        assert!(parse("A ;rest\n").is_err());
    }

    #[test]
    fn doc_annotation_extraction() {
        assert_eq!(
            doc_annotation("For SGo: *File").as_deref(),
            Some("*File")
        );
        assert_eq!(
            doc_annotation("A file.\nFor SGo: ?*File").as_deref(),
            Some("?*File")
        );
        assert_eq!(doc_annotation("no annotation here"), None);
    }
}
