//! Objects and scopes.
//!
//! Objects (variables, constants, type names, functions, package names,
//! builtins) are arena-allocated; scopes form a tree with parent lookup
//! and per-object scope-start positions so a short variable declaration's
//! names are visible only after the declaration.

use crate::constants::Value;
use crate::types::TypeId;
use std::collections::HashMap;

pub const NO_POS: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PkgId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Append,
    Cap,
    Close,
    Copy,
    Delete,
    Len,
    Make,
    New,
    Panic,
    Print,
    Println,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        use Builtin::*;
        match self {
            Append => "append",
            Cap => "cap",
            Close => "close",
            Copy => "copy",
            Delete => "delete",
            Len => "len",
            Make => "make",
            New => "new",
            Panic => "panic",
            Print => "print",
            Println => "println",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ObjKind {
    Var {
        is_field: bool,
        anonymous: bool,
        is_param: bool,
        is_result: bool,
    },
    Const {
        val: Option<Value>,
    },
    TypeName,
    Func,
    PkgName {
        pkg: PkgId,
    },
    Builtin(Builtin),
    Nil,
}

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub kind: ObjKind,
    pub typ: TypeId,
    /// Declaration position (byte offset), `NO_POS` for predeclared objects.
    pub pos: usize,
    /// Position from which the object is in scope.
    pub scope_pos: usize,
    pub pkg: Option<PkgId>,
}

impl Object {
    pub fn is_var(&self) -> bool {
        matches!(self.kind, ObjKind::Var { .. })
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, ObjKind::Var { is_field: true, .. })
    }

    pub fn const_val(&self) -> Option<&Value> {
        match &self.kind {
            ObjKind::Const { val } => val.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Objects {
    list: Vec<Object>,
}

impl Objects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, obj: Object) -> ObjId {
        let id = ObjId(self.list.len() as u32);
        self.list.push(obj);
        id
    }

    pub fn get(&self, id: ObjId) -> &Object {
        &self.list[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ObjId) -> &mut Object {
        &mut self.list[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn new_var(&mut self, name: &str, typ: TypeId, pos: usize, pkg: Option<PkgId>) -> ObjId {
        self.alloc(Object {
            name: name.to_string(),
            kind: ObjKind::Var {
                is_field: false,
                anonymous: false,
                is_param: false,
                is_result: false,
            },
            typ,
            pos,
            scope_pos: pos,
            pkg,
        })
    }

    pub fn new_param(&mut self, name: &str, typ: TypeId, pos: usize, pkg: Option<PkgId>) -> ObjId {
        self.alloc(Object {
            name: name.to_string(),
            kind: ObjKind::Var {
                is_field: false,
                anonymous: false,
                is_param: true,
                is_result: false,
            },
            typ,
            pos,
            scope_pos: pos,
            pkg,
        })
    }

    pub fn new_field(
        &mut self,
        name: &str,
        typ: TypeId,
        anonymous: bool,
        pos: usize,
        pkg: Option<PkgId>,
    ) -> ObjId {
        self.alloc(Object {
            name: name.to_string(),
            kind: ObjKind::Var {
                is_field: true,
                anonymous,
                is_param: false,
                is_result: false,
            },
            typ,
            pos,
            scope_pos: pos,
            pkg,
        })
    }

    pub fn new_func(&mut self, name: &str, typ: TypeId, pos: usize, pkg: Option<PkgId>) -> ObjId {
        self.alloc(Object {
            name: name.to_string(),
            kind: ObjKind::Func,
            typ,
            pos,
            scope_pos: pos,
            pkg,
        })
    }

    pub fn same_id(&self, a: ObjId, pkg: Option<PkgId>, name: &str) -> bool {
        let obj = self.get(a);
        if obj.name != name {
            return false;
        }
        // Exported names match across packages; unexported names only
        // within the declaring package.
        if obj
            .name
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
        {
            return true;
        }
        obj.pkg == pkg
    }
}

#[derive(Debug, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    elems: HashMap<String, ObjId>,
}

#[derive(Debug, Default)]
pub struct Scopes {
    list: Vec<ScopeData>,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.list.len() as u32);
        self.list.push(ScopeData {
            parent,
            elems: HashMap::new(),
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.list[scope.0 as usize].parent
    }

    /// Inserts `obj` under `name`; returns the previous object if the name
    /// was already declared in this scope.
    pub fn insert(&mut self, scope: ScopeId, name: &str, obj: ObjId) -> Option<ObjId> {
        let elems = &mut self.list[scope.0 as usize].elems;
        if let Some(existing) = elems.get(name) {
            return Some(*existing);
        }
        elems.insert(name.to_string(), obj);
        None
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<ObjId> {
        self.list[scope.0 as usize].elems.get(name).copied()
    }

    /// Looks `name` up through the scope chain. `pos` filters out objects
    /// whose scope starts later (declaration order within a block);
    /// `NO_POS` disables the filter.
    pub fn lookup_parent(
        &self,
        objs: &Objects,
        mut scope: ScopeId,
        name: &str,
        pos: usize,
    ) -> Option<(ScopeId, ObjId)> {
        loop {
            if let Some(obj) = self.lookup(scope, name) {
                let scope_pos = objs.get(obj).scope_pos;
                if pos == NO_POS || scope_pos == NO_POS || scope_pos <= pos {
                    return Some((scope, obj));
                }
            }
            scope = self.parent(scope)?;
        }
    }

    pub fn names(&self, scope: ScopeId) -> Vec<String> {
        let mut names: Vec<String> = self.list[scope.0 as usize].elems.keys().cloned().collect();
        names.sort();
        names
    }
}

#[derive(Debug)]
pub struct PkgData {
    pub path: String,
    pub name: String,
    pub scope: ScopeId,
}

#[derive(Debug, Default)]
pub struct Packages {
    list: Vec<PkgData>,
}

impl Packages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, data: PkgData) -> PkgId {
        let id = PkgId(self.list.len() as u32);
        self.list.push(data);
        id
    }

    pub fn get(&self, id: PkgId) -> &PkgData {
        &self.list[id.0 as usize]
    }
}
