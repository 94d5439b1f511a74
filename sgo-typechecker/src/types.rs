//! The SGo type universe.
//!
//! Types are arena-allocated; `TypeId` is a stable index into the arena.
//! `Named` types are built in two phases (handle first, underlying patched
//! once its shape is known) so recursive type graphs need no graph-wide
//! mutation. `Optional` is the one constructor the base language does not
//! have.

use crate::objects::{ObjId, Objects};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Invalid,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,

    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn is_untyped(self) -> bool {
        use BasicKind::*;
        matches!(
            self,
            UntypedBool | UntypedInt | UntypedRune | UntypedFloat | UntypedComplex
                | UntypedString | UntypedNil
        )
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    pub fn is_integer(self) -> bool {
        use BasicKind::*;
        matches!(
            self,
            Int | Int8 | Int16 | Int32 | Int64 | Uint | Uint8 | Uint16 | Uint32 | Uint64
                | Uintptr | UntypedInt | UntypedRune
        )
    }

    pub fn is_unsigned(self) -> bool {
        use BasicKind::*;
        matches!(self, Uint | Uint8 | Uint16 | Uint32 | Uint64 | Uintptr)
    }

    pub fn is_float(self) -> bool {
        use BasicKind::*;
        matches!(self, Float32 | Float64 | UntypedFloat)
    }

    pub fn is_complex(self) -> bool {
        use BasicKind::*;
        matches!(self, Complex64 | Complex128 | UntypedComplex)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_ordered(self) -> bool {
        self.is_integer() || self.is_float() || self.is_string()
    }

    pub fn name(self) -> &'static str {
        use BasicKind::*;
        match self {
            Invalid => "invalid type",
            Bool => "bool",
            Int => "int",
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            Uint => "uint",
            Uint8 => "uint8",
            Uint16 => "uint16",
            Uint32 => "uint32",
            Uint64 => "uint64",
            Uintptr => "uintptr",
            Float32 => "float32",
            Float64 => "float64",
            Complex64 => "complex64",
            Complex128 => "complex128",
            String => "string",
            UnsafePointer => "unsafe.Pointer",
            UntypedBool => "untyped bool",
            UntypedInt => "untyped int",
            UntypedRune => "untyped rune",
            UntypedFloat => "untyped float",
            UntypedComplex => "untyped complex",
            UntypedString => "untyped string",
            UntypedNil => "untyped nil",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    SendRecv,
    Send,
    Recv,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub var: ObjId,
    pub tag: Option<String>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Invalid,
    Basic(BasicKind),
    Pointer {
        elem: TypeId,
    },
    Slice {
        elem: TypeId,
    },
    Array {
        elem: TypeId,
        len: u64,
    },
    Map {
        key: TypeId,
        elem: TypeId,
    },
    Chan {
        dir: ChanDir,
        elem: TypeId,
    },
    Struct {
        fields: Vec<StructField>,
    },
    Interface {
        methods: Vec<ObjId>,
        embeddeds: Vec<TypeId>,
        all_methods: Vec<ObjId>,
        complete: bool,
    },
    Signature {
        recv: Option<ObjId>,
        recv_optional: bool,
        params: Vec<ObjId>,
        results: Vec<ObjId>,
        result_entangled: Option<ObjId>,
        variadic: bool,
    },
    /// Multi-value shape of a call expression; `entangled` mirrors the
    /// signature's entangled tail.
    Tuple {
        vars: Vec<ObjId>,
        entangled: Option<ObjId>,
    },
    Named {
        obj: ObjId,
        underlying: TypeId,
        methods: Vec<ObjId>,
    },
    Optional {
        elem: TypeId,
    },
}

#[derive(Debug, Default)]
pub struct TypeArena {
    kinds: Vec<TypeKind>,
}

impl TypeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.0 as usize]
    }

    pub fn kind_mut(&mut self, id: TypeId) -> &mut TypeKind {
        &mut self.kinds[id.0 as usize]
    }

    /// Patches a `Named` handle with its underlying type. Second phase of
    /// named-type construction.
    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        match self.kind_mut(named) {
            TypeKind::Named { underlying: u, .. } => *u = underlying,
            _ => unreachable!("set_underlying on non-named type"),
        }
    }

    pub fn add_method(&mut self, named: TypeId, method: ObjId) {
        match self.kind_mut(named) {
            TypeKind::Named { methods, .. } => methods.push(method),
            _ => unreachable!("add_method on non-named type"),
        }
    }

    /// Follows `Named` indirections down to a structural type.
    pub fn underlying(&self, mut id: TypeId) -> TypeId {
        let mut hops = 0;
        while let TypeKind::Named { underlying, .. } = self.kind(id) {
            if *underlying == id || hops > 64 {
                break;
            }
            id = *underlying;
            hops += 1;
        }
        id
    }

    pub fn basic_kind(&self, id: TypeId) -> Option<BasicKind> {
        match self.kind(self.underlying(id)) {
            TypeKind::Basic(k) => Some(*k),
            _ => None,
        }
    }

    pub fn is_invalid(&self, id: TypeId) -> bool {
        matches!(
            self.kind(id),
            TypeKind::Invalid | TypeKind::Basic(BasicKind::Invalid)
        )
    }

    pub fn is_untyped(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Basic(k) if k.is_untyped())
    }

    pub fn is_untyped_nil(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Basic(BasicKind::UntypedNil))
    }

    pub fn is_boolean(&self, id: TypeId) -> bool {
        self.basic_kind(id).map(|k| k.is_boolean()).unwrap_or(false)
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.kind(self.underlying(id)), TypeKind::Interface { .. })
    }

    pub fn is_optional(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Optional { .. })
            || matches!(self.kind(self.underlying(id)), TypeKind::Optional { .. })
    }

    /// Whether a type is of an optionable kind: one the base language
    /// admits `nil` for. Only these may be wrapped in `?`.
    pub fn is_optionable(&self, id: TypeId) -> bool {
        matches!(
            self.kind(self.underlying(id)),
            TypeKind::Pointer { .. }
                | TypeKind::Map { .. }
                | TypeKind::Interface { .. }
                | TypeKind::Chan { .. }
                | TypeKind::Signature { .. }
        )
    }

    /// Unwraps one level of `Optional`, reporting whether it was present.
    pub fn deopt(&self, id: TypeId) -> (TypeId, bool) {
        match self.kind(id) {
            TypeKind::Optional { elem } => (*elem, true),
            _ => match self.kind(self.underlying(id)) {
                TypeKind::Optional { elem } => (*elem, true),
                _ => (id, false),
            },
        }
    }

    /// Dereferences one level of pointer, reporting whether it was present.
    pub fn deref(&self, id: TypeId) -> (TypeId, bool) {
        match self.kind(id) {
            TypeKind::Pointer { elem } => (*elem, true),
            _ => (id, false),
        }
    }
}

/// Type identity. Named types are nominal (one arena node per type name);
/// structural types compare componentwise.
pub fn identical(arena: &TypeArena, objs: &Objects, a: TypeId, b: TypeId) -> bool {
    if a == b {
        return true;
    }
    match (arena.kind(a), arena.kind(b)) {
        (TypeKind::Basic(x), TypeKind::Basic(y)) => x == y,
        (TypeKind::Pointer { elem: x }, TypeKind::Pointer { elem: y })
        | (TypeKind::Slice { elem: x }, TypeKind::Slice { elem: y })
        | (TypeKind::Optional { elem: x }, TypeKind::Optional { elem: y }) => {
            identical(arena, objs, *x, *y)
        }
        (
            TypeKind::Array { elem: x, len: lx },
            TypeKind::Array { elem: y, len: ly },
        ) => lx == ly && identical(arena, objs, *x, *y),
        (
            TypeKind::Map { key: kx, elem: x },
            TypeKind::Map { key: ky, elem: y },
        ) => identical(arena, objs, *kx, *ky) && identical(arena, objs, *x, *y),
        (
            TypeKind::Chan { dir: dx, elem: x },
            TypeKind::Chan { dir: dy, elem: y },
        ) => dx == dy && identical(arena, objs, *x, *y),
        (TypeKind::Struct { fields: fx }, TypeKind::Struct { fields: fy }) => {
            fx.len() == fy.len()
                && fx.iter().zip(fy).all(|(a, b)| {
                    let (va, vb) = (objs.get(a.var), objs.get(b.var));
                    va.name == vb.name
                        && a.tag == b.tag
                        && identical(arena, objs, va.typ, vb.typ)
                })
        }
        (
            TypeKind::Signature {
                params: px,
                results: rx,
                result_entangled: ex,
                variadic: vx,
                ..
            },
            TypeKind::Signature {
                params: py,
                results: ry,
                result_entangled: ey,
                variadic: vy,
                ..
            },
        ) => {
            vx == vy
                && same_var_types(arena, objs, px, py)
                && same_var_types(arena, objs, rx, ry)
                && match (ex, ey) {
                    (None, None) => true,
                    (Some(a), Some(b)) => {
                        identical(arena, objs, objs.get(*a).typ, objs.get(*b).typ)
                    }
                    _ => false,
                }
        }
        (
            TypeKind::Interface { all_methods: mx, .. },
            TypeKind::Interface { all_methods: my, .. },
        ) => {
            mx.len() == my.len()
                && mx.iter().all(|m| {
                    let ma = objs.get(*m);
                    my.iter().any(|n| {
                        let mb = objs.get(*n);
                        ma.name == mb.name && identical(arena, objs, ma.typ, mb.typ)
                    })
                })
        }
        // Named identity is per-object; `a == b` above covered it.
        _ => false,
    }
}

fn same_var_types(arena: &TypeArena, objs: &Objects, a: &[ObjId], b: &[ObjId]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| identical(arena, objs, objs.get(*x).typ, objs.get(*y).typ))
}

/// Renders a type for diagnostics.
pub fn type_string(arena: &TypeArena, objs: &Objects, id: TypeId) -> String {
    match arena.kind(id) {
        TypeKind::Invalid => "invalid type".to_string(),
        TypeKind::Basic(k) => k.name().to_string(),
        TypeKind::Pointer { elem } => format!("*{}", type_string(arena, objs, *elem)),
        TypeKind::Slice { elem } => format!("[]{}", type_string(arena, objs, *elem)),
        TypeKind::Array { elem, len } => {
            format!("[{}]{}", len, type_string(arena, objs, *elem))
        }
        TypeKind::Map { key, elem } => format!(
            "map[{}]{}",
            type_string(arena, objs, *key),
            type_string(arena, objs, *elem)
        ),
        TypeKind::Chan { dir, elem } => match dir {
            ChanDir::SendRecv => format!("chan {}", type_string(arena, objs, *elem)),
            ChanDir::Send => format!("chan<- {}", type_string(arena, objs, *elem)),
            ChanDir::Recv => format!("<-chan {}", type_string(arena, objs, *elem)),
        },
        TypeKind::Struct { fields } => {
            let mut s = String::from("struct{");
            for (i, f) in fields.iter().enumerate() {
                if i > 0 {
                    s.push_str("; ");
                }
                let v = objs.get(f.var);
                if !v.name.is_empty() {
                    s.push_str(&v.name);
                    s.push(' ');
                }
                s.push_str(&type_string(arena, objs, v.typ));
            }
            s.push('}');
            s
        }
        TypeKind::Interface { all_methods, .. } => {
            if all_methods.is_empty() {
                "interface{}".to_string()
            } else {
                let mut s = String::from("interface{");
                for (i, m) in all_methods.iter().enumerate() {
                    if i > 0 {
                        s.push_str("; ");
                    }
                    s.push_str(&objs.get(*m).name);
                }
                s.push('}');
                s
            }
        }
        TypeKind::Signature {
            params,
            results,
            result_entangled,
            variadic,
            ..
        } => {
            let mut s = String::from("func(");
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                if *variadic && i == params.len() - 1 {
                    s.push_str("...");
                }
                s.push_str(&type_string(arena, objs, objs.get(*p).typ));
            }
            s.push(')');
            if !results.is_empty() || result_entangled.is_some() {
                s.push_str(" (");
                for (i, r) in results.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    s.push_str(&type_string(arena, objs, objs.get(*r).typ));
                }
                if let Some(e) = result_entangled {
                    s.push_str(" \\ ");
                    s.push_str(&type_string(arena, objs, objs.get(*e).typ));
                }
                s.push(')');
            }
            s
        }
        TypeKind::Tuple { vars, entangled } => {
            let mut s = String::from("(");
            for (i, v) in vars.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                s.push_str(&type_string(arena, objs, objs.get(*v).typ));
            }
            if let Some(e) = entangled {
                s.push_str(" \\ ");
                s.push_str(&type_string(arena, objs, objs.get(*e).typ));
            }
            s.push(')');
            s
        }
        TypeKind::Named { obj, .. } => objs.get(*obj).name.clone(),
        TypeKind::Optional { elem } => format!("?{}", type_string(arena, objs, *elem)),
    }
}
