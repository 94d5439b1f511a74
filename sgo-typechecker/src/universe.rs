//! The predeclared universe.
//!
//! Built once per checker into its own arenas and injected; nothing is
//! process-global, which keeps `check` re-entrant across translation
//! units.

use crate::constants::Value;
use crate::objects::{Builtin, ObjId, ObjKind, Object, Objects, ScopeId, Scopes, NO_POS};
use crate::types::{BasicKind, TypeArena, TypeId, TypeKind};

#[derive(Debug)]
pub struct Universe {
    pub scope: ScopeId,

    pub invalid: TypeId,
    pub bool_: TypeId,
    pub int_: TypeId,
    pub int8_: TypeId,
    pub int16_: TypeId,
    pub int32_: TypeId,
    pub int64_: TypeId,
    pub uint_: TypeId,
    pub uint8_: TypeId,
    pub uint16_: TypeId,
    pub uint32_: TypeId,
    pub uint64_: TypeId,
    pub uintptr_: TypeId,
    pub float32_: TypeId,
    pub float64_: TypeId,
    pub complex64_: TypeId,
    pub complex128_: TypeId,
    pub string_: TypeId,

    pub untyped_bool: TypeId,
    pub untyped_int: TypeId,
    pub untyped_rune: TypeId,
    pub untyped_float: TypeId,
    pub untyped_complex: TypeId,
    pub untyped_string: TypeId,
    pub untyped_nil: TypeId,

    /// The predeclared `error` interface type (a `Named`).
    pub error_: TypeId,
    pub nil_obj: ObjId,
}

impl Universe {
    pub fn new(arena: &mut TypeArena, objs: &mut Objects, scopes: &mut Scopes) -> Universe {
        let scope = scopes.new_scope(None);

        let invalid = arena.alloc(TypeKind::Basic(BasicKind::Invalid));

        let mut basic = |arena: &mut TypeArena,
                         objs: &mut Objects,
                         scopes: &mut Scopes,
                         kind: BasicKind,
                         name: &str| {
            let typ = arena.alloc(TypeKind::Basic(kind));
            let obj = objs.alloc(Object {
                name: name.to_string(),
                kind: ObjKind::TypeName,
                typ,
                pos: NO_POS,
                scope_pos: NO_POS,
                pkg: None,
            });
            scopes.insert(scope, name, obj);
            typ
        };

        let bool_ = basic(arena, objs, scopes, BasicKind::Bool, "bool");
        let int_ = basic(arena, objs, scopes, BasicKind::Int, "int");
        let int8_ = basic(arena, objs, scopes, BasicKind::Int8, "int8");
        let int16_ = basic(arena, objs, scopes, BasicKind::Int16, "int16");
        let int32_ = basic(arena, objs, scopes, BasicKind::Int32, "int32");
        let int64_ = basic(arena, objs, scopes, BasicKind::Int64, "int64");
        let uint_ = basic(arena, objs, scopes, BasicKind::Uint, "uint");
        let uint8_ = basic(arena, objs, scopes, BasicKind::Uint8, "uint8");
        let uint16_ = basic(arena, objs, scopes, BasicKind::Uint16, "uint16");
        let uint32_ = basic(arena, objs, scopes, BasicKind::Uint32, "uint32");
        let uint64_ = basic(arena, objs, scopes, BasicKind::Uint64, "uint64");
        let uintptr_ = basic(arena, objs, scopes, BasicKind::Uintptr, "uintptr");
        let float32_ = basic(arena, objs, scopes, BasicKind::Float32, "float32");
        let float64_ = basic(arena, objs, scopes, BasicKind::Float64, "float64");
        let complex64_ = basic(arena, objs, scopes, BasicKind::Complex64, "complex64");
        let complex128_ = basic(arena, objs, scopes, BasicKind::Complex128, "complex128");
        let string_ = basic(arena, objs, scopes, BasicKind::String, "string");

        // byte and rune alias the fixed-width kinds
        let byte_obj = objs.alloc(Object {
            name: "byte".to_string(),
            kind: ObjKind::TypeName,
            typ: uint8_,
            pos: NO_POS,
            scope_pos: NO_POS,
            pkg: None,
        });
        scopes.insert(scope, "byte", byte_obj);
        let rune_obj = objs.alloc(Object {
            name: "rune".to_string(),
            kind: ObjKind::TypeName,
            typ: int32_,
            pos: NO_POS,
            scope_pos: NO_POS,
            pkg: None,
        });
        scopes.insert(scope, "rune", rune_obj);

        let untyped_bool = arena.alloc(TypeKind::Basic(BasicKind::UntypedBool));
        let untyped_int = arena.alloc(TypeKind::Basic(BasicKind::UntypedInt));
        let untyped_rune = arena.alloc(TypeKind::Basic(BasicKind::UntypedRune));
        let untyped_float = arena.alloc(TypeKind::Basic(BasicKind::UntypedFloat));
        let untyped_complex = arena.alloc(TypeKind::Basic(BasicKind::UntypedComplex));
        let untyped_string = arena.alloc(TypeKind::Basic(BasicKind::UntypedString));
        let untyped_nil = arena.alloc(TypeKind::Basic(BasicKind::UntypedNil));

        // error: interface { Error() string }
        let error_name = objs.alloc(Object {
            name: "error".to_string(),
            kind: ObjKind::TypeName,
            typ: invalid,
            pos: NO_POS,
            scope_pos: NO_POS,
            pkg: None,
        });
        let error_ = arena.alloc(TypeKind::Named {
            obj: error_name,
            underlying: invalid,
            methods: Vec::new(),
        });
        objs.get_mut(error_name).typ = error_;
        let error_result = objs.alloc(Object {
            name: String::new(),
            kind: ObjKind::Var {
                is_field: false,
                anonymous: false,
                is_param: false,
                is_result: true,
            },
            typ: string_,
            pos: NO_POS,
            scope_pos: NO_POS,
            pkg: None,
        });
        let error_sig = arena.alloc(TypeKind::Signature {
            recv: None,
            recv_optional: false,
            params: Vec::new(),
            results: vec![error_result],
            result_entangled: None,
            variadic: false,
        });
        let error_method = objs.new_func("Error", error_sig, NO_POS, None);
        let error_iface = arena.alloc(TypeKind::Interface {
            methods: vec![error_method],
            embeddeds: Vec::new(),
            all_methods: vec![error_method],
            complete: true,
        });
        arena.set_underlying(error_, error_iface);
        scopes.insert(scope, "error", error_name);

        // constants and nil
        let true_obj = objs.alloc(Object {
            name: "true".to_string(),
            kind: ObjKind::Const {
                val: Some(Value::Bool(true)),
            },
            typ: untyped_bool,
            pos: NO_POS,
            scope_pos: NO_POS,
            pkg: None,
        });
        scopes.insert(scope, "true", true_obj);
        let false_obj = objs.alloc(Object {
            name: "false".to_string(),
            kind: ObjKind::Const {
                val: Some(Value::Bool(false)),
            },
            typ: untyped_bool,
            pos: NO_POS,
            scope_pos: NO_POS,
            pkg: None,
        });
        scopes.insert(scope, "false", false_obj);
        let iota_obj = objs.alloc(Object {
            name: "iota".to_string(),
            kind: ObjKind::Const { val: None },
            typ: untyped_int,
            pos: NO_POS,
            scope_pos: NO_POS,
            pkg: None,
        });
        scopes.insert(scope, "iota", iota_obj);
        let nil_obj = objs.alloc(Object {
            name: "nil".to_string(),
            kind: ObjKind::Nil,
            typ: untyped_nil,
            pos: NO_POS,
            scope_pos: NO_POS,
            pkg: None,
        });
        scopes.insert(scope, "nil", nil_obj);

        for b in [
            Builtin::Append,
            Builtin::Cap,
            Builtin::Close,
            Builtin::Copy,
            Builtin::Delete,
            Builtin::Len,
            Builtin::Make,
            Builtin::New,
            Builtin::Panic,
            Builtin::Print,
            Builtin::Println,
        ] {
            let obj = objs.alloc(Object {
                name: b.name().to_string(),
                kind: ObjKind::Builtin(b),
                typ: invalid,
                pos: NO_POS,
                scope_pos: NO_POS,
                pkg: None,
            });
            scopes.insert(scope, b.name(), obj);
        }

        Universe {
            scope,
            invalid,
            bool_,
            int_,
            int8_,
            int16_,
            int32_,
            int64_,
            uint_,
            uint8_,
            uint16_,
            uint32_,
            uint64_,
            uintptr_,
            float32_,
            float64_,
            complex64_,
            complex128_,
            string_,
            untyped_bool,
            untyped_int,
            untyped_rune,
            untyped_float,
            untyped_complex,
            untyped_string,
            untyped_nil,
            error_,
            nil_obj,
        }
    }

    /// The arena node for an untyped-constant kind.
    pub fn untyped(&self, kind: BasicKind) -> TypeId {
        use BasicKind::*;
        match kind {
            UntypedBool => self.untyped_bool,
            UntypedInt => self.untyped_int,
            UntypedRune => self.untyped_rune,
            UntypedFloat => self.untyped_float,
            UntypedComplex => self.untyped_complex,
            UntypedString => self.untyped_string,
            UntypedNil => self.untyped_nil,
            _ => self.invalid,
        }
    }

    /// The arena node for a typed basic kind.
    pub fn basic(&self, kind: BasicKind) -> TypeId {
        use BasicKind::*;
        match kind {
            Bool => self.bool_,
            Int => self.int_,
            Int8 => self.int8_,
            Int16 => self.int16_,
            Int32 => self.int32_,
            Int64 => self.int64_,
            Uint => self.uint_,
            Uint8 => self.uint8_,
            Uint16 => self.uint16_,
            Uint32 => self.uint32_,
            Uint64 => self.uint64_,
            Uintptr => self.uintptr_,
            Float32 => self.float32_,
            Float64 => self.float64_,
            Complex64 => self.complex64_,
            Complex128 => self.complex128_,
            String => self.string_,
            _ => self.invalid,
        }
    }
}
