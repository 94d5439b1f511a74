//! Optionable-position analysis.
//!
//! `find_optionables` classifies the positions inside a composite type
//! where the base language admits `nil`, splitting them into positions the
//! runtime can inspect on a dynamic value (the type itself, struct fields,
//! pointees, transitively) and positions it cannot (element types of
//! slices/arrays/maps/chans, parameter and result types inside signatures
//! and interface methods). Traversal does not descend through an
//! `Optional` boundary: a `?`-wrapped position is allowed to be nil, and a
//! runtime guard behind it would dereference a possibly-nil value.

use crate::objects::Objects;
use crate::types::{TypeArena, TypeId, TypeKind};

/// One step in a path to an optionable position within a composite type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Pointee,
    Key,
    Value,
    Elem,
    Field { typ: TypeId, index: usize },
    /// Parameter `param` of a signature, or of interface method `method`.
    Param { method: Option<usize>, param: usize },
    /// Result `result` of a signature, or of interface method `method`.
    Result { method: Option<usize>, result: usize },
}

/// A series of steps to reach an optionable position within a composite
/// type. The empty path denotes the type itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionablePath(pub Vec<PathStep>);

impl OptionablePath {
    pub fn describe(&self, arena: &TypeArena, objs: &Objects) -> String {
        if self.0.is_empty() {
            return "value".to_string();
        }
        let mut parts = Vec::new();
        for step in &self.0 {
            parts.push(match step {
                PathStep::Pointee => "pointee".to_string(),
                PathStep::Key => "key".to_string(),
                PathStep::Value => "value".to_string(),
                PathStep::Elem => "element".to_string(),
                PathStep::Field { typ, index } => match arena.kind(*typ) {
                    TypeKind::Struct { fields } => {
                        format!("field {}", objs.get(fields[*index].var).name)
                    }
                    _ => format!("field #{index}"),
                },
                PathStep::Param { method, param } => match method {
                    Some(m) => format!("method #{m}'s #{} argument", param + 1),
                    None => format!("#{} argument", param + 1),
                },
                PathStep::Result { method, result } => match method {
                    Some(m) => format!("method #{m}'s #{} return type", result + 1),
                    None => format!("#{} return type", result + 1),
                },
            });
        }
        parts.join("'s ")
    }
}

/// Returns the optionable positions within `typ`, including `typ` itself,
/// split into runtime-checkable and unchecked paths.
pub fn find_optionables(
    arena: &TypeArena,
    objs: &Objects,
    typ: TypeId,
) -> (Vec<OptionablePath>, Vec<OptionablePath>) {
    let mut checkable = Vec::new();
    let mut unchecked = Vec::new();
    walk(
        arena,
        objs,
        typ,
        Vec::new(),
        false,
        &mut checkable,
        &mut unchecked,
    );
    (checkable, unchecked)
}

fn walk(
    arena: &TypeArena,
    objs: &Objects,
    typ: TypeId,
    path: Vec<PathStep>,
    all_unchecked: bool,
    checkable: &mut Vec<OptionablePath>,
    unchecked: &mut Vec<OptionablePath>,
) {
    let push = |path: Vec<PathStep>, checkable: &mut Vec<OptionablePath>, unchecked: &mut Vec<OptionablePath>| {
        if all_unchecked {
            unchecked.push(OptionablePath(path));
        } else {
            checkable.push(OptionablePath(path));
        }
    };

    match arena.kind(typ) {
        TypeKind::Pointer { elem } => {
            push(path.clone(), checkable, unchecked);
            let mut next = path;
            next.push(PathStep::Pointee);
            walk(arena, objs, *elem, next, all_unchecked, checkable, unchecked);
        }
        TypeKind::Map { key, elem } => {
            push(path.clone(), checkable, unchecked);
            let mut key_path = path.clone();
            key_path.push(PathStep::Key);
            walk(arena, objs, *key, key_path, true, checkable, unchecked);
            let mut val_path = path;
            val_path.push(PathStep::Value);
            walk(arena, objs, *elem, val_path, true, checkable, unchecked);
        }
        TypeKind::Chan { elem, .. } => {
            push(path.clone(), checkable, unchecked);
            let mut next = path;
            next.push(PathStep::Elem);
            walk(arena, objs, *elem, next, true, checkable, unchecked);
        }
        TypeKind::Signature {
            params, results, ..
        } => {
            push(path.clone(), checkable, unchecked);
            for (i, p) in params.iter().enumerate() {
                let mut next = path.clone();
                next.push(PathStep::Param {
                    method: None,
                    param: i,
                });
                walk(arena, objs, objs.get(*p).typ, next, true, checkable, unchecked);
            }
            for (i, r) in results.iter().enumerate() {
                let mut next = path.clone();
                next.push(PathStep::Result {
                    method: None,
                    result: i,
                });
                walk(arena, objs, objs.get(*r).typ, next, true, checkable, unchecked);
            }
        }
        TypeKind::Interface { all_methods, .. } => {
            push(path.clone(), checkable, unchecked);
            for (mi, m) in all_methods.iter().enumerate() {
                let sig = objs.get(*m).typ;
                if let TypeKind::Signature {
                    params, results, ..
                } = arena.kind(sig)
                {
                    for (i, p) in params.iter().enumerate() {
                        let mut next = path.clone();
                        next.push(PathStep::Param {
                            method: Some(mi),
                            param: i,
                        });
                        walk(arena, objs, objs.get(*p).typ, next, true, checkable, unchecked);
                    }
                    for (i, r) in results.iter().enumerate() {
                        let mut next = path.clone();
                        next.push(PathStep::Result {
                            method: Some(mi),
                            result: i,
                        });
                        walk(arena, objs, objs.get(*r).typ, next, true, checkable, unchecked);
                    }
                }
            }
        }
        TypeKind::Slice { elem } | TypeKind::Array { elem, .. } => {
            let mut next = path;
            next.push(PathStep::Elem);
            walk(arena, objs, *elem, next, true, checkable, unchecked);
        }
        TypeKind::Struct { fields } => {
            for (i, f) in fields.iter().enumerate() {
                let mut next = path.clone();
                next.push(PathStep::Field { typ, index: i });
                walk(
                    arena,
                    objs,
                    objs.get(f.var).typ,
                    next,
                    all_unchecked,
                    checkable,
                    unchecked,
                );
            }
        }
        TypeKind::Named { underlying, .. } => {
            if arena.is_optionable(*underlying) {
                push(path, checkable, unchecked);
            } else if matches!(arena.kind(*underlying), TypeKind::Struct { .. }) {
                walk(
                    arena,
                    objs,
                    *underlying,
                    path,
                    all_unchecked,
                    checkable,
                    unchecked,
                );
            }
        }
        // An optional boundary; positions behind it are neither checkable
        // nor grounds for rejection.
        TypeKind::Optional { .. } => {}
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{Objects, Scopes};
    use crate::universe::Universe;

    fn setup() -> (TypeArena, Objects, Universe) {
        let mut arena = TypeArena::new();
        let mut objs = Objects::new();
        let mut scopes = Scopes::new();
        let universe = Universe::new(&mut arena, &mut objs, &mut scopes);
        (arena, objs, universe)
    }

    #[test]
    fn plain_pointer_is_checkable() {
        let (mut arena, objs, u) = setup();
        let ptr = arena.alloc(TypeKind::Pointer { elem: u.int_ });
        let (checkable, unchecked) = find_optionables(&arena, &objs, ptr);
        assert_eq!(checkable, vec![OptionablePath(vec![])]);
        assert!(unchecked.is_empty());
    }

    #[test]
    fn func_parameter_is_unchecked() {
        let (mut arena, mut objs, u) = setup();
        let ptr = arena.alloc(TypeKind::Pointer { elem: u.int_ });
        let param = objs.new_param("p", ptr, 0, None);
        let sig = arena.alloc(TypeKind::Signature {
            recv: None,
            recv_optional: false,
            params: vec![param],
            results: Vec::new(),
            result_entangled: None,
            variadic: false,
        });
        let (checkable, unchecked) = find_optionables(&arena, &objs, sig);
        assert_eq!(checkable.len(), 1); // the function value itself
        assert_eq!(unchecked.len(), 1); // its parameter
        assert_eq!(
            unchecked[0].0,
            vec![
                PathStep::Param {
                    method: None,
                    param: 0
                },
            ]
        );
    }

    #[test]
    fn optional_boundary_stops_traversal() {
        let (mut arena, objs, u) = setup();
        let ptr = arena.alloc(TypeKind::Pointer { elem: u.int_ });
        let opt = arena.alloc(TypeKind::Optional { elem: ptr });
        let (checkable, unchecked) = find_optionables(&arena, &objs, opt);
        assert!(checkable.is_empty());
        assert!(unchecked.is_empty());
    }

    #[test]
    fn struct_fields_are_checkable() {
        let (mut arena, mut objs, u) = setup();
        let ptr = arena.alloc(TypeKind::Pointer { elem: u.int_ });
        let field = objs.new_field("p", ptr, false, 0, None);
        let st = arena.alloc(TypeKind::Struct {
            fields: vec![crate::types::StructField {
                var: field,
                tag: None,
            }],
        });
        let (checkable, unchecked) = find_optionables(&arena, &objs, st);
        assert_eq!(checkable.len(), 1);
        assert!(unchecked.is_empty());
        assert!(matches!(checkable[0].0[0], PathStep::Field { index: 0, .. }));
    }
}
