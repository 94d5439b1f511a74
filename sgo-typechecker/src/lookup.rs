//! Field and method lookup.
//!
//! Breadth-first search over embedded fields with shadowing and ambiguity
//! detection. A value of optional type exposes no fields or methods; an
//! optional-wrapped receiver only finds methods declared with an optional
//! receiver.

use crate::objects::{ObjId, Objects, PkgId};
use crate::types::{identical, TypeArena, TypeId, TypeKind};

/// Result of `lookup_field_or_method`.
#[derive(Debug, Clone)]
pub enum LookupResult {
    /// Found; `indirect` reports a pointer indirection on the path.
    Found {
        obj: ObjId,
        index: Vec<usize>,
        indirect: bool,
    },
    /// The name appeared more than once at the same embedding depth.
    Ambiguous { index: Vec<usize> },
    /// A method exists but requires a pointer (or optional) receiver the
    /// value cannot supply.
    BadReceiver,
    NotFound,
}

struct EmbeddedType {
    typ: TypeId,
    index: Vec<usize>,
    indirect: bool,
    opt: bool,
    multiples: bool,
}

/// Looks up a field or method named `name` in `typ`. `addressable` is set
/// when `typ` is the type of an addressable variable, which widens the
/// method set to pointer receivers.
pub fn lookup_field_or_method(
    arena: &TypeArena,
    objs: &Objects,
    typ: TypeId,
    addressable: bool,
    pkg: Option<PkgId>,
    name: &str,
) -> LookupResult {
    // Methods are never associated with a named pointer type; search the
    // pointee but drop method results. The same applies through an
    // optional wrapper.
    if let TypeKind::Named { underlying, .. } = arena.kind(typ) {
        let (inner, _) = arena.deopt(*underlying);
        if let TypeKind::Pointer { .. } = arena.kind(arena.underlying(inner)) {
            let res = lookup(arena, objs, inner, false, pkg, name);
            if let LookupResult::Found { obj, .. } = &res {
                if matches!(objs.get(*obj).kind, crate::objects::ObjKind::Func) {
                    return LookupResult::NotFound;
                }
            }
            return res;
        }
    }
    lookup(arena, objs, typ, addressable, pkg, name)
}

fn lookup(
    arena: &TypeArena,
    objs: &Objects,
    typ: TypeId,
    addressable: bool,
    pkg: Option<PkgId>,
    name: &str,
) -> LookupResult {
    if name == "_" {
        return LookupResult::NotFound;
    }

    let (typ, is_opt) = arena.deopt(typ);
    let (typ, is_ptr) = arena.deref(typ);

    if is_ptr && arena.is_interface(typ) {
        return LookupResult::NotFound;
    }

    let mut current = vec![EmbeddedType {
        typ,
        index: Vec::new(),
        indirect: is_ptr,
        opt: is_opt,
        multiples: false,
    }];
    let mut seen: Vec<TypeId> = Vec::new();

    let mut found: Option<(ObjId, Vec<usize>, bool)> = None;

    while !current.is_empty() {
        let mut next: Vec<EmbeddedType> = Vec::new();

        for e in &current {
            let mut typ = e.typ;

            if let TypeKind::Named { methods, underlying, .. } = arena.kind(typ) {
                if seen.contains(&typ) {
                    continue;
                }
                seen.push(typ);

                if let Some((i, m)) = lookup_method(objs, methods, pkg, name) {
                    let index = concat(&e.index, i);
                    if found.is_some() || e.multiples {
                        return LookupResult::Ambiguous { index };
                    }
                    // An optional receiver value only finds methods whose
                    // receiver is itself optional.
                    if e.opt && !method_has_optional_recv(arena, objs, m) {
                        continue;
                    }
                    found = Some((m, index, e.indirect));
                    continue;
                }
                typ = *underlying;
            }

            match arena.kind(typ) {
                TypeKind::Struct { fields } => {
                    for (i, f) in fields.iter().enumerate() {
                        let fobj = objs.get(f.var);
                        if !e.opt && objs.same_id(f.var, pkg, name) {
                            let index = concat(&e.index, i);
                            if found.is_some() || e.multiples {
                                return LookupResult::Ambiguous { index };
                            }
                            found = Some((f.var, index, e.indirect));
                            continue;
                        }
                        if found.is_none() && fobj.is_field() && is_anonymous(objs, f.var) {
                            let (ftyp, fopt) = arena.deopt(fobj.typ);
                            let (ftyp, fptr) = arena.deref(ftyp);
                            next.push(EmbeddedType {
                                typ: ftyp,
                                index: concat(&e.index, i),
                                indirect: e.indirect || fptr,
                                opt: fopt,
                                multiples: e.multiples,
                            });
                        }
                    }
                }
                TypeKind::Interface { all_methods, .. } => {
                    if let Some((i, m)) = lookup_method(objs, all_methods, pkg, name) {
                        let index = concat(&e.index, i);
                        if found.is_some() || e.multiples {
                            return LookupResult::Ambiguous { index };
                        }
                        found = Some((m, index, e.indirect));
                    }
                }
                _ => {}
            }
        }

        if let Some((obj, index, indirect)) = found.take() {
            if matches!(objs.get(obj).kind, crate::objects::ObjKind::Func) {
                let opt_recv = method_has_optional_recv(arena, objs, obj);
                let is_ptr_recv = if opt_recv {
                    let recv_typ = method_recv_type(arena, objs, obj);
                    let (unwrapped, _) = arena.deopt(recv_typ);
                    matches!(arena.kind(unwrapped), TypeKind::Pointer { .. })
                } else if is_opt {
                    // optional receiver required
                    return LookupResult::BadReceiver;
                } else {
                    ptr_recv(arena, objs, obj)
                };
                if is_ptr_recv && !indirect && !addressable {
                    return LookupResult::BadReceiver;
                }
            }
            return LookupResult::Found {
                obj,
                index,
                indirect,
            };
        }

        current = consolidate_multiples(arena, objs, next);
    }

    LookupResult::NotFound
}

fn is_anonymous(objs: &Objects, var: ObjId) -> bool {
    matches!(
        objs.get(var).kind,
        crate::objects::ObjKind::Var {
            anonymous: true,
            ..
        }
    )
}

fn lookup_method(
    objs: &Objects,
    methods: &[ObjId],
    pkg: Option<PkgId>,
    name: &str,
) -> Option<(usize, ObjId)> {
    if name == "_" {
        return None;
    }
    methods
        .iter()
        .enumerate()
        .find(|(_, m)| objs.same_id(**m, pkg, name))
        .map(|(i, m)| (i, *m))
}

fn method_recv_type(arena: &TypeArena, objs: &Objects, method: ObjId) -> TypeId {
    match arena.kind(objs.get(method).typ) {
        TypeKind::Signature {
            recv: Some(recv), ..
        } => objs.get(*recv).typ,
        _ => objs.get(method).typ,
    }
}

fn method_has_optional_recv(arena: &TypeArena, objs: &Objects, method: ObjId) -> bool {
    matches!(
        arena.kind(objs.get(method).typ),
        TypeKind::Signature {
            recv_optional: true,
            ..
        }
    )
}

fn ptr_recv(arena: &TypeArena, objs: &Objects, method: ObjId) -> bool {
    match arena.kind(objs.get(method).typ) {
        TypeKind::Signature {
            recv: Some(recv), ..
        } => matches!(
            arena.kind(objs.get(*recv).typ),
            TypeKind::Pointer { .. }
        ),
        _ => false,
    }
}

fn concat(list: &[usize], i: usize) -> Vec<usize> {
    let mut out = list.to_vec();
    out.push(i);
    out
}

fn consolidate_multiples(
    arena: &TypeArena,
    objs: &Objects,
    list: Vec<EmbeddedType>,
) -> Vec<EmbeddedType> {
    if list.len() <= 1 {
        return list;
    }
    let mut out: Vec<EmbeddedType> = Vec::new();
    for e in list {
        if let Some(prev) = out
            .iter_mut()
            .find(|p| identical(arena, objs, p.typ, e.typ))
        {
            prev.multiples = true;
        } else {
            out.push(e);
        }
    }
    out
}

/// Returns a method of `iface` that `typ` is missing, and whether it is
/// present but with the wrong type. `(None, _)` means `typ` implements
/// `iface`.
pub fn missing_method(
    arena: &TypeArena,
    objs: &Objects,
    typ: TypeId,
    iface: TypeId,
    static_check: bool,
) -> (Option<ObjId>, bool) {
    let all_methods = match arena.kind(arena.underlying(iface)) {
        TypeKind::Interface { all_methods, .. } => all_methods.clone(),
        _ => return (None, false),
    };
    if all_methods.is_empty() {
        return (None, false);
    }

    if let TypeKind::Interface {
        all_methods: v_methods,
        ..
    } = arena.kind(arena.underlying(typ))
    {
        for m in &all_methods {
            let mo = objs.get(*m);
            match lookup_method(objs, v_methods, mo.pkg, &mo.name) {
                None => {
                    if static_check {
                        return (Some(*m), false);
                    }
                }
                Some((_, obj)) => {
                    if !identical(arena, objs, objs.get(obj).typ, mo.typ) {
                        return (Some(*m), true);
                    }
                }
            }
        }
        return (None, false);
    }

    for m in &all_methods {
        let mo = objs.get(*m);
        match lookup(arena, objs, typ, false, mo.pkg, &mo.name) {
            LookupResult::Found { obj, .. }
                if matches!(objs.get(obj).kind, crate::objects::ObjKind::Func) =>
            {
                if !sig_identical_ignoring_recv(arena, objs, objs.get(obj).typ, mo.typ) {
                    return (Some(*m), true);
                }
            }
            _ => return (Some(*m), false),
        }
    }
    (None, false)
}

/// Signature identity for interface satisfaction; receivers are not part
/// of a method's interface type.
fn sig_identical_ignoring_recv(
    arena: &TypeArena,
    objs: &Objects,
    a: TypeId,
    b: TypeId,
) -> bool {
    match (arena.kind(a), arena.kind(b)) {
        (
            TypeKind::Signature {
                params: pa,
                results: ra,
                result_entangled: ea,
                variadic: va,
                ..
            },
            TypeKind::Signature {
                params: pb,
                results: rb,
                result_entangled: eb,
                variadic: vb,
                ..
            },
        ) => {
            va == vb
                && pa.len() == pb.len()
                && ra.len() == rb.len()
                && pa
                    .iter()
                    .zip(pb)
                    .all(|(x, y)| identical(arena, objs, objs.get(*x).typ, objs.get(*y).typ))
                && ra
                    .iter()
                    .zip(rb)
                    .all(|(x, y)| identical(arena, objs, objs.get(*x).typ, objs.get(*y).typ))
                && match (ea, eb) {
                    (None, None) => true,
                    (Some(x), Some(y)) => {
                        identical(arena, objs, objs.get(*x).typ, objs.get(*y).typ)
                    }
                    _ => false,
                }
        }
        _ => identical(arena, objs, a, b),
    }
}
