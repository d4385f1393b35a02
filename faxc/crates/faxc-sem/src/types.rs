//! The interned type system.
//!
//! A [`TypeId`] is an opaque handle into a process-wide [`TypeContext`]; two
//! `TypeId`s compare equal iff they denote the same semantic type. This is
//! the "type interner" of spec.md §3.1: `Type` values are never compared
//! structurally once interned — every query that needs a type answers with a
//! `TypeId`, and the context is the only place a `Type` is ever constructed.

use faxc_util::{define_idx, DefId};
use std::collections::HashMap;

define_idx!(TypeId);

/// Primitive scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    I32,
    U32,
    Isize,
    Usize,
    Bool,
    Char,
    String,
}

impl Primitive {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Primitive::I32 | Primitive::U32 | Primitive::Isize | Primitive::Usize
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Primitive::I32 | Primitive::Isize)
    }
}

/// A canonical, structurally-deduplicated type.
///
/// `Never` is the bottom type (§3.1): assignable to anything, nothing else
/// assignable to it. `Underscore` only ever appears transiently on a
/// `TypeAnnotation` before resolution; it is never the resolved type of a
/// checked expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(Primitive),
    Struct { def_ref: DefId },
    Enum { def_ref: DefId },
    Reference { referent: TypeId, is_mutable: bool },
    Array { element: TypeId, size: usize },
    Unit,
    Never,
    Underscore,
}

/// Interns [`Type`] values behind [`TypeId`] handles.
///
/// Interning is referentially transparent: two structurally equal `Type`
/// values always yield the same `TypeId`, via the `by_shape` reverse index.
/// This is the sole place `Type` values are constructed; everything else in
/// the crate threads `TypeId`s and resolves through here on demand.
pub struct TypeContext {
    types: Vec<Type>,
    by_shape: HashMap<Type, TypeId>,
    // Cached ids for primitives/Unit/Never, populated eagerly so hot lookups
    // (e.g. "is this Never?") avoid a hash lookup.
    unit: TypeId,
    never: TypeId,
    underscore: TypeId,
}

impl TypeContext {
    pub fn new() -> Self {
        let mut types = Vec::new();
        let mut by_shape = HashMap::new();

        let mut intern_now = |types: &mut Vec<Type>, by_shape: &mut HashMap<Type, TypeId>, ty: Type| -> TypeId {
            let id = TypeId(types.len() as u32);
            types.push(ty.clone());
            by_shape.insert(ty, id);
            id
        };

        let unit = intern_now(&mut types, &mut by_shape, Type::Unit);
        let never = intern_now(&mut types, &mut by_shape, Type::Never);
        let underscore = intern_now(&mut types, &mut by_shape, Type::Underscore);

        TypeContext {
            types,
            by_shape,
            unit,
            never,
            underscore,
        }
    }

    /// Returns the canonical handle for `ty`, interning it if this is the
    /// first time this shape has been seen.
    pub fn get_type_id(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.by_shape.get(&ty) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.by_shape.insert(ty, id);
        id
    }

    pub fn resolve(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn unit(&self) -> TypeId {
        self.unit
    }

    pub fn never(&self) -> TypeId {
        self.never
    }

    pub fn underscore(&self) -> TypeId {
        self.underscore
    }

    pub fn primitive(&mut self, p: Primitive) -> TypeId {
        self.get_type_id(Type::Primitive(p))
    }

    pub fn reference(&mut self, referent: TypeId, is_mutable: bool) -> TypeId {
        self.get_type_id(Type::Reference {
            referent,
            is_mutable,
        })
    }

    pub fn array(&mut self, element: TypeId, size: usize) -> TypeId {
        self.get_type_id(Type::Array { element, size })
    }

    pub fn struct_ty(&mut self, def_ref: DefId) -> TypeId {
        self.get_type_id(Type::Struct { def_ref })
    }

    pub fn enum_ty(&mut self, def_ref: DefId) -> TypeId {
        self.get_type_id(Type::Enum { def_ref })
    }

    pub fn is_never(&self, id: TypeId) -> bool {
        id == self.never
    }

    pub fn is_unit(&self, id: TypeId) -> bool {
        id == self.unit
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(self.resolve(id), Type::Primitive(p) if p.is_integer())
    }

    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.is_integer(id)
    }

    pub fn is_bool(&self, id: TypeId) -> bool {
        matches!(self.resolve(id), Type::Primitive(Primitive::Bool))
    }

    /// `Reference{&mut T}` is assignable to `Reference{&T}` but not the
    /// reverse (§3.1, SPEC_FULL.md Open Question 4). Otherwise assignability
    /// requires identical `TypeId`s, except that `Never` is assignable to
    /// anything.
    pub fn is_assignable_to(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        if self.is_never(from) {
            return true;
        }
        if let (
            Type::Reference {
                referent: r1,
                is_mutable: true,
            },
            Type::Reference {
                referent: r2,
                is_mutable: false,
            },
        ) = (self.resolve(from), self.resolve(to))
        {
            return r1 == r2;
        }
        false
    }

    /// Primitive↔primitive casts are always allowed; array and reference
    /// casts descend structurally with size equality for arrays; `Never`
    /// casts to anything (§4.4 "Cast").
    pub fn is_castable_to(&self, from: TypeId, to: TypeId) -> bool {
        if from == to || self.is_never(from) {
            return true;
        }
        match (self.resolve(from), self.resolve(to)) {
            (Type::Primitive(_), Type::Primitive(_)) => true,
            (
                Type::Reference {
                    referent: r1,
                    is_mutable: m1,
                },
                Type::Reference {
                    referent: r2,
                    is_mutable: m2,
                },
            ) => (*m1 || !*m2) && self.is_castable_to(*r1, *r2),
            (
                Type::Array {
                    element: e1,
                    size: s1,
                },
                Type::Array {
                    element: e2,
                    size: s2,
                },
            ) => s1 == s2 && self.is_castable_to(*e1, *e2),
            _ => false,
        }
    }

    /// Unifies two branch types (if/else, array-literal elements). `Never`
    /// yields to the other branch's type; otherwise the types must already
    /// be identical (§4.4 "If", §4.9 design note on `Never` as bottom).
    pub fn find_common_type(&self, a: TypeId, b: TypeId) -> Option<TypeId> {
        if a == b {
            return Some(a);
        }
        if self.is_never(a) {
            return Some(b);
        }
        if self.is_never(b) {
            return Some(a);
        }
        None
    }
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_referentially_transparent() {
        let mut ctx = TypeContext::new();
        let a = ctx.primitive(Primitive::I32);
        let b = ctx.primitive(Primitive::I32);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_shapes_get_distinct_ids() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.primitive(Primitive::I32);
        let u32_ty = ctx.primitive(Primitive::U32);
        assert_ne!(i32_ty, u32_ty);
    }

    #[test]
    fn never_assignable_to_anything() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.primitive(Primitive::I32);
        assert!(ctx.is_assignable_to(ctx.never(), i32_ty));
        assert!(!ctx.is_assignable_to(i32_ty, ctx.never()));
    }

    #[test]
    fn mut_ref_coerces_to_immut_ref_one_level() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.primitive(Primitive::I32);
        let mut_ref = ctx.reference(i32_ty, true);
        let immut_ref = ctx.reference(i32_ty, false);
        assert!(ctx.is_assignable_to(mut_ref, immut_ref));
        assert!(!ctx.is_assignable_to(immut_ref, mut_ref));
    }

    #[test]
    fn array_cast_requires_equal_size() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.primitive(Primitive::I32);
        let u32_ty = ctx.primitive(Primitive::U32);
        let arr3_i32 = ctx.array(i32_ty, 3);
        let arr3_u32 = ctx.array(u32_ty, 3);
        let arr4_u32 = ctx.array(u32_ty, 4);
        assert!(ctx.is_castable_to(arr3_i32, arr3_u32));
        assert!(!ctx.is_castable_to(arr3_i32, arr4_u32));
    }

    #[test]
    fn find_common_type_prefers_non_never() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.primitive(Primitive::I32);
        assert_eq!(ctx.find_common_type(ctx.never(), i32_ty), Some(i32_ty));
        assert_eq!(ctx.find_common_type(i32_ty, ctx.never()), Some(i32_ty));
        assert_eq!(ctx.find_common_type(i32_ty, i32_ty), Some(i32_ty));
    }

    #[test]
    fn find_common_type_rejects_unrelated_types() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.primitive(Primitive::I32);
        let bool_ty = ctx.primitive(Primitive::Bool);
        assert_eq!(ctx.find_common_type(i32_ty, bool_ty), None);
    }
}
