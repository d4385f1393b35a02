//! C4: the semantic context (§4.3). Owns the type interner, the impl table,
//! and every name-to-definition table the later passes need.
//!
//! The original design called for three explicit caches keyed by node
//! pointer (`type_cache`, `expr_cache`, `const_cache`); this HIR stores that
//! state directly on the node instead (`TypeAnnotation::Resolved`,
//! `Expr.info`), so `type_query`/`expr_query`/`const_query` read and write
//! through the node rather than through a side table. Same contract, one
//! fewer moving part.
//!
//! Every struct/enum field, function/method signature, const type, and
//! trait-item signature is resolved to a `TypeId` eagerly during
//! construction, so body-checking (C5) never needs to re-enter `Program` for
//! another item's signature — it only ever touches the function/method it is
//! currently walking plus this context's tables.

use crate::error::{SemanticError, SemanticResult};
use crate::hir::*;
use crate::impl_table::ImplTable;
use crate::types::{Primitive, Type, TypeContext, TypeId};
use faxc_util::{DefId, FxHashMap, Span, Symbol};
use std::collections::HashSet;

/// Result of evaluating a top-level `const`'s initializer, cached so a
/// second reference to the same const (or a dependency cycle check) never
/// re-walks the initializer expression.
pub type ConstValues = FxHashMap<ConstId, ConstVariant>;

pub struct StructInfo {
    pub fields: Vec<(Symbol, TypeId)>,
}

#[derive(Debug, Clone)]
pub enum EnumVariantKind {
    Unit,
    Tuple(Vec<TypeId>),
    Struct(Vec<(Symbol, TypeId)>),
}

pub struct EnumVariantInfo {
    pub name: Symbol,
    pub data: EnumVariantKind,
}

pub struct EnumInfo {
    pub variants: Vec<EnumVariantInfo>,
}

#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

#[derive(Debug, Clone)]
pub struct MethodSig {
    pub self_mode: SelfMode,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

#[derive(Debug, Clone)]
pub enum TraitItemSig {
    Method { self_mode: Option<SelfMode>, params: Vec<TypeId>, ret: TypeId },
    Const(TypeId),
}

pub struct TraitInfo {
    pub items: Vec<(Symbol, TraitItemSig)>,
}

pub struct Context {
    pub types: TypeContext,
    pub impls: ImplTable,

    struct_defs: FxHashMap<DefId, StructInfo>,
    pub struct_names: FxHashMap<Symbol, (StructId, DefId)>,
    struct_def_ids: Vec<DefId>,
    enum_defs: FxHashMap<DefId, EnumInfo>,
    pub enum_names: FxHashMap<Symbol, (EnumId, DefId)>,
    enum_def_ids: Vec<DefId>,

    const_values: ConstValues,

    functions: FxHashMap<FunctionId, FnSig>,
    pub func_names: FxHashMap<Symbol, FunctionId>,
    methods: FxHashMap<MethodId, MethodSig>,
    consts: FxHashMap<ConstId, TypeId>,
    pub const_names: FxHashMap<Symbol, ConstId>,

    traits: FxHashMap<TraitId, TraitInfo>,
    pub trait_names: FxHashMap<Symbol, TraitId>,

    evaluating_consts: HashSet<ConstId>,
}

fn primitive_from_name(name: Symbol) -> Option<Primitive> {
    match name.as_str() {
        "i32" => Some(Primitive::I32),
        "u32" => Some(Primitive::U32),
        "isize" => Some(Primitive::Isize),
        "usize" => Some(Primitive::Usize),
        "bool" => Some(Primitive::Bool),
        "char" => Some(Primitive::Char),
        "str" | "String" => Some(Primitive::String),
        _ => None,
    }
}

impl Context {
    pub fn new(program: &mut Program) -> SemanticResult<Self> {
        let mut types = TypeContext::new();
        let impls = ImplTable::with_predefined(&mut types);

        let mut struct_names = FxHashMap::default();
        let mut struct_def_ids = Vec::with_capacity(program.structs.len());
        for (i, s) in program.structs.iter().enumerate() {
            struct_def_ids.push(s.def_id);
            if struct_names
                .insert(s.name, (StructId(i as u32), s.def_id))
                .is_some()
            {
                return Err(SemanticError::new(
                    format!("duplicate struct `{}`", s.name.as_str()),
                    s.span,
                ));
            }
        }
        let mut enum_names = FxHashMap::default();
        let mut enum_def_ids = Vec::with_capacity(program.enums.len());
        for (i, e) in program.enums.iter().enumerate() {
            enum_def_ids.push(e.def_id);
            if enum_names
                .insert(e.name, (EnumId(i as u32), e.def_id))
                .is_some()
            {
                return Err(SemanticError::new(
                    format!("duplicate enum `{}`", e.name.as_str()),
                    e.span,
                ));
            }
        }
        let mut func_names = FxHashMap::default();
        for (i, f) in program.functions.iter().enumerate() {
            if func_names.insert(f.name, FunctionId(i as u32)).is_some() {
                return Err(SemanticError::new(
                    format!("duplicate function `{}`", f.name.as_str()),
                    f.span,
                ));
            }
        }
        let mut const_names = FxHashMap::default();
        for (i, c) in program.consts.iter().enumerate() {
            if const_names.insert(c.name, ConstId(i as u32)).is_some() {
                return Err(SemanticError::new(
                    format!("duplicate const `{}`", c.name.as_str()),
                    c.span,
                ));
            }
        }
        let mut trait_names = FxHashMap::default();
        for (i, t) in program.traits.iter().enumerate() {
            if trait_names.insert(t.name, TraitId(i as u32)).is_some() {
                return Err(SemanticError::new(
                    format!("duplicate trait `{}`", t.name.as_str()),
                    t.span,
                ));
            }
        }

        let mut ctx = Context {
            types,
            impls,
            struct_defs: FxHashMap::default(),
            struct_names,
            struct_def_ids,
            enum_defs: FxHashMap::default(),
            enum_names,
            enum_def_ids,
            const_values: FxHashMap::default(),
            functions: FxHashMap::default(),
            func_names,
            methods: FxHashMap::default(),
            consts: FxHashMap::default(),
            const_names,
            traits: FxHashMap::default(),
            trait_names,
            evaluating_consts: HashSet::new(),
        };

        for s in &mut program.structs {
            let mut fields = Vec::with_capacity(s.fields.len());
            for f in &mut s.fields {
                let ty = ctx.type_query(&mut f.ty)?;
                fields.push((f.name, ty));
            }
            ctx.struct_defs.insert(s.def_id, StructInfo { fields });
        }

        for e in &mut program.enums {
            let mut variants = Vec::with_capacity(e.variants.len());
            for v in &mut e.variants {
                let data = match &mut v.data {
                    VariantData::Unit => EnumVariantKind::Unit,
                    VariantData::Tuple(tys) => {
                        let mut resolved = Vec::with_capacity(tys.len());
                        for t in tys.iter_mut() {
                            resolved.push(ctx.type_query(t)?);
                        }
                        EnumVariantKind::Tuple(resolved)
                    }
                    VariantData::Struct(fields) => {
                        let mut resolved = Vec::with_capacity(fields.len());
                        for f in fields.iter_mut() {
                            resolved.push((f.name, ctx.type_query(&mut f.ty)?));
                        }
                        EnumVariantKind::Struct(resolved)
                    }
                };
                variants.push(EnumVariantInfo { name: v.name, data });
            }
            ctx.enum_defs.insert(e.def_id, EnumInfo { variants });
        }

        for (i, f) in program.functions.iter_mut().enumerate() {
            let mut params = Vec::with_capacity(f.params.len());
            for local_id in f.params.clone() {
                let local = &mut f.locals[local_id.0 as usize];
                params.push(ctx.type_query(&mut local.ty)?);
            }
            let ret = ctx.type_query(&mut f.ret_type)?;
            ctx.functions.insert(FunctionId(i as u32), FnSig { params, ret });
        }

        for (i, c) in program.consts.iter_mut().enumerate() {
            let ty = ctx.type_query(&mut c.ty)?;
            ctx.consts.insert(ConstId(i as u32), ty);
        }

        for (i, t) in program.traits.iter_mut().enumerate() {
            let mut items = Vec::new();
            for item in &mut t.items {
                match item {
                    TraitItemKind::Method(sig) => {
                        let mut params = Vec::with_capacity(sig.param_types.len());
                        for p in sig.param_types.iter_mut() {
                            params.push(ctx.type_query(p)?);
                        }
                        let ret = ctx.type_query(&mut sig.ret_type)?;
                        items.push((
                            sig.name,
                            TraitItemSig::Method {
                                self_mode: sig.self_mode,
                                params,
                                ret,
                            },
                        ));
                    }
                    TraitItemKind::Const(name, ty) => {
                        let resolved = ctx.type_query(ty)?;
                        items.push((*name, TraitItemSig::Const(resolved)));
                    }
                }
            }
            ctx.traits.insert(TraitId(i as u32), TraitInfo { items });
        }

        for imp in program.impls.iter_mut() {
            let self_ty = ctx.type_query(&mut imp.self_ty)?;
            for item in imp.items.clone() {
                match item {
                    ImplItemKind::Method(method_id) => {
                        let m = &mut program.methods[method_id.0 as usize];
                        let mut params = Vec::with_capacity(m.params.len());
                        for local_id in m.params.clone() {
                            let local = &mut m.locals[local_id.0 as usize];
                            params.push(ctx.type_query(&mut local.ty)?);
                        }
                        let ret = ctx.type_query(&mut m.ret_type)?;
                        let name = m.name;
                        let span = m.span;
                        let self_mode = m.self_mode;
                        ctx.methods.insert(method_id, MethodSig { self_mode, params, ret });
                        if !ctx.impls.register_method(self_ty, name, method_id) {
                            return Err(SemanticError::new(
                                format!("duplicate item `{}` in impl", name.as_str()),
                                span,
                            ));
                        }
                    }
                    ImplItemKind::Const(const_id) => {
                        let c = &mut program.consts[const_id.0 as usize];
                        let ty = ctx.type_query(&mut c.ty)?;
                        let name = c.name;
                        let span = c.span;
                        ctx.consts.insert(const_id, ty);
                        if !ctx.impls.register_const(self_ty, name, const_id) {
                            return Err(SemanticError::new(
                                format!("duplicate item `{}` in impl", name.as_str()),
                                span,
                            ));
                        }
                    }
                }
            }
        }

        Ok(ctx)
    }

    /// Resolves a type annotation to a `TypeId`, rewriting it to `Resolved`
    /// in place. Idempotent: a second call on an already-resolved annotation
    /// is a cache hit.
    pub fn type_query(&mut self, ann: &mut TypeAnnotation) -> SemanticResult<TypeId> {
        if let TypeAnnotation::Resolved(id) = ann {
            return Ok(*id);
        }
        let id = match ann {
            TypeAnnotation::Unresolved(UnresolvedType::Unit) => self.types.unit(),
            TypeAnnotation::Unresolved(UnresolvedType::Underscore) => self.types.underscore(),
            TypeAnnotation::Unresolved(UnresolvedType::Name(name)) => {
                self.resolve_named_type(*name)?
            }
            TypeAnnotation::Unresolved(UnresolvedType::Reference(inner, is_mutable)) => {
                let is_mutable = *is_mutable;
                let inner_id = self.type_query(inner)?;
                self.types.reference(inner_id, is_mutable)
            }
            TypeAnnotation::Unresolved(UnresolvedType::Array(inner, size)) => {
                let size = *size;
                let inner_id = self.type_query(inner)?;
                self.types.array(inner_id, size)
            }
            TypeAnnotation::Resolved(id) => *id,
        };
        *ann = TypeAnnotation::Resolved(id);
        Ok(id)
    }

    fn resolve_named_type(&mut self, name: Symbol) -> SemanticResult<TypeId> {
        if let Some(p) = primitive_from_name(name) {
            return Ok(self.types.primitive(p));
        }
        if let Some(&(_, def_id)) = self.struct_names.get(&name) {
            return Ok(self.types.struct_ty(def_id));
        }
        if let Some(&(_, def_id)) = self.enum_names.get(&name) {
            return Ok(self.types.enum_ty(def_id));
        }
        Err(SemanticError::new(
            format!("unknown type `{}`", name.as_str()),
            Span::DUMMY,
        ))
    }

    pub fn struct_info(&self, def_id: DefId) -> Option<&StructInfo> {
        self.struct_defs.get(&def_id)
    }

    pub fn struct_field(&self, def_id: DefId, name: Symbol) -> Option<(usize, TypeId)> {
        let info = self.struct_defs.get(&def_id)?;
        info.fields
            .iter()
            .position(|(n, _)| *n == name)
            .map(|i| (i, info.fields[i].1))
    }

    pub fn enum_info(&self, def_id: DefId) -> Option<&EnumInfo> {
        self.enum_defs.get(&def_id)
    }

    pub fn enum_variant(&self, def_id: DefId, name: Symbol) -> Option<(usize, &EnumVariantInfo)> {
        let info = self.enum_defs.get(&def_id)?;
        info.variants
            .iter()
            .position(|v| v.name == name)
            .map(|i| (i, &info.variants[i]))
    }

    pub fn function_sig(&self, id: FunctionId) -> &FnSig {
        &self.functions[&id]
    }

    pub fn method_sig(&self, id: MethodId) -> &MethodSig {
        &self.methods[&id]
    }

    pub fn const_type(&self, id: ConstId) -> TypeId {
        self.consts[&id]
    }

    pub fn trait_info(&self, id: TraitId) -> &TraitInfo {
        &self.traits[&id]
    }

    /// Guards `const_query` against a definition cycle (`const A = B; const B
    /// = A;`). Returns an error instead of recursing forever.
    pub fn begin_const_eval(&mut self, id: ConstId) -> SemanticResult<()> {
        if !self.evaluating_consts.insert(id) {
            return Err(SemanticError::new(
                "cycle detected while evaluating constant",
                Span::DUMMY,
            ));
        }
        Ok(())
    }

    pub fn end_const_eval(&mut self, id: ConstId) {
        self.evaluating_consts.remove(&id);
    }

    pub fn struct_def_id(&self, id: StructId) -> DefId {
        self.struct_def_ids[id.0 as usize]
    }

    pub fn enum_def_id(&self, id: EnumId) -> DefId {
        self.enum_def_ids[id.0 as usize]
    }

    pub fn record_const_value(&mut self, id: ConstId, v: ConstVariant) {
        self.const_values.insert(id, v);
    }

    pub fn const_value(&self, id: ConstId) -> Option<&ConstVariant> {
        self.const_values.get(&id)
    }
}

/// Strips one reference layer, for lookups that care about the base type
/// (field access, method resolution (§4.4 "Method call")).
pub fn strip_references(ctx: &TypeContext, mut ty: TypeId) -> TypeId {
    loop {
        match ctx.resolve(ty) {
            Type::Reference { referent, .. } => ty = *referent,
            _ => return ty,
        }
    }
}
