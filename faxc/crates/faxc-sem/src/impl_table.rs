//! Maps a [`TypeId`] to the functions, consts, and methods available on it
//! (§3.6). Inherent and trait impls differ only in whether the impl's
//! `trait_ref` is set; both register into the same per-type entry so method
//! lookup doesn't care which kind supplied a member.
//!
//! Array types get a synthesized `len(&self) -> usize` without ever being
//! registered explicitly — there's one array type per `(element, size)`
//! pair, so materializing a real entry per array `TypeId` would just
//! duplicate the same method everywhere. `str` gets its predefined methods
//! the same way, installed once at construction.

use crate::hir::{ConstId, FunctionId, MethodId, SelfMode};
use crate::types::{Primitive, Type, TypeContext, TypeId};
use faxc_util::{FxHashMap, FxHashSet, Symbol};

/// A method resolvable on some type, independent of where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedMethodId {
    /// `str::len(&self) -> usize`, also reachable as `String::len`.
    StrLen,
    /// `[T; N]::len(&self) -> usize`, synthesized for every array type.
    ArrayLen,
    /// `u32::to_string(&self) -> String`
    U32ToString,
    /// `usize::to_string(&self) -> String`
    UsizeToString,
    /// `String::as_str(&self) -> String` (this type system has no separate
    /// `&str` slice type; the predefined method exists for surface
    /// compatibility and returns the same `String` primitive).
    StringAsStr,
    /// `String::as_mut_str(&mut self) -> String`, same rationale as `as_str`.
    StringAsMutStr,
    /// `String::append(&mut self, other: String)`
    StringAppend,
}

/// A builtin free function, resolved by callee name rather than through a
/// user `FunctionId` — `print`, `println`, `printInt`, `printlnInt`,
/// `getString`, `getInt`, `exit` (§2: the predefined free-function/method
/// table is taken verbatim from the original as the authoritative builtin
/// surface). The checker recognizes these the same way it already recognized
/// `exit`, by matching the raw, never-resolved callee identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredefinedFunctionId {
    Print,
    Println,
    PrintInt,
    PrintlnInt,
    GetString,
    GetInt,
    Exit,
}

/// Fixed params/ret shape of a predefined free function.
pub struct PredefinedFnSig {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

/// Fixed self-mode/params/ret shape of a predefined method, resolved once at
/// `with_predefined` time against the primitive `TypeId`s already interned.
pub struct PredefinedSig {
    pub self_mode: SelfMode,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodEntry {
    User(MethodId),
    Predefined(PredefinedMethodId),
}

#[derive(Default)]
pub struct ImplEntry {
    pub functions: FxHashMap<Symbol, FunctionId>,
    pub consts: FxHashMap<Symbol, ConstId>,
    pub methods: FxHashMap<Symbol, MethodEntry>,
    pub recorded_names: FxHashSet<Symbol>,
}

impl ImplEntry {
    fn record(&mut self, name: Symbol) -> bool {
        self.recorded_names.insert(name)
    }
}

pub struct ImplTable {
    entries: FxHashMap<TypeId, ImplEntry>,
    predefined_sigs: FxHashMap<PredefinedMethodId, PredefinedSig>,
    predefined_fns: FxHashMap<Symbol, PredefinedFunctionId>,
    predefined_fn_sigs: FxHashMap<PredefinedFunctionId, PredefinedFnSig>,
}

impl ImplTable {
    /// Builds an empty table and installs predefined primitive methods
    /// (§3.6): `str`/`String::len`, `String::as_str`, `String::append`,
    /// `u32`/`usize::to_string`. `[T; N]::len` is handled specially in
    /// `lookup_method` instead of being registered here, since there is one
    /// array `TypeId` per `(element, size)` pair.
    pub fn with_predefined(ctx: &mut TypeContext) -> Self {
        let mut table = ImplTable {
            entries: FxHashMap::default(),
            predefined_sigs: FxHashMap::default(),
            predefined_fns: FxHashMap::default(),
            predefined_fn_sigs: FxHashMap::default(),
        };

        let string_ty = ctx.primitive(Primitive::String);
        let u32_ty = ctx.primitive(Primitive::U32);
        let usize_ty = ctx.primitive(Primitive::Usize);
        let i32_ty = ctx.primitive(Primitive::I32);
        let unit_ty = ctx.unit();

        table.install(string_ty, "len", PredefinedMethodId::StrLen, SelfMode::Ref, vec![], usize_ty);
        table.install(string_ty, "as_str", PredefinedMethodId::StringAsStr, SelfMode::Ref, vec![], string_ty);
        table.install(
            string_ty,
            "as_mut_str",
            PredefinedMethodId::StringAsMutStr,
            SelfMode::RefMut,
            vec![],
            string_ty,
        );
        table.install(
            string_ty,
            "append",
            PredefinedMethodId::StringAppend,
            SelfMode::RefMut,
            vec![string_ty],
            unit_ty,
        );
        table.install(u32_ty, "to_string", PredefinedMethodId::U32ToString, SelfMode::Ref, vec![], string_ty);
        table.install(
            usize_ty,
            "to_string",
            PredefinedMethodId::UsizeToString,
            SelfMode::Ref,
            vec![],
            string_ty,
        );

        // Not tied to any one `ty` (there's no single array TypeId), but the
        // checker still needs a signature to validate arg count/self-mode.
        table.predefined_sigs.insert(
            PredefinedMethodId::ArrayLen,
            PredefinedSig { self_mode: SelfMode::Ref, params: vec![], ret: usize_ty },
        );

        table.install_fn("print", PredefinedFunctionId::Print, vec![string_ty], unit_ty);
        table.install_fn("println", PredefinedFunctionId::Println, vec![string_ty], unit_ty);
        table.install_fn("printInt", PredefinedFunctionId::PrintInt, vec![i32_ty], unit_ty);
        table.install_fn("printlnInt", PredefinedFunctionId::PrintlnInt, vec![i32_ty], unit_ty);
        table.install_fn("getString", PredefinedFunctionId::GetString, vec![], string_ty);
        table.install_fn("getInt", PredefinedFunctionId::GetInt, vec![], i32_ty);
        table.install_fn("exit", PredefinedFunctionId::Exit, vec![i32_ty], unit_ty);

        table
    }

    fn install_fn(&mut self, name: &str, id: PredefinedFunctionId, params: Vec<TypeId>, ret: TypeId) {
        let name = Symbol::intern(name);
        self.predefined_fns.insert(name, id);
        self.predefined_fn_sigs.insert(id, PredefinedFnSig { params, ret });
    }

    /// Looks up a callee name against the builtin free-function surface
    /// (`print`, `println`, `printInt`, `printlnInt`, `getString`, `getInt`,
    /// `exit`). None of these are ever bound by name resolution, so the
    /// checker calls this directly against the raw, unresolved callee name.
    pub fn lookup_predefined_function(&self, name: Symbol) -> Option<PredefinedFunctionId> {
        self.predefined_fns.get(&name).copied()
    }

    pub fn predefined_function_signature(&self, id: PredefinedFunctionId) -> &PredefinedFnSig {
        self.predefined_fn_sigs
            .get(&id)
            .expect("every PredefinedFunctionId is installed in with_predefined")
    }

    fn install(
        &mut self,
        ty: TypeId,
        name: &str,
        id: PredefinedMethodId,
        self_mode: SelfMode,
        params: Vec<TypeId>,
        ret: TypeId,
    ) {
        let name = Symbol::intern(name);
        let entry = self.entries.entry(ty).or_default();
        entry.record(name);
        entry.methods.insert(name, MethodEntry::Predefined(id));
        self.predefined_sigs.insert(id, PredefinedSig { self_mode, params, ret });
    }

    /// Signature of a predefined method, for the expression checker's
    /// arg-count/arg-type/self-mode validation (§4.4 "Method call").
    /// `ArrayLen`'s `ret` is fixed `usize` regardless of which array
    /// `TypeId` it was looked up on.
    pub fn predefined_signature(&self, id: PredefinedMethodId) -> &PredefinedSig {
        self.predefined_sigs
            .get(&id)
            .expect("every PredefinedMethodId is installed in with_predefined")
    }

    fn entry_mut(&mut self, ty: TypeId) -> &mut ImplEntry {
        self.entries.entry(ty).or_default()
    }

    /// Registers a method under `ty`. Returns `false` if `name` was already
    /// recorded for `ty` (duplicate impl item — caller raises the error).
    pub fn register_method(&mut self, ty: TypeId, name: Symbol, method: MethodId) -> bool {
        let entry = self.entry_mut(ty);
        if !entry.record(name) {
            return false;
        }
        entry.methods.insert(name, MethodEntry::User(method));
        true
    }

    pub fn register_function(&mut self, ty: TypeId, name: Symbol, func: FunctionId) -> bool {
        let entry = self.entry_mut(ty);
        if !entry.record(name) {
            return false;
        }
        entry.functions.insert(name, func);
        true
    }

    pub fn register_const(&mut self, ty: TypeId, name: Symbol, konst: ConstId) -> bool {
        let entry = self.entry_mut(ty);
        if !entry.record(name) {
            return false;
        }
        entry.consts.insert(name, konst);
        true
    }

    pub fn lookup_method(&self, ctx: &TypeContext, ty: TypeId, name: Symbol) -> Option<MethodEntry> {
        if matches!(ctx.resolve(ty), Type::Array { .. }) && name.eq_str("len") {
            return Some(MethodEntry::Predefined(PredefinedMethodId::ArrayLen));
        }
        self.entries.get(&ty).and_then(|e| e.methods.get(&name)).copied()
    }

    pub fn lookup_function(&self, ty: TypeId, name: Symbol) -> Option<FunctionId> {
        self.entries.get(&ty).and_then(|e| e.functions.get(&name)).copied()
    }

    pub fn lookup_const(&self, ty: TypeId, name: Symbol) -> Option<ConstId> {
        self.entries.get(&ty).and_then(|e| e.consts.get(&name)).copied()
    }
}
