//! The high-level IR: one-to-one with the surface syntax, but with every
//! name use, type annotation, and control-flow exit point rewritten in place
//! as later passes resolve them.
//!
//! `Program` owns every item in flat, typed-index vectors (`functions`,
//! `methods`, `structs`, ...); everything else — locals, expressions, impl
//! membership — refers back into those vectors by stable index rather than
//! by direct ownership, so a cross-reference never needs the referent to be
//! moved or cloned once constructed.

use crate::types::TypeId;
use faxc_util::{define_idx, DefId, Span, Symbol};
use std::collections::HashSet;

define_idx!(FunctionId);
define_idx!(MethodId);
define_idx!(StructId);
define_idx!(EnumId);
define_idx!(ConstId);
define_idx!(TraitId);
define_idx!(ImplId);
define_idx!(LocalId);
define_idx!(LoopId);

/// A top-level item. Methods are not top-level (they live inside an
/// `ImplItem`'s member list) but everything else named in the item sum is.
#[derive(Debug, Clone, Copy)]
pub enum Item {
    Function(FunctionId),
    StructDef(StructId),
    EnumDef(EnumId),
    ConstDef(ConstId),
    Trait(TraitId),
    Impl(ImplId),
}

/// Identifies the enclosing function or method a `return` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuncTarget {
    Function(FunctionId),
    Method(MethodId),
}

pub struct Program {
    pub functions: Vec<FnItem>,
    pub methods: Vec<MethodItem>,
    pub structs: Vec<StructItem>,
    pub enums: Vec<EnumItem>,
    pub consts: Vec<ConstItem>,
    pub traits: Vec<TraitItem>,
    pub impls: Vec<ImplItem>,
    pub items: Vec<Item>,
}

impl Program {
    pub fn new() -> Self {
        Program {
            functions: Vec::new(),
            methods: Vec::new(),
            structs: Vec::new(),
            enums: Vec::new(),
            consts: Vec::new(),
            traits: Vec::new(),
            impls: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn function(&self, id: FunctionId) -> &FnItem {
        &self.functions[id.0 as usize]
    }
    pub fn function_mut(&mut self, id: FunctionId) -> &mut FnItem {
        &mut self.functions[id.0 as usize]
    }
    pub fn method(&self, id: MethodId) -> &MethodItem {
        &self.methods[id.0 as usize]
    }
    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodItem {
        &mut self.methods[id.0 as usize]
    }
    pub fn struct_def(&self, id: StructId) -> &StructItem {
        &self.structs[id.0 as usize]
    }
    pub fn enum_def(&self, id: EnumId) -> &EnumItem {
        &self.enums[id.0 as usize]
    }
    pub fn const_def(&self, id: ConstId) -> &ConstItem {
        &self.consts[id.0 as usize]
    }
    pub fn const_def_mut(&mut self, id: ConstId) -> &mut ConstItem {
        &mut self.consts[id.0 as usize]
    }
    pub fn trait_def(&self, id: TraitId) -> &TraitItem {
        &self.traits[id.0 as usize]
    }
    pub fn impl_def(&self, id: ImplId) -> &ImplItem {
        &self.impls[id.0 as usize]
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// A local variable or parameter, owned by the function/method body it
/// appears in. Introduced either as a parameter or by a `let`/pattern
/// binding; `ty` starts `Underscore`-shaped and is filled in by
/// `bind_pattern_type`.
#[derive(Debug, Clone)]
pub struct LocalDef {
    pub name: Symbol,
    pub is_mutable: bool,
    pub ty: TypeAnnotation,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FnItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub params: Vec<LocalId>,
    pub ret_type: TypeAnnotation,
    pub locals: Vec<LocalDef>,
    pub body: Block,
    pub span: Span,
}

/// `self`-taking mode of a method receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfMode {
    Value,
    Ref,
    RefMut,
}

#[derive(Debug, Clone)]
pub struct MethodItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub self_mode: SelfMode,
    pub params: Vec<LocalId>,
    pub ret_type: TypeAnnotation,
    pub locals: Vec<LocalDef>,
    pub body: Block,
    pub span: Span,
    pub owning_impl: ImplId,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: TypeAnnotation,
}

#[derive(Debug, Clone)]
pub struct StructItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub fields: Vec<FieldDef>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum VariantData {
    Unit,
    Tuple(Vec<TypeAnnotation>),
    Struct(Vec<FieldDef>),
}

#[derive(Debug, Clone)]
pub struct VariantDef {
    pub def_id: DefId,
    pub name: Symbol,
    pub data: VariantData,
}

#[derive(Debug, Clone)]
pub struct EnumItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub variants: Vec<VariantDef>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ConstItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub ty: TypeAnnotation,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TraitFnSig {
    pub def_id: DefId,
    pub name: Symbol,
    pub self_mode: Option<SelfMode>,
    pub param_types: Vec<TypeAnnotation>,
    pub ret_type: TypeAnnotation,
}

#[derive(Debug, Clone)]
pub enum TraitItemKind {
    Method(TraitFnSig),
    Const(Symbol, TypeAnnotation),
}

#[derive(Debug, Clone)]
pub struct TraitItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub items: Vec<TraitItemKind>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ImplItemKind {
    Method(MethodId),
    Const(ConstId),
}

#[derive(Debug, Clone)]
pub struct ImplItem {
    pub self_ty: TypeAnnotation,
    pub trait_ref: Option<DefId>,
    pub items: Vec<ImplItemKind>,
    pub span: Span,
}

/// A syntactic type as written by the user, rewritten in place to
/// `Resolved` by `type_query` (§4.3). `Array`'s size is a plain `usize` —
/// the surface grammar requires array sizes to already be literal-folded by
/// the parser, so no nested const-expr lives on the annotation itself.
#[derive(Debug, Clone)]
pub enum TypeAnnotation {
    Unresolved(UnresolvedType),
    Resolved(TypeId),
}

#[derive(Debug, Clone)]
pub enum UnresolvedType {
    Name(Symbol),
    Reference(Box<TypeAnnotation>, bool),
    Array(Box<TypeAnnotation>, usize),
    Unit,
    Underscore,
}

impl TypeAnnotation {
    pub fn resolved(&self) -> Option<TypeId> {
        match self {
            TypeAnnotation::Resolved(id) => Some(*id),
            TypeAnnotation::Unresolved(_) => None,
        }
    }
}

/// Evaluated constant values (§3.5). Produced only by the const evaluator
/// and memoised per expression address in `SemanticContext::const_cache`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstVariant {
    IntConst(i32),
    UintConst(u32),
    BoolConst(bool),
    CharConst(char),
    StringConst(Symbol),
}

/// Why control reaches the end of an expression (§3.4). An expression whose
/// endpoint set contains anything other than `Normal` alone has type
/// `Never` (Invariant 3, §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Normal,
    Break {
        target: Option<LoopId>,
        value_type: TypeId,
    },
    Continue {
        target: Option<LoopId>,
    },
    Return {
        target: Option<FuncTarget>,
        value_type: TypeId,
    },
}

/// The semantic payload attached to a checked expression (§3.4). `None`
/// until the expression checker visits the node for the first time.
#[derive(Debug, Clone)]
pub struct ExprInfo {
    pub ty: TypeId,
    pub has_type: bool,
    pub is_mut: bool,
    pub is_place: bool,
    pub endpoints: HashSet<Endpoint>,
    pub const_value: Option<ConstVariant>,
}

impl ExprInfo {
    pub fn normal(ty: TypeId) -> Self {
        let mut endpoints = HashSet::new();
        endpoints.insert(Endpoint::Normal);
        ExprInfo {
            ty,
            has_type: true,
            is_mut: false,
            is_place: false,
            endpoints,
            const_value: None,
        }
    }

    pub fn is_never_only(&self) -> bool {
        !self.endpoints.contains(&Endpoint::Normal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnOp {
    Neg,
    Not,
    Deref,
    Ref(bool),
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int { value: i64, negative: bool },
    Bool(bool),
    Char(char),
    String(Symbol),
    Unit,
}

/// A name use, progressively rewritten by name resolution (§4.2) and the
/// expression checker's auto-ref/auto-deref/method-resolution desugarings
/// (§4.4).
#[derive(Debug, Clone)]
pub enum NameUse {
    UnresolvedIdentifier(Symbol),
    Variable(LocalId),
    ConstUse(ConstId),
    FuncUse(FunctionId),
    EnumVariant { def_ref: EnumId, index: usize },
    StructConst { def_ref: StructId, assoc_const: ConstId },
    StructStatic { def_ref: StructId, assoc_fn: FunctionId },
}

/// Two-segment `A::B` surfaces as this before resolution rewrites it into a
/// `NameUse` variant (§4.1, §4.2).
#[derive(Debug, Clone)]
pub struct TypeStatic {
    pub ty_name: Symbol,
    pub member_name: Symbol,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub info: Option<ExprInfo>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            info: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Name(NameUse),
    TypeStatic(TypeStatic),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `method` starts `None` and is filled with the resolved entry once the
    /// receiver's impl-table lookup succeeds (§4.4 "Method call").
    MethodCall {
        receiver: Box<Expr>,
        method_name: Symbol,
        method: Option<MethodRef>,
        args: Vec<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: FieldRef,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Block(Block),
    If {
        cond: Box<Expr>,
        then_branch: Block,
        else_branch: Option<Box<Expr>>,
    },
    Loop {
        id: LoopId,
        body: Block,
        break_type: Option<TypeId>,
    },
    While {
        id: LoopId,
        cond: Box<Expr>,
        body: Block,
    },
    Assign {
        place: Box<Expr>,
        value: Box<Expr>,
    },
    Cast {
        operand: Box<Expr>,
        target: TypeAnnotation,
    },
    /// `def_ref` starts as a placeholder (`StructId(u32::MAX)`) and is
    /// patched to the real struct once name resolution looks `name` up;
    /// `name` survives resolution too, since diagnostics want it by then.
    StructLiteral {
        def_ref: StructId,
        name: Symbol,
        fields: Vec<(Symbol, Expr)>,
    },
    ArrayLiteral(Vec<Expr>),
    ArrayRepeat {
        value: Box<Expr>,
        count: Box<Expr>,
    },
    Break {
        value: Option<Box<Expr>>,
        target: Option<LoopId>,
    },
    Continue {
        target: Option<LoopId>,
    },
    Return {
        value: Option<Box<Expr>>,
        target: Option<FuncTarget>,
    },
}

/// A field access, initially just the surface name; the checker rewrites it
/// to `Resolved` once the base's struct type supplies a field index.
#[derive(Debug, Clone)]
pub enum FieldRef {
    Name(Symbol),
    Resolved(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodRef {
    User(MethodId),
    Predefined(crate::impl_table::PredefinedMethodId),
}

#[derive(Debug, Clone)]
pub enum LocalRef {
    Resolved(LocalId),
    Unresolved {
        name: Symbol,
        is_mut: bool,
        is_ref: bool,
    },
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard,
    BindingDef(LocalRef),
    ReferencePattern {
        subpattern: Box<Pattern>,
        is_mutable: bool,
    },
}

#[derive(Debug, Clone)]
pub struct LetStmt {
    pub pattern: Pattern,
    pub ty: Option<TypeAnnotation>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let(LetStmt),
    Expr(Expr),
    Item(Item),
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub trailing: Option<Box<Expr>>,
    pub span: Span,
    pub info: Option<ExprInfo>,
}
