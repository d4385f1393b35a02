//! HIR → MIR lowering (§4.8). One [`FnLower`] per function/method body;
//! [`lower_program`] drives all of them and assembles the module's builtin
//! [`ExternalFunction`] table on demand.
//!
//! The operand/place/init split follows §4.8.2: `lower_operand` always
//! produces a usable value, `lower_place` always produces an addressable
//! `Place` (materializing a temporary local when the expression isn't
//! already one), and `lower_init` writes a value directly into a caller-
//! supplied destination, skipping the temp-then-copy round trip for
//! aggregates. A `None` `Builder::current_block` after any of these means
//! the expression diverged — callers just stop sequencing (Invariant 5).

use faxc_sem::hir::{
    self, Block, ConstVariant, Expr, ExprKind, LetStmt, Literal, LocalId as HirLocalId, LoopId, NameUse, Pattern, SelfMode, Stmt,
};
use faxc_sem::impl_table::{PredefinedFunctionId, PredefinedMethodId};
use faxc_sem::types::Type;
use faxc_sem::{Context, Program, SemanticError, SemanticResult, TypeId};
use faxc_util::{FxHashMap, Span, Symbol};

use crate::builder::{classify_signature, is_aggregate, Builder};
use crate::mir::{
    AbiAlias, AbiParam, BinOp, Call, CallResult, Constant, ExternalFunction, ExternalFunctionId, FunctionRef, InitLeaf, InitPattern, LocalId,
    MirFunction, MirFunctionId, MirFunctionSig, MirModule, Operand, Phi, Place, RValue, ReturnDesc, Statement, Terminator, UnOp,
};

/// Per-callee-shape facts computed once, before any function body is
/// lowered, so call sites never need to know lowering order.
#[derive(Clone)]
struct CallSig {
    abi_params: Vec<AbiParam>,
    ret: TypeId,
}

/// Cross-function lowering context: every internal function/method's
/// `MirFunctionId` and signature, plus lazily-populated external entries for
/// the predefined (builtin) surface (§2, §4.8.4).
#[derive(Default)]
struct FunctionRefs {
    functions: FxHashMap<hir::FunctionId, MirFunctionId>,
    function_sigs: FxHashMap<hir::FunctionId, CallSig>,
    methods: FxHashMap<hir::MethodId, MirFunctionId>,
    method_sigs: FxHashMap<hir::MethodId, CallSig>,
    predefined_fns: FxHashMap<PredefinedFunctionId, ExternalFunctionId>,
    predefined_fn_sigs: FxHashMap<PredefinedFunctionId, CallSig>,
    predefined_methods: FxHashMap<PredefinedMethodId, ExternalFunctionId>,
    predefined_method_sigs: FxHashMap<PredefinedMethodId, CallSig>,
}

/// Where a function's return value goes (§4.8.1, computed once per
/// function from its ABI classification).
enum ReturnPlan {
    /// Aggregate return: write the result into this local, which the
    /// `SRet` ABI parameter aliases (possibly via NRVO onto an existing
    /// `let`-bound local rather than a synthesized one).
    Sret(LocalId),
    Direct,
    Void,
    Never,
}

struct LoopCtx {
    id: LoopId,
    continue_block: crate::mir::BlockId,
    break_block: crate::mir::BlockId,
    incoming: Vec<(crate::mir::BlockId, Operand)>,
}

/// Either a value ready to read, or confirmation that it was already
/// written into the destination the caller supplied.
enum ValuePlace {
    Operand(Operand),
    Written,
}

struct FnLower<'a> {
    ctx: &'a mut Context,
    refs: &'a mut FunctionRefs,
    builder: Builder,
    locals: Vec<LocalId>,
    return_plan: ReturnPlan,
    loops: Vec<LoopCtx>,
}

/// Lowers every function and method in `program` into a [`MirModule`]
/// (§6.1). `ctx` is threaded mutably through lowering because a handful of
/// ABI-plumbing cases (taking the address of a caller-materialized
/// by-value-aggregate argument copy) need a reference `TypeId` that no
/// source-level expression already resolved, and interning one is the only
/// way to get it.
pub fn lower_program(program: &Program, ctx: &mut Context) -> SemanticResult<MirModule> {
    let mut refs = FunctionRefs::default();

    for i in 0..program.functions.len() {
        let id = hir::FunctionId(i as u32);
        let sig = ctx.function_sig(id).clone();
        let abi_params = classify_signature(ctx, &sig.params, sig.ret).abi_params;
        refs.functions.insert(id, MirFunctionId(i as u32));
        refs.function_sigs.insert(id, CallSig { abi_params, ret: sig.ret });
    }
    for i in 0..program.methods.len() {
        let id = hir::MethodId(i as u32);
        let sig = ctx.method_sig(id).clone();
        let abi_params = classify_signature(ctx, &sig.params, sig.ret).abi_params;
        refs.methods.insert(id, MirFunctionId((program.functions.len() + i) as u32));
        refs.method_sigs.insert(id, CallSig { abi_params, ret: sig.ret });
    }

    let mut module = MirModule::new();

    for (i, func) in program.functions.iter().enumerate() {
        let id = MirFunctionId(i as u32);
        let hir_id = hir::FunctionId(i as u32);
        let mir_func = lower_function_item(func, hir_id, id, ctx, &mut refs)?;
        module.functions.push(mir_func);
    }
    for (i, method) in program.methods.iter().enumerate() {
        let id = MirFunctionId((program.functions.len() + i) as u32);
        let hir_id = hir::MethodId(i as u32);
        let mir_func = lower_method_item(method, hir_id, id, ctx, &mut refs)?;
        module.functions.push(mir_func);
    }

    module.external_functions = collect_externals(&refs);
    Ok(module)
}

fn collect_externals(refs: &FunctionRefs) -> Vec<ExternalFunction> {
    let total = refs.predefined_fns.len() + refs.predefined_methods.len();
    let mut slots: Vec<Option<ExternalFunction>> = Vec::new();
    slots.resize_with(total, || None);

    for (id, ext_id) in &refs.predefined_fns {
        let sig = &refs.predefined_fn_sigs[id];
        let name = Symbol::intern(predefined_function_name(*id));
        let mir_sig = MirFunctionSig { logical_params: Vec::new(), abi_params: sig.abi_params.clone(), ret: ReturnDesc::RetDirect(sig.ret) };
        slots[ext_id.0 as usize] = Some(ExternalFunction { name, sig: mir_sig });
    }
    for (id, ext_id) in &refs.predefined_methods {
        let sig = &refs.predefined_method_sigs[id];
        let name = Symbol::intern(predefined_method_name(*id));
        let mir_sig = MirFunctionSig { logical_params: Vec::new(), abi_params: sig.abi_params.clone(), ret: ReturnDesc::RetDirect(sig.ret) };
        slots[ext_id.0 as usize] = Some(ExternalFunction { name, sig: mir_sig });
    }

    slots.into_iter().flatten().collect()
}

fn predefined_function_name(id: PredefinedFunctionId) -> &'static str {
    match id {
        PredefinedFunctionId::Print => "print",
        PredefinedFunctionId::Println => "println",
        PredefinedFunctionId::PrintInt => "printInt",
        PredefinedFunctionId::PrintlnInt => "printlnInt",
        PredefinedFunctionId::GetString => "getString",
        PredefinedFunctionId::GetInt => "getInt",
        PredefinedFunctionId::Exit => "exit",
    }
}

fn predefined_method_name(id: PredefinedMethodId) -> &'static str {
    match id {
        PredefinedMethodId::StrLen => "String::len",
        PredefinedMethodId::ArrayLen => "[T; N]::len",
        PredefinedMethodId::U32ToString => "u32::to_string",
        PredefinedMethodId::UsizeToString => "usize::to_string",
        PredefinedMethodId::StringAsStr => "String::as_str",
        PredefinedMethodId::StringAsMutStr => "String::as_mut_str",
        PredefinedMethodId::StringAppend => "String::append",
    }
}

fn abi_sig(ctx: &Context, params: &[TypeId], ret: TypeId) -> MirFunctionSig {
    classify_signature(ctx, params, ret)
}

/// §4.8.1: allocates one MIR local per HIR local (params occupy the
/// leading prefix, in declaration order — guaranteed by `convert.rs`),
/// picks a return plan, opens the start block, and lowers the body.
fn lower_function_item(
    func: &hir::FnItem,
    hir_id: hir::FunctionId,
    id: MirFunctionId,
    ctx: &mut Context,
    refs: &mut FunctionRefs,
) -> SemanticResult<MirFunction> {
    let sig = refs.function_sigs[&hir_id].clone();
    lower_body(func.name, &func.locals, func.params.len(), sig, &func.body, func.span, id, ctx, refs)
}

fn lower_method_item(
    method: &hir::MethodItem,
    hir_id: hir::MethodId,
    id: MirFunctionId,
    ctx: &mut Context,
    refs: &mut FunctionRefs,
) -> SemanticResult<MirFunction> {
    let sig = refs.method_sigs[&hir_id].clone();
    lower_body(method.name, &method.locals, method.params.len(), sig, &method.body, method.span, id, ctx, refs)
}

fn lower_body(
    name: Symbol,
    hir_locals: &[hir::LocalDef],
    param_count: usize,
    call_sig: CallSig,
    body: &Block,
    span: Span,
    id: MirFunctionId,
    ctx: &mut Context,
    refs: &mut FunctionRefs,
) -> SemanticResult<MirFunction> {
    let mut builder = Builder::new(span);
    let ret_ty = call_sig.ret;
    let sig = MirFunctionSig {
        logical_params: hir_locals[..param_count].iter().map(|l| l.ty.resolved().expect("params are resolved")).collect(),
        abi_params: call_sig.abi_params,
        ret: if ctx.types.is_never(ret_ty) {
            ReturnDesc::RetNever
        } else if ctx.types.is_unit(ret_ty) {
            ReturnDesc::RetVoid
        } else if is_aggregate(ctx, ret_ty) {
            ReturnDesc::RetIndirectSRet
        } else {
            ReturnDesc::RetDirect(ret_ty)
        },
    };

    // `self`, when present, occupies ABI slot 0 even though it is never a
    // named HIR local (convert.rs filters it out of `params`); nothing in
    // `hir_locals` corresponds to it, so there's no MIR local to allocate
    // for it and no body expression can ever reference it.

    let mut locals = Vec::with_capacity(hir_locals.len());
    for (i, local_def) in hir_locals.iter().enumerate() {
        let ty = local_def.ty.resolved().expect("type-checked locals always resolve");
        let alias = if i < param_count {
            match sig.abi_params.get(i) {
                Some(AbiParam::ByValCallerCopy(_)) => Some(AbiAlias::Param(i)),
                _ => None,
            }
        } else {
            None
        };
        let mir_id = builder.push_local(ty, Some(local_def.name), local_def.span, alias);
        locals.push(mir_id);
    }

    let return_plan = match sig.ret {
        ReturnDesc::RetVoid => ReturnPlan::Void,
        ReturnDesc::RetNever => ReturnPlan::Never,
        ReturnDesc::RetDirect(_) => ReturnPlan::Direct,
        ReturnDesc::RetIndirectSRet => {
            let nrvo = hir_locals[param_count..]
                .iter()
                .enumerate()
                .find(|(_, l)| l.ty.resolved() == Some(ret_ty))
                .map(|(i, _)| param_count + i);
            let local_id = match nrvo {
                Some(idx) => {
                    builder.local_mut(locals[idx]).alias = Some(AbiAlias::SRet);
                    locals[idx]
                }
                None => builder.push_local(ret_ty, Some(Symbol::intern("<return>")), span, Some(AbiAlias::SRet)),
            };
            ReturnPlan::Sret(local_id)
        }
    };

    let start = builder.new_block();
    builder.set_current_block(start);

    let mut lower = FnLower { ctx, refs, builder, locals, return_plan, loops: Vec::new() };
    lower.lower_function_body(body)?;
    let mut builder = lower.builder;

    // Only the `Sret` body path can still have an open block here — it
    // writes the trailing expression into the return slot without ever
    // terminating; every other path already terminated with `Return` inside
    // `lower_function_body`.
    if builder.current_block().is_some() {
        builder.terminate(Terminator::Return(None));
    }

    builder.finish(id, name, sig, start)
}

impl<'a> FnLower<'a> {
    fn local(&self, id: HirLocalId) -> LocalId {
        self.locals[id.0 as usize]
    }

    fn expr_ty(&self, expr: &Expr) -> TypeId {
        expr.info.as_ref().expect("checker populates ExprInfo on every expr").ty
    }

    fn internal_error(&self, span: Span, msg: &str) -> SemanticError {
        SemanticError::new(format!("internal consistency error in MIR lowering: {msg}"), span)
    }

    fn lower_function_body(&mut self, body: &Block) -> SemanticResult<()> {
        match self.return_plan {
            ReturnPlan::Sret(local) => {
                let place = Place::local(local);
                self.lower_init_block(body, &place)
            }
            _ => {
                let operand = self.lower_block_operand(body)?;
                if self.builder.current_block().is_some() {
                    self.builder.terminate(Terminator::Return(Some(operand)));
                }
                Ok(())
            }
        }
    }

    fn lower_stmts(&mut self, stmts: &[Stmt]) -> SemanticResult<()> {
        for stmt in stmts {
            if self.builder.current_block().is_none() {
                break;
            }
            match stmt {
                Stmt::Let(let_stmt) => self.lower_let(let_stmt)?,
                Stmt::Expr(e) => {
                    self.lower_operand(e)?;
                }
                Stmt::Item(_) => {}
            }
        }
        Ok(())
    }

    fn lower_let(&mut self, let_stmt: &LetStmt) -> SemanticResult<()> {
        let Some(init) = &let_stmt.init else { return Ok(()) };
        match self.pattern_place(&let_stmt.pattern)? {
            Some(place) => self.lower_init(init, &place),
            None => {
                self.lower_operand(init)?;
                Ok(())
            }
        }
    }

    fn pattern_place(&mut self, pattern: &Pattern) -> SemanticResult<Option<Place>> {
        match pattern {
            Pattern::Wildcard => Ok(None),
            Pattern::BindingDef(local_ref) => match local_ref {
                hir::LocalRef::Resolved(id) => Ok(Some(Place::local(self.local(*id)))),
                hir::LocalRef::Unresolved { .. } => {
                    unreachable!("name resolution (C3) resolves every binding before lowering")
                }
            },
            Pattern::ReferencePattern { subpattern, .. } => self.pattern_place(subpattern),
        }
    }

    fn lower_block_operand(&mut self, block: &Block) -> SemanticResult<Operand> {
        self.lower_stmts(&block.stmts)?;
        if self.builder.current_block().is_none() {
            return Ok(Operand::Constant(Constant::Unit));
        }
        match &block.trailing {
            Some(e) => self.lower_operand(e),
            None => Ok(Operand::Constant(Constant::Unit)),
        }
    }

    fn lower_block_statements_discard(&mut self, block: &Block) -> SemanticResult<()> {
        self.lower_stmts(&block.stmts)?;
        if self.builder.current_block().is_none() {
            return Ok(());
        }
        if let Some(e) = &block.trailing {
            self.lower_operand(e)?;
        }
        Ok(())
    }

    fn lower_init_block(&mut self, block: &Block, dest: &Place) -> SemanticResult<()> {
        self.lower_stmts(&block.stmts)?;
        if self.builder.current_block().is_none() {
            return Ok(());
        }
        match &block.trailing {
            Some(e) => self.lower_init(e, dest),
            None => Ok(()),
        }
    }

    // ---- operand ----------------------------------------------------

    fn lower_operand(&mut self, expr: &Expr) -> SemanticResult<Operand> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(Operand::Constant(self.lower_literal(lit, self.expr_ty(expr)))),
            ExprKind::Name(name) => self.lower_name_operand(name, expr),
            ExprKind::TypeStatic(_) => Err(self.internal_error(expr.span, "TypeStatic survived name resolution")),
            ExprKind::Binary { op, left, right } if matches!(op, hir::BinOp::And | hir::BinOp::Or) => {
                self.lower_logical(*op, left, right, self.expr_ty(expr))
            }
            ExprKind::Binary { op, left, right } => {
                let l = self.lower_operand(left)?;
                let r = self.lower_operand(right)?;
                let ty = self.expr_ty(expr);
                let temp = self.builder.push_temp(ty);
                self.builder.push_statement(Statement::Define(temp, RValue::BinaryOp(convert_binop(*op), l, r)));
                Ok(Operand::Temp(temp))
            }
            ExprKind::Unary { op: hir::UnOp::Neg, operand } => self.lower_unary(UnOp::Neg, operand, expr),
            ExprKind::Unary { op: hir::UnOp::Not, operand } => self.lower_unary(UnOp::Not, operand, expr),
            ExprKind::Unary { op: hir::UnOp::Deref, .. } => {
                let place = self.lower_place(expr)?;
                self.load_place(place, self.expr_ty(expr))
            }
            ExprKind::Unary { op: hir::UnOp::Ref(_), operand } => {
                let place = self.lower_place(operand)?;
                let ty = self.expr_ty(expr);
                let temp = self.builder.push_temp(ty);
                self.builder.push_statement(Statement::Define(temp, RValue::Ref(place)));
                Ok(Operand::Temp(temp))
            }
            ExprKind::Call { callee, args } => {
                let (func_ref, ret_ty, abi_params) = self.resolve_call_callee(callee)?;
                match self.lower_call(func_ref, ret_ty, &abi_params, args, None, expr.span)? {
                    ValuePlace::Operand(op) => Ok(op),
                    ValuePlace::Written => unreachable!("no dest_hint given"),
                }
            }
            ExprKind::MethodCall { receiver, method, args, .. } => {
                match self.lower_method_call_expr(receiver, method, args, None, expr.span)? {
                    ValuePlace::Operand(op) => Ok(op),
                    ValuePlace::Written => unreachable!("no dest_hint given"),
                }
            }
            ExprKind::Field { .. } | ExprKind::Index { .. } => {
                let place = self.lower_place(expr)?;
                self.load_place(place, self.expr_ty(expr))
            }
            ExprKind::Block(block) => self.lower_block_operand(block),
            ExprKind::If { cond, then_branch, else_branch } => {
                let ty = self.expr_ty(expr);
                self.lower_if_operand(cond, then_branch, else_branch.as_deref(), ty)
            }
            ExprKind::Loop { id, body, break_type } => self.lower_loop(*id, body, *break_type),
            ExprKind::While { id, cond, body } => self.lower_while(*id, cond, body),
            ExprKind::Assign { place, value } => self.lower_assign(place, value),
            ExprKind::Cast { operand, .. } => {
                let v = self.lower_operand(operand)?;
                let ty = self.expr_ty(expr);
                let temp = self.builder.push_temp(ty);
                self.builder.push_statement(Statement::Define(temp, RValue::Cast(crate::mir::CastKind::IntToInt, v, ty)));
                Ok(Operand::Temp(temp))
            }
            ExprKind::StructLiteral { .. } | ExprKind::ArrayLiteral(_) | ExprKind::ArrayRepeat { .. } => {
                let ty = self.expr_ty(expr);
                let local = self.builder.push_local(ty, None, expr.span, None);
                let place = Place::local(local);
                self.lower_init(expr, &place)?;
                self.load_place(place, ty)
            }
            ExprKind::Break { value, target } => {
                self.lower_break(value.as_deref(), *target)?;
                Ok(Operand::Constant(Constant::Unit))
            }
            ExprKind::Continue { target } => {
                self.lower_continue(*target);
                Ok(Operand::Constant(Constant::Unit))
            }
            ExprKind::Return { value, .. } => {
                self.lower_return(value.as_deref())?;
                Ok(Operand::Constant(Constant::Unit))
            }
        }
    }

    fn lower_unary(&mut self, op: UnOp, operand: &Expr, expr: &Expr) -> SemanticResult<Operand> {
        let v = self.lower_operand(operand)?;
        let ty = self.expr_ty(expr);
        let temp = self.builder.push_temp(ty);
        self.builder.push_statement(Statement::Define(temp, RValue::UnaryOp(op, v)));
        Ok(Operand::Temp(temp))
    }

    fn lower_literal(&self, lit: &Literal, ty: TypeId) -> Constant {
        match lit {
            Literal::Int { value, negative } => {
                let v = if *negative { -*value } else { *value };
                let signed = matches!(self.ctx.types.resolve(ty), Type::Primitive(p) if p.is_signed());
                if signed {
                    Constant::Int(v as i32)
                } else {
                    Constant::Uint(v as u32)
                }
            }
            Literal::Bool(b) => Constant::Bool(*b),
            Literal::Char(c) => Constant::Char(*c),
            Literal::String(s) => Constant::String(*s),
            Literal::Unit => Constant::Unit,
        }
    }

    fn convert_const_variant(v: &ConstVariant) -> Constant {
        match v {
            ConstVariant::IntConst(i) => Constant::Int(*i),
            ConstVariant::UintConst(u) => Constant::Uint(*u),
            ConstVariant::BoolConst(b) => Constant::Bool(*b),
            ConstVariant::CharConst(c) => Constant::Char(*c),
            ConstVariant::StringConst(s) => Constant::String(*s),
        }
    }

    fn lower_name_operand(&mut self, name: &NameUse, expr: &Expr) -> SemanticResult<Operand> {
        match name {
            NameUse::Variable(id) => {
                let place = Place::local(self.local(*id));
                self.load_place(place, self.expr_ty(expr))
            }
            NameUse::ConstUse(id) => {
                let v = self.ctx.const_value(*id).expect("C10 evaluated every const before lowering").clone();
                Ok(Operand::Constant(Self::convert_const_variant(&v)))
            }
            NameUse::StructConst { assoc_const, .. } => {
                let v = self.ctx.const_value(*assoc_const).expect("C10 evaluated every const before lowering").clone();
                Ok(Operand::Constant(Self::convert_const_variant(&v)))
            }
            NameUse::EnumVariant { index, .. } => Ok(Operand::Constant(Constant::Uint(*index as u32))),
            NameUse::FuncUse(_) | NameUse::StructStatic { .. } => {
                Err(self.internal_error(expr.span, "function name used outside call position"))
            }
            NameUse::UnresolvedIdentifier(_) => Err(self.internal_error(expr.span, "unresolved identifier reached MIR lowering")),
        }
    }

    fn load_place(&mut self, place: Place, ty: TypeId) -> SemanticResult<Operand> {
        if self.ctx.types.is_unit(ty) {
            return Ok(Operand::Constant(Constant::Unit));
        }
        let temp = self.builder.push_temp(ty);
        self.builder.push_statement(Statement::Load(temp, place));
        Ok(Operand::Temp(temp))
    }

    fn lower_logical(&mut self, op: hir::BinOp, left: &Expr, right: &Expr, ty: TypeId) -> SemanticResult<Operand> {
        let lhs = self.lower_operand(left)?;
        let pred = self.builder.current_block().expect("reachable before evaluating lhs");
        let rhs_block = self.builder.new_block();
        let join_block = self.builder.new_block();
        let (then_target, else_target, short_value) = match op {
            hir::BinOp::And => (rhs_block, join_block, Constant::Bool(false)),
            hir::BinOp::Or => (join_block, rhs_block, Constant::Bool(true)),
            _ => unreachable!("only And/Or short-circuit"),
        };
        self.builder.terminate(Terminator::SwitchInt { discriminant: lhs, targets: vec![(1, then_target)], otherwise: else_target });

        self.builder.set_current_block(rhs_block);
        let rhs = self.lower_operand(right)?;
        let rhs_end = self.builder.current_block();
        if rhs_end.is_some() {
            self.builder.terminate(Terminator::Goto(join_block));
        }

        self.builder.set_current_block(join_block);
        let result = self.builder.push_temp(ty);
        let mut incoming = vec![(pred, Operand::Constant(short_value))];
        if let Some(end) = rhs_end {
            incoming.push((end, rhs));
        }
        self.builder.push_phi(join_block, Phi { dest: result, ty, incoming });
        Ok(Operand::Temp(result))
    }

    fn lower_if_operand(&mut self, cond: &Expr, then_branch: &Block, else_branch: Option<&Expr>, ty: TypeId) -> SemanticResult<Operand> {
        let cond_operand = self.lower_operand(cond)?;
        let then_block = self.builder.new_block();
        let else_block = self.builder.new_block();
        self.builder.terminate(Terminator::SwitchInt { discriminant: cond_operand, targets: vec![(1, then_block)], otherwise: else_block });

        let mut join_block = None;
        let mut incoming = Vec::new();

        self.builder.set_current_block(then_block);
        let then_val = self.lower_block_operand(then_branch)?;
        if let Some(end) = self.builder.current_block() {
            let j = *join_block.get_or_insert_with(|| self.builder.new_block());
            self.builder.terminate(Terminator::Goto(j));
            incoming.push((end, then_val));
        }

        self.builder.set_current_block(else_block);
        let else_val = match else_branch {
            Some(e) => self.lower_operand(e)?,
            None => Operand::Constant(Constant::Unit),
        };
        if let Some(end) = self.builder.current_block() {
            let j = *join_block.get_or_insert_with(|| self.builder.new_block());
            self.builder.terminate(Terminator::Goto(j));
            incoming.push((end, else_val));
        }

        match join_block {
            None => Ok(Operand::Constant(Constant::Unit)),
            Some(j) => {
                self.builder.set_current_block(j);
                if self.ctx.types.is_unit(ty) {
                    Ok(Operand::Constant(Constant::Unit))
                } else if incoming.len() == 1 {
                    Ok(incoming.into_iter().next().unwrap().1)
                } else {
                    let result = self.builder.push_temp(ty);
                    self.builder.push_phi(j, Phi { dest: result, ty, incoming });
                    Ok(Operand::Temp(result))
                }
            }
        }
    }

    fn lower_if_init(&mut self, cond: &Expr, then_branch: &Block, else_branch: Option<&Expr>, dest: &Place) -> SemanticResult<()> {
        let cond_operand = self.lower_operand(cond)?;
        let then_block = self.builder.new_block();
        let else_block = self.builder.new_block();
        self.builder.terminate(Terminator::SwitchInt { discriminant: cond_operand, targets: vec![(1, then_block)], otherwise: else_block });

        let mut join_block = None;

        self.builder.set_current_block(then_block);
        self.lower_init_block(then_branch, dest)?;
        if self.builder.current_block().is_some() {
            let j = *join_block.get_or_insert_with(|| self.builder.new_block());
            self.builder.terminate(Terminator::Goto(j));
        }

        self.builder.set_current_block(else_block);
        if let Some(e) = else_branch {
            self.lower_init(e, dest)?;
        }
        if self.builder.current_block().is_some() {
            let j = *join_block.get_or_insert_with(|| self.builder.new_block());
            self.builder.terminate(Terminator::Goto(j));
        }

        match join_block {
            Some(j) => self.builder.set_current_block(j),
            None => self.builder.clear_current(),
        }
        Ok(())
    }

    fn lower_loop(&mut self, loop_id: LoopId, body: &Block, break_type: Option<TypeId>) -> SemanticResult<Operand> {
        let body_block = self.builder.new_block();
        let break_block = self.builder.new_block();
        self.builder.terminate(Terminator::Goto(body_block));
        self.builder.set_current_block(body_block);

        self.loops.push(LoopCtx { id: loop_id, continue_block: body_block, break_block, incoming: Vec::new() });
        self.lower_block_statements_discard(body)?;
        if self.builder.current_block().is_some() {
            self.builder.terminate(Terminator::Goto(body_block));
        }
        let loop_ctx = self.loops.pop().expect("pushed above");

        match break_type {
            None => {
                self.builder.force_terminate(break_block, Terminator::Goto(break_block));
                self.builder.clear_current();
                Ok(Operand::Constant(Constant::Unit))
            }
            Some(ty) => {
                self.builder.set_current_block(break_block);
                if self.ctx.types.is_unit(ty) || loop_ctx.incoming.len() == 1 {
                    Ok(loop_ctx.incoming.into_iter().next().map(|(_, v)| v).unwrap_or(Operand::Constant(Constant::Unit)))
                } else {
                    let result = self.builder.push_temp(ty);
                    self.builder.push_phi(break_block, Phi { dest: result, ty, incoming: loop_ctx.incoming });
                    Ok(Operand::Temp(result))
                }
            }
        }
    }

    fn lower_while(&mut self, loop_id: LoopId, cond: &Expr, body: &Block) -> SemanticResult<Operand> {
        let cond_block = self.builder.new_block();
        let body_block = self.builder.new_block();
        let break_block = self.builder.new_block();
        self.builder.terminate(Terminator::Goto(cond_block));

        self.builder.set_current_block(cond_block);
        let cond_operand = self.lower_operand(cond)?;
        self.builder.terminate(Terminator::SwitchInt { discriminant: cond_operand, targets: vec![(1, body_block)], otherwise: break_block });

        self.builder.set_current_block(body_block);
        self.loops.push(LoopCtx { id: loop_id, continue_block: cond_block, break_block, incoming: Vec::new() });
        self.lower_block_statements_discard(body)?;
        if self.builder.current_block().is_some() {
            self.builder.terminate(Terminator::Goto(cond_block));
        }
        self.loops.pop();

        self.builder.set_current_block(break_block);
        Ok(Operand::Constant(Constant::Unit))
    }

    fn find_loop_index(&self, target: Option<LoopId>) -> usize {
        match target {
            Some(id) => self.loops.iter().rposition(|l| l.id == id).unwrap_or(self.loops.len() - 1),
            None => self.loops.len() - 1,
        }
    }

    fn lower_break(&mut self, value: Option<&Expr>, target: Option<LoopId>) -> SemanticResult<()> {
        let idx = self.find_loop_index(target);
        let break_block = self.loops[idx].break_block;
        let operand = match value {
            Some(v) => self.lower_operand(v)?,
            None => Operand::Constant(Constant::Unit),
        };
        if let Some(pred) = self.builder.current_block() {
            self.loops[idx].incoming.push((pred, operand));
            self.builder.terminate(Terminator::Goto(break_block));
        }
        Ok(())
    }

    fn lower_continue(&mut self, target: Option<LoopId>) {
        let idx = self.find_loop_index(target);
        let continue_block = self.loops[idx].continue_block;
        self.builder.terminate(Terminator::Goto(continue_block));
    }

    fn lower_return(&mut self, value: Option<&Expr>) -> SemanticResult<()> {
        match self.return_plan {
            ReturnPlan::Sret(local) => {
                let place = Place::local(local);
                if let Some(v) = value {
                    self.lower_init(v, &place)?;
                }
                self.builder.terminate(Terminator::Return(None));
            }
            ReturnPlan::Direct | ReturnPlan::Void | ReturnPlan::Never => {
                let operand = match value {
                    Some(v) => Some(self.lower_operand(v)?),
                    None => None,
                };
                self.builder.terminate(Terminator::Return(operand));
            }
        }
        Ok(())
    }

    fn lower_assign(&mut self, place_expr: &Expr, value_expr: &Expr) -> SemanticResult<Operand> {
        let dest = self.lower_place(place_expr)?;
        let value_ty = self.expr_ty(value_expr);
        if is_aggregate(self.ctx, value_ty) && is_place_expr(value_expr) {
            let src = self.lower_place(value_expr)?;
            self.builder.push_statement(Statement::Init(dest, InitPattern::Copy { src }));
        } else {
            self.lower_init(value_expr, &dest)?;
        }
        Ok(Operand::Constant(Constant::Unit))
    }

    // ---- place --------------------------------------------------------

    fn lower_place(&mut self, expr: &Expr) -> SemanticResult<Place> {
        match &expr.kind {
            ExprKind::Name(NameUse::Variable(id)) => Ok(Place::local(self.local(*id))),
            ExprKind::Field { base, field } => {
                let base_place = self.lower_place(base)?;
                match field {
                    hir::FieldRef::Resolved(idx) => Ok(base_place.field(*idx as u32)),
                    hir::FieldRef::Name(_) => Err(self.internal_error(expr.span, "unresolved field access reached MIR lowering")),
                }
            }
            ExprKind::Index { base, index } => {
                let base_place = self.lower_place(base)?;
                let idx_operand = self.lower_operand(index)?;
                Ok(base_place.index(idx_operand))
            }
            ExprKind::Unary { op: hir::UnOp::Deref, operand } => {
                let ptr = self.lower_operand(operand)?;
                match ptr {
                    Operand::Temp(t) => Ok(Place::pointer(t)),
                    Operand::Constant(_) => Err(self.internal_error(expr.span, "cannot dereference a constant")),
                }
            }
            _ => {
                let ty = self.expr_ty(expr);
                let local = self.builder.push_local(ty, None, expr.span, None);
                let place = Place::local(local);
                self.lower_init(expr, &place)?;
                Ok(place)
            }
        }
    }

    // ---- init -----------------------------------------------------------

    fn lower_init(&mut self, expr: &Expr, dest: &Place) -> SemanticResult<()> {
        match &expr.kind {
            ExprKind::StructLiteral { def_ref, fields, .. } => {
                let def_id = self.ctx.struct_def_id(*def_ref);
                let field_order: Vec<Symbol> =
                    self.ctx.struct_info(def_id).expect("struct registered in context").fields.iter().map(|(n, _)| *n).collect();
                let mut leaves = vec![InitLeaf::Omitted; field_order.len()];
                for (name, value_expr) in fields {
                    let idx = field_order.iter().position(|n| n == name).expect("field existence checked by C5");
                    let sub_place = dest.clone().field(idx as u32);
                    leaves[idx] = self.lower_init_leaf(value_expr, sub_place)?;
                }
                self.builder.push_statement(Statement::Init(dest.clone(), InitPattern::Struct { leaves }));
                Ok(())
            }
            ExprKind::ArrayLiteral(elems) => {
                let mut leaves = Vec::with_capacity(elems.len());
                for (i, e) in elems.iter().enumerate() {
                    let sub_place = dest.clone().index(Operand::Constant(Constant::Uint(i as u32)));
                    leaves.push(self.lower_init_leaf(e, sub_place)?);
                }
                self.builder.push_statement(Statement::Init(dest.clone(), InitPattern::ArrayLiteral { leaves }));
                Ok(())
            }
            ExprKind::ArrayRepeat { value, count } => {
                let n = self.const_eval_u32(count)?;
                let sub_place = dest.clone().index(Operand::Constant(Constant::Uint(0)));
                let leaf = self.lower_init_leaf(value, sub_place)?;
                self.builder.push_statement(Statement::Init(dest.clone(), InitPattern::ArrayRepeat { leaf, count: n }));
                Ok(())
            }
            ExprKind::Call { callee, args } => {
                let (func_ref, ret_ty, abi_params) = self.resolve_call_callee(callee)?;
                self.lower_call(func_ref, ret_ty, &abi_params, args, Some(dest), expr.span)?;
                Ok(())
            }
            ExprKind::MethodCall { receiver, method, args, .. } => {
                self.lower_method_call_expr(receiver, method, args, Some(dest), expr.span)?;
                Ok(())
            }
            ExprKind::If { cond, then_branch, else_branch } => self.lower_if_init(cond, then_branch, else_branch.as_deref(), dest),
            ExprKind::Block(block) => self.lower_init_block(block, dest),
            _ => {
                let operand = self.lower_operand(expr)?;
                self.builder.push_statement(Statement::Assign(dest.clone(), operand));
                Ok(())
            }
        }
    }

    fn lower_init_leaf(&mut self, value_expr: &Expr, sub_place: Place) -> SemanticResult<InitLeaf> {
        let value_ty = self.expr_ty(value_expr);
        if is_aggregate(self.ctx, value_ty) {
            self.lower_init(value_expr, &sub_place)?;
            Ok(InitLeaf::Omitted)
        } else {
            Ok(InitLeaf::Value(self.lower_operand(value_expr)?))
        }
    }

    fn const_eval_u32(&self, expr: &Expr) -> SemanticResult<u32> {
        match expr.info.as_ref().and_then(|i| i.const_value.as_ref()) {
            Some(ConstVariant::UintConst(n)) => Ok(*n),
            Some(ConstVariant::IntConst(n)) => Ok(*n as u32),
            _ => Err(self.internal_error(expr.span, "array-repeat count must be a constant evaluated by C10")),
        }
    }

    // ---- calls ----------------------------------------------------------

    fn resolve_call_callee(&mut self, callee: &Expr) -> SemanticResult<(FunctionRef, TypeId, Vec<AbiParam>)> {
        match &callee.kind {
            ExprKind::Name(NameUse::FuncUse(fid)) => {
                let mir_id = *self.refs.functions.get(fid).expect("every FunctionId was registered in lower_program");
                let sig = self.refs.function_sigs.get(fid).expect("signatures are computed upfront");
                Ok((FunctionRef::Internal(mir_id), sig.ret, sig.abi_params.clone()))
            }
            ExprKind::Name(NameUse::StructStatic { assoc_fn, .. }) => {
                let mir_id = *self.refs.functions.get(assoc_fn).expect("every FunctionId was registered in lower_program");
                let sig = self.refs.function_sigs.get(assoc_fn).expect("signatures are computed upfront");
                Ok((FunctionRef::Internal(mir_id), sig.ret, sig.abi_params.clone()))
            }
            ExprKind::Name(NameUse::UnresolvedIdentifier(name)) => {
                let id = self.ctx.impls.lookup_predefined_function(*name).expect("checked resolvable by C5");
                let ext_id = self.predefined_fn_external(id);
                let sig = self.refs.predefined_fn_sigs.get(&id).expect("installed by predefined_fn_external").clone();
                Ok((FunctionRef::External(ext_id), sig.ret, sig.abi_params))
            }
            _ => Err(self.internal_error(callee.span, "call target is not a resolvable function")),
        }
    }

    fn predefined_fn_external(&mut self, id: PredefinedFunctionId) -> ExternalFunctionId {
        if let Some(existing) = self.refs.predefined_fns.get(&id) {
            return *existing;
        }
        let psig = self.ctx.impls.predefined_function_signature(id);
        let params = psig.params.clone();
        let ret = psig.ret;
        let abi_params = abi_sig(self.ctx, &params, ret).abi_params;
        self.refs.predefined_fn_sigs.insert(id, CallSig { abi_params, ret });
        let ext_id = ExternalFunctionId((self.refs.predefined_fns.len() + self.refs.predefined_methods.len()) as u32);
        self.refs.predefined_fns.insert(id, ext_id);
        ext_id
    }

    fn lower_method_call_expr(
        &mut self,
        receiver: &Expr,
        method: &Option<hir::MethodRef>,
        args: &[Expr],
        dest_hint: Option<&Place>,
        span: Span,
    ) -> SemanticResult<ValuePlace> {
        let method_ref = method.expect("method resolution (C5) fills this in before lowering");
        match method_ref {
            hir::MethodRef::Predefined(PredefinedMethodId::ArrayLen) => {
                let receiver_ty = self.expr_ty(receiver);
                let size = match self.ctx.types.resolve(receiver_ty) {
                    Type::Array { size, .. } => *size as u32,
                    _ => return Err(self.internal_error(span, "ArrayLen receiver is not an array type")),
                };
                // Array sizes are always statically known; no call is needed,
                // but the receiver's own side effects (if any) still run.
                let _ = self.lower_operand(receiver)?;
                let operand = Operand::Constant(Constant::Uint(size));
                Ok(match dest_hint {
                    Some(d) => {
                        self.builder.push_statement(Statement::Assign(d.clone(), operand));
                        ValuePlace::Written
                    }
                    None => ValuePlace::Operand(operand),
                })
            }
            hir::MethodRef::User(mid) => {
                let mir_id = *self.refs.methods.get(&mid).expect("every MethodId was registered in lower_program");
                let sig = self.refs.method_sigs.get(&mid).expect("signatures are computed upfront").clone();
                let self_mode = self.ctx.method_sig(mid).self_mode;
                let self_ty = self.expr_ty(receiver);
                let self_operand = self.lower_self_operand(receiver, self_mode, self_ty)?;
                let mut all_args = Vec::with_capacity(args.len() + 1);
                all_args.push(self_operand);
                self.lower_call_args_into(&sig.abi_params, args, &mut all_args)?;
                self.finish_call(FunctionRef::Internal(mir_id), sig.ret, all_args, dest_hint, span)
            }
            hir::MethodRef::Predefined(pid) => {
                let self_mode = self.ctx.impls.predefined_signature(pid).self_mode;
                let self_ty = self.expr_ty(receiver);
                let ext_id = self.predefined_method_external(pid, self_ty);
                let sig = self.refs.predefined_method_sigs.get(&pid).expect("installed by predefined_method_external").clone();
                let self_operand = self.lower_self_operand(receiver, self_mode, self_ty)?;
                let mut all_args = Vec::with_capacity(args.len() + 1);
                all_args.push(self_operand);
                self.lower_call_args_into(&sig.abi_params, args, &mut all_args)?;
                self.finish_call(FunctionRef::External(ext_id), sig.ret, all_args, dest_hint, span)
            }
        }
    }

    fn predefined_method_external(&mut self, id: PredefinedMethodId, self_ty: TypeId) -> ExternalFunctionId {
        if let Some(existing) = self.refs.predefined_methods.get(&id) {
            return *existing;
        }
        let psig = self.ctx.impls.predefined_signature(id);
        let ret = psig.ret;
        let mut full_params = Vec::with_capacity(psig.params.len() + 1);
        full_params.push(self_ty);
        full_params.extend_from_slice(&psig.params);
        let abi_params = abi_sig(self.ctx, &full_params, ret).abi_params;
        self.refs.predefined_method_sigs.insert(id, CallSig { abi_params, ret });
        let ext_id = ExternalFunctionId((self.refs.predefined_fns.len() + self.refs.predefined_methods.len()) as u32);
        self.refs.predefined_methods.insert(id, ext_id);
        ext_id
    }

    fn lower_self_operand(&mut self, receiver: &Expr, self_mode: SelfMode, self_ty: TypeId) -> SemanticResult<Operand> {
        match self_mode {
            SelfMode::Ref | SelfMode::RefMut => {
                let place = self.lower_place(receiver)?;
                let ref_ty = self.ctx.types.reference(self_ty, matches!(self_mode, SelfMode::RefMut));
                let temp = self.builder.push_temp(ref_ty);
                self.builder.push_statement(Statement::Define(temp, RValue::Ref(place)));
                Ok(Operand::Temp(temp))
            }
            SelfMode::Value => {
                if is_aggregate(self.ctx, self_ty) {
                    let copy_local = self.builder.push_local(self_ty, None, receiver.span, None);
                    let place = Place::local(copy_local);
                    self.lower_init(receiver, &place)?;
                    let ref_ty = self.ctx.types.reference(self_ty, false);
                    let temp = self.builder.push_temp(ref_ty);
                    self.builder.push_statement(Statement::Define(temp, RValue::Ref(place)));
                    Ok(Operand::Temp(temp))
                } else {
                    self.lower_operand(receiver)
                }
            }
        }
    }

    fn lower_call(
        &mut self,
        callee: FunctionRef,
        ret_ty: TypeId,
        abi_params: &[AbiParam],
        arg_exprs: &[Expr],
        dest_hint: Option<&Place>,
        span: Span,
    ) -> SemanticResult<ValuePlace> {
        let mut args = Vec::with_capacity(arg_exprs.len());
        self.lower_call_args_into(abi_params, arg_exprs, &mut args)?;
        self.finish_call(callee, ret_ty, args, dest_hint, span)
    }

    /// Lowers `arg_exprs` against the tail of `abi_params` (the part not
    /// already filled by a pushed `self` operand, if any) and appends them
    /// to `out`.
    fn lower_call_args_into(&mut self, abi_params: &[AbiParam], arg_exprs: &[Expr], out: &mut Vec<Operand>) -> SemanticResult<()> {
        let offset = out.len();
        for (arg_expr, abi) in arg_exprs.iter().zip(abi_params.iter().skip(offset)) {
            out.push(self.lower_arg(arg_expr, abi)?);
        }
        Ok(())
    }

    fn lower_arg(&mut self, arg_expr: &Expr, abi: &AbiParam) -> SemanticResult<Operand> {
        match abi {
            AbiParam::Direct(_) => self.lower_operand(arg_expr),
            AbiParam::ByValCallerCopy(ty) => {
                let local = self.builder.push_local(*ty, None, arg_expr.span, None);
                let place = Place::local(local);
                self.lower_init(arg_expr, &place)?;
                let ref_ty = self.ctx.types.reference(*ty, false);
                let temp = self.builder.push_temp(ref_ty);
                self.builder.push_statement(Statement::Define(temp, RValue::Ref(place)));
                Ok(Operand::Temp(temp))
            }
            AbiParam::SRet(_) => unreachable!("SRet never appears as an argument classification"),
        }
    }

    fn finish_call(&mut self, callee: FunctionRef, ret_ty: TypeId, args: Vec<Operand>, dest_hint: Option<&Place>, span: Span) -> SemanticResult<ValuePlace> {
        if self.ctx.types.is_unit(ret_ty) {
            self.builder.push_statement(Statement::Call(Call { callee, args, result: CallResult::None }));
            return Ok(match dest_hint {
                Some(_) => ValuePlace::Written,
                None => ValuePlace::Operand(Operand::Constant(Constant::Unit)),
            });
        }
        if is_aggregate(self.ctx, ret_ty) {
            let dest = match dest_hint {
                Some(d) => d.clone(),
                None => Place::local(self.builder.push_local(ret_ty, None, span, None)),
            };
            self.builder.push_statement(Statement::Call(Call { callee, args, result: CallResult::Sret(dest.clone()) }));
            return match dest_hint {
                Some(_) => Ok(ValuePlace::Written),
                None => self.load_place(dest, ret_ty).map(ValuePlace::Operand),
            };
        }
        let temp = self.builder.push_temp(ret_ty);
        self.builder.push_statement(Statement::Call(Call { callee, args, result: CallResult::Temp(temp) }));
        match dest_hint {
            Some(d) => {
                self.builder.push_statement(Statement::Assign(d.clone(), Operand::Temp(temp)));
                Ok(ValuePlace::Written)
            }
            None => Ok(ValuePlace::Operand(Operand::Temp(temp))),
        }
    }
}

fn is_place_expr(expr: &Expr) -> bool {
    matches!(
        &expr.kind,
        ExprKind::Name(NameUse::Variable(_)) | ExprKind::Field { .. } | ExprKind::Index { .. } | ExprKind::Unary { op: hir::UnOp::Deref, .. }
    )
}

fn convert_binop(op: hir::BinOp) -> BinOp {
    match op {
        hir::BinOp::Add => BinOp::Add,
        hir::BinOp::Sub => BinOp::Sub,
        hir::BinOp::Mul => BinOp::Mul,
        hir::BinOp::Div => BinOp::Div,
        hir::BinOp::Mod => BinOp::Mod,
        hir::BinOp::Eq => BinOp::Eq,
        hir::BinOp::Ne => BinOp::Ne,
        hir::BinOp::Lt => BinOp::Lt,
        hir::BinOp::Gt => BinOp::Gt,
        hir::BinOp::Le => BinOp::Le,
        hir::BinOp::Ge => BinOp::Ge,
        hir::BinOp::BitAnd => BinOp::BitAnd,
        hir::BinOp::BitOr => BinOp::BitOr,
        hir::BinOp::BitXor => BinOp::BitXor,
        hir::BinOp::Shl => BinOp::Shl,
        hir::BinOp::Shr => BinOp::Shr,
        hir::BinOp::And | hir::BinOp::Or => unreachable!("short-circuit ops never reach the generic binop lowerer"),
    }
}
