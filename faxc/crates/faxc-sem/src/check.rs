//! C5: the expression checker (§4.4). Runs after name resolution (C3) and
//! context construction (C4); walks every function, method, and const body
//! exactly once, computing an `ExprInfo` for each node and rewriting it in
//! place where the surface form needs desugaring — `&value` where `value`
//! isn't a place becomes a synthesized `{ let _tempN = value; &_tempN }`
//! (§4.4.1), and a bare field name becomes a resolved field index once the
//! base's struct type is known.
//!
//! Bidirectional: most nodes are checked bottom-up, but a node that can
//! still be given more than one type (an unsuffixed integer literal) takes a
//! `TypeExpectation` from its surrounding context and adopts it, the same
//! trick array literals and binary operands use to let an integer literal
//! settle on whichever side already has a concrete type.
//!
//! Divergence (Invariant 3, §8): an expression whose endpoint set doesn't
//! contain `Endpoint::Normal` is typed `Never`, regardless of what its
//! "natural" result type would otherwise be — `seq`/`merge` below are the two
//! primitives the rest of this module composes to track that set through
//! sequencing (statement lists, eager subexpression evaluation) and parallel
//! branches (`if`/`else`).

use crate::const_eval;
use crate::context::{strip_references, Context};
use crate::error::{SemanticError, SemanticResult};
use crate::hir::*;
use crate::impl_table::MethodEntry;
use crate::types::{Primitive, Type, TypeId};
use faxc_util::{Span, Symbol};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeExpectation {
    None,
    Exact(TypeId),
}

fn normal_set() -> HashSet<Endpoint> {
    let mut s = HashSet::new();
    s.insert(Endpoint::Normal);
    s
}

fn diverges(endpoints: &HashSet<Endpoint>) -> bool {
    !endpoints.contains(&Endpoint::Normal)
}

/// `sequence(a, b)` from §4.4.2: `b` only runs if `a` can complete normally.
fn seq(a: &HashSet<Endpoint>, b: &HashSet<Endpoint>) -> HashSet<Endpoint> {
    if a.contains(&Endpoint::Normal) {
        let mut out: HashSet<Endpoint> = a.iter().cloned().filter(|e| *e != Endpoint::Normal).collect();
        out.extend(b.iter().cloned());
        out
    } else {
        a.clone()
    }
}

/// Parallel branches (`if`/`else`): either might run, so the result is
/// whatever either could produce.
fn merge(a: &HashSet<Endpoint>, b: &HashSet<Endpoint>) -> HashSet<Endpoint> {
    a.union(b).cloned().collect()
}

fn dummy_expr(span: Span) -> Expr {
    Expr::new(ExprKind::Literal(Literal::Unit), span)
}

struct LoopFrame {
    id: LoopId,
    break_ty: Option<TypeId>,
    is_while: bool,
}

pub fn check_program(program: &mut Program, ctx: &mut Context) -> SemanticResult<()> {
    for i in 0..program.consts.len() {
        let id = ConstId(i as u32);
        let expected = ctx.const_type(id);
        let mut value = std::mem::replace(&mut program.consts[i].value, dummy_expr(Span::DUMMY));
        let mut no_locals = Vec::new();
        let result = (|| -> SemanticResult<()> {
            let mut checker = Checker::new(ctx, &mut no_locals);
            let info = checker.check_expr(&mut value, TypeExpectation::Exact(expected))?;
            if !ctx.types.is_assignable_to(info.ty, expected) {
                return Err(SemanticError::new(
                    format!("const `{}`'s initializer does not match its declared type", program.consts[i].name.as_str()),
                    value.span,
                ));
            }
            let const_value = info.const_value.clone().ok_or_else(|| {
                SemanticError::new("const initializer is not a constant expression", value.span)
            })?;
            ctx.record_const_value(id, const_value);
            Ok(())
        })();
        program.consts[i].value = value;
        result?;
    }

    for i in 0..program.functions.len() {
        let mut f = std::mem::replace(&mut program.functions[i], dummy_fn());
        let ret = ctx.function_sig(FunctionId(i as u32)).ret;
        let result = (|| -> SemanticResult<()> {
            let mut checker = Checker::new(ctx, &mut f.locals);
            checker.func_target = Some(FuncTarget::Function(FunctionId(i as u32)));
            checker.return_ty = ret;
            let info = checker.check_block(&mut f.body, TypeExpectation::Exact(ret))?;
            if !ctx.types.is_assignable_to(info.ty, ret) {
                return Err(SemanticError::new(
                    format!("function `{}`'s body does not match its declared return type", f.name.as_str()),
                    f.span,
                ));
            }
            Ok(())
        })();
        program.functions[i] = f;
        result?;
    }

    for i in 0..program.methods.len() {
        let mut m = std::mem::replace(&mut program.methods[i], dummy_method());
        let ret = ctx.method_sig(MethodId(i as u32)).ret;
        let result = (|| -> SemanticResult<()> {
            let mut checker = Checker::new(ctx, &mut m.locals);
            checker.func_target = Some(FuncTarget::Method(MethodId(i as u32)));
            checker.return_ty = ret;
            let info = checker.check_block(&mut m.body, TypeExpectation::Exact(ret))?;
            if !ctx.types.is_assignable_to(info.ty, ret) {
                return Err(SemanticError::new(
                    format!("method `{}`'s body does not match its declared return type", m.name.as_str()),
                    m.span,
                ));
            }
            Ok(())
        })();
        program.methods[i] = m;
        result?;
    }

    Ok(())
}

fn dummy_fn() -> FnItem {
    FnItem {
        def_id: faxc_util::DefId::DUMMY,
        name: Symbol::intern(""),
        params: Vec::new(),
        ret_type: TypeAnnotation::Unresolved(UnresolvedType::Unit),
        locals: Vec::new(),
        body: Block { stmts: Vec::new(), trailing: None, span: Span::DUMMY, info: None },
        span: Span::DUMMY,
    }
}

fn dummy_method() -> MethodItem {
    MethodItem {
        def_id: faxc_util::DefId::DUMMY,
        name: Symbol::intern(""),
        self_mode: SelfMode::Value,
        params: Vec::new(),
        ret_type: TypeAnnotation::Unresolved(UnresolvedType::Unit),
        locals: Vec::new(),
        body: Block { stmts: Vec::new(), trailing: None, span: Span::DUMMY, info: None },
        span: Span::DUMMY,
        owning_impl: ImplId(0),
    }
}

pub struct Checker<'a> {
    ctx: &'a mut Context,
    locals: &'a mut Vec<LocalDef>,
    loop_stack: Vec<LoopFrame>,
    return_ty: TypeId,
    func_target: Option<FuncTarget>,
}

impl<'a> Checker<'a> {
    pub fn new(ctx: &'a mut Context, locals: &'a mut Vec<LocalDef>) -> Self {
        let unit = ctx.types.unit();
        Checker { ctx, locals, loop_stack: Vec::new(), return_ty: unit, func_target: None }
    }

    pub fn check_expr(&mut self, expr: &mut Expr, expect: TypeExpectation) -> SemanticResult<ExprInfo> {
        if matches!(expect, TypeExpectation::None) {
            if let Some(info) = &expr.info {
                return Ok(info.clone());
            }
        }
        let info = self.check_kind(expr, expect)?;
        expr.info = Some(info.clone());
        Ok(info)
    }

    pub fn check_block(&mut self, block: &mut Block, expect: TypeExpectation) -> SemanticResult<ExprInfo> {
        if matches!(expect, TypeExpectation::None) {
            if let Some(info) = &block.info {
                return Ok(info.clone());
            }
        }
        let mut endpoints = normal_set();
        for stmt in &mut block.stmts {
            match stmt {
                Stmt::Let(l) => {
                    let let_eps = self.check_let(l)?;
                    endpoints = seq(&endpoints, &let_eps);
                }
                Stmt::Expr(e) => {
                    let info = self.check_expr(e, TypeExpectation::None)?;
                    endpoints = seq(&endpoints, &info.endpoints);
                }
                Stmt::Item(_) => {}
            }
        }
        let info = if let Some(trailing) = &mut block.trailing {
            // Dead code past a diverging statement still gets checked, just
            // without forcing it to match the block's outward expectation.
            let trailing_expect = if diverges(&endpoints) { TypeExpectation::None } else { expect };
            let t_info = self.check_expr(trailing, trailing_expect)?;
            endpoints = seq(&endpoints, &t_info.endpoints);
            let ty = if diverges(&endpoints) { self.ctx.types.never() } else { t_info.ty };
            ExprInfo {
                ty,
                has_type: true,
                is_mut: t_info.is_mut,
                is_place: t_info.is_place,
                endpoints,
                const_value: t_info.const_value.clone(),
            }
        } else {
            let ty = if diverges(&endpoints) { self.ctx.types.never() } else { self.ctx.types.unit() };
            ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None }
        };
        block.info = Some(info.clone());
        Ok(info)
    }

    fn check_let(&mut self, let_stmt: &mut LetStmt) -> SemanticResult<HashSet<Endpoint>> {
        let declared = match &mut let_stmt.ty {
            Some(ann) => Some(self.ctx.type_query(ann)?),
            None => None,
        };
        let mut endpoints = normal_set();
        let final_ty = if let Some(init) = &mut let_stmt.init {
            let expect = declared.map(TypeExpectation::Exact).unwrap_or(TypeExpectation::None);
            let info = self.check_expr(init, expect)?;
            endpoints = seq(&endpoints, &info.endpoints);
            match declared {
                Some(d) => {
                    if !self.ctx.types.is_assignable_to(info.ty, d) {
                        return Err(SemanticError::new(
                            "let binding's initializer does not match its declared type",
                            init.span,
                        ));
                    }
                    d
                }
                None => info.ty,
            }
        } else {
            declared.ok_or_else(|| {
                SemanticError::new("cannot infer type of binding without an initializer or type annotation", Span::DUMMY)
            })?
        };
        self.bind_pattern(&mut let_stmt.pattern, final_ty)?;
        Ok(endpoints)
    }

    /// Attaches `expected` to every local a pattern introduces (§4.3
    /// `bind_pattern_type`). `ReferencePattern` is part of the HIR model but
    /// unreachable from this surface grammar (`convert.rs` only produces
    /// `Wildcard`/`BindingDef`); handled here for completeness, not because
    /// any program can currently reach it.
    fn bind_pattern(&mut self, pattern: &mut Pattern, expected: TypeId) -> SemanticResult<()> {
        match pattern {
            Pattern::Wildcard => Ok(()),
            Pattern::BindingDef(LocalRef::Resolved(id)) => {
                self.locals[id.0 as usize].ty = TypeAnnotation::Resolved(expected);
                Ok(())
            }
            Pattern::BindingDef(LocalRef::Unresolved { .. }) => Err(SemanticError::new(
                "internal error: pattern left unresolved by name resolution",
                Span::DUMMY,
            )),
            Pattern::ReferencePattern { subpattern, is_mutable } => {
                match self.ctx.types.resolve(expected).clone() {
                    Type::Reference { referent, is_mutable: ref_mut } => {
                        if *is_mutable && !ref_mut {
                            return Err(SemanticError::new("pattern requires a mutable reference", Span::DUMMY));
                        }
                        self.bind_pattern(subpattern, referent)
                    }
                    _ => Err(SemanticError::new("reference pattern used against a non-reference type", Span::DUMMY)),
                }
            }
        }
    }

    fn check_kind(&mut self, expr: &mut Expr, expect: TypeExpectation) -> SemanticResult<ExprInfo> {
        let span = expr.span;
        if matches!(expr.kind, ExprKind::Unary { .. }) {
            return self.check_unary(expr, expect, span);
        }
        match &mut expr.kind {
            ExprKind::Literal(lit) => self.check_literal(lit, expect, span),
            ExprKind::Name(name_use) => self.check_name(name_use, span),
            ExprKind::TypeStatic(_) => Err(SemanticError::new(
                "internal error: unresolved type-static expression reached the checker",
                span,
            )),
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.check_binary(op, left, right, span)
            }
            ExprKind::Unary { .. } => unreachable!("handled above"),
            ExprKind::Call { callee, args } => self.check_call(callee, args, span),
            ExprKind::MethodCall { receiver, method_name, method, args } => {
                let name = *method_name;
                self.check_method_call(receiver, name, method, args, span)
            }
            ExprKind::Field { base, field } => self.check_field(base, field, span),
            ExprKind::Index { base, index } => self.check_index(base, index, span),
            ExprKind::Block(block) => self.check_block(block, expect),
            ExprKind::If { cond, then_branch, else_branch } => self.check_if(cond, then_branch, else_branch, expect, span),
            ExprKind::Loop { id, body, break_type } => {
                let id = *id;
                self.check_loop(id, body, break_type, span)
            }
            ExprKind::While { id, cond, body } => {
                let id = *id;
                self.check_while(cond, body, id, span)
            }
            ExprKind::Assign { place, value } => self.check_assign(place, value, span),
            ExprKind::Cast { operand, target } => self.check_cast(operand, target, span),
            ExprKind::StructLiteral { def_ref, name, fields } => {
                let def_ref = *def_ref;
                let name = *name;
                self.check_struct_literal(def_ref, name, fields, span)
            }
            ExprKind::ArrayLiteral(elems) => self.check_array_literal(elems, expect, span),
            ExprKind::ArrayRepeat { value, count } => self.check_array_repeat(value, count, expect, span),
            ExprKind::Break { value, .. } => self.check_break(value, span),
            ExprKind::Continue { .. } => self.check_continue(span),
            ExprKind::Return { value, .. } => self.check_return(value, span),
        }
    }

    fn check_literal(&mut self, lit: &Literal, expect: TypeExpectation, span: Span) -> SemanticResult<ExprInfo> {
        match lit {
            Literal::Int { value, negative } => self.check_int_literal(*value, *negative, expect, span),
            Literal::Bool(b) => {
                let ty = self.ctx.types.primitive(Primitive::Bool);
                let mut info = ExprInfo::normal(ty);
                info.const_value = Some(ConstVariant::BoolConst(*b));
                Ok(info)
            }
            Literal::Char(c) => {
                let ty = self.ctx.types.primitive(Primitive::Char);
                let mut info = ExprInfo::normal(ty);
                info.const_value = Some(ConstVariant::CharConst(*c));
                Ok(info)
            }
            Literal::String(s) => {
                let ty = self.ctx.types.primitive(Primitive::String);
                let mut info = ExprInfo::normal(ty);
                info.const_value = Some(ConstVariant::StringConst(*s));
                Ok(info)
            }
            Literal::Unit => Ok(ExprInfo::normal(self.ctx.types.unit())),
        }
    }

    fn check_int_literal(&mut self, value: i64, negative: bool, expect: TypeExpectation, span: Span) -> SemanticResult<ExprInfo> {
        let raw = if negative { -value } else { value };
        let ty = match expect {
            TypeExpectation::Exact(ty) if self.ctx.types.is_integer(ty) => ty,
            _ => self.ctx.types.primitive(Primitive::I32),
        };
        self.validate_int_range(ty, raw, span)?;
        let mut info = ExprInfo::normal(ty);
        info.has_type = matches!(expect, TypeExpectation::Exact(t) if self.ctx.types.is_integer(t));
        info.const_value = Some(self.make_int_const(ty, raw));
        Ok(info)
    }

    fn make_int_const(&self, ty: TypeId, raw: i64) -> ConstVariant {
        let signed = matches!(self.ctx.types.resolve(ty), Type::Primitive(p) if p.is_signed());
        if signed {
            ConstVariant::IntConst(raw as i32)
        } else {
            ConstVariant::UintConst(raw as u32)
        }
    }

    fn validate_int_range(&self, ty: TypeId, raw: i64, span: Span) -> SemanticResult<()> {
        let signed = matches!(self.ctx.types.resolve(ty), Type::Primitive(p) if p.is_signed());
        let in_range = if signed {
            raw >= i32::MIN as i64 && raw <= i32::MAX as i64
        } else {
            raw >= 0 && raw <= u32::MAX as i64
        };
        if !in_range {
            return Err(SemanticError::new("integer literal out of range for its type", span));
        }
        Ok(())
    }

    fn check_name(&mut self, name_use: &NameUse, span: Span) -> SemanticResult<ExprInfo> {
        match name_use {
            NameUse::Variable(id) => {
                let local = &self.locals[id.0 as usize];
                let ty = local
                    .ty
                    .resolved()
                    .ok_or_else(|| SemanticError::new("use of a local before its type is known", span))?;
                let mut info = ExprInfo::normal(ty);
                info.is_mut = local.is_mutable;
                info.is_place = true;
                Ok(info)
            }
            NameUse::ConstUse(id) => {
                let ty = self.ctx.const_type(*id);
                let mut info = ExprInfo::normal(ty);
                if let Some(v) = self.ctx.const_value(*id) {
                    info.const_value = Some(v.clone());
                }
                Ok(info)
            }
            NameUse::FuncUse(_) => Err(SemanticError::new("function name used as a value; it must be called", span)),
            NameUse::EnumVariant { def_ref, .. } => {
                let def_id = self.ctx.enum_def_id(*def_ref);
                let ty = self.ctx.types.enum_ty(def_id);
                Ok(ExprInfo::normal(ty))
            }
            NameUse::StructConst { assoc_const, .. } => {
                let ty = self.ctx.const_type(*assoc_const);
                let mut info = ExprInfo::normal(ty);
                if let Some(v) = self.ctx.const_value(*assoc_const) {
                    info.const_value = Some(v.clone());
                }
                Ok(info)
            }
            NameUse::StructStatic { .. } => {
                Err(SemanticError::new("associated function used as a value; it must be called", span))
            }
            NameUse::UnresolvedIdentifier(name) => {
                Err(SemanticError::new(format!("cannot find `{}` in this scope", name.as_str()), span))
            }
        }
    }

    fn check_binary_operands(&mut self, left: &mut Expr, right: &mut Expr) -> SemanticResult<(ExprInfo, ExprInfo)> {
        let mut l = self.check_expr(left, TypeExpectation::None)?;
        let mut r = self.check_expr(right, TypeExpectation::None)?;
        if !l.has_type && r.has_type && self.ctx.types.is_integer(r.ty) {
            l = self.check_expr(left, TypeExpectation::Exact(r.ty))?;
        } else if !r.has_type && l.has_type && self.ctx.types.is_integer(l.ty) {
            r = self.check_expr(right, TypeExpectation::Exact(l.ty))?;
        }
        Ok((l, r))
    }

    fn check_binary(&mut self, op: BinOp, left: &mut Expr, right: &mut Expr, span: Span) -> SemanticResult<ExprInfo> {
        match op {
            BinOp::And | BinOp::Or => {
                let bool_ty = self.ctx.types.primitive(Primitive::Bool);
                let l = self.check_expr(left, TypeExpectation::Exact(bool_ty))?;
                if !self.ctx.types.is_assignable_to(l.ty, bool_ty) {
                    return Err(SemanticError::new("operand of a logical operator must be `bool`", left.span));
                }
                let r = self.check_expr(right, TypeExpectation::Exact(bool_ty))?;
                if !self.ctx.types.is_assignable_to(r.ty, bool_ty) {
                    return Err(SemanticError::new("operand of a logical operator must be `bool`", right.span));
                }
                self.finish_binary(op, bool_ty, &l, &r, span)
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                let (l, r) = self.check_binary_operands(left, right)?;
                if !self.ctx.types.is_assignable_to(l.ty, r.ty) && !self.ctx.types.is_assignable_to(r.ty, l.ty) {
                    return Err(SemanticError::new("comparison operands must have the same type", span));
                }
                let bool_ty = self.ctx.types.primitive(Primitive::Bool);
                self.finish_binary(op, bool_ty, &l, &r, span)
            }
            _ => {
                let (l, r) = self.check_binary_operands(left, right)?;
                if l.ty != r.ty {
                    return Err(SemanticError::new("operands of a binary operator must have the same type", span));
                }
                if !self.ctx.types.is_numeric(l.ty) {
                    return Err(SemanticError::new("operands of a binary operator must be numeric", span));
                }
                let result_ty = l.ty;
                self.finish_binary(op, result_ty, &l, &r, span)
            }
        }
    }

    fn finish_binary(&mut self, op: BinOp, result_ty: TypeId, l: &ExprInfo, r: &ExprInfo, span: Span) -> SemanticResult<ExprInfo> {
        let endpoints = seq(&seq(&normal_set(), &l.endpoints), &r.endpoints);
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { result_ty };
        let mut info = ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None };
        if let (Some(a), Some(b)) = (&l.const_value, &r.const_value) {
            info.const_value = const_eval::fold_binary(op, a, b, span)?;
        }
        Ok(info)
    }

    fn check_unary(&mut self, expr: &mut Expr, expect: TypeExpectation, span: Span) -> SemanticResult<ExprInfo> {
        let op = match &expr.kind {
            ExprKind::Unary { op, .. } => *op,
            _ => unreachable!(),
        };
        if let UnOp::Ref(is_mut) = op {
            return self.check_ref(expr, is_mut, span);
        }
        let operand = match &mut expr.kind {
            ExprKind::Unary { operand, .. } => operand,
            _ => unreachable!(),
        };
        match op {
            UnOp::Neg => {
                let info = self.check_expr(operand, expect)?;
                if !self.ctx.types.is_numeric(info.ty) {
                    return Err(SemanticError::new("cannot negate a non-numeric value", span));
                }
                if matches!(self.ctx.types.resolve(info.ty), Type::Primitive(p) if !p.is_signed()) {
                    return Err(SemanticError::new("cannot negate an unsigned value", span));
                }
                let mut out = info.clone();
                out.is_mut = false;
                out.is_place = false;
                if let Some(cv) = &info.const_value {
                    out.const_value = const_eval::fold_unary(UnOp::Neg, cv, span)?;
                }
                Ok(out)
            }
            UnOp::Not => {
                let info = self.check_expr(operand, TypeExpectation::None)?;
                if !(self.ctx.types.is_bool(info.ty) || self.ctx.types.is_integer(info.ty)) {
                    return Err(SemanticError::new("`!` requires a `bool` or integer operand", span));
                }
                let mut out = info.clone();
                out.is_mut = false;
                out.is_place = false;
                if let Some(cv) = &info.const_value {
                    out.const_value = const_eval::fold_unary(UnOp::Not, cv, span)?;
                }
                Ok(out)
            }
            UnOp::Deref => {
                let info = self.check_expr(operand, TypeExpectation::None)?;
                let (referent, is_mutable) = match self.ctx.types.resolve(info.ty) {
                    Type::Reference { referent, is_mutable } => (*referent, *is_mutable),
                    _ => return Err(SemanticError::new("cannot dereference a non-reference type", span)),
                };
                let mut out = ExprInfo::normal(referent);
                out.is_place = true;
                out.is_mut = is_mutable;
                out.endpoints = info.endpoints.clone();
                if diverges(&out.endpoints) {
                    out.ty = self.ctx.types.never();
                }
                Ok(out)
            }
            UnOp::Ref(_) => unreachable!("handled above"),
        }
    }

    /// `&operand` / `&mut operand` (§4.4.1). A place just gets wrapped; a
    /// temporary gets bound to a fresh local first, and this whole node
    /// becomes the synthesized block.
    fn check_ref(&mut self, expr: &mut Expr, is_mut: bool, span: Span) -> SemanticResult<ExprInfo> {
        let operand = match &mut expr.kind {
            ExprKind::Unary { operand, .. } => operand,
            _ => unreachable!(),
        };
        let info = self.check_expr(operand, TypeExpectation::None)?;
        if info.is_place {
            if is_mut && !info.is_mut {
                return Err(SemanticError::new("cannot take a mutable reference to an immutable place", span));
            }
            let ref_ty = self.ctx.types.reference(info.ty, is_mut);
            let mut out = ExprInfo::normal(ref_ty);
            out.endpoints = info.endpoints.clone();
            if diverges(&out.endpoints) {
                out.ty = self.ctx.types.never();
            }
            return Ok(out);
        }
        if is_mut {
            return Err(SemanticError::new("cannot take a mutable reference to a temporary value", span));
        }
        let operand_ty = info.ty;
        let old_operand = std::mem::replace(&mut **operand, dummy_expr(span));
        let block = self.synth_temp_ref_block(old_operand, operand_ty, span);
        let mut block = block;
        let block_info = self.check_block(&mut block, TypeExpectation::None)?;
        expr.kind = ExprKind::Block(block);
        Ok(block_info)
    }

    fn synth_temp_ref_block(&mut self, value: Expr, value_ty: TypeId, span: Span) -> Block {
        let local_id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalDef {
            name: Symbol::intern(&format!("_temp{}", local_id.0)),
            is_mutable: false,
            ty: TypeAnnotation::Resolved(value_ty),
            span,
        });
        let let_stmt = Stmt::Let(LetStmt {
            pattern: Pattern::BindingDef(LocalRef::Resolved(local_id)),
            ty: Some(TypeAnnotation::Resolved(value_ty)),
            init: Some(value),
        });
        let var_expr = Expr::new(ExprKind::Name(NameUse::Variable(local_id)), span);
        let ref_expr = Expr::new(ExprKind::Unary { op: UnOp::Ref(false), operand: Box::new(var_expr) }, span);
        Block { stmts: vec![let_stmt], trailing: Some(Box::new(ref_expr)), span, info: None }
    }

    fn check_field(&mut self, base: &mut Box<Expr>, field: &mut FieldRef, span: Span) -> SemanticResult<ExprInfo> {
        let mut base_info = self.check_expr(base, TypeExpectation::None)?;
        while matches!(self.ctx.types.resolve(base_info.ty), Type::Reference { .. }) {
            let inner_span = base.span;
            let old = std::mem::replace(&mut **base, dummy_expr(inner_span));
            **base = Expr::new(ExprKind::Unary { op: UnOp::Deref, operand: Box::new(old) }, inner_span);
            base_info = self.check_expr(base, TypeExpectation::None)?;
        }
        let def_id = match self.ctx.types.resolve(base_info.ty) {
            Type::Struct { def_ref } => *def_ref,
            _ => return Err(SemanticError::new("field access on a non-struct type", span)),
        };
        let ty = match field {
            FieldRef::Resolved(idx) => {
                let info = self.ctx.struct_info(def_id).ok_or_else(|| SemanticError::new("unknown struct", span))?;
                info.fields[*idx].1
            }
            FieldRef::Name(name) => {
                let (idx, ty) = self
                    .ctx
                    .struct_field(def_id, *name)
                    .ok_or_else(|| SemanticError::new(format!("no field `{}` on this struct", name.as_str()), span))?;
                *field = FieldRef::Resolved(idx);
                ty
            }
        };
        let mut out = ExprInfo::normal(ty);
        out.is_mut = base_info.is_mut;
        out.is_place = base_info.is_place;
        out.endpoints = base_info.endpoints.clone();
        if diverges(&out.endpoints) {
            out.ty = self.ctx.types.never();
        }
        Ok(out)
    }

    fn check_index(&mut self, base: &mut Expr, index: &mut Expr, span: Span) -> SemanticResult<ExprInfo> {
        let base_info = self.check_expr(base, TypeExpectation::None)?;
        let usize_ty = self.ctx.types.primitive(Primitive::Usize);
        let index_info = self.check_expr(index, TypeExpectation::Exact(usize_ty))?;
        if !self.ctx.types.is_assignable_to(index_info.ty, usize_ty) {
            return Err(SemanticError::new("array index must be `usize`", index.span));
        }
        let element = match self.ctx.types.resolve(base_info.ty) {
            Type::Array { element, .. } => *element,
            _ => return Err(SemanticError::new("indexing requires an array type", span)),
        };
        let endpoints = seq(&seq(&normal_set(), &base_info.endpoints), &index_info.endpoints);
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { element };
        let mut out = ExprInfo { ty, has_type: true, is_mut: base_info.is_mut, is_place: base_info.is_place, endpoints, const_value: None };
        if diverges(&out.endpoints) {
            out.is_mut = false;
            out.is_place = false;
        }
        Ok(out)
    }

    fn check_if(
        &mut self,
        cond: &mut Expr,
        then_branch: &mut Block,
        else_branch: &mut Option<Box<Expr>>,
        expect: TypeExpectation,
        span: Span,
    ) -> SemanticResult<ExprInfo> {
        let bool_ty = self.ctx.types.primitive(Primitive::Bool);
        let cond_info = self.check_expr(cond, TypeExpectation::Exact(bool_ty))?;
        if !self.ctx.types.is_assignable_to(cond_info.ty, bool_ty) {
            return Err(SemanticError::new("`if` condition must be `bool`", cond.span));
        }
        let then_info = self.check_block(then_branch, expect)?;
        let (result_ty, branch_eps) = match else_branch {
            Some(else_expr) => {
                let else_info = self.check_expr(else_expr, expect)?;
                let common = self
                    .ctx
                    .types
                    .find_common_type(then_info.ty, else_info.ty)
                    .ok_or_else(|| SemanticError::new("`if` and `else` branches have incompatible types", span))?;
                (common, merge(&then_info.endpoints, &else_info.endpoints))
            }
            None => {
                if !(self.ctx.types.is_unit(then_info.ty) || self.ctx.types.is_never(then_info.ty)) {
                    return Err(SemanticError::new("`if` without `else` must produce `()`", span));
                }
                (self.ctx.types.unit(), merge(&then_info.endpoints, &normal_set()))
            }
        };
        let endpoints = seq(&cond_info.endpoints, &branch_eps);
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { result_ty };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    /// `loop { ... }` (§4.4.2, §5). Falling off the end of the body is a
    /// back-edge, not an exit, so the body's own `Normal` endpoint never
    /// reaches the `Loop` expression's result — only a `break` targeting
    /// this loop does, contributing `Normal` with the unified break type.
    fn check_loop(&mut self, id: LoopId, body: &mut Block, break_type_slot: &mut Option<TypeId>, _span: Span) -> SemanticResult<ExprInfo> {
        self.loop_stack.push(LoopFrame { id, break_ty: None, is_while: false });
        let body_info = self.check_block(body, TypeExpectation::None)?;
        let frame = self.loop_stack.pop().expect("loop frame pushed above");

        let mut endpoints: HashSet<Endpoint> = body_info
            .endpoints
            .into_iter()
            .filter(|e| !matches!(e, Endpoint::Continue { target } if *target == Some(id)))
            .filter(|e| !matches!(e, Endpoint::Break { target, .. } if *target == Some(id)))
            .collect();
        let break_ty = match frame.break_ty {
            Some(t) => {
                endpoints.insert(Endpoint::Normal);
                t
            }
            None => self.ctx.types.never(),
        };
        *break_type_slot = Some(break_ty);

        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { break_ty };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    /// `while cond { ... }`, always `()`-typed: the implicit exit when `cond`
    /// is false always contributes `Normal` (§4.4.2).
    fn check_while(&mut self, cond: &mut Expr, body: &mut Block, id: LoopId, _span: Span) -> SemanticResult<ExprInfo> {
        let bool_ty = self.ctx.types.primitive(Primitive::Bool);
        let cond_info = self.check_expr(cond, TypeExpectation::Exact(bool_ty))?;
        if !self.ctx.types.is_assignable_to(cond_info.ty, bool_ty) {
            return Err(SemanticError::new("`while` condition must be `bool`", cond.span));
        }
        let unit = self.ctx.types.unit();
        self.loop_stack.push(LoopFrame { id, break_ty: Some(unit), is_while: true });
        let body_info = self.check_block(body, TypeExpectation::None)?;
        self.loop_stack.pop();

        let mut endpoints: HashSet<Endpoint> = body_info
            .endpoints
            .into_iter()
            .filter(|e| !matches!(e, Endpoint::Continue { target } if *target == Some(id)))
            .filter(|e| !matches!(e, Endpoint::Break { target, .. } if *target == Some(id)))
            .collect();
        endpoints.insert(Endpoint::Normal);
        let endpoints = seq(&cond_info.endpoints, &endpoints);
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { unit };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn check_break(&mut self, value: &mut Option<Box<Expr>>, span: Span) -> SemanticResult<ExprInfo> {
        let (frame_id, is_while) = match self.loop_stack.last() {
            Some(f) => (f.id, f.is_while),
            None => return Err(SemanticError::new("`break` outside of a loop", span)),
        };
        let (value_type, value_eps) = match value {
            Some(v) => {
                if is_while {
                    let unit = self.ctx.types.unit();
                    let info = self.check_expr(v, TypeExpectation::Exact(unit))?;
                    if !self.ctx.types.is_assignable_to(info.ty, unit) {
                        return Err(SemanticError::new("`break` with a value is not allowed inside `while`", span));
                    }
                    (unit, info.endpoints)
                } else {
                    let info = self.check_expr(v, TypeExpectation::None)?;
                    (info.ty, info.endpoints)
                }
            }
            None => (self.ctx.types.unit(), normal_set()),
        };
        let merged = {
            let frame = self.loop_stack.last().unwrap();
            match frame.break_ty {
                Some(existing) => self
                    .ctx
                    .types
                    .find_common_type(existing, value_type)
                    .ok_or_else(|| SemanticError::new("`break` values have incompatible types", span))?,
                None => value_type,
            }
        };
        self.loop_stack.last_mut().unwrap().break_ty = Some(merged);

        let mut own = HashSet::new();
        own.insert(Endpoint::Break { target: Some(frame_id), value_type });
        let endpoints = seq(&seq(&normal_set(), &value_eps), &own);
        Ok(ExprInfo { ty: self.ctx.types.never(), has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn check_continue(&mut self, span: Span) -> SemanticResult<ExprInfo> {
        let frame_id = self
            .loop_stack
            .last()
            .map(|f| f.id)
            .ok_or_else(|| SemanticError::new("`continue` outside of a loop", span))?;
        let mut endpoints = HashSet::new();
        endpoints.insert(Endpoint::Continue { target: Some(frame_id) });
        Ok(ExprInfo { ty: self.ctx.types.never(), has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn check_return(&mut self, value: &mut Option<Box<Expr>>, span: Span) -> SemanticResult<ExprInfo> {
        let (value_ty, value_eps) = match value {
            Some(v) => {
                let info = self.check_expr(v, TypeExpectation::Exact(self.return_ty))?;
                if !self.ctx.types.is_assignable_to(info.ty, self.return_ty) {
                    return Err(SemanticError::new(
                        "returned value does not match the function's declared return type",
                        v.span,
                    ));
                }
                (info.ty, info.endpoints)
            }
            None => {
                let unit = self.ctx.types.unit();
                if !self.ctx.types.is_assignable_to(unit, self.return_ty) {
                    return Err(SemanticError::new("`return` with no value requires a `()`-returning function", span));
                }
                (unit, normal_set())
            }
        };
        let mut own = HashSet::new();
        own.insert(Endpoint::Return { target: self.func_target, value_type: value_ty });
        let endpoints = seq(&seq(&normal_set(), &value_eps), &own);
        Ok(ExprInfo { ty: self.ctx.types.never(), has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn check_assign(&mut self, place: &mut Expr, value: &mut Expr, span: Span) -> SemanticResult<ExprInfo> {
        let place_info = self.check_expr(place, TypeExpectation::None)?;
        if !place_info.is_place {
            return Err(SemanticError::new("left-hand side of an assignment must be a place", span));
        }
        if !place_info.is_mut {
            return Err(SemanticError::new("cannot assign to an immutable place", span));
        }
        let value_info = self.check_expr(value, TypeExpectation::Exact(place_info.ty))?;
        if !self.ctx.types.is_assignable_to(value_info.ty, place_info.ty) {
            return Err(SemanticError::new("assigned value's type does not match the place's type", value.span));
        }
        let endpoints = seq(&seq(&normal_set(), &place_info.endpoints), &value_info.endpoints);
        let unit = self.ctx.types.unit();
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { unit };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn check_cast(&mut self, operand: &mut Expr, target: &mut TypeAnnotation, span: Span) -> SemanticResult<ExprInfo> {
        let target_ty = self.ctx.type_query(target)?;
        let info = self.check_expr(operand, TypeExpectation::None)?;
        if !self.ctx.types.is_castable_to(info.ty, target_ty) {
            return Err(SemanticError::new("invalid cast", span));
        }
        let endpoints = seq(&normal_set(), &info.endpoints);
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { target_ty };
        let mut out = ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None };
        if let Some(cv) = &info.const_value {
            out.const_value = self.fold_cast(cv, target_ty);
        }
        Ok(out)
    }

    fn fold_cast(&self, cv: &ConstVariant, target: TypeId) -> Option<ConstVariant> {
        let target_prim = match self.ctx.types.resolve(target) {
            Type::Primitive(p) => *p,
            _ => return None,
        };
        match (cv, target_prim) {
            (ConstVariant::IntConst(v), p) if p.is_signed() => Some(ConstVariant::IntConst(*v)),
            (ConstVariant::IntConst(v), p) if p.is_integer() => Some(ConstVariant::UintConst(*v as u32)),
            (ConstVariant::UintConst(v), p) if p.is_signed() => Some(ConstVariant::IntConst(*v as i32)),
            (ConstVariant::UintConst(v), p) if p.is_integer() => Some(ConstVariant::UintConst(*v)),
            (ConstVariant::BoolConst(b), Primitive::Bool) => Some(ConstVariant::BoolConst(*b)),
            (ConstVariant::CharConst(c), Primitive::Char) => Some(ConstVariant::CharConst(*c)),
            (ConstVariant::StringConst(s), Primitive::String) => Some(ConstVariant::StringConst(*s)),
            _ => None,
        }
    }

    fn check_struct_literal(&mut self, def_ref: StructId, name: Symbol, fields: &mut [(Symbol, Expr)], span: Span) -> SemanticResult<ExprInfo> {
        let def_id = self.ctx.struct_def_id(def_ref);
        let struct_ty = self.ctx.types.struct_ty(def_id);
        let expected_fields = self
            .ctx
            .struct_info(def_id)
            .ok_or_else(|| SemanticError::new("internal error: unknown struct", span))?
            .fields
            .clone();
        if fields.len() != expected_fields.len() {
            return Err(SemanticError::new(
                format!("struct `{}` literal has the wrong number of fields", name.as_str()),
                span,
            ));
        }
        let mut endpoints = normal_set();
        for (fname, fexpr) in fields.iter_mut() {
            let expected_ty = expected_fields
                .iter()
                .find(|(n, _)| n == fname)
                .map(|(_, t)| *t)
                .ok_or_else(|| SemanticError::new(format!("no field `{}` on struct `{}`", fname.as_str(), name.as_str()), fexpr.span))?;
            let info = self.check_expr(fexpr, TypeExpectation::Exact(expected_ty))?;
            if !self.ctx.types.is_assignable_to(info.ty, expected_ty) {
                return Err(SemanticError::new(format!("field `{}` has the wrong type", fname.as_str()), fexpr.span));
            }
            endpoints = seq(&endpoints, &info.endpoints);
        }
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { struct_ty };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn element_expectation(&self, expect: TypeExpectation) -> TypeExpectation {
        match expect {
            TypeExpectation::Exact(ty) => match self.ctx.types.resolve(ty) {
                Type::Array { element, .. } => TypeExpectation::Exact(*element),
                _ => TypeExpectation::None,
            },
            TypeExpectation::None => TypeExpectation::None,
        }
    }

    fn check_array_literal(&mut self, elems: &mut [Expr], expect: TypeExpectation, span: Span) -> SemanticResult<ExprInfo> {
        if elems.is_empty() {
            return Err(SemanticError::new("array literal must have at least one element", span));
        }
        let elem_expect = self.element_expectation(expect);
        let mut infos = Vec::with_capacity(elems.len());
        for e in elems.iter_mut() {
            infos.push(self.check_expr(e, elem_expect)?);
        }
        let mut common: Option<TypeId> = None;
        for info in &infos {
            if info.has_type {
                common = Some(match common {
                    Some(c) => self
                        .ctx
                        .types
                        .find_common_type(c, info.ty)
                        .ok_or_else(|| SemanticError::new("array elements have incompatible types", span))?,
                    None => info.ty,
                });
            }
        }
        let common = common.unwrap_or(infos[0].ty);

        let mut endpoints = normal_set();
        for (i, e) in elems.iter_mut().enumerate() {
            let info = if infos[i].ty != common || !infos[i].has_type {
                let info2 = self.check_expr(e, TypeExpectation::Exact(common))?;
                if !self.ctx.types.is_assignable_to(info2.ty, common) {
                    return Err(SemanticError::new("array elements have incompatible types", e.span));
                }
                info2
            } else {
                infos[i].clone()
            };
            endpoints = seq(&endpoints, &info.endpoints);
        }
        let arr_ty = self.ctx.types.array(common, elems.len());
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { arr_ty };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn check_array_repeat(&mut self, value: &mut Expr, count: &mut Expr, expect: TypeExpectation, span: Span) -> SemanticResult<ExprInfo> {
        let elem_expect = self.element_expectation(expect);
        let value_info = self.check_expr(value, elem_expect)?;
        let usize_ty = self.ctx.types.primitive(Primitive::Usize);
        let count_info = self.check_expr(count, TypeExpectation::Exact(usize_ty))?;
        if !self.ctx.types.is_assignable_to(count_info.ty, usize_ty) {
            return Err(SemanticError::new("array-repeat count must be `usize`", count.span));
        }
        let size = match &count_info.const_value {
            Some(ConstVariant::UintConst(n)) => *n as usize,
            Some(ConstVariant::IntConst(n)) if *n >= 0 => *n as usize,
            _ => return Err(SemanticError::new("array-repeat count must be a constant expression", count.span)),
        };
        let endpoints = seq(&seq(&normal_set(), &value_info.endpoints), &count_info.endpoints);
        let arr_ty = self.ctx.types.array(value_info.ty, size);
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { arr_ty };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn check_call(&mut self, callee: &mut Expr, args: &mut [Expr], span: Span) -> SemanticResult<ExprInfo> {
        if let ExprKind::Name(NameUse::UnresolvedIdentifier(name)) = &callee.kind {
            if let Some(id) = self.ctx.impls.lookup_predefined_function(*name) {
                return self.check_predefined_call(id, args, span);
            }
        }
        let (params, ret) = match &callee.kind {
            ExprKind::Name(NameUse::FuncUse(id)) => {
                let sig = self.ctx.function_sig(*id);
                (sig.params.clone(), sig.ret)
            }
            ExprKind::Name(NameUse::StructStatic { assoc_fn, .. }) => {
                let sig = self.ctx.function_sig(*assoc_fn);
                (sig.params.clone(), sig.ret)
            }
            _ => return Err(SemanticError::new("this expression is not callable", span)),
        };
        if args.len() != params.len() {
            return Err(SemanticError::new("wrong number of arguments", span));
        }
        let mut endpoints = normal_set();
        for (arg, expected_ty) in args.iter_mut().zip(params.iter()) {
            let info = self.check_expr(arg, TypeExpectation::Exact(*expected_ty))?;
            if !self.ctx.types.is_assignable_to(info.ty, *expected_ty) {
                return Err(SemanticError::new("argument type mismatch", arg.span));
            }
            endpoints = seq(&endpoints, &info.endpoints);
        }
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { ret };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    /// Builtin free functions (`print`, `println`, `printInt`, `printlnInt`,
    /// `getString`, `getInt`, `exit`; §2) are recognized by callee name,
    /// never a `FuncUse` — `exit`'s placement (main-only, tail position, at
    /// most once) is `exit_check`'s job; this just type-checks the call
    /// itself against the builtin's fixed signature.
    fn check_predefined_call(
        &mut self,
        id: crate::impl_table::PredefinedFunctionId,
        args: &mut [Expr],
        span: Span,
    ) -> SemanticResult<ExprInfo> {
        let sig = self.ctx.impls.predefined_function_signature(id);
        let (params, ret) = (sig.params.clone(), sig.ret);
        if args.len() != params.len() {
            return Err(SemanticError::new("wrong number of arguments", span));
        }
        let mut endpoints = normal_set();
        for (arg, expected_ty) in args.iter_mut().zip(params.iter()) {
            let info = self.check_expr(arg, TypeExpectation::Exact(*expected_ty))?;
            if !self.ctx.types.is_assignable_to(info.ty, *expected_ty) {
                return Err(SemanticError::new("argument type mismatch", arg.span));
            }
            endpoints = seq(&endpoints, &info.endpoints);
        }
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { ret };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    fn check_method_call(
        &mut self,
        receiver: &mut Expr,
        method_name: Symbol,
        method_slot: &mut Option<MethodRef>,
        args: &mut [Expr],
        span: Span,
    ) -> SemanticResult<ExprInfo> {
        let receiver_info = self.check_expr(receiver, TypeExpectation::None)?;
        let base_ty = strip_references(&self.ctx.types, receiver_info.ty);
        let entry = self
            .ctx
            .impls
            .lookup_method(&self.ctx.types, base_ty, method_name)
            .ok_or_else(|| SemanticError::new(format!("no method `{}` on this type", method_name.as_str()), span))?;
        *method_slot = Some(match entry {
            MethodEntry::User(id) => MethodRef::User(id),
            MethodEntry::Predefined(id) => MethodRef::Predefined(id),
        });
        let (self_mode, params, ret) = match entry {
            MethodEntry::User(id) => {
                let sig = self.ctx.method_sig(id);
                (sig.self_mode, sig.params.clone(), sig.ret)
            }
            MethodEntry::Predefined(pid) => {
                let sig = self.ctx.impls.predefined_signature(pid);
                (sig.self_mode, sig.params.clone(), sig.ret)
            }
        };

        let wants_mut = matches!(self_mode, SelfMode::RefMut);
        let final_receiver_info = if matches!(self_mode, SelfMode::Value) {
            receiver_info.clone()
        } else if let Type::Reference { is_mutable: r_mut, .. } = self.ctx.types.resolve(receiver_info.ty) {
            if wants_mut && !*r_mut {
                return Err(SemanticError::new("method requires a mutable reference to its receiver", span));
            }
            receiver_info.clone()
        } else {
            self.auto_ref_receiver(receiver, &receiver_info, wants_mut, span)?
        };

        if args.len() != params.len() {
            return Err(SemanticError::new("wrong number of arguments", span));
        }
        let mut endpoints = seq(&normal_set(), &final_receiver_info.endpoints);
        for (arg, expected_ty) in args.iter_mut().zip(params.iter()) {
            let info = self.check_expr(arg, TypeExpectation::Exact(*expected_ty))?;
            if !self.ctx.types.is_assignable_to(info.ty, *expected_ty) {
                return Err(SemanticError::new("argument type mismatch", arg.span));
            }
            endpoints = seq(&endpoints, &info.endpoints);
        }
        let ty = if diverges(&endpoints) { self.ctx.types.never() } else { ret };
        Ok(ExprInfo { ty, has_type: true, is_mut: false, is_place: false, endpoints, const_value: None })
    }

    /// Auto-ref for a method-call receiver (§4.4 "Method call"): a place
    /// becomes `&receiver`/`&mut receiver`; a temporary gets the same
    /// fresh-local treatment `&expr` uses (§4.4.1).
    fn auto_ref_receiver(&mut self, receiver: &mut Expr, info: &ExprInfo, is_mut: bool, span: Span) -> SemanticResult<ExprInfo> {
        if info.is_place {
            if is_mut && !info.is_mut {
                return Err(SemanticError::new("method requires a mutable reference to its receiver", span));
            }
            let ref_ty = self.ctx.types.reference(info.ty, is_mut);
            let old = std::mem::replace(receiver, dummy_expr(span));
            let mut out = ExprInfo::normal(ref_ty);
            out.endpoints = info.endpoints.clone();
            if diverges(&out.endpoints) {
                out.ty = self.ctx.types.never();
            }
            let mut wrapped = Expr::new(ExprKind::Unary { op: UnOp::Ref(is_mut), operand: Box::new(old) }, span);
            wrapped.info = Some(out.clone());
            *receiver = wrapped;
            return Ok(out);
        }
        if is_mut {
            return Err(SemanticError::new(
                "method requires a mutable reference to its receiver, but it is a temporary value",
                span,
            ));
        }
        let operand_ty = info.ty;
        let old = std::mem::replace(receiver, dummy_expr(span));
        let mut block = self.synth_temp_ref_block(old, operand_ty, span);
        let block_info = self.check_block(&mut block, TypeExpectation::None)?;
        *receiver = Expr::new(ExprKind::Block(block), span);
        receiver.info = Some(block_info.clone());
        Ok(block_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_drops_normal_once_diverged() {
        let mut a = HashSet::new();
        a.insert(Endpoint::Continue { target: None });
        let b = normal_set();
        let out = seq(&a, &b);
        assert_eq!(out, a);
    }

    #[test]
    fn sequence_extends_with_followup_when_normal() {
        let a = normal_set();
        let mut b = HashSet::new();
        b.insert(Endpoint::Continue { target: None });
        let out = seq(&a, &b);
        assert_eq!(out, b);
    }

    #[test]
    fn merge_is_union() {
        let mut a = HashSet::new();
        a.insert(Endpoint::Normal);
        let mut b = HashSet::new();
        b.insert(Endpoint::Continue { target: None });
        let out = merge(&a, &b);
        assert!(out.contains(&Endpoint::Normal));
        assert!(out.contains(&Endpoint::Continue { target: None }));
    }

    #[test]
    fn diverges_iff_normal_absent() {
        assert!(!diverges(&normal_set()));
        let mut only_return = HashSet::new();
        only_return.insert(Endpoint::Return { target: None, value_type: TypeId(0) });
        assert!(diverges(&only_return));
    }
}
