//! C3: name resolution (§4.2). Walks every function/method body and const
//! value, rewriting `NameUse::UnresolvedIdentifier`/`TypeStatic` nodes and
//! `LocalRef::Unresolved` pattern bindings into their resolved forms.
//!
//! Lexical scoping is a stack of ribs (`scope.rs`) with one extension that
//! module lives on top of: each block is resolved in two passes — item
//! names are hoisted into the new rib before any statement is walked, so a
//! `let`/expr sees every sibling item regardless of textual order, while
//! `let` bindings only become visible to the statements that follow them.
//! Crossing a function boundary hides outer *bindings* (locals) but not
//! outer items — those stay reachable from anywhere via the hoisted module
//! rib.

use crate::context::Context;
use crate::error::{SemanticError, SemanticResult};
use crate::hir::*;
use crate::scope::{Binding, RibKind, ScopeTree};
use faxc_util::Symbol;

pub fn resolve_program(program: &mut Program, ctx: &mut Context) -> SemanticResult<()> {
    let mut scopes = ScopeTree::new();
    hoist_module_items(program, &mut scopes)?;

    for i in 0..program.consts.len() {
        let mut value = std::mem::replace(&mut program.consts[i].value, Expr::new(ExprKind::Literal(Literal::Unit), faxc_util::Span::DUMMY));
        let mut no_locals = Vec::new();
        let mut r = Resolver { ctx: &mut *ctx, scopes: &mut scopes, locals: &mut no_locals };
        r.resolve_expr(&mut value, false)?;
        program.consts[i].value = value;
    }

    for i in 0..program.functions.len() {
        let mut f = std::mem::replace(&mut program.functions[i], dummy_fn());
        resolve_fn_like(ctx, &mut scopes, &mut f.locals, &f.params, &mut f.body)?;
        program.functions[i] = f;
    }

    for i in 0..program.methods.len() {
        let mut m = std::mem::replace(&mut program.methods[i], dummy_method());
        resolve_fn_like(ctx, &mut scopes, &mut m.locals, &m.params, &mut m.body)?;
        program.methods[i] = m;
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
        body: Block { stmts: Vec::new(), trailing: None, span: faxc_util::Span::DUMMY, info: None },
        span: faxc_util::Span::DUMMY,
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
        body: Block { stmts: Vec::new(), trailing: None, span: faxc_util::Span::DUMMY, info: None },
        span: faxc_util::Span::DUMMY,
        owning_impl: ImplId(0),
    }
}

fn hoist_module_items(program: &Program, scopes: &mut ScopeTree) -> SemanticResult<()> {
    for (i, s) in program.structs.iter().enumerate() {
        bind_checked(scopes, s.name, Binding::Struct(StructId(i as u32)), s.span)?;
    }
    for (i, e) in program.enums.iter().enumerate() {
        bind_checked(scopes, e.name, Binding::Enum(EnumId(i as u32)), e.span)?;
    }
    for (i, f) in program.functions.iter().enumerate() {
        bind_checked(scopes, f.name, Binding::Function(FunctionId(i as u32)), f.span)?;
    }
    for (i, c) in program.consts.iter().enumerate() {
        bind_checked(scopes, c.name, Binding::Const(ConstId(i as u32)), c.span)?;
    }
    Ok(())
}

fn bind_checked(
    scopes: &mut ScopeTree,
    name: Symbol,
    binding: Binding,
    span: faxc_util::Span,
) -> SemanticResult<()> {
    if scopes.add_binding(name, binding).is_some() {
        return Err(SemanticError::new(
            format!("duplicate item `{}`", name.as_str()),
            span,
        ));
    }
    Ok(())
}

fn resolve_fn_like(
    ctx: &mut Context,
    scopes: &mut ScopeTree,
    locals: &mut Vec<LocalDef>,
    params: &[LocalId],
    body: &mut Block,
) -> SemanticResult<()> {
    scopes.enter_scope(RibKind::Function);
    for &p in params {
        let name = locals[p.0 as usize].name;
        scopes.add_binding(name, Binding::Local(p));
    }
    let mut r = Resolver { ctx, scopes, locals };
    r.resolve_block(body)?;
    r.scopes.exit_scope();
    Ok(())
}

struct Resolver<'a> {
    ctx: &'a mut Context,
    scopes: &'a mut ScopeTree,
    locals: &'a mut Vec<LocalDef>,
}

impl<'a> Resolver<'a> {
    /// Boundary-aware lookup: a `Binding::Local` beyond the nearest enclosing
    /// function rib is invisible; every other binding kind is visible from
    /// anywhere (§4.2).
    fn lookup(&self, name: Symbol) -> Option<Binding> {
        let mut rib_id = self.scopes.current_rib;
        let mut crossed_boundary = false;
        loop {
            let rib = &self.scopes.ribs[rib_id];
            if let Some(&binding) = rib.bindings.get(&name) {
                let visible = !matches!((binding, crossed_boundary), (Binding::Local(_), true));
                if visible {
                    return Some(binding);
                }
            }
            if matches!(rib.kind, RibKind::Function) {
                crossed_boundary = true;
            }
            match rib.parent {
                Some(parent) => rib_id = parent,
                None => return None,
            }
        }
    }

    fn resolve_block(&mut self, block: &mut Block) -> SemanticResult<()> {
        self.scopes.enter_scope(RibKind::Block);
        for stmt in &block.stmts {
            if let Stmt::Item(item) = stmt {
                self.hoist_item(*item)?;
            }
        }
        for stmt in &mut block.stmts {
            self.resolve_stmt(stmt)?;
        }
        if let Some(trailing) = &mut block.trailing {
            self.resolve_expr(trailing, false)?;
        }
        self.scopes.exit_scope();
        Ok(())
    }

    fn hoist_item(&mut self, item: Item) -> SemanticResult<()> {
        match item {
            Item::Function(id) => {
                let name = self.ctx_program_fn_name(id);
                self.scopes.add_binding(name, Binding::Function(id));
            }
            Item::StructDef(id) => {
                let name = self.ctx_program_struct_name(id);
                self.scopes.add_binding(name, Binding::Struct(id));
            }
            Item::EnumDef(id) => {
                let name = self.ctx_program_enum_name(id);
                self.scopes.add_binding(name, Binding::Enum(id));
            }
            Item::ConstDef(id) => {
                let name = self.ctx_program_const_name(id);
                self.scopes.add_binding(name, Binding::Const(id));
            }
            Item::Trait(_) | Item::Impl(_) => {}
        }
        Ok(())
    }

    // These helpers look the defining item's name up via the context's name
    // tables built at construction time rather than re-borrowing `Program`,
    // which the resolver does not hold a reference to while body-walking.
    fn ctx_program_fn_name(&self, id: FunctionId) -> Symbol {
        self.ctx
            .func_names
            .iter()
            .find(|(_, &v)| v == id)
            .map(|(k, _)| *k)
            .expect("hoisted function id must be registered")
    }
    fn ctx_program_struct_name(&self, id: StructId) -> Symbol {
        self.ctx
            .struct_names
            .iter()
            .find(|(_, &(v, _))| v == id)
            .map(|(k, _)| *k)
            .expect("hoisted struct id must be registered")
    }
    fn ctx_program_enum_name(&self, id: EnumId) -> Symbol {
        self.ctx
            .enum_names
            .iter()
            .find(|(_, &(v, _))| v == id)
            .map(|(k, _)| *k)
            .expect("hoisted enum id must be registered")
    }
    fn ctx_program_const_name(&self, id: ConstId) -> Symbol {
        self.ctx
            .const_names
            .iter()
            .find(|(_, &v)| v == id)
            .map(|(k, _)| *k)
            .expect("hoisted const id must be registered")
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) -> SemanticResult<()> {
        match stmt {
            Stmt::Let(let_stmt) => {
                if let Some(init) = &mut let_stmt.init {
                    self.resolve_expr(init, false)?;
                }
                self.resolve_pattern(&mut let_stmt.pattern)?;
            }
            Stmt::Expr(expr) => self.resolve_expr(expr, false)?,
            Stmt::Item(_) => {}
        }
        Ok(())
    }

    /// `is_callee` permits `NameUse::FuncUse` to survive resolution — any
    /// other position rejects a function name used as a bare value (§4.2).
    fn resolve_expr(&mut self, expr: &mut Expr, is_callee: bool) -> SemanticResult<()> {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Name(name_use) => {
                self.resolve_name_use(name_use, is_callee, span)?;
            }
            ExprKind::TypeStatic(ts) => {
                let resolved = self.resolve_type_static(ts, span)?;
                expr.kind = resolved;
            }
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left, false)?;
                self.resolve_expr(right, false)?;
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand, false)?,
            ExprKind::Call { callee, args } => {
                self.resolve_expr(callee, true)?;
                for a in args {
                    self.resolve_expr(a, false)?;
                }
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                self.resolve_expr(receiver, false)?;
                for a in args {
                    self.resolve_expr(a, false)?;
                }
            }
            ExprKind::Field { base, .. } => self.resolve_expr(base, false)?,
            ExprKind::Index { base, index } => {
                self.resolve_expr(base, false)?;
                self.resolve_expr(index, false)?;
            }
            ExprKind::Block(block) => self.resolve_block(block)?,
            ExprKind::If { cond, then_branch, else_branch } => {
                self.resolve_expr(cond, false)?;
                self.resolve_block(then_branch)?;
                if let Some(e) = else_branch {
                    self.resolve_expr(e, false)?;
                }
            }
            ExprKind::Loop { body, .. } => self.resolve_block(body)?,
            ExprKind::While { cond, body, .. } => {
                self.resolve_expr(cond, false)?;
                self.resolve_block(body)?;
            }
            ExprKind::Assign { place, value } => {
                self.resolve_expr(place, false)?;
                self.resolve_expr(value, false)?;
            }
            ExprKind::Cast { operand, .. } => self.resolve_expr(operand, false)?,
            ExprKind::StructLiteral { def_ref, name, fields } => {
                match self.ctx.struct_names.get(name) {
                    Some(&(struct_id, _)) => *def_ref = struct_id,
                    None => {
                        return Err(SemanticError::new(
                            format!("no struct named `{}`", name.as_str()),
                            span,
                        ));
                    }
                }
                for (_, v) in fields {
                    self.resolve_expr(v, false)?;
                }
            }
            ExprKind::ArrayLiteral(elems) => {
                for e in elems {
                    self.resolve_expr(e, false)?;
                }
            }
            ExprKind::ArrayRepeat { value, count } => {
                self.resolve_expr(value, false)?;
                self.resolve_expr(count, false)?;
            }
            ExprKind::Break { value, .. } => {
                if let Some(v) = value {
                    self.resolve_expr(v, false)?;
                }
            }
            ExprKind::Continue { .. } => {}
            ExprKind::Return { value, .. } => {
                if let Some(v) = value {
                    self.resolve_expr(v, false)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_name_use(
        &mut self,
        name_use: &mut NameUse,
        is_callee: bool,
        span: faxc_util::Span,
    ) -> SemanticResult<()> {
        let name = match name_use {
            NameUse::UnresolvedIdentifier(name) => *name,
            _ => return Ok(()),
        };
        // Builtin free functions (`print`, `println`, `printInt`,
        // `printlnInt`, `getString`, `getInt`, `exit`; §2) are recognized by
        // callee name in `check.rs`, not bound here like a user function —
        // leave the identifier unresolved so it can fail at the call site if
        // it isn't actually called, or be matched by `exit_check`.
        if is_callee && self.ctx.impls.lookup_predefined_function(name).is_some() && self.lookup(name).is_none() {
            return Ok(());
        }
        let binding = self.lookup(name).ok_or_else(|| {
            SemanticError::new(format!("cannot find `{}` in this scope", name.as_str()), span)
        })?;
        *name_use = match binding {
            Binding::Local(id) => NameUse::Variable(id),
            Binding::Const(id) => NameUse::ConstUse(id),
            Binding::Function(id) => {
                if !is_callee {
                    return Err(SemanticError::new(
                        format!("function `{}` used as a value; it must be called", name.as_str()),
                        span,
                    ));
                }
                NameUse::FuncUse(id)
            }
            Binding::Struct(_) | Binding::Enum(_) => {
                return Err(SemanticError::new(
                    format!("expected a value, found type `{}`", name.as_str()),
                    span,
                ));
            }
        };
        Ok(())
    }

    fn resolve_type_static(
        &mut self,
        ts: &TypeStatic,
        span: faxc_util::Span,
    ) -> SemanticResult<ExprKind> {
        if let Some(&(struct_id, def_id)) = self.ctx.struct_names.get(&ts.ty_name) {
            let self_ty = self.ctx.types.struct_ty(def_id);
            if let Some(assoc_const) = self.ctx.impls.lookup_const(self_ty, ts.member_name) {
                return Ok(ExprKind::Name(NameUse::StructConst { def_ref: struct_id, assoc_const }));
            }
            if let Some(assoc_fn) = self.ctx.impls.lookup_function(self_ty, ts.member_name) {
                return Ok(ExprKind::Name(NameUse::StructStatic { def_ref: struct_id, assoc_fn }));
            }
            return Err(SemanticError::new(
                format!(
                    "no associated item `{}` on `{}`",
                    ts.member_name.as_str(),
                    ts.ty_name.as_str()
                ),
                span,
            ));
        }
        if let Some(&(enum_id, def_id)) = self.ctx.enum_names.get(&ts.ty_name) {
            if let Some((index, _)) = self.ctx.enum_variant(def_id, ts.member_name) {
                return Ok(ExprKind::Name(NameUse::EnumVariant { def_ref: enum_id, index }));
            }
            return Err(SemanticError::new(
                format!(
                    "no variant `{}` on enum `{}`",
                    ts.member_name.as_str(),
                    ts.ty_name.as_str()
                ),
                span,
            ));
        }
        Err(SemanticError::new(
            format!("unknown type `{}`", ts.ty_name.as_str()),
            span,
        ))
    }

    /// Allocates a fresh `Local` for every still-unresolved binding pattern
    /// (`let`/param); a pattern that is already `Resolved` is left untouched
    /// and only bound into the current rib.
    fn resolve_pattern(&mut self, pattern: &mut Pattern) -> SemanticResult<()> {
        match pattern {
            Pattern::Wildcard => Ok(()),
            Pattern::ReferencePattern { subpattern, .. } => self.resolve_pattern(subpattern),
            Pattern::BindingDef(local_ref) => {
                let id = match local_ref {
                    LocalRef::Resolved(id) => *id,
                    LocalRef::Unresolved { name, is_mut, .. } => {
                        let id = LocalId(self.locals.len() as u32);
                        self.locals.push(LocalDef {
                            name: *name,
                            is_mutable: *is_mut,
                            ty: TypeAnnotation::Unresolved(UnresolvedType::Underscore),
                            span: faxc_util::Span::DUMMY,
                        });
                        *local_ref = LocalRef::Resolved(id);
                        id
                    }
                };
                let name = self.locals[id.0 as usize].name;
                self.scopes.add_binding(name, Binding::Local(id));
                Ok(())
            }
        }
    }
}
