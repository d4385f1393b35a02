//! C7: control-flow linking (§4.6). A single walk over every function and
//! method body that fills in `Break`/`Continue`/`Return`'s `target` field —
//! the expression checker (C5) already computed everything *about* the
//! jump (value type, endpoint bookkeeping); this pass just says *where to*.
//!
//! Two stacks track the innermost enclosing construct of each kind: loop
//! ids for `break`/`continue`, function-or-method identity for `return`.
//! Reaching either statement with an empty stack is a semantic error — the
//! parser accepts `break`/`return` anywhere a statement can appear, so nothing
//! upstream has already ruled this out.

use crate::error::{SemanticError, SemanticResult};
use crate::hir::*;

pub fn link_program(program: &mut Program) -> SemanticResult<()> {
    for i in 0..program.functions.len() {
        let mut f = std::mem::replace(&mut program.functions[i], dummy_fn());
        let target = FuncTarget::Function(FunctionId(i as u32));
        let mut linker = Linker { loop_stack: Vec::new(), func_target: target };
        linker.link_block(&mut f.body)?;
        program.functions[i] = f;
    }
    for i in 0..program.methods.len() {
        let mut m = std::mem::replace(&mut program.methods[i], dummy_method());
        let target = FuncTarget::Method(MethodId(i as u32));
        let mut linker = Linker { loop_stack: Vec::new(), func_target: target };
        linker.link_block(&mut m.body)?;
        program.methods[i] = m;
    }
    Ok(())
}

fn dummy_fn() -> FnItem {
    FnItem {
        def_id: faxc_util::DefId::DUMMY,
        name: faxc_util::Symbol::intern(""),
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
        name: faxc_util::Symbol::intern(""),
        self_mode: SelfMode::Value,
        params: Vec::new(),
        ret_type: TypeAnnotation::Unresolved(UnresolvedType::Unit),
        locals: Vec::new(),
        body: Block { stmts: Vec::new(), trailing: None, span: faxc_util::Span::DUMMY, info: None },
        span: faxc_util::Span::DUMMY,
        owning_impl: ImplId(0),
    }
}

struct Linker {
    loop_stack: Vec<LoopId>,
    func_target: FuncTarget,
}

impl Linker {
    fn link_block(&mut self, block: &mut Block) -> SemanticResult<()> {
        for stmt in &mut block.stmts {
            match stmt {
                Stmt::Let(l) => {
                    if let Some(init) = &mut l.init {
                        self.link_expr(init)?;
                    }
                }
                Stmt::Expr(e) => self.link_expr(e)?,
                Stmt::Item(_) => {}
            }
        }
        if let Some(trailing) = &mut block.trailing {
            self.link_expr(trailing)?;
        }
        Ok(())
    }

    fn link_expr(&mut self, expr: &mut Expr) -> SemanticResult<()> {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::TypeStatic(_) => {}
            ExprKind::Binary { left, right, .. } => {
                self.link_expr(left)?;
                self.link_expr(right)?;
            }
            ExprKind::Unary { operand, .. } => self.link_expr(operand)?,
            ExprKind::Call { callee, args } => {
                self.link_expr(callee)?;
                for a in args {
                    self.link_expr(a)?;
                }
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                self.link_expr(receiver)?;
                for a in args {
                    self.link_expr(a)?;
                }
            }
            ExprKind::Field { base, .. } => self.link_expr(base)?,
            ExprKind::Index { base, index } => {
                self.link_expr(base)?;
                self.link_expr(index)?;
            }
            ExprKind::Block(block) => self.link_block(block)?,
            ExprKind::If { cond, then_branch, else_branch } => {
                self.link_expr(cond)?;
                self.link_block(then_branch)?;
                if let Some(e) = else_branch {
                    self.link_expr(e)?;
                }
            }
            ExprKind::Loop { id, body, .. } => {
                self.loop_stack.push(*id);
                self.link_block(body)?;
                self.loop_stack.pop();
            }
            ExprKind::While { id, cond, body } => {
                self.link_expr(cond)?;
                self.loop_stack.push(*id);
                self.link_block(body)?;
                self.loop_stack.pop();
            }
            ExprKind::Assign { place, value } => {
                self.link_expr(place)?;
                self.link_expr(value)?;
            }
            ExprKind::Cast { operand, .. } => self.link_expr(operand)?,
            ExprKind::StructLiteral { fields, .. } => {
                for (_, v) in fields {
                    self.link_expr(v)?;
                }
            }
            ExprKind::ArrayLiteral(elems) => {
                for e in elems {
                    self.link_expr(e)?;
                }
            }
            ExprKind::ArrayRepeat { value, count } => {
                self.link_expr(value)?;
                self.link_expr(count)?;
            }
            ExprKind::Break { value, target } => {
                if let Some(v) = value {
                    self.link_expr(v)?;
                }
                *target = Some(
                    *self
                        .loop_stack
                        .last()
                        .ok_or_else(|| SemanticError::new("`break` outside of a loop", span))?,
                );
            }
            ExprKind::Continue { target } => {
                *target = Some(
                    *self
                        .loop_stack
                        .last()
                        .ok_or_else(|| SemanticError::new("`continue` outside of a loop", span))?,
                );
            }
            ExprKind::Return { value, target } => {
                if let Some(v) = value {
                    self.link_expr(v)?;
                }
                *target = Some(self.func_target);
            }
        }
        Ok(())
    }
}
