//! C8: `exit()`-placement checking (§4.7). `exit()` is a built-in, not a
//! user function, so it never goes through name resolution's `FuncUse`
//! path — `check.rs` type-checks the call itself (as `fn(i32) -> ()`) by
//! recognizing the callee name, but leaves the callee node as the raw
//! unresolved identifier it already was. This pass re-walks the body
//! independently, matching that same shape, and enforces placement:
//! `exit()` may appear only as the lexically final statement of `main`'s
//! body, and at most once.

use crate::error::{SemanticError, SemanticResult};
use crate::hir::*;
use faxc_util::Symbol;

/// The surface name the checker watches for when resolving a `Call`.
pub fn is_exit_name(name: Symbol) -> bool {
    name.eq_str("exit")
}

/// Checks one function's body assuming `is_main` tells us whether `exit()`
/// is allowed here at all. Looks for `exit()` calls anywhere in the body
/// (as a bare `Stmt::Expr(Call { callee: Name(FuncUse...) })` is never
/// produced for `exit` since it has no `FunctionId` — it surfaces as an
/// unresolved callee the checker special-cased; `check.rs` tags such a call
/// by setting `ExprInfo.const_value` is not appropriate, so it reports via a
/// side channel: this function re-walks the already-checked body looking
/// for `ExprKind::Call` whose callee is the literal name `exit`.
pub fn check_function_body(body: &Block, is_main: bool) -> SemanticResult<()> {
    let mut seen = false;
    check_block(body, is_main, true, &mut seen)
}

fn check_block(block: &Block, is_main: bool, is_tail_position: bool, seen: &mut bool) -> SemanticResult<()> {
    let stmt_count = block.stmts.len();
    for (i, stmt) in block.stmts.iter().enumerate() {
        let is_last_stmt = i + 1 == stmt_count && block.trailing.is_none();
        let stmt_is_tail = is_tail_position && is_last_stmt;
        match stmt {
            Stmt::Let(l) => {
                if let Some(init) = &l.init {
                    check_expr(init, is_main, false, seen)?;
                }
            }
            Stmt::Expr(e) => check_expr(e, is_main, stmt_is_tail, seen)?,
            Stmt::Item(_) => {}
        }
    }
    if let Some(trailing) = &block.trailing {
        check_expr(trailing, is_main, is_tail_position, seen)?;
    } else if is_tail_position && stmt_count == 0 {
        // empty body: nothing to check
    }
    Ok(())
}

fn is_exit_call(expr: &Expr) -> bool {
    matches!(
        &expr.kind,
        ExprKind::Call { callee, .. } if matches!(
            &callee.kind,
            ExprKind::Name(NameUse::UnresolvedIdentifier(name)) if is_exit_name(*name)
        )
    )
}

fn check_expr(expr: &Expr, is_main: bool, is_tail_position: bool, seen: &mut bool) -> SemanticResult<()> {
    if is_exit_call(expr) {
        if !is_main {
            return Err(SemanticError::new(
                "`exit()` may only be called from `main`",
                expr.span,
            ));
        }
        if !is_tail_position {
            return Err(SemanticError::new(
                "`exit()` must be the final statement of `main`",
                expr.span,
            ));
        }
        if *seen {
            return Err(SemanticError::new(
                "`exit()` called more than once in `main`",
                expr.span,
            ));
        }
        *seen = true;
        return Ok(());
    }
    match &expr.kind {
        ExprKind::Block(block) => check_block(block, is_main, false, seen),
        ExprKind::If { then_branch, else_branch, .. } => {
            check_block(then_branch, is_main, false, seen)?;
            if let Some(e) = else_branch {
                check_expr(e, is_main, false, seen)?;
            }
            Ok(())
        }
        ExprKind::Loop { body, .. } | ExprKind::While { body, .. } => check_block(body, is_main, false, seen),
        ExprKind::Call { args, .. } => {
            for a in args {
                check_expr(a, is_main, false, seen)?;
            }
            Ok(())
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            check_expr(receiver, is_main, false, seen)?;
            for a in args {
                check_expr(a, is_main, false, seen)?;
            }
            Ok(())
        }
        ExprKind::Binary { left, right, .. } => {
            check_expr(left, is_main, false, seen)?;
            check_expr(right, is_main, false, seen)
        }
        ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => {
            check_expr(operand, is_main, false, seen)
        }
        ExprKind::Field { base, .. } => check_expr(base, is_main, false, seen),
        ExprKind::Index { base, index } => {
            check_expr(base, is_main, false, seen)?;
            check_expr(index, is_main, false, seen)
        }
        ExprKind::Assign { place, value } => {
            check_expr(place, is_main, false, seen)?;
            check_expr(value, is_main, false, seen)
        }
        ExprKind::StructLiteral { fields, .. } => {
            for (_, v) in fields {
                check_expr(v, is_main, false, seen)?;
            }
            Ok(())
        }
        ExprKind::ArrayLiteral(elems) => {
            for e in elems {
                check_expr(e, is_main, false, seen)?;
            }
            Ok(())
        }
        ExprKind::ArrayRepeat { value, count } => {
            check_expr(value, is_main, false, seen)?;
            check_expr(count, is_main, false, seen)
        }
        ExprKind::Break { value, .. } | ExprKind::Return { value, .. } => {
            if let Some(v) = value {
                check_expr(v, is_main, false, seen)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
