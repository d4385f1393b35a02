//! C10: constant folding (§4.9, §3.5). Pure arithmetic over already-checked
//! operand values — these helpers don't walk the tree themselves; the
//! expression checker (`check.rs`) calls in whenever both operands of a
//! binary/unary node already carry a `const_value`, and the result becomes
//! that node's own `const_value`. Memoization is therefore free: it's
//! whatever `Expr.info` already caches.

use crate::error::{SemanticError, SemanticResult};
use crate::hir::{BinOp, ConstVariant, UnOp};
use faxc_util::Span;

pub fn fold_unary(op: UnOp, operand: &ConstVariant, _span: Span) -> SemanticResult<Option<ConstVariant>> {
    let result = match (op, operand) {
        (UnOp::Neg, ConstVariant::IntConst(v)) => ConstVariant::IntConst(v.wrapping_neg()),
        (UnOp::Not, ConstVariant::BoolConst(v)) => ConstVariant::BoolConst(!v),
        (UnOp::Not, ConstVariant::UintConst(v)) => ConstVariant::UintConst(!v),
        (UnOp::Not, ConstVariant::IntConst(v)) => ConstVariant::IntConst(!v),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

pub fn fold_binary(
    op: BinOp,
    lhs: &ConstVariant,
    rhs: &ConstVariant,
    span: Span,
) -> SemanticResult<Option<ConstVariant>> {
    use ConstVariant::*;
    let result = match (op, lhs, rhs) {
        (BinOp::Add, IntConst(a), IntConst(b)) => IntConst(a.wrapping_add(*b)),
        (BinOp::Sub, IntConst(a), IntConst(b)) => IntConst(a.wrapping_sub(*b)),
        (BinOp::Mul, IntConst(a), IntConst(b)) => IntConst(a.wrapping_mul(*b)),
        (BinOp::Div, IntConst(a), IntConst(b)) => IntConst(div_zero_checked(*a, *b, span)?),
        (BinOp::Mod, IntConst(a), IntConst(b)) => IntConst(rem_zero_checked(*a, *b, span)?),

        (BinOp::Add, UintConst(a), UintConst(b)) => UintConst(a.wrapping_add(*b)),
        (BinOp::Sub, UintConst(a), UintConst(b)) => UintConst(a.wrapping_sub(*b)),
        (BinOp::Mul, UintConst(a), UintConst(b)) => UintConst(a.wrapping_mul(*b)),
        (BinOp::Div, UintConst(a), UintConst(b)) => UintConst(div_zero_checked_u(*a, *b, span)?),
        (BinOp::Mod, UintConst(a), UintConst(b)) => UintConst(rem_zero_checked_u(*a, *b, span)?),

        (BinOp::BitAnd, IntConst(a), IntConst(b)) => IntConst(a & b),
        (BinOp::BitOr, IntConst(a), IntConst(b)) => IntConst(a | b),
        (BinOp::BitXor, IntConst(a), IntConst(b)) => IntConst(a ^ b),
        (BinOp::BitAnd, UintConst(a), UintConst(b)) => UintConst(a & b),
        (BinOp::BitOr, UintConst(a), UintConst(b)) => UintConst(a | b),
        (BinOp::BitXor, UintConst(a), UintConst(b)) => UintConst(a ^ b),
        (BinOp::Shl, IntConst(a), UintConst(b)) => IntConst(a.wrapping_shl(*b)),
        (BinOp::Shr, IntConst(a), UintConst(b)) => IntConst(a.wrapping_shr(*b)),
        (BinOp::Shl, UintConst(a), UintConst(b)) => UintConst(a.wrapping_shl(*b)),
        (BinOp::Shr, UintConst(a), UintConst(b)) => UintConst(a.wrapping_shr(*b)),

        (BinOp::Eq, a, b) => BoolConst(const_eq(a, b)),
        (BinOp::Ne, a, b) => BoolConst(!const_eq(a, b)),
        (BinOp::Lt, IntConst(a), IntConst(b)) => BoolConst(a < b),
        (BinOp::Le, IntConst(a), IntConst(b)) => BoolConst(a <= b),
        (BinOp::Gt, IntConst(a), IntConst(b)) => BoolConst(a > b),
        (BinOp::Ge, IntConst(a), IntConst(b)) => BoolConst(a >= b),
        (BinOp::Lt, UintConst(a), UintConst(b)) => BoolConst(a < b),
        (BinOp::Le, UintConst(a), UintConst(b)) => BoolConst(a <= b),
        (BinOp::Gt, UintConst(a), UintConst(b)) => BoolConst(a > b),
        (BinOp::Ge, UintConst(a), UintConst(b)) => BoolConst(a >= b),

        (BinOp::And, BoolConst(a), BoolConst(b)) => BoolConst(*a && *b),
        (BinOp::Or, BoolConst(a), BoolConst(b)) => BoolConst(*a || *b),

        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn const_eq(a: &ConstVariant, b: &ConstVariant) -> bool {
    use ConstVariant::*;
    match (a, b) {
        (IntConst(x), IntConst(y)) => x == y,
        (UintConst(x), UintConst(y)) => x == y,
        (BoolConst(x), BoolConst(y)) => x == y,
        (CharConst(x), CharConst(y)) => x == y,
        (StringConst(x), StringConst(y)) => x == y,
        _ => false,
    }
}

fn div_zero_checked(a: i32, b: i32, span: Span) -> SemanticResult<i32> {
    if b == 0 {
        return Err(SemanticError::new("division by zero in constant expression", span));
    }
    Ok(a.wrapping_div(b))
}

fn rem_zero_checked(a: i32, b: i32, span: Span) -> SemanticResult<i32> {
    if b == 0 {
        return Err(SemanticError::new("division by zero in constant expression", span));
    }
    Ok(a.wrapping_rem(b))
}

fn div_zero_checked_u(a: u32, b: u32, span: Span) -> SemanticResult<u32> {
    if b == 0 {
        return Err(SemanticError::new("division by zero in constant expression", span));
    }
    Ok(a / b)
}

fn rem_zero_checked_u(a: u32, b: u32, span: Span) -> SemanticResult<u32> {
    if b == 0 {
        return Err(SemanticError::new("division by zero in constant expression", span));
    }
    Ok(a % b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_integer_addition() {
        let r = fold_binary(BinOp::Add, &ConstVariant::IntConst(2), &ConstVariant::IntConst(3), Span::DUMMY);
        assert_eq!(r.unwrap(), Some(ConstVariant::IntConst(5)));
    }

    #[test]
    fn rejects_division_by_zero() {
        let r = fold_binary(BinOp::Div, &ConstVariant::IntConst(1), &ConstVariant::IntConst(0), Span::DUMMY);
        assert!(r.is_err());
    }

    #[test]
    fn wraps_overflowing_addition() {
        let r = fold_binary(BinOp::Add, &ConstVariant::IntConst(i32::MAX), &ConstVariant::IntConst(1), Span::DUMMY);
        assert_eq!(r.unwrap(), Some(ConstVariant::IntConst(i32::MIN)));
    }
}
