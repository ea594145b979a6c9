//! Operator and intrinsic spelling tables. Both code generators
//! (CPU, CUDA) read these instead of keeping their own copies, since the
//! textual spellings are identical across targets; only the call sites for
//! `Sync` and thread-extent binding diverge (handled in `codegen.rs`).

use imgfuse_ir::{BinaryOp, LogicalOp, ScalarType, UnaryOp};

/// Which syntactic shape a binary operator takes in emitted code.
pub enum BinarySpelling {
    Infix(&'static str),
    Call(&'static str),
}

pub fn binary_spelling(op: BinaryOp) -> BinarySpelling {
    use BinaryOp::*;
    match op {
        Add => BinarySpelling::Infix("+"),
        Sub => BinarySpelling::Infix("-"),
        Mul => BinarySpelling::Infix("*"),
        Div => BinarySpelling::Infix("/"),
        Mod => BinarySpelling::Infix("%"),
        Shl => BinarySpelling::Infix("<<"),
        Shr => BinarySpelling::Infix(">>"),
        BitAnd => BinarySpelling::Infix("&"),
        BitOr => BinarySpelling::Infix("|"),
        BitXor => BinarySpelling::Infix("^"),
        Max => BinarySpelling::Call("IMGFUSE_MAX"),
        Min => BinarySpelling::Call("IMGFUSE_MIN"),
    }
}

pub fn logical_spelling(op: LogicalOp) -> &'static str {
    use LogicalOp::*;
    match op {
        Eq => "==",
        Ne => "!=",
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
        And => "&&",
        Or => "||",
        Not => "!",
    }
}

/// Function name for a unary op other than `Neg` (spelled as prefix `-`).
/// Float32/Float64 pick the single/double-precision libm variant.
pub fn unary_function_name(op: UnaryOp, operand_ty: ScalarType) -> Option<&'static str> {
    use UnaryOp::*;
    let single = operand_ty == ScalarType::Float32;
    match op {
        Neg => None,
        Abs if operand_ty.is_float() => Some(if single { "fabsf" } else { "fabs" }),
        Abs => Some("abs"),
        Floor => Some(if single { "floorf" } else { "floor" }),
        Ceil => Some(if single { "ceilf" } else { "ceil" }),
        Round => Some(if single { "roundf" } else { "round" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_min_are_call_form() {
        assert!(matches!(binary_spelling(BinaryOp::Max), BinarySpelling::Call(_)));
        assert!(matches!(binary_spelling(BinaryOp::Add), BinarySpelling::Infix(_)));
    }

    #[test]
    fn abs_picks_single_precision_variant_for_float32() {
        assert_eq!(unary_function_name(UnaryOp::Abs, ScalarType::Float32), Some("fabsf"));
        assert_eq!(unary_function_name(UnaryOp::Abs, ScalarType::Float64), Some("fabs"));
        assert_eq!(unary_function_name(UnaryOp::Abs, ScalarType::Int32), Some("abs"));
    }

    #[test]
    fn neg_has_no_function_name() {
        assert_eq!(unary_function_name(UnaryOp::Neg, ScalarType::Int32), None);
    }
}
