//! Operator and call-target enumerations used by `Expr`/`Stmt` nodes.
//!
//! Kept separate from `expr.rs` so the code generator's operator-spelling
//! tables (imgfuse-codegen) can match exhaustively over these small, closed
//! enums without pulling in the whole expression tree.

use serde::{Deserialize, Serialize};

/// Binary arithmetic/selection operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Max,
    Min,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

/// Unary operators. `Cast` carries its own target type and is modeled on
/// `Unary` directly (see `expr.rs`) rather than here, since it needs a
/// `ScalarType` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Abs,
    Floor,
    Ceil,
    Round,
}

/// Comparison and boolean operators. Always yields `Bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

/// The closed set of callable functions a `Call` node may target.
///
/// `Sync` is the only one every code generator must support (as a no-op
/// comment on CPU, `__syncthreads()` on GPU). The bilinear preprocess calls
/// are resolved to concrete helper bodies by the runtime assembler (4.F);
/// any other name is a hard `UnsupportedCall` error at code-gen time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallFunction {
    Sync,
    BilinearResizePreprocess,
    BilinearFloatResizePreprocess,
    Intrinsic(String),
}

/// Loop-nest scheduling attribute attached to an `IterVar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IterAttrType {
    Default,
    Unrolled,
    ThreadBlockX,
    ThreadBlockY,
}
