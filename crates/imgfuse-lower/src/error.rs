//! Build-time error kinds for op-list ingestion and pipeline lowering.

use thiserror::Error;

/// Errors raised while turning an op list into IR.
#[derive(Debug, Error)]
pub enum LowerError {
    #[error("malformed op list: {reason}")]
    MalformedOpList { reason: String },

    #[error("type mismatch lowering '{op}': {detail}")]
    IrTypeMismatch { op: String, detail: String },

    #[error("unbound iteration variable '{name}' while lowering '{op}'")]
    UnboundVariable { name: String, op: String },

    #[error(transparent)]
    Ir(#[from] imgfuse_ir::IrError),
}
