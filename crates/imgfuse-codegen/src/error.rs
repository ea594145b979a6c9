//! Codegen error types covering code-generation failure modes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("call to unsupported intrinsic '{name}' on target {target}")]
    UnsupportedCall { name: String, target: &'static str },

    #[error("tensor '{name}' referenced but never defined")]
    UnknownTensor { name: String },

    #[error(transparent)]
    Ir(#[from] imgfuse_ir::IrError),
}
