//! Target code generation for fused preprocessing kernels.
//!
//! Takes a lowered [`imgfuse_lower::Program`] and emits a single C (CPU) or
//! CUDA (GPU) translation unit implementing the `FuseKernel`/`FuseKernelCU`
//! entry point described in the interface contract.
//!
//! # Modules
//!
//! - [`error`] -- Error types for code-generation failure modes
//! - [`ident`] -- Identifier sanitization for target-legal names
//! - [`spelling`] -- Operator/intrinsic spelling tables shared by both targets
//! - [`codegen`] -- The expression/statement visitor that prints target code
//! - [`runtime`] -- Prelude, precompute helpers, and dispatch assembly

pub mod codegen;
pub mod error;
pub mod ident;
pub mod runtime;
pub mod spelling;

pub use codegen::{emit_kernel_body, IoBinding, Target};
pub use error::CodegenError;

use imgfuse_lower::Program;

/// Compiles a lowered program into a complete translation unit for `target`.
pub fn compile(program: &Program, target: Target, block_size: u32) -> Result<String, CodegenError> {
    let io = IoBinding::new(&program.input.name, &program.output.name);
    let body = emit_kernel_body(&program.output, &program.defs, target, io)?;
    runtime::assemble_translation_unit(program, &body, target, block_size)
}
