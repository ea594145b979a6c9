//! Runtime assembler: concatenates the language prelude,
//! bilinear precompute helpers, the per-format kernel body produced by
//! [`crate::codegen`], and a dispatch entry point. Grounded in the original
//! `Runtime.hpp` assembly (prelude macros, dispatcher control flow) and
//! `Resize.hpp` (the exact precompute recipe).

use std::rc::Rc;

use imgfuse_ir::{CallFunction, Expr, TensorVar};
use imgfuse_lower::{Format, Interpolation, Program};

use crate::codegen::{emit_expr, scratch_tensors, IoBinding, Target};
use crate::error::CodegenError;
use crate::ident::make_identifier;

fn format_symbol(format: Format) -> &'static str {
    match format {
        Format::Bgr => "BGR",
        Format::Rgb => "RGB",
        Format::Gray => "GRAY",
        Format::Bgra => "BGRA",
        Format::Nv12 => "NV12",
        Format::Nv21 => "NV21",
    }
}

fn precompute_function_name(func: &CallFunction) -> &'static str {
    match func {
        CallFunction::BilinearResizePreprocess => "bilinear_resize_preprocess",
        CallFunction::BilinearFloatResizePreprocess => "bilinear_float_resize_preprocess",
        CallFunction::Sync | CallFunction::Intrinsic(_) => unreachable!("not a precompute table producer"),
    }
}

/// Prelude shared by every emitted translation unit: standard headers, the
/// `EQUAL`/`INCREASE`/`ABORT` macros, and (GPU only) the block-size
/// constant and CUDA error-check macro.
pub fn prelude(target: Target, block_size: u32) -> String {
    let mut s = String::from(
        "#include <stdio.h>\n\
         #include <stdlib.h>\n\
         #include <math.h>\n\
         #include <string.h>\n\
         #include \"elena_int.h\"\n\n\
         #define IMGFUSE_MAX(a, b) ((a) > (b) ? (a) : (b))\n\
         #define IMGFUSE_MIN(a, b) ((a) < (b) ? (a) : (b))\n\
         #define EQUAL(a, b) ((a) == (b))\n\
         #define INCREASE(x, l) IMGFUSE_MIN((x) + 1, (l) - 1)\n\
         #define ABORT(msg) do { fprintf(stderr, \"imgfuse: %s (%s:%d)\\n\", (msg), __FILE__, __LINE__); exit(1); } while (0)\n\n",
    );
    if target == Target::Cuda {
        s.push_str(
            "#include <cuda_runtime.h>\n\n",
        );
        s.push_str(&format!(
            "#define BLOCK_SIZE {block_size}\n\
             #define CUDA_CHECK(expr) do {{ cudaError_t _e = (expr); if (_e != cudaSuccess) {{ ABORT(cudaGetErrorString(_e)); }} }} while (0)\n\n"
        ));
    }
    s
}

/// The precompute helpers run host-side for both targets: the GPU dispatcher
/// fills the tables on the host and uploads them once rather than having
/// every thread redo the same row/column arithmetic in-kernel.
pub fn bilinear_precompute_helpers() -> String {
    "static void bilinear_resize_preprocess(int dst, int src, int16_t* weights, int32_t* indices) {\n\
     \tfloat scale = (float)src / (float)dst;\n\
     \tfor (int j = 0; j < dst; ++j) {\n\
     \t\tfloat fh = ((float)j + 0.5f) * scale - 0.5f;\n\
     \t\tint sh = (int)floorf(fh);\n\
     \t\tfloat frac = fh - (float)sh;\n\
     \t\tif (sh < 0) { sh = 0; frac = 0.0f; }\n\
     \t\tif (sh >= src - 1) { sh = src - 1; frac = 0.0f; }\n\
     \t\tindices[j] = sh;\n\
     \t\tindices[dst + j] = INCREASE(sh, src);\n\
     \t\tweights[dst + j] = (int16_t)(frac * 2048.0f + 0.5f);\n\
     \t\tweights[j] = (int16_t)(2048 - weights[dst + j]);\n\
     \t}\n\
     }\n\n\
     static void bilinear_float_resize_preprocess(int dst, int src, float* weights, int32_t* indices) {\n\
     \tfloat scale = (float)src / (float)dst;\n\
     \tfor (int j = 0; j < dst; ++j) {\n\
     \t\tfloat fh = ((float)j + 0.5f) * scale - 0.5f;\n\
     \t\tint sh = (int)floorf(fh);\n\
     \t\tfloat frac = fh - (float)sh;\n\
     \t\tif (sh < 0) { sh = 0; frac = 0.0f; }\n\
     \t\tif (sh >= src - 1) { sh = src - 1; frac = 0.0f; }\n\
     \t\tindices[j] = sh;\n\
     \t\tindices[dst + j] = INCREASE(sh, src);\n\
     \t\tweights[dst + j] = frac;\n\
     \t\tweights[j] = 1.0f - frac;\n\
     \t}\n\
     }\n\n"
        .to_string()
}

/// One weights/indices pair produced together by `bilinear_tables`:
/// always inserted adjacently by the lowering code, so chunking the
/// `Call`-producer tensors two at a time recovers the pairing without
/// guessing at names.
struct ScratchPair {
    weights: Rc<TensorVar>,
    indices: Rc<TensorVar>,
    func: CallFunction,
    dst_expr: Rc<Expr>,
    src_expr: Rc<Expr>,
}

fn scratch_pairs(program: &Program) -> Result<Vec<ScratchPair>, CodegenError> {
    let tensors = scratch_tensors(&program.defs);
    let mut pairs = Vec::with_capacity(tensors.len() / 2);
    let mut it = tensors.into_iter();
    while let (Some((weights, call)), Some((indices, _))) = (it.next(), it.next()) {
        let (func, args) = match call.as_ref() {
            Expr::Call { func, args, .. } => (func.clone(), args),
            _ => {
                return Err(CodegenError::UnknownTensor {
                    name: weights.name.clone(),
                })
            }
        };
        pairs.push(ScratchPair {
            weights,
            indices,
            func,
            dst_expr: args[0].clone(),
            src_expr: args[1].clone(),
        });
    }
    Ok(pairs)
}

/// C declarations for every scratch buffer, in the order the kernel expects
/// them as trailing parameters.
fn scratch_kernel_params(pairs: &[ScratchPair]) -> String {
    pairs
        .iter()
        .map(|p| {
            format!(
                ", {}* {}, int32_t* {}",
                p.weights.element_type.c_spelling(),
                make_identifier(&p.weights.name),
                make_identifier(&p.indices.name)
            )
        })
        .collect()
}

/// Host-side allocation, precompute call, and (GPU only) device upload for
/// every scratch pair, plus the matching pointer arguments to append to the
/// kernel invocation and the teardown to run afterward.
fn scratch_setup(pairs: &[ScratchPair], target: Target) -> Result<(String, String, String), CodegenError> {
    let mut setup = String::new();
    let mut call_args = String::new();
    let mut teardown = String::new();

    for p in pairs {
        let w_name = make_identifier(&p.weights.name);
        let i_name = make_identifier(&p.indices.name);
        let w_ty = p.weights.element_type.c_spelling();
        let len = emit_expr(&p.weights.shape[0], target, IoBinding::none())?;
        let dst = emit_expr(&p.dst_expr, target, IoBinding::none())?;
        let src = emit_expr(&p.src_expr, target, IoBinding::none())?;
        let func = precompute_function_name(&p.func);

        setup.push_str(&format!("{w_ty}* h_{w_name} = ({w_ty}*)malloc(sizeof({w_ty}) * ({len}));\n"));
        setup.push_str(&format!("int32_t* h_{i_name} = (int32_t*)malloc(sizeof(int32_t) * ({len}));\n"));
        setup.push_str(&format!("{func}(({dst}), ({src}), h_{w_name}, h_{i_name});\n"));

        if target == Target::Cuda {
            setup.push_str(&format!("{w_ty}* {w_name}; CUDA_CHECK(cudaMalloc((void**)&{w_name}, sizeof({w_ty}) * ({len})));\n"));
            setup.push_str(&format!("int32_t* {i_name}; CUDA_CHECK(cudaMalloc((void**)&{i_name}, sizeof(int32_t) * ({len})));\n"));
            setup.push_str(&format!(
                "CUDA_CHECK(cudaMemcpy({w_name}, h_{w_name}, sizeof({w_ty}) * ({len}), cudaMemcpyHostToDevice));\n"
            ));
            setup.push_str(&format!(
                "CUDA_CHECK(cudaMemcpy({i_name}, h_{i_name}, sizeof(int32_t) * ({len}), cudaMemcpyHostToDevice));\n"
            ));
            teardown.push_str(&format!("free(h_{w_name}); free(h_{i_name}); cudaFree({w_name}); cudaFree({i_name});\n"));
            call_args.push_str(&format!(", {w_name}, {i_name}"));
        } else {
            teardown.push_str(&format!("free(h_{w_name}); free(h_{i_name});\n"));
            call_args.push_str(&format!(", h_{w_name}, h_{i_name}"));
        }
    }

    Ok((setup, call_args, teardown))
}

const FUSE_KERNEL_CPU_SIGNATURE: &str = "void FuseKernel(\n\
    uint64_t resize_h, uint64_t resize_w,\n\
    uint64_t crop_h,   uint64_t crop_w,\n\
    int32_t  crop_top, int32_t  crop_left,\n\
    float    norm_mean_0, float norm_mean_1, float norm_mean_2,\n\
    float    norm_std_0,  float norm_std_1,  float norm_std_2,\n\
    uint64_t pad_h,    uint64_t pad_w,\n\
    int32_t  pad_top,  int32_t  pad_left,\n\
    int32_t  pad_bottom, int32_t pad_right,\n\
    float    pad_value,\n\
    uint8_t* src_raw_data, float* dst_raw_data,\n\
    uint64_t src_h, uint64_t src_w,\n\
    const char* format, const char* interpolation)";

const FUSE_KERNEL_CUDA_SIGNATURE: &str = "void FuseKernelCU(\n\
    cudaStream_t stream,\n\
    uint64_t resize_h, uint64_t resize_w,\n\
    uint64_t crop_h,   uint64_t crop_w,\n\
    int32_t  crop_top, int32_t  crop_left,\n\
    float    norm_mean_0, float norm_mean_1, float norm_mean_2,\n\
    float    norm_std_0,  float norm_std_1,  float norm_std_2,\n\
    uint64_t pad_h,    uint64_t pad_w,\n\
    int32_t  pad_top,  int32_t  pad_left,\n\
    int32_t  pad_bottom, int32_t pad_right,\n\
    float    pad_value,\n\
    uint8_t* src_raw_data, float* dst_raw_data,\n\
    uint64_t dst_h, uint64_t dst_w,\n\
    uint64_t src_h, uint64_t src_w,\n\
    const char* format, const char* interpolation)";

/// Emits the dispatcher: selects the nearest or bilinear kernel per
/// `(format, interpolation)`, ABORTing on anything unsupported. GPU adds
/// grid/block launch configuration on top.
fn dispatch_body(
    target: Target,
    format: Format,
    interpolation: Interpolation,
    kernel_name: &str,
    pairs: &[ScratchPair],
) -> Result<String, CodegenError> {
    let fmt = format_symbol(format);

    let mut s = String::new();
    s.push_str(&format!("if (!EQUAL(strcmp(format, \"{fmt}\"), 0)) {{ ABORT(\"format not supported\"); }}\n"));

    let interp_name = match interpolation {
        Interpolation::Nearest => "nearest",
        Interpolation::Bilinear => "bilinear",
    };
    s.push_str(&format!(
        "if (!EQUAL(strcmp(interpolation, \"{interp_name}\"), 0)) {{ ABORT(\"interpolation not supported\"); }}\n"
    ));

    let (setup, call_args, teardown) = scratch_setup(pairs, target)?;
    s.push_str(&setup);

    if target == Target::Cuda {
        s.push_str(
            "dim3 block(BLOCK_SIZE, BLOCK_SIZE, 1);\n\
             dim3 grid((unsigned)((resize_w + BLOCK_SIZE - 1) / BLOCK_SIZE), (unsigned)((resize_h + BLOCK_SIZE - 1) / BLOCK_SIZE), 1);\n",
        );
        s.push_str(&format!(
            "{kernel_name}<<<grid, block, 0, stream>>>(src_raw_data, dst_raw_data, src_h, src_w, resize_h, resize_w{call_args});\n"
        ));
    } else {
        s.push_str(&format!(
            "{kernel_name}(src_raw_data, dst_raw_data, src_h, src_w, resize_h, resize_w{call_args});\n"
        ));
    }
    s.push_str(&teardown);
    Ok(s)
}

/// Assembles the full translation unit for `program`.
pub fn assemble_translation_unit(program: &Program, kernel_body: &str, target: Target, block_size: u32) -> Result<String, CodegenError> {
    let pairs = scratch_pairs(program)?;

    let mut out = String::new();
    out.push_str(&prelude(target, block_size));
    out.push_str(&bilinear_precompute_helpers());

    let signature = if target == Target::Cuda { FUSE_KERNEL_CUDA_SIGNATURE } else { FUSE_KERNEL_CPU_SIGNATURE };
    let kernel_name = format!(
        "{}_{}_Kernel",
        format_symbol(program.format),
        match program.interpolation {
            Some(Interpolation::Bilinear) => "Bilinear",
            _ => "Nearest",
        }
    );
    let qualifier = if target == Target::Cuda { "__global__ " } else { "" };
    let scratch_params = scratch_kernel_params(&pairs);
    out.push_str(&format!(
        "{qualifier}void {kernel_name}(uint8_t* src, float* dst, uint64_t src_h, uint64_t src_w, uint64_t resize_h, uint64_t resize_w{scratch_params}) {{\n"
    ));
    out.push_str(kernel_body);
    out.push_str("}\n\n");

    out.push_str(signature);
    out.push_str(" {\n");
    if let Some(interp) = program.interpolation {
        out.push_str(&dispatch_body(target, program.format, interp, &kernel_name, &pairs)?);
    } else {
        out.push_str("ABORT(\"interpolation not supported\");\n");
    }
    out.push_str("}\n");
    Ok(out)
}
