//! Pipeline assembler: threads a single `current` tensor
//! through each op's lowering in list order, selecting `Format` from the
//! first `cvtColor*` op encountered.

use std::rc::Rc;

use imgfuse_ir::builders::{const_f32, const_i32, div, placeholder, sub};
use imgfuse_ir::{Expr, ScalarType, TensorDefs, TensorVar};
use tracing::debug;

use crate::crop::lower_center_crop;
use crate::error::LowerError;
use crate::layout::{lower_cast_float, lower_hwc2chw};
use crate::oplist::{format_of, CropArgs, Format, Interpolation, OpSpec, PadArgs, ResizeArgs};
use crate::pad::lower_pad;
use crate::resize::{lower_bilinear, lower_nearest};

/// Output of assembling an op list: the pipeline's input tensor, the final
/// output tensor, the registry of every tensor definition reached along the
/// way, the selected pixel format, and the interpolation mode the
/// dispatcher needs to pick a resize kernel.
pub struct Program {
    pub input: Rc<TensorVar>,
    pub defs: TensorDefs,
    pub output: Rc<TensorVar>,
    pub format: Format,
    pub interpolation: Option<Interpolation>,
}

/// Resolves a JSON dimension to either a literal constant or a runtime
/// placeholder named after the corresponding `FuseKernel` parameter,
/// depending on the op's `dynamic` flag.
fn dim_expr(value: u32, dynamic: bool, placeholder_name: &str) -> Rc<Expr> {
    if dynamic {
        placeholder(placeholder_name, ScalarType::Int32)
    } else {
        const_i32(value as i32)
    }
}

fn crop_offsets(input: &Rc<TensorVar>, args: &CropArgs, out_h: Rc<Expr>, out_w: Rc<Expr>) -> (Rc<Expr>, Rc<Expr>) {
    if let Some(tlbr) = args.tlbr {
        return (const_i32(tlbr[0]), const_i32(tlbr[1]));
    }
    if args.dynamic {
        return (placeholder("crop_top", ScalarType::Int32), placeholder("crop_left", ScalarType::Int32));
    }
    let top = div(sub(input.shape[0].clone(), out_h), const_i32(2));
    let left = div(sub(input.shape[1].clone(), out_w), const_i32(2));
    (top, left)
}

fn pad_offsets(args: &PadArgs) -> (Rc<Expr>, Rc<Expr>) {
    if args.dynamic {
        (placeholder("pad_top", ScalarType::Int32), placeholder("pad_left", ScalarType::Int32))
    } else {
        (const_i32(args.paddings[0]), const_i32(args.paddings[1]))
    }
}

/// Assembles an op list into a [`Program`], given the pipeline's input
/// tensor. Emits a `tracing` debug span per op lowered.
pub fn assemble(input: Rc<TensorVar>, ops: &[OpSpec]) -> Result<Program, LowerError> {
    let mut defs = TensorDefs::new();
    let pipeline_input = input.clone();
    let mut current = input;
    let mut format = Format::Bgr;
    let mut format_seen = false;
    let mut interpolation = None;

    for (idx, op) in ops.iter().enumerate() {
        if let Some(f) = format_of(op) {
            if !format_seen {
                format = f;
                format_seen = true;
            }
            continue;
        }

        let prefix = format!("op{idx}");
        current = match op {
            OpSpec::CvtColorBgr | OpSpec::CvtColorRgb | OpSpec::CvtColorGray => unreachable!("handled above"),
            OpSpec::Resize(ResizeArgs {
                interpolation: interp,
                shape,
                dynamic,
            }) => {
                debug!(op = "Resize", interpolation = ?interp, h = shape[0], w = shape[1]);
                interpolation = Some(*interp);
                let out_h = dim_expr(shape[0], *dynamic, "resize_h");
                let out_w = dim_expr(shape[1], *dynamic, "resize_w");
                match interp {
                    Interpolation::Nearest => lower_nearest(&current, out_h, out_w, &prefix, &mut defs)?,
                    Interpolation::Bilinear => {
                        let fixed = !format.forces_float_bilinear() && current.element_type != ScalarType::Float32;
                        lower_bilinear(&current, out_h, out_w, fixed, &prefix, &mut defs)?
                    }
                }
            }
            OpSpec::CenterCrop(args) => {
                debug!(op = "CenterCrop", h = args.shape[0], w = args.shape[1]);
                let out_h = dim_expr(args.shape[0], args.dynamic, "crop_h");
                let out_w = dim_expr(args.shape[1], args.dynamic, "crop_w");
                let (top, left) = crop_offsets(&current, args, out_h.clone(), out_w.clone());
                lower_center_crop(&current, out_h, out_w, top, left, &prefix, &mut defs)?
            }
            OpSpec::Normalize(args) => {
                debug!(op = "Normalize");
                crate::normalize::lower_normalize(&current, args, &prefix, &mut defs)?
            }
            OpSpec::Pad(args) => {
                debug!(op = "Pad", h = args.shape[0], w = args.shape[1]);
                let out_h = dim_expr(args.shape[0], args.dynamic, "pad_h");
                let out_w = dim_expr(args.shape[1], args.dynamic, "pad_w");
                let (top, left) = pad_offsets(args);
                let pad_value = if args.dynamic {
                    placeholder("pad_value", ScalarType::Float32)
                } else {
                    const_f32(args.pad_val as f64)
                };
                lower_pad(&current, out_h, out_w, top, left, pad_value, &prefix, &mut defs)?
            }
            OpSpec::CastFloat => {
                debug!(op = "CastFloat");
                lower_cast_float(&current, &prefix, &mut defs)?
            }
            OpSpec::Hwc2Chw => {
                debug!(op = "HWC2CHW");
                lower_hwc2chw(&current, &prefix, &mut defs)?
            }
        };
    }

    Ok(Program {
        input: pipeline_input,
        defs,
        output: current,
        format,
        interpolation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgfuse_ir::builders::const_i32;

    fn input_tensor() -> Rc<TensorVar> {
        Rc::new(TensorVar {
            name: "input".into(),
            shape: vec![const_i32(4), const_i32(4), const_i32(3)],
            element_type: ScalarType::UInt8,
        })
    }

    #[test]
    fn assembles_nearest_resize_pipeline() {
        let ops = vec![
            OpSpec::CvtColorBgr,
            OpSpec::Resize(ResizeArgs {
                interpolation: Interpolation::Nearest,
                shape: [2, 2],
                dynamic: false,
            }),
            OpSpec::CastFloat,
        ];
        let program = assemble(input_tensor(), &ops).unwrap();
        assert_eq!(program.format, Format::Bgr);
        assert_eq!(program.interpolation, Some(Interpolation::Nearest));
        assert_eq!(program.output.element_type, ScalarType::Float32);
    }

    #[test]
    fn default_format_is_bgr_when_unspecified() {
        let ops = vec![OpSpec::CastFloat];
        let program = assemble(input_tensor(), &ops).unwrap();
        assert_eq!(program.format, Format::Bgr);
    }
}
