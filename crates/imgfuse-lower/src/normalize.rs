//! Per-channel normalize lowering: `(in - mean[c]) / std[c]`, result Float32.

use std::rc::Rc;

use imgfuse_ir::builders::*;
use imgfuse_ir::{Expr, ScalarType, TensorDefs, TensorVar};

use crate::error::LowerError;
use crate::oplist::NormArgs;

pub fn lower_normalize(
    input: &Rc<TensorVar>,
    args: &NormArgs,
    prefix: &str,
    defs: &mut TensorDefs,
) -> Result<Rc<TensorVar>, LowerError> {
    let shape = input.shape.clone();
    let iters = construct_indices(prefix, &shape, ScalarType::Int32);
    let (y, x, ch) = (iters[0].clone(), iters[1].clone(), iters[2].clone());

    let pixel = index(input.clone(), vec![Rc::new(Expr::Iter(y)), Rc::new(Expr::Iter(x)), Rc::new(Expr::Iter(ch.clone()))]);

    // Per-channel mean/std are selected with a Select cascade keyed by the
    // channel iteration variable, since each is a compile-time constant
    // triple rather than a lookup table worth a satellite tensor.
    let mean = select_channel(&ch, args.mean);
    let std = select_channel(&ch, args.std);

    let body = div(sub(cast(ScalarType::Float32, pixel), mean), std);
    Ok(compute(shape, iters, body, format!("{prefix}_out"), defs))
}

fn select_channel(ch: &imgfuse_ir::IterVar, values: [f32; 3]) -> Rc<Expr> {
    let ch_expr = || Rc::new(Expr::Iter(ch.clone()));
    if_then_else(
        eq(ch_expr(), const_i32(0)),
        const_f32(values[0] as f64),
        if_then_else(
            eq(ch_expr(), const_i32(1)),
            const_f32(values[1] as f64),
            const_f32(values[2] as f64),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_output_is_float32() {
        let mut defs = TensorDefs::new();
        let input = Rc::new(TensorVar {
            name: "src".into(),
            shape: vec![const_i32(1), const_i32(1), const_i32(3)],
            element_type: ScalarType::UInt8,
        });
        let args = NormArgs {
            mean: [128.0, 128.0, 128.0],
            std: [128.0, 128.0, 128.0],
        };
        let out = lower_normalize(&input, &args, "norm", &mut defs).unwrap();
        assert_eq!(out.element_type, ScalarType::Float32);
    }

    #[test]
    fn normalize_identity_params_round_trip() {
        let mut defs = TensorDefs::new();
        let input = Rc::new(TensorVar {
            name: "src".into(),
            shape: vec![const_i32(1), const_i32(1), const_i32(3)],
            element_type: ScalarType::UInt8,
        });
        let args = NormArgs {
            mean: [0.0, 0.0, 0.0],
            std: [1.0, 1.0, 1.0],
        };
        let out = lower_normalize(&input, &args, "norm", &mut defs).unwrap();
        assert!(defs.contains(&out.name));
    }
}
