//! Pad lowering: source window copy, `pad_value` elsewhere, via `Select`.

use std::rc::Rc;

use imgfuse_ir::builders::*;
use imgfuse_ir::{Expr, ScalarType, TensorDefs, TensorVar};

use crate::error::LowerError;

#[allow(clippy::too_many_arguments)]
pub fn lower_pad(
    input: &Rc<TensorVar>,
    out_h: Rc<Expr>,
    out_w: Rc<Expr>,
    top: Rc<Expr>,
    left: Rc<Expr>,
    pad_value: Rc<Expr>,
    prefix: &str,
    defs: &mut TensorDefs,
) -> Result<Rc<TensorVar>, LowerError> {
    let c = input.shape[2].clone();
    let in_h = input.shape[0].clone();
    let in_w = input.shape[1].clone();
    let shape = vec![out_h, out_w, c];
    let iters = construct_indices(prefix, &shape, ScalarType::Int32);
    let (y, x, ch) = (iters[0].clone(), iters[1].clone(), iters[2].clone());

    let y_expr = || Rc::new(Expr::Iter(y.clone()));
    let x_expr = || Rc::new(Expr::Iter(x.clone()));

    let src_y = sub(y_expr(), top.clone());
    let src_x = sub(x_expr(), left.clone());

    let y_in_window = and(ge(src_y.clone(), const_i32(0)), lt(src_y.clone(), in_h));
    let x_in_window = and(ge(src_x.clone(), const_i32(0)), lt(src_x.clone(), in_w));
    let inside = and(y_in_window, x_in_window);

    let from_source = index(input.clone(), vec![src_y, src_x, Rc::new(Expr::Iter(ch))]);
    let body = if_then_else(inside, from_source, pad_value);

    Ok(compute(shape, iters, body, format!("{prefix}_out"), defs))
}
