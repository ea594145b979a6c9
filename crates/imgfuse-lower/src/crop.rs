//! Center crop lowering: `out[y,x,c] = in[top+y, left+x, c]`.

use std::rc::Rc;

use imgfuse_ir::builders::*;
use imgfuse_ir::{Expr, ScalarType, TensorDefs, TensorVar};

use crate::error::LowerError;

pub fn lower_center_crop(
    input: &Rc<TensorVar>,
    out_h: Rc<Expr>,
    out_w: Rc<Expr>,
    top: Rc<Expr>,
    left: Rc<Expr>,
    prefix: &str,
    defs: &mut TensorDefs,
) -> Result<Rc<TensorVar>, LowerError> {
    let c = input.shape[2].clone();
    let shape = vec![out_h, out_w, c];
    let iters = construct_indices(prefix, &shape, ScalarType::Int32);
    let (y, x, ch) = (iters[0].clone(), iters[1].clone(), iters[2].clone());

    let src_y = add(top, Rc::new(Expr::Iter(y)));
    let src_x = add(left, Rc::new(Expr::Iter(x)));
    let body = index(input.clone(), vec![src_y, src_x, Rc::new(Expr::Iter(ch))]);

    Ok(compute(shape, iters, body, format!("{prefix}_out"), defs))
}
