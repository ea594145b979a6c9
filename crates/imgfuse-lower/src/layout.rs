//! Trivial index/type rewrites: `CastFloat` and `HWC2CHW`.

use std::rc::Rc;

use imgfuse_ir::builders::*;
use imgfuse_ir::{Expr, ScalarType, TensorDefs, TensorVar};

use crate::error::LowerError;

pub fn lower_cast_float(input: &Rc<TensorVar>, prefix: &str, defs: &mut TensorDefs) -> Result<Rc<TensorVar>, LowerError> {
    let shape = input.shape.clone();
    let iters = construct_indices(prefix, &shape, ScalarType::Int32);
    let indices: Vec<Rc<Expr>> = iters.iter().map(|it| Rc::new(Expr::Iter(it.clone()))).collect();
    let body = cast(ScalarType::Float32, index(input.clone(), indices));
    Ok(compute(shape, iters, body, format!("{prefix}_out"), defs))
}

/// `[y,x,c] -> [c,y,x]`.
pub fn lower_hwc2chw(input: &Rc<TensorVar>, prefix: &str, defs: &mut TensorDefs) -> Result<Rc<TensorVar>, LowerError> {
    let (h, w, c) = (input.shape[0].clone(), input.shape[1].clone(), input.shape[2].clone());
    let shape = vec![c, h, w];
    let iters = construct_indices(prefix, &shape, ScalarType::Int32);
    let (ch, y, x) = (iters[0].clone(), iters[1].clone(), iters[2].clone());

    let body = index(
        input.clone(),
        vec![Rc::new(Expr::Iter(y)), Rc::new(Expr::Iter(x)), Rc::new(Expr::Iter(ch))],
    );
    Ok(compute(shape, iters, body, format!("{prefix}_out"), defs))
}
