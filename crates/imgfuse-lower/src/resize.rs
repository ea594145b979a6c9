//! Resize lowering: nearest and bilinear, fixed-point and floating paths.
//!
//! Grounded in the original `Resize.hpp` preprocessing helpers: the nearest
//! formula and the bilinear weight/index precompute protocol are
//! carried over verbatim; only the host-helper invocation is re-expressed
//! as a spliced `Call` producer rather than a raw pointer-filling function.

use std::rc::Rc;

use imgfuse_ir::builders::*;
use imgfuse_ir::{CallFunction, ComputeBody, Expr, Reduce, ScalarType, TensorDefs, TensorVar};

use crate::error::LowerError;

/// `out(y,x,c) = in[min(floor(y*Hs/H), Hs-1), min(floor(x*Ws/W), Ws-1), c]`.
/// `scale_h`/`scale_w` are bound via `Let` rather than reified as a
/// standalone tensor: they're two scalar quantities, not a runtime lookup
/// table the kernel body ever reads back through an index.
pub fn lower_nearest(
    input: &Rc<TensorVar>,
    out_h: Rc<Expr>,
    out_w: Rc<Expr>,
    prefix: &str,
    defs: &mut TensorDefs,
) -> Result<Rc<TensorVar>, LowerError> {
    let hs = input.shape[0].clone();
    let ws = input.shape[1].clone();
    let c = input.shape[2].clone();
    let shape = vec![out_h.clone(), out_w.clone(), c];

    let iters = construct_indices(prefix, &shape, ScalarType::Int32);
    let (y, x, ch) = (iters[0].clone(), iters[1].clone(), iters[2].clone());

    let scale_h = div(cast(ScalarType::Float32, hs.clone()), cast(ScalarType::Float32, out_h));
    let scale_w = div(cast(ScalarType::Float32, ws.clone()), cast(ScalarType::Float32, out_w));

    let src_y = cast(
        ScalarType::Int32,
        min(
            floor(mul(cast(ScalarType::Float32, Rc::new(Expr::Iter(y))), placeholder("scale_h", ScalarType::Float32))),
            sub(cast(ScalarType::Float32, hs), const_f32(1.0)),
        ),
    );
    let src_x = cast(
        ScalarType::Int32,
        min(
            floor(mul(cast(ScalarType::Float32, Rc::new(Expr::Iter(x))), placeholder("scale_w", ScalarType::Float32))),
            sub(cast(ScalarType::Float32, ws), const_f32(1.0)),
        ),
    );

    let read = index(input.clone(), vec![src_y, src_x, Rc::new(Expr::Iter(ch))]);
    let body = let_binding(
        "scale_h",
        ScalarType::Float32,
        scale_h,
        let_binding("scale_w", ScalarType::Float32, scale_w, read),
    );

    Ok(compute(shape, iters, body, format!("{prefix}_out"), defs))
}

/// Precomputes one axis's weight/index tables via the spliced host/device
/// helper call. The original helper fills two output arrays in
/// one call; here each table is its own `Producer::Call` binding under the
/// same `CallFunction` tag, since a single `Expr::Call` carries one result
/// type.
fn bilinear_tables(
    src_dim: Rc<Expr>,
    dst_dim: Rc<Expr>,
    fixed: bool,
    prefix: &str,
    defs: &mut TensorDefs,
) -> (Rc<TensorVar>, Rc<TensorVar>) {
    let func = if fixed {
        CallFunction::BilinearResizePreprocess
    } else {
        CallFunction::BilinearFloatResizePreprocess
    };
    let weight_ty = if fixed { ScalarType::Int16 } else { ScalarType::Float32 };
    let table_len = mul(const_i32(2), dst_dim.clone());

    let weights = compute_from_call(
        vec![table_len.clone()],
        weight_ty,
        call(func.clone(), vec![dst_dim.clone(), src_dim.clone()], weight_ty),
        format!("{prefix}_w"),
        defs,
    );
    let indices = compute_from_call(
        vec![table_len],
        ScalarType::Int32,
        call(func, vec![dst_dim, src_dim], ScalarType::Int32),
        format!("{prefix}_idx"),
        defs,
    );
    (weights, indices)
}

/// Builds the 4-neighbor weighted sum for one output tensor:
/// `out[y,x,c] = Σᵢ,ⱼ wh[i,y]·ww[j,x]·in[ih[i,y], iw[j,x], c]`, folded as a
/// `Reduce` over the two 2-element axes, followed (fixed path only) by the
/// 22-bit rounding correction applied as a second tensor definition.
pub fn lower_bilinear(
    input: &Rc<TensorVar>,
    out_h: Rc<Expr>,
    out_w: Rc<Expr>,
    fixed: bool,
    prefix: &str,
    defs: &mut TensorDefs,
) -> Result<Rc<TensorVar>, LowerError> {
    let hs = input.shape[0].clone();
    let ws = input.shape[1].clone();
    let c = input.shape[2].clone();

    let (wh, ih) = bilinear_tables(hs, out_h.clone(), fixed, &format!("{prefix}_h"), defs);
    let (ww, iw) = bilinear_tables(ws, out_w.clone(), fixed, &format!("{prefix}_w"), defs);

    let shape = vec![out_h.clone(), out_w.clone(), c];
    let iters = construct_indices(prefix, &shape, ScalarType::Int32);
    let (y, x, ch) = (iters[0].clone(), iters[1].clone(), iters[2].clone());

    let reduce_axis = construct_indices(&format!("{prefix}_k"), &[const_i32(2), const_i32(2)], ScalarType::Int32);
    let (ri, rj) = (reduce_axis[0].clone(), reduce_axis[1].clone());

    let acc_ty = if fixed { ScalarType::Int32 } else { ScalarType::Float32 };
    let accumulate = placeholder("acc", acc_ty);

    let wh_at = index(
        wh,
        vec![add(mul(Rc::new(Expr::Iter(ri.clone())), out_h.clone()), Rc::new(Expr::Iter(y.clone())))],
    );
    let ww_at = index(
        ww,
        vec![add(mul(Rc::new(Expr::Iter(rj.clone())), out_w.clone()), Rc::new(Expr::Iter(x.clone())))],
    );
    let ih_at = index(
        ih,
        vec![add(mul(Rc::new(Expr::Iter(ri.clone())), out_h.clone()), Rc::new(Expr::Iter(y.clone())))],
    );
    let iw_at = index(
        iw,
        vec![add(mul(Rc::new(Expr::Iter(rj.clone())), out_w.clone()), Rc::new(Expr::Iter(x.clone())))],
    );

    let pixel = index(input.clone(), vec![ih_at, iw_at, Rc::new(Expr::Iter(ch.clone()))]);
    let term = mul(mul(wh_at, ww_at), cast(acc_ty, pixel));
    let combiner = add(accumulate.clone(), term);

    let reduce = Reduce {
        init: if fixed { const_i32(0) } else { const_f32(0.0) },
        combiner,
        accumulate,
        reduce_axis,
    };

    let raw = compute_reduce(shape.clone(), iters, reduce, format!("{prefix}_raw"), defs);

    if !fixed {
        return Ok(raw);
    }

    // Fixed-point correction: (S + 2^21) >> 22, narrowed to uint8.
    let corr_iters = construct_indices(&format!("{prefix}_c"), &shape, ScalarType::Int32);
    let read = index(
        raw,
        corr_iters.iter().map(|it| Rc::new(Expr::Iter(it.clone()))).collect(),
    );
    let corrected = cast(
        ScalarType::UInt8,
        shr(add(read, const_i32(1 << 21)), const_i32(22)),
    );
    Ok(compute(shape, corr_iters, corrected, format!("{prefix}_out"), defs))
}

/// Extracts the `Reduce` accumulate type back out for tests; not used by
/// production lowering, which only needs the tensor handle.
#[cfg(test)]
fn accumulate_type(tensor: &TensorVar, defs: &TensorDefs) -> Option<ScalarType> {
    match defs.get(&tensor.name)? {
        imgfuse_ir::Producer::Compute(op) => match &op.fcompute {
            ComputeBody::Reduce(r) => Some(r.accumulate.ty()),
            ComputeBody::Scalar(e) => Some(e.ty()),
        },
        imgfuse_ir::Producer::Call { call, .. } => Some(call.ty()),
    }
}
