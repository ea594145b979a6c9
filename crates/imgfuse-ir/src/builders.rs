//! API builders: the only place IR fragments are constructed.
//!
//! Every builder returns a freshly allocated subtree and never mutates its
//! arguments -- sharing happens by cloning the returned `Rc`, never by
//! reaching back into an existing node.

use std::rc::Rc;

use crate::expr::{Expr, ScalarVar};
use crate::ops::{BinaryOp, CallFunction, IterAttrType, LogicalOp, UnaryOp};
use crate::tensor::{ComputeBody, ComputeOp, IterVar, IterVarData, Producer, Range, TensorDefs, TensorVar};
use crate::types::{ConstValue, ScalarType};

/// Binds a compile-time-known numeric value to a scalar type. The only
/// place numeric literals enter the IR.
pub fn constant(value: ConstValue) -> Rc<Expr> {
    Rc::new(Expr::Const(value))
}

pub fn const_bool(v: bool) -> Rc<Expr> {
    constant(ConstValue::Bool(v))
}
pub fn const_i32(v: i32) -> Rc<Expr> {
    constant(ConstValue::Int32(v))
}
pub fn const_i64(v: i64) -> Rc<Expr> {
    constant(ConstValue::Int64(v))
}
pub fn const_u8(v: u8) -> Rc<Expr> {
    constant(ConstValue::UInt8(v))
}
pub fn const_u64(v: u64) -> Rc<Expr> {
    constant(ConstValue::UInt64(v))
}
pub fn const_f32(v: f64) -> Rc<Expr> {
    constant(ConstValue::Float32(v))
}
pub fn const_f64(v: f64) -> Rc<Expr> {
    constant(ConstValue::Float64(v))
}

/// A free-standing named placeholder scalar (not a tensor access). Used for
/// reduction accumulators and for call-argument plumbing.
pub fn placeholder(name: impl Into<String>, ty: ScalarType) -> Rc<Expr> {
    Rc::new(Expr::Scalar(ScalarVar::Placeholder {
        name: name.into(),
        ty,
    }))
}

/// An indexed tensor read `tensor[indices...]`.
pub fn index(tensor: Rc<TensorVar>, indices: Vec<Rc<Expr>>) -> Rc<Expr> {
    Rc::new(Expr::Scalar(ScalarVar::Indexed { tensor, indices }))
}

pub fn binary(op: BinaryOp, lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    Rc::new(Expr::Binary { op, lhs, rhs })
}
pub fn add(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    binary(BinaryOp::Add, lhs, rhs)
}
pub fn sub(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    binary(BinaryOp::Sub, lhs, rhs)
}
pub fn mul(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    binary(BinaryOp::Mul, lhs, rhs)
}
pub fn div(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    binary(BinaryOp::Div, lhs, rhs)
}
pub fn rem(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    binary(BinaryOp::Mod, lhs, rhs)
}
pub fn max(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    binary(BinaryOp::Max, lhs, rhs)
}
pub fn min(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    binary(BinaryOp::Min, lhs, rhs)
}
pub fn shr(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    binary(BinaryOp::Shr, lhs, rhs)
}

pub fn unary(op: UnaryOp, operand: Rc<Expr>) -> Rc<Expr> {
    Rc::new(Expr::Unary { op, operand })
}
pub fn neg(operand: Rc<Expr>) -> Rc<Expr> {
    unary(UnaryOp::Neg, operand)
}
pub fn abs(operand: Rc<Expr>) -> Rc<Expr> {
    unary(UnaryOp::Abs, operand)
}
pub fn floor(operand: Rc<Expr>) -> Rc<Expr> {
    unary(UnaryOp::Floor, operand)
}
pub fn round(operand: Rc<Expr>) -> Rc<Expr> {
    unary(UnaryOp::Round, operand)
}

pub fn cast(target: ScalarType, operand: Rc<Expr>) -> Rc<Expr> {
    Rc::new(Expr::Cast { target, operand })
}

pub fn logical(op: LogicalOp, lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    Rc::new(Expr::Logical { op, lhs, rhs })
}
pub fn eq(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    logical(LogicalOp::Eq, lhs, rhs)
}
pub fn lt(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    logical(LogicalOp::Lt, lhs, rhs)
}
pub fn le(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    logical(LogicalOp::Le, lhs, rhs)
}
pub fn ge(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    logical(LogicalOp::Ge, lhs, rhs)
}
pub fn and(lhs: Rc<Expr>, rhs: Rc<Expr>) -> Rc<Expr> {
    logical(LogicalOp::And, lhs, rhs)
}

/// `if_then_else(cond, t, f)` in value position: yields a `Select`. Type of
/// the result is the unified type of `t` and `f` (computed lazily by
/// `Expr::ty`, not stored redundantly here).
pub fn if_then_else(cond: Rc<Expr>, t_branch: Rc<Expr>, f_branch: Rc<Expr>) -> Rc<Expr> {
    Rc::new(Expr::Select {
        cond,
        t_branch,
        f_branch,
    })
}

pub fn call(func: CallFunction, args: Vec<Rc<Expr>>, result_type: ScalarType) -> Rc<Expr> {
    Rc::new(Expr::Call {
        func,
        args,
        result_type,
    })
}

pub fn let_binding(name: impl Into<String>, ty: ScalarType, value: Rc<Expr>, body: Rc<Expr>) -> Rc<Expr> {
    Rc::new(Expr::Let {
        name: name.into(),
        ty,
        value,
        body,
    })
}

/// Returns a tuple of fresh `IterVar`s with `Range{0, shape[k]}`, named
/// `{prefix}_i{k}` to keep iteration variables unique across the many
/// tensors a single pipeline compilation constructs.
pub fn construct_indices(prefix: &str, shape: &[Rc<Expr>], ty: ScalarType) -> Vec<IterVar> {
    shape
        .iter()
        .enumerate()
        .map(|(k, extent)| {
            Rc::new(IterVarData {
                name: format!("{prefix}_i{k}"),
                range: Range {
                    init: const_i32(0),
                    extent: extent.clone(),
                },
                attr: IterAttrType::Default,
                ty,
            })
        })
        .collect()
}

/// `compute(shape, iter_vars, body, name)`: constructs a new `TensorVar` of
/// shape `shape` and element type inferred from `body`, binds it to a
/// `ComputeOp` whose `fcompute = body`, and registers the producer.
pub fn compute(
    shape: Vec<Rc<Expr>>,
    iter_vars: Vec<IterVar>,
    body: Rc<Expr>,
    name: impl Into<String>,
    defs: &mut TensorDefs,
) -> Rc<TensorVar> {
    let name = name.into();
    let tensor = Rc::new(TensorVar {
        name: name.clone(),
        shape,
        element_type: body.ty(),
    });
    let op = ComputeOp {
        iter_vars,
        fcompute: ComputeBody::Scalar(body),
        output: tensor.clone(),
        name,
    };
    defs.insert(&tensor, Producer::Compute(Rc::new(op)));
    tensor
}

/// `compute(shape, iter_vars, _, call, name)` overload: constructs a
/// tensor whose producer is an `Evaluate(call)` rather than a pointwise
/// expression. This is how the bilinear precomputation tables are wired
/// -- a single allocate-then-evaluate definition under `name`.
pub fn compute_from_call(
    shape: Vec<Rc<Expr>>,
    element_type: ScalarType,
    call_expr: Rc<Expr>,
    name: impl Into<String>,
    defs: &mut TensorDefs,
) -> Rc<TensorVar> {
    debug_assert!(matches!(*call_expr, Expr::Call { .. }));
    let name = name.into();
    let tensor = Rc::new(TensorVar {
        name: name.clone(),
        shape,
        element_type,
    });
    defs.insert(&tensor, Producer::Call { tensor: tensor.clone(), call: call_expr });
    tensor
}

/// `compute` binding a `Reduce` body rather than a plain scalar expression.
pub fn compute_reduce(
    shape: Vec<Rc<Expr>>,
    iter_vars: Vec<IterVar>,
    reduce: crate::tensor::Reduce,
    name: impl Into<String>,
    defs: &mut TensorDefs,
) -> Rc<TensorVar> {
    let name = name.into();
    let element_type = reduce.accumulate.ty();
    let tensor = Rc::new(TensorVar {
        name: name.clone(),
        shape,
        element_type,
    });
    let op = ComputeOp {
        iter_vars,
        fcompute: ComputeBody::Reduce(reduce),
        output: tensor.clone(),
        name,
    };
    defs.insert(&tensor, Producer::Compute(Rc::new(op)));
    tensor
}
