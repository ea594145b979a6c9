//! Value-level expression tree.
//!
//! Nodes are `Rc`-linked rather than arena-indexed: sharing (the same tensor
//! read from several compute bodies) is expressed by cloning the `Rc`
//! handle, and there is no cycle risk because every constructor in `builders`
//! takes already-built children. See the data-model notes on DAG ownership.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::ops::{BinaryOp, CallFunction, LogicalOp, UnaryOp};
use crate::tensor::{IterVar, TensorVar};
use crate::types::{ConstValue, ScalarType};

/// A reference to a scalar value: either a free-standing named placeholder
/// (used for SSA accumulators and call-argument plumbing) or an indexed
/// access into a tensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarVar {
    Placeholder { name: String, ty: ScalarType },
    Indexed {
        tensor: Rc<TensorVar>,
        indices: Vec<Rc<Expr>>,
    },
}

impl ScalarVar {
    pub fn ty(&self) -> ScalarType {
        match self {
            ScalarVar::Placeholder { ty, .. } => *ty,
            ScalarVar::Indexed { tensor, .. } => tensor.element_type,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ScalarVar::Placeholder { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            ScalarVar::Placeholder { name, .. } => name,
            ScalarVar::Indexed { tensor, .. } => &tensor.name,
        }
    }
}

/// The expression tree. Every variant carries (or can derive) its own
/// `ScalarType` so code generation never needs a side table to know how to
/// spell a constant or pick an intrinsic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Const(ConstValue),
    Scalar(ScalarVar),
    Iter(IterVar),
    Binary {
        op: BinaryOp,
        lhs: Rc<Expr>,
        rhs: Rc<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Rc<Expr>,
    },
    Cast {
        target: ScalarType,
        operand: Rc<Expr>,
    },
    Logical {
        op: LogicalOp,
        lhs: Rc<Expr>,
        rhs: Rc<Expr>,
    },
    Select {
        cond: Rc<Expr>,
        t_branch: Rc<Expr>,
        f_branch: Rc<Expr>,
    },
    Call {
        func: CallFunction,
        args: Vec<Rc<Expr>>,
        result_type: ScalarType,
    },
    Let {
        name: String,
        ty: ScalarType,
        value: Rc<Expr>,
        body: Rc<Expr>,
    },
}

impl Expr {
    /// Structural type derivation: `Binary`/`Unary`
    /// unify/propagate operand types through the fixed promotion table,
    /// `Logical` always yields `Bool`, `Cast` yields its target type.
    pub fn ty(&self) -> ScalarType {
        match self {
            Expr::Const(c) => c.scalar_type(),
            Expr::Scalar(v) => v.ty(),
            Expr::Iter(it) => it.ty,
            Expr::Binary { lhs, rhs, .. } => lhs.ty().promote(rhs.ty()),
            Expr::Unary { operand, .. } => operand.ty(),
            Expr::Cast { target, .. } => *target,
            Expr::Logical { .. } => ScalarType::Bool,
            Expr::Select { t_branch, f_branch, .. } => t_branch.ty().promote(f_branch.ty()),
            Expr::Call { result_type, .. } => *result_type,
            Expr::Let { ty, .. } => *ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{IterVarData, Range};
    use crate::types::ConstValue;

    fn tensor(name: &str, ty: ScalarType) -> Rc<TensorVar> {
        Rc::new(TensorVar {
            name: name.to_string(),
            shape: vec![Rc::new(Expr::Const(ConstValue::Int32(4)))],
            element_type: ty,
        })
    }

    #[test]
    fn const_ty_matches_value() {
        let e = Expr::Const(ConstValue::Float32(1.0));
        assert_eq!(e.ty(), ScalarType::Float32);
    }

    #[test]
    fn binary_promotes_operand_types() {
        let lhs = Rc::new(Expr::Const(ConstValue::Int16(1)));
        let rhs = Rc::new(Expr::Const(ConstValue::Float32(2.0)));
        let bin = Expr::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
        };
        assert_eq!(bin.ty(), ScalarType::Float32);
    }

    #[test]
    fn logical_always_yields_bool() {
        let lhs = Rc::new(Expr::Const(ConstValue::Int32(1)));
        let rhs = Rc::new(Expr::Const(ConstValue::Int32(2)));
        let cmp = Expr::Logical {
            op: LogicalOp::Lt,
            lhs,
            rhs,
        };
        assert_eq!(cmp.ty(), ScalarType::Bool);
    }

    #[test]
    fn cast_yields_target_type() {
        let operand = Rc::new(Expr::Const(ConstValue::Int32(1)));
        let cast = Expr::Cast {
            target: ScalarType::Float64,
            operand,
        };
        assert_eq!(cast.ty(), ScalarType::Float64);
    }

    #[test]
    fn indexed_scalar_var_ty_is_tensor_element_type() {
        let t = tensor("img", ScalarType::UInt8);
        let idx = ScalarVar::Indexed {
            tensor: t.clone(),
            indices: vec![Rc::new(Expr::Const(ConstValue::Int32(0)))],
        };
        assert_eq!(idx.ty(), ScalarType::UInt8);
        assert!(!idx.is_placeholder());
    }

    #[test]
    fn placeholder_is_placeholder() {
        let p = ScalarVar::Placeholder {
            name: "acc".into(),
            ty: ScalarType::Int32,
        };
        assert!(p.is_placeholder());
        assert_eq!(p.name(), "acc");
    }

    #[test]
    fn iter_var_ty_is_its_declared_type() {
        let iter: IterVar = Rc::new(IterVarData {
            name: "y".into(),
            range: Range {
                init: Rc::new(Expr::Const(ConstValue::Int32(0))),
                extent: Rc::new(Expr::Const(ConstValue::Int32(10))),
            },
            attr: crate::ops::IterAttrType::Default,
            ty: ScalarType::Int32,
        });
        let e = Expr::Iter(iter);
        assert_eq!(e.ty(), ScalarType::Int32);
    }

    #[test]
    fn serde_roundtrip_call_expr() {
        let call = Expr::Call {
            func: CallFunction::Sync,
            args: vec![],
            result_type: ScalarType::Bool,
        };
        let json = serde_json::to_string(&call).unwrap();
        let _back: Expr = serde_json::from_str(&json).unwrap();
    }
}
