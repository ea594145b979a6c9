//! Statement nodes: loop nests, stores, allocation, and attribute scopes.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::tensor::{IterVar, TensorVar};

/// Scheduling metadata key carried by an [`Stmt::Attr`] scope. Thread/block
/// extents are the only keys this IR needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrKey {
    ThreadExtent,
}

/// Statement nodes. `For`/`Allocate`/`Attr` thread a
/// `body` pointer to the next statement, mirroring the ground-truth
/// visitor's "allocate, then visit body" shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    For {
        it: IterVar,
        init: Rc<Expr>,
        extent: Rc<Expr>,
        body: Rc<Stmt>,
    },
    Store {
        tensor: Rc<TensorVar>,
        index: Vec<Rc<Expr>>,
        value: Rc<Expr>,
    },
    /// Store-by-assignment used during lowering, before a tensor has been
    /// wrapped in its final `Allocate`.
    Provide {
        tensor: Rc<TensorVar>,
        index: Vec<Rc<Expr>>,
        value: Rc<Expr>,
    },
    Allocate {
        tensor: Rc<TensorVar>,
        body: Rc<Stmt>,
    },
    Attr {
        key: AttrKey,
        it: IterVar,
        value: Rc<Expr>,
        body: Rc<Stmt>,
    },
    /// A `Call` performed for its side effect (the bilinear precompute
    /// helpers splice in here).
    Evaluate(Rc<Expr>),
    IfThenElse {
        cond: Rc<Expr>,
        then_branch: Rc<Stmt>,
        else_branch: Option<Rc<Stmt>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstValue;

    #[test]
    fn evaluate_wraps_a_call_expr() {
        let call = Rc::new(Expr::Const(ConstValue::Bool(true)));
        let stmt = Stmt::Evaluate(call.clone());
        match stmt {
            Stmt::Evaluate(v) => assert!(Rc::ptr_eq(&v, &call)),
            _ => panic!("expected Evaluate"),
        }
    }

    #[test]
    fn if_then_else_else_branch_is_optional() {
        let cond = Rc::new(Expr::Const(ConstValue::Bool(true)));
        let then_branch = Rc::new(Stmt::Evaluate(cond.clone()));
        let stmt = Stmt::IfThenElse {
            cond,
            then_branch,
            else_branch: None,
        };
        match stmt {
            Stmt::IfThenElse { else_branch, .. } => assert!(else_branch.is_none()),
            _ => panic!("expected IfThenElse"),
        }
    }
}
