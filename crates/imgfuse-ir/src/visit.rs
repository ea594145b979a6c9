//! Generic traversal helpers over the expression tree and the tensor DAG.
//!
//! Two helpers are exposed: a post-order expression walker
//! taking a dispatch closure (used by the code generator to collect
//! referenced identifiers/types), and a topological walker over the tensor
//! definition DAG (used by the code generator's sorter to decide emission
//! order). Both are stack-recursive; depth is bounded by pipeline length
//! times spatial loop-nest depth, typically well under the platform's
//! default stack size.

use std::collections::HashSet;

use crate::error::IrError;
use crate::expr::{Expr, ScalarVar};
use crate::tensor::{ComputeBody, Producer, TensorDefs};

/// Visits every subexpression of `root` in post-order, invoking `f` on each
/// node after its children have been visited.
pub fn walk_expr_postorder<F: FnMut(&Expr)>(root: &Expr, f: &mut F) {
    match root {
        Expr::Const(_) | Expr::Iter(_) => {}
        Expr::Scalar(ScalarVar::Placeholder { .. }) => {}
        Expr::Scalar(ScalarVar::Indexed { indices, .. }) => {
            for idx in indices {
                walk_expr_postorder(idx, f);
            }
        }
        Expr::Binary { lhs, rhs, .. } | Expr::Logical { lhs, rhs, .. } => {
            walk_expr_postorder(lhs, f);
            walk_expr_postorder(rhs, f);
        }
        Expr::Unary { operand, .. } | Expr::Cast { operand, .. } => {
            walk_expr_postorder(operand, f);
        }
        Expr::Select {
            cond,
            t_branch,
            f_branch,
        } => {
            walk_expr_postorder(cond, f);
            walk_expr_postorder(t_branch, f);
            walk_expr_postorder(f_branch, f);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                walk_expr_postorder(arg, f);
            }
        }
        Expr::Let { value, body, .. } => {
            walk_expr_postorder(value, f);
            walk_expr_postorder(body, f);
        }
    }
    f(root);
}

/// Names of every tensor read (directly or transitively through nested
/// expressions) inside `root`.
pub fn referenced_tensor_names(root: &Expr) -> Vec<String> {
    let mut names = Vec::new();
    walk_expr_postorder(root, &mut |node| {
        if let Expr::Scalar(ScalarVar::Indexed { tensor, .. }) = node {
            names.push(tensor.name.clone());
        }
    });
    names
}

/// Topological order (dependencies before dependents) of every tensor
/// reachable from `root` through `defs`. A name with no entry in `defs` is
/// not an error -- it's a pipeline input (or any other externally-supplied
/// tensor), and is emitted as a leaf with no dependencies of its own.
///
/// Marking is keyed by tensor name, mirroring the ground-truth code
/// generator's `well_defined: std::set<std::string>` sorter: each tensor has
/// exactly one producer, so a name-keyed visited set is
/// enough to guarantee each tensor's `Allocate` is emitted exactly once,
/// before any of its readers.
pub fn topo_order(root: &str, defs: &TensorDefs) -> Result<Vec<String>, IrError> {
    let mut order = Vec::new();
    let mut well_defined = HashSet::new();
    visit(root, defs, &mut well_defined, &mut order)?;
    Ok(order)
}

fn visit(
    name: &str,
    defs: &TensorDefs,
    well_defined: &mut HashSet<String>,
    order: &mut Vec<String>,
) -> Result<(), IrError> {
    if well_defined.contains(name) {
        return Ok(());
    }
    well_defined.insert(name.to_string());

    let producer = match defs.get(name) {
        Some(p) => p,
        None => {
            order.push(name.to_string());
            return Ok(());
        }
    };

    let deps = match producer {
        Producer::Compute(op) => match &op.fcompute {
            ComputeBody::Scalar(e) => referenced_tensor_names(e),
            ComputeBody::Reduce(r) => {
                let mut v = referenced_tensor_names(&r.init);
                v.extend(referenced_tensor_names(&r.combiner));
                v
            }
        },
        Producer::Call { call, .. } => referenced_tensor_names(call),
    };

    for dep in deps {
        if dep != name {
            visit(&dep, defs, well_defined, order)?;
        }
    }
    order.push(name.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{ComputeOp, Producer, TensorDefs, TensorVar};
    use crate::types::{ConstValue, ScalarType};
    use std::rc::Rc;

    fn scalar_tensor(name: &str) -> Rc<TensorVar> {
        Rc::new(TensorVar {
            name: name.to_string(),
            shape: vec![Rc::new(Expr::Const(ConstValue::Int32(1)))],
            element_type: ScalarType::Float32,
        })
    }

    fn indexed(tensor: &Rc<TensorVar>) -> Expr {
        Expr::Scalar(ScalarVar::Indexed {
            tensor: tensor.clone(),
            indices: vec![Rc::new(Expr::Const(ConstValue::Int32(0)))],
        })
    }

    #[test]
    fn referenced_tensor_names_finds_direct_and_nested_reads() {
        let a = scalar_tensor("a");
        let b = scalar_tensor("b");
        let expr = Expr::Binary {
            op: crate::ops::BinaryOp::Add,
            lhs: Rc::new(indexed(&a)),
            rhs: Rc::new(indexed(&b)),
        };
        let mut names = referenced_tensor_names(&expr);
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn topo_order_places_dependency_before_dependent() {
        let a = scalar_tensor("a");
        let b = scalar_tensor("b");

        let mut defs = TensorDefs::new();
        defs.insert(
            &a,
            Producer::Compute(Rc::new(ComputeOp {
                iter_vars: vec![],
                fcompute: ComputeBody::Scalar(Rc::new(Expr::Const(ConstValue::Float32(1.0)))),
                output: a.clone(),
                name: "a".into(),
            })),
        );
        defs.insert(
            &b,
            Producer::Compute(Rc::new(ComputeOp {
                iter_vars: vec![],
                fcompute: ComputeBody::Scalar(Rc::new(indexed(&a))),
                output: b.clone(),
                name: "b".into(),
            })),
        );

        let order = topo_order("b", &defs).unwrap();
        assert_eq!(order, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn topo_order_visits_shared_dependency_once() {
        let a = scalar_tensor("a");
        let b = scalar_tensor("b");
        let c = scalar_tensor("c");

        let mut defs = TensorDefs::new();
        defs.insert(
            &a,
            Producer::Compute(Rc::new(ComputeOp {
                iter_vars: vec![],
                fcompute: ComputeBody::Scalar(Rc::new(Expr::Const(ConstValue::Float32(1.0)))),
                output: a.clone(),
                name: "a".into(),
            })),
        );
        defs.insert(
            &b,
            Producer::Compute(Rc::new(ComputeOp {
                iter_vars: vec![],
                fcompute: ComputeBody::Scalar(Rc::new(indexed(&a))),
                output: b.clone(),
                name: "b".into(),
            })),
        );
        defs.insert(
            &c,
            Producer::Compute(Rc::new(ComputeOp {
                iter_vars: vec![],
                fcompute: ComputeBody::Scalar(Rc::new(Expr::Binary {
                    op: crate::ops::BinaryOp::Add,
                    lhs: Rc::new(indexed(&a)),
                    rhs: Rc::new(indexed(&b)),
                })),
                output: c.clone(),
                name: "c".into(),
            })),
        );

        let order = topo_order("c", &defs).unwrap();
        assert_eq!(order, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
    }

    #[test]
    fn topo_order_treats_tensor_with_no_producer_as_a_leaf() {
        let defs = TensorDefs::new();
        let order = topo_order("input", &defs).unwrap();
        assert_eq!(order, vec!["input".to_string()]);
    }

    #[test]
    fn topo_order_places_unregistered_input_before_its_reader() {
        let input = scalar_tensor("input");
        let b = scalar_tensor("b");

        let mut defs = TensorDefs::new();
        defs.insert(
            &b,
            Producer::Compute(Rc::new(ComputeOp {
                iter_vars: vec![],
                fcompute: ComputeBody::Scalar(Rc::new(indexed(&input))),
                output: b.clone(),
                name: "b".into(),
            })),
        );

        let order = topo_order("b", &defs).unwrap();
        assert_eq!(order, vec!["input".to_string(), "b".to_string()]);
    }
}
