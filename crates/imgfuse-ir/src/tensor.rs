//! Tensor variables, iteration variables, and compute-op definitions.

use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::ops::IterAttrType;
use crate::types::ScalarType;

/// A named, shaped tensor. Defined by exactly one producer -- either a
/// designated pipeline input, a [`ComputeOp`], or a spliced [`Expr::Call`]
/// (see [`Producer`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorVar {
    pub name: String,
    pub shape: Vec<Rc<Expr>>,
    pub element_type: ScalarType,
}

impl TensorVar {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// `Range{init, extent}` attached to every iteration variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Range {
    pub init: Rc<Expr>,
    pub extent: Rc<Expr>,
}

/// A named loop index. Shared by `Rc` between the `For`/`ComputeOp` that
/// introduces it and every `Expr::Iter` read-site within its scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterVarData {
    pub name: String,
    pub range: Range,
    pub attr: IterAttrType,
    pub ty: ScalarType,
}

pub type IterVar = Rc<IterVarData>;

/// The body of a [`ComputeOp`]: either a plain scalar expression evaluated
/// at every index, or a fold over an inner iteration space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ComputeBody {
    Scalar(Rc<Expr>),
    Reduce(Reduce),
}

/// `Reduce{init, combiner, accumulate, reduce_axis}`: folds `combiner` over
/// `reduce_axis`, seeding the fold with `init`. `accumulate` is the
/// placeholder scalar variable `combiner` reads/writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reduce {
    pub init: Rc<Expr>,
    pub combiner: Rc<Expr>,
    pub accumulate: Rc<Expr>,
    pub reduce_axis: Vec<IterVar>,
}

/// `ComputeOp{iter_vars, fcompute, output, name}`. Evaluating it means: for
/// every point in the cartesian product of `iter_vars`, `output` at that
/// index equals `fcompute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeOp {
    pub iter_vars: Vec<IterVar>,
    pub fcompute: ComputeBody,
    pub output: Rc<TensorVar>,
    pub name: String,
}

/// How a tensor's contents are produced. `Compute` is the ordinary
/// functional case; `Call` is the one place the IR crosses into imperative
/// side effects (the bilinear precompute tables) -- the tensor is
/// filled in by a host/device helper rather than a pointwise `fcompute`.
/// `Call` carries its own `TensorVar` (shape, element type) alongside the
/// splicing expression, the same way `Compute`'s `ComputeOp::output` does,
/// so the runtime assembler can declare a matching scratch buffer without
/// re-deriving shape/type from the sites that read it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Producer {
    Compute(Rc<ComputeOp>),
    Call { tensor: Rc<TensorVar>, call: Rc<Expr> },
}

/// Name-keyed registry of tensor producers for a single compilation.
///
/// Keyed by name rather than by graph node, matching the ground-truth code
/// generator's topological sorter (`well_defined: std::set<std::string>`):
/// each tensor has exactly one producer (invariant 3), so identity by name
/// is sufficient and avoids a heavier edge-indexed graph structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TensorDefs {
    producers: IndexMap<String, Producer>,
}

impl TensorDefs {
    pub fn new() -> Self {
        TensorDefs {
            producers: IndexMap::new(),
        }
    }

    /// Registers `tensor`'s producer. Returns the previous producer, if any
    /// -- callers that expect a fresh binding should assert this is `None`.
    pub fn insert(&mut self, tensor: &TensorVar, producer: Producer) -> Option<Producer> {
        self.producers.insert(tensor.name.clone(), producer)
    }

    pub fn get(&self, name: &str) -> Option<&Producer> {
        self.producers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.producers.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Producer)> {
        self.producers.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstValue;

    fn dim(n: i32) -> Rc<Expr> {
        Rc::new(Expr::Const(ConstValue::Int32(n)))
    }

    #[test]
    fn tensor_rank_matches_shape_len() {
        let t = TensorVar {
            name: "img".into(),
            shape: vec![dim(4), dim(4), dim(3)],
            element_type: ScalarType::UInt8,
        };
        assert_eq!(t.rank(), 3);
    }

    #[test]
    fn tensor_defs_insert_and_get() {
        let t = TensorVar {
            name: "scale".into(),
            shape: vec![dim(2)],
            element_type: ScalarType::Float32,
        };
        let op = ComputeOp {
            iter_vars: vec![],
            fcompute: ComputeBody::Scalar(dim(1)),
            output: Rc::new(t.clone()),
            name: "scale".into(),
        };
        let mut defs = TensorDefs::new();
        assert!(defs.insert(&t, Producer::Compute(Rc::new(op))).is_none());
        assert!(defs.contains("scale"));
        assert!(matches!(defs.get("scale"), Some(Producer::Compute(_))));
    }

    #[test]
    fn tensor_defs_preserves_insertion_order() {
        let mut defs = TensorDefs::new();
        for name in ["c", "a", "b"] {
            let t = TensorVar {
                name: name.into(),
                shape: vec![dim(1)],
                element_type: ScalarType::Int32,
            };
            defs.insert(&t, Producer::Call { tensor: Rc::new(t.clone()), call: dim(0) });
        }
        let names: Vec<&str> = defs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
