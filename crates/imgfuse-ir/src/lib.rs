pub mod builders;
pub mod error;
pub mod expr;
pub mod ops;
pub mod stmt;
pub mod tensor;
pub mod types;
pub mod visit;

pub use error::IrError;
pub use expr::{Expr, ScalarVar};
pub use ops::{BinaryOp, CallFunction, IterAttrType, LogicalOp, UnaryOp};
pub use stmt::{AttrKey, Stmt};
pub use tensor::{ComputeBody, ComputeOp, IterVar, IterVarData, Producer, Range, Reduce, TensorDefs, TensorVar};
pub use types::{ConstValue, ScalarType};
pub use visit::{referenced_tensor_names, topo_order, walk_expr_postorder};
