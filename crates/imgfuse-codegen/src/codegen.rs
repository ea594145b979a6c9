//! The code generator: a visitor over the IR that prints
//! target scalar code. CPU and GPU share this skeleton and differ only at a
//! handful of points: attribute emission for thread extents, the `Sync`
//! call site, and kernel signature decoration.

use std::fmt::Write as _;
use std::rc::Rc;

use imgfuse_ir::{CallFunction, ComputeBody, Expr, IterAttrType, IterVar, LogicalOp, Producer, ScalarType, ScalarVar, TensorDefs, TensorVar};

use crate::error::CodegenError;
use crate::ident::make_identifier;
use crate::spelling::{binary_spelling, logical_spelling, unary_function_name, BinarySpelling};

/// Code generation target. CPU and GPU share the same visitor and diverge
/// only at a handful of call sites (thread-attribute handling, the `Sync`
/// call, kernel signature decoration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Cpu,
    Cuda,
}

impl Target {
    fn sync_spelling(self) -> &'static str {
        match self {
            Target::Cpu => "/* sync */",
            Target::Cuda => "__syncthreads()",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Target::Cpu => "cpu",
            Target::Cuda => "cuda",
        }
    }
}

/// Binds the pipeline's designated input and output tensor names to the
/// kernel's `src`/`dst` parameters. Every other tensor name is sanitized by
/// [`make_identifier`] as usual; these two resolve to the pointer parameters
/// the kernel signature already declares, rather than to an array of their
/// own.
#[derive(Debug, Clone, Copy)]
pub struct IoBinding<'a> {
    input: &'a str,
    output: &'a str,
}

impl<'a> IoBinding<'a> {
    pub fn new(input: &'a str, output: &'a str) -> Self {
        Self { input, output }
    }

    /// No tensor name resolves to `src`/`dst` under this binding. Used at
    /// call sites that never touch a tensor read/write, such as the scratch
    /// table setup in [`crate::runtime`].
    pub fn none() -> Self {
        Self { input: "", output: "" }
    }

    fn identifier(&self, name: &str) -> String {
        if name == self.input {
            "src".to_string()
        } else if name == self.output {
            "dst".to_string()
        } else {
            make_identifier(name)
        }
    }
}

/// Row-major flattened index expression for a read/write into `tensor`,
/// e.g. `((i0)*dim1+i1)*dim2+i2` (row-major index flattening).
fn flatten_index(shape: &[Rc<Expr>], indices: &[Rc<Expr>], target: Target, io: IoBinding) -> Result<String, CodegenError> {
    let mut acc = emit_expr(&indices[0], target, io)?;
    for k in 1..indices.len() {
        let dim = emit_expr(&shape[k], target, io)?;
        let idx = emit_expr(&indices[k], target, io)?;
        acc = format!("(({acc})*({dim})+({idx}))");
    }
    Ok(acc)
}

/// Emits `expr` as a single parenthesized C/CUDA expression.
pub fn emit_expr(expr: &Expr, target: Target, io: IoBinding) -> Result<String, CodegenError> {
    Ok(match expr {
        Expr::Const(c) => c.spelling(),
        Expr::Scalar(ScalarVar::Placeholder { name, .. }) => make_identifier(name),
        Expr::Scalar(ScalarVar::Indexed { tensor, indices }) => {
            let flat = flatten_index(&tensor.shape, indices, target, io)?;
            format!("{}[{}]", io.identifier(&tensor.name), flat)
        }
        Expr::Iter(it) => make_identifier(&it.name),
        Expr::Binary { op, lhs, rhs } => {
            let l = emit_expr(lhs, target, io)?;
            let r = emit_expr(rhs, target, io)?;
            match binary_spelling(*op) {
                BinarySpelling::Infix(sym) => format!("(({l}) {sym} ({r}))"),
                BinarySpelling::Call(f) => format!("{f}(({l}), ({r}))"),
            }
        }
        Expr::Unary { op, operand } => {
            let o = emit_expr(operand, target, io)?;
            match unary_function_name(*op, operand.ty()) {
                Some(f) => format!("{f}(({o}))"),
                None => format!("(-({o}))"),
            }
        }
        Expr::Cast { target: ty, operand } => {
            format!("(({}) ({}))", ty.c_spelling(), emit_expr(operand, target, io)?)
        }
        Expr::Logical { op, lhs, rhs } => {
            if *op == LogicalOp::Not {
                format!("(!({}))", emit_expr(lhs, target, io)?)
            } else {
                let l = emit_expr(lhs, target, io)?;
                let r = emit_expr(rhs, target, io)?;
                format!("(({l}) {} ({r}))", logical_spelling(*op))
            }
        }
        Expr::Select { cond, t_branch, f_branch } => {
            format!(
                "(({}) ? ({}) : ({}))",
                emit_expr(cond, target, io)?,
                emit_expr(t_branch, target, io)?,
                emit_expr(f_branch, target, io)?
            )
        }
        Expr::Call { func, args, .. } => emit_call(func, args, target, io)?,
        Expr::Let { name, ty, value, body } => format!(
            "({{ {} {} = ({}); ({}); }})",
            ty.c_spelling(),
            make_identifier(name),
            emit_expr(value, target, io)?,
            emit_expr(body, target, io)?
        ),
    })
}

fn emit_call(func: &CallFunction, args: &[Rc<Expr>], target: Target, io: IoBinding) -> Result<String, CodegenError> {
    let rendered_args: Result<Vec<String>, CodegenError> = args.iter().map(|a| emit_expr(a, target, io)).collect();
    let rendered_args = rendered_args?;
    match func {
        CallFunction::Sync => Ok(target.sync_spelling().to_string()),
        CallFunction::BilinearResizePreprocess => Ok(format!("bilinear_resize_preprocess({})", rendered_args.join(", "))),
        CallFunction::BilinearFloatResizePreprocess => Ok(format!("bilinear_float_resize_preprocess({})", rendered_args.join(", "))),
        CallFunction::Intrinsic(name) => Ok(format!("{}({})", name, rendered_args.join(", "))),
    }
}

/// Emits the binding for one iteration variable: an ordinary `for` loop on
/// CPU, or on GPU either a `for` (Default/Unrolled) or a thread/block index
/// binding with no loop (`ThreadBlockX`/`ThreadBlockY`).
fn emit_iter_open(it: &IterVar, target: Target, out: &mut String, io: IoBinding) -> Result<(), CodegenError> {
    let name = make_identifier(&it.name);
    let init = emit_expr(&it.range.init, target, io)?;
    let extent = emit_expr(&it.range.extent, target, io)?;
    let ty = it.ty.c_spelling();

    match (target, it.attr) {
        (Target::Cuda, IterAttrType::ThreadBlockY) => {
            let _ = writeln!(out, "{ty} {name} = blockIdx.y * blockDim.y + threadIdx.y;");
        }
        (Target::Cuda, IterAttrType::ThreadBlockX) => {
            let _ = writeln!(out, "{ty} {name} = blockIdx.x * blockDim.x + threadIdx.x;");
        }
        (_, IterAttrType::Unrolled) => {
            let _ = writeln!(out, "#pragma unroll");
            let _ = writeln!(out, "for ({ty} {name} = ({init}); {name} < ({init}) + ({extent}); ++{name}) {{");
        }
        _ => {
            let _ = writeln!(out, "for ({ty} {name} = ({init}); {name} < ({init}) + ({extent}); ++{name}) {{");
        }
    }
    Ok(())
}

fn emit_iter_close(it: &IterVar, target: Target, out: &mut String) {
    if target == Target::Cuda && matches!(it.attr, IterAttrType::ThreadBlockX | IterAttrType::ThreadBlockY) {
        return;
    }
    out.push_str("}\n");
}

/// Declares the local array backing an intermediate tensor, sized by the
/// product of its shape, so the loop nest that follows has somewhere to
/// write. The pipeline's designated output skips this: `dst` is already
/// declared as a kernel parameter.
fn emit_allocate(tensor: &Rc<TensorVar>, target: Target, out: &mut String, io: IoBinding) -> Result<(), CodegenError> {
    let mut size = emit_expr(&tensor.shape[0], target, io)?;
    for dim in &tensor.shape[1..] {
        let d = emit_expr(dim, target, io)?;
        size = format!("({size})*({d})");
    }
    let _ = writeln!(out, "{} {}[{}];", tensor.element_type.c_spelling(), io.identifier(&tensor.name), size);
    Ok(())
}

/// Emits one tensor's definition: `Allocate` declaration followed by its
/// producer's body (loop nest for `Compute`, a spliced call for `Call`).
/// The code generator performs its own topological recursion over
/// `TensorDefs` (via [`imgfuse_ir::topo_order`]) rather than requiring the
/// lowering layer to have pre-built a literal nested `Allocate` chain.
fn emit_tensor_definition(name: &str, defs: &TensorDefs, target: Target, out: &mut String, io: IoBinding) -> Result<(), CodegenError> {
    let producer = match defs.get(name) {
        Some(p) => p,
        // No producer: a pipeline input (or other externally-supplied
        // tensor) that already arrives as a kernel parameter.
        None => return Ok(()),
    };
    let op = match producer {
        Producer::Compute(op) => op,
        // Scratch tables are filled ahead of the kernel by the runtime
        // assembler and arrive as ordinary pointer parameters.
        Producer::Call { .. } => return Ok(()),
    };
    let tensor = &op.output;

    let _ = writeln!(out, "/* {} */", make_identifier(name));
    if name != io.output {
        emit_allocate(tensor, target, out, io)?;
    }
    for it in &op.iter_vars {
        emit_iter_open(it, target, out, io)?;
    }
    match &op.fcompute {
        ComputeBody::Scalar(body) => {
            emit_store(tensor, &op.iter_vars, body, target, out, io)?;
        }
        ComputeBody::Reduce(reduce) => {
            emit_reduce(tensor, &op.iter_vars, reduce, target, out, io)?;
        }
    }
    for it in op.iter_vars.iter().rev() {
        emit_iter_close(it, target, out);
    }
    Ok(())
}

/// Every tensor in `defs` produced by a spliced call, in insertion order --
/// the scratch tables the runtime assembler must allocate and fill before
/// the kernel that reads them can run.
pub fn scratch_tensors(defs: &TensorDefs) -> Vec<(Rc<TensorVar>, Rc<Expr>)> {
    defs.iter()
        .filter_map(|(_, producer)| match producer {
            Producer::Call { tensor, call } => Some((tensor.clone(), call.clone())),
            Producer::Compute(_) => None,
        })
        .collect()
}

fn output_index(iter_vars: &[IterVar]) -> Vec<Rc<Expr>> {
    iter_vars.iter().map(|it| Rc::new(Expr::Iter(it.clone()))).collect()
}

fn emit_store(tensor: &Rc<TensorVar>, iter_vars: &[IterVar], value: &Rc<Expr>, target: Target, out: &mut String, io: IoBinding) -> Result<(), CodegenError> {
    let indices = output_index(iter_vars);
    let flat = flatten_index(&tensor.shape, &indices, target, io)?;
    let value = emit_expr(value, target, io)?;
    let _ = writeln!(out, "{}[{}] = ({});", io.identifier(&tensor.name), flat, value);
    Ok(())
}

fn emit_reduce(
    tensor: &Rc<TensorVar>,
    iter_vars: &[IterVar],
    reduce: &imgfuse_ir::Reduce,
    target: Target,
    out: &mut String,
    io: IoBinding,
) -> Result<(), CodegenError> {
    let acc_name = match reduce.accumulate.as_ref() {
        Expr::Scalar(ScalarVar::Placeholder { name, .. }) => make_identifier(name),
        _ => return Err(CodegenError::UnknownTensor { name: "<reduce accumulate>".into() }),
    };
    let acc_ty = reduce.accumulate.ty().c_spelling();
    let init = emit_expr(&reduce.init, target, io)?;
    let _ = writeln!(out, "{acc_ty} {acc_name} = ({init});");

    for it in &reduce.reduce_axis {
        emit_iter_open(it, target, out, io)?;
    }
    let combiner = emit_expr(&reduce.combiner, target, io)?;
    let _ = writeln!(out, "{acc_name} = ({combiner});");
    for it in reduce.reduce_axis.iter().rev() {
        emit_iter_close(it, target, out);
    }

    let indices = output_index(iter_vars);
    let flat = flatten_index(&tensor.shape, &indices, target, io)?;
    let _ = writeln!(out, "{}[{}] = {acc_name};", io.identifier(&tensor.name), flat);
    Ok(())
}

/// Emits every tensor reachable from `output`, in topological order, into a
/// single kernel body. Each tensor's `Allocate` precedes any read of it (no
/// two tensors ever share a name), and `io` binds the pipeline's own input
/// and output tensors to the kernel's `src`/`dst` parameters.
pub fn emit_kernel_body(output: &TensorVar, defs: &TensorDefs, target: Target, io: IoBinding) -> Result<String, CodegenError> {
    let order = imgfuse_ir::topo_order(&output.name, defs)?;
    let mut out = String::new();
    let _ = writeln!(out, "// target = {}", target.label());
    for name in order {
        emit_tensor_definition(&name, defs, target, &mut out, io)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgfuse_ir::builders::*;
    use imgfuse_ir::TensorDefs;

    #[test]
    fn emits_true_false_for_bool_constants() {
        let e = Expr::Const(imgfuse_ir::ConstValue::Bool(true));
        assert_eq!(emit_expr(&e, Target::Cpu, IoBinding::none()).unwrap(), "true");
    }

    #[test]
    fn max_emits_as_function_call() {
        let e = Expr::Binary {
            op: imgfuse_ir::BinaryOp::Max,
            lhs: const_i32(1),
            rhs: const_i32(2),
        };
        let s = emit_expr(&e, Target::Cpu, IoBinding::none()).unwrap();
        assert!(s.starts_with("IMGFUSE_MAX("));
    }

    #[test]
    fn sync_call_differs_by_target() {
        let e = call(imgfuse_ir::CallFunction::Sync, vec![], ScalarType::Bool);
        assert_eq!(emit_expr(&e, Target::Cpu, IoBinding::none()).unwrap(), "/* sync */");
        assert_eq!(emit_expr(&e, Target::Cuda, IoBinding::none()).unwrap(), "__syncthreads()");
    }

    #[test]
    fn kernel_body_emits_dependency_before_dependent() {
        let mut defs = TensorDefs::new();
        let a = compute(vec![const_i32(2)], vec![], const_f32(1.0), "a", &mut defs);
        let shape = vec![const_i32(2)];
        let iters = construct_indices("b", &shape, ScalarType::Int32);
        let read = index(a, vec![Rc::new(Expr::Iter(iters[0].clone()))]);
        let b = compute(shape, iters, read, "b", &mut defs);

        let body = emit_kernel_body(&b, &defs, Target::Cpu, IoBinding::none()).unwrap();
        let a_pos = body.find("/* a */").unwrap();
        let b_pos = body.find("/* b */").unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn thread_block_attr_binds_without_loop_on_cuda() {
        let mut defs = TensorDefs::new();
        let shape = vec![const_i32(4)];
        let mut iters = construct_indices("g", &shape, ScalarType::Int32);
        iters[0] = Rc::new(imgfuse_ir::IterVarData {
            name: iters[0].name.clone(),
            range: imgfuse_ir::Range {
                init: const_i32(0),
                extent: const_i32(4),
            },
            attr: IterAttrType::ThreadBlockX,
            ty: ScalarType::Int32,
        });
        let body_expr = const_f32(0.0);
        let t = compute(shape, iters, body_expr, "g", &mut defs);
        let body = emit_kernel_body(&t, &defs, Target::Cuda, IoBinding::none()).unwrap();
        assert!(body.contains("blockIdx.x"));
        assert!(!body.contains("for ("));
    }

    #[test]
    fn input_and_output_tensors_bind_to_src_and_dst() {
        let mut defs = TensorDefs::new();
        let shape = vec![const_i32(2)];
        let input = Rc::new(TensorVar {
            name: "in".into(),
            shape: shape.clone(),
            element_type: ScalarType::Int32,
        });
        let iters = construct_indices("out", &shape, ScalarType::Int32);
        let read = index(input, vec![Rc::new(Expr::Iter(iters[0].clone()))]);
        let out = compute(shape, iters, read, "out", &mut defs);

        let io = IoBinding::new("in", "out");
        let body = emit_kernel_body(&out, &defs, Target::Cpu, io).unwrap();
        assert!(body.contains("src["));
        assert!(body.contains("dst["));
        assert!(!body.contains("in["));
        assert!(!body.contains("out["));
    }

    #[test]
    fn intermediate_tensor_gets_a_declaration_before_its_store() {
        let mut defs = TensorDefs::new();
        let a = compute(vec![const_i32(2)], vec![], const_f32(1.0), "a", &mut defs);
        let shape = vec![const_i32(2)];
        let iters = construct_indices("b", &shape, ScalarType::Int32);
        let read = index(a, vec![Rc::new(Expr::Iter(iters[0].clone()))]);
        let b = compute(shape, iters, read, "b", &mut defs);

        let io = IoBinding::new("nothing", "b");
        let body = emit_kernel_body(&b, &defs, Target::Cpu, io).unwrap();
        let decl_pos = body.find("a[2];").expect("declaration for intermediate tensor a");
        let store_pos = body.rfind("a[").expect("store into a");
        assert!(decl_pos < store_pos);
        // "b" is the bound output -- no declaration, writes straight to dst.
        assert!(!body.contains("float b["));
        assert!(body.contains("dst["));
    }
}
