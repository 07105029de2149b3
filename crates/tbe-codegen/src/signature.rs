//! Signature / constructor synthesis.
//!
//! Turns a lowered operand list into the parallel lists every template
//! needs: kernel parameters, launch-site constructors, host accessors and
//! the outer function signature. All of them are built in a single pass
//! over the lowered list, so position `i` of every list always refers to
//! the same physical operand.

use serde::Serialize;

use crate::lower::{Backend, LoweredOperands};
use crate::operand::{OperandKind, OperandList};

/// A scalar that travels through a boxed value container and the accessor
/// that unboxes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoxedScalar {
    pub name: String,
    pub extractor: &'static str,
}

/// Derived signature lists for one optimizer on one backend.
///
/// Fields serialize under the names the templates bind (`split_*`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureBundle {
    pub backend: Backend,
    #[serde(rename = "split_kernel_args")]
    pub kernel_params: Vec<String>,
    #[serde(rename = "split_kernel_arg_constructors")]
    pub call_site_ctors: Vec<String>,
    #[serde(rename = "split_host_accessor_constructors")]
    pub host_accessors: Vec<String>,
    #[serde(rename = "split_function_args")]
    pub outer_params: Vec<String>,
    #[serde(rename = "split_function_schemas")]
    pub schema_params: Vec<String>,
    #[serde(rename = "split_function_arg_names")]
    pub arg_names: Vec<String>,
    /// Lowered tensor operands saved for the backward pass.
    #[serde(rename = "split_saved_tensors")]
    pub saved_tensors: Vec<String>,
    #[serde(rename = "split_variables")]
    pub grad_placeholders: Vec<String>,
    /// `name=expr` keyword arguments used by the dispatch glue.
    pub invoker_args: Vec<String>,
    /// Original `Array` operand names that must persist across the
    /// forward/backward boundary.
    #[serde(rename = "split_tensors")]
    pub persisted_arrays: Vec<String>,
    #[serde(rename = "saved_data")]
    pub boxed_scalars: Vec<BoxedScalar>,
}

impl SignatureBundle {
    /// Length shared by every positionally aligned list.
    pub fn arity(&self) -> usize {
        self.kernel_params.len()
    }
}

/// Build the signature bundle for `lowered`, whose unlowered source is
/// `original`.
pub fn synthesize(lowered: &LoweredOperands, original: &OperandList) -> SignatureBundle {
    let n = lowered.len();
    let mut bundle = SignatureBundle {
        backend: lowered.backend,
        kernel_params: Vec::with_capacity(n),
        call_site_ctors: Vec::with_capacity(n),
        host_accessors: Vec::with_capacity(n),
        outer_params: Vec::with_capacity(n),
        schema_params: Vec::with_capacity(n),
        arg_names: Vec::with_capacity(n),
        saved_tensors: Vec::new(),
        grad_placeholders: Vec::with_capacity(n),
        invoker_args: Vec::with_capacity(n),
        persisted_arrays: Vec::new(),
        boxed_scalars: Vec::new(),
    };

    for slot in lowered.slots() {
        let kind = slot.operand.kind;
        let name = slot.operand.name.as_str();
        bundle.kernel_params.push(kind.kernel_param(name));
        bundle.call_site_ctors.push(kind.call_site_ctor(name));
        bundle.host_accessors.push(kind.host_accessor(name));
        bundle.outer_params.push(kind.outer_param(name));
        bundle.schema_params.push(kind.schema_param(name));
        bundle.arg_names.push(name.to_string());
        bundle.grad_placeholders.push("Variable()".to_string());
        if kind.is_tensor() {
            bundle.saved_tensors.push(name.to_string());
        }
        let source = match slot.part {
            Some(part) => format!("{}.{}", slot.origin, part.suffix()),
            None => format!("optimizer_args.{}", slot.origin),
        };
        bundle.invoker_args.push(format!("{name}={source}"));
    }

    for op in original {
        match op.kind.boxed_extractor() {
            Some(extractor) => bundle.boxed_scalars.push(BoxedScalar {
                name: op.name.clone(),
                extractor,
            }),
            None if op.kind == OperandKind::Array => bundle.persisted_arrays.push(op.name.clone()),
            None => {}
        }
    }

    bundle
}
