use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodegenError;

/// Abstract kind of an optimizer operand.
///
/// `IndexArray` and `WideIndexArray` only appear in lowered lists: they
/// carry the placement/offset routing metadata that lowering adds next to
/// every [`OperandKind::Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandKind {
    Array,
    IndexArray,
    WideIndexArray,
    ScalarInt,
    ScalarFloat,
}

const ACC_CACHE_T: &str = "acc_type<cache_t, true>";
const ACC_SCALAR_T: &str = "acc_type<scalar_t, true>";

impl OperandKind {
    /// Kernel parameter declaration, e.g.
    /// `PackedTensorAccessor32<int32_t, 1, RestrictPtrTraits> w_placements`.
    pub fn kernel_param(self, name: &str) -> String {
        match self {
            Self::Array => packed_accessor_param(ACC_CACHE_T, name, 64),
            Self::IndexArray => packed_accessor_param("int32_t", name, 32),
            Self::WideIndexArray => packed_accessor_param("int64_t", name, 32),
            Self::ScalarInt => format!("int64_t {name}"),
            Self::ScalarFloat => format!("float {name}"),
        }
    }

    /// Expression that obtains the kernel argument from a runtime tensor at
    /// the launch site. Scalars are passed by name.
    pub fn call_site_ctor(self, name: &str) -> String {
        match self {
            Self::Array => packed_accessor_ctor(ACC_CACHE_T, name, 64),
            Self::IndexArray => packed_accessor_ctor("int32_t", name, 32),
            Self::WideIndexArray => packed_accessor_ctor("int64_t", name, 32),
            Self::ScalarInt | Self::ScalarFloat => name.to_string(),
        }
    }

    /// Host-side accessor statement; empty for scalars.
    pub fn host_accessor(self, name: &str) -> String {
        match self {
            Self::Array => host_accessor_stmt(ACC_SCALAR_T, name),
            Self::IndexArray => host_accessor_stmt("int32_t", name),
            Self::WideIndexArray => host_accessor_stmt("int64_t", name),
            Self::ScalarInt | Self::ScalarFloat => String::new(),
        }
    }

    /// Parameter declaration of the outer, backend-agnostic function.
    pub fn outer_param(self, name: &str) -> String {
        match self {
            Self::Array | Self::IndexArray | Self::WideIndexArray => format!("Tensor {name}"),
            Self::ScalarInt => format!("int64_t {name}"),
            Self::ScalarFloat => format!("double {name}"),
        }
    }

    /// Operator schema form of the parameter.
    pub fn schema_param(self, name: &str) -> String {
        match self {
            Self::Array | Self::IndexArray | Self::WideIndexArray => format!("Tensor {name}"),
            Self::ScalarInt => format!("int {name}"),
            Self::ScalarFloat => format!("float {name}"),
        }
    }

    /// Accessor that unboxes a scalar from a generic value container.
    pub fn boxed_extractor(self) -> Option<&'static str> {
        match self {
            Self::ScalarInt => Some("toInt"),
            Self::ScalarFloat => Some("toDouble"),
            Self::Array | Self::IndexArray | Self::WideIndexArray => None,
        }
    }

    pub fn is_tensor(self) -> bool {
        matches!(self, Self::Array | Self::IndexArray | Self::WideIndexArray)
    }

    pub fn is_scalar(self) -> bool {
        matches!(self, Self::ScalarInt | Self::ScalarFloat)
    }

    /// Kinds that lowering produces but a registry entry must not declare.
    pub fn is_lowered_only(self) -> bool {
        matches!(self, Self::IndexArray | Self::WideIndexArray)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::IndexArray => "index_array",
            Self::WideIndexArray => "wide_index_array",
            Self::ScalarInt => "scalar_int",
            Self::ScalarFloat => "scalar_float",
        }
    }
}

fn packed_accessor_param(ty: &str, name: &str, precision: u8) -> String {
    format!("PackedTensorAccessor{precision}<{ty}, 1, RestrictPtrTraits> {name}")
}

fn packed_accessor_ctor(ty: &str, name: &str, precision: u8) -> String {
    format!("{name}.packed_accessor{precision}<{ty}, 1, RestrictPtrTraits>()")
}

fn host_accessor_stmt(ty: &str, name: &str) -> String {
    format!("auto {name}_accessor = {name}.accessor<{ty}, 1>()")
}

impl std::fmt::Display for OperandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperandKind {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "array" | "tensor" => Ok(Self::Array),
            "index_array" | "int_tensor" => Ok(Self::IndexArray),
            "wide_index_array" | "long_tensor" => Ok(Self::WideIndexArray),
            "scalar_int" | "int" => Ok(Self::ScalarInt),
            "scalar_float" | "float" => Ok(Self::ScalarFloat),
            other => Err(CodegenError::InvalidKind {
                kind: other.to_string(),
            }),
        }
    }
}
