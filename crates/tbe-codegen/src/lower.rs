//! Backend lowering: expands logical operands into physical ones.
//!
//! An `Array` on accelerator memory is backed by a device-resident copy,
//! a UVM overflow copy and routing metadata (placements, offsets). Host
//! memory needs only the row data plus the same routing metadata.
//! Scalars pass through unchanged on every backend.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodegenError;
use crate::operand::{Operand, OperandKind, OperandList};

/// Physical execution / memory environment a kernel targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Backend {
    #[serde(rename = "cpu")]
    HostMemory,
    #[serde(rename = "cuda")]
    AcceleratorMemory,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::AcceleratorMemory, Backend::HostMemory];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostMemory => "cpu",
            Self::AcceleratorMemory => "cuda",
        }
    }

    /// Physical parts one `Array` operand expands into, in emission order.
    pub fn array_parts(self) -> &'static [ArrayPart] {
        match self {
            Self::HostMemory => &[ArrayPart::Host, ArrayPart::Placements, ArrayPart::Offsets],
            Self::AcceleratorMemory => &[
                ArrayPart::Dev,
                ArrayPart::Uvm,
                ArrayPart::Placements,
                ArrayPart::Offsets,
            ],
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" | "host" => Ok(Self::HostMemory),
            "cuda" | "accelerator" => Ok(Self::AcceleratorMemory),
            other => Err(format!("unknown backend: {other} (expected cpu or cuda)")),
        }
    }
}

/// One physical sub-operand of a lowered `Array`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayPart {
    Host,
    Dev,
    Uvm,
    Placements,
    Offsets,
}

impl ArrayPart {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Dev => "dev",
            Self::Uvm => "uvm",
            Self::Placements => "placements",
            Self::Offsets => "offsets",
        }
    }

    pub fn kind(self) -> OperandKind {
        match self {
            Self::Host | Self::Dev | Self::Uvm => OperandKind::Array,
            Self::Placements => OperandKind::IndexArray,
            Self::Offsets => OperandKind::WideIndexArray,
        }
    }
}

/// A lowered operand together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub operand: Operand,
    /// Name of the originating operand in the unlowered list.
    pub origin: String,
    /// `None` for scalars, which pass through.
    pub part: Option<ArrayPart>,
}

/// Operand list after backend-specific expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoweredOperands {
    pub backend: Backend,
    slots: Vec<Slot>,
}

impl LoweredOperands {
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.slots.iter().map(|s| &s.operand)
    }

    /// The lowered list as plain operands.
    pub fn to_operands(&self) -> Vec<Operand> {
        self.operands().cloned().collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.operands().map(|op| op.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Lower `operands` for `backend`.
///
/// Sub-operands of one `Array` are emitted contiguously and the relative
/// order of the original list is preserved.
///
/// # Errors
///
/// Returns [`CodegenError::LoweredKind`] if an index kind appears in the
/// input list.
pub fn lower(operands: &OperandList, backend: Backend) -> Result<LoweredOperands, CodegenError> {
    let mut slots = Vec::with_capacity(operands.len() * backend.array_parts().len());
    for op in operands {
        match op.kind {
            OperandKind::ScalarInt | OperandKind::ScalarFloat => slots.push(Slot {
                operand: op.clone(),
                origin: op.name.clone(),
                part: None,
            }),
            OperandKind::Array => {
                for &part in backend.array_parts() {
                    slots.push(Slot {
                        operand: Operand::new(part.kind(), format!("{}_{}", op.name, part.suffix())),
                        origin: op.name.clone(),
                        part: Some(part),
                    });
                }
            }
            OperandKind::IndexArray | OperandKind::WideIndexArray => {
                return Err(CodegenError::LoweredKind {
                    operand: op.name.clone(),
                    kind: op.kind.to_string(),
                });
            }
        }
    }
    Ok(LoweredOperands { backend, slots })
}
