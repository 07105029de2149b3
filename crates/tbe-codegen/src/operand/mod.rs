//! Operand kind taxonomy and backend-agnostic operand lists.
//!
//! [`OperandKind`] is the single table that every derived signature list
//! dispatches through.

mod kind;
mod list;

pub use kind::OperandKind;
pub use list::{Operand, OperandList};
