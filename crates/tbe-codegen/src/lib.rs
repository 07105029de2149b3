//! # tbe-codegen
//!
//! Build-time source generator for split-embedding optimizer kernels.
//!
//! Each optimizer is declared once as a backend-agnostic operand list plus
//! opaque update-rule fragments. The generator lowers that list for each
//! memory backend, derives every positionally aligned signature list the
//! templates need, and emits the full matrix of accelerator kernels, host
//! kernels, operator bindings and dispatch glue.
//!
//! ## Modules
//!
//! - [`operand`]: Operand kind taxonomy and validated operand lists
//! - [`lower`]: Backend lowering of `Array` operands into physical parts
//! - [`signature`]: Signature / constructor synthesis from lowered lists
//! - [`registry`]: Optimizer registry, built-in entries and validation
//! - [`config`]: Generator configuration loaded from YAML
//! - [`render`]: Template environment and stable template ids
//! - [`generate`]: Artifact matrix driver and atomic writes to disk
//! - [`standalone`]: Forward and indice-weight kernels shared by all optimizers
//! - [`manifest`]: JSON binding manifest

pub mod config;
pub mod error;
pub mod generate;
pub mod lower;
pub mod manifest;
pub mod operand;
pub mod registry;
pub mod render;
pub mod signature;
pub mod standalone;

pub use config::{GeneratorConfig, parse_config, parse_config_str};
pub use error::{CodegenError, Severity, Violation};
pub use generate::{EmissionReport, GenerateOptions, emit, generate_all, generate_with};
pub use lower::{Backend, lower};
pub use operand::{Operand, OperandKind, OperandList};
pub use registry::{OptimizerEntry, Registry, builtin_registry};
pub use signature::{SignatureBundle, synthesize};
