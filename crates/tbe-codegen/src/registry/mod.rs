//! Optimizer registry.
//!
//! Entries are pure data: a name, a backend-agnostic operand list and the
//! opaque update-rule fragments. Population is an explicit, ordered
//! sequence of [`Registry::register`] calls; see [`builtin_registry`].

mod builtin;
mod validator;

use serde::Serialize;

use crate::error::{CodegenError, Severity};
use crate::operand::OperandList;

pub use builtin::builtin_registry;
pub use validator::{validate_entry, validate_registry};

/// One optimizer: operands plus precompute / update fragments.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizerEntry {
    pub name: String,
    pub operands: OperandList,
    /// Accelerator code run once per row before the element-wise update.
    pub precompute: String,
    /// Accelerator element-wise update.
    pub update: String,
    /// Host update. Empty means the host kernel defers to an external
    /// implementation.
    pub update_host: String,
    /// Density variants only emit numeric kernels, no binding glue.
    pub density_variant: bool,
    pub host_codegen: bool,
}

impl OptimizerEntry {
    pub fn new(name: impl Into<String>, operands: OperandList) -> Self {
        Self {
            name: name.into(),
            operands,
            precompute: String::new(),
            update: String::new(),
            update_host: String::new(),
            density_variant: false,
            host_codegen: false,
        }
    }

    #[must_use]
    pub fn with_precompute(mut self, fragment: impl Into<String>) -> Self {
        self.precompute = fragment.into();
        self
    }

    #[must_use]
    pub fn with_update(mut self, fragment: impl Into<String>) -> Self {
        self.update = fragment.into();
        self
    }

    #[must_use]
    pub fn with_host_update(mut self, fragment: impl Into<String>) -> Self {
        self.update_host = fragment.into();
        self.host_codegen = !self.update_host.trim().is_empty();
        self
    }

    #[must_use]
    pub fn density_variant(mut self) -> Self {
        self.density_variant = true;
        self
    }

    /// Approximate optimizers use the reduced host template.
    pub fn is_approximate(&self) -> bool {
        self.name.contains("approx")
    }
}

/// Name-unique, insertion-ordered set of optimizer entries.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<OptimizerEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry`, rejecting malformed entries before any emission.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::DuplicateOptimizer`] if the name is taken,
    /// or [`CodegenError::MalformedEntry`] if validation reports errors.
    pub fn register(&mut self, entry: OptimizerEntry) -> Result<(), CodegenError> {
        if self.get(&entry.name).is_some() {
            return Err(CodegenError::DuplicateOptimizer { name: entry.name });
        }
        let violations: Vec<_> = validate_entry(&entry)
            .into_iter()
            .filter(|v| v.severity == Severity::Error)
            .collect();
        if !violations.is_empty() {
            let summary = violations
                .iter()
                .map(|v| format!("{} {}", v.rule, v.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CodegenError::MalformedEntry {
                optimizer: entry.name,
                summary,
                violations,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OptimizerEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OptimizerEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[OptimizerEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Restrict the registry to `names`, keeping registration order.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::UnknownOptimizer`] for a name that was
    /// never registered.
    pub fn select(&self, names: &[String]) -> Result<Registry, CodegenError> {
        if let Some(missing) = names.iter().find(|n| self.get(n).is_none()) {
            return Err(CodegenError::UnknownOptimizer {
                name: missing.clone(),
            });
        }
        Ok(Registry {
            entries: self
                .entries
                .iter()
                .filter(|e| names.contains(&e.name))
                .cloned()
                .collect(),
        })
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a OptimizerEntry;
    type IntoIter = std::slice::Iter<'a, OptimizerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::Operand;

    fn momentum_shape() -> OperandList {
        OperandList::new(vec![
            Operand::array("momentum1"),
            Operand::float("eps"),
            Operand::float("learning_rate"),
        ])
        .unwrap()
    }

    #[test]
    fn register_keeps_order() {
        let mut r = Registry::new();
        r.register(OptimizerEntry::new("b_opt", momentum_shape()).with_update("b;"))
            .unwrap();
        r.register(OptimizerEntry::new("a_opt", momentum_shape()).with_update("a;"))
            .unwrap();
        assert_eq!(r.names(), ["b_opt", "a_opt"]);
    }

    #[test]
    fn shared_shapes_are_not_deduplicated() {
        let mut r = Registry::new();
        r.register(OptimizerEntry::new("adagrad", momentum_shape()).with_update("x;"))
            .unwrap();
        r.register(OptimizerEntry::new("rowwise_adagrad", momentum_shape()).with_update("y;"))
            .unwrap();
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut r = Registry::new();
        r.register(OptimizerEntry::new("sgd", momentum_shape()).with_update("x;"))
            .unwrap();
        let err = r
            .register(OptimizerEntry::new("sgd", momentum_shape()).with_update("y;"))
            .unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateOptimizer { ref name } if name == "sgd"));
    }

    #[test]
    fn malformed_entry_rejected_with_rules() {
        let mut r = Registry::new();
        let err = r
            .register(OptimizerEntry::new("adam", momentum_shape()))
            .unwrap_err();
        match err {
            CodegenError::MalformedEntry {
                optimizer,
                violations,
                ..
            } => {
                assert_eq!(optimizer, "adam");
                assert_eq!(violations[0].rule, "REG-003");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(r.is_empty());
    }

    #[test]
    fn host_update_sets_host_codegen() {
        let e = OptimizerEntry::new("sgd", momentum_shape()).with_host_update("w -= g;");
        assert!(e.host_codegen);
        let e = OptimizerEntry::new("sgd", momentum_shape()).with_host_update("  \n");
        assert!(!e.host_codegen);
    }

    #[test]
    fn approximate_by_name() {
        assert!(OptimizerEntry::new("approx_sgd", momentum_shape()).is_approximate());
        assert!(!OptimizerEntry::new("sgd", momentum_shape()).is_approximate());
    }

    #[test]
    fn select_subset() {
        let r = builtin_registry().unwrap();
        let sub = r
            .select(&["sgd".to_string(), "adam".to_string()])
            .unwrap();
        assert_eq!(sub.names(), ["adam", "sgd"]);
        assert!(matches!(
            r.select(&["adamw".to_string()]),
            Err(CodegenError::UnknownOptimizer { .. })
        ));
    }
}
