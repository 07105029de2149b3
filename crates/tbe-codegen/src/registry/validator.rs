use std::collections::HashSet;

use crate::error::{Severity, Violation};
use crate::lower::{Backend, lower};
use crate::registry::{OptimizerEntry, Registry};

/// Validate one optimizer entry for completeness and consistency.
///
/// Returns a list of violations. If any violation has
/// [`Severity::Error`], the entry must not be registered.
pub fn validate_entry(entry: &OptimizerEntry) -> Vec<Violation> {
    let mut violations = Vec::new();

    validate_names(entry, &mut violations);
    validate_fragments(entry, &mut violations);
    validate_lowered_names(entry, &mut violations);

    violations
}

/// Validate every registered entry, in registration order.
pub fn validate_registry(registry: &Registry) -> Vec<Violation> {
    registry.iter().flat_map(validate_entry).collect()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn validate_names(entry: &OptimizerEntry, violations: &mut Vec<Violation>) {
    if !is_identifier(&entry.name) {
        violations.push(Violation {
            severity: Severity::Error,
            rule: "REG-001".to_string(),
            message: format!(
                "optimizer name {:?} must be a lowercase identifier; \
                 it is spliced into file names and symbols",
                entry.name
            ),
            location: Some(entry.name.clone()),
        });
    }

    for (i, op) in entry.operands.iter().enumerate() {
        if !is_identifier(&op.name) {
            violations.push(Violation {
                severity: Severity::Error,
                rule: "REG-002".to_string(),
                message: format!(
                    "{}.operands[{i}] name {:?} must be a lowercase identifier",
                    entry.name, op.name
                ),
                location: Some(format!("{}.operands[{i}]", entry.name)),
            });
        }
    }

    if entry.operands.is_empty() {
        violations.push(Violation {
            severity: Severity::Error,
            rule: "REG-006".to_string(),
            message: format!(
                "{}.operands must contain at least one operand",
                entry.name
            ),
            location: Some(format!("{}.operands", entry.name)),
        });
    }
}

fn validate_fragments(entry: &OptimizerEntry, violations: &mut Vec<Violation>) {
    if entry.density_variant {
        if !entry.update.trim().is_empty() || !entry.update_host.trim().is_empty() {
            violations.push(Violation {
                severity: Severity::Warning,
                rule: "REG-005".to_string(),
                message: format!(
                    "{} is a density variant; its update fragments are not used",
                    entry.name
                ),
                location: Some(format!("{}.update", entry.name)),
            });
        }
        return;
    }

    if entry.update.trim().is_empty() && !entry.is_approximate() {
        violations.push(Violation {
            severity: Severity::Error,
            rule: "REG-003".to_string(),
            message: format!("{}.update must not be empty", entry.name),
            location: Some(format!("{}.update", entry.name)),
        });
    }

    if !entry.host_codegen {
        violations.push(Violation {
            severity: Severity::Info,
            rule: "REG-004".to_string(),
            message: format!(
                "{} has no host update; the host kernel defers to an external implementation",
                entry.name
            ),
            location: Some(format!("{}.update_host", entry.name)),
        });
    }
}

fn validate_lowered_names(entry: &OptimizerEntry, violations: &mut Vec<Violation>) {
    for backend in Backend::ALL {
        let Ok(lowered) = lower(&entry.operands, backend) else {
            continue;
        };
        let mut seen = HashSet::new();
        for name in lowered.names() {
            if !seen.insert(name) {
                violations.push(Violation {
                    severity: Severity::Error,
                    rule: "REG-007".to_string(),
                    message: format!(
                        "{}: lowered operand {name} on {backend} collides with another operand",
                        entry.name
                    ),
                    location: Some(format!("{}.operands", entry.name)),
                });
            }
        }
    }
}
