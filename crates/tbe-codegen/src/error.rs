use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("Failed to read or write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown operand kind: {kind}")]
    InvalidKind { kind: String },

    #[error("Operand {operand} of kind {kind} may only appear after lowering")]
    LoweredKind { operand: String, kind: String },

    #[error("Duplicate operand name: {name}")]
    DuplicateOperand { name: String },

    #[error("Duplicate optimizer: {name}")]
    DuplicateOptimizer { name: String },

    #[error("Unknown optimizer: {name}")]
    UnknownOptimizer { name: String },

    #[error("Malformed registry entry {optimizer}: {summary}")]
    MalformedEntry {
        optimizer: String,
        summary: String,
        violations: Vec<Violation>,
    },

    #[error("Failed to render {template} for {optimizer}: {source}")]
    Render {
        optimizer: String,
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Failed to load template {template}: {source}")]
    Template {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Violation {
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        write!(f, "[{prefix}] {}: {}", self.rule, self.message)
    }
}
