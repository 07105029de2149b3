//! Generator configuration.
//!
//! Replaces process-wide template globals with one immutable value that
//! is constructed at start-up and handed to the renderer.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CodegenError;

/// Values bound as globals in every rendered template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Largest embedding dimension the kernels are specialized for.
    pub max_embedding_dim: u32,
    /// Default density flag; density variants override it per render.
    pub dense: bool,
    /// Emit in-tree (fbcode) import paths in the dispatch glue.
    pub fbcode: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_embedding_dim: 1024,
            dense: false,
            fbcode: true,
        }
    }
}

/// Parse a YAML configuration file.
///
/// # Errors
///
/// Returns [`CodegenError::Io`] if the file cannot be read, or
/// [`CodegenError::Yaml`] if the YAML is malformed.
pub fn parse_config(path: &Path) -> Result<GeneratorConfig, CodegenError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a YAML configuration from a string. Missing keys take defaults.
pub fn parse_config_str(yaml: &str) -> Result<GeneratorConfig, CodegenError> {
    if yaml.trim().is_empty() {
        return Ok(GeneratorConfig::default());
    }
    let config: GeneratorConfig = serde_yaml::from_str(yaml)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_kernel_limits() {
        let c = GeneratorConfig::default();
        assert_eq!(c.max_embedding_dim, 1024);
        assert!(!c.dense);
        assert!(c.fbcode);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let c = parse_config_str("max_embedding_dim: 512\n").unwrap();
        assert_eq!(c.max_embedding_dim, 512);
        assert!(c.fbcode);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(parse_config_str("").unwrap(), GeneratorConfig::default());
    }

    #[test]
    fn full_yaml() {
        let c = parse_config_str(
            r#"
max_embedding_dim: 256
dense: true
fbcode: false
"#,
        )
        .unwrap();
        assert_eq!(
            c,
            GeneratorConfig {
                max_embedding_dim: 256,
                dense: true,
                fbcode: false,
            }
        );
    }

    #[test]
    fn unknown_key_is_rejected() {
        assert!(parse_config_str("max_dim: 1\n").is_err());
    }

    #[test]
    fn invalid_yaml_returns_error() {
        assert!(matches!(
            parse_config_str("max_embedding_dim: [1, {{"),
            Err(CodegenError::Yaml(_))
        ));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codegen.yaml");
        std::fs::write(&path, "fbcode: false\n").unwrap();
        let c = parse_config(&path).unwrap();
        assert!(!c.fbcode);
        assert!(matches!(
            parse_config(&dir.path().join("missing.yaml")),
            Err(CodegenError::Io(_))
        ));
    }
}
