//! Binding manifest: the derived signature lists of every optimizer on
//! every backend, as JSON, for consumers that bind the generated
//! operators without parsing the generated sources.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::GeneratorConfig;
use crate::error::CodegenError;
use crate::generate::{Artifact, ArtifactKind};
use crate::lower::{Backend, lower};
use crate::registry::{OptimizerEntry, Registry};
use crate::signature::{SignatureBundle, synthesize};

pub const MANIFEST_FILE: &str = "codegen_manifest.json";

#[derive(Debug, Clone, Serialize)]
pub struct BindingManifest {
    pub generator: &'static str,
    pub version: &'static str,
    pub max_embedding_dim: u32,
    pub optimizers: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub name: String,
    pub density_variant: bool,
    pub host_codegen: bool,
    pub backends: BTreeMap<Backend, SignatureBundle>,
}

impl ManifestEntry {
    fn from_entry(entry: &OptimizerEntry) -> Result<Self, CodegenError> {
        let mut backends = BTreeMap::new();
        for backend in Backend::ALL {
            let lowered = lower(&entry.operands, backend)?;
            backends.insert(backend, synthesize(&lowered, &entry.operands));
        }
        Ok(Self {
            name: entry.name.clone(),
            density_variant: entry.density_variant,
            host_codegen: entry.host_codegen,
            backends,
        })
    }
}

/// Collect binding metadata for every registered optimizer.
///
/// # Errors
///
/// Propagates lowering errors; registered entries lower cleanly.
pub fn build_manifest(registry: &Registry, config: &GeneratorConfig) -> Result<BindingManifest, CodegenError> {
    let optimizers = registry
        .iter()
        .map(ManifestEntry::from_entry)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BindingManifest {
        generator: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        max_embedding_dim: config.max_embedding_dim,
        optimizers,
    })
}

pub(crate) fn manifest_artifact(registry: &Registry, config: &GeneratorConfig) -> Result<Artifact, CodegenError> {
    let manifest = build_manifest(registry, config)?;
    let mut text = serde_json::to_string_pretty(&manifest)?;
    text.push('\n');
    Ok(Artifact {
        file_name: MANIFEST_FILE.to_string(),
        kind: ArtifactKind::Manifest,
        text,
    })
}
