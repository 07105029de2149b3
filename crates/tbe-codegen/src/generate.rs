//! Artifact matrix driver. Renders every artifact for every registered
//! optimizer and writes them to a target directory.
//!
//! Each entry is handled independently: its artifacts are fully rendered
//! in memory, staged to temporary files next to their destinations, and
//! renamed into place only once all of them are staged. A failing entry
//! leaves no partial output and does not affect the others.

use std::path::{Path, PathBuf};

use minijinja::{Value, context};
use rayon::prelude::*;

use crate::config::GeneratorConfig;
use crate::error::CodegenError;
use crate::lower::{Backend, lower};
use crate::manifest::manifest_artifact;
use crate::registry::{OptimizerEntry, Registry};
use crate::render::{TemplateEnv, TemplateId};
use crate::signature::{SignatureBundle, synthesize};
use crate::standalone::emit_standalone;

/// A rendered artifact that has not been written yet.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// File name relative to the output directory.
    pub file_name: String,
    pub kind: ArtifactKind,
    pub text: String,
}

/// Manifest of generated files.
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    /// Files that were generated.
    pub files: Vec<GeneratedFile>,
}

/// A single generated file.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    /// Path relative to the output directory.
    pub relative_path: PathBuf,
    /// Absolute path where the file was written.
    pub absolute_path: PathBuf,
    /// What kind of artifact this is.
    pub kind: ArtifactKind,
    /// Number of bytes written.
    pub bytes: usize,
}

/// The kind of generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Accelerator backward kernel, one per weighting mode.
    AcceleratorKernel,
    /// Operator registration and autograd glue for the accelerator kernels.
    AcceleratorBinding,
    /// Python glue dispatching between the accelerator and host bindings.
    DispatchGlue,
    HostKernel,
    HostBinding,
    ForwardKernel,
    IndiceWeightsKernel,
    /// `__init__.py` importing every dispatch glue module.
    PackageInit,
    Manifest,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcceleratorKernel => write!(f, "cuda-kernel"),
            Self::AcceleratorBinding => write!(f, "cuda-binding"),
            Self::DispatchGlue => write!(f, "dispatch-glue"),
            Self::HostKernel => write!(f, "cpu-kernel"),
            Self::HostBinding => write!(f, "cpu-binding"),
            Self::ForwardKernel => write!(f, "forward-kernel"),
            Self::IndiceWeightsKernel => write!(f, "indice-weights-kernel"),
            Self::PackageInit => write!(f, "package-init"),
            Self::Manifest => write!(f, "manifest"),
        }
    }
}

/// What to emit besides the per-optimizer artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Forward and indice-weight kernels shared by every optimizer, and
    /// the package init of the dispatch glue.
    pub standalone: bool,
    /// `codegen_manifest.json` with the binding metadata.
    pub manifest: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            standalone: true,
            manifest: false,
        }
    }
}

/// Result of emitting one unit of work (an optimizer entry, or one of the
/// shared groups).
#[derive(Debug)]
pub struct EntryOutcome {
    pub name: String,
    pub result: Result<GeneratedFiles, CodegenError>,
}

impl EntryOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-entry outcomes of a [`generate_all`] run.
#[derive(Debug, Default)]
pub struct EmissionReport {
    /// One outcome per optimizer, in registration order.
    pub entries: Vec<EntryOutcome>,
    /// Standalone kernels and the manifest, when requested.
    pub shared: Vec<EntryOutcome>,
}

impl EmissionReport {
    fn outcomes(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries.iter().chain(self.shared.iter())
    }

    /// Every file written, across all successful outcomes.
    pub fn files(&self) -> Vec<&GeneratedFile> {
        self.outcomes()
            .filter_map(|o| o.result.as_ref().ok())
            .flat_map(|g| g.files.iter())
            .collect()
    }

    pub fn failures(&self) -> Vec<&EntryOutcome> {
        self.outcomes().filter(|o| !o.is_ok()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes().all(EntryOutcome::is_ok)
    }

    pub fn get(&self, name: &str) -> Option<&EntryOutcome> {
        self.outcomes().find(|o| o.name == name)
    }
}

/// Render the full artifact set for one optimizer without touching disk.
///
/// Non-density entries produce six artifacts: two accelerator kernels,
/// the accelerator binding, the dispatch glue, the host kernel and the
/// host binding. Density variants produce only the three kernels.
///
/// # Errors
///
/// Returns [`CodegenError::Render`] naming the entry and template if any
/// template fails, or a lowering error for a malformed operand list.
pub fn emit(entry: &OptimizerEntry, env: &TemplateEnv) -> Result<Vec<Artifact>, CodegenError> {
    let name = entry.name.as_str();
    let dense = entry.density_variant || env.config().dense;
    let cuda = bundle(entry, Backend::AcceleratorMemory)?;
    let cpu = bundle(entry, Backend::HostMemory)?;

    let base = context! {
        optimizer => name,
        split_precomputation => &entry.precompute,
        split_weight_update => &entry.update,
        split_weight_update_cpu => &entry.update_host,
        dense => dense,
    };

    let mut artifacts = Vec::with_capacity(6);

    for weighted in [false, true] {
        let wdesc = if weighted { "weighted" } else { "unweighted" };
        let text = env.render(
            TemplateId::BackwardSplitCuda,
            context! { args => &cuda, weighted => weighted, ..base.clone() },
            name,
        )?;
        artifacts.push(Artifact {
            file_name: format!("gen_embedding_backward_{name}_split_{wdesc}_cuda.cu"),
            kind: ArtifactKind::AcceleratorKernel,
            text,
        });
    }

    if !entry.density_variant {
        let text = env.render(
            TemplateId::BackwardSplitHost,
            context! { args => &cuda, ..base.clone() },
            name,
        )?;
        artifacts.push(Artifact {
            file_name: format!("gen_embedding_backward_split_{name}.cpp"),
            kind: ArtifactKind::AcceleratorBinding,
            text,
        });

        let text = env.render(
            TemplateId::LookupInvoker,
            context! { args => &cuda, cpu_args => &cpu, ..base.clone() },
            name,
        )?;
        artifacts.push(Artifact {
            file_name: format!("lookup_{name}.py"),
            kind: ArtifactKind::DispatchGlue,
            text,
        });
    }

    if !entry.density_variant && !entry.host_codegen {
        tracing::warn!(
            optimizer = name,
            "no host update; host kernel defers to an external implementation"
        );
    }
    let host_template = if entry.is_approximate() {
        TemplateId::BackwardSplitCpuApprox
    } else {
        TemplateId::BackwardSplitCpu
    };
    let text = env.render(host_template, context! { args => &cpu, ..base.clone() }, name)?;
    artifacts.push(Artifact {
        file_name: format!("gen_embedding_backward_{name}_split_cpu.cpp"),
        kind: ArtifactKind::HostKernel,
        text,
    });

    if !entry.density_variant {
        let text = env.render(
            TemplateId::BackwardSplitHostCpu,
            context! { args => &cpu, ..base },
            name,
        )?;
        artifacts.push(Artifact {
            file_name: format!("gen_embedding_backward_split_{name}_cpu.cpp"),
            kind: ArtifactKind::HostBinding,
            text,
        });
    }

    Ok(artifacts)
}

fn bundle(entry: &OptimizerEntry, backend: Backend) -> Result<SignatureBundle, CodegenError> {
    let lowered = lower(&entry.operands, backend)?;
    Ok(synthesize(&lowered, &entry.operands))
}

/// Temporary files awaiting rename. Dropping removes whatever is left.
struct Staging {
    staged: Vec<(PathBuf, PathBuf)>,
}

impl Staging {
    fn commit(mut self) -> Result<(), CodegenError> {
        let mut pending = std::mem::take(&mut self.staged).into_iter();
        while let Some((tmp, target)) = pending.next() {
            if let Err(source) = std::fs::rename(&tmp, &target) {
                self.staged.push((tmp, target.clone()));
                self.staged.extend(pending);
                return Err(CodegenError::Write {
                    path: target,
                    source,
                });
            }
        }
        Ok(())
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        for (tmp, _) in self.staged.drain(..) {
            if let Err(e) = std::fs::remove_file(&tmp) {
                tracing::debug!(path = %tmp.display(), error = %e, "could not remove staged file");
            }
        }
    }
}

/// Write `artifacts` into `output_dir` as one unit.
///
/// Every artifact is first written to `<name>.tmp`; only when all of them
/// are staged are they renamed over their destinations. On failure the
/// staged files are removed. Renames are not atomic as a group: if one
/// fails, targets renamed before it already hold the new text and the
/// rest keep their old contents.
///
/// # Errors
///
/// Returns [`CodegenError::Write`] naming the path that could not be
/// staged or renamed.
pub fn write_artifacts(artifacts: &[Artifact], output_dir: &Path) -> Result<GeneratedFiles, CodegenError> {
    let mut staging = Staging {
        staged: Vec::with_capacity(artifacts.len()),
    };
    let mut files = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let target = output_dir.join(&artifact.file_name);
        if target.is_dir() {
            return Err(CodegenError::Write {
                path: target,
                source: std::io::Error::new(
                    std::io::ErrorKind::IsADirectory,
                    "destination is a directory",
                ),
            });
        }
        let tmp = output_dir.join(format!("{}.tmp", artifact.file_name));
        std::fs::write(&tmp, &artifact.text).map_err(|source| CodegenError::Write {
            path: tmp.clone(),
            source,
        })?;
        tracing::debug!(file = %artifact.file_name, kind = %artifact.kind, "staged artifact");
        staging.staged.push((tmp, target.clone()));
        files.push(GeneratedFile {
            relative_path: PathBuf::from(&artifact.file_name),
            absolute_path: target,
            kind: artifact.kind,
            bytes: artifact.text.len(),
        });
    }

    staging.commit()?;
    Ok(GeneratedFiles { files })
}

/// Emit every registered optimizer into `output_dir` with the default
/// [`GenerateOptions`].
///
/// # Errors
///
/// See [`generate_with`].
pub fn generate_all(
    registry: &Registry,
    config: &GeneratorConfig,
    output_dir: &Path,
) -> Result<EmissionReport, CodegenError> {
    generate_with(registry, config, output_dir, GenerateOptions::default())
}

/// Emit every registered optimizer into `output_dir`.
///
/// Entries run in parallel. Per-entry failures are recorded in the
/// returned [`EmissionReport`] rather than aborting the run.
///
/// # Errors
///
/// Returns an error only for run-wide failures: a template that does not
/// parse, or an output directory that cannot be created.
pub fn generate_with(
    registry: &Registry,
    config: &GeneratorConfig,
    output_dir: &Path,
    options: GenerateOptions,
) -> Result<EmissionReport, CodegenError> {
    let env = TemplateEnv::new(config)?;
    std::fs::create_dir_all(output_dir).map_err(|source| CodegenError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let entries: Vec<EntryOutcome> = registry
        .entries()
        .par_iter()
        .map(|entry| {
            let result = emit(entry, &env).and_then(|a| write_artifacts(&a, output_dir));
            log_outcome(&entry.name, &result);
            EntryOutcome {
                name: entry.name.clone(),
                result,
            }
        })
        .collect();

    let mut shared = Vec::new();
    if options.standalone {
        let result = emit_standalone(registry, &env).and_then(|a| write_artifacts(&a, output_dir));
        log_outcome("standalone", &result);
        shared.push(EntryOutcome {
            name: "standalone".to_string(),
            result,
        });
    }
    if options.manifest {
        let result = manifest_artifact(registry, config)
            .and_then(|a| write_artifacts(std::slice::from_ref(&a), output_dir));
        log_outcome("manifest", &result);
        shared.push(EntryOutcome {
            name: "manifest".to_string(),
            result,
        });
    }

    Ok(EmissionReport { entries, shared })
}

fn log_outcome(name: &str, result: &Result<GeneratedFiles, CodegenError>) {
    match result {
        Ok(generated) => tracing::info!(entry = name, files = generated.files.len(), "emitted"),
        Err(e) => tracing::error!(entry = name, error = %e, "emission failed"),
    }
}
