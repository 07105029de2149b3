//! Artifacts shared by every optimizer: the pooled forward lookup and the
//! gradient with respect to per-index weights, emitted once per run in
//! both the split (cached, UVM-backed) and dense flavors, plus the
//! `__init__.py` of the dispatch glue package.

use minijinja::context;

use crate::error::CodegenError;
use crate::generate::{Artifact, ArtifactKind};
use crate::registry::Registry;
use crate::render::{TemplateEnv, TemplateId};

pub const PACKAGE_INIT_FILE: &str = "__init__.py";

/// Render the forward and indice-weight kernels and the package init
/// importing the dispatch glue of every non-density entry in `registry`.
///
/// # Errors
///
/// Returns [`CodegenError::Render`] if any template fails.
pub fn emit_standalone(registry: &Registry, env: &TemplateEnv) -> Result<Vec<Artifact>, CodegenError> {
    let mut artifacts = Vec::with_capacity(7);

    for dense in [false, true] {
        let mode = if dense { "dense" } else { "split" };
        for weighted in [false, true] {
            let wdesc = if weighted { "weighted" } else { "unweighted" };
            let text = env.render(
                TemplateId::ForwardSplitCuda,
                context! { weighted => weighted, dense => dense },
                "forward",
            )?;
            artifacts.push(Artifact {
                file_name: format!("gen_embedding_forward_{mode}_{wdesc}_codegen_cuda.cu"),
                kind: ArtifactKind::ForwardKernel,
                text,
            });
        }
    }

    for dense in [false, true] {
        let mode = if dense { "dense" } else { "split" };
        let text = env.render(
            TemplateId::BackwardIndiceWeightsCuda,
            context! { dense => dense },
            "indice_weights",
        )?;
        artifacts.push(Artifact {
            file_name: format!("gen_embedding_backward_{mode}_indice_weights_codegen_cuda.cu"),
            kind: ArtifactKind::IndiceWeightsKernel,
            text,
        });
    }

    let lookups: Vec<&str> = registry
        .iter()
        .filter(|e| !e.density_variant)
        .map(|e| e.name.as_str())
        .collect();
    let text = env.render(TemplateId::PackageInit, context! { lookups => lookups }, "package_init")?;
    artifacts.push(Artifact {
        file_name: PACKAGE_INIT_FILE.to_string(),
        kind: ArtifactKind::PackageInit,
        text,
    });

    Ok(artifacts)
}
