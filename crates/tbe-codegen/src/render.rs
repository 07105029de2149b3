//! Template environment.
//!
//! Wraps a `minijinja` environment holding every template the driver
//! renders. Configuration values are bound as globals once, at
//! construction; the environment is immutable afterwards and shared
//! read-only across worker threads.

use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value};

use crate::config::GeneratorConfig;
use crate::error::CodegenError;

macro_rules! template {
    ($name:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $name))
    };
}

/// Stable identifier of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    /// Accelerator backward kernel with the fused optimizer update.
    BackwardSplitCuda,
    /// Autograd / operator binding for the accelerator kernels.
    BackwardSplitHost,
    /// Python dispatch glue choosing between accelerator and host.
    LookupInvoker,
    /// Host backward kernel with inline update.
    BackwardSplitCpu,
    /// Host backward kernel deferring to an external numeric kernel.
    BackwardSplitCpuApprox,
    /// Autograd / operator binding for the host kernel.
    BackwardSplitHostCpu,
    ForwardSplitCuda,
    BackwardIndiceWeightsCuda,
    /// `__init__.py` of the package holding the dispatch glue modules.
    PackageInit,
}

/// Partials pulled in with `{% include %}`.
const PARTIALS: [(&str, &str); 2] = [
    ("header_cpp.jinja", template!("header_cpp.jinja")),
    ("header_py.jinja", template!("header_py.jinja")),
];

impl TemplateId {
    pub const ALL: [TemplateId; 9] = [
        TemplateId::BackwardSplitCuda,
        TemplateId::BackwardSplitHost,
        TemplateId::LookupInvoker,
        TemplateId::BackwardSplitCpu,
        TemplateId::BackwardSplitCpuApprox,
        TemplateId::BackwardSplitHostCpu,
        TemplateId::ForwardSplitCuda,
        TemplateId::BackwardIndiceWeightsCuda,
        TemplateId::PackageInit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BackwardSplitCuda => "embedding_backward_split_template.cu",
            Self::BackwardSplitHost => "embedding_backward_split_host_template.cpp",
            Self::LookupInvoker => "split_embedding_codegen_lookup_invoker.template",
            Self::BackwardSplitCpu => "embedding_backward_split_cpu_template.cpp",
            Self::BackwardSplitCpuApprox => "embedding_backward_split_cpu_approx_template.cpp",
            Self::BackwardSplitHostCpu => "embedding_backward_split_host_cpu_template.cpp",
            Self::ForwardSplitCuda => "embedding_forward_split_template.cu",
            Self::BackwardIndiceWeightsCuda => "embedding_backward_split_indice_weights_template.cu",
            Self::PackageInit => "__init__.template",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::BackwardSplitCuda => template!("embedding_backward_split_template.cu"),
            Self::BackwardSplitHost => template!("embedding_backward_split_host_template.cpp"),
            Self::LookupInvoker => template!("split_embedding_codegen_lookup_invoker.template"),
            Self::BackwardSplitCpu => template!("embedding_backward_split_cpu_template.cpp"),
            Self::BackwardSplitCpuApprox => {
                template!("embedding_backward_split_cpu_approx_template.cpp")
            }
            Self::BackwardSplitHostCpu => template!("embedding_backward_split_host_cpu_template.cpp"),
            Self::ForwardSplitCuda => template!("embedding_forward_split_template.cu"),
            Self::BackwardIndiceWeightsCuda => {
                template!("embedding_backward_split_indice_weights_template.cu")
            }
            Self::PackageInit => template!("__init__.template"),
        }
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Turn every line of `text` into a line comment starting with `prefix`.
fn comment_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                prefix.to_string()
            } else {
                format!("{prefix} {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Loaded templates plus configuration globals.
pub struct TemplateEnv {
    env: Environment<'static>,
    config: GeneratorConfig,
}

impl TemplateEnv {
    /// Load every template and bind `config` as globals.
    ///
    /// Undefined variables are errors, so a template that needs a binding
    /// the driver did not supply fails instead of rendering blanks.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::Template`] if a template fails to parse.
    pub fn new(config: &GeneratorConfig) -> Result<Self, CodegenError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        env.add_global("max_embedding_dim", Value::from(config.max_embedding_dim));
        env.add_global("dense", Value::from(config.dense));
        env.add_global("fbcode", Value::from(config.fbcode));
        env.add_filter("comment_lines", comment_lines);

        for (name, source) in PARTIALS {
            env.add_template(name, source)
                .map_err(|source| CodegenError::Template {
                    template: name.to_string(),
                    source,
                })?;
        }
        for id in TemplateId::ALL {
            env.add_template(id.name(), id.source())
                .map_err(|source| CodegenError::Template {
                    template: id.name().to_string(),
                    source,
                })?;
        }

        Ok(Self {
            env,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Render `id` with `bindings`. `subject` names the optimizer (or
    /// kernel family) in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`CodegenError::Render`] on a missing binding or any other
    /// template evaluation failure.
    pub fn render(&self, id: TemplateId, bindings: Value, subject: &str) -> Result<String, CodegenError> {
        let render_err = |source: minijinja::Error| CodegenError::Render {
            optimizer: subject.to_string(),
            template: id.name().to_string(),
            source,
        };
        let template = self.env.get_template(id.name()).map_err(render_err)?;
        let text = template.render(bindings).map_err(render_err)?;
        tracing::debug!(template = id.name(), subject, bytes = text.len(), "rendered template");
        Ok(text)
    }
}

impl std::fmt::Debug for TemplateEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEnv")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn all_templates_load() {
        TemplateEnv::new(&GeneratorConfig::default()).unwrap();
    }

    #[test]
    fn template_names_are_unique() {
        let mut names: Vec<&str> = TemplateId::ALL.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TemplateId::ALL.len());
    }

    #[test]
    fn missing_binding_is_an_error() {
        let env = TemplateEnv::new(&GeneratorConfig::default()).unwrap();
        let err = env
            .render(TemplateId::ForwardSplitCuda, context! {}, "forward")
            .unwrap_err();
        match err {
            CodegenError::Render { template, optimizer, .. } => {
                assert_eq!(template, "embedding_forward_split_template.cu");
                assert_eq!(optimizer, "forward");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn comment_lines_quotes_each_line() {
        assert_eq!(
            comment_lines("a(/*x=*/1);\n\n  b = \"\"\"\"\"\";\n", "//"),
            "// a(/*x=*/1);\n//\n//   b = \"\"\"\"\"\";"
        );
        assert_eq!(comment_lines("", "#"), "");
    }

    #[test]
    fn config_globals_are_bound() {
        let config = GeneratorConfig {
            max_embedding_dim: 512,
            ..GeneratorConfig::default()
        };
        let env = TemplateEnv::new(&config).unwrap();
        let text = env
            .render(
                TemplateId::ForwardSplitCuda,
                context! { weighted => false, dense => false },
                "forward",
            )
            .unwrap();
        assert!(text.contains("512"));
        assert_eq!(env.config().max_embedding_dim, 512);
    }
}
