use std::path::Path;

use tbe_codegen::generate::{GenerateOptions, generate_with};
use tbe_codegen::{GeneratorConfig, builtin_registry, parse_config};

pub struct GenerateArgs<'a> {
    pub output_dir: &'a Path,
    pub config: Option<&'a Path>,
    pub optimizers: &'a [String],
    pub manifest: bool,
    pub standalone: bool,
}

pub fn run(args: &GenerateArgs<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match args.config {
        Some(path) => parse_config(path)?,
        None => GeneratorConfig::default(),
    };
    let mut registry = builtin_registry()?;
    if !args.optimizers.is_empty() {
        registry = registry.select(args.optimizers)?;
    }
    tracing::debug!(
        optimizers = registry.len(),
        max_embedding_dim = config.max_embedding_dim,
        "generating"
    );

    let options = GenerateOptions {
        standalone: args.standalone,
        manifest: args.manifest,
    };
    let report = generate_with(&registry, &config, args.output_dir, options)?;

    for outcome in report.entries.iter().chain(report.shared.iter()) {
        match &outcome.result {
            Ok(generated) => {
                println!("{} ({} files)", outcome.name, generated.files.len());
                for f in &generated.files {
                    println!(
                        "  {} ({}, {} bytes)",
                        f.relative_path.display(),
                        f.kind,
                        f.bytes
                    );
                }
            }
            Err(e) => println!("{} FAILED: {e}", outcome.name),
        }
    }

    let failures = report.failures();
    println!(
        "\nGenerated {} files in {}",
        report.files().len(),
        args.output_dir.display()
    );
    if failures.is_empty() {
        Ok(())
    } else {
        let names: Vec<&str> = failures.iter().map(|o| o.name.as_str()).collect();
        Err(format!("{} entry(ies) failed: {}", failures.len(), names.join(", ")).into())
    }
}
