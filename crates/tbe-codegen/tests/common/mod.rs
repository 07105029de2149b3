//! Shared helpers for the emission integration tests.

use std::path::Path;

use tbe_codegen::{GeneratorConfig, Registry, builtin_registry};

pub fn registry_of(names: &[&str]) -> Registry {
    let names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();
    builtin_registry()
        .expect("built-in registry")
        .select(&names)
        .expect("known optimizers")
}

pub fn config() -> GeneratorConfig {
    GeneratorConfig::default()
}

/// Sorted file names directly under `dir`.
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("Cannot read {}: {e}", dir.display()))
        .filter_map(|entry| Some(entry.ok()?.file_name().to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

pub fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name))
        .unwrap_or_else(|e| panic!("Cannot read {name}: {e}"))
}
