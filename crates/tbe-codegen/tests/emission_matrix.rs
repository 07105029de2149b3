//! End-to-end emission of the optimizer artifact matrix to disk.

mod common;

use common::{config, listing, read, registry_of};
use tbe_codegen::generate::{ArtifactKind, GenerateOptions};
use tbe_codegen::manifest::MANIFEST_FILE;
use tbe_codegen::standalone::PACKAGE_INIT_FILE;
use tbe_codegen::{builtin_registry, generate_all, generate_with};

const KERNELS_ONLY: GenerateOptions = GenerateOptions {
    standalone: false,
    manifest: false,
};

#[test]
fn sgd_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_of(&["sgd"]);
    let report = generate_with(&registry, &config(), dir.path(), KERNELS_ONLY).unwrap();
    assert!(report.is_success());

    let files = listing(dir.path());
    let generated: Vec<&str> = files
        .iter()
        .map(String::as_str)
        .filter(|f| f.starts_with("gen_"))
        .collect();
    assert_eq!(
        generated,
        [
            "gen_embedding_backward_sgd_split_cpu.cpp",
            "gen_embedding_backward_sgd_split_unweighted_cuda.cu",
            "gen_embedding_backward_sgd_split_weighted_cuda.cu",
            "gen_embedding_backward_split_sgd.cpp",
            "gen_embedding_backward_split_sgd_cpu.cpp",
        ]
    );
    assert!(files.contains(&"lookup_sgd.py".to_string()));
    assert_eq!(files.len(), 6);

    let update = registry.get("sgd").unwrap().update.trim().to_string();
    for name in &files {
        let text = read(dir.path(), name);
        assert!(!text.is_empty(), "{name} is empty");
        assert!(text.contains(&update), "{name} lacks the update fragment");
    }
}

#[test]
fn every_builtin_emits_its_full_set() {
    let dir = tempfile::tempdir().unwrap();
    let registry = builtin_registry().unwrap();
    let report = generate_with(&registry, &config(), dir.path(), KERNELS_ONLY).unwrap();
    assert!(report.is_success(), "{:?}", report.failures());

    for outcome in &report.entries {
        let entry = registry.get(&outcome.name).unwrap();
        let files = &outcome.result.as_ref().unwrap().files;
        let expected = if entry.density_variant { 3 } else { 6 };
        assert_eq!(files.len(), expected, "{}", entry.name);
        for f in files {
            assert!(f.absolute_path.exists());
            assert!(f.bytes > 0);
        }
    }
    assert_eq!(listing(dir.path()).len(), 10 * 6 + 3);
}

#[test]
fn outcomes_follow_registration_order() {
    let dir = tempfile::tempdir().unwrap();
    let registry = builtin_registry().unwrap();
    let report = generate_with(&registry, &config(), dir.path(), KERNELS_ONLY).unwrap();
    let names: Vec<&str> = report.entries.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, registry.names());
}

#[test]
fn density_variant_has_no_binding_glue() {
    let dir = tempfile::tempdir().unwrap();
    let report = generate_with(&registry_of(&["dense"]), &config(), dir.path(), KERNELS_ONLY).unwrap();
    let files = &report.get("dense").unwrap().result.as_ref().unwrap().files;
    assert!(files.iter().all(|f| matches!(
        f.kind,
        ArtifactKind::AcceleratorKernel | ArtifactKind::HostKernel
    )));
    assert!(!dir.path().join("lookup_dense.py").exists());
}

#[test]
fn output_is_deterministic() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let registry = registry_of(&["adam", "rowwise_adagrad", "dense"]);
    generate_all(&registry, &config(), a.path()).unwrap();
    generate_all(&registry, &config(), b.path()).unwrap();
    let files = listing(a.path());
    assert_eq!(files, listing(b.path()));
    for name in &files {
        assert_eq!(read(a.path(), name), read(b.path(), name), "{name} differs");
    }
}

#[test]
fn regeneration_overwrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_of(&["sgd"]);
    std::fs::write(dir.path().join("lookup_sgd.py"), "stale").unwrap();
    generate_with(&registry, &config(), dir.path(), KERNELS_ONLY).unwrap();
    assert_ne!(read(dir.path(), "lookup_sgd.py"), "stale");
    assert!(listing(dir.path()).iter().all(|f| !f.ends_with(".tmp")));
}

#[test]
fn standalone_kernels_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let options = GenerateOptions {
        standalone: true,
        manifest: true,
    };
    let report = generate_with(&registry_of(&["lamb"]), &config(), dir.path(), options).unwrap();
    assert!(report.is_success());
    assert_eq!(report.shared.len(), 2);
    for name in [
        "gen_embedding_forward_split_unweighted_codegen_cuda.cu",
        "gen_embedding_forward_dense_weighted_codegen_cuda.cu",
        "gen_embedding_backward_split_indice_weights_codegen_cuda.cu",
        PACKAGE_INIT_FILE,
        MANIFEST_FILE,
    ] {
        assert!(dir.path().join(name).exists(), "missing {name}");
    }
    let manifest: serde_json::Value =
        serde_json::from_str(&read(dir.path(), MANIFEST_FILE)).unwrap();
    assert_eq!(manifest["optimizers"][0]["name"], "lamb");
    assert_eq!(manifest["optimizers"][0]["host_codegen"], false);
}

#[test]
fn package_init_matches_the_emitted_glue() {
    let dir = tempfile::tempdir().unwrap();
    let registry = registry_of(&["adagrad", "dense", "sgd"]);
    generate_all(&registry, &config(), dir.path()).unwrap();
    let init = read(dir.path(), PACKAGE_INIT_FILE);
    for name in ["adagrad", "sgd"] {
        assert!(dir.path().join(format!("lookup_{name}.py")).exists());
        assert!(init.contains(&format!("lookup_{name} as lookup_{name}")), "{name} not imported");
    }
    assert!(!init.contains("lookup_dense"));
}

#[test]
fn no_standalone_skips_package_init() {
    let dir = tempfile::tempdir().unwrap();
    generate_with(&registry_of(&["sgd"]), &config(), dir.path(), KERNELS_ONLY).unwrap();
    assert!(!dir.path().join(PACKAGE_INIT_FILE).exists());
}

#[test]
fn config_reaches_the_templates() {
    let dir = tempfile::tempdir().unwrap();
    let config = tbe_codegen::parse_config_str("max_embedding_dim: 128\nfbcode: false\n").unwrap();
    generate_all(&registry_of(&["adagrad"]), &config, dir.path()).unwrap();
    let kernel = read(dir.path(), "gen_embedding_backward_adagrad_split_weighted_cuda.cu");
    assert!(kernel.contains("kMaxEmbeddingDim = 128;"));
    let glue = read(dir.path(), "lookup_adagrad.py");
    assert!(glue.contains("from fbgemm_gpu.split_embedding_configs"));
    assert!(!glue.contains("deeplearning.fbgemm"));
}
