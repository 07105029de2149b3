use tbe_codegen::{Backend, SignatureBundle, builtin_registry, lower, synthesize};

use super::OutputFormat;

pub fn run(optimizer: &str, backend: Backend, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let registry = builtin_registry()?;
    let entry = registry
        .get(optimizer)
        .ok_or_else(|| format!("unknown optimizer '{optimizer}'"))?;
    let lowered = lower(&entry.operands, backend)?;
    let bundle = synthesize(&lowered, &entry.operands);

    match format {
        OutputFormat::Text => print_text(optimizer, &bundle),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bundle)?),
    }
    Ok(())
}

fn print_text(optimizer: &str, bundle: &SignatureBundle) {
    println!("{optimizer} on {} ({} lowered operands)", bundle.backend, bundle.arity());
    section("kernel parameters", &bundle.kernel_params);
    section("call-site constructors", &bundle.call_site_ctors);
    let accessors: Vec<String> = bundle
        .host_accessors
        .iter()
        .filter(|a| !a.is_empty())
        .cloned()
        .collect();
    section("host accessors", &accessors);
    section("outer signature", &bundle.outer_params);
    section("schema", &bundle.schema_params);
    section("saved tensors", &bundle.saved_tensors);
    section("dispatch arguments", &bundle.invoker_args);
    section("persisted arrays", &bundle.persisted_arrays);
    let boxed: Vec<String> = bundle
        .boxed_scalars
        .iter()
        .map(|s| format!("{}.{}()", s.name, s.extractor))
        .collect();
    section("boxed scalars", &boxed);
}

fn section(title: &str, items: &[String]) {
    println!("\n{title}:");
    if items.is_empty() {
        println!("  (none)");
    }
    for item in items {
        println!("  {item}");
    }
}
