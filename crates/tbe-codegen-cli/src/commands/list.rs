use tbe_codegen::builtin_registry;

use super::OutputFormat;

pub fn run(format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let registry = builtin_registry()?;

    match format {
        OutputFormat::Text => {
            for entry in &registry {
                let operands: Vec<String> = entry
                    .operands
                    .iter()
                    .map(|op| format!("{} {}", op.kind, op.name))
                    .collect();
                let mut flags = Vec::new();
                if entry.density_variant {
                    flags.push("density");
                } else if !entry.host_codegen {
                    flags.push("host-deferred");
                }
                if entry.is_approximate() {
                    flags.push("approx");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!("  [{}]", flags.join(", "))
                };
                println!("{:<24} ({}){flags}", entry.name, operands.join(", "));
            }
            println!("\n{} optimizer(s)", registry.len());
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = registry
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "name": entry.name,
                        "operands": entry.operands,
                        "density_variant": entry.density_variant,
                        "host_codegen": entry.host_codegen,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
