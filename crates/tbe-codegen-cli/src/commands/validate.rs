use tbe_codegen::builtin_registry;
use tbe_codegen::error::Severity;
use tbe_codegen::registry::validate_registry;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = builtin_registry()?;
    let violations = validate_registry(&registry);

    let errors = violations
        .iter()
        .filter(|v| v.severity == Severity::Error)
        .count();
    let warnings = violations
        .iter()
        .filter(|v| v.severity == Severity::Warning)
        .count();

    for v in &violations {
        println!("{v}");
    }

    println!(
        "\n{} optimizer(s), {errors} error(s), {warnings} warning(s)",
        registry.len()
    );

    if errors == 0 {
        println!("Registry is valid.");
        Ok(())
    } else {
        Err(format!("Registry has {errors} validation error(s)").into())
    }
}
