use crate::error::CodegenError;
use crate::operand::{Operand, OperandList};
use crate::registry::{OptimizerEntry, Registry};

macro_rules! fragment {
    ($path:literal) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/fragments/", $path))
    };
}

const ROWWISE_ADAGRAD_PRECOMPUTE: &str = fragment!("rowwise_adagrad/precompute.cu");

/// Populate the registry with every built-in optimizer, in emission order.
///
/// # Errors
///
/// Propagates the first malformed entry; built-in entries are expected to
/// register cleanly.
pub fn builtin_registry() -> Result<Registry, CodegenError> {
    let mut r = Registry::new();
    r.register(adagrad()?)?;
    r.register(adam()?)?;
    r.register(approx_rowwise_adagrad()?)?;
    r.register(approx_sgd()?)?;
    r.register(dense()?)?;
    r.register(lamb()?)?;
    r.register(lars_sgd()?)?;
    r.register(partial_rowwise_adam()?)?;
    r.register(partial_rowwise_lamb()?)?;
    r.register(rowwise_adagrad()?)?;
    r.register(sgd()?)?;
    Ok(r)
}

/// `momentum1`, `eps`, `learning_rate`: the Adagrad family.
fn adagrad_operands() -> Result<OperandList, CodegenError> {
    OperandList::new(vec![
        Operand::array("momentum1"),
        Operand::float("eps"),
        Operand::float("learning_rate"),
    ])
}

/// Two moments plus Adam-style hyper-parameters and the step counter.
fn adam_operands() -> Result<OperandList, CodegenError> {
    OperandList::new(vec![
        Operand::array("momentum1"),
        Operand::array("momentum2"),
        Operand::float("learning_rate"),
        Operand::float("eps"),
        Operand::float("beta1"),
        Operand::float("beta2"),
        Operand::float("weight_decay"),
        Operand::int("iter"),
    ])
}

fn sgd_operands() -> Result<OperandList, CodegenError> {
    OperandList::new(vec![Operand::float("learning_rate")])
}

fn adagrad() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("adagrad", adagrad_operands()?)
        .with_update(fragment!("adagrad/update.cu"))
        .with_host_update(fragment!("adagrad/update_cpu.cpp")))
}

fn rowwise_adagrad() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("rowwise_adagrad", adagrad_operands()?)
        .with_precompute(ROWWISE_ADAGRAD_PRECOMPUTE)
        .with_update(fragment!("rowwise_adagrad/update.cu"))
        .with_host_update(fragment!("rowwise_adagrad/update_cpu.cpp")))
}

/// Host side runs the external JIT-compiled row-wise Adagrad kernel.
fn approx_rowwise_adagrad() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("approx_rowwise_adagrad", adagrad_operands()?)
        .with_precompute(ROWWISE_ADAGRAD_PRECOMPUTE)
        .with_update(fragment!("approx_rowwise_adagrad/update.cu")))
}

fn sgd() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("sgd", sgd_operands()?)
        .with_update(fragment!("sgd/update.cu"))
        .with_host_update(fragment!("sgd/update_cpu.cpp")))
}

fn approx_sgd() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("approx_sgd", sgd_operands()?)
        .with_update(fragment!("approx_sgd/update.cu"))
        .with_host_update(fragment!("approx_sgd/update_cpu.cpp")))
}

fn lamb() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("lamb", adam_operands()?)
        .with_precompute(fragment!("lamb/precompute.cu"))
        .with_update(fragment!("lamb/update.cu")))
}

fn partial_rowwise_lamb() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("partial_rowwise_lamb", adam_operands()?)
        .with_precompute(fragment!("partial_rowwise_lamb/precompute.cu"))
        .with_update(fragment!("partial_rowwise_lamb/update.cu")))
}

fn adam() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("adam", adam_operands()?).with_update(fragment!("adam/update.cu")))
}

fn partial_rowwise_adam() -> Result<OptimizerEntry, CodegenError> {
    Ok(OptimizerEntry::new("partial_rowwise_adam", adam_operands()?)
        .with_precompute(fragment!("partial_rowwise_adam/precompute.cu"))
        .with_update(fragment!("partial_rowwise_adam/update.cu")))
}

fn lars_sgd() -> Result<OptimizerEntry, CodegenError> {
    let operands = OperandList::new(vec![
        Operand::array("momentum1"),
        Operand::float("learning_rate"),
        Operand::float("eta"),
        Operand::float("momentum"),
        Operand::float("weight_decay"),
    ])?;
    Ok(OptimizerEntry::new("lars_sgd", operands)
        .with_precompute(fragment!("lars_sgd/precompute.cu"))
        .with_update(fragment!("lars_sgd/update.cu")))
}

/// Dense backward: numeric kernels only. The placeholder operand keeps the
/// generated signatures non-empty.
fn dense() -> Result<OptimizerEntry, CodegenError> {
    let operands = OperandList::new(vec![Operand::float("unused")])?;
    Ok(OptimizerEntry::new("dense", operands).density_variant())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::validate_registry;
    use crate::error::Severity;

    #[test]
    fn registers_all_builtins_in_order() {
        let r = builtin_registry().unwrap();
        assert_eq!(
            r.names(),
            [
                "adagrad",
                "adam",
                "approx_rowwise_adagrad",
                "approx_sgd",
                "dense",
                "lamb",
                "lars_sgd",
                "partial_rowwise_adam",
                "partial_rowwise_lamb",
                "rowwise_adagrad",
                "sgd"
            ]
        );
    }

    #[test]
    fn only_dense_is_a_density_variant() {
        let r = builtin_registry().unwrap();
        let dense: Vec<&str> = r
            .iter()
            .filter(|e| e.density_variant)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(dense, ["dense"]);
    }

    #[test]
    fn builtins_have_no_errors_or_warnings() {
        let r = builtin_registry().unwrap();
        let v = validate_registry(&r);
        assert!(v.iter().all(|v| v.severity == Severity::Info), "{v:?}");
    }

    #[test]
    fn deferred_host_updates() {
        let r = builtin_registry().unwrap();
        let deferred: Vec<&str> = r
            .iter()
            .filter(|e| !e.density_variant && !e.host_codegen)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(
            deferred,
            [
                "adam",
                "approx_rowwise_adagrad",
                "lamb",
                "lars_sgd",
                "partial_rowwise_adam",
                "partial_rowwise_lamb"
            ]
        );
    }

    #[test]
    fn rowwise_variants_share_precompute() {
        let r = builtin_registry().unwrap();
        let exact = r.get("rowwise_adagrad").unwrap();
        let approx = r.get("approx_rowwise_adagrad").unwrap();
        assert_eq!(exact.precompute, approx.precompute);
        assert_eq!(exact.operands, approx.operands);
        assert!(approx.update.contains("assert(false)"));
    }

    #[test]
    fn lamb_and_adam_share_shape() {
        let r = builtin_registry().unwrap();
        assert_eq!(r.get("lamb").unwrap().operands, r.get("adam").unwrap().operands);
        assert_eq!(r.get("adam").unwrap().operands.len(), 8);
    }
}
