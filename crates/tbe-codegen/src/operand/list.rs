use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::kind::OperandKind;
use crate::error::CodegenError;

/// A named optimizer parameter tagged with its abstract kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    pub name: String,
}

impl Operand {
    pub fn new(kind: OperandKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(OperandKind::Array, name)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(OperandKind::ScalarInt, name)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(OperandKind::ScalarFloat, name)
    }
}

/// Backend-agnostic, ordered operand list of one optimizer.
///
/// Order determines positional binding at every call site. Names are
/// unique and only `Array`, `ScalarInt` and `ScalarFloat` may appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OperandList(Vec<Operand>);

impl OperandList {
    /// # Errors
    ///
    /// Returns [`CodegenError::DuplicateOperand`] when two operands share a
    /// name, or [`CodegenError::LoweredKind`] when an index kind is declared.
    pub fn new(operands: Vec<Operand>) -> Result<Self, CodegenError> {
        let mut seen = HashSet::new();
        for op in &operands {
            if op.kind.is_lowered_only() {
                return Err(CodegenError::LoweredKind {
                    operand: op.name.clone(),
                    kind: op.kind.to_string(),
                });
            }
            if !seen.insert(op.name.as_str()) {
                return Err(CodegenError::DuplicateOperand {
                    name: op.name.clone(),
                });
            }
        }
        Ok(Self(operands))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operand> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Operand] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the `Array` operands, in declaration order.
    pub fn array_names(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|op| op.kind == OperandKind::Array)
            .map(|op| op.name.as_str())
            .collect()
    }
}

impl<'a> IntoIterator for &'a OperandList {
    type Item = &'a Operand;
    type IntoIter = std::slice::Iter<'a, Operand>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for OperandList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let operands = Vec::<Operand>::deserialize(deserializer)?;
        Self::new(operands).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_declaration_order() {
        let list = OperandList::new(vec![
            Operand::array("momentum1"),
            Operand::float("eps"),
            Operand::float("learning_rate"),
        ])
        .unwrap();
        let names: Vec<&str> = list.iter().map(|op| op.name.as_str()).collect();
        assert_eq!(names, ["momentum1", "eps", "learning_rate"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = OperandList::new(vec![Operand::array("m"), Operand::float("m")]).unwrap_err();
        assert!(matches!(err, CodegenError::DuplicateOperand { ref name } if name == "m"));
    }

    #[test]
    fn rejects_index_kinds_before_lowering() {
        let err = OperandList::new(vec![Operand::new(OperandKind::IndexArray, "p")]).unwrap_err();
        assert!(matches!(err, CodegenError::LoweredKind { .. }));
        let err =
            OperandList::new(vec![Operand::new(OperandKind::WideIndexArray, "o")]).unwrap_err();
        assert!(matches!(err, CodegenError::LoweredKind { .. }));
    }

    #[test]
    fn array_names_skip_scalars() {
        let list = OperandList::new(vec![
            Operand::array("momentum1"),
            Operand::array("momentum2"),
            Operand::float("learning_rate"),
            Operand::int("iter"),
        ])
        .unwrap();
        assert_eq!(list.array_names(), ["momentum1", "momentum2"]);
    }

    #[test]
    fn empty_list_is_valid() {
        let list = OperandList::new(Vec::new()).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn deserializes_with_validation() {
        let ok: OperandList = serde_json::from_str(
            r#"[{"kind":"array","name":"m"},{"kind":"scalar_float","name":"lr"}]"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 2);

        let dup = serde_json::from_str::<OperandList>(
            r#"[{"kind":"array","name":"m"},{"kind":"scalar_int","name":"m"}]"#,
        );
        assert!(dup.is_err());
    }
}
