use crate::core::types::ConstantValue;
use serde_json::Value;
use std::collections::BTreeMap;

pub type Attributes = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum IrOp {
    Parameter,
    Constant(ConstantValue),
    Result,
    /// Operation of the target vocabulary, as produced by a translator.
    Op { op_type: String, attrs: Attributes },
    /// Stand-in for a source operation that could not be translated.
    Framework(FrameworkOp),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameworkOp {
    pub op_type: String,
    pub attrs: Attributes,
    /// Root cause of a failed translation. `None` for operations nobody knows how to translate.
    pub failed_conversion: Option<String>,
}

impl IrOp {
    pub fn op(op_type: impl Into<String>) -> Self {
        IrOp::Op { op_type: op_type.into(), attrs: Attributes::new() }
    }

    pub fn type_name(&self) -> &str {
        match self {
            IrOp::Parameter => "Parameter",
            IrOp::Constant(_) => "Constant",
            IrOp::Result => "Result",
            IrOp::Op { op_type, .. } => op_type,
            IrOp::Framework(_) => "FrameworkNode",
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, IrOp::Parameter)
    }

    pub fn is_result(&self) -> bool {
        matches!(self, IrOp::Result)
    }

    pub fn as_framework(&self) -> Option<&FrameworkOp> {
        match self {
            IrOp::Framework(fw) => Some(fw),
            _ => None,
        }
    }
}
