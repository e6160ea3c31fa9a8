//! Source graph as handed over by the model parser.

pub mod edge;

use crate::core::op::Attributes;
use crate::core::types::{ConstantValue, ElementType, PartialShape};
use crate::error::{TranslateError, TranslateResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub use edge::{InputRef, OutputMode, OutputPlace};

fn one() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpDef {
    pub name: String,
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub inputs: Vec<InputRef>,
    #[serde(default = "one")]
    pub num_outputs: usize,
    #[serde(default)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPlace {
    pub name: String,
    #[serde(default)]
    pub shape: PartialShape,
    #[serde(default)]
    pub element_type: ElementType,
    /// Frozen value; such an input becomes a constant instead of a parameter.
    #[serde(default)]
    pub value: Option<ConstantValue>,
}

impl InputPlace {
    pub fn new(name: impl Into<String>, element_type: ElementType, shape: PartialShape) -> Self {
        Self { name: name.into(), shape, element_type, value: None }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceGraph {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub operations: Vec<OpDef>,
    #[serde(default)]
    pub inputs: Vec<InputPlace>,
    #[serde(default)]
    pub outputs: Vec<OutputPlace>,
    /// Requested order of the translated parameters, by name.
    #[serde(default)]
    pub input_names: Vec<String>,
    /// Requested order of the translated results, by name.
    #[serde(default)]
    pub output_names: Vec<String>,
    #[serde(default)]
    pub saved_model_inputs: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub saved_model_outputs: Option<BTreeMap<String, String>>,
    /// Body graphs referenced by operation type (loop and branch bodies).
    #[serde(default)]
    pub functions: BTreeMap<String, SourceGraph>,
}

impl SourceGraph {
    pub fn from_json(json: &str) -> TranslateResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> TranslateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn operation(&self, name: &str) -> Option<&OpDef> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn has_function(&self, identity: &str) -> bool {
        self.functions.contains_key(identity)
    }

    /// Fresh copy of a body graph, ready to be specialized.
    pub fn body_graph(&self, identity: &str) -> Option<SourceGraph> {
        self.functions.get(identity).map(|body| {
            let mut body = body.clone();
            body.name.get_or_insert_with(|| identity.to_string());
            body
        })
    }

    /// Input places the caller has to feed. Frozen places carry their own value.
    pub fn formal_inputs(&self) -> impl Iterator<Item = &InputPlace> + '_ {
        self.inputs.iter().filter(|place| place.value.is_none())
    }

    /// Pins the formal inputs to what the caller passes in. Only known facts are
    /// copied: a dynamic caller type or a shape of unknown rank leaves the input as is.
    pub fn specialize(&mut self, shapes: &[PartialShape], types: &[ElementType]) -> TranslateResult<()> {
        let expected = self.formal_inputs().count();
        if expected != shapes.len() || shapes.len() != types.len() {
            return Err(TranslateError::BodyArity {
                body: self.name.clone().unwrap_or_default(),
                expected,
                actual: shapes.len(),
            });
        }
        let formal = self.inputs.iter_mut().filter(|place| place.value.is_none());
        for ((place, shape), ty) in formal.zip(shapes).zip(types) {
            if ty.is_static() {
                place.element_type = *ty;
            }
            if shape.is_rank_static() {
                place.shape = shape.clone();
            }
        }
        Ok(())
    }
}
