//! Translator registry and the context handed to each translator.

use crate::core::op::{Attributes, IrOp};
use crate::error::TranslateResult;
use crate::ir::{IrGraph, IrModel, Output, TensorInfo};
use crate::session::TranslateSession;
use crate::source::OpDef;
use anyhow::Context;
use petgraph::graph::NodeIndex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An output port as seen by consumers, optionally tagged with the name of
/// the output group it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOutput {
    pub name: Option<String>,
    pub port: Output,
}

impl NamedOutput {
    pub fn indexed(port: Output) -> Self {
        Self { name: None, port }
    }

    pub fn named(name: impl Into<String>, port: Output) -> Self {
        Self { name: Some(name.into()), port }
    }
}

pub fn named_from_indexed(outputs: impl IntoIterator<Item = Output>) -> Vec<NamedOutput> {
    outputs.into_iter().map(NamedOutput::indexed).collect()
}

pub type TranslatorFn =
    Arc<dyn Fn(&mut NodeContext<'_, '_>) -> anyhow::Result<Vec<NamedOutput>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct TranslatorRegistry {
    translators: HashMap<String, TranslatorFn>,
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, op_type: impl Into<String>, translator: F)
    where
        F: Fn(&mut NodeContext<'_, '_>) -> anyhow::Result<Vec<NamedOutput>> + Send + Sync + 'static,
    {
        self.translators.insert(op_type.into(), Arc::new(translator));
    }

    pub fn with<F>(mut self, op_type: impl Into<String>, translator: F) -> Self
    where
        F: Fn(&mut NodeContext<'_, '_>) -> anyhow::Result<Vec<NamedOutput>> + Send + Sync + 'static,
    {
        self.register(op_type, translator);
        self
    }

    pub fn get(&self, op_type: &str) -> Option<&TranslatorFn> {
        self.translators.get(op_type)
    }

    pub fn contains(&self, op_type: &str) -> bool {
        self.translators.contains_key(op_type)
    }

    pub fn len(&self) -> usize {
        self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translators.is_empty()
    }
}

impl fmt::Debug for TranslatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut op_types: Vec<_> = self.translators.keys().collect();
        op_types.sort();
        f.debug_struct("TranslatorRegistry").field("op_types", &op_types).finish()
    }
}

/// Everything a translator may look at or touch while converting one operation.
pub struct NodeContext<'a, 'm> {
    op: &'a OpDef,
    inputs: &'a [Output],
    graph: &'a mut IrGraph,
    session: &'a mut TranslateSession<'m>,
}

impl<'a, 'm> NodeContext<'a, 'm> {
    pub(crate) fn new(
        op: &'a OpDef,
        inputs: &'a [Output],
        graph: &'a mut IrGraph,
        session: &'a mut TranslateSession<'m>,
    ) -> Self {
        Self { op, inputs, graph, session }
    }

    pub fn name(&self) -> &str {
        &self.op.name
    }

    pub fn op_type(&self) -> &str {
        &self.op.op_type
    }

    pub fn input_size(&self) -> usize {
        self.inputs.len()
    }

    pub fn inputs(&self) -> &[Output] {
        self.inputs
    }

    pub fn input(&self, index: usize) -> anyhow::Result<Output> {
        self.inputs.get(index).copied().ok_or_else(|| {
            anyhow::anyhow!("{} '{}' has no input {}", self.op.op_type, self.op.name, index)
        })
    }

    pub fn attr<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<T> {
        let value = self
            .op
            .attrs
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("attribute '{}' is missing on '{}'", key, self.op.name))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("attribute '{}' of '{}' has unexpected type", key, self.op.name))
    }

    pub fn attr_or<T: DeserializeOwned>(&self, key: &str, default: T) -> anyhow::Result<T> {
        if self.op.attrs.contains_key(key) {
            self.attr(key)
        } else {
            Ok(default)
        }
    }

    pub fn graph(&mut self) -> &mut IrGraph {
        self.graph
    }

    pub fn tensor(&self, output: Output) -> &TensorInfo {
        self.graph.tensor(output)
    }

    /// Adds a target operation and names it after the source operation.
    pub fn add_op(
        &mut self,
        op_type: &str,
        attrs: Attributes,
        inputs: &[Output],
        outputs: Vec<TensorInfo>,
    ) -> NodeIndex {
        let op = IrOp::Op { op_type: op_type.to_string(), attrs };
        let idx = self.graph.add_node("", op, inputs, outputs);
        self.graph.set_node_name(&self.op.name, idx);
        idx
    }

    /// Translated and specialized body graph for `identity`, for translators of
    /// control-flow operations that embed bodies themselves.
    pub fn body_model(&mut self, identity: &str, inputs: &[Output]) -> TranslateResult<Option<IrModel>> {
        self.session.body_model(identity, inputs, &*self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(ctx: &mut NodeContext<'_, '_>) -> anyhow::Result<Vec<NamedOutput>> {
        Ok(vec![NamedOutput::indexed(ctx.input(0)?)])
    }

    #[test]
    fn registry_lists_op_types() {
        let mut registry = TranslatorRegistry::new();
        assert!(registry.is_empty());
        registry.register("Identity", identity);
        let registry = registry.with("StopGradient", identity).with("Identity", identity);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("StopGradient"));
        assert!(!registry.contains("Relu"));
        assert!(registry.get("Identity").is_some());
        assert_eq!(format!("{:?}", registry), r#"TranslatorRegistry { op_types: ["Identity", "StopGradient"] }"#);
    }
}
