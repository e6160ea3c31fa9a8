//! Translation driver.
//!
//! A [`TranslateSession`] walks a source graph once, in source order:
//!
//! ```text
//! PENDING -> INPUTS_RESOLVED -> TRANSLATED | CACHED_INJECTED | PASSTHROUGH -> REGISTERED
//! ```
//!
//! Structural problems (an input that cannot be found, a body with the wrong
//! number of arguments, a bad ordering request) abort the pass. A translator
//! that fails only degrades its own operation to a framework node, so one pass
//! reports every unsupported operation at once.

pub mod assemble;
pub mod cache;
pub mod inject;
pub mod op_map;

use crate::config::SessionConfig;
use crate::core::op::FrameworkOp;
use crate::error::{TranslateError, TranslateResult};
use crate::ir::{IrGraph, IrModel, Output};
use crate::source::{InputRef, OpDef, SourceGraph};
use crate::translator::{NamedOutput, NodeContext, TranslatorRegistry, named_from_indexed};
use cache::{BodySignature, SubgraphCache};
use op_map::{OpMap, resolve_flat_index};
use petgraph::graph::NodeIndex;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

// Translated without inputs: the parser already cut the back-edge of a
// NextIteration, and a constant carries its value in attributes.
const NEXT_ITERATION: &str = "NextIteration";
const CONST: &str = "Const";

pub struct TranslateSession<'m> {
    model: &'m SourceGraph,
    registry: &'m TranslatorRegistry,
    config: SessionConfig,
    cache: SubgraphCache,
    converted: Option<IrModel>,
}

impl<'m> TranslateSession<'m> {
    pub fn new(model: &'m SourceGraph, registry: &'m TranslatorRegistry, config: SessionConfig) -> Self {
        Self { model, registry, config, cache: SubgraphCache::new(), converted: None }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cache(&self) -> &SubgraphCache {
        &self.cache
    }

    /// Translates the top-level graph on first call and returns the stored result afterwards.
    pub fn converted_model(&mut self) -> TranslateResult<&IrModel> {
        let model = match self.converted.take() {
            Some(model) => model,
            None => self.translate_top_level()?,
        };
        Ok(self.converted.insert(model))
    }

    pub fn into_converted_model(mut self) -> TranslateResult<IrModel> {
        match self.converted.take() {
            Some(model) => Ok(model),
            None => self.translate_top_level(),
        }
    }

    fn translate_top_level(&mut self) -> TranslateResult<IrModel> {
        let model = self.model;
        let name = self.config.model_name.clone();
        self.translate_graph(model, &name)
    }

    /// One translation pass over `source`. Re-entered for every body graph that misses the cache.
    pub fn translate_graph(&mut self, source: &SourceGraph, model_name: &str) -> TranslateResult<IrModel> {
        let mut graph = IrGraph::new();
        let mut op_map = OpMap::new();
        let mut parameters: Vec<NodeIndex> = Vec::new();
        let mut results: Vec<NodeIndex> = Vec::new();

        for place in &source.inputs {
            if let Some(value) = &place.value {
                let constant = graph.add_constant(value.clone());
                graph.set_node_name(&place.name, constant.node);
                op_map.insert(&place.name, vec![NamedOutput::indexed(constant)])?;
            }
        }
        for place in source.inputs.iter().filter(|p| p.value.is_none()) {
            if op_map.contains(&place.name) {
                continue;
            }
            let element_type = if place.element_type.is_static() {
                place.element_type
            } else {
                self.config.default_input_type
            };
            let param = graph.add_parameter(element_type, place.shape.clone());
            graph.set_node_name(&place.name, param.node);
            parameters.push(param.node);
            op_map.insert(&place.name, vec![NamedOutput::indexed(param)])?;
        }

        for op in &source.operations {
            if op_map.contains(&op.name) {
                continue;
            }
            let inputs = resolve_inputs(op, &mut op_map, &mut graph)?;
            let outputs = self.dispatch(source, op, &inputs, &mut graph)?;

            let mut registered = Vec::with_capacity(outputs.len());
            for output in outputs {
                let node = output.port.node;
                let ir_op = &graph.node(node).op;
                if ir_op.is_result() {
                    if !results.contains(&node) {
                        results.push(node);
                    }
                    continue;
                }
                if ir_op.is_parameter() && !parameters.contains(&node) {
                    parameters.push(node);
                }
                registered.push(output);
            }
            if !registered.is_empty() {
                op_map.insert(&op.name, registered)?;
            }
        }

        if results.is_empty() {
            results = assemble::declared_results(source, &op_map, &mut graph)?;
        }
        if results.is_empty() {
            results = assemble::terminal_results(&op_map, &mut graph);
        }

        if let Some(registry) = source.saved_model_inputs.as_ref().filter(|r| !r.is_empty()) {
            let restored = assemble::restore_parameter_names(&mut graph, &parameters, registry);
            debug!(restored, total = parameters.len(), "restored parameter names");
        }
        if let Some(registry) = source.saved_model_outputs.as_ref().filter(|r| !r.is_empty()) {
            let restored = assemble::restore_result_names(&mut graph, &results, registry);
            debug!(restored, total = results.len(), "restored result names");
        }

        let friendly = |idx: &NodeIndex| graph.node(*idx).friendly_name.clone();
        let parameters = assemble::reorder_by_names("parameters", &source.input_names, parameters, friendly)?;
        let results = assemble::reorder_by_names("results", &source.output_names, results, friendly)?;

        let model = IrModel { name: model_name.to_string(), graph, parameters, results };
        info!(
            model = %model.name,
            nodes = model.graph.node_count(),
            parameters = model.parameters.len(),
            results = model.results.len(),
            framework_nodes = model.passthrough_nodes().len(),
            "translated graph"
        );
        Ok(model)
    }

    fn dispatch(
        &mut self,
        source: &SourceGraph,
        op: &OpDef,
        inputs: &[Output],
        graph: &mut IrGraph,
    ) -> TranslateResult<Vec<NamedOutput>> {
        let registry = self.registry;
        if let Some(translator) = registry.get(&op.op_type) {
            let checkpoint = graph.checkpoint();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut ctx = NodeContext::new(op, inputs, graph, self);
                translator(&mut ctx)
            }));
            let failure = match outcome {
                Ok(Ok(outputs)) => match outputs.iter().find(|o| !graph.has_output(o.port)) {
                    None => {
                        debug!(operation = %op.name, op_type = %op.op_type, "translated");
                        return Ok(outputs);
                    }
                    Some(bad) => format!(
                        "translator returned port {} of node {}, which does not exist",
                        bad.port.port,
                        bad.port.node.index()
                    ),
                },
                Ok(Err(err)) => format!("{:#}", err),
                Err(payload) => panic_message(payload),
            };
            graph.rollback(checkpoint);
            warn!(operation = %op.name, op_type = %op.op_type, "translation failed: {}", failure);
            return Ok(passthrough(graph, op, inputs, Some(failure)));
        }

        if let Some(body) = self.body_model(&op.op_type, inputs, graph)? {
            let outputs = inject::inject_body(graph, body, &op.op_type, inputs)?;
            for (idx, &output) in outputs.iter().enumerate() {
                graph.tensor_mut(output).names = BTreeSet::from([format!("{}:{}", op.name, idx)]);
            }
            debug!(operation = %op.name, body = %op.op_type, "injected body graph");
            return Ok(named_from_indexed(outputs));
        }

        debug!(
            operation = %op.name,
            op_type = %op.op_type,
            graph = source.name.as_deref().unwrap_or(""),
            "no translator, keeping a framework node"
        );
        Ok(passthrough(graph, op, inputs, None))
    }

    /// Translated body graph for `identity`, specialized for the shapes and types of `inputs`.
    /// `None` when the model has no such body.
    pub fn body_model(
        &mut self,
        identity: &str,
        inputs: &[Output],
        graph: &IrGraph,
    ) -> TranslateResult<Option<IrModel>> {
        if !self.model.has_function(identity) {
            return Ok(None);
        }
        let signature = BodySignature::new(identity, inputs, graph);
        if let Some(body) = self.cache.get(&signature) {
            debug!(body = identity, "body graph cache hit");
            return Ok(Some(body));
        }
        let Some(mut body_source) = self.model.body_graph(identity) else {
            return Ok(None);
        };
        body_source.specialize(&signature.shapes, &signature.types)?;

        debug!(body = identity, "body graph cache miss, translating");
        let mut body = self.translate_graph(&body_source, identity)?;
        if self.config.clear_body_names {
            body.graph.clear_tensor_names();
        }
        self.cache.insert(signature, body.clone());
        Ok(Some(body))
    }
}

fn resolve_inputs(op: &OpDef, op_map: &mut OpMap, graph: &mut IrGraph) -> TranslateResult<Vec<Output>> {
    if op.op_type == CONST || op.op_type == NEXT_ITERATION {
        return Ok(Vec::new());
    }
    let mut inputs = Vec::with_capacity(op.inputs.len());
    for (idx, edge) in op.inputs.iter().enumerate() {
        if let Some(input) = resolve_input(op, idx, edge, op_map, graph)? {
            inputs.push(input);
        }
    }
    Ok(inputs)
}

fn resolve_input(
    op: &OpDef,
    idx: usize,
    edge: &InputRef,
    op_map: &mut OpMap,
    graph: &mut IrGraph,
) -> TranslateResult<Option<Output>> {
    let error = |port: usize, detail: String| TranslateError::InputResolution {
        operation: op.name.clone(),
        input: idx,
        producer: edge.producer.clone(),
        port,
        detail,
    };
    let single = |outputs: &[NamedOutput], port: usize| match outputs {
        [only] => Ok(only.port),
        _ => Err(error(port, "input created with pruning must have one output".into())),
    };

    // Edge cut by the parser, fed by a parameter named after the consumer slot.
    if let Some(outputs) = op_map.get(&format!("{}:{}", idx, op.name)) {
        return single(outputs, edge.index).map(Some);
    }
    if edge.control {
        return Ok(None);
    }

    let port = match &edge.group {
        Some(group) => {
            let recorded = op_map.get(&edge.producer).unwrap_or(&[]);
            resolve_flat_index(recorded, group, edge.index).map_err(|e| error(edge.index, e.to_string()))?
        }
        None => edge.index,
    };
    if let Some(outputs) = op_map.get(&format!("{}:{}", edge.producer, port)) {
        return single(outputs, port).map(Some);
    }

    let Some(recorded) = op_map.get(&edge.producer) else {
        return Err(error(port, "no input is found".into()));
    };
    if recorded.len() <= port {
        if let Some(first) = recorded.first() {
            let producer = first.port.node;
            // A framework node learns its real arity from its consumers.
            if graph.node(producer).op.as_framework().is_some() {
                graph.grow_outputs(producer, port + 1);
                op_map.refresh(&edge.producer, named_from_indexed(graph.outputs(producer)));
            }
        }
    }
    op_map
        .get(&edge.producer)
        .and_then(|outputs| outputs.get(port))
        .map(|o| Some(o.port))
        .ok_or_else(|| error(port, "output port is out of range".into()))
}

fn passthrough(graph: &mut IrGraph, op: &OpDef, inputs: &[Output], failure: Option<String>) -> Vec<NamedOutput> {
    let fw = FrameworkOp { op_type: op.op_type.clone(), attrs: op.attrs.clone(), failed_conversion: failure };
    let idx = graph.add_framework("", fw, inputs, op.num_outputs);
    graph.set_node_name(&op.name, idx);
    named_from_indexed(graph.outputs(idx))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown exception type".to_string()
    }
}
