//! IR graph produced by a translation pass.
//!
//! Nodes live in a `petgraph` arena. An edge carries the producer output
//! port and the consumer input slot, so a node's input list is its incoming
//! edges ordered by `dst_port`.

use crate::core::op::{FrameworkOp, IrOp};
use crate::core::types::{ConstantValue, ElementType, PartialShape};
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Handle to one output port of an IR node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Output {
    pub node: NodeIndex,
    pub port: usize,
}

impl Output {
    pub fn new(node: NodeIndex, port: usize) -> Self {
        Self { node, port }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TensorInfo {
    pub element_type: ElementType,
    pub shape: PartialShape,
    pub names: BTreeSet<String>,
}

impl TensorInfo {
    pub fn new(element_type: ElementType, shape: PartialShape) -> Self {
        Self { element_type, shape, names: BTreeSet::new() }
    }

    pub fn dynamic() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrNode {
    pub friendly_name: String,
    pub op: IrOp,
    pub outputs: Vec<TensorInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrEdge {
    pub src_port: usize,
    pub dst_port: usize,
}

/// Number of nodes at some earlier point; see [`IrGraph::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

#[derive(Debug, Clone, Default)]
pub struct IrGraph {
    graph: DiGraph<IrNode, IrEdge>,
}

impl IrGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op: IrOp,
        inputs: &[Output],
        outputs: Vec<TensorInfo>,
    ) -> NodeIndex {
        let idx = self.graph.add_node(IrNode { friendly_name: name.into(), op, outputs });
        for (dst_port, input) in inputs.iter().enumerate() {
            self.graph.add_edge(input.node, idx, IrEdge { src_port: input.port, dst_port });
        }
        idx
    }

    pub fn add_parameter(&mut self, element_type: ElementType, shape: PartialShape) -> Output {
        let idx = self.add_node("", IrOp::Parameter, &[], vec![TensorInfo::new(element_type, shape)]);
        Output::new(idx, 0)
    }

    pub fn add_constant(&mut self, value: ConstantValue) -> Output {
        let info = TensorInfo::new(value.element_type, value.shape());
        let idx = self.add_node("", IrOp::Constant(value), &[], vec![info]);
        Output::new(idx, 0)
    }

    pub fn add_result(&mut self, value: Output, name: impl Into<String>) -> NodeIndex {
        let source = self.tensor(value);
        let info = TensorInfo::new(source.element_type, source.shape.clone());
        self.add_node(name, IrOp::Result, &[value], vec![info])
    }

    /// Adds a framework node with `num_outputs` outputs of unknown type and shape.
    pub fn add_framework(
        &mut self,
        name: impl Into<String>,
        op: FrameworkOp,
        inputs: &[Output],
        num_outputs: usize,
    ) -> NodeIndex {
        let outputs = vec![TensorInfo::dynamic(); num_outputs];
        self.add_node(name, IrOp::Framework(op), inputs, outputs)
    }

    pub fn node(&self, idx: NodeIndex) -> &IrNode {
        &self.graph[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut IrNode {
        &mut self.graph[idx]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Whether `output` names an existing port of an existing node.
    pub fn has_output(&self, output: Output) -> bool {
        self.graph.node_weight(output.node).is_some_and(|node| output.port < node.outputs.len())
    }

    pub fn tensor(&self, output: Output) -> &TensorInfo {
        &self.graph[output.node].outputs[output.port]
    }

    pub fn tensor_mut(&mut self, output: Output) -> &mut TensorInfo {
        &mut self.graph[output.node].outputs[output.port]
    }

    pub fn outputs(&self, idx: NodeIndex) -> Vec<Output> {
        (0..self.graph[idx].outputs.len()).map(|port| Output::new(idx, port)).collect()
    }

    pub fn inputs(&self, idx: NodeIndex) -> Vec<Output> {
        let mut incoming: Vec<_> = self.graph.edges_directed(idx, Direction::Incoming).collect();
        incoming.sort_by_key(|e| e.weight().dst_port);
        incoming
            .into_iter()
            .map(|e| Output::new(e.source(), e.weight().src_port))
            .collect()
    }

    /// Value feeding input slot 0, which is what a `Result` node exposes.
    pub fn input_value(&self, idx: NodeIndex) -> Option<Output> {
        self.inputs(idx).into_iter().next()
    }

    pub fn consumer_count(&self, output: Output) -> usize {
        self.graph
            .edges_directed(output.node, Direction::Outgoing)
            .filter(|e| e.weight().src_port == output.port)
            .count()
    }

    /// Extends the output list of a node to at least `len` ports. Outputs are never removed,
    /// since consumers may already hold a handle to any of them.
    pub fn grow_outputs(&mut self, idx: NodeIndex, len: usize) {
        let outputs = &mut self.graph[idx].outputs;
        if outputs.len() < len {
            outputs.resize(len, TensorInfo::dynamic());
        }
    }

    /// Names a node and its output tensors: `name:<port>` for every output,
    /// plus the bare `name` when there is a single output.
    pub fn set_node_name(&mut self, name: &str, idx: NodeIndex) {
        let node = &mut self.graph[idx];
        node.friendly_name = name.to_string();
        if node.outputs.len() == 1 {
            node.outputs[0].names.insert(name.to_string());
        }
        for (port, tensor) in node.outputs.iter_mut().enumerate() {
            tensor.names.insert(format!("{}:{}", name, port));
        }
    }

    pub fn clear_tensor_names(&mut self) {
        for node in self.graph.node_weights_mut() {
            for tensor in &mut node.outputs {
                tensor.names.clear();
            }
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.graph.node_count())
    }

    /// Drops every node added after `checkpoint`, newest first, so that the
    /// indices of older nodes stay untouched.
    ///
    /// Only additions are undone. Edits made to older nodes in the meantime
    /// (grown output lists, tensor names, element types) are kept.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        while self.graph.node_count() > checkpoint.0 {
            let last = NodeIndex::new(self.graph.node_count() - 1);
            self.graph.remove_node(last);
        }
    }

    pub fn toposort(&self) -> Option<Vec<NodeIndex>> {
        toposort(&self.graph, None).ok()
    }
}

/// A fully assembled graph: the node arena plus its ordered interface.
#[derive(Debug, Clone)]
pub struct IrModel {
    pub name: String,
    pub graph: IrGraph,
    pub parameters: Vec<NodeIndex>,
    pub results: Vec<NodeIndex>,
}

impl IrModel {
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|&p| self.graph.node(p).friendly_name.as_str()).collect()
    }

    pub fn result_names(&self) -> Vec<&str> {
        self.results.iter().map(|&r| self.graph.node(r).friendly_name.as_str()).collect()
    }

    pub fn parameter_tensor(&self, index: usize) -> Option<&TensorInfo> {
        self.parameters.get(index).map(|&p| self.graph.tensor(Output::new(p, 0)))
    }

    pub fn result_value(&self, index: usize) -> Option<Output> {
        self.results.get(index).and_then(|&r| self.graph.input_value(r))
    }

    pub fn passthrough_nodes(&self) -> Vec<(&IrNode, &FrameworkOp)> {
        self.graph
            .node_indices()
            .map(|idx| self.graph.node(idx))
            .filter_map(|node| node.op.as_framework().map(|fw| (node, fw)))
            .collect()
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "Model '{}': {} nodes, {} parameters, {} results, {} framework nodes",
            self.name,
            self.graph.node_count(),
            self.parameters.len(),
            self.results.len(),
            self.passthrough_nodes().len()
        );
        for &p in &self.parameters {
            let tensor = self.graph.tensor(Output::new(p, 0));
            let _ = write!(out, "\n  in  {} {} {}", self.graph.node(p).friendly_name, tensor.element_type, tensor.shape);
        }
        for &r in &self.results {
            let tensor = self.graph.tensor(Output::new(r, 0));
            let _ = write!(out, "\n  out {} {} {}", self.graph.node(r).friendly_name, tensor.element_type, tensor.shape);
        }
        out
    }
}
