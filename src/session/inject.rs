use crate::error::{TranslateError, TranslateResult};
use crate::ir::{IrGraph, IrModel, Output};
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// Splices `body` into `graph`, feeding its parameters with `inputs`, and
/// returns the values of the body results in order.
pub fn inject_body(
    graph: &mut IrGraph,
    body: IrModel,
    op_type: &str,
    inputs: &[Output],
) -> TranslateResult<Vec<Output>> {
    if body.parameters.len() != inputs.len() {
        return Err(TranslateError::BodyArity {
            body: op_type.to_string(),
            expected: body.parameters.len(),
            actual: inputs.len(),
        });
    }

    let mut replaced: HashMap<NodeIndex, Output> = HashMap::new();
    for (&param, &input) in body.parameters.iter().zip(inputs) {
        replaced.insert(param, input);

        // Keep the type the body was converted with on an outer parameter that had none.
        let body_type = body.graph.tensor(Output::new(param, 0)).element_type;
        if body_type.is_static()
            && !graph.tensor(input).element_type.is_static()
            && graph.node(input.node).op.is_parameter()
        {
            graph.tensor_mut(input).element_type = body_type;
        }
    }

    let order = body
        .graph
        .toposort()
        .ok_or_else(|| TranslateError::BodyCycle { body: op_type.to_string() })?;

    let mut copied: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let remap = |value: Output, copied: &HashMap<NodeIndex, NodeIndex>| -> TranslateResult<Output> {
        if let Some(&outer) = replaced.get(&value.node) {
            return Ok(outer);
        }
        copied
            .get(&value.node)
            .map(|&node| Output::new(node, value.port))
            .ok_or_else(|| TranslateError::OutputPort {
                operation: body.graph.node(value.node).friendly_name.clone(),
                port: value.port,
            })
    };

    for idx in order {
        let node = body.graph.node(idx);
        if replaced.contains_key(&idx) || node.op.is_result() {
            continue;
        }
        let node_inputs = body
            .graph
            .inputs(idx)
            .into_iter()
            .map(|value| remap(value, &copied))
            .collect::<TranslateResult<Vec<_>>>()?;
        let outer = graph.add_node(node.friendly_name.clone(), node.op.clone(), &node_inputs, node.outputs.clone());
        copied.insert(idx, outer);
    }

    body.results
        .iter()
        .map(|&result| {
            let value = body.graph.input_value(result).ok_or_else(|| TranslateError::OutputPort {
                operation: body.graph.node(result).friendly_name.clone(),
                port: 0,
            })?;
            remap(value, &copied)
        })
        .collect()
}
