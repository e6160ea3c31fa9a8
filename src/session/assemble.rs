use crate::error::{TranslateError, TranslateResult};
use crate::ir::{IrGraph, Output};
use crate::session::op_map::{OpMap, resolve_flat_index};
use crate::source::{OutputMode, SourceGraph};
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, HashSet};

/// Tensor name given to parameters and results the name registry does not know.
pub const UNUSED_NAME_MARKER: &str = "saved_model_unused";

fn recorded<'m>(op_map: &'m OpMap, operation: &str) -> TranslateResult<&'m [crate::translator::NamedOutput]> {
    op_map
        .get(operation)
        .ok_or_else(|| TranslateError::MissingOperation { name: operation.to_string() })
}

/// Results for the declared output places of `source`.
pub fn declared_results(source: &SourceGraph, op_map: &OpMap, graph: &mut IrGraph) -> TranslateResult<Vec<NodeIndex>> {
    let mut results = Vec::new();
    for place in &source.outputs {
        match place.mode {
            OutputMode::All => {
                let outputs: Vec<Output> = recorded(op_map, &place.name)?.iter().map(|o| o.port).collect();
                for (port, value) in outputs.into_iter().enumerate() {
                    results.push(graph.add_result(value, format!("{}:{}", place.name, port)));
                }
            }
            OutputMode::ByIndex(port) => {
                let value = recorded(op_map, &place.name)?
                    .get(port)
                    .map(|o| o.port)
                    .ok_or_else(|| TranslateError::OutputPort { operation: place.name.clone(), port })?;
                results.push(graph.add_result(value, place.to_string()));
            }
            OutputMode::FromInputEdge(input) => {
                let op = source
                    .operation(&place.name)
                    .ok_or_else(|| TranslateError::MissingOperation { name: place.name.clone() })?;
                let edge = op
                    .inputs
                    .get(input)
                    .filter(|edge| !edge.control)
                    .ok_or_else(|| TranslateError::InputResolution {
                        operation: op.name.clone(),
                        input,
                        producer: String::new(),
                        port: 0,
                        detail: "the operation has no data input at this slot".into(),
                    })?;
                let producer = recorded(op_map, &edge.producer)?;
                let port = match &edge.group {
                    Some(group) => resolve_flat_index(producer, group, edge.index).map_err(|e| {
                        TranslateError::InputResolution {
                            operation: op.name.clone(),
                            input,
                            producer: edge.producer.clone(),
                            port: edge.index,
                            detail: e.to_string(),
                        }
                    })?,
                    None => edge.index,
                };
                let value = producer.get(port).map(|o| o.port).ok_or_else(|| TranslateError::OutputPort {
                    operation: edge.producer.clone(),
                    port,
                })?;
                results.push(graph.add_result(value, format!("{}:{}", edge.producer, port)));
            }
        }
    }
    Ok(results)
}

/// Results for every recorded output nobody consumes.
pub fn terminal_results(op_map: &OpMap, graph: &mut IrGraph) -> Vec<NodeIndex> {
    let mut results = Vec::new();
    let mut seen = HashSet::new();
    let candidates: Vec<(usize, Output)> = op_map
        .iter()
        .flat_map(|(_, outputs)| outputs.iter().enumerate().map(|(i, o)| (i, o.port)))
        .collect();
    for (index, value) in candidates {
        if !seen.insert(value) || graph.node(value.node).op.is_result() || graph.consumer_count(value) > 0 {
            continue;
        }
        let name = format!("{}:{}", graph.node(value.node).friendly_name, index);
        results.push(graph.add_result(value, name));
    }
    results
}

/// Renames parameters after the registry entry of one of their tensor names.
/// Returns how many were renamed; the others get the unused marker.
pub fn restore_parameter_names(graph: &mut IrGraph, parameters: &[NodeIndex], registry: &BTreeMap<String, String>) -> usize {
    let mut restored = 0;
    for &param in parameters {
        let known = {
            let graph: &IrGraph = graph;
            graph
                .outputs(param)
                .into_iter()
                .flat_map(move |o| graph.tensor(o).names.iter())
                .find_map(|name| registry.get(name).cloned())
        };
        match known {
            Some(name) => {
                graph.set_node_name(&name, param);
                restored += 1;
            }
            None => {
                graph.tensor_mut(Output::new(param, 0)).names.insert(UNUSED_NAME_MARKER.to_string());
            }
        }
    }
    restored
}

/// Same as [`restore_parameter_names`] for results, looking at the tensor each result consumes.
pub fn restore_result_names(graph: &mut IrGraph, results: &[NodeIndex], registry: &BTreeMap<String, String>) -> usize {
    let mut restored = 0;
    for &result in results {
        let Some(value) = graph.input_value(result) else { continue };
        let known = graph.tensor(value).names.iter().find_map(|name| registry.get(name).cloned());
        match known {
            Some(name) => {
                graph.node_mut(result).friendly_name = name.clone();
                graph.tensor_mut(value).names.insert(name);
                restored += 1;
            }
            None => {
                graph.tensor_mut(value).names.insert(UNUSED_NAME_MARKER.to_string());
            }
        }
    }
    restored
}

/// Permutes `items` so that their names follow `names`. An empty `names` keeps the order.
pub fn reorder_by_names<T>(
    kind: &'static str,
    names: &[String],
    items: Vec<T>,
    name_of: impl Fn(&T) -> String,
) -> TranslateResult<Vec<T>> {
    if names.is_empty() {
        return Ok(items);
    }
    let error = |detail: String| TranslateError::Reorder { kind, detail };
    if names.len() != items.len() {
        return Err(error(format!(
            "{} names requested for {} {}",
            names.len(),
            items.len(),
            kind
        )));
    }

    let mut slots: Vec<Option<T>> = (0..items.len()).map(|_| None).collect();
    for item in items {
        let name = name_of(&item);
        let slot = names
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| error(format!("'{}' is not among the requested names", name)))?;
        if slots[slot].is_some() {
            return Err(error(format!("two {} are mapped to the name '{}'", kind, name)));
        }
        slots[slot] = Some(item);
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ElementType, PartialShape};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reorder_follows_permutation() {
        let items = vec!["a", "b", "c"];
        let ordered = reorder_by_names("parameters", &names(&["c", "a", "b"]), items, |s| s.to_string()).unwrap();
        assert_eq!(ordered, vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_keeps_order_without_names() {
        let ordered = reorder_by_names("results", &[], vec!["b", "a"], |s| s.to_string()).unwrap();
        assert_eq!(ordered, vec!["b", "a"]);
    }

    #[test]
    fn reorder_rejects_bad_requests() {
        let wrong_len = reorder_by_names("parameters", &names(&["a"]), vec!["a", "b"], |s| s.to_string());
        assert!(matches!(wrong_len, Err(TranslateError::Reorder { .. })));

        let unknown = reorder_by_names("parameters", &names(&["a", "x"]), vec!["a", "b"], |s| s.to_string());
        assert!(unknown.unwrap_err().to_string().contains("'b' is not among"));

        let duplicate = reorder_by_names("results", &names(&["a", "b"]), vec!["a", "a"], |s| s.to_string());
        assert!(duplicate.unwrap_err().to_string().contains("two results"));
    }

    #[test]
    fn restores_known_parameter_names_and_marks_the_rest() {
        let mut graph = IrGraph::new();
        let x = graph.add_parameter(ElementType::F32, PartialShape::dynamic());
        let y = graph.add_parameter(ElementType::F32, PartialShape::dynamic());
        graph.set_node_name("serving_x", x.node);
        graph.set_node_name("serving_y", y.node);

        let registry = BTreeMap::from([("serving_x:0".to_string(), "images".to_string())]);
        assert_eq!(restore_parameter_names(&mut graph, &[x.node, y.node], &registry), 1);
        assert_eq!(graph.node(x.node).friendly_name, "images");
        assert!(graph.tensor(x).names.contains("images"));
        assert!(graph.tensor(y).names.contains(UNUSED_NAME_MARKER));
    }

    #[test]
    fn restores_result_names_from_consumed_tensor() {
        let mut graph = IrGraph::new();
        let x = graph.add_parameter(ElementType::F32, PartialShape::dynamic());
        graph.set_node_name("logits", x.node);
        let result = graph.add_result(x, "logits:0");

        let registry = BTreeMap::from([("logits".to_string(), "scores".to_string())]);
        assert_eq!(restore_result_names(&mut graph, &[result], &registry), 1);
        assert_eq!(graph.node(result).friendly_name, "scores");
        assert!(graph.tensor(x).names.contains("scores"));
    }
}
