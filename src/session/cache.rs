use crate::core::types::{ElementType, PartialShape};
use crate::ir::{IrGraph, IrModel, Output};
use std::collections::HashMap;

/// Identity of one specialization of a body graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BodySignature {
    pub identity: String,
    pub shapes: Vec<PartialShape>,
    pub types: Vec<ElementType>,
}

impl BodySignature {
    pub fn new(identity: &str, inputs: &[Output], graph: &IrGraph) -> Self {
        let (shapes, types) = inputs
            .iter()
            .map(|&input| {
                let tensor = graph.tensor(input);
                (tensor.shape.clone(), tensor.element_type)
            })
            .unzip();
        Self { identity: identity.to_string(), shapes, types }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: usize,
    pub hits: usize,
    pub inserts: usize,
}

/// Translated body graphs of one session. The cache keeps the only copy of
/// each entry; every lookup hands out a clone that the caller may rewire freely.
#[derive(Debug, Default)]
pub struct SubgraphCache {
    entries: HashMap<BodySignature, IrModel>,
    stats: CacheStats,
}

impl SubgraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, signature: &BodySignature) -> Option<IrModel> {
        self.stats.lookups += 1;
        let body = self.entries.get(signature).cloned();
        if body.is_some() {
            self.stats.hits += 1;
        }
        body
    }

    pub fn insert(&mut self, signature: BodySignature, body: IrModel) {
        self.stats.inserts += 1;
        self.entries.insert(signature, body);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: &str) -> IrModel {
        let mut graph = IrGraph::new();
        let p = graph.add_parameter(ElementType::F32, PartialShape::from_static(&[2]));
        let r = graph.add_result(p, "out");
        IrModel { name: name.into(), graph, parameters: vec![p.node], results: vec![r] }
    }

    #[test]
    fn signature_compares_structurally() {
        let mut graph = IrGraph::new();
        let a = graph.add_parameter(ElementType::F32, PartialShape::from_static(&[2]));
        let b = graph.add_parameter(ElementType::F32, PartialShape::from_static(&[2]));
        let c = graph.add_parameter(ElementType::I32, PartialShape::from_static(&[2]));
        assert_eq!(BodySignature::new("body", &[a], &graph), BodySignature::new("body", &[b], &graph));
        assert_ne!(BodySignature::new("body", &[a], &graph), BodySignature::new("body", &[c], &graph));
        assert_ne!(BodySignature::new("body", &[a], &graph), BodySignature::new("other", &[a], &graph));
    }

    #[test]
    fn lookups_hand_out_independent_copies() {
        let mut graph = IrGraph::new();
        let a = graph.add_parameter(ElementType::F32, PartialShape::from_static(&[2]));
        let signature = BodySignature::new("body", &[a], &graph);

        let mut cache = SubgraphCache::new();
        assert!(cache.is_empty());
        assert!(cache.get(&signature).is_none());
        cache.insert(signature.clone(), body("body"));

        let mut first = cache.get(&signature).unwrap();
        first.graph.node_mut(first.results[0]).friendly_name = "changed".into();
        let second = cache.get(&signature).unwrap();
        assert_eq!(second.graph.node(second.results[0]).friendly_name, "out");

        assert_eq!(cache.stats(), CacheStats { lookups: 3, hits: 2, inserts: 1 });
        assert_eq!(cache.len(), 1);
    }
}
