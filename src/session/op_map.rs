use crate::error::{TranslateError, TranslateResult};
use crate::translator::NamedOutput;
use std::collections::BTreeMap;

/// Translated outputs of every operation seen so far in one pass, by operation name.
#[derive(Debug, Default)]
pub struct OpMap {
    entries: BTreeMap<String, Vec<NamedOutput>>,
}

impl OpMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[NamedOutput]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn insert(&mut self, name: &str, outputs: Vec<NamedOutput>) -> TranslateResult<()> {
        if self.entries.contains_key(name) {
            return Err(TranslateError::DuplicateOperation { name: name.to_string() });
        }
        self.entries.insert(name.to_string(), outputs);
        Ok(())
    }

    /// Replaces the outputs of an operation already in the map, after its arity grew.
    pub fn refresh(&mut self, name: &str, outputs: Vec<NamedOutput>) {
        if let Some(entry) = self.entries.get_mut(name) {
            debug_assert!(entry.len() <= outputs.len());
            *entry = outputs;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NamedOutput])> {
        self.entries.iter().map(|(name, outputs)| (name.as_str(), outputs.as_slice()))
    }
}

/// Flat port index of output `index` within output group `group` of a producer.
///
/// A producer whose first output is named is assumed to name all of them; for
/// producers with unnamed outputs the index is already flat.
pub fn resolve_flat_index(outputs: &[NamedOutput], group: &str, index: usize) -> TranslateResult<usize> {
    let named = outputs.first().is_some_and(|o| o.name.is_some());
    if !named {
        return Ok(index);
    }

    let error = |detail: &str| TranslateError::PortResolution {
        group: group.to_string(),
        index,
        detail: detail.to_string(),
    };
    let first = outputs
        .iter()
        .position(|o| o.name.as_deref() == Some(group))
        .ok_or_else(|| error("there is no output port specified by name and index"))?;
    let entry = outputs
        .get(first + index)
        .ok_or_else(|| error("there is no output port specified by name and index"))?;
    if entry.name.as_deref() != Some(group) {
        return Err(error("there is no output port with specified index in a group with specified name"));
    }
    Ok(first + index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Output;
    use petgraph::graph::NodeIndex;

    fn port(i: usize) -> Output {
        Output::new(NodeIndex::new(0), i)
    }

    fn grouped() -> Vec<NamedOutput> {
        vec![
            NamedOutput::named("y", port(0)),
            NamedOutput::named("idx", port(1)),
            NamedOutput::named("idx", port(2)),
            NamedOutput::named("count", port(3)),
        ]
    }

    #[test]
    fn positional_producer_keeps_index() {
        let outputs = vec![NamedOutput::indexed(port(0)), NamedOutput::indexed(port(1))];
        assert_eq!(resolve_flat_index(&outputs, "anything", 1).unwrap(), 1);
        assert_eq!(resolve_flat_index(&[], "output", 3).unwrap(), 3);
    }

    #[test]
    fn named_producer_resolves_within_group() {
        let outputs = grouped();
        assert_eq!(resolve_flat_index(&outputs, "y", 0).unwrap(), 0);
        assert_eq!(resolve_flat_index(&outputs, "idx", 0).unwrap(), 1);
        assert_eq!(resolve_flat_index(&outputs, "idx", 1).unwrap(), 2);
        assert_eq!(resolve_flat_index(&outputs, "count", 0).unwrap(), 3);
    }

    #[test]
    fn named_producer_rejects_unknown_group_or_overflow() {
        let outputs = grouped();
        assert!(matches!(
            resolve_flat_index(&outputs, "missing", 0),
            Err(TranslateError::PortResolution { .. })
        ));
        // Index 2 of "idx" lands on "count".
        assert!(resolve_flat_index(&outputs, "idx", 2).is_err());
        assert!(resolve_flat_index(&outputs, "count", 1).is_err());
    }

    #[test]
    fn names_are_inserted_once() {
        let mut map = OpMap::new();
        map.insert("a", vec![NamedOutput::indexed(port(0))]).unwrap();
        let err = map.insert("a", vec![]).unwrap_err();
        assert!(matches!(err, TranslateError::DuplicateOperation { name } if name == "a"));

        map.refresh("a", vec![NamedOutput::indexed(port(0)), NamedOutput::indexed(port(1))]);
        assert_eq!(map.get("a").unwrap().len(), 2);
        map.refresh("b", vec![]);
        assert!(!map.contains("b"));
    }
}
