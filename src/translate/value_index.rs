//! Per-clause index from variables and operators to tuple locations.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{Aggregator, Argument};

/// A (nesting level, column) position within the query plan under
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub level: usize,
    pub column: usize,
}

impl Location {
    pub fn new(level: usize, column: usize) -> Self {
        Self { level, column }
    }
}

/// Mutable state built up while indexing one clause: where each variable
/// occurs, where records get unpacked, and where aggregation results land.
/// Lives for the duration of a single clause translation.
#[derive(Debug, Default)]
pub struct ValueIndex {
    var_refs: BTreeMap<String, Vec<Location>>,
    record_defs: Vec<(Argument, Location)>,
    agg_locs: Vec<(Aggregator, Location)>,
    aggregator_levels: BTreeSet<usize>,
}

impl ValueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var_ref(&mut self, name: &str, location: Location) {
        self.var_refs
            .entry(name.to_string())
            .or_default()
            .push(location);
    }

    /// All locations of a variable, in indexing order.
    pub fn var_refs(&self, name: &str) -> &[Location] {
        self.var_refs.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Variables with their reference lists, in name order.
    pub fn variable_references(&self) -> impl Iterator<Item = (&String, &Vec<Location>)> {
        self.var_refs.iter()
    }

    /// The location of a variable's first occurrence; `None` when the clause
    /// never grounds it.
    pub fn definition_point(&self, name: &str) -> Option<Location> {
        self.var_refs.get(name).and_then(|locs| locs.first().copied())
    }

    pub fn set_record_definition(&mut self, record: Argument, location: Location) {
        self.record_defs.push((record, location));
    }

    pub fn record_definition(&self, record: &Argument) -> Option<Location> {
        self.record_defs
            .iter()
            .find(|(r, _)| r == record)
            .map(|&(_, loc)| loc)
    }

    pub fn set_aggregator_location(&mut self, aggregator: Aggregator, location: Location) {
        self.aggregator_levels.insert(location.level);
        self.agg_locs.push((aggregator, location));
    }

    pub fn aggregator_location(&self, aggregator: &Aggregator) -> Option<Location> {
        self.agg_locs
            .iter()
            .find(|(a, _)| a == aggregator)
            .map(|&(_, loc)| loc)
    }

    /// Whether a nesting level belongs to an aggregation rather than a scan.
    pub fn is_aggregator(&self, level: usize) -> bool {
        self.aggregator_levels.contains(&level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_point_is_first_occurrence() {
        let mut index = ValueIndex::new();
        index.add_var_ref("x", Location::new(0, 1));
        index.add_var_ref("x", Location::new(1, 0));
        assert_eq!(index.definition_point("x"), Some(Location::new(0, 1)));
        assert_eq!(index.definition_point("y"), None);
    }

    #[test]
    fn aggregator_levels_are_tracked() {
        let mut index = ValueIndex::new();
        let agg = Aggregator {
            op: crate::ast::AggregateOp::Count,
            target: None,
            body: vec![],
        };
        index.set_aggregator_location(agg.clone(), Location::new(3, 0));
        assert!(index.is_aggregator(3));
        assert!(!index.is_aggregator(2));
        assert_eq!(index.aggregator_location(&agg), Some(Location::new(3, 0)));
    }
}
