//! Read-only analysis results consumed by the translator.
//!
//! Precedence/SCC analysis, recursion detection and relation-expiry
//! scheduling run upstream; the translator only consumes their results
//! through the structures below. All relation references are by name.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{Program, Relation};

/// One strongly-connected component of the relation dependency graph.
#[derive(Debug, Clone, Default)]
pub struct Scc {
    /// Internal relations of the component, in deterministic order.
    pub internal: Vec<String>,
    pub recursive: bool,
    /// Relations of predecessor components that are outputs.
    pub external_output_predecessors: Vec<String>,
    /// Relations of predecessor components that are not outputs.
    pub external_non_output_predecessors: Vec<String>,
    /// Internal non-output relations with successors in other components.
    pub internal_non_output_with_external_successors: Vec<String>,
}

/// The SCC graph over IDB relations.
#[derive(Debug, Clone, Default)]
pub struct SccGraph {
    sccs: Vec<Scc>,
    scc_of: BTreeMap<String, usize>,
}

impl SccGraph {
    pub fn new(sccs: Vec<Scc>) -> Self {
        let mut scc_of = BTreeMap::new();
        for (index, scc) in sccs.iter().enumerate() {
            for name in &scc.internal {
                scc_of.insert(name.clone(), index);
            }
        }
        Self { sccs, scc_of }
    }

    pub fn num_sccs(&self) -> usize {
        self.sccs.len()
    }

    pub fn scc(&self, index: usize) -> &Scc {
        &self.sccs[index]
    }

    pub fn is_recursive(&self, index: usize) -> bool {
        self.sccs[index].recursive
    }

    pub fn internal_relations(&self, index: usize) -> &[String] {
        &self.sccs[index].internal
    }

    pub fn scc_of(&self, relation: &str) -> Option<usize> {
        self.scc_of.get(relation).copied()
    }

    /// Whether two relations share a component.
    pub fn in_same_scc(&self, a: &str, b: &str) -> bool {
        match (self.scc_of(a), self.scc_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn internal_input_relations<'p>(
        &self,
        index: usize,
        program: &'p Program,
    ) -> Vec<&'p Relation> {
        self.internal_relations(index)
            .iter()
            .filter_map(|name| program.relation(name))
            .filter(|rel| rel.is_input)
            .collect()
    }

    pub fn internal_output_relations<'p>(
        &self,
        index: usize,
        program: &'p Program,
    ) -> Vec<&'p Relation> {
        self.internal_relations(index)
            .iter()
            .filter_map(|name| program.relation(name))
            .filter(|rel| rel.is_output || rel.is_print_size)
            .collect()
    }
}

/// A topological order over the SCC graph.
#[derive(Debug, Clone, Default)]
pub struct SccOrder {
    order: Vec<usize>,
}

impl SccOrder {
    pub fn new(order: Vec<usize>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

/// Relations expired at each step of the topological order; expired relations
/// may be dropped once the step completes.
#[derive(Debug, Clone, Default)]
pub struct RelationSchedule {
    expired: Vec<Vec<String>>,
}

impl RelationSchedule {
    pub fn new(expired: Vec<Vec<String>>) -> Self {
        Self { expired }
    }

    pub fn expired(&self, step: usize) -> &[String] {
        self.expired.get(step).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The recursion oracle: which clauses of which relations are recursive.
/// Clauses are identified by their position within the declaring relation.
#[derive(Debug, Clone, Default)]
pub struct RecursiveClauses {
    recursive: BTreeSet<(String, usize)>,
}

impl RecursiveClauses {
    pub fn new(recursive: BTreeSet<(String, usize)>) -> Self {
        Self { recursive }
    }

    pub fn mark(&mut self, relation: &str, clause_index: usize) {
        self.recursive.insert((relation.to_string(), clause_index));
    }

    pub fn recursive(&self, relation: &str, clause_index: usize) -> bool {
        self.recursive
            .contains(&(relation.to_string(), clause_index))
    }
}

/// The type environment; the translator only asks for the type qualifier
/// string of an attribute's type.
#[derive(Debug, Clone, Default)]
pub struct TypeEnvironment {
    qualifiers: BTreeMap<String, String>,
}

impl TypeEnvironment {
    pub fn with_qualifier(mut self, type_name: impl Into<String>, qualifier: impl Into<String>) -> Self {
        self.qualifiers.insert(type_name.into(), qualifier.into());
        self
    }

    pub fn qualifier(&self, type_name: &str) -> String {
        if let Some(q) = self.qualifiers.get(type_name) {
            return q.clone();
        }
        match type_name {
            "number" => "i:number".to_string(),
            "symbol" => "s:symbol".to_string(),
            other => format!("i:{other}"),
        }
    }
}

/// Bundle of all analysis results handed to the translator.
#[derive(Debug, Clone, Default)]
pub struct Analyses {
    pub scc_graph: SccGraph,
    pub scc_order: SccOrder,
    pub schedule: RelationSchedule,
    pub recursive_clauses: RecursiveClauses,
    pub type_env: TypeEnvironment,
}
