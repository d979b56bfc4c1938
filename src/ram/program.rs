use std::collections::{BTreeMap, HashMap};

use super::relation::RamRelation;
use super::statement::Statement;

/// The emitted RAM program: a main statement tree, the table of relation
/// records it references, and a sorted table of named subroutines.
///
/// The relation table preserves insertion order so that two runs over the
/// same input produce structurally identical programs.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    relations: Vec<RamRelation>,
    by_name: HashMap<String, usize>,
    pub main: Statement,
    subroutines: BTreeMap<String, Statement>,
}

impl Default for Program {
    fn default() -> Self {
        Self {
            relations: Vec::new(),
            by_name: HashMap::new(),
            main: Statement::Sequence(Vec::new()),
            subroutines: BTreeMap::new(),
        }
    }
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a relation record, returning the existing record when one
    /// with the same name is already present. Creation is idempotent.
    pub fn add_relation(&mut self, relation: RamRelation) -> &RamRelation {
        if let Some(&index) = self.by_name.get(&relation.name) {
            return &self.relations[index];
        }
        self.by_name
            .insert(relation.name.clone(), self.relations.len());
        self.relations.push(relation);
        self.relations.last().expect("relation was just pushed")
    }

    pub fn relation(&self, name: &str) -> Option<&RamRelation> {
        self.by_name.get(name).map(|&index| &self.relations[index])
    }

    /// All relation records, in creation order.
    pub fn relations(&self) -> impl Iterator<Item = &RamRelation> {
        self.relations.iter()
    }

    pub fn add_subroutine(&mut self, name: impl Into<String>, body: Statement) {
        self.subroutines.insert(name.into(), body);
    }

    pub fn subroutine(&self, name: &str) -> Option<&Statement> {
        self.subroutines.get(name)
    }

    /// All subroutines, sorted by name.
    pub fn subroutines(&self) -> impl Iterator<Item = (&String, &Statement)> {
        self.subroutines.iter()
    }
}

/// Result of a full translation: the program plus an optional textual dump
/// registered when `debug-report` is active.
#[derive(Debug)]
pub struct TranslationUnit {
    pub program: Program,
    pub debug_report: Option<String>,
}
