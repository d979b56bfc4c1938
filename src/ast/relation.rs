use std::collections::BTreeMap;

use super::clause::Clause;
use super::SrcLocation;

/// Physical representation requested for a relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationRepresentation {
    #[default]
    Default,
    Btree,
    Brie,
    EqRel,
    Info,
}

/// A typed attribute of a relation.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub type_name: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A declared relation with its clauses and I/O qualifiers. The arity always
/// includes any annotation columns appended by the provenance or incremental
/// transformers.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub representation: RelationRepresentation,
    pub is_input: bool,
    pub is_output: bool,
    pub is_print_size: bool,
    pub num_height_params: usize,
    pub clauses: Vec<Clause>,
    /// Key/value maps of user-written `.input` directives; empty means a
    /// single default directive.
    pub load_directives: Vec<BTreeMap<String, String>>,
    /// Key/value maps of user-written `.output` directives.
    pub store_directives: Vec<BTreeMap<String, String>>,
    pub src_loc: SrcLocation,
}

impl Relation {
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes,
            representation: RelationRepresentation::Default,
            is_input: false,
            is_output: false,
            is_print_size: false,
            num_height_params: 0,
            clauses: Vec::new(),
            load_directives: Vec::new(),
            store_directives: Vec::new(),
            src_loc: SrcLocation::default(),
        }
    }

    pub fn arity(&self) -> usize {
        self.attributes.len()
    }

    pub fn add_clause(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }
}
