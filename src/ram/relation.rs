use std::fmt;

use crate::ast::RelationRepresentation;

/// A relation record owned by the RAM program. Unique per name; auxiliary
/// relations (delta, new, diff variants) each get their own record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamRelation {
    pub name: String,
    pub arity: usize,
    pub num_height_params: usize,
    pub attribute_names: Vec<String>,
    pub attribute_types: Vec<String>,
    pub representation: RelationRepresentation,
}

impl RamRelation {
    pub fn new(name: impl Into<String>, arity: usize, num_height_params: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            num_height_params,
            attribute_names: Vec::new(),
            attribute_types: Vec::new(),
            representation: RelationRepresentation::Default,
        }
    }
}

/// A borrow of a [`RamRelation`] by name. Many references may point at the
/// same record; the executor resolves them through the program's relation
/// table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationRef {
    pub name: String,
}

impl RelationRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for RelationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
