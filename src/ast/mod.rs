//! The input AST consumed by the translator.
//!
//! Nodes arrive here already parsed, name-resolved and typed; the translator
//! treats them as read-only, cloning subtrees where the lowering synthesises
//! specialised rule variants. Every node family is a tagged enum with
//! exhaustive matching at the use sites.

mod argument;
mod clause;
mod program;
mod relation;

pub use argument::{AggregateOp, Aggregator, Argument, BinaryOp, FunctorOp};
pub use clause::{Atom, Clause, ExecutionPlan, Literal};
pub use program::{FunctorDeclaration, Program};
pub use relation::{Attribute, Relation, RelationRepresentation};

use std::fmt;

/// Source position carried by clauses for diagnostics and debug-info
/// statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrcLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SrcLocation {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SrcLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "<unknown>:{}:{}", self.line, self.column)
        } else {
            write!(f, "{}:{}:{}", self.file, self.line, self.column)
        }
    }
}
