//! The emitted Relational Algebra Machine entities.
//!
//! Every node is owned exclusively by its parent; the only cross-references
//! are [`RelationRef`]s, which borrow a relation by name out of the program's
//! relation table and are resolved at execution time. All node families
//! derive structural equality so that emitted programs can be compared for
//! determinism.

mod condition;
mod expression;
mod operation;
mod program;
mod relation;
mod statement;

pub use condition::Condition;
pub use expression::{AggregateFunction, Expression};
pub use operation::Operation;
pub use program::{Program, TranslationUnit};
pub use relation::{RamRelation, RelationRef};
pub use statement::{IoDirectives, Statement};
