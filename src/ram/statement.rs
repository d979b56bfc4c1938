use std::collections::BTreeMap;

use super::condition::Condition;
use super::expression::Expression;
use super::operation::Operation;
use super::relation::RelationRef;

/// Key/value directives steering a load or store; see the I/O subsystem for
/// the recognised keys (`IO`, `filename`, `delimiter`, ...).
pub type IoDirectives = BTreeMap<String, String>;

/// Imperative statements of the emitted program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Sequence(Vec<Statement>),
    /// Statements the executor may run concurrently.
    Parallel(Vec<Statement>),
    /// Semi-naive fixpoint: each round runs `clear`, then `body`, checks
    /// `exit` (an [`Statement::Exit`]), then runs `update`.
    Loop {
        body: Box<Statement>,
        clear: Box<Statement>,
        exit: Box<Statement>,
        update: Box<Statement>,
    },
    Stratum {
        body: Box<Statement>,
        index: usize,
    },
    Create(RelationRef),
    Drop(RelationRef),
    Clear(RelationRef),
    /// `target ← target ∪ source`.
    Merge {
        target: RelationRef,
        source: RelationRef,
    },
    /// Merge of `source` tuples restricted to those whose key part occurs in
    /// `restriction` (or in `target` itself when no restriction is given).
    SemiMerge {
        target: RelationRef,
        source: RelationRef,
        restriction: Option<RelationRef>,
    },
    /// Merge of only the positively-counted tuples of `source`.
    PositiveMerge {
        target: RelationRef,
        source: RelationRef,
    },
    Swap {
        first: RelationRef,
        second: RelationRef,
    },
    Load {
        relation: RelationRef,
        directives: Vec<IoDirectives>,
    },
    Store {
        relation: RelationRef,
        directives: Vec<IoDirectives>,
    },
    Fact {
        relation: RelationRef,
        values: Vec<Expression>,
    },
    Query(Operation),
    /// Terminates the enclosing loop (or, with `now == false`, runs the
    /// condition for its side effect and continues).
    Exit {
        condition: Condition,
        now: bool,
    },
    LogRelationTimer {
        child: Box<Statement>,
        message: String,
        relation: RelationRef,
    },
    LogSize {
        relation: RelationRef,
        message: String,
    },
    LogTimer {
        child: Box<Statement>,
        message: String,
    },
    DebugInfo {
        child: Box<Statement>,
        message: String,
    },
}

impl Statement {
    /// Appends `stmt` to `list`, flattening into an existing sequence instead
    /// of nesting sequences inside sequences.
    pub fn append(list: &mut Option<Statement>, stmt: Statement) {
        match list {
            None => *list = Some(stmt),
            Some(Statement::Sequence(stmts)) => stmts.push(stmt),
            Some(_) => {
                let prev = list.take().expect("statement list is present");
                *list = Some(Statement::Sequence(vec![prev, stmt]));
            }
        }
    }

    pub fn sequence(stmts: Vec<Statement>) -> Statement {
        Statement::Sequence(stmts)
    }
}
