use crate::ast::BinaryOp;

use super::expression::Expression;
use super::relation::RelationRef;

/// Boolean conditions used by filters, breaks and exit statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    True,
    Conjunction(Box<Condition>, Box<Condition>),
    Disjunction(Box<Condition>, Box<Condition>),
    Negation(Box<Condition>),
    Constraint {
        op: BinaryOp,
        lhs: Expression,
        rhs: Expression,
    },
    EmptinessCheck(RelationRef),
    ExistenceCheck {
        relation: RelationRef,
        values: Vec<Expression>,
    },
    /// Existence check that also inspects annotation columns.
    PositiveExistenceCheck {
        relation: RelationRef,
        values: Vec<Expression>,
    },
    /// Existence check ignoring trailing annotation columns.
    SubsumptionExistenceCheck {
        relation: RelationRef,
        values: Vec<Expression>,
    },
    /// Invocation of a registered subroutine; true iff it returns non-zero.
    Subroutine {
        name: String,
        args: Vec<Expression>,
    },
}

impl Condition {
    pub fn negate(self) -> Condition {
        Condition::Negation(Box::new(self))
    }

    pub fn and(self, other: Condition) -> Condition {
        Condition::Conjunction(Box::new(self), Box::new(other))
    }

    pub fn constraint(op: BinaryOp, lhs: Expression, rhs: Expression) -> Condition {
        Condition::Constraint { op, lhs, rhs }
    }

    /// Folds a sequence of conditions into a right-leaning conjunction;
    /// `None` when the sequence is empty.
    pub fn conjoin(conds: impl IntoIterator<Item = Condition>) -> Option<Condition> {
        conds.into_iter().reduce(|acc, cond| acc.and(cond))
    }
}
