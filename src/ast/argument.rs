use std::fmt;

use itertools::Itertools;

use super::clause::Literal;

/// Binary constraint operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// Intrinsic functor operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctorOp {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
    Cat,
}

impl fmt::Display for FunctorOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FunctorOp::Add => "+",
            FunctorOp::Sub => "-",
            FunctorOp::Mul => "*",
            FunctorOp::Div => "/",
            FunctorOp::Max => "max",
            FunctorOp::Min => "min",
            FunctorOp::Cat => "cat",
        };
        f.write_str(s)
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Count,
    Sum,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
        };
        f.write_str(s)
    }
}

/// An aggregation subterm, e.g. `count : { r(x, _) }`. The body holds the
/// literals of the sub-clause; at most one of them may be an atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    pub op: AggregateOp,
    /// The aggregated expression; `None` for `count`.
    pub target: Option<Box<Argument>>,
    pub body: Vec<Literal>,
}

impl Aggregator {
    /// The single atom of the sub-clause, if the first body literal is one.
    pub fn atom(&self) -> Option<&super::Atom> {
        match self.body.first() {
            Some(Literal::Atom(atom)) => Some(atom),
            _ => None,
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {{ {} }}", self.op, self.body.iter().join(", "))
    }
}

/// Argument expressions appearing in atoms and constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Variable(String),
    UnnamedVariable,
    /// A constant, referenced by its index in the symbol/number pool.
    Constant(i64),
    IntrinsicFunctor {
        op: FunctorOp,
        args: Vec<Argument>,
    },
    UserFunctor {
        name: String,
        args: Vec<Argument>,
    },
    Counter,
    IterationNumber,
    RecordInit(Vec<Argument>),
    Aggregator(Box<Aggregator>),
    SubroutineArg(usize),
}

impl Argument {
    pub fn var(name: impl Into<String>) -> Self {
        Argument::Variable(name.into())
    }

    /// Rewrites this argument tree bottom-up: children are mapped first, then
    /// the rebuilt node itself is passed through `f`.
    pub fn map(self, f: &mut dyn FnMut(Argument) -> Argument) -> Argument {
        let mapped = match self {
            Argument::IntrinsicFunctor { op, args } => Argument::IntrinsicFunctor {
                op,
                args: args.into_iter().map(|a| a.map(f)).collect(),
            },
            Argument::UserFunctor { name, args } => Argument::UserFunctor {
                name,
                args: args.into_iter().map(|a| a.map(f)).collect(),
            },
            Argument::RecordInit(args) => {
                Argument::RecordInit(args.into_iter().map(|a| a.map(f)).collect())
            }
            Argument::Aggregator(agg) => {
                let Aggregator { op, target, body } = *agg;
                Argument::Aggregator(Box::new(Aggregator {
                    op,
                    target: target.map(|t| Box::new(t.map(f))),
                    body: body.into_iter().map(|l| l.map_arguments(f)).collect(),
                }))
            }
            other => other,
        };
        f(mapped)
    }

    /// Whether a `Counter` occurs anywhere in this argument tree.
    pub fn contains_counter(&self) -> bool {
        match self {
            Argument::Counter => true,
            Argument::IntrinsicFunctor { args, .. }
            | Argument::UserFunctor { args, .. }
            | Argument::RecordInit(args) => args.iter().any(Argument::contains_counter),
            Argument::Aggregator(agg) => {
                agg.target.as_ref().is_some_and(|t| t.contains_counter())
                    || agg.body.iter().any(|lit| match lit {
                        Literal::Atom(atom) => atom.args.iter().any(Argument::contains_counter),
                        _ => false,
                    })
            }
            _ => false,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Variable(name) => f.write_str(name),
            Argument::UnnamedVariable => f.write_str("_"),
            Argument::Constant(index) => write!(f, "{index}"),
            Argument::IntrinsicFunctor { op, args } => {
                write!(f, "{}({})", op, args.iter().join(", "))
            }
            Argument::UserFunctor { name, args } => {
                write!(f, "@{}({})", name, args.iter().join(", "))
            }
            Argument::Counter => f.write_str("$"),
            Argument::IterationNumber => f.write_str("#iteration"),
            Argument::RecordInit(args) => write!(f, "[{}]", args.iter().join(", ")),
            Argument::Aggregator(agg) => write!(f, "{agg}"),
            Argument::SubroutineArg(index) => write!(f, "arg({index})"),
        }
    }
}
