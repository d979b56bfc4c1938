use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;

use super::argument::{Argument, BinaryOp};
use super::SrcLocation;

/// A predicate applied to argument expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub name: String,
    pub args: Vec<Argument>,
}

impl Atom {
    pub fn new(name: impl Into<String>, args: Vec<Argument>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn set_arg(&mut self, index: usize, arg: Argument) {
        self.args[index] = arg;
    }

    /// Rewrites every argument tree of this atom bottom-up.
    pub fn map_arguments(&mut self, f: &mut dyn FnMut(Argument) -> Argument) {
        let args = std::mem::take(&mut self.args);
        self.args = args.into_iter().map(|a| a.map(f)).collect();
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.iter().join(", "))
    }
}

/// Body literals. Conjunction and disjunction compose other literals, which
/// lets the incremental lowering express "not freshly inserted, or already
/// existed" side conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Atom(Atom),
    Negation(Atom),
    /// Negated check against a relation including its annotation columns.
    PositiveNegation(Atom),
    /// Plain existence check, used by the incremental machinery.
    ExistenceCheck(Atom),
    /// Existence check ignoring the trailing `fields` annotation columns.
    SubsumptionNegation(Atom, usize),
    BinaryConstraint(BinaryOp, Argument, Argument),
    Conjunction(Box<Literal>, Box<Literal>),
    Disjunction(Box<Literal>, Box<Literal>),
}

impl Literal {
    /// The atom contained in this literal, if any.
    pub fn atom(&self) -> Option<&Atom> {
        match self {
            Literal::Atom(atom)
            | Literal::Negation(atom)
            | Literal::PositiveNegation(atom)
            | Literal::ExistenceCheck(atom)
            | Literal::SubsumptionNegation(atom, _) => Some(atom),
            _ => None,
        }
    }

    pub fn map_arguments(self, f: &mut dyn FnMut(Argument) -> Argument) -> Literal {
        let map_atom = |mut atom: Atom, f: &mut dyn FnMut(Argument) -> Argument| {
            atom.map_arguments(f);
            atom
        };
        match self {
            Literal::Atom(atom) => Literal::Atom(map_atom(atom, f)),
            Literal::Negation(atom) => Literal::Negation(map_atom(atom, f)),
            Literal::PositiveNegation(atom) => Literal::PositiveNegation(map_atom(atom, f)),
            Literal::ExistenceCheck(atom) => Literal::ExistenceCheck(map_atom(atom, f)),
            Literal::SubsumptionNegation(atom, fields) => {
                Literal::SubsumptionNegation(map_atom(atom, f), fields)
            }
            Literal::BinaryConstraint(op, lhs, rhs) => {
                Literal::BinaryConstraint(op, lhs.map(f), rhs.map(f))
            }
            Literal::Conjunction(lhs, rhs) => Literal::Conjunction(
                Box::new(lhs.map_arguments(f)),
                Box::new(rhs.map_arguments(f)),
            ),
            Literal::Disjunction(lhs, rhs) => Literal::Disjunction(
                Box::new(lhs.map_arguments(f)),
                Box::new(rhs.map_arguments(f)),
            ),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Atom(atom) => write!(f, "{atom}"),
            Literal::Negation(atom) => write!(f, "!{atom}"),
            Literal::PositiveNegation(atom) => write!(f, "!+{atom}"),
            Literal::ExistenceCheck(atom) => write!(f, "?{atom}"),
            Literal::SubsumptionNegation(atom, fields) => write!(f, "!sub[{fields}]{atom}"),
            Literal::BinaryConstraint(op, lhs, rhs) => write!(f, "{lhs} {op} {rhs}"),
            Literal::Conjunction(lhs, rhs) => write!(f, "({lhs} /\\ {rhs})"),
            Literal::Disjunction(lhs, rhs) => write!(f, "({lhs} \\/ {rhs})"),
        }
    }
}

/// A user-supplied atom order per rule version, 1-indexed as written in the
/// source program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionPlan {
    orders: BTreeMap<usize, Vec<usize>>,
}

impl ExecutionPlan {
    pub fn with_order(mut self, version: usize, order: Vec<usize>) -> Self {
        self.orders.insert(version, order);
        self
    }

    pub fn order_for(&self, version: usize) -> Option<&[usize]> {
        self.orders.get(&version).map(Vec::as_slice)
    }
}

/// A single Horn clause: a head atom and a list of body literals. A clause
/// with an empty body is a fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub head: Atom,
    pub body: Vec<Literal>,
    pub execution_plan: Option<ExecutionPlan>,
    pub src_loc: SrcLocation,
    /// Number of the clause within its relation, assigned by the provenance
    /// transformer and used for subroutine naming.
    pub clause_num: usize,
}

impl Clause {
    pub fn new(head: Atom, body: Vec<Literal>) -> Self {
        Self {
            head,
            body,
            execution_plan: None,
            src_loc: SrcLocation::default(),
            clause_num: 0,
        }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_rule(&self) -> bool {
        !self.is_fact()
    }

    /// Positive body atoms, in body order.
    pub fn atoms(&self) -> Vec<&Atom> {
        self.body
            .iter()
            .filter_map(|lit| match lit {
                Literal::Atom(atom) => Some(atom),
                _ => None,
            })
            .collect()
    }

    /// Negated body atoms, in body order.
    pub fn negations(&self) -> Vec<&Atom> {
        self.body
            .iter()
            .filter_map(|lit| match lit {
                Literal::Negation(atom) => Some(atom),
                _ => None,
            })
            .collect()
    }

    pub fn add_to_body(&mut self, literal: Literal) {
        self.body.push(literal);
    }

    /// Removes all plain negations from the body; the incremental lowering
    /// replaces them with positive-negation side conditions.
    pub fn clear_negations(&mut self) {
        self.body.retain(|lit| !matches!(lit, Literal::Negation(_)));
    }

    /// Applies `f` to the positive atom at the given atom index (counting
    /// atoms only, in body order).
    pub fn with_atom_mut(&mut self, atom_index: usize, f: impl FnOnce(&mut Atom)) {
        let mut seen = 0;
        for lit in &mut self.body {
            if let Literal::Atom(atom) = lit {
                if seen == atom_index {
                    f(atom);
                    return;
                }
                seen += 1;
            }
        }
    }

    /// Permutes the positive atoms of the body according to `order`
    /// (0-indexed: position `k` of the new body holds the old atom
    /// `order[k]`). Non-atom literals keep their positions.
    pub fn reorder_atoms(&mut self, order: &[usize]) {
        let atom_slots: Vec<usize> = self
            .body
            .iter()
            .enumerate()
            .filter(|(_, lit)| matches!(lit, Literal::Atom(_)))
            .map(|(i, _)| i)
            .collect();
        debug_assert_eq!(atom_slots.len(), order.len());

        let mut atoms: Vec<Option<Literal>> = self
            .body
            .iter()
            .filter(|lit| matches!(lit, Literal::Atom(_)))
            .cloned()
            .map(Some)
            .collect();
        for (slot, &src) in atom_slots.iter().zip(order.iter()) {
            self.body[*slot] = atoms[src].take().expect("duplicate index in atom order");
        }
    }

    /// Rewrites every argument of the head and all body literals bottom-up.
    pub fn map_arguments(&mut self, f: &mut dyn FnMut(Argument) -> Argument) {
        self.head.map_arguments(f);
        let body = std::mem::take(&mut self.body);
        self.body = body.into_iter().map(|lit| lit.map_arguments(f)).collect();
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fact() {
            write!(f, "{}.", self.head)
        } else {
            write!(f, "{} :- {}.", self.head, self.body.iter().join(", "))
        }
    }
}
