//! AST pre-transformers that run before translation.
//!
//! Provenance attaches rule-number and height annotation columns; the
//! incremental transformer rewrites every rule into positive-update,
//! negative-update and re-generation variants carrying
//! `(@iteration, @prev_count, @current_count)` annotations. Both widen the
//! relations they touch, so any clause-index-keyed analyses must be
//! recomputed on the transformed program before translation.

pub mod incremental;
pub mod provenance;

use crate::ast::{Argument, Atom, FunctorOp, Literal};

/// Folds a list of arguments with a binary functor; `0` for an empty list,
/// the single argument unchanged for one.
pub(crate) fn fold_functor(args: Vec<Argument>, op: FunctorOp) -> Argument {
    let mut iter = args.into_iter();
    let Some(first) = iter.next() else {
        return Argument::Constant(0);
    };
    iter.fold(first, |acc, next| Argument::IntrinsicFunctor {
        op,
        args: vec![acc, next],
    })
}

/// Pads an atom with unnamed variables for freshly added annotation columns.
pub(crate) fn pad_atom(atom: &mut Atom, columns: usize) {
    for _ in 0..columns {
        atom.args.push(Argument::UnnamedVariable);
    }
}

/// Pads every atom nested inside the arguments of a literal (aggregator
/// bodies) and the atoms of negative literals, which do not receive named
/// annotation variables of their own.
pub(crate) fn pad_nested_atoms(literal: &mut Literal, columns: usize) {
    fn pad_in_arg(arg: &mut Argument, columns: usize) {
        match arg {
            Argument::IntrinsicFunctor { args, .. }
            | Argument::UserFunctor { args, .. }
            | Argument::RecordInit(args) => {
                for arg in args {
                    pad_in_arg(arg, columns);
                }
            }
            Argument::Aggregator(agg) => {
                for lit in &mut agg.body {
                    pad_in_literal(lit, columns, true);
                }
            }
            _ => {}
        }
    }

    fn pad_in_literal(literal: &mut Literal, columns: usize, pad_atoms: bool) {
        match literal {
            Literal::Atom(atom) => {
                if pad_atoms {
                    pad_atom(atom, columns);
                }
                for arg in &mut atom.args {
                    pad_in_arg(arg, columns);
                }
            }
            Literal::Negation(atom)
            | Literal::PositiveNegation(atom)
            | Literal::ExistenceCheck(atom)
            | Literal::SubsumptionNegation(atom, _) => {
                pad_atom(atom, columns);
                for arg in &mut atom.args {
                    pad_in_arg(arg, columns);
                }
            }
            Literal::BinaryConstraint(_, lhs, rhs) => {
                pad_in_arg(lhs, columns);
                pad_in_arg(rhs, columns);
            }
            Literal::Conjunction(lhs, rhs) | Literal::Disjunction(lhs, rhs) => {
                pad_in_literal(lhs, columns, pad_atoms);
                pad_in_literal(rhs, columns, pad_atoms);
            }
        }
    }

    pad_in_literal(literal, columns, false);
}

/// Pads atoms nested inside the arguments of a head atom.
pub(crate) fn pad_head_nested(head: &mut Atom, columns: usize) {
    let mut lit = Literal::Atom(head.clone());
    pad_nested_atoms(&mut lit, columns);
    if let Literal::Atom(atom) = lit {
        *head = atom;
    }
}
