//! Synthesis of the program's named subroutines: provenance subproof
//! searches, incremental cleanup and the incremental loop exit condition.

use crate::ast::{Argument, BinaryOp, Clause, Literal};
use crate::config::ProvenanceMode;
use crate::error::TranslatorError;
use crate::ram::{Condition, Expression, Operation, RelationRef, Statement};

use super::value_index::ValueIndex;
use super::{name_unnamed_variables, AuxRole, ClauseTranslator, Translator};

/// Builds the subproof subroutine for a clause: the clause body constrained
/// so that the head matches the tuple passed in as subroutine arguments, and
/// body heights match (or lie below) the queried derivation heights. The
/// translation returns the bound body values instead of projecting.
pub(crate) fn make_subproof_subroutine(
    t: &mut Translator<'_>,
    clause: &Clause,
) -> Result<Statement, TranslatorError> {
    let mut intermediate = clause.clone();
    name_unnamed_variables(&mut intermediate);

    let heights = t.program.num_heights_of(&clause.head.name);
    let head_args = intermediate.head.args.clone();

    // pin the original head columns to the subroutine arguments
    for (i, arg) in head_args[..head_args.len() - 1 - heights].iter().enumerate() {
        match arg {
            Argument::Variable(_)
            | Argument::IntrinsicFunctor { .. }
            | Argument::UserFunctor { .. }
            | Argument::RecordInit(_) => {
                intermediate.add_to_body(Literal::BinaryConstraint(
                    BinaryOp::Eq,
                    arg.clone(),
                    Argument::SubroutineArg(i),
                ));
            }
            _ => {}
        }
    }

    let body_snapshot = intermediate.body.clone();
    if t.config.provenance == Some(ProvenanceMode::SubtreeHeights) {
        // per-subtree heights: each body atom's height column must equal the
        // corresponding argument, starting right after the original columns
        let mut level_index = head_args.len() - heights - 1;
        for lit in &body_snapshot {
            if let Literal::Atom(atom) = lit {
                let lit_heights = t.program.num_heights_of(&atom.name);
                let lit_level_index = atom.arity() - lit_heights;
                intermediate.add_to_body(Literal::BinaryConstraint(
                    BinaryOp::Eq,
                    atom.args[lit_level_index].clone(),
                    Argument::SubroutineArg(level_index),
                ));
            }
            level_index += 1;
        }
    } else {
        // flat heights: every body atom must have been derived strictly
        // below the queried height
        let level_index = head_args.len() - heights - 1;
        for lit in &body_snapshot {
            if let Literal::Atom(atom) = lit {
                intermediate.add_to_body(Literal::BinaryConstraint(
                    BinaryOp::Lt,
                    atom.args[atom.arity() - 1].clone(),
                    Argument::SubroutineArg(level_index),
                ));
            }
        }
    }

    ClauseTranslator::provenance(t).translate_clause(&intermediate, clause, 0)
}

/// Builds the negation-subproof subroutine: one query pair per body literal,
/// returning the literal number when it holds and its witnessing values
/// behind an undefined separator.
pub(crate) fn make_negation_subproof_subroutine(
    t: &mut Translator<'_>,
    clause: &Clause,
) -> Result<Statement, TranslatorError> {
    // aggregates cannot be searched; stand in fresh variables for them
    let mut replaced = clause.clone();
    let mut agg_number = 0;
    replaced.map_arguments(&mut |arg| match arg {
        Argument::Aggregator(_) => {
            let var = Argument::Variable(format!("agg_{agg_number}"));
            agg_number += 1;
            var
        }
        other => other,
    });

    // user variables, in first-occurrence order; synthetic level variables
    // are excluded and become wildcards
    let mut unique_vars: Vec<String> = Vec::new();
    collect_variables(&replaced, &mut |name| {
        if !name.contains("@level_num") && !unique_vars.iter().any(|v| v == name) {
            unique_vars.push(name.to_string());
        }
    });

    let to_arguments = |name: &str| -> Argument {
        if name.contains("@level_num") {
            Argument::UnnamedVariable
        } else {
            let pos = unique_vars
                .iter()
                .position(|v| v == name)
                .expect("variable was collected above");
            Argument::SubroutineArg(pos)
        }
    };

    let empty = ValueIndex::new();
    let mut searches: Vec<Statement> = Vec::new();

    for (lit_number, lit) in replaced.body.iter().enumerate() {
        let lit = lit
            .clone()
            .map_arguments(&mut |arg| match arg {
                Argument::Variable(name) => to_arguments(&name),
                other => other,
            });

        match &lit {
            Literal::Atom(atom) => {
                let heights = t.program.num_heights_of(&atom.name);
                let relation = t.atom_ref(atom);

                let mut query = Vec::new();
                for arg in &atom.args[..atom.arity() - 1 - heights] {
                    query.push(t.translate_value(arg, &empty)?);
                }
                for _ in 0..1 + heights {
                    query.push(Expression::Undef);
                }

                let search = Operation::filtered(
                    Condition::ExistenceCheck {
                        relation,
                        values: query,
                    },
                    Operation::SubroutineReturn {
                        values: vec![Expression::Number(lit_number as i64)],
                        terminate: false,
                    },
                );

                let mut return_atom = vec![Expression::Undef];
                for arg in &atom.args[..atom.arity() - 1 - heights] {
                    return_atom.push(t.translate_value(arg, &empty)?);
                }

                searches.push(Statement::Sequence(vec![
                    Statement::Query(search),
                    Statement::Query(Operation::SubroutineReturn {
                        values: return_atom,
                        terminate: false,
                    }),
                ]));
            }
            Literal::BinaryConstraint(..)
            | Literal::Negation(_)
            | Literal::Conjunction(..)
            | Literal::Disjunction(..) => {
                let condition = t
                    .translate_constraint(&lit, &empty)?
                    .unwrap_or(Condition::True);

                let filter = Operation::filtered(
                    condition,
                    Operation::SubroutineReturn {
                        values: vec![Expression::Number(lit_number as i64)],
                        terminate: false,
                    },
                );

                let mut return_lit = vec![Expression::Undef];
                match &lit {
                    Literal::BinaryConstraint(_, lhs, rhs) => {
                        return_lit.push(t.translate_value(lhs, &empty)?);
                        return_lit.push(t.translate_value(rhs, &empty)?);
                    }
                    Literal::Negation(atom) => {
                        let heights = t.program.num_heights_of(&atom.name);
                        for arg in &atom.args[..atom.arity() - 1 - heights] {
                            return_lit.push(t.translate_value(arg, &empty)?);
                        }
                    }
                    _ => {}
                }

                searches.push(Statement::Sequence(vec![
                    Statement::Query(filter),
                    Statement::Query(Operation::SubroutineReturn {
                        values: return_lit,
                        terminate: false,
                    }),
                ]));
            }
            _ => {}
        }
    }

    Ok(Statement::Sequence(searches))
}

/// Builds the epoch-boundary cleanup subroutine: fold the applied diffs into
/// every base relation, clear the auxiliaries, and reset the count columns of
/// every tuple to `(-1, -1)` so the storage layer treats them as settled.
pub(crate) fn make_incremental_cleanup_subroutine(t: &mut Translator<'_>) -> Statement {
    let mut cleanup: Option<Statement> = None;
    let program = t.program;

    for rel in &program.relations {
        let base = t.relation_ref(rel, AuxRole::Base);

        Statement::append(
            &mut cleanup,
            Statement::Merge {
                target: base.clone(),
                source: t.relation_ref(rel, AuxRole::DiffMinus),
            },
        );
        Statement::append(
            &mut cleanup,
            Statement::Merge {
                target: base.clone(),
                source: t.relation_ref(rel, AuxRole::DiffPlus),
            },
        );

        for role in [
            AuxRole::DiffPlus,
            AuxRole::DiffMinus,
            AuxRole::DiffPlusCount,
            AuxRole::DiffMinusCount,
            AuxRole::DiffPlusApplied,
            AuxRole::DiffMinusApplied,
            AuxRole::DiffApplied,
        ] {
            Statement::append(&mut cleanup, Statement::Clear(t.relation_ref(rel, role)));
        }

        // in-place reset of the count columns
        let mut update_tuple: Vec<Expression> = (0..rel.arity() - 2)
            .map(|i| Expression::tuple(0, i))
            .collect();
        update_tuple.push(Expression::Number(-1));
        update_tuple.push(Expression::Number(-1));

        Statement::append(
            &mut cleanup,
            Statement::Query(Operation::Scan {
                relation: base.clone(),
                level: 0,
                child: Box::new(Operation::Project {
                    relation: base.clone(),
                    values: update_tuple,
                }),
                profile_text: None,
            }),
        );
    }

    cleanup.unwrap_or(Statement::Sequence(Vec::new()))
}

/// Builds the per-component exit-condition subroutine:
/// returns 0 (and stops) while the component still holds tuples at or above
/// the current iteration, 1 otherwise.
pub(crate) fn make_incremental_exit_cond_subroutine(max_iter_ref: &RelationRef) -> Statement {
    let return_false = Operation::SubroutineReturn {
        values: vec![Expression::Number(0)],
        terminate: true,
    };
    let iteration_filter = Operation::filtered(
        Condition::constraint(
            BinaryOp::Ge,
            Expression::tuple(0, 0),
            Expression::SubroutineArg(0),
        ),
        return_false,
    );
    let scan = Operation::Scan {
        relation: max_iter_ref.clone(),
        level: 0,
        child: Box::new(iteration_filter),
        profile_text: None,
    };

    let return_true = Operation::SubroutineReturn {
        values: vec![Expression::Number(1)],
        terminate: false,
    };

    Statement::Sequence(vec![Statement::Query(scan), Statement::Query(return_true)])
}

/// Pre-order visit of every variable name in the clause, head first.
fn collect_variables(clause: &Clause, f: &mut impl FnMut(&str)) {
    fn visit_arg(arg: &Argument, f: &mut impl FnMut(&str)) {
        match arg {
            Argument::Variable(name) => f(name),
            Argument::IntrinsicFunctor { args, .. }
            | Argument::UserFunctor { args, .. }
            | Argument::RecordInit(args) => {
                for arg in args {
                    visit_arg(arg, f);
                }
            }
            Argument::Aggregator(agg) => {
                if let Some(target) = &agg.target {
                    visit_arg(target, f);
                }
                for lit in &agg.body {
                    visit_literal(lit, f);
                }
            }
            _ => {}
        }
    }

    fn visit_literal(lit: &Literal, f: &mut impl FnMut(&str)) {
        match lit {
            Literal::Atom(atom)
            | Literal::Negation(atom)
            | Literal::PositiveNegation(atom)
            | Literal::ExistenceCheck(atom)
            | Literal::SubsumptionNegation(atom, _) => {
                for arg in &atom.args {
                    visit_arg(arg, f);
                }
            }
            Literal::BinaryConstraint(_, lhs, rhs) => {
                visit_arg(lhs, f);
                visit_arg(rhs, f);
            }
            Literal::Conjunction(lhs, rhs) | Literal::Disjunction(lhs, rhs) => {
                visit_literal(lhs, f);
                visit_literal(rhs, f);
            }
        }
    }

    for arg in &clause.head.args {
        visit_arg(arg, f);
    }
    for lit in &clause.body {
        visit_literal(lit, f);
    }
}
