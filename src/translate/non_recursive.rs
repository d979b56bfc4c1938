//! Lowering of the non-recursive clauses of a relation.
//!
//! In classical mode every clause becomes one query. In incremental mode the
//! pre-transformed clauses are classified by their head count annotations and
//! each produces one specialised clone per driving body position, targeting
//! the diff-plus/diff-minus relations.

use log::{debug, trace};

use crate::ast::{Argument, Atom, BinaryOp, Clause, Literal, Relation};
use crate::error::TranslatorError;
use crate::ram::{RelationRef, Statement};

use super::log_statement;
use super::{name_unnamed_variables, AuxRole, ClauseTranslator, Translator};

/// Classification of an incremental update clause by its head count
/// annotations `(@prev_count, @current_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpdateClass {
    Insertion,
    Deletion,
    Reinsertion,
}

/// Reads the count annotations off a clause head. The incremental
/// transformer plants constants there; anything else is a contract breach.
pub(crate) fn classify_update(clause: &Clause) -> Result<Option<UpdateClass>, TranslatorError> {
    let arity = clause.head.arity();
    let (prev, cur) = match (&clause.head.args[arity - 2], &clause.head.args[arity - 1]) {
        (Argument::Constant(prev), Argument::Constant(cur)) => (*prev, *cur),
        _ => {
            return Err(TranslatorError::MissingCountAnnotation {
                location: clause.src_loc.clone(),
            })
        }
    };
    Ok(if prev == 1 && cur == 1 {
        Some(UpdateClass::Reinsertion)
    } else if cur == 1 {
        Some(UpdateClass::Insertion)
    } else if cur == -1 {
        Some(UpdateClass::Deletion)
    } else {
        None
    })
}

/// Sets the current/previous count columns of an atom.
pub(crate) fn with_counts(atom: &Atom, cur: Argument, prev: Argument) -> Atom {
    let mut atom = atom.clone();
    let arity = atom.arity();
    atom.set_arg(arity - 1, cur);
    atom.set_arg(arity - 2, prev);
    atom
}

/// Generates RAM for the non-recursive clauses of `rel`; `None` when there is
/// no work (and profiling is off).
pub(crate) fn translate_non_recursive_relation(
    t: &mut Translator<'_>,
    rel: &Relation,
) -> Result<Option<Statement>, TranslatorError> {
    let mut res: Option<Statement> = None;
    let rel_ref = t.relation_ref(rel, AuxRole::Base);

    for (clause_index, clause) in rel.clauses.iter().enumerate() {
        if t.analyses.recursive_clauses.recursive(&rel.name, clause_index) {
            continue;
        }

        if t.config.incremental {
            translate_incremental_clause(t, rel, &rel_ref, clause, &mut res)?;
        } else {
            let rule = ClauseTranslator::new(t).translate_clause(clause, clause, 0)?;
            let rule = wrap_nonrecursive_rule(t, rule, rel, &rel_ref, clause);
            Statement::append(&mut res, rule);
        }
    }

    // relation-level profiling: a timer when any work was emitted, a size
    // printer otherwise
    if t.config.profile {
        match res.take() {
            Some(stmt) => {
                res = Some(Statement::LogRelationTimer {
                    child: Box::new(stmt),
                    message: log_statement::t_nonrecursive_relation(&rel.name, &rel.src_loc),
                    relation: rel_ref.clone(),
                });
            }
            None => {
                Statement::append(
                    &mut res,
                    Statement::LogSize {
                        relation: rel_ref.clone(),
                        message: log_statement::n_nonrecursive_relation(&rel.name, &rel.src_loc),
                    },
                );
            }
        }
    }

    Ok(res)
}

fn wrap_nonrecursive_rule(
    t: &Translator<'_>,
    mut rule: Statement,
    rel: &Relation,
    rel_ref: &RelationRef,
    clause: &Clause,
) -> Statement {
    if t.config.profile {
        rule = Statement::LogRelationTimer {
            child: Box::new(rule),
            message: log_statement::t_nonrecursive_rule(
                &rel.name,
                &clause.src_loc,
                &clause.to_string(),
            ),
            relation: rel_ref.clone(),
        };
    }
    Statement::DebugInfo {
        child: Box::new(rule),
        message: format!("{}\nin file {}", clause, clause.src_loc),
    }
}

/// Dispatches one pre-transformed incremental clause into its specialised
/// clones and appends their queries to `res`.
fn translate_incremental_clause(
    t: &mut Translator<'_>,
    rel: &Relation,
    rel_ref: &RelationRef,
    clause: &Clause,
    res: &mut Option<Statement>,
) -> Result<(), TranslatorError> {
    let mut clause = clause.clone();
    name_unnamed_variables(&mut clause);

    let class = match classify_update(&clause)? {
        Some(class) => class,
        None => {
            trace!("skipping unclassified incremental clause: {clause}");
            return Ok(());
        }
    };

    let atoms: Vec<Atom> = clause.atoms().into_iter().cloned().collect();
    let negations: Vec<Atom> = clause.negations().into_iter().cloned().collect();

    match class {
        UpdateClass::Reinsertion => {
            // reinsertion of hidden tuples is not performed for
            // non-recursive relations
            debug!("skipping non-recursive reinsertion clause: {clause}");
        }
        UpdateClass::Insertion => {
            for i in 0..atoms.len() {
                let cl = insertion_clone(&clause, &atoms, &negations, i, AuxRole::DiffPlus);
                emit_incremental_rule(t, rel, rel_ref, &cl, res)?;
            }
            for i in 0..negations.len() {
                let cl = negation_insertion_clone(&clause, &atoms, &negations, i, AuxRole::DiffPlus);
                emit_incremental_rule(t, rel, rel_ref, &cl, res)?;
            }
        }
        UpdateClass::Deletion => {
            for i in 0..atoms.len() {
                let cl = deletion_clone(&clause, &atoms, &negations, i, AuxRole::DiffMinus);
                emit_incremental_rule(t, rel, rel_ref, &cl, res)?;
            }
            for i in 0..negations.len() {
                let cl = negation_deletion_clone(&clause, &negations, i, AuxRole::DiffMinus);
                emit_incremental_rule(t, rel, rel_ref, &cl, res)?;
            }
        }
    }
    Ok(())
}

fn emit_incremental_rule(
    t: &mut Translator<'_>,
    rel: &Relation,
    rel_ref: &RelationRef,
    cl: &Clause,
    res: &mut Option<Statement>,
) -> Result<(), TranslatorError> {
    debug!("non-recursive incremental rule: {cl}");
    let rule = ClauseTranslator::new(t).translate_clause(cl, cl, 0)?;
    let rule = wrap_nonrecursive_rule(t, rule, rel, rel_ref, cl);
    Statement::append(res, rule);
    Ok(())
}

/// An insertion clone driven by positive body position `i`:
/// the i-th atom reads the diff-plus-count relation with `prev ≤ 0 < cur`,
/// earlier and later atoms read the diff-applied snapshots, and side
/// conditions prevent double counting across body positions and epochs.
pub(crate) fn insertion_clone(
    clause: &Clause,
    atoms: &[Atom],
    negations: &[Atom],
    i: usize,
    head_role: AuxRole,
) -> Clause {
    let mut cl = clause.clone();
    cl.head.name = head_role.apply(&cl.head.name);

    // the i-th tuple must not already exist positively
    let no_previous = with_counts(&atoms[i], Argument::Constant(1), Argument::Constant(0));
    cl.add_to_body(Literal::PositiveNegation(no_previous));

    cl.with_atom_mut(i, |atom| {
        atom.name = AuxRole::DiffPlusCount.apply(&atom.name);
    });
    let arity = atoms[i].arity();
    cl.add_to_body(Literal::BinaryConstraint(
        BinaryOp::Le,
        atoms[i].args[arity - 2].clone(),
        Argument::Constant(0),
    ));
    cl.add_to_body(Literal::BinaryConstraint(
        BinaryOp::Gt,
        atoms[i].args[arity - 1].clone(),
        Argument::Constant(0),
    ));

    // earlier positions must not themselves be incremental insertions
    // (unless the tuple already existed) to avoid double insertions
    for (j, atom) in atoms.iter().enumerate() {
        if j == i {
            continue;
        }
        cl.with_atom_mut(j, |a| {
            a.name = AuxRole::DiffApplied.apply(&a.name);
        });
        if j < i {
            let mut cur_atom = atom.clone();
            cur_atom.name = AuxRole::DiffPlusCount.apply(&cur_atom.name);
            let cur_arity = cur_atom.arity();
            cur_atom.set_arg(cur_arity - 1, Argument::UnnamedVariable);
            cur_atom.set_arg(cur_arity - 2, Argument::Constant(0));

            let no_previous = with_counts(atom, Argument::Constant(1), Argument::Constant(0));
            cl.add_to_body(Literal::Disjunction(
                Box::new(Literal::PositiveNegation(cur_atom)),
                Box::new(Literal::ExistenceCheck(no_previous)),
            ));
        }
    }

    // negated atoms must be absent from the applied snapshot
    for negation in negations {
        let mut negated = negation.clone();
        negated.name = AuxRole::DiffApplied.apply(&negated.name);
        cl.add_to_body(Literal::PositiveNegation(negated));
    }
    cl.clear_negations();
    cl
}

/// An insertion clone driven by the deletion of the `i`-th negated atom.
pub(crate) fn negation_insertion_clone(
    clause: &Clause,
    atoms: &[Atom],
    negations: &[Atom],
    i: usize,
    head_role: AuxRole,
) -> Clause {
    let mut cl = clause.clone();
    cl.head.name = head_role.apply(&cl.head.name);

    // the negated atom was freshly deleted: its count dropped to 0
    let mut negated = negations[i].clone();
    negated.name = AuxRole::DiffMinusCount.apply(&negated.name);
    let arity = negated.arity();
    negated.set_arg(arity - 1, Argument::Constant(0));
    negated.set_arg(arity - 3, Argument::UnnamedVariable);
    cl.add_to_body(Literal::Atom(negated));

    // and the head tuple must not already exist in the applied snapshot
    let mut no_previous =
        with_counts(&negations[i], Argument::Constant(1), Argument::Constant(0));
    no_previous.name = AuxRole::DiffApplied.apply(&no_previous.name);
    cl.add_to_body(Literal::PositiveNegation(no_previous));

    // earlier negations must not themselves drive an insertion
    for negation in negations.iter().take(i) {
        let mut cur_atom = negation.clone();
        cur_atom.name = AuxRole::DiffMinusCount.apply(&cur_atom.name);
        let cur_arity = cur_atom.arity();
        cur_atom.set_arg(cur_arity - 1, Argument::UnnamedVariable);
        cur_atom.set_arg(cur_arity - 2, Argument::Constant(-1));

        let mut no_previous =
            with_counts(negation, Argument::Constant(1), Argument::Constant(0));
        no_previous.name = AuxRole::DiffApplied.apply(&no_previous.name);
        cl.add_to_body(Literal::Disjunction(
            Box::new(Literal::PositiveNegation(cur_atom)),
            Box::new(Literal::ExistenceCheck(no_previous)),
        ));
    }

    for negation in negations {
        let mut negated = negation.clone();
        negated.name = AuxRole::DiffApplied.apply(&negated.name);
        cl.add_to_body(Literal::PositiveNegation(negated));
    }

    for j in 0..atoms.len() {
        cl.with_atom_mut(j, |a| {
            a.name = AuxRole::DiffApplied.apply(&a.name);
        });
    }
    cl.clear_negations();
    cl
}

/// A deletion clone driven by positive body position `i`: the i-th atom reads
/// the diff-minus-count relation with `prev > 0 ≥ cur`, later atoms read the
/// minus-applied snapshot.
pub(crate) fn deletion_clone(
    clause: &Clause,
    atoms: &[Atom],
    negations: &[Atom],
    i: usize,
    head_role: AuxRole,
) -> Clause {
    let mut cl = clause.clone();
    cl.head.name = head_role.apply(&cl.head.name);

    let mut no_previous = with_counts(&atoms[i], Argument::Constant(1), Argument::Constant(0));
    no_previous.name = AuxRole::DiffApplied.apply(&no_previous.name);
    cl.add_to_body(Literal::PositiveNegation(no_previous));

    cl.with_atom_mut(i, |atom| {
        atom.name = AuxRole::DiffMinusCount.apply(&atom.name);
    });
    let arity = atoms[i].arity();
    cl.add_to_body(Literal::BinaryConstraint(
        BinaryOp::Gt,
        atoms[i].args[arity - 2].clone(),
        Argument::Constant(0),
    ));
    cl.add_to_body(Literal::BinaryConstraint(
        BinaryOp::Le,
        atoms[i].args[arity - 1].clone(),
        Argument::Constant(0),
    ));

    for (j, atom) in atoms.iter().enumerate() {
        if j < i {
            // not already deleted via an earlier position, or existed before
            let mut cur_atom = atom.clone();
            cur_atom.name = AuxRole::DiffMinusCount.apply(&cur_atom.name);
            let cur_arity = cur_atom.arity();
            cur_atom.set_arg(cur_arity - 1, Argument::UnnamedVariable);
            cur_atom.set_arg(cur_arity - 2, Argument::Constant(-1));

            let mut no_previous =
                with_counts(atom, Argument::Constant(1), Argument::Constant(0));
            no_previous.name = AuxRole::DiffApplied.apply(&no_previous.name);
            cl.add_to_body(Literal::Disjunction(
                Box::new(Literal::PositiveNegation(cur_atom)),
                Box::new(Literal::ExistenceCheck(no_previous)),
            ));
        } else if j > i {
            cl.with_atom_mut(j, |a| {
                a.name = AuxRole::DiffMinusApplied.apply(&a.name);
            });
        }
    }

    for negation in negations {
        cl.add_to_body(Literal::PositiveNegation(negation.clone()));
    }
    cl.clear_negations();
    cl
}

/// A deletion clone driven by the insertion of the `i`-th negated atom.
pub(crate) fn negation_deletion_clone(
    clause: &Clause,
    negations: &[Atom],
    i: usize,
    head_role: AuxRole,
) -> Clause {
    let mut cl = clause.clone();
    cl.head.name = head_role.apply(&cl.head.name);

    // the negated atom was freshly inserted
    let mut negated = negations[i].clone();
    negated.name = AuxRole::DiffPlusCount.apply(&negated.name);
    let arity = negated.arity();
    negated.set_arg(arity - 1, Argument::UnnamedVariable);
    negated.set_arg(arity - 2, Argument::Constant(0));
    negated.set_arg(arity - 3, Argument::UnnamedVariable);
    cl.add_to_body(Literal::Atom(negated));

    let no_previous = with_counts(&negations[i], Argument::Constant(1), Argument::Constant(0));
    cl.add_to_body(Literal::PositiveNegation(no_previous));

    for negation in negations.iter().take(i) {
        let mut cur_atom = negation.clone();
        cur_atom.name = AuxRole::DiffPlusCount.apply(&cur_atom.name);
        let cur_arity = cur_atom.arity();
        cur_atom.set_arg(cur_arity - 1, Argument::UnnamedVariable);
        cur_atom.set_arg(cur_arity - 2, Argument::Constant(0));

        let no_previous = with_counts(negation, Argument::Constant(1), Argument::Constant(0));
        cl.add_to_body(Literal::Disjunction(
            Box::new(Literal::PositiveNegation(cur_atom)),
            Box::new(Literal::ExistenceCheck(no_previous)),
        ));
    }

    for negation in negations {
        cl.add_to_body(Literal::PositiveNegation(negation.clone()));
    }
    cl.clear_negations();
    cl
}
