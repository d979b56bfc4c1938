//! Lowering of a strongly-connected component into a semi-naive fixpoint.
//!
//! The emitted shape is `Sequence(preamble, Loop(body, clear, exit, update),
//! postamble)`: the preamble computes the non-recursive seed and the initial
//! delta tables, the loop body joins each rule against one delta position at
//! a time, the update section migrates new tuples into the stable tables and
//! the postamble drops the temporaries. In incremental mode the loop
//! additionally maintains the diff auxiliaries and consults a per-component
//! exit subroutine keyed on iteration numbers.

use log::{debug, trace};

use crate::ast::{Argument, Atom, BinaryOp, Clause, FunctorOp, Literal, Relation};
use crate::error::TranslatorError;
use crate::ram::{
    AggregateFunction, Condition, Expression, Operation, RamRelation, RelationRef, Statement,
};

use super::log_statement;
use super::non_recursive::{
    classify_update, deletion_clone, insertion_clone, negation_deletion_clone,
    negation_insertion_clone, translate_non_recursive_relation, with_counts, UpdateClass,
};
use super::subroutine::make_incremental_exit_cond_subroutine;
use super::{name_unnamed_variables, AuxRole, ClauseTranslator, Translator};

/// Generates RAM for the relations of one recursive component.
pub(crate) fn translate_recursive_relation(
    t: &mut Translator<'_>,
    scc_rels: &[&Relation],
    index_of_scc: usize,
) -> Result<Option<Statement>, TranslatorError> {
    let mut preamble: Option<Statement> = None;
    let mut clear_table: Vec<Statement> = Vec::new();
    let mut update_table: Vec<Statement> = Vec::new();
    let mut postamble: Option<Statement> = None;

    let incremental = t.config.incremental;

    for rel in scc_rels {
        let rrel = t.relation_ref(rel, AuxRole::Base);
        let delta = t.relation_ref(rel, AuxRole::Delta);
        let new = t.relation_ref(rel, AuxRole::New);

        // update statements for the fixpoint round
        let mut update_rel = Statement::Sequence(vec![
            Statement::Merge {
                target: rrel.clone(),
                source: new.clone(),
            },
            Statement::Swap {
                first: delta.clone(),
                second: new.clone(),
            },
            Statement::Clear(new.clone()),
        ]);

        if incremental {
            clear_table.push(Statement::Sequence(vec![
                Statement::Clear(delta.clone()),
                Statement::Clear(t.relation_ref(rel, AuxRole::DeltaDiffApplied)),
                Statement::Clear(t.relation_ref(rel, AuxRole::TempDeltaDiffApplied)),
                Statement::Clear(t.relation_ref(rel, AuxRole::DeltaDiffMinusApplied)),
                Statement::Clear(t.relation_ref(rel, AuxRole::DeltaDiffMinusCount)),
                Statement::Clear(t.relation_ref(rel, AuxRole::DeltaDiffPlusCount)),
            ]));

            if let Statement::Sequence(stmts) = &mut update_rel {
                stmts.push(incremental_update_sequence(t, rel));
            }
        }

        if t.config.profile {
            update_rel = Statement::LogRelationTimer {
                child: Box::new(update_rel),
                message: log_statement::c_recursive_relation(&rel.name, &rel.src_loc),
                relation: new.clone(),
            };
        }
        update_table.push(update_rel);

        // temporary tables are dropped once the fixpoint is reached
        Statement::append(
            &mut postamble,
            Statement::Sequence(vec![
                Statement::Drop(delta.clone()),
                Statement::Drop(new.clone()),
            ]),
        );
        if incremental {
            Statement::append(
                &mut postamble,
                Statement::Sequence(vec![
                    Statement::Drop(t.relation_ref(rel, AuxRole::Indexed)),
                    Statement::Drop(t.relation_ref(rel, AuxRole::TempDeltaDiffApplied)),
                    Statement::Drop(t.relation_ref(rel, AuxRole::DeltaDiffApplied)),
                    Statement::Drop(t.relation_ref(rel, AuxRole::DeltaDiffMinusApplied)),
                    Statement::Drop(t.relation_ref(rel, AuxRole::DeltaDiffPlusCount)),
                    Statement::Drop(t.relation_ref(rel, AuxRole::DeltaDiffMinusCount)),
                    Statement::Drop(t.relation_ref(rel, AuxRole::NewDiffPlus)),
                    Statement::Drop(t.relation_ref(rel, AuxRole::NewDiffMinus)),
                ]),
            );
        }

        // seed with the non-recursive clauses
        if let Some(nonrec) = translate_non_recursive_relation(t, rel)? {
            Statement::append(&mut preamble, nonrec);
        }

        if incremental {
            // snapshot the previous epoch into a fully indexable table
            Statement::append(
                &mut preamble,
                Statement::Merge {
                    target: t.relation_ref(rel, AuxRole::Indexed),
                    source: rrel.clone(),
                },
            );
            Statement::append(
                &mut preamble,
                Statement::PositiveMerge {
                    target: delta.clone(),
                    source: t.relation_ref(rel, AuxRole::Indexed),
                },
            );
            for stmt in incremental_preamble_merges(t, rel, &rrel, &delta) {
                Statement::append(&mut preamble, stmt);
            }
        }

        // classical semi-naive seed
        Statement::append(
            &mut preamble,
            Statement::Merge {
                target: delta.clone(),
                source: rrel.clone(),
            },
        );
    }

    // single-fact table holding the maximum iteration number of the
    // component, consulted by the exit subroutine
    let max_iter_ref = if incremental {
        let max_iter = RamRelation {
            name: format!("scc_{index_of_scc}_@max_iter"),
            arity: 1,
            num_height_params: 1,
            attribute_names: vec!["max_iter".to_string()],
            attribute_types: vec!["s".to_string()],
            representation: Default::default(),
        };
        let max_iter_ref = t.create_relation_ref(max_iter);
        Statement::append(&mut preamble, Statement::Create(max_iter_ref.clone()));

        let args: Vec<Expression> = (0..scc_rels.len()).map(|i| Expression::tuple(i, 0)).collect();
        let mut agg_op = Operation::Project {
            relation: max_iter_ref.clone(),
            values: vec![Expression::Intrinsic {
                op: FunctorOp::Max,
                args,
            }],
        };
        for (ident, rel) in scc_rels.iter().enumerate() {
            let relation = t.relation_ref(rel, AuxRole::Base);
            agg_op = Operation::Aggregate {
                child: Box::new(agg_op),
                function: AggregateFunction::Max,
                relation,
                expression: Expression::tuple(ident, rel.arity() - 3),
                condition: Condition::True,
                level: ident,
            };
        }
        Statement::append(&mut preamble, Statement::Query(agg_op));
        Some(max_iter_ref)
    } else {
        None
    };

    // --- main loop body ---

    let scc_names: Vec<&str> = scc_rels.iter().map(|rel| rel.name.as_str()).collect();
    let in_scc = |name: &str| scc_names.contains(&name);

    let mut loop_body: Vec<Statement> = Vec::new();

    for rel in scc_rels {
        let new_ref = t.relation_ref(rel, AuxRole::New);
        let mut loop_rel_seq: Option<Statement> = None;
        let mut version = 0;

        for (clause_index, cl) in rel.clauses.iter().enumerate() {
            if !t
                .analyses
                .recursive_clauses
                .recursive(&rel.name, clause_index)
            {
                continue;
            }

            if incremental {
                translate_incremental_recursive_clause(
                    t,
                    rel,
                    cl,
                    &new_ref,
                    &in_scc,
                    &mut loop_rel_seq,
                    &mut version,
                )?;
            } else {
                let atoms: Vec<Atom> = cl.atoms().into_iter().cloned().collect();
                for (j, atom) in atoms.iter().enumerate() {
                    if !in_scc(&atom.name) {
                        continue;
                    }

                    // the j-th in-component atom reads the delta table and
                    // the head writes into the new table
                    let mut r1 = cl.clone();
                    r1.head.name = AuxRole::New.apply(&rel.name);
                    r1.with_atom_mut(j, |a| a.name = AuxRole::Delta.apply(&a.name));

                    if t.config.provenance_enabled() {
                        r1.add_to_body(Literal::SubsumptionNegation(
                            cl.head.clone(),
                            1 + rel.num_height_params,
                        ));
                    } else if r1.head.arity() > 0 {
                        r1.add_to_body(Literal::Negation(cl.head.clone()));
                    }

                    name_unnamed_variables(&mut r1);

                    // atoms after the j-th must not be joined against the
                    // delta again in this round; clone after naming so the
                    // anti-join shares the named variables
                    let named_atoms: Vec<Atom> = r1.atoms().into_iter().cloned().collect();
                    for later in named_atoms.iter().skip(j + 1) {
                        if in_scc(&later.name) {
                            let mut cur = later.clone();
                            cur.name = AuxRole::Delta.apply(&cur.name);
                            r1.add_to_body(Literal::Negation(cur));
                        }
                    }

                    trace!("recursive rule version {version}: {r1}");
                    let rule = ClauseTranslator::new(t).translate_clause(&r1, cl, version)?;
                    let rule = wrap_recursive_rule(t, rule, rel, &new_ref, cl, version);
                    Statement::append(&mut loop_rel_seq, rule);
                    version += 1;
                }
            }
        }

        let Some(mut seq) = loop_rel_seq else {
            continue;
        };
        if t.config.profile {
            seq = Statement::LogRelationTimer {
                child: Box::new(seq),
                message: log_statement::t_recursive_relation(&rel.name, &rel.src_loc),
                relation: new_ref,
            };
        }
        loop_body.push(seq);
    }

    // --- exit condition ---

    let mut exit_cond: Option<Condition> = None;
    let mut add_cond = |cond: Condition, current: &mut Option<Condition>| {
        *current = Some(match current.take() {
            Some(prev) => prev.and(cond),
            None => cond,
        });
    };
    for rel in scc_rels {
        if incremental {
            add_cond(
                Condition::EmptinessCheck(t.relation_ref(rel, AuxRole::NewDiffPlus)),
                &mut exit_cond,
            );
            add_cond(
                Condition::EmptinessCheck(t.relation_ref(rel, AuxRole::NewDiffMinus)),
                &mut exit_cond,
            );
        } else {
            add_cond(
                Condition::EmptinessCheck(t.relation_ref(rel, AuxRole::New)),
                &mut exit_cond,
            );
        }
    }

    if let Some(max_iter_ref) = &max_iter_ref {
        let name = format!("scc_{index_of_scc}_exit");
        t.ram
            .add_subroutine(name.clone(), make_incremental_exit_cond_subroutine(max_iter_ref));
        add_cond(
            Condition::Subroutine {
                name,
                args: vec![Expression::IterationNumber],
            },
            &mut exit_cond,
        );
    }

    // --- assemble the fixpoint ---

    let mut res: Option<Statement> = None;
    if let Some(preamble) = preamble {
        Statement::append(&mut res, preamble);
    }
    if let (false, Some(exit_cond)) = (loop_body.is_empty(), exit_cond) {
        Statement::append(
            &mut res,
            Statement::Loop {
                body: Box::new(Statement::Parallel(loop_body)),
                clear: Box::new(Statement::Sequence(clear_table)),
                exit: Box::new(Statement::Exit {
                    condition: exit_cond,
                    now: true,
                }),
                update: Box::new(Statement::Sequence(update_table)),
            },
        );
    }
    if let Some(postamble) = postamble {
        Statement::append(&mut res, postamble);
    }
    Ok(res)
}

/// The per-round migration of freshly derived diff tuples into the stable
/// diff tables and the delta auxiliaries used by the next round.
fn incremental_update_sequence(t: &mut Translator<'_>, rel: &Relation) -> Statement {
    let delta = t.relation_ref(rel, AuxRole::Delta);
    let indexed = t.relation_ref(rel, AuxRole::Indexed);
    let diff_minus = t.relation_ref(rel, AuxRole::DiffMinus);
    let diff_plus = t.relation_ref(rel, AuxRole::DiffPlus);
    let new_minus = t.relation_ref(rel, AuxRole::NewDiffMinus);
    let new_plus = t.relation_ref(rel, AuxRole::NewDiffPlus);
    let minus_applied = t.relation_ref(rel, AuxRole::DiffMinusApplied);
    let plus_applied = t.relation_ref(rel, AuxRole::DiffPlusApplied);
    let applied = t.relation_ref(rel, AuxRole::DiffApplied);
    let plus_count = t.relation_ref(rel, AuxRole::DiffPlusCount);
    let minus_count = t.relation_ref(rel, AuxRole::DiffMinusCount);
    let delta_applied = t.relation_ref(rel, AuxRole::DeltaDiffApplied);
    let delta_minus_applied = t.relation_ref(rel, AuxRole::DeltaDiffMinusApplied);
    let delta_plus_count = t.relation_ref(rel, AuxRole::DeltaDiffPlusCount);
    let delta_minus_count = t.relation_ref(rel, AuxRole::DeltaDiffMinusCount);

    let merge = |target: &RelationRef, source: &RelationRef| Statement::Merge {
        target: target.clone(),
        source: source.clone(),
    };
    let semi = |target: &RelationRef, source: &RelationRef, restriction: Option<&RelationRef>| {
        Statement::SemiMerge {
            target: target.clone(),
            source: source.clone(),
            restriction: restriction.cloned(),
        }
    };

    Statement::Sequence(vec![
        // re-seed the delta with the previous epoch
        Statement::PositiveMerge {
            target: delta.clone(),
            source: indexed,
        },
        // migrate the new diff tuples
        merge(&diff_minus, &new_minus),
        merge(&diff_plus, &new_plus),
        merge(&minus_applied, &new_minus),
        merge(&plus_applied, &new_plus),
        merge(&applied, &new_minus),
        merge(&applied, &new_plus),
        merge(&plus_count, &new_plus),
        semi(&plus_count, &delta, Some(&new_plus)),
        merge(&plus_count, &new_minus),
        merge(&minus_count, &new_minus),
        semi(&minus_count, &delta, Some(&new_minus)),
        merge(&minus_count, &new_plus),
        // delta auxiliaries for the next round
        semi(&delta_applied, &delta, Some(&applied)),
        merge(&delta_applied, &new_minus),
        merge(&delta_applied, &new_plus),
        merge(&delta_minus_applied, &delta),
        merge(&delta_minus_applied, &new_minus),
        merge(&delta_plus_count, &new_plus),
        semi(&delta_plus_count, &minus_applied, None),
        merge(&delta_minus_count, &new_minus),
        semi(&delta_minus_count, &plus_applied, None),
        Statement::Clear(new_minus),
        Statement::Clear(new_plus),
    ])
}

/// Preamble seeding of the applied/count auxiliaries from the loaded diffs.
fn incremental_preamble_merges(
    t: &mut Translator<'_>,
    rel: &Relation,
    rrel: &RelationRef,
    delta: &RelationRef,
) -> Vec<Statement> {
    let diff_minus = t.relation_ref(rel, AuxRole::DiffMinus);
    let diff_plus = t.relation_ref(rel, AuxRole::DiffPlus);
    let minus_applied = t.relation_ref(rel, AuxRole::DiffMinusApplied);
    let plus_applied = t.relation_ref(rel, AuxRole::DiffPlusApplied);
    let applied = t.relation_ref(rel, AuxRole::DiffApplied);
    let plus_count = t.relation_ref(rel, AuxRole::DiffPlusCount);
    let minus_count = t.relation_ref(rel, AuxRole::DiffMinusCount);
    let delta_applied = t.relation_ref(rel, AuxRole::DeltaDiffApplied);
    let delta_minus_applied = t.relation_ref(rel, AuxRole::DeltaDiffMinusApplied);
    let delta_plus_count = t.relation_ref(rel, AuxRole::DeltaDiffPlusCount);
    let delta_minus_count = t.relation_ref(rel, AuxRole::DeltaDiffMinusCount);

    let merge = |target: &RelationRef, source: &RelationRef| Statement::Merge {
        target: target.clone(),
        source: source.clone(),
    };
    let semi = |target: &RelationRef, source: &RelationRef| Statement::SemiMerge {
        target: target.clone(),
        source: source.clone(),
        restriction: None,
    };

    vec![
        merge(&delta_minus_applied, delta),
        merge(&delta_minus_applied, &diff_minus),
        merge(&applied, rrel),
        merge(&applied, &diff_minus),
        merge(&applied, &diff_plus),
        merge(&minus_applied, rrel),
        merge(&minus_applied, &diff_minus),
        merge(&plus_applied, rrel),
        merge(&plus_applied, &diff_plus),
        merge(&delta_applied, &applied),
        merge(&plus_count, &diff_plus),
        semi(&plus_count, &minus_applied),
        merge(&minus_count, &diff_minus),
        semi(&minus_count, &plus_applied),
        merge(&delta_plus_count, &diff_plus),
        semi(&delta_plus_count, &minus_applied),
        merge(&delta_minus_count, &diff_minus),
        semi(&delta_minus_count, &plus_applied),
    ]
}

fn wrap_recursive_rule(
    t: &Translator<'_>,
    mut rule: Statement,
    rel: &Relation,
    new_ref: &RelationRef,
    debug_clause: &Clause,
    version: usize,
) -> Statement {
    if t.config.profile {
        rule = Statement::LogRelationTimer {
            child: Box::new(rule),
            message: log_statement::t_recursive_rule(
                &rel.name,
                version,
                &debug_clause.src_loc,
                &debug_clause.to_string(),
            ),
            relation: new_ref.clone(),
        };
    }
    Statement::DebugInfo {
        child: Box::new(rule),
        message: format!("{}\nin file {}", debug_clause, debug_clause.src_loc),
    }
}

/// Lowers one pre-transformed incremental clause of a recursive relation:
/// classify, build the specialised base clone, then derive one delta version
/// per in-component body position.
#[allow(clippy::too_many_arguments)]
fn translate_incremental_recursive_clause(
    t: &mut Translator<'_>,
    rel: &Relation,
    cl: &Clause,
    new_ref: &RelationRef,
    in_scc: &dyn Fn(&str) -> bool,
    loop_rel_seq: &mut Option<Statement>,
    version: &mut usize,
) -> Result<(), TranslatorError> {
    let mut cl = cl.clone();
    name_unnamed_variables(&mut cl);

    let Some(class) = classify_update(&cl)? else {
        trace!("skipping unclassified incremental clause: {cl}");
        return Ok(());
    };

    let atoms: Vec<Atom> = cl.atoms().into_iter().cloned().collect();
    let negations: Vec<Atom> = cl.negations().into_iter().cloned().collect();

    let diff_applied_head = || {
        let mut head = cl.head.clone();
        head.name = AuxRole::DiffApplied.apply(&rel.name);
        head
    };

    match class {
        UpdateClass::Reinsertion => {
            let mut rdiff = cl.clone();
            rdiff.head.name = AuxRole::NewDiffPlus.apply(&rel.name);
            for (k, atom) in atoms.iter().enumerate() {
                rdiff.with_atom_mut(k, |a| a.name = AuxRole::DiffApplied.apply(&atom.name));
            }

            // each body tuple must have survived from the previous epoch
            for atom in &atoms {
                let check = with_counts(atom, Argument::Constant(1), Argument::UnnamedVariable);
                rdiff.add_to_body(Literal::ExistenceCheck(check));
            }

            rdiff.add_to_body(Literal::SubsumptionNegation(diff_applied_head(), 1));

            // reinsert only where a deletion drove the count to zero or below
            let mut deleted = cl.head.clone();
            deleted.name = AuxRole::DiffMinusCount.apply(&rel.name);
            let arity = deleted.arity();
            deleted.set_arg(arity - 1, Argument::var("@deleted_count"));
            deleted.set_arg(arity - 2, Argument::UnnamedVariable);
            deleted.set_arg(arity - 3, Argument::UnnamedVariable);
            rdiff.add_to_body(Literal::Atom(deleted));
            rdiff.add_to_body(Literal::BinaryConstraint(
                BinaryOp::Le,
                Argument::var("@deleted_count"),
                Argument::Constant(0),
            ));

            // negations either never existed in the applied snapshot or are
            // handled by the insertion rules when freshly deleted
            let mut not_deleted_checks = Vec::new();
            for negation in &negations {
                let mut negated = negation.clone();
                negated.name = AuxRole::DiffApplied.apply(&negated.name);
                rdiff.add_to_body(Literal::PositiveNegation(negated));

                let mut not_deleted = negation.clone();
                not_deleted.name = AuxRole::DiffMinusCount.apply(&not_deleted.name);
                let arity = not_deleted.arity();
                not_deleted.set_arg(arity - 1, Argument::Constant(0));
                not_deleted.set_arg(arity - 2, Argument::UnnamedVariable);
                not_deleted.set_arg(arity - 3, Argument::UnnamedVariable);
                not_deleted_checks.push(Literal::Negation(not_deleted));
            }
            rdiff.clear_negations();
            for check in not_deleted_checks {
                rdiff.add_to_body(check);
            }

            emit_delta_versions(
                t,
                rel,
                new_ref,
                &atoms,
                in_scc,
                &rdiff,
                &|_| AuxRole::DeltaDiffApplied,
                true,
                *version,
                loop_rel_seq,
            )?;
            *version += 1;
        }
        UpdateClass::Insertion => {
            for i in 0..atoms.len() {
                let mut rdiff = insertion_clone(&cl, &atoms, &negations, i, AuxRole::DiffPlus);
                rdiff.head.name = AuxRole::NewDiffPlus.apply(&rel.name);
                rdiff.add_to_body(Literal::SubsumptionNegation(diff_applied_head(), 1));
                emit_delta_versions(
                    t,
                    rel,
                    new_ref,
                    &atoms,
                    in_scc,
                    &rdiff,
                    &move |j| {
                        if j == i {
                            AuxRole::DeltaDiffPlusCount
                        } else {
                            AuxRole::DeltaDiffApplied
                        }
                    },
                    false,
                    *version,
                    loop_rel_seq,
                )?;
            }
            for i in 0..negations.len() {
                let mut rdiff =
                    negation_insertion_clone(&cl, &atoms, &negations, i, AuxRole::DiffPlus);
                rdiff.head.name = AuxRole::NewDiffPlus.apply(&rel.name);
                rdiff.add_to_body(Literal::SubsumptionNegation(diff_applied_head(), 1));
                emit_delta_versions(
                    t,
                    rel,
                    new_ref,
                    &atoms,
                    in_scc,
                    &rdiff,
                    &|_| AuxRole::DeltaDiffApplied,
                    false,
                    *version,
                    loop_rel_seq,
                )?;
            }
        }
        UpdateClass::Deletion => {
            for i in 0..atoms.len() {
                let mut rdiff = deletion_clone(&cl, &atoms, &negations, i, AuxRole::DiffMinus);
                rdiff.head.name = AuxRole::NewDiffMinus.apply(&rel.name);
                rdiff.add_to_body(Literal::SubsumptionNegation(diff_applied_head(), 1));
                emit_delta_versions(
                    t,
                    rel,
                    new_ref,
                    &atoms,
                    in_scc,
                    &rdiff,
                    &move |j| {
                        if j < i {
                            AuxRole::Delta
                        } else if j == i {
                            AuxRole::DeltaDiffMinusCount
                        } else {
                            AuxRole::DeltaDiffMinusApplied
                        }
                    },
                    false,
                    *version,
                    loop_rel_seq,
                )?;
            }
            for i in 0..negations.len() {
                let mut rdiff = negation_deletion_clone(&cl, &negations, i, AuxRole::DiffMinus);
                rdiff.head.name = AuxRole::NewDiffMinus.apply(&rel.name);
                rdiff.add_to_body(Literal::SubsumptionNegation(diff_applied_head(), 1));
                emit_delta_versions(
                    t,
                    rel,
                    new_ref,
                    &atoms,
                    in_scc,
                    &rdiff,
                    &|_| AuxRole::Delta,
                    false,
                    *version,
                    loop_rel_seq,
                )?;
            }
        }
    }
    Ok(())
}

/// Emits one delta version of `rdiff` per in-component positive body
/// position: `role_for(j)` picks the delta table driving position j, and
/// later in-component atoms are restricted to earlier iterations via their
/// iteration column.
#[allow(clippy::too_many_arguments)]
fn emit_delta_versions(
    t: &mut Translator<'_>,
    rel: &Relation,
    new_ref: &RelationRef,
    atoms: &[Atom],
    in_scc: &dyn Fn(&str) -> bool,
    rdiff: &Clause,
    role_for: &dyn Fn(usize) -> AuxRole,
    reorder: bool,
    version: usize,
    loop_rel_seq: &mut Option<Statement>,
) -> Result<(), TranslatorError> {
    for (j, atom) in atoms.iter().enumerate() {
        if !in_scc(&atom.name) {
            continue;
        }
        let mut r1 = rdiff.clone();
        let role = role_for(j);
        r1.with_atom_mut(j, |a| a.name = role.apply(&atom.name));

        for later in atoms.iter().skip(j + 1) {
            if in_scc(&later.name) {
                let arity = later.arity();
                r1.add_to_body(Literal::BinaryConstraint(
                    BinaryOp::Lt,
                    later.args[arity - 3].clone(),
                    Argument::IntrinsicFunctor {
                        op: FunctorOp::Sub,
                        args: vec![Argument::IterationNumber, Argument::Constant(1)],
                    },
                ));
            }
        }

        if reorder {
            // evaluate the deleted-tuple atom first
            let n = atoms.len();
            let mut order: Vec<usize> = vec![n];
            order.extend(0..n);
            r1.reorder_atoms(&order);
        }

        debug!("recursive incremental rule: {r1}");
        let rule = ClauseTranslator::new(t).translate_clause(&r1, &r1, version)?;
        let rule = wrap_recursive_rule(t, rule, rel, new_ref, &r1, version);
        Statement::append(loop_rel_seq, rule);
    }
    Ok(())
}
