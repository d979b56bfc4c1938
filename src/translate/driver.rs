//! Per-component orchestration: the driver walks the SCC graph in
//! topological order and emits one stratum per component, covering relation
//! creation, input loading, the component body, incremental merges, output
//! stores and expiry drops. Subroutines are registered at the end.

use log::debug;

use crate::ast::Relation;
use crate::error::TranslatorError;
use crate::ram::{Condition, RelationRef, Statement};

use super::io::{input_directives, output_directives};
use super::log_statement;
use super::non_recursive::translate_non_recursive_relation;
use super::recursive::translate_recursive_relation;
use super::subroutine::{make_incremental_cleanup_subroutine, make_negation_subproof_subroutine, make_subproof_subroutine};
use super::{AuxRole, Translator, INCREMENTAL_ROLES, RECURSIVE_INCREMENTAL_ROLES};

/// Translates the whole program into the RAM program owned by `t`.
pub(crate) fn translate_program(t: &mut Translator<'_>) -> Result<(), TranslatorError> {
    if t.config.incremental {
        check_annotation_columns(t)?;
    }
    if t.config.provenance_enabled() {
        check_provenance_columns(t)?;
    }

    if t.analyses.scc_graph.num_sccs() == 0 {
        return Ok(());
    }

    let order: Vec<usize> = t.analyses.scc_order.order().to_vec();
    let num_sccs = t.analyses.scc_graph.num_sccs();

    let mut main: Option<Statement> = None;
    let mut index_of_scc = 0;

    for &scc in &order {
        let mut current: Option<Statement> = None;

        let is_recursive = t.analyses.scc_graph.is_recursive(scc);
        let interns = resolve_relations(t, t.analyses.scc_graph.internal_relations(scc))?;
        let intern_ins: Vec<Relation> = interns.iter().filter(|r| r.is_input).cloned().collect();
        let intern_outs: Vec<Relation> = interns
            .iter()
            .filter(|r| r.is_output || r.is_print_size)
            .cloned()
            .collect();
        let extern_out_preds = resolve_relations(
            t,
            &t.analyses.scc_graph.scc(scc).external_output_predecessors,
        )?;
        let extern_non_out_preds = resolve_relations(
            t,
            &t.analyses.scc_graph.scc(scc).external_non_output_predecessors,
        )?;
        let interns_with_extern_succs = resolve_relations(
            t,
            &t.analyses
                .scc_graph
                .scc(scc)
                .internal_non_output_with_external_successors,
        )?;
        let expired = resolve_relations(t, t.analyses.schedule.expired(index_of_scc))?;

        debug!(
            "translating SCC {index_of_scc} (recursive: {is_recursive}, relations: {:?})",
            interns.iter().map(|r| &r.name).collect::<Vec<_>>()
        );

        // declare all internal relations and their auxiliaries
        for rel in &interns {
            Statement::append(
                &mut current,
                Statement::Create(t.relation_ref(rel, AuxRole::Base)),
            );
            if t.config.incremental {
                for role in INCREMENTAL_ROLES {
                    Statement::append(&mut current, Statement::Create(t.relation_ref(rel, role)));
                }
            }
            if is_recursive {
                Statement::append(
                    &mut current,
                    Statement::Create(t.relation_ref(rel, AuxRole::Delta)),
                );
                Statement::append(
                    &mut current,
                    Statement::Create(t.relation_ref(rel, AuxRole::New)),
                );
                if t.config.incremental {
                    for role in RECURSIVE_INCREMENTAL_ROLES {
                        Statement::append(
                            &mut current,
                            Statement::Create(t.relation_ref(rel, role)),
                        );
                    }
                }
            }
        }

        // load input relations; incremental runs load the epoch's additions
        // into the diff-plus table instead of the base relation
        for rel in &intern_ins {
            make_load(t, &mut current, rel, None, None);
        }
        if t.config.engine_enabled() {
            for rel in &extern_out_preds {
                make_load(t, &mut current, rel, Some("output-dir"), Some(".csv"));
            }
            for rel in &extern_non_out_preds {
                make_load(t, &mut current, rel, Some("output-dir"), Some(".facts"));
            }
        }

        // seed the diff auxiliaries of the inputs before a recursive body
        if t.config.incremental && is_recursive {
            for rel in &intern_ins {
                for stmt in incremental_applied_merges(t, rel) {
                    Statement::append(&mut current, stmt);
                }
            }
        }

        // the component body
        let body = if is_recursive {
            let rel_refs: Vec<&Relation> = interns.iter().collect();
            translate_recursive_relation(t, &rel_refs, index_of_scc)?
        } else {
            translate_non_recursive_relation(t, &interns[0])?
        };
        if let Some(body) = body {
            Statement::append(&mut current, body);
        }

        // non-recursive components seed the diff auxiliaries afterwards
        if t.config.incremental && !is_recursive {
            for rel in &interns {
                for stmt in incremental_applied_merges(t, rel) {
                    Statement::append(&mut current, stmt);
                }
            }
        }

        // stage intermediates for other engines, store outputs
        if t.config.engine_enabled() {
            for rel in &interns_with_extern_succs {
                make_store(t, &mut current, rel, Some("output-dir"), Some(".facts"));
            }
        }
        if !t.config.incremental {
            for rel in &intern_outs {
                make_store(t, &mut current, rel, None, None);
            }
        }

        // drop relations nothing downstream needs; provenance and
        // incremental runs keep everything alive for later queries
        if !t.config.provenance_enabled() && !t.config.incremental {
            if t.config.engine_enabled() {
                for rel in interns
                    .iter()
                    .chain(extern_out_preds.iter())
                    .chain(extern_non_out_preds.iter())
                {
                    let dropped = t.relation_ref(rel, AuxRole::Base);
                    Statement::append(&mut current, Statement::Drop(dropped));
                }
            } else {
                for rel in &expired {
                    let dropped = t.relation_ref(rel, AuxRole::Base);
                    Statement::append(&mut current, Statement::Drop(dropped));
                }
            }
        }

        // the last component triggers cleanup, then all outputs are stored
        if t.config.incremental && index_of_scc == num_sccs - 1 {
            Statement::append(
                &mut current,
                Statement::Exit {
                    condition: Condition::Subroutine {
                        name: "incremental_cleanup".to_string(),
                        args: Vec::new(),
                    },
                    now: false,
                },
            );
            for &out_scc in &order {
                let outputs: Vec<Relation> = t
                    .analyses
                    .scc_graph
                    .internal_output_relations(out_scc, t.program)
                    .into_iter()
                    .cloned()
                    .collect();
                for rel in &outputs {
                    make_store(t, &mut current, rel, None, None);
                }
            }
        }

        if let Some(current) = current {
            Statement::append(
                &mut main,
                Statement::Stratum {
                    body: Box::new(current),
                    index: index_of_scc,
                },
            );
            index_of_scc += 1;
        }
    }

    let mut main = main.unwrap_or(Statement::Sequence(Vec::new()));
    if t.config.profile {
        main = Statement::LogTimer {
            child: Box::new(main),
            message: log_statement::runtime(),
        };
    }
    t.ram.main = main;

    register_subroutines(t)?;
    Ok(())
}

/// Provenance subproof subroutines per clause, plus the incremental cleanup
/// subroutine. Component exit subroutines are registered during recursive
/// lowering.
fn register_subroutines(t: &mut Translator<'_>) -> Result<(), TranslatorError> {
    if t.config.provenance_enabled() {
        let relations = t.program.relations.clone();
        for rel in &relations {
            if rel.name.contains("@info") {
                continue;
            }
            for clause in &rel.clauses {
                if clause.body.is_empty() {
                    continue;
                }
                let label = format!("{}_{}_subproof", rel.name, clause.clause_num);
                let body = make_subproof_subroutine(t, clause)?;
                t.ram.add_subroutine(label, body);

                let label = format!("{}_{}_negation_subproof", rel.name, clause.clause_num);
                let body = make_negation_subproof_subroutine(t, clause)?;
                t.ram.add_subroutine(label, body);
            }
        }
    }

    if t.config.incremental {
        let body = make_incremental_cleanup_subroutine(t);
        t.ram.add_subroutine("incremental_cleanup", body);
    }
    Ok(())
}

fn check_annotation_columns(t: &Translator<'_>) -> Result<(), TranslatorError> {
    for rel in &t.program.relations {
        for column in ["@iteration", "@prev_count", "@current_count"] {
            if !rel.attributes.iter().any(|attr| attr.name == column) {
                return Err(TranslatorError::MissingAnnotationColumn {
                    relation: rel.name.clone(),
                    column: column.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_provenance_columns(t: &Translator<'_>) -> Result<(), TranslatorError> {
    for rel in &t.program.relations {
        if rel.arity() < 1 + rel.num_height_params {
            return Err(TranslatorError::MissingAnnotationColumn {
                relation: rel.name.clone(),
                column: "@rule_number".to_string(),
            });
        }
    }
    Ok(())
}

fn resolve_relations(
    t: &Translator<'_>,
    names: &[String],
) -> Result<Vec<Relation>, TranslatorError> {
    names
        .iter()
        .map(|name| {
            t.program
                .relation(name)
                .cloned()
                .ok_or_else(|| TranslatorError::UnknownRelation { name: name.clone() })
        })
        .collect()
}

fn make_load(
    t: &mut Translator<'_>,
    current: &mut Option<Statement>,
    rel: &Relation,
    dir: Option<&str>,
    ext: Option<&str>,
) {
    let file_path = dir.map(|_| t.config.output_dir.clone());
    let directives = input_directives(t, rel, file_path.as_deref(), ext);

    let target = if t.config.incremental {
        t.relation_ref(rel, AuxRole::DiffPlus)
    } else {
        t.relation_ref(rel, AuxRole::Base)
    };
    let mut statement = Statement::Load {
        relation: target,
        directives,
    };
    if t.config.profile {
        statement = Statement::LogRelationTimer {
            child: Box::new(statement),
            message: log_statement::t_relation_load_time(&rel.name, &rel.src_loc),
            relation: t.relation_ref(rel, AuxRole::Base),
        };
    }
    Statement::append(current, statement);
}

fn make_store(
    t: &mut Translator<'_>,
    current: &mut Option<Statement>,
    rel: &Relation,
    dir: Option<&str>,
    ext: Option<&str>,
) {
    let file_path = dir.map(|_| t.config.output_dir.clone());
    let directives = output_directives(t, rel, file_path.as_deref(), ext);

    let mut statement = Statement::Store {
        relation: t.relation_ref(rel, AuxRole::Base),
        directives,
    };
    if t.config.profile {
        statement = Statement::LogRelationTimer {
            child: Box::new(statement),
            message: log_statement::t_relation_save_time(&rel.name, &rel.src_loc),
            relation: t.relation_ref(rel, AuxRole::Base),
        };
    }
    Statement::append(current, statement);
}

/// The applied/count seeding merges used around component bodies (the same
/// schedule recursive components run in their preamble).
fn incremental_applied_merges(t: &mut Translator<'_>, rel: &Relation) -> Vec<Statement> {
    let base = t.relation_ref(rel, AuxRole::Base);
    let diff_minus = t.relation_ref(rel, AuxRole::DiffMinus);
    let diff_plus = t.relation_ref(rel, AuxRole::DiffPlus);
    let minus_applied = t.relation_ref(rel, AuxRole::DiffMinusApplied);
    let plus_applied = t.relation_ref(rel, AuxRole::DiffPlusApplied);
    let applied = t.relation_ref(rel, AuxRole::DiffApplied);
    let plus_count = t.relation_ref(rel, AuxRole::DiffPlusCount);
    let minus_count = t.relation_ref(rel, AuxRole::DiffMinusCount);

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
        merge(&plus_applied, &base),
        merge(&plus_applied, &diff_plus),
        merge(&minus_applied, &base),
        merge(&minus_applied, &diff_minus),
        merge(&applied, &base),
        merge(&applied, &diff_minus),
        merge(&applied, &diff_plus),
        merge(&plus_count, &diff_plus),
        semi(&plus_count, &minus_applied),
        merge(&minus_count, &diff_minus),
        semi(&minus_count, &plus_applied),
    ]
}
