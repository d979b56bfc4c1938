//! The incremental pre-transformer.
//!
//! Widens every relation by the `(@iteration, @prev_count, @current_count)`
//! annotation columns and replaces each rule with three instrumented
//! variants:
//!
//! - a *positive update* deriving tuples whose body counts went positive in
//!   the current epoch (head counts `(0, 1)`),
//! - a *negative update* retracting tuples with a body count at or below
//!   zero (head counts `(1, -1)`),
//! - a *re-generation* clause re-deriving tuples whose bodies are stable
//!   (head counts `(1, 1)`), picked up as reinsertions downstream.
//!
//! Facts keep their clause and are annotated `(0, 0, 1)`.

use log::debug;

use crate::analysis::Analyses;
use crate::ast::{Argument, Attribute, BinaryOp, Clause, FunctorOp, Literal, Program};

use super::{fold_functor, pad_head_nested, pad_nested_atoms};

const ANNOTATION_COLUMNS: usize = 3;

/// Rewrites `program` in place. `analyses` must describe the *input* program;
/// clause-index-keyed analyses have to be recomputed afterwards.
pub fn apply(program: &mut Program, analyses: &Analyses) {
    for rel in &mut program.relations {
        rel.attributes
            .push(Attribute::new("@iteration", "number"));
        rel.attributes
            .push(Attribute::new("@prev_count", "number"));
        rel.attributes
            .push(Attribute::new("@current_count", "number"));
    }

    let relation_names: Vec<String> =
        program.relations.iter().map(|rel| rel.name.clone()).collect();

    for rel_name in relation_names {
        let rel = program
            .relation(&rel_name)
            .expect("relation listed above")
            .clone();

        let mut new_clauses = Vec::new();
        for (clause_index, clause) in rel.clauses.iter().enumerate() {
            let mut clause = clause.clone();
            pad_head_nested(&mut clause.head, ANNOTATION_COLUMNS);

            if clause.is_fact() {
                clause.head.args.push(Argument::Constant(0));
                clause.head.args.push(Argument::Constant(0));
                clause.head.args.push(Argument::Constant(1));
                new_clauses.push(clause);
                continue;
            }

            let recursive = analyses
                .recursive_clauses
                .recursive(&rel_name, clause_index);

            debug!("instrumenting clause for incremental evaluation: {clause}");
            new_clauses.push(update_clause(&clause, analyses, recursive, UpdateSign::Negative));
            new_clauses.push(update_clause(&clause, analyses, recursive, UpdateSign::Positive));
            new_clauses.push(generation_clause(&clause, analyses, recursive));
        }

        program
            .relation_mut(&rel_name)
            .expect("relation listed above")
            .clauses = new_clauses;
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum UpdateSign {
    Positive,
    Negative,
}

struct InstrumentedBody {
    clause: Clause,
    body_levels: Vec<Argument>,
    body_previous_counts: Vec<Argument>,
    body_counts: Vec<Argument>,
}

/// Attaches the three annotation variables to every positive body atom and
/// pads all other atom occurrences with wildcards.
fn instrument_body(clause: &Clause, analyses: &Analyses, head_rel: &str) -> InstrumentedBody {
    let mut clause = clause.clone();
    let mut body_levels = Vec::new();
    let mut body_previous_counts = Vec::new();
    let mut body_counts = Vec::new();

    for (i, lit) in clause.body.iter_mut().enumerate() {
        pad_nested_atoms(lit, ANNOTATION_COLUMNS);

        if let Literal::Atom(atom) = lit {
            let iteration = format!("@iteration_{i}");
            let prev = format!("@prev_count_{i}");
            let cur = format!("@current_count_{i}");
            atom.args.push(Argument::var(&iteration));
            atom.args.push(Argument::var(&prev));
            atom.args.push(Argument::var(&cur));

            if analyses.scc_graph.in_same_scc(head_rel, &atom.name) {
                body_levels.push(Argument::var(&iteration));
            }
            body_previous_counts.push(Argument::var(&prev));
            body_counts.push(Argument::var(&cur));
        }
    }

    InstrumentedBody {
        clause,
        body_levels,
        body_previous_counts,
        body_counts,
    }
}

fn head_iteration(recursive: bool) -> Argument {
    if recursive {
        Argument::IterationNumber
    } else {
        Argument::Constant(0)
    }
}

/// The semi-naive simulation constraint: at least one in-component body atom
/// was derived in the previous iteration.
fn delta_simulation(body_levels: &[Argument]) -> Literal {
    Literal::BinaryConstraint(
        BinaryOp::Eq,
        fold_functor(body_levels.to_vec(), FunctorOp::Max),
        Argument::IntrinsicFunctor {
            op: FunctorOp::Sub,
            args: vec![Argument::IterationNumber, Argument::Constant(1)],
        },
    )
}

fn update_clause(
    clause: &Clause,
    analyses: &Analyses,
    recursive: bool,
    sign: UpdateSign,
) -> Clause {
    let instrumented = instrument_body(clause, analyses, &clause.head.name);
    let mut cl = instrumented.clause;

    cl.head.args.push(head_iteration(recursive));
    match sign {
        UpdateSign::Positive => {
            cl.head.args.push(Argument::Constant(0));
            cl.head.args.push(Argument::Constant(1));
        }
        UpdateSign::Negative => {
            cl.head.args.push(Argument::Constant(1));
            cl.head.args.push(Argument::Constant(-1));
        }
    }

    match sign {
        UpdateSign::Positive => {
            // every body tuple is currently present, and at least one of
            // them was absent in the previous epoch
            cl.add_to_body(Literal::BinaryConstraint(
                BinaryOp::Gt,
                fold_functor(instrumented.body_counts, FunctorOp::Min),
                Argument::Constant(0),
            ));
            if !instrumented.body_levels.is_empty() {
                cl.add_to_body(delta_simulation(&instrumented.body_levels));
            }
            cl.add_to_body(Literal::BinaryConstraint(
                BinaryOp::Le,
                fold_functor(instrumented.body_previous_counts, FunctorOp::Min),
                Argument::Constant(0),
            ));
        }
        UpdateSign::Negative => {
            // every body tuple existed before, and at least one of them is
            // now absent
            cl.add_to_body(Literal::BinaryConstraint(
                BinaryOp::Gt,
                fold_functor(instrumented.body_previous_counts, FunctorOp::Min),
                Argument::Constant(0),
            ));
            if !instrumented.body_levels.is_empty() {
                cl.add_to_body(delta_simulation(&instrumented.body_levels));
            }
            cl.add_to_body(Literal::BinaryConstraint(
                BinaryOp::Le,
                fold_functor(instrumented.body_counts, FunctorOp::Min),
                Argument::Constant(0),
            ));
        }
    }
    cl
}

/// The re-generation clause: all body tuples are stably present, so the head
/// tuple should exist with an unchanged count.
fn generation_clause(clause: &Clause, analyses: &Analyses, recursive: bool) -> Clause {
    let instrumented = instrument_body(clause, analyses, &clause.head.name);
    let mut cl = instrumented.clause;

    cl.head.args.push(head_iteration(recursive));
    cl.head.args.push(Argument::Constant(1));
    cl.head.args.push(Argument::Constant(1));

    cl.add_to_body(Literal::BinaryConstraint(
        BinaryOp::Gt,
        fold_functor(instrumented.body_counts, FunctorOp::Min),
        Argument::Constant(0),
    ));
    if !instrumented.body_levels.is_empty() {
        cl.add_to_body(delta_simulation(&instrumented.body_levels));
    }
    cl
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{RecursiveClauses, Scc, SccGraph};
    use crate::ast::{Atom, Relation};

    fn two_relation_program() -> (Program, Analyses) {
        let mut edge = Relation::new(
            "edge",
            vec![Attribute::new("a", "number"), Attribute::new("b", "number")],
        );
        edge.is_input = true;

        let mut path = Relation::new(
            "path",
            vec![Attribute::new("a", "number"), Attribute::new("b", "number")],
        );
        path.add_clause(Clause::new(
            Atom::new("path", vec![Argument::var("x"), Argument::var("y")]),
            vec![Literal::Atom(Atom::new(
                "edge",
                vec![Argument::var("x"), Argument::var("y")],
            ))],
        ));

        let program = Program {
            relations: vec![edge, path],
            functors: vec![],
        };

        let scc_graph = SccGraph::new(vec![
            Scc {
                internal: vec!["edge".to_string()],
                ..Default::default()
            },
            Scc {
                internal: vec!["path".to_string()],
                ..Default::default()
            },
        ]);
        let analyses = Analyses {
            scc_graph,
            recursive_clauses: RecursiveClauses::default(),
            ..Default::default()
        };
        (program, analyses)
    }

    #[test]
    fn relations_gain_annotation_columns() {
        let (mut program, analyses) = two_relation_program();
        apply(&mut program, &analyses);

        let edge = program.relation("edge").unwrap();
        assert_eq!(edge.arity(), 5);
        assert_eq!(edge.attributes[2].name, "@iteration");
        assert_eq!(edge.attributes[3].name, "@prev_count");
        assert_eq!(edge.attributes[4].name, "@current_count");
    }

    #[test]
    fn rules_split_into_three_variants() {
        let (mut program, analyses) = two_relation_program();
        apply(&mut program, &analyses);

        let path = program.relation("path").unwrap();
        assert_eq!(path.clauses.len(), 3);

        // negative update, positive update, re-generation, in that order
        let heads: Vec<(i64, i64)> = path
            .clauses
            .iter()
            .map(|cl| {
                let arity = cl.head.arity();
                match (&cl.head.args[arity - 2], &cl.head.args[arity - 1]) {
                    (Argument::Constant(prev), Argument::Constant(cur)) => (*prev, *cur),
                    other => panic!("expected constant counts, got {other:?}"),
                }
            })
            .collect();
        assert_eq!(heads, vec![(1, -1), (0, 1), (1, 1)]);

        // non-recursive heads carry iteration 0
        for cl in &path.clauses {
            let arity = cl.head.arity();
            assert_eq!(cl.head.args[arity - 3], Argument::Constant(0));
        }
    }
}
