//! End-to-end translation scenarios: shape checks for representative
//! programs and the quantified invariants every emitted program must hold
//! (name closure, arity closure, groundedness, determinism, loop shape).

use std::collections::BTreeSet;

use ram_translator::analysis::{
    Analyses, RecursiveClauses, RelationSchedule, Scc, SccGraph, SccOrder,
};
use ram_translator::ast::{
    AggregateOp, Aggregator, Argument, Atom, Attribute, BinaryOp, Clause, ExecutionPlan, Literal,
    Program, Relation,
};
use ram_translator::ram::{Condition, Expression, Operation, Statement};
use ram_translator::{transform, translate, TranslatorConfig};

fn var(name: &str) -> Argument {
    Argument::var(name)
}

fn binary_relation(name: &str) -> Relation {
    Relation::new(
        name,
        vec![Attribute::new("a", "number"), Attribute::new("b", "number")],
    )
}

fn unary_relation(name: &str) -> Relation {
    Relation::new(name, vec![Attribute::new("x", "number")])
}

/// `p(x) :- q(x).` with `q` an input and `p` an output.
fn single_rule_program() -> (Program, Analyses) {
    let mut q = unary_relation("q");
    q.is_input = true;

    let mut p = unary_relation("p");
    p.is_output = true;
    p.add_clause(Clause::new(
        Atom::new("p", vec![var("x")]),
        vec![Literal::Atom(Atom::new("q", vec![var("x")]))],
    ));

    let program = Program {
        relations: vec![q, p],
        functors: vec![],
    };
    let analyses = stratified_analyses(&[&["q"], &["p"]], &[]);
    (program, analyses)
}

/// `path(x,y) :- edge(x,y). path(x,z) :- path(x,y), edge(y,z).`
fn transitive_closure_program() -> (Program, Analyses) {
    let mut edge = binary_relation("edge");
    edge.is_input = true;

    let mut path = binary_relation("path");
    path.is_output = true;
    path.add_clause(Clause::new(
        Atom::new("path", vec![var("x"), var("y")]),
        vec![Literal::Atom(Atom::new("edge", vec![var("x"), var("y")]))],
    ));
    path.add_clause(Clause::new(
        Atom::new("path", vec![var("x"), var("z")]),
        vec![
            Literal::Atom(Atom::new("path", vec![var("x"), var("y")])),
            Literal::Atom(Atom::new("edge", vec![var("y"), var("z")])),
        ],
    ));

    let program = Program {
        relations: vec![edge, path],
        functors: vec![],
    };
    let analyses = stratified_analyses(&[&["edge"], &["path"]], &[("path", 1)]);
    (program, analyses)
}

/// Builds analyses for a program whose components are given in topological
/// order; `recursive` lists (relation, clause index) pairs of recursive
/// clauses, and any component containing one is marked recursive.
fn stratified_analyses(components: &[&[&str]], recursive: &[(&str, usize)]) -> Analyses {
    let sccs: Vec<Scc> = components
        .iter()
        .map(|names| Scc {
            internal: names.iter().map(|n| n.to_string()).collect(),
            recursive: names
                .iter()
                .any(|n| recursive.iter().any(|(rel, _)| rel == n)),
            ..Default::default()
        })
        .collect();

    let mut recursive_clauses = RecursiveClauses::default();
    for (rel, clause) in recursive {
        recursive_clauses.mark(rel, *clause);
    }

    Analyses {
        scc_graph: SccGraph::new(sccs),
        scc_order: SccOrder::new((0..components.len()).collect()),
        schedule: RelationSchedule::new(vec![Vec::new(); components.len()]),
        recursive_clauses,
        ..Default::default()
    }
}

// --- tree walkers ---

fn visit_statements<'a>(stmt: &'a Statement, f: &mut impl FnMut(&'a Statement)) {
    f(stmt);
    match stmt {
        Statement::Sequence(stmts) | Statement::Parallel(stmts) => {
            for stmt in stmts {
                visit_statements(stmt, f);
            }
        }
        Statement::Loop {
            body,
            clear,
            exit,
            update,
        } => {
            visit_statements(body, f);
            visit_statements(clear, f);
            visit_statements(exit, f);
            visit_statements(update, f);
        }
        Statement::Stratum { body, .. }
        | Statement::LogRelationTimer { child: body, .. }
        | Statement::LogTimer { child: body, .. }
        | Statement::DebugInfo { child: body, .. } => visit_statements(body, f),
        _ => {}
    }
}

fn visit_operations<'a>(op: &'a Operation, f: &mut impl FnMut(&'a Operation)) {
    f(op);
    match op {
        Operation::Scan { child, .. }
        | Operation::UnpackRecord { child, .. }
        | Operation::Aggregate { child, .. }
        | Operation::Filter { child, .. }
        | Operation::Break { child, .. } => visit_operations(child, f),
        _ => {}
    }
}

fn statement_refs(stmt: &Statement, refs: &mut BTreeSet<String>) {
    visit_statements(stmt, &mut |stmt| match stmt {
        Statement::Create(r) | Statement::Drop(r) | Statement::Clear(r) => {
            refs.insert(r.name.clone());
        }
        Statement::Merge { target, source } | Statement::PositiveMerge { target, source } => {
            refs.insert(target.name.clone());
            refs.insert(source.name.clone());
        }
        Statement::SemiMerge {
            target,
            source,
            restriction,
        } => {
            refs.insert(target.name.clone());
            refs.insert(source.name.clone());
            if let Some(r) = restriction {
                refs.insert(r.name.clone());
            }
        }
        Statement::Swap { first, second } => {
            refs.insert(first.name.clone());
            refs.insert(second.name.clone());
        }
        Statement::Load { relation, .. }
        | Statement::Store { relation, .. }
        | Statement::Fact { relation, .. }
        | Statement::LogRelationTimer { relation, .. }
        | Statement::LogSize { relation, .. } => {
            refs.insert(relation.name.clone());
        }
        Statement::Query(op) => visit_operations(op, &mut |op| match op {
            Operation::Scan { relation, .. }
            | Operation::Aggregate { relation, .. }
            | Operation::Project { relation, .. } => {
                refs.insert(relation.name.clone());
            }
            _ => {}
        }),
        Statement::Exit { condition, .. } => condition_refs(condition, refs),
        _ => {}
    });
    // conditions inside operations
    visit_statements(stmt, &mut |stmt| {
        if let Statement::Query(op) = stmt {
            visit_operations(op, &mut |op| match op {
                Operation::Filter { condition, .. }
                | Operation::Break { condition, .. }
                | Operation::Aggregate { condition, .. } => condition_refs(condition, refs),
                _ => {}
            });
        }
    });
}

fn condition_refs(cond: &Condition, refs: &mut BTreeSet<String>) {
    match cond {
        Condition::Conjunction(lhs, rhs) | Condition::Disjunction(lhs, rhs) => {
            condition_refs(lhs, refs);
            condition_refs(rhs, refs);
        }
        Condition::Negation(inner) => condition_refs(inner, refs),
        Condition::EmptinessCheck(r) => {
            refs.insert(r.name.clone());
        }
        Condition::ExistenceCheck { relation, .. }
        | Condition::PositiveExistenceCheck { relation, .. }
        | Condition::SubsumptionExistenceCheck { relation, .. } => {
            refs.insert(relation.name.clone());
        }
        _ => {}
    }
}

/// Checks that every tuple element references a level introduced by an
/// enclosing scan, unpack or aggregate.
fn check_groundedness(op: &Operation, mut levels: Vec<usize>) {
    match op {
        Operation::Scan {
            level,
            child,
            ..
        } => {
            levels.push(*level);
            check_groundedness(child, levels);
        }
        Operation::UnpackRecord {
            child,
            level,
            source,
            ..
        } => {
            expression_levels_in(source, &levels);
            levels.push(*level);
            check_groundedness(child, levels);
        }
        Operation::Aggregate {
            child,
            expression,
            condition,
            level,
            ..
        } => {
            levels.push(*level);
            expression_levels_in(expression, &levels);
            condition_levels_in(condition, &levels);
            check_groundedness(child, levels);
        }
        Operation::Filter { condition, child } | Operation::Break { condition, child } => {
            condition_levels_in(condition, &levels);
            check_groundedness(child, levels);
        }
        Operation::Project { values, .. } | Operation::SubroutineReturn { values, .. } => {
            for value in values {
                expression_levels_in(value, &levels);
            }
        }
    }
}

fn expression_levels_in(expr: &Expression, levels: &[usize]) {
    match expr {
        Expression::TupleElement { level, .. } => {
            assert!(
                levels.contains(level),
                "tuple element references level {level} not introduced by an ancestor ({levels:?})"
            );
        }
        Expression::Intrinsic { args, .. }
        | Expression::UserDefined { args, .. }
        | Expression::PackRecord(args) => {
            for arg in args {
                expression_levels_in(arg, levels);
            }
        }
        _ => {}
    }
}

fn condition_levels_in(cond: &Condition, levels: &[usize]) {
    match cond {
        Condition::Conjunction(lhs, rhs) | Condition::Disjunction(lhs, rhs) => {
            condition_levels_in(lhs, levels);
            condition_levels_in(rhs, levels);
        }
        Condition::Negation(inner) => condition_levels_in(inner, levels),
        Condition::Constraint { lhs, rhs, .. } => {
            expression_levels_in(lhs, levels);
            expression_levels_in(rhs, levels);
        }
        Condition::ExistenceCheck { values, .. }
        | Condition::PositiveExistenceCheck { values, .. }
        | Condition::SubsumptionExistenceCheck { values, .. }
        | Condition::Subroutine { args: values, .. } => {
            for value in values {
                expression_levels_in(value, levels);
            }
        }
        _ => {}
    }
}

fn assert_invariants(program: &ram_translator::ram::Program) {
    // name closure
    let mut refs = BTreeSet::new();
    statement_refs(&program.main, &mut refs);
    for (_, body) in program.subroutines() {
        statement_refs(body, &mut refs);
    }
    for name in &refs {
        assert!(
            program.relation(name).is_some(),
            "reference to undeclared relation `{name}`"
        );
    }

    // arity closure and groundedness
    let mut check_stmt = |stmt: &Statement| {
        if let Statement::Query(op) = stmt {
            check_groundedness(op, Vec::new());
            visit_operations(op, &mut |op| match op {
                Operation::Project { relation, values } => {
                    let rel = program.relation(&relation.name).unwrap();
                    assert_eq!(
                        values.len(),
                        rel.arity,
                        "projection into `{}` has wrong width",
                        relation.name
                    );
                }
                Operation::Filter { condition, .. }
                | Operation::Break { condition, .. }
                | Operation::Aggregate { condition, .. } => {
                    check_condition_arities(program, condition);
                }
                _ => {}
            });
        }
    };
    visit_statements(&program.main, &mut check_stmt);
    for (_, body) in program.subroutines() {
        visit_statements(body, &mut check_stmt);
    }
}

fn check_condition_arities(program: &ram_translator::ram::Program, cond: &Condition) {
    match cond {
        Condition::Conjunction(lhs, rhs) | Condition::Disjunction(lhs, rhs) => {
            check_condition_arities(program, lhs);
            check_condition_arities(program, rhs);
        }
        Condition::Negation(inner) => check_condition_arities(program, inner),
        Condition::ExistenceCheck { relation, values }
        | Condition::PositiveExistenceCheck { relation, values }
        | Condition::SubsumptionExistenceCheck { relation, values } => {
            let rel = program.relation(&relation.name).unwrap();
            assert_eq!(
                values.len(),
                rel.arity,
                "existence check on `{}` has wrong width",
                relation.name
            );
        }
        _ => {}
    }
}

fn queries_of(program: &ram_translator::ram::Program) -> Vec<&Operation> {
    let mut queries = Vec::new();
    visit_statements(&program.main, &mut |stmt| {
        if let Statement::Query(op) = stmt {
            queries.push(op);
        }
    });
    queries
}

// --- scenarios ---

#[test]
fn non_recursive_rule_lowers_to_scan_and_project() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (program, analyses) = single_rule_program();
    let ram = translate(&program, &analyses, &TranslatorConfig::default()).unwrap();
    assert_invariants(&ram);

    // exactly one query: the scan over q projecting into p
    let queries = queries_of(&ram);
    assert_eq!(queries.len(), 1);
    let Operation::Scan {
        relation,
        level,
        child,
        ..
    } = queries[0]
    else {
        panic!("expected an outer scan, got {:?}", queries[0]);
    };
    assert_eq!(relation.name, "q");
    assert_eq!(*level, 0);

    let Operation::Filter { condition, child } = child.as_ref() else {
        panic!("expected the emptiness short-circuit");
    };
    assert_eq!(
        *condition,
        Condition::EmptinessCheck(ram_translator::ram::RelationRef::new("q")).negate()
    );
    assert_eq!(
        **child,
        Operation::Project {
            relation: ram_translator::ram::RelationRef::new("p"),
            values: vec![Expression::tuple(0, 0)],
        }
    );

    // strata cover both components, and the output is stored
    let mut strata = Vec::new();
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Stratum { index, .. } = stmt {
            strata.push(*index);
        }
    });
    assert_eq!(strata, vec![0, 1]);

    let mut stored = Vec::new();
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Store { relation, .. } = stmt {
            stored.push(relation.name.clone());
        }
    });
    assert_eq!(stored, vec!["p"]);
}

#[test]
fn transitive_closure_emits_semi_naive_loop() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (program, analyses) = transitive_closure_program();
    let ram = translate(&program, &analyses, &TranslatorConfig::default()).unwrap();
    assert_invariants(&ram);

    let mut loops = Vec::new();
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Loop { .. } = stmt {
            loops.push(stmt);
        }
    });
    assert_eq!(loops.len(), 1, "exactly one fixpoint loop");

    let Statement::Loop { exit, update, .. } = loops[0] else {
        unreachable!()
    };

    // exit on the new table running dry
    assert_eq!(
        **exit,
        Statement::Exit {
            condition: Condition::EmptinessCheck(ram_translator::ram::RelationRef::new(
                "@new_path"
            )),
            now: true,
        }
    );

    // update tail: merge, swap, clear per relation
    let mut update_stmts = Vec::new();
    visit_statements(update, &mut |stmt| update_stmts.push(stmt.clone()));
    let tail: Vec<Statement> = update_stmts
        .into_iter()
        .filter(|s| {
            matches!(
                s,
                Statement::Merge { .. } | Statement::Swap { .. } | Statement::Clear(_)
            )
        })
        .collect();
    assert_eq!(
        tail,
        vec![
            Statement::Merge {
                target: ram_translator::ram::RelationRef::new("path"),
                source: ram_translator::ram::RelationRef::new("@new_path"),
            },
            Statement::Swap {
                first: ram_translator::ram::RelationRef::new("@delta_path"),
                second: ram_translator::ram::RelationRef::new("@new_path"),
            },
            Statement::Clear(ram_translator::ram::RelationRef::new("@new_path")),
        ]
    );

    // the recursive rule joins the delta against edge and anti-joins the head
    let scans: Vec<&str> = queries_of(&ram)
        .into_iter()
        .flat_map(|op| {
            let mut names = Vec::new();
            visit_operations(op, &mut |op| {
                if let Operation::Scan { relation, .. } = op {
                    names.push(relation.name.as_str());
                }
            });
            names
        })
        .collect();
    assert!(scans.contains(&"@delta_path"));

    // delta and new tables are dropped after the fixpoint
    let mut dropped = BTreeSet::new();
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Drop(rel) = stmt {
            dropped.insert(rel.name.clone());
        }
    });
    assert!(dropped.contains("@delta_path"));
    assert!(dropped.contains("@new_path"));
}

#[test]
fn incremental_transitive_closure_splits_rules_and_conjoins_exit_subroutine() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut program, analyses) = transitive_closure_program();
    transform::incremental::apply(&mut program, &analyses);

    // the transform rewrites each rule into three variants; refresh the
    // recursion oracle for the new clause list
    let mut recursive = RecursiveClauses::default();
    for index in 0..program.relation("path").unwrap().clauses.len() {
        let clause = &program.relation("path").unwrap().clauses[index];
        let has_path_atom = clause.atoms().iter().any(|a| a.name == "path");
        if has_path_atom {
            recursive.mark("path", index);
        }
    }
    let analyses = Analyses {
        recursive_clauses: recursive,
        ..analyses
    };

    let config = TranslatorConfig {
        incremental: true,
        ..Default::default()
    };
    let ram = translate(&program, &analyses, &config).unwrap();
    assert_invariants(&ram);

    // heads carry the three annotation columns
    assert_eq!(ram.relation("path").unwrap().arity, 5);
    assert_eq!(ram.relation("diff_plus@_path").unwrap().arity, 5);

    // the loop exit conjoins the component exit subroutine on the iteration
    let mut found_exit_sub = false;
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Loop { exit, .. } = stmt {
            let Statement::Exit { condition, .. } = exit.as_ref() else {
                panic!("loop exit must be an Exit statement");
            };
            let mut conds: Vec<&Condition> = vec![condition];
            let mut has_sub = false;
            while let Some(cond) = conds.pop() {
                match cond {
                    Condition::Conjunction(lhs, rhs) => {
                        conds.push(lhs.as_ref());
                        conds.push(rhs.as_ref());
                    }
                    Condition::Subroutine { name, args } => {
                        assert_eq!(name, "scc_1_exit");
                        assert_eq!(args, &vec![Expression::IterationNumber]);
                        has_sub = true;
                    }
                    _ => {}
                }
            }
            found_exit_sub = has_sub;
        }
    });
    assert!(found_exit_sub, "incremental loop consults the exit subroutine");

    assert!(ram.subroutine("scc_1_exit").is_some());
    assert!(ram.subroutine("incremental_cleanup").is_some());

    // inputs are loaded into the diff-plus table
    let mut loads = Vec::new();
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Load { relation, .. } = stmt {
            loads.push(relation.name.clone());
        }
    });
    assert_eq!(loads, vec!["diff_plus@_edge"]);

    // rule bodies were specialised against the delta diff tables
    let mut scanned = BTreeSet::new();
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Query(op) = stmt {
            visit_operations(op, &mut |op| {
                if let Operation::Scan { relation, .. } = op {
                    scanned.insert(relation.name.clone());
                }
            });
        }
    });
    assert!(scanned.iter().any(|name| name.starts_with("@delta_diff_")));
}

#[test]
fn negated_atom_becomes_existence_check() {
    let _ = env_logger::builder().is_test(true).try_init();
    // p(x) :- q(x), !r(x).
    let mut q = unary_relation("q");
    q.is_input = true;
    let mut r = unary_relation("r");
    r.is_input = true;
    let mut p = unary_relation("p");
    p.is_output = true;
    p.add_clause(Clause::new(
        Atom::new("p", vec![var("x")]),
        vec![
            Literal::Atom(Atom::new("q", vec![var("x")])),
            Literal::Negation(Atom::new("r", vec![var("x")])),
        ],
    ));

    let program = Program {
        relations: vec![q, r, p],
        functors: vec![],
    };
    let analyses = stratified_analyses(&[&["q"], &["r"], &["p"]], &[]);
    let ram = translate(&program, &analyses, &TranslatorConfig::default()).unwrap();
    assert_invariants(&ram);

    let mut found = false;
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Query(op) = stmt {
            visit_operations(op, &mut |op| {
                if let Operation::Filter { condition, .. } = op {
                    if let Condition::Negation(inner) = condition {
                        if let Condition::ExistenceCheck { relation, values } = inner.as_ref() {
                            assert_eq!(relation.name, "r");
                            assert_eq!(values, &vec![Expression::tuple(0, 0)]);
                            found = true;
                        }
                    }
                }
            });
        }
    });
    assert!(found, "negation lowers to a negated existence check");
}

#[test]
fn count_aggregate_nests_inside_the_outer_scan() {
    let _ = env_logger::builder().is_test(true).try_init();
    // p(x) :- q(x, _), count : { r(x, _) } > 0.
    let mut q = binary_relation("q");
    q.is_input = true;
    let mut r = binary_relation("r");
    r.is_input = true;
    let mut p = unary_relation("p");
    p.is_output = true;

    let aggregator = Aggregator {
        op: AggregateOp::Count,
        target: None,
        body: vec![Literal::Atom(Atom::new(
            "r",
            vec![var("x"), Argument::UnnamedVariable],
        ))],
    };
    p.add_clause(Clause::new(
        Atom::new("p", vec![var("x")]),
        vec![
            Literal::Atom(Atom::new("q", vec![var("x"), Argument::UnnamedVariable])),
            Literal::BinaryConstraint(
                BinaryOp::Gt,
                Argument::Aggregator(Box::new(aggregator)),
                Argument::Constant(0),
            ),
        ],
    ));

    let program = Program {
        relations: vec![q, r, p],
        functors: vec![],
    };
    let analyses = stratified_analyses(&[&["q"], &["r"], &["p"]], &[]);
    let ram = translate(&program, &analyses, &TranslatorConfig::default()).unwrap();
    assert_invariants(&ram);

    // outer scan on q, aggregate on r at level 1, and the guard comparing
    // the aggregate result against zero
    let queries = queries_of(&ram);
    assert_eq!(queries.len(), 1);

    let mut aggregate_seen = false;
    let mut guard_seen = false;
    visit_operations(queries[0], &mut |op| match op {
        Operation::Aggregate {
            function,
            relation,
            expression,
            level,
            ..
        } => {
            assert_eq!(format!("{function:?}"), "Count");
            assert_eq!(relation.name, "r");
            assert_eq!(*expression, Expression::Undef);
            assert_eq!(*level, 1);
            aggregate_seen = true;
        }
        Operation::Filter { condition, .. } => {
            if let Condition::Constraint {
                op: BinaryOp::Gt,
                lhs,
                rhs,
            } = condition
            {
                assert_eq!(*lhs, Expression::tuple(1, 0));
                assert_eq!(*rhs, Expression::Number(0));
                guard_seen = true;
            }
        }
        _ => {}
    });
    assert!(aggregate_seen);
    assert!(guard_seen);
}

#[test]
fn aggregate_without_constraints_gets_true_condition() {
    let _ = env_logger::builder().is_test(true).try_init();
    // p(x) :- q(x, _), count : { r(_, _) } > 0.  nothing binds the aggregate
    let mut q = binary_relation("q");
    q.is_input = true;
    let mut r = binary_relation("r");
    r.is_input = true;
    let mut p = unary_relation("p");
    p.is_output = true;

    let aggregator = Aggregator {
        op: AggregateOp::Count,
        target: None,
        body: vec![Literal::Atom(Atom::new(
            "r",
            vec![Argument::UnnamedVariable, Argument::UnnamedVariable],
        ))],
    };
    p.add_clause(Clause::new(
        Atom::new("p", vec![var("x")]),
        vec![
            Literal::Atom(Atom::new("q", vec![var("x"), Argument::UnnamedVariable])),
            Literal::BinaryConstraint(
                BinaryOp::Gt,
                Argument::Aggregator(Box::new(aggregator)),
                Argument::Constant(0),
            ),
        ],
    ));

    let program = Program {
        relations: vec![q, r, p],
        functors: vec![],
    };
    let analyses = stratified_analyses(&[&["q"], &["r"], &["p"]], &[]);
    let ram = translate(&program, &analyses, &TranslatorConfig::default()).unwrap();

    let mut condition = None;
    visit_statements(&ram.main, &mut |stmt| {
        if let Statement::Query(op) = stmt {
            visit_operations(op, &mut |op| {
                if let Operation::Aggregate { condition: c, .. } = op {
                    condition = Some(c.clone());
                }
            });
        }
    });
    assert_eq!(condition, Some(Condition::True));
}

#[test]
fn nullary_head_is_guarded_and_breaks_the_scan() {
    let _ = env_logger::builder().is_test(true).try_init();
    // p() :- q(x).
    let mut q = unary_relation("q");
    q.is_input = true;
    let mut p = Relation::new("p", vec![]);
    p.is_output = true;
    p.add_clause(Clause::new(
        Atom::new("p", vec![]),
        vec![Literal::Atom(Atom::new("q", vec![var("x")]))],
    ));

    let program = Program {
        relations: vec![q, p],
        functors: vec![],
    };
    let analyses = stratified_analyses(&[&["q"], &["p"]], &[]);
    let ram = translate(&program, &analyses, &TranslatorConfig::default()).unwrap();
    assert_invariants(&ram);

    let queries = queries_of(&ram);
    assert_eq!(queries.len(), 1);

    // outermost: the idempotence guard on the head
    let Operation::Filter { condition, child } = queries[0] else {
        panic!("expected the head guard, got {:?}", queries[0]);
    };
    assert_eq!(
        *condition,
        Condition::EmptinessCheck(ram_translator::ram::RelationRef::new("p"))
    );
    assert!(matches!(child.as_ref(), Operation::Scan { .. }));

    // a break once the head fired, and an empty projection
    let mut break_seen = false;
    let mut project_seen = false;
    visit_operations(queries[0], &mut |op| match op {
        Operation::Break { condition, .. } => {
            assert_eq!(
                *condition,
                Condition::EmptinessCheck(ram_translator::ram::RelationRef::new("p")).negate()
            );
            break_seen = true;
        }
        Operation::Project { relation, values } => {
            assert_eq!(relation.name, "p");
            assert!(values.is_empty());
            project_seen = true;
        }
        _ => {}
    });
    assert!(break_seen);
    assert!(project_seen);
}

#[test]
fn fully_unnamed_atom_skips_its_scan() {
    let _ = env_logger::builder().is_test(true).try_init();
    // p() :- q(_, _).  arity > 0 but no binding: only the emptiness filter
    let mut q = binary_relation("q");
    q.is_input = true;
    let mut p = Relation::new("p", vec![]);
    p.is_output = true;
    p.add_clause(Clause::new(
        Atom::new("p", vec![]),
        vec![Literal::Atom(Atom::new(
            "q",
            vec![Argument::UnnamedVariable, Argument::UnnamedVariable],
        ))],
    ));

    let program = Program {
        relations: vec![q, p],
        functors: vec![],
    };
    let analyses = stratified_analyses(&[&["q"], &["p"]], &[]);
    let ram = translate(&program, &analyses, &TranslatorConfig::default()).unwrap();
    assert_invariants(&ram);

    let queries = queries_of(&ram);
    assert_eq!(queries.len(), 1);
    let mut scans = 0;
    visit_operations(queries[0], &mut |op| {
        if matches!(op, Operation::Scan { .. }) {
            scans += 1;
        }
    });
    assert_eq!(scans, 0, "an all-wildcard atom must not open a scan");
}

#[test]
fn execution_plan_reorders_atoms() {
    let _ = env_logger::builder().is_test(true).try_init();
    // p(x, z) :- q(x, y), r(y, z). with plan [2, 1]: scan r first
    let mut q = binary_relation("q");
    q.is_input = true;
    let mut r = binary_relation("r");
    r.is_input = true;
    let mut p = binary_relation("p");
    p.is_output = true;

    let mut clause = Clause::new(
        Atom::new("p", vec![var("x"), var("z")]),
        vec![
            Literal::Atom(Atom::new("q", vec![var("x"), var("y")])),
            Literal::Atom(Atom::new("r", vec![var("y"), var("z")])),
        ],
    );
    clause.execution_plan = Some(ExecutionPlan::default().with_order(0, vec![2, 1]));
    p.add_clause(clause);

    let program = Program {
        relations: vec![q, r, p],
        functors: vec![],
    };
    let analyses = stratified_analyses(&[&["q"], &["r"], &["p"]], &[]);
    let ram = translate(&program, &analyses, &TranslatorConfig::default()).unwrap();
    assert_invariants(&ram);

    let queries = queries_of(&ram);
    assert_eq!(queries.len(), 1);
    let Operation::Scan { relation, .. } = queries[0] else {
        panic!("expected an outer scan");
    };
    assert_eq!(relation.name, "r", "the plan puts r at the first position");
}

#[test]
fn provenance_registers_subproof_subroutines() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut program, analyses) = single_rule_program();
    transform::provenance::apply(&mut program);

    let config = TranslatorConfig {
        provenance: Some(ram_translator::ProvenanceMode::Explain),
        ..Default::default()
    };
    let ram = translate(&program, &analyses, &config).unwrap();
    assert_invariants(&ram);

    let sub = ram.subroutine("p_1_subproof").expect("subproof registered");
    let mut returns = 0;
    visit_statements(sub, &mut |stmt| {
        if let Statement::Query(op) = stmt {
            visit_operations(op, &mut |op| {
                if matches!(op, Operation::SubroutineReturn { .. }) {
                    returns += 1;
                }
            });
        }
    });
    assert!(returns > 0, "subproof returns the witnessing body values");

    assert!(ram.subroutine("p_1_negation_subproof").is_some());

    // negation-free program: heads carry rule number and height
    assert_eq!(ram.relation("p").unwrap().arity, 3);
}

#[test]
fn incremental_cleanup_resets_counts() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (mut program, analyses) = single_rule_program();
    transform::incremental::apply(&mut program, &analyses);

    let config = TranslatorConfig {
        incremental: true,
        ..Default::default()
    };
    let ram = translate(&program, &analyses, &config).unwrap();
    assert_invariants(&ram);

    let cleanup = ram.subroutine("incremental_cleanup").unwrap();

    // every base relation is rewritten in place with counts (-1, -1)
    let mut resets = 0;
    visit_statements(cleanup, &mut |stmt| {
        if let Statement::Query(op) = stmt {
            visit_operations(op, &mut |op| {
                if let Operation::Project { values, .. } = op {
                    let n = values.len();
                    assert_eq!(values[n - 2], Expression::Number(-1));
                    assert_eq!(values[n - 1], Expression::Number(-1));
                    resets += 1;
                }
            });
        }
    });
    assert_eq!(resets, 2, "one reset per relation");

    // all seven auxiliaries of each relation are cleared
    let mut cleared = BTreeSet::new();
    visit_statements(cleanup, &mut |stmt| {
        if let Statement::Clear(rel) = stmt {
            cleared.insert(rel.name.clone());
        }
    });
    for prefix in [
        "diff_plus@_",
        "diff_minus@_",
        "diff_plus_count@_",
        "diff_minus_count@_",
        "diff_plus_applied@_",
        "diff_minus_applied@_",
        "diff_applied@_",
    ] {
        assert!(cleared.contains(&format!("{prefix}q")));
        assert!(cleared.contains(&format!("{prefix}p")));
    }
}

#[test]
fn translation_is_deterministic_across_configs() {
    let _ = env_logger::builder().is_test(true).try_init();
    for config in [
        TranslatorConfig::default(),
        TranslatorConfig {
            profile: true,
            ..Default::default()
        },
    ] {
        let (program, analyses) = transitive_closure_program();
        let first = translate(&program, &analyses, &config).unwrap();
        let second = translate(&program, &analyses, &config).unwrap();
        assert_eq!(first, second);
    }
}
