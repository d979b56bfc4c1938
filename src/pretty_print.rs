//! Pretty-printing of emitted RAM programs.
//!
//! Used for the `debug-report` dump and for log output while translating.
//! The format is a readable indented tree, not a parseable syntax.

use std::fmt::Write as _;

use itertools::Itertools;

use crate::ram::{Condition, Expression, Operation, Program, Statement};

pub fn format_expression(expr: &Expression) -> String {
    match expr {
        Expression::Number(n) => n.to_string(),
        Expression::TupleElement { level, column } => format!("t{level}.{column}"),
        Expression::Intrinsic { op, args } => {
            format!("({} {})", op, args.iter().map(format_expression).join(" "))
        }
        Expression::UserDefined { name, args, .. } => {
            format!("@{}({})", name, args.iter().map(format_expression).join(", "))
        }
        Expression::AutoIncrement => "autoinc()".to_string(),
        Expression::IterationNumber => "iteration()".to_string(),
        Expression::PackRecord(args) => {
            format!("[{}]", args.iter().map(format_expression).join(", "))
        }
        Expression::SubroutineArg(i) => format!("arg({i})"),
        Expression::Undef => "⊥".to_string(),
    }
}

pub fn format_condition(cond: &Condition) -> String {
    match cond {
        Condition::True => "true".to_string(),
        Condition::Conjunction(lhs, rhs) => {
            format!("({} ∧ {})", format_condition(lhs), format_condition(rhs))
        }
        Condition::Disjunction(lhs, rhs) => {
            format!("({} ∨ {})", format_condition(lhs), format_condition(rhs))
        }
        Condition::Negation(inner) => format!("¬{}", format_condition(inner)),
        Condition::Constraint { op, lhs, rhs } => {
            format!("{} {op} {}", format_expression(lhs), format_expression(rhs))
        }
        Condition::EmptinessCheck(rel) => format!("empty({rel})"),
        Condition::ExistenceCheck { relation, values } => format!(
            "({}) ∈ {relation}",
            values.iter().map(format_expression).join(", ")
        ),
        Condition::PositiveExistenceCheck { relation, values } => format!(
            "({}) ∈+ {relation}",
            values.iter().map(format_expression).join(", ")
        ),
        Condition::SubsumptionExistenceCheck { relation, values } => format!(
            "({}) ⊑ {relation}",
            values.iter().map(format_expression).join(", ")
        ),
        Condition::Subroutine { name, args } => format!(
            "call {name}({})",
            args.iter().map(format_expression).join(", ")
        ),
    }
}

fn write_operation(out: &mut String, op: &Operation, indent: usize) {
    let pad = " ".repeat(indent);
    match op {
        Operation::Scan {
            relation,
            level,
            child,
            ..
        } => {
            let _ = writeln!(out, "{pad}FOR t{level} IN {relation}");
            write_operation(out, child, indent + 1);
        }
        Operation::UnpackRecord {
            child,
            level,
            source,
            arity,
        } => {
            let _ = writeln!(
                out,
                "{pad}UNPACK t{level} ARITY {arity} FROM {}",
                format_expression(source)
            );
            write_operation(out, child, indent + 1);
        }
        Operation::Aggregate {
            child,
            function,
            relation,
            expression,
            condition,
            level,
        } => {
            let _ = writeln!(
                out,
                "{pad}t{level}.0 = {function:?} {} FOR {relation} WHERE {}",
                format_expression(expression),
                format_condition(condition)
            );
            write_operation(out, child, indent + 1);
        }
        Operation::Filter { condition, child } => {
            let _ = writeln!(out, "{pad}IF {}", format_condition(condition));
            write_operation(out, child, indent + 1);
        }
        Operation::Break { condition, child } => {
            let _ = writeln!(out, "{pad}BREAK IF {}", format_condition(condition));
            write_operation(out, child, indent + 1);
        }
        Operation::Project { relation, values } => {
            let _ = writeln!(
                out,
                "{pad}PROJECT ({}) INTO {relation}",
                values.iter().map(format_expression).join(", ")
            );
        }
        Operation::SubroutineReturn { values, terminate } => {
            let _ = writeln!(
                out,
                "{pad}RETURN ({}){}",
                values.iter().map(format_expression).join(", "),
                if *terminate { " NOW" } else { "" }
            );
        }
    }
}

fn write_statement(out: &mut String, stmt: &Statement, indent: usize) {
    let pad = " ".repeat(indent);
    match stmt {
        Statement::Sequence(stmts) => {
            for stmt in stmts {
                write_statement(out, stmt, indent);
            }
        }
        Statement::Parallel(stmts) => {
            let _ = writeln!(out, "{pad}PARALLEL");
            for stmt in stmts {
                write_statement(out, stmt, indent + 1);
            }
            let _ = writeln!(out, "{pad}END PARALLEL");
        }
        Statement::Loop {
            body,
            clear,
            exit,
            update,
        } => {
            let _ = writeln!(out, "{pad}LOOP");
            write_statement(out, clear, indent + 1);
            write_statement(out, body, indent + 1);
            write_statement(out, exit, indent + 1);
            write_statement(out, update, indent + 1);
            let _ = writeln!(out, "{pad}END LOOP");
        }
        Statement::Stratum { body, index } => {
            let _ = writeln!(out, "{pad}BEGIN STRATUM {index}");
            write_statement(out, body, indent + 1);
            let _ = writeln!(out, "{pad}END STRATUM {index}");
        }
        Statement::Create(rel) => {
            let _ = writeln!(out, "{pad}CREATE {rel}");
        }
        Statement::Drop(rel) => {
            let _ = writeln!(out, "{pad}DROP {rel}");
        }
        Statement::Clear(rel) => {
            let _ = writeln!(out, "{pad}CLEAR {rel}");
        }
        Statement::Merge { target, source } => {
            let _ = writeln!(out, "{pad}MERGE {target} ← {source}");
        }
        Statement::SemiMerge {
            target,
            source,
            restriction,
        } => match restriction {
            Some(restriction) => {
                let _ = writeln!(out, "{pad}SEMIMERGE {target} ← {source} ▷ {restriction}");
            }
            None => {
                let _ = writeln!(out, "{pad}SEMIMERGE {target} ← {source}");
            }
        },
        Statement::PositiveMerge { target, source } => {
            let _ = writeln!(out, "{pad}POSMERGE {target} ← {source}");
        }
        Statement::Swap { first, second } => {
            let _ = writeln!(out, "{pad}SWAP ({first}, {second})");
        }
        Statement::Load {
            relation,
            directives,
        } => {
            let _ = writeln!(out, "{pad}LOAD {relation} {}", format_directives(directives));
        }
        Statement::Store {
            relation,
            directives,
        } => {
            let _ = writeln!(out, "{pad}STORE {relation} {}", format_directives(directives));
        }
        Statement::Fact { relation, values } => {
            let _ = writeln!(
                out,
                "{pad}INSERT ({}) INTO {relation}",
                values.iter().map(format_expression).join(", ")
            );
        }
        Statement::Query(op) => {
            let _ = writeln!(out, "{pad}QUERY");
            write_operation(out, op, indent + 1);
        }
        Statement::Exit { condition, now } => {
            let _ = writeln!(
                out,
                "{pad}EXIT {}{}",
                format_condition(condition),
                if *now { "" } else { " (deferred)" }
            );
        }
        Statement::LogRelationTimer { child, message, .. } => {
            let _ = writeln!(out, "{pad}START_TIMER \"{message}\"");
            write_statement(out, child, indent + 1);
            let _ = writeln!(out, "{pad}END_TIMER");
        }
        Statement::LogSize { relation, message } => {
            let _ = writeln!(out, "{pad}LOGSIZE {relation} \"{message}\"");
        }
        Statement::LogTimer { child, message } => {
            let _ = writeln!(out, "{pad}START_TIMER \"{message}\"");
            write_statement(out, child, indent + 1);
            let _ = writeln!(out, "{pad}END_TIMER");
        }
        Statement::DebugInfo { child, message } => {
            let first_line = message.lines().next().unwrap_or("");
            let _ = writeln!(out, "{pad}BEGIN_DEBUG \"{first_line}\"");
            write_statement(out, child, indent + 1);
            let _ = writeln!(out, "{pad}END_DEBUG");
        }
    }
}

fn format_directives(directives: &[crate::ram::IoDirectives]) -> String {
    directives
        .iter()
        .map(|d| {
            format!(
                "{{{}}}",
                d.iter().map(|(k, v)| format!("{k}={v}")).join(", ")
            )
        })
        .join(" ")
}

/// Renders the whole program: declarations, the main statement tree, then
/// every subroutine in name order.
pub fn format_program(program: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PROGRAM");
    for rel in program.relations() {
        let _ = writeln!(
            out,
            " DECL {} ({})",
            rel.name,
            rel.attribute_names
                .iter()
                .zip(rel.attribute_types.iter())
                .map(|(n, t)| format!("{n}:{t}"))
                .join(", ")
        );
    }
    let _ = writeln!(out, " MAIN");
    write_statement(&mut out, &program.main, 2);
    for (name, body) in program.subroutines() {
        let _ = writeln!(out, " SUBROUTINE {name}");
        write_statement(&mut out, body, 2);
    }
    let _ = writeln!(out, "END PROGRAM");
    out
}

/// Wrapper for lazily pretty-printing a statement in log macros.
pub struct PrettyStatement<'a>(pub &'a Statement);

impl std::fmt::Display for PrettyStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut out = String::new();
        write_statement(&mut out, self.0, 0);
        f.write_str(&out)
    }
}

/// Wrapper for lazily pretty-printing a whole program in log macros.
pub struct PrettyProgram<'a>(pub &'a Program);

impl std::fmt::Display for PrettyProgram<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_program(self.0))
    }
}
