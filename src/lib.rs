//! Translator from a validated, typed Datalog AST to a RAM program.
//!
//! The translator consumes the AST together with precomputed analyses (SCC
//! graph and order, recursion oracle, expiry schedule, type environment) and
//! emits an imperative Relational Algebra Machine program: a tree of
//! statements and nested relational operations an executor can run to
//! compute, update and persist relations.
//!
//! Three evaluation regimes are supported and selected via
//! [`TranslatorConfig`]:
//!
//! - classical bottom-up semi-naive evaluation,
//! - provenance-annotated evaluation with subproof subroutines,
//! - incremental maintenance of materialised relations under fact additions
//!   and deletions, driven by diff relations with multiplicity annotations.
//!
//! Translation is a pure, deterministic tree transformation: the same AST
//! and configuration always produce a structurally identical program.

use log::debug;

pub mod analysis;
pub mod ast;
pub mod config;
pub mod error;
pub mod pretty_print;
pub mod ram;
pub mod transform;
pub mod translate;

pub use config::{ProvenanceMode, TranslatorConfig};
pub use error::TranslatorError;

use analysis::Analyses;

/// Translates a program into a RAM program.
///
/// The AST must already have been run through the provenance/incremental
/// pre-transformers matching the configuration; the translator fails fast on
/// missing annotation columns rather than attempting repair.
pub fn translate(
    program: &ast::Program,
    analyses: &Analyses,
    config: &TranslatorConfig,
) -> Result<ram::Program, TranslatorError> {
    let mut translator = translate::Translator::new(program, analyses, config);
    translate::translate_program(&mut translator)?;
    let ram = translator.into_ram();
    debug!(
        "translated {} relations into {} RAM relation records",
        program.relations.len(),
        ram.relations().count()
    );
    Ok(ram)
}

/// Translates a program and, when `debug-report` is configured, renders the
/// textual RAM dump alongside it.
pub fn translate_unit(
    program: &ast::Program,
    analyses: &Analyses,
    config: &TranslatorConfig,
) -> Result<ram::TranslationUnit, TranslatorError> {
    let ram = translate(program, analyses, config)?;
    let debug_report = config
        .debug_report
        .then(|| pretty_print::format_program(&ram));
    Ok(ram::TranslationUnit {
        program: ram,
        debug_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{RelationSchedule, Scc, SccGraph, SccOrder};
    use crate::ast::{Argument, Atom, Attribute, Clause, Literal, Program, Relation};

    fn single_rule_program() -> (Program, Analyses) {
        let mut q = Relation::new(
            "q",
            vec![Attribute::new("x", "number")],
        );
        q.is_input = true;

        let mut p = Relation::new("p", vec![Attribute::new("x", "number")]);
        p.is_output = true;
        p.add_clause(Clause::new(
            Atom::new("p", vec![Argument::var("x")]),
            vec![Literal::Atom(Atom::new("q", vec![Argument::var("x")]))],
        ));

        let program = Program {
            relations: vec![q, p],
            functors: vec![],
        };
        let analyses = Analyses {
            scc_graph: SccGraph::new(vec![
                Scc {
                    internal: vec!["q".to_string()],
                    ..Default::default()
                },
                Scc {
                    internal: vec!["p".to_string()],
                    ..Default::default()
                },
            ]),
            scc_order: SccOrder::new(vec![0, 1]),
            schedule: RelationSchedule::new(vec![vec![], vec![]]),
            ..Default::default()
        };
        (program, analyses)
    }

    #[test]
    fn translation_is_deterministic() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (program, analyses) = single_rule_program();
        let config = TranslatorConfig::default();

        let first = translate(&program, &analyses, &config).unwrap();
        let second = translate(&program, &analyses, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn debug_report_is_rendered_on_request() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (program, analyses) = single_rule_program();
        let config = TranslatorConfig {
            debug_report: true,
            ..Default::default()
        };

        let unit = translate_unit(&program, &analyses, &config).unwrap();
        let report = unit.debug_report.expect("report requested");
        assert!(report.contains("BEGIN STRATUM 0"));
        assert!(report.contains("PROJECT"));
    }
}
