//! Synthesis of load/store I/O directives.
//!
//! The translator does not perform I/O itself; it attaches key/value
//! directive maps to the emitted `Load`/`Store` statements which the I/O
//! subsystem interprets. Intermediate (inter-component staging) files always
//! use a tab delimiter and carry no headers.

use itertools::Itertools;

use crate::ast::Relation;
use crate::ram::IoDirectives;

use super::Translator;

fn make_io_directive(
    directive: &mut IoDirectives,
    rel: &Relation,
    file_path: &str,
    file_ext: &str,
    is_intermediate: bool,
) {
    directive.insert("name".to_string(), rel.name.clone());

    if !directive.contains_key("IO") {
        directive.insert("IO".to_string(), "file".to_string());
    }

    if directive.get("IO").map(String::as_str) == Some("file") {
        if is_intermediate {
            directive.insert("intermediate".to_string(), "true".to_string());
            directive.insert("delimiter".to_string(), "\t".to_string());
            directive.insert("headers".to_string(), "false".to_string());
        }

        if !directive.contains_key("filename") || is_intermediate {
            directive.insert("filename".to_string(), format!("{}{}", rel.name, file_ext));
        }

        let filename = directive["filename"].clone();
        if !filename.starts_with('/') {
            directive.insert("filename".to_string(), format!("{file_path}/{filename}"));
        }
    }
}

pub(crate) fn input_directives(
    t: &Translator<'_>,
    rel: &Relation,
    file_path: Option<&str>,
    file_ext: Option<&str>,
) -> Vec<IoDirectives> {
    let mut directives: Vec<IoDirectives> = rel.load_directives.clone();
    if directives.is_empty() {
        directives.push(IoDirectives::new());
    }

    let input_path = file_path.unwrap_or(&t.config.fact_dir).to_string();
    let input_ext = file_ext.unwrap_or(".facts").to_string();
    let is_intermediate = t.config.engine_enabled()
        && input_path == t.config.output_dir
        && input_ext == ".facts";

    for directive in &mut directives {
        make_io_directive(directive, rel, &input_path, &input_ext, is_intermediate);
    }
    directives
}

pub(crate) fn output_directives(
    t: &Translator<'_>,
    rel: &Relation,
    file_path: Option<&str>,
    file_ext: Option<&str>,
) -> Vec<IoDirectives> {
    let mut directives: Vec<IoDirectives> = Vec::new();

    // stdout was requested: ignore the directives from the source program
    if t.config.stdout_output() {
        let mut directive = IoDirectives::new();
        if rel.is_print_size {
            directive.insert("IO".to_string(), "stdoutprintsize".to_string());
        } else {
            directive.insert("IO".to_string(), "stdout".to_string());
            directive.insert("headers".to_string(), "true".to_string());
        }
        directives.push(directive);
    } else {
        directives = rel.store_directives.clone();
    }
    if directives.is_empty() {
        directives.push(IoDirectives::new());
    }

    let output_path = file_path.unwrap_or(&t.config.output_dir).to_string();
    let output_ext = file_ext.unwrap_or(".csv").to_string();
    let is_intermediate = t.config.engine_enabled()
        && output_path == t.config.output_dir
        && output_ext == ".facts";

    for directive in &mut directives {
        make_io_directive(directive, rel, &output_path, &output_ext, is_intermediate);

        if !directive.contains_key("attributeNames") {
            let delimiter = directive
                .get("delimiter")
                .cloned()
                .unwrap_or_else(|| "\t".to_string());
            let mut names: Vec<&str> =
                rel.attributes.iter().map(|attr| attr.name.as_str()).collect();
            if t.config.provenance_enabled() {
                names.truncate(rel.arity() - 1 - rel.num_height_params);
            }
            directive.insert("attributeNames".to_string(), names.iter().join(&delimiter));
        }
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyses;
    use crate::ast::{Attribute, Program};
    use crate::config::TranslatorConfig;

    #[test]
    fn default_input_directive_points_into_fact_dir() {
        let program = Program::default();
        let analyses = Analyses::default();
        let config = TranslatorConfig {
            fact_dir: "/facts".to_string(),
            ..Default::default()
        };
        let t = Translator::new(&program, &analyses, &config);

        let rel = Relation::new(
            "edge",
            vec![Attribute::new("a", "number"), Attribute::new("b", "number")],
        );
        let dirs = input_directives(&t, &rel, None, None);
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0]["IO"], "file");
        assert_eq!(dirs[0]["filename"], "/facts/edge.facts");
    }

    #[test]
    fn stdout_switches_output_io() {
        let program = Program::default();
        let analyses = Analyses::default();
        let config = TranslatorConfig {
            output_dir: "-".to_string(),
            ..Default::default()
        };
        let t = Translator::new(&program, &analyses, &config);

        let mut rel = Relation::new("path", vec![Attribute::new("a", "number")]);
        rel.is_output = true;
        let dirs = output_directives(&t, &rel, None, None);
        assert_eq!(dirs[0]["IO"], "stdout");
        assert_eq!(dirs[0]["headers"], "true");
        assert_eq!(dirs[0]["attributeNames"], "a");
    }
}
