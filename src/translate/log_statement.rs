//! Profile log message construction.
//!
//! The emitted log statements carry semicolon-delimited keys the profiler
//! parses back out of the execution log; the key alphabet is fixed.

use crate::ast::SrcLocation;

fn stringify(text: &str) -> String {
    text.replace('\n', " ").replace(';', ",")
}

pub fn t_nonrecursive_rule(relation: &str, loc: &SrcLocation, clause: &str) -> String {
    format!("@t-nonrecursive-rule;{relation};{loc};{};", stringify(clause))
}

pub fn t_nonrecursive_relation(relation: &str, loc: &SrcLocation) -> String {
    format!("@t-nonrecursive-relation;{relation};{loc};")
}

pub fn n_nonrecursive_relation(relation: &str, loc: &SrcLocation) -> String {
    format!("@n-nonrecursive-relation;{relation};{loc};")
}

pub fn t_recursive_rule(relation: &str, version: usize, loc: &SrcLocation, clause: &str) -> String {
    format!(
        "@t-recursive-rule;{relation};{version};{loc};{};",
        stringify(clause)
    )
}

pub fn t_recursive_relation(relation: &str, loc: &SrcLocation) -> String {
    format!("@t-recursive-relation;{relation};{loc};")
}

pub fn c_recursive_relation(relation: &str, loc: &SrcLocation) -> String {
    format!("@c-recursive-relation;{relation};{loc};")
}

pub fn t_relation_load_time(relation: &str, loc: &SrcLocation) -> String {
    format!("@t-relation-load-time;{relation};{loc};")
}

pub fn t_relation_save_time(relation: &str, loc: &SrcLocation) -> String {
    format!("@t-relation-save-time;{relation};{loc};")
}

pub fn runtime() -> String {
    "@runtime;".to_string()
}
