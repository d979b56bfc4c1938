//! The provenance pre-transformer.
//!
//! Widens every relation by a rule-number column and a height column, and
//! annotates each clause: body atoms bind `@level_num_<i>` height variables,
//! the head records the firing clause number and a height one above the
//! maximum body height. The subproof subroutines synthesised later search
//! along exactly these columns.
//!
//! Only flat heights are attached here; subtree-height programs arrive
//! already annotated from upstream tooling.

use log::debug;

use crate::ast::{Argument, Attribute, FunctorOp, Program};

use super::{fold_functor, pad_head_nested, pad_nested_atoms};

/// Rewrites `program` in place, attaching one rule-number and one height
/// column to every relation.
pub fn apply(program: &mut Program) {
    for rel in &mut program.relations {
        rel.attributes
            .push(Attribute::new("@rule_number", "number"));
        rel.attributes.push(Attribute::new("@height", "number"));
        rel.num_height_params = 1;
    }

    for rel in &mut program.relations {
        for (clause_index, clause) in rel.clauses.iter_mut().enumerate() {
            clause.clause_num = clause_index + 1;
            pad_head_nested(&mut clause.head, 2);

            if clause.is_fact() {
                clause.head.args.push(Argument::Constant(clause_index as i64 + 1));
                clause.head.args.push(Argument::Constant(0));
                continue;
            }

            debug!("annotating clause for provenance: {clause}");

            let mut body_levels = Vec::new();
            for (i, lit) in clause.body.iter_mut().enumerate() {
                // annotation columns of checked-only atoms are wildcards
                pad_nested_atoms(lit, 2);

                if let crate::ast::Literal::Atom(atom) = lit {
                    let level = format!("@level_num_{i}");
                    atom.args.push(Argument::UnnamedVariable);
                    atom.args.push(Argument::var(&level));
                    body_levels.push(Argument::var(&level));
                }
            }

            clause.head.args.push(Argument::Constant(clause_index as i64 + 1));
            clause.head.args.push(Argument::IntrinsicFunctor {
                op: FunctorOp::Add,
                args: vec![
                    fold_functor(body_levels, FunctorOp::Max),
                    Argument::Constant(1),
                ],
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Atom, Clause, Literal, Relation};

    #[test]
    fn heads_record_rule_number_and_height() {
        let mut rel = Relation::new(
            "p",
            vec![Attribute::new("x", "number")],
        );
        rel.add_clause(Clause::new(
            Atom::new("p", vec![Argument::var("x")]),
            vec![Literal::Atom(Atom::new("q", vec![Argument::var("x")]))],
        ));
        let mut q = Relation::new("q", vec![Attribute::new("x", "number")]);
        q.is_input = true;

        let mut program = Program {
            relations: vec![rel, q],
            functors: vec![],
        };
        apply(&mut program);

        let p = program.relation("p").unwrap();
        assert_eq!(p.arity(), 3);
        assert_eq!(p.num_height_params, 1);

        let clause = &p.clauses[0];
        assert_eq!(clause.clause_num, 1);
        assert_eq!(clause.head.arity(), 3);
        assert_eq!(clause.head.args[1], Argument::Constant(1));

        // the body atom binds its height to a level variable
        let Literal::Atom(body) = &clause.body[0] else {
            panic!("expected a body atom");
        };
        assert_eq!(body.arity(), 3);
        assert_eq!(body.args[1], Argument::UnnamedVariable);
        assert_eq!(body.args[2], Argument::var("@level_num_0"));
    }
}
