//! The AST-to-RAM lowering core.
//!
//! [`Translator`] owns the program being built and provides the shared
//! lowering steps: relation-reference creation, value lowering and
//! constraint lowering. Clause, relation and component lowering live in the
//! submodules and drive these primitives.

mod clause;
mod driver;
mod io;
mod log_statement;
mod naming;
mod non_recursive;
mod recursive;
mod subroutine;
mod value_index;

pub use clause::ClauseTranslator;
pub use naming::{AuxRole, INCREMENTAL_ROLES, RECURSIVE_INCREMENTAL_ROLES};
pub use value_index::{Location, ValueIndex};

pub(crate) use driver::translate_program;

use crate::analysis::Analyses;
use crate::ast::{self, Argument, Atom, Clause, Literal, SrcLocation};
use crate::config::TranslatorConfig;
use crate::error::TranslatorError;
use crate::ram::{self, Condition, Expression, RamRelation, RelationRef};

/// Shared state of one translation run. Mutability is confined to the
/// program under construction and the source location of the clause
/// currently being lowered (used for diagnostics).
pub struct Translator<'a> {
    pub(crate) program: &'a ast::Program,
    pub(crate) analyses: &'a Analyses,
    pub(crate) config: &'a TranslatorConfig,
    pub(crate) ram: ram::Program,
    pub(crate) src_loc: SrcLocation,
}

impl<'a> Translator<'a> {
    pub fn new(
        program: &'a ast::Program,
        analyses: &'a Analyses,
        config: &'a TranslatorConfig,
    ) -> Self {
        Self {
            program,
            analyses,
            config,
            ram: ram::Program::new(),
            src_loc: SrcLocation::default(),
        }
    }

    pub fn into_ram(self) -> ram::Program {
        self.ram
    }

    /// Registers a relation record (idempotently) and hands out a borrow by
    /// name.
    pub(crate) fn create_relation_ref(&mut self, relation: RamRelation) -> RelationRef {
        let name = relation.name.clone();
        self.ram.add_relation(relation);
        RelationRef::new(name)
    }

    /// Reference to an auxiliary (or base) version of a declared relation,
    /// creating its record with full attribute metadata on first use.
    pub(crate) fn relation_ref(&mut self, rel: &ast::Relation, role: AuxRole) -> RelationRef {
        let mut record = RamRelation::new(role.apply(&rel.name), rel.arity(), rel.num_height_params);
        record.representation = rel.representation;
        for attr in &rel.attributes {
            record.attribute_names.push(attr.name.clone());
            record
                .attribute_types
                .push(self.analyses.type_env.qualifier(&attr.type_name));
        }
        self.create_relation_ref(record)
    }

    /// Reference for an atom. Atoms renamed to auxiliary relations resolve to
    /// the record created by the driver; unknown names get a bare record of
    /// the atom's arity.
    pub(crate) fn atom_ref(&mut self, atom: &Atom) -> RelationRef {
        if let Some(rel) = self.program.relation(&atom.name) {
            self.relation_ref(rel, AuxRole::Base)
        } else {
            let record = RamRelation::new(
                atom.name.clone(),
                atom.arity(),
                self.program.num_heights_of(&atom.name),
            );
            self.create_relation_ref(record)
        }
    }

    /// Lowers an argument expression against a value index (C3).
    pub(crate) fn translate_value(
        &mut self,
        arg: &Argument,
        index: &ValueIndex,
    ) -> Result<Expression, TranslatorError> {
        Ok(match arg {
            Argument::Variable(name) => {
                let loc = index.definition_point(name).ok_or_else(|| {
                    TranslatorError::UngroundedVariable {
                        name: name.clone(),
                        location: self.src_loc.clone(),
                    }
                })?;
                Expression::tuple(loc.level, loc.column)
            }
            Argument::UnnamedVariable => Expression::Undef,
            Argument::Constant(index) => Expression::Number(*index),
            Argument::IntrinsicFunctor { op, args } => Expression::Intrinsic {
                op: *op,
                args: self.translate_values(args, index)?,
            },
            Argument::UserFunctor { name, args } => {
                let decl = self.program.functor(name).ok_or_else(|| {
                    TranslatorError::UnknownFunctor { name: name.clone() }
                })?;
                Expression::UserDefined {
                    name: name.clone(),
                    return_type: decl.return_type.clone(),
                    args: self.translate_values(args, index)?,
                }
            }
            Argument::Counter => Expression::AutoIncrement,
            Argument::IterationNumber => Expression::IterationNumber,
            Argument::RecordInit(args) => {
                Expression::PackRecord(self.translate_values(args, index)?)
            }
            Argument::Aggregator(agg) => {
                let loc = index.aggregator_location(agg).ok_or_else(|| {
                    TranslatorError::UngroundedVariable {
                        name: agg.to_string(),
                        location: self.src_loc.clone(),
                    }
                })?;
                Expression::tuple(loc.level, loc.column)
            }
            Argument::SubroutineArg(number) => Expression::SubroutineArg(*number),
        })
    }

    fn translate_values(
        &mut self,
        args: &[Argument],
        index: &ValueIndex,
    ) -> Result<Vec<Expression>, TranslatorError> {
        args.iter()
            .map(|arg| self.translate_value(arg, index))
            .collect()
    }

    /// Lowers a body literal to a condition (C4); atoms yield `None` since
    /// their bindings are handled by the scan generation step.
    pub(crate) fn translate_constraint(
        &mut self,
        literal: &Literal,
        index: &ValueIndex,
    ) -> Result<Option<Condition>, TranslatorError> {
        Ok(match literal {
            Literal::Atom(_) => None,
            Literal::BinaryConstraint(op, lhs, rhs) => Some(Condition::constraint(
                *op,
                self.translate_value(lhs, index)?,
                self.translate_value(rhs, index)?,
            )),
            Literal::Conjunction(lhs, rhs) => {
                let lhs = self.translate_constraint(lhs, index)?.unwrap_or(Condition::True);
                let rhs = self.translate_constraint(rhs, index)?.unwrap_or(Condition::True);
                Some(lhs.and(rhs))
            }
            Literal::Disjunction(lhs, rhs) => {
                let lhs = self.translate_constraint(lhs, index)?.unwrap_or(Condition::True);
                let rhs = self.translate_constraint(rhs, index)?.unwrap_or(Condition::True);
                Some(Condition::Disjunction(Box::new(lhs), Box::new(rhs)))
            }
            Literal::Negation(atom) => {
                let heights = self.program.num_heights_of(&atom.name);
                let mut arity = atom.arity();
                if self.config.provenance_enabled() {
                    arity -= 1 + heights;
                }
                let mut values = self.translate_values(&atom.args[..arity], index)?;
                if self.config.provenance_enabled() {
                    for _ in 0..1 + heights {
                        values.push(Expression::Undef);
                    }
                }
                let relation = self.atom_ref(atom);
                if arity > 0 {
                    Some(Condition::ExistenceCheck { relation, values }.negate())
                } else {
                    Some(Condition::EmptinessCheck(relation))
                }
            }
            Literal::PositiveNegation(atom) => {
                let values = self.translate_values(&atom.args, index)?;
                let relation = self.atom_ref(atom);
                Some(Condition::PositiveExistenceCheck { relation, values }.negate())
            }
            Literal::ExistenceCheck(atom) => {
                let values = self.translate_values(&atom.args, index)?;
                let relation = self.atom_ref(atom);
                Some(Condition::PositiveExistenceCheck { relation, values })
            }
            Literal::SubsumptionNegation(atom, _) => {
                let values = self.translate_values(&atom.args, index)?;
                let relation = self.atom_ref(atom);
                Some(Condition::SubsumptionExistenceCheck { relation, values }.negate())
            }
        })
    }
}

/// Replaces unnamed variables in the positive atoms of a clause with fresh
/// named variables, so that specialised clones keep variable identity.
pub(crate) fn name_unnamed_variables(clause: &mut Clause) {
    let mut counter = 0;
    for lit in &mut clause.body {
        if let Literal::Atom(atom) = lit {
            atom.map_arguments(&mut |arg| match arg {
                Argument::UnnamedVariable => {
                    counter += 1;
                    Argument::Variable(format!(" _unnamed_var{counter}"))
                }
                other => other,
            });
        }
    }
}
