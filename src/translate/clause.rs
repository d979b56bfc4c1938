//! Clause lowering: one Horn clause becomes one RAM query.
//!
//! The query is assembled inside out. The innermost operation projects into
//! the head (or returns body values for provenance subroutines); equivalence
//! filters, body constraints and aggregates wrap it; finally the body atoms
//! are peeled off the nesting stack bottom-up, each contributing its filters
//! and a scan or record-unpack level.

use log::trace;

use crate::ast::{AggregateOp, Argument, Atom, BinaryOp, Clause, Literal};
use crate::error::TranslatorError;
use crate::ram::{AggregateFunction, Condition, Expression, Operation, Statement};

use super::value_index::{Location, ValueIndex};
use super::Translator;

enum Nesting {
    Atom { atom: Atom, level: usize },
    Record {
        args: Vec<Argument>,
        level: usize,
        def: Location,
    },
}

/// Translates a single clause. A fresh translator is used per clause; the
/// value index lives exactly as long as this struct.
pub struct ClauseTranslator<'a, 't> {
    t: &'t mut Translator<'a>,
    value_index: ValueIndex,
    level: usize,
    op_nesting: Vec<Nesting>,
    aggregators: Vec<crate::ast::Aggregator>,
    provenance_return: bool,
}

impl<'a, 't> ClauseTranslator<'a, 't> {
    pub fn new(translator: &'t mut Translator<'a>) -> Self {
        Self {
            t: translator,
            value_index: ValueIndex::new(),
            level: 0,
            op_nesting: Vec::new(),
            aggregators: Vec::new(),
            provenance_return: false,
        }
    }

    /// Variant used for provenance subroutines: the innermost operation
    /// returns the bound body values instead of projecting into the head.
    pub fn provenance(translator: &'t mut Translator<'a>) -> Self {
        let mut ct = Self::new(translator);
        ct.provenance_return = true;
        ct
    }

    /// Generates RAM for a clause. `original` is the clause as written by
    /// the user (used for log messages and the head stop condition);
    /// `version` selects a user-supplied execution plan order, if any.
    pub fn translate_clause(
        mut self,
        clause: &Clause,
        original: &Clause,
        version: usize,
    ) -> Result<Statement, TranslatorError> {
        self.t.src_loc = clause.src_loc.clone();

        if let Some(reordered) = reordered_clause(clause, version)? {
            trace!("applying execution plan for version {version}: {reordered}");
            return ClauseTranslator {
                t: self.t,
                value_index: ValueIndex::new(),
                level: 0,
                op_nesting: Vec::new(),
                aggregators: Vec::new(),
                provenance_return: self.provenance_return,
            }
            .translate_clause(&reordered, original, version);
        }

        if clause.is_fact() {
            let empty = ValueIndex::new();
            let values = clause
                .head
                .args
                .iter()
                .map(|arg| self.t.translate_value(arg, &empty))
                .collect::<Result<Vec<_>, _>>()?;
            let relation = self.t.atom_ref(&clause.head);
            return Ok(Statement::Fact { relation, values });
        }

        self.create_value_index(clause);

        let mut op = self.create_operation(clause)?;

        // equivalence constraints imposed by repeated variables
        let mut equivalences = Vec::new();
        for (_, locs) in self.value_index.variable_references() {
            let first = locs[0];
            for &loc in locs {
                if loc != first && !self.value_index.is_aggregator(loc.level) {
                    equivalences.push((first, loc));
                }
            }
        }
        for (first, loc) in equivalences {
            op = Operation::filtered(
                Condition::constraint(
                    BinaryOp::Eq,
                    Expression::tuple(first.level, first.column),
                    Expression::tuple(loc.level, loc.column),
                ),
                op,
            );
        }

        // conditions contributed by negations and constraints
        for lit in &clause.body {
            if let Some(cond) = self.t.translate_constraint(lit, &self.value_index)? {
                op = Operation::filtered(cond, op);
            }
        }

        // bind aggregate results that occur as atom arguments
        let mut agg_filters = Vec::new();
        for nesting in self.op_nesting.iter().rev() {
            if let Nesting::Atom { atom, level } = nesting {
                for (pos, arg) in atom.args.iter().enumerate() {
                    if let Argument::Aggregator(agg) = arg {
                        if let Some(loc) = self.value_index.aggregator_location(agg) {
                            agg_filters.push((*level, pos, loc));
                        }
                    }
                }
            }
        }
        for (level, pos, loc) in agg_filters {
            op = Operation::filtered(
                Condition::constraint(
                    BinaryOp::Eq,
                    Expression::tuple(level, pos),
                    Expression::tuple(loc.level, loc.column),
                ),
                op,
            );
        }

        op = self.wrap_aggregates(clause, op)?;
        op = self.wrap_scans(clause, original, version, op)?;

        // stopping criterion for nullary heads: the null tuple is derived at
        // most once
        if !self.provenance_return && original.head.arity() == 0 {
            let head_ref = self.t.atom_ref(&original.head);
            op = Operation::filtered(Condition::EmptinessCheck(head_ref), op);
        }

        Ok(Statement::Query(op))
    }

    /// Assigns a nesting level to every body atom and nested record, then to
    /// every distinct aggregator, recording all variable positions.
    fn create_value_index(&mut self, clause: &Clause) {
        for atom in clause.atoms() {
            let atom_level = self.level;
            self.level += 1;
            self.op_nesting.push(Nesting::Atom {
                atom: atom.clone(),
                level: atom_level,
            });
            self.index_values(atom_level, &atom.args);
        }

        let mut found: Vec<crate::ast::Aggregator> = Vec::new();
        visit_aggregators_post_order(clause, &mut |agg| {
            if !found.iter().any(|a| a == agg) {
                found.push(agg.clone());
            }
        });
        for agg in found {
            let agg_level = self.level;
            self.level += 1;
            self.value_index
                .set_aggregator_location(agg.clone(), Location::new(agg_level, 0));

            // variables of the aggregate's atom are bound at this level
            if let Some(atom) = agg.atom() {
                for (pos, arg) in atom.args.iter().enumerate() {
                    if let Argument::Variable(name) = arg {
                        self.value_index.add_var_ref(name, Location::new(agg_level, pos));
                    }
                }
            }
            self.aggregators.push(agg);
        }
    }

    fn index_values(&mut self, level: usize, args: &[Argument]) {
        for (pos, arg) in args.iter().enumerate() {
            match arg {
                Argument::Variable(name) => {
                    self.value_index.add_var_ref(name, Location::new(level, pos));
                }
                Argument::RecordInit(rec_args) => {
                    let rec_level = self.level;
                    self.level += 1;
                    let def = Location::new(level, pos);
                    self.value_index.set_record_definition(arg.clone(), def);
                    self.op_nesting.push(Nesting::Record {
                        args: rec_args.clone(),
                        level: rec_level,
                        def,
                    });
                    self.index_values(rec_level, rec_args);
                }
                _ => {}
            }
        }
    }

    /// The innermost operation: a projection into the head, guarded for
    /// nullary heads and (in interpreted provenance mode) by a dedup filter
    /// on the original columns. The provenance variant returns the bound
    /// body values instead.
    fn create_operation(&mut self, clause: &Clause) -> Result<Operation, TranslatorError> {
        if self.provenance_return {
            return self.create_return_operation(clause);
        }

        let head = &clause.head;
        let values = head
            .args
            .iter()
            .map(|arg| self.t.translate_value(arg, &self.value_index))
            .collect::<Result<Vec<_>, _>>()?;
        let head_ref = self.t.atom_ref(head);
        let mut op = Operation::Project {
            relation: head_ref.clone(),
            values,
        };

        if head.arity() == 0 {
            op = Operation::filtered(Condition::EmptinessCheck(head_ref.clone()), op);
        }

        // under interpretation, provenance deduplicates: skip a tuple whose
        // original columns already exist under any annotation
        if self.t.config.provenance_enabled() && !self.t.config.skip_provenance_dedup() {
            let heights = self.t.program.num_heights_of(&head.name);
            let arity = head.arity() - 1 - heights;

            let mut values = Vec::new();
            let mut is_volatile = true;
            for arg in &head.args[..arity] {
                if arg.contains_counter() {
                    is_volatile = false;
                }
                values.push(self.t.translate_value(arg, &self.value_index)?);
            }
            for _ in 0..1 + heights {
                values.push(Expression::Undef);
            }

            // counters must fire on every derivation
            if is_volatile {
                return Ok(Operation::filtered(
                    Condition::ExistenceCheck {
                        relation: head_ref,
                        values,
                    }
                    .negate(),
                    op,
                ));
            }
        }

        Ok(op)
    }

    /// Innermost operation of the provenance variant: return all bound body
    /// values. Subsumption-negation annotation columns come back as -1.
    fn create_return_operation(&mut self, clause: &Clause) -> Result<Operation, TranslatorError> {
        let mut values = Vec::new();
        for lit in &clause.body {
            match lit {
                Literal::Atom(atom) | Literal::Negation(atom) => {
                    for arg in &atom.args {
                        values.push(self.t.translate_value(arg, &self.value_index)?);
                    }
                }
                Literal::BinaryConstraint(_, lhs, rhs) => {
                    values.push(self.t.translate_value(lhs, &self.value_index)?);
                    values.push(self.t.translate_value(rhs, &self.value_index)?);
                }
                Literal::SubsumptionNegation(atom, _) => {
                    let heights = self.t.program.num_heights_of(&atom.name);
                    for arg in &atom.args[..atom.arity() - 1 - heights] {
                        values.push(self.t.translate_value(arg, &self.value_index)?);
                    }
                    for _ in 0..heights + 1 {
                        values.push(Expression::Number(-1));
                    }
                }
                _ => {}
            }
        }
        Ok(Operation::SubroutineReturn {
            values,
            terminate: false,
        })
    }

    /// Wraps the operation in one `Aggregate` per aggregator, innermost
    /// registration last.
    fn wrap_aggregates(
        &mut self,
        clause: &Clause,
        mut op: Operation,
    ) -> Result<Operation, TranslatorError> {
        let mut level = self.level;
        for agg in self.aggregators.clone().iter().rev() {
            level -= 1;

            let function = match agg.op {
                AggregateOp::Min => AggregateFunction::Min,
                AggregateOp::Max => AggregateFunction::Max,
                AggregateOp::Count => AggregateFunction::Count,
                AggregateOp::Sum => AggregateFunction::Sum,
            };

            let mut condition: Option<Condition> = None;
            let mut add = |cond: Condition, current: &mut Option<Condition>| {
                *current = Some(match current.take() {
                    Some(prev) => prev.and(cond),
                    None => cond,
                });
            };

            // constraints of the sub-clause
            for lit in &agg.body {
                if let Some(cond) = self.t.translate_constraint(lit, &self.value_index)? {
                    add(cond, &mut condition);
                }
            }

            // at most one atom is permitted in the sub-clause
            let atoms: Vec<&Atom> = agg
                .body
                .iter()
                .filter_map(|lit| match lit {
                    Literal::Atom(atom) => Some(atom),
                    _ => None,
                })
                .collect();
            if atoms.len() != 1 {
                return Err(TranslatorError::ComplexAggregateBody {
                    location: clause.src_loc.clone(),
                });
            }
            let atom = atoms[0];

            // bind the atom's columns: repeated variables against their
            // other occurrence, ground expressions by equality
            for (pos, arg) in atom.args.iter().enumerate() {
                match arg {
                    Argument::Variable(name) => {
                        for &loc in self.value_index.var_refs(name) {
                            if loc.level != level || loc.column != pos {
                                add(
                                    Condition::constraint(
                                        BinaryOp::Eq,
                                        Expression::tuple(loc.level, loc.column),
                                        Expression::tuple(level, pos),
                                    ),
                                    &mut condition,
                                );
                                break;
                            }
                        }
                    }
                    Argument::UnnamedVariable => {}
                    other => {
                        let value = self.t.translate_value(other, &self.value_index)?;
                        if !value.is_undef() {
                            add(
                                Condition::constraint(
                                    BinaryOp::Eq,
                                    Expression::tuple(level, pos),
                                    value,
                                ),
                                &mut condition,
                            );
                        }
                    }
                }
            }

            let expression = match &agg.target {
                Some(target) => self.t.translate_value(target, &self.value_index)?,
                None => Expression::Undef,
            };

            let relation = self.t.atom_ref(atom);
            op = Operation::Aggregate {
                child: Box::new(op),
                function,
                relation,
                expression,
                condition: condition.unwrap_or(Condition::True),
                level,
            };
        }
        Ok(op)
    }

    /// Builds the scan/unpack spine bottom-up from the nesting stack.
    fn wrap_scans(
        &mut self,
        clause: &Clause,
        original: &Clause,
        version: usize,
        mut op: Operation,
    ) -> Result<Operation, TranslatorError> {
        while let Some(nesting) = self.op_nesting.pop() {
            match nesting {
                Nesting::Atom { atom, level } => {
                    for (pos, arg) in atom.args.iter().enumerate() {
                        if let Argument::Constant(c) = arg {
                            op = Operation::filtered(
                                Condition::constraint(
                                    BinaryOp::Eq,
                                    Expression::tuple(level, pos),
                                    Expression::Number(*c),
                                ),
                                op,
                            );
                        }
                    }

                    let all_args_unnamed = atom
                        .args
                        .iter()
                        .all(|arg| matches!(arg, Argument::UnnamedVariable));

                    let relation = self.t.atom_ref(&atom);
                    op = Operation::filtered(
                        Condition::EmptinessCheck(relation.clone()).negate(),
                        op,
                    );

                    if atom.arity() != 0 && !all_args_unnamed {
                        if clause.head.arity() == 0 {
                            let head_ref = self.t.atom_ref(&clause.head);
                            op = Operation::Break {
                                condition: Condition::EmptinessCheck(head_ref).negate(),
                                child: Box::new(op),
                            };
                        }
                        let profile_text = if self.t.config.profile {
                            Some(format!(
                                "@frequency-atom;{};{};{};{};{};{};",
                                original.head.name, version, clause, atom, original, level
                            ))
                        } else {
                            None
                        };
                        op = Operation::Scan {
                            relation,
                            level,
                            child: Box::new(op),
                            profile_text,
                        };
                    }
                }
                Nesting::Record { args, level, def } => {
                    for (pos, arg) in args.iter().enumerate() {
                        match arg {
                            Argument::Constant(c) => {
                                op = Operation::filtered(
                                    Condition::constraint(
                                        BinaryOp::Eq,
                                        Expression::tuple(level, pos),
                                        Expression::Number(*c),
                                    ),
                                    op,
                                );
                            }
                            Argument::IntrinsicFunctor { .. } | Argument::UserFunctor { .. } => {
                                let value = self.t.translate_value(arg, &self.value_index)?;
                                op = Operation::filtered(
                                    Condition::constraint(
                                        BinaryOp::Eq,
                                        Expression::tuple(level, pos),
                                        value,
                                    ),
                                    op,
                                );
                            }
                            _ => {}
                        }
                    }
                    op = Operation::UnpackRecord {
                        child: Box::new(op),
                        level,
                        source: Expression::tuple(def.level, def.column),
                        arity: args.len(),
                    };
                }
            }
        }
        Ok(op)
    }
}

/// Applies the user-supplied atom order for this version, if one exists.
/// Plans are written 1-indexed.
fn reordered_clause(clause: &Clause, version: usize) -> Result<Option<Clause>, TranslatorError> {
    let Some(plan) = &clause.execution_plan else {
        return Ok(None);
    };
    let Some(order) = plan.order_for(version) else {
        return Ok(None);
    };

    let num_atoms = clause.atoms().len();
    let mut seen = vec![false; num_atoms];
    if order.len() != num_atoms {
        return Err(TranslatorError::MalformedExecutionPlan {
            location: clause.src_loc.clone(),
        });
    }
    for &i in order {
        if i == 0 || i > num_atoms || seen[i - 1] {
            return Err(TranslatorError::MalformedExecutionPlan {
                location: clause.src_loc.clone(),
            });
        }
        seen[i - 1] = true;
    }

    let zero_based: Vec<usize> = order.iter().map(|&i| i - 1).collect();
    let mut reordered = clause.clone();
    reordered.reorder_atoms(&zero_based);
    reordered.execution_plan = None;
    Ok(Some(reordered))
}

/// Visits every aggregator of the clause in depth-first post-order: nested
/// aggregators are visited before the aggregator containing them.
fn visit_aggregators_post_order(clause: &Clause, f: &mut impl FnMut(&crate::ast::Aggregator)) {
    fn visit_arg(arg: &Argument, f: &mut impl FnMut(&crate::ast::Aggregator)) {
        match arg {
            Argument::IntrinsicFunctor { args, .. }
            | Argument::UserFunctor { args, .. }
            | Argument::RecordInit(args) => {
                for arg in args {
                    visit_arg(arg, f);
                }
            }
            Argument::Aggregator(agg) => {
                if let Some(target) = &agg.target {
                    visit_arg(target, f);
                }
                for lit in &agg.body {
                    visit_literal(lit, f);
                }
                f(agg);
            }
            _ => {}
        }
    }

    fn visit_literal(lit: &Literal, f: &mut impl FnMut(&crate::ast::Aggregator)) {
        match lit {
            Literal::Atom(atom)
            | Literal::Negation(atom)
            | Literal::PositiveNegation(atom)
            | Literal::ExistenceCheck(atom)
            | Literal::SubsumptionNegation(atom, _) => {
                for arg in &atom.args {
                    visit_arg(arg, f);
                }
            }
            Literal::BinaryConstraint(_, lhs, rhs) => {
                visit_arg(lhs, f);
                visit_arg(rhs, f);
            }
            Literal::Conjunction(lhs, rhs) | Literal::Disjunction(lhs, rhs) => {
                visit_literal(lhs, f);
                visit_literal(rhs, f);
            }
        }
    }

    for arg in &clause.head.args {
        visit_arg(arg, f);
    }
    for lit in &clause.body {
        visit_literal(lit, f);
    }
}
