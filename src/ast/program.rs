use super::relation::Relation;

/// A user-defined functor declaration; the translator only consults the
/// return type.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctorDeclaration {
    pub name: String,
    pub arg_types: Vec<String>,
    pub return_type: String,
}

/// The validated, typed logic program. Relations keep their declaration
/// order, which the translator relies on for deterministic output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub relations: Vec<Relation>,
    pub functors: Vec<FunctorDeclaration>,
}

impl Program {
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|rel| rel.name == name)
    }

    pub fn relation_mut(&mut self, name: &str) -> Option<&mut Relation> {
        self.relations.iter_mut().find(|rel| rel.name == name)
    }

    pub fn functor(&self, name: &str) -> Option<&FunctorDeclaration> {
        self.functors.iter().find(|f| f.name == name)
    }

    /// Height parameters of the relation an atom refers to; zero when the
    /// atom names an auxiliary relation unknown to the program.
    pub fn num_heights_of(&self, atom_name: &str) -> usize {
        self.relation(atom_name)
            .map(|rel| rel.num_height_params)
            .unwrap_or(0)
    }
}
