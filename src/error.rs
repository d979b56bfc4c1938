use thiserror::Error;

use crate::ast::SrcLocation;

/// Errors surfaced by the translator. All of these are contract breaches by
/// the caller (malformed AST, inconsistent analyses, or contradictory
/// configuration); the translator never recovers and never returns a partial
/// program.
#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error("ungrounded variable `{name}` at {location}")]
    UngroundedVariable { name: String, location: SrcLocation },

    #[error("aggregate body at {location} must contain exactly one atom")]
    ComplexAggregateBody { location: SrcLocation },

    #[error("unknown user-defined functor `{name}`")]
    UnknownFunctor { name: String },

    #[error(
        "incremental mode requires the `{column}` annotation column on relation `{relation}`; \
         run the incremental transformer before translation"
    )]
    MissingAnnotationColumn { relation: String, column: String },

    #[error("count annotations on clause at {location} are not constants")]
    MissingCountAnnotation { location: SrcLocation },

    #[error("analysis references relation `{name}` which is not part of the program")]
    UnknownRelation { name: String },

    #[error("execution plan for clause at {location} has a malformed permutation")]
    MalformedExecutionPlan { location: SrcLocation },
}
