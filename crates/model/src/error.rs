//! Model and parse errors

use smithygen_common::PolicyAbort;
use thiserror::Error;

/// Errors raised while reading, parsing, or projecting a Smithy model.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("invalid smithy version: {0}")]
    InvalidVersion(String),

    #[error("unexpected JSON token: {0}")]
    UnexpectedToken(String),

    #[error("invalid number")]
    InvalidNumber,

    #[error("unexpected end of input inside a scope")]
    EofInScope,

    #[error("nesting depth limit exceeded")]
    DepthLimit,

    #[error("invalid shape property `{property}` on {context}")]
    InvalidShapeProperty { context: String, property: String },

    #[error("member target for {0} is not a valid shape reference")]
    InvalidMemberTarget(String),

    #[error("shape target for {0} is not a valid shape reference")]
    InvalidShapeTarget(String),

    #[error("unknown shape type `{0}`")]
    UnknownType(String),

    #[error("unknown trait `{0}`")]
    UnknownTrait(String),

    #[error("shape {0} not found in the model")]
    ShapeNotFound(String),

    #[error("no name recorded for shape {0}")]
    NameNotFound(String),

    #[error("model does not define a service shape")]
    MissingServiceShape,

    #[error("resource shape {0} missing from the model")]
    MissingResourceShape(String),

    #[error("shape id collision between `{0}` and `{1}`")]
    IdCollision(String, String),

    #[error("mixin cycle involving {0}")]
    MixinCycle(String),

    #[error(transparent)]
    PolicyAbort(#[from] PolicyAbort),
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl From<jiter::JiterError> for ModelError {
    fn from(err: jiter::JiterError) -> Self {
        // jiter reports everything through one error type; classify by
        // message so callers see the reader-level error kinds.
        let msg = err.to_string();
        let lower = msg.to_ascii_lowercase();
        if lower.contains("recursion") {
            ModelError::DepthLimit
        } else if lower.contains("eof") {
            ModelError::EofInScope
        } else if lower.contains("number") {
            ModelError::InvalidNumber
        } else {
            ModelError::UnexpectedToken(msg)
        }
    }
}
