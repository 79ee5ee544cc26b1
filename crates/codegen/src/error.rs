//! Codegen errors

use smithygen_common::PolicyAbort;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error(transparent)]
    Model(#[from] smithygen_model::ModelError),

    #[error(transparent)]
    Codec(#[from] smithygen_codec::CodecError),

    #[error("lowering failed: {0}")]
    Lowering(String),

    #[error("service file has no usable slug: {0}")]
    MissingSlug(String),

    #[error("service has no endpoint rule set")]
    MissingEndpointRuleSet,

    #[error("endpoint rule set error: {0}")]
    EndpointRule(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    PolicyAbort(#[from] PolicyAbort),
}

pub type Result<T> = std::result::Result<T, CodegenError>;

impl From<tera::Error> for CodegenError {
    fn from(err: tera::Error) -> Self {
        CodegenError::Template(err.to_string())
    }
}
