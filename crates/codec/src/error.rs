//! Codec errors

use thiserror::Error;

/// Errors raised while writing requests or parsing responses.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("unexpected node: {0}")]
    UnexpectedNode(String),

    #[error("unexpected response header `{0}`")]
    UnexpectedResponseHeader(String),

    #[error("unexpected response member `{0}`")]
    UnexpectedResponseMember(String),

    #[error("unexpected union field `{0}` in response")]
    UnexpectedResponseUnionField(String),

    #[error("unexpected struct field `{0}` in response")]
    UnexpectedResponseStructField(String),

    #[error("unexpected response status {0}")]
    UnexpectedResponseStatus(u16),

    #[error("could not resolve response error code `{0}`")]
    UnresolvedResponseError(String),

    #[error("no response received")]
    MissingResponse,

    #[error("required field `{0}` missing after parse")]
    MissingRequiredField(String),

    #[error("invalid header value for `{0}`")]
    InvalidHeaderValue(String),

    #[error("invalid number format: {0}")]
    InvalidNumberFormat(String),

    #[error("unknown header `{0}`")]
    UnknownHeader(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    // big_integer / big_decimal / document are outside the support
    // matrix; reaching them is an implementation error, never dropped.
    #[error("unsupported shape in codec: {0}")]
    UnsupportedShape(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Xml(err.to_string())
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(err: quick_xml::Error) -> Self {
        CodecError::Xml(err.to_string())
    }
}

impl From<jiter::JiterError> for CodecError {
    fn from(err: jiter::JiterError) -> Self {
        CodecError::Json(err.to_string())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(err.to_string())
    }
}

impl From<base64::DecodeError> for CodecError {
    fn from(err: base64::DecodeError) -> Self {
        CodecError::InvalidValue(format!("invalid base64: {err}"))
    }
}
