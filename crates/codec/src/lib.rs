//! Runtime protocol codecs for smithygen-generated clients
//!
//! Every generated shape carries a [`Schema`] descriptor. The codecs here
//! drive serialization of a [`Value`] tree into the abstract
//! [`Request`]/[`Response`] HTTP values and back, for the four supported
//! protocols: AWS JSON 1.0/1.1, REST-JSON, and REST-XML.

mod config;
mod error;
mod fmt;
mod http;
mod json;
mod resolver;
mod schema;
mod value;
mod xml;

pub use config::{
    validate_app_id, ClientConfig, ConfigError, HttpTransport, IdentityProvider, MAX_APP_ID_LEN,
};
pub use error::{CodecError, Result};
pub use http::{
    expect_status, parse_http_bindings, parse_http_bindings_strict, write_http_bindings,
    Readable, Request, Response, Writable,
};
pub use json::{
    read_json_payload, scan_json_error_body, write_aws_json_request, write_json_payload,
    write_rest_json_body, JsonFlavor,
};
pub use resolver::{
    resolve_error, sanitize_error_code, strip_error_suffix, ErrorDescriptor, ErrorFormat,
    ErrorRegistry, ErrorSource, ResolvedError,
};
pub use schema::{
    Binding, MemberSchema, OperationSchema, Schema, SchemaRef, SerialKind, TimestampFormat,
    UriSegment, UriTemplate, XmlNamespace, XmlOptions,
};
pub use value::Value;
pub use xml::{read_xml_payload, scan_xml_error_body, write_xml_payload};
