//! Trait payloads and the process-wide trait registry
//!
//! Traits arrive in the AST as `"ns#name": <value>` entries. The registry
//! maps each trait id to a parser callback producing a [`TraitValue`];
//! registration is additive at pipeline startup and the registry is
//! read-only afterwards. Unknown trait ids surface as `UnknownTrait` and
//! are subject to the parse policy.

use std::collections::HashMap;

use smithygen_common::SmithyId;

use crate::error::{ModelError, Result};
use crate::reader::JsonReader;

/// Ids of the traits the core recognizes.
pub mod ids {
    use smithygen_common::SmithyId;

    pub const DOCUMENTATION: SmithyId = SmithyId::hashed("smithy.api#documentation");
    pub const ERROR: SmithyId = SmithyId::hashed("smithy.api#error");
    pub const RETRYABLE: SmithyId = SmithyId::hashed("smithy.api#retryable");
    pub const HTTP_ERROR: SmithyId = SmithyId::hashed("smithy.api#httpError");
    pub const HTTP: SmithyId = SmithyId::hashed("smithy.api#http");
    pub const HTTP_LABEL: SmithyId = SmithyId::hashed("smithy.api#httpLabel");
    pub const HTTP_QUERY: SmithyId = SmithyId::hashed("smithy.api#httpQuery");
    pub const HTTP_QUERY_PARAMS: SmithyId = SmithyId::hashed("smithy.api#httpQueryParams");
    pub const HTTP_HEADER: SmithyId = SmithyId::hashed("smithy.api#httpHeader");
    pub const HTTP_PREFIX_HEADERS: SmithyId = SmithyId::hashed("smithy.api#httpPrefixHeaders");
    pub const HTTP_PAYLOAD: SmithyId = SmithyId::hashed("smithy.api#httpPayload");
    pub const HTTP_RESPONSE_CODE: SmithyId = SmithyId::hashed("smithy.api#httpResponseCode");
    pub const REQUIRED: SmithyId = SmithyId::hashed("smithy.api#required");
    pub const DEFAULT: SmithyId = SmithyId::hashed("smithy.api#default");
    pub const CLIENT_OPTIONAL: SmithyId = SmithyId::hashed("smithy.api#clientOptional");
    pub const SPARSE: SmithyId = SmithyId::hashed("smithy.api#sparse");
    pub const UNIQUE_ITEMS: SmithyId = SmithyId::hashed("smithy.api#uniqueItems");
    pub const ENUM_VALUE: SmithyId = SmithyId::hashed("smithy.api#enumValue");
    pub const INPUT: SmithyId = SmithyId::hashed("smithy.api#input");
    pub const OUTPUT: SmithyId = SmithyId::hashed("smithy.api#output");
    pub const MEDIA_TYPE: SmithyId = SmithyId::hashed("smithy.api#mediaType");
    pub const XML_ATTRIBUTE: SmithyId = SmithyId::hashed("smithy.api#xmlAttribute");
    pub const XML_FLATTENED: SmithyId = SmithyId::hashed("smithy.api#xmlFlattened");
    pub const XML_NAME: SmithyId = SmithyId::hashed("smithy.api#xmlName");
    pub const XML_NAMESPACE: SmithyId = SmithyId::hashed("smithy.api#xmlNamespace");
    pub const TIMESTAMP_FORMAT: SmithyId = SmithyId::hashed("smithy.api#timestampFormat");
    pub const PAGINATED: SmithyId = SmithyId::hashed("smithy.api#paginated");
    pub const SENSITIVE: SmithyId = SmithyId::hashed("smithy.api#sensitive");
    pub const TITLE: SmithyId = SmithyId::hashed("smithy.api#title");
    pub const PATTERN: SmithyId = SmithyId::hashed("smithy.api#pattern");
    pub const READONLY: SmithyId = SmithyId::hashed("smithy.api#readonly");
    pub const IDEMPOTENT: SmithyId = SmithyId::hashed("smithy.api#idempotent");
    pub const MIXIN: SmithyId = SmithyId::hashed("smithy.api#mixin");

    pub const HTTP_BASIC_AUTH: SmithyId = SmithyId::hashed("smithy.api#httpBasicAuth");
    pub const HTTP_BEARER_AUTH: SmithyId = SmithyId::hashed("smithy.api#httpBearerAuth");
    pub const HTTP_DIGEST_AUTH: SmithyId = SmithyId::hashed("smithy.api#httpDigestAuth");
    pub const HTTP_API_KEY_AUTH: SmithyId = SmithyId::hashed("smithy.api#httpApiKeyAuth");

    pub const ENDPOINT_RULE_SET: SmithyId = SmithyId::hashed("smithy.rules#endpointRuleSet");
    pub const ENDPOINT_TESTS: SmithyId = SmithyId::hashed("smithy.rules#endpointTests");

    pub const AWS_JSON_1_0: SmithyId = SmithyId::hashed("aws.protocols#awsJson1_0");
    pub const AWS_JSON_1_1: SmithyId = SmithyId::hashed("aws.protocols#awsJson1_1");
    pub const REST_JSON_1: SmithyId = SmithyId::hashed("aws.protocols#restJson1");
    pub const REST_XML: SmithyId = SmithyId::hashed("aws.protocols#restXml");
}

/// Whether an error shape is the caller's fault or the service's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Client,
    Server,
}

/// Timestamp serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    EpochSeconds,
    DateTime,
    HttpDate,
}

/// Payload of an `enumValue` trait.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumValue {
    Str(String),
    Int(i64),
}

/// Parsed trait payload. Marker traits parse to `Unit`; traits the core
/// does not model structurally are kept as `Opaque` documents.
#[derive(Debug, Clone, PartialEq)]
pub enum TraitValue {
    Unit,
    Documentation(String),
    Error(ErrorSource),
    Retryable { throttling: bool },
    HttpError(u16),
    Http {
        method: String,
        uri: String,
        code: u16,
    },
    HttpQuery(String),
    HttpHeader(String),
    HttpPrefixHeaders(String),
    Default(serde_json::Value),
    EnumValue(EnumValue),
    MediaType(String),
    XmlName(String),
    XmlNamespace {
        uri: String,
        prefix: Option<String>,
    },
    TimestampFormat(TimestampFormat),
    EndpointRuleSet(serde_json::Value),
    EndpointTests(serde_json::Value),
    Opaque(serde_json::Value),
}

/// Parser callback for one trait id.
pub type TraitParser = fn(&mut JsonReader<'_>) -> Result<TraitValue>;

/// Map from trait id to parser. Built once, then read-only.
pub struct TraitRegistry {
    parsers: HashMap<SmithyId, TraitParser>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        TraitRegistry {
            parsers: HashMap::new(),
        }
    }

    /// Registry pre-loaded with every built-in trait.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register(ids::DOCUMENTATION, parse_documentation);
        reg.register(ids::ERROR, parse_error);
        reg.register(ids::RETRYABLE, parse_retryable);
        reg.register(ids::HTTP_ERROR, parse_http_error);
        reg.register(ids::HTTP, parse_http);
        reg.register(ids::HTTP_LABEL, parse_marker);
        reg.register(ids::HTTP_QUERY, parse_string_payload_query);
        reg.register(ids::HTTP_QUERY_PARAMS, parse_marker);
        reg.register(ids::HTTP_HEADER, parse_string_payload_header);
        reg.register(ids::HTTP_PREFIX_HEADERS, parse_string_payload_prefix);
        reg.register(ids::HTTP_PAYLOAD, parse_marker);
        reg.register(ids::HTTP_RESPONSE_CODE, parse_marker);
        reg.register(ids::REQUIRED, parse_marker);
        reg.register(ids::DEFAULT, parse_default);
        reg.register(ids::CLIENT_OPTIONAL, parse_marker);
        reg.register(ids::SPARSE, parse_marker);
        reg.register(ids::UNIQUE_ITEMS, parse_marker);
        reg.register(ids::ENUM_VALUE, parse_enum_value);
        reg.register(ids::INPUT, parse_marker);
        reg.register(ids::OUTPUT, parse_marker);
        reg.register(ids::MEDIA_TYPE, parse_media_type);
        reg.register(ids::XML_ATTRIBUTE, parse_marker);
        reg.register(ids::XML_FLATTENED, parse_marker);
        reg.register(ids::XML_NAME, parse_xml_name);
        reg.register(ids::XML_NAMESPACE, parse_xml_namespace);
        reg.register(ids::TIMESTAMP_FORMAT, parse_timestamp_format);
        reg.register(ids::PAGINATED, parse_opaque);
        reg.register(ids::SENSITIVE, parse_marker);
        reg.register(ids::TITLE, parse_opaque);
        reg.register(ids::PATTERN, parse_opaque);
        reg.register(ids::READONLY, parse_marker);
        reg.register(ids::IDEMPOTENT, parse_marker);
        reg.register(ids::MIXIN, parse_opaque);
        reg.register(ids::HTTP_BASIC_AUTH, parse_marker);
        reg.register(ids::HTTP_BEARER_AUTH, parse_marker);
        reg.register(ids::HTTP_DIGEST_AUTH, parse_marker);
        reg.register(ids::HTTP_API_KEY_AUTH, parse_opaque);
        reg.register(ids::ENDPOINT_RULE_SET, parse_endpoint_rule_set);
        reg.register(ids::ENDPOINT_TESTS, parse_endpoint_tests);
        reg.register(ids::AWS_JSON_1_0, parse_marker);
        reg.register(ids::AWS_JSON_1_1, parse_marker);
        reg.register(ids::REST_JSON_1, parse_opaque);
        reg.register(ids::REST_XML, parse_marker);
        reg
    }

    pub fn register(&mut self, id: SmithyId, parser: TraitParser) {
        self.parsers.insert(id, parser);
    }

    pub fn contains(&self, id: SmithyId) -> bool {
        self.parsers.contains_key(&id)
    }

    /// Parse the payload for `id`, or `None` when the trait is unknown
    /// (the caller applies the trait policy).
    pub fn parse(&self, id: SmithyId, reader: &mut JsonReader<'_>) -> Result<Option<TraitValue>> {
        match self.parsers.get(&id) {
            Some(parser) => parser(reader).map(Some),
            None => Ok(None),
        }
    }
}

impl Default for TraitRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_marker(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    reader.skip_value()?;
    Ok(TraitValue::Unit)
}

fn parse_opaque(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::Opaque(reader.read_document()?))
}

fn parse_documentation(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::Documentation(reader.next_string()?.to_string()))
}

fn parse_error(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    let source = match reader.next_string()? {
        "client" => ErrorSource::Client,
        "server" => ErrorSource::Server,
        other => {
            return Err(ModelError::UnexpectedToken(format!(
                "invalid error source \"{other}\""
            )))
        }
    };
    Ok(TraitValue::Error(source))
}

fn parse_retryable(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    let mut throttling = false;
    let mut key = reader.next_object_begin()?;
    while let Some(k) = key {
        if k == "throttling" {
            throttling = reader.next_boolean()?;
        } else {
            reader.skip_value()?;
        }
        key = reader.next_key()?;
    }
    Ok(TraitValue::Retryable { throttling })
}

fn parse_http_error(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    let code = reader.next_integer()?;
    let code = u16::try_from(code).map_err(|_| ModelError::InvalidNumber)?;
    Ok(TraitValue::HttpError(code))
}

fn parse_http(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    let mut method = String::new();
    let mut uri = String::new();
    let mut code = 200u16;
    let mut key = reader.next_object_begin()?;
    while let Some(k) = key {
        match k.as_str() {
            "method" => method = reader.next_string()?.to_string(),
            "uri" => uri = reader.next_string()?.to_string(),
            "code" => {
                code = u16::try_from(reader.next_integer()?)
                    .map_err(|_| ModelError::InvalidNumber)?;
            }
            _ => reader.skip_value()?,
        }
        key = reader.next_key()?;
    }
    Ok(TraitValue::Http { method, uri, code })
}

fn parse_string_payload_query(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::HttpQuery(reader.next_string()?.to_string()))
}

fn parse_string_payload_header(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::HttpHeader(reader.next_string()?.to_string()))
}

fn parse_string_payload_prefix(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::HttpPrefixHeaders(
        reader.next_string()?.to_string(),
    ))
}

fn parse_default(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::Default(reader.read_document()?))
}

fn parse_enum_value(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    use crate::reader::TokenKind;
    let value = match reader.peek()? {
        TokenKind::String => EnumValue::Str(reader.next_string()?.to_string()),
        TokenKind::Number => EnumValue::Int(reader.next_integer()?),
        _ => {
            return Err(ModelError::UnexpectedToken(
                "enumValue must be a string or integer".to_string(),
            ))
        }
    };
    Ok(TraitValue::EnumValue(value))
}

fn parse_media_type(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::MediaType(reader.next_string()?.to_string()))
}

fn parse_xml_name(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::XmlName(reader.next_string()?.to_string()))
}

fn parse_xml_namespace(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    let mut uri = String::new();
    let mut prefix = None;
    let mut key = reader.next_object_begin()?;
    while let Some(k) = key {
        match k.as_str() {
            "uri" => uri = reader.next_string()?.to_string(),
            "prefix" => prefix = Some(reader.next_string()?.to_string()),
            _ => reader.skip_value()?,
        }
        key = reader.next_key()?;
    }
    Ok(TraitValue::XmlNamespace { uri, prefix })
}

fn parse_timestamp_format(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    let format = match reader.next_string()? {
        "epoch-seconds" => TimestampFormat::EpochSeconds,
        "date-time" => TimestampFormat::DateTime,
        "http-date" => TimestampFormat::HttpDate,
        other => {
            return Err(ModelError::UnexpectedToken(format!(
                "invalid timestamp format \"{other}\""
            )))
        }
    };
    Ok(TraitValue::TimestampFormat(format))
}

fn parse_endpoint_rule_set(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::EndpointRuleSet(reader.read_document()?))
}

fn parse_endpoint_tests(reader: &mut JsonReader<'_>) -> Result<TraitValue> {
    Ok(TraitValue::EndpointTests(reader.read_document()?))
}

/// Read-only view over one shape's trait slice.
#[derive(Clone, Copy)]
pub struct TraitBag<'a> {
    entries: &'a [(SmithyId, TraitValue)],
}

impl<'a> TraitBag<'a> {
    pub const EMPTY: TraitBag<'static> = TraitBag { entries: &[] };

    pub fn new(entries: &'a [(SmithyId, TraitValue)]) -> Self {
        TraitBag { entries }
    }

    pub fn has(&self, id: SmithyId) -> bool {
        self.entries.iter().any(|(tid, _)| *tid == id)
    }

    /// The first payload recorded for `id`. Later `apply` merges append,
    /// so the first entry is the original definition.
    pub fn get(&self, id: SmithyId) -> Option<&'a TraitValue> {
        self.entries
            .iter()
            .find(|(tid, _)| *tid == id)
            .map(|(_, v)| v)
    }

    pub fn get_opaque(&self, id: SmithyId) -> Option<&'a serde_json::Value> {
        match self.get(id) {
            Some(TraitValue::Opaque(doc)) => Some(doc),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a (SmithyId, TraitValue)> {
        self.entries.iter()
    }

    pub fn documentation(&self) -> Option<&'a str> {
        match self.get(ids::DOCUMENTATION) {
            Some(TraitValue::Documentation(doc)) => Some(doc),
            _ => None,
        }
    }

    pub fn error_source(&self) -> Option<ErrorSource> {
        match self.get(ids::ERROR) {
            Some(TraitValue::Error(source)) => Some(*source),
            _ => None,
        }
    }

    pub fn http(&self) -> Option<(&'a str, &'a str, u16)> {
        match self.get(ids::HTTP) {
            Some(TraitValue::Http { method, uri, code }) => Some((method, uri, *code)),
            _ => None,
        }
    }

    pub fn http_error(&self) -> Option<u16> {
        match self.get(ids::HTTP_ERROR) {
            Some(TraitValue::HttpError(code)) => Some(*code),
            _ => None,
        }
    }

    pub fn retryable(&self) -> bool {
        self.has(ids::RETRYABLE)
    }

    pub fn timestamp_format(&self) -> Option<TimestampFormat> {
        match self.get(ids::TIMESTAMP_FORMAT) {
            Some(TraitValue::TimestampFormat(f)) => Some(*f),
            _ => None,
        }
    }

    pub fn xml_name(&self) -> Option<&'a str> {
        match self.get(ids::XML_NAME) {
            Some(TraitValue::XmlName(name)) => Some(name),
            _ => None,
        }
    }

    pub fn enum_value(&self) -> Option<&'a EnumValue> {
        match self.get(ids::ENUM_VALUE) {
            Some(TraitValue::EnumValue(v)) => Some(v),
            _ => None,
        }
    }

    pub fn is_required(&self) -> bool {
        self.has(ids::REQUIRED)
    }

    pub fn has_default(&self) -> bool {
        self.has(ids::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(registry: &TraitRegistry, id: SmithyId, json: &str) -> TraitValue {
        let mut reader = JsonReader::new(json.as_bytes());
        registry.parse(id, &mut reader).unwrap().unwrap()
    }

    #[test]
    fn builtin_parsers() {
        let reg = TraitRegistry::builtin();
        assert_eq!(
            parse(&reg, ids::DOCUMENTATION, "\"Creates a table.\""),
            TraitValue::Documentation("Creates a table.".to_string())
        );
        assert_eq!(
            parse(&reg, ids::ERROR, "\"client\""),
            TraitValue::Error(ErrorSource::Client)
        );
        assert_eq!(parse(&reg, ids::HTTP_ERROR, "404"), TraitValue::HttpError(404));
        assert_eq!(
            parse(&reg, ids::HTTP, r#"{"method": "PUT", "uri": "/a/{key}", "code": 201}"#),
            TraitValue::Http {
                method: "PUT".to_string(),
                uri: "/a/{key}".to_string(),
                code: 201
            }
        );
        assert_eq!(parse(&reg, ids::REQUIRED, "{}"), TraitValue::Unit);
        assert_eq!(
            parse(&reg, ids::TIMESTAMP_FORMAT, "\"http-date\""),
            TraitValue::TimestampFormat(TimestampFormat::HttpDate)
        );
    }

    #[test]
    fn unknown_trait_yields_none() {
        let reg = TraitRegistry::builtin();
        let mut reader = JsonReader::new(b"{}");
        let result = reg
            .parse(SmithyId::hashed("com.example#custom"), &mut reader)
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn registration_is_additive() {
        let mut reg = TraitRegistry::builtin();
        let custom = SmithyId::hashed("com.example#custom");
        reg.register(custom, |r| Ok(TraitValue::Opaque(r.read_document()?)));
        let mut reader = JsonReader::new(b"42");
        assert!(matches!(
            reg.parse(custom, &mut reader).unwrap(),
            Some(TraitValue::Opaque(_))
        ));
    }

    #[test]
    fn trait_bag_lookup() {
        let entries = vec![
            (ids::REQUIRED, TraitValue::Unit),
            (ids::HTTP_HEADER, TraitValue::HttpHeader("x-id".to_string())),
        ];
        let bag = TraitBag::new(&entries);
        assert!(bag.is_required());
        assert!(bag.has(ids::HTTP_HEADER));
        assert!(!bag.has(ids::SPARSE));
        assert_eq!(
            bag.get(ids::HTTP_HEADER),
            Some(&TraitValue::HttpHeader("x-id".to_string()))
        );
    }
}
