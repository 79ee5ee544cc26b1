//! HTTP binding codec
//!
//! Writes schema-bound members of an operation input into the abstract
//! request value (URI path labels, headers, query parameters) and parses
//! response bindings back out. Payload serialization belongs to the
//! protocol codecs.

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{CodecError, Result};
use crate::fmt::{base64_encode, format_scalar, parse_scalar};
use crate::schema::{Binding, OperationSchema, Schema, SerialKind, UriSegment};
use crate::value::Value;

/// Percent-encoding for non-greedy URI labels: everything outside the
/// unreserved set, including `/`.
const LABEL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Greedy labels keep `/` intact.
const GREEDY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Write capability the binding codec needs from a request value.
pub trait Writable {
    fn set_path(&mut self, path: String);
    fn put_header(&mut self, name: &str, value: String);
    fn put_query(&mut self, key: &str, value: String);
    fn has_query(&self, key: &str) -> bool;
    fn put_payload(&mut self, bytes: Vec<u8>);

    fn put_header_many(&mut self, name: &str, values: Vec<String>) {
        for value in values {
            self.put_header(name, value);
        }
    }

    fn put_query_many(&mut self, key: &str, values: Vec<String>) {
        for value in values {
            self.put_query(key, value);
        }
    }
}

/// Read capability the binding codec needs from a response value.
pub trait Readable {
    fn status(&self) -> u16;
    fn headers(&self) -> &[(String, String)];
    fn body(&self) -> &[u8];

    fn header(&self, name: &str) -> Option<&str> {
        self.headers()
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The abstract HTTP request the codecs emit into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Self {
        Request {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn query_all(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

impl Writable for Request {
    fn set_path(&mut self, path: String) {
        self.path = path;
    }

    fn put_header(&mut self, name: &str, value: String) {
        self.headers.push((name.to_string(), value));
    }

    fn put_query(&mut self, key: &str, value: String) {
        self.query.push((key.to_string(), value));
    }

    fn has_query(&self, key: &str) -> bool {
        self.query.iter().any(|(k, _)| k == key)
    }

    fn put_payload(&mut self, bytes: Vec<u8>) {
        self.payload = bytes;
    }
}

/// The abstract HTTP response the codecs parse from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            status,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

impl Readable for Response {
    fn status(&self) -> u16 {
        self.status
    }

    fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Substitute URI labels and emit header/query bindings for `input`.
pub fn write_http_bindings<W: Writable>(
    request: &mut W,
    op: &OperationSchema,
    input: &Value,
) -> Result<()> {
    write_path(request, op, input)?;
    write_headers(request, op, input)?;
    write_query(request, op, input)?;
    Ok(())
}

fn write_path<W: Writable>(request: &mut W, op: &OperationSchema, input: &Value) -> Result<()> {
    let mut path = String::new();
    for segment in &op.uri.segments {
        path.push('/');
        match segment {
            UriSegment::Literal(text) => path.push_str(text),
            UriSegment::Label(name) | UriSegment::Greedy(name) => {
                let member = op.input.member(name).ok_or_else(|| {
                    CodecError::InvalidValue(format!("no member for URI label `{name}`"))
                })?;
                if member.binding != Binding::Path {
                    return Err(CodecError::InvalidValue(format!(
                        "URI label `{name}` is not path-bound"
                    )));
                }
                let value = input.field(&member.name).ok_or_else(|| {
                    CodecError::MissingRequiredField(member.name.clone())
                })?;
                let text = format_scalar(value, &member.schema)?;
                let set = if matches!(segment, UriSegment::Greedy(_)) {
                    GREEDY
                } else {
                    LABEL
                };
                path.push_str(&utf8_percent_encode(&text, set).to_string());
            }
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    request.set_path(path);
    Ok(())
}

fn write_headers<W: Writable>(request: &mut W, op: &OperationSchema, input: &Value) -> Result<()> {
    for member in op.input.members() {
        let Some(value) = input.field(&member.name) else {
            continue;
        };
        match &member.binding {
            Binding::Header(name) => match (&member.schema.kind, value) {
                (
                    SerialKind::ListDense(item)
                    | SerialKind::ListSparse(item)
                    | SerialKind::Set(item),
                    Value::List(items),
                ) => {
                    for item_value in items {
                        if item_value.is_null() {
                            continue;
                        }
                        request.put_header(name, format_scalar(item_value, item)?);
                    }
                }
                (SerialKind::Blob, Value::Blob(bytes)) => {
                    request.put_header(name, base64_encode(bytes));
                }
                _ => request.put_header(name, format_scalar(value, &member.schema)?),
            },
            Binding::HeaderPrefix(prefix) => {
                let SerialKind::Map(_, value_schema) = &member.schema.kind else {
                    return Err(CodecError::UnexpectedNode(format!(
                        "header-prefix member `{}` is not a map",
                        member.name
                    )));
                };
                let Value::Map(entries) = value else {
                    return Err(CodecError::UnexpectedNode(format!(
                        "header-prefix value for `{}` is not a map",
                        member.name
                    )));
                };
                for (key, entry_value) in entries {
                    if entry_value.is_null() {
                        continue;
                    }
                    let name = format!("{prefix}{key}");
                    request.put_header(&name, format_scalar(entry_value, value_schema)?);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn write_query<W: Writable>(request: &mut W, op: &OperationSchema, input: &Value) -> Result<()> {
    // Explicit query members first; query-params maps never override them.
    for member in op.input.members() {
        let Binding::Query(key) = &member.binding else {
            continue;
        };
        let Some(value) = input.field(&member.name) else {
            continue;
        };
        match (&member.schema.kind, value) {
            (
                SerialKind::ListDense(item) | SerialKind::ListSparse(item) | SerialKind::Set(item),
                Value::List(items),
            ) => {
                for item_value in items {
                    if item_value.is_null() {
                        continue;
                    }
                    request.put_query(key, format_scalar(item_value, item)?);
                }
            }
            _ => request.put_query(key, format_scalar(value, &member.schema)?),
        }
    }
    for member in op.input.members() {
        if member.binding != Binding::QueryParams {
            continue;
        }
        let Some(Value::Map(entries)) = input.field(&member.name) else {
            continue;
        };
        let value_schema = match &member.schema.kind {
            SerialKind::Map(_, value_schema) => value_schema,
            _ => {
                return Err(CodecError::UnexpectedNode(format!(
                    "query-params member `{}` is not a map",
                    member.name
                )))
            }
        };
        for (key, entry_value) in entries {
            if request.has_query(key) || entry_value.is_null() {
                continue;
            }
            match entry_value {
                Value::List(items) => {
                    for item in items {
                        if item.is_null() {
                            continue;
                        }
                        let item_schema = match &value_schema.kind {
                            SerialKind::ListDense(item_schema)
                            | SerialKind::ListSparse(item_schema)
                            | SerialKind::Set(item_schema) => item_schema,
                            _ => value_schema,
                        };
                        request.put_query(key, format_scalar(item, item_schema)?);
                    }
                }
                _ => request.put_query(key, format_scalar(entry_value, value_schema)?),
            }
        }
    }
    Ok(())
}

/// Parse status-code, header, and header-prefix bindings of a response
/// into a struct value. Body members are left for the payload codecs.
pub fn parse_http_bindings<R: Readable>(schema: &Schema, response: &R) -> Result<Value> {
    let mut fields: IndexMap<String, Value> = IndexMap::new();

    // Prefix members claim headers by longest matching prefix.
    let prefix_members: Vec<_> = schema
        .members()
        .iter()
        .filter_map(|m| match &m.binding {
            Binding::HeaderPrefix(prefix) => Some((prefix.as_str(), m)),
            _ => None,
        })
        .collect();

    for member in schema.members() {
        match &member.binding {
            Binding::StatusCode => {
                fields.insert(member.name.clone(), Value::Int(i64::from(response.status())));
            }
            Binding::Header(name) => {
                let values: Vec<&str> = response
                    .headers()
                    .iter()
                    .filter(|(n, _)| n.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.as_str())
                    .collect();
                if values.is_empty() {
                    continue;
                }
                let parsed = parse_header_member(&member.schema, &values)?;
                fields.insert(member.name.clone(), parsed);
            }
            Binding::HeaderPrefix(prefix) => {
                let SerialKind::Map(_, value_schema) = &member.schema.kind else {
                    return Err(CodecError::UnexpectedNode(format!(
                        "header-prefix member `{}` is not a map",
                        member.name
                    )));
                };
                let mut entries = IndexMap::new();
                for (header_name, header_value) in response.headers() {
                    // Skip headers a longer prefix member owns.
                    let owner = prefix_members
                        .iter()
                        .filter(|(p, _)| {
                            header_name.len() >= p.len()
                                && header_name[..p.len()].eq_ignore_ascii_case(p)
                        })
                        .max_by_key(|(p, _)| p.len());
                    let Some((best_prefix, _)) = owner else {
                        continue;
                    };
                    if !best_prefix.eq_ignore_ascii_case(prefix) {
                        continue;
                    }
                    let tail = &header_name[prefix.len()..];
                    entries.insert(
                        tail.to_string(),
                        parse_scalar(header_value, value_schema)
                            .map_err(|_| CodecError::InvalidHeaderValue(header_name.clone()))?,
                    );
                }
                if !entries.is_empty() {
                    fields.insert(member.name.clone(), Value::Map(entries));
                }
            }
            _ => {}
        }
    }
    Ok(Value::Struct(fields))
}

/// Strict variant of [`parse_http_bindings`]: any non-standard response
/// header that no binding claims is an error.
pub fn parse_http_bindings_strict<R: Readable>(schema: &Schema, response: &R) -> Result<Value> {
    for (header_name, _) in response.headers() {
        if is_common_header(header_name) {
            continue;
        }
        let claimed = schema.members().iter().any(|member| match &member.binding {
            Binding::Header(name) => name.eq_ignore_ascii_case(header_name),
            Binding::HeaderPrefix(prefix) => {
                header_name.len() >= prefix.len()
                    && header_name[..prefix.len()].eq_ignore_ascii_case(prefix)
            }
            _ => false,
        });
        if !claimed {
            return Err(CodecError::UnknownHeader(header_name.clone()));
        }
    }
    parse_http_bindings(schema, response)
}

fn is_common_header(name: &str) -> bool {
    const COMMON: &[&str] = &[
        "content-type",
        "content-length",
        "date",
        "connection",
        "server",
        "x-amzn-requestid",
        "x-amz-request-id",
        "x-amz-id-2",
    ];
    COMMON.iter().any(|c| name.eq_ignore_ascii_case(c))
}

/// Check the response status against the operation's expected success
/// code; error statuses belong to the error resolver.
pub fn expect_status<R: Readable>(op: &OperationSchema, response: &R) -> Result<()> {
    if response.status() == op.code || (op.code == 200 && response.status() < 300) {
        Ok(())
    } else {
        Err(CodecError::UnexpectedResponseStatus(response.status()))
    }
}

fn parse_header_member(schema: &Schema, raw_values: &[&str]) -> Result<Value> {
    match &schema.kind {
        SerialKind::ListDense(item) | SerialKind::ListSparse(item) | SerialKind::Set(item) => {
            // Repeated headers and comma-separated values both flatten.
            let mut items = Vec::new();
            for raw in raw_values {
                for part in raw.split(',') {
                    let part = part.trim();
                    if part.is_empty() {
                        continue;
                    }
                    items.push(parse_scalar(part, item)?);
                }
            }
            Ok(Value::List(items))
        }
        _ => parse_scalar(raw_values[0], schema),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MemberSchema, TimestampFormat};

    fn op_with_input(uri: &str, input: crate::SchemaRef) -> OperationSchema {
        OperationSchema::new("Svc", "Op", "GET", uri, input, Schema::structure("Out", vec![]))
            .unwrap()
    }

    #[test]
    fn greedy_and_nongreedy_labels() {
        let input = Schema::structure(
            "In",
            vec![
                MemberSchema::new("key", Schema::string()).binding(Binding::Path),
                MemberSchema::new("path", Schema::string()).binding(Binding::Path),
            ],
        );
        let op = op_with_input("/a/{key}/{path+}", input);
        let mut request = Request::new("GET");
        let value = Value::structure([
            ("key", Value::string("x/y")),
            ("path", Value::string("p/q")),
        ]);
        write_http_bindings(&mut request, &op, &value).unwrap();
        assert_eq!(request.path, "/a/x%2Fy/p/q");
    }

    #[test]
    fn header_list_and_base64() {
        let input = Schema::structure(
            "In",
            vec![
                MemberSchema::new("ids", Schema::list("Ids", Schema::string()))
                    .binding(Binding::Header("x-ids".to_string())),
                MemberSchema::new("raw", Schema::blob())
                    .binding(Binding::Header("x-raw".to_string())),
            ],
        );
        let op = op_with_input("/", input);
        let mut request = Request::new("GET");
        let value = Value::structure([
            ("ids", Value::list([Value::string("a"), Value::string("b")])),
            ("raw", Value::Blob(b"ok".to_vec())),
        ]);
        write_http_bindings(&mut request, &op, &value).unwrap();
        assert_eq!(request.header_all("x-ids"), vec!["a", "b"]);
        assert_eq!(request.header("x-raw"), Some("b2s="));
    }

    #[test]
    fn prefix_headers_use_put_header() {
        let input = Schema::structure(
            "In",
            vec![MemberSchema::new(
                "meta",
                Schema::map("Meta", Schema::string(), Schema::string()),
            )
            .binding(Binding::HeaderPrefix("x-meta-".to_string()))],
        );
        let op = op_with_input("/", input);
        let mut request = Request::new("PUT");
        let value = Value::structure([(
            "meta",
            Value::map([("a", Value::string("1")), ("b", Value::string("2"))]),
        )]);
        write_http_bindings(&mut request, &op, &value).unwrap();
        assert_eq!(request.header("x-meta-a"), Some("1"));
        assert_eq!(request.header("x-meta-b"), Some("2"));
        assert!(request.query.is_empty());
    }

    #[test]
    fn explicit_query_wins_over_query_params() {
        let input = Schema::structure(
            "In",
            vec![
                MemberSchema::new("kind", Schema::string())
                    .binding(Binding::Query("kind".to_string())),
                MemberSchema::new(
                    "extra",
                    Schema::map("Extra", Schema::string(), Schema::string()),
                )
                .binding(Binding::QueryParams),
            ],
        );
        let op = op_with_input("/", input);
        let mut request = Request::new("GET");
        let value = Value::structure([
            ("kind", Value::string("explicit")),
            (
                "extra",
                Value::map([
                    ("kind", Value::string("shadowed")),
                    ("other", Value::string("kept")),
                ]),
            ),
        ]);
        write_http_bindings(&mut request, &op, &value).unwrap();
        assert_eq!(request.query_all("kind"), vec!["explicit"]);
        assert_eq!(request.query_all("other"), vec!["kept"]);
    }

    #[test]
    fn absent_optionals_are_skipped() {
        let input = Schema::structure(
            "In",
            vec![MemberSchema::new("id", Schema::string())
                .binding(Binding::Header("x-id".to_string()))],
        );
        let op = op_with_input("/", input);
        let mut request = Request::new("GET");
        write_http_bindings(&mut request, &op, &Value::Struct(IndexMap::new())).unwrap();
        assert!(request.headers.is_empty());
    }

    #[test]
    fn parse_status_headers_and_prefix() {
        let output = Schema::structure(
            "Out",
            vec![
                MemberSchema::new("status", Schema::integer()).binding(Binding::StatusCode),
                MemberSchema::new("count", Schema::integer())
                    .binding(Binding::Header("x-count".to_string())),
                MemberSchema::new("tags", Schema::list("Tags", Schema::string()))
                    .binding(Binding::Header("x-tags".to_string())),
                MemberSchema::new(
                    "meta",
                    Schema::map("Meta", Schema::string(), Schema::string()),
                )
                .binding(Binding::HeaderPrefix("x-meta-".to_string())),
            ],
        );
        let response = Response::new(201)
            .with_header("x-count", "7")
            .with_header("x-tags", "a, b")
            .with_header("x-tags", "c")
            .with_header("x-meta-k", "v");
        let parsed = parse_http_bindings(&output, &response).unwrap();
        assert_eq!(parsed.field("status"), Some(&Value::Int(201)));
        assert_eq!(parsed.field("count"), Some(&Value::Int(7)));
        assert_eq!(
            parsed.field("tags"),
            Some(&Value::list([
                Value::string("a"),
                Value::string("b"),
                Value::string("c")
            ]))
        );
        let Some(Value::Map(meta)) = parsed.field("meta") else {
            panic!("expected map");
        };
        assert_eq!(meta.get("k"), Some(&Value::Str("v".to_string())));
    }

    #[test]
    fn longest_prefix_wins() {
        let output = Schema::structure(
            "Out",
            vec![
                MemberSchema::new(
                    "meta",
                    Schema::map("Meta", Schema::string(), Schema::string()),
                )
                .binding(Binding::HeaderPrefix("x-".to_string())),
                MemberSchema::new(
                    "inner",
                    Schema::map("Inner", Schema::string(), Schema::string()),
                )
                .binding(Binding::HeaderPrefix("x-meta-".to_string())),
            ],
        );
        let response = Response::new(200)
            .with_header("x-meta-a", "1")
            .with_header("x-other", "2");
        let parsed = parse_http_bindings(&output, &response).unwrap();
        let Some(Value::Map(inner)) = parsed.field("inner") else {
            panic!("expected inner map");
        };
        assert_eq!(inner.get("a"), Some(&Value::Str("1".to_string())));
        let Some(Value::Map(meta)) = parsed.field("meta") else {
            panic!("expected meta map");
        };
        assert!(meta.contains_key("other"));
        assert!(!meta.contains_key("meta-a"));
    }

    #[test]
    fn invalid_header_number_reports_error() {
        let output = Schema::structure(
            "Out",
            vec![MemberSchema::new("count", Schema::integer())
                .binding(Binding::Header("x-count".to_string()))],
        );
        let response = Response::new(200).with_header("x-count", "seven");
        assert!(matches!(
            parse_http_bindings(&output, &response),
            Err(CodecError::InvalidNumberFormat(_))
        ));
    }

    #[test]
    fn strict_mode_rejects_unclaimed_headers() {
        let output = Schema::structure(
            "Out",
            vec![MemberSchema::new("id", Schema::string())
                .binding(Binding::Header("x-id".to_string()))],
        );
        let ok = Response::new(200)
            .with_header("x-id", "a")
            .with_header("Content-Type", "application/json");
        assert!(parse_http_bindings_strict(&output, &ok).is_ok());

        let bad = Response::new(200).with_header("x-mystery", "b");
        assert!(matches!(
            parse_http_bindings_strict(&output, &bad),
            Err(CodecError::UnknownHeader(h)) if h == "x-mystery"
        ));
    }

    #[test]
    fn status_expectation() {
        let op = op_with_input("/", Schema::structure("In", vec![]));
        assert!(expect_status(&op, &Response::new(200)).is_ok());
        assert!(expect_status(&op, &Response::new(204)).is_ok());
        assert!(matches!(
            expect_status(&op, &Response::new(500)),
            Err(CodecError::UnexpectedResponseStatus(500))
        ));
    }

    #[test]
    fn http_date_header_timestamp() {
        let output = Schema::structure(
            "Out",
            vec![MemberSchema::new(
                "when",
                Schema::timestamp(TimestampFormat::HttpDate),
            )
            .binding(Binding::Header("last-modified".to_string()))],
        );
        let response =
            Response::new(200).with_header("Last-Modified", "Tue, 29 Apr 2014 18:30:38 GMT");
        let parsed = parse_http_bindings(&output, &response).unwrap();
        assert!(matches!(parsed.field("when"), Some(Value::Timestamp(_))));
    }
}
