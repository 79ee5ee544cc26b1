//! Schema descriptors
//!
//! A schema is the codec-facing descriptor of one shape: its serial kind,
//! its members with their HTTP bindings, and its XML/JSON naming options.
//! Schemas are built once per service during code generation and shared
//! behind [`SchemaRef`]s by the generated code and the runtime codec.

use std::sync::Arc;

use crate::error::{CodecError, Result};

pub type SchemaRef = Arc<Schema>;

/// Timestamp wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    EpochSeconds,
    DateTime,
    HttpDate,
}

/// Where a member lands in the HTTP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Serialized into the protocol body.
    Body,
    /// Substituted into a URI path label.
    Path,
    /// A named query parameter.
    Query(String),
    /// A map of free-form query parameters; explicit `Query` wins.
    QueryParams,
    /// A named header.
    Header(String),
    /// One header per map entry, names prefixed.
    HeaderPrefix(String),
    /// The member is the entire payload.
    Payload,
    /// Bound to the response status code.
    StatusCode,
    /// Not serialized.
    None,
}

/// XML element placement options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlOptions {
    /// Element name override (`xmlName`).
    pub name: Option<String>,
    pub namespace: Option<XmlNamespace>,
    /// Emit as an attribute on the enclosing element.
    pub attribute: bool,
    /// Collections without a wrapping element.
    pub flat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNamespace {
    pub uri: String,
    pub prefix: Option<String>,
}

/// One structure or union member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSchema {
    /// Field name in [`crate::Value::Struct`] maps.
    pub name: String,
    /// Wire name (after `jsonName`/`xmlName` overrides).
    pub api_name: String,
    pub binding: Binding,
    pub required: bool,
    pub xml: XmlOptions,
    pub schema: SchemaRef,
}

impl MemberSchema {
    pub fn new(name: impl Into<String>, schema: SchemaRef) -> Self {
        let name = name.into();
        MemberSchema {
            api_name: name.clone(),
            name,
            binding: Binding::Body,
            required: false,
            xml: XmlOptions::default(),
            schema,
        }
    }

    pub fn api_name(mut self, api_name: impl Into<String>) -> Self {
        self.api_name = api_name.into();
        self
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn xml_name(mut self, name: impl Into<String>) -> Self {
        self.xml.name = Some(name.into());
        self
    }

    pub fn xml_attribute(mut self) -> Self {
        self.xml.attribute = true;
        self
    }

    pub fn xml_flat(mut self) -> Self {
        self.xml.flat = true;
        self
    }

    pub fn xml_namespace(mut self, uri: impl Into<String>, prefix: Option<&str>) -> Self {
        self.xml.namespace = Some(XmlNamespace {
            uri: uri.into(),
            prefix: prefix.map(str::to_string),
        });
        self
    }
}

/// Serial kind with kind-specific layout.
#[derive(Debug, Clone, PartialEq)]
pub enum SerialKind {
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    Float,
    Double,
    String,
    Blob,
    Timestamp(TimestampFormat),
    ListDense(SchemaRef),
    ListSparse(SchemaRef),
    Set(SchemaRef),
    Map(SchemaRef, SchemaRef),
    Structure(Vec<MemberSchema>),
    TaggedUnion(Vec<MemberSchema>),
    StrEnum(Vec<String>),
    IntEnum(Vec<i32>),
}

/// A shape descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Local shape name; XML uses it as the default element name.
    pub name: String,
    pub kind: SerialKind,
    pub xml: XmlOptions,
}

impl Schema {
    fn scalar(name: &str, kind: SerialKind) -> SchemaRef {
        Arc::new(Schema {
            name: name.to_string(),
            kind,
            xml: XmlOptions::default(),
        })
    }

    pub fn boolean() -> SchemaRef {
        Self::scalar("Boolean", SerialKind::Boolean)
    }

    pub fn byte() -> SchemaRef {
        Self::scalar("Byte", SerialKind::Byte)
    }

    pub fn short() -> SchemaRef {
        Self::scalar("Short", SerialKind::Short)
    }

    pub fn integer() -> SchemaRef {
        Self::scalar("Integer", SerialKind::Integer)
    }

    pub fn long() -> SchemaRef {
        Self::scalar("Long", SerialKind::Long)
    }

    pub fn float() -> SchemaRef {
        Self::scalar("Float", SerialKind::Float)
    }

    pub fn double() -> SchemaRef {
        Self::scalar("Double", SerialKind::Double)
    }

    pub fn string() -> SchemaRef {
        Self::scalar("String", SerialKind::String)
    }

    pub fn blob() -> SchemaRef {
        Self::scalar("Blob", SerialKind::Blob)
    }

    pub fn timestamp(format: TimestampFormat) -> SchemaRef {
        Self::scalar("Timestamp", SerialKind::Timestamp(format))
    }

    pub fn list(name: impl Into<String>, item: SchemaRef) -> SchemaRef {
        Arc::new(Schema {
            name: name.into(),
            kind: SerialKind::ListDense(item),
            xml: XmlOptions::default(),
        })
    }

    pub fn sparse_list(name: impl Into<String>, item: SchemaRef) -> SchemaRef {
        Arc::new(Schema {
            name: name.into(),
            kind: SerialKind::ListSparse(item),
            xml: XmlOptions::default(),
        })
    }

    pub fn set(name: impl Into<String>, item: SchemaRef) -> SchemaRef {
        Arc::new(Schema {
            name: name.into(),
            kind: SerialKind::Set(item),
            xml: XmlOptions::default(),
        })
    }

    pub fn map(name: impl Into<String>, key: SchemaRef, value: SchemaRef) -> SchemaRef {
        Arc::new(Schema {
            name: name.into(),
            kind: SerialKind::Map(key, value),
            xml: XmlOptions::default(),
        })
    }

    pub fn structure(name: impl Into<String>, members: Vec<MemberSchema>) -> SchemaRef {
        Arc::new(Schema {
            name: name.into(),
            kind: SerialKind::Structure(members),
            xml: XmlOptions::default(),
        })
    }

    pub fn union(name: impl Into<String>, members: Vec<MemberSchema>) -> SchemaRef {
        Arc::new(Schema {
            name: name.into(),
            kind: SerialKind::TaggedUnion(members),
            xml: XmlOptions::default(),
        })
    }

    pub fn str_enum(name: impl Into<String>, values: Vec<&str>) -> SchemaRef {
        Arc::new(Schema {
            name: name.into(),
            kind: SerialKind::StrEnum(values.into_iter().map(str::to_string).collect()),
            xml: XmlOptions::default(),
        })
    }

    pub fn int_enum(name: impl Into<String>, values: Vec<i32>) -> SchemaRef {
        Arc::new(Schema {
            name: name.into(),
            kind: SerialKind::IntEnum(values),
            xml: XmlOptions::default(),
        })
    }

    /// Rebuild with an XML name/namespace override on the shape itself.
    pub fn with_xml(&self, xml: XmlOptions) -> SchemaRef {
        Arc::new(Schema {
            name: self.name.clone(),
            kind: self.kind.clone(),
            xml,
        })
    }

    pub fn members(&self) -> &[MemberSchema] {
        match &self.kind {
            SerialKind::Structure(members) | SerialKind::TaggedUnion(members) => members,
            _ => &[],
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberSchema> {
        self.members().iter().find(|m| m.name == name)
    }

    /// The member bound as the whole payload, if any. At most one member
    /// of an operation input may carry this binding.
    pub fn payload_member(&self) -> Option<&MemberSchema> {
        self.members()
            .iter()
            .find(|m| m.binding == Binding::Payload)
    }

    /// The XML element name for this shape.
    pub fn xml_name(&self) -> &str {
        self.xml.name.as_deref().unwrap_or(&self.name)
    }
}

/// An operation: HTTP method, URI template, and input/output schemas.
#[derive(Debug, Clone)]
pub struct OperationSchema {
    /// Service shape name (for `x-amz-target`).
    pub service: String,
    pub name: String,
    pub method: String,
    pub uri: UriTemplate,
    pub input: SchemaRef,
    pub output: SchemaRef,
    /// Expected success status from `@http code`.
    pub code: u16,
}

impl OperationSchema {
    pub fn new(
        service: impl Into<String>,
        name: impl Into<String>,
        method: impl Into<String>,
        uri: &str,
        input: SchemaRef,
        output: SchemaRef,
    ) -> Result<Self> {
        Ok(OperationSchema {
            service: service.into(),
            name: name.into(),
            method: method.into(),
            uri: UriTemplate::parse(uri)?,
            input,
            output,
            code: 200,
        })
    }
}

/// A parsed `@http` URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    pub segments: Vec<UriSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriSegment {
    Literal(String),
    /// `{name}` — value is percent-encoded including `/`.
    Label(String),
    /// `{name+}` — value keeps `/` intact.
    Greedy(String),
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<UriTemplate> {
        let mut segments = Vec::new();
        for part in template.split('/') {
            if part.is_empty() {
                continue;
            }
            if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if let Some(name) = inner.strip_suffix('+') {
                    segments.push(UriSegment::Greedy(name.to_string()));
                } else {
                    segments.push(UriSegment::Label(inner.to_string()));
                }
            } else if part.contains(['{', '}']) {
                return Err(CodecError::InvalidValue(format!(
                    "malformed URI template segment `{part}`"
                )));
            } else {
                segments.push(UriSegment::Literal(part.to_string()));
            }
        }
        Ok(UriTemplate { segments })
    }
}
