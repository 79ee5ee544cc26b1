//! Model → schema lowering
//!
//! Builds the codec [`Schema`] descriptors for every shape reachable from
//! one service, applying HTTP binding traits, XML options, and protocol
//! defaults. Built once per service; consumed by both the emitted code and
//! the runtime codec the tests drive directly.

use smithygen_codec::{
    Binding, ErrorDescriptor, ErrorRegistry, ErrorSource, MemberSchema, OperationSchema, Schema,
    SchemaRef, SerialKind, TimestampFormat, XmlOptions,
};
use smithygen_common::{to_snake_case, SmithyId};
use smithygen_model::traits::ids;
use smithygen_model::{EnumValue, Shape, SymbolsProvider, TraitValue};

use crate::error::{CodegenError, Result};

/// The wire protocol one service speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    AwsJson10,
    AwsJson11,
    RestJson,
    RestXml,
}

impl Protocol {
    pub fn is_rest(self) -> bool {
        matches!(self, Protocol::RestJson | Protocol::RestXml)
    }

    /// Timestamp format used when the trait is absent.
    fn default_timestamp(self) -> TimestampFormat {
        match self {
            Protocol::RestXml => TimestampFormat::DateTime,
            _ => TimestampFormat::EpochSeconds,
        }
    }
}

/// Schema builder for one service projection.
pub struct Lowering<'a> {
    symbols: &'a SymbolsProvider,
    pub protocol: Protocol,
}

impl<'a> Lowering<'a> {
    pub fn new(symbols: &'a SymbolsProvider) -> Self {
        Lowering {
            protocol: detect_protocol(symbols),
            symbols,
        }
    }

    /// Lower one operation: `@http` method/URI plus input/output schemas.
    pub fn operation(&self, op_id: SmithyId) -> Result<OperationSchema> {
        let Shape::Operation(op) = self.symbols.shape(op_id)? else {
            return Err(CodegenError::Lowering(format!(
                "{} is not an operation",
                self.symbols.display_name(op_id)
            )));
        };
        let bag = self.symbols.trait_bag(op_id);
        let (method, uri, code) = bag
            .http()
            .map(|(m, u, c)| (m.to_string(), u.to_string(), c))
            .unwrap_or_else(|| ("POST".to_string(), "/".to_string(), 200));

        let input = match op.input {
            Some(id) if id != SmithyId::UNIT => {
                self.structure_schema(id, true, &mut Vec::new())?
            }
            _ => Schema::structure("Unit", vec![]),
        };
        let output = match op.output {
            Some(id) if id != SmithyId::UNIT => {
                self.structure_schema(id, false, &mut Vec::new())?
            }
            _ => Schema::structure("Unit", vec![]),
        };

        let service_name = self
            .symbols
            .local_name(self.symbols.service_id())?
            .to_string();
        let op_name = self.symbols.local_name(op_id)?.to_string();
        let mut schema = OperationSchema::new(service_name, op_name, method, &uri, input, output)?;
        schema.code = code;
        Ok(schema)
    }

    /// Lower a named data shape.
    pub fn shape(&self, id: SmithyId) -> Result<SchemaRef> {
        let mut stack = Vec::new();
        self.shape_inner(id, &mut stack)
    }

    fn structure_schema(
        &self,
        id: SmithyId,
        is_input: bool,
        stack: &mut Vec<SmithyId>,
    ) -> Result<SchemaRef> {
        let resolved = self.symbols.resolve(id)?;
        if resolved.is_primitive()
            || !matches!(self.symbols.shape(resolved)?, Shape::Structure { .. })
        {
            // Fall through for non-structures (unit targets).
            return self.shape_inner(resolved, stack);
        }
        let members = self.structure_members(resolved, is_input, stack)?;
        let name = self.symbols.local_name(resolved)?.to_string();
        let mut schema = Schema::structure(name, members);
        if let Some(TraitValue::XmlNamespace { uri, prefix }) = self
            .symbols
            .trait_bag(resolved)
            .get(ids::XML_NAMESPACE)
        {
            schema = schema.with_xml(XmlOptions {
                name: self
                    .symbols
                    .trait_bag(resolved)
                    .xml_name()
                    .map(str::to_string),
                namespace: Some(smithygen_codec::XmlNamespace {
                    uri: uri.clone(),
                    prefix: prefix.clone(),
                }),
                ..Default::default()
            });
        } else if let Some(xml_name) = self.symbols.trait_bag(resolved).xml_name() {
            schema = schema.with_xml(XmlOptions {
                name: Some(xml_name.to_string()),
                ..Default::default()
            });
        }
        Ok(schema)
    }

    fn structure_members(
        &self,
        id: SmithyId,
        is_input: bool,
        stack: &mut Vec<SmithyId>,
    ) -> Result<Vec<MemberSchema>> {
        let Shape::Structure { members } = self.symbols.shape(id)? else {
            return Err(CodegenError::Lowering(format!(
                "{} is not a structure",
                self.symbols.display_name(id)
            )));
        };
        let mut out = Vec::with_capacity(members.len());
        for member_id in members {
            out.push(self.member_schema(*member_id, is_input, stack)?);
        }
        // Exactly one payload member is allowed; the rest of the body is
        // dropped for that protocol, so two is a modeling error.
        if out.iter().filter(|m| m.binding == Binding::Payload).count() > 1 {
            return Err(CodegenError::Lowering(format!(
                "{} has more than one httpPayload member",
                self.symbols.display_name(id)
            )));
        }
        Ok(out)
    }

    fn member_schema(
        &self,
        member_id: SmithyId,
        is_input: bool,
        stack: &mut Vec<SmithyId>,
    ) -> Result<MemberSchema> {
        let api_name = self.symbols.local_name(member_id)?.to_string();
        let field_name = to_snake_case(&api_name).into_owned();
        let bag = self.symbols.trait_bag(member_id);

        let Shape::Target(target) = self.symbols.shape(member_id)? else {
            return Err(CodegenError::Lowering(format!(
                "member {} has no target",
                self.symbols.display_name(member_id)
            )));
        };
        let mut schema = self.shape_inner(*target, stack)?;

        // Member-level timestamp format overrides the shape's.
        if let (Some(format), SerialKind::Timestamp(_)) = (bag.timestamp_format(), &schema.kind) {
            schema = Schema::timestamp(lower_ts(format));
        }

        let binding = if self.protocol.is_rest() {
            member_binding(&bag)
        } else {
            Binding::Body
        };

        // Header timestamps default to the http-date format.
        if matches!(binding, Binding::Header(_))
            && bag.timestamp_format().is_none()
            && matches!(schema.kind, SerialKind::Timestamp(_))
        {
            schema = Schema::timestamp(TimestampFormat::HttpDate);
        }

        let required = !is_input && (bag.is_required() || bag.has_default());

        let mut member = MemberSchema::new(field_name, schema).api_name(api_name);
        member.binding = binding;
        member.required = required;
        member.xml.attribute = bag.has(ids::XML_ATTRIBUTE);
        member.xml.flat = bag.has(ids::XML_FLATTENED);
        if let Some(xml_name) = bag.xml_name() {
            member.xml.name = Some(xml_name.to_string());
        }
        if let Some(TraitValue::XmlNamespace { uri, prefix }) = bag.get(ids::XML_NAMESPACE) {
            member.xml.namespace = Some(smithygen_codec::XmlNamespace {
                uri: uri.clone(),
                prefix: prefix.clone(),
            });
        }
        Ok(member)
    }

    fn shape_inner(&self, id: SmithyId, stack: &mut Vec<SmithyId>) -> Result<SchemaRef> {
        let id = self.symbols.resolve(id)?;
        if id.is_primitive() {
            return self.primitive_schema(id);
        }
        if stack.contains(&id) {
            // The schema tree cannot express value recursion.
            return Err(CodegenError::Lowering(format!(
                "recursive shape {} is not supported",
                self.symbols.display_name(id)
            )));
        }
        stack.push(id);
        let result = self.shape_dispatch(id, stack);
        stack.pop();
        result
    }

    fn shape_dispatch(&self, id: SmithyId, stack: &mut Vec<SmithyId>) -> Result<SchemaRef> {
        let name = self.symbols.local_name(id)?.to_string();
        let bag = self.symbols.trait_bag(id);
        Ok(match self.symbols.shape(id)? {
            Shape::Blob => Schema::blob(),
            Shape::Boolean => Schema::boolean(),
            Shape::String => Schema::string(),
            Shape::Byte => Schema::byte(),
            Shape::Short => Schema::short(),
            Shape::Integer => Schema::integer(),
            Shape::Long => Schema::long(),
            Shape::Float => Schema::float(),
            Shape::Double => Schema::double(),
            Shape::Timestamp => {
                let format = bag
                    .timestamp_format()
                    .map(lower_ts)
                    .unwrap_or_else(|| self.protocol.default_timestamp());
                Schema::timestamp(format)
            }
            Shape::BigInteger | Shape::BigDecimal | Shape::Document => {
                return Err(CodegenError::Lowering(format!(
                    "shape {name} is outside the codec support matrix"
                )))
            }
            Shape::List { member } => {
                let member_bag = self.symbols.trait_bag(*member);
                let Shape::Target(target) = self.symbols.shape(*member)? else {
                    return Err(CodegenError::Lowering(format!(
                        "list member of {name} has no target"
                    )));
                };
                let mut item = self.shape_inner(*target, stack)?;
                if let Some(xml_name) = member_bag.xml_name() {
                    item = item.with_xml(XmlOptions {
                        name: Some(xml_name.to_string()),
                        ..item.xml.clone()
                    });
                }
                if bag.has(ids::SPARSE) {
                    Schema::sparse_list(name, item)
                } else if bag.has(ids::UNIQUE_ITEMS) {
                    Schema::set(name, item)
                } else {
                    Schema::list(name, item)
                }
            }
            Shape::Map { key, value } => {
                let key_schema = self.part_schema(*key, stack)?;
                let value_schema = self.part_schema(*value, stack)?;
                Schema::map(name, key_schema, value_schema)
            }
            Shape::Structure { .. } => {
                let members = self.structure_members(id, false, stack)?;
                Schema::structure(name, members)
            }
            Shape::Union { members } => {
                let mut lowered = Vec::with_capacity(members.len());
                for member_id in members {
                    lowered.push(self.member_schema(*member_id, false, stack)?);
                }
                Schema::union(name, lowered)
            }
            Shape::StrEnum { members } => {
                let mut values = Vec::with_capacity(members.len());
                for member_id in members {
                    let member_bag = self.symbols.trait_bag(*member_id);
                    let value = match member_bag.enum_value() {
                        Some(EnumValue::Str(s)) => s.clone(),
                        _ => self.symbols.local_name(*member_id)?.to_string(),
                    };
                    values.push(value);
                }
                Schema::str_enum(name, values.iter().map(String::as_str).collect())
            }
            Shape::IntEnum { members } => {
                let mut values = Vec::with_capacity(members.len());
                for member_id in members {
                    let member_bag = self.symbols.trait_bag(*member_id);
                    match member_bag.enum_value() {
                        Some(EnumValue::Int(i)) => values.push(*i as i32),
                        _ => {
                            return Err(CodegenError::Lowering(format!(
                                "intEnum member {} has no enumValue",
                                self.symbols.display_name(*member_id)
                            )))
                        }
                    }
                }
                Schema::int_enum(name, values)
            }
            Shape::Unit => Schema::structure("Unit", vec![]),
            Shape::Target(_) | Shape::Operation(_) | Shape::Resource(_) | Shape::Service(_) => {
                return Err(CodegenError::Lowering(format!(
                    "shape {name} cannot appear in a data position"
                )))
            }
        })
    }

    /// Lower a map key/value member edge.
    fn part_schema(&self, member_id: SmithyId, stack: &mut Vec<SmithyId>) -> Result<SchemaRef> {
        let member_bag = self.symbols.trait_bag(member_id);
        let Shape::Target(target) = self.symbols.shape(member_id)? else {
            return Err(CodegenError::Lowering(format!(
                "member {} has no target",
                self.symbols.display_name(member_id)
            )));
        };
        let mut schema = self.shape_inner(*target, stack)?;
        if let Some(xml_name) = member_bag.xml_name() {
            schema = schema.with_xml(XmlOptions {
                name: Some(xml_name.to_string()),
                ..schema.xml.clone()
            });
        }
        Ok(schema)
    }

    fn primitive_schema(&self, id: SmithyId) -> Result<SchemaRef> {
        Ok(match id {
            SmithyId::BLOB => Schema::blob(),
            SmithyId::BOOLEAN | SmithyId::PRIMITIVE_BOOLEAN => Schema::boolean(),
            SmithyId::STRING => Schema::string(),
            SmithyId::BYTE | SmithyId::PRIMITIVE_BYTE => Schema::byte(),
            SmithyId::SHORT | SmithyId::PRIMITIVE_SHORT => Schema::short(),
            SmithyId::INTEGER | SmithyId::PRIMITIVE_INTEGER => Schema::integer(),
            SmithyId::LONG | SmithyId::PRIMITIVE_LONG => Schema::long(),
            SmithyId::FLOAT | SmithyId::PRIMITIVE_FLOAT => Schema::float(),
            SmithyId::DOUBLE | SmithyId::PRIMITIVE_DOUBLE => Schema::double(),
            SmithyId::TIMESTAMP => Schema::timestamp(self.protocol.default_timestamp()),
            SmithyId::UNIT => Schema::structure("Unit", vec![]),
            other => {
                return Err(CodegenError::Lowering(format!(
                    "prelude shape {other} is outside the codec support matrix"
                )))
            }
        })
    }

    /// Aggregate operation errors with service-level errors into the
    /// runtime registry.
    pub fn error_registry(&self, op_id: SmithyId) -> Result<ErrorRegistry> {
        let mut registry = ErrorRegistry::new();
        for error_id in self.error_ids(op_id)? {
            let bag = self.symbols.trait_bag(error_id);
            let source = match bag.error_source() {
                Some(smithygen_model::ErrorSource::Server) => ErrorSource::Server,
                _ => ErrorSource::Client,
            };
            let mut descriptor =
                ErrorDescriptor::new(self.symbols.local_name(error_id)?, source);
            if let Some(status) = bag.http_error() {
                descriptor = descriptor.with_status(status);
            }
            if bag.retryable() {
                descriptor = descriptor.retryable();
            }
            registry.insert(descriptor);
        }
        Ok(registry)
    }

    /// Operation errors ∪ service errors, deduplicated in walk order.
    pub fn error_ids(&self, op_id: SmithyId) -> Result<Vec<SmithyId>> {
        let mut ids = Vec::new();
        if let Shape::Operation(op) = self.symbols.shape(op_id)? {
            ids.extend(op.errors.iter().copied());
        }
        if let Shape::Service(service) = self.symbols.shape(self.symbols.service_id())? {
            ids.extend(service.errors.iter().copied());
        }
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(*id));
        Ok(ids)
    }
}

fn member_binding(bag: &smithygen_model::TraitBag<'_>) -> Binding {
    if bag.has(ids::HTTP_LABEL) {
        Binding::Path
    } else if let Some(TraitValue::HttpQuery(name)) = bag.get(ids::HTTP_QUERY) {
        Binding::Query(name.clone())
    } else if bag.has(ids::HTTP_QUERY_PARAMS) {
        Binding::QueryParams
    } else if let Some(TraitValue::HttpHeader(name)) = bag.get(ids::HTTP_HEADER) {
        Binding::Header(name.clone())
    } else if let Some(TraitValue::HttpPrefixHeaders(prefix)) = bag.get(ids::HTTP_PREFIX_HEADERS) {
        Binding::HeaderPrefix(prefix.clone())
    } else if bag.has(ids::HTTP_PAYLOAD) {
        Binding::Payload
    } else if bag.has(ids::HTTP_RESPONSE_CODE) {
        Binding::StatusCode
    } else {
        Binding::Body
    }
}

fn lower_ts(format: smithygen_model::TimestampFormat) -> TimestampFormat {
    match format {
        smithygen_model::TimestampFormat::EpochSeconds => TimestampFormat::EpochSeconds,
        smithygen_model::TimestampFormat::DateTime => TimestampFormat::DateTime,
        smithygen_model::TimestampFormat::HttpDate => TimestampFormat::HttpDate,
    }
}

fn detect_protocol(symbols: &SymbolsProvider) -> Protocol {
    let bag = symbols.trait_bag(symbols.service_id());
    if bag.has(ids::REST_XML) {
        Protocol::RestXml
    } else if bag.has(ids::REST_JSON_1) {
        Protocol::RestJson
    } else if bag.has(ids::AWS_JSON_1_1) {
        Protocol::AwsJson11
    } else {
        Protocol::AwsJson10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smithygen_common::{IssuesBag, Policies};
    use smithygen_model::{parse_model, ParseOptions, TraitRegistry};

    fn project(json: &str) -> SymbolsProvider {
        let registry = TraitRegistry::builtin();
        let opts = ParseOptions {
            registry: &registry,
            policy: Policies::default().parse,
        };
        let mut issues = IssuesBag::new();
        let model = parse_model(json.as_bytes(), &opts, &mut issues).unwrap();
        SymbolsProvider::consume(model).unwrap()
    }

    const REST_MODEL: &str = r#"{
        "smithy": "2.0",
        "shapes": {
            "com.example#Files": {
                "type": "service",
                "version": "1",
                "operations": [{"target": "com.example#GetFile"}],
                "traits": {"aws.protocols#restJson1": {}}
            },
            "com.example#GetFile": {
                "type": "operation",
                "input": {"target": "com.example#GetFileInput"},
                "output": {"target": "smithy.api#Unit"},
                "errors": [{"target": "com.example#NotFoundError"}],
                "traits": {"smithy.api#http": {"method": "GET", "uri": "/files/{name+}", "code": 200}}
            },
            "com.example#GetFileInput": {
                "type": "structure",
                "members": {
                    "name": {
                        "target": "smithy.api#String",
                        "traits": {"smithy.api#httpLabel": {}, "smithy.api#required": {}}
                    },
                    "Version": {
                        "target": "smithy.api#String",
                        "traits": {"smithy.api#httpQuery": "version"}
                    },
                    "when": {
                        "target": "smithy.api#Timestamp",
                        "traits": {"smithy.api#httpHeader": "x-when"}
                    }
                }
            },
            "com.example#NotFoundError": {
                "type": "structure",
                "members": {},
                "traits": {"smithy.api#error": "client", "smithy.api#httpError": 404}
            }
        }
    }"#;

    #[test]
    fn protocol_detection_and_bindings() {
        let symbols = project(REST_MODEL);
        let lowering = Lowering::new(&symbols);
        assert_eq!(lowering.protocol, Protocol::RestJson);

        let op = lowering
            .operation(SmithyId::of("com.example#GetFile"))
            .unwrap();
        assert_eq!(op.method, "GET");
        assert_eq!(op.service, "Files");
        assert_eq!(op.name, "GetFile");

        let name = op.input.member("name").unwrap();
        assert_eq!(name.binding, Binding::Path);
        // Input members are optional regardless of @required.
        assert!(!name.required);

        let version = op.input.member("version").unwrap();
        assert_eq!(version.api_name, "Version");
        assert_eq!(version.binding, Binding::Query("version".to_string()));

        // Header timestamps default to http-date.
        let when = op.input.member("when").unwrap();
        assert_eq!(
            when.schema.kind,
            SerialKind::Timestamp(TimestampFormat::HttpDate)
        );
    }

    #[test]
    fn error_registry_statuses() {
        let symbols = project(REST_MODEL);
        let lowering = Lowering::new(&symbols);
        let registry = lowering
            .error_registry(SmithyId::of("com.example#GetFile"))
            .unwrap();
        let descriptor = registry.get("NotFoundError").unwrap();
        assert_eq!(descriptor.status, 404);
        assert_eq!(descriptor.source, ErrorSource::Client);
    }

    #[test]
    fn aws_json_ignores_bindings() {
        let json_model = REST_MODEL.replace("aws.protocols#restJson1", "aws.protocols#awsJson1_1");
        let symbols = project(&json_model);
        let lowering = Lowering::new(&symbols);
        assert_eq!(lowering.protocol, Protocol::AwsJson11);
        let op = lowering
            .operation(SmithyId::of("com.example#GetFile"))
            .unwrap();
        assert!(op
            .input
            .members()
            .iter()
            .all(|m| m.binding == Binding::Body));
    }

    #[test]
    fn recursive_shapes_are_rejected() {
        let symbols = project(
            r#"{
                "smithy": "2.0",
                "shapes": {
                    "com.example#Svc": {
                        "type": "service", "version": "1",
                        "operations": [{"target": "com.example#Op"}]
                    },
                    "com.example#Op": {
                        "type": "operation",
                        "input": {"target": "com.example#Node"}
                    },
                    "com.example#Node": {
                        "type": "structure",
                        "members": {"next": {"target": "com.example#Node"}}
                    }
                }
            }"#,
        );
        let lowering = Lowering::new(&symbols);
        assert!(matches!(
            lowering.shape(SmithyId::of("com.example#Node")),
            Err(CodegenError::Lowering(_))
        ));
    }
}
