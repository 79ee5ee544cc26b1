//! Per-service code generation
//!
//! Writes one directory per service: `client.rs` with per-operation
//! methods and schema constructors, `errors.rs` with the error taxonomy,
//! `endpoint.rs` when the service carries an endpoint rule set,
//! `resource_<name>.rs` per top-level resource, and a rendered README.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use smithygen_codec::{Binding, MemberSchema, Schema, SerialKind, TimestampFormat};
use smithygen_common::{
    to_pascal_case, to_snake_case, CodegenPolicy, IssueKind, IssuesBag, Policy, SmithyId,
};
use smithygen_model::traits::ids;
use smithygen_model::{Shape, SymbolsProvider, TraitValue};

use crate::endpoint::{generate_endpoint_module, RuleSet};
use crate::error::{CodegenError, Result};
use crate::lower::{Lowering, Protocol};
use crate::pipeline::Hooks;
use crate::templates;
use crate::writer::{quoted, EnumBuilder, FnBuilder, SourceWriter, StructBuilder};

/// Generate all artifacts for one service into `out_dir/<slug>/`.
pub fn generate_service(
    out_dir: &Path,
    slug: &str,
    symbols: &SymbolsProvider,
    hooks: &Hooks,
    policy: CodegenPolicy,
    issues: &mut IssuesBag,
) -> Result<Vec<String>> {
    let service_dir = out_dir.join(slug);
    fs::create_dir_all(&service_dir)?;

    let mut written = Vec::new();

    let client = generate_client(symbols, hooks, policy, issues)?;
    flush_file(&service_dir.join("client.rs"), &client)?;
    written.push("client.rs".to_string());

    let errors = generate_errors(symbols)?;
    flush_file(&service_dir.join("errors.rs"), &errors)?;
    written.push("errors.rs".to_string());

    let service_bag = symbols.trait_bag(symbols.service_id());
    match service_bag.get(ids::ENDPOINT_RULE_SET) {
        Some(TraitValue::EndpointRuleSet(doc)) => {
            let rule_set = RuleSet::from_document(doc)?;
            let tests = match service_bag.get(ids::ENDPOINT_TESTS) {
                Some(TraitValue::EndpointTests(tests)) => Some(tests.clone()),
                _ => None,
            };
            let endpoint = generate_endpoint_module(&rule_set, tests.as_ref())?;
            flush_file(&service_dir.join("endpoint.rs"), &endpoint)?;
            written.push("endpoint.rs".to_string());
        }
        _ => {
            // Test cases cannot run against a resolver that was never
            // modeled.
            if service_bag.has(ids::ENDPOINT_TESTS) {
                return Err(CodegenError::MissingEndpointRuleSet);
            }
        }
    }

    let resource_ids: Vec<SmithyId> = match symbols.shape(symbols.service_id())? {
        Shape::Service(service) => service.resources.clone(),
        _ => Vec::new(),
    };
    for resource_id in resource_ids {
        let name = to_snake_case(symbols.local_name(resource_id)?).into_owned();
        let content = generate_resource(symbols, resource_id)?;
        let file_name = format!("resource_{name}.rs");
        flush_file(&service_dir.join(&file_name), &content)?;
        written.push(file_name);
    }

    let readme = templates::render_readme(symbols, hooks)?;
    flush_file(&service_dir.join("README.md"), &readme)?;
    written.push("README.md".to_string());

    Ok(written)
}

/// open → buffered write → flush → close.
fn flush_file(path: &Path, content: &str) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn generate_client(
    symbols: &SymbolsProvider,
    hooks: &Hooks,
    policy: CodegenPolicy,
    issues: &mut IssuesBag,
) -> Result<String> {
    let lowering = Lowering::new(symbols);
    let service_name = symbols.local_name(symbols.service_id())?.to_string();

    let mut w = SourceWriter::new();
    if let Some(header) = &hooks.script_header {
        header(&mut w);
    } else {
        w.comment("Generated by smithygen. Do not edit.");
    }
    w.blank();
    w.doc(&format!("Client for the {service_name} service."));
    if let Some(doc) = symbols.trait_bag(symbols.service_id()).documentation() {
        w.doc("");
        w.doc(doc);
    }
    w.blank();
    w.line("use smithygen_codec::{");
    w.line("    expect_status, parse_http_bindings, read_json_payload, read_xml_payload,");
    w.line("    write_aws_json_request, write_http_bindings, write_rest_json_body,");
    w.line("    write_xml_payload, Binding, ClientConfig, CodecError, ConfigError, JsonFlavor,");
    w.line("    MemberSchema, OperationSchema, Request, Response, Schema, TimestampFormat, Value,");
    w.line("};");
    w.blank();

    StructBuilder::new("Client")
        .doc(&format!("A configured {service_name} client."))
        .field("config", "ClientConfig")
        .write(&mut w);
    w.blank();

    w.open("impl Client");
    FnBuilder::new("pub fn new(config: ClientConfig) -> Result<Self, ConfigError>").write(
        &mut w,
        |w| {
            w.line("config.validate()?;");
            w.line("Ok(Client { config })");
        },
    );

    let operations: Vec<SmithyId> = symbols.operations().to_vec();
    for op_id in &operations {
        let op = match lowering.operation(*op_id) {
            Ok(op) => op,
            Err(err) => {
                if policy.shape_fail == Policy::Abort {
                    return Err(err);
                }
                issues.push(
                    IssueKind::ShapeCodegenFailed,
                    symbols.display_name(*op_id),
                    err.to_string(),
                );
                continue;
            }
        };
        let method_name = to_snake_case(&op.name).into_owned();
        w.blank();
        if let Some(doc) = symbols.trait_bag(*op_id).documentation() {
            w.doc(doc);
        }
        FnBuilder::new(format!(
            "pub fn {method_name}(&self, input: &Value) -> Result<Request, CodecError>"
        ))
        .write(&mut w, |w| {
            w.line(format!(
                "let op = schemas::{method_name}_operation();"
            ));
            w.line(format!("let mut request = Request::new({});", quoted(&op.method)));
            match lowering.protocol {
                Protocol::AwsJson10 => {
                    w.line(
                        "write_aws_json_request(&mut request, &op, JsonFlavor::AwsJson10, input)?;",
                    );
                }
                Protocol::AwsJson11 => {
                    w.line(
                        "write_aws_json_request(&mut request, &op, JsonFlavor::AwsJson11, input)?;",
                    );
                }
                Protocol::RestJson => {
                    w.line("write_http_bindings(&mut request, &op, input)?;");
                    w.line("let (body, content_type) = write_rest_json_body(&op.input, input)?;");
                    w.line("request.headers.push((\"content-type\".to_string(), content_type));");
                    w.line("request.payload = body;");
                }
                Protocol::RestXml => {
                    w.line("write_http_bindings(&mut request, &op, input)?;");
                    w.line("request.headers.push((");
                    w.line("    \"content-type\".to_string(),");
                    w.line("    \"application/xml\".to_string(),");
                    w.line("));");
                    w.line("request.payload = write_xml_payload(&op.input, input)?;");
                }
            }
            w.line("Ok(request)");
        });
        w.blank();
        FnBuilder::new(format!(
            "pub fn parse_{method_name}_response(&self, response: &Response) -> Result<Value, CodecError>"
        ))
        .write(&mut w, |w| {
            w.line(format!(
                "let op = schemas::{method_name}_operation();"
            ));
            w.line("expect_status(&op, response)?;");
            match lowering.protocol {
                Protocol::RestXml => {
                    w.line("let mut value = parse_http_bindings(&op.output, response)?;");
                    w.line("let body = read_xml_payload(&op.output, &response.body)?;");
                }
                Protocol::RestJson => {
                    w.line("let mut value = parse_http_bindings(&op.output, response)?;");
                    w.line("let body = read_json_payload(&op.output, &response.body)?;");
                }
                _ => {
                    w.line("let mut value = parse_http_bindings(&op.output, response)?;");
                    w.line("let body = read_json_payload(&op.output, &response.body)?;");
                }
            }
            w.open("if let (Value::Struct(fields), Value::Struct(body_fields)) = (&mut value, body)");
            w.line("fields.extend(body_fields);");
            w.close();
            w.line("Ok(value)");
        });
    }
    w.close();
    w.blank();

    // Operation and shape schema constructors.
    w.doc("Schema descriptors consumed by the runtime codec.");
    w.open("pub mod schemas");
    w.line("use super::*;");
    for op_id in &operations {
        let Ok(op) = lowering.operation(*op_id) else {
            continue;
        };
        let method_name = to_snake_case(&op.name).into_owned();
        w.blank();
        FnBuilder::new(format!(
            "pub fn {method_name}_operation() -> OperationSchema"
        ))
        .write(&mut w, |w| {
            w.line(format!(
                "OperationSchema::new({}, {}, {}, {}, {}, {})",
                quoted(&op.service),
                quoted(&op.name),
                quoted(&op.method),
                quoted(&uri_text(&op)),
                schema_expr(&op.input),
                schema_expr(&op.output),
            ));
            w.line("    .expect(\"generated URI template is valid\")");
        });
    }
    w.close();
    w.blank();

    // Named data shape types, drained through the emission queue.
    w.doc("Generated data types.");
    w.open("pub mod types");
    w.line("#![allow(clippy::large_enum_variant)]");
    for id in symbols.data_shapes().to_vec() {
        symbols.enqueue(id);
    }
    while let Some(id) = symbols.next() {
        match generate_type(symbols, &lowering, id) {
            Ok(Some(text)) => {
                w.blank();
                for line in text.as_str().lines() {
                    w.line(line);
                }
            }
            Ok(None) => {}
            Err(err) => {
                if policy.unknown_shape == Policy::Abort {
                    return Err(err);
                }
                issues.push(
                    IssueKind::UnknownShape,
                    symbols.display_name(id),
                    err.to_string(),
                );
            }
        }
    }
    w.close();

    Ok(w.finish().as_str().to_string())
}

fn uri_text(op: &smithygen_codec::OperationSchema) -> String {
    use smithygen_codec::UriSegment;
    let mut out = String::new();
    for segment in &op.uri.segments {
        out.push('/');
        match segment {
            UriSegment::Literal(text) => out.push_str(text),
            UriSegment::Label(name) => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
            UriSegment::Greedy(name) => {
                out.push('{');
                out.push_str(name);
                out.push_str("+}");
            }
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Render a schema as the builder expression that reconstructs it.
fn schema_expr(schema: &Schema) -> String {
    match &schema.kind {
        SerialKind::Boolean => "Schema::boolean()".to_string(),
        SerialKind::Byte => "Schema::byte()".to_string(),
        SerialKind::Short => "Schema::short()".to_string(),
        SerialKind::Integer => "Schema::integer()".to_string(),
        SerialKind::Long => "Schema::long()".to_string(),
        SerialKind::Float => "Schema::float()".to_string(),
        SerialKind::Double => "Schema::double()".to_string(),
        SerialKind::String => "Schema::string()".to_string(),
        SerialKind::Blob => "Schema::blob()".to_string(),
        SerialKind::Timestamp(format) => format!(
            "Schema::timestamp(TimestampFormat::{})",
            match format {
                TimestampFormat::EpochSeconds => "EpochSeconds",
                TimestampFormat::DateTime => "DateTime",
                TimestampFormat::HttpDate => "HttpDate",
            }
        ),
        SerialKind::ListDense(item) => format!(
            "Schema::list({}, {})",
            quoted(&schema.name),
            schema_expr(item)
        ),
        SerialKind::ListSparse(item) => format!(
            "Schema::sparse_list({}, {})",
            quoted(&schema.name),
            schema_expr(item)
        ),
        SerialKind::Set(item) => format!(
            "Schema::set({}, {})",
            quoted(&schema.name),
            schema_expr(item)
        ),
        SerialKind::Map(key, value) => format!(
            "Schema::map({}, {}, {})",
            quoted(&schema.name),
            schema_expr(key),
            schema_expr(value)
        ),
        SerialKind::Structure(members) => format!(
            "Schema::structure({}, vec![{}])",
            quoted(&schema.name),
            members.iter().map(member_expr).collect::<Vec<_>>().join(", ")
        ),
        SerialKind::TaggedUnion(members) => format!(
            "Schema::union({}, vec![{}])",
            quoted(&schema.name),
            members.iter().map(member_expr).collect::<Vec<_>>().join(", ")
        ),
        SerialKind::StrEnum(values) => format!(
            "Schema::str_enum({}, vec![{}])",
            quoted(&schema.name),
            values
                .iter()
                .map(|v| quoted(v))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        SerialKind::IntEnum(values) => format!(
            "Schema::int_enum({}, vec![{}])",
            quoted(&schema.name),
            values
                .iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn member_expr(member: &MemberSchema) -> String {
    let mut out = format!(
        "MemberSchema::new({}, {})",
        quoted(&member.name),
        schema_expr(&member.schema)
    );
    if member.api_name != member.name {
        out.push_str(&format!(".api_name({})", quoted(&member.api_name)));
    }
    match &member.binding {
        Binding::Body => {}
        Binding::Path => out.push_str(".binding(Binding::Path)"),
        Binding::Query(name) => {
            out.push_str(&format!(".binding(Binding::Query({}.to_string()))", quoted(name)));
        }
        Binding::QueryParams => out.push_str(".binding(Binding::QueryParams)"),
        Binding::Header(name) => {
            out.push_str(&format!(".binding(Binding::Header({}.to_string()))", quoted(name)));
        }
        Binding::HeaderPrefix(prefix) => {
            out.push_str(&format!(
                ".binding(Binding::HeaderPrefix({}.to_string()))",
                quoted(prefix)
            ));
        }
        Binding::Payload => out.push_str(".binding(Binding::Payload)"),
        Binding::StatusCode => out.push_str(".binding(Binding::StatusCode)"),
        Binding::None => out.push_str(".binding(Binding::None)"),
    }
    if member.required {
        out.push_str(".required()");
    }
    if member.xml.attribute {
        out.push_str(".xml_attribute()");
    }
    if member.xml.flat {
        out.push_str(".xml_flat()");
    }
    if let Some(name) = &member.xml.name {
        out.push_str(&format!(".xml_name({})", quoted(name)));
    }
    out
}

/// Emit the Rust type definition for one named data shape.
fn generate_type(
    symbols: &SymbolsProvider,
    lowering: &Lowering<'_>,
    id: SmithyId,
) -> Result<Option<crate::writer::Document>> {
    let name = to_pascal_case(symbols.local_name(id)?).into_owned();
    let doc = symbols.trait_bag(id).documentation().map(str::to_string);
    let mut w = SourceWriter::new();
    match symbols.shape(id)? {
        Shape::Structure { members } => {
            let mut builder = StructBuilder::new(name.as_str()).derive("Debug, Clone, PartialEq");
            if let Some(doc) = &doc {
                builder = builder.doc(doc);
            }
            for member_id in members {
                let field = to_snake_case(symbols.local_name(*member_id)?).into_owned();
                let ty = member_rust_type(symbols, lowering, *member_id)?;
                match symbols.trait_bag(*member_id).documentation() {
                    Some(field_doc) => builder = builder.field_doc(field_doc, field, ty),
                    None => builder = builder.field(field, ty),
                }
            }
            builder.write(&mut w);
        }
        Shape::Union { members } => {
            let mut builder = EnumBuilder::new(name.as_str()).derive("Debug, Clone, PartialEq");
            if let Some(doc) = &doc {
                builder = builder.doc(doc);
            }
            for member_id in members {
                let variant = to_pascal_case(symbols.local_name(*member_id)?).into_owned();
                let ty = member_rust_type(symbols, lowering, *member_id)?;
                builder = builder.variant_with(variant, ty);
            }
            builder.write(&mut w);
        }
        Shape::StrEnum { members } => {
            let mut builder = EnumBuilder::new(name.as_str()).derive("Debug, Clone, PartialEq, Eq");
            if let Some(doc) = &doc {
                builder = builder.doc(doc);
            }
            for member_id in members {
                let variant = to_pascal_case(symbols.local_name(*member_id)?).into_owned();
                match symbols.trait_bag(*member_id).documentation() {
                    Some(variant_doc) => builder = builder.variant_doc(variant_doc, variant),
                    None => builder = builder.variant(variant),
                }
            }
            // Unknown values keep their own copy of the wire string.
            builder = builder.variant_with("Unknown", "String");
            builder.write(&mut w);
        }
        Shape::IntEnum { members } => {
            let mut builder = EnumBuilder::new(name.as_str())
                .derive("Debug, Clone, Copy, PartialEq, Eq")
                .repr("i32");
            if let Some(doc) = &doc {
                builder = builder.doc(doc);
            }
            for member_id in members {
                let variant = to_pascal_case(symbols.local_name(*member_id)?).into_owned();
                builder = builder.variant(variant);
            }
            builder.write(&mut w);
        }
        Shape::Map { .. } => {
            let schema = lowering.shape(id)?;
            let SerialKind::Map(_, value) = &schema.kind else {
                return Ok(None);
            };
            if let Some(doc) = &doc {
                w.doc(doc);
            }
            w.line(format!(
                "pub type {name} = std::collections::HashMap<String, {}>;",
                rust_type(value)
            ));
        }
        _ => return Ok(None),
    }
    Ok(Some(w.finish()))
}

fn member_rust_type(
    symbols: &SymbolsProvider,
    lowering: &Lowering<'_>,
    member_id: SmithyId,
) -> Result<String> {
    let Shape::Target(target) = symbols.shape(member_id)? else {
        return Err(CodegenError::Lowering(format!(
            "member {} has no target",
            symbols.display_name(member_id)
        )));
    };
    let resolved = symbols.resolve(*target)?;
    // Named aggregates refer to their generated types.
    if !resolved.is_primitive() {
        if let Shape::Structure { .. } | Shape::Union { .. } | Shape::StrEnum { .. }
        | Shape::IntEnum { .. } = symbols.shape(resolved)?
        {
            let name = to_pascal_case(symbols.local_name(resolved)?).into_owned();
            return Ok(format!("Option<{name}>"));
        }
    }
    let schema = lowering.shape(resolved)?;
    Ok(format!("Option<{}>", rust_type(&schema)))
}

fn rust_type(schema: &Schema) -> String {
    match &schema.kind {
        SerialKind::Boolean => "bool".to_string(),
        SerialKind::Byte => "i8".to_string(),
        SerialKind::Short => "i16".to_string(),
        SerialKind::Integer => "i32".to_string(),
        SerialKind::Long => "i64".to_string(),
        SerialKind::Float => "f32".to_string(),
        SerialKind::Double => "f64".to_string(),
        SerialKind::String => "String".to_string(),
        SerialKind::Blob => "Vec<u8>".to_string(),
        SerialKind::Timestamp(_) => "smithygen_codec::Value".to_string(),
        SerialKind::ListDense(item) | SerialKind::ListSparse(item) | SerialKind::Set(item) => {
            format!("Vec<{}>", rust_type(item))
        }
        SerialKind::Map(_, value) => {
            format!("std::collections::HashMap<String, {}>", rust_type(value))
        }
        SerialKind::Structure(_) | SerialKind::TaggedUnion(_) => {
            to_pascal_case(&schema.name).into_owned()
        }
        SerialKind::StrEnum(_) | SerialKind::IntEnum(_) => {
            to_pascal_case(&schema.name).into_owned()
        }
    }
}

fn generate_errors(symbols: &SymbolsProvider) -> Result<String> {
    use smithygen_codec::strip_error_suffix;
    let lowering = Lowering::new(symbols);
    let service_name = symbols.local_name(symbols.service_id())?.to_string();
    let error_format = match lowering.protocol {
        Protocol::RestXml => "Xml",
        _ => "Json",
    };

    let mut w = SourceWriter::new();
    w.comment("Generated by smithygen. Do not edit.");
    w.blank();
    w.doc(&format!("Error taxonomy for the {service_name} service."));
    w.blank();
    w.line("use smithygen_codec::{");
    w.line("    resolve_error, CodecError, ErrorDescriptor, ErrorFormat, ErrorRegistry,");
    w.line("    ErrorSource, ResolvedError, Response,");
    w.line("};");

    for op_id in symbols.operations() {
        let op_name = to_pascal_case(symbols.local_name(*op_id)?).into_owned();
        let error_ids = lowering.error_ids(*op_id)?;
        let enum_name = format!("{op_name}Error");

        let mut variants = Vec::new();
        for error_id in &error_ids {
            let local = symbols.local_name(*error_id)?;
            let variant = to_pascal_case(strip_error_suffix(local)).into_owned();
            variants.push((variant, local.to_string(), *error_id));
        }

        w.blank();
        let mut builder = EnumBuilder::new(enum_name.as_str())
            .doc(&format!("Errors returned by {op_name}."))
            .derive("Debug, Clone");
        for (variant, _, _) in &variants {
            builder = builder.variant_with(variant.clone(), "ResolvedError");
        }
        builder = builder.variant_with("Unhandled", "ResolvedError");
        builder.write(&mut w);
        w.blank();

        w.open(format!("impl {enum_name}"));
        FnBuilder::new("fn registry() -> ErrorRegistry").write(&mut w, |w| {
            w.line("let mut registry = ErrorRegistry::new();");
            for (_, code, error_id) in &variants {
                let bag = symbols.trait_bag(*error_id);
                let source = match bag.error_source() {
                    Some(smithygen_model::ErrorSource::Server) => "Server",
                    _ => "Client",
                };
                let mut expr = format!(
                    "ErrorDescriptor::new({}, ErrorSource::{source})",
                    quoted(code)
                );
                if let Some(status) = bag.http_error() {
                    expr.push_str(&format!(".with_status({status})"));
                }
                if bag.retryable() {
                    expr.push_str(".retryable()");
                }
                w.line(format!("registry.insert({expr});"));
            }
            w.line("registry");
        });
        w.blank();
        FnBuilder::new(format!(
            "pub fn resolve(response: &Response) -> Result<{enum_name}, CodecError>"
        ))
        .doc("Resolve a failed response into the matching variant.")
        .write(&mut w, |w| {
            w.line("let registry = Self::registry();");
            w.line(format!(
                "let resolved = resolve_error(&registry, response, ErrorFormat::{error_format})?;"
            ));
            w.open("Ok(match resolved.code.as_str()");
            for (variant, code, _) in &variants {
                w.line(format!("{} => {enum_name}::{variant}(resolved),", quoted(code)));
            }
            w.line(format!("_ => {enum_name}::Unhandled(resolved),"));
            w.close_with("})");
        });
        w.blank();
        FnBuilder::new("fn inner(&self) -> &ResolvedError").write(&mut w, |w| {
            w.open("match self");
            for (variant, _, _) in &variants {
                w.line(format!("{enum_name}::{variant}(inner) => inner,"));
            }
            w.line(format!("{enum_name}::Unhandled(inner) => inner,"));
            w.close();
        });
        w.blank();
        FnBuilder::new("pub fn source(&self) -> ErrorSource").write(&mut w, |w| {
            w.line("self.inner().source");
        });
        w.blank();
        FnBuilder::new("pub fn http_status(&self) -> u16").write(&mut w, |w| {
            w.line("self.inner().status");
        });
        w.blank();
        FnBuilder::new("pub fn retryable(&self) -> bool").write(&mut w, |w| {
            w.line("self.inner().retryable");
        });
        w.close();
    }
    Ok(w.finish().as_str().to_string())
}

fn generate_resource(symbols: &SymbolsProvider, resource_id: SmithyId) -> Result<String> {
    let Shape::Resource(resource) = symbols.shape(resource_id)? else {
        return Err(CodegenError::Model(
            smithygen_model::ModelError::MissingResourceShape(
                symbols.display_name(resource_id),
            ),
        ));
    };
    let name = to_pascal_case(symbols.local_name(resource_id)?).into_owned();

    let mut w = SourceWriter::new();
    w.comment("Generated by smithygen. Do not edit.");
    w.blank();
    w.doc(&format!("The {name} resource."));
    if let Some(doc) = symbols.trait_bag(resource_id).documentation() {
        w.doc("");
        w.doc(doc);
    }
    w.blank();

    let mut builder = StructBuilder::new(format!("{name}Identifiers"))
        .doc("Identifier values addressing one resource instance.")
        .derive("Debug, Clone, PartialEq, Eq");
    for (id_name, _target) in &resource.identifiers {
        builder = builder.field(to_snake_case(id_name).into_owned(), "String");
    }
    builder.write(&mut w);
    w.blank();

    let lifecycle = [
        ("create", resource.create),
        ("put", resource.put),
        ("read", resource.read),
        ("update", resource.update),
        ("delete", resource.delete),
        ("list", resource.list),
    ];
    w.doc("Lifecycle operations bound to this resource.");
    w.open(format!("pub mod {}_ops", to_snake_case(&name)));
    for (phase, op) in lifecycle {
        if let Some(op_id) = op {
            let op_name = to_snake_case(symbols.local_name(op_id)?).into_owned();
            w.line(format!(
                "pub const {}: &str = {};",
                phase.to_uppercase(),
                quoted(&op_name)
            ));
        }
    }
    for op_id in resource.operations.iter().chain(&resource.collection_ops) {
        let op_name = to_snake_case(symbols.local_name(*op_id)?).into_owned();
        w.line(format!(
            "pub const {}: &str = {};",
            to_snake_case(&op_name).to_uppercase(),
            quoted(&op_name)
        ));
    }
    w.close();
    Ok(w.finish().as_str().to_string())
}
