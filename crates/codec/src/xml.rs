//! REST-XML payload codec
//!
//! Schema-driven writer and event-driven reader. Element names come from
//! `xmlName` overrides, falling back to member API names; collection part
//! names default to `member`/`key`/`value`. Flat collections emit no
//! wrapping element, and the flat-collection reader hands the already
//! consumed sibling start back to the parent scope so nothing is lost.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{CodecError, Result};
use crate::fmt::{format_scalar, parse_scalar};
use crate::schema::{Binding, MemberSchema, Schema, SerialKind, XmlNamespace};
use crate::value::Value;

/// Serialize a structure value as a complete XML document.
pub fn write_xml_payload(schema: &Schema, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_node(
        &mut writer,
        schema.xml_name(),
        schema,
        value,
        schema.xml.namespace.as_ref(),
    )?;
    Ok(buf)
}

fn namespace_attr(ns: &XmlNamespace) -> (String, &str) {
    let key = match &ns.prefix {
        Some(prefix) => format!("xmlns:{prefix}"),
        None => "xmlns".to_string(),
    };
    (key, ns.uri.as_str())
}

fn write_node<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    schema: &Schema,
    value: &Value,
    ns: Option<&XmlNamespace>,
) -> Result<()> {
    match &schema.kind {
        SerialKind::Structure(members) => {
            let mut start = BytesStart::new(name);
            if let Some(ns) = ns {
                let (key, uri) = namespace_attr(ns);
                start.push_attribute((key.as_str(), uri));
            }
            for member in members {
                if !member.xml.attribute {
                    continue;
                }
                if let Some(field) = value.field(&member.name) {
                    let text = format_scalar(field, &member.schema)?;
                    start.push_attribute((member_xml_name(member), text.as_str()));
                }
            }
            writer.write_event(Event::Start(start))?;
            for member in members {
                if member.xml.attribute || member.binding == Binding::StatusCode {
                    continue;
                }
                if let Some(field) = value.field(&member.name) {
                    write_member(writer, member, field)?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        SerialKind::TaggedUnion(members) => {
            let Value::Union(variant, inner) = value else {
                return Err(CodecError::UnexpectedNode(format!(
                    "expected union value for {name}"
                )));
            };
            let member = members
                .iter()
                .find(|m| m.name == *variant)
                .ok_or_else(|| CodecError::InvalidValue(format!("unknown variant `{variant}`")))?;
            let mut start = BytesStart::new(name);
            if let Some(ns) = ns {
                let (key, uri) = namespace_attr(ns);
                start.push_attribute((key.as_str(), uri));
            }
            writer.write_event(Event::Start(start))?;
            write_member(writer, member, inner)?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        _ => {
            let mut start = BytesStart::new(name);
            if let Some(ns) = ns {
                let (key, uri) = namespace_attr(ns);
                start.push_attribute((key.as_str(), uri));
            }
            writer.write_event(Event::Start(start))?;
            let text = format_scalar(value, schema)?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}

fn member_xml_name(member: &MemberSchema) -> &str {
    member.xml.name.as_deref().unwrap_or(&member.api_name)
}

fn item_part_name<'a>(item: &'a Schema, default: &'a str) -> &'a str {
    item.xml.name.as_deref().unwrap_or(default)
}

fn write_member<W: Write>(
    writer: &mut Writer<W>,
    member: &MemberSchema,
    value: &Value,
) -> Result<()> {
    let elem_name = member_xml_name(member);
    let ns = member.xml.namespace.as_ref();
    match &member.schema.kind {
        SerialKind::ListDense(item) | SerialKind::ListSparse(item) | SerialKind::Set(item) => {
            let Value::List(items) = value else {
                return Err(CodecError::UnexpectedNode(format!(
                    "expected list for `{}`",
                    member.name
                )));
            };
            if member.xml.flat {
                // Consecutive siblings share the member's element name.
                for item_value in items {
                    if item_value.is_null() {
                        continue;
                    }
                    write_node(writer, elem_name, item, item_value, None)?;
                }
            } else {
                let item_name = item_part_name(item, "member");
                let mut start = BytesStart::new(elem_name);
                if let Some(ns) = ns {
                    let (key, uri) = namespace_attr(ns);
                    start.push_attribute((key.as_str(), uri));
                }
                writer.write_event(Event::Start(start))?;
                for item_value in items {
                    if item_value.is_null() {
                        continue;
                    }
                    write_node(writer, item_name, item, item_value, None)?;
                }
                writer.write_event(Event::End(BytesEnd::new(elem_name)))?;
            }
        }
        SerialKind::Map(key_schema, value_schema) => {
            let Value::Map(entries) = value else {
                return Err(CodecError::UnexpectedNode(format!(
                    "expected map for `{}`",
                    member.name
                )));
            };
            let key_name = item_part_name(key_schema, "key");
            let value_name = item_part_name(value_schema, "value");
            if member.xml.flat {
                for (entry_key, entry_value) in entries {
                    writer.write_event(Event::Start(BytesStart::new(elem_name)))?;
                    write_node(
                        writer,
                        key_name,
                        &Schema::string(),
                        &Value::Str(entry_key.clone()),
                        None,
                    )?;
                    write_node(writer, value_name, value_schema, entry_value, None)?;
                    writer.write_event(Event::End(BytesEnd::new(elem_name)))?;
                }
            } else {
                writer.write_event(Event::Start(BytesStart::new(elem_name)))?;
                for (entry_key, entry_value) in entries {
                    writer.write_event(Event::Start(BytesStart::new("entry")))?;
                    write_node(
                        writer,
                        key_name,
                        &Schema::string(),
                        &Value::Str(entry_key.clone()),
                        None,
                    )?;
                    write_node(writer, value_name, value_schema, entry_value, None)?;
                    writer.write_event(Event::End(BytesEnd::new("entry")))?;
                }
                writer.write_event(Event::End(BytesEnd::new(elem_name)))?;
            }
        }
        _ => write_node(writer, elem_name, &member.schema, value, ns)?,
    }
    Ok(())
}

/// Parse an XML document body into a value under its schema.
pub fn read_xml_payload(schema: &Schema, body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Struct(indexmap::IndexMap::new()));
    }
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(start) => return read_node(&mut reader, schema, &start),
            Event::Empty(_) => return Ok(Value::Struct(indexmap::IndexMap::new())),
            Event::Eof => {
                return Err(CodecError::UnexpectedNode("missing root element".to_string()))
            }
            _ => {}
        }
    }
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    name.rsplit_once(':')
        .map_or_else(|| name.to_string(), |(_, local)| local.to_string())
}

fn read_node(
    reader: &mut Reader<&[u8]>,
    schema: &Schema,
    start: &BytesStart<'_>,
) -> Result<Value> {
    match &schema.kind {
        SerialKind::Structure(_) => read_structure(reader, schema, start),
        SerialKind::TaggedUnion(members) => read_union(reader, members, start),
        _ => {
            let text = read_text_content(reader)?;
            parse_scalar(&text, schema)
        }
    }
}

fn read_structure(
    reader: &mut Reader<&[u8]>,
    schema: &Schema,
    start: &BytesStart<'_>,
) -> Result<Value> {
    let members = schema.members();
    let mut fields = indexmap::IndexMap::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| CodecError::Xml(e.to_string()))?;
        let key = local_name(attr.key.as_ref());
        if key == "xmlns" || key.starts_with("xmlns") {
            continue;
        }
        if let Some(member) = members
            .iter()
            .find(|m| m.xml.attribute && member_xml_name(m) == key)
        {
            let text = attr
                .unescape_value()
                .map_err(|e| CodecError::Xml(e.to_string()))?;
            fields.insert(member.name.clone(), parse_scalar(&text, &member.schema)?);
        }
    }

    // A flat-collection parse may have consumed the next sibling start;
    // it hands the event back here so the loop resumes without re-reading.
    let mut pending: Option<Event<'_>> = None;
    loop {
        let event = match pending.take() {
            Some(event) => event,
            None => reader.read_event()?,
        };
        match event {
            Event::Start(child) => {
                let child_name = local_name(child.name().as_ref());
                let Some(member) = find_element_member(members, &child_name) else {
                    skip_element(reader)?;
                    continue;
                };
                match &member.schema.kind {
                    SerialKind::ListDense(item)
                    | SerialKind::ListSparse(item)
                    | SerialKind::Set(item)
                        if member.xml.flat =>
                    {
                        let items = fields
                            .entry(member.name.clone())
                            .or_insert_with(|| Value::List(Vec::new()));
                        let Value::List(items) = items else { unreachable!() };
                        items.push(read_node(reader, item, &child)?);
                        pending = read_flat_siblings(reader, item, &child_name, items)?;
                    }
                    SerialKind::Map(_, value_schema) if member.xml.flat => {
                        let entries = fields
                            .entry(member.name.clone())
                            .or_insert_with(|| Value::Map(indexmap::IndexMap::new()));
                        let Value::Map(entries) = entries else { unreachable!() };
                        read_map_entry_body(reader, value_schema, entries)?;
                        pending = read_flat_map_siblings(
                            reader,
                            value_schema,
                            &child_name,
                            entries,
                        )?;
                    }
                    SerialKind::ListDense(item)
                    | SerialKind::ListSparse(item)
                    | SerialKind::Set(item) => {
                        let items = read_wrapped_list(reader, item)?;
                        fields.insert(member.name.clone(), Value::List(items));
                    }
                    SerialKind::Map(_, value_schema) => {
                        let entries = read_wrapped_map(reader, value_schema)?;
                        fields.insert(member.name.clone(), Value::Map(entries));
                    }
                    _ => {
                        let value = read_node(reader, &member.schema, &child)?;
                        fields.insert(member.name.clone(), value);
                    }
                }
            }
            Event::Empty(child) => {
                let child_name = local_name(child.name().as_ref());
                if let Some(member) = find_element_member(members, &child_name) {
                    if matches!(member.schema.kind, SerialKind::String) {
                        fields.insert(member.name.clone(), Value::Str(String::new()));
                    }
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(CodecError::UnexpectedNode("eof in element".to_string())),
            _ => {}
        }
    }
    for member in members {
        if member.required
            && member.binding == Binding::Body
            && !fields.contains_key(&member.name)
        {
            return Err(CodecError::MissingRequiredField(member.name.clone()));
        }
    }
    Ok(Value::Struct(fields))
}

fn find_element_member<'a>(
    members: &'a [MemberSchema],
    element: &str,
) -> Option<&'a MemberSchema> {
    members
        .iter()
        .find(|m| !m.xml.attribute && member_xml_name(m) == element)
}

/// After one flat item, keep consuming same-named siblings. Returns the
/// first event that does not belong to the collection (`did_start_next`).
fn read_flat_siblings<'a>(
    reader: &mut Reader<&'a [u8]>,
    item: &Schema,
    item_name: &str,
    items: &mut Vec<Value>,
) -> Result<Option<Event<'a>>> {
    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref child) if local_name(child.name().as_ref()) == item_name => {
                let child = child.to_owned();
                items.push(read_node(reader, item, &child)?);
            }
            other => return Ok(Some(other)),
        }
    }
}

fn read_flat_map_siblings<'a>(
    reader: &mut Reader<&'a [u8]>,
    value_schema: &Schema,
    entry_name: &str,
    entries: &mut indexmap::IndexMap<String, Value>,
) -> Result<Option<Event<'a>>> {
    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref child) if local_name(child.name().as_ref()) == entry_name => {
                read_map_entry_body(reader, value_schema, entries)?;
            }
            other => return Ok(Some(other)),
        }
    }
}

/// Read `<member>…</member>` items until the wrapper's end tag.
fn read_wrapped_list(reader: &mut Reader<&[u8]>, item: &Schema) -> Result<Vec<Value>> {
    let mut items = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(child) => items.push(read_node(reader, item, &child)?),
            Event::Empty(_) => {
                if matches!(item.kind, SerialKind::String) {
                    items.push(Value::Str(String::new()));
                }
            }
            Event::End(_) => return Ok(items),
            Event::Eof => return Err(CodecError::UnexpectedNode("eof in list".to_string())),
            _ => {}
        }
    }
}

/// Read `<entry><key/><value/></entry>` pairs until the wrapper's end tag.
fn read_wrapped_map(
    reader: &mut Reader<&[u8]>,
    value_schema: &Schema,
) -> Result<indexmap::IndexMap<String, Value>> {
    let mut entries = indexmap::IndexMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(_) => read_map_entry_body(reader, value_schema, &mut entries)?,
            Event::End(_) => return Ok(entries),
            Event::Eof => return Err(CodecError::UnexpectedNode("eof in map".to_string())),
            _ => {}
        }
    }
}

/// Read the `<key>` and `<value>` children of one map entry; the entry
/// start tag is already consumed.
fn read_map_entry_body(
    reader: &mut Reader<&[u8]>,
    value_schema: &Schema,
    entries: &mut indexmap::IndexMap<String, Value>,
) -> Result<()> {
    let mut key = None;
    let mut value = None;
    loop {
        match reader.read_event()? {
            Event::Start(child) => {
                let name = local_name(child.name().as_ref());
                if value.is_none() && key.is_some() {
                    value = Some(read_node(reader, value_schema, &child)?);
                } else if key.is_none() && name != "value" {
                    key = Some(read_text_content(reader)?);
                } else {
                    skip_element(reader)?;
                }
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(CodecError::UnexpectedNode("eof in map entry".to_string()))
            }
            _ => {}
        }
    }
    let key = key.ok_or_else(|| CodecError::UnexpectedNode("map entry without key".to_string()))?;
    let value =
        value.ok_or_else(|| CodecError::UnexpectedNode("map entry without value".to_string()))?;
    entries.insert(key, value);
    Ok(())
}

fn read_union(
    reader: &mut Reader<&[u8]>,
    members: &[MemberSchema],
    _start: &BytesStart<'_>,
) -> Result<Value> {
    let mut result = None;
    loop {
        match reader.read_event()? {
            Event::Start(child) => {
                let name = local_name(child.name().as_ref());
                let Some(member) = find_element_member(members, &name) else {
                    return Err(CodecError::UnexpectedResponseUnionField(name));
                };
                if result.is_some() {
                    return Err(CodecError::UnexpectedResponseUnionField(name));
                }
                let inner = read_node(reader, &member.schema, &child)?;
                result = Some(Value::Union(member.name.clone(), Box::new(inner)));
            }
            Event::End(_) => break,
            Event::Eof => return Err(CodecError::UnexpectedNode("eof in union".to_string())),
            _ => {}
        }
    }
    result.ok_or_else(|| CodecError::UnexpectedNode("union without a variant".to_string()))
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let decoded = e
                    .decode()
                    .map_err(|err| CodecError::Xml(err.to_string()))?;
                let unescaped = quick_xml::escape::unescape(&decoded)
                    .map_err(|err| CodecError::Xml(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::GeneralRef(e) => {
                if let Some(ch) = e
                    .resolve_char_ref()
                    .map_err(|err| CodecError::Xml(err.to_string()))?
                {
                    text.push(ch);
                } else {
                    let decoded = e
                        .decode()
                        .map_err(|err| CodecError::Xml(err.to_string()))?;
                    let resolved = quick_xml::escape::resolve_xml_entity(&decoded)
                        .ok_or_else(|| CodecError::Xml(format!("unknown entity `{decoded}`")))?;
                    text.push_str(resolved);
                }
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(CodecError::UnexpectedNode(
                    "eof while reading text content".to_string(),
                ))
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<()> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(CodecError::UnexpectedNode(
                    "eof while skipping element".to_string(),
                ))
            }
            _ => {}
        }
    }
}

/// Scan an XML error body for `<Code>` and `<Message>`, tolerating an
/// optional `<ErrorResponse>` wrapper.
pub fn scan_xml_error_body(body: &[u8]) -> (Option<String>, Option<String>) {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);
    let mut code = None;
    let mut message = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(e.name().as_ref());
                if name == "Code" && code.is_none() {
                    code = read_text_content(&mut reader).ok();
                } else if name == "Message" && message.is_none() {
                    message = read_text_content(&mut reader).ok();
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    (code, message)
}
