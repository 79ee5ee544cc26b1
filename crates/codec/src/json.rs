//! JSON payload codec
//!
//! One schema-driven writer/reader shared by AWS JSON 1.0, AWS JSON 1.1,
//! and REST-JSON. The writer builds a `serde_json` document; the reader
//! streams tokens with jiter and is strict about unknown keys.

use jiter::{Jiter, NumberAny, NumberInt, Peek};

use crate::error::{CodecError, Result};
use crate::fmt::{
    base64_decode, base64_encode, epoch_seconds_to_timestamp, format_float, format_timestamp,
    parse_float, parse_timestamp,
};
use crate::http::Writable;
use crate::schema::{Binding, OperationSchema, Schema, SerialKind, TimestampFormat};
use crate::value::Value;

/// The three JSON protocol flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonFlavor {
    AwsJson10,
    AwsJson11,
    RestJson,
}

impl JsonFlavor {
    pub fn content_type(self) -> &'static str {
        match self {
            JsonFlavor::AwsJson10 => "application/x-amz-json-1.0",
            JsonFlavor::AwsJson11 => "application/x-amz-json-1.1",
            JsonFlavor::RestJson => "application/json",
        }
    }
}

/// Write a full AWS-JSON request: target/content-type headers plus the
/// whole input structure as the body.
pub fn write_aws_json_request<W: Writable>(
    request: &mut W,
    op: &OperationSchema,
    flavor: JsonFlavor,
    input: &Value,
) -> Result<()> {
    debug_assert!(!matches!(flavor, JsonFlavor::RestJson));
    request.put_header("x-amz-target", format!("{}.{}", op.service, op.name));
    request.put_header("content-type", flavor.content_type().to_string());
    let body = match input {
        Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        _ => write_json_payload(&op.input, input)?,
    };
    request.put_payload(serde_json::to_vec(&body)?);
    Ok(())
}

/// Build the REST-JSON body: the payload member alone when present,
/// otherwise an object of the body-bound members. Returns the bytes and
/// the content type.
pub fn write_rest_json_body(schema: &Schema, input: &Value) -> Result<(Vec<u8>, String)> {
    if let Some(payload) = schema.payload_member() {
        let Some(value) = input.field(&payload.name) else {
            return Ok((Vec::new(), JsonFlavor::RestJson.content_type().to_string()));
        };
        return match (&payload.schema.kind, value) {
            (SerialKind::Blob, Value::Blob(bytes)) => {
                Ok((bytes.clone(), "application/octet-stream".to_string()))
            }
            (SerialKind::String, Value::Str(text)) => {
                Ok((text.clone().into_bytes(), "text/plain".to_string()))
            }
            _ => {
                let doc = write_json_payload(&payload.schema, value)?;
                Ok((
                    serde_json::to_vec(&doc)?,
                    JsonFlavor::RestJson.content_type().to_string(),
                ))
            }
        };
    }

    let mut object = serde_json::Map::new();
    for member in schema.members() {
        if member.binding != Binding::Body {
            continue;
        }
        let Some(value) = input.field(&member.name) else {
            continue;
        };
        object.insert(
            member.api_name.clone(),
            write_json_payload(&member.schema, value)?,
        );
    }
    Ok((
        serde_json::to_vec(&serde_json::Value::Object(object))?,
        JsonFlavor::RestJson.content_type().to_string(),
    ))
}

/// Serialize one value under its schema into a JSON document.
pub fn write_json_payload(schema: &Schema, value: &Value) -> Result<serde_json::Value> {
    use serde_json::json;
    Ok(match (&schema.kind, value) {
        (SerialKind::Boolean, Value::Bool(b)) => json!(b),
        (
            SerialKind::Byte | SerialKind::Short | SerialKind::Integer | SerialKind::Long,
            Value::Int(i),
        ) => json!(i),
        (SerialKind::Float | SerialKind::Double, Value::Float(f)) => {
            if f.is_finite() {
                json!(f)
            } else {
                json!(format_float(*f))
            }
        }
        (SerialKind::Float | SerialKind::Double, Value::Int(i)) => json!(*i as f64),
        (SerialKind::String, Value::Str(s)) => json!(s),
        (SerialKind::Blob, Value::Blob(bytes)) => json!(base64_encode(bytes)),
        (SerialKind::Timestamp(format), Value::Timestamp(ts)) => match format {
            TimestampFormat::EpochSeconds => {
                if ts.timestamp_subsec_nanos() == 0 {
                    json!(ts.timestamp())
                } else {
                    json!(ts.timestamp() as f64
                        + f64::from(ts.timestamp_subsec_millis()) / 1000.0)
                }
            }
            _ => json!(format_timestamp(ts, *format)),
        },
        (SerialKind::StrEnum(_), Value::Enum(s) | Value::Str(s)) => json!(s),
        (SerialKind::IntEnum(_), Value::IntEnum(i)) => json!(i),
        (SerialKind::IntEnum(_), Value::Int(i)) => json!(i),
        (SerialKind::ListDense(item), Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item_value in items {
                if item_value.is_null() {
                    return Err(CodecError::InvalidValue(format!(
                        "null element in dense list {}",
                        schema.name
                    )));
                }
                out.push(write_json_payload(item, item_value)?);
            }
            serde_json::Value::Array(out)
        }
        (SerialKind::ListSparse(item) | SerialKind::Set(item), Value::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item_value in items {
                if item_value.is_null() {
                    out.push(serde_json::Value::Null);
                } else {
                    out.push(write_json_payload(item, item_value)?);
                }
            }
            serde_json::Value::Array(out)
        }
        (SerialKind::Map(_, value_schema), Value::Map(entries)) => {
            let mut out = serde_json::Map::new();
            for (key, entry_value) in entries {
                if entry_value.is_null() {
                    out.insert(key.clone(), serde_json::Value::Null);
                } else {
                    out.insert(key.clone(), write_json_payload(value_schema, entry_value)?);
                }
            }
            serde_json::Value::Object(out)
        }
        (SerialKind::Structure(members), Value::Struct(_)) => {
            let mut out = serde_json::Map::new();
            for member in members {
                let Some(field) = value.field(&member.name) else {
                    continue;
                };
                out.insert(
                    member.api_name.clone(),
                    write_json_payload(&member.schema, field)?,
                );
            }
            serde_json::Value::Object(out)
        }
        (SerialKind::TaggedUnion(members), Value::Union(variant, inner)) => {
            let member = members
                .iter()
                .find(|m| m.name == *variant)
                .ok_or_else(|| CodecError::InvalidValue(format!("unknown variant `{variant}`")))?;
            let mut out = serde_json::Map::new();
            out.insert(
                member.api_name.clone(),
                write_json_payload(&member.schema, inner)?,
            );
            serde_json::Value::Object(out)
        }
        (kind, value) => {
            return Err(CodecError::UnexpectedNode(format!(
                "cannot serialize {value:?} as {kind:?}"
            )))
        }
    })
}

/// Parse a JSON body into a value under its schema. An empty body reads
/// as an empty structure.
pub fn read_json_payload(schema: &Schema, body: &[u8]) -> Result<Value> {
    let trimmed: &[u8] = {
        let start = body.iter().position(|b| !b.is_ascii_whitespace());
        match start {
            Some(s) => &body[s..],
            None => &[],
        }
    };
    if trimmed.is_empty() {
        return Ok(match schema.kind {
            SerialKind::Structure(_) => Value::Struct(indexmap::IndexMap::new()),
            _ => Value::Null,
        });
    }
    let mut jiter = Jiter::new(trimmed);
    let value = read_value(&mut jiter, schema)?;
    jiter.finish()?;
    Ok(value)
}

fn read_value(jiter: &mut Jiter<'_>, schema: &Schema) -> Result<Value> {
    match &schema.kind {
        SerialKind::Boolean => Ok(Value::Bool(jiter.next_bool()?)),
        SerialKind::Byte | SerialKind::Short | SerialKind::Integer | SerialKind::Long => {
            match jiter.next_number()? {
                NumberAny::Int(NumberInt::Int(i)) => Ok(Value::Int(i)),
                _ => Err(CodecError::InvalidNumberFormat(
                    "expected integer".to_string(),
                )),
            }
        }
        SerialKind::Float | SerialKind::Double => {
            if jiter.peek()? == Peek::String {
                Ok(Value::Float(parse_float(jiter.next_str()?)?))
            } else {
                match jiter.next_number()? {
                    NumberAny::Int(NumberInt::Int(i)) => Ok(Value::Float(i as f64)),
                    NumberAny::Int(NumberInt::BigInt(_)) => Err(CodecError::InvalidNumberFormat(
                        "integer out of range".to_string(),
                    )),
                    NumberAny::Float(f) => Ok(Value::Float(f)),
                }
            }
        }
        SerialKind::String => Ok(Value::Str(jiter.next_str()?.to_string())),
        SerialKind::Blob => Ok(Value::Blob(base64_decode(jiter.next_str()?)?)),
        SerialKind::Timestamp(format) => match format {
            TimestampFormat::EpochSeconds => {
                let seconds = match jiter.next_number()? {
                    NumberAny::Int(NumberInt::Int(i)) => i as f64,
                    NumberAny::Int(NumberInt::BigInt(_)) => {
                        return Err(CodecError::InvalidNumberFormat(
                            "timestamp out of range".to_string(),
                        ))
                    }
                    NumberAny::Float(f) => f,
                };
                Ok(Value::Timestamp(epoch_seconds_to_timestamp(seconds)?))
            }
            _ => Ok(Value::Timestamp(parse_timestamp(
                jiter.next_str()?,
                *format,
            )?)),
        },
        // Parsing an unknown enum string keeps its own copy of the bytes;
        // known values land on the same owned representation.
        SerialKind::StrEnum(_) => Ok(Value::Enum(jiter.next_str()?.to_string())),
        SerialKind::IntEnum(_) => match jiter.next_number()? {
            NumberAny::Int(NumberInt::Int(i)) => Ok(Value::IntEnum(
                i32::try_from(i)
                    .map_err(|_| CodecError::InvalidNumberFormat(i.to_string()))?,
            )),
            _ => Err(CodecError::InvalidNumberFormat(
                "expected integer enum".to_string(),
            )),
        },
        SerialKind::ListDense(item) | SerialKind::ListSparse(item) | SerialKind::Set(item) => {
            let sparse = matches!(schema.kind, SerialKind::ListSparse(_));
            let mut items = Vec::new();
            let mut next = jiter.next_array()?;
            while let Some(peek) = next {
                if peek == Peek::Null {
                    jiter.known_null()?;
                    if sparse {
                        items.push(Value::Null);
                    } else {
                        return Err(CodecError::InvalidValue(format!(
                            "null element in dense list {}",
                            schema.name
                        )));
                    }
                } else {
                    items.push(read_value(jiter, item)?);
                }
                next = jiter.array_step()?;
            }
            Ok(Value::List(items))
        }
        SerialKind::Map(_, value_schema) => {
            let mut entries = indexmap::IndexMap::new();
            let mut key = jiter.next_object()?.map(str::to_string);
            while let Some(k) = key {
                if jiter.peek()? == Peek::Null {
                    jiter.known_null()?;
                    entries.insert(k, Value::Null);
                } else {
                    entries.insert(k, read_value(jiter, value_schema)?);
                }
                key = jiter.next_key()?.map(str::to_string);
            }
            Ok(Value::Map(entries))
        }
        SerialKind::Structure(members) => {
            let mut fields = indexmap::IndexMap::new();
            let mut key = jiter.next_object()?.map(str::to_string);
            while let Some(k) = key {
                let member = members
                    .iter()
                    .find(|m| m.api_name == k)
                    .ok_or_else(|| CodecError::UnexpectedResponseStructField(k.clone()))?;
                if jiter.peek()? == Peek::Null {
                    jiter.known_null()?;
                } else {
                    fields.insert(member.name.clone(), read_value(jiter, &member.schema)?);
                }
                key = jiter.next_key()?.map(str::to_string);
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
        SerialKind::TaggedUnion(members) => {
            let key = jiter
                .next_object()?
                .map(str::to_string)
                .ok_or_else(|| CodecError::UnexpectedToken("empty union object".to_string()))?;
            let member = members
                .iter()
                .find(|m| m.api_name == key)
                .ok_or_else(|| CodecError::UnexpectedResponseUnionField(key.clone()))?;
            let inner = read_value(jiter, &member.schema)?;
            if let Some(extra) = jiter.next_key()? {
                return Err(CodecError::UnexpectedResponseUnionField(extra.to_string()));
            }
            Ok(Value::Union(member.name.clone(), Box::new(inner)))
        }
    }
}

/// Scan an error body for `code | __type` and
/// `message | Message | errorMessage`.
pub fn scan_json_error_body(body: &[u8]) -> (Option<String>, Option<String>) {
    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(body) else {
        return (None, None);
    };
    let Some(object) = doc.as_object() else {
        return (None, None);
    };
    let code = ["code", "__type"]
        .iter()
        .find_map(|k| object.get(*k))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let message = ["message", "Message", "errorMessage"]
        .iter()
        .find_map(|k| object.get(*k))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    (code, message)
}
