//! Scalar wire formatting shared by the binding, JSON, and XML codecs

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{CodecError, Result};
use crate::schema::{Schema, SerialKind, TimestampFormat};
use crate::value::Value;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub(crate) fn format_timestamp(ts: &DateTime<Utc>, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::EpochSeconds => {
            if ts.timestamp_subsec_nanos() == 0 {
                ts.timestamp().to_string()
            } else {
                format!(
                    "{}",
                    ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_millis()) / 1000.0
                )
            }
        }
        TimestampFormat::DateTime => {
            let format = if ts.timestamp_subsec_nanos() == 0 {
                SecondsFormat::Secs
            } else {
                SecondsFormat::Millis
            };
            ts.to_rfc3339_opts(format, true)
        }
        TimestampFormat::HttpDate => ts.format(HTTP_DATE).to_string(),
    }
}

pub(crate) fn parse_timestamp(text: &str, format: TimestampFormat) -> Result<DateTime<Utc>> {
    match format {
        TimestampFormat::EpochSeconds => {
            let seconds: f64 = text
                .parse()
                .map_err(|_| CodecError::InvalidNumberFormat(text.to_string()))?;
            epoch_seconds_to_timestamp(seconds)
        }
        TimestampFormat::DateTime => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| CodecError::InvalidValue(format!("invalid date-time `{text}`"))),
        TimestampFormat::HttpDate => NaiveDateTime::parse_from_str(text, HTTP_DATE)
            .map(|ndt| ndt.and_utc())
            .map_err(|_| CodecError::InvalidValue(format!("invalid http-date `{text}`"))),
    }
}

pub(crate) fn epoch_seconds_to_timestamp(seconds: f64) -> Result<DateTime<Utc>> {
    let millis = (seconds * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| CodecError::InvalidValue(format!("timestamp out of range: {seconds}")))
}

/// Float text per the binding rules: non-finite values are spelled out.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "Infinity".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        f.to_string()
    }
}

pub(crate) fn parse_float(text: &str) -> Result<f64> {
    match text {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        _ => text
            .parse()
            .map_err(|_| CodecError::InvalidNumberFormat(text.to_string())),
    }
}

/// Format a scalar value for a path label, header, query parameter, or
/// XML text node.
pub(crate) fn format_scalar(value: &Value, schema: &Schema) -> Result<String> {
    match (&schema.kind, value) {
        (SerialKind::Boolean, Value::Bool(b)) => Ok(if *b { "true" } else { "false" }.to_string()),
        (
            SerialKind::Byte | SerialKind::Short | SerialKind::Integer | SerialKind::Long,
            Value::Int(i),
        ) => Ok(i.to_string()),
        (SerialKind::Float | SerialKind::Double, Value::Float(f)) => Ok(format_float(*f)),
        (SerialKind::Float | SerialKind::Double, Value::Int(i)) => Ok(format_float(*i as f64)),
        (SerialKind::String, Value::Str(s)) => Ok(s.clone()),
        (SerialKind::StrEnum(_), Value::Enum(s) | Value::Str(s)) => Ok(s.clone()),
        (SerialKind::IntEnum(_), Value::IntEnum(i)) => Ok(i.to_string()),
        (SerialKind::IntEnum(_), Value::Int(i)) => Ok(i.to_string()),
        (SerialKind::Timestamp(format), Value::Timestamp(ts)) => {
            Ok(format_timestamp(ts, *format))
        }
        (SerialKind::Blob, Value::Blob(bytes)) => Ok(BASE64.encode(bytes)),
        (kind, value) => Err(CodecError::UnexpectedNode(format!(
            "cannot format {value:?} as {kind:?}"
        ))),
    }
}

/// Parse header/query text back into a scalar value.
pub(crate) fn parse_scalar(text: &str, schema: &Schema) -> Result<Value> {
    match &schema.kind {
        SerialKind::Boolean => match text {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(CodecError::InvalidValue(format!("invalid boolean `{text}`"))),
        },
        SerialKind::Byte | SerialKind::Short | SerialKind::Integer | SerialKind::Long => text
            .parse()
            .map(Value::Int)
            .map_err(|_| CodecError::InvalidNumberFormat(text.to_string())),
        SerialKind::Float | SerialKind::Double => parse_float(text).map(Value::Float),
        SerialKind::String => Ok(Value::Str(text.to_string())),
        SerialKind::StrEnum(_) => Ok(Value::Enum(text.to_string())),
        SerialKind::IntEnum(_) => text
            .parse()
            .map(Value::IntEnum)
            .map_err(|_| CodecError::InvalidNumberFormat(text.to_string())),
        SerialKind::Timestamp(format) => parse_timestamp(text, *format).map(Value::Timestamp),
        SerialKind::Blob => Ok(Value::Blob(BASE64.decode(text.trim())?)),
        kind => Err(CodecError::UnexpectedNode(format!(
            "cannot parse scalar for {kind:?}"
        ))),
    }
}

pub(crate) fn base64_encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub(crate) fn base64_decode(text: &str) -> Result<Vec<u8>> {
    Ok(BASE64.decode(text.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_formats() {
        let ts = Utc.with_ymd_and_hms(2014, 4, 29, 18, 30, 38).unwrap();
        assert_eq!(
            format_timestamp(&ts, TimestampFormat::EpochSeconds),
            "1398796238"
        );
        assert_eq!(
            format_timestamp(&ts, TimestampFormat::DateTime),
            "2014-04-29T18:30:38Z"
        );
        assert_eq!(
            format_timestamp(&ts, TimestampFormat::HttpDate),
            "Tue, 29 Apr 2014 18:30:38 GMT"
        );
    }

    #[test]
    fn timestamp_parse_round_trip() {
        let ts = Utc.with_ymd_and_hms(2014, 4, 29, 18, 30, 38).unwrap();
        for format in [
            TimestampFormat::EpochSeconds,
            TimestampFormat::DateTime,
            TimestampFormat::HttpDate,
        ] {
            let text = format_timestamp(&ts, format);
            assert_eq!(parse_timestamp(&text, format).unwrap(), ts);
        }
    }

    #[test]
    fn non_finite_floats_spelled_out() {
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(f64::INFINITY), "Infinity");
        assert_eq!(format_float(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_float(1.5), "1.5");
        assert!(parse_float("NaN").unwrap().is_nan());
        assert_eq!(parse_float("-Infinity").unwrap(), f64::NEG_INFINITY);
    }

    #[test]
    fn scalar_formatting() {
        assert_eq!(
            format_scalar(&Value::Bool(true), &Schema::boolean()).unwrap(),
            "true"
        );
        assert_eq!(
            format_scalar(&Value::Blob(b"ok".to_vec()), &Schema::blob()).unwrap(),
            "b2s="
        );
        assert!(format_scalar(&Value::Str("x".to_string()), &Schema::integer()).is_err());
    }
}
