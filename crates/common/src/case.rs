//! Name case conversion
//!
//! Converters return `Cow::Borrowed` when the input already matches the
//! target case, so the common pass-through path allocates nothing.

use std::borrow::Cow;

/// Split an identifier into words on `_`, `-`, whitespace, and case
/// boundaries. Acronym runs stay together (`getHTTPStatus` → get, HTTP,
/// Status) and digits bind to the preceding word (`S3Bucket` → S3, Bucket).
fn words(input: &str) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, b) in bytes.iter().enumerate() {
        let c = *b as char;
        if c == '_' || c == '-' || c == ' ' {
            if let Some(s) = start.take() {
                out.push(&input[s..i]);
            }
            continue;
        }
        if let Some(s) = start {
            let prev = bytes[i - 1] as char;
            let next_lower = bytes
                .get(i + 1)
                .is_some_and(|n| (*n as char).is_ascii_lowercase());
            let boundary = c.is_ascii_uppercase()
                && (prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_lower));
            if boundary {
                out.push(&input[s..i]);
                start = Some(i);
            }
        } else {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(&input[s..]);
    }
    out
}

fn is_snake(input: &str) -> bool {
    !input.is_empty()
        && input
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

fn is_scream(input: &str) -> bool {
    !input.is_empty()
        && input
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

fn is_pascal(input: &str) -> bool {
    !input.is_empty()
        && input.as_bytes()[0].is_ascii_uppercase()
        && input.bytes().all(|b| b.is_ascii_alphanumeric())
        && !input.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

fn is_camel(input: &str) -> bool {
    !input.is_empty()
        && input.as_bytes()[0].is_ascii_lowercase()
        && input.bytes().all(|b| b.is_ascii_alphanumeric())
        && input.bytes().any(|b| b.is_ascii_uppercase())
        || (!input.is_empty()
            && input.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()))
}

/// `TableName` → `table_name`
pub fn to_snake_case(input: &str) -> Cow<'_, str> {
    if is_snake(input) {
        return Cow::Borrowed(input);
    }
    let ws = words(input);
    let mut out = String::with_capacity(input.len() + ws.len());
    for (i, w) in ws.iter().enumerate() {
        if i > 0 {
            out.push('_');
        }
        out.push_str(&w.to_ascii_lowercase());
    }
    Cow::Owned(out)
}

/// `table_name` → `TABLE_NAME`
pub fn to_scream_case(input: &str) -> Cow<'_, str> {
    if is_scream(input) {
        return Cow::Borrowed(input);
    }
    let ws = words(input);
    let mut out = String::with_capacity(input.len() + ws.len());
    for (i, w) in ws.iter().enumerate() {
        if i > 0 {
            out.push('_');
        }
        out.push_str(&w.to_ascii_uppercase());
    }
    Cow::Owned(out)
}

/// `table_name` → `TableName`
pub fn to_pascal_case(input: &str) -> Cow<'_, str> {
    if is_pascal(input) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    for w in words(input) {
        push_capitalized(&mut out, w);
    }
    Cow::Owned(out)
}

/// `TableName` → `tableName`
pub fn to_camel_case(input: &str) -> Cow<'_, str> {
    if is_camel(input) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    for (i, w) in words(input).iter().enumerate() {
        if i == 0 {
            out.push_str(&w.to_ascii_lowercase());
        } else {
            push_capitalized(&mut out, w);
        }
    }
    Cow::Owned(out)
}

/// `table_name` → `Table Name`
pub fn to_title_case(input: &str) -> Cow<'_, str> {
    let ws = words(input);
    let already = ws.iter().all(|w| {
        w.as_bytes().first().is_some_and(u8::is_ascii_uppercase)
            && w.bytes().skip(1).all(|b| !b.is_ascii_uppercase())
    }) && input.split(' ').count() == ws.len()
        && !input.contains(['_', '-']);
    if already && !input.is_empty() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len() + ws.len());
    for (i, w) in ws.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        push_capitalized(&mut out, w);
    }
    Cow::Owned(out)
}

fn push_capitalized(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.push(first.to_ascii_uppercase());
        for c in chars {
            out.push(c.to_ascii_lowercase());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case() {
        assert_eq!(to_snake_case("TableName"), "table_name");
        assert_eq!(to_snake_case("getHTTPStatus"), "get_http_status");
        assert_eq!(to_snake_case("S3Bucket"), "s3_bucket");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn snake_case_borrows_when_already_snake() {
        assert!(matches!(to_snake_case("table_name"), Cow::Borrowed(_)));
        assert!(matches!(to_snake_case("TableName"), Cow::Owned(_)));
    }

    #[test]
    fn pascal_case() {
        assert_eq!(to_pascal_case("table_name"), "TableName");
        assert_eq!(to_pascal_case("do-stuff"), "DoStuff");
        assert!(matches!(to_pascal_case("TableName"), Cow::Borrowed(_)));
    }

    #[test]
    fn camel_case() {
        assert_eq!(to_camel_case("TableName"), "tableName");
        assert_eq!(to_camel_case("table_name"), "tableName");
        assert!(matches!(to_camel_case("tableName"), Cow::Borrowed(_)));
    }

    #[test]
    fn scream_case() {
        assert_eq!(to_scream_case("TableName"), "TABLE_NAME");
        assert!(matches!(to_scream_case("TABLE_NAME"), Cow::Borrowed(_)));
    }

    #[test]
    fn title_case() {
        assert_eq!(to_title_case("table_name"), "Table Name");
        assert_eq!(to_title_case("TableName"), "Table Name");
        assert!(matches!(to_title_case("Table Name"), Cow::Borrowed(_)));
    }
}
