//! Pull-based JSON token reader
//!
//! A thin layer over [`jiter`] exposing the token pull API the Smithy
//! parser drives: peek a kind, take a typed token, or skip a whole value.
//! Scalar strings borrow jiter's buffer; object keys are returned owned so
//! the caller can keep them across subsequent reads.

use jiter::{Jiter, NumberAny, NumberInt, Peek};

use crate::error::{ModelError, Result};

/// The kind of the next JSON token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Null,
    Bool,
    Number,
    String,
    ArrayBegin,
    ObjectBegin,
}

/// Streaming reader over a JSON byte buffer.
pub struct JsonReader<'a> {
    jiter: Jiter<'a>,
}

impl<'a> JsonReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        JsonReader {
            jiter: Jiter::new(data),
        }
    }

    /// Peek the kind of the next value without consuming it.
    pub fn peek(&mut self) -> Result<TokenKind> {
        let peek = self.jiter.peek()?;
        Ok(if peek == Peek::Null {
            TokenKind::Null
        } else if peek == Peek::True || peek == Peek::False {
            TokenKind::Bool
        } else if peek == Peek::String {
            TokenKind::String
        } else if peek == Peek::Array {
            TokenKind::ArrayBegin
        } else if peek == Peek::Object {
            TokenKind::ObjectBegin
        } else {
            TokenKind::Number
        })
    }

    /// Consume the next value, which must be a string.
    pub fn next_string(&mut self) -> Result<&str> {
        Ok(self.jiter.next_str()?)
    }

    /// Consume the next string and require it to equal `expected`.
    pub fn next_string_eql(&mut self, expected: &str) -> Result<()> {
        let actual = self.jiter.next_str()?;
        if actual == expected {
            Ok(())
        } else {
            Err(ModelError::UnexpectedToken(format!(
                "expected string \"{expected}\", found \"{actual}\""
            )))
        }
    }

    pub fn next_boolean(&mut self) -> Result<bool> {
        Ok(self.jiter.next_bool()?)
    }

    pub fn next_null(&mut self) -> Result<()> {
        Ok(self.jiter.next_null()?)
    }

    /// Consume the next value, which must be an integer.
    pub fn next_integer(&mut self) -> Result<i64> {
        match self.jiter.next_number()? {
            NumberAny::Int(NumberInt::Int(i)) => Ok(i),
            _ => Err(ModelError::InvalidNumber),
        }
    }

    /// Consume the next numeric value (integer or float) as f64.
    pub fn next_number(&mut self) -> Result<f64> {
        match self.jiter.next_number()? {
            NumberAny::Int(NumberInt::Int(i)) => Ok(i as f64),
            NumberAny::Int(NumberInt::BigInt(_)) => Err(ModelError::InvalidNumber),
            NumberAny::Float(f) => Ok(f),
        }
    }

    /// Enter an object scope. Returns the first key, or `None` for `{}`.
    pub fn next_object_begin(&mut self) -> Result<Option<String>> {
        Ok(self.jiter.next_object()?.map(str::to_string))
    }

    /// Advance to the next key in the current object scope, or `None` at
    /// the closing brace.
    pub fn next_key(&mut self) -> Result<Option<String>> {
        Ok(self.jiter.next_key()?.map(str::to_string))
    }

    /// Enter an array scope. Returns `true` when a first element exists.
    pub fn next_array_begin(&mut self) -> Result<bool> {
        Ok(self.jiter.next_array()?.is_some())
    }

    /// Advance past the current element. Returns `true` while elements
    /// remain.
    pub fn next_array_step(&mut self) -> Result<bool> {
        Ok(self.jiter.array_step()?.is_some())
    }

    /// Skip an entire value: scalar, object, or array.
    pub fn skip_value(&mut self) -> Result<()> {
        self.jiter.next_skip()?;
        Ok(())
    }

    /// Require end of input (trailing whitespace allowed).
    pub fn finish(&mut self) -> Result<()> {
        self.jiter.finish()?;
        Ok(())
    }

    /// Read an arbitrary value into a JSON document. Used for metadata and
    /// opaque trait payloads.
    pub fn read_document(&mut self) -> Result<serde_json::Value> {
        use serde_json::Value;
        Ok(match self.peek()? {
            TokenKind::Null => {
                self.next_null()?;
                Value::Null
            }
            TokenKind::Bool => Value::Bool(self.next_boolean()?),
            TokenKind::Number => match self.jiter.next_number()? {
                NumberAny::Int(NumberInt::Int(i)) => Value::from(i),
                NumberAny::Int(NumberInt::BigInt(_)) => return Err(ModelError::InvalidNumber),
                NumberAny::Float(f) => {
                    Value::Number(serde_json::Number::from_f64(f).ok_or(ModelError::InvalidNumber)?)
                }
            },
            TokenKind::String => Value::String(self.next_string()?.to_string()),
            TokenKind::ArrayBegin => {
                let mut items = Vec::new();
                let mut more = self.next_array_begin()?;
                while more {
                    items.push(self.read_document()?);
                    more = self.next_array_step()?;
                }
                Value::Array(items)
            }
            TokenKind::ObjectBegin => {
                let mut map = serde_json::Map::new();
                let mut key = self.next_object_begin()?;
                while let Some(k) = key {
                    let value = self.read_document()?;
                    map.insert(k, value);
                    key = self.next_key()?;
                }
                Value::Object(map)
            }
        })
    }
}
