//! Event argument helpers

use rmpv::Value;
use serde::Serialize;

use crate::error::EncodingError;

/// Convert any serializable value into an event argument
///
/// Byte buffers only become binary attachments when they serialize as bytes
/// (`serde_bytes`, or [`binary`]); a plain `Vec<u8>` is an array of integers.
pub fn to_arg<T: Serialize + ?Sized>(value: &T) -> Result<Value, EncodingError> {
    Ok(rmpv::ext::to_value(value)?)
}

/// Wrap raw bytes as a binary argument, preserved byte for byte on the wire
pub fn binary(bytes: impl Into<Vec<u8>>) -> Value {
    Value::Binary(bytes.into())
}

/// Check whether a value carries a binary blob at any depth
pub fn has_binary(value: &Value) -> bool {
    match value {
        Value::Binary(_) => true,
        Value::Array(items) => items.iter().any(has_binary),
        Value::Map(entries) => entries.iter().any(|(k, v)| has_binary(k) || has_binary(v)),
        _ => false,
    }
}

/// Number of binary blobs across all arguments
pub fn count_attachments(args: &[Value]) -> usize {
    fn count(value: &Value) -> usize {
        match value {
            Value::Binary(_) => 1,
            Value::Array(items) => items.iter().map(count).sum(),
            Value::Map(entries) => entries.iter().map(|(k, v)| count(k) + count(v)).sum(),
            _ => 0,
        }
    }

    args.iter().map(count).sum()
}
