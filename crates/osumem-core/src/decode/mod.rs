//! Typed decoding of raw target memory.
//!
//! This module contains:
//! - `string` - narrow, wide, length-prefixed and managed strings
//! - `record` - fixed-layout records read in one block
//! - `Value`/`ValueKind` - the decoded value and the table-level description
//!   of how to decode it

mod record;
mod string;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::process::{ByteBuffer, ReadMemory};

pub use record::{FieldSpec, Record, Scalar, read_record};
pub use string::{
    StringEncoding, read_managed_string, read_managed_string_ref, read_narrow_string,
    read_prefixed, read_wide_string,
};

/// A decoded value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    Record(Record),
}

impl Value {
    /// Integer value, if this is an integer that fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I16(v) => Some(i64::from(v)),
            Value::U16(v) => Some(i64::from(v)),
            Value::I32(v) => Some(i64::from(v)),
            Value::U32(v) => Some(i64::from(v)),
            Value::I64(v) => Some(v),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Value::F32(v) => Some(v),
            Value::F64(v) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// How the bytes at a resolved address are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueKind {
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    /// Null-terminated Windows-1252 text stored inline.
    NarrowString,
    /// Null-terminated UTF-16LE text stored inline.
    WideString,
    /// Reference to a managed string object.
    ManagedString,
    Record { fields: Vec<FieldSpec> },
}

fn read_scalar<R: ReadMemory + ?Sized>(
    reader: &R,
    address: u64,
    scalar: Scalar,
) -> Result<Value, DecodeError> {
    let bytes = reader.read_bytes(address, scalar.width())?;
    scalar.decode(&ByteBuffer::at(address, &bytes), 0)
}

/// Decode the value at `address` as described by `kind`.
pub fn read_value<R: ReadMemory + ?Sized>(
    reader: &R,
    address: u64,
    kind: &ValueKind,
) -> Result<Value, DecodeError> {
    match kind {
        ValueKind::I16 => read_scalar(reader, address, Scalar::I16),
        ValueKind::U16 => read_scalar(reader, address, Scalar::U16),
        ValueKind::I32 => read_scalar(reader, address, Scalar::I32),
        ValueKind::U32 => read_scalar(reader, address, Scalar::U32),
        ValueKind::I64 => read_scalar(reader, address, Scalar::I64),
        ValueKind::U64 => read_scalar(reader, address, Scalar::U64),
        ValueKind::F32 => read_scalar(reader, address, Scalar::F32),
        ValueKind::F64 => read_scalar(reader, address, Scalar::F64),
        ValueKind::NarrowString => read_narrow_string(reader, address).map(Value::Text),
        ValueKind::WideString => read_wide_string(reader, address).map(Value::Text),
        ValueKind::ManagedString => read_managed_string_ref(reader, address).map(Value::Text),
        ValueKind::Record { fields } => read_record(reader, address, fields).map(Value::Record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockMemoryBuilder;

    #[test]
    fn test_read_value_scalars() {
        let reader = MockMemoryBuilder::new()
            .write_i32(0, -7)
            .write_f32(4, 8.5)
            .build();

        assert_eq!(
            read_value(&reader, 0x1000, &ValueKind::I32).unwrap(),
            Value::I32(-7)
        );
        assert_eq!(
            read_value(&reader, 0x1004, &ValueKind::F32).unwrap(),
            Value::F32(8.5)
        );
    }

    #[test]
    fn test_read_value_managed_string() {
        let reader = MockMemoryBuilder::new()
            .with_size(0x40)
            .write_ptr32(0, 0x20)
            .write_managed_string(0x20, "Hatsune Miku")
            .build();

        let value = read_value(&reader, 0x1000, &ValueKind::ManagedString).unwrap();
        assert_eq!(value.as_text(), Some("Hatsune Miku"));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::U32(500).as_i64(), Some(500));
        assert_eq!(Value::U64(u64::MAX).as_i64(), None);
        assert_eq!(Value::F64(1.5).as_f32(), Some(1.5));
        assert_eq!(Value::I32(1).as_f32(), None);
        assert_eq!(Value::Text("a".into()).into_text(), Some("a".to_string()));
        assert_eq!(Value::I32(1).as_text(), None);
    }

    #[test]
    fn test_value_kind_serde() {
        let kind: ValueKind = serde_json::from_str(r#"{"type":"managed_string"}"#).unwrap();
        assert_eq!(kind, ValueKind::ManagedString);

        let kind: ValueKind = serde_json::from_str(
            r#"{"type":"record","fields":[{"name":"ar","offset":0,"type":"f32"}]}"#,
        )
        .unwrap();
        assert_eq!(
            kind,
            ValueKind::Record {
                fields: vec![FieldSpec::new("ar", 0, Scalar::F32)]
            }
        );
    }
}
