//! Fixed-layout records read in a single block.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::process::{ByteBuffer, ReadMemory};

use super::Value;

/// Fixed-width numeric types a record field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Scalar {
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl Scalar {
    pub fn width(self) -> usize {
        match self {
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::I64 | Scalar::U64 | Scalar::F64 => 8,
        }
    }

    pub(crate) fn decode(self, buf: &ByteBuffer<'_>, offset: usize) -> Result<Value, DecodeError> {
        Ok(match self {
            Scalar::I16 => Value::I16(buf.read_i16_at(offset)?),
            Scalar::U16 => Value::U16(buf.read_u16_at(offset)?),
            Scalar::I32 => Value::I32(buf.read_i32_at(offset)?),
            Scalar::U32 => Value::U32(buf.read_u32_at(offset)?),
            Scalar::I64 => Value::I64(buf.read_i64_at(offset)?),
            Scalar::U64 => Value::U64(buf.read_u64_at(offset)?),
            Scalar::F32 => Value::F32(buf.read_f32_at(offset)?),
            Scalar::F64 => Value::F64(buf.read_f64_at(offset)?),
        })
    }
}

/// One field of a record layout: name, byte offset from the record start
/// and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub offset: usize,
    #[serde(rename = "type")]
    pub kind: Scalar,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, offset: usize, kind: Scalar) -> Self {
        Self {
            name: name.into(),
            offset,
            kind,
        }
    }

    /// Offset one past the field's last byte, `None` if that overflows.
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.kind.width())
    }
}

/// Decoded record, keyed by field name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(Value::as_f32)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Read the block spanned by `specs` at `address` in one read and slice it
/// per field.
pub fn read_record<R: ReadMemory + ?Sized>(
    reader: &R,
    address: u64,
    specs: &[FieldSpec],
) -> Result<Record, DecodeError> {
    let mut size = 0;
    for spec in specs {
        let end = spec.end().ok_or_else(|| DecodeError::Malformed {
            address,
            reason: format!("record field '{}' at offset {:#x} overflows", spec.name, spec.offset),
        })?;
        size = size.max(end);
    }
    if size == 0 {
        return Ok(Record::default());
    }

    let bytes = reader.read_bytes(address, size)?;
    let buf = ByteBuffer::at(address, &bytes);

    let mut fields = BTreeMap::new();
    for spec in specs {
        fields.insert(spec.name.clone(), spec.kind.decode(&buf, spec.offset)?);
    }
    Ok(Record { fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;
    use crate::process::MockMemoryBuilder;

    fn difficulty_layout() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("ar", 0x0, Scalar::F32),
            FieldSpec::new("cs", 0x4, Scalar::F32),
            FieldSpec::new("hp", 0x8, Scalar::F32),
            FieldSpec::new("od", 0xC, Scalar::F32),
        ]
    }

    #[test]
    fn test_read_packed_floats() {
        let reader = MockMemoryBuilder::new()
            .write_f32(0x20, 9.0)
            .write_f32(0x24, 4.0)
            .write_f32(0x28, 6.0)
            .write_f32(0x2C, 8.5)
            .build();

        let record = read_record(&reader, 0x1020, &difficulty_layout()).unwrap();
        assert_eq!(record.len(), 4);
        assert_eq!(record.f32("ar"), Some(9.0));
        assert_eq!(record.f32("cs"), Some(4.0));
        assert_eq!(record.f32("hp"), Some(6.0));
        assert_eq!(record.f32("od"), Some(8.5));
    }

    #[test]
    fn test_mixed_widths() {
        let reader = MockMemoryBuilder::new()
            .write_i16(0, -2)
            .write_u32(4, 500)
            .write_f64(8, 1.25)
            .build();

        let record = read_record(
            &reader,
            0x1000,
            &[
                FieldSpec::new("a", 0, Scalar::I16),
                FieldSpec::new("b", 4, Scalar::U32),
                FieldSpec::new("c", 8, Scalar::F64),
            ],
        )
        .unwrap();
        assert_eq!(record.get("a"), Some(&Value::I16(-2)));
        assert_eq!(record.get("b"), Some(&Value::U32(500)));
        assert_eq!(record.get("c"), Some(&Value::F64(1.25)));
    }

    #[test]
    fn test_empty_layout() {
        let reader = MockMemoryBuilder::new().with_size(4).build();
        assert!(read_record(&reader, 0x1000, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_block_out_of_range() {
        let reader = MockMemoryBuilder::new().with_size(8).build();
        assert_eq!(
            read_record(&reader, 0x1000, &difficulty_layout()),
            Err(DecodeError::Read(ReadError::InvalidAddress { address: 0x1000 }))
        );
    }

    #[test]
    fn test_field_spec_serde() {
        let spec: FieldSpec =
            serde_json::from_str(r#"{"name":"od","offset":12,"type":"f32"}"#).unwrap();
        assert_eq!(spec, FieldSpec::new("od", 12, Scalar::F32));
        assert_eq!(spec.end(), Some(16));
    }

    #[test]
    fn test_overflowing_offset_rejected() {
        let reader = MockMemoryBuilder::new().with_size(0x20).build();
        let spec = FieldSpec::new("od", usize::MAX, Scalar::F32);
        assert_eq!(spec.end(), None);

        let result = read_record(&reader, 0x1000, &[FieldSpec::new("ar", 0, Scalar::F32), spec]);
        assert!(matches!(result, Err(DecodeError::Malformed { address: 0x1000, .. })));
    }
}
