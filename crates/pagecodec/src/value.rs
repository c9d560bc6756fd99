use bytes::Bytes;

use crate::errors::{PageCodecError, Result};
use crate::schema::{ColumnDescriptor, PhysicalType};

/// A single typed scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    ByteArray(Bytes),
}

/// A value position in a column, None for null.
pub type Slot = Option<Value>;

impl Value {
    pub const fn physical_type(&self) -> PhysicalType {
        match self {
            Value::Boolean(_) => PhysicalType::Boolean,
            Value::Int32(_) => PhysicalType::Int32,
            Value::Int64(_) => PhysicalType::Int64,
            Value::Float(_) => PhysicalType::Float,
            Value::Double(_) => PhysicalType::Double,
            Value::ByteArray(_) => PhysicalType::ByteArray,
        }
    }

    /// Errors if this value isn't of the expected type.
    pub fn check_type(&self, expected: PhysicalType) -> Result<()> {
        let got = self.physical_type();
        if got != expected {
            return Err(PageCodecError::TypeMismatch { expected, got });
        }
        Ok(())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::ByteArray(Bytes::copy_from_slice(v.as_bytes()))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::ByteArray(Bytes::from(v))
    }
}

/// All slots for one column in one row group.
///
/// Produced by decoding, consumed by encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChunk {
    pub physical_type: PhysicalType,
    pub slots: Vec<Slot>,
}

impl ColumnChunk {
    pub fn new(physical_type: PhysicalType) -> Self {
        ColumnChunk {
            physical_type,
            slots: Vec::new(),
        }
    }

    /// Create a chunk, checking every slot against the column.
    pub fn try_from_slots(descr: &ColumnDescriptor, slots: Vec<Slot>) -> Result<Self> {
        for slot in &slots {
            match slot {
                Some(v) => v.check_type(descr.physical_type)?,
                None if !descr.repetition.is_nullable() => {
                    return Err(PageCodecError::UnexpectedNull {
                        column: descr.name.clone(),
                    });
                }
                None => (),
            }
        }

        Ok(ColumnChunk {
            physical_type: descr.physical_type,
            slots,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.slots.len()
    }

    pub fn null_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }
}
