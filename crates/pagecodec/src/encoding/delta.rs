use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::bitutil::{
    read_unsigned_vlq, unsigned_vlq_len, write_unsigned_vlq, zigzag_decode, zigzag_encode,
};
use super::{Encoding, ValuesEncoder};
use crate::errors::{PageCodecError, Result, corrupt, internal};
use crate::schema::PhysicalType;
use crate::value::Value;

/// Delta encoder for int32 and int64 columns.
///
/// The first value of a page is written little endian at full width, every
/// following value as the zig-zag vlq of its difference to the previous
/// value. Differences are computed in i64 with wrapping arithmetic.
#[derive(Debug)]
pub struct DeltaValuesEncoder {
    physical_type: PhysicalType,
    buf: BytesMut,
    /// Previous value in the current page, None at the start of a page.
    prev: Option<i64>,
}

impl DeltaValuesEncoder {
    pub fn try_new(physical_type: PhysicalType) -> Result<Self> {
        if !physical_type.is_integer() {
            return Err(internal!("delta encoder created for {physical_type}"));
        }

        Ok(DeltaValuesEncoder {
            physical_type,
            buf: BytesMut::new(),
            prev: None,
        })
    }

    fn as_i64(&self, value: &Value) -> Result<i64> {
        match value {
            Value::Int32(v) if self.physical_type == PhysicalType::Int32 => Ok(*v as i64),
            Value::Int64(v) if self.physical_type == PhysicalType::Int64 => Ok(*v),
            other => Err(PageCodecError::TypeMismatch {
                expected: self.physical_type,
                got: other.physical_type(),
            }),
        }
    }
}

impl ValuesEncoder for DeltaValuesEncoder {
    fn encoding(&self) -> Encoding {
        Encoding::Delta
    }

    fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    fn encoded_len(&self, value: &Value) -> Result<usize> {
        let v = self.as_i64(value)?;
        Ok(match self.prev {
            Some(prev) => unsigned_vlq_len(zigzag_encode(v.wrapping_sub(prev))),
            None if self.physical_type == PhysicalType::Int32 => 4,
            None => 8,
        })
    }

    fn put(&mut self, value: &Value) -> Result<()> {
        let v = self.as_i64(value)?;
        match self.prev {
            Some(prev) => write_unsigned_vlq(&mut self.buf, zigzag_encode(v.wrapping_sub(prev))),
            None if self.physical_type == PhysicalType::Int32 => self.buf.put_i32_le(v as i32),
            None => self.buf.put_i64_le(v),
        }
        self.prev = Some(v);
        Ok(())
    }

    fn flush(&mut self) -> Bytes {
        self.prev = None;
        self.buf.split().freeze()
    }
}

#[derive(Debug)]
pub struct DeltaValuesDecoder {
    physical_type: PhysicalType,
    data: Bytes,
    prev: Option<i64>,
}

impl DeltaValuesDecoder {
    pub fn try_new(physical_type: PhysicalType, data: Bytes) -> Result<Self> {
        if !physical_type.is_integer() {
            return Err(corrupt!("delta encoded page for {physical_type} column"));
        }

        Ok(DeltaValuesDecoder {
            physical_type,
            data,
            prev: None,
        })
    }

    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    pub fn read_next(&mut self) -> Result<Value> {
        let v = match self.prev {
            Some(prev) => {
                if !self.data.has_remaining() {
                    return Err(corrupt!("delta: no bytes remaining for next difference"));
                }
                let delta = zigzag_decode(read_unsigned_vlq(&mut self.data)?);
                prev.wrapping_add(delta)
            }
            None => {
                let width = if self.physical_type == PhysicalType::Int32 { 4 } else { 8 };
                if self.data.remaining() < width {
                    return Err(corrupt!(
                        "delta: need {width} bytes for first value, {} remaining",
                        self.data.remaining()
                    ));
                }
                if width == 4 {
                    self.data.get_i32_le() as i64
                } else {
                    self.data.get_i64_le()
                }
            }
        };
        self.prev = Some(v);

        match self.physical_type {
            PhysicalType::Int32 => {
                let v = i32::try_from(v)
                    .map_err(|_| corrupt!("delta: decoded value {v} out of range for int32"))?;
                Ok(Value::Int32(v))
            }
            _ => Ok(Value::Int64(v)),
        }
    }
}
