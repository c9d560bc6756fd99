use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Encoding, ValuesEncoder};
use crate::errors::{Result, corrupt};
use crate::schema::PhysicalType;
use crate::value::Value;

/// Plain encoder.
///
/// Fixed width types are written little endian, booleans are bit packed
/// (LSB first), and byte arrays are prefixed with their u32 length.
#[derive(Debug)]
pub struct PlainValuesEncoder {
    physical_type: PhysicalType,
    buf: BytesMut,
    /// Number of values in the current page. Needed for bit packing.
    num_values: usize,
}

impl PlainValuesEncoder {
    pub fn new(physical_type: PhysicalType) -> Self {
        PlainValuesEncoder {
            physical_type,
            buf: BytesMut::new(),
            num_values: 0,
        }
    }
}

impl ValuesEncoder for PlainValuesEncoder {
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn physical_type(&self) -> PhysicalType {
        self.physical_type
    }

    fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    fn encoded_len(&self, value: &Value) -> Result<usize> {
        value.check_type(self.physical_type)?;
        Ok(match value {
            // A new byte is only needed at byte boundaries.
            Value::Boolean(_) => usize::from(self.num_values % 8 == 0),
            Value::ByteArray(bs) => 4 + bs.len(),
            Value::Int32(_) | Value::Float(_) => 4,
            Value::Int64(_) | Value::Double(_) => 8,
        })
    }

    fn put(&mut self, value: &Value) -> Result<()> {
        value.check_type(self.physical_type)?;
        match value {
            Value::Boolean(v) => {
                let bit = self.num_values % 8;
                if bit == 0 {
                    self.buf.put_u8(0);
                }
                if *v {
                    let last = self.buf.len() - 1;
                    self.buf[last] |= 1 << bit;
                }
            }
            Value::Int32(v) => self.buf.put_i32_le(*v),
            Value::Int64(v) => self.buf.put_i64_le(*v),
            Value::Float(v) => self.buf.put_f32_le(*v),
            Value::Double(v) => self.buf.put_f64_le(*v),
            Value::ByteArray(bs) => {
                self.buf.put_u32_le(bs.len() as u32);
                self.buf.put_slice(bs);
            }
        }
        self.num_values += 1;
        Ok(())
    }

    fn flush(&mut self) -> Bytes {
        self.num_values = 0;
        self.buf.split().freeze()
    }
}

#[derive(Debug)]
pub struct PlainValuesDecoder {
    physical_type: PhysicalType,
    data: Bytes,
    /// Bit position in the current byte when reading booleans.
    bit_pos: u8,
    /// Byte currently being unpacked.
    current_byte: u8,
}

impl PlainValuesDecoder {
    pub fn new(physical_type: PhysicalType, data: Bytes) -> Self {
        PlainValuesDecoder {
            physical_type,
            data,
            bit_pos: 0,
            current_byte: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    pub fn read_next(&mut self) -> Result<Value> {
        if let Some(width) = self.physical_type.fixed_width() {
            self.ensure(width)?;
        }

        Ok(match self.physical_type {
            PhysicalType::Int32 => Value::Int32(self.data.get_i32_le()),
            PhysicalType::Int64 => Value::Int64(self.data.get_i64_le()),
            PhysicalType::Float => Value::Float(self.data.get_f32_le()),
            PhysicalType::Double => Value::Double(self.data.get_f64_le()),
            PhysicalType::Boolean => {
                if self.bit_pos == 0 {
                    self.ensure(1)?;
                    self.current_byte = self.data.get_u8();
                }
                let v = (self.current_byte >> self.bit_pos) & 1 == 1;
                self.bit_pos = (self.bit_pos + 1) % 8;
                Value::Boolean(v)
            }
            PhysicalType::ByteArray => {
                self.ensure(4)?;
                let len = self.data.get_u32_le() as usize;
                self.ensure(len)?;
                Value::ByteArray(self.data.split_to(len))
            }
        })
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.data.remaining() < n {
            return Err(corrupt!(
                "plain {}: need {n} bytes, {} remaining",
                self.physical_type,
                self.data.remaining()
            ));
        }
        Ok(())
    }
}
