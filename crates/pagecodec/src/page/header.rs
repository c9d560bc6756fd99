use bytes::{Buf, BufMut};

use crate::encoding::Encoding;
use crate::errors::{Result, corrupt};
use crate::schema::PhysicalType;

/// Encoded size of the page header.
pub const HEADER_LEN: usize = 12;

const FLAG_HAS_PRESENCE: u8 = 0b0000_0001;

/// Fixed size page header.
///
/// ```text
/// encoding u8 | physical type u8 | flags u8 | reserved u8 | num_rows u32 | values_len u32
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub encoding: Encoding,
    pub physical_type: PhysicalType,
    /// If a presence bitmap follows the header.
    pub has_presence: bool,
    pub num_rows: u32,
    /// Length of the value stream in bytes.
    pub values_len: u32,
}

impl PageHeader {
    /// Length of the presence bitmap implied by this header.
    pub fn presence_len(&self) -> usize {
        if self.has_presence {
            (self.num_rows as usize).div_ceil(8)
        } else {
            0
        }
    }

    /// Total page length implied by this header.
    pub fn page_len(&self) -> usize {
        HEADER_LEN + self.presence_len() + self.values_len as usize
    }

    /// Errors if the implied length disagrees with the actual buffer length.
    pub fn check_len(&self, actual: usize) -> Result<()> {
        let implied = self.page_len();
        if implied != actual {
            return Err(corrupt!(
                "header implies {implied} bytes, page has {actual} bytes"
            ));
        }
        Ok(())
    }

    pub fn write_to(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.encoding.tag());
        buf.put_u8(self.physical_type.tag());
        buf.put_u8(if self.has_presence { FLAG_HAS_PRESENCE } else { 0 });
        buf.put_u8(0);
        buf.put_u32_le(self.num_rows);
        buf.put_u32_le(self.values_len);
    }

    /// Read a header from the start of a page.
    pub fn read_from(mut buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(corrupt!(
                "page of {} bytes too short for header",
                buf.len()
            ));
        }

        let encoding_tag = buf.get_u8();
        let encoding = Encoding::from_tag(encoding_tag)
            .ok_or_else(|| corrupt!("unknown encoding tag {encoding_tag}"))?;
        let type_tag = buf.get_u8();
        let physical_type = PhysicalType::from_tag(type_tag)
            .ok_or_else(|| corrupt!("unknown physical type tag {type_tag}"))?;
        let flags = buf.get_u8();
        if flags & !FLAG_HAS_PRESENCE != 0 {
            return Err(corrupt!("unknown page flags {flags:#010b}"));
        }
        let _reserved = buf.get_u8();
        let num_rows = buf.get_u32_le();
        let values_len = buf.get_u32_le();

        Ok(PageHeader {
            encoding,
            physical_type,
            has_presence: flags & FLAG_HAS_PRESENCE != 0,
            num_rows,
            values_len,
        })
    }
}
