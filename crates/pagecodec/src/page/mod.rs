//! Column pages.
//!
//! A page is the smallest independently decodable unit of a column chunk:
//!
//! ```text
//! | header (12 bytes) | presence bitmap (nullable columns) | values |
//! ```
//!
//! The presence bitmap holds one bit per row (LSB first, 1 = present) and
//! the value stream only holds the present values, encoded with the page's
//! encoding.

pub mod decoder;
pub mod encoder;
pub mod header;
pub mod presence;

use bytes::Bytes;

use self::header::PageHeader;
use crate::encoding::Encoding;
use crate::errors::Result;

/// An encoded page ready to be handed to a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPage {
    pub encoding: Encoding,
    /// Number of rows (including nulls) in this page.
    pub num_rows: usize,
    /// Complete page bytes, header included.
    ///
    /// Empty for a page with zero rows.
    pub data: Bytes,
}

impl EncodedPage {
    /// Page for an empty column chunk.
    pub fn empty(encoding: Encoding) -> Self {
        EncodedPage {
            encoding,
            num_rows: 0,
            data: Bytes::new(),
        }
    }

    /// Wrap raw page bytes, taking encoding and row count from the header.
    ///
    /// Zero length pages carry no header, so the encoding they were produced
    /// under is lost and they come back tagged plain. Decoders accept them
    /// under any encoding.
    pub fn try_from_bytes(data: Bytes) -> Result<Self> {
        if data.is_empty() {
            return Ok(EncodedPage::empty(Encoding::Plain));
        }

        let header = PageHeader::read_from(&data)?;
        header.check_len(data.len())?;

        Ok(EncodedPage {
            encoding: header.encoding,
            num_rows: header.num_rows as usize,
            data,
        })
    }

    /// Size of the page in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Ceilings for a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Max encoded size of a page in bytes, header included.
    pub page_size_bytes: usize,
    /// Max number of rows in a page.
    pub page_row_count_limit: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        PageLimits {
            page_size_bytes: 1024 * 1024,
            page_row_count_limit: 20_000,
        }
    }
}
