use super::EncodedPage;
use super::header::{HEADER_LEN, PageHeader};
use super::presence::PresenceReader;
use crate::encoding::{Encoding, ValuesDecoder, min_values_len};
use crate::errors::{PageCodecError, Result, corrupt};
use crate::schema::ColumnDescriptor;
use crate::value::Slot;

/// Decodes the slots of a single page.
///
/// Can be driven a slot at a time with `read_next` (or as an iterator), or
/// in bulk with `read_all`.
#[derive(Debug)]
pub struct ColumnPageDecoder {
    num_rows: usize,
    /// Index of the next row to read.
    next_row: usize,
    /// Set for pages of nullable columns.
    presence: Option<PresenceReader>,
    /// None for zero length pages.
    values: Option<ValuesDecoder>,
}

impl ColumnPageDecoder {
    /// Create a decoder for the encoding the page says it has.
    pub fn for_page(page: &EncodedPage, descr: &ColumnDescriptor) -> Result<Self> {
        Self::try_new(page, descr, page.encoding)
    }

    /// Create a decoder for `encoding`.
    ///
    /// Errors with `EncodingMismatch` if the page's embedded encoding is
    /// different, and `TypeMismatch` if the page was written for a different
    /// physical type.
    ///
    /// Zero length pages have no header and so no encoding, they decode to
    /// zero rows whatever `encoding` is.
    pub fn try_new(
        page: &EncodedPage,
        descr: &ColumnDescriptor,
        encoding: Encoding,
    ) -> Result<Self> {
        if page.data.is_empty() {
            if page.num_rows != 0 {
                return Err(corrupt!("zero length page declares {} rows", page.num_rows));
            }
            return Ok(ColumnPageDecoder {
                num_rows: 0,
                next_row: 0,
                presence: None,
                values: None,
            });
        }

        let header = PageHeader::read_from(&page.data)?;
        header.check_len(page.data.len())?;

        if header.encoding != encoding {
            return Err(PageCodecError::EncodingMismatch {
                expected: encoding,
                got: header.encoding,
            });
        }
        if header.physical_type != descr.physical_type {
            return Err(PageCodecError::TypeMismatch {
                expected: descr.physical_type,
                got: header.physical_type,
            });
        }
        if header.has_presence != descr.repetition.is_nullable() {
            return Err(corrupt!(
                "presence bitmap {} for {:?} column '{}'",
                if header.has_presence { "present" } else { "missing" },
                descr.repetition,
                descr.name,
            ));
        }

        let num_rows = header.num_rows as usize;
        if num_rows != page.num_rows {
            return Err(corrupt!(
                "header declares {num_rows} rows, page declares {}",
                page.num_rows
            ));
        }

        let values_start = HEADER_LEN + header.presence_len();
        let presence = header
            .has_presence
            .then(|| PresenceReader::new(page.data.slice(HEADER_LEN..values_start)));

        // Row counts come from the page, make sure the value stream can
        // actually hold them before anything is sized from them.
        let num_present = match &presence {
            Some(presence) => presence.count_present(num_rows),
            None => num_rows,
        };
        let min_len = min_values_len(header.encoding, header.physical_type, num_present);
        if (header.values_len as usize) < min_len {
            return Err(corrupt!(
                "{num_present} {} values need at least {min_len} bytes, page has {}",
                header.physical_type,
                header.values_len
            ));
        }

        let values = ValuesDecoder::try_new(
            header.encoding,
            header.physical_type,
            page.data.slice(values_start..),
        )?;

        let decoder = ColumnPageDecoder {
            num_rows,
            next_row: 0,
            presence,
            values: Some(values),
        };
        if num_rows == 0 {
            decoder.check_consumed()?;
        }

        Ok(decoder)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Rows not yet read.
    pub fn remaining_rows(&self) -> usize {
        self.num_rows - self.next_row
    }

    /// Read the next slot, None once all rows have been read.
    pub fn read_next(&mut self) -> Result<Option<Slot>> {
        if self.next_row >= self.num_rows {
            return Ok(None);
        }

        let present = match self.presence.as_mut() {
            Some(presence) => presence.next_present(),
            None => true,
        };

        let slot = if present {
            let values = self
                .values
                .as_mut()
                .ok_or_else(|| corrupt!("page has rows but no values"))?;
            Some(values.read_next()?)
        } else {
            None
        };
        self.next_row += 1;

        if self.next_row == self.num_rows {
            self.check_consumed()?;
        }

        Ok(Some(slot))
    }

    /// Read all remaining slots, appending them to `out`.
    pub fn read_into(&mut self, out: &mut Vec<Slot>) -> Result<()> {
        out.reserve(self.remaining_rows());
        while let Some(slot) = self.read_next()? {
            out.push(slot);
        }
        Ok(())
    }

    /// Decode the whole page.
    pub fn read_all(mut self) -> Result<Vec<Slot>> {
        let mut out = Vec::with_capacity(self.num_rows);
        self.read_into(&mut out)?;
        Ok(out)
    }

    fn check_consumed(&self) -> Result<()> {
        let remaining = self.values.as_ref().map(|v| v.remaining()).unwrap_or(0);
        if remaining != 0 {
            return Err(corrupt!(
                "{remaining} trailing bytes in value stream after {} rows",
                self.num_rows
            ));
        }
        Ok(())
    }
}

impl Iterator for ColumnPageDecoder {
    type Item = Result<Slot>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}
