use std::collections::VecDeque;

use bytes::{BufMut, BytesMut};
use tracing::{debug, warn};

use super::header::{HEADER_LEN, PageHeader};
use super::presence::PresenceBuilder;
use super::{EncodedPage, PageLimits};
use crate::encoding::factory::EncoderFactory;
use crate::encoding::{Encoding, ValuesEncoder};
use crate::errors::{PageCodecError, Result};
use crate::schema::ColumnDescriptor;
use crate::value::{ColumnChunk, Value};

/// Counters for the pages produced by a column encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub pages: usize,
    pub rows: usize,
    pub bytes: usize,
    /// Pages holding a single value that alone exceeded the page size.
    pub oversized_pages: usize,
}

/// Accumulates values for one column chunk, cutting pages as the size or
/// row count ceiling is reached.
///
/// A value is never split across pages. A value is only added to a non-empty
/// page if the page stays within the byte ceiling afterwards, so the only
/// page that can exceed the ceiling is one holding a single value.
///
/// Completed pages are queued and can be taken with `pop_page` while
/// encoding, or all at once with `finish`.
#[derive(Debug)]
pub struct ColumnPageEncoder {
    descr: ColumnDescriptor,
    limits: PageLimits,
    values: Box<dyn ValuesEncoder>,
    /// Only set for nullable columns.
    presence: Option<PresenceBuilder>,
    /// Rows in the current page.
    num_rows: usize,
    pages: VecDeque<EncodedPage>,
    stats: EncoderStats,
}

impl ColumnPageEncoder {
    pub fn try_new(
        descr: ColumnDescriptor,
        factory: &dyn EncoderFactory,
        limits: PageLimits,
    ) -> Result<Self> {
        if limits.page_size_bytes == 0 || limits.page_row_count_limit == 0 {
            return Err(PageCodecError::InvalidConfig(format!(
                "page limits must be non-zero, got {limits:?}"
            )));
        }

        let values = factory.new_values_encoder(&descr)?;
        let presence = descr
            .repetition
            .is_nullable()
            .then(PresenceBuilder::default);

        Ok(ColumnPageEncoder {
            descr,
            limits,
            values,
            presence,
            num_rows: 0,
            pages: VecDeque::new(),
            stats: EncoderStats::default(),
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.values.encoding()
    }

    /// Encoded size of the current, unfinished page.
    pub fn current_page_len(&self) -> usize {
        let presence = self.presence.as_ref().map(|p| p.byte_len()).unwrap_or(0);
        HEADER_LEN + presence + self.values.buffered_len()
    }

    /// Number of bytes the current page grows by when adding `slot`.
    fn growth(&self, slot: Option<&Value>) -> Result<usize> {
        let presence = self.presence.as_ref().map(|p| p.growth()).unwrap_or(0);
        let value = match slot {
            Some(v) => self.values.encoded_len(v)?,
            None => 0,
        };
        Ok(presence + value)
    }

    /// Append the next row's slot.
    pub fn put(&mut self, slot: Option<&Value>) -> Result<()> {
        if slot.is_none() && self.presence.is_none() {
            return Err(PageCodecError::UnexpectedNull {
                column: self.descr.name.clone(),
            });
        }

        let growth = self.growth(slot)?;
        if self.num_rows > 0 && self.current_page_len() + growth > self.limits.page_size_bytes {
            self.flush_page()?;
        }

        if let Some(v) = slot {
            self.values.put(v)?;
        }
        if let Some(presence) = self.presence.as_mut() {
            presence.push(slot.is_some());
        }
        self.num_rows += 1;

        if self.num_rows == 1 && self.current_page_len() > self.limits.page_size_bytes {
            let overflow = PageCodecError::EncodingOverflow {
                size: self.current_page_len(),
                limit: self.limits.page_size_bytes,
            };
            if self.stats.oversized_pages == 0 {
                warn!(column = %self.descr.name, "{overflow}, writing oversized page");
            } else {
                debug!(column = %self.descr.name, "{overflow}, writing oversized page");
            }
            self.stats.oversized_pages += 1;
        }

        if self.num_rows >= self.limits.page_row_count_limit {
            self.flush_page()?;
        }

        Ok(())
    }

    /// Append every slot in a chunk.
    pub fn put_chunk(&mut self, chunk: &ColumnChunk) -> Result<()> {
        if chunk.physical_type != self.descr.physical_type {
            return Err(PageCodecError::TypeMismatch {
                expected: self.descr.physical_type,
                got: chunk.physical_type,
            });
        }
        for slot in &chunk.slots {
            self.put(slot.as_ref())?;
        }
        Ok(())
    }

    /// Cut the current page, queueing it. No-op if the page has no rows.
    pub fn flush_page(&mut self) -> Result<()> {
        if self.num_rows == 0 {
            return Ok(());
        }

        let values = self.values.flush();
        let presence = self.presence.as_mut().map(|p| p.finish());

        let header = PageHeader {
            encoding: self.values.encoding(),
            physical_type: self.descr.physical_type,
            has_presence: presence.is_some(),
            num_rows: u32::try_from(self.num_rows).map_err(|_| {
                PageCodecError::InvalidConfig(format!("{} rows don't fit in a page", self.num_rows))
            })?,
            values_len: u32::try_from(values.len()).map_err(|_| PageCodecError::EncodingOverflow {
                size: values.len(),
                limit: u32::MAX as usize,
            })?,
        };

        let mut buf = BytesMut::with_capacity(header.page_len());
        header.write_to(&mut buf);
        if let Some(presence) = presence {
            buf.put_slice(&presence);
        }
        buf.put_slice(&values);

        let page = EncodedPage {
            encoding: header.encoding,
            num_rows: self.num_rows,
            data: buf.freeze(),
        };

        debug!(
            column = %self.descr.name,
            rows = page.num_rows,
            bytes = page.len(),
            encoding = %page.encoding,
            "cut page"
        );

        self.stats.pages += 1;
        self.stats.rows += page.num_rows;
        self.stats.bytes += page.len();
        self.num_rows = 0;
        self.pages.push_back(page);

        Ok(())
    }

    /// Take the oldest completed page.
    pub fn pop_page(&mut self) -> Option<EncodedPage> {
        self.pages.pop_front()
    }

    /// Flush the final short page and return all remaining pages.
    ///
    /// A column chunk that never received a row yields a single zero length
    /// page with a row count of 0.
    pub fn finish(mut self) -> Result<(Vec<EncodedPage>, EncoderStats)> {
        self.flush_page()?;

        if self.stats.pages == 0 {
            self.stats.pages = 1;
            self.pages.push_back(EncodedPage::empty(self.values.encoding()));
        }

        Ok((self.pages.into_iter().collect(), self.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::factory::{DeltaEncoderFactory, PlainEncoderFactory};
    use crate::schema::PhysicalType;

    fn limits(page_size_bytes: usize, page_row_count_limit: usize) -> PageLimits {
        PageLimits {
            page_size_bytes,
            page_row_count_limit,
        }
    }

    #[test]
    fn empty_chunk_yields_empty_page() {
        let descr = ColumnDescriptor::required("a", PhysicalType::Int32);
        let enc = ColumnPageEncoder::try_new(descr, &PlainEncoderFactory, limits(64, 64)).unwrap();
        let (pages, stats) = enc.finish().unwrap();

        assert_eq!(vec![EncodedPage::empty(Encoding::Plain)], pages);
        assert_eq!(0, stats.rows);
    }

    #[test]
    fn cuts_on_row_limit() {
        let descr = ColumnDescriptor::required("a", PhysicalType::Int64);
        let mut enc =
            ColumnPageEncoder::try_new(descr, &PlainEncoderFactory, limits(4096, 3)).unwrap();
        for v in 0..7i64 {
            enc.put(Some(&v.into())).unwrap();
        }
        // Two full pages are already queued.
        assert_eq!(3, enc.pop_page().unwrap().num_rows);

        let (pages, stats) = enc.finish().unwrap();
        let rows: Vec<_> = pages.iter().map(|p| p.num_rows).collect();
        assert_eq!(vec![3, 1], rows);
        assert_eq!(3, stats.pages);
        assert_eq!(7, stats.rows);
    }

    #[test]
    fn cuts_on_byte_limit() {
        // Header + 3 int32 values.
        let page_size = HEADER_LEN + 12;
        let descr = ColumnDescriptor::required("a", PhysicalType::Int32);
        let mut enc =
            ColumnPageEncoder::try_new(descr, &PlainEncoderFactory, limits(page_size, 1000))
                .unwrap();
        for v in 0..10i32 {
            enc.put(Some(&v.into())).unwrap();
        }

        let (pages, stats) = enc.finish().unwrap();
        let rows: Vec<_> = pages.iter().map(|p| p.num_rows).collect();
        assert_eq!(vec![3, 3, 3, 1], rows);
        assert!(pages.iter().all(|p| p.len() <= page_size));
        assert_eq!(0, stats.oversized_pages);
    }

    #[test]
    fn oversized_single_value() {
        let descr = ColumnDescriptor::required("s", PhysicalType::ByteArray);
        let mut enc =
            ColumnPageEncoder::try_new(descr, &PlainEncoderFactory, limits(32, 1000)).unwrap();
        enc.put(Some(&"short".into())).unwrap();
        enc.put(Some(&Value::from(vec![7u8; 100]))).unwrap();
        enc.put(Some(&"short".into())).unwrap();

        let (pages, stats) = enc.finish().unwrap();
        let rows: Vec<_> = pages.iter().map(|p| p.num_rows).collect();
        assert_eq!(vec![1, 1, 1], rows);
        assert_eq!(HEADER_LEN + 4 + 100, pages[1].len());
        assert_eq!(1, stats.oversized_pages);
    }

    #[test]
    fn delta_restarts_per_page() {
        let descr = ColumnDescriptor::required("a", PhysicalType::Int32);
        let mut enc =
            ColumnPageEncoder::try_new(descr, &DeltaEncoderFactory, limits(4096, 2)).unwrap();
        for v in [10i32, 11, 12] {
            enc.put(Some(&v.into())).unwrap();
        }

        let (pages, _) = enc.finish().unwrap();
        assert_eq!(2, pages.len());
        // First value at full width plus one single byte difference.
        assert_eq!(HEADER_LEN + 4 + 1, pages[0].len());
        assert_eq!(HEADER_LEN + 4, pages[1].len());
        assert!(pages.iter().all(|p| p.encoding == Encoding::Delta));
    }

    #[test]
    fn null_in_required_column() {
        let descr = ColumnDescriptor::required("a", PhysicalType::Int32);
        let mut enc =
            ColumnPageEncoder::try_new(descr, &PlainEncoderFactory, limits(64, 64)).unwrap();
        let err = enc.put(None).unwrap_err();
        assert!(matches!(err, PageCodecError::UnexpectedNull { .. }));
    }

    #[test]
    fn wrong_value_type() {
        let descr = ColumnDescriptor::optional("a", PhysicalType::Int32);
        let mut enc =
            ColumnPageEncoder::try_new(descr, &PlainEncoderFactory, limits(64, 64)).unwrap();
        let err = enc.put(Some(&"nope".into())).unwrap_err();
        assert!(matches!(err, PageCodecError::TypeMismatch { .. }));
    }

    #[test]
    fn zero_limits_rejected() {
        let descr = ColumnDescriptor::optional("a", PhysicalType::Int32);
        let err =
            ColumnPageEncoder::try_new(descr, &PlainEncoderFactory, limits(0, 10)).unwrap_err();
        assert!(matches!(err, PageCodecError::InvalidConfig(_)));
    }

    #[test]
    fn nullable_page_has_presence_bitmap() {
        let descr = ColumnDescriptor::optional("a", PhysicalType::Int32);
        let mut enc =
            ColumnPageEncoder::try_new(descr, &PlainEncoderFactory, limits(4096, 4096)).unwrap();
        enc.put(Some(&1i32.into())).unwrap();
        enc.put(None).unwrap();
        enc.put(Some(&3i32.into())).unwrap();

        let (pages, _) = enc.finish().unwrap();
        assert_eq!(1, pages.len());
        assert_eq!(HEADER_LEN + 1 + 8, pages[0].len());
        assert_eq!(0b101, pages[0].data[HEADER_LEN]);
    }
}
