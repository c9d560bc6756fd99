use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;
use crate::errors::{PageCodecError, Result};
use crate::page::PageLimits;

/// Configuration for a rewrite.
///
/// Compression is always off and dictionary encoding is never used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Max page size in bytes, header included.
    pub page_size_bytes: usize,
    /// Max rows per page.
    pub page_row_count_limit: usize,
    /// Encoding for every column of the output.
    pub encoding: Encoding,
}

impl RewriteConfig {
    /// Use `page_size` for both the byte ceiling and row count limit.
    pub fn new(page_size: usize, encoding: Encoding) -> Self {
        RewriteConfig {
            page_size_bytes: page_size,
            page_row_count_limit: page_size,
            encoding,
        }
    }

    pub fn with_page_row_count_limit(mut self, limit: usize) -> Self {
        self.page_row_count_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size_bytes == 0 {
            return Err(PageCodecError::InvalidConfig(
                "page size must be greater than zero".to_string(),
            ));
        }
        if self.page_row_count_limit == 0 {
            return Err(PageCodecError::InvalidConfig(
                "page row count limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            page_size_bytes: self.page_size_bytes,
            page_row_count_limit: self.page_row_count_limit,
        }
    }
}
