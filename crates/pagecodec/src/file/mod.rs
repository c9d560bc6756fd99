//! Columnar file collaborators.
//!
//! The rewrite pipeline only talks to files through `FileReader` and
//! `FileWriter`. `container` provides a minimal page file implementing both.

pub mod container;

use std::fmt::Debug;

use crate::errors::Result;
use crate::page::EncodedPage;
use crate::schema::Schema;

/// A row group as read from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroup {
    pub num_rows: usize,
    /// Pages for each column, in schema order.
    pub columns: Vec<Vec<EncodedPage>>,
}

pub trait FileReader: Debug {
    fn schema(&self) -> &Schema;

    /// Read the next row group, None at end of input.
    fn next_row_group(&mut self) -> Result<Option<RowGroup>>;

    /// Release the underlying file.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Writes pages, row group by row group.
///
/// Nothing written becomes visible until `close` succeeds. `abort` (or
/// dropping the writer) discards everything.
pub trait FileWriter: Debug {
    fn schema(&self) -> &Schema;

    fn start_row_group(&mut self, num_rows: usize) -> Result<()>;

    /// Write a page for a column in the current row group.
    ///
    /// Pages for a column must be written in row order.
    fn write_page(&mut self, column: usize, page: EncodedPage) -> Result<()>;

    fn end_row_group(&mut self) -> Result<()>;

    /// Finish the file and make it visible at its destination.
    fn close(self: Box<Self>) -> Result<()>;

    /// Discard all output.
    fn abort(self: Box<Self>);
}
