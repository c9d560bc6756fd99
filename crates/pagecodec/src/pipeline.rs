//! Rewrites every page of a file with a different value encoding.
//!
//! Row groups are processed strictly in file order, columns in schema order.
//! All pages of a row group are buffered and only handed to the writer once
//! every column of the row group encoded successfully, so a failure never
//! leaves a partially written row group behind.

use std::fmt;
use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::config::RewriteConfig;
use crate::encoding::Encoding;
use crate::encoding::factory::{EncoderFactory, new_encoder_factory};
use crate::errors::{PageCodecError, Result, corrupt, internal};
use crate::file::container::{PageFileReader, PageFileWriter};
use crate::file::{FileReader, FileWriter, RowGroup};
use crate::page::{EncodedPage, PageLimits};
use crate::page::decoder::ColumnPageDecoder;
use crate::page::encoder::ColumnPageEncoder;
use crate::schema::{ColumnDescriptor, PhysicalType, Schema};
use crate::value::ColumnChunk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    ReadingRowGroup,
    DecodingColumn,
    EncodingColumn,
    FlushingPage,
    Done,
    Error,
}

/// Page statistics for one output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    pub name: String,
    pub physical_type: PhysicalType,
    pub encoding: Encoding,
    pub pages: usize,
    pub rows: usize,
    pub bytes: usize,
    pub oversized_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteSummary {
    /// Encoding the run was configured with.
    pub encoding: Encoding,
    pub row_groups: usize,
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

impl RewriteSummary {
    fn new(encoding: Encoding, schema: &Schema, factory: &dyn EncoderFactory) -> Self {
        let columns = schema
            .columns()
            .iter()
            .map(|col| ColumnSummary {
                name: col.name.clone(),
                physical_type: col.physical_type,
                encoding: factory.encoding_for(col.physical_type),
                pages: 0,
                rows: 0,
                bytes: 0,
                oversized_pages: 0,
            })
            .collect();

        RewriteSummary {
            encoding,
            row_groups: 0,
            rows: 0,
            columns,
        }
    }

    /// Total bytes of all pages written.
    pub fn total_bytes(&self) -> usize {
        self.columns.iter().map(|c| c.bytes).sum()
    }
}

impl fmt::Display for RewriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Encoding: {}, row groups: {}, rows: {}, page bytes: {}",
            self.encoding,
            self.row_groups,
            self.rows,
            self.total_bytes()
        )?;
        writeln!(
            f,
            "{:<24} {:<12} {:<8} {:>8} {:>12} {:>12}",
            "column", "type", "encoding", "pages", "rows", "bytes"
        )?;
        for col in &self.columns {
            writeln!(
                f,
                "{:<24} {:<12} {:<8} {:>8} {:>12} {:>12}",
                col.name,
                col.physical_type.to_string(),
                col.encoding.to_string(),
                col.pages,
                col.rows,
                col.bytes
            )?;
        }
        Ok(())
    }
}

/// Reads pages through a `FileReader`, decodes them, re-encodes the values
/// with the configured encoding and writes the new pages through a
/// `FileWriter`.
#[derive(Debug)]
pub struct PageRewritePipeline {
    config: RewriteConfig,
    factory: Box<dyn EncoderFactory>,
    state: PipelineState,
}

impl PageRewritePipeline {
    pub fn try_new(config: RewriteConfig) -> Result<Self> {
        config.validate()?;
        Ok(PageRewritePipeline {
            config,
            factory: new_encoder_factory(config.encoding),
            state: PipelineState::Idle,
        })
    }

    pub fn factory(&self) -> &dyn EncoderFactory {
        self.factory.as_ref()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        trace!(from = ?self.state, to = ?next, "pipeline transition");
        self.state = next;
    }

    /// Run the pipeline to completion.
    ///
    /// Both the reader and writer are released on every path. On error the
    /// writer is aborted and the first error encountered is returned.
    pub fn run(
        &mut self,
        mut reader: Box<dyn FileReader>,
        mut writer: Box<dyn FileWriter>,
    ) -> Result<RewriteSummary> {
        if self.state != PipelineState::Idle {
            reader.close()?;
            writer.abort();
            return Err(internal!("pipeline can only run once, state is {:?}", self.state));
        }

        let result = self.rewrite_all(reader.as_mut(), writer.as_mut());

        match result {
            Ok(summary) => {
                info!("close the reader and writer");
                if let Err(e) = reader.close() {
                    self.transition(PipelineState::Error);
                    writer.abort();
                    return Err(e);
                }
                if let Err(e) = writer.close() {
                    self.transition(PipelineState::Error);
                    return Err(e);
                }
                self.transition(PipelineState::Done);
                Ok(summary)
            }
            Err(e) => {
                self.transition(PipelineState::Error);
                info!("close the reader and abort the writer");
                if let Err(close_err) = reader.close() {
                    warn!(%close_err, "failed to close reader after error");
                }
                writer.abort();
                Err(e)
            }
        }
    }

    fn rewrite_all(
        &mut self,
        reader: &mut dyn FileReader,
        writer: &mut dyn FileWriter,
    ) -> Result<RewriteSummary> {
        let schema = reader.schema().clone();
        if writer.schema() != &schema {
            return Err(PageCodecError::Schema(
                "writer schema differs from reader schema".to_string(),
            ));
        }

        let mut summary = RewriteSummary::new(self.config.encoding, &schema, self.factory.as_ref());

        loop {
            self.transition(PipelineState::ReadingRowGroup);
            let rg_idx = summary.row_groups;
            let row_group = match reader.next_row_group().map_err(|e| e.in_row_group(rg_idx))? {
                Some(row_group) => row_group,
                None => break,
            };

            info!(row_group = rg_idx, "Number of rows: {}", row_group.num_rows);

            let num_rows = row_group.num_rows;
            let pages = self.rewrite_row_group(rg_idx, &schema, row_group, &mut summary)?;

            writer.start_row_group(num_rows)?;
            for (col_idx, column_pages) in pages.into_iter().enumerate() {
                for page in column_pages {
                    self.transition(PipelineState::FlushingPage);
                    writer.write_page(col_idx, page)?;
                }
            }
            writer.end_row_group()?;

            summary.row_groups += 1;
            summary.rows += num_rows;
        }

        Ok(summary)
    }

    /// Decode and re-encode every column of a row group, returning the new
    /// pages for each column.
    fn rewrite_row_group(
        &mut self,
        rg_idx: usize,
        schema: &Schema,
        row_group: RowGroup,
        summary: &mut RewriteSummary,
    ) -> Result<Vec<Vec<EncodedPage>>> {
        if row_group.columns.len() != schema.num_columns() {
            return Err(PageCodecError::Schema(format!(
                "row group {rg_idx} has {} columns, schema has {}",
                row_group.columns.len(),
                schema.num_columns()
            )));
        }

        let mut out = Vec::with_capacity(schema.num_columns());
        let columns = schema.columns().iter().zip(row_group.columns);

        for ((descr, pages), col_summary) in columns.zip(summary.columns.iter_mut()) {
            self.transition(PipelineState::DecodingColumn);
            let chunk = decode_column(descr, &pages, row_group.num_rows)
                .map_err(|e| e.in_column(rg_idx, &descr.name))?;

            self.transition(PipelineState::EncodingColumn);
            let mut encoder = ColumnPageEncoder::try_new(
                descr.clone(),
                self.factory.as_ref(),
                self.config.page_limits(),
            )
            .map_err(|e| e.in_column(rg_idx, &descr.name))?;
            encoder
                .put_chunk(&chunk)
                .map_err(|e| e.in_column(rg_idx, &descr.name))?;
            let (pages, stats) = encoder
                .finish()
                .map_err(|e| e.in_column(rg_idx, &descr.name))?;

            debug!(
                row_group = rg_idx,
                column = %descr.name,
                pages = stats.pages,
                bytes = stats.bytes,
                "encoded column chunk"
            );

            col_summary.pages += stats.pages;
            col_summary.rows += stats.rows;
            col_summary.bytes += stats.bytes;
            col_summary.oversized_pages += stats.oversized_pages;

            out.push(pages);
        }

        Ok(out)
    }
}

/// Decode all pages of a column chunk.
pub fn decode_column(
    descr: &ColumnDescriptor,
    pages: &[EncodedPage],
    num_rows: usize,
) -> Result<ColumnChunk> {
    let mut chunk = ColumnChunk::new(descr.physical_type);

    for page in pages {
        ColumnPageDecoder::for_page(page, descr)?.read_into(&mut chunk.slots)?;
    }

    if chunk.num_rows() != num_rows {
        return Err(corrupt!(
            "pages hold {} rows, row group has {num_rows}",
            chunk.num_rows()
        ));
    }

    Ok(chunk)
}

/// Encode column chunks and write them to `writer` as a single row group.
///
/// Chunks are given in schema order and must all hold the same number of
/// rows.
pub fn write_row_group(
    writer: &mut dyn FileWriter,
    factory: &dyn EncoderFactory,
    limits: PageLimits,
    chunks: &[ColumnChunk],
) -> Result<()> {
    let schema = writer.schema().clone();
    if chunks.len() != schema.num_columns() {
        return Err(PageCodecError::Schema(format!(
            "got {} column chunks, schema has {} columns",
            chunks.len(),
            schema.num_columns()
        )));
    }

    let num_rows = chunks.first().map(|c| c.num_rows()).unwrap_or(0);
    let mut pages = Vec::with_capacity(chunks.len());
    for (descr, chunk) in schema.columns().iter().zip(chunks) {
        if chunk.num_rows() != num_rows {
            return Err(PageCodecError::Schema(format!(
                "column '{}' has {} rows, expected {num_rows}",
                descr.name,
                chunk.num_rows()
            )));
        }
        let mut encoder = ColumnPageEncoder::try_new(descr.clone(), factory, limits)?;
        encoder.put_chunk(chunk)?;
        pages.push(encoder.finish()?.0);
    }

    writer.start_row_group(num_rows)?;
    for (col_idx, column_pages) in pages.into_iter().enumerate() {
        for page in column_pages {
            writer.write_page(col_idx, page)?;
        }
    }
    writer.end_row_group()
}

/// Rewrite the page file at `input` to `output`.
///
/// `output` is replaced only if the whole rewrite succeeds.
pub fn rewrite_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: RewriteConfig,
) -> Result<RewriteSummary> {
    let mut pipeline = PageRewritePipeline::try_new(config)?;

    let reader = PageFileReader::open(input)?;
    let writer = match PageFileWriter::create(output, reader.schema().clone()) {
        Ok(writer) => writer,
        Err(e) => {
            Box::new(reader).close()?;
            return Err(e);
        }
    };

    pipeline.run(Box::new(reader), Box::new(writer))
}
