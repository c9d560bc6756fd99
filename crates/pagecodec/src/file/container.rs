//! A minimal page file.
//!
//! ```text
//! magic "PGCF" | schema_len u32 | schema (json)
//! { 0x01 num_rows u64 { 0x02 column u32 page_len u32 page }* 0x03 }*
//! 0x00
//! ```
//!
//! All integers are little endian. There's no footer, statistics or
//! compression, row groups are read back strictly in order.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use super::{FileReader, FileWriter, RowGroup};
use crate::errors::{PageCodecError, Result, corrupt};
use crate::page::EncodedPage;
use crate::page::header::PageHeader;
use crate::schema::Schema;

pub const MAGIC: &[u8; 4] = b"PGCF";

const TAG_END_OF_FILE: u8 = 0x00;
const TAG_ROW_GROUP: u8 = 0x01;
const TAG_PAGE: u8 = 0x02;
const TAG_END_ROW_GROUP: u8 = 0x03;

/// Streams row groups from a page file.
pub struct PageFileReader {
    path: PathBuf,
    reader: BufReader<File>,
    schema: Schema,
    /// Total length of the file.
    file_len: u64,
    /// Bytes read so far.
    offset: u64,
    /// Set once the end of file tag has been read.
    done: bool,
}

impl PageFileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| PageCodecError::resource(&path, e))?;
        let file_len = file
            .metadata()
            .map_err(|e| PageCodecError::resource(&path, e))?
            .len();

        let mut reader = PageFileReader {
            path,
            reader: BufReader::new(file),
            schema: Schema::try_new([])?,
            file_len,
            offset: 0,
            done: false,
        };

        let magic = reader.read_array::<4>()?;
        if &magic != MAGIC {
            return Err(corrupt!(
                "{} is not a page file, bad magic {magic:?}",
                reader.path.display()
            ));
        }

        let schema_len = u32::from_le_bytes(reader.read_array()?) as usize;
        let schema_bytes = reader.read_bytes(schema_len)?;
        let schema: Schema = serde_json::from_slice(&schema_bytes)?;
        // Re-validate, deserializing skips the constructor.
        reader.schema = Schema::try_new(schema.columns().iter().cloned())?;

        debug!(
            path = %reader.path.display(),
            columns = reader.schema.num_columns(),
            "opened page file"
        );

        Ok(reader)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0; N];
        self.reader.read_exact(&mut buf).map_err(|e| self.read_error(e))?;
        self.offset += N as u64;
        Ok(buf)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        if self.offset + len as u64 > self.file_len {
            return Err(corrupt!(
                "{} bytes requested at offset {}, file is {} bytes",
                len,
                self.offset,
                self.file_len
            ));
        }

        let mut buf = vec![0; len];
        self.reader.read_exact(&mut buf).map_err(|e| self.read_error(e))?;
        self.offset += len as u64;
        Ok(Bytes::from(buf))
    }

    fn read_error(&self, err: io::Error) -> PageCodecError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            corrupt!("{} truncated at offset {}", self.path.display(), self.offset)
        } else {
            PageCodecError::resource(&self.path, err)
        }
    }
}

impl fmt::Debug for PageFileReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFileReader")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl FileReader for PageFileReader {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_row_group(&mut self) -> Result<Option<RowGroup>> {
        if self.done {
            return Ok(None);
        }

        let [tag] = self.read_array::<1>()?;
        match tag {
            TAG_END_OF_FILE => {
                self.done = true;
                return Ok(None);
            }
            TAG_ROW_GROUP => (),
            other => return Err(corrupt!("expected row group tag, got {other:#04x}")),
        }

        let num_rows = u64::from_le_bytes(self.read_array()?);
        let num_rows = usize::try_from(num_rows)
            .map_err(|_| corrupt!("row group declares {num_rows} rows"))?;
        let mut columns = vec![Vec::new(); self.schema.num_columns()];

        loop {
            let [tag] = self.read_array::<1>()?;
            match tag {
                TAG_PAGE => {
                    let column = u32::from_le_bytes(self.read_array()?) as usize;
                    let page_len = u32::from_le_bytes(self.read_array()?) as usize;
                    let data = self.read_bytes(page_len)?;
                    let page = EncodedPage::try_from_bytes(data)?;

                    let pages = columns.get_mut(column).ok_or_else(|| {
                        PageCodecError::Schema(format!(
                            "page for column {column}, file has {} columns",
                            self.schema.num_columns()
                        ))
                    })?;
                    pages.push(page);
                }
                TAG_END_ROW_GROUP => break,
                other => return Err(corrupt!("expected page tag, got {other:#04x}")),
            }
        }

        trace!(num_rows, "read row group");

        Ok(Some(RowGroup { num_rows, columns }))
    }

    fn close(self: Box<Self>) -> Result<()> {
        debug!(path = %self.path.display(), "closed page file reader");
        Ok(())
    }
}

#[derive(Debug)]
struct RowGroupState {
    num_rows: usize,
    /// Rows written so far for each column.
    column_rows: Vec<usize>,
}

/// Writes a page file.
///
/// Output goes to a temporary file next to the destination, which replaces
/// the destination on `close`.
pub struct PageFileWriter {
    path: PathBuf,
    writer: BufWriter<NamedTempFile>,
    schema: Schema,
    current: Option<RowGroupState>,
}

impl PageFileWriter {
    pub fn create(path: impl AsRef<Path>, schema: Schema) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&dir).map_err(|e| PageCodecError::resource(&dir, e))?;

        let schema_json = serde_json::to_vec(&schema)?;
        let schema_len = u32::try_from(schema_json.len())
            .map_err(|_| PageCodecError::Schema("schema too large".to_string()))?;

        let mut header = BytesMut::with_capacity(8 + schema_json.len());
        header.put_slice(MAGIC);
        header.put_u32_le(schema_len);
        header.put_slice(&schema_json);

        let mut writer = PageFileWriter {
            path,
            writer: BufWriter::new(temp),
            schema,
            current: None,
        };
        writer.write_all(&header)?;

        Ok(writer)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.writer
            .write_all(buf)
            .map_err(|e| PageCodecError::resource(&self.path, e))
    }
}

impl fmt::Debug for PageFileWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFileWriter")
            .field("path", &self.path)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl FileWriter for PageFileWriter {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn start_row_group(&mut self, num_rows: usize) -> Result<()> {
        if self.current.is_some() {
            return Err(PageCodecError::Internal(
                "row group started before previous one ended".to_string(),
            ));
        }

        let mut buf = BytesMut::with_capacity(9);
        buf.put_u8(TAG_ROW_GROUP);
        buf.put_u64_le(num_rows as u64);
        self.write_all(&buf)?;

        self.current = Some(RowGroupState {
            num_rows,
            column_rows: vec![0; self.schema.num_columns()],
        });

        Ok(())
    }

    fn write_page(&mut self, column: usize, page: EncodedPage) -> Result<()> {
        let num_columns = self.schema.num_columns();
        let state = self
            .current
            .as_mut()
            .ok_or_else(|| {
                PageCodecError::Internal("page written outside of row group".to_string())
            })?;
        let column_rows = state.column_rows.get_mut(column).ok_or_else(|| {
            PageCodecError::Schema(format!(
                "page for column {column}, schema has {num_columns} columns"
            ))
        })?;

        if !page.data.is_empty() {
            let header = PageHeader::read_from(&page.data)?;
            header.check_len(page.data.len())?;
            if header.num_rows as usize != page.num_rows || header.encoding != page.encoding {
                return Err(corrupt!(
                    "page declares {} {} rows, header has {} {} rows",
                    page.num_rows,
                    page.encoding,
                    header.num_rows,
                    header.encoding
                ));
            }
        }
        *column_rows += page.num_rows;

        let page_len = u32::try_from(page.len()).map_err(|_| PageCodecError::EncodingOverflow {
            size: page.len(),
            limit: u32::MAX as usize,
        })?;
        let mut buf = BytesMut::with_capacity(9);
        buf.put_u8(TAG_PAGE);
        buf.put_u32_le(column as u32);
        buf.put_u32_le(page_len);
        self.write_all(&buf)?;
        self.write_all(&page.data)?;

        Ok(())
    }

    fn end_row_group(&mut self) -> Result<()> {
        let state = self
            .current
            .take()
            .ok_or_else(|| PageCodecError::Internal("no row group to end".to_string()))?;

        for (idx, &rows) in state.column_rows.iter().enumerate() {
            if rows != state.num_rows {
                let name = &self.schema.columns()[idx].name;
                return Err(corrupt!(
                    "column '{name}' has {rows} rows in pages, row group has {}",
                    state.num_rows
                ));
            }
        }

        self.write_all(&[TAG_END_ROW_GROUP])
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        if self.current.is_some() {
            return Err(PageCodecError::Internal(
                "closing writer with an unfinished row group".to_string(),
            ));
        }

        self.write_all(&[TAG_END_OF_FILE])?;

        let PageFileWriter { path, writer, .. } = *self;
        let temp = writer
            .into_inner()
            .map_err(|e| PageCodecError::resource(&path, e.into_error()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| PageCodecError::resource(&path, e))?;
        temp.persist(&path)
            .map_err(|e| PageCodecError::resource(&path, e.error))?;

        debug!(path = %path.display(), "closed page file writer");

        Ok(())
    }

    fn abort(self: Box<Self>) {
        debug!(path = %self.path.display(), "discarding page file output");
        // Dropping the temp file removes it.
    }
}
