//! Column page encoding and decoding with pluggable value encodings.
//!
//! Values of a column chunk are cut into pages by a `ColumnPageEncoder`, with
//! the value encoding chosen by an `EncoderFactory`. `ColumnPageDecoder`
//! reverses this. `PageRewritePipeline` ties the two together to rewrite a
//! whole file with a different encoding.

pub mod config;
pub mod encoding;
pub mod errors;
pub mod file;
pub mod page;
pub mod pipeline;
pub mod schema;
pub mod value;

pub use config::RewriteConfig;
pub use encoding::Encoding;
pub use errors::{ErrorKind, PageCodecError, Result};
pub use pipeline::{PageRewritePipeline, RewriteSummary, rewrite_file, write_row_group};
