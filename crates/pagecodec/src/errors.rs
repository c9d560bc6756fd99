use std::path::PathBuf;

use crate::encoding::Encoding;
use crate::schema::PhysicalType;

#[derive(Debug, thiserror::Error)]
pub enum PageCodecError {
    #[error("unsupported encoding: '{0}', expected 'plain' or 'delta'")]
    UnsupportedEncoding(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("corrupt page: {0}")]
    CorruptPage(String),

    #[error("type mismatch: column is {expected}, got {got}")]
    TypeMismatch {
        expected: PhysicalType,
        got: PhysicalType,
    },

    #[error("encoding mismatch: decoder expects {expected}, page is {got}")]
    EncodingMismatch { expected: Encoding, got: Encoding },

    #[error("null value for required column '{column}'")]
    UnexpectedNull { column: String },

    #[error("encoded value of {size} bytes exceeds page size of {limit} bytes")]
    EncodingOverflow { size: usize, limit: usize },

    #[error("schema: {0}")]
    Schema(String),

    #[error("row group {row_group}, column '{column}': {source}")]
    InColumn {
        row_group: usize,
        column: String,
        #[source]
        source: Box<PageCodecError>,
    },

    #[error("row group {row_group}: {source}")]
    InRowGroup {
        row_group: usize,
        #[source]
        source: Box<PageCodecError>,
    },

    #[error("{path}: {source}")]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal: {0}")]
    Internal(String),
}

/// Broad classification of an error, used for choosing exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Data,
    Resource,
    Internal,
}

impl PageCodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedEncoding(_) | Self::InvalidConfig(_) => ErrorKind::Configuration,
            Self::CorruptPage(_)
            | Self::TypeMismatch { .. }
            | Self::EncodingMismatch { .. }
            | Self::UnexpectedNull { .. }
            | Self::EncodingOverflow { .. }
            | Self::Schema(_)
            | Self::Json(_) => ErrorKind::Data,
            Self::InColumn { source, .. } | Self::InRowGroup { source, .. } => source.kind(),
            Self::Resource { .. } | Self::Io(_) => ErrorKind::Resource,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Attach the row group and column an error occurred in.
    pub fn in_column(self, row_group: usize, column: impl Into<String>) -> Self {
        PageCodecError::InColumn {
            row_group,
            column: column.into(),
            source: Box::new(self),
        }
    }

    /// Attach the row group an error occurred in.
    pub fn in_row_group(self, row_group: usize) -> Self {
        PageCodecError::InRowGroup {
            row_group,
            source: Box::new(self),
        }
    }

    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PageCodecError::Resource {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = PageCodecError> = std::result::Result<T, E>;

macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::PageCodecError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;

macro_rules! corrupt {
    ($($arg:tt)*) => {
        crate::errors::PageCodecError::CorruptPage(std::format!($($arg)*))
    };
}
pub(crate) use corrupt;
