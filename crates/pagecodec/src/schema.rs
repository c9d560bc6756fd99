use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{PageCodecError, Result};

/// Primitive storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    ByteArray,
}

impl PhysicalType {
    /// Width in bytes of a plain encoded value, None for variable length
    /// and bit packed types.
    pub const fn fixed_width(&self) -> Option<usize> {
        match self {
            PhysicalType::Int32 | PhysicalType::Float => Some(4),
            PhysicalType::Int64 | PhysicalType::Double => Some(8),
            PhysicalType::Boolean | PhysicalType::ByteArray => None,
        }
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, PhysicalType::Int32 | PhysicalType::Int64)
    }

    pub(crate) const fn tag(&self) -> u8 {
        match self {
            PhysicalType::Boolean => 0,
            PhysicalType::Int32 => 1,
            PhysicalType::Int64 => 2,
            PhysicalType::Float => 4,
            PhysicalType::Double => 5,
            PhysicalType::ByteArray => 6,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => PhysicalType::Boolean,
            1 => PhysicalType::Int32,
            2 => PhysicalType::Int64,
            4 => PhysicalType::Float,
            5 => PhysicalType::Double,
            6 => PhysicalType::ByteArray,
            _ => return None,
        })
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => write!(f, "boolean"),
            Self::Int32 => write!(f, "int32"),
            Self::Int64 => write!(f, "int64"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::ByteArray => write!(f, "byte_array"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repetition {
    Required,
    Optional,
    /// Treated as flat nullable slots, nesting is not modeled.
    Repeated,
}

impl Repetition {
    /// If slots for this column may be null.
    pub const fn is_nullable(&self) -> bool {
        !matches!(self, Repetition::Required)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub physical_type: PhysicalType,
    pub repetition: Repetition,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl Into<String>,
        physical_type: PhysicalType,
        repetition: Repetition,
    ) -> Self {
        ColumnDescriptor {
            name: name.into(),
            physical_type,
            repetition,
        }
    }

    pub fn required(name: impl Into<String>, physical_type: PhysicalType) -> Self {
        Self::new(name, physical_type, Repetition::Required)
    }

    pub fn optional(name: impl Into<String>, physical_type: PhysicalType) -> Self {
        Self::new(name, physical_type, Repetition::Optional)
    }
}

/// Ordered column definitions. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    /// Create a new schema, column names must be unique.
    pub fn try_new(columns: impl IntoIterator<Item = ColumnDescriptor>) -> Result<Self> {
        let columns: Vec<_> = columns.into_iter().collect();
        for (idx, col) in columns.iter().enumerate() {
            if columns[..idx].iter().any(|other| other.name == col.name) {
                return Err(PageCodecError::Schema(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
        }

        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Result<&ColumnDescriptor> {
        self.columns.get(idx).ok_or_else(|| {
            PageCodecError::Schema(format!(
                "column index {idx} out of range for schema with {} columns",
                self.columns.len()
            ))
        })
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}
