use std::fmt::Debug;

use super::delta::DeltaValuesEncoder;
use super::plain::PlainValuesEncoder;
use super::{Encoding, ValuesEncoder};
use crate::errors::Result;
use crate::schema::{ColumnDescriptor, PhysicalType};

/// Creates value encoders for every column written in a run.
///
/// Exactly one factory is chosen per run, the encoding it reports is the
/// experiment's choice. Columns the encoding can't represent get the
/// closest supported encoding instead (see `encoding_for`).
pub trait EncoderFactory: Debug + Sync + Send {
    /// The encoding this factory was configured with.
    fn encoding(&self) -> Encoding;

    /// The encoding pages of a column with the given type will actually
    /// be written with.
    fn encoding_for(&self, physical_type: PhysicalType) -> Encoding;

    fn new_values_encoder(&self, descr: &ColumnDescriptor) -> Result<Box<dyn ValuesEncoder>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainEncoderFactory;

impl EncoderFactory for PlainEncoderFactory {
    fn encoding(&self) -> Encoding {
        Encoding::Plain
    }

    fn encoding_for(&self, _physical_type: PhysicalType) -> Encoding {
        Encoding::Plain
    }

    fn new_values_encoder(&self, descr: &ColumnDescriptor) -> Result<Box<dyn ValuesEncoder>> {
        Ok(Box::new(PlainValuesEncoder::new(descr.physical_type)))
    }
}

/// Delta for integer columns, plain for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaEncoderFactory;

impl EncoderFactory for DeltaEncoderFactory {
    fn encoding(&self) -> Encoding {
        Encoding::Delta
    }

    fn encoding_for(&self, physical_type: PhysicalType) -> Encoding {
        if physical_type.is_integer() {
            Encoding::Delta
        } else {
            Encoding::Plain
        }
    }

    fn new_values_encoder(&self, descr: &ColumnDescriptor) -> Result<Box<dyn ValuesEncoder>> {
        match self.encoding_for(descr.physical_type) {
            Encoding::Delta => Ok(Box::new(DeltaValuesEncoder::try_new(descr.physical_type)?)),
            Encoding::Plain => Ok(Box::new(PlainValuesEncoder::new(descr.physical_type))),
        }
    }
}

/// Get the factory for an encoding.
pub fn new_encoder_factory(encoding: Encoding) -> Box<dyn EncoderFactory> {
    match encoding {
        Encoding::Plain => Box::new(PlainEncoderFactory),
        Encoding::Delta => Box::new(DeltaEncoderFactory),
    }
}

/// Get the factory for an encoding name.
///
/// Errors with `UnsupportedEncoding` for anything other than "plain" or
/// "delta".
pub fn encoder_factory_from_name(name: &str) -> Result<Box<dyn EncoderFactory>> {
    let encoding = name.parse::<Encoding>()?;
    Ok(new_encoder_factory(encoding))
}
