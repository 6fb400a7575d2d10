//! Zarr V2 data types.
//!
//! A Zarr V2 data type is a `numpy` type string such as `<f8`, `|u1`, `<U12`, or `<M8[ns]`.
//! It consists of an optional byte order character, a kind character, and an item size.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v2/v2.0.html#data-type-encoding>.

use std::str::FromStr;

use thiserror::Error;

use crate::metadata::v2::ArrayMetadataV2DataType;

use super::{Endianness, NATIVE_ENDIAN};

/// The kind of a [`DataType`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DataTypeKind {
    /// `b` Boolean.
    Bool,
    /// `i` Signed integer.
    Int,
    /// `u` Unsigned integer.
    UInt,
    /// `f` IEEE 754 floating point.
    Float,
    /// `c` Complex floating point.
    Complex,
    /// `S` Fixed length sequence of bytes.
    Bytes,
    /// `U` Fixed length sequence of UCS4 characters.
    Unicode,
    /// `V` Raw bytes.
    Raw,
    /// `M` Datetime.
    Datetime,
    /// `m` Timedelta.
    Timedelta,
}

impl DataTypeKind {
    fn from_char(kind: char) -> Option<Self> {
        Some(match kind {
            'b' => Self::Bool,
            'i' => Self::Int,
            'u' => Self::UInt,
            'f' => Self::Float,
            'c' => Self::Complex,
            'S' => Self::Bytes,
            'U' => Self::Unicode,
            'V' => Self::Raw,
            'M' => Self::Datetime,
            'm' => Self::Timedelta,
            _ => return None,
        })
    }

    const fn as_char(self) -> char {
        match self {
            Self::Bool => 'b',
            Self::Int => 'i',
            Self::UInt => 'u',
            Self::Float => 'f',
            Self::Complex => 'c',
            Self::Bytes => 'S',
            Self::Unicode => 'U',
            Self::Raw => 'V',
            Self::Datetime => 'M',
            Self::Timedelta => 'm',
        }
    }

    /// Returns true if the byte order of elements of this kind is significant for item sizes greater than one.
    const fn has_byte_order(self) -> bool {
        !matches!(self, Self::Bool | Self::Bytes | Self::Raw)
    }
}

/// A fixed size data type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct DataType {
    kind: DataTypeKind,
    size: usize,
    endianness: Option<Endianness>,
    unit: Option<String>,
}

/// A data type error.
#[derive(Debug, Error)]
pub enum DataTypeError {
    /// The data type string could not be parsed.
    #[error("data type {_0} is invalid")]
    Invalid(String),
    /// The item size is not supported by the data type kind.
    #[error("data type {_0} has an unsupported item size")]
    UnsupportedSize(String),
    /// Structured data types are not supported.
    #[error("structured data type {_0:?} is not supported")]
    Structured(ArrayMetadataV2DataType),
}

impl DataType {
    /// Create a data type from a `kind` and `size` (in bytes) with native endianness.
    ///
    /// # Errors
    /// Returns [`DataTypeError::UnsupportedSize`] if `size` is not valid for `kind`.
    pub fn new(kind: DataTypeKind, size: usize) -> Result<Self, DataTypeError> {
        let endianness = (kind.has_byte_order() && size > 1).then_some(NATIVE_ENDIAN);
        let data_type = Self {
            kind,
            size,
            endianness,
            unit: None,
        };
        data_type.validate()?;
        Ok(data_type)
    }

    /// Create a data type from Zarr V2 data type metadata.
    ///
    /// # Errors
    /// Returns [`DataTypeError`] if the data type is structured or invalid.
    pub fn from_metadata_v2(metadata: &ArrayMetadataV2DataType) -> Result<Self, DataTypeError> {
        match metadata {
            ArrayMetadataV2DataType::Simple(data_type) => data_type.parse(),
            ArrayMetadataV2DataType::Structured(_) => {
                Err(DataTypeError::Structured(metadata.clone()))
            }
        }
    }

    /// The data type kind.
    #[must_use]
    pub const fn kind(&self) -> DataTypeKind {
        self.kind
    }

    /// The size of an element in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// The endianness of an element, or [`None`] if the byte order is not significant.
    #[must_use]
    pub const fn endianness(&self) -> Option<Endianness> {
        self.endianness
    }

    fn validate(&self) -> Result<(), DataTypeError> {
        let valid = match self.kind {
            DataTypeKind::Bool => self.size == 1,
            DataTypeKind::Int | DataTypeKind::UInt => matches!(self.size, 1 | 2 | 4 | 8),
            DataTypeKind::Float => matches!(self.size, 2 | 4 | 8 | 16),
            DataTypeKind::Complex => matches!(self.size, 8 | 16 | 32),
            DataTypeKind::Datetime | DataTypeKind::Timedelta => self.size == 8,
            DataTypeKind::Unicode => self.size > 0 && self.size % 4 == 0,
            DataTypeKind::Bytes | DataTypeKind::Raw => self.size > 0,
        };
        if valid {
            Ok(())
        } else {
            Err(DataTypeError::UnsupportedSize(self.to_string()))
        }
    }
}

impl FromStr for DataType {
    type Err = DataTypeError;

    fn from_str(data_type: &str) -> Result<Self, Self::Err> {
        let invalid = || DataTypeError::Invalid(data_type.to_string());

        let mut chars = data_type.chars().peekable();
        let byte_order = match chars.peek() {
            Some('<') => Some(Some(Endianness::Little)),
            Some('>') => Some(Some(Endianness::Big)),
            Some('=') => Some(Some(NATIVE_ENDIAN)),
            Some('|') => Some(None),
            _ => None,
        };
        if byte_order.is_some() {
            chars.next();
        }
        let kind = chars
            .next()
            .and_then(DataTypeKind::from_char)
            .ok_or_else(invalid)?;
        let remainder: String = chars.collect();
        let (count, unit) = match remainder.split_once('[') {
            Some((count, unit)) => {
                let unit = unit.strip_suffix(']').ok_or_else(invalid)?;
                if !matches!(kind, DataTypeKind::Datetime | DataTypeKind::Timedelta)
                    || unit.is_empty()
                {
                    return Err(invalid());
                }
                (count, Some(unit.to_string()))
            }
            None => (remainder.as_str(), None),
        };
        let count: usize = count.parse().map_err(|_| invalid())?;
        let size = if kind == DataTypeKind::Unicode {
            count.checked_mul(4).ok_or_else(invalid)?
        } else {
            count
        };

        let endianness = if kind.has_byte_order() && size > 1 {
            byte_order.unwrap_or(Some(NATIVE_ENDIAN))
        } else {
            None
        };
        let data_type = Self {
            kind,
            size,
            endianness,
            unit,
        };
        data_type.validate()?;
        Ok(data_type)
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let byte_order = match self.endianness {
            Some(Endianness::Little) => '<',
            Some(Endianness::Big) => '>',
            None => '|',
        };
        let count = if self.kind == DataTypeKind::Unicode {
            self.size / 4
        } else {
            self.size
        };
        write!(f, "{byte_order}{}{count}", self.kind.as_char())?;
        if let Some(unit) = &self.unit {
            write!(f, "[{unit}]")?;
        }
        Ok(())
    }
}

/// A plain old data element type with a corresponding [`DataType`].
pub trait Element: bytemuck::Pod {
    /// The data type of the element.
    fn data_type() -> DataType;
}

macro_rules! impl_element {
    ($type:ty, $kind:expr) => {
        impl Element for $type {
            fn data_type() -> DataType {
                DataType {
                    kind: $kind,
                    size: std::mem::size_of::<$type>(),
                    endianness: (std::mem::size_of::<$type>() > 1).then_some(NATIVE_ENDIAN),
                    unit: None,
                }
            }
        }
    };
}

impl_element!(i8, DataTypeKind::Int);
impl_element!(i16, DataTypeKind::Int);
impl_element!(i32, DataTypeKind::Int);
impl_element!(i64, DataTypeKind::Int);
impl_element!(u8, DataTypeKind::UInt);
impl_element!(u16, DataTypeKind::UInt);
impl_element!(u32, DataTypeKind::UInt);
impl_element!(u64, DataTypeKind::UInt);
impl_element!(f32, DataTypeKind::Float);
impl_element!(f64, DataTypeKind::Float);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_parse() -> Result<(), Box<dyn std::error::Error>> {
        let data_type: DataType = "<f8".parse()?;
        assert_eq!(data_type.kind(), DataTypeKind::Float);
        assert_eq!(data_type.size(), 8);
        assert_eq!(data_type.endianness(), Some(Endianness::Little));
        assert_eq!(data_type.to_string(), "<f8");

        let data_type: DataType = ">i2".parse()?;
        assert_eq!(data_type.endianness(), Some(Endianness::Big));
        assert_eq!(data_type.size(), 2);

        let data_type: DataType = "|u1".parse()?;
        assert_eq!(data_type.endianness(), None);
        assert_eq!(data_type.to_string(), "|u1");

        let data_type: DataType = "|b1".parse()?;
        assert_eq!(data_type.kind(), DataTypeKind::Bool);

        let data_type: DataType = "<U12".parse()?;
        assert_eq!(data_type.size(), 48);
        assert_eq!(data_type.to_string(), "<U12");

        let data_type: DataType = "|S7".parse()?;
        assert_eq!(data_type.size(), 7);
        assert_eq!(data_type.to_string(), "|S7");

        let data_type: DataType = "<M8[ns]".parse()?;
        assert_eq!(data_type.kind(), DataTypeKind::Datetime);
        assert_eq!(data_type.size(), 8);
        assert_eq!(data_type.to_string(), "<M8[ns]");

        let data_type: DataType = "<c16".parse()?;
        assert_eq!(data_type.size(), 16);
        Ok(())
    }

    #[test]
    fn data_type_invalid() {
        assert!("".parse::<DataType>().is_err());
        assert!("<x4".parse::<DataType>().is_err());
        assert!("<f3".parse::<DataType>().is_err());
        assert!("<i".parse::<DataType>().is_err());
        assert!("<f8[s]".parse::<DataType>().is_err());
        assert!("|b2".parse::<DataType>().is_err());
        assert!(matches!(
            DataType::from_metadata_v2(&ArrayMetadataV2DataType::Structured(vec![])),
            Err(DataTypeError::Structured(_))
        ));
    }

    #[test]
    fn data_type_element() {
        assert_eq!(f32::data_type().size(), 4);
        assert_eq!(u8::data_type().to_string(), "|u1");
        assert_eq!(i64::data_type().endianness(), Some(NATIVE_ENDIAN));
        assert_eq!(DataType::new(DataTypeKind::Float, 8).unwrap(), f64::data_type());
    }
}
