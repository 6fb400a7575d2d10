//! The Zarr V2 chunk key encoding.
//!
//! The key of a chunk is formed by joining the ASCII decimal representation of the chunk grid indices with a [`ChunkKeySeparator`].
//! For example, chunk `[1, 23]` has the key `1.23` with the default `.` separator, or `1/23` with the `/` separator.
//! A zero-dimensional array has a single chunk with the key `0`.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v2/v2.0.html#chunks>.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use itertools::Itertools;

/// A chunk key separator.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum ChunkKeySeparator {
    /// The slash '/' character.
    #[serde(rename = "/")]
    #[display("/")]
    Slash,
    /// The dot '.' character.
    #[serde(rename = ".")]
    #[display(".")]
    Dot,
}

impl ChunkKeySeparator {
    /// Return the separator character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Slash => '/',
            Self::Dot => '.',
        }
    }
}

impl TryFrom<char> for ChunkKeySeparator {
    type Error = char;

    fn try_from(separator: char) -> Result<Self, Self::Error> {
        if separator == '/' {
            Ok(Self::Slash)
        } else if separator == '.' {
            Ok(Self::Dot)
        } else {
            Err(separator)
        }
    }
}

/// A `v2` chunk key encoding.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct V2ChunkKeyEncoding {
    separator: ChunkKeySeparator,
}

impl V2ChunkKeyEncoding {
    /// Create a new v2 chunk key encoding with separator `separator`.
    #[must_use]
    pub const fn new(separator: ChunkKeySeparator) -> Self {
        Self { separator }
    }

    /// Create a new v2 chunk key encoding with separator `.`.
    #[must_use]
    pub const fn new_dot() -> Self {
        Self::new(ChunkKeySeparator::Dot)
    }

    /// Return the separator.
    #[must_use]
    pub const fn separator(&self) -> ChunkKeySeparator {
        self.separator
    }

    /// Encode chunk grid indices into a chunk key name (relative to the array).
    #[must_use]
    pub fn encode(&self, chunk_grid_indices: &[u64]) -> String {
        if chunk_grid_indices.is_empty() {
            "0".to_string()
        } else {
            chunk_grid_indices
                .iter()
                .join(&self.separator.as_char().to_string())
        }
    }

    /// Decode a chunk key name (relative to the array) into chunk grid indices of dimensionality `dimensionality`.
    ///
    /// Returns [`None`] if `chunk_key` is not a chunk key of an array with `dimensionality` dimensions.
    #[must_use]
    pub fn decode(&self, chunk_key: &str, dimensionality: usize) -> Option<Vec<u64>> {
        if dimensionality == 0 {
            return (chunk_key == "0").then(Vec::new);
        }
        let indices = chunk_key
            .split(self.separator.as_char())
            .map(|index| {
                if !index.is_empty() && index.bytes().all(|byte| byte.is_ascii_digit()) {
                    index.parse::<u64>().ok()
                } else {
                    None
                }
            })
            .collect::<Option<Vec<u64>>>()?;
        (indices.len() == dimensionality).then_some(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_key_encoding_v2() {
        let dot = V2ChunkKeyEncoding::new_dot();
        assert_eq!(dot.encode(&[1, 23, 45]), "1.23.45");
        assert_eq!(dot.encode(&[]), "0");
        assert_eq!(dot.decode("1.23.45", 3), Some(vec![1, 23, 45]));
        assert_eq!(dot.decode("1.23", 3), None);
        assert_eq!(dot.decode("1.a.45", 3), None);
        assert_eq!(dot.decode(".zarray", 1), None);
        assert_eq!(dot.decode("0", 0), Some(vec![]));

        let slash = V2ChunkKeyEncoding::new(ChunkKeySeparator::Slash);
        assert_eq!(slash.encode(&[1, 23, 45]), "1/23/45");
        assert_eq!(slash.decode("1/23/45", 3), Some(vec![1, 23, 45]));
        assert_eq!(slash.separator().to_string(), "/");
    }

    #[test]
    fn chunk_key_separator_serde() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(
            serde_json::from_str::<ChunkKeySeparator>(r#"".""#)?,
            ChunkKeySeparator::Dot
        );
        assert_eq!(serde_json::to_string(&ChunkKeySeparator::Slash)?, r#""/""#);
        assert_eq!(ChunkKeySeparator::try_from('x'), Err('x'));
        Ok(())
    }
}
