//! Zarr V2 metadata.
//!
//! Kerchunk reference stores and zip archives written by this crate both follow the Zarr V2 storage specification.
//! Array metadata is stored under `.zarray` keys, group metadata under `.zgroup`, user attributes under `.zattrs`, and consolidated metadata under `.zmetadata`.
//!
//! See <https://zarr-specs.readthedocs.io/en/latest/v2/v2.0.html>.

pub mod v2;

/// Additional fields in array or group metadata.
///
/// These are not part of Zarr V2, but are retained for compatibility/flexibility.
pub type AdditionalFields = serde_json::Map<String, serde_json::Value>;
