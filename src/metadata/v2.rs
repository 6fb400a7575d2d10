//! Zarr V2 metadata documents and key names.

/// Zarr V2 group metadata.
pub mod group;

/// Zarr V2 array metadata.
pub mod array;

/// Zarr V2 consolidated metadata.
pub mod consolidated;

pub use array::{ArrayMetadataV2, ArrayMetadataV2DataType, ArrayMetadataV2Error, ArrayMetadataV2Order};
pub use consolidated::ConsolidatedMetadataV2;
pub use group::GroupMetadataV2;

mod metadata;
pub use metadata::MetadataV2;

/// The Zarr V2 array metadata key name.
pub const ARRAY_METADATA_KEY: &str = ".zarray";

/// The Zarr V2 group metadata key name.
pub const GROUP_METADATA_KEY: &str = ".zgroup";

/// The Zarr V2 attributes key name.
pub const ATTRIBUTES_KEY: &str = ".zattrs";

/// The consolidated metadata key name.
pub const CONSOLIDATED_METADATA_KEY: &str = ".zmetadata";

/// Returns true if `name` is the name of a Zarr V2 metadata key (`.zarray`, `.zgroup`, `.zattrs`, `.zmetadata`, ...).
#[must_use]
pub fn is_metadata_key_name(name: &str) -> bool {
    name.starts_with(".z")
}
