use serde::{Deserialize, Serialize};

/// Consolidated Zarr V2 metadata, as written to `.zmetadata` by `zarr-python` and `xarray`.
///
/// Maps every metadata key of a hierarchy (e.g. `temperature/.zarray`) to its decoded JSON document.
/// ```json
/// {
///     "metadata": {
///         ".zgroup": {"zarr_format": 2},
///         "temperature/.zattrs": {"_ARRAY_DIMENSIONS": ["x"]}
///     },
///     "zarr_consolidated_format": 1
/// }
/// ```
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
pub struct ConsolidatedMetadataV2 {
    /// The metadata documents keyed by their store key.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// The consolidated metadata format version. Must be `1`.
    pub zarr_consolidated_format: monostate::MustBe!(1u64),
}

impl Default for ConsolidatedMetadataV2 {
    fn default() -> Self {
        Self {
            metadata: serde_json::Map::default(),
            zarr_consolidated_format: monostate::MustBe!(1u64),
        }
    }
}
