//! Plugin utilities.
//!
//! A [`Plugin`] creates objects from [`MetadataV2`] (consisting of an `id` and configuration fields).
//! It is used to implement [codecs](`crate::array::codec`), which are identified in Zarr V2 array metadata by their `id`.
//!
//! Plugins are registered at compile time using the [inventory] crate.
//! At runtime, an id matching function is applied to identify which registered plugin is associated with the metadata.
//! If a match is found, the plugin is created from the metadata.

use thiserror::Error;

use crate::metadata::v2::MetadataV2;

/// A plugin.
pub struct Plugin<TPlugin> {
    /// the identifier of the plugin.
    identifier: &'static str,
    /// Tests if the id is a match for this plugin.
    match_id_fn: fn(id: &str) -> bool,
    /// Create an implementation of this plugin from metadata.
    create_fn: fn(metadata: &MetadataV2) -> Result<TPlugin, PluginCreateError>,
}

/// An invalid plugin metadata error.
#[derive(Debug, Error)]
#[error("{plugin_type} {identifier} is unsupported with metadata: {metadata}")]
pub struct PluginMetadataInvalidError {
    identifier: &'static str,
    plugin_type: &'static str,
    metadata: String,
}

impl PluginMetadataInvalidError {
    /// Create a new [`PluginMetadataInvalidError`].
    #[must_use]
    pub fn new(identifier: &'static str, plugin_type: &'static str, metadata: &MetadataV2) -> Self {
        Self {
            identifier,
            plugin_type,
            metadata: metadata.to_string(),
        }
    }
}

/// A plugin creation error.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum PluginCreateError {
    /// An unsupported plugin.
    #[error("{plugin_type} {id} is not supported")]
    Unsupported { id: String, plugin_type: String },
    /// Invalid metadata.
    #[error(transparent)]
    MetadataInvalid(#[from] PluginMetadataInvalidError),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for PluginCreateError {
    fn from(err_string: &str) -> Self {
        Self::Other(err_string.to_string())
    }
}

impl From<String> for PluginCreateError {
    fn from(err_string: String) -> Self {
        Self::Other(err_string)
    }
}

impl<TPlugin> Plugin<TPlugin> {
    /// Create a new plugin for registration.
    pub const fn new(
        identifier: &'static str,
        match_id_fn: fn(id: &str) -> bool,
        create_fn: fn(metadata: &MetadataV2) -> Result<TPlugin, PluginCreateError>,
    ) -> Self {
        Self {
            identifier,
            match_id_fn,
            create_fn,
        }
    }

    /// Create a `TPlugin` plugin from `metadata`.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginCreateError`] if the configuration in `metadata` is invalid.
    pub fn create(&self, metadata: &MetadataV2) -> Result<TPlugin, PluginCreateError> {
        (self.create_fn)(metadata)
    }

    /// Returns true if this plugin is associated with `id`.
    #[must_use]
    pub fn match_id(&self, id: &str) -> bool {
        (self.match_id_fn)(id)
    }

    /// Returns the identifier of the plugin.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        self.identifier
    }
}
