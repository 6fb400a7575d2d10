//! Global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the `zarrs_kerchunk` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// # Miscellaneous Configuration Options
///
/// ## Validate Checksums
///  > default: [`true`]
///
/// If enabled, checksum codecs (e.g. `crc32c`) will validate that decoded data matches stored checksums, otherwise validation is skipped.
///
/// ## Discard Partial Archives
///  > default: [`true`]
///
/// If enabled, an archive that was created by a failed or cancelled [`archive`](crate::archive::archive) call is removed from its destination.
/// Otherwise the partially written archive is left in place and must not be treated as valid.
///
/// ## Concurrency Configuration Options
/// ## Default Codec Concurrent Limit
/// > default: [`std::thread::available_parallelism`]`()`
///
/// The concurrent limit for encoding dataset variables into a staging store.
/// The concurrent limit is disabled if set to zero.
#[derive(Debug)]
pub struct Config {
    validate_checksums: bool,
    discard_partial_archives: bool,
    codec_concurrent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            validate_checksums: true,
            discard_partial_archives: true,
            codec_concurrent_limit: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

impl Config {
    /// Get the [validate checksums](#validate-checksums) configuration.
    #[must_use]
    pub fn validate_checksums(&self) -> bool {
        self.validate_checksums
    }

    /// Set the [validate checksums](#validate-checksums) configuration.
    pub fn set_validate_checksums(&mut self, validate_checksums: bool) {
        self.validate_checksums = validate_checksums;
    }

    /// Get the [discard partial archives](#discard-partial-archives) configuration.
    #[must_use]
    pub fn discard_partial_archives(&self) -> bool {
        self.discard_partial_archives
    }

    /// Set the [discard partial archives](#discard-partial-archives) configuration.
    pub fn set_discard_partial_archives(&mut self, discard_partial_archives: bool) {
        self.discard_partial_archives = discard_partial_archives;
    }

    /// Get the [default codec concurrent limit](#default-codec-concurrent-limit) configuration.
    #[must_use]
    pub fn codec_concurrent_limit(&self) -> usize {
        self.codec_concurrent_limit
    }

    /// Set the [default codec concurrent limit](#default-codec-concurrent-limit) configuration.
    pub fn set_codec_concurrent_limit(&mut self, concurrent_limit: usize) {
        self.codec_concurrent_limit = concurrent_limit;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
