//! Zarr stores.

mod memory;
mod zip;

pub use self::memory::MemoryStore;
pub use self::zip::{ZipStore, ZipStoreCreateError};
