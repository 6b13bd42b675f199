//! Depcache Storage - Persistence for the dependency cache
//!
//! This crate provides the compact binary codec for cached asset nodes and
//! the stores that hold the encoded bytes.

pub mod codec;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use codec::{decode, encode, try_decode, ByteReader, ByteWriter, EOF_MARKER, FORMAT_VERSION};
pub use error::{StorageError, StorageResult};
pub use file::{cache_file_name, FileCacheStore};
pub use memory::MemoryCacheStore;
pub use traits::CacheStore;
