//! Adapters implementing the domain ports: clocks, in-memory stores and the
//! optional RocksDB-backed store.

pub mod clock;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
