//! Berth Storage - Record and queue storage on redb
//!
//! This crate provides:
//! - KVStore trait for storage abstraction
//! - RecordStore contract for cluster and deployment records
//! - QueueBackend contract for named ordered queues
//! - redb-based implementation of all three
//! - Key encoding

pub mod encoding;
pub mod error;
pub mod kv;
pub mod queue;
pub mod records;
pub mod redb_backend;

// Re-export commonly used types
pub use encoding::KeyEncoder;
pub use error::{Result, StorageError};
pub use kv::{KVStore, Transaction};
pub use queue::QueueBackend;
pub use records::RecordStore;
pub use redb_backend::RedbBackend;
