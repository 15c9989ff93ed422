use crate::Result;
use bytes::Bytes;

/// Byte-level access to the record table
///
/// Record keys come from [`crate::KeyEncoder`]; values are JSON documents.
pub trait KVStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// All `(key, value)` pairs whose key starts with `prefix`
    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Bytes, Bytes)>>;

    /// Start a batch of writes that lands all at once on commit
    fn transaction(&self) -> Result<Box<dyn Transaction>>;
}

/// A pending batch of record writes
///
/// Dropping a batch without calling `commit` discards every write in it.
pub trait Transaction: Send {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    fn commit(self: Box<Self>) -> Result<()>;
}
