use crate::Result;
use bytes::Bytes;

/// Named, durable FIFO queues
///
/// Each call is atomic on its own. Callers that need several queue
/// operations to appear as one unit must serialize access themselves.
pub trait QueueBackend: Send + Sync {
    /// Append an item to the tail of `queue`, returning the new length
    fn push_back(&self, queue: &str, item: &[u8]) -> Result<u64>;

    /// Remove and return the item at the head of `queue`
    fn pop_front(&self, queue: &str) -> Result<Option<Bytes>>;

    /// Return the item at the head of `queue` without removing it
    fn peek_front(&self, queue: &str) -> Result<Option<Bytes>>;

    /// Number of items currently in `queue`
    fn length(&self, queue: &str) -> Result<u64>;
}
