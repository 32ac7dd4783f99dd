//! Expiry task definition

use std::time::Duration;

/// A deferred delete, created by `put_expires`
///
/// Holds the key and the stamp of the write that scheduled it, never the
/// value itself.
#[derive(Debug, Clone)]
pub(crate) struct ExpiryTask<K> {
    /// Key to delete
    pub key: K,

    /// Delay before the delete is applied
    pub ttl: Duration,

    /// Stamp of the write the task was created for
    pub stamp: u64,
}

impl<K> ExpiryTask<K> {
    pub fn new(key: K, ttl: Duration, stamp: u64) -> Self {
        ExpiryTask { key, ttl, stamp }
    }
}
