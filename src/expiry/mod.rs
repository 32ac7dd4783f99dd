//! Expiry module
//!
//! Runs the delayed deletes scheduled by `put_expires`. Each store owns at
//! most one reaper thread, started the first time an expiring entry is put.
//! The reaper only knows keys; what "deleting" means is decided by the
//! store through [`ExpiryTarget`].

mod reaper;
mod task;

pub(crate) use reaper::Reaper;
pub(crate) use task::ExpiryTask;

/// Something expiry tasks can be applied to
pub(crate) trait ExpiryTarget<K>: Send + Sync {
    /// Apply an expiry task that fired for `key`.
    ///
    /// `stamp` identifies the write the task was scheduled with.
    /// Returns true if an entry was removed.
    fn expire(&self, key: &K, stamp: u64) -> bool;
}
