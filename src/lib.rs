//! keystore - A generic, thread-safe in-memory key-value store
//!
//! The store wraps one map behind one reader-writer lock:
//! - `get` takes the lock in shared mode, readers never block each other
//! - `put` and `delete` take it in exclusive mode
//! - `put_expires` puts, then schedules a delayed delete on a background reaper
//!
//! ```rust
//! use keystore::KeyStore;
//! use std::time::Duration;
//!
//! let people = KeyStore::<u32, String>::new();
//! people.put(0, "bob baker".to_string());
//! people.put_expires(1, "drew carey".to_string(), Duration::from_secs(30));
//!
//! assert_eq!(people.get(&0).as_deref(), Some("bob baker"));
//! assert!(people.contains_key(&1));
//! ```

pub mod bench;
mod expiry;
pub mod store;

/// Re-export commonly used types
pub use store::{ExpiryPolicy, KeyStore, StoreConfig};
