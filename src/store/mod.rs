//! In-memory storage module
//!
//! Provides the generic concurrent store and its configuration.
//! Expiry scheduling lives in the `expiry` module; this module only decides
//! what an expiry task removes when it fires.

mod config;
mod keystore;
mod slot;

pub use config::{ExpiryPolicy, StoreConfig};
pub use keystore::KeyStore;
