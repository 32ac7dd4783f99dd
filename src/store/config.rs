//! Store configuration

use serde::Deserialize;

/// How an expiry task scheduled by `put_expires` decides what to delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
    /// Delete the key unconditionally when the task fires.
    ///
    /// The task is bound to the key, not to the value: a key overwritten
    /// with a plain `put` before the deadline is still removed when the
    /// original deadline elapses.
    #[default]
    KeyBound,

    /// Delete the key only if it still holds the value written by the
    /// `put_expires` call that scheduled the task. Overwritten keys keep
    /// their newer value.
    WriteBound,
}

/// Configuration for a [`KeyStore`](crate::KeyStore)
///
/// ```rust
/// use keystore::{ExpiryPolicy, StoreConfig};
///
/// let config = StoreConfig::default()
///     .with_initial_capacity(64)
///     .with_expiry_policy(ExpiryPolicy::WriteBound);
/// assert_eq!(config.initial_capacity, 64);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of entries the map is pre-sized for
    pub initial_capacity: usize,

    /// Expiry semantics for `put_expires`
    pub expiry_policy: ExpiryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            initial_capacity: 1024,
            expiry_policy: ExpiryPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial capacity of the map
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set the expiry policy
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.expiry_policy, ExpiryPolicy::KeyBound);
    }

    #[test]
    fn test_builder_chaining() {
        let config = StoreConfig::new()
            .with_initial_capacity(16)
            .with_expiry_policy(ExpiryPolicy::WriteBound);
        assert_eq!(config.initial_capacity, 16);
        assert_eq!(config.expiry_policy, ExpiryPolicy::WriteBound);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"expiry_policy": "write_bound"}"#).unwrap();
        assert_eq!(config.initial_capacity, 1024);
        assert_eq!(config.expiry_policy, ExpiryPolicy::WriteBound);

        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.expiry_policy, ExpiryPolicy::KeyBound);
    }
}
