//! Configuration types for the replica driver.
//!
//! This module defines the configuration used to build a [`ReplicaNode`]
//! and the state machine it drives.
//!
//! [`ReplicaNode`]: crate::ReplicaNode

use serde::{Deserialize, Serialize};
use verkv_common::{Error, OrderingPolicy, Result};

/// Configuration for a single replica.
///
/// # Examples
///
/// ```
/// use verkv_common::OrderingPolicy;
/// use verkv_replica::ReplicaConfig;
///
/// // Use default values
/// let config = ReplicaConfig::default();
/// assert!(config.validate().is_ok());
///
/// // Or customize
/// let config = ReplicaConfig {
///     node_id: 3,
///     ordering: OrderingPolicy::Ignore,
///     max_batch: 64,
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaConfig {
    /// Unique node identifier. Must be > 0.
    /// Default: 1
    pub node_id: u64,

    /// What the state machine does with a command whose log id is lower
    /// than one already applied.
    /// Default: reject
    pub ordering: OrderingPolicy,

    /// Maximum number of commands applied per driver step. Must be > 0.
    /// Default: 1024
    pub max_batch: usize,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            node_id: 1,
            ordering: OrderingPolicy::Reject,
            max_batch: 1024,
        }
    }
}

impl ReplicaConfig {
    /// Validates the replica configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if:
    /// - `node_id` is 0
    /// - `max_batch` is 0
    pub fn validate(&self) -> Result<()> {
        if self.node_id == 0 {
            return Err(Error::ConfigError("node_id must be > 0".to_string()));
        }

        if self.max_batch == 0 {
            return Err(Error::ConfigError("max_batch must be > 0".to_string()));
        }

        Ok(())
    }
}
