//! Common test utilities for replica integration tests.
//!
//! This module provides helpers for building replicas over a shared log and
//! for comparing their states.

use std::collections::BTreeMap;
use verkv_kv::{Entry, StateMachine};
use verkv_replica::{MemLog, ReplicaConfig, ReplicaNode};

/// Creates a replica with the given id reading from `log`.
///
/// # Panics
///
/// Panics if node creation fails
pub fn create_replica(id: u64, log: &MemLog) -> ReplicaNode<MemLog> {
    let config = ReplicaConfig {
        node_id: id,
        ..Default::default()
    };
    ReplicaNode::new(config, log.clone()).expect("Failed to create replica")
}

/// Every stored entry, keyed and sorted by key.
pub fn dump(sm: &StateMachine) -> BTreeMap<String, Entry> {
    sm.keys()
        .into_iter()
        .map(|key| {
            let entry = sm.get(&key);
            (key, entry)
        })
        .collect()
}
