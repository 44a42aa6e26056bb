//! Replica node driving the state machine from a command log.
//!
//! The ReplicaNode is the single writer of its [`StateMachine`]: it pulls
//! committed commands from a [`CommandLog`] in log order and applies them.
//! Readers get a shared handle to the state machine and may query it from
//! any thread while the node keeps applying.

use crate::config::ReplicaConfig;
use crate::command_log::CommandLog;
use std::sync::Arc;
use verkv_common::{LogId, Result};
use verkv_kv::{make_command, Command, Entry, StateMachine};
use verkv_storage::{Codec, JsonCodec, MemStore, StringStore};

/// Replica that applies a command log to its own state machine.
pub struct ReplicaNode<L, S = MemStore, C = JsonCodec> {
    /// Validated configuration
    config: ReplicaConfig,
    /// Source of committed commands
    log: L,
    /// State machine for applying committed commands
    state_machine: Arc<StateMachine<S, C>>,
}

impl<L: CommandLog> ReplicaNode<L> {
    /// Creates a replica with an empty in-memory state machine.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if `config` is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use verkv_replica::{MemLog, ReplicaConfig, ReplicaNode};
    ///
    /// let node = ReplicaNode::new(ReplicaConfig::default(), MemLog::new()).unwrap();
    /// assert_eq!(node.id(), 1);
    /// assert_eq!(node.last_applied(), None);
    /// ```
    pub fn new(config: ReplicaConfig, log: L) -> Result<Self> {
        let state_machine = StateMachine::with_policy(config.ordering);
        Self::with_state_machine(config, log, state_machine)
    }
}

impl<L, S, C> ReplicaNode<L, S, C>
where
    L: CommandLog,
    S: StringStore,
    C: Codec,
{
    /// Creates a replica around an existing, exclusively owned state machine.
    ///
    /// The state machine keeps its own ordering policy.
    pub fn with_state_machine(
        config: ReplicaConfig,
        log: L,
        state_machine: StateMachine<S, C>,
    ) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "Starting replica {} (ordering: {:?}, max_batch: {})",
            config.node_id,
            state_machine.policy(),
            config.max_batch
        );
        Ok(Self {
            config,
            log,
            state_machine: Arc::new(state_machine),
        })
    }

    /// Node identifier.
    pub fn id(&self) -> u64 {
        self.config.node_id
    }

    /// The configuration this replica was built with.
    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    /// The command log this replica reads from.
    pub fn log(&self) -> &L {
        &self.log
    }

    /// Shared handle for concurrent readers.
    pub fn state_machine(&self) -> Arc<StateMachine<S, C>> {
        Arc::clone(&self.state_machine)
    }

    /// Highest log id applied so far.
    pub fn last_applied(&self) -> Option<LogId> {
        self.state_machine.last_applied()
    }

    /// Wraps `entries` in a fresh command and submits it to the log.
    ///
    /// The command takes effect once a later [`step`](Self::step) applies it.
    pub fn propose(&self, entries: Vec<Entry>) -> Result<(LogId, Command)> {
        let command = make_command(entries);
        let log_id = self.log.append(command.clone())?;
        log::debug!(
            "Replica {} proposed command {} at log id {}",
            self.id(),
            command.id(),
            log_id
        );
        Ok((log_id, command))
    }

    /// Applies one `(log_id, command)` pair pushed by the consensus layer.
    ///
    /// # Errors
    ///
    /// Returns `Error::OutOfOrder` if `log_id` went backwards and the state
    /// machine rejects out-of-order commands.
    pub fn deliver(&self, log_id: LogId, command: &Command) -> Result<()> {
        self.state_machine.apply(log_id, command)
    }

    /// Applies up to `max_batch` committed commands following the last
    /// applied log id and returns how many were applied.
    pub fn step(&self) -> Result<usize> {
        let after = self.state_machine.last_applied();
        let batch = self.log.read_after(after, self.config.max_batch)?;

        for (log_id, command) in &batch {
            self.state_machine.apply(*log_id, command)?;
        }

        if !batch.is_empty() {
            log::debug!(
                "Replica {} applied {} commands, last applied {:?}",
                self.id(),
                batch.len(),
                self.state_machine.last_applied()
            );
        }
        Ok(batch.len())
    }

    /// Steps until the log has nothing left to apply and returns how many
    /// commands were applied in total.
    pub fn catch_up(&self) -> Result<usize> {
        let mut total = 0;
        loop {
            let applied = self.step()?;
            if applied == 0 {
                return Ok(total);
            }
            total += applied;
        }
    }

    /// Serializes the state machine, see [`StateMachine::snapshot`].
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        self.state_machine.snapshot()
    }

    /// Replaces the state machine's state with `snapshot`.
    ///
    /// Subsequent steps resume from the snapshot's last applied log id.
    pub fn install_snapshot(&self, snapshot: &[u8]) -> Result<()> {
        self.state_machine.restore(snapshot)?;
        log::debug!(
            "Replica {} installed snapshot at last applied {:?}",
            self.id(),
            self.state_machine.last_applied()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_log::MemLog;
    use verkv_common::{Error, OrderingPolicy};

    fn node() -> ReplicaNode<MemLog> {
        ReplicaNode::new(ReplicaConfig::default(), MemLog::new()).expect("Failed to create node")
    }

    #[test]
    fn test_new_creates_node_successfully() {
        let node = node();
        assert_eq!(node.id(), 1);
        assert_eq!(node.last_applied(), None);
        assert!(node.state_machine().is_empty());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ReplicaConfig {
            node_id: 0,
            ..Default::default()
        };
        let result = ReplicaNode::new(config, MemLog::new());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_new_uses_configured_policy() {
        let config = ReplicaConfig {
            ordering: OrderingPolicy::Ignore,
            ..Default::default()
        };
        let node = ReplicaNode::new(config, MemLog::new()).unwrap();
        assert_eq!(node.state_machine().policy(), OrderingPolicy::Ignore);
    }

    #[test]
    fn test_propose_does_not_apply_until_step() {
        let node = node();
        let (log_id, _) = node.propose(vec![Entry::new("a", "x", 1)]).unwrap();
        assert_eq!(log_id, 1);
        assert_eq!(node.state_machine().get("a"), Entry::absent("a"));

        assert_eq!(node.step().unwrap(), 1);
        assert_eq!(node.state_machine().get("a"), Entry::new("a", "x", 1));
        assert_eq!(node.last_applied(), Some(1));
    }

    #[test]
    fn test_step_with_empty_log() {
        let node = node();
        assert_eq!(node.step().unwrap(), 0);
        assert_eq!(node.catch_up().unwrap(), 0);
    }

    #[test]
    fn test_step_respects_max_batch() {
        let config = ReplicaConfig {
            max_batch: 2,
            ..Default::default()
        };
        let node = ReplicaNode::new(config, MemLog::new()).unwrap();
        for version in 1..=5 {
            node.propose(vec![Entry::new("a", "x", version)]).unwrap();
        }

        assert_eq!(node.step().unwrap(), 2);
        assert_eq!(node.last_applied(), Some(2));
        assert_eq!(node.catch_up().unwrap(), 3);
        assert_eq!(node.state_machine().get("a").version, 5);
    }

    #[test]
    fn test_deliver_duplicate_is_noop() {
        let node = node();
        let (log_id, command) = node.propose(vec![Entry::new("a", "x", 1)]).unwrap();
        node.catch_up().unwrap();

        node.deliver(log_id, &command).unwrap();
        assert_eq!(node.state_machine().get("a"), Entry::new("a", "x", 1));
        assert_eq!(node.last_applied(), Some(log_id));
    }

    #[test]
    fn test_deliver_out_of_order_is_rejected() {
        let node = node();
        node.deliver(5, &make_command(vec![Entry::new("a", "x", 1)]))
            .unwrap();

        let result = node.deliver(4, &make_command(vec![Entry::new("b", "y", 1)]));
        assert!(matches!(result, Err(Error::OutOfOrder { .. })));
        assert_eq!(node.state_machine().get("b"), Entry::absent("b"));
    }

    /// Log that numbers its commands from 0.
    #[derive(Default)]
    struct ZeroBasedLog {
        commands: std::sync::Mutex<Vec<Command>>,
    }

    impl CommandLog for ZeroBasedLog {
        fn append(&self, command: Command) -> Result<LogId> {
            let mut commands = self.commands.lock().unwrap();
            commands.push(command);
            Ok(commands.len() as LogId - 1)
        }

        fn read_after(&self, after: Option<LogId>, limit: usize) -> Result<Vec<(LogId, Command)>> {
            let start = after.map_or(0, |id| id as usize + 1);
            let commands = self.commands.lock().unwrap();
            Ok(commands
                .iter()
                .enumerate()
                .skip(start)
                .take(limit)
                .map(|(id, command)| (id as LogId, command.clone()))
                .collect())
        }

        fn last_log_id(&self) -> Result<Option<LogId>> {
            let len = self.commands.lock().unwrap().len();
            Ok(len.checked_sub(1).map(|id| id as LogId))
        }
    }

    #[test]
    fn test_deliver_log_id_zero_is_recorded() {
        let node = node();
        node.deliver(0, &make_command(vec![Entry::new("a", "x", 1)]))
            .unwrap();

        assert_eq!(node.last_applied(), Some(0));
        assert_eq!(node.state_machine().get("a"), Entry::new("a", "x", 1));
    }

    #[test]
    fn test_catch_up_terminates_on_zero_based_log() {
        let node = ReplicaNode::new(ReplicaConfig::default(), ZeroBasedLog::default()).unwrap();
        let (first, _) = node.propose(vec![Entry::new("a", "x", 1)]).unwrap();
        assert_eq!(first, 0);

        assert_eq!(node.step().unwrap(), 1);
        assert_eq!(node.last_applied(), Some(0));
        assert_eq!(node.step().unwrap(), 0);

        node.propose(vec![Entry::new("a", "y", 2)]).unwrap();
        assert_eq!(node.catch_up().unwrap(), 1);
        assert_eq!(node.last_applied(), Some(1));
        assert_eq!(node.state_machine().get("a"), Entry::new("a", "y", 2));
    }

    #[test]
    fn test_install_snapshot_resumes_after_snapshot() {
        let log = MemLog::new();
        let leader = ReplicaNode::new(ReplicaConfig::default(), log.clone()).unwrap();
        leader.propose(vec![Entry::new("a", "1", 1)]).unwrap();
        leader.propose(vec![Entry::new("b", "2", 1)]).unwrap();
        leader.catch_up().unwrap();
        let snapshot = leader.snapshot().unwrap();

        leader.propose(vec![Entry::new("c", "3", 1)]).unwrap();

        let config = ReplicaConfig {
            node_id: 2,
            ..Default::default()
        };
        let follower = ReplicaNode::new(config, log).unwrap();
        follower.install_snapshot(&snapshot).unwrap();
        assert_eq!(follower.last_applied(), Some(2));

        // Only the command committed after the snapshot is left to apply
        assert_eq!(follower.catch_up().unwrap(), 1);
        assert_eq!(follower.state_machine().len(), 3);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
