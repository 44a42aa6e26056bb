//! Contract of the string-keyed backing store.
//!
//! The backing store owns durability and locking. All it promises upward is
//! that [`StringStore::update`] runs its closure with exclusive access to the
//! store's state, so everything done through the transaction is observed by
//! other callers either entirely or not at all.

/// Transaction handed to the closure of [`StringStore::update`].
///
/// A transaction only lives for the duration of one `update` call.
pub trait StringTxn {
    /// Look up the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: String, value: String);

    /// Remove any value stored under `key`.
    fn del(&mut self, key: &str);

    /// Every key currently visible to this transaction.
    fn keys(&self) -> Vec<String>;
}

/// A key-value store whose keys and values are both strings.
pub trait StringStore: Send + Sync {
    /// Run `f` inside one atomic, mutually exclusive transaction and return
    /// whatever it returns.
    fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut dyn StringTxn) -> R;
}
