//! The daemon's side of the RPC bridge.
//!
//! [`MethodTable`] is attached to the engine's command map and receives every
//! public registration. Only keys present in the table are callable over the
//! socket.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use switchboard::RpcBridge;

/// Metadata published for a remote method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Parameter signature, such as `i:s`.
    pub param_spec: String,
    /// Help text.
    pub doc: String,
}

/// Shared view of the published methods.
///
/// Clones share one table: the copy attached to the command map writes, the
/// reactor's copy reads.
#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: Rc<RefCell<BTreeMap<String, MethodInfo>>>,
}

impl MethodTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is published.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.methods.borrow().contains_key(key)
    }

    /// Metadata for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<MethodInfo> {
        self.methods.borrow().get(key).cloned()
    }

    /// Published keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.methods.borrow().keys().cloned().collect()
    }

    /// Number of published methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.borrow().len()
    }

    /// Whether nothing is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.borrow().is_empty()
    }
}

impl RpcBridge for MethodTable {
    fn insert_command(&mut self, key: &str, param_spec: &str, doc: &str) {
        self.methods.borrow_mut().insert(
            key.to_owned(),
            MethodInfo {
                param_spec: param_spec.to_owned(),
                doc: doc.to_owned(),
            },
        );
    }

    fn remove_command(&mut self, key: &str) {
        self.methods.borrow_mut().remove(key);
    }
}
