//! The command map: a flat namespace of keys bound to command entries.
//!
//! Public entries are mirrored into an optional [`RpcBridge`] as they are
//! registered and forgotten again when erased.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::command::{Callable, CommandEntry, CommandFlags};
use crate::error::RegistryError;

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// External method table that mirrors public registrations.
#[cfg_attr(test, mockall::automock)]
pub trait RpcBridge {
    /// Publishes a method.
    fn insert_command(&mut self, key: &str, param_spec: &str, doc: &str);

    /// Withdraws a method.
    fn remove_command(&mut self, _key: &str) {}
}

/// Registry of commands keyed by name.
#[derive(Default)]
pub struct CommandMap {
    entries: HashMap<Cow<'static, str>, CommandEntry>,
    bridge: Option<Box<dyn RpcBridge>>,
}

impl CommandMap {
    /// Creates an empty map without a bridge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a bridge and publishes every public entry registered so far.
    pub fn attach_bridge(&mut self, mut bridge: Box<dyn RpcBridge>) {
        let mut public: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_public())
            .collect();
        public.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (key, entry) in public {
            bridge.insert_command(key, entry.param_spec(), entry.doc());
        }
        self.bridge = Some(bridge);
    }

    /// Detaches the bridge, returning it.
    pub fn detach_bridge(&mut self) -> Option<Box<dyn RpcBridge>> {
        self.bridge.take()
    }

    /// Registers a command.
    ///
    /// Owned keys are marked [`CommandFlags::DELETE_KEY`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKey`] without touching the map when
    /// `key` is already registered.
    pub fn insert(
        &mut self,
        key: impl Into<Cow<'static, str>>,
        callable: Callable,
        flags: CommandFlags,
        param_spec: impl Into<Cow<'static, str>>,
        doc: impl Into<Cow<'static, str>>,
    ) -> Result<(), RegistryError> {
        let key = key.into();
        let mut flags = flags;
        if matches!(key, Cow::Owned(_)) {
            flags |= CommandFlags::DELETE_KEY;
        }
        self.insert_entry(key, CommandEntry::new(callable, flags, param_spec, doc))
    }

    /// Registers `new_key` as a second name for `existing_key`.
    ///
    /// The alias shares the callable and never owns it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownSource`] when `existing_key` is not
    /// registered and [`RegistryError::DuplicateKey`] when `new_key` is.
    pub fn insert_alias(
        &mut self,
        new_key: impl Into<Cow<'static, str>>,
        existing_key: &str,
    ) -> Result<(), RegistryError> {
        let new_key = new_key.into();
        let source = self
            .entries
            .get(existing_key)
            .ok_or_else(|| RegistryError::UnknownSource {
                alias: new_key.to_string(),
                source_key: existing_key.to_owned(),
            })?;
        let mut flags = source.flags() | CommandFlags::DONT_DELETE;
        flags.set(CommandFlags::DELETE_KEY, matches!(new_key, Cow::Owned(_)));
        let entry = source.clone().with_flags(flags);
        self.insert_entry(new_key, entry)
    }

    fn insert_entry(
        &mut self,
        key: Cow<'static, str>,
        entry: CommandEntry,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(&key) {
            return Err(RegistryError::DuplicateKey {
                key: key.into_owned(),
            });
        }
        if entry.is_public()
            && let Some(bridge) = self.bridge.as_mut()
        {
            bridge.insert_command(&key, entry.param_spec(), entry.doc());
        }
        debug!(
            target: REGISTRY_TARGET,
            key = %key,
            kind = %entry.kind(),
            public = entry.is_public(),
            "registered command"
        );
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Removes a command. Returns false when the key was not registered.
    ///
    /// Other entries sharing the callable keep it alive.
    pub fn erase(&mut self, key: &str) -> bool {
        let Some((key, entry)) = self.entries.remove_entry(key) else {
            return false;
        };
        if entry.is_public()
            && let Some(bridge) = self.bridge.as_mut()
        {
            bridge.remove_command(&key);
        }
        debug!(target: REGISTRY_TARGET, key = %key, "erased command");
        true
    }

    /// Looks up a command.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&CommandEntry> {
        self.entries.get(key)
    }

    /// Returns true when `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys in lexical order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(AsRef::as_ref).collect();
        keys.sort_unstable();
        keys
    }

    /// Public keys in lexical order.
    #[must_use]
    pub fn public_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_public())
            .map(|(key, _)| key.as_ref())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Drops every entry and reports how many were released.
    pub fn clear(&mut self) -> usize {
        let released = self.entries.len();
        self.entries.clear();
        debug!(target: REGISTRY_TARGET, released, "cleared command map");
        released
    }
}

impl fmt::Debug for CommandMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMap")
            .field("entries", &self.entries.len())
            .field("bridge", &self.bridge.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetKind;
    use crate::value::Value;
    use rstest::{fixture, rstest};

    fn callable() -> Callable {
        Callable::generic(|_, _| Ok(Value::Int(1)))
    }

    #[fixture]
    fn map() -> CommandMap {
        let mut map = CommandMap::new();
        map.insert("a.public", callable(), CommandFlags::PUBLIC_RPC, "i:", "doc")
            .expect("insert public");
        map.insert("a.private", callable(), CommandFlags::empty(), "i:", "")
            .expect("insert private");
        map
    }

    #[rstest]
    fn duplicate_insert_leaves_map_untouched(mut map: CommandMap) {
        let before = map.find("a.public").expect("present").clone();
        let error = map
            .insert(
                "a.public",
                Callable::download(|_, _, _| Ok(Value::Empty)),
                CommandFlags::empty(),
                "",
                "",
            )
            .expect_err("duplicate");
        assert_eq!(
            error,
            RegistryError::DuplicateKey {
                key: "a.public".to_owned()
            }
        );
        let after = map.find("a.public").expect("still present");
        assert!(after.callable().ptr_eq(before.callable()));
        assert_eq!(after.kind(), TargetKind::Generic);
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    fn owned_keys_are_marked_for_deletion(mut map: CommandMap) {
        map.insert(
            String::from("a.owned"),
            callable(),
            CommandFlags::empty(),
            "",
            "",
        )
        .expect("insert owned");
        assert!(
            map.find("a.owned")
                .expect("owned")
                .flags()
                .contains(CommandFlags::DELETE_KEY)
        );
        assert!(
            !map.find("a.public")
                .expect("static")
                .flags()
                .contains(CommandFlags::DELETE_KEY)
        );
    }

    #[rstest]
    fn alias_borrows_callable(mut map: CommandMap) {
        map.insert_alias("a.alias", "a.public").expect("alias");
        let alias = map.find("a.alias").expect("alias present");
        let source = map.find("a.public").expect("source present");
        assert!(alias.callable().ptr_eq(source.callable()));
        assert!(alias.flags().contains(CommandFlags::DONT_DELETE));
        assert!(alias.is_public());
    }

    #[rstest]
    fn alias_of_unknown_key_fails(mut map: CommandMap) {
        let error = map.insert_alias("a.alias", "a.missing").expect_err("unknown");
        assert!(matches!(error, RegistryError::UnknownSource { .. }));
        assert!(!map.contains("a.alias"));
    }

    #[rstest]
    fn erase_is_idempotent(mut map: CommandMap) {
        assert!(map.erase("a.private"));
        assert!(map.find("a.private").is_none());
        assert!(!map.erase("a.private"));
        assert!(map.find("a.private").is_none());
    }

    #[rstest]
    fn keys_are_sorted(map: CommandMap) {
        assert_eq!(map.keys(), vec!["a.private", "a.public"]);
        assert_eq!(map.public_keys(), vec!["a.public"]);
    }

    #[rstest]
    fn clear_reports_released_entries(mut map: CommandMap) {
        assert_eq!(map.clear(), 2);
        assert!(map.is_empty());
    }

    #[test]
    fn bridge_mirrors_public_registrations_only() {
        let mut bridge = MockRpcBridge::new();
        bridge
            .expect_insert_command()
            .withf(|key, spec, doc| key == "b.public" && spec == "i:s" && doc == "help")
            .times(1)
            .return_const(());
        bridge
            .expect_insert_command()
            .withf(|key, spec, doc| key == "b.alias" && spec == "i:s" && doc == "help")
            .times(1)
            .return_const(());
        bridge
            .expect_remove_command()
            .withf(|key| key == "b.public")
            .times(1)
            .return_const(());

        let mut map = CommandMap::new();
        map.attach_bridge(Box::new(bridge));
        map.insert("b.public", callable(), CommandFlags::PUBLIC_RPC, "i:s", "help")
            .expect("insert public");
        map.insert("b.private", callable(), CommandFlags::empty(), "i:", "")
            .expect("insert private");
        map.insert_alias("b.alias", "b.public").expect("alias");
        assert!(map.erase("b.public"));
        assert!(map.erase("b.private"));
    }

    #[rstest]
    fn attaching_bridge_publishes_existing_entries(mut map: CommandMap) {
        let mut bridge = MockRpcBridge::new();
        bridge
            .expect_insert_command()
            .withf(|key, spec, doc| key == "a.public" && spec == "i:" && doc == "doc")
            .times(1)
            .return_const(());

        map.attach_bridge(Box::new(bridge));
    }
}
