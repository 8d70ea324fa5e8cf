/// Handle-indexed resource registry
///
/// One registry exists per entity kind; identifiers are unique within a kind
/// only. Keys are versioned, so a lookup with a freed handle fails instead of
/// aliasing whatever reused the slot. A failed lookup is a reported contract
/// violation, never silently ignored.

use nebula_gfx::gfx_error;
use nebula_gfx::{Error, Result};
use slotmap::{Key, SlotMap};

pub(crate) struct Registry<K: Key, V> {
    map: SlotMap<K, V>,
    kind: &'static str,
}

impl<K: Key, V> Registry<K, V> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            map: SlotMap::with_key(),
            kind,
        }
    }

    /// Insert a backing state and mint a fresh handle for it
    pub fn insert(&mut self, value: V) -> K {
        self.map.insert(value)
    }

    /// Look up the backing state for a handle
    pub fn get(&self, key: K) -> Result<&V> {
        self.map.get(key).ok_or_else(|| self.report(key))
    }

    /// Look up the backing state for a handle, mutably
    pub fn get_mut(&mut self, key: K) -> Result<&mut V> {
        let kind = self.kind;
        match self.map.get_mut(key) {
            Some(value) => Ok(value),
            None => {
                gfx_error!(
                    "nebula::vulkan",
                    "Lookup of a null or freed {} handle ({:?})",
                    kind,
                    key
                );
                Err(Error::InvalidHandle { kind })
            }
        }
    }

    /// Remove a handle's backing state, returning it for destruction
    pub fn remove(&mut self, key: K) -> Result<V> {
        self.map.remove(key).ok_or_else(|| self.report(key))
    }

    /// Remove every entry, returning handles and backing states for teardown
    pub fn take_all(&mut self) -> Vec<(K, V)> {
        self.map.drain().collect()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.map.len()
    }

    fn report(&self, key: K) -> Error {
        gfx_error!(
            "nebula::vulkan",
            "Lookup of a null or freed {} handle ({:?})",
            self.kind,
            key
        );
        Error::InvalidHandle { kind: self.kind }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
