//! Capability registry interface for host-resident values.

use std::collections::HashMap;

use super::value::Value;

/// Resolves opaque capability keys to host-resident values.
///
/// The encoder writes a `U` record whenever a value cannot be represented as
/// bytes (a builtin function, a module attribute) and records a stable key
/// for it instead. The matching decode-side lookup happens through this
/// trait, passed into [`crate::persist::decode`] explicitly so there is no
/// ambient global registry. For round-trips to succeed, both sides must map
/// the same value to the same key.
pub trait CapabilityRegistry {
    /// Look up the value for `key`, or `None` if the key is unknown.
    fn resolve(&self, key: &[u8]) -> Option<Value>;
}

/// A registry with no entries; every lookup misses.
///
/// Useful for inspecting snapshots whose capability keys cannot be resolved
/// locally: any `U` record then fails with a descriptive error instead of
/// silently producing a null.
#[derive(Debug, Default)]
pub struct EmptyRegistry;

impl CapabilityRegistry for EmptyRegistry {
    fn resolve(&self, _key: &[u8]) -> Option<Value> {
        None
    }
}

impl CapabilityRegistry for HashMap<Vec<u8>, Value> {
    fn resolve(&self, key: &[u8]) -> Option<Value> {
        self.get(key).cloned()
    }
}
