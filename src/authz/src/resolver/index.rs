/// Lookup index from externally used names to canonical ids
///
/// The identity cache is keyed by canonical id only, so the resolver
/// remembers which name or alternate id led to which record. Names and
/// alternate ids live in separate key spaces. Entries never expire on their
/// own; they are pruned when a change notification evicts the canonical id
/// they point at.

use dashmap::DashMap;
use gatehouse_core::CanonicalId;
use std::collections::BTreeSet;

/// Which store query a lookup key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    /// Display name
    Name,
    /// Alternate id (`authentication.apiId`)
    AlternateId,
}

/// Concurrent `(kind, key) -> canonical id` map
#[derive(Debug, Default)]
pub struct LookupIndex {
    entries: DashMap<(LookupKind, String), CanonicalId>,
}

impl LookupIndex {
    /// Creates an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical id previously recorded for `key`
    pub fn lookup(&self, kind: LookupKind, key: &str) -> Option<CanonicalId> {
        self.entries
            .get(&(kind, key.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Remember that `key` resolved to `store_id`
    ///
    /// # Arguments
    ///
    /// * `kind` - Query the key was used with
    /// * `key` - Name or alternate id the caller used
    /// * `store_id` - Canonical id of the matching record
    pub fn record(&self, kind: LookupKind, key: impl Into<String>, store_id: impl Into<CanonicalId>) {
        self.entries.insert((kind, key.into()), store_id.into());
    }

    /// Drop every entry pointing at `store_id`, returning how many were removed
    pub fn remove_id(&self, store_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, id| id != store_id);
        before.saturating_sub(self.entries.len())
    }

    /// Empty the index, returning the distinct canonical ids it referenced
    pub fn clear(&self) -> Vec<CanonicalId> {
        let ids: BTreeSet<CanonicalId> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.entries.retain(|_, id| !ids.contains(id));
        ids.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
