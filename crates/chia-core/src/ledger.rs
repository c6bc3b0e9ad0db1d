//! Which resources of each kind are currently managed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use crate::metrics::OperatorMetrics;

/// Set of tracked identities (`namespace/name`) per kind.
///
/// The per-kind gauge moves under the same lock as the set, so it always
/// equals the set's size.
pub struct Ledger {
    entries: Mutex<BTreeMap<String, BTreeSet<String>>>,
    metrics: Arc<OperatorMetrics>,
}

impl Ledger {
    pub fn new(metrics: Arc<OperatorMetrics>) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            metrics,
        }
    }

    /// Start tracking; returns false if the identity was already tracked.
    pub fn track(&self, kind: &str, identity: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let added = entries
            .entry(kind.to_string())
            .or_default()
            .insert(identity.to_string());
        if added {
            self.metrics.tracked_increment(kind);
        }
        added
    }

    /// Stop tracking; returns false if the identity was not tracked.
    pub fn untrack(&self, kind: &str, identity: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let removed = entries
            .get_mut(kind)
            .map(|set| set.remove(identity))
            .unwrap_or(false);
        if removed {
            self.metrics.tracked_decrement(kind);
        }
        removed
    }

    pub fn is_tracked(&self, kind: &str, identity: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(kind)
            .map(|set| set.contains(identity))
            .unwrap_or(false)
    }

    /// Tracked identities of `kind`, sorted.
    pub fn identities(&self, kind: &str) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(kind)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, kind: &str) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(kind).map(BTreeSet::len).unwrap_or(0)
    }
}
