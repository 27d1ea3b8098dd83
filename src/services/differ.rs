use std::collections::HashSet;

use crate::models::slot::{Delta, SlotKey, Snapshot};

/// Compare two snapshots by (equipment, date) identity.
///
/// `added` keeps the order of `current`, `removed` the order of `previous`.
/// A missing previous snapshot should be passed as [`Snapshot::empty`], which
/// makes every current entry an addition.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Delta {
    let previous_keys: HashSet<SlotKey> = previous.keys().collect();
    let current_keys: HashSet<SlotKey> = current.keys().collect();

    let added = current
        .keys()
        .filter(|key| !previous_keys.contains(key))
        .collect();
    let removed = previous
        .keys()
        .filter(|key| !current_keys.contains(key))
        .collect();

    Delta { added, removed }
}
