//! Per-batch de-duplication of resource changes
//!
//! At most one change survives per resource ID: if a bucket is deleted,
//! created and then modified in the same batch, only the newest event (a
//! rescan) is kept. Scope scans all share the empty resource ID, so several
//! scans in one batch collapse into one as well.

use std::collections::{BTreeMap, HashMap};

use tracing::info;

use super::types::{DeleteEntry, DeleteResources, ResourceChange, ScanEntry, ScanMsg};

#[derive(Debug, Default)]
pub struct ChangeSet {
    changes: HashMap<String, ResourceChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `change` if nothing is stored for its resource yet or it is strictly newer.
    /// RFC3339 UTC timestamps order correctly as plain strings.
    pub fn add(&mut self, change: ResourceChange) {
        info!(change_detail = ?change, "resource change required");

        match self.changes.get(&change.resource_id) {
            Some(existing) if change.event_time <= existing.event_time => {}
            _ => {
                self.changes.insert(change.resource_id.clone(), change);
            }
        }
    }

    pub fn get(&self, resource_id: &str) -> Option<&ResourceChange> {
        self.changes.get(resource_id)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Split into the inventory delete request and one scan message per delay.
    /// Entries are ordered by resource ID so requests are reproducible.
    pub fn partition(self) -> (DeleteResources, BTreeMap<i64, ScanMsg>) {
        let mut changes: Vec<ResourceChange> = self.changes.into_values().collect();
        changes.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));

        let mut deletes = DeleteResources::default();
        let mut scans: BTreeMap<i64, ScanMsg> = BTreeMap::new();

        for change in changes {
            if change.delete {
                deletes.resources.push(DeleteEntry { id: change.resource_id });
            } else {
                // A resource ID with a region is treated downstream as a single resource scan
                scans
                    .entry(change.delay_seconds)
                    .or_default()
                    .entries
                    .push(ScanEntry::from(&change));
            }
        }

        (deletes, scans)
    }
}

impl Extend<ResourceChange> for ChangeSet {
    fn extend<I: IntoIterator<Item = ResourceChange>>(&mut self, iter: I) {
        for change in iter {
            self.add(change);
        }
    }
}
