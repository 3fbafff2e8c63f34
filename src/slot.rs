//! Per-tick-position entry lists.

use crate::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;

/// The ordered collection of entries for one (wheel, tick-index) pair.
///
/// Entries are appended at registration time and snapshot-iterated
/// once per tick. Appends may race a concurrent snapshot; the new
/// entry is then simply not visible until the next tick, which is the
/// most it can lose. Closed entries are purged lazily during the tick
/// pass; a closed entry is never dispatched regardless of whether it
/// is still referenced here.
#[derive(Debug, Default)]
pub struct Slot {
    entries: Mutex<Vec<Arc<Entry>>>,
}

impl Slot {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, entry: Arc<Entry>) {
        self.entries.lock().push(entry);
    }

    /// Copies out the current entry list so the tick pass can iterate
    /// and dispatch without holding the slot lock.
    pub(crate) fn snapshot(&self) -> Vec<Arc<Entry>> {
        self.entries.lock().clone()
    }

    /// Drops every closed entry from the list.
    pub(crate) fn purge_closed(&self) {
        self.entries.lock().retain(|entry| !entry.is_closed());
    }

    /// Returns the number of entry references in this slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no entries are referenced here.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
