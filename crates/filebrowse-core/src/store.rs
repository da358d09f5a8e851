//! Entry store: the raw entry list and the filtered index array.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::entry::{FileUid, InternEntry};

/// Summary statistics over the raw entries of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of entries.
    pub total_entries: usize,
    /// Entries flagged as directories.
    pub total_dirs: usize,
    /// Everything else.
    pub total_files: usize,
    /// Sum of file sizes in bytes.
    pub total_size: u64,
    /// Entries backed by a live object.
    pub live_objects: usize,
}

/// Raw entries of one list plus the filtered display order.
///
/// The entry count is `None` until the first read merges into the store.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: Vec<InternEntry>,
    total: Option<usize>,
    filtered: Vec<usize>,
    filtered_valid: bool,
    max_uid: FileUid,
}

impl EntryStore {
    /// Create an empty, unread store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry count, or `None` if no read has completed.
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Number of raw entries (zero while unset).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw entries in sort order.
    pub fn entries(&self) -> &[InternEntry] {
        &self.entries
    }

    /// Get a raw entry by raw index.
    pub fn get(&self, index: usize) -> Option<&InternEntry> {
        self.entries.get(index)
    }

    /// Highest uid ever stored.
    pub fn max_uid(&self) -> FileUid {
        self.max_uid
    }

    /// Raise the uid high-water mark. Never lowers it.
    pub fn raise_uid(&mut self, uid: FileUid) {
        self.max_uid = self.max_uid.max(uid);
    }

    /// Move a batch of entries to the end of the list.
    pub fn append(&mut self, batch: Vec<InternEntry>) {
        for entry in &batch {
            debug_assert!(entry.uid.is_set(), "entry {} has no uid", entry.relpath);
            self.max_uid = self.max_uid.max(entry.uid);
        }
        self.entries.extend(batch);
        self.total = Some(self.entries.len());
        self.filtered_valid = false;
    }

    /// Mark the store as read but empty.
    pub fn mark_read(&mut self) {
        self.total = Some(self.entries.len());
    }

    /// Release all entries and reset counts to unset.
    ///
    /// The uid high-water mark survives so ids are not reused by later reads.
    pub fn clear(&mut self, mut release: impl FnMut(InternEntry)) {
        for entry in self.entries.drain(..) {
            release(entry);
        }
        self.total = None;
        self.filtered.clear();
        self.filtered_valid = false;
    }

    /// Remove entries backed by a live object and return how many were removed.
    pub fn remove_live_object_entries(&mut self, mut release: impl FnMut(InternEntry)) -> usize {
        let before = self.entries.len();
        let (live, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(InternEntry::is_main_file);
        self.entries = kept;
        let removed = before - self.entries.len();
        for entry in live {
            release(entry);
        }
        if removed > 0 {
            self.total = Some(self.entries.len());
            self.invalidate_filtered();
        }
        removed
    }

    /// Sort the raw entries in place. Invalidates the filtered array.
    pub fn sort_by(&mut self, compare: impl FnMut(&InternEntry, &InternEntry) -> Ordering) {
        self.entries.sort_by(compare);
        self.invalidate_filtered();
    }

    /// Replace the filtered array with a freshly built one.
    pub fn set_filtered(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.iter().all(|&i| i < self.entries.len()));
        self.filtered = indices;
        self.filtered_valid = true;
    }

    /// Drop the filtered array; the count becomes unset until the next filter pass.
    pub fn invalidate_filtered(&mut self) {
        self.filtered.clear();
        self.filtered_valid = false;
    }

    /// Filtered count, or `None` when the filter pass has not run since the last change.
    pub fn filtered_count(&self) -> Option<usize> {
        self.filtered_valid.then_some(self.filtered.len())
    }

    /// Filtered raw indices in display order.
    pub fn filtered_indices(&self) -> &[usize] {
        &self.filtered
    }

    /// Raw index of a display index.
    pub fn raw_index(&self, display_index: usize) -> Option<usize> {
        self.filtered.get(display_index).copied()
    }

    /// Entry at a display index.
    pub fn filtered_entry(&self, display_index: usize) -> Option<&InternEntry> {
        self.raw_index(display_index)
            .and_then(|raw| self.entries.get(raw))
    }

    /// Iterate filtered entries in display order.
    pub fn iter_filtered(&self) -> impl Iterator<Item = &InternEntry> {
        self.filtered.iter().filter_map(|&raw| self.entries.get(raw))
    }

    /// Compute summary statistics over all raw entries.
    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total_entries: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            if entry.is_dir() {
                stats.total_dirs += 1;
            } else {
                stats.total_files += 1;
                stats.total_size += entry.stat.size;
            }
            if entry.is_main_file() {
                stats.live_objects += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{LocalId, TypeFlags};

    fn entry(uid: u32, relpath: &str) -> InternEntry {
        let mut e = InternEntry::new(relpath, TypeFlags::TEXT);
        e.uid = FileUid(uid);
        e
    }

    #[test]
    fn test_unset_until_append() {
        let mut store = EntryStore::new();
        assert_eq!(store.total(), None);
        store.append(vec![entry(1, "a.txt"), entry(2, "b.txt")]);
        assert_eq!(store.total(), Some(2));
        assert_eq!(store.max_uid(), FileUid(2));
    }

    #[test]
    fn test_clear_resets_and_keeps_uid_mark() {
        let mut store = EntryStore::new();
        store.append(vec![entry(5, "a.txt")]);
        let mut released = 0;
        store.clear(|_| released += 1);
        assert_eq!(released, 1);
        assert_eq!(store.total(), None);
        assert_eq!(store.max_uid(), FileUid(5));
    }

    #[test]
    fn test_remove_live_object_entries() {
        let mut store = EntryStore::new();
        let mut live = entry(2, "Material/Wood");
        live.local_id = Some(LocalId(9));
        store.append(vec![entry(1, "a.txt"), live, entry(3, "b.txt")]);

        let removed = store.remove_live_object_entries(|e| assert!(e.is_main_file()));
        assert_eq!(removed, 1);
        assert_eq!(store.total(), Some(2));
        assert!(store.entries().iter().all(|e| !e.is_main_file()));
    }

    #[test]
    fn test_filtered_array() {
        let mut store = EntryStore::new();
        store.append(vec![entry(1, "a.txt"), entry(2, "b.txt"), entry(3, "c.txt")]);
        assert_eq!(store.filtered_count(), None);

        store.set_filtered(vec![2, 0]);
        assert_eq!(store.filtered_count(), Some(2));
        assert_eq!(store.filtered_entry(0).map(|e| e.uid), Some(FileUid(3)));
        assert!(store.filtered_entry(2).is_none());

        store.sort_by(|a, b| a.relpath.cmp(&b.relpath));
        assert_eq!(store.filtered_count(), None);
    }

    #[test]
    fn test_stats() {
        let mut store = EntryStore::new();
        let mut dir = entry(1, "sub");
        dir.typeflag = TypeFlags::DIR;
        let mut file = entry(2, "a.txt");
        file.stat.size = 10;
        store.append(vec![dir, file]);
        let stats = store.stats();
        assert_eq!(stats.total_dirs, 1);
        assert_eq!(stats.total_files, 1);
        assert_eq!(stats.total_size, 10);
    }
}
