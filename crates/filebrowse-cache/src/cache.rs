//! Sliding window cache of display entries.
//!
//! The cache holds a contiguous block of materialized entries around the
//! last requested center index, plus a bounded side cache for random access
//! outside that block. Both are keyed by filtered index; a uid map allows
//! preview results to find their entry again after the block moved.

use std::collections::{HashMap, VecDeque};
use std::ops::Range;

use filebrowse_core::{DisplayEntry, EntryStore, FileUid};

use crate::ring::RingBuffer;

/// Default number of cached entries.
pub const DEFAULT_CACHE_SIZE: usize = 1024;
/// Smallest cache size handed out by [`cache_size_for_window`].
pub const MIN_CACHE_SIZE: usize = 256;
/// Largest cache size handed out by [`cache_size_for_window`].
pub const MAX_CACHE_SIZE: usize = 8192;

/// Cache size for a visible window of `window` rows.
///
/// Always a power of two in `[MIN_CACHE_SIZE, MAX_CACHE_SIZE]`, about twice
/// the window.
pub fn cache_size_for_window(window: usize) -> usize {
    let wanted = window.saturating_mul(2);
    let mut size = MIN_CACHE_SIZE;
    while size < wanted && size < MAX_CACHE_SIZE {
        size *= 2;
    }
    size
}

/// What [`EntryCache::ensure_block`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockChange {
    /// Same window and center as before.
    Unchanged,
    /// Same window, different center.
    Recentered,
    /// The window moved; overlapping entries were kept.
    Partial,
    /// Everything was released and rebuilt.
    Full,
}

impl BlockChange {
    /// Whether cached entries were released or created.
    pub fn moved(self) -> bool {
        matches!(self, BlockChange::Partial | BlockChange::Full)
    }
}

/// Bounded FIFO of entries requested outside the block.
///
/// Removal out of order leaves a stale slot in the queue; stale slots are
/// skipped on eviction and compacted once they outnumber live ones.
#[derive(Debug)]
struct MiscCache {
    capacity: usize,
    order: VecDeque<(usize, u64)>,
    entries: HashMap<usize, (u64, DisplayEntry)>,
    stamp: u64,
}

impl MiscCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
            stamp: 0,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    fn get(&self, index: usize) -> Option<&DisplayEntry> {
        self.entries.get(&index).map(|(_, entry)| entry)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut DisplayEntry> {
        self.entries.get_mut(&index).map(|(_, entry)| entry)
    }

    /// Insert a new entry, returning the one evicted to make room.
    fn insert(&mut self, index: usize, entry: DisplayEntry) -> Option<DisplayEntry> {
        debug_assert!(!self.contains(index));
        let evicted = if self.entries.len() >= self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        self.stamp += 1;
        self.order.push_back((index, self.stamp));
        self.entries.insert(index, (self.stamp, entry));
        if self.order.len() > self.capacity * 2 {
            self.compact();
        }
        evicted
    }

    fn take(&mut self, index: usize) -> Option<DisplayEntry> {
        self.entries.remove(&index).map(|(_, entry)| entry)
    }

    fn evict_oldest(&mut self) -> Option<DisplayEntry> {
        while let Some((index, stamp)) = self.order.pop_front() {
            let live = self
                .entries
                .get(&index)
                .is_some_and(|(current, _)| *current == stamp);
            if live {
                return self.take(index);
            }
        }
        None
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order.retain(|(index, stamp)| {
            entries
                .get(index)
                .is_some_and(|(current, _)| current == stamp)
        });
    }

    fn drain(&mut self) -> Vec<DisplayEntry> {
        self.order.clear();
        self.entries.drain().map(|(_, (_, entry))| entry).collect()
    }

    fn values_mut(&mut self) -> impl Iterator<Item = &mut DisplayEntry> {
        self.entries.values_mut().map(|(_, entry)| entry)
    }
}

/// Sliding window cache over the filtered entries of an [`EntryStore`].
///
/// An index is never cached in both the block and the misc cache. Every cached
/// entry is registered in the uid map, and nothing else is.
#[derive(Debug)]
pub struct EntryCache {
    size: usize,
    block: RingBuffer<DisplayEntry>,
    block_start: usize,
    block_end: usize,
    block_center: usize,
    misc: MiscCache,
    uids: HashMap<FileUid, usize>,
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl EntryCache {
    /// Create an empty cache holding up to `size` block entries.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            block: RingBuffer::with_capacity(size),
            block_start: 0,
            block_end: 0,
            block_center: 0,
            misc: MiscCache::new(size),
            uids: HashMap::with_capacity(size * 2),
        }
    }

    /// Configured cache size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Filtered indices currently held by the block.
    pub fn block_range(&self) -> Range<usize> {
        self.block_start..self.block_end
    }

    /// Center index of the last block request.
    pub fn block_center(&self) -> usize {
        self.block_center
    }

    /// Number of entries in the misc cache.
    pub fn misc_len(&self) -> usize {
        self.misc.len()
    }

    /// Number of cached entries overall.
    pub fn len(&self) -> usize {
        self.block.len() + self.misc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an entry with this uid is cached.
    pub fn contains_uid(&self, uid: FileUid) -> bool {
        self.uids.contains_key(&uid)
    }

    fn in_block(&self, index: usize) -> bool {
        self.block_range().contains(&index)
    }

    /// Cached entry at `index`, without materializing anything.
    pub fn peek(&self, index: usize) -> Option<&DisplayEntry> {
        if self.in_block(index) {
            return self.block.get(index - self.block_start);
        }
        self.misc.get(index)
    }

    /// Cached entry at `index`, mutably, without materializing anything.
    pub fn peek_mut(&mut self, index: usize) -> Option<&mut DisplayEntry> {
        if self.in_block(index) {
            let offset = index - self.block_start;
            return self.block.get_mut(offset);
        }
        self.misc.get_mut(index)
    }

    /// Entry at filtered `index`.
    ///
    /// Looks in the block, then in the misc cache. When `materialize` is set, a
    /// missing entry is created from the store and put in the misc cache,
    /// evicting its oldest entry if full. Out-of-range indices give `None`.
    pub fn get(
        &mut self,
        store: &EntryStore,
        index: usize,
        materialize: bool,
    ) -> Option<&mut DisplayEntry> {
        let count = store.filtered_count()?;
        if index >= count {
            return None;
        }
        if self.in_block(index) {
            let offset = index - self.block_start;
            return self.block.get_mut(offset);
        }

        if !self.misc.contains(index) {
            if !materialize {
                return None;
            }
            let entry = DisplayEntry::from_intern(store.filtered_entry(index)?);
            let uid = entry.uid;
            if let Some(evicted) = self.misc.insert(index, entry) {
                self.uids.remove(&evicted.uid);
            }
            self.register(uid, index);
        }
        self.misc.get_mut(index)
    }

    /// Cached entry with the given uid.
    pub fn entry_by_uid_mut(&mut self, uid: FileUid) -> Option<&mut DisplayEntry> {
        let index = *self.uids.get(&uid)?;
        let entry = if self.in_block(index) {
            self.block.get_mut(index - self.block_start)
        } else {
            self.misc.get_mut(index)
        };
        entry.filter(|entry| entry.uid == uid)
    }

    /// Move the block so it covers a window of at most `size` entries around `index`.
    ///
    /// Returns `None` when `index` is outside the filtered range.
    pub fn ensure_block(&mut self, store: &EntryStore, index: usize) -> Option<BlockChange> {
        self.ensure_block_with(store, index, false)
    }

    /// Like [`ensure_block`](Self::ensure_block), optionally forcing a full flush.
    pub fn ensure_block_with(
        &mut self,
        store: &EntryStore,
        index: usize,
        full_refresh: bool,
    ) -> Option<BlockChange> {
        let count = store.filtered_count()?;
        if index >= count {
            return None;
        }

        let half = self.size / 2;
        let mut start = index.saturating_sub(half);
        let mut end = count.min(index + half);
        if end - start < self.size {
            if start == 0 {
                end = count.min(self.size);
            } else if end == count {
                start = end.saturating_sub(self.size);
            }
        }
        debug_assert!(end - start <= self.size);

        let change = if !full_refresh && start == self.block_start && end == self.block_end {
            if self.block_center == index {
                BlockChange::Unchanged
            } else {
                BlockChange::Recentered
            }
        } else if full_refresh
            || self.block.is_empty()
            || start >= self.block_end
            || end <= self.block_start
        {
            tracing::trace!(
                target: "filebrowse::cache",
                start,
                end,
                old_start = self.block_start,
                old_end = self.block_end,
                "full re-block"
            );
            self.release_block();
            self.block_start = start;
            self.block_end = start;
            if !self.extend_back(store, end) {
                self.release_block();
                return None;
            }
            BlockChange::Full
        } else {
            tracing::trace!(
                target: "filebrowse::cache",
                start,
                end,
                old_start = self.block_start,
                old_end = self.block_end,
                "partial re-block"
            );
            while self.block_start < start {
                self.release_front();
            }
            while self.block_end > end {
                self.release_back();
            }
            if !self.extend_front(store, start) || !self.extend_back(store, end) {
                self.release_block();
                return None;
            }
            BlockChange::Partial
        };

        self.block_center = index;
        Some(change)
    }

    /// Resize the cache, flushing every entry.
    pub fn resize(&mut self, size: usize) {
        let size = size.max(1);
        self.clear();
        self.size = size;
        self.block = RingBuffer::with_capacity(size);
        self.misc = MiscCache::new(size);
        self.uids = HashMap::with_capacity(size * 2);
    }

    /// Drop every cached entry, keeping the configuration.
    pub fn clear(&mut self) {
        self.release_block();
        for entry in self.misc.drain() {
            self.uids.remove(&entry.uid);
        }
        debug_assert!(self.uids.is_empty());
        self.uids.clear();
        self.block_center = 0;
    }

    /// Block entries from the front of the window to its back.
    pub fn block_entries(&self) -> impl Iterator<Item = &DisplayEntry> {
        self.block.iter()
    }

    /// Every cached entry, block first.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut DisplayEntry> {
        self.block.iter_mut().chain(self.misc.values_mut())
    }

    fn register(&mut self, uid: FileUid, index: usize) {
        let previous = self.uids.insert(uid, index);
        debug_assert!(previous.is_none(), "uid {uid:?} cached twice");
    }

    /// Entry for `index`, reusing a misc cache entry when there is one.
    fn take_or_create(&mut self, store: &EntryStore, index: usize) -> Option<DisplayEntry> {
        if let Some(entry) = self.misc.take(index) {
            return Some(entry);
        }
        let entry = DisplayEntry::from_intern(store.filtered_entry(index)?);
        self.register(entry.uid, index);
        Some(entry)
    }

    fn extend_back(&mut self, store: &EntryStore, end: usize) -> bool {
        while self.block_end < end {
            let Some(entry) = self.take_or_create(store, self.block_end) else {
                debug_assert!(false, "filtered index {} has no entry", self.block_end);
                return false;
            };
            if let Err(entry) = self.block.push_back(entry) {
                self.uids.remove(&entry.uid);
                debug_assert!(false, "block overflow");
                return false;
            }
            self.block_end += 1;
        }
        true
    }

    fn extend_front(&mut self, store: &EntryStore, start: usize) -> bool {
        while self.block_start > start {
            let index = self.block_start - 1;
            let Some(entry) = self.take_or_create(store, index) else {
                debug_assert!(false, "filtered index {index} has no entry");
                return false;
            };
            if let Err(entry) = self.block.push_front(entry) {
                self.uids.remove(&entry.uid);
                debug_assert!(false, "block overflow");
                return false;
            }
            self.block_start = index;
        }
        true
    }

    fn release_front(&mut self) {
        if let Some(entry) = self.block.pop_front() {
            self.uids.remove(&entry.uid);
        }
        self.block_start += 1;
    }

    fn release_back(&mut self) {
        if let Some(entry) = self.block.pop_back() {
            self.uids.remove(&entry.uid);
        }
        self.block_end -= 1;
    }

    fn release_block(&mut self) {
        for entry in self.block.drain() {
            self.uids.remove(&entry.uid);
        }
        self.block_start = 0;
        self.block_end = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filebrowse_core::{InternEntry, TypeFlags};

    fn store(count: u32) -> EntryStore {
        let mut store = EntryStore::new();
        let entries = (0..count)
            .map(|i| {
                let mut e = InternEntry::new(format!("file{i:05}.txt"), TypeFlags::TEXT);
                e.uid = FileUid(i + 1);
                e
            })
            .collect();
        store.append(entries);
        store.mark_read();
        store.set_filtered((0..count as usize).collect());
        store
    }

    fn assert_coherent(cache: &EntryCache) {
        let mut seen = std::collections::HashSet::new();
        for index in cache.block_range() {
            assert!(!cache.misc.contains(index), "index {index} cached twice");
            let entry = cache.peek(index).expect("block is contiguous");
            assert!(seen.insert(entry.uid));
            assert_eq!(cache.uids.get(&entry.uid), Some(&index));
        }
        for (index, (_, entry)) in &cache.misc.entries {
            assert!(seen.insert(entry.uid));
            assert_eq!(cache.uids.get(&entry.uid), Some(index));
        }
        assert_eq!(seen.len(), cache.uids.len());
    }

    #[test]
    fn test_cache_size_for_window() {
        assert_eq!(cache_size_for_window(0), 256);
        assert_eq!(cache_size_for_window(128), 256);
        assert_eq!(cache_size_for_window(129), 512);
        assert_eq!(cache_size_for_window(1000), 2048);
        assert_eq!(cache_size_for_window(100_000), 8192);
        assert_eq!(cache_size_for_window(usize::MAX), 8192);
    }

    #[test]
    fn test_out_of_range_is_none() {
        let store = store(10);
        let mut cache = EntryCache::new(4);
        assert!(cache.get(&store, 10, true).is_none());
        assert!(cache.ensure_block(&store, 10).is_none());
        assert!(cache.get(&EntryStore::new(), 0, true).is_none());
    }

    #[test]
    fn test_window_is_maximized_at_edges() {
        let store = store(100);
        let mut cache = EntryCache::new(16);

        assert_eq!(cache.ensure_block(&store, 2), Some(BlockChange::Full));
        assert_eq!(cache.block_range(), 0..16);

        assert_eq!(cache.ensure_block(&store, 98), Some(BlockChange::Full));
        assert_eq!(cache.block_range(), 84..100);

        cache.ensure_block(&store, 50);
        assert_eq!(cache.block_range(), 42..58);
        assert_coherent(&cache);
    }

    #[test]
    fn test_partial_reblock_keeps_overlap() {
        let store = store(100);
        let mut cache = EntryCache::new(16);
        cache.ensure_block(&store, 50);
        if let Some(entry) = cache.get(&store, 52, false) {
            entry.name = "marked".into();
        }

        assert_eq!(cache.ensure_block(&store, 54), Some(BlockChange::Partial));
        assert_eq!(cache.block_range(), 46..62);
        assert_eq!(cache.peek(52).map(|e| e.name.as_str()), Some("marked"));
        assert_coherent(&cache);

        assert_eq!(cache.ensure_block(&store, 47), Some(BlockChange::Partial));
        assert_eq!(cache.block_range(), 39..55);
        assert_eq!(cache.peek(52).map(|e| e.name.as_str()), Some("marked"));
        assert_coherent(&cache);

        // Near the start the window stays put while the center moves.
        cache.ensure_block(&store, 2);
        assert_eq!(cache.ensure_block(&store, 3), Some(BlockChange::Recentered));
        assert_eq!(cache.ensure_block(&store, 3), Some(BlockChange::Unchanged));
    }

    #[test]
    fn test_misc_entry_moves_into_block() {
        let store = store(100);
        let mut cache = EntryCache::new(8);
        let uid = cache.get(&store, 60, true).map(|e| e.uid);
        assert_eq!(cache.misc_len(), 1);

        cache.ensure_block(&store, 60);
        assert_eq!(cache.misc_len(), 0);
        assert_eq!(cache.peek(60).map(|e| e.uid), uid);
        assert_coherent(&cache);
    }

    #[test]
    fn test_misc_fifo_eviction() {
        let store = store(100);
        let mut cache = EntryCache::new(4);
        for index in 10..14 {
            cache.get(&store, index, true);
        }
        assert_eq!(cache.misc_len(), 4);

        cache.get(&store, 20, true);
        assert_eq!(cache.misc_len(), 4);
        assert!(cache.peek(10).is_none());
        assert!(cache.peek(11).is_some());
        assert!(!cache.contains_uid(FileUid(11)));
        assert_coherent(&cache);
    }

    #[test]
    fn test_misc_stale_slots_are_compacted() {
        let store = store(200);
        let mut cache = EntryCache::new(4);
        for round in 0..20 {
            let index = 100 + round;
            cache.get(&store, index, true);
            // Pull it into the block, leaving a stale queue slot behind.
            cache.ensure_block(&store, index);
            cache.ensure_block(&store, 0);
        }
        assert!(cache.misc.order.len() <= 8);
        assert_coherent(&cache);
    }

    #[test]
    fn test_resize_flushes() {
        let store = store(100);
        let mut cache = EntryCache::new(16);
        cache.ensure_block(&store, 10);
        cache.get(&store, 90, true);

        cache.resize(32);
        assert_eq!(cache.size(), 32);
        assert!(cache.is_empty());
        assert!(cache.uids.is_empty());
        assert_eq!(cache.block_range(), 0..0);
    }

    #[test]
    fn test_entry_by_uid() {
        let store = store(100);
        let mut cache = EntryCache::new(8);
        cache.ensure_block(&store, 5);
        cache.get(&store, 70, true);

        assert!(cache.entry_by_uid_mut(FileUid(6)).is_some());
        assert!(cache.entry_by_uid_mut(FileUid(71)).is_some());
        assert!(cache.entry_by_uid_mut(FileUid(50)).is_none());
    }

    #[test]
    fn test_forced_full_refresh() {
        let store = store(50);
        let mut cache = EntryCache::new(8);
        cache.ensure_block(&store, 20);
        assert_eq!(
            cache.ensure_block_with(&store, 20, true),
            Some(BlockChange::Full)
        );
        assert_coherent(&cache);
    }
}
