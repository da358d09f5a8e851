//! Unique id generation for listing entries.

use std::sync::atomic::{AtomicU32, Ordering};

use filebrowse_core::FileUid;

/// Mints entry uids for one list.
///
/// Ids are handed out monotonically with an atomic counter, so the read worker
/// and the main thread can both mint ids without taking a lock.
#[derive(Debug, Default)]
pub struct UidGenerator {
    last: AtomicU32,
}

impl UidGenerator {
    /// Create a generator whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator continuing after the given high-water mark.
    pub fn starting_after(last: FileUid) -> Self {
        Self {
            last: AtomicU32::new(last.0),
        }
    }

    /// Mint a fresh id.
    pub fn generate(&self) -> FileUid {
        let id = self.last.fetch_add(1, Ordering::Relaxed) + 1;
        debug_assert!(id != 0, "uid counter wrapped");
        FileUid(id)
    }

    /// The last id handed out ([`FileUid::UNSET`] if none).
    pub fn current(&self) -> FileUid {
        FileUid(self.last.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_generate_is_monotonic() {
        let uids = UidGenerator::new();
        assert_eq!(uids.current(), FileUid::UNSET);
        assert_eq!(uids.generate(), FileUid(1));
        assert_eq!(uids.generate(), FileUid(2));
        assert_eq!(uids.current(), FileUid(2));
    }

    #[test]
    fn test_starting_after() {
        let uids = UidGenerator::starting_after(FileUid(41));
        assert_eq!(uids.generate(), FileUid(42));
    }

    #[test]
    fn test_unique_across_threads() {
        let uids = Arc::new(UidGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let uids = Arc::clone(&uids);
                std::thread::spawn(move || (0..250).map(|_| uids.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for uid in handle.join().unwrap() {
                assert!(seen.insert(uid));
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
