//! In-memory database boundary.
//!
//! The database holds the live objects of the currently open file. Entries
//! listing it carry a [`LocalId`] back-reference.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use compact_str::CompactString;
use indexmap::IndexMap;

use filebrowse_core::{AssetMetadata, IdCode, LocalId, LocalPreview};

/// One live object.
#[derive(Debug, Clone)]
pub struct MainId {
    pub local_id: LocalId,
    pub id_code: IdCode,
    pub name: CompactString,
    /// Present when the object is marked as an asset.
    pub asset: Option<AssetMetadata>,
    /// Preview rendered for the object, possibly unfinished.
    pub preview: Option<Arc<LocalPreview>>,
    /// Linked in from another file rather than owned by this one.
    pub linked: bool,
}

/// Read access to the in-memory database.
pub trait MainDatabase: Send + Sync {
    /// Path of the open file, if it was saved.
    fn filepath(&self) -> Option<PathBuf>;

    /// Groups holding at least one object, in database order.
    fn groups(&self) -> Vec<IdCode>;

    /// Objects of one group.
    fn ids(&self, group: IdCode) -> Vec<MainId>;
}

/// Simple [`MainDatabase`] kept in memory.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    filepath: RwLock<Option<PathBuf>>,
    ids: RwLock<IndexMap<IdCode, Vec<MainId>>>,
    next_id: AtomicU64,
}

impl MemoryDatabase {
    /// Create an empty, unsaved database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path the database was saved to.
    pub fn set_filepath(&self, path: Option<PathBuf>) {
        if let Ok(mut filepath) = self.filepath.write() {
            *filepath = path;
        }
    }

    /// Add a plain object.
    pub fn add(&self, group: IdCode, name: impl Into<CompactString>) -> LocalId {
        self.insert(group, name.into(), None)
    }

    /// Add an object marked as an asset.
    pub fn add_asset(
        &self,
        group: IdCode,
        name: impl Into<CompactString>,
        metadata: AssetMetadata,
    ) -> LocalId {
        self.insert(group, name.into(), Some(metadata))
    }

    fn insert(&self, group: IdCode, name: CompactString, asset: Option<AssetMetadata>) -> LocalId {
        let local_id = LocalId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let id = MainId {
            local_id,
            id_code: group,
            name,
            asset,
            preview: Some(Arc::new(LocalPreview::new())),
            linked: false,
        };
        if let Ok(mut ids) = self.ids.write() {
            ids.entry(group).or_default().push(id);
        }
        local_id
    }

    /// Mark an object as linked from another file.
    pub fn set_linked(&self, local_id: LocalId, linked: bool) {
        self.modify(local_id, |id| id.linked = linked);
    }

    /// Replace or drop the preview of an object.
    pub fn set_preview(&self, local_id: LocalId, preview: Option<Arc<LocalPreview>>) {
        self.modify(local_id, |id| id.preview = preview);
    }

    /// Remove an object. Returns whether it existed.
    pub fn remove(&self, local_id: LocalId) -> bool {
        let Ok(mut ids) = self.ids.write() else {
            return false;
        };
        for group in ids.values_mut() {
            if let Some(pos) = group.iter().position(|id| id.local_id == local_id) {
                group.remove(pos);
                return true;
            }
        }
        false
    }

    /// Look up an object by handle.
    pub fn find(&self, local_id: LocalId) -> Option<MainId> {
        let ids = self.ids.read().ok()?;
        ids.values()
            .flatten()
            .find(|id| id.local_id == local_id)
            .cloned()
    }

    fn modify(&self, local_id: LocalId, apply: impl FnOnce(&mut MainId)) {
        if let Ok(mut ids) = self.ids.write() {
            if let Some(id) = ids
                .values_mut()
                .flatten()
                .find(|id| id.local_id == local_id)
            {
                apply(id);
            }
        }
    }
}

impl MainDatabase for MemoryDatabase {
    fn filepath(&self) -> Option<PathBuf> {
        self.filepath.read().ok().and_then(|p| p.clone())
    }

    fn groups(&self) -> Vec<IdCode> {
        self.ids
            .read()
            .map(|ids| {
                ids.iter()
                    .filter(|(_, group)| !group.is_empty())
                    .map(|(code, _)| *code)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn ids(&self, group: IdCode) -> Vec<MainId> {
        self.ids
            .read()
            .ok()
            .and_then(|ids| ids.get(&group).cloned())
            .unwrap_or_default()
    }
}
