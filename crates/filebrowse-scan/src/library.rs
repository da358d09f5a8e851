//! Library-container boundary.
//!
//! A container holds datablocks sorted into groups (one per [`IdCode`]). The
//! scan only needs two enumerations from it: the non-empty groups, and the
//! datablocks of one group.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use compact_str::CompactString;
use dashmap::DashMap;
use indexmap::IndexMap;

use filebrowse_core::{AssetMetadata, IdCode, ListError};

use crate::classify::is_library_container;

/// A path pointing into a library container, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPath {
    /// The container file.
    pub container: PathBuf,
    /// Group name inside the container, e.g. `Material`.
    pub group: Option<CompactString>,
    /// Datablock name inside the group. May itself contain `/`.
    pub name: Option<CompactString>,
}

impl LibraryPath {
    /// The datablock type of the group, if the group name is known.
    pub fn id_code(&self) -> Option<IdCode> {
        self.group.as_deref().and_then(IdCode::from_group_name)
    }
}

/// Split a path such as `/x/lib.blend/Material/Mat.001` into container, group and name.
///
/// Purely lexical: returns `None` when no path component looks like a container.
pub fn explode_library_path(path: &Path) -> Option<LibraryPath> {
    let text = path.to_string_lossy();
    let text = text.trim_end_matches('/');

    let ends = text
        .match_indices('/')
        .map(|(pos, _)| pos)
        .chain(std::iter::once(text.len()));
    for end in ends {
        let prefix = &text[..end];
        let last = prefix.rsplit('/').next().unwrap_or(prefix);
        if last.is_empty() || !is_library_container(last) {
            continue;
        }

        let rest = text[end..].trim_start_matches('/');
        let (group, name) = match rest.split_once('/') {
            Some((group, name)) => (group, name),
            None => (rest, ""),
        };
        let non_empty = |s: &str| (!s.is_empty()).then(|| CompactString::from(s));
        return Some(LibraryPath {
            container: PathBuf::from(prefix),
            group: non_empty(group),
            name: non_empty(name),
        });
    }
    None
}

/// One datablock as reported by a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatablockInfo {
    /// Datablock name, without group prefix.
    pub name: CompactString,
    /// Asset metadata, when the datablock is marked as an asset.
    pub asset: Option<AssetMetadata>,
    /// Whether the container stores a preview for this datablock.
    pub has_preview: bool,
}

impl DatablockInfo {
    /// A datablock with a stored preview and no asset metadata.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            asset: None,
            has_preview: true,
        }
    }

    /// Mark the datablock as an asset.
    pub fn with_asset(mut self, metadata: AssetMetadata) -> Self {
        self.asset = Some(metadata);
        self
    }

    /// Mark the datablock as having no stored preview.
    pub fn without_preview(mut self) -> Self {
        self.has_preview = false;
        self
    }
}

/// An open container. Dropping the handle closes it.
pub trait LibraryHandle: Send {
    /// Groups that hold at least one datablock, in container order.
    fn groups(&self) -> Vec<IdCode>;

    /// Datablocks of one group. With `assets_only`, only those with asset metadata.
    fn datablocks(&self, group: IdCode, assets_only: bool) -> Vec<DatablockInfo>;
}

/// Opens library containers.
pub trait LibraryReader: Send + Sync {
    /// Open a container file.
    fn open(&self, container: &Path) -> Result<Box<dyn LibraryHandle>, ListError>;
}

/// Contents of an in-memory container.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    groups: IndexMap<IdCode, Vec<DatablockInfo>>,
}

impl MemoryContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a datablock to a group.
    pub fn with(mut self, group: IdCode, datablock: DatablockInfo) -> Self {
        self.add(group, datablock);
        self
    }

    /// Add a datablock to a group.
    pub fn add(&mut self, group: IdCode, datablock: DatablockInfo) {
        self.groups.entry(group).or_default().push(datablock);
    }
}

impl LibraryHandle for Arc<MemoryContainer> {
    fn groups(&self) -> Vec<IdCode> {
        self.groups
            .iter()
            .filter(|(_, blocks)| !blocks.is_empty())
            .map(|(code, _)| *code)
            .collect()
    }

    fn datablocks(&self, group: IdCode, assets_only: bool) -> Vec<DatablockInfo> {
        self.groups
            .get(&group)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| !assets_only || b.asset.is_some())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// [`LibraryReader`] serving registered in-memory containers.
///
/// Opening a path that was never registered fails, so an empty reader treats
/// every container as unreadable.
#[derive(Debug, Default)]
pub struct MemoryLibraryReader {
    containers: DashMap<PathBuf, Result<Arc<MemoryContainer>, String>>,
}

impl MemoryLibraryReader {
    /// Create a reader with no containers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a readable container.
    pub fn insert(&self, path: impl Into<PathBuf>, container: MemoryContainer) {
        self.containers.insert(path.into(), Ok(Arc::new(container)));
    }

    /// Register a container that fails to open with the given reason.
    pub fn insert_corrupt(&self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.containers.insert(path.into(), Err(reason.into()));
    }
}

impl LibraryReader for MemoryLibraryReader {
    fn open(&self, container: &Path) -> Result<Box<dyn LibraryHandle>, ListError> {
        match self.containers.get(container).as_deref() {
            Some(Ok(contents)) => Ok(Box::new(Arc::clone(contents))),
            Some(Err(reason)) => Err(ListError::library_open(container, reason.clone())),
            None => Err(ListError::library_open(container, "unknown container")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explode_full_path() {
        let parts = explode_library_path(Path::new("/x/lib.blend/Material/Mat.001")).unwrap();
        assert_eq!(parts.container, PathBuf::from("/x/lib.blend"));
        assert_eq!(parts.group.as_deref(), Some("Material"));
        assert_eq!(parts.name.as_deref(), Some("Mat.001"));
        assert_eq!(parts.id_code(), Some(IdCode::Material));
    }

    #[test]
    fn test_explode_partial_paths() {
        let parts = explode_library_path(Path::new("/x/lib.blend/")).unwrap();
        assert_eq!(parts.container, PathBuf::from("/x/lib.blend"));
        assert!(parts.group.is_none());
        assert!(parts.name.is_none());

        let parts = explode_library_path(Path::new("/x/lib.blend/Object/")).unwrap();
        assert_eq!(parts.group.as_deref(), Some("Object"));
        assert!(parts.name.is_none());

        let parts = explode_library_path(Path::new("/x/lib.blend/Object/a/b")).unwrap();
        assert_eq!(parts.name.as_deref(), Some("a/b"));
    }

    #[test]
    fn test_explode_plain_paths() {
        assert!(explode_library_path(Path::new("/x/y/z.txt")).is_none());
        assert!(explode_library_path(Path::new("/")).is_none());
    }

    #[test]
    fn test_memory_reader() {
        let reader = MemoryLibraryReader::new();
        reader.insert(
            "/x/lib.blend",
            MemoryContainer::new()
                .with(IdCode::Material, DatablockInfo::new("Wood"))
                .with(IdCode::Material, DatablockInfo::new("Steel").with_asset(AssetMetadata::default())),
        );
        reader.insert_corrupt("/x/bad.blend", "truncated header");

        let handle = reader.open(Path::new("/x/lib.blend")).unwrap();
        assert_eq!(handle.groups(), vec![IdCode::Material]);
        assert_eq!(handle.datablocks(IdCode::Material, false).len(), 2);
        assert_eq!(handle.datablocks(IdCode::Material, true).len(), 1);
        assert!(handle.datablocks(IdCode::Mesh, false).is_empty());

        let err = reader.open(Path::new("/x/bad.blend")).err().unwrap();
        assert!(err.to_string().contains("truncated header"));
        assert!(reader.open(Path::new("/x/other.blend")).is_err());
    }
}
