//! Asset metadata as seen by the lister.
//!
//! Only the fields needed for filtering, sorting and display are modelled here.

use std::fmt;
use std::path::PathBuf;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::LocalId;
use crate::idcode::IdCode;

/// Identifier of an asset catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogId(pub Uuid);

impl CatalogId {
    /// Generate a fresh random catalog id.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Metadata attached to a datablock that is marked as an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Catalog the asset is assigned to.
    #[serde(default)]
    pub catalog_id: Option<CatalogId>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<CompactString>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl AssetMetadata {
    /// Metadata assigned to the given catalog.
    pub fn in_catalog(catalog_id: CatalogId) -> Self {
        Self {
            catalog_id: Some(catalog_id),
            ..Default::default()
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<CompactString>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// An asset registered with an asset library on behalf of a listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRepresentation {
    /// Asset name (datablock name without group prefix).
    pub name: CompactString,
    /// Datablock type.
    pub id_code: IdCode,
    /// Asset metadata.
    pub metadata: AssetMetadata,
    /// Path relative to the asset library root, `container/Group/name`.
    pub relpath: CompactString,
    /// Live object backing a local asset.
    pub local_id: Option<LocalId>,
}

impl AssetRepresentation {
    /// Whether the asset lives in the currently open file rather than an external container.
    pub fn is_local(&self) -> bool {
        self.local_id.is_some()
    }
}

/// Reference to an asset library to list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetLibraryRef {
    /// The assets of the currently open file.
    CurrentFile,
    /// A library rooted at a directory on disk.
    Custom {
        /// Display name of the library.
        name: String,
        /// Root directory.
        root: PathBuf,
    },
}

impl AssetLibraryRef {
    /// Create a reference to an on-disk library.
    pub fn custom(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::Custom {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Root directory of the library, if it has one.
    pub fn root(&self) -> Option<&PathBuf> {
        match self {
            Self::CurrentFile => None,
            Self::Custom { root, .. } => Some(root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let cat = CatalogId::new_random();
        let meta = AssetMetadata::in_catalog(cat).with_tag("wood");
        assert_eq!(meta.catalog_id, Some(cat));
        assert_eq!(meta.tags, vec![CompactString::from("wood")]);
    }

    #[test]
    fn test_library_ref_root() {
        assert!(AssetLibraryRef::CurrentFile.root().is_none());
        let lib = AssetLibraryRef::custom("props", "/assets/props");
        assert_eq!(lib.root(), Some(&PathBuf::from("/assets/props")));
    }
}
