//! Asset-system boundary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use compact_str::CompactString;
use dashmap::DashMap;
use indexmap::IndexMap;

use filebrowse_core::{
    AssetLibraryRef, AssetMetadata, AssetRepresentation, CatalogId, CatalogVisibility, IdCode,
    ListError, LocalId,
};
use filebrowse_order::CatalogFilter;

/// Asset library a list registers its asset entries with.
pub trait AssetLibraryService: Send + Sync {
    /// Load (or reload) the library behind a reference.
    fn load(&self, library: &AssetLibraryRef) -> Result<(), ListError>;

    /// All known catalogs as `(id, path)` pairs.
    fn catalogs(&self) -> Vec<(CatalogId, CompactString)>;

    /// Register an asset read from a container. `relpath` is relative to the library root.
    fn add_external_asset(
        &self,
        relpath: &str,
        name: &str,
        id_code: IdCode,
        metadata: AssetMetadata,
    ) -> Arc<AssetRepresentation>;

    /// Register an asset backed by a live object.
    fn add_local_asset(
        &self,
        relpath: &str,
        name: &str,
        id_code: IdCode,
        metadata: AssetMetadata,
        local_id: LocalId,
    ) -> Arc<AssetRepresentation>;

    /// Unregister an asset. Returns whether it was registered.
    fn remove_asset(&self, asset: &Arc<AssetRepresentation>) -> bool;

    /// Path of a catalog.
    fn find_catalog(&self, id: CatalogId) -> Option<CompactString> {
        self.catalogs()
            .into_iter()
            .find(|(catalog, _)| *catalog == id)
            .map(|(_, path)| path)
    }

    /// Build the catalog filter for one filter pass.
    fn catalog_filter(&self, visibility: CatalogVisibility) -> CatalogFilter {
        let catalogs = self.catalogs();
        CatalogFilter::new(
            visibility,
            catalogs.iter().map(|(id, path)| (*id, path.as_str())),
        )
    }
}

/// [`AssetLibraryService`] kept in memory.
#[derive(Debug, Default)]
pub struct MemoryAssetLibrary {
    catalogs: RwLock<IndexMap<CatalogId, CompactString>>,
    assets: DashMap<CompactString, Arc<AssetRepresentation>>,
    loads: AtomicUsize,
}

impl MemoryAssetLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a catalog with a `/`-separated path.
    pub fn add_catalog(&self, path: impl Into<CompactString>) -> CatalogId {
        let id = CatalogId::new_random();
        if let Ok(mut catalogs) = self.catalogs.write() {
            catalogs.insert(id, path.into());
        }
        id
    }

    /// Number of registered assets.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// How many times the library was loaded.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn register(&self, representation: AssetRepresentation) -> Arc<AssetRepresentation> {
        let representation = Arc::new(representation);
        self.assets
            .insert(representation.relpath.clone(), Arc::clone(&representation));
        representation
    }
}

impl AssetLibraryService for MemoryAssetLibrary {
    fn load(&self, library: &AssetLibraryRef) -> Result<(), ListError> {
        if let Some(root) = library.root() {
            if !root.is_dir() {
                return Err(ListError::NotADirectory { path: root.clone() });
            }
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn catalogs(&self) -> Vec<(CatalogId, CompactString)> {
        self.catalogs
            .read()
            .map(|catalogs| {
                catalogs
                    .iter()
                    .map(|(id, path)| (*id, path.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn add_external_asset(
        &self,
        relpath: &str,
        name: &str,
        id_code: IdCode,
        metadata: AssetMetadata,
    ) -> Arc<AssetRepresentation> {
        self.register(AssetRepresentation {
            name: name.into(),
            id_code,
            metadata,
            relpath: relpath.into(),
            local_id: None,
        })
    }

    fn add_local_asset(
        &self,
        relpath: &str,
        name: &str,
        id_code: IdCode,
        metadata: AssetMetadata,
        local_id: LocalId,
    ) -> Arc<AssetRepresentation> {
        self.register(AssetRepresentation {
            name: name.into(),
            id_code,
            metadata,
            relpath: relpath.into(),
            local_id: Some(local_id),
        })
    }

    fn remove_asset(&self, asset: &Arc<AssetRepresentation>) -> bool {
        self.assets
            .remove_if(&asset.relpath, |_, registered| Arc::ptr_eq(registered, asset))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_remove() {
        let library = MemoryAssetLibrary::new();
        let asset = library.add_external_asset(
            "lib.blend/Material/Wood",
            "Wood",
            IdCode::Material,
            AssetMetadata::default(),
        );
        assert_eq!(library.asset_count(), 1);
        assert!(!asset.is_local());

        assert!(library.remove_asset(&asset));
        assert!(!library.remove_asset(&asset));
        assert_eq!(library.asset_count(), 0);
    }

    #[test]
    fn test_remove_ignores_replaced_asset() {
        let library = MemoryAssetLibrary::new();
        let old = library.add_local_asset("Material/Wood", "Wood", IdCode::Material, AssetMetadata::default(), LocalId(1));
        let new = library.add_local_asset("Material/Wood", "Wood", IdCode::Material, AssetMetadata::default(), LocalId(2));
        assert!(!library.remove_asset(&old));
        assert!(library.remove_asset(&new));
    }

    #[test]
    fn test_catalog_lookup_and_filter() {
        let library = MemoryAssetLibrary::new();
        let materials = library.add_catalog("materials");
        let wood = library.add_catalog("materials/wood");
        assert_eq!(library.find_catalog(wood).as_deref(), Some("materials/wood"));
        assert!(library.find_catalog(CatalogId::new_random()).is_none());

        let filter = library.catalog_filter(CatalogVisibility::Specific(materials));
        assert!(filter.is_visible(Some(&AssetMetadata::in_catalog(wood))));
    }

    #[test]
    fn test_load_counts() {
        let library = MemoryAssetLibrary::new();
        library.load(&AssetLibraryRef::CurrentFile).unwrap();
        library.load(&AssetLibraryRef::CurrentFile).unwrap();
        assert_eq!(library.load_count(), 2);
        assert!(library.load(&AssetLibraryRef::custom("x", "/nonexistent/dir")).is_err());
    }
}
