//! Asset catalog membership filter.

use std::collections::HashSet;

use filebrowse_core::{AssetMetadata, CatalogId, CatalogVisibility};

/// Catalog membership test, computed once per filter pass.
///
/// For a specific catalog, the accepted set also contains every catalog whose
/// path lies below it.
#[derive(Debug, Clone)]
pub struct CatalogFilter {
    visibility: CatalogVisibility,
    accepted: HashSet<CatalogId>,
    known: HashSet<CatalogId>,
}

impl CatalogFilter {
    /// Build a filter from the catalogs known to an asset library.
    pub fn new<'a>(
        visibility: CatalogVisibility,
        catalogs: impl IntoIterator<Item = (CatalogId, &'a str)>,
    ) -> Self {
        let catalogs: Vec<(CatalogId, &str)> = catalogs.into_iter().collect();
        let known = catalogs.iter().map(|(id, _)| *id).collect();

        let mut accepted = HashSet::new();
        if let CatalogVisibility::Specific(target) = visibility {
            accepted.insert(target);
            let parent = catalogs
                .iter()
                .find(|(id, _)| *id == target)
                .map(|(_, path)| path.trim_end_matches('/'));
            if let Some(parent) = parent {
                for (id, path) in &catalogs {
                    if is_descendant(path, parent) {
                        accepted.insert(*id);
                    }
                }
            }
        }

        Self {
            visibility,
            accepted,
            known,
        }
    }

    /// Visibility this filter was built for.
    pub fn visibility(&self) -> CatalogVisibility {
        self.visibility
    }

    /// Whether an asset with the given metadata is visible.
    ///
    /// Entries without asset metadata only pass the "all" filter.
    pub fn is_visible(&self, metadata: Option<&AssetMetadata>) -> bool {
        match self.visibility {
            CatalogVisibility::All => true,
            CatalogVisibility::Unassigned => match metadata.and_then(|m| m.catalog_id) {
                None => true,
                Some(id) => !self.known.contains(&id),
            },
            CatalogVisibility::Specific(_) => metadata
                .and_then(|m| m.catalog_id)
                .is_some_and(|id| self.accepted.contains(&id)),
        }
    }
}

fn is_descendant(path: &str, parent: &str) -> bool {
    path.strip_prefix(parent)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogs() -> (CatalogId, CatalogId, CatalogId, Vec<(CatalogId, String)>) {
        let materials = CatalogId::new_random();
        let wood = CatalogId::new_random();
        let props = CatalogId::new_random();
        let list = vec![
            (materials, "materials".to_string()),
            (wood, "materials/wood".to_string()),
            (props, "materials-extra/props".to_string()),
        ];
        (materials, wood, props, list)
    }

    #[test]
    fn test_all_accepts_everything() {
        let filter = CatalogFilter::new(CatalogVisibility::All, std::iter::empty());
        assert!(filter.is_visible(None));
        assert!(filter.is_visible(Some(&AssetMetadata::in_catalog(CatalogId::new_random()))));
    }

    #[test]
    fn test_unassigned() {
        let (materials, _, _, list) = catalogs();
        let filter = CatalogFilter::new(
            CatalogVisibility::Unassigned,
            list.iter().map(|(id, p)| (*id, p.as_str())),
        );
        assert!(filter.is_visible(None));
        assert!(filter.is_visible(Some(&AssetMetadata::default())));
        assert!(filter.is_visible(Some(&AssetMetadata::in_catalog(CatalogId::new_random()))));
        assert!(!filter.is_visible(Some(&AssetMetadata::in_catalog(materials))));
    }

    #[test]
    fn test_specific_includes_children_only() {
        let (materials, wood, props, list) = catalogs();
        let filter = CatalogFilter::new(
            CatalogVisibility::Specific(materials),
            list.iter().map(|(id, p)| (*id, p.as_str())),
        );
        assert!(filter.is_visible(Some(&AssetMetadata::in_catalog(materials))));
        assert!(filter.is_visible(Some(&AssetMetadata::in_catalog(wood))));
        assert!(!filter.is_visible(Some(&AssetMetadata::in_catalog(props))));
        assert!(!filter.is_visible(None));
    }
}
