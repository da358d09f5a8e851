//! List and filter configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::asset::{AssetLibraryRef, CatalogId};
use crate::entry::TypeFlags;
use crate::idcode::IdFilter;

/// Field a list is sorted by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Natural, case-insensitive name order.
    #[default]
    Name,
    /// Newest first.
    Date,
    /// Largest first.
    Size,
    /// By extension, then name.
    #[strum(to_string = "ext", serialize = "extension")]
    Extension,
}

/// What a list enumerates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ListKind {
    /// A plain filesystem directory.
    #[default]
    Directory,
    /// A directory where library containers can be browsed into.
    Library,
    /// An asset library: containers under a root, listed as assets.
    AssetLibrary,
    /// The in-memory database of the current file.
    MainDatabase,
    /// The assets of the in-memory database.
    MainAssets,
}

impl ListKind {
    /// Whether some entries mirror live objects and can be re-read on their own.
    ///
    /// Database listings are always re-read as a whole: their group and `..`
    /// rows carry no live object.
    pub fn uses_main_data(self) -> bool {
        matches!(self, ListKind::AssetLibrary | ListKind::MainAssets)
    }

    /// Whether reads must run on the calling thread.
    pub fn no_threads(self) -> bool {
        matches!(self, ListKind::MainDatabase | ListKind::MainAssets)
    }

    /// Whether library containers are opened during reads.
    pub fn browses_libraries(self) -> bool {
        matches!(self, ListKind::Library | ListKind::AssetLibrary)
    }
}

/// Which asset catalogs pass the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode", content = "catalog")]
pub enum CatalogVisibility {
    /// Any catalog, or none.
    #[default]
    All,
    /// Only assets without a (known) catalog.
    Unassigned,
    /// Assets in the given catalog or one of its children.
    Specific(CatalogId),
}

/// Filter configuration of a list.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct FilterSettings {
    /// Apply the type mask at all.
    pub do_filter: bool,

    /// Hide dot files, `~` backups and entries with the hidden attribute.
    pub hide_dot: bool,

    /// Hide the `..` entry.
    pub hide_parent: bool,

    /// Only show asset datablocks.
    pub assets_only: bool,

    /// Hide group pseudo-directories inside containers. Maintained by the filter pass.
    pub hide_lib_dir: bool,

    /// Accepted entry types.
    pub type_mask: TypeFlags,

    /// Accepted datablock types. Only used when the type mask includes library datablocks.
    pub id_mask: IdFilter,

    /// `;`-separated globs tagging matching files as operator files during reads.
    pub operator_glob: String,

    /// Search pattern, padded with `*` on both sides.
    pub search: String,

    /// Asset catalog filter.
    pub catalog: CatalogVisibility,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            do_filter: false,
            hide_dot: false,
            hide_parent: false,
            assets_only: false,
            hide_lib_dir: false,
            type_mask: TypeFlags::empty(),
            id_mask: IdFilter::ALL,
            operator_glob: String::new(),
            search: String::new(),
            catalog: CatalogVisibility::All,
        }
    }
}

impl FilterSettings {
    /// Create a new filter settings builder.
    pub fn builder() -> FilterSettingsBuilder {
        FilterSettingsBuilder::default()
    }

    /// Pad user search text with `*` on both sides. Empty text stays empty.
    pub fn search_pattern(text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }
        let mut pattern = String::with_capacity(text.len() + 2);
        if !text.starts_with('*') {
            pattern.push('*');
        }
        pattern.push_str(text);
        if !text.ends_with('*') {
            pattern.push('*');
        }
        pattern
    }

    /// Search text with the `*` padding removed.
    pub fn search_text(&self) -> &str {
        self.search.trim_matches('*')
    }

    /// The datablock mask actually in effect.
    pub fn effective_id_mask(&self) -> IdFilter {
        if self.type_mask.contains(TypeFlags::BLENDERLIB) {
            self.id_mask
        } else {
            IdFilter::ALL
        }
    }
}

/// Configuration of a list.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ListConfig {
    /// Root directory (or container path) to list.
    pub root: PathBuf,

    /// What the list enumerates.
    #[builder(default)]
    #[serde(default)]
    pub kind: ListKind,

    /// Recursion levels below the root (0 = off).
    #[builder(default = "0")]
    #[serde(default)]
    pub max_recursion: u32,

    /// Sort field.
    #[builder(default)]
    #[serde(default)]
    pub sort: SortField,

    /// Flip the final sort order.
    #[builder(default = "false")]
    #[serde(default)]
    pub sort_inverted: bool,

    /// Filter configuration.
    #[builder(default)]
    #[serde(default)]
    pub filter: FilterSettings,

    /// Number of rows visible at once; the cache keeps about twice that.
    #[builder(default = "128")]
    #[serde(default = "default_cache_window")]
    pub cache_window: usize,

    /// Generate previews for cached entries.
    #[builder(default = "false")]
    #[serde(default)]
    pub use_previews: bool,

    /// Path of the currently open container, never promoted to a browsable directory.
    #[builder(default)]
    #[serde(default)]
    pub main_filepath: Option<PathBuf>,

    /// Asset library listed by asset-library lists.
    #[builder(default)]
    #[serde(default)]
    pub asset_library: Option<AssetLibraryRef>,
}

fn default_cache_window() -> usize {
    128
}

impl ListConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(0) = self.cache_window {
            return Err("Cache window must be at least one row".to_string());
        }
        if let Some(ListKind::AssetLibrary) = self.kind {
            if !matches!(self.asset_library, Some(Some(_))) {
                return Err("Asset library lists need an asset library reference".to_string());
            }
        }
        Ok(())
    }
}

impl ListConfig {
    /// Create a new list config builder.
    pub fn builder() -> ListConfigBuilder {
        ListConfigBuilder::default()
    }

    /// Create a simple config listing a directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            kind: ListKind::Directory,
            max_recursion: 0,
            sort: SortField::Name,
            sort_inverted: false,
            filter: FilterSettings::default(),
            cache_window: default_cache_window(),
            use_previews: false,
            main_filepath: None,
            asset_library: None,
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
