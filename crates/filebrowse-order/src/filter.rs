//! Entry filter predicates and the filter pass.

use globset::{GlobBuilder, GlobMatcher};

use filebrowse_core::{
    EntryStore, FileAttributes, FilterSettings, IdFilter, InternEntry, ListKind, TypeFlags,
};

use crate::catalog::CatalogFilter;

/// Filter settings compiled for one filter pass.
#[derive(Debug, Clone)]
pub struct PreparedFilter {
    settings: FilterSettings,
    id_mask: IdFilter,
    search_glob: Option<GlobMatcher>,
    search_text: String,
    catalog: Option<CatalogFilter>,
}

impl PreparedFilter {
    /// Compile the given settings.
    pub fn new(settings: &FilterSettings) -> Self {
        let search_text = settings.search_text().to_lowercase();
        let search_glob = if settings.search.is_empty() {
            None
        } else {
            compile_search(&settings.search)
        };
        Self {
            id_mask: settings.effective_id_mask(),
            settings: settings.clone(),
            search_glob,
            search_text,
            catalog: None,
        }
    }

    /// Attach a catalog filter used by asset predicates.
    pub fn with_catalog(mut self, catalog: CatalogFilter) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// The compiled settings.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Whether the entry is hidden by the hidden-file rules.
    pub fn is_hidden(&self, entry: &InternEntry) -> bool {
        let relpath = entry.relpath.as_str();
        if relpath == "." {
            return true;
        }
        if self.settings.hide_parent && relpath == ".." {
            return true;
        }
        if self.settings.hide_dot
            && (entry.attributes.contains(FileAttributes::HIDDEN) || is_hidden_dot_path(relpath))
        {
            return true;
        }
        // Datablocks (not their group directories) must be assets in assets-only mode.
        self.settings.assets_only
            && !entry.is_dir()
            && entry.typeflag.contains(TypeFlags::BLENDERLIB)
            && !entry.typeflag.contains(TypeFlags::ASSET)
    }

    /// Hidden rules plus type mask.
    pub fn passes_type(&self, entry: &InternEntry) -> bool {
        if self.is_hidden(entry) || entry.is_current_or_parent() {
            return false;
        }
        let mask = self.settings.type_mask;
        if !self.settings.do_filter || mask.is_empty() {
            return true;
        }
        if entry.is_dir() {
            if entry
                .typeflag
                .intersects(TypeFlags::BLENDERLIB | TypeFlags::ANY_BLENDER)
            {
                mask.intersects(TypeFlags::ANY_BLENDER)
            } else {
                mask.contains(TypeFlags::FOLDER)
            }
        } else {
            entry.typeflag.intersects(mask)
        }
    }

    /// Type mask plus the datablock type mask.
    pub fn passes_id_type(&self, entry: &InternEntry) -> bool {
        if !self.passes_type(entry) {
            return false;
        }
        if !self.settings.do_filter {
            return true;
        }
        match entry.id_code {
            Some(code) => {
                let is_group = entry.is_dir() && entry.typeflag.contains(TypeFlags::BLENDERLIB);
                if is_group && self.settings.hide_lib_dir {
                    return false;
                }
                self.id_mask.accepts(code)
            }
            None => true,
        }
    }

    /// Search pattern against the relative path. Empty search matches.
    pub fn matches_relpath(&self, entry: &InternEntry) -> bool {
        self.matches_search(&entry.relpath)
    }

    /// Search pattern against the display name. Empty search matches.
    pub fn matches_name(&self, entry: &InternEntry) -> bool {
        self.matches_search(&entry.name)
    }

    fn matches_search(&self, text: &str) -> bool {
        if self.settings.search.is_empty() {
            return true;
        }
        match &self.search_glob {
            Some(glob) => glob.is_match(text),
            None => text.to_lowercase().contains(&self.search_text),
        }
    }

    /// Catalog membership plus a name or tag substring match.
    pub fn passes_asset(&self, entry: &InternEntry) -> bool {
        let metadata = entry.asset.as_ref().map(|a| &a.metadata);
        if let Some(catalog) = &self.catalog {
            if !catalog.is_visible(metadata) {
                return false;
            }
        }
        if self.search_text.is_empty() {
            return true;
        }
        if entry.name.to_lowercase().contains(&self.search_text) {
            return true;
        }
        metadata.is_some_and(|m| {
            m.tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(&self.search_text))
        })
    }

    /// Library listing: datablocks checked against the id mask, then the path search.
    fn passes_library(&self, entry: &InternEntry) -> bool {
        let typed = if entry.typeflag.contains(TypeFlags::BLENDERLIB) {
            self.passes_id_type(entry)
        } else {
            self.passes_type(entry)
        };
        typed && self.matches_relpath(entry)
    }

    fn passes_main_assets(&self, entry: &InternEntry) -> bool {
        self.passes_id_type(entry) && self.passes_asset(entry)
    }

    /// Whether an entry is shown by a list of the given kind.
    pub fn accepts(&self, kind: ListKind, entry: &InternEntry) -> bool {
        match kind {
            ListKind::Directory => {
                self.passes_type(entry) && (self.matches_relpath(entry) || self.matches_name(entry))
            }
            ListKind::Library => self.passes_library(entry),
            ListKind::MainDatabase => !self.is_hidden(entry),
            ListKind::MainAssets => self.passes_main_assets(entry),
            ListKind::AssetLibrary => {
                if entry.is_main_file() {
                    self.passes_main_assets(entry)
                } else {
                    let typed = if entry.typeflag.contains(TypeFlags::BLENDERLIB) {
                        self.passes_id_type(entry)
                    } else {
                        self.passes_type(entry)
                    };
                    typed && self.passes_asset(entry)
                }
            }
        }
    }
}

/// Rebuild the filtered array of a store and return the new filtered count.
pub fn filter_store(store: &mut EntryStore, kind: ListKind, filter: &PreparedFilter) -> usize {
    let indices: Vec<usize> = store
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| filter.accepts(kind, entry))
        .map(|(index, _)| index)
        .collect();
    let count = indices.len();
    tracing::trace!(
        target: "filebrowse::list",
        %kind,
        total = store.len(),
        filtered = count,
        "filtered entries"
    );
    store.set_filtered(indices);
    count
}

/// Whether any component of a relative path is a dot file or a `~` backup.
///
/// `.` and `..` components, and names starting with `..`, do not count as hidden.
pub fn is_hidden_dot_path(relpath: &str) -> bool {
    relpath.split('/').any(|component| {
        let mut chars = component.chars();
        let dotted = chars.next() == Some('.') && !matches!(chars.next(), None | Some('.'));
        dotted || component.ends_with('~')
    })
}

fn compile_search(pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
    {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(err) => {
            tracing::debug!(
                target: "filebrowse::list",
                pattern,
                error = %err,
                "invalid search pattern, using substring match"
            );
            None
        }
    }
}
