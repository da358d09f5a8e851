//! The list facade: owns the store, the cache, the read job and the selection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bitflags::bitflags;
use tokio::sync::broadcast;

use filebrowse_cache::{EntryCache, PreviewPipeline, cache_size_for_window};
use filebrowse_core::{
    AssetLibraryRef, AssetRepresentation, CatalogVisibility, DisplayEntry, EntryFlags, EntryStore,
    FilterSettings, InternEntry, ListConfig, ListKind, LocalId, PreviewImage, ReadReport,
    SortField, StoreStats,
};
use filebrowse_order::{CatalogFilter, PreparedFilter, SortOptions, filter_store, sort_store};
use filebrowse_scan::{
    AssetLibraryService, Collaborators, JobState, MergeBatch, ReadJob, ReadProgress, ReadRequest,
    explode_library_path,
};

use crate::icon::{FileIcon, file_icon};
use crate::kind::check_dir;
use crate::selection::{SelectOp, SelectScope, SelectionFlags, SelectionState};

bitflags! {
    /// Lifecycle and dirty flags of a list.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ListFlags: u32 {
        /// Everything must be re-read.
        const FORCE_RESET = 1 << 0;
        /// Only entries backed by live objects must be re-read.
        const FORCE_RESET_MAIN_FILES = 1 << 1;
        /// Reload the asset library on the next read.
        const RELOAD_ASSET_LIBRARY = 1 << 2;
        /// The last read has been merged.
        const IS_READY = 1 << 3;
        /// A read job is running.
        const IS_PENDING = 1 << 4;
        const NEED_SORTING = 1 << 5;
        const NEED_FILTERING = 1 << 6;
    }
}

/// What one [`FileList::update`] tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStatus {
    /// Entries merged from the read job.
    pub merged: usize,
    /// The read job finished and was merged for good.
    pub finished: bool,
    /// Previews were attached to cached entries.
    pub previews_changed: bool,
}

impl UpdateStatus {
    /// Whether anything visible changed.
    pub fn needs_redraw(&self) -> bool {
        self.merged > 0 || self.finished || self.previews_changed
    }
}

/// A browsable list of files, library datablocks or assets.
///
/// All methods run on the owning thread. Reads happen on a background job
/// polled by [`update`](Self::update); the UI then calls
/// [`ensure_files`](Self::ensure_files) to sort and filter, and
/// [`ensure_block`](Self::ensure_block) / [`entry_at`](Self::entry_at) to
/// materialize rows.
pub struct FileList {
    config: ListConfig,
    collaborators: Collaborators,
    store: EntryStore,
    cache: EntryCache,
    previews: Option<PreviewPipeline>,
    selection: SelectionState,
    flags: ListFlags,
    job: Option<ReadJob>,
    read_report: ReadReport,
    asset_library_loaded: bool,
}

impl FileList {
    /// Create a list over the real filesystem.
    pub fn new(config: ListConfig) -> Self {
        Self::with_collaborators(config, Collaborators::new())
    }

    /// Create a list talking to the given collaborators.
    pub fn with_collaborators(config: ListConfig, collaborators: Collaborators) -> Self {
        let cache = EntryCache::new(cache_size_for_window(config.cache_window));
        Self {
            config,
            collaborators,
            store: EntryStore::new(),
            cache,
            previews: None,
            selection: SelectionState::new(),
            flags: ListFlags::FORCE_RESET,
            job: None,
            read_report: ReadReport::new(),
            asset_library_loaded: false,
        }
    }

    /// Attach a preview pipeline. It is enabled through
    /// [`set_use_previews`](Self::set_use_previews) or the configuration.
    pub fn with_previews(mut self, previews: PreviewPipeline) -> Self {
        self.previews = Some(previews);
        self
    }

    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn kind(&self) -> ListKind {
        self.config.kind
    }

    pub fn flags(&self) -> ListFlags {
        self.flags
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn cache(&self) -> &EntryCache {
        &self.cache
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    // Configuration

    /// Change the root. Returns whether the root is valid for the list kind.
    ///
    /// Filesystem roots are corrected to their nearest existing parent unless
    /// the list shows an asset library.
    pub fn set_root(&mut self, path: impl AsRef<Path>) -> bool {
        let do_change = self.config.asset_library.is_none();
        let check = check_dir(
            self.config.kind,
            path.as_ref(),
            do_change,
            self.collaborators.dirs.as_ref(),
        );
        if !check.valid {
            return false;
        }
        if check.path != self.config.root {
            self.config.root = check.path;
            self.flags |= ListFlags::FORCE_RESET;
        }
        true
    }

    /// Change the recursion budget (0 = off).
    pub fn set_recursion(&mut self, max_recursion: u32) {
        if self.config.max_recursion != max_recursion {
            self.config.max_recursion = max_recursion;
            self.flags |= ListFlags::FORCE_RESET;
        }
    }

    /// Switch to another list kind.
    pub fn set_kind(&mut self, kind: ListKind) {
        if self.config.kind != kind {
            self.config.kind = kind;
            self.flags |= ListFlags::FORCE_RESET;
        }
    }

    /// Change the asset library listed by asset kinds.
    pub fn set_asset_library(&mut self, library: Option<AssetLibraryRef>) {
        if self.config.asset_library != library {
            self.config.asset_library = library;
            self.asset_library_loaded = false;
            self.flags |= ListFlags::FORCE_RESET;
        }
    }

    /// Change the path of the currently open container.
    pub fn set_main_filepath(&mut self, path: Option<PathBuf>) {
        if self.config.main_filepath != path {
            self.config.main_filepath = path;
            self.flags |= ListFlags::FORCE_RESET;
        }
    }

    pub fn set_sort(&mut self, field: SortField, inverted: bool) {
        if self.config.sort != field || self.config.sort_inverted != inverted {
            self.config.sort = field;
            self.config.sort_inverted = inverted;
            self.flags |= ListFlags::NEED_SORTING;
        }
    }

    /// Replace the filter settings.
    ///
    /// The search is stored padded with `*`. A new operator glob needs a new
    /// read, since tagging happens while scanning.
    pub fn set_filter(&mut self, mut settings: FilterSettings) {
        settings.search = FilterSettings::search_pattern(&settings.search);
        settings.hide_lib_dir = self.config.filter.hide_lib_dir;

        let current = &self.config.filter;
        let changed = current.do_filter != settings.do_filter
            || current.hide_dot != settings.hide_dot
            || current.hide_parent != settings.hide_parent
            || current.assets_only != settings.assets_only
            || current.type_mask != settings.type_mask
            || current.effective_id_mask() != settings.effective_id_mask()
            || current.search_text() != settings.search_text()
            || current.catalog != settings.catalog;
        let rescan = current.operator_glob != settings.operator_glob;

        self.config.filter = settings;
        if changed {
            self.flags |= ListFlags::NEED_FILTERING;
        }
        if rescan {
            self.flags |= ListFlags::FORCE_RESET;
        }
    }

    /// Change only the search text.
    pub fn set_search(&mut self, text: &str) {
        let mut settings = self.config.filter.clone();
        settings.search = text.to_string();
        self.set_filter(settings);
    }

    /// Change only the asset catalog filter.
    pub fn set_catalog_filter(&mut self, visibility: CatalogVisibility) {
        if self.config.filter.catalog != visibility {
            self.config.filter.catalog = visibility;
            self.flags |= ListFlags::NEED_FILTERING;
        }
    }

    /// Turn previews on or off. Takes effect once the list is ready.
    pub fn set_use_previews(&mut self, enabled: bool) {
        self.config.use_previews = enabled;
        self.sync_previews();
        if let Some(previews) = self.previews.as_mut() {
            previews.request_block(&mut self.cache, &self.config.root);
        }
    }

    /// Change the number of visible rows, resizing the cache.
    pub fn set_cache_window(&mut self, window: usize) {
        self.config.cache_window = window.max(1);
        let size = cache_size_for_window(self.config.cache_window);
        if size != self.cache.size() {
            if let Some(previews) = self.previews.as_mut() {
                previews.clear(&mut self.cache);
            }
            self.cache.resize(size);
        }
    }

    // Reset tags

    pub fn tag_force_reset(&mut self) {
        self.flags |= ListFlags::FORCE_RESET;
    }

    /// Re-read only entries backed by live objects. Ignored by kinds that never list them.
    pub fn tag_force_reset_main_files(&mut self) {
        if self.config.kind.uses_main_data() {
            self.flags |= ListFlags::FORCE_RESET_MAIN_FILES;
        }
    }

    pub fn tag_reload_asset_library(&mut self) {
        self.flags |= ListFlags::RELOAD_ASSET_LIBRARY;
    }

    /// Whether a reset tag is set.
    pub fn needs_force_reset(&self) -> bool {
        self.flags
            .intersects(ListFlags::FORCE_RESET | ListFlags::FORCE_RESET_MAIN_FILES)
    }

    /// Whether a read must be started.
    pub fn needs_reading(&self) -> bool {
        self.store.total().is_none() || self.needs_force_reset()
    }

    pub fn is_ready(&self) -> bool {
        self.flags.contains(ListFlags::IS_READY)
    }

    pub fn is_pending(&self) -> bool {
        self.flags.contains(ListFlags::IS_PENDING)
    }

    /// Whether the asset library was loaded by a previous read.
    pub fn is_asset_library_loaded(&self) -> bool {
        self.asset_library_loaded
    }

    /// Drop what the reset tags invalidate. The tags stay set for the next read.
    pub fn clear_from_reset_tag(&mut self) {
        if self.flags.contains(ListFlags::FORCE_RESET) {
            self.clear();
            return;
        }
        if self.flags.contains(ListFlags::FORCE_RESET_MAIN_FILES) {
            self.clear_main_files();
        }
    }

    /// Drop every entry, the cache and the selection.
    pub fn clear(&mut self) {
        self.job = None;
        self.clear_cache();
        let assets = self.collaborators.assets.clone();
        self.store.clear(|entry| release_asset(&assets, entry));
        self.selection.clear();
        self.asset_library_loaded = false;
        self.read_report = ReadReport::new();
        self.flags.remove(
            ListFlags::NEED_SORTING
                | ListFlags::NEED_FILTERING
                | ListFlags::IS_READY
                | ListFlags::IS_PENDING,
        );
    }

    /// Drop entries backed by live objects. Other entries keep their uid and selection.
    fn clear_main_files(&mut self) {
        if self.store.total().is_none() {
            return;
        }
        let assets = self.collaborators.assets.clone();
        let removed = self
            .store
            .remove_live_object_entries(|entry| release_asset(&assets, entry));
        if removed > 0 {
            self.clear_cache();
            self.flags |= ListFlags::NEED_FILTERING;
            tracing::debug!(target: "filebrowse::list", removed, "live object entries dropped");
        }
    }

    fn clear_cache(&mut self) {
        if let Some(previews) = self.previews.as_mut() {
            previews.clear(&mut self.cache);
        }
        self.cache.clear();
    }

    // Reading

    /// Stop a stale read, clear what the reset tags invalidate and start a
    /// new read when one is needed. Returns whether a read was started.
    pub fn refresh(&mut self) -> bool {
        if self.needs_force_reset() {
            self.stop_read();
            self.clear_from_reset_tag();
        }
        if self.needs_reading() && !self.is_pending() {
            return self.start_read();
        }
        false
    }

    /// Start a read job. Returns `false` when the root is not valid.
    ///
    /// Database listings and live-object-only re-reads run inline and are
    /// merged before this returns.
    pub fn start_read(&mut self) -> bool {
        let check = check_dir(
            self.config.kind,
            &self.config.root,
            false,
            self.collaborators.dirs.as_ref(),
        );
        if !check.valid {
            tracing::warn!(
                target: "filebrowse::list",
                root = %self.config.root.display(),
                kind = %self.config.kind,
                "invalid root, read not started"
            );
            return false;
        }
        self.job = None;

        let only_main_data = self.flags.contains(ListFlags::FORCE_RESET_MAIN_FILES)
            && !self.flags.contains(ListFlags::FORCE_RESET)
            && self.store.total().is_some();
        let load_asset_library =
            !self.asset_library_loaded || self.flags.contains(ListFlags::RELOAD_ASSET_LIBRARY);

        self.flags.remove(
            ListFlags::FORCE_RESET
                | ListFlags::FORCE_RESET_MAIN_FILES
                | ListFlags::RELOAD_ASSET_LIBRARY
                | ListFlags::IS_READY,
        );
        self.flags |= ListFlags::IS_PENDING;

        let mut request = ReadRequest::from_config(&self.config);
        request.only_main_data = only_main_data;
        request.load_asset_library = load_asset_library;
        let inline = request.runs_inline();

        tracing::debug!(
            target: "filebrowse::list",
            root = %self.config.root.display(),
            only_main_data,
            inline,
            "starting read"
        );
        self.job = Some(ReadJob::start(
            request,
            self.collaborators.clone(),
            self.store.max_uid(),
        ));
        if inline {
            self.finish_read();
        }
        true
    }

    /// Refresh, then block until the read is merged.
    pub fn read_blocking(&mut self) -> bool {
        let started = self.refresh();
        if let Some(job) = self.job.as_mut() {
            job.wait();
        }
        self.update();
        started
    }

    /// Ask the running job to stop at its next directory boundary.
    pub fn cancel_read(&self) {
        if let Some(job) = &self.job {
            job.cancel();
        }
    }

    /// Cancel the running job, wait for it and merge what it produced.
    pub fn stop_read(&mut self) {
        if let Some(job) = &self.job {
            job.cancel();
            self.finish_read();
        }
    }

    /// State of the current read job, if any.
    pub fn job_state(&self) -> Option<JobState> {
        self.job.as_ref().map(ReadJob::state)
    }

    /// Directories the running read still has to visit.
    pub fn pending_dirs(&self) -> usize {
        self.job.as_ref().map_or(0, ReadJob::pending_dirs)
    }

    /// Subscribe to progress of the running read.
    pub fn subscribe_progress(&self) -> Option<broadcast::Receiver<ReadProgress>> {
        self.job.as_ref().map(ReadJob::subscribe)
    }

    /// Warnings of the last finished read.
    pub fn read_report(&self) -> &ReadReport {
        &self.read_report
    }

    /// Poll the read job and the preview pipeline.
    pub fn update(&mut self) -> UpdateStatus {
        let mut status = UpdateStatus::default();

        let polled = self.job.as_ref().map(|job| (job.is_done(), job.take_batch()));
        if let Some((done, batch)) = polled {
            status.merged = self.merge(batch);
            if done {
                status.merged += self.finish_read();
                status.finished = true;
            }
        }

        if let Some(previews) = self.previews.as_mut() {
            status.previews_changed = previews.update(&mut self.cache);
        }
        status
    }

    /// Move a batch into the store. Returns the number of new entries.
    fn merge(&mut self, batch: MergeBatch) -> usize {
        let count = batch.entries.len();
        if count > 0 {
            // Uids stay valid, so the selection survives.
            self.clear_cache();
            self.store.append(batch.entries);
            self.flags |= ListFlags::NEED_SORTING | ListFlags::NEED_FILTERING;
            tracing::trace!(target: "filebrowse::list", count, "merged entries");
        }
        self.store.raise_uid(batch.last_uid);
        self.store.mark_read();
        if batch.asset_library_loaded {
            self.asset_library_loaded = true;
        }
        count
    }

    /// Final merge of the current job.
    fn finish_read(&mut self) -> usize {
        let Some(mut job) = self.job.take() else {
            return 0;
        };
        job.wait();
        let partial = job.is_partial();
        let merged = job.finish().map_or(0, |batch| self.merge(batch));
        self.read_report = job.report();

        if self.store.filtered_count().is_none() {
            self.flags |= ListFlags::NEED_FILTERING;
        }
        self.flags.remove(ListFlags::IS_PENDING);
        self.flags |= ListFlags::IS_READY;
        tracing::debug!(
            target: "filebrowse::list",
            total = self.store.len(),
            partial,
            warnings = self.read_report.warnings.len(),
            cancelled = self.read_report.cancelled,
            "read finished"
        );
        merged
    }

    // Sorting and filtering

    /// Sort and filter as needed. Returns the filtered count.
    pub fn ensure_files(&mut self) -> usize {
        if !self.needs_force_reset() || !self.needs_reading() {
            self.sort();
            self.filter();
        }
        self.count()
    }

    /// Filtered count, 0 until the first filter pass.
    pub fn count(&self) -> usize {
        self.store.filtered_count().unwrap_or(0)
    }

    fn sort(&mut self) {
        if !self.flags.contains(ListFlags::NEED_SORTING) {
            return;
        }
        sort_store(
            &mut self.store,
            SortOptions::new(self.config.sort, self.config.sort_inverted),
        );
        self.flags.remove(ListFlags::NEED_SORTING);
        self.flags |= ListFlags::NEED_FILTERING;
    }

    fn filter(&mut self) {
        if self.store.total().is_none() || !self.flags.contains(ListFlags::NEED_FILTERING) {
            return;
        }
        self.config.filter.hide_lib_dir = self.config.max_recursion > 0 && !self.is_library();

        let mut prepared = PreparedFilter::new(&self.config.filter);
        if matches!(self.config.kind, ListKind::AssetLibrary | ListKind::MainAssets) {
            let visibility = self.config.filter.catalog;
            let catalog = match &self.collaborators.assets {
                Some(assets) => assets.catalog_filter(visibility),
                None => CatalogFilter::new(visibility, std::iter::empty()),
            };
            prepared = prepared.with_catalog(catalog);
        }

        let count = filter_store(&mut self.store, self.config.kind, &prepared);
        self.flags.remove(ListFlags::NEED_FILTERING);
        self.clear_cache();
        tracing::trace!(
            target: "filebrowse::list",
            count,
            total = self.store.len(),
            "filtered entries"
        );
    }

    /// Whether the root points into a library container or the list shows an asset library.
    pub fn is_library(&self) -> bool {
        self.config.asset_library.is_some() || explode_library_path(&self.config.root).is_some()
    }

    // Rows

    /// Materialize the row at a filtered index.
    pub fn entry_at(&mut self, index: usize) -> Option<&DisplayEntry> {
        self.cache
            .get(&self.store, index, true)
            .map(|entry| &*entry)
    }

    /// Move the cache block around `index` and queue previews for it.
    ///
    /// Returns `false` when `index` is out of range.
    pub fn ensure_block(&mut self, index: usize) -> bool {
        self.sync_previews();
        let Some(change) = self.cache.ensure_block(&self.store, index) else {
            return false;
        };
        if let Some(previews) = self.previews.as_mut() {
            previews.on_block_change(&mut self.cache, change, &self.config.root);
        }
        true
    }

    fn sync_previews(&mut self) {
        let ready = self.is_ready();
        if let Some(previews) = self.previews.as_mut() {
            previews.set_enabled(self.config.use_previews, ready, &mut self.cache);
        }
    }

    /// Icon of the row at `index`.
    pub fn icon_for(&mut self, index: usize) -> Option<FileIcon> {
        self.entry_at(index).and_then(|entry| file_icon(entry, true))
    }

    /// Preview image attached to the row at `index`.
    pub fn preview_image(&mut self, index: usize) -> Option<Arc<PreviewImage>> {
        self.entry_at(index)
            .and_then(|entry| entry.preview.as_ref())
            .and_then(|handle| handle.image())
    }

    /// Whether a preview for the row at `index` may still arrive.
    pub fn is_preview_pending(&self, index: usize) -> bool {
        !self.is_ready()
            || self
                .cache
                .peek(index)
                .is_some_and(|entry| entry.flags.contains(EntryFlags::PREVIEW_LOADING))
    }

    /// Whether every queued preview has been attached.
    pub fn previews_done(&self) -> bool {
        self.previews.as_ref().is_none_or(|previews| previews.pending() == 0)
    }

    // Selection

    /// Apply a selection change to the row at `index` and return its new flags.
    pub fn select(
        &mut self,
        index: usize,
        op: SelectOp,
        flag: SelectionFlags,
        scope: SelectScope,
    ) -> SelectionFlags {
        let Some(entry) = self.store.filtered_entry(index) else {
            return SelectionFlags::empty();
        };
        self.selection
            .set(entry.uid, entry.is_dir(), op, flag, scope)
    }

    /// Apply a selection change to an inclusive range of rows.
    pub fn select_range(
        &mut self,
        first: usize,
        last: usize,
        op: SelectOp,
        flag: SelectionFlags,
        scope: SelectScope,
    ) {
        let count = self.count();
        if first >= count || last >= count {
            return;
        }
        for index in first.min(last)..=first.max(last) {
            self.select(index, op, flag, scope);
        }
    }

    /// Apply a selection change to the `..` row, if shown.
    pub fn select_parent(&mut self, op: SelectOp, flag: SelectionFlags) {
        if self.config.filter.hide_parent {
            return;
        }
        let is_parent = self
            .store
            .filtered_entry(0)
            .is_some_and(|entry| entry.relpath == "..");
        if is_parent {
            self.select(0, op, flag, SelectScope::All);
        }
    }

    /// Selection flags of the row at `index`.
    pub fn select_get(&self, index: usize, scope: SelectScope) -> SelectionFlags {
        self.store
            .filtered_entry(index)
            .map(|entry| self.selection.get(entry.uid, entry.is_dir(), scope))
            .unwrap_or_default()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.store
            .filtered_entry(index)
            .is_some_and(|entry| self.selection.is_selected(entry.uid))
    }

    /// Filtered indices carrying `flag`.
    pub fn selected_indices(&self, flag: SelectionFlags) -> Vec<usize> {
        (0..self.count())
            .filter(|&index| self.select_get(index, SelectScope::All).contains(flag))
            .collect()
    }

    // Path queries

    /// Filtered index of the entry with this relative path.
    pub fn find_path(&self, relpath: &str) -> Option<usize> {
        let relpath = relpath.trim_end_matches('/');
        self.store
            .iter_filtered()
            .position(|entry| entry.relpath.trim_end_matches('/') == relpath)
    }

    /// Filtered index of the entry mirroring a live object.
    pub fn find_local_id(&self, local_id: LocalId) -> Option<usize> {
        self.store
            .iter_filtered()
            .position(|entry| entry.local_id == Some(local_id))
    }

    pub fn relpath_at(&self, index: usize) -> Option<&str> {
        self.store
            .filtered_entry(index)
            .map(|entry| entry.relpath.as_str())
    }

    /// Absolute path of the row at `index`.
    pub fn full_path(&self, index: usize) -> Option<PathBuf> {
        self.relpath_at(index)
            .map(|relpath| self.config.root.join(relpath.trim_end_matches('/')))
    }

    pub fn local_id_at(&self, index: usize) -> Option<LocalId> {
        self.store.filtered_entry(index).and_then(|entry| entry.local_id)
    }

    pub fn asset_at(&self, index: usize) -> Option<Arc<AssetRepresentation>> {
        self.store
            .filtered_entry(index)
            .and_then(|entry| entry.asset.clone())
    }

    /// Statistics over all raw entries.
    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }
}

fn release_asset(assets: &Option<Arc<dyn AssetLibraryService>>, entry: InternEntry) {
    if let (Some(service), Some(asset)) = (assets, &entry.asset) {
        service.remove_asset(asset);
    }
}

impl Drop for FileList {
    fn drop(&mut self) {
        self.job = None;
        if let Some(previews) = self.previews.as_mut() {
            previews.free(&mut self.cache);
        }
        let assets = self.collaborators.assets.clone();
        self.store.clear(|entry| release_asset(&assets, entry));
    }
}

impl std::fmt::Debug for FileList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileList")
            .field("root", &self.config.root)
            .field("kind", &self.config.kind)
            .field("flags", &self.flags)
            .field("total", &self.store.total())
            .field("filtered", &self.store.filtered_count())
            .field("job", &self.job)
            .finish_non_exhaustive()
    }
}
