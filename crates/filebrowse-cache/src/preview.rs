//! Background preview generation for cached entries.
//!
//! Requests go to a lazily created rayon pool; results come back through an
//! unbounded channel drained by [`PreviewPipeline::update`] on the thread that
//! owns the cache. Each clear bumps a generation counter so results of
//! abandoned requests are dropped instead of attached.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use filebrowse_core::{DisplayEntry, EntryFlags, FileUid, IconHandle, IconRegistry, TypeFlags};
use tokio::sync::mpsc;

use crate::cache::{BlockChange, EntryCache};
use crate::thumbnail::{ThumbnailKind, ThumbnailSource};

/// Default number of preview worker threads.
pub const DEFAULT_PREVIEW_THREADS: usize = 4;

/// Whether a preview may be requested for `entry`.
///
/// Cheap checks only: entries already loading or known to fail, types without
/// thumbnails, datablocks whose container has no stored preview, and library
/// entries that are also directories are skipped.
pub fn is_preview_candidate(entry: &DisplayEntry) -> bool {
    if entry
        .flags
        .intersects(EntryFlags::INVALID_PREVIEW | EntryFlags::PREVIEW_LOADING)
    {
        return false;
    }
    if !entry.typeflag.intersects(TypeFlags::PREVIEWABLE) {
        return false;
    }
    if entry.typeflag.contains(TypeFlags::BLENDERLIB)
        && entry.flags.contains(EntryFlags::BLENDERLIB_NO_PREVIEW)
    {
        return false;
    }
    !entry.typeflag.contains(TypeFlags::BLENDERLIB | TypeFlags::DIR)
}

/// Path a thumbnail of `entry` is generated from.
pub fn preview_path(root: &Path, entry: &DisplayEntry) -> PathBuf {
    match &entry.redirection {
        Some(target) => target.clone(),
        None => root.join(entry.relpath.trim_end_matches('/')),
    }
}

struct PreviewDone {
    uid: FileUid,
    generation: u64,
    icon: Option<IconHandle>,
}

struct Running {
    pool: rayon::ThreadPool,
    done_tx: mpsc::UnboundedSender<PreviewDone>,
    done_rx: mpsc::UnboundedReceiver<PreviewDone>,
    generation: Arc<AtomicU64>,
    todo: usize,
}

/// Preview pipeline of one list.
pub struct PreviewPipeline {
    source: Arc<dyn ThumbnailSource>,
    icons: Arc<IconRegistry>,
    threads: usize,
    active: bool,
    running: Option<Running>,
}

impl std::fmt::Debug for PreviewPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewPipeline")
            .field("threads", &self.threads)
            .field("active", &self.active)
            .field("running", &self.running.is_some())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl PreviewPipeline {
    /// Create an inactive pipeline.
    pub fn new(source: Arc<dyn ThumbnailSource>, icons: Arc<IconRegistry>) -> Self {
        Self {
            source,
            icons,
            threads: DEFAULT_PREVIEW_THREADS,
            active: false,
            running: None,
        }
    }

    /// Set the number of worker threads used once the pool starts.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Icon registry previews are registered in.
    pub fn icons(&self) -> &Arc<IconRegistry> {
        &self.icons
    }

    /// Whether previews are enabled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the worker pool exists.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Requests not yet drained by [`update`](Self::update).
    pub fn pending(&self) -> usize {
        self.running.as_ref().map_or(0, |r| r.todo)
    }

    /// Whether every requested preview has been drained. False while disabled.
    pub fn is_done(&self) -> bool {
        self.active && self.pending() == 0
    }

    /// Enable or disable previews.
    ///
    /// Enabling only takes effect once the list is ready; until then the call
    /// keeps the pipeline off. Disabling tears the pool down.
    pub fn set_enabled(&mut self, enabled: bool, list_ready: bool, cache: &mut EntryCache) {
        if enabled == self.active {
            return;
        }
        if enabled && list_ready {
            tracing::debug!(target: "filebrowse::preview", "previews enabled");
            self.active = true;
        } else {
            self.free(cache);
        }
    }

    fn ensure_running(&mut self) -> Option<&mut Running> {
        if self.running.is_none() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.threads)
                .thread_name(|i| format!("filebrowse-preview-{i}"))
                .build();
            match pool {
                Ok(pool) => {
                    let (done_tx, done_rx) = mpsc::unbounded_channel();
                    self.running = Some(Running {
                        pool,
                        done_tx,
                        done_rx,
                        generation: Arc::new(AtomicU64::new(0)),
                        todo: 0,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        target: "filebrowse::preview",
                        error = %e,
                        "failed to start preview pool"
                    );
                    return None;
                }
            }
        }
        self.running.as_mut()
    }

    /// Request a preview for a cached entry. Returns whether a request was queued.
    ///
    /// A finished in-memory preview is converted right away and queued as done.
    /// An unfinished one is left for a later call.
    pub fn push(&mut self, entry: &mut DisplayEntry, path: &Path) -> bool {
        if !self.active || entry.preview.is_some() || !is_preview_candidate(entry) {
            return false;
        }
        let local = entry.local_preview.clone();
        if local.as_ref().is_some_and(|p| p.finished().is_none()) {
            return false;
        }
        let Some(kind) = ThumbnailKind::for_typeflag(entry.typeflag) else {
            return false;
        };

        let source = Arc::clone(&self.source);
        let icons = Arc::clone(&self.icons);
        let Some(running) = self.ensure_running() else {
            return false;
        };
        entry.flags.insert(EntryFlags::PREVIEW_LOADING);
        let uid = entry.uid;
        let current = running.generation.load(Ordering::Acquire);

        if let Some(image) = local.as_ref().and_then(|p| p.finished()) {
            let icon = Some(icons.register(image.clone()));
            let _ = running.done_tx.send(PreviewDone {
                uid,
                generation: current,
                icon,
            });
        } else {
            let done_tx = running.done_tx.clone();
            let generation = Arc::clone(&running.generation);
            let path = path.to_path_buf();
            running.pool.spawn(move || {
                if generation.load(Ordering::Acquire) != current {
                    return;
                }
                let icon = match source.thumbnail(&path, kind) {
                    Ok(image) => Some(icons.register(image)),
                    Err(e) => {
                        tracing::debug!(
                            target: "filebrowse::preview",
                            path = %path.display(),
                            error = %e,
                            "preview failed"
                        );
                        None
                    }
                };
                let _ = done_tx.send(PreviewDone {
                    uid,
                    generation: current,
                    icon,
                });
            });
        }
        running.todo += 1;
        true
    }

    /// Queue previews for the block, nearest to its center first.
    pub fn request_block(&mut self, cache: &mut EntryCache, root: &Path) -> usize {
        if !self.active {
            return 0;
        }
        let range = cache.block_range();
        if range.is_empty() {
            return 0;
        }
        let center = cache.block_center().clamp(range.start, range.end - 1);
        let reach = (range.end - center).max(center - range.start);

        let mut pushed = 0;
        for offset in 0..=reach {
            let after = Some(center + offset);
            let before = (offset > 0).then(|| center.checked_sub(offset)).flatten();
            for index in [after, before].into_iter().flatten() {
                if !range.contains(&index) {
                    continue;
                }
                if let Some(entry) = cache.peek_mut(index) {
                    let path = preview_path(root, entry);
                    if self.push(entry, &path) {
                        pushed += 1;
                    }
                }
            }
        }
        pushed
    }

    /// React to a block move, then re-queue the block around its new center.
    ///
    /// A full re-block abandons every request. Otherwise finished results are
    /// attached first so the kept part of the block does not redo work.
    pub fn on_block_change(
        &mut self,
        cache: &mut EntryCache,
        change: BlockChange,
        root: &Path,
    ) -> usize {
        if !self.active {
            return 0;
        }
        match change {
            BlockChange::Full => self.clear(cache),
            BlockChange::Partial | BlockChange::Recentered => {
                self.update(cache);
                self.clear(cache);
            }
            BlockChange::Unchanged => {}
        }
        self.request_block(cache, root)
    }

    /// Attach finished previews to their entries. Returns whether anything changed.
    ///
    /// Results for entries no longer cached are dropped, releasing their icon.
    pub fn update(&mut self, cache: &mut EntryCache) -> bool {
        let Some(running) = self.running.as_mut() else {
            return false;
        };
        let current = running.generation.load(Ordering::Acquire);
        let mut changed = false;

        while let Ok(done) = running.done_rx.try_recv() {
            if done.generation != current {
                continue;
            }
            running.todo = running.todo.saturating_sub(1);
            let Some(entry) = cache.entry_by_uid_mut(done.uid) else {
                continue;
            };
            match done.icon {
                Some(icon) => {
                    debug_assert!(entry.preview.is_none(), "preview generated twice");
                    entry.preview = Some(icon);
                }
                None => entry.flags.insert(EntryFlags::INVALID_PREVIEW),
            }
            entry.flags.remove(EntryFlags::PREVIEW_LOADING);
            changed = true;
        }
        changed
    }

    /// Abandon every queued request.
    pub fn clear(&mut self, cache: &mut EntryCache) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        running.generation.fetch_add(1, Ordering::AcqRel);
        for entry in cache.entries_mut() {
            entry.flags.remove(EntryFlags::PREVIEW_LOADING);
        }
        while running.done_rx.try_recv().is_ok() {}
        running.todo = 0;
    }

    /// Abandon every request and stop the pool.
    pub fn free(&mut self, cache: &mut EntryCache) {
        if self.running.is_some() {
            self.clear(cache);
            self.running = None;
            tracing::debug!(target: "filebrowse::preview", "preview pool stopped");
        }
        self.active = false;
    }
}

impl Drop for PreviewPipeline {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.generation.fetch_add(1, Ordering::AcqRel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbnail::{FnThumbnailGenerator, ThumbnailError};
    use filebrowse_core::{EntryStore, InternEntry, LocalPreview, PreviewImage};
    use std::time::{Duration, Instant};

    fn entry(typeflag: TypeFlags) -> DisplayEntry {
        let mut raw = InternEntry::new("a.png", typeflag);
        raw.uid = FileUid(1);
        DisplayEntry::from_intern(&raw)
    }

    fn pipeline() -> PreviewPipeline {
        let source = FnThumbnailGenerator::new(|path: &Path, _: ThumbnailKind| {
            if path.to_string_lossy().contains("bad") {
                Err(ThumbnailError::generation(path, "bad file"))
            } else {
                Ok(PreviewImage::solid(4, 4, [0, 0, 0, 255]))
            }
        });
        PreviewPipeline::new(Arc::new(source), IconRegistry::new()).with_threads(2)
    }

    fn drain(pipeline: &mut PreviewPipeline, cache: &mut EntryCache) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while pipeline.pending() > 0 && Instant::now() < deadline {
            pipeline.update(cache);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn store(names: &[(&str, TypeFlags)]) -> EntryStore {
        let mut store = EntryStore::new();
        let entries = names
            .iter()
            .enumerate()
            .map(|(i, (name, flag))| {
                let mut e = InternEntry::new(*name, *flag);
                e.uid = FileUid(i as u32 + 1);
                e
            })
            .collect();
        store.append(entries);
        store.set_filtered((0..names.len()).collect());
        store
    }

    #[test]
    fn test_candidate_poll() {
        assert!(is_preview_candidate(&entry(TypeFlags::IMAGE)));
        assert!(!is_preview_candidate(&entry(TypeFlags::TEXT)));

        let mut loading = entry(TypeFlags::IMAGE);
        loading.flags |= EntryFlags::PREVIEW_LOADING;
        assert!(!is_preview_candidate(&loading));

        let mut no_preview = entry(TypeFlags::BLENDERLIB);
        no_preview.flags |= EntryFlags::BLENDERLIB_NO_PREVIEW;
        assert!(!is_preview_candidate(&no_preview));

        assert!(!is_preview_candidate(&entry(TypeFlags::BLENDERLIB | TypeFlags::DIR)));
        assert!(is_preview_candidate(&entry(TypeFlags::BLENDER | TypeFlags::DIR)));
    }

    #[test]
    fn test_enable_waits_for_ready_list() {
        let mut cache = EntryCache::new(8);
        let mut pipeline = pipeline();
        pipeline.set_enabled(true, false, &mut cache);
        assert!(!pipeline.is_active());
        pipeline.set_enabled(true, true, &mut cache);
        assert!(pipeline.is_active());
        assert!(!pipeline.is_running());
        pipeline.set_enabled(false, true, &mut cache);
        assert!(!pipeline.is_active());
    }

    #[test]
    fn test_previews_attach_and_fail() {
        let store = store(&[
            ("a.png", TypeFlags::IMAGE),
            ("notes.txt", TypeFlags::TEXT),
            ("bad.png", TypeFlags::IMAGE),
        ]);
        let mut cache = EntryCache::new(8);
        let mut pipeline = pipeline();
        pipeline.set_enabled(true, true, &mut cache);

        let change = cache.ensure_block(&store, 0).unwrap();
        let pushed = pipeline.on_block_change(&mut cache, change, Path::new("/root"));
        assert_eq!(pushed, 2);
        assert!(pipeline.is_running());
        drain(&mut pipeline, &mut cache);

        assert!(pipeline.is_done());
        let good = cache.peek(0).unwrap();
        assert!(good.has_preview());
        assert!(!good.flags.contains(EntryFlags::PREVIEW_LOADING));
        let bad = cache.peek(2).unwrap();
        assert!(!bad.has_preview());
        assert!(bad.flags.contains(EntryFlags::INVALID_PREVIEW));
        assert_eq!(pipeline.icons().len(), 1);

        // Nothing is re-requested for finished or failed entries.
        assert_eq!(pipeline.request_block(&mut cache, Path::new("/root")), 0);
    }

    #[test]
    fn test_finished_local_preview_skips_pool() {
        let mut raw = InternEntry::new("Material/Wood", TypeFlags::BLENDERLIB);
        raw.uid = FileUid(1);
        raw.local_preview = Some(Arc::new(LocalPreview::finished_with(PreviewImage::solid(
            1,
            1,
            [1, 1, 1, 1],
        ))));
        let mut store = EntryStore::new();
        store.append(vec![raw]);
        store.set_filtered(vec![0]);

        let mut cache = EntryCache::new(4);
        let mut pipeline = pipeline();
        pipeline.set_enabled(true, true, &mut cache);
        cache.ensure_block(&store, 0);
        assert_eq!(pipeline.request_block(&mut cache, Path::new("/")), 1);
        assert!(pipeline.update(&mut cache));
        assert!(cache.peek(0).unwrap().has_preview());
    }

    #[test]
    fn test_unfinished_local_preview_waits() {
        let mut raw = InternEntry::new("Material/Wood", TypeFlags::BLENDERLIB);
        raw.uid = FileUid(1);
        let local = Arc::new(LocalPreview::new());
        raw.local_preview = Some(Arc::clone(&local));
        let mut store = EntryStore::new();
        store.append(vec![raw]);
        store.set_filtered(vec![0]);

        let mut cache = EntryCache::new(4);
        let mut pipeline = pipeline();
        pipeline.set_enabled(true, true, &mut cache);
        cache.ensure_block(&store, 0);
        assert_eq!(pipeline.request_block(&mut cache, Path::new("/")), 0);

        local.finish(PreviewImage::solid(1, 1, [0; 4]));
        assert_eq!(pipeline.request_block(&mut cache, Path::new("/")), 1);
    }

    #[test]
    fn test_evicted_result_is_released() {
        let store = store(&[("a.png", TypeFlags::IMAGE), ("b.png", TypeFlags::IMAGE)]);
        let mut cache = EntryCache::new(4);
        let mut pipeline = pipeline();
        pipeline.set_enabled(true, true, &mut cache);
        cache.ensure_block(&store, 0);
        pipeline.request_block(&mut cache, Path::new("/"));

        // The entries leave the cache before their previews are drained.
        cache.clear();
        drain(&mut pipeline, &mut cache);
        assert_eq!(pipeline.pending(), 0);
        assert!(pipeline.icons().is_empty());
    }

    #[test]
    fn test_clear_abandons_requests() {
        let store = store(&[("a.png", TypeFlags::IMAGE)]);
        let mut cache = EntryCache::new(4);
        let mut pipeline = pipeline();
        pipeline.set_enabled(true, true, &mut cache);
        cache.ensure_block(&store, 0);
        pipeline.request_block(&mut cache, Path::new("/"));
        assert_eq!(pipeline.pending(), 1);

        pipeline.clear(&mut cache);
        assert_eq!(pipeline.pending(), 0);
        assert!(!cache.peek(0).unwrap().flags.contains(EntryFlags::PREVIEW_LOADING));
        std::thread::sleep(Duration::from_millis(50));
        assert!(!pipeline.update(&mut cache));
    }
}
