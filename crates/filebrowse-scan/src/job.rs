//! Read job: one scan pass feeding a thread-safe scratch list.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use strum::Display;
use tokio::sync::broadcast;

use filebrowse_core::{AssetLibraryRef, FileUid, InternEntry, ListConfig, ListKind, ReadReport, ReadWarning};

use crate::assets::AssetLibraryService;
use crate::library::{LibraryReader, MemoryLibraryReader};
use crate::main_db::MainDatabase;
use crate::progress::ReadProgress;
use crate::reader::{DirReader, StdDirReader};
use crate::uid::UidGenerator;
use crate::walk::Walker;

/// Lifecycle of a read job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum JobState {
    /// Created, nothing read yet.
    Init,
    /// Walking directories or containers.
    Running,
    /// Walk finished or cancelled; entries may still wait in the scratch list.
    Done,
    /// Final merge happened.
    Merged,
}

impl JobState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Running,
            2 => Self::Done,
            _ => Self::Merged,
        }
    }
}

/// Everything a read needs, copied from the list when the job starts.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub root: PathBuf,
    pub kind: ListKind,
    pub max_recursion: u32,
    /// `;`-separated globs tagging files as operator targets.
    pub operator_glob: String,
    /// The file currently open; never promoted to a browsable container.
    pub main_filepath: Option<PathBuf>,
    pub asset_library: Option<AssetLibraryRef>,
    /// Only re-read entries backed by live objects.
    pub only_main_data: bool,
    /// Load the asset library before reading.
    pub load_asset_library: bool,
}

impl ReadRequest {
    /// Build a full read request from a list configuration.
    pub fn from_config(config: &ListConfig) -> Self {
        Self {
            root: config.root.clone(),
            kind: config.kind,
            max_recursion: config.max_recursion,
            operator_glob: config.filter.operator_glob.clone(),
            main_filepath: config.main_filepath.clone(),
            asset_library: config.asset_library.clone(),
            only_main_data: false,
            load_asset_library: true,
        }
    }

    /// Whether the job runs on the calling thread.
    pub fn runs_inline(&self) -> bool {
        self.kind.no_threads() || self.only_main_data
    }
}

/// Collaborators a read talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub dirs: Arc<dyn DirReader>,
    pub libraries: Arc<dyn LibraryReader>,
    pub main: Option<Arc<dyn MainDatabase>>,
    pub assets: Option<Arc<dyn AssetLibraryService>>,
}

impl Collaborators {
    /// Real filesystem, no containers, no database, no asset library.
    pub fn new() -> Self {
        Self {
            dirs: Arc::new(StdDirReader::new()),
            libraries: Arc::new(MemoryLibraryReader::new()),
            main: None,
            assets: None,
        }
    }

    pub fn with_dirs(mut self, dirs: Arc<dyn DirReader>) -> Self {
        self.dirs = dirs;
        self
    }

    pub fn with_libraries(mut self, libraries: Arc<dyn LibraryReader>) -> Self {
        self.libraries = libraries;
        self
    }

    pub fn with_main(mut self, main: Arc<dyn MainDatabase>) -> Self {
        self.main = Some(main);
        self
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetLibraryService>) -> Self {
        self.assets = Some(assets);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("main", &self.main.is_some())
            .field("assets", &self.assets.is_some())
            .finish_non_exhaustive()
    }
}

/// Entries moved out of a job's scratch list.
#[derive(Debug, Default)]
pub struct MergeBatch {
    /// New entries in discovery order.
    pub entries: Vec<InternEntry>,
    /// Highest uid handed out so far.
    pub last_uid: FileUid,
    /// The read produced a valid (possibly empty) listing.
    pub listed: bool,
    /// The asset library was loaded by this read.
    pub asset_library_loaded: bool,
}

#[derive(Debug, Default)]
struct Scratch {
    entries: Vec<InternEntry>,
    listed: bool,
    asset_library_loaded: bool,
}

/// State shared between the job owner and the worker thread.
pub(crate) struct JobShared {
    scratch: Mutex<Scratch>,
    state: AtomicU8,
    cancel: AtomicBool,
    pending_dirs: AtomicUsize,
    pub(crate) uids: UidGenerator,
    progress_tx: broadcast::Sender<ReadProgress>,
    report: Mutex<ReadReport>,
}

impl JobShared {
    fn new(last_uid: FileUid) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            scratch: Mutex::new(Scratch::default()),
            state: AtomicU8::new(JobState::Init as u8),
            cancel: AtomicBool::new(false),
            pending_dirs: AtomicUsize::new(0),
            uids: UidGenerator::starting_after(last_uid),
            progress_tx,
            report: Mutex::new(ReadReport::new()),
        }
    }

    fn set_state(&self, state: JobState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub(crate) fn set_pending_dirs(&self, count: usize) {
        self.pending_dirs.store(count, Ordering::Relaxed);
    }

    /// Append entries to the scratch list. The lock is held only for the move.
    pub(crate) fn append(&self, mut entries: Vec<InternEntry>) {
        if entries.is_empty() {
            return;
        }
        if let Ok(mut scratch) = self.scratch.lock() {
            scratch.entries.append(&mut entries);
        }
    }

    pub(crate) fn mark_listed(&self) {
        if let Ok(mut scratch) = self.scratch.lock() {
            scratch.listed = true;
        }
    }

    pub(crate) fn mark_asset_library_loaded(&self) {
        if let Ok(mut scratch) = self.scratch.lock() {
            scratch.asset_library_loaded = true;
        }
    }

    pub(crate) fn push_warning(&self, warning: ReadWarning) {
        if let Ok(mut report) = self.report.lock() {
            report.push(warning);
        }
    }

    pub(crate) fn send_progress(&self, progress: ReadProgress) {
        let _ = self.progress_tx.send(progress);
    }

    fn take(&self) -> MergeBatch {
        let last_uid = self.uids.current();
        match self.scratch.lock() {
            Ok(mut scratch) => MergeBatch {
                entries: std::mem::take(&mut scratch.entries),
                last_uid,
                listed: scratch.listed,
                asset_library_loaded: scratch.asset_library_loaded,
            },
            Err(_) => MergeBatch {
                last_uid,
                ..MergeBatch::default()
            },
        }
    }

    fn run(&self, request: &ReadRequest, collaborators: &Collaborators) {
        self.set_state(JobState::Running);
        tracing::debug!(
            target: "filebrowse::scan",
            root = %request.root.display(),
            kind = %request.kind,
            partial = request.only_main_data,
            "read started"
        );

        Walker::new(request, collaborators, self).run();

        let cancelled = self.is_cancelled();
        if let Ok(mut report) = self.report.lock() {
            report.cancelled = cancelled;
        }
        tracing::debug!(
            target: "filebrowse::scan",
            root = %request.root.display(),
            cancelled,
            "read finished"
        );
        self.set_state(JobState::Done);
    }
}

/// One scan pass over a list root.
///
/// The walk runs on a dedicated thread, or inline for database listings and
/// partial re-reads. The owner polls [`take_batch`](Self::take_batch) to merge
/// entries as they arrive and calls [`finish`](Self::finish) once the job is
/// [`JobState::Done`].
pub struct ReadJob {
    shared: Arc<JobShared>,
    worker: Option<JoinHandle<()>>,
    partial: bool,
}

impl ReadJob {
    /// Start a read. Ids continue after `last_uid`, so they never collide with
    /// entries the list already holds.
    pub fn start(request: ReadRequest, collaborators: Collaborators, last_uid: FileUid) -> Self {
        let shared = Arc::new(JobShared::new(last_uid));
        let partial = request.only_main_data;

        if request.runs_inline() {
            shared.run(&request, &collaborators);
            return Self {
                shared,
                worker: None,
                partial,
            };
        }

        let worker_shared = Arc::clone(&shared);
        let spawned = std::thread::Builder::new()
            .name("filebrowse-read".into())
            .spawn(move || worker_shared.run(&request, &collaborators));

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                tracing::warn!(target: "filebrowse::scan", %err, "cannot spawn read thread, job not started");
                shared.set_state(JobState::Done);
                None
            }
        };
        Self {
            shared,
            worker,
            partial,
        }
    }

    /// Current state.
    pub fn state(&self) -> JobState {
        self.shared.state()
    }

    /// Whether the walk has ended (finished or cancelled).
    pub fn is_done(&self) -> bool {
        matches!(self.state(), JobState::Done | JobState::Merged)
    }

    /// Whether this is a live-object-only re-read.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    /// Request cooperative cancellation, checked between directories.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Directories still waiting on the walk stack.
    pub fn pending_dirs(&self) -> usize {
        self.shared.pending_dirs.load(Ordering::Relaxed)
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ReadProgress> {
        self.shared.progress_tx.subscribe()
    }

    /// Warnings gathered so far.
    pub fn report(&self) -> ReadReport {
        self.shared
            .report
            .lock()
            .map(|report| report.clone())
            .unwrap_or_default()
    }

    /// Move the entries produced so far out of the scratch list.
    pub fn take_batch(&self) -> MergeBatch {
        self.shared.take()
    }

    /// Block until the walk ends.
    pub fn wait(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!(target: "filebrowse::scan", "read thread panicked");
                self.shared.set_state(JobState::Done);
            }
        }
    }

    /// Final merge step: returns the remaining entries and moves the job to
    /// [`JobState::Merged`]. Returns `None` while the walk is still running.
    pub fn finish(&mut self) -> Option<MergeBatch> {
        match self.state() {
            JobState::Done => {}
            JobState::Merged => return Some(MergeBatch::default()),
            JobState::Init | JobState::Running => return None,
        }
        self.wait();
        let batch = self.shared.take();
        self.shared.set_state(JobState::Merged);
        tracing::debug!(
            target: "filebrowse::scan",
            entries = batch.entries.len(),
            last_uid = batch.last_uid.0,
            "read merged"
        );
        Some(batch)
    }
}

impl Drop for ReadJob {
    fn drop(&mut self) {
        self.cancel();
        self.wait();
    }
}

impl std::fmt::Debug for ReadJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadJob")
            .field("state", &self.state())
            .field("partial", &self.partial)
            .field("pending_dirs", &self.pending_dirs())
            .finish()
    }
}
