//! Read jobs for filebrowse listings.
//!
//! This crate walks a list root and produces raw entries for an
//! [`EntryStore`](filebrowse_core::EntryStore).
//!
//! # Overview
//!
//! `filebrowse-scan` is responsible for one scan pass. Key features:
//!
//! - **Explicit-stack walk** with a recursion budget and cooperative cancellation
//! - **Library containers** browsed like directories through a [`LibraryReader`]
//! - **In-memory database** listings and local assets through a [`MainDatabase`]
//! - **Asset registration** with an [`AssetLibraryService`]
//! - **Progress updates** via broadcast channels
//!
//! # Example
//!
//! ```rust,no_run
//! use filebrowse_core::{FileUid, ListConfig};
//! use filebrowse_scan::{Collaborators, ReadJob, ReadRequest};
//!
//! let config = ListConfig::new("/path/to/list");
//! let mut job = ReadJob::start(
//!     ReadRequest::from_config(&config),
//!     Collaborators::new(),
//!     FileUid::UNSET,
//! );
//! job.wait();
//! let batch = job.finish().unwrap();
//! println!("Found {} entries", batch.entries.len());
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! # use filebrowse_core::{FileUid, ListConfig};
//! # use filebrowse_scan::{Collaborators, ReadJob, ReadRequest};
//! # let job = ReadJob::start(
//! #     ReadRequest::from_config(&ListConfig::new(".")),
//! #     Collaborators::new(),
//! #     FileUid::UNSET,
//! # );
//! let mut progress_rx = job.subscribe();
//!
//! while !job.is_done() {
//!     while let Ok(progress) = progress_rx.try_recv() {
//!         println!("{:.0}% listed", progress.fraction() * 100.0);
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! ```

mod assets;
mod classify;
mod job;
mod library;
mod main_db;
mod progress;
mod reader;
mod uid;
mod walk;

pub use assets::{AssetLibraryService, MemoryAssetLibrary};
pub use classify::{OperatorGlob, classify_path, is_library_backup, is_library_container};
pub use job::{Collaborators, JobState, MergeBatch, ReadJob, ReadRequest};
pub use library::{
    DatablockInfo, LibraryHandle, LibraryPath, LibraryReader, MemoryContainer,
    MemoryLibraryReader, explode_library_path,
};
pub use main_db::{MainDatabase, MainId, MemoryDatabase};
pub use progress::ReadProgress;
pub use reader::{AliasTarget, DirReader, RawDirEntry, StdDirReader};
pub use uid::UidGenerator;
pub use walk::{display_name, should_recurse_into};

// Re-export core types for convenience
pub use filebrowse_core::{ListError, ReadReport, ReadWarning, WarningKind};
