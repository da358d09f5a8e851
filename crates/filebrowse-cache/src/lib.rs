//! Sliding window cache and preview pipeline for filebrowse.
//!
//! The [`EntryCache`] materializes [`DisplayEntry`](filebrowse_core::DisplayEntry)
//! values for the filtered entries of an
//! [`EntryStore`](filebrowse_core::EntryStore): a contiguous block around the
//! visible rows, plus a bounded FIFO for random access elsewhere.
//!
//! The [`PreviewPipeline`] generates thumbnails for block entries on a
//! background pool and attaches them when drained on the owning thread.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use filebrowse_cache::{
//!     DiskThumbnailCache, EntryCache, FnThumbnailGenerator, PreviewPipeline, ThumbnailKind,
//! };
//! use filebrowse_core::{EntryStore, IconRegistry, PreviewImage};
//!
//! let generator = FnThumbnailGenerator::new(|_: &Path, _: ThumbnailKind| {
//!     Ok(PreviewImage::solid(64, 64, [128, 128, 128, 255]))
//! });
//! let thumbnails = DiskThumbnailCache::new("/tmp/thumbs", generator).unwrap();
//! let mut previews = PreviewPipeline::new(Arc::new(thumbnails), IconRegistry::new());
//!
//! let store = EntryStore::new();
//! let mut cache = EntryCache::default();
//! previews.set_enabled(true, true, &mut cache);
//! if let Some(change) = cache.ensure_block(&store, 0) {
//!     previews.on_block_change(&mut cache, change, Path::new("/data"));
//! }
//! previews.update(&mut cache);
//! ```

mod cache;
mod preview;
mod ring;
mod thumbnail;

pub use cache::{
    BlockChange, DEFAULT_CACHE_SIZE, EntryCache, MAX_CACHE_SIZE, MIN_CACHE_SIZE,
    cache_size_for_window,
};
pub use preview::{DEFAULT_PREVIEW_THREADS, PreviewPipeline, is_preview_candidate, preview_path};
pub use ring::RingBuffer;
pub use thumbnail::{
    DiskThumbnailCache, FnThumbnailGenerator, ThumbnailError, ThumbnailGenerator, ThumbnailKind,
    ThumbnailSource, read_thumbnail,
};
