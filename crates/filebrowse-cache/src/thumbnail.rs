//! Thumbnail sources and the on-disk thumbnail cache.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use dashmap::DashMap;
use filebrowse_core::{PreviewImage, TypeFlags};
use thiserror::Error;

/// Errors produced while resolving a thumbnail.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// No thumbnail can be produced for this kind of file.
    #[error("No thumbnail available for {path}")]
    Unsupported { path: PathBuf },

    /// The generator failed.
    #[error("Thumbnail generation failed for {path}: {message}")]
    Generation { path: PathBuf, message: String },

    /// A cached thumbnail file is unreadable.
    #[error("Corrupt thumbnail file: {path}")]
    Corrupt { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ThumbnailError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a generation error.
    pub fn generation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Generation {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// What kind of source a thumbnail is generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbnailKind {
    Image,
    /// Library container, backup or datablock.
    Library,
    Movie,
    Font,
    ObjectIo,
}

impl ThumbnailKind {
    /// Kind for an entry's type flags, `None` when the type has no thumbnails.
    pub fn for_typeflag(typeflag: TypeFlags) -> Option<Self> {
        if typeflag.contains(TypeFlags::IMAGE) {
            Some(Self::Image)
        } else if typeflag.intersects(TypeFlags::ANY_BLENDER | TypeFlags::BLENDERLIB) {
            Some(Self::Library)
        } else if typeflag.contains(TypeFlags::MOVIE) {
            Some(Self::Movie)
        } else if typeflag.contains(TypeFlags::FTFONT) {
            Some(Self::Font)
        } else if typeflag.contains(TypeFlags::OBJECT_IO) {
            Some(Self::ObjectIo)
        } else {
            None
        }
    }
}

/// Renders a thumbnail from a source file. The actual codec lives behind this trait.
pub trait ThumbnailGenerator: Send + Sync {
    fn generate(&self, path: &Path, kind: ThumbnailKind) -> Result<PreviewImage, ThumbnailError>;
}

/// Resolves the thumbnail of a path, from a cache or by generating it.
pub trait ThumbnailSource: Send + Sync {
    fn thumbnail(&self, path: &Path, kind: ThumbnailKind) -> Result<PreviewImage, ThumbnailError>;
}

/// Generator backed by a closure. Also usable directly as an uncached source.
pub struct FnThumbnailGenerator<F> {
    func: F,
}

impl<F> FnThumbnailGenerator<F>
where
    F: Fn(&Path, ThumbnailKind) -> Result<PreviewImage, ThumbnailError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> std::fmt::Debug for FnThumbnailGenerator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnThumbnailGenerator").finish_non_exhaustive()
    }
}

impl<F> ThumbnailGenerator for FnThumbnailGenerator<F>
where
    F: Fn(&Path, ThumbnailKind) -> Result<PreviewImage, ThumbnailError> + Send + Sync,
{
    fn generate(&self, path: &Path, kind: ThumbnailKind) -> Result<PreviewImage, ThumbnailError> {
        (self.func)(path, kind)
    }
}

impl<F> ThumbnailSource for FnThumbnailGenerator<F>
where
    F: Fn(&Path, ThumbnailKind) -> Result<PreviewImage, ThumbnailError> + Send + Sync,
{
    fn thumbnail(&self, path: &Path, kind: ThumbnailKind) -> Result<PreviewImage, ThumbnailError> {
        self.locks.with(path, || self.load_or_generate(path, kind))
    }
}

impl<G: ThumbnailGenerator> DiskThumbnailCache<G> {
    fn load_or_generate(
        &self,
        path: &Path,
        kind: ThumbnailKind,
    ) -> Result<PreviewImage, ThumbnailError> {
        let cached = self.cache_path(path);

        if Self::is_fresh(&cached, path) {
            match read_thumbnail(&cached) {
                Ok(image) => return Ok(image),
                Err(e) => {
                    tracing::debug!(
                        target: "filebrowse::preview",
                        path = %cached.display(),
                        error = %e,
                        "discarding cached thumbnail"
                    );
                }
            }
        }

        let image = self.generator.generate(path, kind)?;
        if let Err(e) = self.write(&cached, &image) {
            tracing::debug!(
                target: "filebrowse::preview",
                path = %cached.display(),
                error = %e,
                "failed to store thumbnail"
            );
        }
        Ok(image)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Read a thumbnail file written by [`DiskThumbnailCache`].
pub fn read_thumbnail(path: &Path) -> Result<PreviewImage, ThumbnailError> {
    let mut bytes = Vec::new();
    fs::File::open(path)
        .and_then(|mut file| file.read_to_end(&mut bytes))
        .map_err(|e| ThumbnailError::io(path, e))?;

    let corrupt = || ThumbnailError::Corrupt {
        path: path.to_path_buf(),
    };
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(corrupt());
    }
    let width = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let height = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let rgba = bytes.split_off(HEADER_LEN);
    PreviewImage::new(width, height, rgba).ok_or_else(corrupt)
}

/// One mutex per source path being worked on.
///
/// Entries are created on first use and removed by the last thread to leave.
#[derive(Debug, Default)]
struct PathLocks {
    map: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PathLocks {
    /// Run `f` while holding the lock of `path`, blocking until it is free.
    fn with<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.map.entry(path.to_path_buf()).or_default().value().clone();
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        // The map and this thread hold the only references: nobody is waiting.
        self.map.remove_if(path, |_, held| Arc::strong_count(held) == 2);
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map.len()
    }
}
