//! Preview icon registry.
//!
//! Generated preview images are registered here and referred to by small integer
//! handles. Handles are handed out monotonically and a number is reused only after
//! the image that held it has been released.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::preview::PreviewImage;

/// Integer handle of a registered preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IconId(pub u32);

/// Registry of preview images shared by every list that displays previews.
#[derive(Debug)]
pub struct IconRegistry {
    images: DashMap<u32, Arc<PreviewImage>>,
    next: AtomicU32,
    free: Mutex<Vec<u32>>,
    epoch: AtomicU32,
}

impl IconRegistry {
    /// Create an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            images: DashMap::new(),
            // Zero is reserved for "no icon".
            next: AtomicU32::new(1),
            free: Mutex::new(Vec::new()),
            epoch: AtomicU32::new(0),
        })
    }

    /// Register an image and return an owning handle to it.
    pub fn register(self: &Arc<Self>, image: PreviewImage) -> IconHandle {
        let id = self.allocate();
        self.images.insert(id, Arc::new(image));
        IconHandle {
            registry: Arc::clone(self),
            id: IconId(id),
            epoch: self.epoch.load(Ordering::Acquire),
        }
    }

    /// Look up a registered image.
    pub fn get(&self, id: IconId) -> Option<Arc<PreviewImage>> {
        self.images.get(&id.0).map(|img| Arc::clone(img.value()))
    }

    /// Number of live icons.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Check if no icon is registered.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Drop every registered image. Outstanding handles become dangling and release nothing.
    pub fn teardown(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.images.clear();
        if let Ok(mut free) = self.free.lock() {
            free.clear();
        }
        self.next.store(1, Ordering::Relaxed);
    }

    fn allocate(&self) -> u32 {
        let reused = self.free.lock().ok().and_then(|mut free| free.pop());
        if let Some(id) = reused {
            return id;
        }
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    fn release(&self, id: u32, epoch: u32) {
        if epoch != self.epoch.load(Ordering::Acquire) {
            return;
        }
        if self.images.remove(&id).is_none() {
            return;
        }
        if let Ok(mut free) = self.free.lock() {
            free.push(id);
        }
    }
}

/// Owning handle to a registered preview. The image is released when the handle drops.
#[derive(Debug)]
pub struct IconHandle {
    registry: Arc<IconRegistry>,
    id: IconId,
    epoch: u32,
}

impl IconHandle {
    /// The integer id of this icon.
    pub fn id(&self) -> IconId {
        self.id
    }

    /// The registered image, unless the registry was torn down.
    pub fn image(&self) -> Option<Arc<PreviewImage>> {
        if self.epoch != self.registry.epoch.load(Ordering::Acquire) {
            return None;
        }
        self.registry.get(self.id)
    }
}

impl Drop for IconHandle {
    fn drop(&mut self) {
        self.registry.release(self.id.0, self.epoch);
    }
}
