//! Display entries materialized by the cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use bitflags::bitflags;
use compact_str::CompactString;

use crate::asset::AssetRepresentation;
use crate::entry::{FileAttributes, FileUid, InternEntry, LocalId, TypeFlags};
use crate::icons::IconHandle;
use crate::idcode::IdCode;
use crate::preview::LocalPreview;

bitflags! {
    /// Runtime state of a display entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EntryFlags: u32 {
        /// A preview job is in flight.
        const PREVIEW_LOADING = 1 << 0;
        /// Preview generation failed; do not retry.
        const INVALID_PREVIEW = 1 << 1;
        /// The container reported no stored preview for this datablock.
        const BLENDERLIB_NO_PREVIEW = 1 << 2;
    }
}

/// What a renderer needs to draw one row.
#[derive(Debug)]
pub struct DisplayEntry {
    pub uid: FileUid,
    pub relpath: CompactString,
    pub name: CompactString,
    pub size: u64,
    pub modified: SystemTime,
    pub typeflag: TypeFlags,
    pub id_code: Option<IdCode>,
    pub attributes: FileAttributes,
    pub redirection: Option<PathBuf>,
    pub local_id: Option<LocalId>,
    pub local_preview: Option<Arc<LocalPreview>>,
    pub asset: Option<Arc<AssetRepresentation>>,
    pub flags: EntryFlags,
    /// Attached preview icon, released with the entry.
    pub preview: Option<IconHandle>,
}

impl DisplayEntry {
    /// Materialize a display entry from a raw entry.
    pub fn from_intern(entry: &InternEntry) -> Self {
        let mut flags = EntryFlags::empty();
        if entry.library_has_no_preview {
            flags |= EntryFlags::BLENDERLIB_NO_PREVIEW;
        }
        Self {
            uid: entry.uid,
            relpath: entry.relpath.clone(),
            name: entry.name.clone(),
            size: entry.stat.size,
            modified: entry.stat.modified,
            typeflag: entry.typeflag,
            id_code: entry.id_code,
            attributes: entry.attributes,
            redirection: entry.redirection.clone(),
            local_id: entry.local_id,
            local_preview: entry.local_preview.clone(),
            asset: entry.asset.clone(),
            flags,
            preview: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.typeflag.is_dir()
    }

    /// Whether a preview image is attached.
    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }
}
