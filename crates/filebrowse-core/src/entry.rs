//! Raw listing entries and their flag sets.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use bitflags::bitflags;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::asset::AssetRepresentation;
use crate::idcode::IdCode;
use crate::preview::LocalPreview;

/// Stable per-entry identity within one list instance.
///
/// `FileUid::UNSET` (zero) is never handed out to a live entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileUid(pub u32);

impl FileUid {
    /// The "no id assigned yet" value.
    pub const UNSET: FileUid = FileUid(0);

    /// Create a new uid from a raw value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Whether this uid was assigned by a generator.
    pub fn is_set(self) -> bool {
        self != Self::UNSET
    }
}

/// Handle to a live object in the in-memory database an entry mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalId(pub u64);

bitflags! {
    /// Type classification of an entry.
    ///
    /// A scan sets `DIR` plus at most one "content" flag; `ASSET` and `OPERATOR` are additive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TypeFlags: u32 {
        const DIR = 1 << 0;
        /// Library container file (e.g. `scene.blend`).
        const BLENDER = 1 << 1;
        /// Numbered backup of a library container (`scene.blend1`).
        const BLENDER_BACKUP = 1 << 2;
        /// Group or datablock inside a library container.
        const BLENDERLIB = 1 << 3;
        const IMAGE = 1 << 4;
        const MOVIE = 1 << 5;
        const PYSCRIPT = 1 << 6;
        const FTFONT = 1 << 7;
        const SOUND = 1 << 8;
        const TEXT = 1 << 9;
        const ARCHIVE = 1 << 10;
        const BTX = 1 << 11;
        const ALEMBIC = 1 << 12;
        const USD = 1 << 13;
        const VOLUME = 1 << 14;
        const OBJECT_IO = 1 << 15;
        /// Application bundle directory shown as a file.
        const BUNDLE = 1 << 16;
        /// Matched the operator glob configured for the scan.
        const OPERATOR = 1 << 17;
        const ASSET = 1 << 18;
        /// Filter-mask only: selects plain directories.
        const FOLDER = 1 << 19;
    }
}

impl TypeFlags {
    /// Types a preview may be generated for.
    pub const PREVIEWABLE: TypeFlags = TypeFlags::IMAGE
        .union(TypeFlags::MOVIE)
        .union(TypeFlags::FTFONT)
        .union(TypeFlags::OBJECT_IO)
        .union(TypeFlags::BLENDER)
        .union(TypeFlags::BLENDER_BACKUP)
        .union(TypeFlags::BLENDERLIB);

    /// Library container files, including backups.
    pub const ANY_BLENDER: TypeFlags = TypeFlags::BLENDER.union(TypeFlags::BLENDER_BACKUP);

    /// Check if the directory flag is set.
    pub fn is_dir(self) -> bool {
        self.contains(TypeFlags::DIR)
    }
}

bitflags! {
    /// Filesystem attributes captured at scan time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FileAttributes: u32 {
        const HIDDEN = 1 << 0;
        const SYSTEM = 1 << 1;
        const OFFLINE = 1 << 2;
        const ALIAS = 1 << 3;
        const READONLY = 1 << 4;
        const TEMPORARY = 1 << 5;
        const SYMLINK = 1 << 6;
    }
}

impl FileAttributes {
    /// Any kind of link or alias.
    pub const ANY_LINK: FileAttributes = FileAttributes::ALIAS.union(FileAttributes::SYMLINK);
}

/// Size and modification time snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatInfo {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

impl StatInfo {
    /// Create a new stat snapshot.
    pub fn new(size: u64, modified: SystemTime) -> Self {
        Self { size, modified }
    }

    /// Modification time in whole seconds since the epoch (negative before it).
    pub fn mtime_secs(&self) -> i64 {
        match self.modified.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }
}

impl Default for StatInfo {
    fn default() -> Self {
        Self {
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
        }
    }
}

/// One raw entry produced by a scan pass.
#[derive(Debug, Clone)]
pub struct InternEntry {
    /// Unique id, assigned once when the entry is minted.
    pub uid: FileUid,

    /// Path relative to the list root. May contain `/` for nested or in-container paths.
    pub relpath: CompactString,

    /// Name shown to the user.
    pub name: CompactString,

    /// Type classification.
    pub typeflag: TypeFlags,

    /// Datablock type for in-container entries.
    pub id_code: Option<IdCode>,

    /// Size and modification time.
    pub stat: StatInfo,

    /// Filesystem attributes.
    pub attributes: FileAttributes,

    /// Resolved target of an alias or symlink.
    pub redirection: Option<PathBuf>,

    /// Live object this entry mirrors, if any.
    pub local_id: Option<LocalId>,

    /// Preview already computed for the live object.
    pub local_preview: Option<Arc<LocalPreview>>,

    /// Representation registered with the asset system.
    pub asset: Option<Arc<AssetRepresentation>>,

    /// The container reported that this datablock has no stored preview.
    pub library_has_no_preview: bool,
}

impl InternEntry {
    /// Create an entry with the given relative path and type, everything else defaulted.
    pub fn new(relpath: impl Into<CompactString>, typeflag: TypeFlags) -> Self {
        Self {
            uid: FileUid::UNSET,
            relpath: relpath.into(),
            name: CompactString::default(),
            typeflag,
            id_code: None,
            stat: StatInfo::default(),
            attributes: FileAttributes::empty(),
            redirection: None,
            local_id: None,
            local_preview: None,
            asset: None,
            library_has_no_preview: false,
        }
    }

    /// Check if this entry is a directory (including container and category pseudo-directories).
    pub fn is_dir(&self) -> bool {
        self.typeflag.is_dir()
    }

    /// Whether this entry mirrors a live object of the in-memory database.
    pub fn is_main_file(&self) -> bool {
        self.local_id.is_some()
    }

    /// Whether the relative path is the `.` or `..` pseudo-entry.
    pub fn is_current_or_parent(&self) -> bool {
        is_current_or_parent(&self.relpath)
    }
}

/// Check for the `.` and `..` pseudo names.
pub fn is_current_or_parent(name: &str) -> bool {
    name == "." || name == ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_unset() {
        assert!(!FileUid::UNSET.is_set());
        assert!(FileUid::new(3).is_set());
    }

    #[test]
    fn test_previewable_types() {
        assert!(TypeFlags::PREVIEWABLE.contains(TypeFlags::IMAGE));
        assert!(TypeFlags::PREVIEWABLE.contains(TypeFlags::BLENDERLIB));
        assert!(!TypeFlags::PREVIEWABLE.contains(TypeFlags::TEXT));
    }

    #[test]
    fn test_entry_creation() {
        let entry = InternEntry::new("sub/file.png", TypeFlags::IMAGE);
        assert!(!entry.is_dir());
        assert!(!entry.is_main_file());
        assert_eq!(entry.uid, FileUid::UNSET);
        assert_eq!(entry.relpath.as_str(), "sub/file.png");
    }

    #[test]
    fn test_current_or_parent() {
        assert!(is_current_or_parent(".."));
        assert!(is_current_or_parent("."));
        assert!(!is_current_or_parent("..."));
        assert!(!is_current_or_parent(".hidden"));
    }

    #[test]
    fn test_mtime_secs() {
        let stat = StatInfo::new(1, SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(90));
        assert_eq!(stat.mtime_secs(), 90);
    }
}
