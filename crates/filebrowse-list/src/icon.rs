//! Icon derivation from type flags and attributes.

use std::fmt;

use serde::Serialize;
use strum::IntoStaticStr;

use filebrowse_core::{DisplayEntry, FileAttributes, IdCode, TypeFlags};

/// Icon of a list row, independent of any preview image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum FileIcon {
    Parent,
    Folder,
    FolderRedirect,
    Bundle,
    Blend,
    BlendLogo,
    Backup,
    Image,
    Movie,
    Script,
    Sound,
    Font,
    ThreeD,
    Volume,
    Text,
    Archive,
    Blank,
    Error,
    Cache,
    System,
    /// A datablock or datablock group of the given type.
    Datablock(IdCode),
}

impl fmt::Display for FileIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileIcon::Datablock(code) => write!(f, "datablock:{code}"),
            other => f.write_str(other.into()),
        }
    }
}

/// Icon for an entry.
///
/// `is_main` selects the icon set of the main file view, which always has
/// an icon; other callers (thumbnails overlays) get `None` for plain entries.
pub fn file_icon(entry: &DisplayEntry, is_main: bool) -> Option<FileIcon> {
    let typeflag = entry.typeflag;

    if typeflag.is_dir() {
        if entry.relpath == ".." {
            return is_main.then_some(FileIcon::Parent);
        }
        if typeflag.contains(TypeFlags::BUNDLE) {
            return Some(FileIcon::Bundle);
        }
        if typeflag.contains(TypeFlags::BLENDER) {
            return Some(FileIcon::Blend);
        }
        if is_main {
            if entry.attributes.intersects(FileAttributes::ANY_LINK) {
                return Some(FileIcon::FolderRedirect);
            }
            return Some(FileIcon::Folder);
        }
    }

    let attributes = entry.attributes;
    if attributes.contains(FileAttributes::OFFLINE) {
        return Some(FileIcon::Error);
    }
    if attributes.contains(FileAttributes::TEMPORARY) {
        return Some(FileIcon::Cache);
    }
    if attributes.contains(FileAttributes::SYSTEM) {
        return Some(FileIcon::System);
    }

    let icon = if typeflag.contains(TypeFlags::BLENDER) {
        if is_main || entry.has_preview() {
            FileIcon::Blend
        } else {
            FileIcon::BlendLogo
        }
    } else if typeflag.contains(TypeFlags::BLENDER_BACKUP) {
        FileIcon::Backup
    } else if typeflag.contains(TypeFlags::IMAGE) {
        FileIcon::Image
    } else if typeflag.contains(TypeFlags::MOVIE) {
        FileIcon::Movie
    } else if typeflag.contains(TypeFlags::PYSCRIPT) {
        FileIcon::Script
    } else if typeflag.contains(TypeFlags::SOUND) {
        FileIcon::Sound
    } else if typeflag.contains(TypeFlags::FTFONT) {
        FileIcon::Font
    } else if typeflag.contains(TypeFlags::BTX) {
        FileIcon::Blank
    } else if typeflag.intersects(TypeFlags::ALEMBIC | TypeFlags::USD | TypeFlags::OBJECT_IO) {
        FileIcon::ThreeD
    } else if typeflag.contains(TypeFlags::VOLUME) {
        FileIcon::Volume
    } else if typeflag.contains(TypeFlags::TEXT) {
        FileIcon::Text
    } else if typeflag.contains(TypeFlags::ARCHIVE) {
        FileIcon::Archive
    } else if let Some(code) = entry
        .id_code
        .filter(|_| typeflag.contains(TypeFlags::BLENDERLIB))
    {
        FileIcon::Datablock(code)
    } else {
        return is_main.then_some(FileIcon::Blank);
    };
    Some(icon)
}
