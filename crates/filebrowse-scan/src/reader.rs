//! Filesystem boundary: directory listing and alias resolution.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;

use filebrowse_core::{FileAttributes, ListError, StatInfo};

/// Resolution result for an alias or symlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// The target exists.
    Resolved { path: PathBuf, is_dir: bool },
    /// The target cannot be resolved.
    Broken,
}

/// One item returned by a directory read.
#[derive(Debug, Clone)]
pub struct RawDirEntry {
    /// File name within the directory.
    pub name: CompactString,
    /// Size and modification time.
    pub stat: StatInfo,
    /// Whether the item itself is a directory.
    pub is_dir: bool,
    /// Filesystem attributes.
    pub attributes: FileAttributes,
    /// Target, for items carrying the alias attribute.
    pub alias: Option<AliasTarget>,
}

impl RawDirEntry {
    /// Create a plain file item.
    pub fn file(name: impl Into<CompactString>, size: u64) -> Self {
        Self {
            name: name.into(),
            stat: StatInfo::new(size, SystemTime::UNIX_EPOCH),
            is_dir: false,
            attributes: FileAttributes::empty(),
            alias: None,
        }
    }

    /// Create a directory item.
    pub fn dir(name: impl Into<CompactString>) -> Self {
        Self {
            is_dir: true,
            ..Self::file(name, 0)
        }
    }
}

/// Reads directory contents for a scan.
///
/// Implementations return the `.` and `..` pseudo-entries along with the real
/// contents, like a raw `readdir`.
pub trait DirReader: Send + Sync {
    /// List the immediate contents of a directory.
    fn read_dir(&self, dir: &Path) -> Result<Vec<RawDirEntry>, ListError>;

    /// Whether a path is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Whether a path exists at all.
    fn exists(&self, path: &Path) -> bool;
}

/// [`DirReader`] backed by `std::fs`. Symlinks are treated as aliases.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDirReader;

impl StdDirReader {
    /// Create a new reader.
    pub fn new() -> Self {
        Self
    }
}

impl DirReader for StdDirReader {
    fn read_dir(&self, dir: &Path) -> Result<Vec<RawDirEntry>, ListError> {
        let read = std::fs::read_dir(dir).map_err(|e| ListError::io(dir, e))?;

        let mut entries = Vec::new();
        entries.push(pseudo_entry(".", dir));
        entries.push(pseudo_entry("..", dir.parent().unwrap_or(dir)));

        for item in read {
            let item = match item {
                Ok(item) => item,
                Err(err) => {
                    tracing::debug!(target: "filebrowse::scan", dir = %dir.display(), %err, "skipping unreadable entry");
                    continue;
                }
            };
            let name = item.file_name().to_string_lossy().into_owned();
            let path = item.path();
            let Ok(link_meta) = std::fs::symlink_metadata(&path) else {
                continue;
            };

            let mut attributes = attributes_of(&link_meta);
            let (meta, alias) = if link_meta.file_type().is_symlink() {
                attributes |= FileAttributes::ALIAS | FileAttributes::SYMLINK;
                match (std::fs::metadata(&path), std::fs::canonicalize(&path)) {
                    (Ok(target_meta), Ok(target)) => {
                        let alias = AliasTarget::Resolved {
                            path: target,
                            is_dir: target_meta.is_dir(),
                        };
                        (target_meta, Some(alias))
                    }
                    _ => (link_meta, Some(AliasTarget::Broken)),
                }
            } else {
                (link_meta, None)
            };

            entries.push(RawDirEntry {
                name: name.into(),
                stat: stat_of(&meta),
                is_dir: meta.is_dir(),
                attributes,
                alias,
            });
        }
        Ok(entries)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn pseudo_entry(name: &str, path: &Path) -> RawDirEntry {
    let stat = std::fs::metadata(path)
        .map(|m| stat_of(&m))
        .unwrap_or_default();
    RawDirEntry {
        stat,
        ..RawDirEntry::dir(name)
    }
}

fn stat_of(meta: &Metadata) -> StatInfo {
    StatInfo::new(
        meta.len(),
        meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    )
}

fn attributes_of(meta: &Metadata) -> FileAttributes {
    let mut attributes = FileAttributes::empty();
    if meta.permissions().readonly() {
        attributes |= FileAttributes::READONLY;
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_dir_includes_pseudo_entries() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let entries = StdDirReader.read_dir(temp.path()).unwrap();
        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec![".", "..", "a.txt", "sub"]);

        let file = entries.iter().find(|e| e.name == "a.txt").unwrap();
        assert_eq!(file.stat.size, 5);
        assert!(!file.is_dir);
        assert!(entries.iter().find(|e| e.name == "sub").unwrap().is_dir);
    }

    #[test]
    fn test_missing_dir_is_error() {
        let temp = TempDir::new().unwrap();
        let result = StdDirReader.read_dir(&temp.path().join("missing"));
        assert!(matches!(result, Err(ListError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_aliases() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("target")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("target"), temp.path().join("link")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("dangling")).unwrap();

        let entries = StdDirReader.read_dir(temp.path()).unwrap();
        let link = entries.iter().find(|e| e.name == "link").unwrap();
        assert!(link.attributes.contains(FileAttributes::ALIAS));
        assert!(matches!(link.alias, Some(AliasTarget::Resolved { is_dir: true, .. })));

        let dangling = entries.iter().find(|e| e.name == "dangling").unwrap();
        assert_eq!(dangling.alias, Some(AliasTarget::Broken));
    }
}
