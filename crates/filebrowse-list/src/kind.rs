//! Root validation per list kind.

use std::path::{Path, PathBuf};

use filebrowse_core::ListKind;
use filebrowse_scan::{DirReader, explode_library_path};

/// Outcome of a root validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirCheck {
    /// The (possibly corrected) root is usable.
    pub valid: bool,
    /// Root to use. Differs from the input only when a correction was allowed.
    pub path: PathBuf,
}

impl DirCheck {
    fn unchanged(path: &Path, valid: bool) -> Self {
        Self {
            valid,
            path: path.to_path_buf(),
        }
    }
}

/// Validate `path` as the root of a list of the given kind.
///
/// With `do_change`, an invalid filesystem root is replaced by its nearest
/// existing parent (or `/`) and reported as valid.
pub fn check_dir(kind: ListKind, path: &Path, do_change: bool, dirs: &dyn DirReader) -> DirCheck {
    match kind {
        ListKind::Directory => {
            let valid = path.is_absolute() && dirs.is_dir(path);
            if valid || !do_change {
                return DirCheck::unchanged(path, valid);
            }
            corrected(path, dirs)
        }
        ListKind::Library | ListKind::AssetLibrary => {
            let valid = dirs.is_dir(path) || is_container_path(path, dirs);
            if valid || !do_change {
                return DirCheck::unchanged(path, valid);
            }
            corrected(path, dirs)
        }
        ListKind::MainDatabase | ListKind::MainAssets => DirCheck::unchanged(path, true),
    }
}

/// `container/` or `container/group/`, with an existing container file.
fn is_container_path(path: &Path, dirs: &dyn DirReader) -> bool {
    explode_library_path(path).is_some_and(|lib| {
        lib.name.is_none() && dirs.exists(&lib.container) && !dirs.is_dir(&lib.container)
    })
}

fn corrected(path: &Path, dirs: &dyn DirReader) -> DirCheck {
    let parent = path
        .ancestors()
        .skip(1)
        .find(|p| p.is_absolute() && dirs.is_dir(p))
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
    tracing::debug!(
        target: "filebrowse::list",
        requested = %path.display(),
        root = %parent.display(),
        "root corrected to existing parent"
    );
    DirCheck {
        valid: true,
        path: parent,
    }
}
