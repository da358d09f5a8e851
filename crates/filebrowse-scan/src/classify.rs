//! File type classification by extension.

use globset::{Glob, GlobSet, GlobSetBuilder};

use filebrowse_core::TypeFlags;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "glsl", "osl", "data", "pov", "ini", "mcr", "inc", "fountain",
];
const FONT_EXTENSIONS: &[&str] = &["ttf", "ttc", "pfb", "otf", "otc", "woff", "woff2"];
const USD_EXTENSIONS: &[&str] = &["usd", "usda", "usdc", "usdz"];
const OBJECT_IO_EXTENSIONS: &[&str] = &[
    "obj", "mtl", "3ds", "fbx", "glb", "gltf", "svg", "ply", "stl",
];
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "tga", "bmp", "jpg", "jpeg", "sgi", "rgb", "rgba", "tif", "tiff", "tx", "jp2", "j2c",
    "hdr", "dds", "dpx", "cin", "exr", "rw2", "webp", "psd", "pdd", "psb",
];
const MOVIE_EXTENSIONS: &[&str] = &[
    "avi", "flc", "mov", "movie", "mp4", "m4v", "m2v", "m2t", "m2ts", "mts", "ts", "mv", "avs",
    "wmv", "ogv", "ogg", "r3d", "dv", "mpeg", "mpg", "mpg2", "vob", "mkv", "flv", "divx", "xvid",
    "mxf", "webm",
];
const SOUND_EXTENSIONS: &[&str] = &[
    "wav", "ogg", "oga", "mp3", "mp2", "ac3", "aac", "flac", "wma", "eac3", "aif", "aiff", "m4a",
    "mka",
];

/// Whether a path names a library container (`.blend`, `.ble`, `.blend.gz`).
pub fn is_library_container(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".blend") || lower.ends_with(".ble") || lower.ends_with(".blend.gz")
}

/// Whether a path names a numbered container backup (`.blend1`, `.blend2`, ...).
pub fn is_library_backup(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    match lower.rfind(".blend") {
        Some(pos) => {
            let rest = &lower[pos + ".blend".len()..];
            !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Classify a file path into exactly one content type flag.
///
/// Returns an empty set for unknown extensions. Matching ignores case.
pub fn classify_path(path: &str) -> TypeFlags {
    if is_library_container(path) {
        return TypeFlags::BLENDER;
    }
    if is_library_backup(path) {
        return TypeFlags::BLENDER_BACKUP;
    }

    let Some(ext) = extension(path) else {
        return TypeFlags::empty();
    };
    let ext = ext.to_ascii_lowercase();
    let ext = ext.as_str();

    if ext == "py" {
        TypeFlags::PYSCRIPT
    } else if TEXT_EXTENSIONS.contains(&ext) {
        TypeFlags::TEXT
    } else if FONT_EXTENSIONS.contains(&ext) {
        TypeFlags::FTFONT
    } else if ext == "btx" {
        TypeFlags::BTX
    } else if ext == "abc" {
        TypeFlags::ALEMBIC
    } else if USD_EXTENSIONS.contains(&ext) {
        TypeFlags::USD
    } else if ext == "vdb" {
        TypeFlags::VOLUME
    } else if ext == "zip" {
        TypeFlags::ARCHIVE
    } else if OBJECT_IO_EXTENSIONS.contains(&ext) {
        TypeFlags::OBJECT_IO
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        TypeFlags::IMAGE
    } else if MOVIE_EXTENSIONS.contains(&ext) {
        TypeFlags::MOVIE
    } else if SOUND_EXTENSIONS.contains(&ext) {
        TypeFlags::SOUND
    } else {
        TypeFlags::empty()
    }
}

fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let pos = name.rfind('.')?;
    (pos > 0).then(|| &name[pos + 1..])
}

/// Set of `;`-separated globs tagging matching files as operator targets.
#[derive(Debug, Clone)]
pub struct OperatorGlob {
    set: Option<GlobSet>,
}

impl OperatorGlob {
    /// Compile a `;`-separated pattern list. Invalid patterns are skipped.
    pub fn new(patterns: &str) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut any = false;
        for pattern in patterns.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                    any = true;
                }
                Err(err) => {
                    tracing::debug!(target: "filebrowse::scan", %pattern, %err, "skipping invalid operator glob");
                }
            }
        }
        let set = if any { builder.build().ok() } else { None };
        Self { set }
    }

    /// Whether a file name matches any pattern.
    pub fn matches(&self, name: &str) -> bool {
        self.set.as_ref().is_some_and(|set| set.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containers_and_backups() {
        assert_eq!(classify_path("scene.blend"), TypeFlags::BLENDER);
        assert_eq!(classify_path("SCENE.BLEND"), TypeFlags::BLENDER);
        assert_eq!(classify_path("scene.blend.gz"), TypeFlags::BLENDER);
        assert_eq!(classify_path("scene.blend1"), TypeFlags::BLENDER_BACKUP);
        assert_eq!(classify_path("scene.blend32"), TypeFlags::BLENDER_BACKUP);
        assert_eq!(classify_path("scene.blendx"), TypeFlags::empty());
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(classify_path("a/b/tool.py"), TypeFlags::PYSCRIPT);
        assert_eq!(classify_path("notes.txt"), TypeFlags::TEXT);
        assert_eq!(classify_path("font.WOFF2"), TypeFlags::FTFONT);
        assert_eq!(classify_path("sim.abc"), TypeFlags::ALEMBIC);
        assert_eq!(classify_path("stage.usdz"), TypeFlags::USD);
        assert_eq!(classify_path("smoke.vdb"), TypeFlags::VOLUME);
        assert_eq!(classify_path("pack.zip"), TypeFlags::ARCHIVE);
        assert_eq!(classify_path("mesh.obj"), TypeFlags::OBJECT_IO);
        assert_eq!(classify_path("photo.JPG"), TypeFlags::IMAGE);
        assert_eq!(classify_path("clip.mkv"), TypeFlags::MOVIE);
        assert_eq!(classify_path("song.flac"), TypeFlags::SOUND);
        assert_eq!(classify_path("Makefile"), TypeFlags::empty());
        assert_eq!(classify_path(".bashrc"), TypeFlags::empty());
    }

    #[test]
    fn test_ogg_is_movie() {
        assert_eq!(classify_path("x.ogg"), TypeFlags::MOVIE);
        assert_eq!(classify_path("x.oga"), TypeFlags::SOUND);
    }

    #[test]
    fn test_operator_glob() {
        let glob = OperatorGlob::new("*.png; *.jpg");
        assert!(glob.matches("a.png"));
        assert!(glob.matches("b.jpg"));
        assert!(!glob.matches("c.txt"));
        assert!(!OperatorGlob::new("").matches("a.png"));
    }
}
