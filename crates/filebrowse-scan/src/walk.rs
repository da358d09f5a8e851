//! Directory, container and database walks performed by a read job.

use std::path::{Path, PathBuf};

use compact_str::{CompactString, format_compact};

use filebrowse_core::{
    FileAttributes, IdCode, InternEntry, ListError, ListKind, ReadWarning, TypeFlags,
    is_current_or_parent,
};
use filebrowse_order::is_hidden_dot_path;

use crate::classify::{OperatorGlob, classify_path, is_library_container};
use crate::job::{Collaborators, JobShared, ReadRequest};
use crate::library::{DatablockInfo, LibraryPath, explode_library_path};
use crate::progress::ProgressTracker;
use crate::reader::AliasTarget;

/// Name shown for an entry.
///
/// Asset name for assets; datablock or group name for library entries; the
/// relative path for directories; the base name for everything else.
pub fn display_name(root: &Path, entry: &InternEntry) -> CompactString {
    if let Some(asset) = &entry.asset {
        return asset.name.clone();
    }
    let relpath = entry.relpath.as_str();
    if entry.typeflag.contains(TypeFlags::BLENDERLIB) {
        if let Some(parts) = explode_library_path(&root.join(relpath)) {
            if let Some(name) = parts.name.or(parts.group) {
                return name;
            }
        }
    }
    if entry.is_dir() {
        relpath.into()
    } else {
        relpath.rsplit('/').next().unwrap_or(relpath).into()
    }
}

/// Whether a freshly listed entry should be queued for listing itself.
///
/// Containers at the last recursion level are still queued so their groups
/// show up. Library entries are never queued: recursive container listings
/// already include them.
pub fn should_recurse_into(
    max_recursion: u32,
    is_lib: bool,
    level: u32,
    entry: &InternEntry,
) -> bool {
    if max_recursion == 0 {
        return false;
    }
    if !is_lib && level > max_recursion {
        return false;
    }
    if !is_lib && level >= max_recursion && !entry.typeflag.intersects(TypeFlags::ANY_BLENDER) {
        return false;
    }
    if entry.typeflag.contains(TypeFlags::BLENDERLIB) {
        return false;
    }
    entry.is_dir() && !entry.is_current_or_parent()
}

/// Options for listing one container.
#[derive(Debug, Clone, Copy, Default)]
struct LibOptions {
    add_parent: bool,
    recursive: bool,
    assets_only: bool,
}

struct TodoDir {
    level: u32,
    dir: PathBuf,
}

pub(crate) struct Walker<'a> {
    request: &'a ReadRequest,
    collaborators: &'a Collaborators,
    shared: &'a JobShared,
    operator_glob: OperatorGlob,
    tracker: ProgressTracker,
}

impl<'a> Walker<'a> {
    pub fn new(request: &'a ReadRequest, collaborators: &'a Collaborators, shared: &'a JobShared) -> Self {
        Self {
            request,
            collaborators,
            shared,
            operator_glob: OperatorGlob::new(&request.operator_glob),
            tracker: ProgressTracker::new(),
        }
    }

    pub fn run(&mut self) {
        match self.request.kind {
            ListKind::Directory => self.walk(false),
            ListKind::Library => self.walk(true),
            ListKind::AssetLibrary => self.read_asset_library(),
            ListKind::MainDatabase => self.read_main_database(),
            ListKind::MainAssets => {
                self.load_asset_library();
                self.shared.mark_listed();
                self.add_main_assets();
            }
        }
    }

    fn warn(&mut self, warning: ReadWarning) {
        tracing::warn!(
            target: "filebrowse::scan",
            path = %warning.path.display(),
            kind = ?warning.kind,
            "{}",
            warning.message
        );
        self.tracker.record_warning();
        self.shared.push_warning(warning);
    }

    /// Walk the root with an explicit stack, one directory or container at a time.
    fn walk(&mut self, do_lib: bool) {
        self.shared.mark_listed();

        let root = self.request.root.clone();
        let max_recursion = self.request.max_recursion;
        let mut todo = vec![TodoDir {
            level: 1,
            dir: root.clone(),
        }];

        while let Some(next) = todo.pop() {
            if self.shared.is_cancelled() {
                todo.push(next);
                break;
            }
            self.shared.set_pending_dirs(todo.len() + 1);

            let rel_base = relative_base(&root, &next.dir);
            let skip_currpar = next.level > 1;
            self.tracker.set_current_dir(next.dir.clone());
            tracing::trace!(
                target: "filebrowse::scan",
                dir = %next.dir.display(),
                level = next.level,
                "listing directory"
            );

            let mut is_lib = false;
            let mut lib_failed = false;
            let mut entries = Vec::new();
            if do_lib {
                if let Some(lib_path) = explode_library_path(&next.dir) {
                    let options = LibOptions {
                        add_parent: !skip_currpar,
                        recursive: max_recursion > 0,
                        assets_only: self.request.asset_library.is_some(),
                    };
                    match self.list_lib(&lib_path, &rel_base, options) {
                        Ok(listed) => {
                            entries = listed;
                            is_lib = true;
                        }
                        Err(err) => {
                            if !self.collaborators.dirs.is_dir(&next.dir) {
                                self.warn(ReadWarning::from_error(&lib_path.container, &err));
                                lib_failed = true;
                            }
                        }
                    }
                }
            }

            if !is_lib && !lib_failed {
                match self.list_dir(&next.dir, &rel_base, do_lib, skip_currpar) {
                    Ok(listed) => entries = listed,
                    Err(err) => self.warn(ReadWarning::from_error(&next.dir, &err)),
                }
            }

            if self.shared.is_cancelled() {
                tracing::debug!(
                    target: "filebrowse::scan",
                    dir = %next.dir.display(),
                    "cancelled while listing, discarding directory"
                );
                break;
            }

            for entry in &mut entries {
                entry.uid = self.shared.uids.generate();
                entry.name = display_name(&root, entry);
                if should_recurse_into(max_recursion, is_lib, next.level, entry) {
                    todo.push(TodoDir {
                        level: next.level + 1,
                        dir: root.join(entry.relpath.as_str()),
                    });
                    self.tracker.record_discovered();
                }
            }

            self.tracker.record_listed(entries.len());
            self.shared.append(entries);
            self.shared.set_pending_dirs(todo.len());
            self.shared.send_progress(self.tracker.snapshot());
        }

        if !todo.is_empty() {
            tracing::debug!(
                target: "filebrowse::scan",
                dropped = todo.len(),
                "read cancelled, dropping pending directories"
            );
            todo.clear();
        }
        self.shared.set_pending_dirs(0);
    }

    /// List the plain contents of a directory.
    fn list_dir(
        &mut self,
        dir: &Path,
        rel_base: &str,
        do_lib: bool,
        skip_currpar: bool,
    ) -> Result<Vec<InternEntry>, ListError> {
        let request = self.request;
        let items = self.collaborators.dirs.read_dir(dir)?;
        let main_filepath = request.main_filepath.as_deref();
        let mut entries = Vec::with_capacity(items.len());

        for item in items {
            if skip_currpar && is_current_or_parent(&item.name) {
                continue;
            }

            let relpath = format_compact!("{rel_base}{}", item.name);
            let full_path = dir.join(item.name.as_str());
            let mut entry = InternEntry::new(relpath, TypeFlags::empty());
            entry.stat = item.stat;
            entry.attributes = item.attributes;
            if item.is_dir {
                entry.typeflag = TypeFlags::DIR;
            }

            let mut target = full_path.clone();
            match item.alias {
                Some(AliasTarget::Resolved { path, is_dir }) => {
                    if is_dir {
                        entry.typeflag = TypeFlags::DIR;
                        let mut with_slash = path.into_os_string();
                        with_slash.push("/");
                        entry.redirection = Some(PathBuf::from(with_slash));
                    } else {
                        target = path.clone();
                        entry.redirection = Some(path);
                    }
                }
                Some(AliasTarget::Broken) => {
                    entry.attributes |= FileAttributes::HIDDEN;
                    self.warn(ReadWarning::broken_alias(&full_path));
                }
                None => {}
            }

            if !entry.is_dir() {
                let target_str = target.to_string_lossy();
                if do_lib && is_library_container(&target_str) {
                    // Containers become browsable, except the file currently open.
                    entry.typeflag = TypeFlags::BLENDER;
                    if main_filepath != Some(target.as_path()) {
                        entry.typeflag |= TypeFlags::DIR;
                    }
                } else {
                    entry.typeflag = classify_path(&target_str);
                    if self.operator_glob.matches(&item.name) {
                        entry.typeflag |= TypeFlags::OPERATOR;
                    }
                }
            }

            if is_hidden_dot_path(&entry.relpath) {
                entry.attributes |= FileAttributes::HIDDEN;
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// List the groups and datablocks of a container.
    fn list_lib(
        &mut self,
        lib_path: &LibraryPath,
        rel_base: &str,
        options: LibOptions,
    ) -> Result<Vec<InternEntry>, ListError> {
        let handle = self.collaborators.libraries.open(&lib_path.container)?;
        let mut entries = Vec::new();

        if options.add_parent {
            entries.push(InternEntry::new(
                format_compact!("{rel_base}.."),
                TypeFlags::BLENDERLIB | TypeFlags::DIR,
            ));
        }

        match &lib_path.group {
            Some(group) => {
                let Some(code) = IdCode::from_group_name(group) else {
                    return Err(ListError::library_open(
                        &lib_path.container,
                        format!("unknown group '{group}'"),
                    ));
                };
                for info in handle.datablocks(code, options.assets_only) {
                    let relpath = format_compact!("{rel_base}{}", info.name);
                    entries.push(self.datablock_entry(relpath, code, info));
                }
            }
            None => {
                for code in handle.groups() {
                    let group = code.group_name();
                    let mut entry = InternEntry::new(
                        format_compact!("{rel_base}{group}"),
                        TypeFlags::BLENDERLIB | TypeFlags::DIR,
                    );
                    entry.id_code = Some(code);
                    entries.push(entry);

                    if options.recursive {
                        for info in handle.datablocks(code, options.assets_only) {
                            let relpath = format_compact!("{rel_base}{group}/{}", info.name);
                            entries.push(self.datablock_entry(relpath, code, info));
                        }
                    }
                }
            }
        }
        drop(handle);
        Ok(entries)
    }

    fn datablock_entry(&self, relpath: CompactString, code: IdCode, info: DatablockInfo) -> InternEntry {
        let mut entry = InternEntry::new(relpath, TypeFlags::BLENDERLIB);
        entry.id_code = Some(code);
        entry.library_has_no_preview = !info.has_preview;
        if info.name.starts_with('.') {
            entry.attributes |= FileAttributes::HIDDEN;
        }
        if let Some(metadata) = info.asset {
            entry.typeflag |= TypeFlags::ASSET;
            if let Some(assets) = &self.collaborators.assets {
                entry.asset = Some(assets.add_external_asset(&entry.relpath, &info.name, code, metadata));
            }
        }
        entry
    }

    fn load_asset_library(&mut self) {
        let request = self.request;
        let collaborators = self.collaborators;
        if !request.load_asset_library {
            return;
        }
        let (Some(library), Some(assets)) = (&request.asset_library, &collaborators.assets) else {
            return;
        };
        match assets.load(library) {
            Ok(()) => {
                self.shared.mark_asset_library_loaded();
                tracing::debug!(target: "filebrowse::scan", ?library, "asset library loaded");
            }
            Err(err) => {
                let path = library.root().cloned().unwrap_or_default();
                self.warn(ReadWarning::from_error(path, &err));
            }
        }
    }

    fn read_asset_library(&mut self) {
        self.load_asset_library();
        self.shared.mark_listed();

        let contains_main = self
            .collaborators
            .main
            .as_ref()
            .and_then(|main| main.filepath())
            .is_some_and(|path| path.starts_with(&self.request.root));
        if contains_main {
            self.add_main_assets();
        }
        if !self.request.only_main_data {
            self.walk(true);
        }
    }

    /// Entries for every asset owned by the open file.
    fn add_main_assets(&mut self) {
        let collaborators = self.collaborators;
        let Some(main) = &collaborators.main else {
            return;
        };
        let mut entries = Vec::new();
        for code in main.groups() {
            for id in main.ids(code) {
                let Some(metadata) = id.asset else {
                    continue;
                };
                if id.linked {
                    continue;
                }
                let relpath = format_compact!("{}/{}", code.group_name(), id.name);
                let mut entry =
                    InternEntry::new(relpath, TypeFlags::BLENDERLIB | TypeFlags::ASSET);
                entry.name = id.name.clone();
                entry.id_code = Some(code);
                entry.uid = self.shared.uids.generate();
                entry.local_id = Some(id.local_id);
                entry.local_preview = id.preview;
                if let Some(assets) = &collaborators.assets {
                    entry.asset = Some(assets.add_local_asset(
                        &entry.relpath,
                        &id.name,
                        code,
                        metadata,
                        id.local_id,
                    ));
                }
                entries.push(entry);
            }
        }
        tracing::debug!(target: "filebrowse::scan", count = entries.len(), "added local assets");
        self.tracker.record_listed(entries.len());
        self.shared.append(entries);
        self.shared.send_progress(self.tracker.snapshot());
    }

    /// List the in-memory database: groups at the root, objects inside a group.
    fn read_main_database(&mut self) {
        self.shared.mark_listed();
        let collaborators = self.collaborators;
        let Some(main) = &collaborators.main else {
            return;
        };

        let root = self.request.root.to_string_lossy();
        let group = root.trim_matches('/').rsplit('/').next().unwrap_or("");
        let mut entries = Vec::new();

        match IdCode::from_group_name(group) {
            None => {
                for code in main.groups() {
                    let mut entry = InternEntry::new(
                        code.group_name(),
                        TypeFlags::DIR | TypeFlags::BLENDERLIB,
                    );
                    entry.name = code.group_name().into();
                    entry.id_code = Some(code);
                    entries.push(entry);
                }
            }
            Some(code) => {
                let mut parent = InternEntry::new("..", TypeFlags::DIR);
                parent.name = "..".into();
                entries.push(parent);
                for id in main.ids(code) {
                    let mut entry = InternEntry::new(id.name.clone(), TypeFlags::BLENDERLIB);
                    entry.name = id.name;
                    entry.id_code = Some(code);
                    entry.local_id = Some(id.local_id);
                    entry.local_preview = id.preview;
                    if entry.name.starts_with('.') {
                        entry.attributes |= FileAttributes::HIDDEN;
                    }
                    entries.push(entry);
                }
            }
        }

        for entry in &mut entries {
            entry.uid = self.shared.uids.generate();
        }
        self.tracker.record_listed(entries.len());
        self.shared.append(entries);
        self.shared.send_progress(self.tracker.snapshot());
    }
}

/// Path of `dir` relative to `root`, with a trailing `/` unless empty.
fn relative_base(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => {
            let mut base = rel.to_string_lossy().into_owned();
            if !base.ends_with('/') {
                base.push('/');
            }
            base
        }
        _ => String::new(),
    }
}
