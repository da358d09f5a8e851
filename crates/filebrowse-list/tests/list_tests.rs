use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use filebrowse_cache::{FnThumbnailGenerator, PreviewPipeline, ThumbnailKind};
use filebrowse_core::{
    AssetLibraryRef, AssetMetadata, CatalogId, CatalogVisibility, FileUid, FilterSettings,
    IconRegistry, IdCode, ListConfig, ListError, ListKind, PreviewImage, TypeFlags,
};
use filebrowse_list::{FileIcon, FileList, SelectOp, SelectScope, SelectionFlags};
use filebrowse_scan::{
    Collaborators, DatablockInfo, DirReader, JobState, MemoryAssetLibrary, MemoryContainer,
    MemoryDatabase, MemoryLibraryReader, RawDirEntry, StdDirReader,
};

fn read(root: &Path) -> FileList {
    let mut list = FileList::new(ListConfig::new(root));
    assert!(list.read_blocking());
    list.ensure_files();
    list
}

fn display_paths(list: &FileList) -> Vec<String> {
    (0..list.count())
        .filter_map(|i| list.relpath_at(i).map(str::to_string))
        .collect()
}

fn row_uids(list: &mut FileList) -> Vec<FileUid> {
    let count = list.count();
    (0..count)
        .filter_map(|i| list.entry_at(i).map(|e| e.uid))
        .collect()
}

fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_natural_sort_through_list() {
    let temp = TempDir::new().unwrap();
    for name in ["b.txt", "a.txt", "2.txt", "10.txt"] {
        fs::write(temp.path().join(name), name).unwrap();
    }

    let list = read(temp.path());
    assert_eq!(display_paths(&list), vec!["2.txt", "10.txt", "a.txt", "b.txt"]);
}

#[test]
fn test_folders_only() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("docs")).unwrap();
    fs::create_dir(temp.path().join("src")).unwrap();
    fs::write(temp.path().join("a.txt"), "a").unwrap();
    fs::write(temp.path().join("b.png"), "b").unwrap();
    fs::write(temp.path().join("c.py"), "c").unwrap();

    let mut list = read(temp.path());
    assert_eq!(list.count(), 5);

    list.set_filter(FilterSettings {
        do_filter: true,
        type_mask: TypeFlags::FOLDER,
        ..Default::default()
    });
    assert!(!list.needs_reading());
    assert_eq!(list.ensure_files(), 2);
    for index in 0..2 {
        assert!(list.entry_at(index).is_some_and(|e| e.typeflag.contains(TypeFlags::DIR)));
    }
}

#[test]
fn test_rows_keep_identity_until_block_moves() {
    let temp = TempDir::new().unwrap();
    for i in 0..600 {
        fs::write(temp.path().join(format!("file{i}.txt")), "").unwrap();
    }
    let mut list = read(temp.path());
    assert_eq!(list.count(), 600);

    assert!(list.ensure_block(0));
    let first = list.entry_at(550).map(|e| e.uid).unwrap();
    let again = list.entry_at(550).map(|e| e.uid).unwrap();
    assert_eq!(first, again);
    assert_eq!(list.relpath_at(550), Some("file550.txt"));
    assert!(!list.ensure_block(600));
}

/// Lists the root normally, then blocks every later read until released.
struct GatedReader {
    calls: AtomicUsize,
    gate: Mutex<mpsc::Receiver<()>>,
}

impl DirReader for GatedReader {
    fn read_dir(&self, dir: &Path) -> Result<Vec<RawDirEntry>, ListError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            let _ = self.gate.lock().unwrap().recv();
        }
        StdDirReader.read_dir(dir)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[test]
fn test_cancel_keeps_merged_directory() {
    let temp = TempDir::new().unwrap();
    for sub in ["one", "two"] {
        fs::create_dir(temp.path().join(sub)).unwrap();
        fs::write(temp.path().join(sub).join("file.txt"), "x").unwrap();
    }

    let (release, gate) = mpsc::channel();
    let reader = Arc::new(GatedReader {
        calls: AtomicUsize::new(0),
        gate: Mutex::new(gate),
    });
    let mut config = ListConfig::new(temp.path());
    config.max_recursion = 3;
    let mut list = FileList::with_collaborators(config, Collaborators::new().with_dirs(reader));

    assert!(list.refresh());
    assert!(list.is_pending());
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut merged = 0;
    while merged == 0 && Instant::now() < deadline {
        merged += list.update().merged;
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(merged, 4);

    list.cancel_read();
    release.send(()).unwrap();
    drop(release);
    wait_until(|| list.job_state() == Some(JobState::Done));
    assert_eq!(list.pending_dirs(), 0);

    list.stop_read();
    assert_eq!(list.job_state(), None);
    assert!(list.is_ready());
    assert!(!list.is_pending());
    assert!(list.read_report().cancelled);
    assert_eq!(list.ensure_files(), 2);
    assert_eq!(display_paths(&list), vec!["one", "two"]);
}

fn library_fixture(temp: &TempDir) -> Arc<MemoryLibraryReader> {
    fs::write(temp.path().join("lib.blend"), "").unwrap();
    let reader = MemoryLibraryReader::new();
    reader.insert(
        temp.path().join("lib.blend"),
        MemoryContainer::new()
            .with(IdCode::Material, DatablockInfo::new("Wood"))
            .with(
                IdCode::Material,
                DatablockInfo::new("Steel").with_asset(AssetMetadata::default()),
            ),
    );
    Arc::new(reader)
}

fn asset_config(root: &Path) -> ListConfig {
    let mut config = ListConfig::new(root);
    config.kind = ListKind::AssetLibrary;
    config.max_recursion = 1;
    config.asset_library = Some(AssetLibraryRef::custom("props", root));
    config
}

#[test]
fn test_partial_rescan_keeps_uids_and_selection() {
    let temp = TempDir::new().unwrap();
    let reader = library_fixture(&temp);
    let assets = Arc::new(MemoryAssetLibrary::new());
    let main = Arc::new(MemoryDatabase::new());
    main.set_filepath(Some(temp.path().join("current.blend")));
    let chair = main.add_asset(IdCode::Object, "Chair", AssetMetadata::default());

    let collaborators = Collaborators::new()
        .with_libraries(reader)
        .with_main(main.clone())
        .with_assets(assets.clone());
    let mut list = FileList::with_collaborators(asset_config(temp.path()), collaborators);
    list.read_blocking();
    list.ensure_files();
    assert!(list.is_asset_library_loaded());
    assert_eq!(assets.load_count(), 1);
    assert_eq!(assets.asset_count(), 2);

    let steel = list.find_path("lib.blend/Material/Steel").unwrap();
    let steel_uid = list.entry_at(steel).map(|e| e.uid).unwrap();
    list.select(steel, SelectOp::Add, SelectionFlags::SELECTED, SelectScope::All);
    let chair_index = list.find_local_id(chair).unwrap();
    assert_eq!(list.local_id_at(chair_index), Some(chair));
    let max_uid = list.store().max_uid();

    let fresh = main.add_asset(IdCode::Material, "Fresh", AssetMetadata::default());
    list.tag_force_reset_main_files();
    assert!(list.needs_reading());
    list.read_blocking();
    list.ensure_files();

    let steel = list.find_path("lib.blend/Material/Steel").unwrap();
    assert_eq!(list.entry_at(steel).map(|e| e.uid), Some(steel_uid));
    assert!(list.is_selected(steel));

    let fresh_index = list.find_local_id(fresh).unwrap();
    assert!(list.entry_at(fresh_index).is_some_and(|e| e.uid > max_uid));
    assert!(list.find_local_id(chair).is_some());
    assert_eq!(assets.load_count(), 1);
    assert_eq!(assets.asset_count(), 3);

    drop(list);
    assert_eq!(assets.asset_count(), 0);
}

#[test]
fn test_unassigned_catalog_filter() {
    let temp = TempDir::new().unwrap();
    let assets = Arc::new(MemoryAssetLibrary::new());
    let trees = assets.add_catalog("trees");

    fs::write(temp.path().join("forest.blend"), "").unwrap();
    let reader = MemoryLibraryReader::new();
    reader.insert(
        temp.path().join("forest.blend"),
        MemoryContainer::new()
            .with(
                IdCode::Object,
                DatablockInfo::new("Oak").with_asset(AssetMetadata::in_catalog(trees)),
            )
            .with(IdCode::Object, DatablockInfo::new("Pine").with_asset(AssetMetadata::default()))
            .with(
                IdCode::Object,
                DatablockInfo::new("Birch")
                    .with_asset(AssetMetadata::in_catalog(CatalogId::new_random())),
            ),
    );

    let collaborators = Collaborators::new()
        .with_libraries(Arc::new(reader))
        .with_assets(assets.clone());
    let mut list = FileList::with_collaborators(asset_config(temp.path()), collaborators);
    list.read_blocking();
    list.ensure_files();
    assert!(list.find_path("forest.blend/Object/Oak").is_some());

    list.set_catalog_filter(CatalogVisibility::Unassigned);
    let count = list.ensure_files();
    assert!(list.find_path("forest.blend/Object/Oak").is_none());
    assert!(list.find_path("forest.blend/Object/Pine").is_some());
    assert!(list.find_path("forest.blend/Object/Birch").is_some());
    for index in 0..count {
        let catalog = list.asset_at(index).and_then(|a| a.metadata.catalog_id);
        assert!(catalog.is_none_or(|id| id != trees));
    }

    list.set_catalog_filter(CatalogVisibility::Specific(trees));
    list.ensure_files();
    let names: Vec<String> = (0..list.count())
        .filter_map(|i| list.asset_at(i).map(|a| a.name.to_string()))
        .collect();
    assert_eq!(names, vec!["Oak"]);
}

#[test]
fn test_selection_scopes_and_ranges() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("docs")).unwrap();
    fs::write(temp.path().join("a.txt"), "a").unwrap();
    fs::write(temp.path().join("b.txt"), "b").unwrap();
    let mut list = read(temp.path());
    assert_eq!(display_paths(&list), vec!["docs", "a.txt", "b.txt"]);

    list.select_range(0, 2, SelectOp::Add, SelectionFlags::SELECTED, SelectScope::Files);
    assert!(!list.is_selected(0));
    assert_eq!(list.selected_indices(SelectionFlags::SELECTED), vec![1, 2]);
    assert!(list.select_get(1, SelectScope::Dirs).is_empty());

    // Out-of-range ranges are ignored.
    list.select_range(0, 3, SelectOp::Add, SelectionFlags::SELECTED, SelectScope::All);
    assert!(!list.is_selected(0));

    list.select(1, SelectOp::Toggle, SelectionFlags::SELECTED, SelectScope::All);
    assert!(!list.is_selected(1));
    list.select(2, SelectOp::Add, SelectionFlags::HIGHLIGHTED, SelectScope::All);
    assert_eq!(
        list.select_get(2, SelectScope::Files),
        SelectionFlags::SELECTED | SelectionFlags::HIGHLIGHTED
    );

    // Sorting differently keeps selection on the same entries.
    list.set_sort(filebrowse_core::SortField::Name, true);
    list.ensure_files();
    assert_eq!(list.relpath_at(1), Some("b.txt"));
    assert!(list.is_selected(1));
    assert!(!list.is_selected(2));
}

#[test]
fn test_path_queries_with_recursion() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("sub")).unwrap();
    fs::write(temp.path().join("sub/b.py"), "print()").unwrap();
    fs::write(temp.path().join("top.txt"), "t").unwrap();

    let mut list = FileList::new(ListConfig::new(temp.path()));
    list.set_recursion(2);
    list.read_blocking();
    list.ensure_files();

    let index = list.find_path("sub/b.py").unwrap();
    assert_eq!(list.full_path(index), Some(temp.path().join("sub/b.py")));
    assert_eq!(list.icon_for(index), Some(FileIcon::Script));
    assert_eq!(list.find_path("sub/"), list.find_path("sub"));
    assert!(list.find_path("missing").is_none());
    assert!(list.local_id_at(index).is_none());
    assert!(list.asset_at(index).is_none());
    assert_eq!(list.stats().total_files, 2);
}

#[test]
fn test_main_database_parent_selection() {
    let main = Arc::new(MemoryDatabase::new());
    let cube = main.add(IdCode::Mesh, "Cube");
    main.add(IdCode::Mesh, "Suzanne");

    let mut config = ListConfig::new("/Mesh/");
    config.kind = ListKind::MainDatabase;
    let mut list = FileList::with_collaborators(config, Collaborators::new().with_main(main));

    // Database listings are read inline.
    assert!(list.refresh());
    assert!(list.is_ready());
    assert_eq!(list.ensure_files(), 3);
    assert_eq!(list.relpath_at(0), Some(".."));
    assert_eq!(list.icon_for(0), Some(FileIcon::Parent));
    assert!(list.find_local_id(cube).is_some());

    list.select_parent(SelectOp::Add, SelectionFlags::SELECTED);
    assert!(list.is_selected(0));

    let mut settings = list.config().filter.clone();
    settings.hide_parent = true;
    list.set_filter(settings);
    assert_eq!(list.ensure_files(), 2);
    list.select_parent(SelectOp::Add, SelectionFlags::HIGHLIGHTED);
    assert!(list.selected_indices(SelectionFlags::HIGHLIGHTED).is_empty());
}

#[test]
fn test_main_database_ignores_live_object_tag() {
    let main = Arc::new(MemoryDatabase::new());
    main.add(IdCode::Mesh, "Cube");
    main.add(IdCode::Mesh, "Suzanne");

    for (root, expected) in [("/", vec!["Mesh"]), ("/Mesh/", vec!["..", "Cube", "Suzanne"])] {
        let mut config = ListConfig::new(root);
        config.kind = ListKind::MainDatabase;
        let mut list =
            FileList::with_collaborators(config, Collaborators::new().with_main(main.clone()));
        assert!(list.refresh());
        list.ensure_files();
        assert_eq!(display_paths(&list), expected);
        let uids = row_uids(&mut list);

        list.tag_force_reset_main_files();
        assert!(!list.needs_reading());
        assert!(!list.refresh());
        list.ensure_files();
        assert_eq!(display_paths(&list), expected);
        assert_eq!(row_uids(&mut list), uids);

        // A full reset lists everything again, once.
        list.tag_force_reset();
        assert!(list.refresh());
        list.ensure_files();
        assert_eq!(display_paths(&list), expected);
        assert_eq!(list.store().len(), expected.len());
    }
}

#[test]
fn test_main_assets_partial_rescan() {
    let main = Arc::new(MemoryDatabase::new());
    let wood = main.add_asset(IdCode::Material, "Wood", AssetMetadata::default());
    let steel = main.add_asset(IdCode::Material, "Steel", AssetMetadata::default());
    main.add(IdCode::Mesh, "Cube");
    let assets = Arc::new(MemoryAssetLibrary::new());

    let mut config = ListConfig::new("/");
    config.kind = ListKind::MainAssets;
    let collaborators = Collaborators::new()
        .with_main(main.clone())
        .with_assets(assets.clone());
    let mut list = FileList::with_collaborators(config, collaborators);
    assert!(list.refresh());
    assert_eq!(list.ensure_files(), 2);
    assert_eq!(display_paths(&list), vec!["Material/Steel", "Material/Wood"]);
    let max_uid = list.store().max_uid();

    list.tag_force_reset_main_files();
    assert!(list.needs_reading());
    assert!(list.refresh());
    assert!(list.is_ready());
    assert_eq!(list.ensure_files(), 2);
    assert_eq!(list.store().len(), 2);
    assert_eq!(display_paths(&list), vec!["Material/Steel", "Material/Wood"]);
    assert!(list.find_local_id(wood).is_some());
    assert!(list.find_local_id(steel).is_some());
    assert_eq!(assets.asset_count(), 2);

    // Every row mirrors a live object, so every row was re-read with a fresh uid.
    assert!(row_uids(&mut list).iter().all(|&uid| uid > max_uid));
}

#[test]
fn test_previews_attach_after_ready() {
    let temp = TempDir::new().unwrap();
    for i in 0..4 {
        fs::write(temp.path().join(format!("img{i}.png")), "png").unwrap();
    }
    fs::write(temp.path().join("notes.txt"), "n").unwrap();

    let generator = FnThumbnailGenerator::new(|_: &Path, _: ThumbnailKind| {
        Ok(PreviewImage::solid(8, 8, [0, 128, 255, 255]))
    });
    let icons = IconRegistry::new();
    let pipeline = PreviewPipeline::new(Arc::new(generator), icons.clone()).with_threads(2);

    let mut list = FileList::new(ListConfig::new(temp.path())).with_previews(pipeline);
    list.set_use_previews(true);
    assert!(list.previews_done());

    list.read_blocking();
    let count = list.ensure_files();
    assert_eq!(count, 5);
    assert!(list.ensure_block(0));
    wait_until(|| {
        list.update();
        list.previews_done()
    });

    for index in 0..4 {
        assert!(list.preview_image(index).is_some_and(|image| image.width == 8));
        assert!(!list.is_preview_pending(index));
    }
    let notes = list.find_path("notes.txt").unwrap();
    assert!(list.preview_image(notes).is_none());
    assert_eq!(icons.len(), 4);

    drop(list);
    assert!(icons.is_empty());
}
