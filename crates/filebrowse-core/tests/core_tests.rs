use std::sync::Arc;

use filebrowse_core::{
    AssetMetadata, AssetRepresentation, CatalogId, CatalogVisibility, DisplayEntry, EntryStore,
    FileUid, FilterSettings, IconRegistry, IdCode, InternEntry, ListConfig, ListKind, LocalId,
    LocalPreview, PreviewImage, SortField, TypeFlags,
};

fn entry(uid: u32, relpath: &str, typeflag: TypeFlags) -> InternEntry {
    let mut e = InternEntry::new(relpath, typeflag);
    e.uid = FileUid(uid);
    e.name = relpath.into();
    e
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "root": "/projects/assets",
        "kind": "library",
        "max_recursion": 2,
        "sort": "size",
        "filter": { "hide_dot": true, "search": "*wood*" }
    }"#;

    let config: ListConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.kind, ListKind::Library);
    assert_eq!(config.sort, SortField::Size);
    assert_eq!(config.max_recursion, 2);
    assert!(config.filter.hide_dot);
    assert_eq!(config.filter.search_text(), "wood");
    assert_eq!(config.cache_window, 128);
    assert_eq!(config.filter.catalog, CatalogVisibility::All);
}

#[test]
fn test_catalog_visibility_json() {
    let catalog = CatalogId::new_random();
    let settings = FilterSettings {
        catalog: CatalogVisibility::Specific(catalog),
        ..Default::default()
    };
    let json = serde_json::to_string(&settings).unwrap();
    let back: FilterSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(back.catalog, CatalogVisibility::Specific(catalog));
}

#[test]
fn test_store_partial_refresh_keeps_file_uids() {
    let mut store = EntryStore::new();
    let mut mat = entry(3, "Material/Wood", TypeFlags::BLENDERLIB);
    mat.local_id = Some(LocalId(1));
    mat.id_code = Some(IdCode::Material);
    store.append(vec![
        entry(1, "a.png", TypeFlags::IMAGE),
        entry(2, "b.png", TypeFlags::IMAGE),
        mat,
    ]);

    let removed = store.remove_live_object_entries(|_| {});
    assert_eq!(removed, 1);

    let uids: Vec<FileUid> = store.entries().iter().map(|e| e.uid).collect();
    assert_eq!(uids, vec![FileUid(1), FileUid(2)]);
    assert_eq!(store.max_uid(), FileUid(3));
}

#[test]
fn test_display_entry_carries_asset_and_preview() {
    let registry = IconRegistry::new();
    let mut raw = entry(4, "Material/Wood", TypeFlags::BLENDERLIB | TypeFlags::ASSET);
    raw.asset = Some(Arc::new(AssetRepresentation {
        name: "Wood".into(),
        id_code: IdCode::Material,
        metadata: AssetMetadata::default().with_tag("natural"),
        relpath: "Material/Wood".into(),
        local_id: Some(LocalId(1)),
    }));
    raw.local_preview = Some(Arc::new(LocalPreview::finished_with(PreviewImage::solid(
        4,
        4,
        [0, 0, 0, 255],
    ))));

    let mut display = DisplayEntry::from_intern(&raw);
    assert!(display.asset.as_ref().is_some_and(|a| a.is_local()));

    let image = display
        .local_preview
        .as_ref()
        .and_then(|p| p.finished().cloned())
        .unwrap();
    display.preview = Some(registry.register(image));
    assert_eq!(registry.len(), 1);

    drop(display);
    assert!(registry.is_empty());
}
