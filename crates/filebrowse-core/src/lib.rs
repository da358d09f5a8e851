//! Core types for filebrowse.
//!
//! This crate provides the data model shared by the other filebrowse crates:
//! raw and display entries, their flag sets, datablock type codes, asset
//! metadata, the entry store and list configuration.

mod asset;
mod config;
mod display;
mod entry;
mod error;
mod icons;
mod idcode;
mod preview;
mod store;

pub use asset::{AssetLibraryRef, AssetMetadata, AssetRepresentation, CatalogId};
pub use config::{
    CatalogVisibility, FilterSettings, FilterSettingsBuilder, ListConfig, ListConfigBuilder,
    ListKind, SortField,
};
pub use display::{DisplayEntry, EntryFlags};
pub use entry::{
    FileAttributes, FileUid, InternEntry, LocalId, StatInfo, TypeFlags, is_current_or_parent,
};
pub use error::{ListError, ReadReport, ReadWarning, WarningKind};
pub use icons::{IconHandle, IconId, IconRegistry};
pub use idcode::{IdCode, IdFilter};
pub use preview::{LocalPreview, PreviewImage};
pub use store::{EntryStore, StoreStats};
