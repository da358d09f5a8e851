//! Sorting and filtering for filebrowse listings.
//!
//! This crate turns the raw entries of an [`EntryStore`] into the display order:
//!
//! - **Sorting** - comparator families by name, date, size and extension, all
//!   sharing a directory classification order and a total tie-break
//! - **Filtering** - hidden-file rules, type and datablock masks, path and name
//!   search, asset catalog membership
//!
//! # Sorting
//!
//! ```rust
//! use filebrowse_core::{EntryStore, SortField};
//! use filebrowse_order::{SortOptions, sort_store};
//!
//! let mut store = EntryStore::new();
//! sort_store(&mut store, SortOptions::new(SortField::Name, false));
//! ```
//!
//! # Filtering
//!
//! A filter pass compiles the settings once, then rebuilds the filtered array:
//!
//! ```rust
//! use filebrowse_core::{EntryStore, FilterSettings, ListKind};
//! use filebrowse_order::{PreparedFilter, filter_store};
//!
//! let mut store = EntryStore::new();
//! let filter = PreparedFilter::new(&FilterSettings::default());
//! let visible = filter_store(&mut store, ListKind::Directory, &filter);
//! assert_eq!(visible, 0);
//! ```

mod catalog;
mod filter;
pub mod natural;
mod sort;

pub use catalog::CatalogFilter;
pub use filter::{PreparedFilter, filter_store, is_hidden_dot_path};
pub use natural::natural_cmp;
pub use sort::{SortOptions, compare_generic, compare_tiebreak, sort_store};
