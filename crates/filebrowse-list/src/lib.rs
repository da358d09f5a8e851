//! List facade for filebrowse.
//!
//! [`FileList`] ties the other crates together: it starts read jobs and
//! merges their entries into an [`EntryStore`](filebrowse_core::EntryStore),
//! sorts and filters them when dirty, materializes rows through the sliding
//! window cache and keeps a selection that survives re-reads.
//!
//! # Example
//!
//! ```no_run
//! use filebrowse_core::{ListConfig, SortField};
//! use filebrowse_list::{FileList, SelectOp, SelectScope, SelectionFlags};
//!
//! let mut list = FileList::new(ListConfig::new("/home/user"));
//! list.set_sort(SortField::Size, false);
//! list.read_blocking();
//!
//! let count = list.ensure_files();
//! list.ensure_block(0);
//! for index in 0..count {
//!     if let (Some(icon), Some(entry)) = (list.icon_for(index), list.entry_at(index)) {
//!         println!("{icon} {}", entry.name);
//!     }
//! }
//! list.select(0, SelectOp::Add, SelectionFlags::SELECTED, SelectScope::All);
//! ```
//!
//! A UI drives the list from its event loop instead:
//!
//! ```no_run
//! # use filebrowse_core::ListConfig;
//! # use filebrowse_list::FileList;
//! # let mut list = FileList::new(ListConfig::new("."));
//! loop {
//!     list.refresh();
//!     let status = list.update();
//!     let count = list.ensure_files();
//!     if status.needs_redraw() {
//!         println!("{count} entries");
//!     }
//!     if list.is_ready() {
//!         break;
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```

mod icon;
mod kind;
mod list;
mod selection;

pub use icon::{FileIcon, file_icon};
pub use kind::{DirCheck, check_dir};
pub use list::{FileList, ListFlags, UpdateStatus};
pub use selection::{SelectOp, SelectScope, SelectionFlags, SelectionState};
