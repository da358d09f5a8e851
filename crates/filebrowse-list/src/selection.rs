//! Selection state keyed by entry uid.

use std::collections::HashMap;

use bitflags::bitflags;
use filebrowse_core::FileUid;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

bitflags! {
    /// Selection flags of one entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SelectionFlags: u32 {
        const SELECTED = 1 << 0;
        const HIGHLIGHTED = 1 << 1;
        /// The entry is being renamed.
        const EDITING = 1 << 2;
    }
}

/// How a selection call changes the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SelectOp {
    Add,
    Remove,
    Toggle,
}

/// Which entries a selection call applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SelectScope {
    #[default]
    All,
    Dirs,
    Files,
}

impl SelectScope {
    /// Whether an entry with the given directory flag is in scope.
    pub fn includes(self, is_dir: bool) -> bool {
        match self {
            SelectScope::All => true,
            SelectScope::Dirs => is_dir,
            SelectScope::Files => !is_dir,
        }
    }
}

/// Sparse map from uid to selection flags.
///
/// Entries with no flag set are not stored. The map outlives cache eviction
/// and re-reads that keep uids.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    flags: HashMap<FileUid, SelectionFlags>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `op` with `flag` to an entry in scope and return its new flags.
    pub fn set(
        &mut self,
        uid: FileUid,
        is_dir: bool,
        op: SelectOp,
        flag: SelectionFlags,
        scope: SelectScope,
    ) -> SelectionFlags {
        let current = self.flags.get(&uid).copied().unwrap_or_default();
        if !scope.includes(is_dir) {
            return current;
        }
        let updated = match op {
            SelectOp::Add => current | flag,
            SelectOp::Remove => current - flag,
            SelectOp::Toggle => current ^ flag,
        };
        if updated.is_empty() {
            self.flags.remove(&uid);
        } else if updated != current {
            self.flags.insert(uid, updated);
        }
        updated
    }

    /// Flags of an entry in scope, empty otherwise.
    pub fn get(&self, uid: FileUid, is_dir: bool, scope: SelectScope) -> SelectionFlags {
        if !scope.includes(is_dir) {
            return SelectionFlags::empty();
        }
        self.flags.get(&uid).copied().unwrap_or_default()
    }

    /// Whether any flag is set for the entry.
    pub fn is_selected(&self, uid: FileUid) -> bool {
        self.flags.contains_key(&uid)
    }

    /// Number of entries with a flag set.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }

    /// Uids carrying all of `flag`.
    pub fn uids_with(&self, flag: SelectionFlags) -> impl Iterator<Item = FileUid> + '_ {
        self.flags
            .iter()
            .filter(move |(_, flags)| flags.contains(flag))
            .map(|(uid, _)| *uid)
    }
}
