//! Comparator families for raw entries.
//!
//! Every comparator first applies the directory classification order, which is
//! never inverted. The field-specific part and the tie-break are flipped when the
//! sort is inverted.

use std::cmp::Ordering;

use filebrowse_core::{EntryStore, InternEntry, SortField, TypeFlags};

use crate::natural::{casefold_cmp, natural_cmp};

/// How a list is sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortOptions {
    /// Field to sort by.
    pub field: SortField,
    /// Flip the order after the directory classification.
    pub inverted: bool,
}

impl SortOptions {
    /// Create sort options.
    pub fn new(field: SortField, inverted: bool) -> Self {
        Self { field, inverted }
    }

    /// Compare two entries under these options.
    pub fn compare(&self, a: &InternEntry, b: &InternEntry) -> Ordering {
        let generic = compare_generic(a, b);
        if generic != Ordering::Equal {
            return generic;
        }
        let order = match self.field {
            SortField::Name => compare_tiebreak(a, b),
            SortField::Date => {
                // Newest first.
                b.stat
                    .mtime_secs()
                    .cmp(&a.stat.mtime_secs())
                    .then_with(|| compare_tiebreak(a, b))
            }
            SortField::Size => b
                .stat
                .size
                .cmp(&a.stat.size)
                .then_with(|| compare_tiebreak(a, b)),
            SortField::Extension => return compare_extension(a, b, self.inverted),
        };
        self.apply_inverted(order)
    }

    fn apply_inverted(&self, order: Ordering) -> Ordering {
        if self.inverted { order.reverse() } else { order }
    }
}

/// Sort the raw entries of a store.
pub fn sort_store(store: &mut EntryStore, options: SortOptions) {
    store.sort_by(|a, b| options.compare(a, b));
    tracing::trace!(
        target: "filebrowse::list",
        field = %options.field,
        inverted = options.inverted,
        entries = store.len(),
        "sorted entries"
    );
}

/// Rank within the directory tier: plain directories, then containers, then groups.
fn dir_rank(entry: &InternEntry) -> u8 {
    if !entry.is_dir() {
        return 3;
    }
    if entry.typeflag.contains(TypeFlags::BLENDERLIB) {
        2
    } else if entry.typeflag.intersects(TypeFlags::ANY_BLENDER) {
        1
    } else {
        0
    }
}

fn pseudo_rank(entry: &InternEntry) -> u8 {
    match entry.relpath.as_str() {
        "." => 0,
        ".." => 1,
        _ => 2,
    }
}

/// Directory classification order shared by all comparators. Never inverted.
pub fn compare_generic(a: &InternEntry, b: &InternEntry) -> Ordering {
    dir_rank(a)
        .cmp(&dir_rank(b))
        .then_with(|| pseudo_rank(a).cmp(&pseudo_rank(b)))
}

/// Final tie-break giving a total order.
///
/// Natural name order, then datablock type, then entries backed by a live
/// object first, then shallower paths first, then relative path, then uid.
pub fn compare_tiebreak(a: &InternEntry, b: &InternEntry) -> Ordering {
    natural_cmp(&a.name, &b.name)
        .then_with(|| match (a.id_code, b.id_code) {
            (Some(x), Some(y)) => x.code().cmp(&y.code()),
            _ => Ordering::Equal,
        })
        .then_with(|| b.local_id.is_some().cmp(&a.local_id.is_some()))
        .then_with(|| depth(a).cmp(&depth(b)))
        .then_with(|| a.relpath.cmp(&b.relpath))
        .then_with(|| a.uid.cmp(&b.uid))
}

fn depth(entry: &InternEntry) -> usize {
    entry.relpath.matches('/').count()
}

fn compare_extension(a: &InternEntry, b: &InternEntry, inverted: bool) -> Ordering {
    let a_lib = a.typeflag.contains(TypeFlags::BLENDERLIB);
    let b_lib = b.typeflag.contains(TypeFlags::BLENDERLIB);

    // Library entries before plain files, regardless of direction.
    match (a_lib, b_lib) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let flip = |order: Ordering| if inverted { order.reverse() } else { order };

    if a_lib {
        let dir_order = a.is_dir().cmp(&b.is_dir());
        if dir_order != Ordering::Equal {
            return dir_order;
        }
        let type_order = match (a.id_code, b.id_code) {
            (Some(x), Some(y)) => x.code().cmp(&y.code()),
            (x, y) => x.is_some().cmp(&y.is_some()),
        };
        if type_order != Ordering::Equal {
            return flip(type_order);
        }
    } else {
        let suffix_order = casefold_cmp(suffix(&a.relpath), suffix(&b.relpath));
        if suffix_order != Ordering::Equal {
            return flip(suffix_order);
        }
    }

    flip(compare_tiebreak(a, b))
}

/// Extension used for sorting. Compressed containers keep their double suffix.
fn suffix(relpath: &str) -> &str {
    if let Some(pos) = relpath.find(".blend.gz") {
        return &relpath[pos..];
    }
    relpath.rfind('.').map_or("", |pos| &relpath[pos..])
}
