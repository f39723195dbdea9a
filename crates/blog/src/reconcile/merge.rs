//! Merge policy for primary and local records

use std::collections::HashSet;

use crate::models::{Record, RecordId, sort_newest_first};

/// Combine primary and local records into one listing
///
/// Primary records come first, newest first. Local records follow, also
/// newest first, minus any whose id the primary store already returned
/// (primary wins). Duplicate ids within either side keep their first
/// occurrence after sorting.
pub fn merge_records<R: Record>(mut primary: Vec<R>, mut local: Vec<R>) -> Vec<R> {
    sort_newest_first(&mut primary);
    sort_newest_first(&mut local);

    let mut seen: HashSet<RecordId> = HashSet::with_capacity(primary.len() + local.len());
    primary
        .into_iter()
        .chain(local)
        .filter(|r| seen.insert(r.id().clone()))
        .collect()
}
