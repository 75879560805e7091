//! Internal consistency checks for the model state.
//!
//! These are the properties the test suites assert after every applied
//! operation; production code never calls them.

use crate::{Entry, FsState};
use sift_types::{FsPath, InodeNumber};
use std::collections::{BTreeMap, BTreeSet};

/// Check every state invariant, returning a description of each violation.
#[must_use]
pub fn violations(state: &FsState) -> Vec<String> {
    let mut found = Vec::new();

    // Root always resolves to a directory.
    match state.resolve(&FsPath::root()) {
        Some(Entry::Dir) => {}
        other => found.push(format!("root resolves to {other:?}, expected Dir")),
    }

    // Metadata is write-through: between operations the cache holds no
    // entries, only unfsynced inode data.
    if !state.cache().entries.is_empty() {
        found.push(format!(
            "cache holds {} entries between operations",
            state.cache().entries.len()
        ));
    }

    let mut overlay_counts: BTreeMap<InodeNumber, u32> = BTreeMap::new();
    for path in overlay_paths(state) {
        let Some(entry) = state.resolve(&path) else {
            continue;
        };
        if let Entry::Link { inode } = entry {
            *overlay_counts.entry(*inode).or_insert(0) += 1;
            // Every reachable link references a live inode.
            if state.inode(*inode).is_none() {
                found.push(format!("link at {path} references missing inode {inode}"));
            }
        }
    }

    // Cached link counts agree with the overlay's reference counts.
    for (number, inode) in &state.cache().inodes {
        let expected = overlay_counts.get(number).copied().unwrap_or(0);
        if inode.link_count != expected {
            found.push(format!(
                "cached inode {number} has link_count {} but {expected} overlay links",
                inode.link_count
            ));
        }
    }

    found
}

/// Post-crash invariants: the disk image is self-contained.
#[must_use]
pub fn post_crash_violations(state: &FsState) -> Vec<String> {
    let mut found = violations(state);

    if !state.cache().inodes.is_empty() {
        found.push(format!(
            "cache holds {} inodes after a crash",
            state.cache().inodes.len()
        ));
    }

    let mut disk_counts: BTreeMap<InodeNumber, u32> = BTreeMap::new();
    for (path, entry) in &state.disk().entries {
        if let Entry::Link { inode } = entry {
            *disk_counts.entry(*inode).or_insert(0) += 1;
            if !state.disk().inodes.contains_key(inode) {
                found.push(format!("disk link at {path} dangles to inode {inode}"));
            }
        }
    }
    for (number, inode) in &state.disk().inodes {
        match disk_counts.get(number) {
            None => found.push(format!("disk inode {number} is unreachable")),
            Some(&count) if count != inode.link_count => found.push(format!(
                "disk inode {number} has link_count {} but {count} disk links",
                inode.link_count
            )),
            Some(_) => {}
        }
    }

    found
}

fn overlay_paths(state: &FsState) -> BTreeSet<FsPath> {
    state
        .disk()
        .entries
        .keys()
        .chain(state.cache().entries.keys())
        .cloned()
        .collect()
}
