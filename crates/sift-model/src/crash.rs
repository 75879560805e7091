//! Fsync and crash engine: cache→disk promotion, cache loss, recovery.

use crate::{Entry, FsState, Inode, Layer};
use sift_types::InodeNumber;
use std::collections::BTreeMap;
use tracing::{debug, trace};

impl FsState {
    /// Promote the cached copy of an inode to disk.
    ///
    /// An inode whose cached link count is zero has been unlinked from
    /// every path; fsyncing that state garbage-collects it from both
    /// layers.
    pub(crate) fn fsync_inode(&mut self, number: InodeNumber) {
        let Some(inode) = self.cache.inodes.remove(&number) else {
            return;
        };
        if inode.link_count == 0 {
            trace!(inode = number.0, "fsync releases unlinked inode");
            self.disk.inodes.remove(&number);
        } else {
            trace!(inode = number.0, bytes = inode.data.len(), "fsync inode to disk");
            self.disk.inodes.insert(number, inode);
        }
    }

    /// Automatic metadata fsync, run after every successful operation:
    /// every cache entry is promoted into disk (a tombstone removes the
    /// disk entry at its path). Inode data is not touched — metadata is
    /// write-through, data is write-back.
    pub(crate) fn fsync_metadata(&mut self) {
        let entries = std::mem::take(&mut self.cache.entries);
        for (path, entry) in entries {
            match entry {
                Entry::Tombstone => {
                    self.disk.entries.remove(&path);
                }
                other => {
                    self.disk.entries.insert(path, other);
                }
            }
        }
    }

    /// Crash and recover: drop the entire cache layer, then repair the
    /// disk image.
    ///
    /// Recovery heals every link whose inode was lost with a fresh empty
    /// inode at the same number, recomputes each inode's link count from
    /// the disk links that reference it, and destroys inodes no link
    /// reaches.
    pub(crate) fn lose_unfsynced_writes(&mut self) {
        let dropped_inodes = self.cache.inodes.len();
        let dropped_entries = self.cache.entries.len();
        self.cache = Layer::default();

        let mut counts: BTreeMap<InodeNumber, u32> = BTreeMap::new();
        for entry in self.disk.entries.values() {
            if let Entry::Link { inode } = entry {
                *counts.entry(*inode).or_insert(0) += 1;
            }
        }

        let mut healed = 0_usize;
        for (&number, _) in &counts {
            if !self.disk.inodes.contains_key(&number) {
                self.disk.inodes.insert(number, Inode::empty());
                healed += 1;
            }
        }

        let before = self.disk.inodes.len();
        self.disk.inodes.retain(|number, inode| match counts.get(number) {
            Some(&count) => {
                inode.link_count = count;
                true
            }
            None => false,
        });
        debug!(
            dropped_inodes,
            dropped_entries,
            healed,
            destroyed = before - self.disk.inodes.len(),
            "lost unfsynced writes and recovered"
        );
    }
}
