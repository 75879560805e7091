//! Inode table: allocation, overlay lookup, reference counting, and
//! copy-on-write updates into the cache layer.

use crate::{FsState, Inode};
use sift_error::{ErrorKind, Result};
use sift_types::{Data, InodeNumber};

impl FsState {
    /// Allocate a fresh inode holding `data`, in the cache layer, with no
    /// links yet. Ids are handed out monotonically and never reused.
    pub(crate) fn alloc_inode(&mut self, data: Data) -> InodeNumber {
        let number = self.next_inode;
        self.next_inode = number.next();
        self.cache
            .inodes
            .insert(number, Inode { link_count: 0, data });
        number
    }

    /// Overlay lookup: cache first, then disk.
    #[must_use]
    pub fn inode(&self, number: InodeNumber) -> Option<&Inode> {
        self.cache
            .inodes
            .get(&number)
            .or_else(|| self.disk.inodes.get(&number))
    }

    /// Apply `f` to the inode and store the result in the cache layer,
    /// copying from disk if the inode only lives there.
    pub(crate) fn update_inode(
        &mut self,
        number: InodeNumber,
        f: impl FnOnce(&mut Inode),
    ) -> Result<()> {
        let mut inode = self.inode(number).cloned().ok_or(ErrorKind::NoSuchInode)?;
        f(&mut inode);
        self.cache.inodes.insert(number, inode);
        Ok(())
    }

    /// Add `delta` to the inode's link count, in the cache layer.
    ///
    /// With `strict` a missing inode is an error; otherwise the adjustment
    /// is dropped (dangling links are legal after a crash). A cache-only
    /// inode whose count reaches zero is destroyed immediately; one that is
    /// also on disk lingers until its zero-count state is fsynced.
    pub(crate) fn adjust_link_count(
        &mut self,
        number: InodeNumber,
        delta: i64,
        strict: bool,
    ) -> Result<()> {
        let Some(inode) = self.inode(number) else {
            return if strict {
                Err(ErrorKind::NoSuchInode)
            } else {
                Ok(())
            };
        };
        let mut inode = inode.clone();
        let count = i64::from(inode.link_count).saturating_add(delta).max(0);
        inode.link_count = u32::try_from(count).unwrap_or(u32::MAX);

        if inode.link_count == 0 && !self.disk.inodes.contains_key(&number) {
            self.cache.inodes.remove(&number);
        } else {
            self.cache.inodes.insert(number, inode);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Entry;
    use sift_types::FsPath;

    #[test]
    fn alloc_hands_out_monotonic_ids_in_cache() {
        let mut state = FsState::new();
        let a = state.alloc_inode(Data::from_hex("aa").expect("hex"));
        let b = state.alloc_inode(Data::empty());
        assert_eq!(b, a.next());
        assert!(state.cache().inodes.contains_key(&a));
        assert!(state.disk().inodes.is_empty());
        assert_eq!(state.inode(a).map(|i| i.link_count), Some(0));
    }

    #[test]
    fn update_copies_on_write_from_disk() {
        let mut state = FsState::new();
        let number = InodeNumber(9);
        state.disk.inodes.insert(
            number,
            Inode {
                link_count: 1,
                data: Data::from_hex("00").expect("hex"),
            },
        );
        state
            .update_inode(number, |inode| inode.data = Data::from_hex("ff").expect("hex"))
            .expect("update");
        // Disk copy untouched; the new value masks it from the cache.
        assert_eq!(state.disk.inodes[&number].data.to_hex(), "00");
        assert_eq!(state.inode(number).map(|i| i.data.to_hex()).as_deref(), Some("ff"));
    }

    #[test]
    fn update_missing_inode_is_an_error() {
        let mut state = FsState::new();
        let err = state.update_inode(InodeNumber(42), |_| {}).unwrap_err();
        assert_eq!(err, ErrorKind::NoSuchInode);
    }

    #[test]
    fn zero_count_cache_only_inode_is_destroyed() {
        let mut state = FsState::new();
        let number = state.alloc_inode(Data::empty());
        state.adjust_link_count(number, 1, true).expect("increment");
        state.adjust_link_count(number, -1, true).expect("decrement");
        assert!(state.inode(number).is_none());
    }

    #[test]
    fn zero_count_disk_inode_survives_until_fsync() {
        let mut state = FsState::new();
        let number = InodeNumber(0);
        state.disk.inodes.insert(
            number,
            Inode {
                link_count: 1,
                data: Data::empty(),
            },
        );
        state.adjust_link_count(number, -1, true).expect("decrement");
        assert_eq!(state.inode(number).map(|i| i.link_count), Some(0));
        state.fsync_inode(number);
        assert!(state.inode(number).is_none());
        assert!(!state.disk.inodes.contains_key(&number));
    }

    #[test]
    fn non_strict_adjust_ignores_missing_inode() {
        let mut state = FsState::new();
        state
            .adjust_link_count(InodeNumber(7), -1, false)
            .expect("non-strict adjust");
        assert_eq!(state.entry(&FsPath::root()).expect("root"), Some(&Entry::Dir));
    }
}
