//! Entry store: the cache+disk overlay of path → entry with tombstones.
//!
//! Hierarchy is never nested inside entries; it is recovered from the
//! path-sorted maps by prefix scans, which the path order makes contiguous
//! (a path's descendants sort directly after it).

use crate::{Entry, FsState};
use sift_error::{ErrorKind, Result};
use sift_types::FsPath;
use std::collections::BTreeSet;
use std::ops::Bound;

impl FsState {
    /// Overlay lookup without ancestor validation: the cache masks the
    /// disk, and a tombstone reports the path absent.
    #[must_use]
    pub fn resolve(&self, path: &FsPath) -> Option<&Entry> {
        let entry = match self.cache.entries.get(path) {
            Some(entry) => Some(entry),
            None => self.disk.entries.get(path),
        };
        match entry {
            Some(Entry::Tombstone) => None,
            other => other,
        }
    }

    /// Overlay lookup with ancestor validation.
    ///
    /// An absent path is only reported absent if it could exist: if any
    /// existing ancestor resolves to a non-directory the lookup fails with
    /// `NotDir`. Ancestors that are themselves absent contribute nothing
    /// (the caller decides whether absence is `DoesNotExist`).
    pub fn entry(&self, path: &FsPath) -> Result<Option<&Entry>> {
        match self.resolve(path) {
            Some(entry) => Ok(Some(entry)),
            None => match path.parent() {
                Some(parent) => match self.entry(&parent)? {
                    Some(Entry::Dir) | None => Ok(None),
                    Some(_) => Err(ErrorKind::NotDir),
                },
                None => Ok(None),
            },
        }
    }

    /// Set the cache entry at `path`; `None` stores a tombstone.
    ///
    /// The parent must resolve to a directory. Link counts are kept in step
    /// with the overlay: the replaced entry's link is decremented, the new
    /// entry's link incremented. Replacing a directory with anything else
    /// buries its whole subtree under tombstones.
    pub(crate) fn put(&mut self, path: &FsPath, entry: Option<Entry>) -> Result<()> {
        let Some(parent) = path.parent() else {
            // The root is permanently a directory.
            return match entry {
                Some(Entry::Dir) => Ok(()),
                _ => Err(ErrorKind::CannotDissocRoot),
            };
        };
        match self.entry(&parent)? {
            Some(Entry::Dir) => {}
            Some(_) => return Err(ErrorKind::NotDir),
            None => return Err(ErrorKind::DoesNotExist),
        }

        let old = self.resolve(path).cloned();
        if let Some(Entry::Link { inode }) = old {
            // Non-strict: the link may dangle after a crash.
            self.adjust_link_count(inode, -1, false)?;
        }
        if let Some(Entry::Link { inode }) = &entry {
            self.adjust_link_count(*inode, 1, true)?;
        }

        let new_is_dir = matches!(entry, Some(Entry::Dir));
        if matches!(old, Some(Entry::Dir)) && !new_is_dir {
            self.tombstone_descendants(path)?;
        }

        self.cache
            .entries
            .insert(path.clone(), entry.unwrap_or(Entry::Tombstone));
        Ok(())
    }

    /// Every overlay descendant of `path` (any depth), in path order, with
    /// its resolved entry. Tombstoned paths are excluded.
    #[must_use]
    pub fn descendants(&self, path: &FsPath) -> Vec<(FsPath, Entry)> {
        let mut paths: BTreeSet<&FsPath> = BTreeSet::new();
        for layer in [&self.cache, &self.disk] {
            let range = layer
                .entries
                .range::<FsPath, _>((Bound::Excluded(path), Bound::Unbounded));
            for (candidate, _) in range {
                // Descendants are contiguous under the path order.
                if !path.is_ancestor_of(candidate) {
                    break;
                }
                paths.insert(candidate);
            }
        }
        paths
            .into_iter()
            .filter_map(|p| self.resolve(p).map(|entry| (p.clone(), entry.clone())))
            .collect()
    }

    /// Direct, non-tombstoned children of `path` in the overlay.
    #[must_use]
    pub fn children(&self, path: &FsPath) -> Vec<(FsPath, Entry)> {
        self.descendants(path)
            .into_iter()
            .filter(|(candidate, _)| path.is_parent_of(candidate))
            .collect()
    }

    fn tombstone_descendants(&mut self, path: &FsPath) -> Result<()> {
        let buried = self.descendants(path);
        for (descendant, entry) in buried {
            if let Entry::Link { inode } = entry {
                self.adjust_link_count(inode, -1, false)?;
            }
            self.cache.entries.insert(descendant, Entry::Tombstone);
        }
        Ok(())
    }
}
