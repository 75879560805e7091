//! The operation interpreter.
//!
//! [`FsState::apply`] is the model's whole public surface for execution:
//! one exhaustive match over the operation vocabulary, producing a new
//! state and a completion. Error kinds raised anywhere inside an operation
//! body collapse into a failure completion at this boundary, and the state
//! reverts to its pre-operation value.

use crate::{Entry, FsState};
use sift_error::{ErrorKind, Result};
use sift_types::{Completion, Data, FsPath, Op};

impl FsState {
    /// Apply one operation, returning the successor state and the
    /// completion to report.
    ///
    /// Every successful operation ends with an automatic metadata fsync:
    /// entry changes are promoted to disk, inode data stays cached until an
    /// explicit `fsync`. On failure the returned state is unchanged.
    #[must_use]
    pub fn apply(&self, op: &Op) -> (FsState, Completion) {
        let mut next = self.clone();
        match next.dispatch(op) {
            Ok(completed) => {
                next.fsync_metadata();
                (next, Completion::ok(completed))
            }
            Err(kind) => (self.clone(), Completion::fail(op.invocation(), kind)),
        }
    }

    fn dispatch(&mut self, op: &Op) -> Result<Op> {
        match op {
            Op::Touch(path) => {
                self.touch(path)?;
                Ok(op.clone())
            }
            Op::Read(path, _) => {
                let data = self.read(path)?;
                Ok(Op::Read(path.clone(), Some(data)))
            }
            Op::Write(path, data) => {
                self.write(path, data)?;
                Ok(op.clone())
            }
            Op::Append(path, data) => {
                self.append(path, data)?;
                Ok(op.clone())
            }
            Op::Mkdir(path) => {
                self.mkdir(path)?;
                Ok(op.clone())
            }
            Op::Rm(path) => {
                self.rm(path)?;
                Ok(op.clone())
            }
            Op::Mv(from, to) => {
                // Shell mv reports a file component in the path as a plain
                // missing target; coreutils is ground truth here.
                self.mv(from, to).map_err(|kind| match kind {
                    ErrorKind::NotDir => ErrorKind::DoesNotExist,
                    other => other,
                })?;
                Ok(op.clone())
            }
            Op::Ln(from, to) => {
                self.ln(from, to)?;
                Ok(op.clone())
            }
            Op::Truncate(path, delta) => {
                self.truncate(path, *delta)?;
                Ok(op.clone())
            }
            Op::Fsync(path) => {
                self.fsync(path)?;
                Ok(op.clone())
            }
            Op::LoseUnfsyncedWrites => {
                self.lose_unfsynced_writes();
                Ok(op.clone())
            }
        }
    }

    fn touch(&mut self, path: &FsPath) -> Result<()> {
        if self.entry(path)?.is_some() {
            return Ok(());
        }
        let inode = self.alloc_inode(Data::empty());
        self.put(path, Some(Entry::Link { inode }))
    }

    fn read(&self, path: &FsPath) -> Result<Data> {
        match self.entry(path)? {
            None | Some(Entry::Tombstone) => Err(ErrorKind::DoesNotExist),
            Some(Entry::Dir) => Err(ErrorKind::NotFile),
            Some(Entry::Link { inode }) => {
                // A dangling link reads as empty.
                Ok(self
                    .inode(*inode)
                    .map(|inode| inode.data.clone())
                    .unwrap_or_default())
            }
        }
    }

    fn write(&mut self, path: &FsPath, data: &Data) -> Result<()> {
        match self.entry(path)?.cloned() {
            Some(Entry::Dir) => Err(ErrorKind::NotFile),
            Some(Entry::Link { inode }) => {
                self.update_inode(inode, |inode| inode.data = data.clone())
            }
            None | Some(Entry::Tombstone) => {
                let inode = self.alloc_inode(data.clone());
                self.put(path, Some(Entry::Link { inode }))
            }
        }
    }

    fn append(&mut self, path: &FsPath, data: &Data) -> Result<()> {
        match self.entry(path)?.cloned() {
            Some(Entry::Dir) => Err(ErrorKind::NotFile),
            Some(Entry::Link { inode }) => {
                self.update_inode(inode, |inode| inode.data.extend_from(data))
            }
            None | Some(Entry::Tombstone) => {
                let inode = self.alloc_inode(data.clone());
                self.put(path, Some(Entry::Link { inode }))
            }
        }
    }

    fn mkdir(&mut self, path: &FsPath) -> Result<()> {
        if self.entry(path)?.is_some() {
            return Err(ErrorKind::Exists);
        }
        self.put(path, Some(Entry::Dir))
    }

    fn rm(&mut self, path: &FsPath) -> Result<()> {
        if self.entry(path)?.is_none() {
            return Err(ErrorKind::DoesNotExist);
        }
        self.put(path, None)
    }

    fn ln(&mut self, from: &FsPath, to: &FsPath) -> Result<()> {
        let inode = match self.entry(from)? {
            Some(Entry::Link { inode }) => *inode,
            _ => return Err(ErrorKind::NotFile),
        };
        // Linking into a directory targets from's name inside it.
        let dest = match (self.entry(to)?, from.last()) {
            (Some(Entry::Dir), Some(last)) => to.child(last),
            _ => to.clone(),
        };
        if self.entry(&dest)?.is_some() {
            return Err(ErrorKind::Exists);
        }
        self.put(&dest, Some(Entry::Link { inode }))
    }

    fn mv(&mut self, from: &FsPath, to: &FsPath) -> Result<()> {
        if from.is_root() {
            return Err(ErrorKind::CannotMoveInsideSelf);
        }
        let target = match (self.entry(to)?, from.last()) {
            (Some(Entry::Dir), Some(last)) => to.child(last),
            _ => to.clone(),
        };

        match target.parent() {
            Some(parent) => match self.entry(&parent)? {
                Some(Entry::Dir) => {}
                Some(_) => return Err(ErrorKind::NotDir),
                None => return Err(ErrorKind::DoesNotExist),
            },
            None => return Err(ErrorKind::DoesNotExist),
        }

        let from_entry = match self.entry(from)? {
            Some(entry) => entry.clone(),
            None => return Err(ErrorKind::DoesNotExist),
        };
        let target_entry = self.entry(&target)?.cloned();

        if target == *from {
            return Err(ErrorKind::SameFile);
        }
        if let (Entry::Link { inode: a }, Some(Entry::Link { inode: b })) =
            (&from_entry, &target_entry)
        {
            if a == b {
                return Err(ErrorKind::SameFile);
            }
        }

        if let Some(existing) = &target_entry {
            let target_is_dir = matches!(existing, Entry::Dir);
            let from_is_dir = matches!(from_entry, Entry::Dir);
            if target_is_dir && !from_is_dir {
                return Err(ErrorKind::CannotOverwriteDirWithNonDir);
            }
            if !target_is_dir && from_is_dir {
                return Err(ErrorKind::CannotOverwriteNonDirWithDir);
            }
            if target_is_dir && !self.descendants(&target).is_empty() {
                return Err(ErrorKind::NotEmpty);
            }
        }

        if from.is_ancestor_of(&target) {
            return Err(ErrorKind::CannotMoveInsideSelf);
        }

        // Replant the subtree at the target before burying the source, so
        // no inode's link count transits zero mid-move.
        let subtree: Vec<(FsPath, Entry)> = self
            .descendants(from)
            .into_iter()
            .filter_map(|(path, entry)| {
                path.strip_prefix(from).map(|rel| (rel, entry))
            })
            .collect();
        self.put(&target, Some(from_entry))?;
        for (rel, entry) in &subtree {
            self.put(&target.join(rel), Some(entry.clone()))?;
        }
        self.put(from, None)
    }

    fn truncate(&mut self, path: &FsPath, delta: i64) -> Result<()> {
        match self.entry(path)?.cloned() {
            Some(Entry::Dir) => Err(ErrorKind::NotFile),
            Some(Entry::Link { inode }) => self.update_inode(inode, |inode| {
                let len = resized_len(inode.data.len(), delta);
                inode.data.resize_zero_filled(len);
            }),
            None | Some(Entry::Tombstone) => {
                let mut data = Data::empty();
                data.resize_zero_filled(resized_len(0, delta));
                let inode = self.alloc_inode(data);
                self.put(path, Some(Entry::Link { inode }))
            }
        }
    }

    fn fsync(&mut self, path: &FsPath) -> Result<()> {
        match self.entry(path)? {
            None | Some(Entry::Tombstone) => Err(ErrorKind::DoesNotExist),
            // Directory metadata is always fsynced already.
            Some(Entry::Dir) => Ok(()),
            Some(Entry::Link { inode }) => {
                let inode = *inode;
                self.fsync_inode(inode);
                Ok(())
            }
        }
    }
}

/// Signed size change, clamped at zero, matching `truncate -s +N/-N`.
fn resized_len(len: usize, delta: i64) -> usize {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    usize::try_from(len.saturating_add(delta).max(0)).unwrap_or(0)
}
