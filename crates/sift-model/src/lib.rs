#![forbid(unsafe_code)]
//! Reference model of a POSIX-like filesystem with a write-back page cache.
//!
//! The model is purely functional at its boundary: [`FsState::apply`] takes
//! an operation and returns a new state plus a completion, leaving the input
//! state untouched. Internally the state is a pair of layers — `disk` and a
//! `cache` overlay that masks it — mirroring a caching FUSE filesystem that
//! writes metadata through and data back.
//!
//! Directory structure is not nested: entries live in a path-sorted map and
//! hierarchy is recovered by prefix scans. Files are hard links (`Entry::Link`)
//! into an integer-keyed inode table, which keeps the aliasing graph free of
//! pointer cycles.

mod crash;
mod entries;
mod inodes;
pub mod invariants;
mod layer;
mod ops;

pub use layer::{Entry, Inode, Layer};

use serde::Serialize;
use sift_types::{FsPath, InodeNumber};

/// Full filesystem state: a monotonic inode allocator and the two layers.
///
/// The disk layer always contains at least the root directory entry. Inodes
/// may live in either layer; lookups consult the cache first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FsState {
    next_inode: InodeNumber,
    disk: Layer,
    cache: Layer,
}

impl FsState {
    /// An empty filesystem: just the root directory, on disk.
    #[must_use]
    pub fn new() -> Self {
        let mut disk = Layer::default();
        disk.entries.insert(FsPath::root(), Entry::Dir);
        Self {
            next_inode: InodeNumber(0),
            disk,
            cache: Layer::default(),
        }
    }

    #[must_use]
    pub fn disk(&self) -> &Layer {
        &self.disk
    }

    #[must_use]
    pub fn cache(&self) -> &Layer {
        &self.cache
    }

    /// The id the next allocated inode will receive.
    #[must_use]
    pub fn next_inode(&self) -> InodeNumber {
        self.next_inode
    }
}

impl Default for FsState {
    fn default() -> Self {
        Self::new()
    }
}
