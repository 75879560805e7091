//! Layer contents: directory entries and the inode table.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use sift_types::{Data, FsPath, InodeNumber};
use std::collections::BTreeMap;

/// A directory entry.
///
/// `Tombstone` records that the cache has deleted a path which may still
/// exist on disk. It is a first-class variant so that "absent",
/// "tombstoned in cache over present on disk", and "present" stay three
/// distinct observable states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entry {
    Dir,
    Link { inode: InodeNumber },
    Tombstone,
}

/// A content-bearing file object, referenced by zero or more links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inode {
    pub link_count: u32,
    pub data: Data,
}

impl Inode {
    /// A fresh inode with no links and no contents.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            link_count: 0,
            data: Data::empty(),
        }
    }
}

/// One of the two storage layers (`disk` or `cache`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Layer {
    pub inodes: BTreeMap<InodeNumber, Inode>,
    #[serde(serialize_with = "entries_as_pairs")]
    pub entries: BTreeMap<FsPath, Entry>,
}

// JSON object keys must be strings; paths are arrays of components, so the
// entry map renders as a sequence of [path, entry] pairs.
fn entries_as_pairs<S: Serializer>(
    entries: &BTreeMap<FsPath, Entry>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(entries.len()))?;
    for pair in entries {
        seq.serialize_element(&pair)?;
    }
    seq.end()
}
