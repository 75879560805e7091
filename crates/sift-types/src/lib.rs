#![forbid(unsafe_code)]
//! Shared vocabulary for the sift workspace.
//!
//! Path and payload primitives plus the operation/event wire surface that
//! the generator, the model, the checker, and the SUT adapters all speak.

mod event;

pub use event::{Completion, CompletionKind, Event, EventError, EventKind, Op};

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Paths ───────────────────────────────────────────────────────────────────

/// A filesystem path: an ordered sequence of component strings.
///
/// The empty sequence is the root. The derived order is the one the entry
/// store relies on: component-wise lexicographic, with equal prefixes broken
/// by length (shorter first). Under that order every descendant of a path
/// sorts into a contiguous run directly after it.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FsPath(Vec<String>);

impl FsPath {
    /// The root path (empty component sequence).
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn new(components: Vec<String>) -> Self {
        Self(components)
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Number of components; 0 for the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The path with the final component removed. `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, init)) => Some(Self(init.to_vec())),
            None => None,
        }
    }

    /// Final component, if any.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Extend this path by one component.
    #[must_use]
    pub fn child(&self, component: impl Into<String>) -> Self {
        let mut components = self.0.clone();
        components.push(component.into());
        Self(components)
    }

    /// Extend this path by every component of `rel`.
    #[must_use]
    pub fn join(&self, rel: &Self) -> Self {
        let mut components = self.0.clone();
        components.extend(rel.0.iter().cloned());
        Self(components)
    }

    /// The remainder of `self` after `prefix`, or `None` if `prefix` is not
    /// a (non-strict) prefix of `self`.
    #[must_use]
    pub fn strip_prefix(&self, prefix: &Self) -> Option<Self> {
        if self.0.len() < prefix.0.len() || self.0[..prefix.0.len()] != prefix.0[..] {
            return None;
        }
        Some(Self(self.0[prefix.0.len()..].to_vec()))
    }

    /// True if `self` is a strict ancestor of `other`, at any depth.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.0.len() > self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// True if `other` is a direct child of `self`.
    #[must_use]
    pub fn is_parent_of(&self, other: &Self) -> bool {
        other.0.len() == self.0.len() + 1 && other.0[..self.0.len()] == self.0[..]
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for component in &self.0 {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

impl From<Vec<String>> for FsPath {
    fn from(components: Vec<String>) -> Self {
        Self(components)
    }
}

impl<const N: usize> From<[&str; N]> for FsPath {
    fn from(components: [&str; N]) -> Self {
        Self(components.iter().map(|c| (*c).to_owned()).collect())
    }
}

impl FromIterator<String> for FsPath {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ── Payload bytes ───────────────────────────────────────────────────────────

/// File contents: arbitrary bytes, hex-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Data(Vec<u8>);

impl Data {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Empty contents.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(hex_str).map(Self)
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append `other`'s bytes to this payload.
    pub fn extend_from(&mut self, other: &Self) {
        self.0.extend_from_slice(&other.0);
    }

    /// Resize to `len` bytes, zero-filling any growth.
    pub fn resize_zero_filled(&mut self, len: usize) {
        self.0.resize(len, 0);
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Serialize for Data {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Data {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Self::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}

// ── Inode numbers ───────────────────────────────────────────────────────────

/// Identity of a content-bearing file object in the inode table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InodeNumber(pub u64);

impl InodeNumber {
    /// Successor id, used by the allocator's monotonic counter.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for InodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
