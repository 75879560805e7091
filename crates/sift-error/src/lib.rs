#![forbid(unsafe_code)]
//! Error types for the sift filesystem model.
//!
//! Defines `ErrorKind`, the closed set of failure codes an operation can
//! complete with, and a `Result<T>` alias used throughout the model. Error
//! kinds are values: operations return them, the interpreter renders them as
//! failure completions, and the SUT adapters map OS error text onto them.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A failure code for a filesystem operation.
///
/// The first nine kinds surface as failure completions on the reporting
/// boundary. `CannotDissocRoot` and `NoSuchInode` are internal: well-formed
/// histories never produce them, and they exist so that misuse of the state
/// primitives is an observable error rather than silent corruption.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("does not exist")]
    DoesNotExist,

    #[error("already exists")]
    Exists,

    #[error("not a directory")]
    NotDir,

    #[error("not a file")]
    NotFile,

    #[error("directory not empty")]
    NotEmpty,

    #[error("source and destination are the same file")]
    SameFile,

    #[error("cannot overwrite directory with non-directory")]
    CannotOverwriteDirWithNonDir,

    #[error("cannot overwrite non-directory with directory")]
    CannotOverwriteNonDirWithDir,

    #[error("cannot move a directory inside itself")]
    CannotMoveInsideSelf,

    #[error("cannot remove the root directory")]
    CannotDissocRoot,

    #[error("no such inode")]
    NoSuchInode,
}

impl ErrorKind {
    /// Stable wire name of this kind, as it appears in event logs.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::DoesNotExist => "does_not_exist",
            Self::Exists => "exists",
            Self::NotDir => "not_dir",
            Self::NotFile => "not_file",
            Self::NotEmpty => "not_empty",
            Self::SameFile => "same_file",
            Self::CannotOverwriteDirWithNonDir => "cannot_overwrite_dir_with_non_dir",
            Self::CannotOverwriteNonDirWithDir => "cannot_overwrite_non_dir_with_dir",
            Self::CannotMoveInsideSelf => "cannot_move_inside_self",
            Self::CannotDissocRoot => "cannot_dissoc_root",
            Self::NoSuchInode => "no_such_inode",
        }
    }
}

impl FromStr for ErrorKind {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "does_not_exist" => Ok(Self::DoesNotExist),
            "exists" => Ok(Self::Exists),
            "not_dir" => Ok(Self::NotDir),
            "not_file" => Ok(Self::NotFile),
            "not_empty" => Ok(Self::NotEmpty),
            "same_file" => Ok(Self::SameFile),
            "cannot_overwrite_dir_with_non_dir" => Ok(Self::CannotOverwriteDirWithNonDir),
            "cannot_overwrite_non_dir_with_dir" => Ok(Self::CannotOverwriteNonDirWithDir),
            "cannot_move_inside_self" => Ok(Self::CannotMoveInsideSelf),
            "cannot_dissoc_root" => Ok(Self::CannotDissocRoot),
            "no_such_inode" => Ok(Self::NoSuchInode),
            other => Err(UnknownErrorCode(other.to_owned())),
        }
    }
}

/// Raised when parsing an error code that is not part of the closed set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown error code: {0}")]
pub struct UnknownErrorCode(pub String);

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, ErrorKind>;
