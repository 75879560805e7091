//! Mapping from coreutils stderr text to model error kinds.
//!
//! Each utility gets its own table because the same OS error means
//! different things per operation: `ln` reports a missing source with
//! ENOENT where the model says "not a file", and `mv` renders any ENOTDIR
//! as a plain missing path (the model mirrors that coercion).

use sift_error::ErrorKind;

pub fn common(stderr: &str) -> Option<ErrorKind> {
    if stderr.contains("No such file or directory") {
        Some(ErrorKind::DoesNotExist)
    } else if stderr.contains("Not a directory") {
        Some(ErrorKind::NotDir)
    } else if stderr.contains("Is a directory") {
        Some(ErrorKind::NotFile)
    } else if stderr.contains("File exists") {
        Some(ErrorKind::Exists)
    } else if stderr.contains("Directory not empty") {
        Some(ErrorKind::NotEmpty)
    } else {
        None
    }
}

pub fn read(stderr: &str) -> Option<ErrorKind> {
    common(stderr)
}

pub fn write(stderr: &str) -> Option<ErrorKind> {
    common(stderr)
}

pub fn truncate(stderr: &str) -> Option<ErrorKind> {
    common(stderr)
}

pub fn mv(stderr: &str) -> Option<ErrorKind> {
    if stderr.contains("are the same file") {
        Some(ErrorKind::SameFile)
    } else if stderr.contains("to a subdirectory of itself") {
        Some(ErrorKind::CannotMoveInsideSelf)
    } else if stderr.contains("cannot overwrite non-directory") {
        Some(ErrorKind::CannotOverwriteNonDirWithDir)
    } else if stderr.contains("cannot overwrite directory") {
        Some(ErrorKind::CannotOverwriteDirWithNonDir)
    } else if stderr.contains("Directory not empty") {
        Some(ErrorKind::NotEmpty)
    } else if stderr.contains("Not a directory") || stderr.contains("No such file or directory")
    {
        // mv reports a file in the middle of a path the same way it
        // reports a missing one.
        Some(ErrorKind::DoesNotExist)
    } else {
        common(stderr)
    }
}

pub fn ln(stderr: &str) -> Option<ErrorKind> {
    if stderr.contains("hard link not allowed for directory") {
        Some(ErrorKind::NotFile)
    } else if stderr.contains("are the same file") {
        // ln diagnoses linking a name onto itself before hitting EEXIST;
        // either way the destination slot is occupied.
        Some(ErrorKind::Exists)
    } else if stderr.contains("Not a directory") {
        Some(ErrorKind::NotDir)
    } else if stderr.contains("failed to access") {
        // The link source is missing: not a linkable file.
        Some(ErrorKind::NotFile)
    } else if stderr.contains("File exists") {
        Some(ErrorKind::Exists)
    } else if stderr.contains("No such file or directory") {
        // The destination's parent is missing.
        Some(ErrorKind::DoesNotExist)
    } else {
        common(stderr)
    }
}
