//! Operation and event wire surface.
//!
//! An [`Op`] is an invocation; an [`Event`] is one line of a history log
//! (`{process, type, f, value, error?, time, index}`); a [`Completion`] is
//! the outcome of applying an operation, before it is stamped with a time
//! and index. Serialization is adjacently tagged so an `Op` contributes the
//! `f`/`value` fields of its enclosing event.

use crate::{Data, FsPath};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use sift_error::ErrorKind;
use std::fmt;

// ── Operations ──────────────────────────────────────────────────────────────

/// A filesystem operation invocation (or, with return values filled in, its
/// ok completion).
///
/// `Read` carries `None` as an invocation and `Some(data)` once completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "f", content = "value", rename_all = "snake_case")]
pub enum Op {
    Touch(FsPath),
    Read(FsPath, Option<Data>),
    Write(FsPath, Data),
    Append(FsPath, Data),
    Mkdir(FsPath),
    Rm(FsPath),
    Mv(FsPath, FsPath),
    Ln(FsPath, FsPath),
    Truncate(FsPath, i64),
    Fsync(FsPath),
    LoseUnfsyncedWrites,
}

impl Op {
    /// Wire name of the operation (`f` field).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Touch(_) => "touch",
            Self::Read(..) => "read",
            Self::Write(..) => "write",
            Self::Append(..) => "append",
            Self::Mkdir(_) => "mkdir",
            Self::Rm(_) => "rm",
            Self::Mv(..) => "mv",
            Self::Ln(..) => "ln",
            Self::Truncate(..) => "truncate",
            Self::Fsync(_) => "fsync",
            Self::LoseUnfsyncedWrites => "lose_unfsynced_writes",
        }
    }

    /// Strip any completion payload, leaving the invocation form.
    #[must_use]
    pub fn invocation(&self) -> Self {
        match self {
            Self::Read(path, _) => Self::Read(path.clone(), None),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Touch(path) | Self::Mkdir(path) | Self::Rm(path) | Self::Fsync(path) => {
                write!(f, "{} {path}", self.name())
            }
            Self::Read(path, data) => match data {
                Some(data) => write!(f, "read {path} -> {data}"),
                None => write!(f, "read {path}"),
            },
            Self::Write(path, data) | Self::Append(path, data) => {
                write!(f, "{} {path} {data}", self.name())
            }
            Self::Mv(from, to) | Self::Ln(from, to) => {
                write!(f, "{} {from} {to}", self.name())
            }
            Self::Truncate(path, delta) => write!(f, "truncate {path} {delta:+}"),
            Self::LoseUnfsyncedWrites => write!(f, "lose_unfsynced_writes"),
        }
    }
}

// ── Event errors ────────────────────────────────────────────────────────────

/// The `error` field of a failure or info event: either a model error kind
/// or the engine's opaque timeout marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    Model(ErrorKind),
    Timeout,
}

impl EventError {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Model(kind) => kind.code(),
            Self::Timeout => "timeout",
        }
    }
}

impl From<ErrorKind> for EventError {
    fn from(kind: ErrorKind) -> Self {
        Self::Model(kind)
    }
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for EventError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for EventError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        if code == "timeout" {
            return Ok(Self::Timeout);
        }
        code.parse::<ErrorKind>()
            .map(Self::Model)
            .map_err(D::Error::custom)
    }
}

// ── Events ──────────────────────────────────────────────────────────────────

/// Event type: an operation is invoked, then completes `ok`/`fail`, or
/// `info` when its outcome is unknown (timeout, control events).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Invoke,
    Ok,
    Fail,
    Info,
}

/// One line of a history: an invocation or completion, stamped with the
/// process that issued it, a wall-clock offset, and a global event index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub process: u32,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(flatten)]
    pub op: Op,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EventError>,
    pub time: u64,
    pub index: u64,
}

impl Event {
    /// Build an invocation event.
    #[must_use]
    pub fn invoke(process: u32, op: Op, time: u64, index: u64) -> Self {
        Self {
            process,
            kind: EventKind::Invoke,
            op,
            error: None,
            time,
            index,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EventKind::Invoke => "invoke",
            EventKind::Ok => "ok",
            EventKind::Fail => "fail",
            EventKind::Info => "info",
        };
        write!(f, "{:>4} {:>6} {}", self.index, kind, self.op)?;
        if let Some(error) = self.error {
            write!(f, " [{error}]")?;
        }
        Ok(())
    }
}

// ── Completions ─────────────────────────────────────────────────────────────

/// Outcome of a completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Ok,
    Fail,
    Info,
}

impl From<CompletionKind> for EventKind {
    fn from(kind: CompletionKind) -> Self {
        match kind {
            CompletionKind::Ok => Self::Ok,
            CompletionKind::Fail => Self::Fail,
            CompletionKind::Info => Self::Info,
        }
    }
}

/// The outcome of applying an operation: the completed operation (with any
/// return value filled in) plus ok/fail/info and an optional error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub kind: CompletionKind,
    pub op: Op,
    pub error: Option<EventError>,
}

impl Completion {
    #[must_use]
    pub fn ok(op: Op) -> Self {
        Self {
            kind: CompletionKind::Ok,
            op,
            error: None,
        }
    }

    #[must_use]
    pub fn fail(op: Op, kind: ErrorKind) -> Self {
        Self {
            kind: CompletionKind::Fail,
            op,
            error: Some(EventError::Model(kind)),
        }
    }

    /// An opaque completion for an invocation whose outcome is unknown.
    #[must_use]
    pub fn timeout(op: Op) -> Self {
        Self {
            kind: CompletionKind::Info,
            op,
            error: Some(EventError::Timeout),
        }
    }

    /// Stamp this completion into a history event.
    #[must_use]
    pub fn into_event(self, process: u32, time: u64, index: u64) -> Event {
        Event {
            process,
            kind: self.kind.into(),
            op: self.op,
            error: self.error,
            time,
            index,
        }
    }
}
