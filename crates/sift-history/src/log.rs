//! JSON Lines event log: one event per line.
//!
//! Only `invoke` events are read back for replay; completions are kept in
//! the log for post-mortem inspection.

use sift_types::{Event, EventKind, Op};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed event on line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Write a full event history, one JSON object per line.
pub fn write_events(path: &Path, events: &[Event]) -> Result<(), LogError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for event in events {
        let line = serde_json::to_string(event).map_err(LogError::Encode)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read every event from a log file. Blank lines are skipped.
pub fn read_events(path: &Path) -> Result<Vec<Event>, LogError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = serde_json::from_str(&line).map_err(|source| LogError::Parse {
            line: number + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Read back just the invocations, in order, for replay.
pub fn read_invocations(path: &Path) -> Result<Vec<Op>, LogError> {
    Ok(read_events(path)?
        .into_iter()
        .filter(|event| event.kind == EventKind::Invoke)
        .map(|event| event.op)
        .collect())
}
