#![forbid(unsafe_code)]
//! The divergence checker.
//!
//! Takes an executed history — alternating invoke/completion events as the
//! SUT produced them — and replays the same invocations through the
//! reference model. The first index at which the model's event differs from
//! the SUT's is the divergence point; everything before it is repeated
//! verbatim in the report, together with the model state around the
//! offending operation.
//!
//! Model events copy the actual event's `time` and `index`, so equality is
//! plain structural equality and a divergence is always a difference in
//! `type`, `f`, `value`, or `error`.

use serde::Serialize;
use sift_model::FsState;
use sift_types::{Event, EventKind};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Verdict for one executed history.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Valid,
    Invalid(Box<Divergence>),
}

impl CheckOutcome {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub fn divergence(&self) -> Option<&Divergence> {
        match self {
            Self::Valid => None,
            Self::Invalid(divergence) => Some(divergence),
        }
    }
}

/// The earliest point at which model and SUT disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    /// Position of the mismatching event in the history.
    pub index: usize,
    /// Every event before the mismatch.
    pub trace: Vec<Event>,
    /// Model state before applying the diverging operation.
    pub state_before: FsState,
    /// Model state after applying it.
    pub state_after: FsState,
    /// What the model says this event should have been.
    pub expected: Event,
    /// What the SUT actually produced.
    pub actual: Event,
}

/// Replay `events` through the model and locate the earliest divergence.
#[must_use]
pub fn check(events: &[Event]) -> CheckOutcome {
    let mut model = FsState::new();
    let mut pending = HashMap::new();

    for (index, actual) in events.iter().enumerate() {
        let state_before = model.clone();
        let expected = match actual.kind {
            EventKind::Invoke => {
                pending.insert(actual.process, actual.op.clone());
                actual.clone()
            }
            EventKind::Ok | EventKind::Fail => match pending.remove(&actual.process) {
                Some(op) => {
                    let (next, completion) = model.apply(&op);
                    model = next;
                    completion.into_event(actual.process, actual.time, actual.index)
                }
                None => {
                    // A completion with no matching invoke: nothing to
                    // replay, treat it as opaque.
                    warn!(index, "completion without a pending invocation");
                    actual.clone()
                }
            },
            // Outcome unknown (timeout) or a control event: opaque, and the
            // model does not advance.
            EventKind::Info => {
                pending.remove(&actual.process);
                actual.clone()
            }
        };

        if expected != *actual {
            debug!(index, %actual, "history diverges from the model");
            return CheckOutcome::Invalid(Box::new(Divergence {
                index,
                trace: events[..index].to_vec(),
                state_before,
                state_after: model,
                expected,
                actual: actual.clone(),
            }));
        }
    }

    CheckOutcome::Valid
}
