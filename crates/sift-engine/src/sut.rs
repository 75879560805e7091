//! The system-under-test seam.

use anyhow::Result;
use sift_model::FsState;
use sift_types::{Completion, Op};

/// A system under test.
///
/// Adapters map every invocation to a completion — including operation
/// failures and timeouts. An `Err` from `apply` means the harness itself
/// broke (mount gone, scratch directory unusable, unrecognised tool
/// output), which aborts the run rather than producing an event.
pub trait Sut {
    /// Prepare a fresh instance. Called before every execution, including
    /// each shrink candidate.
    fn setup(&mut self) -> Result<()>;

    /// Apply one operation and report its completion.
    fn apply(&mut self, op: &Op) -> Result<Completion>;

    /// Release resources after an execution.
    fn teardown(&mut self) -> Result<()>;
}

/// An in-process SUT backed by a second model instance.
///
/// Checking the model against itself always passes; this exists to exercise
/// the full generate → execute → check → shrink pipeline without touching a
/// real filesystem, both in tests and via `--db model`.
#[derive(Debug, Default)]
pub struct ModelSut {
    state: FsState,
}

impl ModelSut {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sut for ModelSut {
    fn setup(&mut self) -> Result<()> {
        self.state = FsState::new();
        Ok(())
    }

    fn apply(&mut self, op: &Op) -> Result<Completion> {
        let (next, completion) = self.state.apply(op);
        self.state = next;
        Ok(completion)
    }

    fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}
