#![forbid(unsafe_code)]
//! The engine loop: generate a history, execute it against the system under
//! test, check the trace against the reference model, and shrink the first
//! failure to a locally minimal reproducer.

mod sut;

pub use sut::{ModelSut, Sut};

use anyhow::Result;
use sift_check::{check, CheckOutcome, Divergence};
use sift_history::{generate, GeneratorConfig};
use sift_types::{Event, Op};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of generated trials.
    pub trials: usize,
    /// Re-executions per shrink candidate before trusting a pass/fail
    /// verdict; raising it smooths over flaky SUTs.
    pub scour: usize,
    /// Base RNG seed; trial `i` uses `seed + i`.
    pub seed: u64,
    /// Operations per generated history.
    pub history_length: usize,
    /// Mix crash operations into generated histories.
    pub lose_unfsynced_writes: bool,
    /// Stop starting new trials after this much wall-clock time.
    pub time_limit: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trials: 200,
            scour: 1,
            seed: 0,
            history_length: 1000,
            lose_unfsynced_writes: false,
            time_limit: None,
        }
    }
}

/// A minimised failure: the smallest history we found that still breaks the
/// SUT, with the event log and divergence of its last failing execution.
#[derive(Debug)]
pub struct Failure {
    pub history: Vec<Op>,
    pub events: Vec<Event>,
    pub divergence: Divergence,
}

/// Result of a quickcheck run.
#[derive(Debug)]
pub enum Outcome {
    Passed { trials: usize },
    Failed(Box<Failure>),
}

impl Outcome {
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Execute one history against the SUT, producing the interleaved
/// invoke/completion event log. Times are nanoseconds from the start of the
/// execution; indices are event positions.
pub fn execute(sut: &mut dyn Sut, ops: &[Op]) -> Result<Vec<Event>> {
    sut.setup()?;
    let start = Instant::now();
    let mut events = Vec::with_capacity(ops.len() * 2);
    for op in ops {
        let index = events.len() as u64;
        events.push(Event::invoke(0, op.invocation(), elapsed_ns(start), index));
        let completion = sut.apply(op)?;
        let index = events.len() as u64;
        events.push(completion.into_event(0, elapsed_ns(start), index));
    }
    sut.teardown()?;
    Ok(events)
}

/// Run up to `trials` generated histories, shrinking the first failure.
pub fn quickcheck(config: &EngineConfig, sut: &mut dyn Sut) -> Result<Outcome> {
    let deadline = config.time_limit.map(|limit| Instant::now() + limit);
    for trial in 0..config.trials {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!(trial, "time limit reached");
            return Ok(Outcome::Passed { trials: trial });
        }
        let seed = config.seed.wrapping_add(trial as u64);
        let ops = generate(&GeneratorConfig {
            seed,
            length: config.history_length,
            lose_unfsynced_writes: config.lose_unfsynced_writes,
        });
        info!(trial, seed, ops = ops.len(), "running trial");
        if let Some((events, divergence)) = failing_execution(sut, &ops, config.scour)? {
            warn!(
                trial,
                seed,
                index = divergence.index,
                "divergence found, shrinking"
            );
            return shrink_failure(config, sut, ops, events, divergence).map(Outcome::Failed);
        }
    }
    Ok(Outcome::Passed {
        trials: config.trials,
    })
}

/// Like [`quickcheck`], but for a fixed history (e.g. replayed from a
/// captured log): execute it, and shrink if it fails.
pub fn check_history(config: &EngineConfig, sut: &mut dyn Sut, ops: Vec<Op>) -> Result<Outcome> {
    match failing_execution(sut, &ops, config.scour)? {
        Some((events, divergence)) => {
            warn!(index = divergence.index, "replayed history fails, shrinking");
            shrink_failure(config, sut, ops, events, divergence).map(Outcome::Failed)
        }
        None => Ok(Outcome::Passed { trials: 1 }),
    }
}

/// A history fails iff at least one of `scour` executions diverges.
fn failing_execution(
    sut: &mut dyn Sut,
    ops: &[Op],
    scour: usize,
) -> Result<Option<(Vec<Event>, Divergence)>> {
    for _ in 0..scour.max(1) {
        let events = execute(sut, ops)?;
        if let CheckOutcome::Invalid(divergence) = check(&events) {
            return Ok(Some((events, *divergence)));
        }
    }
    Ok(None)
}

fn shrink_failure(
    config: &EngineConfig,
    sut: &mut dyn Sut,
    ops: Vec<Op>,
    events: Vec<Event>,
    divergence: Divergence,
) -> Result<Box<Failure>> {
    let mut sut_error: Option<anyhow::Error> = None;
    let scour = config.scour;
    let (history, (events, divergence)) =
        sift_shrink::shrink(ops, (events, divergence), |candidate| {
            if sut_error.is_some() {
                return None;
            }
            match failing_execution(sut, candidate, scour) {
                Ok(result) => result,
                Err(error) => {
                    sut_error = Some(error);
                    None
                }
            }
        });
    if let Some(error) = sut_error {
        return Err(error);
    }
    info!(ops = history.len(), index = divergence.index, "shrunk failure");
    Ok(Box::new(Failure {
        history,
        events,
        divergence,
    }))
}

fn elapsed_ns(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}
