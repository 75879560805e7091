//! Weighted random operation generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sift_types::{Data, FsPath, Op};
use tracing::debug;

/// Configuration for one generated history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// RNG seed; the same seed always yields the same history.
    pub seed: u64,
    /// Number of operations to generate.
    pub length: usize,
    /// Whether to mix in crash operations.
    pub lose_unfsynced_writes: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            length: 1000,
            lose_unfsynced_writes: false,
        }
    }
}

/// Generate a history of operations.
///
/// Paths are drawn from `{a,b}` components at depth one or two — six paths
/// in total, small enough that renames, links, and removals constantly
/// interfere with each other. Reads are weighted five times heavier than
/// each mutating operation.
#[must_use]
pub fn generate(config: &GeneratorConfig) -> Vec<Op> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let ops = (0..config.length)
        .map(|_| generate_op(&mut rng, config.lose_unfsynced_writes))
        .collect();
    debug!(
        seed = config.seed,
        length = config.length,
        lose_unfsynced_writes = config.lose_unfsynced_writes,
        "generated history"
    );
    ops
}

const READ_WEIGHT: u32 = 5;
const MUTATOR_COUNT: u32 = 9;

fn generate_op(rng: &mut StdRng, lose_unfsynced_writes: bool) -> Op {
    let crash_weight = u32::from(lose_unfsynced_writes);
    let roll = rng.gen_range(0..READ_WEIGHT + MUTATOR_COUNT + crash_weight);
    match roll {
        0..=4 => Op::Read(random_path(rng), None),
        5 => Op::Touch(random_path(rng)),
        6 => Op::Append(random_path(rng), random_data(rng)),
        7 => Op::Write(random_path(rng), random_data(rng)),
        8 => Op::Mkdir(random_path(rng)),
        9 => Op::Mv(random_path(rng), random_path(rng)),
        10 => Op::Rm(random_path(rng)),
        11 => Op::Ln(random_path(rng), random_path(rng)),
        12 => Op::Truncate(random_path(rng), rng.gen_range(-4..=4)),
        13 => Op::Fsync(random_path(rng)),
        _ => Op::LoseUnfsyncedWrites,
    }
}

fn random_path(rng: &mut StdRng) -> FsPath {
    let depth = rng.gen_range(1..=2);
    (0..depth)
        .map(|_| {
            if rng.gen_bool(0.5) { "a" } else { "b" }.to_owned()
        })
        .collect()
}

fn random_data(rng: &mut StdRng) -> Data {
    let len = rng.gen_range(1..=3);
    Data::new((0..len).map(|_| rng.gen_range(0..=u8::MAX)).collect())
}
