#![forbid(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use sift_engine::{check_history, quickcheck, EngineConfig, Failure, ModelSut, Outcome, Sut};
use sift_sut::{DirSut, LazyFsSut};
use sift_types::Event;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::info;

// ── CLI definition ──────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "sift",
    about = "sift — property-based crash-consistency checker for POSIX-like filesystems"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate random histories, cross-check each against the model, and
    /// shrink the first failure to a minimal reproducer.
    Quickcheck(RunArgs),
    /// Run a single trial: one generated history, checked, no retries.
    Test(RunArgs),
    /// Re-execute a captured history file and shrink it if it fails.
    Replay {
        /// Event log to replay (invoke events only are read).
        #[arg(long)]
        history: PathBuf,
        #[command(flatten)]
        sut: SutArgs,
        /// Re-executions per shrink candidate before trusting a verdict.
        #[arg(long = "quickcheck-scour", default_value_t = 1)]
        scour: usize,
        /// Directory for failure artifacts.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Which system under test to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Db {
    /// A plain directory driven by coreutils.
    Dir,
    /// An externally mounted lazyfs (crash injection via its command pipe).
    Lazyfs,
    /// The model checked against a second model instance.
    Model,
}

#[derive(Args)]
struct SutArgs {
    #[arg(long, value_enum, default_value_t = Db::Dir)]
    db: Db,
    /// Scratch directory (dir) or mountpoint (lazyfs). Defaults to a fresh
    /// temporary directory for `--db dir`.
    #[arg(long)]
    dir: Option<PathBuf>,
    /// lazyfs command fifo (required with `--db lazyfs`).
    #[arg(long)]
    fifo: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    sut: SutArgs,
    /// Maximum number of generated trials.
    #[arg(long, default_value_t = 200)]
    trials: usize,
    /// Operations per generated history.
    #[arg(long, default_value_t = 1000)]
    length: usize,
    /// Base RNG seed; picked from the clock when absent.
    #[arg(long)]
    seed: Option<u64>,
    /// Re-executions per shrink candidate before trusting a verdict.
    #[arg(long = "quickcheck-scour", default_value_t = 1)]
    scour: usize,
    /// Mix crash (lose-unfsynced-writes) operations into histories.
    #[arg(long)]
    lose_unfsynced_writes: bool,
    /// Stop starting new trials after this many seconds.
    #[arg(long)]
    time_limit: Option<u64>,
    /// Replay this captured history instead of generating one.
    #[arg(long)]
    history: Option<PathBuf>,
    /// Directory for failure artifacts.
    #[arg(long)]
    out: Option<PathBuf>,
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Quickcheck(args) => run_trials(&args),
        Command::Test(args) => run_trials(&RunArgs {
            trials: 1,
            ..args
        }),
        Command::Replay {
            history,
            sut,
            scour,
            out,
        } => replay(&history, &sut, scour, out.as_deref()),
    }
}

fn run_trials(args: &RunArgs) -> Result<()> {
    if let Some(history) = &args.history {
        return replay(history, &args.sut, args.scour, args.out.as_deref());
    }
    let seed = args.seed.unwrap_or_else(clock_seed);
    let config = EngineConfig {
        trials: args.trials,
        scour: args.scour,
        seed,
        history_length: args.length,
        lose_unfsynced_writes: args.lose_unfsynced_writes,
        time_limit: args.time_limit.map(Duration::from_secs),
    };
    if args.lose_unfsynced_writes && args.sut.db == Db::Dir {
        bail!("--lose-unfsynced-writes needs a caching SUT; use --db lazyfs");
    }

    // Keep a temporary scratch root alive for the whole run.
    let (mut sut, _scratch) = make_sut(&args.sut)?;
    info!(seed, trials = config.trials, length = config.history_length, "starting");

    let outcome = quickcheck(&config, sut.as_mut())?;
    report(&outcome, args.out.as_deref())
}

fn replay(history: &Path, sut_args: &SutArgs, scour: usize, out: Option<&Path>) -> Result<()> {
    let ops = sift_history::log::read_invocations(history)
        .with_context(|| format!("read history {}", history.display()))?;
    if ops.is_empty() {
        bail!("history {} holds no invocations", history.display());
    }
    info!(ops = ops.len(), "replaying captured history");

    let config = EngineConfig {
        scour,
        ..EngineConfig::default()
    };
    let (mut sut, _scratch) = make_sut(sut_args)?;
    let outcome = check_history(&config, sut.as_mut(), ops)?;
    report(&outcome, out)
}

fn make_sut(args: &SutArgs) -> Result<(Box<dyn Sut>, Option<tempfile::TempDir>)> {
    match args.db {
        Db::Dir => match &args.dir {
            Some(dir) => Ok((Box::new(DirSut::new(dir.clone())), None)),
            None => {
                let scratch = tempfile::tempdir().context("create scratch directory")?;
                let sut = DirSut::new(scratch.path().join("root"));
                Ok((Box::new(sut), Some(scratch)))
            }
        },
        Db::Lazyfs => {
            let Some(dir) = &args.dir else {
                bail!("--db lazyfs requires --dir (the mountpoint)");
            };
            let Some(fifo) = &args.fifo else {
                bail!("--db lazyfs requires --fifo (the command pipe)");
            };
            Ok((Box::new(LazyFsSut::new(dir.clone(), fifo.clone())), None))
        }
        Db::Model => Ok((Box::new(ModelSut::new()), None)),
    }
}

// ── Reporting ───────────────────────────────────────────────────────────────

fn report(outcome: &Outcome, out: Option<&Path>) -> Result<()> {
    match outcome {
        Outcome::Passed { trials } => {
            println!("ok: {trials} trial(s) passed");
            Ok(())
        }
        Outcome::Failed(failure) => {
            print_failure(failure);
            if let Some(out) = out {
                write_artifacts(failure, out)?;
            }
            std::process::exit(2);
        }
    }
}

fn print_failure(failure: &Failure) {
    println!("FAILURE: minimal reproducer ({} ops):", failure.history.len());
    for op in &failure.history {
        println!("  {op}");
    }
    println!();
    let divergence = &failure.divergence;
    println!("divergence at event {}:", divergence.index);
    println!("  expected: {}", divergence.expected);
    println!("  actual:   {}", divergence.actual);
    println!();
    match serde_json::to_string_pretty(&divergence.state_before) {
        Ok(state) => println!("model state before the diverging op:\n{state}"),
        Err(error) => println!("model state unavailable: {error}"),
    }
}

fn write_artifacts(failure: &Failure, out: &Path) -> Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("create {}", out.display()))?;

    let events_path = out.join("history.jsonl");
    sift_history::log::write_events(&events_path, &failure.events)
        .with_context(|| format!("write {}", events_path.display()))?;

    // The reproducer is written as invoke events so `sift replay` can read
    // it straight back.
    let reproducer: Vec<Event> = failure
        .history
        .iter()
        .enumerate()
        .map(|(i, op)| Event::invoke(0, op.invocation(), 0, i as u64))
        .collect();
    let reproducer_path = out.join("reproducer.jsonl");
    sift_history::log::write_events(&reproducer_path, &reproducer)
        .with_context(|| format!("write {}", reproducer_path.display()))?;

    println!(
        "artifacts: {} and {}",
        events_path.display(),
        reproducer_path.display()
    );
    Ok(())
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|since_epoch| {
            u64::try_from(since_epoch.as_nanos() & u128::from(u64::MAX)).unwrap_or(0)
        })
        .unwrap_or(0)
}
