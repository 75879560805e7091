#![forbid(unsafe_code)]
//! System-under-test adapters.
//!
//! [`DirSut`] drives an ordinary directory with the standard utilities
//! (`touch`, `tee`, `cat`, `mv`, `ln`, `rm`, `mkdir`, `truncate`, `sync`),
//! mapping their stderr text back onto the model's error kinds.
//! [`LazyFsSut`] layers `lose_unfsynced_writes` on top by poking lazyfs's
//! command pipe; mounting lazyfs itself is outside this crate.

mod command;
mod errors;
mod lazyfs;

pub use lazyfs::LazyFsSut;

use anyhow::{bail, Context, Result};
use command::{run_command, CommandOutput, DEFAULT_OP_TIMEOUT};
use sift_engine::Sut;
use sift_error::ErrorKind;
use sift_types::{Completion, Data, FsPath, Op};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// A SUT backed by a plain directory and coreutils.
///
/// `setup` wipes the scratch root; `lose_unfsynced_writes` is a no-op here
/// (a plain directory has no cache to lose), so histories containing crash
/// operations only make sense against [`LazyFsSut`].
#[derive(Debug)]
pub struct DirSut {
    root: PathBuf,
    timeout: Duration,
}

impl DirSut {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(root: PathBuf, timeout: Duration) -> Self {
        Self { root, timeout }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a model path into the scratch root.
    fn resolve(&self, path: &FsPath) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for component in path.components() {
            // Replayed histories come from files on disk; keep them caged.
            if component.is_empty() || component == "." || component == ".." || component.contains('/')
            {
                bail!("refusing path component {component:?} in {path}");
            }
            resolved.push(component);
        }
        Ok(resolved)
    }

    fn run(
        &self,
        op: &Op,
        program: &str,
        args: &[&std::ffi::OsStr],
        stdin: Option<&[u8]>,
        map_error: impl Fn(&str) -> Option<ErrorKind>,
    ) -> Result<Completion> {
        let mut command = Command::new(program);
        command.args(args);
        // Pin message text; the error mapping matches English substrings.
        command.env("LC_ALL", "C");

        match run_command(command, stdin, self.timeout)? {
            CommandOutput::TimedOut => {
                debug!(%op, program, "invocation timed out");
                Ok(Completion::timeout(op.invocation()))
            }
            CommandOutput::Finished {
                status,
                stdout,
                stderr,
            } => {
                if status.success() {
                    return Ok(Completion::ok(complete_op(op, stdout)));
                }
                match map_error(&stderr) {
                    Some(kind) => Ok(Completion::fail(op.invocation(), kind)),
                    None => bail!("{program} failed without a mappable error: {stderr:?}"),
                }
            }
        }
    }
}

/// Fill in an operation's return value from captured stdout.
fn complete_op(op: &Op, stdout: Vec<u8>) -> Op {
    match op {
        Op::Read(path, _) => Op::Read(path.clone(), Some(Data::new(stdout))),
        other => other.clone(),
    }
}

impl Sut for DirSut {
    fn setup(&mut self) -> Result<()> {
        if self.root.exists() {
            // The root may be a mountpoint; clear its contents, not itself.
            for dir_entry in std::fs::read_dir(&self.root)
                .with_context(|| format!("list scratch root {}", self.root.display()))?
            {
                let child = dir_entry?.path();
                if child.is_dir() {
                    std::fs::remove_dir_all(&child)?;
                } else {
                    std::fs::remove_file(&child)?;
                }
            }
        } else {
            std::fs::create_dir_all(&self.root)
                .with_context(|| format!("create scratch root {}", self.root.display()))?;
        }
        Ok(())
    }

    fn apply(&mut self, op: &Op) -> Result<Completion> {
        match op {
            Op::Touch(path) => {
                let target = self.resolve(path)?;
                self.run(op, "touch", &[target.as_os_str()], None, errors::common)
            }
            Op::Read(path, _) => {
                let target = self.resolve(path)?;
                self.run(op, "cat", &[target.as_os_str()], None, errors::read)
            }
            Op::Write(path, data) => {
                let target = self.resolve(path)?;
                self.run(
                    op,
                    "tee",
                    &[target.as_os_str()],
                    Some(data.as_slice()),
                    errors::write,
                )
            }
            Op::Append(path, data) => {
                let target = self.resolve(path)?;
                self.run(
                    op,
                    "tee",
                    &["-a".as_ref(), target.as_os_str()],
                    Some(data.as_slice()),
                    errors::write,
                )
            }
            Op::Mkdir(path) => {
                let target = self.resolve(path)?;
                self.run(op, "mkdir", &[target.as_os_str()], None, errors::common)
            }
            Op::Rm(path) => {
                let target = self.resolve(path)?;
                self.run(
                    op,
                    "rm",
                    &["-r".as_ref(), "--".as_ref(), target.as_os_str()],
                    None,
                    errors::common,
                )
            }
            Op::Mv(from, to) => {
                let from = self.resolve(from)?;
                let to = self.resolve(to)?;
                self.run(
                    op,
                    "mv",
                    &[from.as_os_str(), to.as_os_str()],
                    None,
                    errors::mv,
                )
            }
            Op::Ln(from, to) => {
                let from = self.resolve(from)?;
                let to = self.resolve(to)?;
                self.run(
                    op,
                    "ln",
                    &[from.as_os_str(), to.as_os_str()],
                    None,
                    errors::ln,
                )
            }
            Op::Truncate(path, delta) => {
                let target = self.resolve(path)?;
                let size = format!("{delta:+}");
                self.run(
                    op,
                    "truncate",
                    &["-s".as_ref(), size.as_ref(), target.as_os_str()],
                    None,
                    errors::truncate,
                )
            }
            Op::Fsync(path) => {
                let target = self.resolve(path)?;
                self.run(op, "sync", &[target.as_os_str()], None, errors::common)
            }
            // A plain directory is always "durable"; nothing to lose.
            Op::LoseUnfsyncedWrites => Ok(Completion::ok(op.clone())),
        }
    }

    fn teardown(&mut self) -> Result<()> {
        // Scratch contents are left in place for post-mortem inspection;
        // the next setup wipes them.
        Ok(())
    }
}
