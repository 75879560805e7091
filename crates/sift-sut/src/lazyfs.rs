//! The lazyfs adapter: a [`DirSut`] over a lazyfs mountpoint, with crash
//! injection through the lazyfs command pipe.
//!
//! Mount and unmount lifecycle is managed outside this crate; the adapter
//! expects an already-mounted filesystem and the path of its control fifo.

use crate::DirSut;
use anyhow::{Context, Result};
use sift_engine::Sut;
use sift_types::{Completion, Op};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// The command lazyfs interprets as "drop every page that was not fsynced".
const CLEAR_CACHE_COMMAND: &str = "lazyfs::clear-cache\n";

#[derive(Debug)]
pub struct LazyFsSut {
    dir: DirSut,
    fifo: PathBuf,
}

impl LazyFsSut {
    /// `mountpoint` is the mounted lazyfs root; `fifo` is the named pipe
    /// configured as its command channel.
    #[must_use]
    pub fn new(mountpoint: PathBuf, fifo: PathBuf) -> Self {
        Self {
            dir: DirSut::new(mountpoint),
            fifo,
        }
    }

    fn clear_cache(&self) -> Result<()> {
        let mut pipe = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.fifo)
            .with_context(|| format!("open lazyfs fifo {}", self.fifo.display()))?;
        pipe.write_all(CLEAR_CACHE_COMMAND.as_bytes())
            .context("write clear-cache command")?;
        info!(fifo = %self.fifo.display(), "cleared lazyfs cache");
        Ok(())
    }
}

impl Sut for LazyFsSut {
    fn setup(&mut self) -> Result<()> {
        self.dir.setup()
    }

    fn apply(&mut self, op: &Op) -> Result<Completion> {
        match op {
            Op::LoseUnfsyncedWrites => {
                self.clear_cache()?;
                Ok(Completion::ok(op.clone()))
            }
            other => self.dir.apply(other),
        }
    }

    fn teardown(&mut self) -> Result<()> {
        self.dir.teardown()
    }
}
