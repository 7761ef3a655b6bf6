//! Permission-fixing worker pool.
//!
//! `FixerPool::run` spawns a fixed number of scoped threads that all pull from
//! the same path channel. Each path is classified with a stat call and set to
//! the fixed file or directory mode; fixed paths are forwarded to the result
//! channel for the [`Reporter`].

mod reporter;
pub use reporter::Reporter;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, warn};

use crate::common::{EntryKind, ErrorPolicy};
use crate::error::{Result, SweepError};
use crate::fsx;

/// Normalizes the mode of a single path.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionFixer;

impl PermissionFixer {
    /// Stat `path` and apply the fixed mode for its kind.
    pub fn fix(&self, path: &Path) -> Result<EntryKind> {
        let kind = fsx::entry_kind(path)
            .map_err(|source| SweepError::Stat { path: path.to_path_buf(), source })?;
        let mode = kind.target_mode();
        fsx::set_unix_permissions(path, mode)
            .map_err(|source| SweepError::Permission { path: path.to_path_buf(), mode, source })?;
        Ok(kind)
    }
}

/// Counters for one pool run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub files: u64,
    pub dirs: u64,
    pub failures: u64,
}

impl PoolStats {
    pub fn fixed(&self) -> u64 {
        self.files + self.dirs
    }
}

#[derive(Default)]
struct SharedCounters {
    files: AtomicU64,
    dirs: AtomicU64,
    failures: AtomicU64,
}

/// A fixed-size pool of permission fixers.
#[derive(Debug, Clone)]
pub struct FixerPool {
    workers: usize,
    policy: ErrorPolicy,
    fixer: PermissionFixer,
}

impl FixerPool {
    pub fn new(workers: usize, policy: ErrorPolicy) -> Result<Self> {
        if workers == 0 {
            return Err(SweepError::InvalidConcurrency(workers));
        }
        Ok(Self { workers, policy, fixer: PermissionFixer })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Fix every path received on `paths` until the channel is closed and drained.
    ///
    /// Returns once all workers have exited. `results` is dropped on return, so
    /// the result channel closes as soon as the pool is done.
    pub fn run(&self, paths: Receiver<PathBuf>, results: Sender<PathBuf>) -> Result<PoolStats> {
        let counters = SharedCounters::default();
        let abort = AtomicBool::new(false);
        let first_err: Mutex<Option<SweepError>> = Mutex::new(None);

        let scope_result = thread::scope(|s| {
            let handles: Vec<_> = (0..self.workers)
                .map(|id| {
                    let paths = paths.clone();
                    let results = results.clone();
                    let counters = &counters;
                    let abort = &abort;
                    let first_err = &first_err;
                    s.spawn(move || {
                        for path in paths.iter() {
                            if abort.load(Ordering::Relaxed) {
                                break;
                            }
                            match self.fixer.fix(&path) {
                                Ok(kind) => {
                                    match kind {
                                        EntryKind::File => counters.files.fetch_add(1, Ordering::Relaxed),
                                        EntryKind::Directory => counters.dirs.fetch_add(1, Ordering::Relaxed),
                                    };
                                    debug!(worker = id, path = %path.display(), "mode fixed");
                                    if results.send(path).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    counters.failures.fetch_add(1, Ordering::Relaxed);
                                    match self.policy {
                                        ErrorPolicy::FailFast => {
                                            error!(worker = id, "{}", e);
                                            abort.store(true, Ordering::Relaxed);
                                            if let Ok(mut slot) = first_err.lock() {
                                                slot.get_or_insert(e);
                                            }
                                            break;
                                        }
                                        ErrorPolicy::Continue => warn!(worker = id, "{}", e),
                                    }
                                }
                            }
                        }
                    })
                })
                .collect();
            drop(results);

            handles.into_iter().map(|h| h.join()).filter(|r| r.is_err()).count()
        });

        if scope_result > 0 {
            return Err(SweepError::WorkerPanicked);
        }

        if let Some(e) = first_err.into_inner().ok().flatten() {
            return Err(e);
        }

        let stats = PoolStats {
            files: counters.files.into_inner(),
            dirs: counters.dirs.into_inner(),
            failures: counters.failures.into_inner(),
        };
        if stats.failures > 0 {
            return Err(SweepError::FixFailures(stats.failures as usize));
        }
        Ok(stats)
    }
}
