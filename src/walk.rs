//! Recursive directory walk feeding the backup and permission stages.
//!
//! The walk is depth-first, pre-order, with entries sorted by file name inside
//! each directory. Every visited path (the root included) is appended to the
//! returned list and sent on the path channel, in that order.

use std::path::PathBuf;

use crossbeam_channel::Sender;
use tracing::{debug, error};
use walkdir::{DirEntry, WalkDir};

use crate::error::SweepError;

/// Outcome of a walk: everything visited before it stopped, and why it stopped early.
#[derive(Debug)]
pub struct WalkReport {
    pub paths: Vec<PathBuf>,
    pub error: Option<SweepError>,
}

impl WalkReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Walks a single root path.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk the tree, pushing each path to the list and then to `sink`.
    ///
    /// The first unreadable entry ends the walk. The error is logged and handed
    /// back in the report next to the paths gathered so far. The caller owns the
    /// channel lifecycle and should drop its sender once this returns.
    pub fn walk(&self, sink: &Sender<PathBuf>) -> WalkReport {
        self.collect(WalkDir::new(&self.root).sort_by_file_name(), sink)
    }

    fn collect<I>(&self, entries: I, sink: &Sender<PathBuf>) -> WalkReport
    where
        I: IntoIterator<Item = walkdir::Result<DirEntry>>,
    {
        let mut paths = Vec::new();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!("walk of {} aborted: {}", self.root.display(), e);
                    return WalkReport {
                        paths,
                        error: Some(SweepError::Walk { root: self.root.clone(), source: e }),
                    };
                }
            };

            let path = entry.into_path();
            debug!(path = %path.display(), "walked");
            paths.push(path.clone());
            if sink.send(path).is_err() {
                return WalkReport { paths, error: Some(SweepError::ChannelClosed) };
            }
        }

        WalkReport { paths, error: None }
    }
}
