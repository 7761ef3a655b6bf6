//! Single consumer of the result channel.

use std::io::{self, Write};
use std::path::PathBuf;

use crossbeam_channel::Receiver;
use tracing::warn;

/// Prints one confirmation line per fixed path.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Drains `results` until every sender is gone and returns the number of
    /// paths received.
    ///
    /// A failing sink does not stop the drain, otherwise workers would block on
    /// their sends forever; the first write error is returned at the end.
    pub fn drain(mut self, results: Receiver<PathBuf>) -> io::Result<u64> {
        let mut received = 0u64;
        let mut first_err: Option<io::Error> = None;

        for path in results {
            received += 1;
            if first_err.is_some() {
                continue;
            }
            let line = writeln!(self.out, "{} Permissions corrected", path.display())
                .and_then(|_| self.out.flush());
            if let Err(e) = line {
                warn!("report output failed, discarding further lines: {}", e);
                first_err = Some(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(received),
        }
    }
}
