//! Walk → archive → fix orchestration.
//!
//! The walk runs to completion first, filling a path channel large enough to
//! hold every entry; the sender is dropped right after, so the channel is
//! closed before any worker starts. The archive is then written from the
//! completed path list. Only after both succeed do the workers drain the
//! channel, with the reporter consuming their results. The reporter's join is
//! the end of the run.

use std::io::Write;
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver};
use tracing::{info, warn};

use crate::archive::{self, ArchiveStats};
use crate::cli::SweepConfig;
use crate::error::{Result, SweepError};
use crate::walk::{WalkReport, Walker};
use crate::workers::{FixerPool, PoolStats, Reporter};

/// What one successful sweep did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub walked: usize,
    pub archive: ArchiveStats,
    pub fixed: PoolStats,
    pub reported: u64,
}

/// Runs a full sweep, writing report lines to `out`.
pub fn run_sweep<W: Write + Send>(config: &SweepConfig, out: W) -> Result<SweepSummary> {
    let pool = FixerPool::new(config.concurrency, config.policy)?;

    let (path_tx, path_rx) = unbounded();
    let walk = Walker::new(&config.root).walk(&path_tx);
    drop(path_tx);
    info!("walked {} entries under {}", walk.paths.len(), config.root.display());

    archive_and_fix(config, &pool, walk, path_rx, out)
}

/// Everything after the walk: archive the list, then drain the closed path channel.
fn archive_and_fix<W: Write + Send>(
    config: &SweepConfig,
    pool: &FixerPool,
    walk: WalkReport,
    path_rx: Receiver<PathBuf>,
    out: W,
) -> Result<SweepSummary> {
    let archive = archive::create_archive_file(&walk.paths, &config.output, config.level)?;

    if let Some(e) = walk.error {
        warn!("walk was incomplete, skipping permission changes");
        return Err(e);
    }

    let (result_tx, result_rx) = bounded(0);
    let (fixed, reported) = thread::scope(|s| {
        let reporter = s.spawn(move || Reporter::new(out).drain(result_rx));
        let fixed = pool.run(path_rx, result_tx);
        let reported = reporter.join();
        (fixed, reported)
    });

    let fixed = fixed?;
    let reported = reported.map_err(|_| SweepError::WorkerPanicked)??;

    info!(
        "fixed {} files and {} directories using {} workers",
        fixed.files,
        fixed.dirs,
        pool.workers()
    );
    Ok(SweepSummary { walked: walk.paths.len(), archive, fixed, reported })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::common::ErrorPolicy;
    use crate::fsx::{set_unix_permissions, unix_mode};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn build_tree(base: &Path) -> Result<PathBuf> {
        let root = base.join("root");
        fs::create_dir_all(root.join("sub"))?;
        fs::write(root.join("a.txt"), b"alpha")?;
        fs::write(root.join("sub/b.txt"), b"beta")?;
        set_unix_permissions(&root.join("a.txt"), 0o600)?;
        set_unix_permissions(&root.join("sub/b.txt"), 0o666)?;
        set_unix_permissions(&root.join("sub"), 0o700)?;
        set_unix_permissions(&root, 0o700)?;
        Ok(root)
    }

    #[test]
    fn test_sweep_fixes_modes_and_reports_each_path() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let root = build_tree(dir.path())?;
        let mut config = SweepConfig::new(&root);
        config.output = dir.path().join("backup.tar.gz");
        config.concurrency = 3;

        let mut out = Vec::new();
        let summary = run_sweep(&config, &mut out)?;

        assert_eq!(summary.walked, 4);
        assert_eq!(summary.archive.entries, 4);
        assert_eq!(summary.fixed, PoolStats { files: 2, dirs: 2, failures: 0 });
        assert_eq!(summary.reported, 4);

        assert_eq!(unix_mode(&root)?, 0o755);
        assert_eq!(unix_mode(&root.join("a.txt"))?, 0o644);
        assert_eq!(unix_mode(&root.join("sub"))?, 0o755);
        assert_eq!(unix_mode(&root.join("sub/b.txt"))?, 0o644);

        let text = String::from_utf8(out)?;
        let mut lines: Vec<&str> = text.lines().collect();
        lines.sort();
        let mut expected: Vec<String> = ["", "a.txt", "sub", "sub/b.txt"]
            .iter()
            .map(|p| {
                let path = if p.is_empty() { root.clone() } else { root.join(p) };
                format!("{} Permissions corrected", path.display())
            })
            .collect();
        expected.sort();
        assert_eq!(lines, expected);
        Ok(())
    }

    #[test]
    fn test_sweep_is_idempotent() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let root = build_tree(dir.path())?;
        let mut config = SweepConfig::new(&root);
        config.output = dir.path().join("backup.tar.gz");

        run_sweep(&config, std::io::sink())?;
        let second = run_sweep(&config, std::io::sink())?;
        assert_eq!(second.fixed.fixed(), 4);
        assert_eq!(unix_mode(&root)?, 0o755);
        assert_eq!(unix_mode(&root.join("sub/b.txt"))?, 0o644);
        Ok(())
    }

    #[test]
    fn test_unwritable_output_skips_fix_phase() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let root = build_tree(dir.path())?;
        let mut config = SweepConfig::new(&root);
        config.output = dir.path().join("no/such/dir/backup.tar.gz");

        let err = run_sweep(&config, std::io::sink()).unwrap_err();
        assert!(matches!(err, SweepError::Io { .. }));
        assert_eq!(unix_mode(&root.join("a.txt"))?, 0o600);
        Ok(())
    }

    #[test]
    fn test_missing_root_fails_after_empty_archive() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut config = SweepConfig::new(dir.path().join("absent"));
        config.output = dir.path().join("backup.tar.gz");

        let err = run_sweep(&config, std::io::sink()).unwrap_err();
        assert!(matches!(err, SweepError::Walk { .. }));
        assert!(config.output.exists());
        Ok(())
    }

    #[test]
    fn test_walk_error_mid_tree_archives_partial_list_and_skips_fixing(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let root = build_tree(dir.path())?;
        let mut config = SweepConfig::new(&root);
        config.output = dir.path().join("backup.tar.gz");
        let pool = FixerPool::new(config.concurrency, config.policy)?;

        // the walk got as far as root/sub, then failed to read it
        let walked = vec![root.clone(), root.join("a.txt"), root.join("sub")];
        let (path_tx, path_rx) = unbounded();
        for p in &walked {
            path_tx.send(p.clone())?;
        }
        drop(path_tx);
        let mut failing = walkdir::WalkDir::new(root.join("sub/unreadable")).into_iter();
        let cause = failing.next().ok_or("no walk error")?.unwrap_err();
        let walk = WalkReport {
            paths: walked.clone(),
            error: Some(SweepError::Walk { root: root.clone(), source: cause }),
        };

        let mut out = Vec::new();
        let err = archive_and_fix(&config, &pool, walk, path_rx, &mut out).unwrap_err();
        assert!(matches!(err, SweepError::Walk { .. }));
        assert!(out.is_empty());

        let gz = flate2::read::GzDecoder::new(fs::File::open(&config.output)?);
        let mut archive = tar::Archive::new(gz);
        let mut names = Vec::new();
        for entry in archive.entries()? {
            names.push(entry?.path()?.into_owned());
        }
        assert_eq!(names, walked);

        assert_eq!(unix_mode(&root)?, 0o700);
        assert_eq!(unix_mode(&root.join("a.txt"))?, 0o600);
        assert_eq!(unix_mode(&root.join("sub"))?, 0o700);
        Ok(())
    }

    #[test]
    fn test_unreadable_subdir_aborts_before_fixing() -> std::result::Result<(), Box<dyn std::error::Error>> {
        // root ignores permission bits
        if unsafe { libc::geteuid() } == 0 {
            return Ok(());
        }
        let dir = tempdir()?;
        let root = build_tree(dir.path())?;
        set_unix_permissions(&root.join("sub"), 0o000)?;
        let mut config = SweepConfig::new(&root);
        config.output = dir.path().join("backup.tar.gz");
        config.policy = ErrorPolicy::FailFast;

        let result = run_sweep(&config, std::io::sink());
        set_unix_permissions(&root.join("sub"), 0o700)?;

        assert!(result.is_err());
        assert_eq!(unix_mode(&root.join("a.txt"))?, 0o600);
        assert_eq!(unix_mode(&root)?, 0o700);
        Ok(())
    }
}
