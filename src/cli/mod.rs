use clap::Parser;
use std::path::PathBuf;

use crate::common::{ErrorPolicy, DEFAULT_ARCHIVE_NAME, DEFAULT_CONCURRENCY, DEFAULT_GZIP_LEVEL};
use crate::error::{Result, SweepError};

/// Back up a directory tree to a tar.gz archive, then reset its permissions
/// (files 0644, directories 0755).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The file or directory to process.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Used as the root when -f is not given.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Number of permission-fixing workers.
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Where to write the backup archive.
    #[arg(short, long, default_value = DEFAULT_ARCHIVE_NAME)]
    pub output: PathBuf,

    /// Gzip compression level (0-9).
    #[arg(long, default_value_t = DEFAULT_GZIP_LEVEL, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: u32,

    /// Keep fixing the remaining paths after a stat or chmod failure instead of stopping.
    #[arg(short = 'k', long)]
    pub keep_going: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated settings for one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub root: PathBuf,
    pub concurrency: usize,
    pub output: PathBuf,
    pub level: u32,
    pub policy: ErrorPolicy,
}

impl SweepConfig {
    /// A config with the default concurrency, archive name, level and policy.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            concurrency: DEFAULT_CONCURRENCY,
            output: PathBuf::from(DEFAULT_ARCHIVE_NAME),
            level: DEFAULT_GZIP_LEVEL,
            policy: ErrorPolicy::FailFast,
        }
    }

    /// Resolves the root (`-f` first, then the positional path) and checks the rest.
    pub fn from_args(args: &Args) -> Result<Self> {
        let root = args
            .file
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| args.path.clone())
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(SweepError::MissingRoot)?;

        if args.concurrency == 0 {
            return Err(SweepError::InvalidConcurrency(args.concurrency));
        }

        Ok(Self {
            root,
            concurrency: args.concurrency,
            output: args.output.clone(),
            level: args.level,
            policy: if args.keep_going { ErrorPolicy::Continue } else { ErrorPolicy::FailFast },
        })
    }
}

/// Parses command-line arguments using `clap`.
pub fn run() -> std::result::Result<Args, clap::Error> {
    Args::try_parse()
}
