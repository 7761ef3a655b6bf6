//! # permsweep
//!
//! Backs up a directory tree into a gzip-compressed tar archive, then resets the
//! permissions of everything in it: regular files to `0644`, directories to
//! `0755`.
//!
//! ## Key Modules
//!
//! - [`walk`]: depth-first traversal that produces the path list and fills the path channel.
//! - [`archive`]: writes the path list into a `.tar.gz` stream.
//! - [`workers`]: the permission-fixing worker pool and the result reporter.
//! - [`pipeline`]: runs walk, archive and fix in order.
//!
//! ## Examples
//!
//! ```no_run
//! use permsweep::{cli::SweepConfig, pipeline::run_sweep};
//!
//! let config = SweepConfig::new("/srv/www");
//! let summary = run_sweep(&config, std::io::stdout()).expect("sweep failed");
//! println!("{} entries archived", summary.archive.entries);
//! ```

pub mod archive;
pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod error;
pub use error::SweepError;

// Cross-platform filesystem wrapper
pub mod fsx;

pub mod pipeline;
pub mod walk;
pub mod workers;
