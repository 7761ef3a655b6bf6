//! Common utilities and types module.
// Shared constants, entry classification and run policies.

/// Mode applied to every regular file (rw-r--r--).
pub const FILE_MODE: u32 = 0o644;

/// Mode applied to every directory (rwxr-xr-x).
pub const DIR_MODE: u32 = 0o755;

pub const DEFAULT_CONCURRENCY: usize = 20;
pub const DEFAULT_ARCHIVE_NAME: &str = "backup.tar.gz";
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// How a walked path is treated by the permission fixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Anything that is not a directory once symlinks are followed.
    File,
    Directory,
}

impl EntryKind {
    /// The fixed mode this kind of entry is normalized to.
    pub fn target_mode(self) -> u32 {
        match self {
            EntryKind::File => FILE_MODE,
            EntryKind::Directory => DIR_MODE,
        }
    }
}

/// What the worker pool does when a stat or chmod call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// On the first failure, workers stop taking new paths and the run fails
    /// with that error. Paths other workers had already taken are still fixed
    /// and reported.
    #[default]
    FailFast,
    /// Log the failure, keep fixing the remaining paths, fail at the end.
    Continue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_modes() {
        assert_eq!(EntryKind::File.target_mode(), 0o644);
        assert_eq!(EntryKind::Directory.target_mode(), 0o755);
    }

    #[test]
    fn test_default_policy_is_fail_fast() {
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::FailFast);
    }
}
