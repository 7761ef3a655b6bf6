//! Cross-platform filesystem wrapper.
//!
//! The sweep only makes sense on Unix, where permission bits are real. On other
//! targets the helpers compile but `set_unix_permissions` degrades to toggling the
//! read-only flag, which is the closest thing those platforms offer.

use std::borrow::Cow;
use std::fs::Metadata;
use std::io;
use std::path::Path;

use crate::common::EntryKind;

#[cfg(unix)]
/// Set POSIX permission bits on Unix. Follows symlinks, like chmod(2).
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
/// Without POSIX bits, a mode lacking owner write maps to the read-only flag.
pub fn set_unix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    std::fs::set_permissions(path, perms)
}

/// Permission bits (without file-type bits) of `path`, following symlinks.
#[cfg(unix)]
pub fn unix_mode(path: &Path) -> io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(std::fs::metadata(path)?.permissions().mode() & 0o7777)
}

/// Device and inode pair identifying one file on disk.
pub type FileId = (u64, u64);

/// Identity of the file behind `metadata`, where the platform exposes one.
pub fn file_id(metadata: &Metadata) -> Option<FileId> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Some((metadata.dev(), metadata.ino()))
    }
    #[cfg(not(unix))]
    {
        let _ = metadata;
        None
    }
}

/// Classify `path` as a directory or a file using stat(2) semantics.
pub fn entry_kind(path: &Path) -> io::Result<EntryKind> {
    let md = std::fs::metadata(path)?;
    Ok(if md.is_dir() { EntryKind::Directory } else { EntryKind::File })
}

/// Raw bytes of a path, exactly as the walk produced it.
pub fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Cow::Borrowed(path.as_os_str().as_bytes())
    }
    #[cfg(not(unix))]
    {
        match path.to_string_lossy() {
            Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
            Cow::Owned(s) => Cow::Owned(s.into_bytes()),
        }
    }
}
