//! # Backup Archive
//!
//! Writes the walked path list into a gzip-compressed tar stream.
//!
//! Each entry's header is derived from the metadata of the opened path (size,
//! mode, mtime, ownership and entry type), and its name is the walked path
//! verbatim: relative paths stay relative, absolute paths stay absolute, and
//! directories carry no trailing slash. Names that do not fit the 100-byte
//! ustar field are preceded by a GNU long-name record.
//!
//! File content is copied up to the size recorded in the header and no
//! further. A file that shrinks or grows while it is being copied fails the
//! archive instead of producing an entry whose length disagrees with its header.

use std::fs::{File, Metadata};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};
use tracing::{debug, info};

use crate::error::{Result, SweepError};
use crate::fsx::{self, FileId};

const GNU_LONG_LINK: &[u8] = b"././@LongLink";

/// Summary of a finished archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveStats {
    pub entries: usize,
    pub compressed_bytes: u64,
}

/// Streams tar entries through a gzip encoder into `W`.
pub struct TarGzArchiver<W: Write> {
    builder: Builder<GzEncoder<W>>,
    entries: usize,
    excluded: Option<FileId>,
}

impl<W: Write> TarGzArchiver<W> {
    /// Creates a new archiver writing to `sink` at the given gzip level (0-9).
    pub fn new(sink: W, level: u32) -> Self {
        let encoder = GzEncoder::new(sink, Compression::new(level));
        Self { builder: Builder::new(encoder), entries: 0, excluded: None }
    }

    /// Never archive the file described by `metadata`. Used for the archive's
    /// own output file when it sits inside the walked tree.
    pub fn exclude(&mut self, metadata: &Metadata) {
        self.excluded = fsx::file_id(metadata);
    }

    /// Number of entries appended so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Appends one walked path: header from its metadata, then its bytes.
    ///
    /// Directories and other non-regular entries are written with their header
    /// only. Symlinks are followed, as opening the path follows them.
    pub fn append_path(&mut self, path: &Path) -> Result<()> {
        let archive_err = |source: io::Error| SweepError::Archive { path: path.to_path_buf(), source };

        let mut file = File::open(path).map_err(archive_err)?;
        let metadata = file.metadata().map_err(archive_err)?;

        if self.excluded.is_some() && fsx::file_id(&metadata) == self.excluded {
            info!("not archiving {}: it is the archive being written", path.display());
            return Ok(());
        }

        let mut header = Header::new_gnu();
        header.set_metadata(&metadata);
        self.set_entry_name(&mut header, path).map_err(archive_err)?;
        header.set_cksum();

        if metadata.is_file() {
            self.append_exact(&header, &mut file).map_err(archive_err)?;
        } else {
            self.builder.append(&header, io::empty()).map_err(archive_err)?;
        }

        self.entries += 1;
        debug!(path = %path.display(), size = metadata.len(), "archived");
        Ok(())
    }

    /// Writes the tar trailer, finishes the gzip stream and returns the sink.
    pub fn finish(self) -> Result<W> {
        let encoder = self.builder.into_inner()?;
        Ok(encoder.finish()?)
    }

    /// Copies exactly `header.size()` bytes of `reader` into the archive.
    fn append_exact<R: Read>(&mut self, header: &Header, reader: &mut R) -> io::Result<()> {
        let expected = header.size()?;
        {
            let mut content = ExactLen { inner: (&mut *reader).take(expected), expected };
            self.builder.append(header, &mut content)?;
        }

        let mut extra = [0u8; 1];
        if reader.read(&mut extra)? != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file grew past its recorded size of {expected} bytes while being archived"),
            ));
        }
        Ok(())
    }

    fn set_entry_name(&mut self, header: &mut Header, path: &Path) -> io::Result<()> {
        let name = fsx::path_bytes(path);
        let field_len = header.as_old().name.len();

        if name.len() > field_len {
            let mut long = Header::new_gnu();
            long.as_old_mut().name[..GNU_LONG_LINK.len()].copy_from_slice(GNU_LONG_LINK);
            long.set_mode(0o644);
            long.set_entry_type(EntryType::GNULongName);
            long.set_size(name.len() as u64 + 1);
            long.set_cksum();

            let mut data = Vec::with_capacity(name.len() + 1);
            data.extend_from_slice(&name);
            data.push(0);
            self.builder.append(&long, data.as_slice())?;
        }

        let n = name.len().min(field_len);
        header.as_old_mut().name[..n].copy_from_slice(&name[..n]);
        Ok(())
    }
}

/// A bounded reader that reports a premature end of input as an error.
struct ExactLen<R> {
    inner: io::Take<R>,
    expected: u64,
}

impl<R: Read> Read for ExactLen<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() && self.inner.limit() > 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "file shrank while being archived: {} of {} bytes missing",
                    self.inner.limit(),
                    self.expected
                ),
            ));
        }
        Ok(n)
    }
}

/// Archives every path of `paths`, in order, into `sink`. Stops at the first failure.
pub fn write_archive<W: Write>(paths: &[PathBuf], sink: W, level: u32) -> Result<W> {
    let mut archiver = TarGzArchiver::new(sink, level);
    for path in paths {
        archiver.append_path(path)?;
    }
    archiver.finish()
}

/// Creates (or truncates) `output` and archives `paths` into it.
///
/// If `output` itself appears in `paths` (an archive written inside the tree
/// it backs up), it is left out of the archive.
pub fn create_archive_file(paths: &[PathBuf], output: &Path, level: u32) -> Result<ArchiveStats> {
    let file = File::create(output).map_err(|e| SweepError::io(output, e))?;
    let own = file.metadata().map_err(|e| SweepError::io(output, e))?;

    let mut archiver = TarGzArchiver::new(BufWriter::new(file), level);
    archiver.exclude(&own);
    for path in paths {
        archiver.append_path(path)?;
    }
    let entries = archiver.entries();

    let writer = archiver.finish()?;
    let file = writer.into_inner().map_err(|e| SweepError::io(output, e.into_error()))?;
    let compressed_bytes = file.metadata().map_err(|e| SweepError::io(output, e))?.len();

    info!(
        "archived {} entries to {} ({} bytes)",
        entries,
        output.display(),
        compressed_bytes
    );
    Ok(ArchiveStats { entries, compressed_bytes })
}
