//! Streaming `.tar.gz` archives of a shared directory.
//!
//! The archive is produced incrementally into any `Write` sink; nothing is
//! buffered beyond the encoder's internal window. Each entry is revalidated
//! against the share root as the walk reaches it, so the archive only ever
//! contains what a per-file download could have returned.

use std::cell::Cell;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::UNIX_EPOCH;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::root::{ResolvedPath, ShareRoot};

/// Label used when the archived directory is the share root.
pub const DEFAULT_LABEL: &str = "download";

/// Errors that abort an archive stream.
///
/// Per-entry problems (unreadable files, escaping symlinks) never surface
/// here; they are skipped and counted in [`ArchiveSummary::skipped`].
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive sink failed: {0}")]
    SinkFailed(#[source] io::Error),
}

/// What ended up in a completed archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub files: u64,
    pub directories: u64,
    pub skipped: u64,
}

/// Archive label for a directory: its last path segment, or
/// [`DEFAULT_LABEL`] for the share root.
pub fn archive_label(dir: &ResolvedPath) -> String {
    dir.name().unwrap_or(DEFAULT_LABEL).to_string()
}

/// Writes compressed tar archives of directories inside a share root.
#[derive(Debug, Clone)]
pub struct ArchiveStreamer {
    root: ShareRoot,
    level: Compression,
}

impl ArchiveStreamer {
    /// `level` is clamped to the gzip range 0-9.
    pub fn new(root: &ShareRoot, level: u32) -> Self {
        Self {
            root: root.clone(),
            level: Compression::new(level.min(9)),
        }
    }

    /// Stream `dir` as a `.tar.gz` into `sink`, every entry nested under
    /// `label/`.
    ///
    /// Returns as soon as a write to `sink` fails; the remaining entries are
    /// never opened.
    pub fn stream<W: Write>(
        &self,
        dir: &ResolvedPath,
        label: &str,
        sink: W,
    ) -> Result<ArchiveSummary, ArchiveError> {
        let walker = WalkDir::new(dir.as_path())
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name();
        self.stream_entries(dir, label, sink, walker)
    }

    /// Archive `entries`, which must lie under `dir`, in the order given.
    fn stream_entries<W, I>(
        &self,
        dir: &ResolvedPath,
        label: &str,
        sink: W,
        entries: I,
    ) -> Result<ArchiveSummary, ArchiveError>
    where
        W: Write,
        I: IntoIterator<Item = walkdir::Result<walkdir::DirEntry>>,
    {
        let failed = Rc::new(Cell::new(false));
        let tracked = TrackedSink {
            inner: sink,
            failed: Rc::clone(&failed),
        };
        let mut builder = Builder::new(GzEncoder::new(tracked, self.level));
        let mut summary = ArchiveSummary::default();
        let label = Path::new(label);

        let mut root_entry = Header::new_gnu();
        directory_header(&mut root_entry, dir.as_path());
        builder
            .append_data(&mut root_entry, label, io::empty())
            .map_err(ArchiveError::SinkFailed)?;
        summary.directories += 1;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.relative(), error = %e, "Skipping unreadable entry");
                    summary.skipped += 1;
                    continue;
                }
            };
            let relative = match entry.path().strip_prefix(dir.as_path()) {
                Ok(relative) => relative,
                Err(_) => {
                    summary.skipped += 1;
                    continue;
                }
            };
            let name = label.join(relative);

            match self.append_entry(&mut builder, &entry, &name) {
                Ok(Appended::File) => summary.files += 1,
                Ok(Appended::Directory) => summary.directories += 1,
                Ok(Appended::Skipped) => summary.skipped += 1,
                Err(e) if failed.get() => {
                    debug!(error = %e, "Archive sink closed");
                    return Err(ArchiveError::SinkFailed(e));
                }
                Err(e) => {
                    warn!(entry = %name.display(), error = %e, "Skipping entry");
                    summary.skipped += 1;
                }
            }
        }

        let encoder = builder.into_inner().map_err(ArchiveError::SinkFailed)?;
        let mut sink = encoder.finish().map_err(ArchiveError::SinkFailed)?;
        sink.flush().map_err(ArchiveError::SinkFailed)?;

        info!(
            label = %label.display(),
            files = summary.files,
            directories = summary.directories,
            skipped = summary.skipped,
            "Archive complete"
        );
        Ok(summary)
    }

    fn append_entry<W: Write>(
        &self,
        builder: &mut Builder<W>,
        entry: &walkdir::DirEntry,
        name: &Path,
    ) -> io::Result<Appended> {
        let file_type = entry.file_type();

        if file_type.is_dir() {
            let mut header = Header::new_gnu();
            directory_header(&mut header, entry.path());
            builder.append_data(&mut header, name, io::empty())?;
            return Ok(Appended::Directory);
        }

        if file_type.is_file() {
            append_file(builder, entry.path(), name)?;
            return Ok(Appended::File);
        }

        if file_type.is_symlink() {
            // Only regular files inside the root are followed; directory
            // links are never descended.
            if !self.root.confines(entry.path()) {
                warn!(entry = %name.display(), "Skipping dangling or escaping symlink");
                return Ok(Appended::Skipped);
            }
            if !entry.path().is_file() {
                return Ok(Appended::Skipped);
            }
            append_file(builder, entry.path(), name)?;
            return Ok(Appended::File);
        }

        // Sockets, fifos and devices.
        Ok(Appended::Skipped)
    }
}

enum Appended {
    File,
    Directory,
    Skipped,
}

fn directory_header(header: &mut Header, path: &Path) {
    header.set_entry_type(EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    let mtime = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    header.set_mtime(mtime);
}

/// Append one regular file. The declared size comes from the opened handle,
/// and exactly that many bytes are written whatever happens to the file
/// afterwards.
fn append_file<W: Write>(builder: &mut Builder<W>, path: &Path, name: &Path) -> io::Result<()> {
    let mut file = File::open(path)?;
    let metadata = file.metadata()?;
    if !metadata.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }

    let mut header = Header::new_gnu();
    header.set_metadata(&metadata);
    header.set_entry_type(EntryType::Regular);
    header.set_size(metadata.len());

    let mut reader = PaddedReader::new(&mut file, metadata.len());
    builder.append_data(&mut header, name, &mut reader)?;
    if reader.padded {
        warn!(entry = %name.display(), "File changed while archiving, padded with zeros");
    }
    Ok(())
}

/// Reads exactly `remaining` bytes: the inner reader's data, then zeros if it
/// ends early or fails. Keeps the tar stream well-formed when a file shrinks
/// or becomes unreadable after its header went out.
struct PaddedReader<R> {
    inner: R,
    remaining: u64,
    padded: bool,
}

impl<R: Read> PaddedReader<R> {
    fn new(inner: R, len: u64) -> Self {
        Self {
            inner,
            remaining: len,
            padded: false,
        }
    }
}

impl<R: Read> Read for PaddedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(buf.len());
        let buf = &mut buf[..max];

        let n = if self.padded {
            0
        } else {
            match self.inner.read(buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(e),
                Err(_) => 0,
            }
        };

        let n = if n == 0 {
            self.padded = true;
            buf.fill(0);
            max
        } else {
            n
        };
        self.remaining -= n as u64;
        Ok(n)
    }
}

/// Records whether the wrapped sink ever failed, so write errors can be told
/// apart from errors reading the share.
struct TrackedSink<W> {
    inner: W,
    failed: Rc<Cell<bool>>,
}

impl<W: Write> Write for TrackedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).inspect_err(|_| self.failed.set(true))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().inspect_err(|_| self.failed.set(true))
    }
}
