use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::{invalid_path, valid_path, Entry, Metadata, Store};
use crate::logging::LoggingExt;

/// Serves the files below a directory on disk.
///
/// Paths follow the store naming rules, so `..` never reaches past the root. Symlinks
/// that resolve outside the root are reported as missing.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        if !valid_path(path) {
            log::debug!("Rejecting invalid store path {:?}", path);
            return Err(invalid_path(path));
        }

        let canonical_base = self
            .root
            .log_operation("canonicalize", || fs::canonicalize(&self.root))?;
        let requested = if path == "." {
            canonical_base.clone()
        } else {
            canonical_base.join(path)
        };

        let canonical = requested
            .as_path()
            .log_operation("canonicalize", || fs::canonicalize(&requested))
            .map_err(not_a_directory_as_missing)?;
        if canonical.starts_with(&canonical_base) {
            Ok(canonical)
        } else {
            log::warn!("Path escapes base directory: {}", canonical.display());
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is outside the served directory", path),
            ))
        }
    }
}

/// A path that continues below a regular file (`app.js/route`) names nothing.
fn not_a_directory_as_missing(err: io::Error) -> io::Error {
    if err.kind() == io::ErrorKind::NotADirectory {
        io::Error::new(io::ErrorKind::NotFound, err)
    } else {
        err
    }
}

impl Store for DirStore {
    type Entry = FileEntry;

    fn open(&self, path: &str) -> io::Result<FileEntry> {
        let resolved = self.resolve(path)?;
        let file = resolved
            .as_path()
            .log_operation("open", || File::open(&resolved))
            .map_err(not_a_directory_as_missing)?;
        Ok(FileEntry {
            file,
            path: resolved,
        })
    }
}

/// An open file or directory inside a [`DirStore`].
#[derive(Debug)]
pub struct FileEntry {
    file: File,
    path: PathBuf,
}

impl FileEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Entry for FileEntry {
    fn stat(&self) -> io::Result<Metadata> {
        let metadata = self.file.metadata()?;
        Ok(Metadata {
            size: metadata.len(),
            modified: metadata.modified().ok(),
            is_dir: metadata.is_dir(),
        })
    }
}

impl Read for FileEntry {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for FileEntry {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
