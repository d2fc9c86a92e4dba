use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::SystemTime;

use super::{invalid_path, valid_path, Entry, Metadata, Store};

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Arc<[u8]>,
    modified: Option<SystemTime>,
}

/// A store held entirely in memory, for embedded assets and tests.
///
/// Only files are inserted; every proper prefix of a file path is an implied directory
/// and `"."` is the root.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, MemoryFile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with no modification time.
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.insert_file(path.into(), data.into(), None)
    }

    pub fn insert_with_time(
        &mut self,
        path: impl Into<String>,
        data: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) -> &mut Self {
        self.insert_file(path.into(), data.into(), Some(modified))
    }

    fn insert_file(&mut self, path: String, data: Vec<u8>, modified: Option<SystemTime>) -> &mut Self {
        self.files.insert(
            path,
            MemoryFile {
                data: data.into(),
                modified,
            },
        );
        self
    }

    fn is_dir(&self, path: &str) -> bool {
        if path == "." {
            return true;
        }
        let prefix = format!("{}/", path);
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(name, _)| name.starts_with(&prefix))
    }
}

impl Store for MemoryStore {
    type Entry = MemoryEntry;

    fn open(&self, path: &str) -> io::Result<MemoryEntry> {
        if !valid_path(path) {
            return Err(invalid_path(path));
        }
        if let Some(file) = self.files.get(path) {
            return Ok(MemoryEntry {
                cursor: Cursor::new(file.data.clone()),
                modified: file.modified,
                is_dir: false,
            });
        }
        if self.is_dir(path) {
            return Ok(MemoryEntry {
                cursor: Cursor::new(Arc::from(Vec::<u8>::new())),
                modified: None,
                is_dir: true,
            });
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", path),
        ))
    }
}

#[derive(Debug)]
pub struct MemoryEntry {
    cursor: Cursor<Arc<[u8]>>,
    modified: Option<SystemTime>,
    is_dir: bool,
}

impl Entry for MemoryEntry {
    fn stat(&self) -> io::Result<Metadata> {
        Ok(Metadata {
            size: self.cursor.get_ref().len() as u64,
            modified: self.modified,
            is_dir: self.is_dir,
        })
    }
}

impl Read for MemoryEntry {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryEntry {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}
