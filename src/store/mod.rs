//! Read-only file stores the server can be pointed at.
//!
//! A store maps unrooted, slash-separated paths (`"assets/app.js"`, `"."` for the root)
//! to entries. `open` reports malformed paths with [`io::ErrorKind::InvalidInput`] and
//! absent entries with [`io::ErrorKind::NotFound`]; the server classifies every other
//! error as a fault.

mod dir;
mod memory;

pub use dir::{DirStore, FileEntry};
pub use memory::{MemoryEntry, MemoryStore};

use std::io::{self, Read, Seek};
use std::time::SystemTime;

/// What the server needs to know about an opened entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

/// An opened store entry. Dropping it releases the underlying handle.
pub trait Entry: Read + Seek + Send + 'static {
    fn stat(&self) -> io::Result<Metadata>;
}

pub trait Store: Send + Sync {
    type Entry: Entry;

    fn open(&self, path: &str) -> io::Result<Self::Entry>;
}

/// Checks `path` against the store naming rules: unrooted, slash-separated, with no
/// empty, `.` or `..` elements. The bare `"."` names the root.
pub fn valid_path(path: &str) -> bool {
    if path == "." {
        return true;
    }
    if path.contains('\\') || path.contains('\0') {
        return false;
    }
    path.split('/')
        .all(|element| !element.is_empty() && element != "." && element != "..")
}

pub(crate) fn invalid_path(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("invalid path: {:?}", path),
    )
}
