//! Local file store.
//!
//! Files are addressed by the same URI strings that [`FileRef`] carries, so
//! the engine never has to convert between `Path`s and stored references.
//!
//! [`FileRef`]: crate::models::FileRef

mod disk;
pub mod paths;

pub use disk::DiskFiles;

use std::io;

use crate::models::Category;

/// A file physically present in a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    /// Absolute URI
    pub path: String,
    /// File name within the directory
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

/// Filesystem operations the sync engine needs.
///
/// Shared with upload / download workers, hence `Send + Sync`.
pub trait LocalFiles: Send + Sync {
    /// Base directory URI, always ending in `/`.
    fn base_uri(&self) -> &str;

    /// Regular files directly inside the category's directory.
    /// A directory that does not exist yet lists as empty.
    fn list_directory(&self, category: Category) -> io::Result<Vec<LocalEntry>>;

    /// Size of the file at `path`, or `None` if it does not exist.
    fn stat(&self, path: &str) -> io::Result<Option<u64>>;

    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Write `bytes`, creating parent directories and replacing any existing file.
    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()>;

    fn delete(&self, path: &str) -> io::Result<()>;

    /// Remove the directory at `path`, which must be empty.
    fn remove_dir(&self, path: &str) -> io::Result<()>;

    /// Copy `from` over `to`, creating parent directories.
    fn copy(&self, from: &str, to: &str) -> io::Result<()>;

    /// URI of `name` inside the category's directory.
    fn category_path(&self, category: Category, name: &str) -> String {
        paths::category_path(self.base_uri(), category, name)
    }
}
