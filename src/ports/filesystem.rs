//! Filesystem port for the store's documents.

use std::path::Path;

/// Error type returned by filesystem adapters.
pub type FsResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Provides filesystem access for reading and writing store documents.
///
/// `write` must replace the file atomically: a concurrent reader sees
/// either the old contents or the new ones, never a partial write.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> FsResult<String>;

    /// Writes the given contents to a file, creating parent directories
    /// and replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> FsResult<()>;

    /// Appends the given contents to a file, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or written.
    fn append(&self, path: &Path, contents: &str) -> FsResult<()>;

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be removed.
    fn remove(&self, path: &Path) -> FsResult<()>;

    /// Returns `true` if the path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entry names in a directory, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(&self, path: &Path) -> FsResult<Vec<String>>;
}
