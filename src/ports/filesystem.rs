//! Filesystem port for file I/O operations.

use std::path::Path;

/// Boxed error returned by plain I/O ports.
pub type FsError = Box<dyn std::error::Error + Send + Sync>;

/// Provides filesystem access for reading and writing files.
///
/// Abstracting the filesystem lets the stores and the checklist loader run
/// against an in-memory fake in tests.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Reads the entire contents of a file as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Writes the given contents to a file, creating parent directories and
    /// overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError>;

    /// Writes raw bytes to a file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;

    /// Atomically replaces `to` with `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Lists the entries in a directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError>;
}
