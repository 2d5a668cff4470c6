//! Live filesystem adapter using `std::fs`.

use std::path::Path;

use crate::ports::filesystem::{FileSystem, FsError};

/// Live filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

impl FileSystem for LiveFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        Ok(std::fs::read(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), FsError> {
        self.write_bytes(path, contents.as_bytes())
    }

    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        ensure_parent(path)?;
        Ok(std::fs::write(path, contents)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        ensure_parent(to)?;
        Ok(std::fs::rename(from, to)?)
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        Ok(std::fs::remove_file(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                entries.push(name.to_string());
            }
        }
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_parents_and_rename_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LiveFileSystem;
        let tmp = dir.path().join("a/b/.index.json.tmp");
        let dest = dir.path().join("a/b/index.json");

        fs.write(&dest, "old").unwrap();
        fs.write(&tmp, "new").unwrap();
        fs.rename(&tmp, &dest).unwrap();

        assert_eq!(fs.read_to_string(&dest).unwrap(), "new");
        assert!(!fs.exists(&tmp));
        assert_eq!(fs.list_dir(&dir.path().join("a/b")).unwrap(), vec!["index.json"]);
    }

    #[test]
    fn bytes_round_trip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LiveFileSystem;
        let path = dir.path().join("shot.png");

        fs.write_bytes(&path, &[0x89, b'P', b'N', b'G']).unwrap();
        assert_eq!(fs.read_bytes(&path).unwrap(), vec![0x89, b'P', b'N', b'G']);
        fs.remove_file(&path).unwrap();
        assert!(fs.read_bytes(&path).is_err());
    }
}
