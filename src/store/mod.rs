//! Capture store: persisted captures, their index, and promoted baselines.
//!
//! All I/O goes through `ctx.fs`. Directory layout under the store root:
//!
//! ```text
//! <root>/
//!   ├── captures/
//!   │     ├── <id>.png | <id>.txt
//!   │     └── index.json
//!   └── baselines/
//!         ├── <name>_<timestamp>.<ext>
//!         └── manifest.json
//! ```
//!
//! The index and the manifest are independent files; a corrupt manifest
//! never prevents captures from being persisted.

pub mod baseline;
pub mod captures;

use std::path::{Path, PathBuf};

pub use baseline::{Baseline, Manifest, ManifestRecovery, MANIFEST_VERSION};
pub use captures::{CaptureIndex, CaptureRecord, VerificationMark, SOURCE_ADAPTER, SOURCE_EXTERNAL};

use crate::context::ServiceContext;
use crate::error::{Error, Result};

/// Persistence layer for captures and baselines.
pub struct CaptureStore<'a> {
    ctx: &'a ServiceContext,
    root: PathBuf,
}

impl<'a> CaptureStore<'a> {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext, root: &Path) -> Self {
        Self { ctx, root: root.to_path_buf() }
    }

    /// Creates a store at the configured `store_root`.
    #[must_use]
    pub fn open(ctx: &'a ServiceContext) -> Self {
        Self::new(ctx, &ctx.config.store_root)
    }

    /// Store root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn captures_dir(&self) -> PathBuf {
        self.root.join("captures")
    }

    fn baselines_dir(&self) -> PathBuf {
        self.root.join("baselines")
    }

    /// Write through a temporary sibling, then rename over `path`.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let tmp = path.with_file_name(format!(".{name}.tmp"));
        self.ctx.fs.write_bytes(&tmp, bytes).map_err(|e| Error::io(tmp.display(), e))?;
        self.ctx.fs.rename(&tmp, path).map_err(|e| Error::io(path.display(), e))
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.ctx.fs.read_bytes(path).map_err(|e| Error::io(path.display(), e))
    }
}
