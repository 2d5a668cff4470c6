//! Baselines: named reference captures and their manifest.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CaptureStore;
use crate::capture::{Capture, CapturePayload};
use crate::checklist::{TargetKind, TargetSpec};
use crate::error::{Error, Result};

/// Manifest format written by this version.
pub const MANIFEST_VERSION: u32 = 1;

/// A named reference capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    /// Unique name within the project.
    pub name: String,
    /// Id of the capture the baseline was promoted from.
    pub capture_id: String,
    /// Payload file name inside `baselines/`.
    pub file: String,
    /// Promotion time.
    pub created: DateTime<Utc>,
    /// Kind of the captured target.
    pub target_kind: TargetKind,
    /// Locator of the captured target.
    pub locator: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
}

impl Baseline {
    /// MIME type, derived from the stored file's extension.
    #[must_use]
    pub fn mime(&self) -> &'static str {
        if self.file.ends_with(".txt") {
            "text/plain"
        } else {
            "image/png"
        }
    }
}

/// Contents of `baselines/manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version.
    pub version: u32,
    /// Baselines, oldest upsert first.
    #[serde(default)]
    pub baselines: Vec<Baseline>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self { version: MANIFEST_VERSION, baselines: Vec::new() }
    }
}

impl Manifest {
    /// Look up a baseline by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Baseline> {
        self.baselines.iter().find(|b| b.name == name)
    }

    /// Insert or replace by name; the entry moves to the end. Returns the
    /// replaced entry.
    pub fn upsert(&mut self, baseline: Baseline) -> Option<Baseline> {
        let previous = self.remove(&baseline.name);
        self.baselines.push(baseline);
        previous
    }

    /// Remove by name.
    pub fn remove(&mut self, name: &str) -> Option<Baseline> {
        let position = self.baselines.iter().position(|b| b.name == name)?;
        Some(self.baselines.remove(position))
    }
}

/// What to do when the existing manifest cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestRecovery {
    /// Fail with [`Error::ManifestCorrupt`].
    Refuse,
    /// Replace it with a fresh manifest. Existing entries are lost.
    Rebuild,
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Parse(format!(
            "baseline name {name:?} must be non-empty and use only letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

impl CaptureStore<'_> {
    fn manifest_path(&self) -> PathBuf {
        self.baselines_dir().join("manifest.json")
    }

    fn read_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        if !self.ctx.fs.exists(&path) {
            return Ok(Manifest::default());
        }
        let text = self.ctx.fs.read_to_string(&path).map_err(|e| Error::io(path.display(), e))?;
        let manifest: Manifest = serde_json::from_str(&text)
            .map_err(|e| Error::ManifestCorrupt { path: path.clone(), reason: e.to_string() })?;
        if manifest.version > MANIFEST_VERSION {
            return Err(Error::ManifestCorrupt {
                path,
                reason: format!("unsupported manifest version {}", manifest.version),
            });
        }
        Ok(manifest)
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| Error::Parse(format!("failed to serialize manifest: {e}")))?;
        self.write_atomic(&self.manifest_path(), json.as_bytes())
    }

    /// Promote `capture` to the baseline `name`, replacing any previous
    /// baseline of that name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for invalid names, [`Error::ManifestCorrupt`]
    /// when the manifest is unreadable and `recovery` is `Refuse`, or
    /// [`Error::Io`] on write failure.
    pub fn save_baseline(
        &self,
        name: &str,
        capture: &Capture,
        description: &str,
        recovery: ManifestRecovery,
    ) -> Result<Baseline> {
        validate_name(name)?;
        let mut manifest = match self.read_manifest() {
            Ok(manifest) => manifest,
            Err(Error::ManifestCorrupt { path, reason }) if recovery == ManifestRecovery::Rebuild => {
                tracing::warn!(path = %path.display(), %reason, "rebuilding corrupt baseline manifest");
                Manifest::default()
            }
            Err(e) => return Err(e),
        };

        let created = self.ctx.clock.now();
        let file = format!(
            "{name}_{}.{}",
            created.format("%Y%m%dT%H%M%S"),
            capture.payload().extension()
        );
        self.write_atomic(&self.baselines_dir().join(&file), capture.payload().as_bytes())?;

        let baseline = Baseline {
            name: name.to_string(),
            capture_id: capture.id().to_string(),
            file,
            created,
            target_kind: capture.target().kind,
            locator: capture.target().locator.clone(),
            description: description.to_string(),
        };
        let previous = manifest.upsert(baseline.clone());
        self.write_manifest(&manifest)?;

        if let Some(previous) = previous.filter(|p| p.file != baseline.file) {
            let old = self.baselines_dir().join(&previous.file);
            if let Err(e) = self.ctx.fs.remove_file(&old) {
                tracing::debug!(path = %old.display(), error = %e, "old baseline payload not removed");
            }
        }
        tracing::info!(name, file = %baseline.file, "baseline saved");
        Ok(baseline)
    }

    /// Look up a baseline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BaselineNotFound`] if absent or
    /// [`Error::ManifestCorrupt`] if the manifest is unreadable.
    pub fn load_baseline(&self, name: &str) -> Result<Baseline> {
        self.read_manifest()?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::BaselineNotFound(name.to_string()))
    }

    /// The baseline's payload as a capture.
    ///
    /// # Errors
    ///
    /// As [`CaptureStore::load_baseline`], plus [`Error::Io`] if the payload
    /// file is missing.
    pub fn baseline_capture(&self, name: &str) -> Result<Capture> {
        let baseline = self.load_baseline(name)?;
        let bytes = self.read_bytes(&self.baselines_dir().join(&baseline.file))?;
        Ok(Capture::restore(
            baseline.capture_id.clone(),
            CapturePayload::from_stored(baseline.mime(), bytes),
            TargetSpec::new(baseline.target_kind, baseline.locator.clone()),
            format!("baseline:{}", baseline.name),
            baseline.created,
        ))
    }

    /// All baselines in manifest order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestCorrupt`] if the manifest is unreadable.
    pub fn list_baselines(&self) -> Result<Vec<Baseline>> {
        Ok(self.read_manifest()?.baselines)
    }

    /// Remove a baseline and its payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BaselineNotFound`] if absent.
    pub fn delete_baseline(&self, name: &str) -> Result<Baseline> {
        let mut manifest = self.read_manifest()?;
        let removed =
            manifest.remove(name).ok_or_else(|| Error::BaselineNotFound(name.to_string()))?;
        self.write_manifest(&manifest)?;
        let path = self.baselines_dir().join(&removed.file);
        if let Err(e) = self.ctx.fs.remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "baseline payload already gone");
        }
        Ok(removed)
    }
}
