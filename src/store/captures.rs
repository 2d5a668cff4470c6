//! Persisted captures and the capture index.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CaptureStore;
use crate::capture::{Capture, CapturePayload};
use crate::checklist::{TargetKind, TargetSpec};
use crate::error::{Error, Result};

/// Source of captures taken by a capture adapter.
pub const SOURCE_ADAPTER: &str = "glimpse";
/// Source of files accepted from other tools.
pub const SOURCE_EXTERNAL: &str = "external";

fn adapter_source() -> String {
    SOURCE_ADAPTER.to_string()
}

/// When and how a capture was verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationMark {
    /// Time of the verification.
    pub verified_at: DateTime<Utc>,
    /// One-line verdict summary.
    pub summary: String,
}

/// Index entry for a persisted capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Capture identifier.
    pub id: String,
    /// Payload file name inside `captures/`.
    pub file: String,
    /// Payload MIME type.
    pub mime: String,
    /// Kind of the captured target.
    pub target_kind: TargetKind,
    /// Locator of the captured target.
    pub locator: String,
    /// Window title, for GUI targets captured by title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
    /// Event that produced the capture.
    pub event: String,
    /// When the capture was taken.
    pub captured_at: DateTime<Utc>,
    /// Who produced the capture: [`SOURCE_ADAPTER`], [`SOURCE_EXTERNAL`],
    /// or a tool name.
    #[serde(default = "adapter_source")]
    pub source: String,
    /// Free-form labels.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Set once a verification has consumed this capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<VerificationMark>,
}

impl CaptureRecord {
    /// True until a verification mark is recorded.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.verified.is_none()
    }

    fn target(&self) -> TargetSpec {
        TargetSpec {
            kind: self.target_kind,
            locator: self.locator.clone(),
            window_title: self.window_title.clone(),
        }
    }
}

/// Contents of `captures/index.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureIndex {
    /// Records in persistence order.
    #[serde(default)]
    pub captures: Vec<CaptureRecord>,
}

impl CaptureStore<'_> {
    fn index_path(&self) -> std::path::PathBuf {
        self.captures_dir().join("index.json")
    }

    fn read_index(&self) -> Result<CaptureIndex> {
        let path = self.index_path();
        if !self.ctx.fs.exists(&path) {
            return Ok(CaptureIndex::default());
        }
        let text = self.ctx.fs.read_to_string(&path).map_err(|e| Error::io(path.display(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Parse(format!("capture index {}: {e}", path.display())))
    }

    fn write_index(&self, index: &CaptureIndex) -> Result<()> {
        let json = serde_json::to_string_pretty(index)
            .map_err(|e| Error::Parse(format!("failed to serialize capture index: {e}")))?;
        self.write_atomic(&self.index_path(), json.as_bytes())
    }

    /// Write an adapter capture and append its record to the index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on write failure or [`Error::Parse`] if the
    /// existing index is unreadable.
    pub fn persist(&self, capture: &Capture) -> Result<CaptureRecord> {
        self.persist_tagged(capture, SOURCE_ADAPTER, &[])
    }

    /// [`persist`](Self::persist) with an explicit source and tags.
    ///
    /// # Errors
    ///
    /// Same as [`persist`](Self::persist).
    pub fn persist_tagged(
        &self,
        capture: &Capture,
        source: &str,
        tags: &[String],
    ) -> Result<CaptureRecord> {
        let file = format!("{}.{}", capture.id(), capture.payload().extension());
        let path = self.captures_dir().join(&file);
        self.ctx
            .fs
            .write_bytes(&path, capture.payload().as_bytes())
            .map_err(|e| Error::io(path.display(), e))?;

        let target = capture.target();
        let record = CaptureRecord {
            id: capture.id().to_string(),
            file,
            mime: capture.mime().to_string(),
            target_kind: target.kind,
            locator: target.locator.clone(),
            window_title: target.window_title.clone(),
            event: capture.event().to_string(),
            captured_at: capture.captured_at(),
            source: source.to_string(),
            tags: tags.to_vec(),
            verified: None,
        };
        let mut index = self.read_index()?;
        index.captures.retain(|r| r.id != record.id);
        index.captures.push(record.clone());
        self.write_index(&index)?;
        tracing::debug!(id = %record.id, file = %record.file, "capture persisted");
        Ok(record)
    }

    /// Load a persisted capture.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureNotFound`] for unknown ids.
    pub fn load(&self, id: &str) -> Result<Capture> {
        let index = self.read_index()?;
        let record = index
            .captures
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::CaptureNotFound(id.to_string()))?;
        let bytes = self.read_bytes(&self.captures_dir().join(&record.file))?;
        let target = record.target();
        Ok(Capture::restore(
            record.id,
            CapturePayload::from_stored(&record.mime, bytes),
            target,
            record.event,
            record.captured_at,
        ))
    }

    /// All records in persistence order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the index is unreadable.
    pub fn list(&self) -> Result<Vec<CaptureRecord>> {
        Ok(self.read_index()?.captures)
    }

    /// Records carrying `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the index is unreadable.
    pub fn list_by_tag(&self, tag: &str) -> Result<Vec<CaptureRecord>> {
        Ok(self.list()?.into_iter().filter(|r| r.tags.iter().any(|t| t == tag)).collect())
    }

    /// Records produced by `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the index is unreadable.
    pub fn list_by_source(&self, source: &str) -> Result<Vec<CaptureRecord>> {
        Ok(self.list()?.into_iter().filter(|r| r.source == source).collect())
    }

    /// Copy a screenshot or transcript produced by another tool into the
    /// store as a pending capture. `.png` files are images; `.txt`, `.log`,
    /// `.html`, `.htm` and `.md` files are text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for other file types and [`Error::Io`] if the
    /// file cannot be read or the store written.
    pub fn accept(&self, path: &Path, event: &str, tags: &[String]) -> Result<CaptureRecord> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let bytes = self.read_bytes(path)?;
        let payload = match extension.as_str() {
            "png" => CapturePayload::Image(bytes),
            "txt" | "log" | "html" | "htm" | "md" => {
                CapturePayload::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => {
                return Err(Error::Parse(format!(
                    "unsupported capture file {}: expected .png or a text file",
                    path.display()
                )))
            }
        };
        let target = TargetSpec::new(TargetKind::Unknown, path.display().to_string());
        let capture = Capture::new(self.ctx, payload, &target, event);
        let record = self.persist_tagged(&capture, SOURCE_EXTERNAL, tags)?;
        tracing::info!(id = %record.id, path = %path.display(), "external capture accepted");
        Ok(record)
    }

    /// Accept several files with shared tags. Events are `batch:<n>`.
    /// Files that cannot be accepted are skipped with a warning.
    #[must_use]
    pub fn accept_batch(&self, paths: &[&Path], tags: &[String]) -> Vec<CaptureRecord> {
        paths
            .iter()
            .enumerate()
            .filter_map(|(i, path)| match self.accept(path, &format!("batch:{}", i + 1), tags) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "capture not accepted");
                    None
                }
            })
            .collect()
    }

    /// Records without a verification mark.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the index is unreadable.
    pub fn list_pending(&self) -> Result<Vec<CaptureRecord>> {
        Ok(self.list()?.into_iter().filter(CaptureRecord::is_pending).collect())
    }

    /// Stamp the given captures as verified. Nothing is written if any id
    /// is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureNotFound`] for the first unknown id.
    pub fn mark_verified(&self, ids: &[&str], summary: &str) -> Result<usize> {
        let mut index = self.read_index()?;
        if let Some(missing) = ids.iter().find(|id| !index.captures.iter().any(|r| r.id == **id)) {
            return Err(Error::CaptureNotFound((*missing).to_string()));
        }
        let mark = VerificationMark { verified_at: self.ctx.clock.now(), summary: summary.to_string() };
        let mut marked = 0;
        for record in index.captures.iter_mut().filter(|r| ids.contains(&r.id.as_str())) {
            record.verified = Some(mark.clone());
            marked += 1;
        }
        self.write_index(&index)?;
        Ok(marked)
    }

    /// Remove a capture's payload and record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureNotFound`] for unknown ids.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut index = self.read_index()?;
        let position = index
            .captures
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::CaptureNotFound(id.to_string()))?;
        let record = index.captures.remove(position);
        self.write_index(&index)?;
        let path = self.captures_dir().join(&record.file);
        if let Err(e) = self.ctx.fs.remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "capture payload already gone");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::TargetKind;
    use crate::testing::{test_context, PNG};
    use std::path::Path;

    fn shot(ctx: &crate::context::ServiceContext) -> Capture {
        let target = TargetSpec::new(TargetKind::Webapp, "http://localhost:3000");
        Capture::new(ctx, CapturePayload::Image(PNG.to_vec()), &target, "screenshot")
    }

    #[test]
    fn persist_then_load_returns_same_capture() {
        let ctx = test_context();
        let store = CaptureStore::open(&ctx);
        let capture = shot(&ctx);

        let record = store.persist(&capture).unwrap();
        assert_eq!(record.file, "cap-0001.png");
        assert!(ctx.fs.exists(Path::new("/project/.glimpse/captures/cap-0001.png")));
        assert_eq!(store.load("cap-0001").unwrap(), capture);
    }

    #[test]
    fn text_captures_keep_their_mime() {
        let ctx = test_context();
        let store = CaptureStore::open(&ctx);
        let target = TargetSpec::new(TargetKind::Cli, "npm test");
        let capture =
            Capture::new(&ctx, CapturePayload::Text("$ npm test\nok\n".into()), &target, "screenshot");
        store.persist(&capture).unwrap();

        let loaded = store.load(capture.id()).unwrap();
        assert_eq!(loaded.mime(), "text/plain");
        assert_eq!(loaded.payload(), &CapturePayload::Text("$ npm test\nok\n".into()));
    }

    #[test]
    fn mark_verified_removes_from_pending() {
        let ctx = test_context();
        let store = CaptureStore::open(&ctx);
        let a = store.persist(&shot(&ctx)).unwrap();
        let b = store.persist(&shot(&ctx)).unwrap();

        assert_eq!(store.mark_verified(&[&a.id], "1/1 passed").unwrap(), 1);
        let pending = store.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let ctx = test_context();
        let store = CaptureStore::open(&ctx);
        store.persist(&shot(&ctx)).unwrap();
        assert!(matches!(store.load("nope"), Err(Error::CaptureNotFound(_))));
        assert!(matches!(store.mark_verified(&["nope"], "x"), Err(Error::CaptureNotFound(_))));
        assert!(store.list_pending().unwrap().len() == 1);
    }

    #[test]
    fn delete_removes_record_and_payload() {
        let ctx = test_context();
        let store = CaptureStore::open(&ctx);
        let record = store.persist(&shot(&ctx)).unwrap();
        store.delete(&record.id).unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(!ctx.fs.exists(Path::new("/project/.glimpse/captures/cap-0001.png")));
    }

    #[test]
    fn accepted_files_are_external_and_tagged() {
        let ctx = test_context();
        ctx.fs.write_bytes(Path::new("/tmp/shots/login.png"), PNG).unwrap();
        ctx.fs.write(Path::new("/tmp/shots/run.log"), "ok\n").unwrap();
        let store = CaptureStore::open(&ctx);
        store.persist(&shot(&ctx)).unwrap();

        let tags = vec!["login".to_string()];
        let record = store.accept(Path::new("/tmp/shots/login.png"), "clicked login", &tags).unwrap();
        assert_eq!(record.source, SOURCE_EXTERNAL);
        assert_eq!(record.target_kind, TargetKind::Unknown);
        assert_eq!(record.locator, "/tmp/shots/login.png");
        assert_eq!(record.event, "clicked login");
        assert_eq!(store.load(&record.id).unwrap().payload(), &CapturePayload::Image(PNG.to_vec()));

        let paths =
            [Path::new("/tmp/shots/run.log"), Path::new("/tmp/shots/gone.png"), Path::new("/tmp/a.gif")];
        let batch = store.accept_batch(&paths, &tags);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].event, "batch:1");
        assert_eq!(batch[0].mime, "text/plain");

        assert_eq!(store.list_by_tag("login").unwrap().len(), 2);
        assert!(store.list_by_tag("signup").unwrap().is_empty());
        assert_eq!(store.list_by_source(SOURCE_EXTERNAL).unwrap().len(), 2);
        assert_eq!(store.list_by_source(SOURCE_ADAPTER).unwrap().len(), 1);
        assert_eq!(store.list_pending().unwrap().len(), 3);
    }

    #[test]
    fn unsupported_file_types_are_rejected() {
        let ctx = test_context();
        ctx.fs.write_bytes(Path::new("/tmp/shot.jpg"), b"jpeg").unwrap();
        let store = CaptureStore::open(&ctx);
        let err = store.accept(Path::new("/tmp/shot.jpg"), "", &[]).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn records_without_source_read_as_adapter_captures() {
        let ctx = test_context();
        let index = r#"{"captures": [{"id": "c1", "file": "c1.png", "mime": "image/png",
            "target_kind": "webapp", "locator": "http://x", "event": "screenshot",
            "captured_at": "2024-05-01T12:00:00Z"}]}"#;
        ctx.fs.write(Path::new("/project/.glimpse/captures/index.json"), index).unwrap();
        let records = CaptureStore::open(&ctx).list().unwrap();
        assert_eq!(records[0].source, SOURCE_ADAPTER);
        assert!(records[0].tags.is_empty());
    }

    #[test]
    fn corrupt_index_is_a_parse_error() {
        let ctx = test_context();
        ctx.fs.write(Path::new("/project/.glimpse/captures/index.json"), "{oops").unwrap();
        let store = CaptureStore::open(&ctx);
        assert!(matches!(store.list(), Err(Error::Parse(_))));
    }
}
