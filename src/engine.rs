//! Engine facade wiring the checklist, capture, store and verify layers for
//! one invocation.

use std::path::{Path, PathBuf};

use crate::capture::{
    detect, run_sequence, select_adapter, AdapterKind, Capture, CaptureAdapter, CaptureEvent,
    CaptureOptions,
};
use crate::checklist::{self, TaskDocument, TargetSpec};
use crate::context::ServiceContext;
use crate::error::{Error, Result};
use crate::store::{CaptureRecord, CaptureStore, ManifestRecovery};
use crate::trigger::{self, AutoVerifyConfig, FileMatch, VerificationContext};
use crate::verify::{self, BatchResult, ComparisonResult, Evidence, VerifyRequest};

/// How to obtain evidence for a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceSource {
    /// Capture now; the explicit target overrides the document's.
    Capture {
        /// Explicit target string.
        target: Option<String>,
        /// Explicit adapter.
        adapter: Option<AdapterKind>,
        /// Events to perform; empty for a single shot.
        events: Vec<CaptureEvent>,
    },
    /// Use every pending capture in the store.
    Pending,
}

/// Knobs for [`Engine::verify_task`].
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Where the evidence comes from.
    pub source: EvidenceSource,
    /// Capture knobs.
    pub capture: CaptureOptions,
    /// Surface per-capture analysis.
    pub detailed: bool,
    /// Judge without editing the task file or marking captures verified.
    pub dry_run: bool,
    /// Checklist item every capture of this run is evidence for. Unbound
    /// captures are judged against the task as a whole.
    pub item: Option<usize>,
}

/// Result of [`Engine::verify_task`].
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    /// The document after verdicts were applied.
    pub document: TaskDocument,
    /// The oracle's verdict.
    pub result: BatchResult,
    /// Items ticked by this run.
    pub flipped: Vec<usize>,
    /// Records of the captures used as evidence.
    pub captures: Vec<CaptureRecord>,
}

/// Entry point for commands.
pub struct Engine<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> Engine<'a> {
    /// Wrap a context.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// The configured capture store.
    #[must_use]
    pub fn store(&self) -> CaptureStore<'a> {
        CaptureStore::open(self.ctx)
    }

    /// Load a task document fresh from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if it cannot be read.
    pub fn load_task(&self, path: &Path) -> Result<TaskDocument> {
        checklist::load(self.ctx.fs.as_ref(), path)
    }

    /// Task files in the configured task directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be listed.
    pub fn discover_tasks(&self) -> Result<Vec<PathBuf>> {
        checklist::discover(self.ctx.fs.as_ref(), &self.ctx.config.task_dir)
    }

    /// Evaluate a todo snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed JSON payloads.
    pub fn evaluate_todos(&self, text: &str) -> Result<VerificationContext> {
        Ok(trigger::evaluate(&trigger::parse_todos(text)?))
    }

    /// Whether editing `path` touches UI code worth verifying.
    #[must_use]
    pub fn classify_edit(&self, path: &Path) -> Option<FileMatch> {
        trigger::should_auto_verify(self.ctx.fs.as_ref(), path)
    }

    /// The project's auto-verify opt-in. The project root is the parent of
    /// the task directory.
    #[must_use]
    pub fn auto_verify_config(&self) -> Option<AutoVerifyConfig> {
        let task_dir = &self.ctx.config.task_dir;
        let root = task_dir.parent().unwrap_or_else(|| Path::new(""));
        trigger::auto_verify_config(self.ctx.fs.as_ref(), root, task_dir)
    }

    /// Pick the target: an explicit string wins over the document's.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TargetUnresolved`] when neither yields a locator.
    pub fn resolve_target(
        &self,
        explicit: Option<&str>,
        document: Option<&TaskDocument>,
    ) -> Result<TargetSpec> {
        if let Some(target) = explicit {
            return detect(target);
        }
        match document.and_then(|d| d.target.as_ref()) {
            Some(target) if target.is_resolved() => Ok(target.clone()),
            Some(target) => Err(Error::TargetUnresolved(target.to_string())),
            None => Err(Error::TargetUnresolved(
                document.map_or_else(String::new, |d| d.path().display().to_string()),
            )),
        }
    }

    /// Capture `target` once, or once per event. A timed-out or failed
    /// capture is retried once.
    ///
    /// # Errors
    ///
    /// Returns adapter selection failures, [`Error::UnsupportedEvent`], or
    /// the capture failure after the retry.
    pub async fn capture(
        &self,
        target: &TargetSpec,
        adapter: Option<AdapterKind>,
        events: &[CaptureEvent],
        options: &CaptureOptions,
    ) -> Result<Vec<Capture>> {
        let adapter = select_adapter(self.ctx, target, adapter, !events.is_empty()).await?;
        match capture_once(adapter.as_ref(), target, events, options).await {
            Err(err) if err.is_retryable() => {
                tracing::warn!(target = %target, error = %err, "capture failed; retrying once");
                capture_once(adapter.as_ref(), target, events, options).await
            }
            other => other,
        }
    }

    /// Capture evidence, judge it against the task, and tick the items the
    /// oracle confirms. Captures are persisted before the oracle is asked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ItemNotFound`] before capturing when `item` names no
    /// checklist item, and task, capture, store or oracle failures. The task
    /// file is only written when verdicts changed it and `dry_run` is off.
    pub async fn verify_task(&self, path: &Path, options: &VerifyOptions) -> Result<VerifyOutcome> {
        let document = self.load_task(path)?;
        if let Some(id) = options.item.filter(|id| document.item(*id).is_none()) {
            return Err(Error::ItemNotFound(id));
        }
        let store = self.store();

        let (captures, records) = match &options.source {
            EvidenceSource::Capture { target, adapter, events } => {
                let target = self.resolve_target(target.as_deref(), Some(&document))?;
                let captures = self.capture(&target, *adapter, events, &options.capture).await?;
                let records =
                    captures.iter().map(|c| store.persist(c)).collect::<Result<Vec<_>>>()?;
                (captures, records)
            }
            EvidenceSource::Pending => {
                let records = store.list_pending()?;
                let captures =
                    records.iter().map(|r| store.load(&r.id)).collect::<Result<Vec<_>>>()?;
                (captures, records)
            }
        };

        let request = VerifyRequest {
            document: &document,
            evidence: captures
                .into_iter()
                .map(|capture| match options.item {
                    Some(item) => Evidence::for_item(capture, item),
                    None => Evidence::unbound(capture),
                })
                .collect(),
            detailed: options.detailed,
            context: None,
        };
        let result = verify::verify(self.ctx, &request).await?;

        if !records.is_empty() && !options.dry_run {
            let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
            store.mark_verified(&ids, &result.summary_line())?;
        }

        let (updated, flipped) = verify::apply(&document, &result)?;
        if !flipped.is_empty() && !options.dry_run {
            checklist::save(self.ctx.fs.as_ref(), &updated)?;
            tracing::info!(path = %path.display(), items = ?flipped, "task items marked complete");
        }
        Ok(VerifyOutcome { document: updated, result, flipped, captures: records })
    }

    /// Promote a stored capture to a baseline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureNotFound`] or the store's baseline errors.
    pub fn save_baseline(
        &self,
        name: &str,
        capture_id: &str,
        description: &str,
        recovery: ManifestRecovery,
    ) -> Result<crate::store::Baseline> {
        let store = self.store();
        let capture = store.load(capture_id)?;
        store.save_baseline(name, &capture, description, recovery)
    }

    /// Capture the baseline's target now and ask the oracle whether it
    /// still matches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BaselineNotFound`], capture failures, or oracle
    /// failures.
    pub async fn compare_baseline(
        &self,
        name: &str,
        adapter: Option<AdapterKind>,
        options: &CaptureOptions,
    ) -> Result<ComparisonResult> {
        let baseline = self.store().baseline_capture(name)?;
        let current = self.capture(baseline.target(), adapter, &[], options).await?;
        let current = current
            .into_iter()
            .next()
            .ok_or_else(|| Error::CaptureFailed {
                target: baseline.target().locator.clone(),
                reason: "adapter returned no capture".into(),
            })?;
        verify::compare(self.ctx, &baseline, &current).await
    }
}

async fn capture_once(
    adapter: &dyn CaptureAdapter,
    target: &TargetSpec,
    events: &[CaptureEvent],
    options: &CaptureOptions,
) -> Result<Vec<Capture>> {
    if events.is_empty() {
        Ok(vec![adapter.capture(target, options).await?])
    } else {
        run_sequence(adapter, target, events, options).await
    }
}
