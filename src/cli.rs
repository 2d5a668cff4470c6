//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::capture::AdapterKind;

/// Top-level CLI parser for `glimpse`.
#[derive(Debug, Parser)]
#[command(
    name = "glimpse",
    version,
    about = "Capture running applications and verify task checklists against them"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Adapter names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AdapterArg {
    /// Browser automation over WebDriver.
    Browser,
    /// One-shot headless browser screenshot.
    Headless,
    /// Terminal application on a pseudo terminal.
    Tui,
    /// Desktop window grab.
    Gui,
    /// Command output.
    Cli,
}

impl From<AdapterArg> for AdapterKind {
    fn from(arg: AdapterArg) -> Self {
        match arg {
            AdapterArg::Browser => Self::Browser,
            AdapterArg::Headless => Self::Headless,
            AdapterArg::Tui => Self::Tui,
            AdapterArg::Gui => Self::Gui,
            AdapterArg::Cli => Self::Cli,
        }
    }
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show checklist progress for task documents.
    Status {
        /// Task file or directory; defaults to the configured task directory.
        path: Option<PathBuf>,
    },
    /// Decide whether a todo snapshot warrants verification.
    Todos {
        /// JSON or markdown todo list; reads stdin when omitted.
        file: Option<PathBuf>,
        /// Task file to reference in the emitted prompt.
        #[arg(long)]
        task: Option<PathBuf>,
    },
    /// Capture a target and store the result.
    Capture {
        /// URL, command line, or `kind:locator`.
        target: String,
        /// Force a specific adapter.
        #[arg(long, value_enum)]
        adapter: Option<AdapterArg>,
        /// Event to perform before each capture, e.g. `click:#submit`.
        #[arg(long = "event", value_name = "EVENT")]
        events: Vec<String>,
        /// Per-call budget in seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print the capture without storing it.
        #[arg(long)]
        no_store: bool,
        /// Label stored captures; repeatable.
        #[arg(long = "tag", value_name = "TAG", conflicts_with = "no_store")]
        tags: Vec<String>,
    },
    /// Store screenshots or transcripts produced by another tool.
    Accept {
        /// `.png` images or text files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Event description; only for a single file.
        #[arg(long)]
        event: Option<String>,
        /// Label the captures; repeatable.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Report whether edited files touch UI code worth verifying.
    Changed {
        /// Edited files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Capture evidence and tick the checklist items it confirms.
    Verify {
        /// Task document to verify.
        task: PathBuf,
        /// Target overriding the document's marker.
        #[arg(long)]
        target: Option<String>,
        /// Force a specific adapter.
        #[arg(long, value_enum)]
        adapter: Option<AdapterArg>,
        /// Event to perform before each capture.
        #[arg(long = "event", value_name = "EVENT")]
        events: Vec<String>,
        /// Judge the stored pending captures instead of capturing now.
        #[arg(long, conflicts_with_all = ["target", "events", "adapter"])]
        pending: bool,
        /// Checklist item the captures are evidence for.
        #[arg(long, value_name = "ID")]
        item: Option<usize>,
        /// Show per-capture analysis.
        #[arg(long)]
        detailed: bool,
        /// Report verdicts without editing the task file.
        #[arg(long)]
        dry_run: bool,
    },
    /// List captures not yet verified.
    Pending {
        /// Only captures with this tag.
        #[arg(long)]
        tag: Option<String>,
        /// Only captures from this source, e.g. `glimpse` or `external`.
        #[arg(long)]
        source: Option<String>,
    },
    /// Manage reference captures.
    Baseline {
        /// Baseline operation.
        #[command(subcommand)]
        action: BaselineCommand,
    },
}

/// `glimpse baseline` operations.
#[derive(Debug, Subcommand)]
pub enum BaselineCommand {
    /// Promote a stored capture to a named baseline.
    Save {
        /// Baseline name.
        name: String,
        /// Capture id from `glimpse pending` or `glimpse capture`.
        capture_id: String,
        /// Free-form description.
        #[arg(long, default_value = "")]
        description: String,
        /// Rebuild a corrupt manifest instead of refusing.
        #[arg(long)]
        rebuild: bool,
    },
    /// List baselines.
    List,
    /// Delete a baseline.
    Delete {
        /// Baseline name.
        name: String,
    },
    /// Capture the baseline's target now and compare.
    Compare {
        /// Baseline name.
        name: String,
        /// Force a specific adapter.
        #[arg(long, value_enum)]
        adapter: Option<AdapterArg>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_capture_with_events() {
        let cli = Cli::parse_from([
            "glimpse",
            "capture",
            "http://localhost:3000",
            "--event",
            "click:#go",
            "--event",
            "wait:1",
            "--adapter",
            "browser",
        ]);
        let Command::Capture { target, events, adapter, no_store, .. } = cli.command else {
            panic!("expected capture");
        };
        assert_eq!(target, "http://localhost:3000");
        assert_eq!(events, ["click:#go", "wait:1"]);
        assert_eq!(adapter, Some(AdapterArg::Browser));
        assert!(!no_store);
    }

    #[test]
    fn pending_conflicts_with_target() {
        let result = Cli::try_parse_from([
            "glimpse", "verify", "task.md", "--pending", "--target", "npm test",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn verify_accepts_an_item_binding() {
        let cli = Cli::parse_from(["glimpse", "verify", "task.md", "--pending", "--item", "3"]);
        assert!(matches!(cli.command, Command::Verify { item: Some(3), pending: true, .. }));
    }

    #[test]
    fn accept_requires_files() {
        assert!(Cli::try_parse_from(["glimpse", "accept"]).is_err());
        let cli = Cli::parse_from(["glimpse", "accept", "a.png", "b.png", "--tag", "ci"]);
        let Command::Accept { files, tags, event } = cli.command else {
            panic!("expected accept");
        };
        assert_eq!(files.len(), 2);
        assert_eq!(tags, ["ci"]);
        assert!(event.is_none());
    }

    #[test]
    fn parses_baseline_save() {
        let cli = Cli::parse_from(["glimpse", "baseline", "save", "home", "cap-1", "--rebuild"]);
        assert!(matches!(
            cli.command,
            Command::Baseline { action: BaselineCommand::Save { rebuild: true, .. } }
        ));
    }
}
