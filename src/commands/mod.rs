//! Command dispatch and handlers.

pub mod accept;
pub mod baseline;
pub mod capture;
pub mod changed;
pub mod pending;
pub mod status;
pub mod todos;
pub mod verify;

use std::env;
use std::future::Future;
use std::path::PathBuf;

use crate::capture::CaptureEvent;
use crate::cli::Command;
use crate::config::Config;
use crate::context::ServiceContext;

/// Dispatch a parsed command to its handler.
///
/// When `GLIMPSE_RECORD` is set to a file path, oracle, clock and id
/// interactions are recorded to a cassette written there when the command
/// finishes, whether it succeeded or not.
///
/// # Errors
///
/// Returns an error string if configuration fails to load or the selected
/// command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let root = env::current_dir().map_err(|e| format!("cannot read working directory: {e}"))?;
    let config = Config::load(&root).map_err(|e| e.to_string())?;
    let ctx = match env::var("GLIMPSE_RECORD") {
        Ok(path) if !path.is_empty() => ServiceContext::recording(&PathBuf::from(path), config),
        _ => ServiceContext::live(config),
    };
    dispatch_with_context(command, &ctx)
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<(), String> {
    match command {
        Command::Status { path } => status::run(ctx, path.as_deref()),
        Command::Todos { file, task } => todos::run(ctx, file.as_deref(), task.as_deref()),
        Command::Capture { target, adapter, events, timeout_secs, no_store, tags } => capture::run(
            ctx,
            &capture::CaptureArgs {
                target,
                adapter: adapter.map(Into::into),
                events,
                timeout_secs: *timeout_secs,
                store: !no_store,
                tags,
            },
        ),
        Command::Accept { files, event, tags } => accept::run(ctx, files, event.as_deref(), tags),
        Command::Changed { files } => changed::run(ctx, files),
        Command::Verify { task, target, adapter, events, pending, item, detailed, dry_run } => {
            verify::run(
                ctx,
                &verify::VerifyArgs {
                    task,
                    target: target.as_deref(),
                    adapter: adapter.map(Into::into),
                    events,
                    pending: *pending,
                    detailed: *detailed,
                    dry_run: *dry_run,
                    item: *item,
                },
            )
        }
        Command::Pending { tag, source } => pending::run(ctx, tag.as_deref(), source.as_deref()),
        Command::Baseline { action } => baseline::run(ctx, action),
    }
}

/// Drive an engine future to completion on a current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {e}"))?;
    Ok(runtime.block_on(future))
}

/// Parse `--event` arguments.
pub(crate) fn parse_events(raw: &[String]) -> Result<Vec<CaptureEvent>, String> {
    raw.iter().map(|e| e.parse::<CaptureEvent>().map_err(|err| err.to_string())).collect()
}
