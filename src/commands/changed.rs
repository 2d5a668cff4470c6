//! `glimpse changed` command.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::{detect_running_server, DEV_SERVER_PORTS};
use crate::checklist::TargetKind;
use crate::context::ServiceContext;
use crate::engine::Engine;
use crate::trigger::{AutoVerifyConfig, FileMatch};

use super::block_on;

const CONNECT_WAIT: Duration = Duration::from_millis(100);

/// Execute the `changed` command.
///
/// Reports which edited files touch UI code. When the project opted in and
/// a web file changed, the target comes from `glimpse-url`/`glimpse-port`
/// or from checking common development server ports.
///
/// # Errors
///
/// Returns an error string if the async runtime cannot start.
pub fn run(ctx: &ServiceContext, files: &[PathBuf]) -> Result<(), String> {
    let engine = Engine::new(ctx);
    let matches: Vec<(&Path, Option<FileMatch>)> =
        files.iter().map(|f| (f.as_path(), engine.classify_edit(f))).collect();
    let config = engine.auto_verify_config();

    let server = match &config {
        Some(config) if touches_webapp(&matches) => match config.target_url() {
            Some(url) => Some(url),
            None => block_on(detect_running_server(&DEV_SERVER_PORTS, CONNECT_WAIT))?,
        },
        _ => None,
    };
    print!("{}", render(&matches, config.as_ref(), server.as_deref()));
    Ok(())
}

fn touches_webapp(matches: &[(&Path, Option<FileMatch>)]) -> bool {
    matches.iter().flat_map(|(_, m)| m).any(|m| m.category.target_kind() == TargetKind::Webapp)
}

/// One line per file, then the auto-verify status.
#[must_use]
pub fn render(
    matches: &[(&Path, Option<FileMatch>)],
    config: Option<&AutoVerifyConfig>,
    server: Option<&str>,
) -> String {
    let width = matches.iter().map(|(p, _)| p.display().to_string().len()).max().unwrap_or(0);
    let mut out = String::new();
    for (path, found) in matches {
        let shown = path.display().to_string();
        match found {
            Some(m) => {
                let _ = writeln!(out, "{shown:<width$}  verify  {:<7} {}", m.category, m.reason());
            }
            None => {
                let _ = writeln!(out, "{shown:<width$}  skip");
            }
        }
    }

    if matches.iter().all(|(_, m)| m.is_none()) {
        out.push_str("No UI files changed.\n");
        return out;
    }
    match config {
        None => out.push_str(
            "Auto-verify is off; add \"glimpse: auto-verify\" to CLAUDE.md to enable it.\n",
        ),
        Some(config) => {
            let _ = writeln!(out, "Auto-verify enabled by {}.", config.source.display());
            if touches_webapp(matches) {
                let _ = writeln!(out, "Target: {}", server.unwrap_or("no development server detected"));
            }
        }
    }
    out
}
