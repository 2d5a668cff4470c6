//! `glimpse baseline` commands.

use std::fmt::Write as _;

use crate::capture::CaptureOptions;
use crate::cli::BaselineCommand;
use crate::context::ServiceContext;
use crate::engine::Engine;
use crate::store::{Baseline, ManifestRecovery};
use crate::verify::ComparisonResult;

use super::block_on;

/// Execute a `baseline` subcommand.
///
/// # Errors
///
/// Returns an error string if the manifest or capture cannot be read, the
/// baseline does not exist, or the comparison fails.
pub fn run(ctx: &ServiceContext, action: &BaselineCommand) -> Result<(), String> {
    let engine = Engine::new(ctx);
    match action {
        BaselineCommand::Save { name, capture_id, description, rebuild } => {
            let recovery = if *rebuild { ManifestRecovery::Rebuild } else { ManifestRecovery::Refuse };
            let baseline = engine
                .save_baseline(name, capture_id, description, recovery)
                .map_err(|e| e.to_string())?;
            println!(
                "Saved baseline {:?} from capture {} ({})",
                baseline.name, baseline.capture_id, baseline.file
            );
        }
        BaselineCommand::List => {
            let baselines = engine.store().list_baselines().map_err(|e| e.to_string())?;
            print!("{}", render_list(&baselines));
        }
        BaselineCommand::Delete { name } => {
            let removed = engine.store().delete_baseline(name).map_err(|e| e.to_string())?;
            println!("Deleted baseline {:?}", removed.name);
        }
        BaselineCommand::Compare { name, adapter } => {
            let options = CaptureOptions::from_config(&ctx.config);
            let result = block_on(engine.compare_baseline(name, adapter.map(Into::into), &options))?
                .map_err(|e| e.to_string())?;
            print!("{}", render_comparison(name, &result));
        }
    }
    Ok(())
}

/// Table of baselines in manifest order.
#[must_use]
pub fn render_list(baselines: &[Baseline]) -> String {
    if baselines.is_empty() {
        return "No baselines saved.\n".to_string();
    }
    let width = baselines.iter().map(|b| b.name.len()).max().unwrap_or(4).max(4);
    let mut out = String::new();
    for b in baselines {
        let _ = write!(
            out,
            "{:<width$}  {}  {}  {}",
            b.name,
            b.created.format("%Y-%m-%d %H:%M:%S"),
            b.target_kind,
            b.locator
        );
        if !b.description.is_empty() {
            let _ = write!(out, "  # {}", b.description);
        }
        out.push('\n');
    }
    out
}

/// Comparison report.
#[must_use]
pub fn render_comparison(name: &str, result: &ComparisonResult) -> String {
    let mut out = String::new();
    let verdict = if result.matches { "MATCHES" } else { "REGRESSION" };
    let _ = writeln!(out, "Baseline {name:?}: {verdict} (similarity {:.2})", result.similarity);
    for difference in &result.differences {
        let _ = writeln!(out, "  - {difference}");
    }
    if !result.analysis.is_empty() {
        let _ = writeln!(out, "{}", result.analysis);
    }
    for fix in &result.suggested_fixes {
        let _ = writeln!(out, "  fix: {fix}");
    }
    out
}
