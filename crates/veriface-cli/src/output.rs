use std::io::{self, Write};

use serde_json::json;

use veriface_core::{RegistrationOutcome, VerificationOutcome};

use crate::cli::OutputMode;
use crate::engine::PrecomputeReport;
use crate::errors::{CliError, CliResult};

pub fn render_verify(outcome: &VerificationOutcome, mode: OutputMode) -> CliResult<()> {
    match mode {
        OutputMode::Human => {
            for line in &outcome.logs {
                println!("{line}");
            }
            println!("{}", outcome.message);
        }
        OutputMode::Json => write_json_line(&serde_json::to_string(outcome)?)?,
    }
    Ok(())
}

pub fn render_register(outcome: &RegistrationOutcome, mode: OutputMode) -> CliResult<()> {
    match mode {
        OutputMode::Human => {
            for line in &outcome.logs {
                println!("{line}");
            }
            println!(
                "Registered reference {} for user {}",
                outcome.source_id, outcome.user
            );
        }
        OutputMode::Json => {
            let payload = serde_json::to_string(&json!({
                "user": outcome.user,
                "source_id": outcome.source_id,
                "stored_path": outcome.stored_path.display().to_string(),
                "created_at": outcome.created_at,
            }))?;
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

pub fn render_precompute(report: &PrecomputeReport, mode: OutputMode) -> CliResult<()> {
    match mode {
        OutputMode::Human => {
            println!(
                "Cached {} embedding(s) from {} reference image(s) for user {} (model {})",
                report.embeddings, report.sources, report.user, report.model
            );
        }
        OutputMode::Json => write_json_line(&serde_json::to_string(report)?)?,
    }
    Ok(())
}

pub fn render_error(err: &CliError, mode: OutputMode) {
    match mode {
        OutputMode::Human => eprintln!("Error: {err}"),
        OutputMode::Json => {
            let payload = json!({ "success": false, "error": err.to_string() });
            eprintln!("{payload}");
        }
    }
}

fn write_json_line(payload: &str) -> CliResult<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(payload.as_bytes())?;
    handle.write_all(b"\n")?;
    Ok(())
}
