//! Decode command: frames in, match results out.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use tracing::warn;
use vgr_core::{
    CalibrationSnapshot, DecoderConfig, ExportFormat, JsonExporter, MatchDecoder, MatchResult,
    TsvExporter,
};

use crate::OutputFormat;
use crate::frames::load_matches;

pub fn run(
    config: DecoderConfig,
    input: &Path,
    truth: Option<&Path>,
    calibration: Option<&Path>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let decoder = MatchDecoder::new(config)?;
    let inputs = load_matches(input)?;
    if inputs.is_empty() {
        bail!("No matches found in {}", input.display());
    }

    let truth = truth.map(super::load_truth).transpose()?;
    let fallback = match calibration {
        Some(path) => load_fallback(path)?,
        None => None,
    };

    let mut results: Vec<MatchResult> = Vec::new();
    for (match_id, outcome) in decoder.decode_corpus(inputs, truth.as_ref(), fallback.as_ref()) {
        match outcome {
            Ok(result) => {
                print_summary(&result);
                results.push(result);
            }
            Err(e) => eprintln!("{} {}: {}", "skipped".red(), match_id, e),
        }
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&results)?,
        OutputFormat::Ndjson => JsonExporter.format_rows(&results),
        OutputFormat::Tsv => TsvExporter.format_rows(&results),
    };
    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {} matches to {}", results.len(), path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Saved calibration; a missing file only loses the fallback
fn load_fallback(path: &Path) -> Result<Option<CalibrationSnapshot>> {
    match CalibrationSnapshot::load(path) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(e) if e.is_not_found() => {
            warn!(
                "Calibration {} not found, decoding without a fallback fit",
                path.display()
            );
            Ok(None)
        }
        Err(e) => {
            Err(e).with_context(|| format!("Failed to load calibration {}", path.display()))
        }
    }
}

fn print_summary(result: &MatchResult) {
    let sides = if result.sides.is_resolved() {
        "sides resolved".green().to_string()
    } else {
        "sides ambiguous".yellow().to_string()
    };
    let diagnostics = result.diagnostic_counts.total();
    let winner = match result.winner {
        Some(side) => format!("{} won", side).green().to_string(),
        None => "winner unknown".yellow().to_string(),
    };
    let mode = result.mode.as_ref().map_or("unknown mode", |m| m.tag.as_str());
    eprintln!(
        "{} {}, {} players, {} objectives, {}, {}, {} diagnostics",
        result.match_id.bold(),
        mode,
        result.players.len(),
        result.objectives.len(),
        sides,
        winner,
        if diagnostics > 0 {
            diagnostics.yellow().to_string()
        } else {
            diagnostics.to_string()
        }
    );
}
