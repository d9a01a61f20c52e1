//! Calibrate command: fit and validate stat corrections on a corpus.

use std::path::Path;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use vgr_core::calibration::ValidationReport;
use vgr_core::{
    CalibrationSnapshot, DecoderConfig, MatchDecoder, MatchObservation, StatCategory,
    validate_leave_one_out,
};

use crate::frames::load_matches;

/// Share of players that must land within tolerance
const TARGET_ACCURACY: f64 = 0.8;

pub fn run(config: DecoderConfig, input: &Path, truth: &Path, output: &Path) -> Result<()> {
    let decoder = MatchDecoder::new(config)?;
    let truth = super::load_truth(truth)?;
    let inputs = load_matches(input)?;

    let observations: Vec<MatchObservation> = decoder
        .analyze_corpus(inputs, Some(&truth))
        .into_iter()
        .filter_map(|(match_id, analysis)| match analysis {
            Ok(analysis) => analysis.observation(),
            Err(e) => {
                eprintln!("{} {}: {}", "skipped".red(), match_id, e);
                None
            }
        })
        .collect();
    if observations.len() < 2 {
        bail!(
            "Calibration needs at least two matches with truth, found {}",
            observations.len()
        );
    }

    let settings = &decoder.config().calibration;
    for category in StatCategory::ALL {
        let (tolerance, step) = match category {
            StatCategory::Gold => (
                settings.tolerance,
                f64::from(decoder.config().economy.rounding),
            ),
            StatCategory::MinionKills => (settings.minion_kills_tolerance, 1.0),
        };
        let report = validate_leave_one_out(&observations, category, tolerance, step);
        if report.players > 0 {
            print_report(&report);
        }
    }

    let snapshot = CalibrationSnapshot::from_observations(&observations, None);
    for (category, fit) in &snapshot.fits {
        println!(
            "{}: truth = {:.4} * raw + {:.1} (r = {:.3}, n = {})",
            category, fit.slope, fit.intercept, fit.r, fit.samples
        );
    }
    snapshot.save(output)?;
    println!("Saved calibration to {}", output.display());
    Ok(())
}

fn print_report(report: &ValidationReport) {
    println!("{} leave-one-out (±{}):", report.category.bold(), report.tolerance);
    for fold in &report.folds {
        let status = if !fold.calibrated {
            "uncalibrated".yellow().to_string()
        } else {
            format!("{}/{}", fold.within_tolerance, fold.players)
        };
        println!(
            "  {:<32} {:>12}  MAE {:.1}",
            fold.match_id, status, fold.mean_abs_error
        );
    }

    let accuracy = format!("{:.1}%", report.accuracy() * 100.0);
    let accuracy = if report.accuracy() >= TARGET_ACCURACY {
        accuracy.green().to_string()
    } else {
        accuracy.red().to_string()
    };
    println!(
        "  overall {}/{} within tolerance ({}), MAE {:.1}",
        report.within_tolerance, report.players, accuracy, report.mean_abs_error
    );
}
