//! Linear correction of raw stat sums against ground truth
//!
//! Raw gold sums under-count by a roughly constant factor, so each stat
//! category gets a least-squares fit `truth ≈ slope * raw + intercept`.
//! A snapshot is always fitted on *other* matches than the one it corrects.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, info};

use crate::economy::StatEstimate;
use crate::error::Result;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatCategory {
    Gold,
    MinionKills,
}

impl StatCategory {
    pub const ALL: [StatCategory; 2] = [StatCategory::Gold, StatCategory::MinionKills];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation of the fitted points
    pub r: f64,
    pub samples: usize,
}

impl LinearFit {
    /// Ordinary least squares over `(raw, truth)` points
    ///
    /// Needs at least two points and non-zero variance in `raw`.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        let n = points.len();
        if n < 2 {
            return None;
        }

        let nf = n as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / nf;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / nf;

        let mut ss_xx = 0.0;
        let mut ss_yy = 0.0;
        let mut ss_xy = 0.0;
        for &(x, y) in points {
            ss_xx += (x - mean_x) * (x - mean_x);
            ss_yy += (y - mean_y) * (y - mean_y);
            ss_xy += (x - mean_x) * (y - mean_y);
        }
        if ss_xx == 0.0 {
            return None;
        }

        let slope = ss_xy / ss_xx;
        let r = if ss_yy == 0.0 {
            0.0
        } else {
            ss_xy / (ss_xx * ss_yy).sqrt()
        };
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
            r,
            samples: n,
        })
    }

    pub fn predict(&self, raw: f64) -> f64 {
        self.slope * raw + self.intercept
    }
}

/// One player's raw stat next to its ground-truth value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub category: StatCategory,
    pub raw: f64,
    pub truth: f64,
}

/// Calibration samples contributed by one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchObservation {
    pub match_id: String,
    pub samples: Vec<CalibrationSample>,
}

impl MatchObservation {
    fn points(&self, category: StatCategory) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.samples
            .iter()
            .filter(move |s| s.category == category)
            .map(|s| (s.raw, s.truth))
    }
}

/// Immutable set of fits, one per stat category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSnapshot {
    pub fits: BTreeMap<StatCategory, LinearFit>,
    /// Match left out of the fit, if any
    pub excluded: Option<String>,
    pub matches: usize,
    pub created_at: DateTime<Utc>,
}

impl CalibrationSnapshot {
    pub fn empty() -> Self {
        Self {
            fits: BTreeMap::new(),
            excluded: None,
            matches: 0,
            created_at: Utc::now(),
        }
    }

    /// Fit every category on all observations except `exclude`
    pub fn from_observations(observations: &[MatchObservation], exclude: Option<&str>) -> Self {
        let used: Vec<&MatchObservation> = observations
            .iter()
            .filter(|o| exclude != Some(o.match_id.as_str()))
            .collect();

        let mut fits = BTreeMap::new();
        for category in StatCategory::ALL {
            let points: Vec<(f64, f64)> = used.iter().flat_map(|o| o.points(category)).collect();
            match LinearFit::fit(&points) {
                Some(fit) => {
                    debug!(
                        "{} fit: slope={:.4} intercept={:.1} r={:.3} n={}",
                        category, fit.slope, fit.intercept, fit.r, fit.samples
                    );
                    fits.insert(category, fit);
                }
                None => debug!("{}: not enough samples to fit ({})", category, points.len()),
            }
        }

        Self {
            fits,
            excluded: exclude.map(str::to_string),
            matches: used.len(),
            created_at: Utc::now(),
        }
    }

    pub fn fit(&self, category: StatCategory) -> Option<&LinearFit> {
        self.fits.get(&category)
    }

    /// Calibrated estimate, or the raw value when the category is unfitted
    pub fn estimate(&self, category: StatCategory, raw: f64, step: f64) -> StatEstimate {
        match self.fit(category) {
            Some(fit) => StatEstimate::calibrated(raw, fit, step),
            None => StatEstimate::uncalibrated(raw),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let snapshot: Self = serde_json::from_str(&content)?;
        debug!(
            "Loaded calibration from {} ({} fits)",
            path.display(),
            snapshot.fits.len()
        );
        Ok(snapshot)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved calibration to {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldReport {
    pub match_id: String,
    pub players: usize,
    pub within_tolerance: usize,
    pub mean_abs_error: f64,
    /// False when the other matches could not produce a fit
    pub calibrated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub category: StatCategory,
    pub tolerance: f64,
    pub folds: Vec<FoldReport>,
    pub players: usize,
    pub within_tolerance: usize,
    pub mean_abs_error: f64,
}

impl ValidationReport {
    /// Share of players within tolerance, 0..=1
    pub fn accuracy(&self) -> f64 {
        if self.players == 0 {
            0.0
        } else {
            self.within_tolerance as f64 / self.players as f64
        }
    }
}

/// Leave-one-out validation: each match is estimated from a fit on the others
pub fn validate_leave_one_out(
    observations: &[MatchObservation],
    category: StatCategory,
    tolerance: f64,
    step: f64,
) -> ValidationReport {
    let mut folds = Vec::with_capacity(observations.len());
    let mut total_error = 0.0;

    for observation in observations {
        let snapshot =
            CalibrationSnapshot::from_observations(observations, Some(&observation.match_id));

        let mut fold = FoldReport {
            match_id: observation.match_id.clone(),
            players: 0,
            within_tolerance: 0,
            mean_abs_error: 0.0,
            calibrated: snapshot.fit(category).is_some(),
        };
        let mut fold_error = 0.0;
        for (raw, truth) in observation.points(category) {
            let estimate = snapshot.estimate(category, raw, step);
            let error = (estimate.value - truth).abs();
            fold.players += 1;
            fold_error += error;
            if error <= tolerance {
                fold.within_tolerance += 1;
            }
        }
        if fold.players > 0 {
            fold.mean_abs_error = fold_error / fold.players as f64;
        }
        total_error += fold_error;
        folds.push(fold);
    }

    let players: usize = folds.iter().map(|f| f.players).sum();
    let within_tolerance = folds.iter().map(|f| f.within_tolerance).sum();
    let report = ValidationReport {
        category,
        tolerance,
        folds,
        players,
        within_tolerance,
        mean_abs_error: if players > 0 {
            total_error / players as f64
        } else {
            0.0
        },
    };
    info!(
        "{} leave-one-out: {}/{} within ±{} ({:.1}%), MAE {:.1}",
        category,
        report.within_tolerance,
        report.players,
        tolerance,
        report.accuracy() * 100.0,
        report.mean_abs_error
    );
    report
}
