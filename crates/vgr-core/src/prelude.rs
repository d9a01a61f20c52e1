//! Prelude module for convenient imports
//!
//! ```ignore
//! use vgr_core::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Pipeline: `MatchDecoder`, `MatchInput`, `DecoderConfig`, `Frame`
//! - Results: `MatchResult`, `PlayerStats`, `Side`, `Hero`, `Diagnostic`
//! - Calibration and truth: `CalibrationSnapshot`, `StatCategory`, `TruthFile`
//! - Error handling: `Error`, `Result`

// Pipeline
pub use crate::config::DecoderConfig;
pub use crate::pipeline::{MatchDecoder, MatchInput};
pub use crate::replay::Frame;

// Error handling
pub use crate::error::{Error, Result};

// Results
pub use crate::diagnostic::Diagnostic;
pub use crate::hero::Hero;
pub use crate::report::{MatchResult, PlayerStats};
pub use crate::side::Side;

// Calibration and truth
pub use crate::calibration::{CalibrationSnapshot, StatCategory};
pub use crate::truth::TruthFile;

// Export format trait
pub use crate::export::ExportFormat;
