//! # vgr-core
//!
//! Decode-and-classify pipeline for Vainglory `.vgr` replay frames.
//!
//! This crate provides:
//! - Frame sequencing and literal/wildcard byte scanning
//! - The player directory and a header-registry event decoder
//! - Kill, death, assist, gold and minion-kill attribution
//! - Hero, game mode and crystal-push winner detection
//! - Side resolution, objective classification and calibration against truth
//!
//! ## Feature Flags
//!
//! - `research-tools`: Enables the header/action census and byte search used
//!   to map new record types. Intended for the CLI, not the decode path.

pub mod assist;
pub mod calibration;
pub mod config;
pub mod correlate;
pub mod diagnostic;
pub mod directory;
pub mod economy;
pub mod entity;
pub mod error;
pub mod event;
pub mod export;
pub mod hero;
pub mod layout;
pub mod mode;
pub mod objective;
pub mod outcome;
pub mod pipeline;
pub mod prelude;
pub mod replay;
pub mod report;
pub mod scan;
pub mod side;
#[cfg(feature = "research-tools")]
pub mod survey;
pub mod truth;

#[cfg(test)]
mod synth;

pub use calibration::{
    CalibrationSnapshot, LinearFit, MatchObservation, StatCategory, ValidationReport,
    validate_leave_one_out,
};
pub use config::{DecoderConfig, DecoderConfigBuilder};
pub use diagnostic::{Diagnostic, DiagnosticCounts, Diagnostics};
pub use directory::{EntityDirectory, PlayerRecord};
pub use entity::{EntityClass, EntityId, EntityResolver};
pub use error::{Error, Result};
pub use event::{Event, EventKind, EventPayload, EventStream, HeaderRegistry, HeaderSpec};
pub use export::{ExportFormat, JsonExporter, TsvExporter};
pub use hero::Hero;
pub use mode::{GameMap, GameMode, MatchMode};
pub use outcome::MatchOutcome;
pub use pipeline::{MatchAnalysis, MatchDecoder, MatchInput};
pub use replay::{Frame, FramePosition, ReplayBytes};
pub use report::{MatchResult, PlayerStats};
pub use side::{Side, SideAssignment};
pub use truth::{MatchTruth, TruthFile};
