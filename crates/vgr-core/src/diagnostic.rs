//! Non-fatal findings collected while decoding one match

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::trace;

use crate::calibration::StatCategory;
use crate::entity::EntityId;
use crate::event::EventKind;
use crate::hero::Hero;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A record failed a fixed-field check and was skipped
    StructuralViolation {
        offset: usize,
        what: String,
        reason: String,
    },
    /// An event whose entity is not a known player; kept as unattributed
    UnresolvedEntity {
        offset: usize,
        entity_id: EntityId,
        event: EventKind,
    },
    /// No fit for a stat category; the raw value is reported
    CalibrationUnavailable {
        category: StatCategory,
        reason: String,
    },
    /// Player count differs from what the match mode implies
    RosterMismatch {
        mode: String,
        expected: usize,
        found: usize,
    },
    /// Hero read from the replay disagrees with the truth record
    HeroMismatch {
        entity_id: EntityId,
        replay: Hero,
        truth: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DiagnosticKind {
    StructuralViolation,
    UnresolvedEntity,
    CalibrationUnavailable,
    RosterMismatch,
    HeroMismatch,
}

impl Diagnostic {
    pub fn structural(offset: usize, what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StructuralViolation {
            offset,
            what: what.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::StructuralViolation { .. } => DiagnosticKind::StructuralViolation,
            Self::UnresolvedEntity { .. } => DiagnosticKind::UnresolvedEntity,
            Self::CalibrationUnavailable { .. } => DiagnosticKind::CalibrationUnavailable,
            Self::RosterMismatch { .. } => DiagnosticKind::RosterMismatch,
            Self::HeroMismatch { .. } => DiagnosticKind::HeroMismatch,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    pub structural_violation: usize,
    pub unresolved_entity: usize,
    pub calibration_unavailable: usize,
    pub roster_mismatch: usize,
    pub hero_mismatch: usize,
}

impl DiagnosticCounts {
    pub fn get(&self, kind: DiagnosticKind) -> usize {
        match kind {
            DiagnosticKind::StructuralViolation => self.structural_violation,
            DiagnosticKind::UnresolvedEntity => self.unresolved_entity,
            DiagnosticKind::CalibrationUnavailable => self.calibration_unavailable,
            DiagnosticKind::RosterMismatch => self.roster_mismatch,
            DiagnosticKind::HeroMismatch => self.hero_mismatch,
        }
    }

    pub fn total(&self) -> usize {
        self.structural_violation
            + self.unresolved_entity
            + self.calibration_unavailable
            + self.roster_mismatch
            + self.hero_mismatch
    }

    fn merge(&mut self, other: &DiagnosticCounts) {
        self.structural_violation += other.structural_violation;
        self.unresolved_entity += other.unresolved_entity;
        self.calibration_unavailable += other.calibration_unavailable;
        self.roster_mismatch += other.roster_mismatch;
        self.hero_mismatch += other.hero_mismatch;
    }

    fn record(&mut self, kind: DiagnosticKind) {
        match kind {
            DiagnosticKind::StructuralViolation => self.structural_violation += 1,
            DiagnosticKind::UnresolvedEntity => self.unresolved_entity += 1,
            DiagnosticKind::CalibrationUnavailable => self.calibration_unavailable += 1,
            DiagnosticKind::RosterMismatch => self.roster_mismatch += 1,
            DiagnosticKind::HeroMismatch => self.hero_mismatch += 1,
        }
    }
}

/// Capped diagnostic list with complete per-kind counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    counts: DiagnosticCounts,
    limit: usize,
}

impl Diagnostics {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            counts: DiagnosticCounts::default(),
            limit,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        trace!("{}: {:?}", diagnostic.kind(), diagnostic);
        self.counts.record(diagnostic.kind());
        if self.entries.len() < self.limit {
            self.entries.push(diagnostic);
        }
    }

    /// Merge another list, keeping this list's cap and both sets of counts
    pub fn extend(&mut self, other: Diagnostics) {
        let room = self.limit.saturating_sub(self.entries.len());
        self.entries.extend(other.entries.into_iter().take(room));
        self.counts.merge(&other.counts);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn counts(&self) -> DiagnosticCounts {
        self.counts
    }

    /// Diagnostics counted but not kept because the list was full
    pub fn dropped(&self) -> usize {
        self.counts.total() - self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.total() == 0
    }
}
