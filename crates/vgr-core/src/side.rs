//! Mapping raw team labels to the left and right sides of the result screen
//!
//! The team byte in the player directory does not say which side a team
//! played on, and in some replays the labels are swapped relative to the
//! result screen. The label whose kill total best explains the reported score
//! is taken as that side.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SideBasis {
    /// Kill totals matched against the reported score
    Score,
    /// Death totals broke a tie in kill totals
    DeathCrossCheck,
    /// No score available; label 1 is left, label 2 is right
    Convention,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SideAssignment {
    Resolved {
        left_label: u8,
        right_label: u8,
        basis: SideBasis,
    },
    Ambiguous {
        labels: Vec<u8>,
        reason: String,
    },
}

impl SideAssignment {
    pub fn side_of(&self, label: u8) -> Option<Side> {
        match self {
            Self::Resolved {
                left_label,
                right_label,
                ..
            } => {
                if label == *left_label {
                    Some(Side::Left)
                } else if label == *right_label {
                    Some(Side::Right)
                } else {
                    None
                }
            }
            Self::Ambiguous { .. } => None,
        }
    }

    pub fn label_of(&self, side: Side) -> Option<u8> {
        match (self, side) {
            (Self::Resolved { left_label, .. }, Side::Left) => Some(*left_label),
            (Self::Resolved { right_label, .. }, Side::Right) => Some(*right_label),
            (Self::Ambiguous { .. }, _) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Kill and death totals for one raw team label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTotals {
    pub label: u8,
    pub kills: u32,
    pub deaths: u32,
}

/// Reported final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub left: u32,
    pub right: u32,
}

const CONVENTION_LEFT: u8 = 1;
const CONVENTION_RIGHT: u8 = 2;

pub fn resolve_sides(totals: &[LabelTotals], score: Option<Score>) -> SideAssignment {
    let mut sorted = totals.to_vec();
    sorted.sort_by_key(|t| t.label);
    sorted.dedup_by_key(|t| t.label);
    let labels: Vec<u8> = sorted.iter().map(|t| t.label).collect();

    let [a, b] = sorted.as_slice() else {
        return SideAssignment::Ambiguous {
            reason: format!("expected two team labels, found {}", labels.len()),
            labels,
        };
    };

    let resolved = |left: &LabelTotals, right: &LabelTotals, basis| SideAssignment::Resolved {
        left_label: left.label,
        right_label: right.label,
        basis,
    };

    let Some(score) = score else {
        return if a.label == CONVENTION_LEFT && b.label == CONVENTION_RIGHT {
            resolved(a, b, SideBasis::Convention)
        } else {
            SideAssignment::Ambiguous {
                labels,
                reason: "no score and labels outside the 1/2 convention".to_string(),
            }
        };
    };

    // a on the left versus b on the left
    let kill_error = |left: &LabelTotals, right: &LabelTotals| {
        left.kills.abs_diff(score.left) + right.kills.abs_diff(score.right)
    };
    let straight = kill_error(a, b);
    let swapped = kill_error(b, a);
    debug!(
        "Side kill error: label {} left={}, label {} left={}",
        a.label, straight, b.label, swapped
    );
    if straight != swapped {
        return if straight < swapped {
            resolved(a, b, SideBasis::Score)
        } else {
            resolved(b, a, SideBasis::Score)
        };
    }

    // Left team's deaths are the right team's score
    let death_error = |left: &LabelTotals, right: &LabelTotals| {
        left.deaths.abs_diff(score.right) + right.deaths.abs_diff(score.left)
    };
    let straight = death_error(a, b);
    let swapped = death_error(b, a);
    match straight.cmp(&swapped) {
        std::cmp::Ordering::Less => resolved(a, b, SideBasis::DeathCrossCheck),
        std::cmp::Ordering::Greater => resolved(b, a, SideBasis::DeathCrossCheck),
        std::cmp::Ordering::Equal => SideAssignment::Ambiguous {
            labels,
            reason: "kill and death totals fit both pairings".to_string(),
        },
    }
}
