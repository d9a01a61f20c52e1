//! Match outcome from the crystal push
//!
//! Turrets and crystals report through short little-endian status records
//! for as long as they stand; a destroyed structure goes silent. Structures
//! split into two teams by id, with a wide gap between the teams. When a
//! crystal falls, the losing team's remaining structures go silent within a
//! few frames of each other, so the team that loses several structures in
//! one short window lost the match.
//!
//! Kill totals are not used: a team can win with fewer kills.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::OutcomeConfig;
use crate::layout::structure;
use crate::replay::ReplayBytes;
use crate::side::Side;

/// Frames in which one structure was heard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub first_frame: u32,
    pub last_frame: u32,
    pub records: u32,
}

/// Status records per structure id across a whole replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureCensus {
    lifecycles: BTreeMap<u16, Lifecycle>,
}

impl StructureCensus {
    pub fn scan(replay: &ReplayBytes, config: &OutcomeConfig) -> Self {
        let bytes = replay.as_bytes();
        let mut lifecycles: BTreeMap<u16, Lifecycle> = BTreeMap::new();

        for span in replay.spans() {
            let data = &bytes[span.start..span.end()];
            let mut at = 0;
            while at + structure::ACTION_AT + 1 < data.len() {
                if data[at + structure::ID_LEN..at + structure::ACTION_AT] != structure::QUIET {
                    at += 1;
                    continue;
                }
                let id = u16::from_le_bytes([data[at], data[at + 1]]);
                if config.structures.contains(id) {
                    lifecycles
                        .entry(id)
                        .and_modify(|l| {
                            l.last_frame = span.index;
                            l.records += 1;
                        })
                        .or_insert(Lifecycle {
                            first_frame: span.index,
                            last_frame: span.index,
                            records: 1,
                        });
                }
                at += config.record_stride;
            }
        }

        trace!("Structure census: {} ids", lifecycles.len());
        Self { lifecycles }
    }

    pub fn get(&self, id: u16) -> Option<&Lifecycle> {
        self.lifecycles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.lifecycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lifecycles.is_empty()
    }

    fn last_frame(&self) -> Option<u32> {
        self.lifecycles.values().map(|l| l.last_frame).max()
    }
}

/// Winner and the crystal push that decided it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub winner: Side,
    /// First frame of the push
    pub crystal_frame: u32,
    /// Structure ids per team; the lower ids are the left side's
    pub structures: [Vec<u16>; 2],
    /// Structures destroyed before the end, per team
    pub destroyed: [usize; 2],
}

/// Winner by crystal push; `None` when no push is found (surrender, time limit)
pub fn detect_outcome(census: &StructureCensus, config: &OutcomeConfig) -> Option<MatchOutcome> {
    let candidates: Vec<u16> = census
        .lifecycles
        .iter()
        .filter(|(_, l)| l.first_frame <= config.early_frame && l.records > config.min_records)
        .map(|(&id, _)| id)
        .collect();
    let Some(teams) = split_at_widest_gap(&candidates) else {
        debug!("Outcome: {} structures, too few to split", candidates.len());
        return None;
    };
    let end = census.last_frame()?;

    let mut destructions: Vec<(u32, usize)> = Vec::new();
    let mut destroyed = [0usize; 2];
    for (team, ids) in teams.iter().enumerate() {
        for id in ids {
            let Some(lifecycle) = census.get(*id) else {
                continue;
            };
            if lifecycle.last_frame + 1 < end {
                destructions.push((lifecycle.last_frame, team));
                destroyed[team] += 1;
            }
        }
    }
    destructions.sort_unstable();

    for &(start, _) in &destructions {
        let mut in_window = [0usize; 2];
        for &(frame, team) in &destructions {
            if (start..=start + config.window_frames).contains(&frame) {
                in_window[team] += 1;
            }
        }
        let loser = if in_window[0] >= config.min_destroyed {
            0
        } else if in_window[1] >= config.min_destroyed {
            1
        } else {
            continue;
        };

        let losing_side = if loser == 0 { Side::Left } else { Side::Right };
        let winner = losing_side.opposite();
        debug!(
            "Outcome: crystal push at frame {} ({} structures), {} wins",
            start, in_window[loser], winner
        );
        return Some(MatchOutcome {
            winner,
            crystal_frame: start,
            structures: teams,
            destroyed,
        });
    }

    debug!(
        "Outcome: no crystal push ({} and {} structures destroyed)",
        destroyed[0], destroyed[1]
    );
    None
}

/// Sorted ids split at the largest gap between neighbours
fn split_at_widest_gap(ids: &[u16]) -> Option<[Vec<u16>; 2]> {
    if ids.len() < 2 {
        return None;
    }
    let mut split = 1;
    let mut widest = 0;
    for (i, pair) in ids.windows(2).enumerate() {
        let gap = pair[1] - pair[0];
        if gap > widest {
            widest = gap;
            split = i + 1;
        }
    }
    Some([ids[..split].to_vec(), ids[split..].to_vec()])
}
