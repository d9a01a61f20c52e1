//! Gold and minion-kill aggregation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::LinearFit;
use crate::config::EconomyConfig;
use crate::directory::EntityDirectory;
use crate::entity::EntityId;
use crate::event::EventStream;
use crate::layout::{ENTITY_AT, RESERVED_AT, credit, kill};
use crate::scan;

/// Raw per-player sum with the offsets that produced it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTally {
    pub total: f64,
    pub offsets: Vec<usize>,
}

impl RawTally {
    fn add(&mut self, value: f64, offset: usize) {
        self.total += value;
        self.offsets.push(offset);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomyTotals {
    pub gold: BTreeMap<EntityId, RawTally>,
    pub minion_kills: BTreeMap<EntityId, RawTally>,
}

impl EconomyTotals {
    pub fn gold_raw(&self, id: EntityId) -> f64 {
        self.gold.get(&id).map_or(0.0, |t| t.total)
    }

    pub fn minion_kills_raw(&self, id: EntityId) -> f64 {
        self.minion_kills.get(&id).map_or(0.0, |t| t.total)
    }
}

/// A stat value, corrected by a calibration fit when one is available
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatEstimate {
    pub raw: f64,
    pub value: f64,
    pub calibrated: bool,
}

impl StatEstimate {
    pub fn uncalibrated(raw: f64) -> Self {
        Self {
            raw,
            value: raw,
            calibrated: false,
        }
    }

    /// Apply `fit` and round to a multiple of `step`
    pub fn calibrated(raw: f64, fit: &LinearFit, step: f64) -> Self {
        let corrected = fit.predict(raw).max(0.0);
        let value = if step > 0.0 {
            (corrected / step).round() * step
        } else {
            corrected
        };
        Self {
            raw,
            value,
            calibrated: true,
        }
    }
}

/// Sum gold income and count minion kills per directory player
pub fn aggregate(
    bytes: &[u8],
    stream: &EventStream,
    directory: &EntityDirectory,
    config: &EconomyConfig,
) -> EconomyTotals {
    let mut totals = EconomyTotals::default();
    for player in directory.players() {
        totals.gold.insert(player.entity_id, RawTally::default());
        totals.minion_kills.insert(player.entity_id, RawTally::default());
    }

    for record in stream.credits() {
        if !config.gold_actions.contains(&record.action)
            || !record.is_plausible(config.max_value)
            || record.value <= config.min_value
        {
            continue;
        }
        if let Some(tally) = totals.gold.get_mut(&record.entity_id) {
            tally.add(f64::from(record.value), record.byte_offset);
        }
    }

    for player in directory.players() {
        let offsets = minion_kill_offsets(bytes, player.entity_id, config.minion_action);
        if let Some(tally) = totals.minion_kills.get_mut(&player.entity_id) {
            for offset in offsets {
                tally.add(1.0, offset);
            }
        }
    }

    debug!(
        "Economy: {:.0} raw gold, {:.0} minion kills",
        totals.gold.values().map(|t| t.total).sum::<f64>(),
        totals.minion_kills.values().map(|t| t.total).sum::<f64>()
    );
    totals
}

/// Credit records `[10 04 1D][00 00][eid][1.0][action]` for one player
///
/// Scans for the `[eid][1.0][action]` tail and confirms the header and
/// reserved field in the five bytes before it. Returns record offsets.
pub fn minion_kill_offsets(bytes: &[u8], entity: EntityId, action: u8) -> Vec<usize> {
    let mut pattern = Vec::with_capacity(7);
    pattern.extend(entity.to_be_bytes());
    pattern.extend(kill::UNIT);
    pattern.push(action);

    let lead = ENTITY_AT;
    scan::scan(bytes, &pattern)
        .filter_map(|hit| hit.checked_sub(lead))
        .filter(|&start| {
            bytes[start..start + credit::HEADER.len()] == credit::HEADER
                && bytes[start + RESERVED_AT..start + lead] == [0, 0]
        })
        .collect()
}
