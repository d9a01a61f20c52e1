//! Header and credit action counts

use std::collections::BTreeMap;

use memchr::memchr_iter;
use serde::Serialize;

use crate::calibration::LinearFit;
use crate::directory::EntityDirectory;
use crate::entity::EntityId;
use crate::event::{EventKind, EventStream, HeaderRegistry};
use crate::layout::{ENTITY_AT, HEADER_MIDDLE, MIN_RECORD_LEN, RESERVED_AT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCount {
    pub header: [u8; 3],
    pub count: usize,
    /// Kind of the registered decoder, if any
    pub kind: Option<EventKind>,
}

/// Every `xx 04 yy` sequence followed by a zero reserved field, most frequent first
pub fn header_census(bytes: &[u8], registry: &HeaderRegistry) -> Vec<HeaderCount> {
    let mut counts: BTreeMap<[u8; 3], usize> = BTreeMap::new();
    for middle in memchr_iter(HEADER_MIDDLE, bytes) {
        let Some(start) = middle.checked_sub(1) else {
            continue;
        };
        let Some(prefix) = bytes.get(start..start + MIN_RECORD_LEN) else {
            continue;
        };
        if prefix[RESERVED_AT..ENTITY_AT] == [0, 0] {
            *counts.entry([prefix[0], prefix[1], prefix[2]]).or_default() += 1;
        }
    }

    let mut census: Vec<HeaderCount> = counts
        .into_iter()
        .map(|(header, count)| HeaderCount {
            header,
            count,
            kind: registry.get(header).map(|spec| spec.kind),
        })
        .collect();
    census.sort_by(|a, b| b.count.cmp(&a.count).then(a.header.cmp(&b.header)));
    census
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionStats {
    pub action: u8,
    pub count: usize,
    /// Records whose value is 1.0
    pub unit_count: usize,
    pub total: f64,
}

pub fn credit_action_census(stream: &EventStream) -> Vec<ActionStats> {
    let mut stats: BTreeMap<u8, ActionStats> = BTreeMap::new();
    for record in stream.credits() {
        let entry = stats.entry(record.action).or_insert(ActionStats {
            action: record.action,
            count: 0,
            unit_count: 0,
            total: 0.0,
        });
        entry.count += 1;
        if record.is_unit(f32::EPSILON) {
            entry.unit_count += 1;
        }
        if record.value.is_finite() {
            entry.total += f64::from(record.value);
        }
    }
    stats.into_values().collect()
}

/// Per-player credit sums, keyed by action byte
pub fn action_sums(
    stream: &EventStream,
    directory: &EntityDirectory,
    max_value: f32,
) -> BTreeMap<EntityId, BTreeMap<u8, f64>> {
    let mut sums: BTreeMap<EntityId, BTreeMap<u8, f64>> = directory
        .players()
        .iter()
        .map(|p| (p.entity_id, BTreeMap::new()))
        .collect();
    for record in stream.credits() {
        if !record.is_plausible(max_value) {
            continue;
        }
        if let Some(per_action) = sums.get_mut(&record.entity_id) {
            *per_action.entry(record.action).or_default() += f64::from(record.value);
        }
    }
    sums
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionCorrelation {
    pub action: u8,
    pub r: f64,
    pub samples: usize,
}

/// Pearson correlation of each action's per-player sum with a truth value
///
/// `samples` pairs one player's action sums with the truth value. Players
/// without a record for an action count as zero. Strongest correlation first.
pub fn rank_actions(samples: &[(BTreeMap<u8, f64>, f64)]) -> Vec<ActionCorrelation> {
    let mut actions: Vec<u8> = samples.iter().flat_map(|(sums, _)| sums.keys().copied()).collect();
    actions.sort_unstable();
    actions.dedup();

    let mut ranking: Vec<ActionCorrelation> = actions
        .into_iter()
        .filter_map(|action| {
            let points: Vec<(f64, f64)> = samples
                .iter()
                .map(|(sums, truth)| (sums.get(&action).copied().unwrap_or(0.0), *truth))
                .collect();
            LinearFit::fit(&points).map(|fit| ActionCorrelation {
                action,
                r: fit.r,
                samples: fit.samples,
            })
        })
        .collect();
    ranking.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()).then(a.action.cmp(&b.action)));
    ranking
}
