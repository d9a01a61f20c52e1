//! Assist attribution from the credit records that follow a kill
//!
//! After a kill the game writes a burst of credit records for everyone who
//! shares in it. A real assist shows up as a value of 1.0 under the assist
//! action byte, normally flanked by an income record and a fractional share.
//! The same 1.0 value under other action bytes is a flag for something else
//! (minion kills, objective ticks) and must not count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::config::AssistConfig;
use crate::correlate::kill_time;
use crate::directory::EntityDirectory;
use crate::entity::EntityId;
use crate::event::{CreditRecord, EventStream};
use crate::layout::kill;

/// Shape of one entity's credit records inside a kill window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CreditPattern {
    /// Income, assist flag and fractional share
    FullTriplet,
    /// Assist flag with income but no fractional share
    PartialTriplet,
    /// Assist flag alone
    AssistFlag,
    /// Only 1.0 values, none under the assist action
    LoneFlag,
    /// A 1.0 value mixed with other records, no assist flag
    Mixed,
    /// No 1.0 value at all
    None,
}

impl CreditPattern {
    pub fn counts_as_assist(self, require_full_triplet: bool) -> bool {
        match self {
            Self::FullTriplet => true,
            Self::PartialTriplet | Self::AssistFlag => !require_full_triplet,
            Self::LoneFlag | Self::Mixed | Self::None => false,
        }
    }
}

/// Classify one entity's credit records from a kill window
pub fn classify_credits(credits: &[CreditRecord], config: &AssistConfig) -> CreditPattern {
    let tolerance = config.value_tolerance;
    if !credits.iter().any(|c| c.is_unit(tolerance)) {
        return CreditPattern::None;
    }

    let has_income = credits
        .iter()
        .any(|c| c.action == config.income_action && c.value > config.income_min);
    let has_flag = credits
        .iter()
        .any(|c| c.action == config.assist_action && c.is_unit(tolerance));
    let has_fraction = credits.iter().any(|c| c.action == config.fraction_action);

    match (has_flag, has_income, has_fraction) {
        (true, true, true) => CreditPattern::FullTriplet,
        (true, true, false) => CreditPattern::PartialTriplet,
        (true, false, _) => CreditPattern::AssistFlag,
        (false, _, _) if credits.iter().all(|c| c.is_unit(tolerance)) => CreditPattern::LoneFlag,
        (false, _, _) => CreditPattern::Mixed,
    }
}

/// Provenance of one counted assist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistCredit {
    pub kill_offset: usize,
    pub killer: EntityId,
    pub pattern: CreditPattern,
    pub credit_offsets: Vec<usize>,
}

/// Decision for one kill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistVerdict {
    pub kill_offset: usize,
    pub killer: EntityId,
    pub window: (usize, usize),
    pub assisters: Vec<EntityId>,
    /// Teammates with a 1.0 credit that did not qualify
    pub rejected: Vec<(EntityId, CreditPattern)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistTally {
    pub per_entity: BTreeMap<EntityId, Vec<AssistCredit>>,
    pub verdicts: Vec<AssistVerdict>,
    /// Kills after duration + grace, not inspected
    pub post_game_kills: Vec<usize>,
}

impl AssistTally {
    pub fn assists(&self, id: EntityId) -> u32 {
        self.per_entity.get(&id).map_or(0, |v| v.len() as u32)
    }

    pub fn credits(&self, id: EntityId) -> &[AssistCredit] {
        self.per_entity.get(&id).map_or(&[], Vec::as_slice)
    }
}

pub struct AssistClassifier<'a> {
    config: &'a AssistConfig,
    directory: &'a EntityDirectory,
    max_value: f32,
}

impl<'a> AssistClassifier<'a> {
    pub fn new(config: &'a AssistConfig, directory: &'a EntityDirectory, max_value: f32) -> Self {
        Self {
            config,
            directory,
            max_value,
        }
    }

    /// Attribute assists for every directory-attributed kill
    ///
    /// `cutoff` is duration + grace when the match duration is known.
    pub fn classify(&self, stream: &EventStream, cutoff: Option<f32>) -> AssistTally {
        let mut tally = AssistTally::default();
        let timeline = stream.timeline();
        let kills: Vec<_> = stream.kills().collect();

        for (i, kill_event) in kills.iter().enumerate() {
            let killer = kill_event.entity_id;
            if !self.directory.contains(killer) {
                continue;
            }
            if let (Some(limit), Some(t)) = (cutoff, kill_time(kill_event, &timeline))
                && t > limit
            {
                tally.post_game_kills.push(kill_event.byte_offset);
                continue;
            }

            let start = kill_event.byte_offset + kill::LEN;
            let mut end = start + self.config.window_bytes;
            if let Some(next) = kills.get(i + 1) {
                end = end.min(next.byte_offset);
            }

            let mut by_entity: BTreeMap<EntityId, Vec<CreditRecord>> = BTreeMap::new();
            for credit in stream.range(start, end).iter().filter_map(|e| e.as_credit()) {
                if credit.is_plausible(self.max_value) && self.directory.contains(credit.entity_id) {
                    by_entity.entry(credit.entity_id).or_default().push(credit);
                }
            }

            let mut verdict = AssistVerdict {
                kill_offset: kill_event.byte_offset,
                killer,
                window: (start, end),
                assisters: Vec::new(),
                rejected: Vec::new(),
            };

            for mate in self.directory.teammates(killer) {
                let Some(credits) = by_entity.get(&mate.entity_id) else {
                    continue;
                };
                let pattern = classify_credits(credits, self.config);
                if pattern.counts_as_assist(self.config.require_full_triplet) {
                    verdict.assisters.push(mate.entity_id);
                    tally
                        .per_entity
                        .entry(mate.entity_id)
                        .or_default()
                        .push(AssistCredit {
                            kill_offset: kill_event.byte_offset,
                            killer,
                            pattern,
                            credit_offsets: credits.iter().map(|c| c.byte_offset).collect(),
                        });
                } else if pattern != CreditPattern::None {
                    verdict.rejected.push((mate.entity_id, pattern));
                }
            }
            tally.verdicts.push(verdict);
        }

        debug!(
            "Assists: {} over {} kills ({} post-game kills skipped)",
            tally.per_entity.values().map(Vec::len).sum::<usize>(),
            tally.verdicts.len(),
            tally.post_game_kills.len()
        );
        tally
    }
}
