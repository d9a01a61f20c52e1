//! Per-player kill and death tallies

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CorrelationConfig;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::directory::EntityDirectory;
use crate::entity::{EntityClass, EntityId, EntityResolver};
use crate::event::{Event, EventKind, EventStream};
use crate::replay::Timeline;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityTally {
    pub kills: u32,
    pub deaths: u32,
    pub kill_offsets: Vec<usize>,
    pub death_offsets: Vec<usize>,
    pub death_times: Vec<f32>,
}

/// Event whose entity is not a directory player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unattributed {
    pub byte_offset: usize,
    pub entity_id: EntityId,
    pub kind: EventKind,
    pub class: EntityClass,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KillDeathTally {
    pub per_entity: BTreeMap<EntityId, EntityTally>,
    pub unattributed: Vec<Unattributed>,
    /// Player deaths after duration + grace, not counted
    pub post_game_deaths: Vec<usize>,
}

impl KillDeathTally {
    pub fn get(&self, id: EntityId) -> Option<&EntityTally> {
        self.per_entity.get(&id)
    }

    pub fn kills(&self, id: EntityId) -> u32 {
        self.get(id).map_or(0, |t| t.kills)
    }

    pub fn deaths(&self, id: EntityId) -> u32 {
        self.get(id).map_or(0, |t| t.deaths)
    }

    /// Sum of per-player kills for the players matching `filter`
    pub fn total_kills<F: Fn(EntityId) -> bool>(&self, filter: F) -> u32 {
        self.per_entity
            .iter()
            .filter(|(id, _)| filter(**id))
            .map(|(_, t)| t.kills)
            .sum()
    }

    pub fn total_deaths<F: Fn(EntityId) -> bool>(&self, filter: F) -> u32 {
        self.per_entity
            .iter()
            .filter(|(id, _)| filter(**id))
            .map(|(_, t)| t.deaths)
            .sum()
    }
}

/// Records later than this are post-game ceremony
pub fn post_game_cutoff(duration: Option<f32>, config: &CorrelationConfig) -> Option<f32> {
    duration.map(|d| d + config.grace_secs)
}

/// Kill time from the record itself, else from the nearest earlier timestamped record
pub fn kill_time(event: &Event, timeline: &Timeline) -> Option<f32> {
    event.timestamp().or_else(|| timeline.at(event.byte_offset))
}

pub fn correlate(
    stream: &EventStream,
    resolver: &EntityResolver<'_>,
    directory: &EntityDirectory,
    config: &CorrelationConfig,
    duration: Option<f32>,
    diagnostics: &mut Diagnostics,
) -> KillDeathTally {
    let mut tally = KillDeathTally::default();
    for player in directory.players() {
        tally.per_entity.insert(player.entity_id, EntityTally::default());
    }
    let cutoff = post_game_cutoff(duration, config);

    for event in stream.iter() {
        let kind = event.kind();
        if kind != EventKind::Kill && kind != EventKind::Death {
            continue;
        }

        let class = resolver.resolve(event.entity_id);
        let Some(entry) = tally
            .per_entity
            .get_mut(&event.entity_id)
            .filter(|_| class.is_known_player())
        else {
            if matches!(class, EntityClass::Unknown | EntityClass::Player(_)) {
                diagnostics.push(Diagnostic::UnresolvedEntity {
                    offset: event.byte_offset,
                    entity_id: event.entity_id,
                    event: kind,
                });
            }
            tally.unattributed.push(Unattributed {
                byte_offset: event.byte_offset,
                entity_id: event.entity_id,
                kind,
                class,
            });
            continue;
        };

        match (kind, event.timestamp()) {
            (EventKind::Kill, _) => {
                entry.kills += 1;
                entry.kill_offsets.push(event.byte_offset);
            }
            (EventKind::Death, Some(ts)) if cutoff.is_some_and(|c| ts > c) => {
                tally.post_game_deaths.push(event.byte_offset);
            }
            (EventKind::Death, ts) => {
                entry.deaths += 1;
                entry.death_offsets.push(event.byte_offset);
                entry.death_times.extend(ts);
            }
            _ => {}
        }
    }

    debug!(
        "Correlated {} kills, {} deaths ({} post-game, {} unattributed)",
        tally.total_kills(|_| true),
        tally.total_deaths(|_| true),
        tally.post_game_deaths.len(),
        tally.unattributed.len()
    );
    tally
}

/// Kill matched to the opposing player's death, for auditing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Elimination {
    pub killer: EntityId,
    pub kill_offset: usize,
    pub kill_time: f32,
    pub victim: Option<EntityId>,
    pub death_offset: Option<usize>,
    pub dt: Option<f32>,
}

/// Greedy one-to-one pairing of kills to opposing-team deaths
///
/// Kills are taken in time order; each takes the closest unused death of a
/// player on another team within `max_dt`. Kills without a time and
/// post-game deaths take no part.
pub fn pair_eliminations(
    stream: &EventStream,
    directory: &EntityDirectory,
    config: &CorrelationConfig,
    duration: Option<f32>,
) -> Vec<Elimination> {
    let cutoff = post_game_cutoff(duration, config);

    let mut kills: Vec<(&Event, f32)> = stream
        .kills()
        .filter(|e| directory.contains(e.entity_id))
        .filter_map(|e| e.timestamp().map(|t| (e, t)))
        .collect();
    kills.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut deaths: Vec<(&Event, f32)> = stream
        .deaths()
        .filter(|e| directory.contains(e.entity_id))
        .filter_map(|e| e.timestamp().map(|t| (e, t)))
        .filter(|(_, t)| cutoff.is_none_or(|c| *t <= c))
        .collect();
    deaths.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut used = vec![false; deaths.len()];
    let mut pairs = Vec::with_capacity(kills.len());

    for (kill, kill_time) in kills {
        let killer_team = directory.team_of(kill.entity_id);
        let best = deaths
            .iter()
            .enumerate()
            .filter(|(i, (death, _))| {
                !used[*i] && directory.team_of(death.entity_id) != killer_team
            })
            .map(|(i, (death, t))| (i, *death, (kill_time - t).abs()))
            .filter(|(_, _, dt)| *dt < config.pairing_max_dt)
            .min_by(|a, b| a.2.total_cmp(&b.2));

        let (victim, death_offset, dt) = match best {
            Some((i, death, dt)) => {
                used[i] = true;
                (Some(death.entity_id), Some(death.byte_offset), Some(dt))
            }
            None => (None, None, None),
        };
        pairs.push(Elimination {
            killer: kill.entity_id,
            kill_offset: kill.byte_offset,
            kill_time,
            victim,
            death_offset,
            dt,
        });
    }

    pairs
}
