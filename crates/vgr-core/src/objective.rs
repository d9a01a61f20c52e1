//! Objective deaths: contested kills, captures and waves
//!
//! Kraken and gold mine deaths look the same in the death record. A Kraken
//! is fought over, so a player kill record follows close behind; a gold mine
//! is captured quietly. Minion waves die in bursts of several objective ids.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::debug;

use crate::config::ObjectiveConfig;
use crate::directory::EntityDirectory;
use crate::entity::{EntityClass, EntityId, EntityResolver};
use crate::event::{Event, EventKind, EventStream};
use crate::layout::credit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectiveKind {
    /// Single objective death followed by a player kill (Kraken)
    ContestedKill,
    /// Single objective death with no player kill nearby (gold mine)
    UncontestedCapture,
    WaveWithKill,
    Wave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveEvent {
    pub kind: ObjectiveKind,
    pub entity_ids: Vec<EntityId>,
    pub death_offsets: Vec<usize>,
    /// Time of the first death in the cluster
    pub timestamp: f32,
    pub kill_offset: Option<usize>,
    pub killer: Option<EntityId>,
    /// Income credited around the death, by raw team label
    pub bounty: BTreeMap<u8, f64>,
    /// Team label credited with the objective, when the bounty is conclusive
    pub capturing_label: Option<u8>,
}

pub struct ObjectiveClassifier<'a> {
    config: &'a ObjectiveConfig,
    resolver: &'a EntityResolver<'a>,
    directory: &'a EntityDirectory,
}

impl<'a> ObjectiveClassifier<'a> {
    pub fn new(
        config: &'a ObjectiveConfig,
        resolver: &'a EntityResolver<'a>,
        directory: &'a EntityDirectory,
    ) -> Self {
        Self {
            config,
            resolver,
            directory,
        }
    }

    pub fn classify(&self, stream: &EventStream) -> Vec<ObjectiveEvent> {
        let mut deaths: Vec<(&Event, f32)> = stream
            .deaths()
            .filter(|e| self.resolver.resolve(e.entity_id) == EntityClass::Objective)
            .filter_map(|e| e.timestamp().map(|t| (e, t)))
            .collect();
        deaths.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.byte_offset.cmp(&b.0.byte_offset)));

        let mut clusters: Vec<Vec<(&Event, f32)>> = Vec::new();
        for death in deaths {
            match clusters.last_mut() {
                Some(cluster)
                    if cluster
                        .last()
                        .is_some_and(|(_, t)| death.1 - t <= self.config.cluster_secs) =>
                {
                    cluster.push(death)
                }
                _ => clusters.push(vec![death]),
            }
        }

        let events: Vec<ObjectiveEvent> = clusters
            .iter()
            .map(|cluster| self.classify_cluster(stream, cluster))
            .collect();
        debug!(
            "Objectives: {} events from {} objective deaths",
            events.len(),
            events.iter().map(|e| e.death_offsets.len()).sum::<usize>()
        );
        events
    }

    fn classify_cluster(&self, stream: &EventStream, cluster: &[(&Event, f32)]) -> ObjectiveEvent {
        let kill = cluster.iter().find_map(|(death, _)| self.player_kill_after(stream, death));
        let kind = match (cluster.len(), kill.is_some()) {
            (1, true) => ObjectiveKind::ContestedKill,
            (1, false) => ObjectiveKind::UncontestedCapture,
            (_, true) => ObjectiveKind::WaveWithKill,
            (_, false) => ObjectiveKind::Wave,
        };

        let (first, timestamp) = cluster[0];
        let bounty = self.bounty_around(stream, first.byte_offset);
        let capturing_label = capturer(&bounty, self.config.bounty_ratio);

        ObjectiveEvent {
            kind,
            entity_ids: cluster.iter().map(|(e, _)| e.entity_id).collect(),
            death_offsets: cluster.iter().map(|(e, _)| e.byte_offset).collect(),
            timestamp,
            kill_offset: kill.map(|k| k.byte_offset),
            killer: kill.map(|k| k.entity_id),
            bounty,
            capturing_label,
        }
    }

    /// First directory player kill within the window after `death`
    fn player_kill_after<'s>(&self, stream: &'s EventStream, death: &Event) -> Option<&'s Event> {
        let start = death.byte_offset + 1;
        let end = death.byte_offset.saturating_add(self.config.kill_window_bytes);
        stream
            .range(start, end)
            .iter()
            .find(|e| e.kind() == EventKind::Kill && self.directory.contains(e.entity_id))
    }

    fn bounty_around(&self, stream: &EventStream, offset: usize) -> BTreeMap<u8, f64> {
        let window = self.config.bounty_window_bytes;
        let start = offset.saturating_sub(window / 2);
        let end = offset.saturating_add(window);

        let mut bounty = BTreeMap::new();
        for record in stream.range(start, end).iter().filter_map(Event::as_credit) {
            if !self.config.bounty_actions.contains(&record.action)
                || !record.is_plausible(credit::MAX_PLAUSIBLE_VALUE)
            {
                continue;
            }
            if let Some(label) = self.directory.team_of(record.entity_id) {
                *bounty.entry(label).or_insert(0.0) += f64::from(record.value);
            }
        }
        bounty
    }
}

/// Label whose bounty exceeds every other label's by `ratio`
fn capturer(bounty: &BTreeMap<u8, f64>, ratio: f32) -> Option<u8> {
    let (&label, &best) = bounty.iter().max_by(|a, b| a.1.total_cmp(b.1))?;
    if best <= 0.0 {
        return None;
    }
    let runner_up = bounty
        .iter()
        .filter(|(l, _)| **l != label)
        .map(|(_, v)| *v)
        .fold(0.0, f64::max);
    (best > runner_up * f64::from(ratio)).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::diagnostic::Diagnostics;
    use crate::event::{EventDecoder, HeaderRegistry};
    use crate::synth::ReplayBuilder;

    fn classify(builder: ReplayBuilder) -> Vec<ObjectiveEvent> {
        let config = DecoderConfig::default();
        let replay = builder.build();
        let mut diagnostics = Diagnostics::new(64);
        let directory =
            EntityDirectory::build(replay.first_frame(), &config.directory, &mut diagnostics);
        let stream = EventDecoder::new(&HeaderRegistry::standard(), &config.events)
            .decode(&replay, &mut diagnostics);
        let resolver = EntityResolver::new(&config.entities, &directory);
        ObjectiveClassifier::new(&config.objective, &resolver, &directory).classify(&stream)
    }

    fn players() -> ReplayBuilder {
        ReplayBuilder::new()
            .player("Alpha", 1500, 1, 1)
            .player("Bravo", 1501, 2, 2)
            .next_frame()
    }

    #[test]
    fn test_contested_kill_and_capture() {
        let events = classify(
            players()
                .death(65010, 600.0)
                .gap(40)
                .kill(1500, Some(600.5))
                .credit(1500, 900.0, 0x06)
                .gap(3000)
                .death(60500, 900.0)
                .gap(600)
                .kill(1501, Some(901.0)),
        );

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ObjectiveKind::ContestedKill);
        assert_eq!(events[0].killer, Some(EntityId::new(1500)));
        assert_eq!(events[0].capturing_label, Some(1));
        // Kill lies beyond the 500-byte window
        assert_eq!(events[1].kind, ObjectiveKind::UncontestedCapture);
        assert_eq!(events[1].kill_offset, None);
        assert_eq!(events[1].capturing_label, None);
    }

    #[test]
    fn test_waves_cluster_by_time() {
        let events = classify(
            players()
                .death(62000, 300.0)
                .death(62001, 302.0)
                .death(62002, 306.5)
                .gap(1000)
                .death(62003, 320.0)
                .death(62004, 321.0)
                .kill(1501, Some(321.5)),
        );

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ObjectiveKind::Wave);
        assert_eq!(events[0].entity_ids.len(), 3);
        assert_eq!(events[1].kind, ObjectiveKind::WaveWithKill);
        assert_eq!(events[1].timestamp, 320.0);
    }

    #[test]
    fn test_player_deaths_are_not_objectives() {
        let events = classify(players().death(1501, 100.0).death(0, 101.0));
        assert!(events.is_empty());
    }

    #[test]
    fn test_capturer_needs_clear_margin() {
        let close = BTreeMap::from([(1, 1000.0), (2, 900.0)]);
        assert_eq!(capturer(&close, 1.2), None);

        let clear = BTreeMap::from([(1, 400.0), (2, 1500.0)]);
        assert_eq!(capturer(&clear, 1.2), Some(2));

        let alone = BTreeMap::from([(1, 250.0)]);
        assert_eq!(capturer(&alone, 1.2), Some(1));
        assert_eq!(capturer(&BTreeMap::new(), 1.2), None);
    }
}
