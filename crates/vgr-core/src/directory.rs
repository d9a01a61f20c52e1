//! Player directory built from the identity blocks of the first frame

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::DirectoryConfig;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::entity::EntityId;
use crate::layout::player_block;
use crate::mode::{self, MatchMode};
use crate::scan::{read, scan_any};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub entity_id: EntityId,
    pub hero_id: u16,
    /// Raw team byte; mapped to a side by the side resolver
    pub team_label: u8,
    pub display_name: String,
    /// Marker offset within the first frame
    pub position: usize,
}

/// Per-match player lookup, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityDirectory {
    players: Vec<PlayerRecord>,
    #[serde(skip)]
    by_id: HashMap<EntityId, usize>,
    #[serde(skip)]
    by_name: HashMap<String, EntityId>,
    mode: Option<MatchMode>,
}

impl EntityDirectory {
    /// Scan the first frame for player identity blocks
    pub fn build(
        first_frame: &[u8],
        config: &DirectoryConfig,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let markers: [&[u8]; 2] = [&player_block::MARKER, &player_block::MARKER_ALT];
        let mut records = Vec::new();
        let mut mode_tag = None;

        for (position, _) in scan_any(first_frame, &markers) {
            let name = read_name(first_frame, position + player_block::NAME_AT);
            if name.len() < player_block::NAME_MIN_LEN {
                continue;
            }
            if config
                .non_player_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
            {
                trace!("Skipping non-player block '{}' at {:#X}", name, position);
                if mode_tag.is_none() && name.starts_with(config.mode_prefix.as_str()) {
                    mode_tag = Some(name);
                }
                continue;
            }

            match read_fixed_fields(first_frame, position) {
                Some((entity_id, hero_id, team_label)) => records.push(PlayerRecord {
                    entity_id,
                    hero_id,
                    team_label,
                    display_name: name,
                    position,
                }),
                None => diagnostics.push(Diagnostic::structural(
                    position,
                    "player_block",
                    format!("fixed fields run past frame end ({} bytes)", first_frame.len()),
                )),
            }
        }

        let mode_tag = mode_tag.or_else(|| {
            mode::find_mode_tag(first_frame, &config.mode_prefix, player_block::NAME_MAX_LEN)
        });
        let mut directory = Self::from_records(records);
        directory.mode = mode_tag.as_deref().map(MatchMode::from_tag);
        debug!(
            "Player directory: {} players, mode {}",
            directory.len(),
            mode_tag.as_deref().unwrap_or("unknown")
        );
        directory
    }

    /// Build from records, collapsing duplicate ids to the first occurrence
    pub fn from_records(records: Vec<PlayerRecord>) -> Self {
        let mut directory = Self::default();
        for record in records {
            if directory.by_id.contains_key(&record.entity_id) {
                trace!(
                    "Duplicate player block for entity {} at {:#X}",
                    record.entity_id, record.position
                );
                continue;
            }
            directory
                .by_id
                .insert(record.entity_id, directory.players.len());
            directory
                .by_name
                .entry(record.display_name.clone())
                .or_insert(record.entity_id);
            directory.players.push(record);
        }
        directory
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&PlayerRecord> {
        self.by_id.get(&id).map(|&index| &self.players[index])
    }

    pub fn by_name(&self, name: &str) -> Option<&PlayerRecord> {
        self.by_name.get(name).and_then(|&id| self.get(id))
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    /// Mode named in the first frame, if any
    pub fn mode(&self) -> Option<&MatchMode> {
        self.mode.as_ref()
    }

    pub fn team_of(&self, id: EntityId) -> Option<u8> {
        self.get(id).map(|p| p.team_label)
    }

    /// Distinct team labels in ascending order
    pub fn team_labels(&self) -> Vec<u8> {
        let mut labels: Vec<u8> = self.players.iter().map(|p| p.team_label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Players sharing `id`'s team label, excluding `id` itself
    pub fn teammates(&self, id: EntityId) -> impl Iterator<Item = &PlayerRecord> {
        let team = self.team_of(id);
        self.players
            .iter()
            .filter(move |p| team == Some(p.team_label) && p.entity_id != id)
    }
}

fn read_name(frame: &[u8], start: usize) -> String {
    frame
        .get(start..)
        .map(|tail| mode::printable_run(tail, player_block::NAME_MAX_LEN))
        .unwrap_or_default()
}

fn read_fixed_fields(frame: &[u8], position: usize) -> Option<(EntityId, u16, u8)> {
    let entity = read::u16_le(frame, position + player_block::ENTITY_AT)?;
    let hero = read::u16_le(frame, position + player_block::HERO_AT)?;
    let team = *frame.get(position + player_block::TEAM_AT)?;
    Some((EntityId::from_le_value(entity), hero, team))
}
