//! Entity ids and their classification
//!
//! Event records carry ids big-endian, the player directory stores them
//! little-endian. Ids are normalized to the event-stream value on the way in,
//! so a directory id of `0xDC05` and an event id of `0x05DC` compare equal.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::config::EntityRanges;
use crate::directory::EntityDirectory;

/// Canonical (event-stream byte order) entity id
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(u16);

impl EntityId {
    pub const SYSTEM: EntityId = EntityId(0);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Id as it appears in an event record
    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// Id read as a little-endian integer from a directory record
    pub const fn from_le_value(value: u16) -> Self {
        Self(value.swap_bytes())
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    /// The directory-side (byte swapped) value
    pub const fn le_value(self) -> u16 {
        self.0.swap_bytes()
    }

    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for EntityId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// How a player classification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlayerSource {
    /// Id is in this match's player directory
    Directory,
    /// Id only falls in the configured player range
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityClass {
    Player(PlayerSource),
    Objective,
    System,
    Unknown,
}

impl EntityClass {
    pub fn is_player(self) -> bool {
        matches!(self, Self::Player(_))
    }

    /// Player known from the directory, not guessed from a range
    pub fn is_known_player(self) -> bool {
        matches!(self, Self::Player(PlayerSource::Directory))
    }
}

/// Classifies ids against a match directory, falling back to configured ranges
#[derive(Debug, Clone, Copy)]
pub struct EntityResolver<'a> {
    ranges: &'a EntityRanges,
    directory: &'a EntityDirectory,
}

impl<'a> EntityResolver<'a> {
    pub fn new(ranges: &'a EntityRanges, directory: &'a EntityDirectory) -> Self {
        Self { ranges, directory }
    }

    pub fn resolve(&self, id: EntityId) -> EntityClass {
        if self.directory.contains(id) {
            return EntityClass::Player(PlayerSource::Directory);
        }

        let value = id.value();
        if value == self.ranges.system {
            EntityClass::System
        } else if self.ranges.players.contains(value) {
            EntityClass::Player(PlayerSource::Range)
        } else if self.ranges.objectives.contains(value) {
            EntityClass::Objective
        } else {
            EntityClass::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdRange;
    use crate::directory::PlayerRecord;

    fn directory_with(ids: &[u16]) -> EntityDirectory {
        let records = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| PlayerRecord {
                entity_id: EntityId::new(id),
                hero_id: 0,
                team_label: 1,
                display_name: format!("Player{}", i),
                position: i * 0x100,
            })
            .collect();
        EntityDirectory::from_records(records)
    }

    #[test]
    fn test_byte_order_normalization() {
        let from_directory = EntityId::from_le_value(0xDC05);
        let from_event = EntityId::from_be_bytes([0x05, 0xDC]);
        assert_eq!(from_directory, from_event);
        assert_eq!(from_event.value(), 1500);
        assert_eq!(from_event.le_value(), 56325);
        assert_eq!(from_event.to_be_bytes(), [0x05, 0xDC]);
    }

    #[test]
    fn test_resolve_by_range() {
        let ranges = EntityRanges::default();
        let directory = EntityDirectory::default();
        let resolver = EntityResolver::new(&ranges, &directory);

        assert_eq!(resolver.resolve(EntityId::SYSTEM), EntityClass::System);
        assert_eq!(
            resolver.resolve(EntityId::new(1503)),
            EntityClass::Player(PlayerSource::Range)
        );
        assert_eq!(resolver.resolve(EntityId::new(65010)), EntityClass::Objective);
        assert_eq!(resolver.resolve(EntityId::new(4000)), EntityClass::Unknown);
    }

    #[test]
    fn test_directory_takes_precedence() {
        let ranges = EntityRanges {
            system: 0,
            players: IdRange::new(1500, 1510),
            objectives: IdRange::new(56000, 58999),
        };
        // A corpus where players live in the 56000s: the directory wins over the objective range
        let directory = directory_with(&[56325]);
        let resolver = EntityResolver::new(&ranges, &directory);

        let class = resolver.resolve(EntityId::new(56325));
        assert_eq!(class, EntityClass::Player(PlayerSource::Directory));
        assert!(class.is_known_player());
        assert_eq!(resolver.resolve(EntityId::new(56326)), EntityClass::Objective);
    }

    #[test]
    fn test_entity_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&EntityId::new(1500)).unwrap(), "1500");
        assert_eq!(EntityClass::Objective.to_string(), "objective");
    }
}
