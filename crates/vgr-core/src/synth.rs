//! Byte-level replay fixtures for tests

use crate::entity::EntityId;
use crate::layout::{action, credit, death, heartbeat, kill, player_block as block, structure};
use crate::replay::{Frame, ReplayBytes};

/// Identity block as found in the first frame; `entity` is the event-stream id
pub(crate) fn player_block(name: &str, entity: u16, hero: u16, team: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; block::SPAN];
    bytes[..3].copy_from_slice(&block::MARKER);
    let name = &name.as_bytes()[..name.len().min(block::NAME_MAX_LEN)];
    bytes[block::NAME_AT..block::NAME_AT + name.len()].copy_from_slice(name);
    bytes[block::ENTITY_AT..block::ENTITY_AT + 2]
        .copy_from_slice(&EntityId::new(entity).le_value().to_le_bytes());
    bytes[block::HERO_AT..block::HERO_AT + 2].copy_from_slice(&hero.to_le_bytes());
    bytes[block::TEAM_AT] = team;
    bytes
}

/// Builds frames record by record
#[derive(Debug, Default)]
pub(crate) struct ReplayBuilder {
    frames: Vec<Vec<u8>>,
    current: Vec<u8>,
}

impl ReplayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(mut self, name: &str, entity: u16, hero: u16, team: u8) -> Self {
        self.current.extend(player_block(name, entity, hero, team));
        self
    }

    /// Kill record preceded by its timestamp slot
    pub fn kill(mut self, killer: u16, timestamp: Option<f32>) -> Self {
        let mut before = [0u8; kill::TIMESTAMP_BEFORE];
        if let Some(ts) = timestamp {
            before[..4].copy_from_slice(&ts.to_be_bytes());
        }
        self.current.extend(before);
        self.record(kill::HEADER, killer);
        self.current.extend(kill::SENTINEL);
        self.current.extend(kill::UNIT);
        self.current.extend(kill::TRAILER);
        self
    }

    pub fn death(mut self, victim: u16, timestamp: f32) -> Self {
        self.record(death::HEADER, victim);
        self.current.extend([0, 0]);
        self.current.extend(timestamp.to_be_bytes());
        self
    }

    pub fn credit(mut self, entity: u16, value: f32, action: u8) -> Self {
        self.record(credit::HEADER, entity);
        self.current.extend(value.to_be_bytes());
        self.current.push(action);
        self
    }

    pub fn heartbeat(mut self, entity: u16, values: [f32; heartbeat::VALUE_COUNT]) -> Self {
        self.record(heartbeat::HEADER, entity);
        for value in values {
            self.current.extend(value.to_be_bytes());
        }
        self
    }

    pub fn action(mut self, entity: u16, fill: u8) -> Self {
        self.record(action::HEADER, entity);
        self.current
            .extend(std::iter::repeat_n(fill, action::LEN - action::PAYLOAD_AT));
        self
    }

    /// Structure status record; `id` is written little-endian
    pub fn structure(mut self, id: u16) -> Self {
        let start = self.current.len();
        self.current.extend(id.to_le_bytes());
        self.current.extend(structure::QUIET);
        self.current.push(0x01);
        self.current.resize(start + structure::LEN, 0x00);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.current.extend_from_slice(bytes);
        self
    }

    /// Filler bytes that never form a record
    pub fn gap(mut self, len: usize) -> Self {
        self.current.extend(std::iter::repeat_n(0xAA, len));
        self
    }

    pub fn next_frame(mut self) -> Self {
        self.frames.push(std::mem::take(&mut self.current));
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.into_frames().concat()
    }

    pub fn into_frames(mut self) -> Vec<Vec<u8>> {
        if !self.current.is_empty() || self.frames.is_empty() {
            self.frames.push(self.current);
        }
        self.frames
    }

    pub fn build(self) -> ReplayBytes {
        let frames = self
            .into_frames()
            .into_iter()
            .enumerate()
            .map(|(i, data)| Frame::new(i as u32, data))
            .collect();
        ReplayBytes::from_frames(frames).expect("synthetic replay has data")
    }

    fn record(&mut self, header: [u8; 3], entity: u16) {
        self.current.extend(header);
        self.current.extend([0, 0]);
        self.current.extend(EntityId::new(entity).to_be_bytes());
    }
}
