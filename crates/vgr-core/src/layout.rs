//! Wire layout constants for VGR replay frames
//!
//! This module centralizes every byte offset and literal the decoder relies on.
//! Constants are organized by record type. All event records share the same
//! prefix:
//!
//! ```text
//!  +0  +1  +2  +3  +4  +5  +6  +7 ...
//! [h0][04][h2][00][00][eid BE ][payload...]
//!  header     reserved entity
//! ```
//!
//! Player identity blocks in the first frame use little-endian fields instead.

/// Every known event header carries this byte in the middle position
pub const HEADER_MIDDLE: u8 = 0x04;
/// Length of an event header
pub const HEADER_LEN: usize = 3;
/// Offset of the 2-byte reserved field that must be zero
pub const RESERVED_AT: usize = 3;
/// Offset of the big-endian entity id
pub const ENTITY_AT: usize = 5;
/// Smallest record that carries an entity id (header + reserved + entity)
pub const MIN_RECORD_LEN: usize = 7;

/// Player identity block (first frame only)
pub mod player_block {
    pub const MARKER: [u8; 3] = [0xDA, 0x03, 0xEE];
    pub const MARKER_ALT: [u8; 3] = [0xE0, 0x03, 0xEE];

    /// Display name starts right after the marker
    pub const NAME_AT: usize = 3;
    pub const NAME_MAX_LEN: usize = 30;
    pub const NAME_MIN_LEN: usize = 3;

    /// Entity id (u16 LE)
    pub const ENTITY_AT: usize = 0xA5;
    /// Hero id (u16 LE)
    pub const HERO_AT: usize = 0xA9;
    /// Raw team label byte
    pub const TEAM_AT: usize = 0xD5;

    /// Bytes needed past the marker to read every fixed field
    pub const SPAN: usize = TEAM_AT + 1;
}

/// Structure status record: `[id LE][00 00][action][payload]`
///
/// Turrets and crystals emit these for as long as they stand.
pub mod structure {
    pub const ID_LEN: usize = 2;
    pub const QUIET: [u8; 2] = [0x00, 0x00];
    pub const ACTION_AT: usize = 4;
    pub const LEN: usize = 37;
}

/// Kill record: `[18 04 1C][00 00][killer BE][FF FF FF FF][3F 80 00 00][29]`
pub mod kill {
    pub const HEADER: [u8; 3] = [0x18, 0x04, 0x1C];
    pub const LEN: usize = 16;

    pub const SENTINEL_AT: usize = 7;
    pub const SENTINEL: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
    pub const UNIT_AT: usize = 11;
    /// 1.0f32 big-endian
    pub const UNIT: [u8; 4] = [0x3F, 0x80, 0x00, 0x00];
    pub const TRAILER_AT: usize = 15;
    pub const TRAILER: [u8; 1] = [0x29];

    /// Timestamp (f32 BE) sits this many bytes before the header
    pub const TIMESTAMP_BEFORE: usize = 7;
}

/// Death record: `[08 04 31][00 00][victim BE][00 00][timestamp f32 BE]`
pub mod death {
    pub const HEADER: [u8; 3] = [0x08, 0x04, 0x31];
    pub const LEN: usize = 13;

    pub const PADDING_AT: usize = 7;
    pub const TIMESTAMP_AT: usize = 9;
}

/// Credit record: `[10 04 1D][00 00][eid BE][value f32 BE][action]`
pub mod credit {
    pub const HEADER: [u8; 3] = [0x10, 0x04, 0x1D];
    pub const LEN: usize = 12;

    pub const VALUE_AT: usize = 7;
    pub const ACTION_AT: usize = 11;

    /// Values outside this range are treated as noise by every consumer
    pub const MAX_PLAUSIBLE_VALUE: f32 = 10_000.0;
}

/// Player heartbeat: `[18 04 3E][00 00][eid BE][8 x f32 BE]`
pub mod heartbeat {
    pub const HEADER: [u8; 3] = [0x18, 0x04, 0x3E];
    pub const LEN: usize = 39;

    pub const VALUES_AT: usize = 7;
    pub const VALUE_COUNT: usize = 8;
}

/// Player action: `[28 04 3F][00 00][eid BE][44 payload bytes]`
pub mod action {
    pub const HEADER: [u8; 3] = [0x28, 0x04, 0x3F];
    pub const LEN: usize = 51;

    pub const PAYLOAD_AT: usize = 7;
}

/// Action bytes observed on credit records
pub mod credit_action {
    /// Gold income (high value)
    pub const INCOME: u8 = 0x06;
    /// Passive gold share, used for objective bounty
    pub const PASSIVE_INCOME: u8 = 0x08;
    /// Assist flag (value 1.0)
    pub const ASSIST: u8 = 0x0B;
    /// Fractional share that accompanies an assist
    pub const FRACTION: u8 = 0x0C;
    /// Minion kill flag (value 1.0)
    pub const MINION_KILL: u8 = 0x0E;
}
