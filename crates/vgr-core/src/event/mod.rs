//! Typed events decoded from the replay byte stream
//!
//! Every event record starts with a 3-byte header `[xx 04 yy]`, a zero
//! reserved field and a big-endian entity id. The [`HeaderRegistry`] maps
//! headers to a fixed layout and a decode function; the [`EventDecoder`] runs
//! the registry over a whole replay and produces an ordered [`EventStream`].

mod decoder;
mod registry;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::entity::EntityId;
use crate::layout::heartbeat;
use crate::replay::Timeline;

pub use decoder::{EventDecoder, Unclassified, UnclassifiedIter};
pub use registry::{
    DecodeFn, HeaderRegistry, HeaderSpec, LiteralField, RecordLayout, RecordView, Violation,
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Kill,
    Death,
    Credit,
    Heartbeat,
    Action,
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// Killer is the event entity; the timestamp is absent when implausible
    Kill { timestamp: Option<f32> },
    /// Victim is the event entity
    Death { timestamp: f32 },
    Credit { value: f32, action: u8 },
    Heartbeat {
        values: [f32; heartbeat::VALUE_COUNT],
    },
    Action { payload: Vec<u8> },
    Unclassified { header: [u8; 3], raw: Vec<u8> },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Kill { .. } => EventKind::Kill,
            Self::Death { .. } => EventKind::Death,
            Self::Credit { .. } => EventKind::Credit,
            Self::Heartbeat { .. } => EventKind::Heartbeat,
            Self::Action { .. } => EventKind::Action,
            Self::Unclassified { .. } => EventKind::Unclassified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub byte_offset: usize,
    pub source_frame: u32,
    pub entity_id: EntityId,
    pub payload: EventPayload,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Timestamp carried by kill and death records
    pub fn timestamp(&self) -> Option<f32> {
        match self.payload {
            EventPayload::Kill { timestamp } => timestamp,
            EventPayload::Death { timestamp } => Some(timestamp),
            _ => None,
        }
    }

    pub fn as_credit(&self) -> Option<CreditRecord> {
        match self.payload {
            EventPayload::Credit { value, action } => Some(CreditRecord {
                entity_id: self.entity_id,
                value,
                action,
                byte_offset: self.byte_offset,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditRecord {
    pub entity_id: EntityId,
    pub value: f32,
    pub action: u8,
    pub byte_offset: usize,
}

impl CreditRecord {
    /// Finite and within `0..=max`
    pub fn is_plausible(&self, max: f32) -> bool {
        self.value.is_finite() && (0.0..=max).contains(&self.value)
    }

    /// Value within `tolerance` of 1.0
    pub fn is_unit(&self, tolerance: f32) -> bool {
        (self.value - 1.0).abs() <= tolerance
    }
}

/// Decoded events of one match, ordered by byte offset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventStream {
    events: Vec<Event>,
    unclassified_count: usize,
}

impl EventStream {
    pub fn new(mut events: Vec<Event>, unclassified_count: usize) -> Self {
        events.sort_by_key(|event| event.byte_offset);
        Self {
            events,
            unclassified_count,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Unclassified records seen, whether or not they were kept
    pub fn unclassified_count(&self) -> usize {
        self.unclassified_count
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |event| event.kind() == kind)
    }

    pub fn kills(&self) -> impl Iterator<Item = &Event> {
        self.of_kind(EventKind::Kill)
    }

    pub fn deaths(&self) -> impl Iterator<Item = &Event> {
        self.of_kind(EventKind::Death)
    }

    pub fn credits(&self) -> impl Iterator<Item = CreditRecord> + '_ {
        self.events.iter().filter_map(Event::as_credit)
    }

    /// Events whose offset lies in `start..end`
    pub fn range(&self, start: usize, end: usize) -> &[Event] {
        let lo = self.events.partition_point(|e| e.byte_offset < start);
        let hi = self.events.partition_point(|e| e.byte_offset < end);
        &self.events[lo..hi.max(lo)]
    }

    /// Offset-to-time mapping from kill and death timestamps
    pub fn timeline(&self) -> Timeline {
        Timeline::from_points(
            self.events
                .iter()
                .filter_map(|e| e.timestamp().map(|t| (e.byte_offset, t)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(offset: usize, payload: EventPayload) -> Event {
        Event {
            byte_offset: offset,
            source_frame: 0,
            entity_id: EntityId::new(1500),
            payload,
        }
    }

    #[test]
    fn test_stream_sorted_and_ranged() {
        let stream = EventStream::new(
            vec![
                event(300, EventPayload::Death { timestamp: 20.0 }),
                event(100, EventPayload::Kill { timestamp: Some(10.0) }),
                event(200, EventPayload::Credit { value: 1.0, action: 0x0B }),
            ],
            4,
        );

        let offsets: Vec<usize> = stream.iter().map(|e| e.byte_offset).collect();
        assert_eq!(offsets, vec![100, 200, 300]);
        assert_eq!(stream.range(150, 300).len(), 1);
        assert_eq!(stream.range(100, 301).len(), 3);
        assert!(stream.range(400, 100).is_empty());
        assert_eq!(stream.unclassified_count(), 4);
        assert_eq!(stream.kills().count(), 1);
        assert_eq!(stream.timeline().at(250), Some(10.0));
    }

    #[test]
    fn test_credit_checks() {
        let credit = event(0, EventPayload::Credit { value: 0.995, action: 0x0B })
            .as_credit()
            .unwrap();
        assert!(credit.is_unit(0.01));
        assert!(credit.is_plausible(10_000.0));

        let noise = CreditRecord {
            value: f32::INFINITY,
            ..credit
        };
        assert!(!noise.is_plausible(10_000.0));
    }

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::Heartbeat.to_string(), "heartbeat");
        assert_eq!("death".parse::<EventKind>().unwrap(), EventKind::Death);
        let json = serde_json::to_value(EventPayload::Kill { timestamp: None }).unwrap();
        assert_eq!(json["kind"], "kill");
    }
}
