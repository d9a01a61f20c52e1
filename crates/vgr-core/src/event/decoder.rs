use memchr::memchr_iter;
use tracing::debug;

use crate::config::EventConfig;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::entity::EntityId;
use crate::layout::{self, HEADER_MIDDLE, MIN_RECORD_LEN, RESERVED_AT};
use crate::replay::ReplayBytes;
use crate::scan::{self, read};

use super::registry::{HeaderRegistry, HeaderSpec, RecordView, Violation};
use super::{Event, EventPayload, EventStream};

/// An `xx 04 yy` sequence with a zero reserved field and no registered decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unclassified<'a> {
    pub byte_offset: usize,
    pub header: [u8; 3],
    pub entity_id: EntityId,
    /// Record bytes from the header on, capped at the configured capture length
    pub raw: &'a [u8],
}

/// Lazy scan for unclassified records
pub struct UnclassifiedIter<'a> {
    bytes: &'a [u8],
    registry: &'a HeaderRegistry,
    capture: usize,
    middles: memchr::Memchr<'a>,
}

impl<'a> Iterator for UnclassifiedIter<'a> {
    type Item = Unclassified<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for middle in self.middles.by_ref() {
            let Some(start) = middle.checked_sub(1) else {
                continue;
            };
            let Some(prefix) = self.bytes.get(start..start + MIN_RECORD_LEN) else {
                continue;
            };
            if prefix[RESERVED_AT..layout::ENTITY_AT] != [0, 0] {
                continue;
            }
            let header = [prefix[0], prefix[1], prefix[2]];
            if self.registry.contains(&header) {
                continue;
            }

            let end = (start + self.capture.max(MIN_RECORD_LEN)).min(self.bytes.len());
            return Some(Unclassified {
                byte_offset: start,
                header,
                entity_id: EntityId::from_be_bytes([
                    prefix[layout::ENTITY_AT],
                    prefix[layout::ENTITY_AT + 1],
                ]),
                raw: &self.bytes[start..end],
            });
        }
        None
    }
}

/// Runs a header registry over a replay
pub struct EventDecoder<'a> {
    registry: &'a HeaderRegistry,
    config: &'a EventConfig,
}

impl<'a> EventDecoder<'a> {
    pub fn new(registry: &'a HeaderRegistry, config: &'a EventConfig) -> Self {
        Self { registry, config }
    }

    pub fn decode(&self, replay: &ReplayBytes, diagnostics: &mut Diagnostics) -> EventStream {
        let bytes = replay.as_bytes();
        let mut events = Vec::new();

        for spec in self.registry.specs() {
            let mut decoded = 0usize;
            for offset in scan::scan(bytes, &spec.header) {
                let position = replay.locate(offset).unwrap_or_default();
                let frame_start = offset - position.offset;
                match self.decode_at(bytes, frame_start, offset, spec) {
                    Ok((entity_id, payload)) => {
                        decoded += 1;
                        events.push(Event {
                            byte_offset: offset,
                            source_frame: position.frame_index,
                            entity_id,
                            payload,
                        });
                    }
                    Err(violation) => diagnostics.push(Diagnostic::structural(
                        offset,
                        spec.kind.to_string(),
                        violation.0,
                    )),
                }
            }
            debug!("{} {} records", decoded, spec.kind);
        }

        let mut unclassified_count = 0usize;
        for record in self.unclassified(bytes) {
            unclassified_count += 1;
            if self.config.capture_unclassified {
                events.push(Event {
                    byte_offset: record.byte_offset,
                    source_frame: frame_of(replay, record.byte_offset),
                    entity_id: record.entity_id,
                    payload: EventPayload::Unclassified {
                        header: record.header,
                        raw: record.raw.to_vec(),
                    },
                });
            }
        }
        debug!("{} unclassified records", unclassified_count);

        EventStream::new(events, unclassified_count)
    }

    /// Lazily enumerate records no registered header claims
    pub fn unclassified<'b>(&self, bytes: &'b [u8]) -> UnclassifiedIter<'b>
    where
        'a: 'b,
    {
        UnclassifiedIter {
            bytes,
            registry: self.registry,
            capture: self.config.unclassified_capture,
            middles: memchr_iter(HEADER_MIDDLE, bytes),
        }
    }

    /// Lookback fields never reach before `frame_start`
    fn decode_at(
        &self,
        bytes: &[u8],
        frame_start: usize,
        offset: usize,
        spec: &HeaderSpec,
    ) -> std::result::Result<(EntityId, EventPayload), Violation> {
        let record = bytes
            .get(offset..offset + spec.layout.len)
            .ok_or_else(|| {
                Violation::new(format!(
                    "truncated: {} of {} bytes",
                    bytes.len() - offset,
                    spec.layout.len
                ))
            })?;

        if record[RESERVED_AT..layout::ENTITY_AT] != [0, 0] {
            return Err(Violation::new(format!(
                "reserved field {} after header",
                read::hex_bytes(&record[RESERVED_AT..layout::ENTITY_AT])
            )));
        }
        spec.layout.check(record)?;

        let entity_id = EntityId::from_be_bytes([
            record[layout::ENTITY_AT],
            record[layout::ENTITY_AT + 1],
        ]);
        let view = RecordView::new(
            record,
            &bytes[frame_start..offset],
            self.config.max_timestamp_secs,
        );
        let payload = (spec.decode)(&view)?;
        Ok((entity_id, payload))
    }
}

fn frame_of(replay: &ReplayBytes, offset: usize) -> u32 {
    replay.locate(offset).map(|p| p.frame_index).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::replay::Frame;
    use crate::synth::ReplayBuilder;

    fn decode(replay: &ReplayBytes, config: &EventConfig) -> (EventStream, Diagnostics) {
        let registry = HeaderRegistry::standard();
        let mut diagnostics = Diagnostics::new(64);
        let stream = EventDecoder::new(&registry, config).decode(replay, &mut diagnostics);
        (stream, diagnostics)
    }

    #[test]
    fn test_decode_known_records() {
        let replay = ReplayBuilder::new()
            .kill(1500, Some(61.5))
            .death(1505, 62.0)
            .credit(1501, 1.0, 0x0B)
            .heartbeat(1502, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])
            .action(1503, 0x42)
            .build();

        let (stream, diagnostics) = decode(&replay, &EventConfig::default());
        let kinds: Vec<EventKind> = stream.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Kill,
                EventKind::Death,
                EventKind::Credit,
                EventKind::Heartbeat,
                EventKind::Action
            ]
        );

        let kill = &stream.events()[0];
        assert_eq!(kill.entity_id, EntityId::new(1500));
        assert_eq!(kill.timestamp(), Some(61.5));

        let credit = stream.credits().next().unwrap();
        assert_eq!(credit.entity_id, EntityId::new(1501));
        assert_eq!(credit.action, 0x0B);
        assert_eq!(credit.value, 1.0);

        assert_eq!(diagnostics.counts().structural_violation, 0);
    }

    #[test]
    fn test_structural_violations_are_skipped() {
        let mut bytes = ReplayBuilder::new().kill(1500, Some(10.0)).into_bytes();
        // Break the sentinel of the only kill record
        let header = bytes.windows(3).position(|w| w == layout::kill::HEADER).unwrap();
        bytes[header + layout::kill::SENTINEL_AT] = 0x00;
        // Death record cut off at the end of the data
        bytes.extend([0x08, 0x04, 0x31, 0x00, 0x00, 0x05]);

        let replay = ReplayBytes::from_frames(vec![Frame::new(0, bytes)]).unwrap();
        let (stream, diagnostics) = decode(&replay, &EventConfig::default());

        assert_eq!(stream.kills().count(), 0);
        assert_eq!(stream.deaths().count(), 0);
        assert_eq!(diagnostics.counts().structural_violation, 2);
    }

    #[test]
    fn test_unclassified_counted_and_optionally_kept() {
        let replay = ReplayBuilder::new()
            .raw(&[0x10, 0x04, 0x3D, 0x00, 0x00, 0x05, 0xDC, 0x11, 0x22])
            .credit(1500, 250.0, 0x06)
            .build();

        let (stream, _) = decode(&replay, &EventConfig::default());
        assert_eq!(stream.unclassified_count(), 1);
        assert_eq!(stream.of_kind(EventKind::Unclassified).count(), 0);

        let config = EventConfig {
            capture_unclassified: true,
            ..EventConfig::default()
        };
        let (stream, _) = decode(&replay, &config);
        let unclassified: Vec<&Event> = stream.of_kind(EventKind::Unclassified).collect();
        assert_eq!(unclassified.len(), 1);
        assert_eq!(unclassified[0].entity_id, EntityId::new(1500));
        match &unclassified[0].payload {
            EventPayload::Unclassified { header, raw } => {
                assert_eq!(header, &[0x10, 0x04, 0x3D]);
                assert_eq!(&raw[..3], &[0x10, 0x04, 0x3D]);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_unclassified_iter_is_lazy() {
        let bytes = [0x01, 0x04, 0x02, 0x00, 0x00, 0x00, 0x07, 0x03, 0x04, 0x05, 0x00, 0x00, 0x00, 0x09];
        let registry = HeaderRegistry::standard();
        let config = EventConfig::default();
        let decoder = EventDecoder::new(&registry, &config);

        let mut iter = decoder.unclassified(&bytes);
        let first = iter.next().unwrap();
        assert_eq!(first.byte_offset, 0);
        assert_eq!(first.header, [0x01, 0x04, 0x02]);
        assert_eq!(first.entity_id, EntityId::new(7));
        let second = iter.next().unwrap();
        assert_eq!(second.byte_offset, 7);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_source_frame_is_tagged() {
        let first = ReplayBuilder::new().credit(1500, 5.0, 0x06).into_bytes();
        let second = ReplayBuilder::new().credit(1501, 7.0, 0x06).into_bytes();
        let replay =
            ReplayBytes::from_frames(vec![Frame::new(4, first), Frame::new(9, second)]).unwrap();

        let (stream, _) = decode(&replay, &EventConfig::default());
        let frames: Vec<u32> = stream.credits().map(|c| frame_of(&replay, c.byte_offset)).collect();
        assert_eq!(frames, vec![4, 9]);
        let tagged: Vec<u32> = stream.iter().map(|e| e.source_frame).collect();
        assert_eq!(tagged, vec![4, 9]);
    }

    #[test]
    fn test_kill_timestamp_stays_in_its_frame() {
        let mut first = vec![0u8; 4];
        first.extend(61.5f32.to_be_bytes());
        first.extend([0u8; 3]);
        // Kill header at the very start of the next frame: its timestamp slot
        // would fall in the tail of the previous frame
        let mut second = ReplayBuilder::new().kill(1500, Some(10.0)).into_bytes();
        second.drain(..layout::kill::TIMESTAMP_BEFORE);
        let replay =
            ReplayBytes::from_frames(vec![Frame::new(0, first), Frame::new(1, second)]).unwrap();

        let (stream, _) = decode(&replay, &EventConfig::default());
        let kill = stream.kills().next().unwrap();
        assert_eq!(kill.source_frame, 1);
        assert_eq!(kill.timestamp(), None);
    }
}
