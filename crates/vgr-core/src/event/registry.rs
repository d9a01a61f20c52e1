use std::fmt;

use crate::error::{Error, Result};
use crate::layout::{self, action, credit, death, heartbeat, kill};
use crate::scan::read;

use super::{EventKind, EventPayload};

/// Why a header occurrence was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation(pub String);

impl Violation {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record's bytes plus the bytes that precede it in the replay
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    record: &'a [u8],
    preceding: &'a [u8],
    max_timestamp: f32,
}

impl<'a> RecordView<'a> {
    pub fn new(record: &'a [u8], preceding: &'a [u8], max_timestamp: f32) -> Self {
        Self {
            record,
            preceding,
            max_timestamp,
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.record
    }

    pub fn byte(&self, at: usize) -> std::result::Result<u8, Violation> {
        self.record
            .get(at)
            .copied()
            .ok_or_else(|| Violation::new(format!("no byte at +{}", at)))
    }

    pub fn f32_be(&self, at: usize) -> std::result::Result<f32, Violation> {
        read::f32_be(self.record, at).ok_or_else(|| Violation::new(format!("no f32 at +{}", at)))
    }

    pub fn slice(&self, at: usize, len: usize) -> std::result::Result<&'a [u8], Violation> {
        self.record
            .get(at..at + len)
            .ok_or_else(|| Violation::new(format!("no {} bytes at +{}", len, at)))
    }

    /// Big-endian f32 located `distance` bytes before the record start
    pub fn f32_before(&self, distance: usize) -> Option<f32> {
        let at = self.preceding.len().checked_sub(distance)?;
        read::f32_be(self.preceding, at)
    }

    /// Finite and within `(0, max_timestamp]`
    pub fn is_plausible_timestamp(&self, value: f32) -> bool {
        value.is_finite() && value > 0.0 && value <= self.max_timestamp
    }
}

pub type DecodeFn = fn(&RecordView<'_>) -> std::result::Result<EventPayload, Violation>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralField {
    pub at: usize,
    pub bytes: Vec<u8>,
}

impl LiteralField {
    pub fn new(at: usize, bytes: &[u8]) -> Self {
        Self {
            at,
            bytes: bytes.to_vec(),
        }
    }
}

/// Fixed-width record shape checked before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub len: usize,
    /// `(offset, width)` ranges that must be all zero
    pub zero_fields: Vec<(usize, usize)>,
    pub literals: Vec<LiteralField>,
}

impl RecordLayout {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            zero_fields: Vec::new(),
            literals: Vec::new(),
        }
    }

    pub fn zero(mut self, at: usize, width: usize) -> Self {
        self.zero_fields.push((at, width));
        self
    }

    pub fn literal(mut self, at: usize, bytes: &[u8]) -> Self {
        self.literals.push(LiteralField::new(at, bytes));
        self
    }

    pub fn check(&self, record: &[u8]) -> std::result::Result<(), Violation> {
        if record.len() < self.len {
            return Err(Violation::new(format!(
                "truncated: {} of {} bytes",
                record.len(),
                self.len
            )));
        }
        for &(at, width) in &self.zero_fields {
            if record[at..at + width].iter().any(|&b| b != 0) {
                return Err(Violation::new(format!(
                    "non-zero field at +{}: {}",
                    at,
                    read::hex_bytes(&record[at..at + width])
                )));
            }
        }
        for literal in &self.literals {
            let actual = &record[literal.at..literal.at + literal.bytes.len()];
            if actual != literal.bytes.as_slice() {
                return Err(Violation::new(format!(
                    "expected {} at +{}, found {}",
                    read::hex_bytes(&literal.bytes),
                    literal.at,
                    read::hex_bytes(actual)
                )));
            }
        }
        Ok(())
    }

    fn fits(&self) -> bool {
        let zero_ok = self.zero_fields.iter().all(|&(at, w)| at + w <= self.len);
        let literal_ok = self
            .literals
            .iter()
            .all(|l| l.at + l.bytes.len() <= self.len);
        zero_ok && literal_ok
    }
}

#[derive(Debug, Clone)]
pub struct HeaderSpec {
    pub kind: EventKind,
    pub header: [u8; 3],
    pub layout: RecordLayout,
    pub decode: DecodeFn,
}

impl HeaderSpec {
    pub fn new(kind: EventKind, header: [u8; 3], layout: RecordLayout, decode: DecodeFn) -> Self {
        Self {
            kind,
            header,
            layout,
            decode,
        }
    }
}

/// Header to record layout and decode function
#[derive(Debug, Clone, Default)]
pub struct HeaderRegistry {
    specs: Vec<HeaderSpec>,
}

impl HeaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five known record kinds
    pub fn standard() -> Self {
        let specs = vec![
            HeaderSpec::new(
                EventKind::Kill,
                kill::HEADER,
                RecordLayout::new(kill::LEN)
                    .literal(kill::SENTINEL_AT, &kill::SENTINEL)
                    .literal(kill::UNIT_AT, &kill::UNIT)
                    .literal(kill::TRAILER_AT, &kill::TRAILER),
                decode_kill,
            ),
            HeaderSpec::new(
                EventKind::Death,
                death::HEADER,
                RecordLayout::new(death::LEN).zero(death::PADDING_AT, 2),
                decode_death,
            ),
            HeaderSpec::new(
                EventKind::Credit,
                credit::HEADER,
                RecordLayout::new(credit::LEN),
                decode_credit,
            ),
            HeaderSpec::new(
                EventKind::Heartbeat,
                heartbeat::HEADER,
                RecordLayout::new(heartbeat::LEN),
                decode_heartbeat,
            ),
            HeaderSpec::new(
                EventKind::Action,
                action::HEADER,
                RecordLayout::new(action::LEN),
                decode_action,
            ),
        ];
        Self { specs }
    }

    /// Add a header; existing registrations are never replaced
    pub fn register(&mut self, spec: HeaderSpec) -> Result<()> {
        let header = read::hex_bytes(&spec.header);
        let reject = |message: &str| Error::InvalidHeader {
            header: header.clone(),
            message: message.to_string(),
        };

        if spec.header[1] != layout::HEADER_MIDDLE {
            return Err(reject("middle byte must be 0x04"));
        }
        if spec.layout.len < layout::MIN_RECORD_LEN {
            return Err(reject("record shorter than header, reserved field and entity id"));
        }
        if !spec.layout.fits() {
            return Err(reject("layout field past record end"));
        }
        if self.get(spec.header).is_some() {
            return Err(reject("header already registered"));
        }

        self.specs.push(spec);
        Ok(())
    }

    pub fn get(&self, header: [u8; 3]) -> Option<&HeaderSpec> {
        self.specs.iter().find(|spec| spec.header == header)
    }

    pub fn specs(&self) -> &[HeaderSpec] {
        &self.specs
    }

    pub fn contains(&self, header: &[u8]) -> bool {
        self.specs.iter().any(|spec| spec.header.as_slice() == header)
    }
}

fn decode_kill(view: &RecordView<'_>) -> std::result::Result<EventPayload, Violation> {
    let timestamp = view
        .f32_before(kill::TIMESTAMP_BEFORE)
        .filter(|&t| view.is_plausible_timestamp(t));
    Ok(EventPayload::Kill { timestamp })
}

fn decode_death(view: &RecordView<'_>) -> std::result::Result<EventPayload, Violation> {
    let timestamp = view.f32_be(death::TIMESTAMP_AT)?;
    if !view.is_plausible_timestamp(timestamp) {
        return Err(Violation::new(format!("implausible timestamp {}", timestamp)));
    }
    Ok(EventPayload::Death { timestamp })
}

fn decode_credit(view: &RecordView<'_>) -> std::result::Result<EventPayload, Violation> {
    Ok(EventPayload::Credit {
        value: view.f32_be(credit::VALUE_AT)?,
        action: view.byte(credit::ACTION_AT)?,
    })
}

fn decode_heartbeat(view: &RecordView<'_>) -> std::result::Result<EventPayload, Violation> {
    let mut values = [0.0f32; heartbeat::VALUE_COUNT];
    for (i, value) in values.iter_mut().enumerate() {
        *value = view.f32_be(heartbeat::VALUES_AT + i * 4)?;
    }
    Ok(EventPayload::Heartbeat { values })
}

fn decode_action(view: &RecordView<'_>) -> std::result::Result<EventPayload, Violation> {
    let payload = view.slice(action::PAYLOAD_AT, action::LEN - action::PAYLOAD_AT)?;
    Ok(EventPayload::Action {
        payload: payload.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry() {
        let registry = HeaderRegistry::standard();
        assert_eq!(registry.specs().len(), 5);
        assert_eq!(registry.get(kill::HEADER).unwrap().kind, EventKind::Kill);
        assert!(registry.contains(&credit::HEADER));
        assert!(!registry.contains(&[0x10, 0x04, 0x3D]));
    }

    #[test]
    fn test_register_validates_header() {
        let mut registry = HeaderRegistry::standard();

        let bad_middle = HeaderSpec::new(
            EventKind::Death,
            [0x08, 0x05, 0x31],
            RecordLayout::new(13),
            decode_death,
        );
        assert!(matches!(
            registry.register(bad_middle),
            Err(Error::InvalidHeader { .. })
        ));

        let duplicate = HeaderSpec::new(EventKind::Death, death::HEADER, RecordLayout::new(13), decode_death);
        assert!(registry.register(duplicate).is_err());

        let too_short = HeaderSpec::new(EventKind::Credit, [0x10, 0x04, 0x3D], RecordLayout::new(5), decode_credit);
        assert!(registry.register(too_short).is_err());

        let overflowing = HeaderSpec::new(
            EventKind::Credit,
            [0x10, 0x04, 0x3D],
            RecordLayout::new(8).literal(7, &[1, 2]),
            decode_credit,
        );
        assert!(registry.register(overflowing).is_err());

        let alternate = HeaderSpec::new(
            EventKind::Death,
            [0x08, 0x04, 0x32],
            RecordLayout::new(death::LEN).zero(death::PADDING_AT, 2),
            decode_death,
        );
        assert!(registry.register(alternate).is_ok());
        assert_eq!(registry.specs().len(), 6);
    }

    #[test]
    fn test_layout_check() {
        let layout = RecordLayout::new(8).zero(3, 2).literal(7, &[0x29]);
        assert!(layout.check(&[0x18, 0x04, 0x1C, 0, 0, 1, 2, 0x29]).is_ok());
        assert!(layout.check(&[0x18, 0x04, 0x1C, 0, 1, 1, 2, 0x29]).is_err());
        assert!(layout.check(&[0x18, 0x04, 0x1C, 0, 0, 1, 2, 0x28]).is_err());
        assert!(layout.check(&[0x18, 0x04, 0x1C]).is_err());
    }

    #[test]
    fn test_kill_timestamp_before_record() {
        let mut preceding = vec![0u8; 3];
        preceding.extend(125.5f32.to_be_bytes());
        preceding.extend([0u8; 3]);
        let record = [0u8; 16];

        let view = RecordView::new(&record, &preceding, 2400.0);
        assert_eq!(
            decode_kill(&view).unwrap(),
            EventPayload::Kill {
                timestamp: Some(125.5)
            }
        );

        let early = RecordView::new(&record, &preceding[4..], 2400.0);
        assert_eq!(decode_kill(&early).unwrap(), EventPayload::Kill { timestamp: None });
    }

    #[test]
    fn test_death_rejects_implausible_timestamp() {
        let mut record = vec![0x08, 0x04, 0x31, 0, 0, 0x05, 0xDC, 0, 0];
        record.extend(9000.0f32.to_be_bytes());
        let view = RecordView::new(&record, &[], 2400.0);
        assert!(decode_death(&view).is_err());
    }
}
