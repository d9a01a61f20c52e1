//! Wildcard byte search over a replay

use serde::Serialize;

use crate::replay::{FramePosition, ReplayBytes};
use crate::scan::{WildcardPattern, read};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub offset: usize,
    pub position: Option<FramePosition>,
    /// Hex of the bytes from the hit on
    pub context: String,
}

/// First `limit` matches of `pattern`, each with `context` bytes of hex
pub fn search(
    replay: &ReplayBytes,
    pattern: &WildcardPattern,
    context: usize,
    limit: usize,
) -> Vec<SearchHit> {
    let bytes = replay.as_bytes();
    pattern
        .find_all(bytes)
        .into_iter()
        .take(limit)
        .map(|offset| {
            let end = offset.saturating_add(context.max(pattern.len())).min(bytes.len());
            SearchHit {
                offset,
                position: replay.locate(offset),
                context: read::hex_bytes(&bytes[offset..end]),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::parse_pattern;
    use crate::synth::ReplayBuilder;

    #[test]
    fn test_search_reports_frame_positions() {
        let replay = ReplayBuilder::new()
            .gap(10)
            .next_frame()
            .credit(1500, 1.0, 0x0B)
            .gap(4)
            .credit(1501, 1.0, 0x0E)
            .build();
        let pattern = parse_pattern("10 04 1D 00 00 ?? ??").unwrap();

        let hits = search(&replay, &pattern, 12, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].offset, 10);
        assert_eq!(
            hits[0].position,
            Some(FramePosition {
                frame_index: 1,
                offset: 0
            })
        );
        assert_eq!(hits[0].context, "10 04 1D 00 00 05 DC 3F 80 00 00 0B");
        assert_eq!(hits[1].position.map(|p| p.offset), Some(16));

        assert_eq!(search(&replay, &pattern, 12, 1).len(), 1);
    }
}
