//! Byte-pattern scanning over replay data
//!
//! Everything that locates records in a replay is built on [`PatternScan`]:
//! a lazy forward scan for a literal byte sequence that reports overlapping
//! matches. [`WildcardPattern`] is the looser form used by the calibration
//! tools, where unknown bytes are written as `??`.

mod pattern;
pub mod read;

use memchr::memmem;

pub use pattern::{WildcardPattern, format_pattern, parse_pattern};

/// Lazy, restartable scan for a literal pattern
///
/// Matches may overlap: after a hit at `n` the scan resumes at `n + 1`.
/// An empty pattern or a start offset past the end yields nothing.
#[derive(Clone)]
pub struct PatternScan<'h, 'p> {
    haystack: &'h [u8],
    finder: memmem::Finder<'p>,
    pos: usize,
}

impl<'h, 'p> PatternScan<'h, 'p> {
    pub fn new(haystack: &'h [u8], pattern: &'p [u8]) -> Self {
        Self::starting_at(haystack, pattern, 0)
    }

    pub fn starting_at(haystack: &'h [u8], pattern: &'p [u8], start: usize) -> Self {
        Self {
            haystack,
            finder: memmem::Finder::new(pattern),
            pos: start,
        }
    }

    /// Move the scan cursor; the next match reported starts at or after `offset`
    pub fn restart_at(&mut self, offset: usize) {
        self.pos = offset;
    }

    /// Offset the next search starts from
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn pattern(&self) -> &[u8] {
        self.finder.needle()
    }
}

impl Iterator for PatternScan<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.finder.needle().is_empty() || self.pos >= self.haystack.len() {
            return None;
        }

        let found = self.finder.find(&self.haystack[self.pos..])?;
        let offset = self.pos + found;
        self.pos = offset + 1;
        Some(offset)
    }
}

/// Scan `haystack` for every (overlapping) occurrence of `pattern`
pub fn scan<'h, 'p>(haystack: &'h [u8], pattern: &'p [u8]) -> PatternScan<'h, 'p> {
    PatternScan::new(haystack, pattern)
}

/// Count overlapping occurrences of `pattern`
pub fn count(haystack: &[u8], pattern: &[u8]) -> usize {
    scan(haystack, pattern).count()
}

/// Merge the occurrences of several literal patterns in offset order
///
/// Returns `(offset, pattern_index)` pairs. Used where a record may start
/// with one of a few alternative markers.
pub fn scan_any(haystack: &[u8], patterns: &[&[u8]]) -> Vec<(usize, usize)> {
    let mut hits: Vec<(usize, usize)> = patterns
        .iter()
        .enumerate()
        .flat_map(|(index, pattern)| scan(haystack, pattern).map(move |offset| (offset, index)))
        .collect();
    hits.sort_unstable();
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_finds_overlapping_matches() {
        let data = [0xAA, 0xAA, 0xAA, 0xAA];
        let hits: Vec<usize> = scan(&data, &[0xAA, 0xAA]).collect();
        assert_eq!(hits, vec![0, 1, 2]);
    }

    #[test]
    fn test_scan_literal_positions() {
        let data = [0x00, 0x18, 0x04, 0x1C, 0x00, 0x18, 0x04, 0x1C];
        let hits: Vec<usize> = scan(&data, &[0x18, 0x04, 0x1C]).collect();
        assert_eq!(hits, vec![1, 5]);
    }

    #[test]
    fn test_scan_out_of_range_start_is_empty() {
        let data = [0x01, 0x02, 0x03];
        assert_eq!(PatternScan::starting_at(&data, &[0x01], 10).count(), 0);
        assert_eq!(PatternScan::starting_at(&data, &[0x01], 3).count(), 0);
    }

    #[test]
    fn test_scan_empty_pattern_yields_nothing() {
        let data = [0x01, 0x02];
        assert_eq!(scan(&data, &[]).count(), 0);
    }

    #[test]
    fn test_scan_is_restartable() {
        let data = [0x05, 0x00, 0x05, 0x00, 0x05];
        let mut scanner = scan(&data, &[0x05]);
        assert_eq!(scanner.next(), Some(0));
        assert_eq!(scanner.next(), Some(2));

        scanner.restart_at(0);
        assert_eq!(scanner.position(), 0);
        let again: Vec<usize> = scanner.collect();
        assert_eq!(again, vec![0, 2, 4]);
    }

    #[test]
    fn test_scan_clone_continues_independently() {
        let data = [0x07, 0x07, 0x07];
        let mut first = scan(&data, &[0x07]);
        first.next();
        let second = first.clone();
        assert_eq!(first.count(), 2);
        assert_eq!(second.count(), 2);
    }

    #[test]
    fn test_count_and_scan_any() {
        let data = [0xDA, 0x03, 0xEE, 0x00, 0xE0, 0x03, 0xEE, 0xDA, 0x03, 0xEE];
        assert_eq!(count(&data, &[0x03, 0xEE]), 3);

        let hits = scan_any(&data, &[&[0xDA, 0x03, 0xEE], &[0xE0, 0x03, 0xEE]]);
        assert_eq!(hits, vec![(0, 0), (4, 1), (7, 0)]);
    }
}
