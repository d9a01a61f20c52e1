use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Byte pattern with `??` wildcards, e.g. `"10 04 1D 00 00 ?? ??"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    bytes: Vec<Option<u8>>,
}

impl WildcardPattern {
    pub fn new(bytes: Vec<Option<u8>>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidPattern("Pattern is empty".to_string()));
        }
        Ok(Self { bytes })
    }

    /// Pattern made only of literal bytes
    pub fn literal(bytes: &[u8]) -> Result<Self> {
        Self::new(bytes.iter().copied().map(Some).collect())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[Option<u8>] {
        &self.bytes
    }

    /// Check whether the pattern matches `haystack` starting at `offset`
    pub fn matches_at(&self, haystack: &[u8], offset: usize) -> bool {
        let Some(end) = offset.checked_add(self.bytes.len()) else {
            return false;
        };
        let Some(window) = haystack.get(offset..end) else {
            return false;
        };
        self.bytes
            .iter()
            .zip(window)
            .all(|(expected, actual)| expected.is_none_or(|value| value == *actual))
    }

    /// Every offset where the pattern matches, overlapping
    pub fn find_all(&self, haystack: &[u8]) -> Vec<usize> {
        if haystack.len() < self.bytes.len() {
            return Vec::new();
        }

        let last = haystack.len() - self.bytes.len();
        (0..=last)
            .filter(|&offset| self.matches_at(haystack, offset))
            .collect()
    }
}

impl FromStr for WildcardPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_pattern(s)
    }
}

impl fmt::Display for WildcardPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_pattern(&self.bytes))
    }
}

impl Serialize for WildcardPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for WildcardPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_pattern(&text).map_err(serde::de::Error::custom)
    }
}

pub fn parse_pattern(pattern: &str) -> Result<WildcardPattern> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16)
            .map_err(|e| Error::InvalidPattern(format!("Invalid token '{}': {}", token, e)))?;
        bytes.push(Some(value));
    }

    WildcardPattern::new(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern_with_wildcards() {
        let pattern = parse_pattern("10 04 1D ?? ??").unwrap();
        assert_eq!(pattern.len(), 5);
        assert_eq!(pattern.bytes()[0], Some(0x10));
        assert_eq!(pattern.bytes()[2], Some(0x1D));
        assert_eq!(pattern.bytes()[3], None);
    }

    #[test]
    fn test_parse_pattern_rejects_bad_input() {
        assert!(parse_pattern("").is_err());
        assert!(parse_pattern("10 XZ").is_err());
        assert!(parse_pattern("100").is_err());
    }

    #[test]
    fn test_format_pattern_roundtrip() {
        let pattern = vec![Some(0x18), Some(0x04), Some(0x1C), None, Some(0xFF)];
        let formatted = format_pattern(&pattern);
        assert_eq!(formatted, "18 04 1C ?? FF");
        let parsed = parse_pattern(&formatted).unwrap();
        assert_eq!(parsed.bytes(), pattern.as_slice());
    }

    #[test]
    fn test_find_all_with_wildcards() {
        let data = [0x10, 0x04, 0x1D, 0x10, 0x04, 0x3D, 0x10];
        let pattern = parse_pattern("10 04 ??").unwrap();
        assert_eq!(pattern.find_all(&data), vec![0, 3]);

        let short = [0x10, 0x04];
        assert!(pattern.find_all(&short).is_empty());
    }

    #[test]
    fn test_serde_as_string() {
        let pattern = parse_pattern("08 04 31 ??").unwrap();
        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(json, "\"08 04 31 ??\"");
        let back: WildcardPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pattern);
    }
}
