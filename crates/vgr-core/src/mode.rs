//! Match mode, team size and map from the `GameMode_*` block

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::scan;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[strum(serialize = "GameMode_HF_Ranked")]
    HalcyonFoldRanked,
    #[strum(serialize = "GameMode_HF_Casual")]
    HalcyonFoldCasual,
    #[strum(serialize = "GameMode_5v5_Ranked")]
    SovereignRiseRanked,
    #[strum(serialize = "GameMode_5v5_Casual")]
    SovereignRiseCasual,
    #[strum(serialize = "GameMode_Blitz")]
    Blitz,
    #[strum(serialize = "GameMode_ARAL")]
    Aral,
    #[strum(serialize = "GameMode_BR")]
    BattleRoyale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
pub enum GameMap {
    #[strum(serialize = "Halcyon Fold")]
    HalcyonFold,
    #[strum(serialize = "Sovereign Rise")]
    SovereignRise,
    Unknown,
}

/// Mode read from one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMode {
    /// Tag as stored in the replay
    pub tag: String,
    /// `None` for tags outside the known list
    pub mode: Option<GameMode>,
    pub team_size: usize,
    pub map: GameMap,
}

impl MatchMode {
    pub fn from_tag(tag: &str) -> Self {
        let five_a_side = tag.contains("5v5");
        let map = if five_a_side {
            GameMap::SovereignRise
        } else if ["HF", "Blitz", "ARAL"].iter().any(|m| tag.contains(m)) {
            GameMap::HalcyonFold
        } else {
            GameMap::Unknown
        };
        Self {
            tag: tag.to_string(),
            mode: tag.parse().ok(),
            team_size: if five_a_side { 5 } else { 3 },
            map,
        }
    }

    /// Players expected in the directory
    pub fn roster_size(&self) -> usize {
        self.team_size * 2
    }
}

/// First printable run starting with `prefix` anywhere in `frame`
pub fn find_mode_tag(frame: &[u8], prefix: &str, max_len: usize) -> Option<String> {
    scan::scan(frame, prefix.as_bytes())
        .map(|at| printable_run(&frame[at..], max_len))
        .find(|tag| tag.len() > prefix.len())
}

pub(crate) fn printable_run(bytes: &[u8], max_len: usize) -> String {
    bytes
        .iter()
        .take(max_len)
        .take_while(|b| (0x20..=0x7E).contains(*b))
        .map(|&b| char::from(b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag() {
        let ranked = MatchMode::from_tag("GameMode_HF_Ranked");
        assert_eq!(ranked.mode, Some(GameMode::HalcyonFoldRanked));
        assert_eq!(ranked.team_size, 3);
        assert_eq!(ranked.map, GameMap::HalcyonFold);
        assert_eq!(ranked.roster_size(), 6);

        let five = MatchMode::from_tag("GameMode_5v5_Casual");
        assert_eq!(five.mode, Some(GameMode::SovereignRiseCasual));
        assert_eq!(five.team_size, 5);
        assert_eq!(five.map.to_string(), "Sovereign Rise");

        let br = MatchMode::from_tag("GameMode_BR");
        assert_eq!(br.map, GameMap::Unknown);
        assert_eq!(br.team_size, 3);
    }

    #[test]
    fn test_unknown_tag_keeps_raw_text() {
        let mode = MatchMode::from_tag("GameMode_5v5_Private");
        assert_eq!(mode.mode, None);
        assert_eq!(mode.tag, "GameMode_5v5_Private");
        assert_eq!(mode.team_size, 5);
    }

    #[test]
    fn test_find_mode_tag() {
        let mut frame = vec![0u8; 8];
        frame.extend(b"GameMode_\x00");
        frame.extend(b"GameMode_Blitz\x01rest");
        assert_eq!(
            find_mode_tag(&frame, "GameMode_", 30).as_deref(),
            Some("GameMode_Blitz")
        );
        assert_eq!(find_mode_tag(&[0u8; 16], "GameMode_", 30), None);
    }
}
