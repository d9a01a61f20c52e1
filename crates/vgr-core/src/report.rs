//! Finalized per-match output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::assist::AssistCredit;
use crate::correlate::{Elimination, Unattributed};
use crate::diagnostic::{Diagnostic, DiagnosticCounts};
use crate::economy::StatEstimate;
use crate::entity::EntityId;
use crate::hero::Hero;
use crate::mode::MatchMode;
use crate::objective::ObjectiveEvent;
use crate::outcome::MatchOutcome;
use crate::side::{Side, SideAssignment};
use crate::truth::MatchMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DurationSource {
    Truth,
    /// Latest plausible death timestamp
    DeathTimestamps,
    Unknown,
}

/// Offsets of the records behind each stat
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatProvenance {
    pub kill_offsets: Vec<usize>,
    pub death_offsets: Vec<usize>,
    pub assists: Vec<AssistCredit>,
    pub gold_offsets: Vec<usize>,
    pub minion_kill_offsets: Vec<usize>,
}

/// Truth record a player was matched to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthLink {
    pub name: String,
    pub hero_name: String,
    pub method: MatchMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub name: String,
    pub entity_id: EntityId,
    pub hero_id: u16,
    /// Hero for `hero_id`, when the id is known
    pub hero: Option<Hero>,
    pub team_label: u8,
    pub side: Option<Side>,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub gold: StatEstimate,
    pub minion_kills: StatEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truth: Option<TruthLink>,
    pub provenance: StatProvenance,
}

impl PlayerStats {
    /// Replay hero, else the hero named by the truth record
    pub fn hero_name(&self) -> Option<&str> {
        self.hero
            .map(Hero::name)
            .or_else(|| self.truth.as_ref().map(|t| t.hero_name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: String,
    pub generated_at: DateTime<Utc>,
    pub duration: Option<f32>,
    pub duration_source: DurationSource,
    pub sides: SideAssignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<MatchMode>,
    /// Side whose opponents lost their crystal
    pub winner: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchOutcome>,
    pub players: Vec<PlayerStats>,
    pub objectives: Vec<ObjectiveEvent>,
    pub eliminations: Vec<Elimination>,
    pub unattributed: Vec<Unattributed>,
    pub post_game_deaths: Vec<usize>,
    pub post_game_kills: Vec<usize>,
    pub unclassified_count: usize,
    /// Match left out of the calibration fit, when one was applied
    pub calibration_excluded: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub diagnostic_counts: DiagnosticCounts,
}

impl MatchResult {
    pub fn player(&self, name: &str) -> Option<&PlayerStats> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_by_id(&self, id: EntityId) -> Option<&PlayerStats> {
        self.players.iter().find(|p| p.entity_id == id)
    }

    /// Total kills of the players on `side`
    pub fn side_kills(&self, side: Side) -> u32 {
        self.players
            .iter()
            .filter(|p| p.side == Some(side))
            .map(|p| p.kills)
            .sum()
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
