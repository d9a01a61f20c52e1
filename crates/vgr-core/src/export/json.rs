//! JSON export format implementation

use serde_json::{Value as JsonValue, json};

use crate::report::{MatchResult, PlayerStats};

use super::format::ExportFormat;

/// JSON exporter (one object per line, NDJSON format)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl ExportFormat for JsonExporter {
    fn header(&self) -> Option<String> {
        None
    }

    fn format_row(&self, result: &MatchResult, player: &PlayerStats) -> String {
        format_json_entry(result, player).to_string()
    }
}

/// Flat per-player entry; provenance is left to the full match JSON
pub fn format_json_entry(result: &MatchResult, player: &PlayerStats) -> JsonValue {
    json!({
        "match_id": result.match_id,
        "generated_at": result.generated_at.to_rfc3339(),
        "mode": result.mode.as_ref().map(|m| m.tag.as_str()),
        "name": player.name,
        "entity_id": player.entity_id.value(),
        "hero_id": player.hero_id,
        "hero_name": player.hero_name(),
        "team_label": player.team_label,
        "side": player.side.map(|s| s.to_string()),
        "won": result.winner.zip(player.side).map(|(w, s)| w == s),
        "kills": player.kills,
        "deaths": player.deaths,
        "assists": player.assists,
        "gold": {
            "raw": player.gold.raw,
            "value": player.gold.value,
            "calibrated": player.gold.calibrated
        },
        "minion_kills": {
            "raw": player.minion_kills.raw,
            "value": player.minion_kills.value,
            "calibrated": player.minion_kills.calibrated
        }
    })
}
