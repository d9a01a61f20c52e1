//! TSV export format implementation

use crate::report::{MatchResult, PlayerStats};

use super::format::ExportFormat;

/// TSV (Tab-Separated Values) exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct TsvExporter;

impl ExportFormat for TsvExporter {
    fn header(&self) -> Option<String> {
        Some(format_tsv_header())
    }

    fn format_row(&self, result: &MatchResult, player: &PlayerStats) -> String {
        let optional = |value: Option<String>| value.unwrap_or_default();
        [
            sanitize(&result.match_id),
            sanitize(&player.name),
            player.entity_id.to_string(),
            optional(player.hero_name().map(sanitize)),
            player.team_label.to_string(),
            optional(player.side.map(|s| s.to_string())),
            player.kills.to_string(),
            player.deaths.to_string(),
            player.assists.to_string(),
            format!("{:.0}", player.gold.value),
            format!("{:.0}", player.minion_kills.value),
            player.gold.calibrated.to_string(),
        ]
        .join("\t")
    }
}

pub fn format_tsv_header() -> String {
    [
        "match",
        "name",
        "entity_id",
        "hero",
        "team",
        "side",
        "kills",
        "deaths",
        "assists",
        "gold",
        "minion_kills",
        "calibrated",
    ]
    .join("\t")
}

/// Display names may carry tabs or newlines
fn sanitize(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}
