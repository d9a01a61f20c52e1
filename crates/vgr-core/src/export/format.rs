//! ExportFormat trait definition

use crate::report::{MatchResult, PlayerStats};

/// One output row per player of a finalized match
pub trait ExportFormat {
    /// Returns the header line for the format (empty for formats without headers)
    fn header(&self) -> Option<String>;

    /// Format a single player row
    fn format_row(&self, result: &MatchResult, player: &PlayerStats) -> String;

    /// Format every player of every match
    fn format_rows(&self, results: &[MatchResult]) -> String {
        let mut output = String::new();
        if let Some(header) = self.header() {
            output.push_str(&header);
            output.push('\n');
        }
        for result in results {
            for player in &result.players {
                output.push_str(&self.format_row(result, player));
                output.push('\n');
            }
        }
        output
    }
}
