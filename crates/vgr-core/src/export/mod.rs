//! Row exporters for match results

mod format;
mod json;
mod tsv;

pub use format::ExportFormat;
pub use json::{JsonExporter, format_json_entry};
pub use tsv::{TsvExporter, format_tsv_header};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationSnapshot;
    use crate::config::DecoderConfig;
    use crate::pipeline::MatchDecoder;
    use crate::replay::Frame;
    use crate::report::MatchResult;
    use crate::side::Side;
    use crate::synth::ReplayBuilder;

    fn result() -> MatchResult {
        let frames = ReplayBuilder::new()
            .player("Alpha", 1500, 0xF300, 1)
            .player("Bravo", 1501, 8, 2)
            .next_frame()
            .credit(1500, 640.0, 0x06)
            .kill(1500, Some(95.0))
            .death(1501, 95.5)
            .into_frames()
            .into_iter()
            .enumerate()
            .map(|(i, data)| Frame::new(i as u32, data))
            .collect();
        let decoder = MatchDecoder::new(DecoderConfig::default()).unwrap();
        let analysis = decoder.analyze("m7", frames, None).unwrap();
        decoder.finalize(analysis, &CalibrationSnapshot::empty())
    }

    #[test]
    fn test_tsv_rows() {
        let output = TsvExporter.format_rows(&[result()]);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format_tsv_header());
        assert_eq!(lines[1], "m7\tAlpha\t1500\tRingo\t1\tleft\t1\t0\t0\t640\t0\tfalse");
        assert!(lines[2].starts_with("m7\tBravo\t1501\t\t2\tright\t0\t1\t0"));
    }

    #[test]
    fn test_json_rows() {
        let output = JsonExporter.format_rows(&[result()]);
        assert!(JsonExporter.header().is_none());

        let first: serde_json::Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(first["name"], "Alpha");
        assert_eq!(first["side"], "left");
        assert_eq!(first["gold"]["value"], 640.0);
        assert_eq!(first["hero_name"], "Ringo");
        // No crystal push in the fixture, so no winner either
        assert_eq!(first["won"], serde_json::Value::Null);
        assert_eq!(first["mode"], serde_json::Value::Null);

        let second: serde_json::Value = serde_json::from_str(output.lines().nth(1).unwrap()).unwrap();
        assert_eq!(second["hero_name"], serde_json::Value::Null);
    }

    #[test]
    fn test_json_won_follows_winner() {
        let mut result = result();
        result.winner = Some(Side::Right);
        let rows: Vec<serde_json::Value> = result
            .players
            .iter()
            .map(|p| format_json_entry(&result, p))
            .collect();
        assert_eq!(rows[0]["won"], false);
        assert_eq!(rows[1]["won"], true);
    }
}
