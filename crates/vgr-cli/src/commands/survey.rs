//! Survey command: header census and credit action ranking.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use vgr_core::scan::read::hex_bytes;
use vgr_core::survey::{action_sums, credit_action_census, header_census, rank_actions};
use vgr_core::{DecoderConfig, MatchDecoder, ReplayBytes};

use crate::frames::load_matches;

pub fn run(config: DecoderConfig, input: &Path, truth: Option<&Path>, top: usize) -> Result<()> {
    let decoder = MatchDecoder::new(config)?;
    let truth = truth.map(super::load_truth).transpose()?;
    let mut gold_samples: Vec<(BTreeMap<u8, f64>, f64)> = Vec::new();

    for input in load_matches(input)? {
        let record = truth.as_ref().and_then(|t| t.find(&input.match_id).ok());
        let analyzed = ReplayBytes::from_frames(input.frames.clone()).and_then(|replay| {
            let analysis = decoder.analyze(&input.match_id, input.frames, record)?;
            Ok((replay, analysis))
        });
        let (replay, analysis) = match analyzed {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("{} {}: {}", "skipped".red(), input.match_id, e);
                continue;
            }
        };

        println!("{}", analysis.match_id.bold());
        println!("  headers:");
        for entry in header_census(replay.as_bytes(), decoder.registry()).iter().take(top) {
            let kind = entry
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "?".dimmed().to_string());
            println!("    {}  {:>8}  {}", hex_bytes(&entry.header), entry.count, kind);
        }

        println!("  credit actions:");
        for stats in credit_action_census(&analysis.stream) {
            println!(
                "    0x{:02X}  {:>8} records  {:>8} at 1.0  total {:.1}",
                stats.action, stats.count, stats.unit_count, stats.total
            );
        }

        if let Some(record) = record {
            let sums = action_sums(
                &analysis.stream,
                &analysis.directory,
                decoder.config().economy.max_value,
            );
            for name_match in &analysis.name_matches {
                let (Some(player), Some(expected)) = (
                    analysis.directory.by_name(&name_match.display_name),
                    record.player(&name_match.truth_name),
                ) else {
                    continue;
                };
                if let Some(per_action) = sums.get(&player.entity_id) {
                    gold_samples.push((per_action.clone(), expected.gold));
                }
            }
        }
    }

    if !gold_samples.is_empty() {
        println!("{}", "action correlation with truth gold:".bold());
        for entry in rank_actions(&gold_samples) {
            println!("    0x{:02X}  r = {:+.3}  (n = {})", entry.action, entry.r, entry.samples);
        }
    }
    Ok(())
}
