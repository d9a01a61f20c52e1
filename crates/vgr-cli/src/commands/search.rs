//! Search command: wildcard byte search over replay frames.

use std::path::Path;

use anyhow::{Context, Result};
use vgr_core::ReplayBytes;
use vgr_core::scan::parse_pattern;
use vgr_core::survey::search;

use crate::frames::load_matches;

pub fn run(input: &Path, pattern: &str, context: usize, limit: usize) -> Result<()> {
    let pattern = parse_pattern(pattern).with_context(|| format!("Bad pattern: {}", pattern))?;
    println!("Searching for pattern: {} ({} bytes)", pattern, pattern.len());
    println!();

    let mut total = 0;
    for input in load_matches(input)? {
        let replay = match ReplayBytes::from_frames(input.frames) {
            Ok(replay) => replay,
            Err(e) => {
                eprintln!("{}: {}", input.match_id, e);
                continue;
            }
        };
        let hits = search(&replay, &pattern, context, limit);
        if hits.is_empty() {
            continue;
        }

        println!("{} ({} hits)", input.match_id, hits.len());
        for (i, hit) in hits.iter().enumerate() {
            let position = hit
                .position
                .map(|p| format!("frame {} +0x{:X}", p.frame_index, p.offset))
                .unwrap_or_default();
            println!("[{}] 0x{:X}  {}", i + 1, hit.offset, position);
            println!("     {}", hit.context);
        }
        total += hits.len();
    }

    println!();
    println!("Found {} matches", total);
    Ok(())
}
