//! Loading `<match>.<frame>.vgr` files into match inputs

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};
use vgr_core::{Frame, MatchInput};

const EXTENSION: &str = "vgr";

/// Split `name.12.vgr` into `("name", 12)`
pub fn parse_frame_name(file_name: &str) -> Option<(&str, u32)> {
    let stem = file_name.strip_suffix(EXTENSION)?.strip_suffix('.')?;
    let (match_id, index) = stem.rsplit_once('.')?;
    if match_id.is_empty() {
        return None;
    }
    Some((match_id, index.parse().ok()?))
}

/// Every match in a directory, or the match a single frame file belongs to
pub fn load_matches(path: &Path) -> Result<Vec<MatchInput>> {
    let (dir, only) = if path.is_file() {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Frame file name is not valid UTF-8")?;
        let Some((match_id, _)) = parse_frame_name(file_name) else {
            bail!("{} is not a <match>.<frame>.vgr file", path.display());
        };
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        (dir, Some(match_id.to_string()))
    } else {
        (path, None)
    };

    let mut matches: BTreeMap<String, Vec<Frame>> = BTreeMap::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some((match_id, index)) = parse_frame_name(file_name) else {
            continue;
        };
        if only.as_deref().is_some_and(|m| m != match_id) {
            continue;
        }
        let data = fs::read(entry.path())
            .with_context(|| format!("Failed to read frame {}", entry.path().display()))?;
        matches
            .entry(match_id.to_string())
            .or_default()
            .push(Frame::new(index, data));
    }

    if matches.is_empty() {
        warn!("No .vgr frames found in {}", dir.display());
    }
    for (match_id, frames) in &matches {
        debug!("{}: {} frames", match_id, frames.len());
    }
    Ok(matches
        .into_iter()
        .map(|(match_id, frames)| MatchInput { match_id, frames })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_frame_name() {
        assert_eq!(parse_frame_name("abc-123.0.vgr"), Some(("abc-123", 0)));
        assert_eq!(parse_frame_name("a.b.17.vgr"), Some(("a.b", 17)));
        assert_eq!(parse_frame_name("abc.vgr"), None);
        assert_eq!(parse_frame_name("abc.x.vgr"), None);
        assert_eq!(parse_frame_name(".3.vgr"), None);
        assert_eq!(parse_frame_name("abc.1.bin"), None);
    }

    #[test]
    fn test_load_matches_groups_frames() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("m1.1.vgr"), [1u8, 2]).unwrap();
        fs::write(dir.path().join("m1.0.vgr"), [0u8]).unwrap();
        fs::write(dir.path().join("m2.0.vgr"), [9u8]).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let matches = load_matches(dir.path()).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].match_id, "m1");
        assert_eq!(matches[0].frames.len(), 2);

        let single = load_matches(&dir.path().join("m2.0.vgr")).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].frames[0].data, vec![9u8]);
    }
}
