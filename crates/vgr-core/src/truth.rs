//! Ground-truth records read from result screens
//!
//! ```json
//! {"matches": [{"replay_name": "...", "match_info": {"duration_seconds": 1329,
//!   "score_left": 15, "score_right": 8}, "players": {"Name": {"hero_name": "Ringo",
//!   "kills": 5, "deaths": 2, "assists": 7, "gold": 11200}}}]}
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::side::Score;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TruthFile {
    pub matches: Vec<MatchTruth>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTruth {
    pub replay_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_file: Option<String>,
    pub match_info: MatchInfo,
    #[serde(default)]
    pub players: BTreeMap<String, PlayerTruth>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInfo {
    #[serde(default)]
    pub duration_seconds: Option<f32>,
    pub score_left: u32,
    pub score_right: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTruth {
    pub hero_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub gold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minion_kills: Option<f64>,
}

impl TruthFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let truth: Self = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} truth records from {}",
            truth.matches.len(),
            path.display()
        );
        Ok(truth)
    }

    /// Record whose replay name (or replay file) is `replay_name`
    pub fn find(&self, replay_name: &str) -> Result<&MatchTruth> {
        self.matches
            .iter()
            .find(|m| m.replay_name == replay_name)
            .or_else(|| {
                self.matches
                    .iter()
                    .find(|m| m.replay_file.as_deref() == Some(replay_name))
            })
            .ok_or_else(|| Error::TruthNotFound(replay_name.to_string()))
    }
}

impl MatchTruth {
    pub fn score(&self) -> Score {
        Score {
            left: self.match_info.score_left,
            right: self.match_info.score_right,
        }
    }

    pub fn duration(&self) -> Option<f32> {
        self.match_info
            .duration_seconds
            .filter(|d| d.is_finite() && *d > 0.0)
    }

    pub fn player(&self, name: &str) -> Option<&PlayerTruth> {
        self.players.get(name)
    }

    pub fn player_names(&self) -> impl Iterator<Item = &str> {
        self.players.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    CaseInsensitive,
    Similar,
}

/// A replay display name paired with a truth name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameMatch {
    pub display_name: String,
    pub truth_name: String,
    pub method: MatchMethod,
    pub similarity: f64,
}

/// One-to-one pairing of display names with truth names
///
/// Exact matches are taken first, then case-insensitive ones, then the most
/// similar remaining pairs at or above `cutoff`. A similar pair must agree on
/// the team tag (`2600_` in `2600_Alpha`) when both names carry one. Names
/// left over on either side stay unmatched.
pub fn match_names<'a, D, T>(display: D, truth: T, cutoff: f64) -> Vec<NameMatch>
where
    D: IntoIterator<Item = &'a str>,
    T: IntoIterator<Item = &'a str>,
{
    let display: Vec<&str> = display.into_iter().collect();
    let truth: Vec<&str> = truth.into_iter().collect();
    let mut used_display = BTreeSet::new();
    let mut used_truth = BTreeSet::new();
    let mut matches = Vec::new();

    let passes: [(MatchMethod, fn(&str, &str) -> bool); 2] = [
        (MatchMethod::Exact, |a, b| a == b),
        (MatchMethod::CaseInsensitive, |a, b| a.to_lowercase() == b.to_lowercase()),
    ];
    for (method, same) in passes {
        for (di, d) in display.iter().enumerate() {
            if used_display.contains(&di) {
                continue;
            }
            let hit = truth
                .iter()
                .enumerate()
                .find(|(ti, t)| !used_truth.contains(ti) && same(d, t));
            if let Some((ti, t)) = hit {
                used_display.insert(di);
                used_truth.insert(ti);
                matches.push(NameMatch {
                    display_name: d.to_string(),
                    truth_name: t.to_string(),
                    method,
                    similarity: 1.0,
                });
            }
        }
    }

    let mut candidates = Vec::new();
    for (di, d) in display.iter().enumerate() {
        if used_display.contains(&di) {
            continue;
        }
        for (ti, t) in truth.iter().enumerate() {
            if used_truth.contains(&ti) || !same_team_tag(d, t) {
                continue;
            }
            let score = similarity(&d.to_lowercase(), &t.to_lowercase());
            if score >= cutoff {
                candidates.push((score, di, ti));
            }
        }
    }
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
    for (score, di, ti) in candidates {
        if used_display.contains(&di) || used_truth.contains(&ti) {
            continue;
        }
        used_display.insert(di);
        used_truth.insert(ti);
        matches.push(NameMatch {
            display_name: display[di].to_string(),
            truth_name: truth[ti].to_string(),
            method: MatchMethod::Similar,
            similarity: score,
        });
    }

    for (di, d) in display.iter().enumerate() {
        if !used_display.contains(&di) {
            warn!("No truth record matches player name '{}'", d);
        }
    }
    matches
}

/// Leading `<tag>_` of a display name
fn team_tag(name: &str) -> Option<&str> {
    name.split_once('_')
        .map(|(tag, _)| tag)
        .filter(|tag| !tag.is_empty())
}

fn same_team_tag(a: &str, b: &str) -> bool {
    match (team_tag(a), team_tag(b)) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => true,
    }
}

/// Normalized Levenshtein similarity in `0..=1`
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    1.0 - previous[b.len()] as f64 / longest as f64
}
