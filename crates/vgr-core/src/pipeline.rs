//! Per-match pipeline and two-pass corpus processing
//!
//! A match is analyzed in strict order: frames, directory, events, tallies,
//! sides, objectives and outcome. Analysis needs no other match. Finalizing applies a
//! calibration snapshot fitted on the *other* matches of the corpus, so a
//! corpus is analyzed in parallel first and finalized second.

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::assist::{AssistClassifier, AssistTally};
use crate::calibration::{CalibrationSample, CalibrationSnapshot, MatchObservation, StatCategory};
use crate::config::DecoderConfig;
use crate::correlate::{Elimination, KillDeathTally, correlate, pair_eliminations, post_game_cutoff};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::directory::EntityDirectory;
use crate::economy::{EconomyTotals, aggregate};
use crate::entity::{EntityId, EntityResolver};
use crate::error::Result;
use crate::event::{EventDecoder, EventStream, HeaderRegistry};
use crate::hero::Hero;
use crate::objective::{ObjectiveClassifier, ObjectiveEvent};
use crate::outcome::{MatchOutcome, StructureCensus, detect_outcome};
use crate::replay::{Frame, ReplayBytes};
use crate::report::{DurationSource, MatchResult, PlayerStats, StatProvenance, TruthLink};
use crate::side::{LabelTotals, Side, SideAssignment, resolve_sides};
use crate::truth::{MatchTruth, NameMatch, TruthFile, match_names};

/// Frames of one match, as supplied by the frame store
#[derive(Debug, Clone)]
pub struct MatchInput {
    pub match_id: String,
    pub frames: Vec<Frame>,
}

/// Everything learned about one match before calibration
#[derive(Debug, Clone)]
pub struct MatchAnalysis {
    pub match_id: String,
    pub directory: EntityDirectory,
    pub stream: EventStream,
    pub tally: KillDeathTally,
    pub assists: AssistTally,
    pub economy: EconomyTotals,
    pub objectives: Vec<ObjectiveEvent>,
    pub eliminations: Vec<Elimination>,
    pub label_totals: Vec<LabelTotals>,
    pub sides: SideAssignment,
    pub outcome: Option<MatchOutcome>,
    pub winner: Option<Side>,
    pub duration: Option<f32>,
    pub duration_source: DurationSource,
    pub truth: Option<MatchTruth>,
    pub name_matches: Vec<NameMatch>,
    pub diagnostics: Diagnostics,
}

impl MatchAnalysis {
    /// Raw stats next to truth values for every matched player
    pub fn observation(&self) -> Option<MatchObservation> {
        let truth = self.truth.as_ref()?;
        let mut samples = Vec::new();
        for name_match in &self.name_matches {
            let (Some(player), Some(expected)) = (
                self.directory.by_name(&name_match.display_name),
                truth.player(&name_match.truth_name),
            ) else {
                continue;
            };
            samples.push(CalibrationSample {
                category: StatCategory::Gold,
                raw: self.economy.gold_raw(player.entity_id),
                truth: expected.gold,
            });
            if let Some(minion_kills) = expected.minion_kills {
                samples.push(CalibrationSample {
                    category: StatCategory::MinionKills,
                    raw: self.economy.minion_kills_raw(player.entity_id),
                    truth: minion_kills,
                });
            }
        }
        Some(MatchObservation {
            match_id: self.match_id.clone(),
            samples,
        })
    }

    fn truth_link(&self, display_name: &str) -> Option<TruthLink> {
        let truth = self.truth.as_ref()?;
        let name_match = self
            .name_matches
            .iter()
            .find(|m| m.display_name == display_name)?;
        let player = truth.player(&name_match.truth_name)?;
        Some(TruthLink {
            name: name_match.truth_name.clone(),
            hero_name: player.hero_name.clone(),
            method: name_match.method,
        })
    }
}

/// Runs the decode-and-classify pipeline with one configuration
#[derive(Debug)]
pub struct MatchDecoder {
    config: DecoderConfig,
    registry: HeaderRegistry,
}

impl MatchDecoder {
    pub fn new(config: DecoderConfig) -> Result<Self> {
        Self::with_registry(config, HeaderRegistry::standard())
    }

    /// Decoder with extra or replaced header specs
    pub fn with_registry(config: DecoderConfig, registry: HeaderRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn registry(&self) -> &HeaderRegistry {
        &self.registry
    }

    /// Decode one match; fails only when there is no frame data
    pub fn analyze(
        &self,
        match_id: &str,
        frames: Vec<Frame>,
        truth: Option<&MatchTruth>,
    ) -> Result<MatchAnalysis> {
        let replay = ReplayBytes::from_frames(frames)?;
        let config = &self.config;
        let mut diagnostics = Diagnostics::new(config.max_diagnostics);
        debug!(
            "{}: {} bytes in {} frames",
            match_id,
            replay.len(),
            replay.spans().len()
        );

        let directory =
            EntityDirectory::build(replay.first_frame(), &config.directory, &mut diagnostics);
        if let Some(mode) = directory.mode()
            && directory.len() != mode.roster_size()
        {
            warn!(
                "{}: {} expects {} players, directory has {}",
                match_id,
                mode.tag,
                mode.roster_size(),
                directory.len()
            );
            diagnostics.push(Diagnostic::RosterMismatch {
                mode: mode.tag.clone(),
                expected: mode.roster_size(),
                found: directory.len(),
            });
        }
        let stream =
            EventDecoder::new(&self.registry, &config.events).decode(&replay, &mut diagnostics);

        let (duration, duration_source) = match truth.and_then(MatchTruth::duration) {
            Some(d) => (Some(d), DurationSource::Truth),
            None => match stream.deaths().filter_map(|e| e.timestamp()).reduce(f32::max) {
                Some(d) => (Some(d), DurationSource::DeathTimestamps),
                None => (None, DurationSource::Unknown),
            },
        };

        let resolver = EntityResolver::new(&config.entities, &directory);
        let tally = correlate(
            &stream,
            &resolver,
            &directory,
            &config.correlation,
            duration,
            &mut diagnostics,
        );
        let cutoff = post_game_cutoff(duration, &config.correlation);
        let assists = AssistClassifier::new(&config.assist, &directory, config.economy.max_value)
            .classify(&stream, cutoff);
        let economy = aggregate(replay.as_bytes(), &stream, &directory, &config.economy);
        let objectives =
            ObjectiveClassifier::new(&config.objective, &resolver, &directory).classify(&stream);
        let eliminations = pair_eliminations(&stream, &directory, &config.correlation, duration);

        let label_totals: Vec<LabelTotals> = directory
            .team_labels()
            .into_iter()
            .map(|label| {
                let on_team = |id: EntityId| directory.team_of(id) == Some(label);
                LabelTotals {
                    label,
                    kills: tally.total_kills(on_team),
                    deaths: tally.total_deaths(on_team),
                }
            })
            .collect();
        let sides = resolve_sides(&label_totals, truth.map(MatchTruth::score));
        if let SideAssignment::Ambiguous { reason, .. } = &sides {
            warn!("{}: team sides unresolved: {}", match_id, reason);
        }
        let census = StructureCensus::scan(&replay, &config.outcome);
        let outcome = detect_outcome(&census, &config.outcome);
        let winner = outcome.as_ref().map(|o| o.winner);
        let reported_winner = truth
            .and_then(|t| t.match_info.winner.as_deref())
            .and_then(|w| w.to_ascii_lowercase().parse::<Side>().ok());
        if let (Some(found), Some(reported)) = (winner, reported_winner)
            && found != reported
        {
            warn!(
                "{}: crystal push says {} won, truth says {}",
                match_id, found, reported
            );
        }

        let name_matches = truth
            .map(|t| {
                match_names(
                    directory.players().iter().map(|p| p.display_name.as_str()),
                    t.player_names(),
                    config.calibration.name_match_cutoff,
                )
            })
            .unwrap_or_default();

        info!(
            "{}: {} players, {} events ({} unclassified), {} kills, {} assists, {} objectives",
            match_id,
            directory.len(),
            stream.len(),
            stream.unclassified_count(),
            tally.total_kills(|_| true),
            assists.per_entity.values().map(Vec::len).sum::<usize>(),
            objectives.len()
        );

        Ok(MatchAnalysis {
            match_id: match_id.to_string(),
            directory,
            stream,
            tally,
            assists,
            economy,
            objectives,
            eliminations,
            label_totals,
            sides,
            outcome,
            winner,
            duration,
            duration_source,
            truth: truth.cloned(),
            name_matches,
            diagnostics,
        })
    }

    /// Apply calibration and assemble the result
    pub fn finalize(&self, analysis: MatchAnalysis, snapshot: &CalibrationSnapshot) -> MatchResult {
        let mut diagnostics = analysis.diagnostics.clone();
        for category in StatCategory::ALL {
            if snapshot.fit(category).is_none() && !analysis.directory.is_empty() {
                diagnostics.push(Diagnostic::CalibrationUnavailable {
                    category,
                    reason: format!("no fit from {} other matches", snapshot.matches),
                });
            }
        }

        let gold_step = f64::from(self.config.economy.rounding);
        let players = analysis
            .directory
            .players()
            .iter()
            .map(|record| {
                let id = record.entity_id;
                let hero = Hero::from_binary_id(record.hero_id);
                let truth = analysis.truth_link(&record.display_name);
                if let (Some(hero), Some(link)) = (hero, &truth)
                    && Hero::from_name(&link.hero_name) != Some(hero)
                {
                    warn!(
                        "{}: {} plays {} in the replay, {} in truth",
                        analysis.match_id, record.display_name, hero, link.hero_name
                    );
                    diagnostics.push(Diagnostic::HeroMismatch {
                        entity_id: id,
                        replay: hero,
                        truth: link.hero_name.clone(),
                    });
                }
                let tally = analysis.tally.get(id);
                let gold = analysis.economy.gold.get(&id);
                let minions = analysis.economy.minion_kills.get(&id);
                PlayerStats {
                    name: record.display_name.clone(),
                    entity_id: id,
                    hero_id: record.hero_id,
                    hero,
                    team_label: record.team_label,
                    side: analysis.sides.side_of(record.team_label),
                    kills: analysis.tally.kills(id),
                    deaths: analysis.tally.deaths(id),
                    assists: analysis.assists.assists(id),
                    gold: snapshot.estimate(
                        StatCategory::Gold,
                        analysis.economy.gold_raw(id),
                        gold_step,
                    ),
                    minion_kills: snapshot.estimate(
                        StatCategory::MinionKills,
                        analysis.economy.minion_kills_raw(id),
                        1.0,
                    ),
                    truth,
                    provenance: StatProvenance {
                        kill_offsets: tally.map(|t| t.kill_offsets.clone()).unwrap_or_default(),
                        death_offsets: tally.map(|t| t.death_offsets.clone()).unwrap_or_default(),
                        assists: analysis.assists.credits(id).to_vec(),
                        gold_offsets: gold.map(|t| t.offsets.clone()).unwrap_or_default(),
                        minion_kill_offsets: minions.map(|t| t.offsets.clone()).unwrap_or_default(),
                    },
                }
            })
            .collect();

        MatchResult {
            match_id: analysis.match_id,
            generated_at: Utc::now(),
            duration: analysis.duration,
            duration_source: analysis.duration_source,
            sides: analysis.sides,
            mode: analysis.directory.mode().cloned(),
            winner: analysis.winner,
            outcome: analysis.outcome,
            players,
            objectives: analysis.objectives,
            eliminations: analysis.eliminations,
            unattributed: analysis.tally.unattributed,
            post_game_deaths: analysis.tally.post_game_deaths,
            post_game_kills: analysis.assists.post_game_kills,
            unclassified_count: analysis.stream.unclassified_count(),
            calibration_excluded: snapshot.excluded.clone(),
            diagnostic_counts: diagnostics.counts(),
            diagnostics: diagnostics.entries().to_vec(),
        }
    }

    /// First pass over a corpus: analyze every match in parallel
    pub fn analyze_corpus(
        &self,
        inputs: Vec<MatchInput>,
        truth: Option<&TruthFile>,
    ) -> Vec<(String, Result<MatchAnalysis>)> {
        inputs
            .into_par_iter()
            .map(|input| {
                let record = truth.and_then(|t| match t.find(&input.match_id) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("{}", e);
                        None
                    }
                });
                let analysis = self.analyze(&input.match_id, input.frames, record);
                (input.match_id, analysis)
            })
            .collect()
    }

    /// Decode a corpus: analyze every match, then finalize each with a
    /// snapshot fitted on the other matches
    ///
    /// `fallback` is used for any match whose leave-one-out fold has no fits
    /// at all, e.g. a corpus of one.
    pub fn decode_corpus(
        &self,
        inputs: Vec<MatchInput>,
        truth: Option<&TruthFile>,
        fallback: Option<&CalibrationSnapshot>,
    ) -> Vec<(String, Result<MatchResult>)> {
        let analyses = self.analyze_corpus(inputs, truth);

        let observations: Vec<MatchObservation> = analyses
            .iter()
            .filter_map(|(_, a)| a.as_ref().ok())
            .filter_map(MatchAnalysis::observation)
            .collect();
        info!(
            "Corpus: {} matches, {} with truth",
            analyses.len(),
            observations.len()
        );

        analyses
            .into_par_iter()
            .map(|(match_id, analysis)| {
                let result = analysis.map(|analysis| {
                    let fold =
                        CalibrationSnapshot::from_observations(&observations, Some(&match_id));
                    let snapshot = match fallback {
                        Some(fallback) if fold.fits.is_empty() => fallback.clone(),
                        _ => fold,
                    };
                    self.finalize(analysis, &snapshot)
                });
                (match_id, result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mode::GameMap;
    use crate::synth::ReplayBuilder;
    use crate::truth::{MatchInfo, PlayerTruth};
    use std::collections::BTreeMap;

    fn frames(builder: ReplayBuilder) -> Vec<Frame> {
        builder
            .into_frames()
            .into_iter()
            .enumerate()
            .map(|(i, data)| Frame::new(i as u32, data))
            .collect()
    }

    /// Two-a-side match: label 1 scores 2, label 2 scores 1
    fn skirmish(gold_scale: f32) -> ReplayBuilder {
        ReplayBuilder::new()
            .player("Alpha", 1500, 11, 1)
            .player("Bravo", 1501, 12, 1)
            .player("Charlie", 1502, 13, 2)
            .player("Delta", 1503, 14, 2)
            .next_frame()
            .credit(1500, 500.0 * gold_scale, 0x06)
            .credit(1501, 300.0 * gold_scale, 0x06)
            .credit(1502, 400.0 * gold_scale, 0x06)
            .credit(1503, 200.0 * gold_scale, 0x06)
            .kill(1500, Some(120.0))
            .credit(1501, 60.0, 0x06)
            .credit(1501, 1.0, 0x0B)
            .credit(1501, 0.5, 0x0C)
            .death(1502, 120.4)
            .gap(600)
            .kill(1502, Some(300.0))
            .credit(1503, 1.0, 0x0E)
            .death(1501, 300.1)
            .gap(600)
            .kill(1501, Some(450.0))
            .death(1503, 451.0)
    }

    fn truth(name: &str, gold: [f64; 4]) -> MatchTruth {
        let names = ["Alpha", "Bravo", "Charlie", "delta"];
        let players = names
            .iter()
            .zip(gold)
            .map(|(n, g)| {
                (
                    n.to_string(),
                    PlayerTruth {
                        hero_name: format!("Hero{}", n.len()),
                        team: None,
                        kills: 0,
                        deaths: 0,
                        assists: 0,
                        gold: g,
                        minion_kills: None,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        MatchTruth {
            replay_name: name.to_string(),
            replay_file: None,
            match_info: MatchInfo {
                duration_seconds: Some(600.0),
                score_left: 1,
                score_right: 2,
                winner: None,
            },
            players,
        }
    }

    #[test]
    fn test_analyze_and_finalize() {
        let decoder = MatchDecoder::new(DecoderConfig::default()).unwrap();
        let record = truth("m1", [700.0, 500.0, 600.0, 400.0]);
        let analysis = decoder
            .analyze("m1", frames(skirmish(1.0)), Some(&record))
            .unwrap();

        assert_eq!(analysis.duration, Some(600.0));
        assert_eq!(analysis.duration_source, DurationSource::Truth);
        // Label 2 has one kill and matches the left score of 1
        assert_eq!(analysis.sides.label_of(Side::Left), Some(2));
        // No structure records, so no crystal push and no winner
        assert_eq!(analysis.outcome, None);
        assert_eq!(analysis.winner, None);
        assert_eq!(analysis.name_matches.len(), 4);

        let observation = analysis.observation().unwrap();
        assert_eq!(observation.samples.len(), 4);

        let result = decoder.finalize(analysis, &CalibrationSnapshot::empty());
        let alpha = result.player("Alpha").unwrap();
        assert_eq!((alpha.kills, alpha.deaths, alpha.assists), (1, 0, 0));
        assert_eq!(alpha.side, Some(Side::Right));
        assert_eq!(alpha.hero_name(), Some("Hero5"));

        let bravo = result.player("Bravo").unwrap();
        assert_eq!((bravo.kills, bravo.deaths, bravo.assists), (1, 1, 1));
        assert_eq!(bravo.gold.raw, 360.0);
        assert!(!bravo.gold.calibrated);
        assert_eq!(bravo.provenance.assists.len(), 1);

        assert_eq!(result.side_kills(Side::Left), 1);
        assert_eq!(result.side_kills(Side::Right), 2);
        assert_eq!(result.player("Delta").unwrap().minion_kills.raw, 1.0);
        assert_eq!(result.diagnostic_counts.calibration_unavailable, 2);
    }

    #[test]
    fn test_winner_comes_from_crystal_push() {
        let mut config = DecoderConfig::default();
        config.outcome.structures = crate::config::IdRange::new(33000, 37000);
        config.outcome.early_frame = 2;
        config.outcome.min_records = 8;
        let decoder = MatchDecoder::new(config).unwrap();

        // Label 2 (left, one kill) brings down every upper structure by frame 12
        let mut builder = skirmish(1.0).next_frame();
        for frame in 2..=16 {
            for id in 33000..33006 {
                builder = builder.structure(id);
            }
            if frame <= 12 {
                for id in 36000..36006 {
                    builder = builder.structure(id);
                }
            }
            builder = builder.next_frame();
        }

        let record = truth("m1", [700.0, 500.0, 600.0, 400.0]);
        let analysis = decoder.analyze("m1", frames(builder), Some(&record)).unwrap();
        let outcome = analysis.outcome.clone().unwrap();
        assert_eq!(outcome.crystal_frame, 12);
        assert_eq!(outcome.destroyed, [0, 6]);
        assert_eq!(analysis.winner, Some(Side::Left));

        let result = decoder.finalize(analysis, &CalibrationSnapshot::empty());
        assert!(result.side_kills(Side::Left) < result.side_kills(Side::Right));
        assert_eq!(result.winner, Some(Side::Left));
    }

    #[test]
    fn test_mode_and_heroes_are_reported() {
        let decoder = MatchDecoder::new(DecoderConfig::default()).unwrap();
        let builder = ReplayBuilder::new()
            .player("GameMode_HF_Ranked", 0, 0, 0)
            .player("Alpha", 1500, 0x0101, 1)
            .player("Bravo", 1501, 0xF300, 2)
            .player("Charlie", 1502, 0x0042, 2)
            .next_frame()
            .credit(1500, 250.0, 0x06);
        let record: MatchTruth = serde_json::from_str(
            r#"{"replay_name": "m3", "match_info": {"score_left": 0, "score_right": 0},
                "players": {
                    "Alpha": {"hero_name": "ardan", "kills": 0, "deaths": 0, "assists": 0, "gold": 300},
                    "Bravo": {"hero_name": "Catherine", "kills": 0, "deaths": 0, "assists": 0, "gold": 300},
                    "Charlie": {"hero_name": "Vox", "kills": 0, "deaths": 0, "assists": 0, "gold": 300}
                }}"#,
        )
        .unwrap();

        let analysis = decoder.analyze("m3", frames(builder), Some(&record)).unwrap();
        assert_eq!(analysis.diagnostics.counts().roster_mismatch, 1);

        let result = decoder.finalize(analysis, &CalibrationSnapshot::empty());
        let mode = result.mode.as_ref().unwrap();
        assert_eq!(mode.team_size, 3);
        assert_eq!(mode.map, GameMap::HalcyonFold);

        let alpha = result.player("Alpha").unwrap();
        assert_eq!(alpha.hero, Some(Hero::Ardan));
        assert_eq!(alpha.hero_name(), Some("Ardan"));
        // Replay hero wins over the truth record, which is only a cross-check
        assert_eq!(result.player("Bravo").unwrap().hero_name(), Some("Ringo"));
        // Unknown id: the truth record names the hero
        assert_eq!(result.player("Charlie").unwrap().hero_name(), Some("Vox"));
        assert_eq!(result.diagnostic_counts.hero_mismatch, 1);
        assert!(result.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::HeroMismatch { replay: Hero::Ringo, truth, .. } if truth == "Catherine"
        )));
    }

    #[test]
    fn test_empty_match_still_yields_result() {
        let decoder = MatchDecoder::new(DecoderConfig::default()).unwrap();
        let analysis = decoder
            .analyze("blank", vec![Frame::new(0, vec![0xAA; 64])], None)
            .unwrap();
        assert_eq!(analysis.duration_source, DurationSource::Unknown);
        assert!(!analysis.sides.is_resolved());
        assert!(analysis.observation().is_none());

        let result = decoder.finalize(analysis, &CalibrationSnapshot::empty());
        assert!(result.players.is_empty());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_no_frames_is_fatal() {
        let decoder = MatchDecoder::new(DecoderConfig::default()).unwrap();
        let err = decoder.analyze("none", Vec::new(), None).unwrap_err();
        assert!(matches!(err, Error::NoFrameData));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DecoderConfig::default();
        config.assist.window_bytes = 0;
        assert!(matches!(
            MatchDecoder::new(config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_decode_corpus_leave_one_out() {
        let decoder = MatchDecoder::new(DecoderConfig::default()).unwrap();
        // Truth gold is exactly 1.25 x raw gold in every match
        let scales = [1.0_f32, 1.5, 2.0];
        let mut truth_file = TruthFile::default();
        let mut inputs = Vec::new();
        for (i, scale) in scales.iter().enumerate() {
            let id = format!("m{}", i);
            let raw = [500.0, 360.0, 400.0, 200.0].map(|g: f64| {
                if g == 360.0 {
                    300.0 * f64::from(*scale) + 60.0
                } else {
                    g * f64::from(*scale)
                }
            });
            truth_file.matches.push(truth(&id, raw.map(|g| g * 1.25)));
            inputs.push(MatchInput {
                match_id: id,
                frames: frames(skirmish(*scale)),
            });
        }
        inputs.push(MatchInput {
            match_id: "broken".to_string(),
            frames: Vec::new(),
        });

        let results = decoder.decode_corpus(inputs, Some(&truth_file), None);
        assert_eq!(results.len(), 4);

        for (id, result) in &results {
            if id == "broken" {
                assert!(result.is_err());
                continue;
            }
            let result = result.as_ref().unwrap();
            assert_eq!(result.calibration_excluded.as_deref(), Some(id.as_str()));
            let alpha = result.player("Alpha").unwrap();
            assert!(alpha.gold.calibrated);
            assert!((alpha.gold.value - alpha.gold.raw * 1.25).abs() <= 100.0);
        }
    }
}
