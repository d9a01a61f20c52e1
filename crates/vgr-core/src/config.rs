//! Decoder configuration
//!
//! Defaults encode the constants calibrated against the reference corpora.
//! Anything that varies per corpus (entity id ranges above all) lives here so
//! that no classifier carries a numeric literal of its own.
//!
//! ```toml
//! max_diagnostics = 256
//!
//! [entities]
//! players = { start = 56000, end = 58999 }
//!
//! [assist]
//! require_full_triplet = true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::{credit_action, structure};

/// Inclusive id range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start: u16,
    pub end: u16,
}

impl IdRange {
    pub const fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, id: u16) -> bool {
        (self.start..=self.end).contains(&id)
    }
}

/// Id-range fallback for entities that are not in the per-match directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRanges {
    pub system: u16,
    pub players: IdRange,
    pub objectives: IdRange,
}

impl Default for EntityRanges {
    fn default() -> Self {
        Self {
            system: 0,
            players: IdRange::new(1500, 1510),
            objectives: IdRange::new(60001, u16::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Names with one of these prefixes are game objects, not players
    pub non_player_prefixes: Vec<String>,
    /// Prefix of the block naming the match mode, e.g. `GameMode_HF_Ranked`
    pub mode_prefix: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            non_player_prefixes: vec!["GameMode".to_string()],
            mode_prefix: "GameMode_".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Upper bound for a plausible record timestamp
    pub max_timestamp_secs: f32,
    /// Keep unclassified `xx 04 yy` records in the event stream
    pub capture_unclassified: bool,
    /// Raw bytes kept per unclassified record
    pub unclassified_capture: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            max_timestamp_secs: 2400.0,
            capture_unclassified: false,
            unclassified_capture: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Records later than duration + grace are post-game ceremony
    pub grace_secs: f32,
    /// Largest kill/death time gap accepted when pairing eliminations
    pub pairing_max_dt: f32,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            grace_secs: 10.0,
            pairing_max_dt: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Bytes scanned after each kill record
    pub window_bytes: usize,
    /// Allowed distance from 1.0 for a flag value
    pub value_tolerance: f32,
    pub assist_action: u8,
    pub income_action: u8,
    /// Income companions must exceed this value
    pub income_min: f32,
    pub fraction_action: u8,
    /// Demand income and fraction companions next to the assist flag
    pub require_full_triplet: bool,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            window_bytes: 500,
            value_tolerance: 0.01,
            assist_action: credit_action::ASSIST,
            income_action: credit_action::INCOME,
            income_min: 1.5,
            fraction_action: credit_action::FRACTION,
            require_full_triplet: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub gold_actions: Vec<u8>,
    /// Values at or below this are flags, not income
    pub min_value: f32,
    pub max_value: f32,
    pub minion_action: u8,
    /// Calibrated gold is rounded to a multiple of this
    pub rounding: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            gold_actions: vec![credit_action::INCOME],
            min_value: 1.5,
            max_value: crate::layout::credit::MAX_PLAUSIBLE_VALUE,
            minion_action: credit_action::MINION_KILL,
            rounding: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    /// Bytes after an objective death searched for a player kill
    pub kill_window_bytes: usize,
    /// Objective deaths closer than this are one cluster
    pub cluster_secs: f32,
    /// Bytes around an objective death summed for bounty
    pub bounty_window_bytes: usize,
    pub bounty_actions: Vec<u8>,
    /// One team's bounty must exceed the other's by this factor
    pub bounty_ratio: f32,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            kill_window_bytes: 500,
            cluster_secs: 5.0,
            bounty_window_bytes: 2000,
            bounty_actions: vec![credit_action::INCOME, credit_action::PASSIVE_INCOME],
            bounty_ratio: 1.2,
        }
    }
}

/// Structure lifecycle census used to find the crystal push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeConfig {
    /// Little-endian ids counted as structures
    pub structures: IdRange,
    /// Bytes skipped after each `[id][00 00]` record
    pub record_stride: usize,
    /// A structure must first appear at or before this frame index
    pub early_frame: u32,
    /// A structure must have more records than this
    pub min_records: u32,
    /// Frames spanned by one crystal push
    pub window_frames: u32,
    /// Structures of one team destroyed inside the window
    pub min_destroyed: usize,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            structures: IdRange::new(1024, 19970),
            record_stride: structure::LEN,
            early_frame: 5,
            min_records: 50,
            window_frames: 5,
            min_destroyed: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Gold accuracy band used by leave-one-out validation
    pub tolerance: f64,
    /// Minion-kill accuracy band used by leave-one-out validation
    pub minion_kills_tolerance: f64,
    /// Similarity cutoff for near-miss player name matching
    pub name_match_cutoff: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            tolerance: 200.0,
            minion_kills_tolerance: 5.0,
            name_match_cutoff: 0.7,
        }
    }
}

/// Full decoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub entities: EntityRanges,
    pub directory: DirectoryConfig,
    pub events: EventConfig,
    pub correlation: CorrelationConfig,
    pub assist: AssistConfig,
    pub economy: EconomyConfig,
    pub objective: ObjectiveConfig,
    pub outcome: OutcomeConfig,
    pub calibration: CalibrationConfig,
    /// Diagnostics kept per match (counts are always complete)
    pub max_diagnostics: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            entities: EntityRanges::default(),
            directory: DirectoryConfig::default(),
            events: EventConfig::default(),
            correlation: CorrelationConfig::default(),
            assist: AssistConfig::default(),
            economy: EconomyConfig::default(),
            objective: ObjectiveConfig::default(),
            outcome: OutcomeConfig::default(),
            calibration: CalibrationConfig::default(),
            max_diagnostics: 256,
        }
    }
}

impl DecoderConfig {
    /// Create a new configuration builder
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::default()
    }

    /// Load and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded decoder config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no classifier can work with
    pub fn validate(&self) -> Result<()> {
        let ranges = [
            ("entities.players", self.entities.players),
            ("entities.objectives", self.entities.objectives),
            ("outcome.structures", self.outcome.structures),
        ];
        for (name, range) in ranges {
            if range.start > range.end {
                return invalid(format!(
                    "{} is inverted ({} > {})",
                    name, range.start, range.end
                ));
            }
        }
        if self.entities.players.contains(self.entities.system)
            || self.entities.objectives.contains(self.entities.system)
        {
            return invalid("entities.system overlaps a player or objective range".to_string());
        }

        let windows = [
            ("assist.window_bytes", self.assist.window_bytes),
            ("objective.kill_window_bytes", self.objective.kill_window_bytes),
            (
                "objective.bounty_window_bytes",
                self.objective.bounty_window_bytes,
            ),
            ("outcome.record_stride", self.outcome.record_stride),
            ("outcome.min_destroyed", self.outcome.min_destroyed),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, value)| *value == 0) {
            return invalid(format!("{} must be non-zero", name));
        }

        let non_negative = [
            ("assist.value_tolerance", self.assist.value_tolerance),
            ("correlation.grace_secs", self.correlation.grace_secs),
            ("correlation.pairing_max_dt", self.correlation.pairing_max_dt),
            ("objective.cluster_secs", self.objective.cluster_secs),
            ("economy.min_value", self.economy.min_value),
        ];
        if let Some((name, value)) = non_negative
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return invalid(format!("{} must be a non-negative number, got {}", name, value));
        }

        let max_ts = self.events.max_timestamp_secs;
        if max_ts.is_nan() || max_ts <= 0.0 {
            return invalid("events.max_timestamp_secs must be positive".to_string());
        }
        if self.economy.max_value <= self.economy.min_value {
            return invalid("economy.max_value must exceed economy.min_value".to_string());
        }
        if self.economy.rounding == 0 {
            return invalid("economy.rounding must be non-zero".to_string());
        }
        if self.objective.bounty_ratio < 1.0 {
            return invalid("objective.bounty_ratio must be at least 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.calibration.name_match_cutoff) {
            return invalid("calibration.name_match_cutoff must be within 0..=1".to_string());
        }
        if self.calibration.tolerance < 0.0 || self.calibration.minion_kills_tolerance < 0.0 {
            return invalid("calibration tolerances must be non-negative".to_string());
        }

        Ok(())
    }
}

fn invalid(message: String) -> Result<()> {
    Err(Error::InvalidConfig(message))
}

/// Builder for DecoderConfig
#[derive(Debug, Clone, Default)]
pub struct DecoderConfigBuilder {
    player_range: Option<IdRange>,
    objective_range: Option<IdRange>,
    assist_window: Option<usize>,
    require_full_triplet: Option<bool>,
    grace_secs: Option<f32>,
    capture_unclassified: Option<bool>,
    max_diagnostics: Option<usize>,
}

impl DecoderConfigBuilder {
    /// Set the fallback player id range
    pub fn player_range(mut self, start: u16, end: u16) -> Self {
        self.player_range = Some(IdRange::new(start, end));
        self
    }

    /// Set the objective id range
    pub fn objective_range(mut self, start: u16, end: u16) -> Self {
        self.objective_range = Some(IdRange::new(start, end));
        self
    }

    /// Set the byte window scanned after each kill
    pub fn assist_window(mut self, bytes: usize) -> Self {
        self.assist_window = Some(bytes);
        self
    }

    /// Require income and fraction companions for an assist
    pub fn require_full_triplet(mut self, enabled: bool) -> Self {
        self.require_full_triplet = Some(enabled);
        self
    }

    /// Set the post-game grace period
    pub fn grace_secs(mut self, secs: f32) -> Self {
        self.grace_secs = Some(secs);
        self
    }

    /// Keep unclassified records in the event stream
    pub fn capture_unclassified(mut self, enabled: bool) -> Self {
        self.capture_unclassified = Some(enabled);
        self
    }

    pub fn max_diagnostics(mut self, max: usize) -> Self {
        self.max_diagnostics = Some(max);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<DecoderConfig> {
        let mut config = DecoderConfig::default();
        if let Some(range) = self.player_range {
            config.entities.players = range;
        }
        if let Some(range) = self.objective_range {
            config.entities.objectives = range;
        }
        if let Some(bytes) = self.assist_window {
            config.assist.window_bytes = bytes;
        }
        if let Some(enabled) = self.require_full_triplet {
            config.assist.require_full_triplet = enabled;
        }
        if let Some(secs) = self.grace_secs {
            config.correlation.grace_secs = secs;
        }
        if let Some(enabled) = self.capture_unclassified {
            config.events.capture_unclassified = enabled;
        }
        if let Some(max) = self.max_diagnostics {
            config.max_diagnostics = max;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.assist.window_bytes, 500);
        assert_eq!(config.assist.assist_action, 0x0B);
        assert_eq!(config.economy.gold_actions, vec![0x06]);
        assert!(config.entities.players.contains(1505));
        assert!(!config.entities.players.contains(56325));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DecoderConfig::from_toml(
            r#"
            [entities]
            players = { start = 56000, end = 58999 }

            [assist]
            require_full_triplet = true
            "#,
        )
        .unwrap();

        assert_eq!(config.entities.players, IdRange::new(56000, 58999));
        assert_eq!(config.entities.system, 0);
        assert!(config.assist.require_full_triplet);
        assert_eq!(config.assist.window_bytes, 500);
        assert_eq!(config.max_diagnostics, 256);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let inverted = DecoderConfig::from_toml("[entities]\nplayers = { start = 10, end = 5 }");
        assert!(matches!(inverted, Err(Error::InvalidConfig(_))));

        let zero_window = DecoderConfig::builder().assist_window(0).build();
        assert!(matches!(zero_window, Err(Error::InvalidConfig(_))));

        let negative = DecoderConfig::builder().grace_secs(-1.0).build();
        assert!(matches!(negative, Err(Error::InvalidConfig(_))));

        let stride = DecoderConfig::from_toml("[outcome]\nrecord_stride = 0");
        assert!(matches!(stride, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(matches!(
            DecoderConfig::from_toml("max_diagnostics = \"many\""),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_builder_overrides() {
        let config = DecoderConfig::builder()
            .player_range(56000, 58999)
            .require_full_triplet(true)
            .capture_unclassified(true)
            .max_diagnostics(4)
            .build()
            .unwrap();

        assert_eq!(config.entities.players.start, 56000);
        assert!(config.assist.require_full_triplet);
        assert!(config.events.capture_unclassified);
        assert_eq!(config.max_diagnostics, 4);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[objective]\ncluster_secs = 3.0").unwrap();

        let config = DecoderConfig::load(file.path()).unwrap();
        assert_eq!(config.objective.cluster_secs, 3.0);

        let missing = DecoderConfig::load("does-not-exist.toml").unwrap_err();
        assert!(missing.is_not_found());
    }
}
