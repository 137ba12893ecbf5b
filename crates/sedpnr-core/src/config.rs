//! Configuration System
//!
//! All simulation parameters are loaded from a TOML file. Every section carries
//! `#[serde(default)]`, so a partial file only overrides what it names.
//!
//! The flat `key = value` format of older parameter files is also accepted via
//! [`SimConfig::from_legacy_str`].

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "sedpnr.toml";

/// Complete, immutable simulation configuration.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub city: CityConfig,
    #[serde(default)]
    pub credibility: CredibilityConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub transitions: TransitionConfig,
    #[serde(default)]
    pub claims: ClaimConfig,
    #[serde(default)]
    pub rewiring: RewiringConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Returns the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads a flat `key = value` parameter file.
    pub fn from_legacy_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_legacy_str(&content))
    }

    /// Parses the flat `key = value` format. `#` starts a comment.
    ///
    /// Unknown keys and unparsable values are skipped with a warning and keep
    /// their defaults; this never fails.
    pub fn from_legacy_str(content: &str) -> Self {
        let mut config = Self::default();
        for (line_no, raw) in content.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!(line = line_no + 1, "ignoring malformed config line: {}", line);
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                continue;
            }
            if let Err(reason) = config.apply_legacy(key, value) {
                warn!(key, value, "ignoring config entry: {}", reason);
            }
        }
        config
    }

    fn apply_legacy(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn num<T: std::str::FromStr>(value: &str) -> Result<T, String> {
            value
                .parse::<T>()
                .map_err(|_| format!("cannot parse '{}'", value))
        }
        fn flag(value: &str) -> bool {
            value == "true" || value == "1"
        }

        let s = &mut self.simulation;
        let c = &mut self.city;
        let cr = &mut self.credibility;
        let n = &mut self.network;
        let t = &mut self.transitions;
        let cl = &mut self.claims;
        let r = &mut self.rewiring;

        match key {
            "population" => s.population = num(value)?,
            "timesteps" => s.ticks = num(value)?,
            "seed" => s.seed = num(value)?,
            "output_interval" => s.output_interval = num(value)?,

            "num_towns" => c.num_districts = num(value)?,
            "schools_per_town" => c.schools_per_district = num(value)?,
            "religious_per_town" => c.religious_per_district = num(value)?,
            "workplaces_per_town" => c.workplaces_per_district = num(value)?,
            "school_capacity" => c.school_capacity = num(value)?,
            "religious_capacity" => c.religious_capacity = num(value)?,
            "workplace_capacity" => c.workplace_capacity = num(value)?,
            "religious_participation_prob" => c.religious_participation_prob = num(value)?,

            "age_weight" => cr.age_weight = num(value)?,
            "edu_weight" => cr.edu_weight = num(value)?,
            "age_optimal" => cr.age_optimal = num(value)?,
            "age_spread" => cr.age_spread = num(value)?,
            "credibility_rejection_weight" => cr.rejection_weight = num(value)?,

            "max_connections" => n.max_connections = num(value)?,
            "base_interaction_prob" => n.base_interaction_prob = num(value)?,
            "same_school_weight" => n.same_school_weight = num(value)?,
            "same_religious_weight" => n.same_religious_weight = num(value)?,
            "same_workplace_weight" => n.same_workplace_weight = num(value)?,
            "same_town_weight" => n.same_district_weight = num(value)?,
            "age_group_weight" => n.age_group_weight = num(value)?,
            "ethnicity_weight" => n.ethnicity_weight = num(value)?,
            "homophily_strength" => n.homophily_strength = num(value)?,

            "prob_s_to_e" => t.prob_s_to_e = num(value)?,
            "prob_e_to_d" => t.prob_e_to_d = num(value)?,
            "prob_d_to_p" => t.prob_d_to_p = num(value)?,
            "prob_d_to_n" => t.prob_d_to_n = num(value)?,
            "prob_d_to_r" => t.prob_d_to_r = num(value)?,
            "prob_p_to_n" => t.prob_p_to_n = num(value)?,
            "prob_p_to_r" => t.prob_p_to_r = num(value)?,
            "prob_n_to_r" => t.prob_n_to_r = num(value)?,
            "min_dwell_ticks" => t.min_dwell_ticks = num(value)?,

            "misinfo_multiplier" => cl.misinfo_multiplier = num(value)?,
            "truth_threshold" => cl.truth_threshold = num(value)?,
            "misinfo_threshold" => cl.misinfo_threshold = num(value)?,

            "enable_connection_pruning" => r.enable_pruning = flag(value),
            "connection_patience" => r.connection_patience = num(value)?,

            "full_spatial_snapshot" => {
                self.output.spatial = if flag(value) {
                    SpatialMode::Full
                } else {
                    SpatialMode::Engaged
                }
            }
            _ => return Err("unknown key".to_string()),
        }
        Ok(())
    }

    /// Returns a copy with out-of-range values replaced by usable ones.
    ///
    /// Probabilities are clamped to [0, 1] and empty site counts are raised so
    /// every district owns at least one site of each type.
    pub fn sanitized(mut self) -> Self {
        let t = &mut self.transitions;
        for (name, p) in [
            ("prob_s_to_e", &mut t.prob_s_to_e),
            ("prob_e_to_d", &mut t.prob_e_to_d),
            ("prob_d_to_p", &mut t.prob_d_to_p),
            ("prob_d_to_n", &mut t.prob_d_to_n),
            ("prob_d_to_r", &mut t.prob_d_to_r),
            ("prob_p_to_n", &mut t.prob_p_to_n),
            ("prob_p_to_r", &mut t.prob_p_to_r),
            ("prob_n_to_r", &mut t.prob_n_to_r),
            ("religious_participation_prob", &mut self.city.religious_participation_prob),
            ("base_interaction_prob", &mut self.network.base_interaction_prob),
            ("truth_threshold", &mut self.claims.truth_threshold),
            ("misinfo_threshold", &mut self.claims.misinfo_threshold),
        ] {
            clamp_unit(name, p);
        }

        let c = &mut self.city;
        for (name, count) in [
            ("num_districts", &mut c.num_districts),
            ("schools_per_district", &mut c.schools_per_district),
            ("religious_per_district", &mut c.religious_per_district),
            ("workplaces_per_district", &mut c.workplaces_per_district),
        ] {
            if *count == 0 {
                warn!("{} must be at least 1, using 1", name);
                *count = 1;
            }
        }

        if self.simulation.output_interval == 0 {
            warn!("output_interval must be at least 1, using 1");
            self.simulation.output_interval = 1;
        }
        if self.claims.misinfo_multiplier < 0.0 {
            warn!("misinfo_multiplier must not be negative, using 0");
            self.claims.misinfo_multiplier = 0.0;
        }
        if self.credibility.age_spread < 0.0 {
            warn!("age_spread must not be negative, using 0");
            self.credibility.age_spread = 0.0;
        }
        self
    }
}

fn clamp_unit(name: &str, value: &mut f64) {
    if !value.is_finite() {
        warn!("{} is not finite, using 0", name);
        *value = 0.0;
    } else if !(0.0..=1.0).contains(value) {
        let clamped = value.clamp(0.0, 1.0);
        warn!("{} = {} outside [0, 1], using {}", name, value, clamped);
        *value = clamped;
    }
}

/// Run length and recording cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub population: usize,
    pub ticks: u64,
    pub seed: u64,
    /// Record counts and spatial rows every N ticks
    pub output_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population: 1000,
            ticks: 1000,
            seed: 42,
            output_interval: 1,
        }
    }
}

/// Districts, sites, and who gets assigned where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityConfig {
    pub num_districts: usize,
    pub schools_per_district: usize,
    pub religious_per_district: usize,
    pub workplaces_per_district: usize,
    pub school_capacity: usize,
    pub religious_capacity: usize,
    pub workplace_capacity: usize,
    /// Chance that an affiliated agent attends a religious site
    pub religious_participation_prob: f64,
    pub school_age_min: u32,
    pub school_age_max: u32,
    pub workplace_min_age: u32,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            num_districts: 5,
            schools_per_district: 3,
            religious_per_district: 5,
            workplaces_per_district: 10,
            school_capacity: 200,
            religious_capacity: 150,
            workplace_capacity: 500,
            religious_participation_prob: 0.6,
            school_age_min: 5,
            school_age_max: 22,
            workplace_min_age: 18,
        }
    }
}

/// Weights of the age/education credibility score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredibilityConfig {
    pub age_weight: f64,
    pub edu_weight: f64,
    pub age_optimal: f64,
    pub age_spread: f64,
    /// Extra misinformation rejection per unit of credibility
    pub rejection_weight: f64,
}

impl Default for CredibilityConfig {
    fn default() -> Self {
        Self {
            age_weight: 0.4,
            edu_weight: 0.6,
            age_optimal: 45.0,
            age_spread: 20.0,
            rejection_weight: 0.1,
        }
    }
}

/// Social network formation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub max_connections: usize,
    pub base_interaction_prob: f64,
    pub same_school_weight: f64,
    pub same_religious_weight: f64,
    pub same_workplace_weight: f64,
    pub same_district_weight: f64,
    pub age_group_weight: f64,
    pub ethnicity_weight: f64,
    /// Exponent applied to neighbor similarity during exposure
    pub homophily_strength: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            base_interaction_prob: 0.05,
            same_school_weight: 0.5,
            same_religious_weight: 0.4,
            same_workplace_weight: 0.45,
            same_district_weight: 0.2,
            age_group_weight: 0.3,
            ethnicity_weight: 0.2,
            homophily_strength: 2.0,
        }
    }
}

/// SEDPNR transition probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub prob_s_to_e: f64,
    pub prob_e_to_d: f64,
    pub prob_d_to_p: f64,
    pub prob_d_to_n: f64,
    pub prob_d_to_r: f64,
    pub prob_p_to_n: f64,
    pub prob_p_to_r: f64,
    pub prob_n_to_r: f64,
    /// Ticks an agent must spend in E/D/P/N before it may leave
    pub min_dwell_ticks: u32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            prob_s_to_e: 0.1,
            prob_e_to_d: 0.2,
            prob_d_to_p: 0.05,
            prob_d_to_n: 0.1,
            prob_d_to_r: 0.05,
            prob_p_to_n: 0.1,
            prob_p_to_r: 0.05,
            prob_n_to_r: 0.05,
            min_dwell_ticks: 0,
        }
    }
}

/// Claim mechanics and the claims seeded by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Exposure multiplier for misinformation
    pub misinfo_multiplier: f64,
    pub truth_threshold: f64,
    pub misinfo_threshold: f64,
    pub seed: Vec<ClaimSeed>,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            misinfo_multiplier: 6.0,
            truth_threshold: 0.8,
            misinfo_threshold: 0.3,
            seed: vec![
                ClaimSeed {
                    name: Some("Factual_Claim".to_string()),
                    misinformation: false,
                    seeding: Seeding::Global { propagators: 10 },
                },
                ClaimSeed {
                    name: Some("Misinfo_Claim_1".to_string()),
                    misinformation: true,
                    seeding: Seeding::PerDistrict { propagators: 5 },
                },
            ],
        }
    }
}

/// A claim to introduce at the start of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSeed {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub misinformation: bool,
    pub seeding: Seeding,
}

/// Where the initial propagators of a claim are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Seeding {
    /// Drawn from the whole population
    Global { propagators: usize },
    /// Drawn separately from every district
    PerDistrict { propagators: usize },
}

/// Adaptive pruning of unresponsive ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewiringConfig {
    pub enable_pruning: bool,
    /// Ticks a neighbor may stay Susceptible before the tie is cut
    pub connection_patience: u32,
}

impl Default for RewiringConfig {
    fn default() -> Self {
        Self {
            enable_pruning: true,
            connection_patience: 50,
        }
    }
}

/// Result files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub spatial: SpatialMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "output".to_string(),
            spatial: SpatialMode::Full,
        }
    }
}

/// Which agents appear in the spatial stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpatialMode {
    /// Every agent, every recorded tick
    #[default]
    Full,
    /// Only agents that are not Susceptible (plus everyone at tick 0)
    Engaged,
    /// No spatial stream
    Off,
}

impl std::str::FromStr for SpatialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(SpatialMode::Full),
            "engaged" => Ok(SpatialMode::Engaged),
            "off" | "none" => Ok(SpatialMode::Off),
            _ => Err(format!("unknown spatial mode '{}'", s)),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
