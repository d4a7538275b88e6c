//! Configuration system for the cricket mating model.
//!
//! All biologically calibrated constants live here. Supports YAML
//! configuration files with defaults taken from field and lab data.

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Standard deviations a truncated draw may sit outside its accepted range
const OUT_OF_RANGE_SDS: f64 = 5.0;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub acoustics: AcousticConfig,
    #[serde(default)]
    pub calling: CallingConfig,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub habitat: HabitatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sound levels and hearing (all levels in dB SPL)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcousticConfig {
    /// Mean source level of an unmodified caller
    pub source_spl_mean: f64,
    /// SD of the source level
    pub source_spl_sd: f64,
    /// Mean boost gained from calling through a leaf baffle
    pub baffle_advantage_mean: f64,
    /// SD of the baffle boost
    pub baffle_advantage_sd: f64,
    /// Quietest level a receiver can detect
    pub detection_threshold: f64,
    /// Level at or above which phonotaxis is certain
    pub guaranteed_movement_spl: f64,
    /// Two sources closer than this are indistinguishable to a receiver
    pub preference_tolerance: f64,
    /// Distance (cm) at which source levels were measured
    pub reference_distance: f64,
}

/// Calling propensity and effort of signallers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallingConfig {
    /// Fraction of non-baffling males that call on a given night
    pub call_proportion: f64,
    /// Mean fraction of the night spent calling (truncated to (0, 1])
    pub effort_mean: f64,
    /// SD of the calling effort
    pub effort_sd: f64,
}

/// Parameters of a log-normal distribution
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LogNormalParams {
    pub mu: f64,
    pub sigma: f64,
}

/// Movement, dispersal and mating-contact parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Female speed distribution (cm/timestep, split over two axes)
    pub female_velocity: LogNormalParams,
    /// Male speed distribution (cm/timestep, split over two axes)
    pub male_velocity: LogNormalParams,
    /// Female cross-patch dispersal cutoff distribution
    pub female_dispersal: LogNormalParams,
    /// Male cross-patch dispersal cutoff distribution
    pub male_dispersal: LogNormalParams,
    /// Per-step probability that a female moves within her patch
    pub female_within_patch: f64,
    /// Per-step probability that a male moves within his patch
    pub male_within_patch: f64,
    /// Per-step probability that a female leaves her patch
    pub female_across_patch: f64,
    /// Per-step probability that a male leaves his patch
    pub male_across_patch: f64,
    /// Probability that an already mated female still performs phonotaxis
    pub mated_phonotaxis: f64,
    /// Male-female distance (cm) that counts as a mating contact
    pub mating_distance: f64,
    /// Enables cross-patch relocation (off in the calibrated model)
    pub cross_patch_movement: bool,
}

/// Timescales, in timesteps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Timesteps in one night
    pub night_length: u32,
    /// How often males re-decide whether to call
    pub decision_interval: u32,
    /// Mating plus refractory period
    pub mating_duration: u32,
}

/// Spatial structure of the habitat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitatConfig {
    /// Patches per square metre
    pub patch_density: f64,
    /// Mean patch side length (cm)
    pub patch_size_mean: f64,
    /// SD of patch side length (cm)
    pub patch_size_sd: f64,
    /// Centre distance (cm) beyond which patches are acoustically independent
    pub adjacency_threshold: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is unset (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for AcousticConfig {
    fn default() -> Self {
        Self {
            source_spl_mean: 60.8,
            source_spl_sd: 3.6,
            baffle_advantage_mean: 10.1,
            baffle_advantage_sd: 1.3,
            detection_threshold: 45.0,
            guaranteed_movement_spl: 60.0,
            preference_tolerance: 3.0,
            reference_distance: 20.0,
        }
    }
}

impl Default for CallingConfig {
    fn default() -> Self {
        Self {
            call_proportion: 0.5,
            effort_mean: 0.5,
            effort_sd: 0.26,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            female_velocity: LogNormalParams { mu: 2.95, sigma: 1.03 },
            male_velocity: LogNormalParams { mu: 2.59, sigma: 0.88 },
            female_dispersal: LogNormalParams { mu: 2.1, sigma: 0.82 },
            male_dispersal: LogNormalParams { mu: 1.93, sigma: 0.75 },
            female_within_patch: 0.8,
            male_within_patch: 0.35,
            female_across_patch: 0.1598,
            male_across_patch: 0.1197,
            mated_phonotaxis: 0.35,
            mating_distance: 5.0,
            cross_patch_movement: false,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            night_length: 72,
            decision_interval: 72,
            mating_duration: 6,
        }
    }
}

impl Default for HabitatConfig {
    fn default() -> Self {
        Self {
            patch_density: 1.625,
            patch_size_mean: 81.21,
            patch_size_sd: 36.40,
            adjacency_threshold: 1000.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if t.night_length == 0 || t.decision_interval == 0 || t.mating_duration == 0 {
            return Err(SimError::config(
                "night_length, decision_interval and mating_duration must be > 0",
            ));
        }

        let m = &self.movement;
        let probabilities = [
            ("call_proportion", self.calling.call_proportion),
            ("female_within_patch", m.female_within_patch),
            ("male_within_patch", m.male_within_patch),
            ("female_across_patch", m.female_across_patch),
            ("male_across_patch", m.male_across_patch),
            ("mated_phonotaxis", m.mated_phonotaxis),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::config(format!("{name} must be within [0, 1], got {p}")));
            }
        }

        let spreads = [
            ("source_spl_sd", self.acoustics.source_spl_sd),
            ("baffle_advantage_sd", self.acoustics.baffle_advantage_sd),
            ("effort_sd", self.calling.effort_sd),
            ("patch_size_sd", self.habitat.patch_size_sd),
            ("female_velocity.sigma", m.female_velocity.sigma),
            ("male_velocity.sigma", m.male_velocity.sigma),
            ("female_dispersal.sigma", m.female_dispersal.sigma),
            ("male_dispersal.sigma", m.male_dispersal.sigma),
        ];
        for (name, sd) in spreads {
            if !sd.is_finite() || sd < 0.0 {
                return Err(SimError::config(format!("{name} must be finite and >= 0, got {sd}")));
            }
        }

        // Truncated draws need a usable share of the mass inside the accepted range
        let h = &self.habitat;
        if h.patch_size_mean + OUT_OF_RANGE_SDS * h.patch_size_sd <= 0.0 {
            return Err(SimError::config(format!(
                "patch sizes ~ N({}, {}) are almost never > 0",
                h.patch_size_mean, h.patch_size_sd
            )));
        }
        let c = &self.calling;
        if c.effort_mean + OUT_OF_RANGE_SDS * c.effort_sd <= 0.0
            || c.effort_mean - OUT_OF_RANGE_SDS * c.effort_sd > 1.0
        {
            return Err(SimError::config(format!(
                "call efforts ~ N({}, {}) almost never fall within (0, 1]",
                c.effort_mean, c.effort_sd
            )));
        }

        let positives = [
            ("guaranteed_movement_spl", self.acoustics.guaranteed_movement_spl),
            ("reference_distance", self.acoustics.reference_distance),
            ("mating_distance", m.mating_distance),
            ("patch_density", self.habitat.patch_density),
            ("adjacency_threshold", self.habitat.adjacency_threshold),
        ];
        for (name, v) in positives {
            if !(v > 0.0) {
                return Err(SimError::config(format!("{name} must be > 0, got {v}")));
            }
        }
        if self.acoustics.preference_tolerance < 0.0 {
            return Err(SimError::config("preference_tolerance must be >= 0"));
        }

        Ok(())
    }
}
