//! Construction-time configuration of the reach environment

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use finger_rl_core::{RLError, Result};

use crate::driver::SamplingStrategy;
use crate::rate::ControlRate;
use crate::reach::REACH_OBSERVATION_KEYS;
use crate::smoothing::{ActionSmoother, SmoothingConfig};
use crate::spaces::ObservationKey;

/// Robot variant to train on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerType {
    /// One finger
    #[default]
    Single,
    /// Three fingers mounted 120 degrees apart
    Tri,
}

impl FingerType {
    /// Number of fingers of this variant
    #[must_use]
    pub fn num_fingers(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Tri => 3,
        }
    }
}

impl FromStr for FingerType {
    type Err = RLError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(Self::Single),
            "tri" => Ok(Self::Tri),
            other => Err(RLError::config(format!(
                "unknown finger type '{other}', expected 'single' or 'tri'"
            ))),
        }
    }
}

/// Whether the environment drives the simulation or hardware
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotKind {
    /// Kinematic simulation
    #[default]
    Simulated,
    /// Real robot through a caller-supplied driver
    Real,
}

/// Configuration of a [`FingerReach`](crate::FingerReach) environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerReachConfig {
    /// Seconds between agent actions
    pub control_rate_s: f64,
    /// Open the driver with visualization
    #[serde(default)]
    pub enable_visualization: bool,
    /// Single finger or tri-finger
    pub finger_type: FingerType,
    /// Action smoothing schedule
    pub smoothing: SmoothingConfig,
    /// Weight of the joint velocity penalty in the reward
    #[serde(default)]
    pub velocity_cost_factor: f64,
    /// How reaching goals are sampled
    #[serde(default)]
    pub sampling_strategy: SamplingStrategy,
    /// Simulation or hardware
    #[serde(default)]
    pub robot: RobotKind,
    /// Name of the hardware finger configuration a real robot uses
    ///
    /// Informational: the caller builds the hardware driver for this
    /// configuration, and the suffix only appears in logs and errors.
    #[serde(default = "default_finger_config_suffix")]
    pub finger_config_suffix: String,
    /// Align episode starts to wall-clock boundaries
    #[serde(default)]
    pub synchronize: bool,
    /// Seed for goal sampling; random when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Components of the observation vector, in order
    #[serde(default = "default_observation_keys")]
    pub observation_keys: Vec<ObservationKey>,
}

fn default_finger_config_suffix() -> String {
    "0".to_string()
}

fn default_observation_keys() -> Vec<ObservationKey> {
    REACH_OBSERVATION_KEYS.to_vec()
}

impl Default for FingerReachConfig {
    fn default() -> Self {
        Self {
            control_rate_s: 0.02,
            enable_visualization: false,
            finger_type: FingerType::Single,
            smoothing: SmoothingConfig::Fixed { final_alpha: 0.0 },
            velocity_cost_factor: 0.0,
            sampling_strategy: SamplingStrategy::Separated,
            robot: RobotKind::Simulated,
            finger_config_suffix: default_finger_config_suffix(),
            synchronize: false,
            seed: None,
            observation_keys: default_observation_keys(),
        }
    }
}

impl FingerReachConfig {
    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field that would otherwise fail mid-episode
    pub fn validate(&self) -> Result<()> {
        ControlRate::with_physical_tick(self.control_rate_s)?;
        ActionSmoother::new(&self.smoothing)?;

        if self.observation_keys.is_empty() {
            return Err(RLError::config("observation_keys must name at least one component"));
        }

        if !self.velocity_cost_factor.is_finite() {
            return Err(RLError::config(format!(
                "velocity_cost_factor must be finite, got {}",
                self.velocity_cost_factor
            )));
        }
        if self.velocity_cost_factor < 0.0 {
            warn!(
                factor = self.velocity_cost_factor,
                "negative velocity cost rewards fast joint motion"
            );
        }
        Ok(())
    }
}
