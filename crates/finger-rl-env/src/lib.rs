//! Reaching environments for single and tri-finger robots
//!
//! This crate provides:
//! - The [`FingerReach`] environment and its reward
//! - Space construction and observation layout
//! - Action smoothing and control-rate multiplexing
//! - The robot driver abstraction with a kinematic simulation
//! - Episode data logging and wall-clock synchronized starts

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod driver;
pub mod logger;
pub mod rate;
pub mod reach;
pub mod smoothing;
pub mod spaces;
pub mod sync;
pub mod wrappers;

pub use config::{FingerReachConfig, FingerType, RobotKind};
pub use driver::{
    ControlMode, FingerBackend, FingerDriver, JointObservation, SamplingStrategy, SimFinger,
};
pub use logger::{DataLogger, EpisodeRecord, EpisodeRecorder, LoggedSample, NullLogger};
pub use rate::{ControlRate, PHYSICAL_TICK_S};
pub use reach::{reach_reward, FingerReach, REACH_OBSERVATION_KEYS};
pub use smoothing::{ActionSmoother, SmoothingConfig};
pub use spaces::{FingerSpaces, ObservationKey, PhysicalLimits, JOINTS_PER_FINGER};
pub use sync::WallClockSync;
pub use wrappers::TimeLimit;

// Re-export core types
pub use finger_rl_core::{
    ActionSpace, BoxSpace, ContinuousAction, Environment, Episode, ObservationSpace, RLError,
    Reward, Step, StepInfo, TrackedEnvironment, VectorObservation,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        FingerReach, FingerReachConfig, FingerType, SmoothingConfig, TimeLimit,
    };
    pub use finger_rl_core::prelude::*;
}
