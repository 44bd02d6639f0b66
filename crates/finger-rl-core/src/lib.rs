//! Core reinforcement learning traits and types for robot finger environments
//!
//! This crate provides the agent-facing abstractions shared by the finger
//! environments: the async [`Environment`] trait, step and episode records,
//! box spaces with their affine scaling, and the common error type.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod environment;
pub mod error;
pub mod observation;
pub mod reward;
pub mod space;

// Re-export core traits and types
pub use action::{Action, ActionSpace, ContinuousAction};
pub use environment::{Environment, Episode, RenderMode, Step, StepInfo, TrackedEnvironment};
pub use error::{RLError, Result};
pub use observation::{Observation, ObservationSpace, VectorObservation};
pub use reward::Reward;
pub use space::BoxSpace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, ActionSpace, BoxSpace, ContinuousAction, Environment, Observation,
        ObservationSpace, Reward, Step, StepInfo, VectorObservation, Result,
    };
}
