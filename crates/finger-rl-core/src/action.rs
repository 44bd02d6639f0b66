//! Action representations and action spaces

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Marker trait for actions in an RL environment
pub trait Action: Clone + Debug + Send + Sync {}

/// Trait for defining action spaces
pub trait ActionSpace: Send + Sync {
    /// The type of actions in this space
    type Action: Action;

    /// Sample a random action from the space
    fn sample(&self, rng: &mut dyn RngCore) -> Self::Action;

    /// Check if an action is valid within this space
    fn contains(&self, action: &Self::Action) -> bool;

    /// Get the dimensionality of the action space
    fn dim(&self) -> Option<usize>;
}

/// Continuous action (e.g., joint position targets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuousAction(pub Vec<f64>);

impl Action for ContinuousAction {}

impl From<Vec<f64>> for ContinuousAction {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl AsRef<[f64]> for ContinuousAction {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}
