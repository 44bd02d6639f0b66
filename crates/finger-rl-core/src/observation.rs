//! Observation representations and observation spaces

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for observations from an environment
pub trait Observation: Clone + Debug + Send + Sync {
    /// Get the shape of the observation
    fn shape(&self) -> Vec<usize>;
}

/// Trait for defining observation spaces
pub trait ObservationSpace: Send + Sync {
    /// The type of observations in this space
    type Observation: Observation;

    /// Sample a random observation from the space
    fn sample(&self, rng: &mut dyn RngCore) -> Self::Observation;

    /// Check if an observation is valid within this space
    fn contains(&self, obs: &Self::Observation) -> bool;

    /// Get the shape of observations in this space
    fn shape(&self) -> Vec<usize>;
}

/// Vector observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorObservation {
    /// The observation data
    pub data: Vec<f64>,
}

impl VectorObservation {
    /// Wrap a flat observation vector
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }
}

impl Observation for VectorObservation {
    fn shape(&self) -> Vec<usize> {
        vec![self.data.len()]
    }
}
