//! Box spaces and the affine map between physical and normalized ranges

use ndarray::{Array1, ArrayView1};
use rand::{Rng, RngCore};
use serde::Serialize;

use crate::{
    ActionSpace, ContinuousAction, ObservationSpace, RLError, Result, VectorObservation,
};

/// Bounded box space with per-dimension `[low, high]` limits
///
/// Every dimension satisfies `low < high` with finite bounds, which keeps
/// [`BoxSpace::scale`] and [`BoxSpace::unscale`] exact inverses of each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSpace {
    low: Array1<f64>,
    high: Array1<f64>,
    #[serde(skip)]
    span: Array1<f64>,
}

impl BoxSpace {
    /// Create a new box space
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Result<Self> {
        if low.len() != high.len() {
            return Err(RLError::DimensionMismatch {
                expected: low.len(),
                actual: high.len(),
            });
        }
        if let Some(i) = low
            .iter()
            .zip(&high)
            .position(|(l, h)| !l.is_finite() || !h.is_finite() || l >= h)
        {
            return Err(RLError::config(format!(
                "box bounds must be finite with low < high, dimension {i} has [{}, {}]",
                low[i], high[i]
            )));
        }

        let low = Array1::from(low);
        let high = Array1::from(high);
        let span = &high - &low;
        Ok(Self { low, high, span })
    }

    /// Box of the given dimension with bounds `[-bound, bound]` on every axis
    pub fn symmetric(dim: usize, bound: f64) -> Result<Self> {
        Self::new(vec![-bound; dim], vec![bound; dim])
    }

    /// Number of dimensions
    #[must_use]
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Lower bounds
    #[must_use]
    pub fn low(&self) -> ArrayView1<'_, f64> {
        self.low.view()
    }

    /// Upper bounds
    #[must_use]
    pub fn high(&self) -> ArrayView1<'_, f64> {
        self.high.view()
    }

    /// Check whether every component lies within the bounds
    #[must_use]
    pub fn contains_values(&self, values: &[f64]) -> bool {
        values.len() == self.dim()
            && values
                .iter()
                .zip(&self.low)
                .zip(&self.high)
                .all(|((x, l), h)| x >= l && x <= h)
    }

    /// Map a vector from this space into `[-1, 1]`
    pub fn scale(&self, values: &[f64]) -> Result<Vec<f64>> {
        let x = self.view_checked(values)?;
        let scaled = (&x - &self.low) / &self.span * 2.0 - 1.0;
        Ok(scaled.to_vec())
    }

    /// Map a vector from `[-1, 1]` back into this space
    pub fn unscale(&self, values: &[f64]) -> Result<Vec<f64>> {
        let y = self.view_checked(values)?;
        let unscaled = (&y + 1.0) / 2.0 * &self.span + &self.low;
        Ok(unscaled.to_vec())
    }

    /// Clamp every component into the bounds
    #[must_use]
    pub fn clip(&self, values: &[f64]) -> Vec<f64> {
        values
            .iter()
            .zip(self.low.iter().zip(&self.high))
            .map(|(v, (l, h))| v.clamp(*l, *h))
            .collect()
    }

    /// Draw a uniformly distributed point
    pub fn sample_values(&self, rng: &mut dyn RngCore) -> Vec<f64> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(l, h)| rng.gen_range(*l..=*h))
            .collect()
    }

    fn view_checked<'a>(&self, values: &'a [f64]) -> Result<ArrayView1<'a, f64>> {
        if values.len() != self.dim() {
            return Err(RLError::DimensionMismatch {
                expected: self.dim(),
                actual: values.len(),
            });
        }
        Ok(ArrayView1::from(values))
    }
}

impl ActionSpace for BoxSpace {
    type Action = ContinuousAction;

    fn sample(&self, rng: &mut dyn RngCore) -> Self::Action {
        ContinuousAction(self.sample_values(rng))
    }

    fn contains(&self, action: &Self::Action) -> bool {
        self.contains_values(&action.0)
    }

    fn dim(&self) -> Option<usize> {
        Some(BoxSpace::dim(self))
    }
}

impl ObservationSpace for BoxSpace {
    type Observation = VectorObservation;

    fn sample(&self, rng: &mut dyn RngCore) -> Self::Observation {
        VectorObservation::new(self.sample_values(rng))
    }

    fn contains(&self, obs: &Self::Observation) -> bool {
        self.contains_values(&obs.data)
    }

    fn shape(&self) -> Vec<usize> {
        vec![self.dim()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_inverted_bounds() {
        let err = BoxSpace::new(vec![0.0, 1.0], vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, RLError::Config(_)));

        let err = BoxSpace::new(vec![0.0], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, RLError::DimensionMismatch { expected: 1, actual: 2 }));
    }

    #[test]
    fn test_scale_endpoints() {
        let space = BoxSpace::new(vec![-2.0, 0.0], vec![2.0, 0.5]).unwrap();
        assert_eq!(space.scale(&[-2.0, 0.5]).unwrap(), vec![-1.0, 1.0]);

        let mid = space.scale(&[0.0, 0.25]).unwrap();
        assert_relative_eq!(mid[0], 0.0);
        assert_relative_eq!(mid[1], 0.0);

        assert!(matches!(
            space.unscale(&[0.0]),
            Err(RLError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_sample_within_bounds() {
        let space = BoxSpace::new(vec![-1.0, 3.0, -0.1], vec![1.0, 4.0, 0.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let action = ActionSpace::sample(&space, &mut rng);
            assert!(ActionSpace::contains(&space, &action));
        }
    }

    #[test]
    fn test_clip() {
        let space = BoxSpace::symmetric(2, 1.0).unwrap();
        assert_eq!(space.clip(&[3.0, -0.5]), vec![1.0, -0.5]);
    }

    proptest! {
        #[test]
        fn scale_round_trip(dims in prop::collection::vec(
            (-10.0f64..10.0, 0.01f64..10.0, 0.0f64..=1.0), 1..12)
        ) {
            let low: Vec<f64> = dims.iter().map(|d| d.0).collect();
            let high: Vec<f64> = dims.iter().map(|d| d.0 + d.1).collect();
            let x: Vec<f64> = dims.iter().map(|d| d.0 + d.1 * d.2).collect();
            let space = BoxSpace::new(low, high).unwrap();

            let scaled = space.scale(&x).unwrap();
            prop_assert!(scaled.iter().all(|v| (-1.0 - 1e-9..=1.0 + 1e-9).contains(v)));

            let back = space.unscale(&scaled).unwrap();
            for (a, b) in back.iter().zip(&x) {
                prop_assert!((a - b).abs() <= 1e-9);
            }
        }

        #[test]
        fn unscale_round_trip(ys in prop::collection::vec(-1.0f64..=1.0, 4)) {
            let space = BoxSpace::new(
                vec![-1.2, -1.2, -2.8, -10.0],
                vec![1.2, 0.0, -0.03, 10.0],
            ).unwrap();
            let back = space.scale(&space.unscale(&ys).unwrap()).unwrap();
            for (a, b) in back.iter().zip(&ys) {
                prop_assert!((a - b).abs() <= 1e-9);
            }
        }
    }
}
