//! Exponential smoothing of commanded actions
//!
//! The coefficient follows a per-episode schedule: zero until the ramp
//! starts, a linear climb while it runs, then held at the final value.

use serde::{Deserialize, Serialize};

use finger_rl_core::{RLError, Result};

/// Smoothing schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SmoothingConfig {
    /// Coefficient ramps from 0 to `final_alpha` over a fraction of training
    Ramped {
        /// Total number of training episodes
        num_episodes: u64,
        /// Fraction of episodes after which the ramp starts
        start_after: f64,
        /// Fraction of episodes by which `final_alpha` is reached
        stop_after: f64,
        /// Coefficient held after the ramp
        final_alpha: f64,
    },
    /// Coefficient pinned for the whole run (evaluation)
    Fixed {
        /// Coefficient used for every episode
        final_alpha: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Schedule {
    Ramped { start: u64, stop: u64 },
    Fixed,
}

/// Action smoother with an episode-driven coefficient
#[derive(Debug, Clone)]
pub struct ActionSmoother {
    schedule: Schedule,
    final_alpha: f64,
    alpha: f64,
}

impl ActionSmoother {
    /// Create a smoother, rejecting schedules that cannot ramp
    pub fn new(config: &SmoothingConfig) -> Result<Self> {
        match *config {
            SmoothingConfig::Fixed { final_alpha } => {
                check_alpha(final_alpha)?;
                Ok(Self {
                    schedule: Schedule::Fixed,
                    final_alpha,
                    alpha: final_alpha,
                })
            }
            SmoothingConfig::Ramped {
                num_episodes,
                start_after,
                stop_after,
                final_alpha,
            } => {
                check_alpha(final_alpha)?;
                if num_episodes == 0 {
                    return Err(RLError::config("smoothing needs num_episodes > 0"));
                }
                if !(start_after >= 0.0 && start_after.is_finite() && stop_after.is_finite()) {
                    return Err(RLError::config(format!(
                        "smoothing fractions must be finite and start_after >= 0, got start_after={start_after} stop_after={stop_after}"
                    )));
                }
                if stop_after <= start_after {
                    return Err(RLError::config(format!(
                        "smoothing stop_after ({stop_after}) must be greater than start_after ({start_after})"
                    )));
                }

                let start = episode_at(num_episodes, start_after);
                let stop = episode_at(num_episodes, stop_after);
                if stop <= start {
                    return Err(RLError::config(format!(
                        "smoothing ramp over {num_episodes} episodes is empty (start episode {start}, stop episode {stop})"
                    )));
                }

                Ok(Self {
                    schedule: Schedule::Ramped { start, stop },
                    final_alpha,
                    alpha: 0.0,
                })
            }
        }
    }

    /// Current coefficient
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Coefficient reached once the ramp is over
    #[must_use]
    pub fn final_alpha(&self) -> f64 {
        self.final_alpha
    }

    /// Per-episode increase while ramping (0 for a fixed schedule)
    #[must_use]
    pub fn increment(&self) -> f64 {
        match self.schedule {
            Schedule::Ramped { start, stop } => self.final_alpha / (stop - start) as f64,
            Schedule::Fixed => 0.0,
        }
    }

    /// First and one-past-last episode of the ramp; `None` for a fixed schedule
    #[must_use]
    pub fn ramp_episodes(&self) -> Option<(u64, u64)> {
        match self.schedule {
            Schedule::Ramped { start, stop } => Some((start, stop)),
            Schedule::Fixed => None,
        }
    }

    /// Advance the coefficient for the episode about to start
    ///
    /// `episode_count` is the number of episodes started before this one.
    pub fn update(&mut self, episode_count: u64) -> f64 {
        self.alpha = match self.schedule {
            Schedule::Fixed => self.final_alpha,
            Schedule::Ramped { start, .. } if episode_count < start => 0.0,
            // the last ramp episode falls through to final_alpha exactly
            Schedule::Ramped { start, stop } if episode_count + 1 < stop => {
                self.final_alpha * (episode_count - start + 1) as f64 / (stop - start) as f64
            }
            Schedule::Ramped { .. } => self.final_alpha,
        };
        self.alpha
    }

    /// Blend `raw` into the previous smoothed action
    ///
    /// With no previous action (first command of an episode) `raw` is returned
    /// as is.
    #[must_use]
    pub fn apply(&self, previous: Option<&[f64]>, raw: &[f64]) -> Vec<f64> {
        match previous {
            Some(previous) => previous
                .iter()
                .zip(raw)
                .map(|(p, r)| self.alpha * p + (1.0 - self.alpha) * r)
                .collect(),
            None => raw.to_vec(),
        }
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(RLError::config(format!("smoothing final_alpha must be in [0, 1], got {alpha}")))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn episode_at(num_episodes: u64, fraction: f64) -> u64 {
    (num_episodes as f64 * fraction).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn ramped(
        num_episodes: u64,
        start_after: f64,
        stop_after: f64,
        final_alpha: f64,
    ) -> SmoothingConfig {
        SmoothingConfig::Ramped {
            num_episodes,
            start_after,
            stop_after,
            final_alpha,
        }
    }

    #[test]
    fn test_ramp_phases() {
        let mut smoother = ActionSmoother::new(&ramped(100, 0.1, 0.5, 0.8)).unwrap();
        assert_eq!(smoother.ramp_episodes(), Some((10, 50)));
        assert_relative_eq!(smoother.increment(), 0.02);

        assert_eq!(smoother.update(0), 0.0);
        assert_eq!(smoother.update(9), 0.0);
        assert_relative_eq!(smoother.update(10), 0.02);
        assert_relative_eq!(smoother.update(29), 0.4);
        assert_eq!(smoother.update(49), 0.8);
        assert_eq!(smoother.update(50), 0.8);
        assert_eq!(smoother.update(5000), 0.8);
    }

    #[test]
    fn test_fixed_schedule_ignores_episodes() {
        let mut smoother =
            ActionSmoother::new(&SmoothingConfig::Fixed { final_alpha: 0.9 }).unwrap();
        assert_eq!(smoother.alpha(), 0.9);
        assert_eq!(smoother.ramp_episodes(), None);
        for episode in [0, 1, 17, 1_000_000] {
            assert_eq!(smoother.update(episode), 0.9);
        }

        let first = smoother.apply(None, &[1.0, -1.0]);
        assert_eq!(first, vec![1.0, -1.0]);

        let second = smoother.apply(Some(&first), &[0.0, 0.0]);
        assert_relative_eq!(second[0], 0.9);
        assert_relative_eq!(second[1], -0.9);
    }

    #[test]
    fn test_first_action_bypasses_coefficient() {
        let mut smoother = ActionSmoother::new(&ramped(10, 0.0, 0.5, 1.0)).unwrap();
        smoother.update(7);
        assert_eq!(smoother.alpha(), 1.0);
        assert_eq!(smoother.apply(None, &[0.3, 0.2]), vec![0.3, 0.2]);
        assert_eq!(smoother.apply(Some(&[0.0, 0.0]), &[0.3, 0.2]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_invalid_schedules_fail_fast() {
        for config in [
            ramped(100, 0.5, 0.5, 0.5),
            ramped(100, 0.6, 0.2, 0.5),
            ramped(0, 0.0, 1.0, 0.5),
            ramped(100, -0.1, 0.5, 0.5),
            ramped(100, 0.0, 0.5, 1.5),
            ramped(3, 0.1, 0.2, 0.5),
            SmoothingConfig::Fixed { final_alpha: -0.1 },
        ] {
            assert!(
                matches!(ActionSmoother::new(&config), Err(RLError::Config(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_config_from_json() {
        let config: SmoothingConfig = serde_json::from_str(
            r#"{"mode": "ramped", "num_episodes": 2000, "start_after": 0.0, "stop_after": 0.5, "final_alpha": 0.95}"#,
        )
        .unwrap();
        assert_eq!(config, ramped(2000, 0.0, 0.5, 0.95));

        let config: SmoothingConfig =
            serde_json::from_str(r#"{"mode": "fixed", "final_alpha": 0.9}"#).unwrap();
        assert_eq!(config, SmoothingConfig::Fixed { final_alpha: 0.9 });
    }

    proptest! {
        #[test]
        fn schedule_is_monotone_and_lands_on_final_alpha(
            num_episodes in 50u64..5000,
            start_after in 0.0f64..0.5,
            width in 0.1f64..0.5,
            final_alpha in 0.0f64..=1.0,
        ) {
            let stop_after = start_after + width;
            let mut smoother = ActionSmoother::new(
                &ramped(num_episodes, start_after, stop_after, final_alpha)
            ).unwrap();
            let (start, stop) = smoother.ramp_episodes().unwrap();

            let mut previous = 0.0;
            for episode in 0..num_episodes + 5 {
                let alpha = smoother.update(episode);
                if episode < start {
                    prop_assert_eq!(alpha, 0.0);
                }
                if episode + 1 >= stop {
                    prop_assert_eq!(alpha, final_alpha);
                }
                prop_assert!(alpha >= previous);
                prop_assert!(alpha <= final_alpha);
                previous = alpha;
            }
        }
    }
}
