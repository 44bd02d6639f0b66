//! Mapping from agent control steps to physical ticks

use finger_rl_core::{RLError, Result};

/// Period of one physical tick of the finger backends, in seconds
pub const PHYSICAL_TICK_S: f64 = 0.004;

/// Allowed mismatch between the control period and a whole number of ticks
const RATE_TOLERANCE_S: f64 = 1e-6;

/// How many physical ticks one control step spans
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRate {
    control_period_s: f64,
    tick_period_s: f64,
    repeats: usize,
}

impl ControlRate {
    /// Validate that `control_period_s` is a whole multiple of `tick_period_s`
    pub fn new(control_period_s: f64, tick_period_s: f64) -> Result<Self> {
        if !(control_period_s.is_finite() && control_period_s > 0.0) {
            return Err(RLError::config(format!(
                "control rate must be a positive number of seconds, got {control_period_s}"
            )));
        }
        if !(tick_period_s.is_finite() && tick_period_s > 0.0) {
            return Err(RLError::config(format!(
                "tick period must be a positive number of seconds, got {tick_period_s}"
            )));
        }

        let ratio = (control_period_s / tick_period_s).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let repeats = ratio as usize;
        if repeats == 0 || (control_period_s - ratio * tick_period_s).abs() > RATE_TOLERANCE_S {
            return Err(RLError::config(format!(
                "control rate {control_period_s}s is not a multiple of the {tick_period_s}s physical tick"
            )));
        }

        Ok(Self {
            control_period_s,
            tick_period_s,
            repeats,
        })
    }

    /// Control rate against the finger backends' fixed tick
    pub fn with_physical_tick(control_period_s: f64) -> Result<Self> {
        Self::new(control_period_s, PHYSICAL_TICK_S)
    }

    /// Physical ticks per control step
    #[must_use]
    pub fn repeats(&self) -> usize {
        self.repeats
    }

    /// Control period in seconds
    #[must_use]
    pub fn control_period_s(&self) -> f64 {
        self.control_period_s
    }

    /// Tick period in seconds
    #[must_use]
    pub fn tick_period_s(&self) -> f64 {
        self.tick_period_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_tick_per_step() {
        let rate = ControlRate::with_physical_tick(0.004).unwrap();
        assert_eq!(rate.repeats(), 1);
    }

    #[test]
    fn test_several_ticks_per_step() {
        assert_eq!(ControlRate::with_physical_tick(0.02).unwrap().repeats(), 5);
        assert_eq!(ControlRate::new(0.01, 0.001).unwrap().repeats(), 10);
    }

    #[test]
    fn test_rejects_non_multiple() {
        let err = ControlRate::with_physical_tick(0.01).unwrap_err();
        assert!(matches!(err, RLError::Config(_)));
    }

    #[test]
    fn test_rejects_degenerate_periods() {
        for (control, tick) in [
            (0.0, 0.004),
            (-0.02, 0.004),
            (0.02, 0.0),
            (f64::NAN, 0.004),
            (0.001, 0.004),
        ] {
            assert!(ControlRate::new(control, tick).is_err(), "{control}/{tick}");
        }
    }
}
