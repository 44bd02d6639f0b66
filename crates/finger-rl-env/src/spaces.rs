//! Observation and action spaces for finger robots
//!
//! Builds the physical-unit ("unscaled") boxes from the robot's joint and
//! workspace limits, the matching `[-1, 1]` boxes the agent sees, and the
//! lookup from observation key to its slice of the flat observation vector.

use std::fmt;
use std::ops::Range;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use finger_rl_core::{BoxSpace, RLError, Result};

/// Joints per finger
pub const JOINTS_PER_FINGER: usize = 3;

/// Named component of the flat observation vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKey {
    /// Measured joint angles
    JointPositions,
    /// Measured joint velocities
    JointVelocities,
    /// Fingertip goal positions
    GoalPosition,
    /// Joint targets that were last commanded
    ActionJointPositions,
    /// Fingertip positions from forward kinematics
    EndEffectorPosition,
    /// Goal minus fingertip position
    EndEffectorToGoal,
}

impl ObservationKey {
    /// Key name as it appears in logs and config files
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::JointPositions => "joint_positions",
            Self::JointVelocities => "joint_velocities",
            Self::GoalPosition => "goal_position",
            Self::ActionJointPositions => "action_joint_positions",
            Self::EndEffectorPosition => "end_effector_position",
            Self::EndEffectorToGoal => "end_effector_to_goal",
        }
    }

    /// Physical bounds of this component for `num_fingers` fingers
    fn bounds(self, limits: &PhysicalLimits, num_fingers: usize) -> (Vec<f64>, Vec<f64>) {
        let (low, high) = match self {
            Self::JointPositions => (limits.joint_position_low, limits.joint_position_high),
            Self::JointVelocities => (
                [-limits.max_joint_velocity; JOINTS_PER_FINGER],
                [limits.max_joint_velocity; JOINTS_PER_FINGER],
            ),
            Self::GoalPosition | Self::EndEffectorPosition => {
                (limits.workspace_low, limits.workspace_high)
            }
            Self::ActionJointPositions => (limits.action_low, limits.action_high),
            Self::EndEffectorToGoal => (
                [-limits.max_tip_to_goal; JOINTS_PER_FINGER],
                [limits.max_tip_to_goal; JOINTS_PER_FINGER],
            ),
        };
        (tile(low, num_fingers), tile(high, num_fingers))
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-finger physical limits reported by a driver
///
/// Angles are radians, positions metres, velocities rad/s. Each triple holds
/// one value per joint (or per Cartesian axis) of a single finger and is
/// repeated for every finger of the robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalLimits {
    /// Lower joint targets accepted in position control
    pub action_low: [f64; 3],
    /// Upper joint targets accepted in position control
    pub action_high: [f64; 3],
    /// Lower measured joint angles
    pub joint_position_low: [f64; 3],
    /// Upper measured joint angles
    pub joint_position_high: [f64; 3],
    /// Symmetric joint speed limit
    pub max_joint_velocity: f64,
    /// Lower corner of the fingertip workspace
    pub workspace_low: [f64; 3],
    /// Upper corner of the fingertip workspace
    pub workspace_high: [f64; 3],
    /// Symmetric limit on each component of goal minus fingertip
    pub max_tip_to_goal: f64,
}

impl Default for PhysicalLimits {
    fn default() -> Self {
        Self {
            action_low: [-70f64.to_radians(), -70f64.to_radians(), -160f64.to_radians()],
            action_high: [70f64.to_radians(), 0.0, -2f64.to_radians()],
            joint_position_low: [-90f64.to_radians(), -90f64.to_radians(), -172f64.to_radians()],
            joint_position_high: [90f64.to_radians(), 100f64.to_radians(), -2f64.to_radians()],
            max_joint_velocity: 10.0,
            workspace_low: [-0.5, -0.5, 0.0],
            workspace_high: [0.5, 0.5, 0.5],
            max_tip_to_goal: 0.5,
        }
    }
}

/// Scaled and unscaled spaces of a finger environment
#[derive(Debug, Clone)]
pub struct FingerSpaces {
    num_fingers: usize,
    key_to_index: IndexMap<ObservationKey, Range<usize>>,
    unscaled_observation_space: BoxSpace,
    scaled_observation_space: BoxSpace,
    unscaled_action_space: BoxSpace,
    scaled_action_space: BoxSpace,
}

impl FingerSpaces {
    /// Build the spaces for `num_fingers` fingers and the given observation layout
    ///
    /// `keys` and `sizes` are parallel: `sizes[i]` is the length of the
    /// component named `keys[i]`. Components are laid out in the given order.
    pub fn build(
        num_fingers: usize,
        keys: &[ObservationKey],
        sizes: &[usize],
        limits: &PhysicalLimits,
    ) -> Result<Self> {
        if num_fingers == 0 {
            return Err(RLError::config("a finger robot needs at least one finger"));
        }
        if keys.len() != sizes.len() {
            return Err(RLError::DimensionMismatch {
                expected: keys.len(),
                actual: sizes.len(),
            });
        }

        let per_key = JOINTS_PER_FINGER * num_fingers;
        let mut key_to_index = IndexMap::with_capacity(keys.len());
        let mut low = Vec::new();
        let mut high = Vec::new();

        for (&key, &size) in keys.iter().zip(sizes) {
            if size != per_key {
                return Err(RLError::config(format!(
                    "observation key {key} has size {size}, expected {per_key} for {num_fingers} finger(s)"
                )));
            }
            let start = low.len();
            if key_to_index.insert(key, start..start + size).is_some() {
                return Err(RLError::config(format!("observation key {key} listed twice")));
            }
            let (key_low, key_high) = key.bounds(limits, num_fingers);
            low.extend(key_low);
            high.extend(key_high);
        }

        let observation_dim = low.len();
        let unscaled_observation_space = BoxSpace::new(low, high)?;
        let unscaled_action_space = BoxSpace::new(
            tile(limits.action_low, num_fingers),
            tile(limits.action_high, num_fingers),
        )?;

        Ok(Self {
            num_fingers,
            key_to_index,
            unscaled_observation_space,
            scaled_observation_space: BoxSpace::symmetric(observation_dim, 1.0)?,
            unscaled_action_space,
            scaled_action_space: BoxSpace::symmetric(per_key, 1.0)?,
        })
    }

    /// Number of fingers the spaces were built for
    #[must_use]
    pub fn num_fingers(&self) -> usize {
        self.num_fingers
    }

    /// Observation keys in layout order with their index ranges
    #[must_use]
    pub fn key_to_index(&self) -> &IndexMap<ObservationKey, Range<usize>> {
        &self.key_to_index
    }

    /// Index range of `key`, if it is part of the layout
    #[must_use]
    pub fn index_of(&self, key: ObservationKey) -> Option<Range<usize>> {
        self.key_to_index.get(&key).cloned()
    }

    /// Slice of a flat observation that belongs to `key`
    #[must_use]
    pub fn slice<'a>(&self, key: ObservationKey, observation: &'a [f64]) -> Option<&'a [f64]> {
        self.key_to_index
            .get(&key)
            .and_then(|range| observation.get(range.clone()))
    }

    /// Length of the flat observation vector
    #[must_use]
    pub fn observation_dim(&self) -> usize {
        self.unscaled_observation_space.dim()
    }

    /// Length of the action vector
    #[must_use]
    pub fn action_dim(&self) -> usize {
        self.unscaled_action_space.dim()
    }

    /// Observation box in physical units
    #[must_use]
    pub fn unscaled_observation_space(&self) -> &BoxSpace {
        &self.unscaled_observation_space
    }

    /// Observation box seen by the agent
    #[must_use]
    pub fn scaled_observation_space(&self) -> &BoxSpace {
        &self.scaled_observation_space
    }

    /// Action box in physical units
    #[must_use]
    pub fn unscaled_action_space(&self) -> &BoxSpace {
        &self.unscaled_action_space
    }

    /// Action box seen by the agent
    #[must_use]
    pub fn scaled_action_space(&self) -> &BoxSpace {
        &self.scaled_action_space
    }
}

fn tile(triple: [f64; 3], num_fingers: usize) -> Vec<f64> {
    triple.iter().copied().cycle().take(triple.len() * num_fingers).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REACH_KEYS: [ObservationKey; 4] = [
        ObservationKey::JointPositions,
        ObservationKey::JointVelocities,
        ObservationKey::GoalPosition,
        ObservationKey::ActionJointPositions,
    ];

    fn reach_spaces(num_fingers: usize) -> FingerSpaces {
        let sizes = [3 * num_fingers; 4];
        FingerSpaces::build(num_fingers, &REACH_KEYS, &sizes, &PhysicalLimits::default()).unwrap()
    }

    #[test]
    fn test_key_ranges_are_contiguous() {
        let spaces = reach_spaces(3);
        let mut next = 0;
        for (key, range) in spaces.key_to_index() {
            assert_eq!(range.start, next, "{key} does not follow its predecessor");
            next = range.end;
        }
        assert_eq!(next, spaces.observation_dim());
        assert_eq!(spaces.observation_dim(), 36);
        assert_eq!(spaces.action_dim(), 9);
        assert_eq!(spaces.index_of(ObservationKey::GoalPosition), Some(18..27));
        assert_eq!(spaces.index_of(ObservationKey::EndEffectorToGoal), None);
    }

    #[test]
    fn test_bounds_follow_limits() {
        let limits = PhysicalLimits::default();
        let spaces = reach_spaces(1);

        let action = spaces.unscaled_action_space();
        assert_eq!(action.low().to_vec(), limits.action_low.to_vec());
        assert_eq!(action.high().to_vec(), limits.action_high.to_vec());

        let obs = spaces.unscaled_observation_space();
        assert_eq!(obs.low()[3], -limits.max_joint_velocity);
        assert_eq!(obs.high()[8], limits.workspace_high[2]);

        assert_eq!(spaces.scaled_observation_space().low().to_vec(), vec![-1.0; 12]);
        assert_eq!(spaces.scaled_action_space().high().to_vec(), vec![1.0; 3]);
    }

    #[test]
    fn test_tri_finger_tiles_limits() {
        let spaces = reach_spaces(3);
        let low = spaces.unscaled_action_space().low().to_vec();
        assert_eq!(low[0..3], low[3..6]);
        assert_eq!(low[3..6], low[6..9]);
    }

    #[test]
    fn test_slice_by_key() {
        let spaces = reach_spaces(1);
        let obs: Vec<f64> = (0..12).map(f64::from).collect();
        assert_eq!(
            spaces.slice(ObservationKey::JointVelocities, &obs),
            Some(&[3.0, 4.0, 5.0][..])
        );
        assert_eq!(spaces.slice(ObservationKey::JointVelocities, &obs[..4]), None);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        let limits = PhysicalLimits::default();
        assert!(matches!(
            FingerSpaces::build(1, &REACH_KEYS, &[3, 3, 3], &limits),
            Err(RLError::DimensionMismatch { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            FingerSpaces::build(1, &REACH_KEYS, &[3, 3, 0, 3], &limits),
            Err(RLError::Config(_))
        ));
        assert!(matches!(
            FingerSpaces::build(
                1,
                &[ObservationKey::JointPositions, ObservationKey::JointPositions],
                &[3, 3],
                &limits
            ),
            Err(RLError::Config(_))
        ));
        assert!(matches!(
            FingerSpaces::build(0, &[], &[], &limits),
            Err(RLError::Config(_))
        ));
    }

    #[test]
    fn test_key_names() {
        assert_eq!(ObservationKey::ActionJointPositions.to_string(), "action_joint_positions");
        let parsed: ObservationKey = serde_json::from_str("\"end_effector_to_goal\"").unwrap();
        assert_eq!(parsed, ObservationKey::EndEffectorToGoal);
    }
}
