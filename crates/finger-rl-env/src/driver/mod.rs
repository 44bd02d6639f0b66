//! Robot driver abstraction
//!
//! The reach environment talks to the robot only through [`FingerDriver`], so
//! the same control loop runs against the kinematic [`SimFinger`] or a
//! hardware driver supplied by the caller.

mod sim;

pub use sim::SimFinger;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use finger_rl_core::{RLError, Result};

use crate::config::{FingerReachConfig, RobotKind};
use crate::rate::PHYSICAL_TICK_S;
use crate::spaces::PhysicalLimits;

/// How the values passed to [`FingerDriver::set_action`] are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Joint angle targets
    Position,
    /// Joint torques; hardware only, the kinematic simulation rejects it
    Torque,
}

/// Strategy for sampling reaching targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Every finger gets its own independent target
    #[default]
    Separated,
    /// All fingers share one target configuration, tips form a triangle
    Triangle,
}

/// Joint measurements of the whole robot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointObservation {
    /// Joint angles (radians)
    pub position: Vec<f64>,
    /// Joint velocities (rad/s)
    pub velocity: Vec<f64>,
}

/// Capabilities the reach environment needs from a robot
///
/// Calls block until the robot has acknowledged them. Faults are reported as
/// [`RLError::Driver`] and are not retried by callers.
pub trait FingerDriver: Send + Sync {
    /// Number of fingers driven
    fn num_fingers(&self) -> usize;

    /// Physical limits used to build the environment spaces
    fn limits(&self) -> PhysicalLimits {
        PhysicalLimits::default()
    }

    /// Move to the reset pose and return the joint targets that were applied
    fn reset_to_pose(&mut self) -> Result<Vec<f64>>;

    /// Set the command applied on the following ticks
    fn set_action(&mut self, values: &[f64], mode: ControlMode) -> Result<()>;

    /// Advance one physical tick
    ///
    /// With `wait_until_applied` the call returns only after the command is in
    /// effect on the robot.
    fn step_tick(&mut self, wait_until_applied: bool) -> Result<()>;

    /// Latest joint measurements
    fn observation(&self) -> JointObservation;

    /// Fingertip positions for the given joint angles, one per finger
    fn forward_kinematics(&self, joint_positions: &[f64]) -> Result<Vec<[f64; 3]>>;

    /// Draw a joint configuration whose fingertips make a reachable goal
    fn sample_reaching_joint_positions(&mut self, rng: &mut dyn RngCore) -> Vec<f64>;

    /// Show goal markers (no-op without visualization)
    fn display_goal(&mut self) {}

    /// Move the goal markers to the new goal
    fn reset_goal_markers(&mut self, _goal: &[[f64; 3]]) {}

    /// (Re)connect, optionally with visualization
    fn connect(&mut self, visualize: bool) -> Result<()>;
}

/// Driver chosen once at construction
pub enum FingerBackend {
    /// Kinematic simulation
    Simulated(SimFinger),
    /// Hardware driver supplied by the caller
    Real(Box<dyn FingerDriver>),
}

impl FingerBackend {
    /// Select the backend named by `config.robot`
    ///
    /// A real robot needs its driver passed in as `hardware`; the simulated
    /// backend ignores it.
    pub fn from_config(
        config: &FingerReachConfig,
        hardware: Option<Box<dyn FingerDriver>>,
    ) -> Result<Self> {
        let num_fingers = config.finger_type.num_fingers();
        match config.robot {
            RobotKind::Simulated => Ok(Self::Simulated(SimFinger::new(
                num_fingers,
                PHYSICAL_TICK_S,
                config.enable_visualization,
                config.sampling_strategy,
            ))),
            RobotKind::Real => {
                let suffix = &config.finger_config_suffix;
                let driver = hardware.ok_or_else(|| {
                    RLError::config(format!(
                        "real robot selected (finger config {suffix}) but no hardware driver \
                         was supplied"
                    ))
                })?;
                if driver.num_fingers() != num_fingers {
                    return Err(RLError::config(format!(
                        "hardware driver has {} finger(s), config expects {num_fingers}",
                        driver.num_fingers()
                    )));
                }
                info!(fingers = num_fingers, finger_config = %suffix, "using hardware finger");
                Ok(Self::Real(driver))
            }
        }
    }

    /// Whether this backend drives real hardware
    #[must_use]
    pub fn is_real(&self) -> bool {
        matches!(self, Self::Real(_))
    }

    fn inner(&self) -> &dyn FingerDriver {
        match self {
            Self::Simulated(sim) => sim,
            Self::Real(driver) => driver.as_ref(),
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FingerDriver {
        match self {
            Self::Simulated(sim) => sim,
            Self::Real(driver) => driver.as_mut(),
        }
    }
}

impl FingerDriver for FingerBackend {
    fn num_fingers(&self) -> usize {
        self.inner().num_fingers()
    }

    fn limits(&self) -> PhysicalLimits {
        self.inner().limits()
    }

    fn reset_to_pose(&mut self) -> Result<Vec<f64>> {
        self.inner_mut().reset_to_pose()
    }

    fn set_action(&mut self, values: &[f64], mode: ControlMode) -> Result<()> {
        self.inner_mut().set_action(values, mode)
    }

    fn step_tick(&mut self, wait_until_applied: bool) -> Result<()> {
        self.inner_mut().step_tick(wait_until_applied)
    }

    fn observation(&self) -> JointObservation {
        self.inner().observation()
    }

    fn forward_kinematics(&self, joint_positions: &[f64]) -> Result<Vec<[f64; 3]>> {
        self.inner().forward_kinematics(joint_positions)
    }

    fn sample_reaching_joint_positions(&mut self, rng: &mut dyn RngCore) -> Vec<f64> {
        self.inner_mut().sample_reaching_joint_positions(rng)
    }

    fn display_goal(&mut self) {
        self.inner_mut().display_goal();
    }

    fn reset_goal_markers(&mut self, goal: &[[f64; 3]]) {
        self.inner_mut().reset_goal_markers(goal);
    }

    fn connect(&mut self, visualize: bool) -> Result<()> {
        self.inner_mut().connect(visualize)
    }
}
