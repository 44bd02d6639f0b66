//! Kinematic finger simulation
//!
//! Position targets are tracked at a capped joint speed on every tick. There
//! is no dynamics, contact or gravity model.

use std::f64::consts::TAU;

use nalgebra::{Rotation3, Vector3};
use rand::{Rng, RngCore};
use tracing::{debug, info};

use finger_rl_core::{RLError, Result};

use super::{ControlMode, FingerDriver, JointObservation, SamplingStrategy};
use crate::spaces::{PhysicalLimits, JOINTS_PER_FINGER};

const UPPER_LINK_M: f64 = 0.16;
const LOWER_LINK_M: f64 = 0.16;
/// Height of the finger mounts above the arena floor
///
/// A fully stretched finger stays above the floor, so every reachable
/// fingertip lies inside the default workspace.
const MOUNT_HEIGHT_M: f64 = 0.34;
/// Horizontal distance of each finger mount from the arena centre
const MOUNT_RADIUS_M: f64 = 0.04;
/// Joint angles of one finger after a reset
const REST_POSE: [f64; 3] = [0.0, -0.7, -1.5];

/// Kinematic single or multi finger robot
#[derive(Debug, Clone)]
pub struct SimFinger {
    num_fingers: usize,
    tick_s: f64,
    limits: PhysicalLimits,
    sampling: SamplingStrategy,
    position: Vec<f64>,
    velocity: Vec<f64>,
    target: Vec<f64>,
    ticks: u64,
    visualize: bool,
    goal_visible: bool,
    goal_markers: Vec<[f64; 3]>,
}

impl SimFinger {
    /// Create a simulated robot resting in its reset pose
    #[must_use]
    pub fn new(
        num_fingers: usize,
        tick_s: f64,
        visualize: bool,
        sampling: SamplingStrategy,
    ) -> Self {
        let rest = rest_pose(num_fingers);
        Self {
            num_fingers,
            tick_s,
            limits: PhysicalLimits::default(),
            sampling,
            velocity: vec![0.0; rest.len()],
            target: rest.clone(),
            position: rest,
            ticks: 0,
            visualize,
            goal_visible: false,
            goal_markers: Vec::new(),
        }
    }

    /// Number of ticks simulated since construction
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated time in seconds
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sim_time(&self) -> f64 {
        self.ticks as f64 * self.tick_s
    }

    /// Joint targets currently being tracked
    #[must_use]
    pub fn target(&self) -> &[f64] {
        &self.target
    }

    /// Goal markers last placed
    #[must_use]
    pub fn goal_markers(&self) -> &[[f64; 3]] {
        &self.goal_markers
    }

    /// Whether goal markers are shown
    #[must_use]
    pub fn goal_visible(&self) -> bool {
        self.goal_visible
    }

    /// Whether visualization is enabled
    #[must_use]
    pub fn is_visualized(&self) -> bool {
        self.visualize
    }

    fn check_len(&self, values: &[f64]) -> Result<()> {
        let expected = JOINTS_PER_FINGER * self.num_fingers;
        if values.len() == expected {
            Ok(())
        } else {
            Err(RLError::DimensionMismatch {
                expected,
                actual: values.len(),
            })
        }
    }

    fn sample_finger(&self, rng: &mut dyn RngCore) -> [f64; 3] {
        let (low, high) = (self.limits.action_low, self.limits.action_high);
        [0, 1, 2].map(|j| rng.gen_range(low[j]..=high[j]))
    }
}

impl FingerDriver for SimFinger {
    fn num_fingers(&self) -> usize {
        self.num_fingers
    }

    fn limits(&self) -> PhysicalLimits {
        self.limits.clone()
    }

    fn reset_to_pose(&mut self) -> Result<Vec<f64>> {
        let rest = rest_pose(self.num_fingers);
        self.position.clone_from(&rest);
        self.target.clone_from(&rest);
        self.velocity.iter_mut().for_each(|v| *v = 0.0);
        Ok(rest)
    }

    fn set_action(&mut self, values: &[f64], mode: ControlMode) -> Result<()> {
        self.check_len(values)?;
        match mode {
            ControlMode::Position => {
                for (i, (target, value)) in self.target.iter_mut().zip(values).enumerate() {
                    let j = i % JOINTS_PER_FINGER;
                    *target = value.clamp(self.limits.action_low[j], self.limits.action_high[j]);
                }
                Ok(())
            }
            ControlMode::Torque => Err(RLError::InvalidAction(
                "kinematic simulation only supports position control".into(),
            )),
        }
    }

    fn step_tick(&mut self, _wait_until_applied: bool) -> Result<()> {
        let max_velocity = self.limits.max_joint_velocity;
        let max_step = max_velocity * self.tick_s;
        for (i, ((position, velocity), target)) in self
            .position
            .iter_mut()
            .zip(self.velocity.iter_mut())
            .zip(&self.target)
            .enumerate()
        {
            let j = i % JOINTS_PER_FINGER;
            let step = (target - *position).clamp(-max_step, max_step);
            *position = (*position + step)
                .clamp(self.limits.joint_position_low[j], self.limits.joint_position_high[j]);
            *velocity = (step / self.tick_s).clamp(-max_velocity, max_velocity);
        }
        self.ticks += 1;
        Ok(())
    }

    fn observation(&self) -> JointObservation {
        JointObservation {
            position: self.position.clone(),
            velocity: self.velocity.clone(),
        }
    }

    fn forward_kinematics(&self, joint_positions: &[f64]) -> Result<Vec<[f64; 3]>> {
        self.check_len(joint_positions)?;
        Ok(joint_positions
            .chunks_exact(JOINTS_PER_FINGER)
            .enumerate()
            .map(|(finger, q)| fingertip(finger, self.num_fingers, [q[0], q[1], q[2]]))
            .collect())
    }

    fn sample_reaching_joint_positions(&mut self, rng: &mut dyn RngCore) -> Vec<f64> {
        match self.sampling {
            SamplingStrategy::Separated => (0..self.num_fingers)
                .flat_map(|_| self.sample_finger(rng))
                .collect(),
            SamplingStrategy::Triangle => {
                let shared = self.sample_finger(rng);
                shared.repeat(self.num_fingers)
            }
        }
    }

    fn display_goal(&mut self) {
        self.goal_visible = true;
    }

    fn reset_goal_markers(&mut self, goal: &[[f64; 3]]) {
        debug!(markers = goal.len(), "moving goal markers");
        self.goal_markers = goal.to_vec();
    }

    fn connect(&mut self, visualize: bool) -> Result<()> {
        info!(visualize, fingers = self.num_fingers, "connected to finger simulation");
        self.visualize = visualize;
        Ok(())
    }
}

fn rest_pose(num_fingers: usize) -> Vec<f64> {
    REST_POSE.repeat(num_fingers)
}

/// Fingertip of finger `finger` out of `num_fingers` mounted evenly around the arena
#[allow(clippy::cast_precision_loss)]
fn fingertip(finger: usize, num_fingers: usize, q: [f64; 3]) -> [f64; 3] {
    // upper and lower links swing in the finger's vertical plane
    let knee = q[1];
    let ankle = q[1] + q[2];
    let reach = UPPER_LINK_M * knee.sin() + LOWER_LINK_M * ankle.sin();
    let drop = -(UPPER_LINK_M * knee.cos() + LOWER_LINK_M * ankle.cos());

    let abduction = Rotation3::from_axis_angle(&Vector3::y_axis(), q[0]);
    let local = abduction * Vector3::new(0.0, reach, drop) + Vector3::new(0.0, MOUNT_RADIUS_M, 0.0);

    let mount_angle = TAU * finger as f64 / num_fingers as f64;
    let mount = Rotation3::from_axis_angle(&Vector3::z_axis(), mount_angle);
    let tip = mount * local + Vector3::new(0.0, 0.0, MOUNT_HEIGHT_M);
    [tip.x, tip.y, tip.z]
}
