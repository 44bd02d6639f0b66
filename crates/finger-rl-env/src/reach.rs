//! Fingertip reaching task for single and tri-finger robots
//!
//! Each episode samples a reachable joint configuration, and its fingertip
//! positions become the goal. The agent commands joint positions in `[-1, 1]`.
//! Commands are unscaled to physical units, smoothed, then held for every
//! physical tick of one control step. The reward is the negative fingertip
//! distance to the goal, optionally penalised by joint speed.

use async_trait::async_trait;
use chrono::Utc;
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use finger_rl_core::{
    ActionSpace, ContinuousAction, Environment, ObservationSpace, RLError, RenderMode, Result,
    Reward, Step, StepInfo, VectorObservation,
};

use crate::config::{FingerReachConfig, RobotKind};
use crate::driver::{ControlMode, FingerBackend, FingerDriver, JointObservation};
use crate::logger::{DataLogger, EpisodeRecorder};
use crate::rate::ControlRate;
use crate::smoothing::ActionSmoother;
use crate::spaces::{FingerSpaces, ObservationKey, JOINTS_PER_FINGER};
use crate::sync::WallClockSync;

/// Default observation layout of the reach task
pub const REACH_OBSERVATION_KEYS: [ObservationKey; 4] = [
    ObservationKey::JointPositions,
    ObservationKey::JointVelocities,
    ObservationKey::GoalPosition,
    ObservationKey::ActionJointPositions,
];

/// State that only lives for one episode
#[derive(Debug, Clone)]
struct EpisodeState {
    goal: Vec<[f64; 3]>,
    smoothed_action: Option<Vec<f64>>,
}

/// Reaching environment
pub struct FingerReach<D = FingerBackend, L = EpisodeRecorder> {
    config: FingerReachConfig,
    driver: D,
    logger: L,
    spaces: FingerSpaces,
    smoother: ActionSmoother,
    rate: ControlRate,
    rng: StdRng,
    sync: Option<WallClockSync>,
    episode_count: u64,
    episode: Option<EpisodeState>,
}

impl FingerReach {
    /// Reach environment on the kinematic simulation, recording episodes in memory
    ///
    /// Rejects configs that select a real robot. Those go through
    /// [`FingerBackend::from_config`] with the hardware driver and then
    /// [`FingerReach::new`].
    pub fn simulated(config: FingerReachConfig) -> Result<Self> {
        if config.robot == RobotKind::Real {
            return Err(RLError::config(
                "config selects a real robot, build its backend with FingerBackend::from_config",
            ));
        }
        let backend = FingerBackend::from_config(&config, None)?;
        Self::new(config, backend, EpisodeRecorder::new())
    }
}

impl<D: FingerDriver, L: DataLogger> FingerReach<D, L> {
    /// Create the environment
    ///
    /// Every configuration error surfaces here. The environment has to be
    /// [`reset`](Environment::reset) before the first step.
    pub fn new(config: FingerReachConfig, mut driver: D, logger: L) -> Result<Self> {
        config.validate()?;

        let num_fingers = config.finger_type.num_fingers();
        if driver.num_fingers() != num_fingers {
            return Err(RLError::config(format!(
                "driver has {} finger(s), {:?} needs {num_fingers}",
                driver.num_fingers(),
                config.finger_type
            )));
        }

        let rate = ControlRate::with_physical_tick(config.control_rate_s)?;
        let smoother = ActionSmoother::new(&config.smoothing)?;
        let keys = &config.observation_keys;
        let sizes = vec![JOINTS_PER_FINGER * num_fingers; keys.len()];
        let spaces = FingerSpaces::build(num_fingers, keys, &sizes, &driver.limits())?;

        driver.display_goal();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let sync = config
            .synchronize
            .then(|| WallClockSync::starting_next_minute(Utc::now()));

        info!(
            fingers = num_fingers,
            ticks_per_step = rate.repeats(),
            observation_dim = spaces.observation_dim(),
            synchronized = sync.is_some(),
            "created finger reach environment"
        );

        Ok(Self {
            config,
            driver,
            logger,
            spaces,
            smoother,
            rate,
            rng,
            sync,
            episode_count: 0,
            episode: None,
        })
    }

    /// Replace the episode start schedule
    #[must_use]
    pub fn with_sync(mut self, sync: WallClockSync) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Reseed goal sampling
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Spaces and observation layout
    #[must_use]
    pub fn spaces(&self) -> &FingerSpaces {
        &self.spaces
    }

    /// Configuration the environment was built from
    #[must_use]
    pub fn config(&self) -> &FingerReachConfig {
        &self.config
    }

    /// Physical ticks per step
    #[must_use]
    pub fn repeats(&self) -> usize {
        self.rate.repeats()
    }

    /// Smoothing coefficient of the current episode
    #[must_use]
    pub fn smoothing_alpha(&self) -> f64 {
        self.smoother.alpha()
    }

    /// Number of episodes started
    #[must_use]
    pub fn episode_count(&self) -> u64 {
        self.episode_count
    }

    /// Goal of the current episode
    #[must_use]
    pub fn goal(&self) -> Option<&[[f64; 3]]> {
        self.episode.as_ref().map(|episode| episode.goal.as_slice())
    }

    /// Last smoothed joint target of the current episode
    #[must_use]
    pub fn smoothed_action(&self) -> Option<&[f64]> {
        self.episode
            .as_ref()
            .and_then(|episode| episode.smoothed_action.as_deref())
    }

    /// The robot driver
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The robot driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// The data logger
    #[must_use]
    pub fn logger(&self) -> &L {
        &self.logger
    }

    fn current_goal(&self) -> Result<&[[f64; 3]]> {
        self.goal()
            .ok_or_else(|| RLError::Environment("step called before reset".into()))
    }

    /// Hold the current joint positions before sleeping until a synchronized start
    fn freeze(&mut self) -> Result<()> {
        let position = self.driver.observation().position;
        self.driver.set_action(&position, ControlMode::Position)?;
        self.driver.step_tick(true)
    }

    /// Flat observation in physical units, laid out by the observation keys,
    /// and the joint measurements it was built from
    fn observe(
        &mut self,
        action: &[f64],
        log_observation: bool,
    ) -> Result<(Vec<f64>, JointObservation)> {
        let joints = self.driver.observation();
        let tips: Vec<f64> = self
            .driver
            .forward_kinematics(&joints.position)?
            .into_iter()
            .flatten()
            .collect();
        let goal: Vec<f64> = self.current_goal()?.iter().flatten().copied().collect();

        if log_observation {
            self.logger.append(&joints.position, &tips, Utc::now());
        }

        let mut observation = Vec::with_capacity(self.spaces.observation_dim());
        for key in self.spaces.key_to_index().keys() {
            match key {
                ObservationKey::JointPositions => {
                    observation.extend_from_slice(&joints.position);
                }
                ObservationKey::JointVelocities => {
                    observation.extend_from_slice(&joints.velocity);
                }
                ObservationKey::GoalPosition => observation.extend_from_slice(&goal),
                ObservationKey::ActionJointPositions => observation.extend_from_slice(action),
                ObservationKey::EndEffectorPosition => observation.extend_from_slice(&tips),
                ObservationKey::EndEffectorToGoal => {
                    observation.extend(goal.iter().zip(&tips).map(|(g, t)| g - t));
                }
            }
        }
        Ok((observation, joints))
    }
}

/// Reward of one control step
///
/// Negative Euclidean distance between all fingertips and their goals, minus
/// `velocity_cost_factor` times the joint speed, multiplied by the number of
/// physical ticks the step spans.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reach_reward(
    tips: &[[f64; 3]],
    goal: &[[f64; 3]],
    joint_velocities: &[f64],
    velocity_cost_factor: f64,
    repeats: usize,
) -> f64 {
    let tips: Array1<f64> = tips.iter().flatten().copied().collect();
    let goal: Array1<f64> = goal.iter().flatten().copied().collect();
    let offset = &tips - &goal;
    let distance = offset.dot(&offset).sqrt();

    let velocities = ArrayView1::from(joint_velocities);
    let speed = velocities.dot(&velocities).sqrt();

    (-distance - velocity_cost_factor * speed) * repeats as f64
}

#[async_trait]
impl<D: FingerDriver, L: DataLogger> Environment for FingerReach<D, L> {
    type Observation = VectorObservation;
    type Action = ContinuousAction;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        Box::new(self.spaces.scaled_observation_space().clone())
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        Box::new(self.spaces.scaled_action_space().clone())
    }

    async fn reset(&mut self) -> Result<(Self::Observation, StepInfo)> {
        if self.sync.is_some() {
            if let Err(err) = self.freeze() {
                debug!(error = %err, "could not hold position before synchronized start");
            }
            if let Some(sync) = self.sync.as_mut() {
                sync.wait().await;
            }
        }

        let alpha = self.smoother.update(self.episode_count);
        self.episode_count += 1;
        self.episode = None;

        let reset_pose = self.driver.reset_to_pose()?;
        let target = self.driver.sample_reaching_joint_positions(&mut self.rng);
        let goal = self.driver.forward_kinematics(&target)?;

        self.logger.new_episode(&target, &goal);
        self.driver.reset_goal_markers(&goal);
        self.episode = Some(EpisodeState {
            goal,
            smoothed_action: None,
        });

        info!(episode = self.episode_count, smoothing = alpha, "starting episode");

        let (observation, _) = self.observe(&reset_pose, false)?;
        let scaled = self.spaces.unscaled_observation_space().scale(&observation)?;
        Ok((
            VectorObservation::new(scaled),
            StepInfo::default().with("episode", self.episode_count),
        ))
    }

    async fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>> {
        let unscaled = self.spaces.unscaled_action_space().unscale(&action.0)?;

        let episode = self
            .episode
            .as_mut()
            .ok_or_else(|| RLError::Environment("step called before reset".into()))?;
        let smoothed = self
            .smoother
            .apply(episode.smoothed_action.as_deref(), &unscaled);
        episode.smoothed_action = Some(smoothed.clone());

        // the observation reflects the state right after the first tick
        let mut observation = None;
        for _ in 0..self.rate.repeats() {
            self.driver.set_action(&smoothed, ControlMode::Position)?;
            self.driver.step_tick(observation.is_none())?;
            if observation.is_none() {
                observation = Some(self.observe(&smoothed, true)?);
            }
        }
        let (observation, joints) = observation
            .ok_or_else(|| RLError::Environment("control step spans no physical ticks".into()))?;

        let tips = self.driver.forward_kinematics(&joints.position)?;
        let reward = reach_reward(
            &tips,
            self.current_goal()?,
            &joints.velocity,
            self.config.velocity_cost_factor,
            self.rate.repeats(),
        );
        let done = false;

        debug!(episode = self.episode_count, reward, "step");

        let scaled = self.spaces.unscaled_observation_space().scale(&observation)?;
        Ok(Step {
            observation: VectorObservation::new(scaled),
            reward: Reward::from(reward),
            done,
            truncated: false,
            info: StepInfo::default().with("is_success", if done { 1.0 } else { 0.0 }),
        })
    }

    async fn render(&mut self, _mode: RenderMode) -> Result<()> {
        self.driver.connect(true)
    }
}
