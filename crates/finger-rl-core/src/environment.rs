//! Environment traits and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Action, ActionSpace, Observation, ObservationSpace, Reward};

/// Result of a single environment step
#[derive(Debug, Clone)]
pub struct Step<O> {
    /// Observation from the environment
    pub observation: O,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Whether the episode was truncated (e.g., time limit)
    pub truncated: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

/// Additional information from a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// Add a field, replacing any previous value under the same key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Read a numeric field
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(serde_json::Value::as_f64)
    }
}

/// How an environment should present itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Interactive visualization for a person watching
    #[default]
    Human,
}

/// Episode information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Episode ID
    pub id: String,
    /// Total reward
    pub total_reward: f64,
    /// Number of steps
    pub steps: usize,
    /// Whether episode was truncated
    pub truncated: bool,
    /// Start time
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// End time
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// Core environment trait
#[async_trait]
pub trait Environment: Send + Sync {
    /// Observation type
    type Observation: Observation;
    /// Action type
    type Action: Action;

    /// Get the observation space
    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>>;

    /// Get the action space
    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>>;

    /// Reset the environment
    async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)>;

    /// Take a step in the environment
    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>>;

    /// Render the environment (optional)
    async fn render(&mut self, _mode: RenderMode) -> crate::Result<()> {
        Ok(())
    }

    /// Close the environment
    async fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }

    /// Get current episode info
    fn episode_info(&self) -> Option<Episode> {
        None
    }
}

/// Wrapper for environments that tracks episodes
pub struct TrackedEnvironment<E> {
    /// Inner environment
    pub env: E,
    /// Current episode
    pub episode: Option<Episode>,
    /// Step counter
    pub step_count: usize,
}

impl<E> TrackedEnvironment<E> {
    /// Create a new tracked environment
    pub fn new(env: E) -> Self {
        Self {
            env,
            episode: None,
            step_count: 0,
        }
    }
}

#[async_trait]
impl<E> Environment for TrackedEnvironment<E>
where
    E: Environment,
{
    type Observation = E::Observation;
    type Action = E::Action;

    fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
        self.env.observation_space()
    }

    fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
        self.env.action_space()
    }

    async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)> {
        // End current episode if exists
        if let Some(ref mut episode) = self.episode {
            episode.end_time = Some(chrono::Utc::now());
            debug!(
                id = %episode.id,
                steps = episode.steps,
                total_reward = episode.total_reward,
                truncated = episode.truncated,
                "episode closed"
            );
        }

        let reset = self.env.reset().await?;

        self.episode = Some(Episode {
            id: uuid::Uuid::new_v4().to_string(),
            total_reward: 0.0,
            steps: 0,
            truncated: false,
            start_time: chrono::Utc::now(),
            end_time: None,
        });
        self.step_count = 0;

        Ok(reset)
    }

    async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>> {
        let step = self.env.step(action).await?;

        self.step_count += 1;
        if let Some(ref mut episode) = self.episode {
            episode.total_reward += step.reward.value();
            episode.steps = self.step_count;

            if step.done || step.truncated {
                episode.truncated = step.truncated;
                episode.end_time = Some(chrono::Utc::now());
            }
        }

        Ok(step)
    }

    async fn render(&mut self, mode: RenderMode) -> crate::Result<()> {
        self.env.render(mode).await
    }

    async fn close(&mut self) -> crate::Result<()> {
        self.env.close().await
    }

    fn episode_info(&self) -> Option<Episode> {
        self.episode.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxSpace, ContinuousAction, VectorObservation};

    /// Counts steps and ends after three of them
    struct Countdown {
        remaining: usize,
    }

    #[async_trait]
    impl Environment for Countdown {
        type Observation = VectorObservation;
        type Action = ContinuousAction;

        fn observation_space(&self) -> Box<dyn ObservationSpace<Observation = Self::Observation>> {
            Box::new(BoxSpace::symmetric(1, 3.0).unwrap())
        }

        fn action_space(&self) -> Box<dyn ActionSpace<Action = Self::Action>> {
            Box::new(BoxSpace::symmetric(1, 1.0).unwrap())
        }

        async fn reset(&mut self) -> crate::Result<(Self::Observation, StepInfo)> {
            self.remaining = 3;
            Ok((VectorObservation::new(vec![3.0]), StepInfo::default()))
        }

        async fn step(&mut self, action: Self::Action) -> crate::Result<Step<Self::Observation>> {
            self.remaining -= 1;
            Ok(Step {
                observation: VectorObservation::new(vec![self.remaining as f64]),
                reward: Reward(action.0[0]),
                done: self.remaining == 0,
                truncated: false,
                info: StepInfo::default().with("remaining", self.remaining as f64),
            })
        }
    }

    #[tokio::test]
    async fn test_tracked_episode_totals() {
        let mut env = TrackedEnvironment::new(Countdown { remaining: 0 });
        assert!(env.episode_info().is_none());

        env.reset().await.unwrap();
        let mut last = None;
        for _ in 0..3 {
            last = Some(env.step(ContinuousAction(vec![0.5])).await.unwrap());
        }

        let step = last.unwrap();
        assert!(step.done);
        assert_eq!(step.info.get_f64("remaining"), Some(0.0));

        let episode = env.episode_info().unwrap();
        assert_eq!(episode.steps, 3);
        assert!((episode.total_reward - 1.5).abs() < 1e-12);
        assert!(episode.end_time.is_some());
    }

    #[test]
    fn test_reset_closes_episode_and_starts_new_one() {
        let mut env = TrackedEnvironment::new(Countdown { remaining: 0 });
        tokio_test::block_on(env.reset()).unwrap();
        let first = env.episode_info().unwrap().id;
        tokio_test::block_on(env.step(ContinuousAction(vec![0.25]))).unwrap();
        tokio_test::block_on(env.reset()).unwrap();
        let second = env.episode_info().unwrap().id;
        assert_ne!(first, second);
        assert_eq!(env.step_count, 0);
    }
}
