//! Environment wrappers

use async_trait::async_trait;

use finger_rl_core::{ActionSpace, Environment, ObservationSpace, RenderMode, Step, StepInfo};

/// Ends episodes after a fixed number of steps
///
/// The reach task never terminates on its own, so training loops bound each
/// episode with this wrapper.
pub struct TimeLimit<E> {
    /// Inner environment
    pub env: E,
    /// Maximum steps per episode
    pub max_steps: usize,
    /// Steps taken in the current episode
    pub steps: usize,
}

impl<E> TimeLimit<E> {
    /// Wrap `env`, truncating episodes after `max_steps`
    pub fn new(env: E, max_steps: usize) -> Self {
        Self {
            env,
            max_steps,
            steps: 0,
        }
    }
}

#[async_trait]
impl<E> Environment for TimeLimit<E>
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

    async fn reset(&mut self) -> finger_rl_core::Result<(Self::Observation, StepInfo)> {
        self.steps = 0;
        self.env.reset().await
    }

    async fn step(
        &mut self,
        action: Self::Action,
    ) -> finger_rl_core::Result<Step<Self::Observation>> {
        self.steps += 1;
        let mut step = self.env.step(action).await?;

        if self.steps >= self.max_steps && !step.done {
            step.truncated = true;
            step.done = true;
        }

        Ok(step)
    }

    async fn render(&mut self, mode: RenderMode) -> finger_rl_core::Result<()> {
        self.env.render(mode).await
    }

    async fn close(&mut self) -> finger_rl_core::Result<()> {
        self.env.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FingerReachConfig;
    use crate::driver::FingerBackend;
    use crate::reach::FingerReach;
    use finger_rl_core::ContinuousAction;

    #[tokio::test]
    async fn test_time_limit_truncates() {
        let env = FingerReach::simulated(FingerReachConfig {
            seed: Some(1),
            ..FingerReachConfig::default()
        })
        .unwrap();
        let mut env = TimeLimit::new(env, 3);

        for _ in 0..2 {
            env.reset().await.unwrap();
            let mut ends = Vec::new();
            for _ in 0..3 {
                let step = env.step(ContinuousAction(vec![0.0; 3])).await.unwrap();
                ends.push((step.done, step.truncated));
            }
            assert_eq!(ends, vec![(false, false), (false, false), (true, true)]);
        }
        assert_eq!(env.env.episode_count(), 2);
    }

    #[test]
    fn test_spaces_pass_through() {
        let env = FingerReach::simulated(FingerReachConfig::default()).unwrap();
        let env = TimeLimit::new(env, 10);
        assert_eq!(env.observation_space().shape(), vec![12]);
        assert_eq!(env.action_space().dim(), Some(3));
    }

    #[test]
    fn test_render_and_close_pass_through() {
        let env = FingerReach::simulated(FingerReachConfig::default()).unwrap();
        let mut env = TimeLimit::new(env, 10);
        tokio_test::block_on(env.render(RenderMode::Human)).unwrap();
        tokio_test::block_on(env.close()).unwrap();
        assert!(matches!(env.env.driver(), FingerBackend::Simulated(sim) if sim.is_visualized()));
    }
}
