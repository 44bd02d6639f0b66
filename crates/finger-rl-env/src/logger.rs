//! Episode data logging

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use finger_rl_core::Result;

/// Sink for per-step robot data
///
/// Calls are fire-and-forget, the environment never inspects what the logger
/// does with them.
pub trait DataLogger: Send + Sync {
    /// Begin a new episode with its sampled target
    fn new_episode(&mut self, target_joint_positions: &[f64], goal: &[[f64; 3]]);

    /// Record one observation of the current episode
    fn append(
        &mut self,
        joint_positions: &[f64],
        end_effector_position: &[f64],
        timestamp: DateTime<Utc>,
    );
}

/// Logger that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl DataLogger for NullLogger {
    fn new_episode(&mut self, _target_joint_positions: &[f64], _goal: &[[f64; 3]]) {}

    fn append(
        &mut self,
        _joint_positions: &[f64],
        _end_effector_position: &[f64],
        _timestamp: DateTime<Utc>,
    ) {
    }
}

/// One recorded observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedSample {
    /// Joint angles
    pub joint_positions: Vec<f64>,
    /// Flattened fingertip positions
    pub end_effector_position: Vec<f64>,
    /// Wall-clock time of the observation
    pub timestamp: DateTime<Utc>,
}

/// All samples of one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Joint configuration the goal was derived from
    pub target_joint_positions: Vec<f64>,
    /// Fingertip goal, one point per finger
    pub goal: Vec<[f64; 3]>,
    /// Observations in step order
    pub samples: Vec<LoggedSample>,
}

/// In-memory logger that can be written out as JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeRecorder {
    episodes: Vec<EpisodeRecord>,
}

impl EpisodeRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded episodes, oldest first
    #[must_use]
    pub fn episodes(&self) -> &[EpisodeRecord] {
        &self.episodes
    }

    /// Episode currently being recorded
    #[must_use]
    pub fn current(&self) -> Option<&EpisodeRecord> {
        self.episodes.last()
    }

    /// Write all episodes to `path` as pretty-printed JSON
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read episodes previously written with [`EpisodeRecorder::save_json`]
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl DataLogger for EpisodeRecorder {
    fn new_episode(&mut self, target_joint_positions: &[f64], goal: &[[f64; 3]]) {
        self.episodes.push(EpisodeRecord {
            target_joint_positions: target_joint_positions.to_vec(),
            goal: goal.to_vec(),
            samples: Vec::new(),
        });
    }

    fn append(
        &mut self,
        joint_positions: &[f64],
        end_effector_position: &[f64],
        timestamp: DateTime<Utc>,
    ) {
        let Some(episode) = self.episodes.last_mut() else {
            debug!("dropping sample logged before the first episode");
            return;
        };
        episode.samples.push(LoggedSample {
            joint_positions: joint_positions.to_vec(),
            end_effector_position: end_effector_position.to_vec(),
            timestamp,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_land_in_current_episode() {
        let mut recorder = EpisodeRecorder::new();
        recorder.append(&[0.0; 3], &[0.0; 3], Utc::now());
        assert!(recorder.episodes().is_empty());

        recorder.new_episode(&[0.1, 0.2, 0.3], &[[0.0, 0.1, 0.2]]);
        recorder.append(&[1.0; 3], &[0.5; 3], Utc::now());
        recorder.append(&[2.0; 3], &[0.6; 3], Utc::now());
        recorder.new_episode(&[0.3, 0.2, 0.1], &[[0.2, 0.1, 0.0]]);
        recorder.append(&[3.0; 3], &[0.7; 3], Utc::now());

        assert_eq!(recorder.episodes().len(), 2);
        assert_eq!(recorder.episodes()[0].samples.len(), 2);
        assert_eq!(recorder.current().unwrap().samples[0].joint_positions, vec![3.0; 3]);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.json");

        let mut recorder = EpisodeRecorder::new();
        recorder.new_episode(&[0.1, 0.2, 0.3], &[[0.0, 0.1, 0.2]]);
        recorder.append(&[1.0; 3], &[0.5; 3], Utc::now());
        recorder.save_json(&path).unwrap();

        let loaded = EpisodeRecorder::load_json(&path).unwrap();
        assert_eq!(loaded.episodes(), recorder.episodes());
    }
}
