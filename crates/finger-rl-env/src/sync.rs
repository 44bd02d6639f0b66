//! Wall-clock alignment of episode starts
//!
//! Several robots trained side by side start their episodes on shared
//! boundaries: the first at the next full minute, then every four seconds.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Spacing between consecutive episode start boundaries
const EPISODE_START_SPACING_S: i64 = 4;

/// Schedule of wall-clock episode start boundaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallClockSync {
    next_start: DateTime<Utc>,
    spacing: Duration,
}

impl WallClockSync {
    /// First boundary at `first_start`, later ones every four seconds
    #[must_use]
    pub fn new(first_start: DateTime<Utc>) -> Self {
        Self {
            next_start: first_start,
            spacing: Duration::seconds(EPISODE_START_SPACING_S),
        }
    }

    /// First boundary at the full minute following `now`
    #[must_use]
    pub fn starting_next_minute(now: DateTime<Utc>) -> Self {
        let next_minute = (now.timestamp().div_euclid(60) + 1) * 60;
        Self::new(DateTime::from_timestamp(next_minute, 0).unwrap_or(now))
    }

    /// Boundary the next call to [`WallClockSync::wait`] sleeps until
    #[must_use]
    pub fn next_start(&self) -> DateTime<Utc> {
        self.next_start
    }

    /// Sleep until the next boundary, then schedule the one after it
    ///
    /// Returns immediately when the boundary has already passed. Returns the
    /// boundary that was waited for.
    pub async fn wait(&mut self) -> DateTime<Utc> {
        let boundary = self.next_start;
        let remaining = boundary - Utc::now();
        if let Ok(remaining) = remaining.to_std() {
            debug!(
                until = %boundary,
                wait_ms = remaining.as_millis(),
                "waiting for episode start boundary"
            );
            tokio::time::sleep(remaining).await;
        }
        self.next_start = boundary + self.spacing;
        boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_first_boundary_is_next_full_minute() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 59, 30).unwrap();
        let sync = WallClockSync::starting_next_minute(now);
        assert_eq!(sync.next_start(), Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap());

        let on_boundary = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        assert_eq!(
            WallClockSync::starting_next_minute(on_boundary).next_start(),
            Utc.with_ymd_and_hms(2024, 3, 1, 13, 1, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_past_boundary_does_not_block() {
        let start = Utc::now() - Duration::seconds(30);
        let mut sync = WallClockSync::new(start);

        let before = std::time::Instant::now();
        assert_eq!(sync.wait().await, start);
        assert_eq!(sync.wait().await, start + Duration::seconds(4));
        assert!(before.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(sync.next_start(), start + Duration::seconds(8));
    }

    #[tokio::test]
    async fn test_waits_for_future_boundary() {
        let start = Utc::now() + Duration::milliseconds(50);
        let mut sync = WallClockSync::new(start);
        sync.wait().await;
        assert!(Utc::now() >= start);
    }
}
