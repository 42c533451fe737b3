//! Local estimate of the server-side playback position.
//!
//! The server only reports the position with each overview and with the
//! periodic time sync. Between two samples the position is extrapolated from
//! the monotonic clock, unless playback is paused.

use tokio::time::Instant;

use crate::protocol::SocketMessage;
use crate::protocol::names::key;

#[derive(Debug, Clone)]
pub struct EstimatedPosition {
    last_known: f64,
    paused_at: Option<f64>,
    track_id: Option<i64>,
    reference: Instant,
}

impl Default for EstimatedPosition {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatedPosition {
    pub fn new() -> Self {
        Self {
            last_known: 0.0,
            paused_at: None,
            track_id: None,
            reference: Instant::now(),
        }
    }

    /// Records an authoritative sample.
    pub fn update(&mut self, seconds: f64, track_id: Option<i64>) {
        self.last_known = seconds;
        self.track_id = track_id;
        self.reference = Instant::now();
        if self.paused_at.is_some() {
            self.paused_at = Some(seconds);
        }
    }

    /// Records the sample carried by a `get_current_time` reply.
    pub fn update_from_sync(&mut self, message: &SocketMessage) {
        let seconds = message.f64_option(key::PLAYING_CURRENT_TIME).unwrap_or(0.0);
        self.update(seconds, message.i64_option(key::ID));
    }

    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(self.running_estimate());
        }
    }

    pub fn resume(&mut self) {
        if let Some(frozen) = self.paused_at.take() {
            self.last_known = frozen;
            self.reference = Instant::now();
        }
    }

    pub fn reset(&mut self) {
        self.last_known = 0.0;
        self.paused_at = None;
        self.track_id = None;
        self.reference = Instant::now();
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn track_id(&self) -> Option<i64> {
        self.track_id
    }

    /// Position in seconds for `current_track_id`, or 0 when the sample
    /// belongs to another track.
    pub fn estimate(&self, current_track_id: Option<i64>) -> f64 {
        match (self.track_id, current_track_id) {
            (Some(tracked), Some(current)) if tracked == current => {
                self.paused_at.unwrap_or_else(|| self.running_estimate())
            }
            _ => 0.0,
        }
    }

    fn running_estimate(&self) -> f64 {
        self.last_known + self.reference.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::names::request;
    use std::time::Duration;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimate_advances_with_clock() {
        let mut position = EstimatedPosition::new();
        position.update(10.0, Some(7));

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(close(position.estimate(Some(7)), 13.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimate_is_zero_for_other_track() {
        let mut position = EstimatedPosition::new();
        position.update(10.0, Some(7));

        assert_eq!(position.estimate(Some(8)), 0.0);
        assert_eq!(position.estimate(None), 0.0);

        position.update(10.0, None);
        assert_eq!(position.estimate(Some(7)), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_and_resume_continues() {
        let mut position = EstimatedPosition::new();
        position.update(20.0, Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        position.pause();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(close(position.estimate(Some(1)), 22.0));

        // second pause keeps the first frozen value
        position.pause();
        assert!(close(position.estimate(Some(1)), 22.0));

        position.resume();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(close(position.estimate(Some(1)), 23.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_while_paused_moves_frozen_value() {
        let mut position = EstimatedPosition::new();
        position.update(5.0, Some(3));
        position.pause();

        position.update(42.0, Some(3));
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(close(position.estimate(Some(3)), 42.0));
        assert!(position.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_without_pause_is_noop() {
        let mut position = EstimatedPosition::new();
        position.update(1.0, Some(2));
        tokio::time::advance(Duration::from_secs(1)).await;

        position.resume();
        assert!(close(position.estimate(Some(2)), 2.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_from_sync_and_reset() {
        let mut position = EstimatedPosition::new();
        let reply = SocketMessage::request(request::GET_CURRENT_TIME)
            .response_to()
            .with_option(key::PLAYING_CURRENT_TIME, 61.5)
            .with_option(key::ID, 9);

        position.update_from_sync(&reply);
        assert_eq!(position.track_id(), Some(9));
        assert!(close(position.estimate(Some(9)), 61.5));

        position.reset();
        assert_eq!(position.track_id(), None);
        assert!(!position.is_paused());
        assert_eq!(position.estimate(Some(9)), 0.0);
    }
}
